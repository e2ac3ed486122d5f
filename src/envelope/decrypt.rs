use super::{b64_decode, Envelope, Protected, Recipient, PAYLOAD_NONCE_LEN, TAG_LEN};
use crate::cryptobox;
use crate::error::CryptoError;
use crate::keys::{self, KeyPair};
use chacha20poly1305::aead::{Aead, NewAead, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use log::debug;
use ring::constant_time;
use zeroize::Zeroizing;

/// Opens authcrypt envelopes addressed to a single recipient key.
///
/// Stateless; every call is an atomic transform that either yields the
/// payload and sender identity or fails with no side effect.
#[derive(Debug, Default)]
pub struct Decrypter;

impl Decrypter {
    pub fn new() -> Self {
        Self
    }

    /// Decrypts `envelope` with the caller's Ed25519 secret seed.
    ///
    /// Returns `(payload, sender_public_key)`. Fails with
    /// [`CryptoError::RecipientNotFound`] when no recipient entry matches
    /// the caller's key, and [`CryptoError::AuthenticationFailure`] when any
    /// tag check fails. Input that does not parse as an envelope, base64 or
    /// JSON fails earlier with [`CryptoError::SerializationFailure`]; every
    /// failure mode is fail-closed.
    pub fn decrypt(
        &self,
        envelope: &[u8],
        own_secret: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let envelope = Envelope::from_bytes(envelope)?;
        let protected = Protected::from_base64(&envelope.protected)?;

        let own_pair = KeyPair::from_seed(own_secret)?;
        let own_agreement = keys::secret_signing_to_agreement(own_secret)?;

        debug!(
            "decrypting envelope with {} recipient(s)",
            protected.recipients.len()
        );

        let entry = find_recipient(&protected.recipients, &own_pair.kid())?;

        // Unseal the claimed sender identity. This alone proves nothing; the
        // authenticated cek unwrap below is what ties the claim down.
        let sealed_sender = b64_decode(&entry.header.sender)?;
        let sender_b58 = cryptobox::seal_open(&sealed_sender, &own_agreement)?;
        let sender_key = decode_sender_key(&sender_b58)?;
        let sender_agreement = keys::public_signing_to_agreement(&sender_key)?;

        let wrap_nonce = b64_decode(&entry.header.iv)?;
        let wrapped_cek = b64_decode(&entry.encrypted_key)?;
        let cek = Zeroizing::new(cryptobox::easy_open(
            &wrapped_cek,
            &wrap_nonce,
            &sender_agreement,
            &own_agreement,
        )?);
        if cek.len() != 32 {
            return Err(CryptoError::AuthenticationFailure(
                "unwrapped key has unexpected length".to_string(),
            ));
        }

        let payload_nonce = b64_decode(&envelope.iv)?;
        if payload_nonce.len() != PAYLOAD_NONCE_LEN {
            return Err(CryptoError::SerializationFailure(format!(
                "payload nonce must be {} bytes, got {}",
                PAYLOAD_NONCE_LEN,
                payload_nonce.len()
            )));
        }

        let tag = b64_decode(&envelope.tag)?;
        if tag.len() != TAG_LEN {
            return Err(CryptoError::SerializationFailure(format!(
                "tag must be {} bytes, got {}",
                TAG_LEN,
                tag.len()
            )));
        }

        // Reassemble ciphertext || tag; AAD is the protected string exactly
        // as transmitted, never re-encoded
        let mut sealed = b64_decode(&envelope.ciphertext)?;
        sealed.extend_from_slice(&tag);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&cek[..]));
        let payload = cipher
            .decrypt(
                Nonce::from_slice(&payload_nonce),
                Payload {
                    msg: &sealed,
                    aad: envelope.protected.as_bytes(),
                },
            )
            .map_err(|_| {
                CryptoError::AuthenticationFailure(
                    "payload tag verification failed".to_string(),
                )
            })?;

        Ok((payload, sender_key.to_vec()))
    }
}

/// Scans the full recipient list for the caller's entry.
///
/// Every entry is compared with a constant-time equality check and the scan
/// never stops early, so an outside observer cannot learn the position of a
/// matching entry, or whether one exists, from timing alone.
fn find_recipient<'a>(
    recipients: &'a [Recipient],
    own_kid: &str,
) -> Result<&'a Recipient, CryptoError> {
    let mut matched: Option<usize> = None;

    for (i, recipient) in recipients.iter().enumerate() {
        let equal = constant_time::verify_slices_are_equal(
            recipient.header.kid.as_bytes(),
            own_kid.as_bytes(),
        )
        .is_ok();

        if equal && matched.is_none() {
            matched = Some(i);
        }
    }

    match matched {
        Some(i) => Ok(&recipients[i]),
        None => Err(CryptoError::RecipientNotFound),
    }
}

fn decode_sender_key(sender_b58: &[u8]) -> Result<[u8; keys::KEY_LEN], CryptoError> {
    let text = std::str::from_utf8(sender_b58).map_err(|_| {
        CryptoError::SerializationFailure("sealed sender is not valid utf-8".to_string())
    })?;

    let bytes = bs58::decode(text)
        .into_vec()
        .map_err(|e| CryptoError::SerializationFailure(format!("sender key decode: {}", e)))?;

    bytes.as_slice().try_into().map_err(|_| {
        CryptoError::SerializationFailure(format!(
            "sender key must be {} bytes, got {}",
            keys::KEY_LEN,
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::RecipientHeader;

    fn entry(kid: &str) -> Recipient {
        Recipient {
            encrypted_key: String::new(),
            header: RecipientHeader {
                kid: kid.to_string(),
                sender: String::new(),
                iv: String::new(),
            },
        }
    }

    #[test]
    fn test_find_recipient_returns_first_match() {
        let recipients = vec![entry("alpha"), entry("beta"), entry("beta")];

        let found = find_recipient(&recipients, "beta").unwrap();
        assert!(std::ptr::eq(found, &recipients[1]));
    }

    #[test]
    fn test_find_recipient_reports_absence() {
        let recipients = vec![entry("alpha"), entry("beta")];

        let result = find_recipient(&recipients, "gamma");
        assert!(matches!(result, Err(CryptoError::RecipientNotFound)));
    }

    #[test]
    fn test_decode_sender_key_rejects_bad_input() {
        assert!(decode_sender_key(&[0xff, 0xfe]).is_err());
        assert!(decode_sender_key(b"0OIl").is_err()); // not in the b58 alphabet
        assert!(decode_sender_key(b"abc").is_err()); // decodes too short
    }
}
