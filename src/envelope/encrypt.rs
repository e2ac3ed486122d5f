use super::{b64_encode, Envelope, Protected, Recipient, RecipientHeader};
use super::{ALG, ENC, PAYLOAD_NONCE_LEN, TAG_LEN, TYP};
use crate::cryptobox;
use crate::error::CryptoError;
use crate::keys::{self, KeyConverter};
use chacha20poly1305::aead::{Aead, NewAead, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use log::{debug, trace};
use rand::{CryptoRng, RngCore};
use std::sync::Mutex;
use zeroize::Zeroizing;

/// Builds authcrypt envelopes for one or many recipients.
///
/// Holds the two injected collaborators: a randomness source and the
/// key-conversion service that resolves the sender's agreement secret. Both
/// sit behind this struct so encrypt calls are pure transforms over the
/// caller's buffers; the RNG is locked only around individual draws, never
/// across a cipher call, so concurrent encrypts are safe.
pub struct Crypter<R: RngCore + CryptoRng, K: KeyConverter> {
    rng: Mutex<R>,
    keys: K,
}

impl<R: RngCore + CryptoRng, K: KeyConverter> Crypter<R, K> {
    pub fn new(rng: R, keys: K) -> Self {
        Self {
            rng: Mutex::new(rng),
            keys,
        }
    }

    /// Encrypts `payload` for every key in `recipient_keys`.
    ///
    /// `sender_key` is the sender's Ed25519 public key; the matching
    /// agreement secret is resolved through the injected [`KeyConverter`].
    /// Returns the serialized envelope. A fresh CEK and fresh nonces are
    /// drawn per call, so encrypting identical input twice never produces
    /// identical output.
    pub fn encrypt(
        &self,
        payload: &[u8],
        sender_key: &[u8],
        recipient_keys: &[Vec<u8>],
    ) -> Result<Vec<u8>, CryptoError> {
        if recipient_keys.is_empty() {
            return Err(CryptoError::InvalidInput(
                "empty recipient list, need at least one recipient key".to_string(),
            ));
        }

        debug!(
            "encrypting {} byte payload for {} recipient(s)",
            payload.len(),
            recipient_keys.len()
        );

        let mut payload_nonce = [0u8; PAYLOAD_NONCE_LEN];
        self.fill_random(&mut payload_nonce)?;

        // cek protects the payload exactly once and dies with this call
        let mut cek = Zeroizing::new([0u8; 32]);
        self.fill_random(cek.as_mut_slice())?;

        let mut recipients = Vec::with_capacity(recipient_keys.len());
        for recipient_key in recipient_keys {
            recipients.push(self.build_recipient(&cek, sender_key, recipient_key)?);
        }

        let protected = Protected {
            enc: ENC.to_string(),
            typ: TYP.to_string(),
            alg: ALG.to_string(),
            recipients,
        };
        let protected_b64 = protected.to_base64()?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&cek[..]));
        let sealed = cipher
            .encrypt(
                Nonce::from_slice(&payload_nonce),
                Payload {
                    msg: payload,
                    aad: protected_b64.as_bytes(),
                },
            )
            .map_err(|_| {
                CryptoError::BoxOperationFailure("payload encryption failed".to_string())
            })?;

        // AEAD output carries the tag at the tail; the wire format wants it
        // as a separate field
        let split = sealed.len() - TAG_LEN;
        let envelope = Envelope {
            protected: protected_b64,
            iv: b64_encode(&payload_nonce),
            ciphertext: b64_encode(&sealed[..split]),
            tag: b64_encode(&sealed[split..]),
        };

        envelope.to_bytes()
    }

    /// Wraps the CEK and seals the sender identity for one recipient.
    ///
    /// Each entry is independent of all others: it can be unwrapped with
    /// only that recipient's private key plus the data inside the entry.
    fn build_recipient(
        &self,
        cek: &Zeroizing<[u8; 32]>,
        sender_key: &[u8],
        recipient_key: &[u8],
    ) -> Result<Recipient, CryptoError> {
        let mut wrap_nonce = [0u8; cryptobox::NONCE_LEN];
        self.fill_random(&mut wrap_nonce)?;

        let sender_agreement = self.keys.convert_to_encryption_key(sender_key)?;
        let recipient_agreement = keys::public_signing_to_agreement(recipient_key)?;

        // Binds the wrapped cek to both parties: it cannot be replayed to a
        // different recipient or forged by a third party
        let encrypted_cek = cryptobox::easy(
            &cek[..],
            &wrap_nonce,
            &recipient_agreement,
            &sender_agreement,
        )?;

        // The recipient learns who sent this by unsealing the base58 sender
        // key; outsiders learn nothing
        let sender_b58 = bs58::encode(sender_key).into_string();
        let mut eph_seed = Zeroizing::new([0u8; 32]);
        self.fill_random(eph_seed.as_mut_slice())?;
        let sealed_sender =
            cryptobox::seal_with_ephemeral(sender_b58.as_bytes(), &recipient_agreement, &eph_seed)?;

        let kid = bs58::encode(recipient_key).into_string();
        trace!("wrapped cek for recipient kid={}", kid);

        Ok(Recipient {
            encrypted_key: b64_encode(&encrypted_cek),
            header: RecipientHeader {
                kid,
                sender: b64_encode(&sealed_sender),
                iv: b64_encode(&wrap_nonce),
            },
        })
    }

    fn fill_random(&self, buf: &mut [u8]) -> Result<(), CryptoError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| CryptoError::RandomnessFailure("randomness source poisoned".to_string()))?;
        rng.try_fill_bytes(buf)
            .map_err(|e| CryptoError::RandomnessFailure(e.to_string()))
    }
}
