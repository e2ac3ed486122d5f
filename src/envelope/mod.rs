mod decrypt;
mod encrypt;

pub use decrypt::Decrypter;
pub use encrypt::Crypter;

use crate::error::CryptoError;
use serde::{Deserialize, Serialize};

/// Payload cipher identifier carried in the protected header.
pub const ENC: &str = "chacha20poly1305_ietf";

/// Message type identifier.
pub const TYP: &str = "JWM/1.0";

/// Envelope algorithm identifier.
pub const ALG: &str = "Authcrypt";

/// Nonce length of the payload cipher (ChaCha20-Poly1305 IETF).
pub(crate) const PAYLOAD_NONCE_LEN: usize = 12;

/// Poly1305 tag length carried in the `tag` field.
pub(crate) const TAG_LEN: usize = 16;

/// Outer wire envelope. All values are base64url text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub protected: String,
    pub iv: String,
    pub ciphertext: String,
    pub tag: String,
}

/// Protected header: cipher identifiers plus the ordered recipient list.
///
/// Its base64 encoding doubles as the AAD of the payload cipher, so any
/// mutation of the header invalidates the payload tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protected {
    pub enc: String,
    pub typ: String,
    pub alg: String,
    pub recipients: Vec<Recipient>,
}

/// One per-recipient entry: the wrapped CEK and its unwrapping material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub encrypted_key: String,
    pub header: RecipientHeader,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientHeader {
    /// base58 of the recipient's Ed25519 public key
    pub kid: String,
    /// Sealed base58 sender identity, base64url
    pub sender: String,
    /// Wrap box nonce, base64url
    pub iv: String,
}

impl Envelope {
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        serde_json::to_vec(self)
            .map_err(|e| CryptoError::SerializationFailure(format!("envelope encode: {}", e)))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        serde_json::from_slice(bytes)
            .map_err(|e| CryptoError::SerializationFailure(format!("envelope decode: {}", e)))
    }
}

impl Protected {
    /// Canonical serialized form: JSON, then base64url with padding.
    ///
    /// The returned string is stored in the envelope verbatim and reused as
    /// AAD, so it must never be re-encoded on the decrypt side.
    pub fn to_base64(&self) -> Result<String, CryptoError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| CryptoError::SerializationFailure(format!("protected encode: {}", e)))?;
        Ok(b64_encode(&json))
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let json = b64_decode(encoded)?;
        serde_json::from_slice(&json)
            .map_err(|e| CryptoError::SerializationFailure(format!("protected decode: {}", e)))
    }
}

pub(crate) fn b64_encode(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE)
}

pub(crate) fn b64_decode(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    base64::decode_config(encoded, base64::URL_SAFE)
        .map_err(|e| CryptoError::SerializationFailure(format!("base64 decode: {}", e)))
}

/*
 * Wire format for multi-recipient authenticated envelopes
 *
 * { "protected": <b64 of protected-header JSON>,
 *   "iv": <b64 payload nonce>,
 *   "ciphertext": <b64>,
 *   "tag": <b64 16-byte tag> }
 *
 * The protected header nests the ordered recipient list; each entry is
 * independently decryptable with only that recipient's private key.
 */

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_protected() -> Protected {
        Protected {
            enc: ENC.to_string(),
            typ: TYP.to_string(),
            alg: ALG.to_string(),
            recipients: vec![Recipient {
                encrypted_key: b64_encode(b"wrapped"),
                header: RecipientHeader {
                    kid: bs58::encode(&[1u8; 32]).into_string(),
                    sender: b64_encode(b"sealed"),
                    iv: b64_encode(&[2u8; 24]),
                },
            }],
        }
    }

    #[test]
    fn test_protected_base64_round_trip() {
        let protected = sample_protected();
        let encoded = protected.to_base64().unwrap();
        let decoded = Protected::from_base64(&encoded).unwrap();

        assert_eq!(decoded.enc, ENC);
        assert_eq!(decoded.typ, TYP);
        assert_eq!(decoded.alg, ALG);
        assert_eq!(decoded.recipients.len(), 1);
        assert_eq!(decoded.recipients[0].header.kid, protected.recipients[0].header.kid);
    }

    #[test]
    fn test_envelope_wire_field_names() {
        let envelope = Envelope {
            protected: sample_protected().to_base64().unwrap(),
            iv: b64_encode(&[0u8; 12]),
            ciphertext: b64_encode(b"ct"),
            tag: b64_encode(&[0u8; 16]),
        };

        let json = String::from_utf8(envelope.to_bytes().unwrap()).unwrap();
        for field in ["\"protected\"", "\"iv\"", "\"ciphertext\"", "\"tag\""] {
            assert!(json.contains(field), "missing field {}", field);
        }

        let inner = String::from_utf8(b64_decode(&envelope.protected).unwrap()).unwrap();
        for field in [
            "\"enc\"",
            "\"typ\"",
            "\"alg\"",
            "\"recipients\"",
            "\"encrypted_key\"",
            "\"kid\"",
            "\"sender\"",
        ] {
            assert!(inner.contains(field), "missing field {}", field);
        }
    }

    #[test]
    fn test_envelope_rejects_malformed_json() {
        let result = Envelope::from_bytes(b"{not json");
        assert!(matches!(
            result,
            Err(crate::error::CryptoError::SerializationFailure(_))
        ));
    }

    #[test]
    fn test_b64_decode_rejects_garbage() {
        assert!(b64_decode("@@@not-base64@@@").is_err());
    }
}
