use crate::error::CryptoError;
use crate::keys::convert::{self, KeyConverter, KEY_LEN};
use rand::{CryptoRng, RngCore};
use std::collections::HashMap;
use std::fmt;
use zeroize::Zeroizing;

/// An Ed25519 identity keypair in raw byte form.
///
/// The secret is the 32 byte seed; the agreement (X25519) forms are derived
/// on demand rather than stored.
pub struct KeyPair {
    /// Ed25519 public key
    pub public: [u8; KEY_LEN],

    /// Ed25519 secret seed, wiped on drop
    pub secret: Zeroizing<[u8; KEY_LEN]>,
}

impl KeyPair {
    /// Generates a new random keypair from the supplied randomness source.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, CryptoError> {
        let mut seed = Zeroizing::new([0u8; KEY_LEN]);
        rng.try_fill_bytes(seed.as_mut_slice())
            .map_err(|e| CryptoError::RandomnessFailure(e.to_string()))?;

        Self::from_seed(seed.as_slice())
    }

    /// Builds a keypair from an existing Ed25519 seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        let signing_key = ed25519_dalek::SecretKey::from_bytes(seed)
            .map_err(|e| CryptoError::KeyConversionFailure(e.to_string()))?;
        let verifying_key = ed25519_dalek::PublicKey::from(&signing_key);

        let mut secret = Zeroizing::new([0u8; KEY_LEN]);
        secret.copy_from_slice(signing_key.as_bytes());

        Ok(Self {
            public: verifying_key.to_bytes(),
            secret,
        })
    }

    /// Textual key identifier used to locate this key's entry in an envelope.
    pub fn kid(&self) -> String {
        bs58::encode(&self.public).into_string()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({}..., <redacted>)", hex::encode(&self.public[0..4]))
    }
}

/// In-memory [`KeyConverter`] backed by a map from Ed25519 public key to seed.
///
/// Stands in for an external key-management service in tests and simple
/// deployments; production callers custody keys elsewhere and supply their
/// own converter.
#[derive(Default)]
pub struct KeyStore {
    seeds: HashMap<[u8; KEY_LEN], Zeroizing<[u8; KEY_LEN]>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a keypair so the crypter can resolve its agreement secret.
    pub fn insert(&mut self, pair: &KeyPair) {
        self.seeds.insert(pair.public, pair.secret.clone());
    }
}

impl KeyConverter for KeyStore {
    fn convert_to_encryption_key(
        &self,
        signing_pub: &[u8],
    ) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        let public: [u8; KEY_LEN] = signing_pub.try_into().map_err(|_| {
            CryptoError::KeyConversionFailure(format!(
                "expected {} byte Ed25519 public key, got {}",
                KEY_LEN,
                signing_pub.len()
            ))
        })?;

        let seed = self.seeds.get(&public).ok_or_else(|| {
            CryptoError::KeyConversionFailure(
                "no private key known for the given signing key".to_string(),
            )
        })?;

        convert::secret_signing_to_agreement(seed.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation_is_deterministic_in_seed() {
        let pair = KeyPair::generate(&mut rand::thread_rng()).unwrap();
        let rebuilt = KeyPair::from_seed(pair.secret.as_slice()).unwrap();

        assert_eq!(pair.public, rebuilt.public);
        assert_eq!(pair.kid(), rebuilt.kid());
    }

    #[test]
    fn test_store_resolves_registered_keys_only() {
        let pair = KeyPair::generate(&mut rand::thread_rng()).unwrap();
        let stranger = KeyPair::generate(&mut rand::thread_rng()).unwrap();

        let mut store = KeyStore::new();
        store.insert(&pair);

        assert!(store.convert_to_encryption_key(&pair.public).is_ok());
        assert!(matches!(
            store.convert_to_encryption_key(&stranger.public),
            Err(CryptoError::KeyConversionFailure(_))
        ));
    }
}
