use thiserror::Error;

/// Failure kinds for envelope encryption and decryption.
///
/// Every variant is terminal for the call that produced it: cryptographic
/// failures are not transient, so nothing is retried internally and no
/// partial envelope or plaintext is ever returned.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Randomness source failed: {0}")]
    RandomnessFailure(String),

    #[error("Key conversion failed: {0}")]
    KeyConversionFailure(String),

    #[error("Box operation failed: {0}")]
    BoxOperationFailure(String),

    #[error("Serialization failed: {0}")]
    SerializationFailure(String),

    #[error("No recipient entry matches the provided key")]
    RecipientNotFound,

    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),
}
