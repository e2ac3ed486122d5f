pub mod cryptobox;
pub mod envelope;
pub mod error;
pub mod keys;

pub use envelope::{Crypter, Decrypter, Envelope, Protected, Recipient, RecipientHeader};
pub use error::CryptoError;
pub use keys::{KeyConverter, KeyPair, KeyStore};

/*
 * authcrypt: multi-recipient authenticated envelope encryption
 *
 * Packs an arbitrary binary message for one or many recipients identified
 * by Ed25519 public keys. A fresh content encryption key seals the payload
 * once with ChaCha20-Poly1305; that key, and the sender's identity, are
 * individually wrapped for every recipient over X25519 key agreement. The
 * result is a JWM/1.0 "Authcrypt" JSON envelope that round-trips exactly
 * and fails closed under any tampering.
 *
 * The core consumes only a randomness source, a key-conversion service
 * (the KeyConverter seam), and raw bytes in/out. Key custody, transport
 * and CLI surfaces live elsewhere.
 */
