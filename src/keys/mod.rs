mod convert;
mod store;

pub use convert::{public_signing_to_agreement, secret_signing_to_agreement, KeyConverter, KEY_LEN};
pub use store::{KeyPair, KeyStore};

/*
 * Key handling for the envelope core
 *
 * Identities are Ed25519 signing keys; key agreement happens on the X25519
 * form of the same curve points. This module holds the conversion math and
 * the KeyConverter seam through which the crypter resolves agreement
 * secrets for keys the caller owns.
 */
