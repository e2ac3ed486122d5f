use crate::error::CryptoError;
use chacha20poly1305::aead::{Aead, NewAead};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::{CryptoRng, RngCore};
use ring::{digest, hmac};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

/// Nonce length of the box cipher (XChaCha20-Poly1305).
pub const NONCE_LEN: usize = 24;

/// Poly1305 authentication tag length.
pub const TAG_LEN: usize = 16;

/// Length of the ephemeral public key prepended to sealed boxes.
const EPK_LEN: usize = 32;

const KDF_SALT: &[u8] = b"authcrypt-box";
const KDF_INFO: &[u8] = b"authcrypt-box-v1";

/// Derives the box cipher key from an X25519 shared secret.
///
/// HKDF-SHA256 extract-then-expand with a fixed domain-separation salt and
/// info string; a single output block covers the 32 byte key.
fn derive_box_key(shared: &[u8]) -> Zeroizing<[u8; 32]> {
    let salt = hmac::Key::new(hmac::HMAC_SHA256, KDF_SALT);
    let prk = hmac::sign(&salt, shared);

    let prk_key = hmac::Key::new(hmac::HMAC_SHA256, prk.as_ref());
    let mut ctx = hmac::Context::with_key(&prk_key);
    ctx.update(KDF_INFO);
    ctx.update(&[1]);
    let okm = ctx.sign();

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&okm.as_ref()[..32]);
    key
}

/// Authenticated box between two known agreement keys.
///
/// Binds the ciphertext to both keypairs: only the holder of `own_priv` (or
/// the peer's private key) can have produced it, and only the peer can open
/// it. Output is ciphertext with the tag at the tail.
pub fn easy(
    message: &[u8],
    nonce: &[u8],
    peer_pub: &[u8; 32],
    own_priv: &[u8; 32],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = box_cipher(nonce, peer_pub, own_priv)?;
    cipher
        .encrypt(XNonce::from_slice(nonce), message)
        .map_err(|_| CryptoError::BoxOperationFailure("box encryption failed".to_string()))
}

/// Opens an authenticated box produced by [`easy`].
pub fn easy_open(
    boxed: &[u8],
    nonce: &[u8],
    peer_pub: &[u8; 32],
    own_priv: &[u8; 32],
) -> Result<Vec<u8>, CryptoError> {
    if boxed.len() < TAG_LEN {
        return Err(CryptoError::BoxOperationFailure(
            "boxed message shorter than the authentication tag".to_string(),
        ));
    }

    let cipher = box_cipher(nonce, peer_pub, own_priv)?;
    cipher
        .decrypt(XNonce::from_slice(nonce), boxed)
        .map_err(|_| CryptoError::AuthenticationFailure("box tag verification failed".to_string()))
}

fn box_cipher(
    nonce: &[u8],
    peer_pub: &[u8; 32],
    own_priv: &[u8; 32],
) -> Result<XChaCha20Poly1305, CryptoError> {
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::InvalidInput(format!(
            "box nonce must be {} bytes, got {}",
            NONCE_LEN,
            nonce.len()
        )));
    }

    let secret = StaticSecret::from(*own_priv);
    let shared = secret.diffie_hellman(&X25519Public::from(*peer_pub));
    let key = derive_box_key(shared.as_bytes());

    Ok(XChaCha20Poly1305::new(Key::from_slice(&key[..])))
}

/// Anonymously seals `message` to a recipient's agreement public key.
///
/// A fresh ephemeral keypair is drawn from `rng` per call, so nothing in the
/// output identifies the sender. The box nonce is derived from the two
/// public keys rather than carried on the wire. Output is
/// `ephemeral_pub(32) || ciphertext || tag`.
pub fn seal<R: RngCore + CryptoRng>(
    message: &[u8],
    recipient_pub: &[u8; 32],
    rng: &mut R,
) -> Result<Vec<u8>, CryptoError> {
    let mut eph_seed = Zeroizing::new([0u8; 32]);
    rng.try_fill_bytes(eph_seed.as_mut_slice())
        .map_err(|e| CryptoError::RandomnessFailure(e.to_string()))?;

    seal_with_ephemeral(message, recipient_pub, &eph_seed)
}

/// Seals with a caller-supplied ephemeral scalar.
///
/// Split out so callers that manage their own randomness source can draw the
/// ephemeral seed without holding a lock across the box operation.
pub(crate) fn seal_with_ephemeral(
    message: &[u8],
    recipient_pub: &[u8; 32],
    eph_seed: &Zeroizing<[u8; 32]>,
) -> Result<Vec<u8>, CryptoError> {
    let eph_secret = StaticSecret::from(**eph_seed);
    let eph_public = X25519Public::from(&eph_secret);

    let nonce = seal_nonce(eph_public.as_bytes(), recipient_pub);
    let boxed = easy(message, &nonce, recipient_pub, &eph_secret.to_bytes())?;

    let mut out = Vec::with_capacity(EPK_LEN + boxed.len());
    out.extend_from_slice(eph_public.as_bytes());
    out.extend_from_slice(&boxed);
    Ok(out)
}

/// Opens a sealed box using the recipient's agreement private key.
pub fn seal_open(sealed: &[u8], recipient_priv: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < EPK_LEN + TAG_LEN {
        return Err(CryptoError::BoxOperationFailure(
            "sealed box too short".to_string(),
        ));
    }

    let eph_pub: [u8; 32] = sealed[..EPK_LEN]
        .try_into()
        .map_err(|_| CryptoError::BoxOperationFailure("malformed sealed box".to_string()))?;

    let recipient_pub = X25519Public::from(&StaticSecret::from(*recipient_priv));
    let nonce = seal_nonce(&eph_pub, recipient_pub.as_bytes());

    easy_open(&sealed[EPK_LEN..], &nonce, &eph_pub, recipient_priv)
}

/// Deterministic sealed-box nonce: SHA-512(epk || rpk) truncated to 24 bytes.
///
/// Safe because the ephemeral key is unique per seal, so the (key, nonce)
/// pair never repeats.
fn seal_nonce(eph_pub: &[u8; 32], recipient_pub: &[u8; 32]) -> [u8; NONCE_LEN] {
    let mut ctx = digest::Context::new(&digest::SHA512);
    ctx.update(eph_pub);
    ctx.update(recipient_pub);
    let hash = ctx.finish();

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&hash.as_ref()[..NONCE_LEN]);
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agreement_pair() -> ([u8; 32], [u8; 32]) {
        let mut seed = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut seed);
        let secret = StaticSecret::from(seed);
        let public = X25519Public::from(&secret);
        (*public.as_bytes(), secret.to_bytes())
    }

    #[test]
    fn test_easy_round_trip() {
        let (alice_pub, alice_priv) = agreement_pair();
        let (bob_pub, bob_priv) = agreement_pair();
        let nonce = [7u8; NONCE_LEN];

        let boxed = easy(b"wrapped secret", &nonce, &bob_pub, &alice_priv).unwrap();
        let opened = easy_open(&boxed, &nonce, &alice_pub, &bob_priv).unwrap();

        assert_eq!(opened, b"wrapped secret");
    }

    #[test]
    fn test_easy_open_rejects_wrong_peer() {
        let (_, alice_priv) = agreement_pair();
        let (bob_pub, bob_priv) = agreement_pair();
        let (eve_pub, _) = agreement_pair();
        let nonce = [7u8; NONCE_LEN];

        let boxed = easy(b"wrapped secret", &nonce, &bob_pub, &alice_priv).unwrap();
        let result = easy_open(&boxed, &nonce, &eve_pub, &bob_priv);

        assert!(matches!(result, Err(CryptoError::AuthenticationFailure(_))));
    }

    #[test]
    fn test_easy_open_rejects_tampered_box() {
        let (alice_pub, alice_priv) = agreement_pair();
        let (bob_pub, bob_priv) = agreement_pair();
        let nonce = [7u8; NONCE_LEN];

        let mut boxed = easy(b"wrapped secret", &nonce, &bob_pub, &alice_priv).unwrap();
        boxed[0] ^= 0x01;

        let result = easy_open(&boxed, &nonce, &alice_pub, &bob_priv);
        assert!(matches!(result, Err(CryptoError::AuthenticationFailure(_))));
    }

    #[test]
    fn test_easy_rejects_bad_nonce_length() {
        let (bob_pub, _) = agreement_pair();
        let (_, alice_priv) = agreement_pair();

        let result = easy(b"m", &[0u8; 12], &bob_pub, &alice_priv);
        assert!(matches!(result, Err(CryptoError::InvalidInput(_))));
    }

    #[test]
    fn test_seal_round_trip() {
        let (bob_pub, bob_priv) = agreement_pair();

        let sealed = seal(b"anonymous note", &bob_pub, &mut rand::thread_rng()).unwrap();
        let opened = seal_open(&sealed, &bob_priv).unwrap();

        assert_eq!(opened, b"anonymous note");
    }

    #[test]
    fn test_seal_is_nondeterministic() {
        let (bob_pub, _) = agreement_pair();

        let first = seal(b"same message", &bob_pub, &mut rand::thread_rng()).unwrap();
        let second = seal(b"same message", &bob_pub, &mut rand::thread_rng()).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_seal_open_rejects_wrong_recipient() {
        let (bob_pub, _) = agreement_pair();
        let (_, eve_priv) = agreement_pair();

        let sealed = seal(b"anonymous note", &bob_pub, &mut rand::thread_rng()).unwrap();
        let result = seal_open(&sealed, &eve_priv);

        assert!(matches!(result, Err(CryptoError::AuthenticationFailure(_))));
    }

    #[test]
    fn test_seal_open_rejects_short_input() {
        let (_, bob_priv) = agreement_pair();

        let result = seal_open(&[0u8; 40], &bob_priv);
        assert!(matches!(result, Err(CryptoError::BoxOperationFailure(_))));
    }
}
