use crate::error::CryptoError;
use curve25519_dalek::edwards::CompressedEdwardsY;
use zeroize::Zeroizing;

/// Length of Ed25519 and X25519 keys in raw byte form.
pub const KEY_LEN: usize = 32;

/// Converts an Ed25519 public (verification) key to its X25519 agreement form.
///
/// Both key types live on Curve25519; Ed25519 uses the Edwards form and
/// X25519 the Montgomery form, related by a birational map (RFC 7748 §4.1).
pub fn public_signing_to_agreement(signing_pub: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    let bytes: [u8; KEY_LEN] = signing_pub.try_into().map_err(|_| {
        CryptoError::KeyConversionFailure(format!(
            "expected {} byte Ed25519 public key, got {}",
            KEY_LEN,
            signing_pub.len()
        ))
    })?;

    let point = CompressedEdwardsY(bytes).decompress().ok_or_else(|| {
        CryptoError::KeyConversionFailure("public key is not a valid Edwards point".to_string())
    })?;

    Ok(point.to_montgomery().to_bytes())
}

/// Converts an Ed25519 secret seed to its X25519 agreement form.
///
/// The X25519 scalar is the clamped low half of SHA-512(seed), matching how
/// Ed25519 expands its seed into a signing scalar (RFC 8032 §5.1.5).
pub fn secret_signing_to_agreement(seed: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
    if seed.len() != KEY_LEN {
        return Err(CryptoError::KeyConversionFailure(format!(
            "expected {} byte Ed25519 seed, got {}",
            KEY_LEN,
            seed.len()
        )));
    }

    let digest = ring::digest::digest(&ring::digest::SHA512, seed);

    let mut scalar = Zeroizing::new([0u8; KEY_LEN]);
    scalar.copy_from_slice(&digest.as_ref()[..KEY_LEN]);

    // Clamp per RFC 7748
    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;

    Ok(scalar)
}

/// Resolves agreement keys for signing keys the caller owns.
///
/// This is the seam between the envelope core and whatever holds the private
/// key material. The crypter only ever asks for the X25519 secret paired
/// with a sender's Ed25519 public key; it never sees the signing seed itself.
/// Implementations must tolerate concurrent use.
pub trait KeyConverter: Send + Sync {
    /// Returns the X25519 secret paired with `signing_pub`.
    ///
    /// Fails with [`CryptoError::KeyConversionFailure`] when the key is
    /// unknown or malformed.
    fn convert_to_encryption_key(
        &self,
        signing_pub: &[u8],
    ) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError>;
}
