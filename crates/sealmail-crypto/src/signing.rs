//! Detached Ed25519 signatures over envelope ciphertext.

use ed25519_dalek::{Signature, Signer};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{PrivateKey, PublicKey};

/// Ed25519 signature length.
pub const SIGNATURE_LEN: usize = 64;

/// Sign `data` with the sender's signing secret.
pub fn sign(data: &[u8], sender: &PrivateKey) -> [u8; SIGNATURE_LEN] {
    sender.to_ed25519().sign(data).to_bytes()
}

/// Verify a detached signature.
///
/// Any failure (malformed signature, unusable key, mismatch) is
/// [`CryptoError::Verification`].
pub fn verify(data: &[u8], signature: &[u8], sender: &PublicKey) -> CryptoResult<()> {
    let signature = Signature::from_slice(signature).map_err(|_| CryptoError::Verification)?;
    let key = sender.to_ed25519().map_err(|_| CryptoError::Verification)?;
    key.verify_strict(data, &signature)
        .map_err(|_| CryptoError::Verification)
}
