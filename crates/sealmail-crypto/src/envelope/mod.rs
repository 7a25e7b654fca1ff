//! Secure envelopes: seal, verify and open.
//!
//! Sealing encrypts the body under a fresh content key, wraps that key for
//! the recipient and signs the ciphertext with the sender's signing key.
//! Opening always verifies the signature first; a body whose signature does
//! not check out is never decrypted.

mod format;

pub use format::{SecureEnvelope, ENVELOPE_LINES, FIELD_TAGS};

use tracing::debug;

use crate::cipher::{AeadKey, ContentKey, Iv};
use crate::error::{CryptoError, CryptoResult};
use crate::keys::{PrivateKey, PublicKey};
use crate::signing;
use crate::wrap::{unwrap_content_key, wrap_content_key};

/// Seal `plaintext` for `recipient`, signed by `sender`.
pub fn seal(
    plaintext: &[u8],
    recipient: &PublicKey,
    sender: &PrivateKey,
) -> CryptoResult<SecureEnvelope> {
    let content_key = ContentKey::generate();
    let iv = Iv::generate();

    let ciphertext = content_key.encrypt(&iv, plaintext)?;
    let wrapped_key = wrap_content_key(&content_key, recipient)?;
    let signature = signing::sign(&ciphertext, sender);

    debug!(
        subsystem = "crypto",
        component = "envelope",
        op = "seal",
        recipient = %recipient.fingerprint(),
        plaintext_len = plaintext.len(),
        ciphertext_len = ciphertext.len(),
        "Sealed envelope"
    );

    Ok(SecureEnvelope {
        signature: signature.to_vec(),
        iv: iv.as_bytes().to_vec(),
        wrapped_key,
        ciphertext,
    })
}

/// Check the envelope's signature against the sender's public key.
pub fn verify(envelope: &SecureEnvelope, sender: &PublicKey) -> CryptoResult<()> {
    let result = signing::verify(&envelope.ciphertext, &envelope.signature, sender);
    debug!(
        subsystem = "crypto",
        component = "envelope",
        op = "verify",
        sender = %sender.fingerprint(),
        success = result.is_ok(),
        "Verified envelope signature"
    );
    result
}

/// Verify, then decrypt.
///
/// Returns [`CryptoError::Verification`] without touching the ciphertext when
/// the signature is bad, and [`CryptoError::Decryption`] when the key cannot
/// be unwrapped or the ciphertext does not authenticate.
pub fn open(
    envelope: &SecureEnvelope,
    sender: &PublicKey,
    recipient: &PrivateKey,
) -> CryptoResult<Vec<u8>> {
    verify(envelope, sender)?;
    decrypt_verified(envelope, recipient)
}

/// Decrypt an envelope whose signature has already been checked.
pub fn decrypt_verified(
    envelope: &SecureEnvelope,
    recipient: &PrivateKey,
) -> CryptoResult<Vec<u8>> {
    let iv = Iv::from_slice(&envelope.iv).map_err(|e| CryptoError::Decryption(e.to_string()))?;

    let content_key = unwrap_content_key(&envelope.wrapped_key, recipient)?;
    let plaintext = content_key.decrypt(&iv, &envelope.ciphertext)?;

    debug!(
        subsystem = "crypto",
        component = "envelope",
        op = "open",
        plaintext_len = plaintext.len(),
        "Opened envelope"
    );
    Ok(plaintext)
}
