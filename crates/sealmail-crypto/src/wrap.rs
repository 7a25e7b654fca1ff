//! Content-key wrapping with X25519 ECDH.
//!
//! The content key is wrapped for the recipient the ECIES way:
//!
//! 1. Generate an ephemeral X25519 secret
//! 2. shared = ECDH(ephemeral_secret, recipient_public)
//! 3. kek = HKDF-SHA256(salt = ephemeral_public || recipient_public, shared)
//! 4. wrapped = AES-256-GCM(kek, nonce, content_key)
//!
//! Wire layout of the wrapped key:
//!
//! ```text
//! ┌────────────────────┬───────────┬──────────────────────────────┐
//! │ ephemeral pub (32) │ nonce (12)│ encrypted content key (32+16)│
//! └────────────────────┴───────────┴──────────────────────────────┘
//! ```

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::{generate_random, AeadKey, ContentKey, Iv, CONTENT_KEY_LEN, IV_LEN, TAG_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::keys::{PrivateKey, PublicKey};

/// Length of a wrapped content key.
pub const WRAPPED_KEY_LEN: usize = 32 + IV_LEN + CONTENT_KEY_LEN + TAG_LEN;

/// Domain separation context for HKDF.
const HKDF_INFO_KEK: &[u8] = b"sealmail-envelope-kek-v1";

/// Derived key-encryption key (32 bytes for AES-256).
#[derive(Zeroize, ZeroizeOnDrop)]
struct KeyEncryptionKey([u8; 32]);

impl AeadKey for KeyEncryptionKey {
    fn key_bytes(&self) -> &[u8; CONTENT_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for KeyEncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyEncryptionKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

fn derive_kek(
    shared_secret: &[u8; 32],
    ephemeral_public: &[u8; 32],
    recipient_public: &[u8; 32],
) -> CryptoResult<KeyEncryptionKey> {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(ephemeral_public);
    salt[32..].copy_from_slice(recipient_public);

    let hkdf = Hkdf::<Sha256>::new(Some(&salt), shared_secret);
    let mut key = [0u8; 32];
    hkdf.expand(HKDF_INFO_KEK, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(format!("HKDF expand: {}", e)))?;
    Ok(KeyEncryptionKey(key))
}

/// Wrap a content key for the holder of `recipient`.
pub fn wrap_content_key(content_key: &ContentKey, recipient: &PublicKey) -> CryptoResult<Vec<u8>> {
    let ephemeral = StaticSecret::from(generate_random::<32>());
    let ephemeral_public = X25519Public::from(&ephemeral);

    let shared = ephemeral.diffie_hellman(&recipient.to_x25519());
    if !shared.was_contributory() {
        return Err(CryptoError::Encryption(
            "Recipient key produced a non-contributory shared secret".to_string(),
        ));
    }

    let kek = derive_kek(
        shared.as_bytes(),
        ephemeral_public.as_bytes(),
        recipient.encryption_key(),
    )?;
    let iv = Iv::generate();
    let encrypted = kek.encrypt(&iv, content_key.as_bytes())?;

    let mut wrapped = Vec::with_capacity(WRAPPED_KEY_LEN);
    wrapped.extend_from_slice(ephemeral_public.as_bytes());
    wrapped.extend_from_slice(iv.as_bytes());
    wrapped.extend_from_slice(&encrypted);
    Ok(wrapped)
}

/// Recover a content key wrapped for `recipient`.
///
/// Fails with [`CryptoError::Decryption`] when the wrapped key was produced
/// for a different recipient or has been altered.
pub fn unwrap_content_key(wrapped: &[u8], recipient: &PrivateKey) -> CryptoResult<ContentKey> {
    if wrapped.len() != WRAPPED_KEY_LEN {
        return Err(CryptoError::Decryption(format!(
            "Invalid wrapped key length: expected {}, got {}",
            WRAPPED_KEY_LEN,
            wrapped.len()
        )));
    }

    let mut ephemeral_public = [0u8; 32];
    ephemeral_public.copy_from_slice(&wrapped[..32]);
    let iv = Iv::from_slice(&wrapped[32..32 + IV_LEN])?;

    let shared = recipient
        .to_x25519()
        .diffie_hellman(&X25519Public::from(ephemeral_public));
    let kek = derive_kek(
        shared.as_bytes(),
        &ephemeral_public,
        recipient.public_key().encryption_key(),
    )?;

    let mut key_bytes = kek
        .decrypt(&iv, &wrapped[32 + IV_LEN..])
        .map_err(|_| CryptoError::Decryption("Failed to unwrap content key - wrong key?".into()))?;

    let mut key = [0u8; CONTENT_KEY_LEN];
    key.copy_from_slice(&key_bytes);
    key_bytes.zeroize();
    Ok(ContentKey::from_bytes(key))
}
