//! AES-256-GCM under typed keys and IVs.
//!
//! Every symmetric key in the crate is 256 bits and used only with
//! AES-GCM: the per-message [`ContentKey`], the key-encryption key in
//! [`crate::wrap`], and the passphrase-derived key that locks key files.
//! Each implements [`AeadKey`], so raw byte arrays never meet the cipher.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// AES-256 key length in bytes.
pub const CONTENT_KEY_LEN: usize = 32;

/// GCM IV length in bytes.
pub const IV_LEN: usize = 12;

/// GCM tag length; every ciphertext is this much longer than its plaintext.
pub const TAG_LEN: usize = 16;

/// Fill an array from the thread-local CSPRNG.
pub fn generate_random<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// A GCM IV. Generate a fresh one for every encryption under the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iv([u8; IV_LEN]);

impl Iv {
    pub fn generate() -> Self {
        Self(generate_random())
    }

    pub fn from_bytes(bytes: [u8; IV_LEN]) -> Self {
        Self(bytes)
    }

    /// Take an IV read off the wire or out of a file. A wrong length is a
    /// [`CryptoError::InvalidFormat`].
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; IV_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidFormat(format!("IV must be {} bytes, got {}", IV_LEN, bytes.len()))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.0
    }
}

/// A 256-bit AES-GCM key.
pub trait AeadKey {
    fn key_bytes(&self) -> &[u8; CONTENT_KEY_LEN];

    /// Ciphertext with the 16-byte tag appended.
    fn encrypt(&self, iv: &Iv, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        cipher_for(self.key_bytes())
            .encrypt(Nonce::from_slice(iv.as_bytes()), plaintext)
            .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".into()))
    }

    /// Fails with [`CryptoError::Decryption`] unless the tag authenticates
    /// under this key and `iv`.
    fn decrypt(&self, iv: &Iv, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        cipher_for(self.key_bytes())
            .decrypt(Nonce::from_slice(iv.as_bytes()), ciphertext)
            .map_err(|_| CryptoError::Decryption("AES-GCM tag mismatch".into()))
    }
}

fn cipher_for(key: &[u8; CONTENT_KEY_LEN]) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
}

/// Single-use key for one envelope body.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; CONTENT_KEY_LEN]);

impl ContentKey {
    pub fn generate() -> Self {
        Self(generate_random())
    }

    /// Key bytes recovered from a wrapped key.
    pub fn from_bytes(bytes: [u8; CONTENT_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_LEN] {
        &self.0
    }
}

impl AeadKey for ContentKey {
    fn key_bytes(&self) -> &[u8; CONTENT_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ivs_and_keys_differ() {
        assert_ne!(Iv::generate(), Iv::generate());

        let k1 = ContentKey::generate();
        let k2 = ContentKey::generate();
        assert_ne!(k1.as_bytes(), k2.as_bytes());
        assert_eq!(k1.as_bytes().len() * 8, 256);
    }

    #[test]
    fn test_iv_from_slice_checks_length() {
        assert!(Iv::from_slice(&[0u8; IV_LEN]).is_ok());
        let err = Iv::from_slice(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidFormat(_)));
        assert!(err.to_string().contains("got 16"));
    }

    #[test]
    fn test_content_key_debug_redacted() {
        assert_eq!(format!("{:?}", ContentKey::generate()), "ContentKey([REDACTED])");
    }

    #[test]
    fn test_body_roundtrip_adds_tag() {
        let key = ContentKey::generate();
        let iv = Iv::generate();
        let body = b"Meet at the usual place";

        let sealed = key.encrypt(&iv, body).unwrap();
        assert_eq!(sealed.len(), body.len() + TAG_LEN);
        assert_eq!(key.decrypt(&iv, &sealed).unwrap(), body);
    }

    #[test]
    fn test_other_key_or_iv_fails_to_decrypt() {
        let key = ContentKey::from_bytes([42u8; CONTENT_KEY_LEN]);
        let iv = Iv::from_bytes([1u8; IV_LEN]);
        let sealed = key.encrypt(&iv, b"Secret data").unwrap();

        let other_key = ContentKey::from_bytes([99u8; CONTENT_KEY_LEN]);
        assert!(matches!(
            other_key.decrypt(&iv, &sealed),
            Err(CryptoError::Decryption(_))
        ));
        assert!(matches!(
            key.decrypt(&Iv::from_bytes([2u8; IV_LEN]), &sealed),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn test_flipped_byte_fails_to_decrypt() {
        let key = ContentKey::generate();
        let iv = Iv::generate();
        let mut sealed = key.encrypt(&iv, b"Secret data").unwrap();
        sealed[0] ^= 0x01;

        assert!(matches!(
            key.decrypt(&iv, &sealed),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn test_iv_changes_ciphertext() {
        let key = ContentKey::from_bytes([42u8; CONTENT_KEY_LEN]);
        let c1 = key.encrypt(&Iv::from_bytes([1u8; IV_LEN]), b"Same message").unwrap();
        let c2 = key.encrypt(&Iv::from_bytes([2u8; IV_LEN]), b"Same message").unwrap();
        assert_ne!(c1, c2);
    }
}
