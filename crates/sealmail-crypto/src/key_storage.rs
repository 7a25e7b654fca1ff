//! Passphrase-protected storage for private identity keys.
//!
//! # Format: SMKEY001
//!
//! ```text
//! +------------------+
//! | Magic: SMKEY001  | 8 bytes
//! +------------------+
//! | Header Length    | 4 bytes (little-endian)
//! +------------------+
//! | Header (JSON)    | Variable
//! +------------------+
//! | Encrypted Key    | 80 bytes (64-byte key + 16-byte auth tag)
//! +------------------+
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::cipher::{AeadKey, Iv, TAG_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode_array, base64_encode};
use crate::kdf::{derive_key, generate_salt, KdfParams};

/// Magic bytes for the private key file format.
pub const MAGIC_KEYFILE: &[u8; 8] = b"SMKEY001";

/// Length of a serialized private key (X25519 secret + Ed25519 secret).
pub const PRIVATE_KEY_LEN: usize = 64;

const PREFIX_LEN: usize = 12;

/// Header for encrypted private key files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFileHeader {
    /// Format version.
    pub version: u8,
    /// KDF algorithm (always "argon2id").
    pub kdf: String,
    /// KDF parameters.
    pub kdf_params: KdfParams,
    /// Salt for key derivation (base64).
    pub salt: String,
    /// Nonce for encryption (base64).
    pub nonce: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Encrypt a private key with a passphrase.
///
/// Returns encrypted data in SMKEY001 format.
pub fn encrypt_private_key(
    key_bytes: &[u8; PRIVATE_KEY_LEN],
    passphrase: &str,
    kdf_params: KdfParams,
) -> CryptoResult<Vec<u8>> {
    let salt = generate_salt();
    let iv = Iv::generate();

    let derived = derive_key(passphrase.as_bytes(), &salt, &kdf_params)?;
    let ciphertext = derived.encrypt(&iv, key_bytes)?;

    let header = KeyFileHeader {
        version: 1,
        kdf: "argon2id".to_string(),
        kdf_params,
        salt: base64_encode(&salt),
        nonce: base64_encode(iv.as_bytes()),
        created_at: Utc::now(),
    };

    let header_json = serde_json::to_vec(&header)
        .map_err(|e| CryptoError::Encryption(format!("Header serialization failed: {}", e)))?;
    let header_len = (header_json.len() as u32).to_le_bytes();

    let mut output = Vec::with_capacity(PREFIX_LEN + header_json.len() + ciphertext.len());
    output.extend_from_slice(MAGIC_KEYFILE);
    output.extend_from_slice(&header_len);
    output.extend_from_slice(&header_json);
    output.extend_from_slice(&ciphertext);

    Ok(output)
}

/// Decrypt a private key from SMKEY001 format.
///
/// An authentication failure on the key ciphertext is reported as
/// [`CryptoError::WrongPassword`]; structural problems are
/// [`CryptoError::InvalidKeyfile`].
pub fn decrypt_private_key(
    encrypted: &[u8],
    passphrase: &str,
) -> CryptoResult<[u8; PRIVATE_KEY_LEN]> {
    if encrypted.len() < MAGIC_KEYFILE.len() || &encrypted[0..8] != MAGIC_KEYFILE {
        return Err(CryptoError::InvalidMagic);
    }
    if encrypted.len() < PREFIX_LEN {
        return Err(CryptoError::InvalidKeyfile("File too short".to_string()));
    }

    let header_len = u32::from_le_bytes([encrypted[8], encrypted[9], encrypted[10], encrypted[11]])
        as usize;

    let expected = PREFIX_LEN + header_len + PRIVATE_KEY_LEN + TAG_LEN;
    if encrypted.len() != expected {
        return Err(CryptoError::InvalidKeyfile(format!(
            "Expected {} bytes, got {}",
            expected,
            encrypted.len()
        )));
    }

    let header: KeyFileHeader =
        serde_json::from_slice(&encrypted[PREFIX_LEN..PREFIX_LEN + header_len])
            .map_err(|e| CryptoError::InvalidKeyfile(format!("Invalid header: {}", e)))?;

    if header.version != 1 || header.kdf != "argon2id" {
        return Err(CryptoError::InvalidKeyfile(format!(
            "Unsupported key file: version {} kdf {}",
            header.version, header.kdf
        )));
    }

    let salt: [u8; 32] = base64_decode_array(&header.salt, "salt")
        .map_err(|e| CryptoError::InvalidKeyfile(e.to_string()))?;
    let iv = Iv::from_bytes(
        base64_decode_array(&header.nonce, "nonce")
            .map_err(|e| CryptoError::InvalidKeyfile(e.to_string()))?,
    );

    // A passphrase too short to have been accepted at save time cannot be right.
    let derived =
        derive_key(passphrase.as_bytes(), &salt, &header.kdf_params).map_err(|e| match e {
            CryptoError::PassphraseTooShort(_) => CryptoError::WrongPassword,
            other => other,
        })?;

    let ciphertext = &encrypted[PREFIX_LEN + header_len..];
    let mut decrypted = derived
        .decrypt(&iv, ciphertext)
        .map_err(|_| CryptoError::WrongPassword)?;

    let mut key_bytes = [0u8; PRIVATE_KEY_LEN];
    key_bytes.copy_from_slice(&decrypted);
    decrypted.zeroize();
    Ok(key_bytes)
}

/// Check if data is a sealmail private key file.
pub fn is_key_file(data: &[u8]) -> bool {
    data.len() >= 8 && &data[0..8] == MAGIC_KEYFILE
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSPHRASE: &str = "secure-passphrase-123";

    fn params() -> KdfParams {
        KdfParams::low_memory()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = [42u8; PRIVATE_KEY_LEN];

        let encrypted = encrypt_private_key(&key, PASSPHRASE, params()).unwrap();
        let decrypted = decrypt_private_key(&encrypted, PASSPHRASE).unwrap();

        assert_eq!(key, decrypted);
    }

    #[test]
    fn test_wrong_passphrase() {
        let key = [42u8; PRIVATE_KEY_LEN];
        let encrypted = encrypt_private_key(&key, "correct-passphrase", params()).unwrap();

        let result = decrypt_private_key(&encrypted, "wrong-passphrase!");
        assert!(matches!(result, Err(CryptoError::WrongPassword)));
    }

    #[test]
    fn test_magic_bytes() {
        let encrypted =
            encrypt_private_key(&[42u8; PRIVATE_KEY_LEN], PASSPHRASE, params()).unwrap();

        assert!(is_key_file(&encrypted));
        assert_eq!(&encrypted[0..8], MAGIC_KEYFILE);
    }

    #[test]
    fn test_invalid_magic() {
        let mut data = vec![0u8; 100];
        data[0..8].copy_from_slice(b"INVALID!");

        let result = decrypt_private_key(&data, PASSPHRASE);
        assert!(matches!(result, Err(CryptoError::InvalidMagic)));
    }

    #[test]
    fn test_truncated_file() {
        let encrypted =
            encrypt_private_key(&[42u8; PRIVATE_KEY_LEN], PASSPHRASE, params()).unwrap();

        let result = decrypt_private_key(&encrypted[..encrypted.len() - 1], PASSPHRASE);
        assert!(matches!(result, Err(CryptoError::InvalidKeyfile(_))));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let mut encrypted =
            encrypt_private_key(&[42u8; PRIVATE_KEY_LEN], PASSPHRASE, params()).unwrap();

        let len = encrypted.len();
        encrypted[len - 1] ^= 0xFF;

        assert!(decrypt_private_key(&encrypted, PASSPHRASE).is_err());
    }

    #[test]
    fn test_short_passphrase_rejected() {
        let result = encrypt_private_key(&[1u8; PRIVATE_KEY_LEN], "short", params());
        assert!(matches!(result, Err(CryptoError::PassphraseTooShort(_))));
    }
}
