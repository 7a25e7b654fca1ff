//! Errors raised while handling keys and envelopes.
//!
//! Callers that present mail care about one split: was the problem the
//! user's key material ([`CryptoError::is_key_error`]) or the message itself.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    /// File does not start with the private key file magic.
    #[error("Not a sealmail private key file (bad magic)")]
    InvalidMagic,

    #[error("Argon2id derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// AEAD tag mismatch, unwrap failure, or a malformed envelope field.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The detached signature does not cover this ciphertext under the
    /// sender's verifying key.
    #[error("Signature does not match ciphertext and sender key")]
    Verification,

    #[error("No key file at {}", .0.display())]
    KeyNotFound(PathBuf),

    /// The private key file did not open with the supplied password.
    #[error("Wrong password for private key")]
    WrongPassword,

    #[error("Unreadable key file: {0}")]
    InvalidKeyfile(String),

    #[error("Password must be at least {0} characters")]
    PassphraseTooShort(usize),

    /// Bad base64, wrong field length, or a missing envelope tag.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Key file JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CryptoError {
    /// True when the fault lies with key files or passwords, not with the
    /// message being sealed or opened.
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            CryptoError::KeyNotFound(_)
                | CryptoError::WrongPassword
                | CryptoError::InvalidKeyfile(_)
                | CryptoError::InvalidMagic
                | CryptoError::PassphraseTooShort(_)
        )
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
