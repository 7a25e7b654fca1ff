//! # sealmail-crypto
//!
//! Secure envelopes for sealmail: hybrid encryption of a mail body with a
//! detached signature over the ciphertext.
//!
//! ## Cryptographic Primitives
//!
//! - **Content cipher**: AES-256-GCM with a fresh key and 12-byte IV per message
//! - **Key wrap**: ephemeral X25519 + HKDF-SHA256, content key sealed with AES-256-GCM
//! - **Signature**: Ed25519 over the ciphertext
//! - **Private key storage**: Argon2id + AES-256-GCM (`SMKEY001` files)
//!
//! ## Envelope Body
//!
//! ```text
//! SM1-SIG <base64>
//! SM1-IV <base64>
//! SM1-KEY <base64>
//! SM1-DATA <base64>
//! ```
//!
//! ## Examples
//!
//! ```rust
//! use sealmail_crypto::{open, seal, Keypair, SecureEnvelope};
//!
//! let alice = Keypair::generate();
//! let bob = Keypair::generate();
//!
//! let envelope = seal(b"Lunch at noon?", &bob.public, &alice.private).unwrap();
//! let body = envelope.to_body();
//! assert!(SecureEnvelope::is_envelope(&body));
//!
//! let parsed = SecureEnvelope::from_lines(&body).unwrap();
//! let plaintext = open(&parsed, &alice.public, &bob.private).unwrap();
//! assert_eq!(plaintext, b"Lunch at noon?");
//! ```

pub mod cipher;
pub mod envelope;
pub mod error;
pub mod format;
pub mod kdf;
pub mod key_storage;
pub mod keys;
pub mod resolver;
pub mod signing;
pub mod wrap;

pub use envelope::{decrypt_verified, open, seal, verify, SecureEnvelope};
pub use error::{CryptoError, CryptoResult};
pub use format::{base64_decode, base64_encode};
pub use kdf::{derive_key, validate_passphrase, DerivedKey, KdfParams};
pub use keys::{
    load_private_key, load_public_key, save_private_key, save_public_key, Keypair, PrivateKey,
    PublicKey,
};
pub use resolver::{FileKeyResolver, KeyResolver};
