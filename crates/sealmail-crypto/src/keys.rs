//! Mail identity keys: X25519 for key wrapping, Ed25519 for signatures.
//!
//! A sealmail identity is two key pairs bundled together. The recipient's
//! X25519 public key wraps the content key of every envelope addressed to
//! them; the sender's Ed25519 secret signs the ciphertext.
//!
//! # Files
//!
//! - Public keys are plaintext JSON (`version`, `encryption_key`,
//!   `verifying_key`, optional `label`) or a bare base64 string of the 64
//!   concatenated public bytes.
//! - Private keys are passphrase-protected, see [`crate::key_storage`].

use std::path::Path;

use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::generate_random;
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode, base64_encode};
use crate::kdf::KdfParams;
use crate::key_storage::{decrypt_private_key, encrypt_private_key, PRIVATE_KEY_LEN};

/// Length of the concatenated public key bytes.
pub const PUBLIC_KEY_LEN: usize = 64;

/// Public half of a mail identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    #[serde(with = "base64_key")]
    encryption_key: [u8; 32],
    #[serde(with = "base64_key")]
    verifying_key: [u8; 32],
}

impl PublicKey {
    /// Create a public key from its two raw components.
    pub fn from_parts(encryption_key: [u8; 32], verifying_key: [u8; 32]) -> Self {
        Self {
            encryption_key,
            verifying_key,
        }
    }

    /// Create a public key from 64 concatenated bytes (X25519 then Ed25519).
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(CryptoError::InvalidKeyfile(format!(
                "Expected {} bytes, got {}",
                PUBLIC_KEY_LEN,
                bytes.len()
            )));
        }
        let mut encryption_key = [0u8; 32];
        let mut verifying_key = [0u8; 32];
        encryption_key.copy_from_slice(&bytes[..32]);
        verifying_key.copy_from_slice(&bytes[32..]);
        Ok(Self::from_parts(encryption_key, verifying_key))
    }

    /// The 64 concatenated public bytes.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        let mut out = [0u8; PUBLIC_KEY_LEN];
        out[..32].copy_from_slice(&self.encryption_key);
        out[32..].copy_from_slice(&self.verifying_key);
        out
    }

    /// Raw X25519 key-wrapping key.
    pub fn encryption_key(&self) -> &[u8; 32] {
        &self.encryption_key
    }

    /// Raw Ed25519 verifying key.
    pub fn verifying_key(&self) -> &[u8; 32] {
        &self.verifying_key
    }

    pub(crate) fn to_x25519(&self) -> X25519Public {
        X25519Public::from(self.encryption_key)
    }

    pub(crate) fn to_ed25519(&self) -> CryptoResult<VerifyingKey> {
        VerifyingKey::from_bytes(&self.verifying_key)
            .map_err(|e| CryptoError::InvalidKeyfile(format!("Invalid verifying key: {}", e)))
    }

    /// Short hex fingerprint for display and logs.
    pub fn fingerprint(&self) -> String {
        self.verifying_key[..8]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.fingerprint())
    }
}

/// Secret half of a mail identity, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    encryption_secret: [u8; 32],
    signing_secret: [u8; 32],
}

impl PrivateKey {
    /// Create a private key from 64 concatenated bytes (X25519 then Ed25519).
    pub fn from_bytes(bytes: &[u8; PRIVATE_KEY_LEN]) -> Self {
        let mut encryption_secret = [0u8; 32];
        let mut signing_secret = [0u8; 32];
        encryption_secret.copy_from_slice(&bytes[..32]);
        signing_secret.copy_from_slice(&bytes[32..]);
        Self {
            encryption_secret,
            signing_secret,
        }
    }

    /// The 64 concatenated secret bytes. Callers must zeroize the copy.
    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_LEN] {
        let mut out = [0u8; PRIVATE_KEY_LEN];
        out[..32].copy_from_slice(&self.encryption_secret);
        out[32..].copy_from_slice(&self.signing_secret);
        out
    }

    pub(crate) fn to_x25519(&self) -> StaticSecret {
        StaticSecret::from(self.encryption_secret)
    }

    pub(crate) fn to_ed25519(&self) -> SigningKey {
        SigningKey::from_bytes(&self.signing_secret)
    }

    /// Derive the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        let encryption = X25519Public::from(&self.to_x25519());
        let verifying = self.to_ed25519().verifying_key();
        PublicKey::from_parts(*encryption.as_bytes(), verifying.to_bytes())
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// A complete mail identity.
pub struct Keypair {
    /// The public key (can be shared).
    pub public: PublicKey,
    /// The private key (must be kept secret).
    pub private: PrivateKey,
}

impl Keypair {
    /// Generate a new random identity.
    pub fn generate() -> Self {
        let mut secret: [u8; PRIVATE_KEY_LEN] = generate_random();
        let private = PrivateKey::from_bytes(&secret);
        secret.zeroize();
        Self::from_private(private)
    }

    /// Create a keypair from an existing private key.
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { public, private }
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public)
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// Public key file format (plaintext JSON).
#[derive(Serialize, Deserialize)]
struct PublicKeyFile {
    version: u8,
    #[serde(flatten)]
    public_key: PublicKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

/// Save a private key to a file, encrypted with a passphrase.
///
/// # Errors
///
/// Returns an error if the passphrase is shorter than 12 characters or the
/// file cannot be written.
pub fn save_private_key(key: &PrivateKey, path: &Path, passphrase: &str) -> CryptoResult<()> {
    save_private_key_with_params(key, path, passphrase, KdfParams::default())
}

/// Save a private key with explicit Argon2id parameters.
pub fn save_private_key_with_params(
    key: &PrivateKey,
    path: &Path,
    passphrase: &str,
    params: KdfParams,
) -> CryptoResult<()> {
    let mut secret = key.to_bytes();
    let encrypted = encrypt_private_key(&secret, passphrase, params);
    secret.zeroize();
    std::fs::write(path, encrypted?)?;
    Ok(())
}

/// Load a private key from an encrypted file.
///
/// # Errors
///
/// - [`CryptoError::KeyNotFound`] when the file does not exist
/// - [`CryptoError::WrongPassword`] when the passphrase does not unlock it
/// - [`CryptoError::InvalidMagic`] / [`CryptoError::InvalidKeyfile`] for
///   anything that is not a sealmail private key file
pub fn load_private_key(path: &Path, passphrase: &str) -> CryptoResult<PrivateKey> {
    let encrypted = read_key_file(path)?;
    let mut bytes = decrypt_private_key(&encrypted, passphrase)?;
    let key = PrivateKey::from_bytes(&bytes);
    bytes.zeroize();
    Ok(key)
}

/// Save a public key to a file (plaintext JSON).
pub fn save_public_key(key: &PublicKey, path: &Path, label: Option<&str>) -> CryptoResult<()> {
    let file = PublicKeyFile {
        version: 1,
        public_key: key.clone(),
        label: label.map(String::from),
    };
    let json = serde_json::to_string_pretty(&file)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a public key from a file.
///
/// Supports both the JSON format (created by `save_public_key`) and a raw
/// base64 encoding of the 64 public bytes.
pub fn load_public_key(path: &Path) -> CryptoResult<PublicKey> {
    let contents = String::from_utf8(read_key_file(path)?)
        .map_err(|_| CryptoError::InvalidKeyfile("Public key file is not UTF-8".to_string()))?;

    // Try JSON format first
    if let Ok(file) = serde_json::from_str::<PublicKeyFile>(&contents) {
        return Ok(file.public_key);
    }

    // Try raw base64
    let cleaned: String = contents.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes =
        base64_decode(&cleaned).map_err(|e| CryptoError::InvalidKeyfile(e.to_string()))?;
    PublicKey::from_bytes(&bytes)
}

/// Encode a public key as the raw base64 file form.
pub fn encode_public_key(key: &PublicKey) -> String {
    base64_encode(&key.to_bytes())
}

fn read_key_file(path: &Path) -> CryptoResult<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CryptoError::KeyNotFound(path.to_path_buf()))
        }
        Err(e) => Err(CryptoError::Io(e)),
    }
}

/// Serde helper for base64-encoded 32-byte keys.
mod base64_key {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&crate::format::base64_encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        crate::format::base64_decode_array(&s, "public key").map_err(serde::de::Error::custom)
    }
}
