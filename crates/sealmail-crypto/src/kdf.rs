//! Argon2id derivation of the key that locks a private key file.
//!
//! The parameters travel in the key file header, so anything read back from
//! disk goes through [`KdfParams::check`] before Argon2 sees it. A tampered
//! header must not be able to ask for gigabytes of memory.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::{generate_random, AeadKey, CONTENT_KEY_LEN};
use crate::error::{CryptoError, CryptoResult};

/// Shortest password accepted when a private key file is written.
pub const MIN_PASSPHRASE_LENGTH: usize = 12;

/// Length of the salt stored in the key file header.
pub const SALT_LEN: usize = 32;

const MIN_MEMORY_KIB: u32 = 8 * 1024;
const MAX_MEMORY_KIB: u32 = 1024 * 1024;
const MAX_ITERATIONS: u32 = 16;
const MAX_PARALLELISM: u32 = 16;

/// Argon2id cost settings recorded in each key file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Lanes.
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// 64 MiB, 3 passes, 4 lanes.
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Cheaper settings for small machines and for tests.
    pub fn low_memory() -> Self {
        Self {
            memory_kib: 32 * 1024,
            iterations: 4,
            parallelism: 4,
        }
    }

    /// Reject cost settings outside the range this crate will run.
    pub fn check(&self) -> CryptoResult<()> {
        if !(MIN_MEMORY_KIB..=MAX_MEMORY_KIB).contains(&self.memory_kib) {
            return Err(CryptoError::KeyDerivation(format!(
                "memory cost {} KiB outside {}..={}",
                self.memory_kib, MIN_MEMORY_KIB, MAX_MEMORY_KIB
            )));
        }
        if self.iterations == 0 || self.iterations > MAX_ITERATIONS {
            return Err(CryptoError::KeyDerivation(format!(
                "iteration count {} outside 1..={}",
                self.iterations, MAX_ITERATIONS
            )));
        }
        if self.parallelism == 0 || self.parallelism > MAX_PARALLELISM {
            return Err(CryptoError::KeyDerivation(format!(
                "parallelism {} outside 1..={}",
                self.parallelism, MAX_PARALLELISM
            )));
        }
        Ok(())
    }
}

/// 256-bit file-locking key, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; 32],
}

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl AeadKey for DerivedKey {
    fn key_bytes(&self) -> &[u8; CONTENT_KEY_LEN] {
        &self.key
    }
}

/// Fresh salt for a new key file.
pub fn generate_salt() -> [u8; SALT_LEN] {
    generate_random()
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive the key that locks a private key file.
///
/// Fails with [`CryptoError::PassphraseTooShort`] before doing any work if the
/// password could never have been accepted, and with
/// [`CryptoError::KeyDerivation`] if `params` fail [`KdfParams::check`].
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> CryptoResult<DerivedKey> {
    if passphrase.len() < MIN_PASSPHRASE_LENGTH {
        return Err(CryptoError::PassphraseTooShort(MIN_PASSPHRASE_LENGTH));
    }
    params.check()?;

    let cost = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let mut key = [0u8; 32];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, cost)
        .hash_password_into(passphrase, salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(DerivedKey { key })
}

/// Check a new password before a key file is written with it.
pub fn validate_passphrase(passphrase: &str) -> CryptoResult<()> {
    if passphrase.len() < MIN_PASSPHRASE_LENGTH {
        return Err(CryptoError::PassphraseTooShort(MIN_PASSPHRASE_LENGTH));
    }
    Ok(())
}
