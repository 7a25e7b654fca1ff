//! Key resolution capability.
//!
//! The session engine never touches the filesystem itself; it asks a
//! [`KeyResolver`] for key material given a path and an optional password.

use std::path::Path;

use tracing::debug;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{load_private_key, load_public_key, PrivateKey, PublicKey};

/// Loads key material for seal/open operations.
pub trait KeyResolver: Send + Sync {
    /// Resolve a public key.
    fn resolve_public(&self, path: &Path) -> CryptoResult<PublicKey>;

    /// Resolve a private key, unlocking it with `password` when given.
    fn resolve_private(&self, path: &Path, password: Option<&str>) -> CryptoResult<PrivateKey>;
}

/// Resolves keys from files written by `sealmail-keygen`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileKeyResolver;

impl FileKeyResolver {
    pub fn new() -> Self {
        Self
    }
}

impl KeyResolver for FileKeyResolver {
    fn resolve_public(&self, path: &Path) -> CryptoResult<PublicKey> {
        let key = load_public_key(path)?;
        debug!(
            subsystem = "crypto",
            component = "resolver",
            op = "resolve_public",
            path = %path.display(),
            fingerprint = %key.fingerprint(),
            "Resolved public key"
        );
        Ok(key)
    }

    fn resolve_private(&self, path: &Path, password: Option<&str>) -> CryptoResult<PrivateKey> {
        // Private key files are always passphrase-protected.
        let password = password.ok_or(CryptoError::WrongPassword)?;
        let key = load_private_key(path, password)?;
        debug!(
            subsystem = "crypto",
            component = "resolver",
            op = "resolve_private",
            path = %path.display(),
            "Resolved private key"
        );
        Ok(key)
    }
}
