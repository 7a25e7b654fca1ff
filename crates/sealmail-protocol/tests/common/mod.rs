//! Shared helpers for protocol integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sealmail_crypto::{CryptoError, CryptoResult, KeyResolver, Keypair, PrivateKey, PublicKey};
use sealmail_protocol::{OpenKeys, SealKeys};
use zeroize::Zeroizing;

pub const PASSWORD: &str = "open sesame please";

/// Key resolver over an in-memory key ring, keyed by path.
#[derive(Default)]
pub struct KeyRing {
    public: HashMap<PathBuf, PublicKey>,
    private: HashMap<PathBuf, PrivateKey>,
}

impl KeyRing {
    pub fn with_identities(names: &[(&str, &Keypair)]) -> Arc<Self> {
        let mut ring = KeyRing::default();
        for (name, keypair) in names {
            ring.public
                .insert(PathBuf::from(format!("{}.pub", name)), keypair.public.clone());
            ring.private
                .insert(PathBuf::from(format!("{}.key", name)), keypair.private.clone());
        }
        Arc::new(ring)
    }
}

impl KeyResolver for KeyRing {
    fn resolve_public(&self, path: &Path) -> CryptoResult<PublicKey> {
        self.public
            .get(path)
            .cloned()
            .ok_or_else(|| CryptoError::KeyNotFound(path.to_path_buf()))
    }

    fn resolve_private(&self, path: &Path, password: Option<&str>) -> CryptoResult<PrivateKey> {
        let key = self
            .private
            .get(path)
            .ok_or_else(|| CryptoError::KeyNotFound(path.to_path_buf()))?;
        if password != Some(PASSWORD) {
            return Err(CryptoError::WrongPassword);
        }
        Ok(key.clone())
    }
}

pub fn seal_keys(recipient: &str, sender: &str) -> SealKeys {
    SealKeys {
        recipient_public: format!("{}.pub", recipient).into(),
        sender_private: format!("{}.key", sender).into(),
        password: Some(Zeroizing::new(PASSWORD.to_string())),
    }
}

pub fn open_keys(sender: &str, recipient: &str) -> OpenKeys {
    OpenKeys {
        sender_public: format!("{}.pub", sender).into(),
        recipient_private: format!("{}.key", recipient).into(),
        password: Some(Zeroizing::new(PASSWORD.to_string())),
    }
}
