//! In-memory mail store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use sealmail_core::{Mail, MailId, MailStore, MailSummary, NewMail, Result};

#[derive(Debug, Default)]
struct Inner {
    next_id: MailId,
    mails: BTreeMap<MailId, Mail>,
}

/// Mail store held in process memory. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct MemoryMailStore {
    inner: RwLock<Inner>,
}

impl MemoryMailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored mails across all mailboxes.
    pub async fn len(&self) -> usize {
        self.inner.read().await.mails.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MailStore for MemoryMailStore {
    async fn store(&self, mail: NewMail) -> Result<MailId> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.mails.insert(
            id,
            Mail {
                id,
                sender: mail.sender,
                recipient: mail.recipient,
                body: mail.body,
                received_at: mail.received_at,
            },
        );
        debug!(subsystem = "store", component = "memory", op = "store", mail_id = id, "Mail stored");
        Ok(id)
    }

    async fn fetch_by_id(&self, recipient: &str, id: MailId) -> Result<Option<Mail>> {
        let inner = self.inner.read().await;
        Ok(inner
            .mails
            .get(&id)
            .filter(|m| m.recipient == recipient)
            .cloned())
    }

    async fn list_by_recipient(&self, recipient: &str) -> Result<Vec<MailSummary>> {
        let inner = self.inner.read().await;
        Ok(inner
            .mails
            .values()
            .filter(|m| m.recipient == recipient)
            .map(Mail::summary)
            .collect())
    }

    async fn delete(&self, recipient: &str, id: MailId) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let owned = inner
            .mails
            .get(&id)
            .is_some_and(|m| m.recipient == recipient);
        if owned {
            inner.mails.remove(&id);
        }
        Ok(owned)
    }
}
