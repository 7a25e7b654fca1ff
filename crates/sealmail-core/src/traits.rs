//! Persistence seam for delivered mail.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Mail, MailId, MailSummary, NewMail};

/// Repository for delivered mail, keyed by recipient and id.
///
/// Every lookup is scoped to a recipient: a mail id belonging to another
/// mailbox is reported as absent.
#[async_trait]
pub trait MailStore: Send + Sync {
    /// Persist a mail and return its assigned id.
    async fn store(&self, mail: NewMail) -> Result<MailId>;

    /// Fetch one mail; `None` when the id does not exist for this recipient.
    async fn fetch_by_id(&self, recipient: &str, id: MailId) -> Result<Option<Mail>>;

    /// Summaries of every mail for a recipient, oldest first.
    async fn list_by_recipient(&self, recipient: &str) -> Result<Vec<MailSummary>>;

    /// Delete one mail; returns whether anything was removed.
    async fn delete(&self, recipient: &str, id: MailId) -> Result<bool>;
}
