//! Mail model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a stored mail, unique per store.
pub type MailId = i64;

/// A mail accepted by DATA, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMail {
    pub sender: String,
    pub recipient: String,
    /// Body exactly as transferred: either plain text or a serialized envelope.
    pub body: String,
    pub received_at: DateTime<Utc>,
}

impl NewMail {
    /// Create a new mail stamped with the current time.
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, body: String) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            body,
            received_at: Utc::now(),
        }
    }
}

/// A stored mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mail {
    pub id: MailId,
    pub sender: String,
    pub recipient: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
}

impl Mail {
    /// Summary view used by LIST.
    pub fn summary(&self) -> MailSummary {
        MailSummary {
            id: self.id,
            sender: self.sender.clone(),
            recipient: self.recipient.clone(),
            received_at: self.received_at,
        }
    }
}

/// Mail metadata without the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailSummary {
    pub id: MailId,
    pub sender: String,
    pub recipient: String,
    pub received_at: DateTime<Utc>,
}

impl MailSummary {
    /// One LIST line: `<id> <sender> <received_at>` with no line terminator.
    pub fn to_line(&self) -> String {
        format!("{} {} {}", self.id, self.sender, self.received_at.to_rfc3339())
    }
}
