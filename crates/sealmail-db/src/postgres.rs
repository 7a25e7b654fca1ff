//! PostgreSQL mail store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use tracing::{debug, info};

use sealmail_core::{Error, Mail, MailId, MailStore, MailSummary, NewMail, Result};

/// Schema for the `mails` table. Idempotent.
pub const SCHEMA: &str = include_str!("../migrations/0001_create_mails.sql");

#[derive(Debug, sqlx::FromRow)]
struct MailRow {
    id: i64,
    sender: String,
    recipient: String,
    body: String,
    received_at: DateTime<Utc>,
}

impl From<MailRow> for Mail {
    fn from(row: MailRow) -> Self {
        Mail {
            id: row.id,
            sender: row.sender,
            recipient: row.recipient,
            body: row.body,
            received_at: row.received_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: i64,
    sender: String,
    recipient: String,
    received_at: DateTime<Utc>,
}

impl From<SummaryRow> for MailSummary {
    fn from(row: SummaryRow) -> Self {
        MailSummary {
            id: row.id,
            sender: row.sender,
            recipient: row.recipient,
            received_at: row.received_at,
        }
    }
}

/// PostgreSQL implementation of [`MailStore`].
pub struct PgMailStore {
    pool: Pool<Postgres>,
}

impl PgMailStore {
    /// Create a new PgMailStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create the `mails` table and its index if they do not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        info!(subsystem = "store", component = "postgres", op = "ensure_schema", "Mail schema ready");
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl MailStore for PgMailStore {
    async fn store(&self, mail: NewMail) -> Result<MailId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO mails (sender, recipient, body, received_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&mail.sender)
        .bind(&mail.recipient)
        .bind(&mail.body)
        .bind(mail.received_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(subsystem = "store", component = "postgres", op = "store", mail_id = id, "Mail stored");
        Ok(id)
    }

    async fn fetch_by_id(&self, recipient: &str, id: MailId) -> Result<Option<Mail>> {
        let row = sqlx::query_as::<_, MailRow>(
            r#"
            SELECT id, sender, recipient, body, received_at
            FROM mails
            WHERE recipient = $1 AND id = $2
            "#,
        )
        .bind(recipient)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Mail::from))
    }

    async fn list_by_recipient(&self, recipient: &str) -> Result<Vec<MailSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT id, sender, recipient, received_at
            FROM mails
            WHERE recipient = $1
            ORDER BY id
            "#,
        )
        .bind(recipient)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(MailSummary::from).collect())
    }

    async fn delete(&self, recipient: &str, id: MailId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM mails WHERE recipient = $1 AND id = $2")
            .bind(recipient)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
