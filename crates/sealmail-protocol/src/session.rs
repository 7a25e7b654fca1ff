//! Client session engine.
//!
//! Drives one [`Channel`] through the send, list and retrieve exchanges.
//!
//! ```text
//! send:      Idle -> AwaitingBody -> Securing -> Transmitting -> AwaitingAck -> Idle
//! list:      Idle -> Requesting -> AwaitingBody -> Presenting -> Idle
//! retrieve:  Idle -> Requesting -> AwaitingBody -> Presenting -> Idle
//! ```
//!
//! A secure send resolves keys and seals the body before the first byte is
//! written. Any failure up to that point returns with the channel untouched.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use sealmail_core::defaults::{BODY_TERMINATOR, MAX_BODY_BYTES};
use sealmail_crypto::{decrypt_verified, seal, verify, CryptoError, KeyResolver, SecureEnvelope};

use crate::channel::Channel;
use crate::codec::{Command, Request, Response};
use crate::error::{ProtocolError, ProtocolResult};

/// Where the engine is within the current exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingBody,
    Securing,
    Transmitting,
    AwaitingAck,
    Requesting,
    Presenting,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingBody => "awaiting_body",
            SessionState::Securing => "securing",
            SessionState::Transmitting => "transmitting",
            SessionState::AwaitingAck => "awaiting_ack",
            SessionState::Requesting => "requesting",
            SessionState::Presenting => "presenting",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collects body lines up to the terminator line.
#[derive(Debug, Default)]
pub struct BodyCollector {
    lines: Vec<String>,
    complete: bool,
}

impl BodyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns `true` once the terminator has been seen;
    /// lines after that are ignored.
    pub fn push(&mut self, line: &str) -> bool {
        if self.complete {
            return true;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line == BODY_TERMINATOR {
            self.complete = true;
        } else {
            self.lines.push(line.to_string());
        }
        self.complete
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The collected lines joined with `\n`, without the terminator.
    pub fn into_body(self) -> String {
        self.lines.join("\n")
    }
}

/// Collect a body from `lines`. `None` if the terminator never appears.
pub fn collect_body<I, T>(lines: I) -> Option<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut collector = BodyCollector::new();
    for line in lines {
        if collector.push(line.as_ref()) {
            return Some(collector.into_body());
        }
    }
    None
}

/// Key locations for sealing an outbound body.
#[derive(Clone)]
pub struct SealKeys {
    pub recipient_public: PathBuf,
    pub sender_private: PathBuf,
    pub password: Option<Zeroizing<String>>,
}

impl fmt::Debug for SealKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealKeys")
            .field("recipient_public", &self.recipient_public)
            .field("sender_private", &self.sender_private)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Key locations for opening a retrieved envelope.
#[derive(Clone)]
pub struct OpenKeys {
    pub sender_public: PathBuf,
    pub recipient_private: PathBuf,
    pub password: Option<Zeroizing<String>>,
}

impl fmt::Debug for OpenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenKeys")
            .field("sender_public", &self.sender_public)
            .field("recipient_private", &self.recipient_private)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Result of preparing an outbound body. No I/O has happened yet.
#[derive(Debug)]
pub enum SealOutcome {
    Sealed(SecureEnvelope),
    /// A key could not be loaded.
    KeyError(CryptoError),
    /// Key material loaded but sealing failed.
    CipherError(CryptoError),
}

/// Resolve keys and seal `body`.
pub fn seal_body(body: &str, keys: &SealKeys, resolver: &dyn KeyResolver) -> SealOutcome {
    let recipient = match resolver.resolve_public(&keys.recipient_public) {
        Ok(key) => key,
        Err(e) => return SealOutcome::KeyError(e),
    };
    let password = keys.password.as_ref().map(|p| p.as_str());
    let sender = match resolver.resolve_private(&keys.sender_private, password) {
        Ok(key) => key,
        Err(e) => return SealOutcome::KeyError(e),
    };
    match seal(body.as_bytes(), &recipient, &sender) {
        Ok(envelope) => SealOutcome::Sealed(envelope),
        Err(e) if e.is_key_error() => SealOutcome::KeyError(e),
        Err(e) => SealOutcome::CipherError(e),
    }
}

/// Result of a secure send.
#[derive(Debug)]
pub enum SendOutcome {
    /// The body was transmitted; this is the server's final answer, whatever its code.
    Acknowledged(Response),
    /// The server refused DATA; no body was sent.
    Refused(Response),
    /// Key resolution failed; nothing was sent.
    KeyError(CryptoError),
    /// Sealing failed; nothing was sent.
    CipherError(CryptoError),
}

/// Result of LIST.
#[derive(Debug)]
pub enum ListOutcome {
    /// `summaries` is the `count` received lines concatenated, terminators kept.
    Listed {
        response: Response,
        count: usize,
        summaries: String,
    },
    Rejected(Response),
}

/// How a retrieved body should be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// Not an envelope.
    Plain(String),
    /// Envelope verified and decrypted.
    Decrypted(String),
    /// Raw envelope body; the signature did not verify.
    SignatureInvalid { raw: String, reason: String },
    /// Raw envelope body; keys were unavailable or decryption failed.
    DecryptionFailed { raw: String, reason: String },
}

impl Presentation {
    /// Warning label for fallback presentations.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Presentation::Plain(_) | Presentation::Decrypted(_) => None,
            Presentation::SignatureInvalid { .. } => Some("signature invalid"),
            Presentation::DecryptionFailed { .. } => Some("decryption failed"),
        }
    }

    /// The text to display.
    pub fn text(&self) -> &str {
        match self {
            Presentation::Plain(text) | Presentation::Decrypted(text) => text,
            Presentation::SignatureInvalid { raw, .. }
            | Presentation::DecryptionFailed { raw, .. } => raw,
        }
    }
}

/// Result of RETRIEVE.
#[derive(Debug)]
pub enum RetrieveOutcome {
    Presented {
        response: Response,
        presentation: Presentation,
    },
    Rejected(Response),
}

/// Client side of one connection.
pub struct Session<S> {
    channel: Channel<S>,
    resolver: Arc<dyn KeyResolver>,
    state: SessionState,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, resolver: Arc<dyn KeyResolver>) -> Self {
        Self::from_channel(Channel::new(stream), resolver)
    }

    pub fn from_channel(channel: Channel<S>, resolver: Arc<dyn KeyResolver>) -> Self {
        Self {
            channel,
            resolver,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn channel(&self) -> &Channel<S> {
        &self.channel
    }

    pub fn into_channel(self) -> Channel<S> {
        self.channel
    }

    /// Send a single-line command and return its response.
    ///
    /// DATA, LIST and RETRIEVE carry follow-up lines and must go through
    /// [`Session::send_secure`], [`Session::list`] and [`Session::retrieve`].
    pub async fn execute(&mut self, request: &Request) -> ProtocolResult<Response> {
        if matches!(
            request.known_command(),
            Some(Command::Data | Command::List | Command::Retrieve)
        ) {
            return Err(ProtocolError::MalformedRequest(format!(
                "{} cannot be executed as a single-line command",
                request.keyword()
            )));
        }
        self.channel.send_request(request).await?;
        let response = self.channel.receive_response().await?;
        debug!(
            subsystem = "client",
            component = "session",
            op = "execute",
            command = %request.keyword(),
            code = %response.code(),
            "Command completed"
        );
        Ok(response)
    }

    /// Seal `body` and transmit it with DATA.
    ///
    /// Keys are resolved and the envelope is built before anything is
    /// written. If that fails the outcome is `KeyError`/`CipherError` and the
    /// channel has not been touched.
    pub async fn send_secure(
        &mut self,
        body: &str,
        keys: &SealKeys,
    ) -> ProtocolResult<SendOutcome> {
        let start = Instant::now();
        let result = self.send_secure_inner(body, keys).await;
        self.transition(SessionState::Idle);

        if let Ok(outcome) = &result {
            info!(
                subsystem = "client",
                component = "session",
                op = "send",
                outcome = send_outcome_name(outcome),
                duration_ms = start.elapsed().as_millis() as u64,
                "Secure send finished"
            );
        }
        result
    }

    async fn send_secure_inner(
        &mut self,
        body: &str,
        keys: &SealKeys,
    ) -> ProtocolResult<SendOutcome> {
        self.transition(SessionState::AwaitingBody);
        self.transition(SessionState::Securing);

        let envelope = match seal_body(body, keys, self.resolver.as_ref()) {
            SealOutcome::Sealed(envelope) => envelope,
            SealOutcome::KeyError(e) => {
                warn!(
                    subsystem = "client",
                    component = "session",
                    op = "send",
                    error = %e,
                    "Key resolution failed, nothing sent"
                );
                return Ok(SendOutcome::KeyError(e));
            }
            SealOutcome::CipherError(e) => {
                warn!(
                    subsystem = "client",
                    component = "session",
                    op = "send",
                    error = %e,
                    "Sealing failed, nothing sent"
                );
                return Ok(SendOutcome::CipherError(e));
            }
        };

        self.transition(SessionState::Transmitting);
        self.channel
            .send_request(&Request::command(Command::Data))
            .await?;
        let response = self.channel.receive_response().await?;
        if !response.is_success() {
            return Ok(SendOutcome::Refused(response));
        }

        let lines = envelope.to_lines();
        for line in &lines {
            self.channel.send_request(&Request::raw(line.as_str())).await?;
        }
        self.channel.send_request(&Request::terminator()).await?;
        debug!(
            subsystem = "client",
            component = "session",
            op = "send",
            line_count = lines.len(),
            "Envelope transmitted"
        );

        self.transition(SessionState::AwaitingAck);
        let ack = self.channel.receive_response().await?;
        Ok(SendOutcome::Acknowledged(ack))
    }

    /// LIST: read exactly `notice` summary lines.
    pub async fn list(&mut self) -> ProtocolResult<ListOutcome> {
        let result = self.list_inner().await;
        self.transition(SessionState::Idle);
        result
    }

    async fn list_inner(&mut self) -> ProtocolResult<ListOutcome> {
        self.transition(SessionState::Requesting);
        self.channel
            .send_request(&Request::command(Command::List))
            .await?;
        let response = self.channel.receive_response().await?;
        if !response.is_success() {
            return Ok(ListOutcome::Rejected(response));
        }

        let count = response.notice_count()?;
        self.transition(SessionState::AwaitingBody);
        let mut summaries = String::new();
        for _ in 0..count {
            summaries.push_str(&self.channel.receive_line().await?);
        }

        self.transition(SessionState::Presenting);
        debug!(
            subsystem = "client",
            component = "session",
            op = "list",
            line_count = count,
            "Summaries received"
        );
        Ok(ListOutcome::Listed {
            response,
            count,
            summaries,
        })
    }

    /// RETRIEVE `id` and decide how to present the body.
    ///
    /// `keys` is only called when the body is an envelope. The sender's
    /// public key is resolved and checked before the recipient's private key
    /// is touched.
    pub async fn retrieve<F>(&mut self, id: &str, keys: F) -> ProtocolResult<RetrieveOutcome>
    where
        F: FnOnce() -> Option<OpenKeys>,
    {
        let result = self.retrieve_inner(id, keys).await;
        self.transition(SessionState::Idle);
        result
    }

    async fn retrieve_inner<F>(&mut self, id: &str, keys: F) -> ProtocolResult<RetrieveOutcome>
    where
        F: FnOnce() -> Option<OpenKeys>,
    {
        self.transition(SessionState::Requesting);
        self.channel
            .send_request(&Request::with_argument(Command::Retrieve, id))
            .await?;
        let response = self.channel.receive_response().await?;
        if !response.is_success() {
            return Ok(RetrieveOutcome::Rejected(response));
        }

        self.transition(SessionState::AwaitingBody);
        let raw = self.read_counted_body(response.notice_count()?).await?;

        self.transition(SessionState::Presenting);
        let presentation = self.present(raw, keys);
        if let Some(label) = presentation.label() {
            warn!(
                subsystem = "client",
                component = "session",
                op = "retrieve",
                mail_id = %id,
                fallback = label,
                "Showing raw body"
            );
        }
        Ok(RetrieveOutcome::Presented {
            response,
            presentation,
        })
    }

    /// Byte-counted read: the body is `notice` bytes plus one terminator
    /// byte. Whole lines are consumed until the count is exhausted; the last
    /// line may overshoot.
    ///
    /// A notice above [`MAX_BODY_BYTES`] is refused before anything is read.
    async fn read_counted_body(&mut self, notice: usize) -> ProtocolResult<String> {
        if notice > MAX_BODY_BYTES {
            warn!(
                subsystem = "client",
                component = "session",
                op = "retrieve",
                notice,
                limit = MAX_BODY_BYTES,
                "Announced body too large"
            );
            return Err(ProtocolError::InvalidNotice(notice.to_string()));
        }
        let mut remaining = i64::try_from(notice)
            .map_err(|_| ProtocolError::InvalidNotice(notice.to_string()))?
            + 1;
        let mut raw = String::new();
        let mut lines = 0usize;

        while remaining > 0 {
            let line = self.channel.receive_line().await?;
            remaining -= line.len() as i64;
            raw.push_str(&line);
            lines += 1;
        }

        debug!(
            subsystem = "client",
            component = "session",
            op = "retrieve",
            byte_count = raw.len(),
            line_count = lines,
            "Body received"
        );

        if raw.ends_with('\n') {
            raw.pop();
        }
        Ok(raw)
    }

    fn present<F>(&self, body: String, keys: F) -> Presentation
    where
        F: FnOnce() -> Option<OpenKeys>,
    {
        let Ok(envelope) = SecureEnvelope::from_lines(&body) else {
            return Presentation::Plain(body);
        };

        let Some(keys) = keys() else {
            return Presentation::DecryptionFailed {
                raw: body,
                reason: "No keys supplied".to_string(),
            };
        };

        let sender = match self.resolver.resolve_public(&keys.sender_public) {
            Ok(key) => key,
            Err(e) => {
                return Presentation::DecryptionFailed {
                    raw: body,
                    reason: e.to_string(),
                }
            }
        };
        if let Err(e) = verify(&envelope, &sender) {
            return Presentation::SignatureInvalid {
                raw: body,
                reason: e.to_string(),
            };
        }

        let password = keys.password.as_ref().map(|p| p.as_str());
        let recipient = match self.resolver.resolve_private(&keys.recipient_private, password) {
            Ok(key) => key,
            Err(e) => {
                return Presentation::DecryptionFailed {
                    raw: body,
                    reason: e.to_string(),
                }
            }
        };
        match decrypt_verified(&envelope, &recipient) {
            Ok(plaintext) => Presentation::Decrypted(String::from_utf8_lossy(&plaintext).into_owned()),
            Err(e) => Presentation::DecryptionFailed {
                raw: body,
                reason: e.to_string(),
            },
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(
                subsystem = "client",
                component = "session",
                from = %self.state,
                state = %next,
                "State transition"
            );
            self.state = next;
        }
    }
}

fn send_outcome_name(outcome: &SendOutcome) -> &'static str {
    match outcome {
        SendOutcome::Acknowledged(r) if r.is_success() => "acknowledged",
        SendOutcome::Acknowledged(_) => "acknowledged_failure",
        SendOutcome::Refused(_) => "refused",
        SendOutcome::KeyError(_) => "key_error",
        SendOutcome::CipherError(_) => "cipher_error",
    }
}
