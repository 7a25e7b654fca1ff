//! Structured logging field names for sealmail.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, fallback applied (raw body shown, mail refused) |
//! | INFO  | Lifecycle events (listen, accept, disconnect), operation completions |
//! | DEBUG | Session state transitions, decision points |
//! | TRACE | Per-line traffic on a channel |
//!
//! Mail bodies, key bytes, and passwords are never logged at any level.

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "server", "client", "crypto", "store"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "channel", "session", "processor", "envelope", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "send", "list", "retrieve", "seal", "open"
pub const OPERATION: &str = "op";

/// Remote peer address of a connection.
pub const PEER: &str = "peer";

// ─── Protocol fields ───────────────────────────────────────────────────────

/// Protocol command keyword (DATA, LIST, ...).
pub const COMMAND: &str = "command";

/// Response code (SUCCESS / FAILURE).
pub const RESPONSE_CODE: &str = "code";

/// Session state after a transition.
pub const STATE: &str = "state";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Mailbox owner or recipient address.
pub const RECIPIENT: &str = "recipient";

/// Sender address.
pub const SENDER: &str = "sender";

/// Stored mail id.
pub const MAIL_ID: &str = "mail_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of bytes read or written.
pub const BYTE_COUNT: &str = "byte_count";

/// Number of lines read or written.
pub const LINE_COUNT: &str = "line_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
