//! Centralized default constants for sealmail.
//!
//! Protocol literals and tunables live here so the client, the server, and
//! the tests agree on them.

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Line ending used on the wire. Received lines may also end in `\r\n`.
pub const LINE_TERMINATOR: &str = "\n";

/// The single-period line that ends a plaintext body transfer.
pub const BODY_TERMINATOR: &str = ".";

/// Field delimiter inside request and response lines.
pub const FIELD_DELIMITER: char = ' ';

/// Largest stored body, and largest RETRIEVE notice a client will honour.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Longest line a channel will buffer, terminator included. A sealed body
/// keeps its ciphertext on one line, so this must hold a whole body plus
/// `\r\n`.
pub const MAX_LINE_BYTES: usize = MAX_BODY_BYTES + 2;

/// Response code for an accepted request.
pub const CODE_SUCCESS: &str = "SUCCESS";

/// Response code for a refused request.
pub const CODE_FAILURE: &str = "FAILURE";

// =============================================================================
// SERVER
// =============================================================================

/// Default listen host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const SERVER_PORT: u16 = 2525;

/// Maximum number of body lines accepted for one DATA transfer.
pub const MAX_BODY_LINES: usize = 10_000;

/// Default connection pool size for the PostgreSQL store.
pub const DB_MAX_CONNECTIONS: u32 = 10;

// =============================================================================
// CLIENT
// =============================================================================

/// Default host the client connects to.
pub const CLIENT_HOST: &str = "127.0.0.1";
