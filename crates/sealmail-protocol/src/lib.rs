//! # sealmail-protocol
//!
//! The sealmail line protocol: wire codec, the [`Channel`] that owns a
//! connection's stream, the client [`Session`] engine, and the server's
//! per-connection [`ConnectionProcessor`].
//!
//! ## Exchanges
//!
//! ```text
//! C: DATA                      C: LIST                  C: RETRIEVE 7
//! S: SUCCESS 0 Send body ...   S: SUCCESS 2 2 mails     S: SUCCESS 40 Mail follows
//! C: SM1-SIG ...               S: 3 alice 2024-...      S: <40 body bytes>\n
//! C: SM1-IV ...                S: 7 carol 2024-...
//! C: SM1-KEY ...
//! C: SM1-DATA ...
//! C: .
//! S: SUCCESS 7 Mail stored
//! ```
//!
//! Each connection gets its own channel and engine; nothing is shared
//! between connections except the mail store.

pub mod channel;
pub mod codec;
pub mod error;
pub mod server;
pub mod session;

pub use channel::Channel;
pub use codec::{Command, Request, Response, ResponseCode};
pub use error::{ProtocolError, ProtocolResult};
pub use server::{ConnectionProcessor, ProcessorSettings};
pub use session::{
    collect_body, seal_body, BodyCollector, ListOutcome, OpenKeys, Presentation, RetrieveOutcome,
    SealKeys, SealOutcome, SendOutcome, Session, SessionState,
};
