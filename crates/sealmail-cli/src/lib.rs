//! # sealmail-cli
//!
//! Support code for the `sealmail-server` and `sealmail-client` binaries:
//! logging setup, the TCP accept loop, and console prompts.

pub mod console;
pub mod logging;
pub mod server;

pub use console::Console;
pub use logging::init_logging;
pub use server::serve;
