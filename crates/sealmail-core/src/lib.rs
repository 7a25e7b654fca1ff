//! # sealmail-core
//!
//! Core types, traits, and configuration shared by the sealmail crates.
//!
//! This crate holds the pieces every other crate agrees on: the error type,
//! the mail model and the `MailStore` persistence seam, protocol defaults,
//! environment configuration, and the structured logging field names.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{ClientConfig, ServerConfig, StoreBackend};
pub use error::{Error, Result};
pub use models::{Mail, MailId, MailSummary, NewMail};
pub use traits::MailStore;
