//! Checks that configuration defaults agree with the protocol defaults.

use sealmail_core::config::{ClientConfig, ServerConfig, StoreBackend};
use sealmail_core::defaults;

#[test]
fn test_server_and_client_share_default_port() {
    assert_eq!(ServerConfig::default().port, ClientConfig::default().port);
    assert_eq!(ServerConfig::default().port, defaults::SERVER_PORT);
}

#[test]
fn test_server_default_store_is_memory() {
    assert_eq!(ServerConfig::default().store, StoreBackend::Memory);
}

#[test]
fn test_server_default_body_limit() {
    assert_eq!(
        ServerConfig::default().max_body_lines,
        defaults::MAX_BODY_LINES
    );
    assert_eq!(
        ServerConfig::default().max_body_bytes,
        defaults::MAX_BODY_BYTES
    );
}
