//! TCP accept loop: one processor per connection.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{info, warn};

use sealmail_core::MailStore;
use sealmail_protocol::{ConnectionProcessor, ProcessorSettings};

/// Pause after an accept failure that is not tied to a single connection,
/// such as running out of file descriptors.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections until `shutdown` resolves.
///
/// Connections already being served keep running on their own tasks. A
/// failed accept is logged and the loop carries on.
pub async fn serve<F>(
    listener: TcpListener,
    store: Arc<dyn MailStore>,
    settings: ProcessorSettings,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        let pause = accept_retry_delay(&e);
                        warn!(
                            subsystem = "server",
                            component = "listener",
                            error = %e,
                            retry_in_ms = pause.as_millis() as u64,
                            "Accept failed"
                        );
                        if !pause.is_zero() {
                            tokio::time::sleep(pause).await;
                        }
                        continue;
                    }
                };
                let peer = addr.to_string();
                info!(subsystem = "server", component = "listener", peer = %peer, "Connection accepted");

                let processor =
                    ConnectionProcessor::new(stream, store.clone(), settings.clone(), peer.clone());
                tokio::spawn(async move {
                    if let Err(e) = processor.run().await {
                        warn!(
                            subsystem = "server",
                            component = "listener",
                            peer = %peer,
                            error = %e,
                            "Connection ended with error"
                        );
                    }
                });
            }
            _ = &mut shutdown => {
                info!(subsystem = "server", component = "listener", "Shutdown requested, no longer accepting");
                return Ok(());
            }
        }
    }
}

/// How long to wait before accepting again after `err`.
///
/// Errors that belong to one half-open connection are retried at once;
/// anything else (EMFILE, ENFILE, ENOBUFS) would fail again immediately.
pub fn accept_retry_delay(err: &io::Error) -> Duration {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::Interrupted
        | io::ErrorKind::WouldBlock => Duration::ZERO,
        _ => ACCEPT_BACKOFF,
    }
}
