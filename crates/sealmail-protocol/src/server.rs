//! Server-side command processor for one connection.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use sealmail_core::defaults::{BODY_TERMINATOR, MAX_BODY_BYTES, MAX_BODY_LINES, MAX_LINE_BYTES};
use sealmail_core::{MailId, MailStore, NewMail, ServerConfig};

use crate::channel::Channel;
use crate::codec::{Command, Request, Response};
use crate::error::{ProtocolError, ProtocolResult};

/// Per-connection limits.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub max_body_lines: usize,
    /// Cap on a stored body, `\n` separators included.
    pub max_body_bytes: usize,
    /// Cap on any single received line, terminator included.
    pub max_line_bytes: usize,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            max_body_lines: MAX_BODY_LINES,
            max_body_bytes: MAX_BODY_BYTES,
            max_line_bytes: MAX_LINE_BYTES,
        }
    }
}

impl ProcessorSettings {
    /// Limits from the server configuration. One line may carry a whole
    /// body plus `\r\n`.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_body_lines: config.max_body_lines,
            max_body_bytes: config.max_body_bytes,
            max_line_bytes: config.max_body_bytes.saturating_add(2),
        }
    }
}

/// Why a DATA body was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overflow {
    Lines,
    Bytes,
}

/// Whether the connection continues after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Serves one connection until QUIT or disconnect.
pub struct ConnectionProcessor<S> {
    channel: Channel<S>,
    store: Arc<dyn MailStore>,
    settings: ProcessorSettings,
    peer: String,
    mailbox: Option<String>,
    sender: Option<String>,
    recipient: Option<String>,
}

impl<S> ConnectionProcessor<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        store: Arc<dyn MailStore>,
        settings: ProcessorSettings,
        peer: impl Into<String>,
    ) -> Self {
        Self {
            channel: Channel::new(stream).with_max_line_bytes(settings.max_line_bytes),
            store,
            settings,
            peer: peer.into(),
            mailbox: None,
            sender: None,
            recipient: None,
        }
    }

    /// Process requests until the client quits or the stream closes.
    ///
    /// An overlong line gets a FAILURE reply before the connection is
    /// dropped, since the rest of that line cannot be skipped.
    pub async fn run(mut self) -> ProtocolResult<()> {
        match self.serve().await {
            Err(ProtocolError::LineTooLong { limit }) => {
                warn!(
                    subsystem = "server",
                    component = "processor",
                    peer = %self.peer,
                    limit,
                    "Line too long, closing connection"
                );
                let _ = self
                    .reply(Response::failure(format!("Line exceeds {} bytes", limit)))
                    .await;
                Err(ProtocolError::LineTooLong { limit })
            }
            other => other,
        }
    }

    async fn serve(&mut self) -> ProtocolResult<()> {
        loop {
            let request = match self.channel.receive_request().await {
                Ok(request) => request,
                Err(ProtocolError::ConnectionClosed) => {
                    info!(
                        subsystem = "server",
                        component = "processor",
                        peer = %self.peer,
                        "Client disconnected"
                    );
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            if self.handle(request).await? == Flow::Quit {
                info!(
                    subsystem = "server",
                    component = "processor",
                    peer = %self.peer,
                    "Client quit"
                );
                return Ok(());
            }
        }
    }

    async fn handle(&mut self, request: Request) -> ProtocolResult<Flow> {
        let Some(command) = request.known_command() else {
            debug!(
                subsystem = "server",
                component = "processor",
                peer = %self.peer,
                "Unknown command"
            );
            self.reply(Response::failure(format!("Unknown command {}", request.keyword())))
                .await?;
            return Ok(Flow::Continue);
        };

        let argument = request.argument().trim();
        if command.takes_argument() && argument.is_empty() {
            self.reply(Response::failure(format!("{} requires an argument", command)))
                .await?;
            return Ok(Flow::Continue);
        }

        debug!(
            subsystem = "server",
            component = "processor",
            peer = %self.peer,
            command = %command,
            "Processing command"
        );

        match command {
            Command::Helo => self.helo(argument).await?,
            Command::Mail => self.mail(argument).await?,
            Command::Rcpt => self.rcpt(argument).await?,
            Command::Data => self.data().await?,
            Command::List => self.list().await?,
            Command::Retrieve => self.retrieve(argument).await?,
            Command::Delete => self.delete(argument).await?,
            Command::Quit => {
                self.reply(Response::success(0, "Bye")).await?;
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    async fn helo(&mut self, user: &str) -> ProtocolResult<()> {
        self.mailbox = Some(user.to_string());
        self.sender = None;
        self.recipient = None;
        self.reply(Response::success(0, format!("Hello {}", user)))
            .await
    }

    async fn mail(&mut self, sender: &str) -> ProtocolResult<()> {
        self.sender = Some(sender.to_string());
        self.recipient = None;
        self.reply(Response::success(0, "Sender accepted")).await
    }

    async fn rcpt(&mut self, recipient: &str) -> ProtocolResult<()> {
        if self.sender.is_none() {
            return self.reply(Response::failure("MAIL required before RCPT")).await;
        }
        self.recipient = Some(recipient.to_string());
        self.reply(Response::success(0, "Recipient accepted")).await
    }

    async fn data(&mut self) -> ProtocolResult<()> {
        let (Some(sender), Some(recipient)) = (self.sender.clone(), self.recipient.clone()) else {
            return self
                .reply(Response::failure("MAIL and RCPT required before DATA"))
                .await;
        };

        self.reply(Response::success(
            0,
            format!("Send body, end with {}", BODY_TERMINATOR),
        ))
        .await?;

        // Past a limit the rest of the body is drained, not kept, so the
        // stream is back in step when the refusal goes out.
        let mut lines = Vec::new();
        let mut body_bytes = 0usize;
        let mut overflow = None;
        loop {
            let line = self.channel.receive_raw_line().await?;
            if line == BODY_TERMINATOR {
                break;
            }
            if overflow.is_some() {
                continue;
            }
            let added = line.len() + usize::from(!lines.is_empty());
            if lines.len() >= self.settings.max_body_lines {
                overflow = Some(Overflow::Lines);
            } else if body_bytes + added > self.settings.max_body_bytes {
                overflow = Some(Overflow::Bytes);
            } else {
                body_bytes += added;
                lines.push(line);
            }
        }
        self.sender = None;
        self.recipient = None;

        if let Some(overflow) = overflow {
            warn!(
                subsystem = "server",
                component = "processor",
                peer = %self.peer,
                max_lines = self.settings.max_body_lines,
                max_bytes = self.settings.max_body_bytes,
                "Body too long, mail refused"
            );
            let reason = match overflow {
                Overflow::Lines => format!("Body exceeds {} lines", self.settings.max_body_lines),
                Overflow::Bytes => format!("Body exceeds {} bytes", self.settings.max_body_bytes),
            };
            return self.reply(Response::failure(reason)).await;
        }

        let line_count = lines.len();
        let mail = NewMail::new(sender, recipient, lines.join("\n"));
        match self.store.store(mail).await {
            Ok(id) => {
                info!(
                    subsystem = "server",
                    component = "processor",
                    peer = %self.peer,
                    mail_id = id,
                    line_count,
                    "Mail stored"
                );
                self.reply(Response::success(id, "Mail stored")).await
            }
            Err(e) => {
                error!(
                    subsystem = "server",
                    component = "processor",
                    peer = %self.peer,
                    error = %e,
                    "Failed to store mail"
                );
                self.reply(Response::failure("Storage error")).await
            }
        }
    }

    async fn list(&mut self) -> ProtocolResult<()> {
        let Some(mailbox) = self.mailbox.clone() else {
            return self.reply(Response::failure("HELO required")).await;
        };

        let summaries = match self.store.list_by_recipient(&mailbox).await {
            Ok(summaries) => summaries,
            Err(e) => return self.storage_failure(e).await,
        };

        self.reply(Response::success(
            summaries.len(),
            format!("{} mails", summaries.len()),
        ))
        .await?;
        for summary in &summaries {
            self.channel.send_line(&summary.to_line()).await?;
        }
        Ok(())
    }

    async fn retrieve(&mut self, argument: &str) -> ProtocolResult<()> {
        let Some(mailbox) = self.mailbox.clone() else {
            return self.reply(Response::failure("HELO required")).await;
        };
        let Some(id) = parse_id(argument) else {
            return self
                .reply(Response::failure(format!("Invalid mail id {}", argument)))
                .await;
        };

        match self.store.fetch_by_id(&mailbox, id).await {
            Ok(Some(mail)) => {
                // The notice counts the body bytes; the trailing line
                // terminator is the extra byte the client allows for.
                self.reply(Response::success(mail.body.len(), "Mail follows"))
                    .await?;
                self.channel.send_line(&mail.body).await
            }
            Ok(None) => {
                self.reply(Response::failure(format!("No such mail {}", id)))
                    .await
            }
            Err(e) => self.storage_failure(e).await,
        }
    }

    async fn delete(&mut self, argument: &str) -> ProtocolResult<()> {
        let Some(mailbox) = self.mailbox.clone() else {
            return self.reply(Response::failure("HELO required")).await;
        };
        let Some(id) = parse_id(argument) else {
            return self
                .reply(Response::failure(format!("Invalid mail id {}", argument)))
                .await;
        };

        match self.store.delete(&mailbox, id).await {
            Ok(true) => self.reply(Response::success(0, "Mail deleted")).await,
            Ok(false) => {
                self.reply(Response::failure(format!("No such mail {}", id)))
                    .await
            }
            Err(e) => self.storage_failure(e).await,
        }
    }

    async fn storage_failure(&mut self, e: sealmail_core::Error) -> ProtocolResult<()> {
        error!(
            subsystem = "server",
            component = "processor",
            peer = %self.peer,
            error = %e,
            "Store operation failed"
        );
        self.reply(Response::failure("Storage error")).await
    }

    async fn reply(&mut self, response: Response) -> ProtocolResult<()> {
        self.channel.send_response(&response).await
    }
}

fn parse_id(argument: &str) -> Option<MailId> {
    argument.parse::<MailId>().ok().filter(|id| *id > 0)
}
