//! sealmail-client: interactive console for a sealmail server.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpStream;

use sealmail_cli::console::{render_list, render_retrieve, render_send, Console};
use sealmail_core::ClientConfig;
use sealmail_crypto::FileKeyResolver;
use sealmail_protocol::{Command, Request, Session};

#[derive(Parser)]
#[command(name = "sealmail-client")]
#[command(author, version, about = "Interactive client for sealmail servers")]
struct Cli {
    /// Server host (default: SEALMAIL_HOST or 127.0.0.1)
    #[arg(long)]
    host: Option<String>,

    /// Server port (default: SEALMAIL_PORT or 2525)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = sealmail_cli::init_logging("sealmail-client.log");

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let address = config.address();
    let stream = TcpStream::connect(&address)
        .await
        .with_context(|| format!("Failed to connect to {}", address))?;
    println!("Connected to {}", address);

    let mut session = Session::new(stream, Arc::new(FileKeyResolver::new()));
    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout());

    while let Some(line) = console.prompt("> ")? {
        if line.trim().is_empty() {
            continue;
        }
        let request = Request::parse(line.trim());

        let result = match request.known_command() {
            Some(Command::Data) => {
                let Some(body) = console.read_body()? else {
                    break;
                };
                let Some(keys) = console.read_seal_keys()? else {
                    break;
                };
                session
                    .send_secure(&body, &keys)
                    .await
                    .map(|outcome| render_send(&outcome))
            }
            Some(Command::List) => session.list().await.map(|outcome| render_list(&outcome)),
            Some(Command::Retrieve) => {
                let id = request.argument().trim().to_string();
                let outcome = session
                    .retrieve(&id, || console.open_keys_or_report())
                    .await;
                outcome.map(|outcome| render_retrieve(&outcome))
            }
            Some(Command::Quit) => {
                let response = session.execute(&request).await?;
                console.say(&format!("Receive: {}", response))?;
                break;
            }
            _ => session
                .execute(&request)
                .await
                .map(|response| format!("Receive: {}", response)),
        };

        match result {
            Ok(text) => console.say(&text)?,
            Err(e) if e.is_disconnect() => {
                console.say(&format!("Connection lost: {}", e))?;
                break;
            }
            Err(e) => console.say(&format!("Error: {}", e))?,
        }
    }

    io::stdout().flush()?;
    Ok(())
}
