//! sealmail-keygen: key management and offline seal/open for sealmail.

use clap::{Parser, Subcommand};
use sealmail_crypto::{
    load_private_key, load_public_key, open, save_private_key, save_public_key, seal, Keypair,
    SecureEnvelope,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sealmail-keygen")]
#[command(author, version, about = "Key management for sealmail secure envelopes")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new identity (X25519 + Ed25519)
    Keygen {
        /// Passphrase to protect the private key (min 12 characters)
        #[arg(short, long)]
        passphrase: String,

        /// Output directory for keys (default: current directory)
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// File name stem, e.g. `alice` writes alice.pub and alice.key
        #[arg(short, long, default_value = "sealmail")]
        name: String,

        /// Optional label stored in the public key file
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Show the fingerprint and raw form of a public key
    Show {
        /// Path to public key file
        #[arg(short, long)]
        public_key: PathBuf,
    },

    /// Seal a file into an envelope body
    Seal {
        /// Plaintext input file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the envelope body
        #[arg(short, long)]
        output: PathBuf,

        /// Recipient public key file
        #[arg(short, long)]
        recipient: PathBuf,

        /// Sender private key file
        #[arg(short, long)]
        key: PathBuf,

        /// Passphrase for the sender private key
        #[arg(long)]
        passphrase: String,
    },

    /// Verify and open an envelope body
    Open {
        /// Envelope body file
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the plaintext
        #[arg(short, long)]
        output: PathBuf,

        /// Sender public key file
        #[arg(short, long)]
        sender: PathBuf,

        /// Recipient private key file
        #[arg(short, long)]
        key: PathBuf,

        /// Passphrase for the recipient private key
        #[arg(long)]
        passphrase: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Keygen {
            passphrase,
            output,
            name,
            label,
        } => cmd_keygen(&passphrase, &output, &name, label.as_deref()),
        Commands::Show { public_key } => cmd_show(&public_key),
        Commands::Seal {
            input,
            output,
            recipient,
            key,
            passphrase,
        } => cmd_seal(&input, &output, &recipient, &key, &passphrase),
        Commands::Open {
            input,
            output,
            sender,
            key,
            passphrase,
        } => cmd_open(&input, &output, &sender, &key, &passphrase),
    }
}

fn cmd_keygen(
    passphrase: &str,
    output_dir: &Path,
    name: &str,
    label: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let keypair = Keypair::generate();

    std::fs::create_dir_all(output_dir)?;
    let private_path = output_dir.join(format!("{}.key", name));
    let public_path = output_dir.join(format!("{}.pub", name));

    save_private_key(&keypair.private, &private_path, passphrase)?;
    save_public_key(&keypair.public, &public_path, label)?;

    let output = serde_json::json!({
        "fingerprint": keypair.public.fingerprint(),
        "private_key_path": private_path.to_string_lossy(),
        "public_key_path": public_path.to_string_lossy(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_show(public_key_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let public_key = load_public_key(public_key_path)?;

    let output = serde_json::json!({
        "fingerprint": public_key.fingerprint(),
        "public_key": sealmail_crypto::keys::encode_public_key(&public_key),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_seal(
    input_path: &Path,
    output_path: &Path,
    recipient_path: &Path,
    key_path: &Path,
    passphrase: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let recipient = load_public_key(recipient_path)?;
    let sender = load_private_key(key_path, passphrase)?;
    let plaintext = std::fs::read(input_path)?;

    let envelope = seal(&plaintext, &recipient, &sender)?;
    std::fs::write(output_path, envelope.to_body())?;

    eprintln!(
        "Sealed {} bytes for {} -> {}",
        plaintext.len(),
        recipient.fingerprint(),
        output_path.display()
    );
    Ok(())
}

fn cmd_open(
    input_path: &Path,
    output_path: &Path,
    sender_path: &Path,
    key_path: &Path,
    passphrase: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = std::fs::read_to_string(input_path)?;
    if !SecureEnvelope::is_envelope(&body) {
        return Err(format!("{} is not a sealmail envelope", input_path.display()).into());
    }
    let envelope = SecureEnvelope::from_lines(&body)?;

    let sender = load_public_key(sender_path)?;
    let recipient = load_private_key(key_path, passphrase)?;
    let plaintext = open(&envelope, &sender, &recipient)?;

    std::fs::write(output_path, &plaintext)?;
    eprintln!(
        "Opened envelope from {} -> {}",
        sender.fingerprint(),
        output_path.display()
    );
    Ok(())
}
