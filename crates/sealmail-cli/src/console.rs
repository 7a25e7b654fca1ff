//! Console prompts and rendering for the interactive client.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tracing::warn;
use zeroize::Zeroizing;

use sealmail_core::defaults::BODY_TERMINATOR;
use sealmail_protocol::{
    BodyCollector, ListOutcome, OpenKeys, Presentation, RetrieveOutcome, SealKeys, SendOutcome,
};

/// Line-oriented prompt over any reader/writer pair.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `label` and read one line. `None` at end of input.
    pub fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        if !label.is_empty() {
            write!(self.output, "{}", label)?;
            self.output.flush()?;
        }
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(len);
        Ok(Some(line))
    }

    pub fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{}", text)
    }

    /// Read body lines up to the terminator. `None` if input ends first.
    pub fn read_body(&mut self) -> io::Result<Option<String>> {
        self.say(&format!(
            "Enter the message, end with a line containing only \"{}\"",
            BODY_TERMINATOR
        ))?;
        let mut collector = BodyCollector::new();
        while let Some(line) = self.prompt("")? {
            if collector.push(&line) {
                return Ok(Some(collector.into_body()));
            }
        }
        Ok(None)
    }

    pub fn read_seal_keys(&mut self) -> io::Result<Option<SealKeys>> {
        let Some(recipient_public) = self.prompt("Recipient public key: ")? else {
            return Ok(None);
        };
        let Some(sender_private) = self.prompt("Your private key: ")? else {
            return Ok(None);
        };
        let password = self.prompt("Password: ")?;
        Ok(Some(SealKeys {
            recipient_public: PathBuf::from(recipient_public),
            sender_private: PathBuf::from(sender_private),
            password: password.filter(|p| !p.is_empty()).map(Zeroizing::new),
        }))
    }

    pub fn read_open_keys(&mut self) -> io::Result<Option<OpenKeys>> {
        let Some(sender_public) = self.prompt("Sender public key: ")? else {
            return Ok(None);
        };
        let Some(recipient_private) = self.prompt("Your private key: ")? else {
            return Ok(None);
        };
        let password = self.prompt("Password: ")?;
        Ok(Some(OpenKeys {
            sender_public: PathBuf::from(sender_public),
            recipient_private: PathBuf::from(recipient_private),
            password: password.filter(|p| !p.is_empty()).map(Zeroizing::new),
        }))
    }

    /// Key prompt used while a retrieved envelope is being opened.
    ///
    /// The session only takes an `Option`, so a failed read is logged and
    /// reported on the console here before falling back to "no keys".
    pub fn open_keys_or_report(&mut self) -> Option<OpenKeys> {
        match self.read_open_keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(
                    subsystem = "client",
                    component = "console",
                    error = %e,
                    "Could not read keys for retrieved mail"
                );
                let _ = self.say(&format!("Could not read keys: {}", e));
                None
            }
        }
    }
}

pub fn render_send(outcome: &SendOutcome) -> String {
    match outcome {
        SendOutcome::Acknowledged(response) => format!("Receive: {}", response),
        SendOutcome::Refused(response) => {
            format!("Server refused DATA, nothing sent: {}", response)
        }
        SendOutcome::KeyError(e) => format!("Key error, nothing sent: {}", e),
        SendOutcome::CipherError(e) => format!("Encryption failed, nothing sent: {}", e),
    }
}

pub fn render_list(outcome: &ListOutcome) -> String {
    match outcome {
        ListOutcome::Listed {
            response,
            summaries,
            ..
        } => format!("Receive: {}\n{}", response, summaries.trim_end()),
        ListOutcome::Rejected(response) => format!("Receive: {}", response),
    }
}

pub fn render_retrieve(outcome: &RetrieveOutcome) -> String {
    match outcome {
        RetrieveOutcome::Rejected(response) => format!("Receive: {}", response),
        RetrieveOutcome::Presented {
            response,
            presentation,
        } => format!("Receive: {}\n{}", response, render_presentation(presentation)),
    }
}

pub fn render_presentation(presentation: &Presentation) -> String {
    match presentation {
        Presentation::Plain(body) => body.clone(),
        Presentation::Decrypted(body) => {
            format!("Signature verified, message decrypted.\n{}", body)
        }
        Presentation::SignatureInvalid { raw, reason }
        | Presentation::DecryptionFailed { raw, reason } => format!(
            "WARNING: {} ({})\nRaw message:\n{}",
            presentation.label().unwrap_or_default(),
            reason,
            raw
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealmail_protocol::Response;
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_prompt_strips_line_ending() {
        let mut c = console("hello\r\nworld");
        assert_eq!(c.prompt("> ").unwrap().as_deref(), Some("hello"));
        assert_eq!(c.prompt("> ").unwrap().as_deref(), Some("world"));
        assert_eq!(c.prompt("> ").unwrap(), None);
        assert_eq!(String::from_utf8(c.output).unwrap(), "> > > ");
    }

    #[test]
    fn test_read_body_until_terminator() {
        let mut c = console("Hi Bob\n\nBye\n.\nLIST\n");
        assert_eq!(c.read_body().unwrap().as_deref(), Some("Hi Bob\n\nBye"));
        assert_eq!(c.prompt("").unwrap().as_deref(), Some("LIST"));
    }

    #[test]
    fn test_read_body_eof() {
        let mut c = console("unterminated\n");
        assert_eq!(c.read_body().unwrap(), None);
    }

    #[test]
    fn test_read_seal_keys_empty_password_is_none() {
        let mut c = console("bob.pub\nalice.key\n\n");
        let keys = c.read_seal_keys().unwrap().unwrap();
        assert_eq!(keys.recipient_public, PathBuf::from("bob.pub"));
        assert_eq!(keys.sender_private, PathBuf::from("alice.key"));
        assert!(keys.password.is_none());
    }

    #[test]
    fn test_read_open_keys() {
        let mut c = console("alice.pub\nbob.key\nsecret password\n");
        let keys = c.read_open_keys().unwrap().unwrap();
        assert_eq!(keys.sender_public, PathBuf::from("alice.pub"));
        assert_eq!(keys.password.as_deref().map(String::as_str), Some("secret password"));
    }

    struct BrokenInput;

    impl io::Read for BrokenInput {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "terminal detached"))
        }
    }

    #[test]
    fn test_open_keys_read_failure_is_reported() {
        let mut c = Console::new(io::BufReader::new(BrokenInput), Vec::new());
        assert!(c.open_keys_or_report().is_none());

        let shown = String::from_utf8(c.output).unwrap();
        assert!(shown.contains("Could not read keys: terminal detached"));
    }

    #[test]
    fn test_open_keys_or_report_passes_keys_through() {
        let mut c = console("alice.pub\nbob.key\n\n");
        let keys = c.open_keys_or_report().unwrap();
        assert_eq!(keys.recipient_private, PathBuf::from("bob.key"));
        assert!(!String::from_utf8(c.output).unwrap().contains("Could not read keys"));
    }

    #[test]
    fn test_render_fallback_labels_raw_body() {
        let text = render_presentation(&Presentation::SignatureInvalid {
            raw: "SM1-SIG ...".into(),
            reason: "Signature verification failed".into(),
        });
        assert!(text.starts_with("WARNING: signature invalid"));
        assert!(text.ends_with("SM1-SIG ..."));
    }

    #[test]
    fn test_render_list() {
        let outcome = ListOutcome::Listed {
            response: Response::success(1, "1 mails"),
            count: 1,
            summaries: "4 alice 2024-01-01T00:00:00+00:00\n".into(),
        };
        assert_eq!(
            render_list(&outcome),
            "Receive: SUCCESS 1 1 mails\n4 alice 2024-01-01T00:00:00+00:00"
        );
    }
}
