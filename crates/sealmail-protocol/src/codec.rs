//! Wire codec: request and response lines.
//!
//! ```text
//! request  = COMMAND [ " " argument ]
//! response = CODE [ " " notice [ " " message ] ]
//! CODE     = "SUCCESS" / "FAILURE"
//! ```
//!
//! Lines are written without terminators here; the [`crate::Channel`]
//! appends `\n`. The notice is carried as text and only interpreted by the
//! command that expects a count.

use std::fmt;
use std::str::FromStr;

use sealmail_core::defaults::{BODY_TERMINATOR, CODE_FAILURE, CODE_SUCCESS, FIELD_DELIMITER};

use crate::error::{ProtocolError, ProtocolResult};

/// Protocol commands. Matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Helo,
    Mail,
    Rcpt,
    Data,
    List,
    Retrieve,
    Delete,
    Quit,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::Helo,
        Command::Mail,
        Command::Rcpt,
        Command::Data,
        Command::List,
        Command::Retrieve,
        Command::Delete,
        Command::Quit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Helo => "HELO",
            Command::Mail => "MAIL",
            Command::Rcpt => "RCPT",
            Command::Data => "DATA",
            Command::List => "LIST",
            Command::Retrieve => "RETRIEVE",
            Command::Delete => "DELETE",
            Command::Quit => "QUIT",
        }
    }

    /// Whether the command must carry an argument.
    pub fn takes_argument(&self) -> bool {
        matches!(
            self,
            Command::Helo | Command::Mail | Command::Rcpt | Command::Retrieve | Command::Delete
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProtocolError::MalformedRequest(s.to_string()))
    }
}

/// One request line.
///
/// Either a protocol command with an optional argument, or a raw body line
/// sent during a DATA transfer. A raw line is kept verbatim in `command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    command: String,
    argument: String,
}

impl Request {
    /// A command without argument.
    pub fn command(command: Command) -> Self {
        Self {
            command: command.as_str().to_string(),
            argument: String::new(),
        }
    }

    /// A command with an argument.
    pub fn with_argument(command: Command, argument: impl Into<String>) -> Self {
        Self {
            command: command.as_str().to_string(),
            argument: argument.into(),
        }
    }

    /// A raw body line, written exactly as given.
    pub fn raw(line: impl Into<String>) -> Self {
        Self {
            command: line.into(),
            argument: String::new(),
        }
    }

    /// The body-terminator line.
    pub fn terminator() -> Self {
        Self::raw(BODY_TERMINATOR)
    }

    /// Parse a received request line (terminator already stripped).
    pub fn parse(line: &str) -> Self {
        match line.split_once(FIELD_DELIMITER) {
            Some((command, argument)) => Self {
                command: command.to_string(),
                argument: argument.to_string(),
            },
            None => Self::raw(line),
        }
    }

    /// Serialize to a line without terminator.
    pub fn to_line(&self) -> String {
        if self.argument.is_empty() {
            self.command.clone()
        } else {
            format!("{}{}{}", self.command, FIELD_DELIMITER, self.argument)
        }
    }

    /// The command keyword as received.
    pub fn keyword(&self) -> &str {
        &self.command
    }

    /// The argument, empty when absent.
    pub fn argument(&self) -> &str {
        &self.argument
    }

    /// The protocol command, if the keyword names one.
    pub fn known_command(&self) -> Option<Command> {
        self.command.parse().ok()
    }

    pub fn is_terminator(&self) -> bool {
        self.argument.is_empty() && self.command == BODY_TERMINATOR
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    Failure,
}

impl ResponseCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCode::Success => CODE_SUCCESS,
            ResponseCode::Failure => CODE_FAILURE,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    code: ResponseCode,
    notice: String,
    message: String,
}

impl Response {
    pub fn new(code: ResponseCode, notice: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            notice: notice.into(),
            message: message.into(),
        }
    }

    pub fn success(notice: impl fmt::Display, message: impl Into<String>) -> Self {
        Self::new(ResponseCode::Success, notice.to_string(), message)
    }

    /// A failure response; the notice is always `0`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(ResponseCode::Failure, "0", message)
    }

    /// Parse a response line. A trailing `\n` or `\r\n` is ignored.
    ///
    /// Fails with [`ProtocolError::MalformedResponse`] when the code field is
    /// missing or is not SUCCESS/FAILURE. The notice is not validated.
    pub fn parse(line: &str) -> ProtocolResult<Self> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        let mut fields = trimmed.splitn(3, FIELD_DELIMITER);

        let code = match fields.next() {
            Some(c) if c.eq_ignore_ascii_case(CODE_SUCCESS) => ResponseCode::Success,
            Some(c) if c.eq_ignore_ascii_case(CODE_FAILURE) => ResponseCode::Failure,
            _ => return Err(ProtocolError::MalformedResponse(trimmed.to_string())),
        };

        Ok(Self {
            code,
            notice: fields.next().unwrap_or_default().to_string(),
            message: fields.next().unwrap_or_default().to_string(),
        })
    }

    /// Serialize to a line without terminator.
    pub fn to_line(&self) -> String {
        let mut line = self.code.as_str().to_string();
        if !self.notice.is_empty() || !self.message.is_empty() {
            line.push(FIELD_DELIMITER);
            line.push_str(&self.notice);
        }
        if !self.message.is_empty() {
            line.push(FIELD_DELIMITER);
            line.push_str(&self.message);
        }
        line
    }

    pub fn code(&self) -> ResponseCode {
        self.code
    }

    pub fn is_success(&self) -> bool {
        self.code == ResponseCode::Success
    }

    pub fn notice(&self) -> &str {
        &self.notice
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Interpret the notice as a count (LIST entries, RETRIEVE bytes).
    pub fn notice_count(&self) -> ProtocolResult<usize> {
        self.notice
            .parse()
            .map_err(|_| ProtocolError::InvalidNotice(self.notice.clone()))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}
