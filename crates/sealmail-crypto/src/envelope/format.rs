//! Text serialization of a secure envelope.
//!
//! # Body Layout
//!
//! ```text
//! SM1-SIG <base64 Ed25519 signature over the ciphertext>
//! SM1-IV <base64 12-byte GCM nonce>
//! SM1-KEY <base64 wrapped content key>
//! SM1-DATA <base64 AES-256-GCM ciphertext + tag>
//! ```
//!
//! Exactly four lines, in this order. The field tags are the sentinel: a body
//! is a secure envelope only if all four tagged lines are present, in order,
//! with non-empty, well-formed base64 payloads of the right size. Every other
//! body (including four untagged lines of base64) is plain mail.

use crate::cipher::{IV_LEN, TAG_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode, base64_encode};
use crate::signing::SIGNATURE_LEN;
use crate::wrap::WRAPPED_KEY_LEN;

/// Field tags in wire order.
pub const FIELD_TAGS: [&str; 4] = ["SM1-SIG", "SM1-IV", "SM1-KEY", "SM1-DATA"];

/// Number of lines in a serialized envelope.
pub const ENVELOPE_LINES: usize = 4;

/// A sealed message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureEnvelope {
    /// Detached signature over `ciphertext`.
    pub signature: Vec<u8>,
    /// Content cipher IV.
    pub iv: Vec<u8>,
    /// Content key wrapped for the recipient.
    pub wrapped_key: Vec<u8>,
    /// Encrypted body including the authentication tag.
    pub ciphertext: Vec<u8>,
}

impl SecureEnvelope {
    /// Serialize to the four body lines, without line terminators.
    pub fn to_lines(&self) -> [String; ENVELOPE_LINES] {
        let fields = [
            &self.signature,
            &self.iv,
            &self.wrapped_key,
            &self.ciphertext,
        ];
        let mut lines: [String; ENVELOPE_LINES] = Default::default();
        for (i, (tag, bytes)) in FIELD_TAGS.iter().zip(fields).enumerate() {
            lines[i] = format!("{} {}", tag, base64_encode(bytes));
        }
        lines
    }

    /// Serialize to a body string: the four lines joined by `\n`.
    pub fn to_body(&self) -> String {
        self.to_lines().join("\n")
    }

    /// Parse a body that must be exactly one serialized envelope.
    ///
    /// A single trailing line terminator is tolerated, as is `\r\n`.
    pub fn from_lines(body: &str) -> CryptoResult<Self> {
        let lines: Vec<&str> = body.lines().collect();
        if lines.len() != ENVELOPE_LINES {
            return Err(CryptoError::InvalidFormat(format!(
                "Envelope must have {} lines, got {}",
                ENVELOPE_LINES,
                lines.len()
            )));
        }

        let mut fields: [Vec<u8>; ENVELOPE_LINES] = Default::default();
        for (i, (line, tag)) in lines.iter().zip(FIELD_TAGS).enumerate() {
            let payload = line
                .strip_prefix(tag)
                .and_then(|rest| rest.strip_prefix(' '))
                .ok_or_else(|| {
                    CryptoError::InvalidFormat(format!("Line {} is not tagged {}", i + 1, tag))
                })?;
            if payload.is_empty() {
                return Err(CryptoError::InvalidFormat(format!("Empty {} field", tag)));
            }
            fields[i] = base64_decode(payload)?;
        }

        let [signature, iv, wrapped_key, ciphertext] = fields;
        let envelope = Self {
            signature,
            iv,
            wrapped_key,
            ciphertext,
        };
        envelope.check_sizes()?;
        Ok(envelope)
    }

    /// Whether `body` is exactly one well-formed envelope.
    pub fn is_envelope(body: &str) -> bool {
        Self::from_lines(body).is_ok()
    }

    pub(crate) fn check_sizes(&self) -> CryptoResult<()> {
        let check = |name: &str, actual: usize, expected: usize| {
            if actual == expected {
                Ok(())
            } else {
                Err(CryptoError::InvalidFormat(format!(
                    "{}: expected {} bytes, got {}",
                    name, expected, actual
                )))
            }
        };
        check("signature", self.signature.len(), SIGNATURE_LEN)?;
        check("iv", self.iv.len(), IV_LEN)?;
        check("wrapped key", self.wrapped_key.len(), WRAPPED_KEY_LEN)?;
        if self.ciphertext.len() < TAG_LEN {
            return Err(CryptoError::InvalidFormat(format!(
                "ciphertext: expected at least {} bytes, got {}",
                TAG_LEN,
                self.ciphertext.len()
            )));
        }
        Ok(())
    }
}
