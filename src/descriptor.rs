//! Canonical descriptor for a discovered fixture connection.
//!
//! A descriptor captures everything needed to talk to a fixture after
//! discovery: the port name, the baud rate, and the line-ending convention
//! the fixture expects. It round-trips losslessly through the string form
//! `"<port>@<baud>@<MODE>"`, e.g. `"/dev/ttyUSB3@9600@CRLF"`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Line-ending convention appended to outgoing commands.
///
/// Closed vocabulary: these four variants map 1:1 to the literal byte
/// sequences a fixture may expect, and to the canonical mode names used in
/// descriptor strings. Free-form strings are rejected at the parse boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LineEnding {
    /// `"\r\n"` — the most common convention for fixture firmware.
    Crlf,
    /// `"\n"`
    Lf,
    /// `"\r"`
    Cr,
    /// No terminator at all; some fixtures react to a bare `?` byte.
    None,
}

impl LineEnding {
    /// All endings in default sweep order.
    pub const ALL: [LineEnding; 4] = [
        LineEnding::Crlf,
        LineEnding::Lf,
        LineEnding::Cr,
        LineEnding::None,
    ];

    /// The literal bytes appended to an outgoing command.
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::Crlf => b"\r\n",
            LineEnding::Lf => b"\n",
            LineEnding::Cr => b"\r",
            LineEnding::None => b"",
        }
    }

    /// Canonical mode name used in descriptor strings.
    pub fn mode_name(self) -> &'static str {
        match self {
            LineEnding::Crlf => "CRLF",
            LineEnding::Lf => "LF",
            LineEnding::Cr => "CR",
            LineEnding::None => "NONE",
        }
    }

    /// Parse a canonical mode name. Case-insensitive; anything outside the
    /// four canonical names is rejected.
    pub fn from_mode_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "CRLF" => Some(LineEnding::Crlf),
            "LF" => Some(LineEnding::Lf),
            "CR" => Some(LineEnding::Cr),
            "NONE" => Some(LineEnding::None),
            _ => None,
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mode_name())
    }
}

/// Errors raised when a descriptor string cannot be decomposed.
///
/// This is the only hard failure the codec surfaces; everything else in the
/// discovery path degrades to "no fixture found".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// The string does not contain the two `@` separators.
    #[error("descriptor `{0}` must have the form <port>@<baud>@<MODE>")]
    MissingSeparators(String),

    /// The middle segment is not an unsigned integer.
    #[error("descriptor `{text}` has a non-numeric baud segment `{baud}`")]
    InvalidBaud { text: String, baud: String },

    /// The mode segment is not one of `CRLF`, `LF`, `CR`, `NONE`.
    #[error("descriptor `{text}` has unknown mode `{mode}` (expected CRLF, LF, CR or NONE)")]
    InvalidMode { text: String, mode: String },

    /// The port segment is empty.
    #[error("descriptor `{0}` has an empty port segment")]
    EmptyPort(String),
}

/// A discovered fixture connection: port, baud rate, line ending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// Port name, e.g. `/dev/ttyUSB3` or `COM7`. May itself contain `@`.
    pub port: String,
    /// Baud rate in bits per second.
    pub baud_rate: u32,
    /// Line-ending convention the fixture answered to.
    pub line_ending: LineEnding,
}

impl PortDescriptor {
    pub fn new(port: impl Into<String>, baud_rate: u32, line_ending: LineEnding) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            line_ending,
        }
    }
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}@{}",
            self.port,
            self.baud_rate,
            self.line_ending.mode_name()
        )
    }
}

impl FromStr for PortDescriptor {
    type Err = DescriptorError;

    /// Parse `"<port>@<baud>@<MODE>"`, splitting on the last two `@`
    /// separators so port names containing `@` are tolerated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, '@');
        let (mode, baud, port) = match (parts.next(), parts.next(), parts.next()) {
            (Some(mode), Some(baud), Some(port)) => (mode, baud, port),
            _ => return Err(DescriptorError::MissingSeparators(s.to_string())),
        };

        if port.is_empty() {
            return Err(DescriptorError::EmptyPort(s.to_string()));
        }

        let baud_rate: u32 = baud
            .trim()
            .parse()
            .map_err(|_| DescriptorError::InvalidBaud {
                text: s.to_string(),
                baud: baud.to_string(),
            })?;

        let line_ending =
            LineEnding::from_mode_name(mode).ok_or_else(|| DescriptorError::InvalidMode {
                text: s.to_string(),
                mode: mode.to_string(),
            })?;

        Ok(Self {
            port: port.to_string(),
            baud_rate,
            line_ending,
        })
    }
}
