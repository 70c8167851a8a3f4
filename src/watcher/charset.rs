//! Character encodings supported for log files.

use std::fmt;
use std::str::FromStr;

/// Encoding used to decode raw line bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Charset {
    /// UTF-8, invalid sequences replaced with U+FFFD.
    #[default]
    Utf8,
    /// ISO-8859-1, every byte maps to the code point of the same value.
    Latin1,
}

impl Charset {
    /// Decode one line of raw bytes.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().copied().map(char::from).collect(),
        }
    }
}

impl FromStr for Charset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('_', "-").as_str() {
            // ASCII is a subset of UTF-8.
            "UTF-8" | "UTF8" | "US-ASCII" | "ASCII" => Ok(Self::Utf8),
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" | "LATIN-1" => Ok(Self::Latin1),
            other => Err(format!("unsupported charset '{other}'")),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8 => write!(f, "UTF-8"),
            Self::Latin1 => write!(f, "ISO-8859-1"),
        }
    }
}
