//! # encfilter - Character Encoding Detection and Conversion
//!
//! A small text filter library in the spirit of the classic kanji filters:
//! it guesses the character encoding of a byte stream and converts text
//! between encodings, pivoting through UTF-8.
//!
//! ## Features
//!
//! - **Encoding registry** resolving IANA names and aliases first, MIME labels second
//! - **Statistical detection** returning every plausible encoding, ranked
//! - **Strict conversion**: malformed input and unmappable characters are errors
//! - **East Asian encodings** including Shift_JIS, EUC-JP, ISO-2022-JP, EUC-KR, GB18030 and Big5
//!
//! ## Quick Start
//!
//! ```rust
//! use encfilter::{Detector, Registry, Transcoder};
//!
//! let registry = Registry::new();
//!
//! // Convert UTF-8 text to Shift_JIS
//! let transcoder = Transcoder::new(&registry, "Shift_JIS", "utf-8").unwrap();
//! let sjis = transcoder.convert("こんにちは".as_bytes()).unwrap();
//! assert_eq!(sjis, [0x82, 0xb1, 0x82, 0xf1, 0x82, 0xc9, 0x82, 0xbf, 0x82, 0xcd]);
//!
//! // And guess it back
//! let detector = Detector::new(&registry).unwrap();
//! let result = detector.detect(&sjis).unwrap();
//! assert_eq!(result.best().encoding, "Shift_JIS");
//! ```

#![deny(missing_docs)]

use std::fmt;
use std::io::Read;

pub mod bom;
pub mod detection;
pub mod dump;
mod multibyte;
pub mod pipeline;
pub mod registry;

pub use detection::{DetectionResult, Detector, Guess, Language};
pub use pipeline::{Route, Transcoder, convert, convert_stream};
pub use registry::{Authority, Codec, Registry};

/// Result type for encoding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while detecting or converting text
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Encoding name does not resolve to a usable codec
    #[error("unsupported encoding name {name:?} ({reason}){}", side_suffix(.side))]
    UnsupportedEncoding {
        /// The name as given by the caller
        name: String,
        /// Why the name was rejected
        reason: Unsupported,
        /// Which end of a conversion the name belongs to, if any
        side: Option<Side>,
    },
    /// Input is not valid text in the claimed encoding, or a character
    /// cannot be represented in the destination encoding
    #[error("invalid {encoding} text while {direction}")]
    InvalidEncodingInput {
        /// Whether decoding or encoding failed
        direction: Direction,
        /// Canonical name of the encoding that failed
        encoding: &'static str,
        /// The codec level failure
        #[source]
        cause: CodecError,
    },
    /// No candidate encoding fits the input at all
    #[error("cannot detect character encoding: {cause}")]
    DetectionFailed {
        /// Description of why detection failed
        cause: String,
    },
    /// A required input stream was not supplied
    #[error("null reference instance: no input stream")]
    NullSource,
    /// Reading or writing a stream failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attach the conversion side to an unsupported encoding error
    pub(crate) fn on_side(self, at: Side) -> Self {
        match self {
            Error::UnsupportedEncoding { name, reason, .. } => Error::UnsupportedEncoding {
                name,
                reason,
                side: Some(at),
            },
            other => other,
        }
    }
}

/// Read a whole input stream; a missing stream is [`Error::NullSource`]
pub(crate) fn read_source<R: Read>(reader: Option<R>) -> Result<Vec<u8>> {
    let mut reader = reader.ok_or(Error::NullSource)?;
    let mut input = Vec::new();
    reader.read_to_end(&mut input)?;
    Ok(input)
}

fn code_point(character: &char) -> u32 {
    u32::from(*character)
}

fn side_suffix(side: &Option<Side>) -> String {
    match side {
        Some(side) => format!(" as {} encoding", side),
        None => String::new(),
    }
}

/// Reason an encoding name was rejected by the [`Registry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    /// Neither the IANA table nor the MIME labels know the name
    NotFound,
    /// The name resolves, but to an encoding that cannot carry text
    Unusable,
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unsupported::NotFound => write!(f, "unknown name"),
            Unsupported::Unusable => write!(f, "resolves to no usable codec"),
        }
    }
}

/// End of a conversion an encoding name was given for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The encoding of the input
    Source,
    /// The encoding of the output
    Destination,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Destination => write!(f, "destination"),
        }
    }
}

/// Direction of a codec operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes to text
    Decode,
    /// Text to bytes
    Encode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Decode => write!(f, "decoding"),
            Direction::Encode => write!(f, "encoding"),
        }
    }
}

/// Codec level failure, wrapped by [`Error::InvalidEncodingInput`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Byte sequence is malformed in the source encoding
    #[error("malformed byte sequence {bytes:02X?} at offset {position}")]
    UnmappableSource {
        /// The offending bytes
        bytes: Vec<u8>,
        /// Offset of the first offending byte in the input
        position: usize,
    },
    /// Character cannot be encoded in the target encoding
    #[error("character {character:?} (U+{:04X}) at offset {position} has no mapping", code_point(.character))]
    UnmappableTarget {
        /// The unmappable character
        character: char,
        /// Byte offset of the character in the UTF-8 text
        position: usize,
    },
}

impl CodecError {
    /// Shift the reported offset by bytes consumed before the codec ran
    pub(crate) fn offset_by(self, skipped: usize) -> Self {
        match self {
            CodecError::UnmappableSource { bytes, position } => CodecError::UnmappableSource {
                bytes,
                position: position + skipped,
            },
            CodecError::UnmappableTarget { character, position } => CodecError::UnmappableTarget {
                character,
                position: position + skipped,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_message_names_side() {
        let err = Error::UnsupportedEncoding {
            name: "foo".to_string(),
            reason: Unsupported::NotFound,
            side: None,
        }
        .on_side(Side::Source);

        assert_eq!(
            err.to_string(),
            "unsupported encoding name \"foo\" (unknown name) as source encoding"
        );
    }

    #[test]
    fn test_invalid_input_keeps_cause() {
        use std::error::Error as _;

        let err = Error::InvalidEncodingInput {
            direction: Direction::Encode,
            encoding: "US-ASCII",
            cause: CodecError::UnmappableTarget {
                character: 'é',
                position: 3,
            },
        };

        assert_eq!(err.to_string(), "invalid US-ASCII text while encoding");
        let cause = err.source().unwrap().to_string();
        assert!(cause.contains("U+00E9"));
        assert!(cause.contains("offset 3"));
    }

    #[test]
    fn test_malformed_message_shows_bytes() {
        let cause = CodecError::UnmappableSource {
            bytes: vec![0xff],
            position: 0,
        };
        assert_eq!(cause.to_string(), "malformed byte sequence [FF] at offset 0");
    }
}
