//! Conversion between any two encodings through the UTF-8 pivot.
//!
//! Legacy encodings never talk to each other directly: the source is decoded
//! to UTF-8 text and the text is encoded into the destination. Conversions
//! touching the pivot skip the redundant half, and converting an encoding
//! into itself copies the input untouched.

use std::io::{Read, Write};

use tracing::debug;

use crate::registry::{Codec, Registry};
use crate::{CodecError, Direction, Error, Result, Side};

/// Path a conversion takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Source and destination are the same encoding; bytes are copied
    /// without validation
    Identity,
    /// Destination is the pivot; the source is only decoded
    DecodeOnly,
    /// Source is the pivot; the text is only encoded
    EncodeOnly,
    /// Decode with the source, then encode with the destination
    Transcode,
}

impl Route {
    fn between(from: Codec, to: Codec) -> Self {
        if from == to {
            Route::Identity
        } else if to.is_pivot() {
            Route::DecodeOnly
        } else if from.is_pivot() {
            Route::EncodeOnly
        } else {
            Route::Transcode
        }
    }
}

/// A resolved conversion from one encoding to another
#[derive(Debug, Clone, Copy)]
pub struct Transcoder {
    from: Codec,
    to: Codec,
    route: Route,
}

impl Transcoder {
    /// Resolve both encoding names, destination first
    pub fn new(registry: &Registry, to: &str, from: &str) -> Result<Self> {
        let to = registry.resolve(to).map_err(|err| err.on_side(Side::Destination))?;
        let from = registry.resolve(from).map_err(|err| err.on_side(Side::Source))?;
        Ok(Self::between(from, to))
    }

    /// Build a transcoder from codecs already resolved
    pub fn between(from: Codec, to: Codec) -> Self {
        Self {
            from,
            to,
            route: Route::between(from, to),
        }
    }

    /// The path this conversion takes
    pub fn route(&self) -> Route {
        self.route
    }

    /// Get source encoding
    pub fn from_encoding(&self) -> Codec {
        self.from
    }

    /// Get target encoding
    pub fn to_encoding(&self) -> Codec {
        self.to
    }

    /// Convert a whole buffer
    ///
    /// Fails on the first malformed input sequence or unmappable character;
    /// nothing is returned for a failed conversion.
    pub fn convert(&self, input: &[u8]) -> Result<Vec<u8>> {
        let output = match self.route {
            Route::Identity => input.to_vec(),
            Route::DecodeOnly => self.decode(input)?.into_bytes(),
            Route::EncodeOnly => self.encode(pivot_text(input)?)?,
            Route::Transcode => {
                let text = self.decode(input)?;
                self.encode(&text)?
            }
        };

        debug!(
            from = self.from.name(),
            to = self.to.name(),
            route = ?self.route,
            input_bytes = input.len(),
            output_bytes = output.len(),
            "converted"
        );
        Ok(output)
    }

    fn decode(&self, input: &[u8]) -> Result<String> {
        self.from.decode(input).map_err(|cause| Error::InvalidEncodingInput {
            direction: Direction::Decode,
            encoding: self.from.name(),
            cause,
        })
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>> {
        self.to.encode(text).map_err(|cause| Error::InvalidEncodingInput {
            direction: Direction::Encode,
            encoding: self.to.name(),
            cause,
        })
    }
}

/// Convert `input` from encoding `from` to encoding `to`
pub fn convert(registry: &Registry, to: &str, from: &str, input: &[u8]) -> Result<Vec<u8>> {
    Transcoder::new(registry, to, from)?.convert(input)
}

/// Convert a whole stream into `writer`
///
/// The input is read to the end before anything is written, so a failed
/// conversion leaves the writer untouched.
pub fn convert_stream<W, R>(registry: &Registry, to: &str, mut writer: W, from: &str, reader: Option<R>) -> Result<()>
where
    W: Write,
    R: Read,
{
    let transcoder = Transcoder::new(registry, to, from)?;
    let input = crate::read_source(reader)?;
    let output = transcoder.convert(&input)?;

    writer.write_all(&output)?;
    writer.flush()?;
    Ok(())
}

/// View bytes as UTF-8 text, reporting invalid input as a pivot decode failure
pub(crate) fn pivot_text(input: &[u8]) -> Result<&str> {
    std::str::from_utf8(input).map_err(|err| {
        let start = err.valid_up_to();
        let end = err.error_len().map_or(input.len(), |len| start + len);
        Error::InvalidEncodingInput {
            direction: Direction::Decode,
            encoding: Codec::pivot().name(),
            cause: CodecError::UnmappableSource {
                bytes: input[start..end].to_vec(),
                position: start,
            },
        }
    })
}
