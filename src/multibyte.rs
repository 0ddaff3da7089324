//! Decoding and encoding for every codec the registry hands out.
//!
//! Nothing here replaces bad input: the first malformed byte sequence or
//! unmappable character ends the operation with its offset.

use encoding_rs::{DecoderResult, Encoding, EncoderResult};

use crate::registry::Codec;
use crate::CodecError;

type CodecResult<T> = std::result::Result<T, CodecError>;

impl Codec {
    /// Decode bytes into UTF-8 text
    pub fn decode(self, input: &[u8]) -> CodecResult<String> {
        decode(self, input, true)
    }

    /// Encode UTF-8 text into bytes of this encoding
    pub fn encode(self, text: &str) -> CodecResult<Vec<u8>> {
        match self {
            Codec::Ascii => encode_ascii(text),
            Codec::Latin1 => encode_latin1(text),
            Codec::Utf16 => {
                let mut output = vec![0xFE, 0xFF];
                output.extend(encode_utf16(text, true));
                Ok(output)
            }
            Codec::Standard(encoding) if encoding == encoding_rs::UTF_16LE => Ok(encode_utf16(text, false)),
            Codec::Standard(encoding) if encoding == encoding_rs::UTF_16BE => Ok(encode_utf16(text, true)),
            Codec::Standard(encoding) => encode_standard(encoding, text),
        }
    }
}

/// Decode a possibly truncated sample; with `last` unset an unfinished
/// sequence at the end is not an error.
pub(crate) fn decode(codec: Codec, input: &[u8], last: bool) -> CodecResult<String> {
    match codec {
        Codec::Ascii => decode_ascii(input),
        Codec::Latin1 => Ok(input.iter().map(|&byte| char::from(byte)).collect()),
        Codec::Utf16 => {
            let (encoding, skip) = match input {
                [0xFF, 0xFE, ..] => (encoding_rs::UTF_16LE, 2),
                [0xFE, 0xFF, ..] => (encoding_rs::UTF_16BE, 2),
                _ => (encoding_rs::UTF_16BE, 0),
            };
            decode_standard(encoding, &input[skip..], last).map_err(|err| err.offset_by(skip))
        }
        Codec::Standard(encoding) => decode_standard(encoding, input, last),
    }
}

fn decode_ascii(input: &[u8]) -> CodecResult<String> {
    let mut output = String::with_capacity(input.len());
    for (pos, &byte) in input.iter().enumerate() {
        if !byte.is_ascii() {
            return Err(CodecError::UnmappableSource {
                bytes: vec![byte],
                position: pos,
            });
        }
        output.push(char::from(byte));
    }
    Ok(output)
}

fn encode_ascii(text: &str) -> CodecResult<Vec<u8>> {
    let mut output = Vec::with_capacity(text.len());
    for (pos, ch) in text.char_indices() {
        if !ch.is_ascii() {
            return Err(CodecError::UnmappableTarget {
                character: ch,
                position: pos,
            });
        }
        output.push(ch as u8);
    }
    Ok(output)
}

fn encode_latin1(text: &str) -> CodecResult<Vec<u8>> {
    let mut output = Vec::with_capacity(text.len());
    for (pos, ch) in text.char_indices() {
        match u8::try_from(ch) {
            Ok(byte) => output.push(byte),
            Err(_) => {
                return Err(CodecError::UnmappableTarget {
                    character: ch,
                    position: pos,
                });
            }
        }
    }
    Ok(output)
}

/// `encoding_rs` only decodes UTF-16; its encoder side writes UTF-8.
fn encode_utf16(text: &str, big_endian: bool) -> Vec<u8> {
    let mut output = Vec::with_capacity(text.len() * 2);
    for code_unit in text.encode_utf16() {
        if big_endian {
            output.extend_from_slice(&code_unit.to_be_bytes());
        } else {
            output.extend_from_slice(&code_unit.to_le_bytes());
        }
    }
    output
}

fn decode_standard(encoding: &'static Encoding, input: &[u8], last: bool) -> CodecResult<String> {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let capacity = decoder
        .max_utf8_buffer_length_without_replacement(input.len())
        .unwrap_or(input.len());
    let mut output = String::with_capacity(capacity);
    let mut consumed = 0;

    loop {
        let (result, read) = decoder.decode_to_string_without_replacement(&input[consumed..], &mut output, last);
        consumed += read;
        match result {
            DecoderResult::InputEmpty => return Ok(output),
            DecoderResult::OutputFull => {
                let remaining = input.len() - consumed;
                let additional = decoder
                    .max_utf8_buffer_length_without_replacement(remaining)
                    .unwrap_or(remaining)
                    .max(4);
                output.reserve(additional);
            }
            DecoderResult::Malformed(bad, after) => {
                let end = consumed - usize::from(after);
                let start = end.saturating_sub(usize::from(bad));
                return Err(CodecError::UnmappableSource {
                    bytes: input[start..end].to_vec(),
                    position: start,
                });
            }
        }
    }
}

fn encode_standard(encoding: &'static Encoding, text: &str) -> CodecResult<Vec<u8>> {
    let mut encoder = encoding.new_encoder();
    let capacity = encoder
        .max_buffer_length_from_utf8_without_replacement(text.len())
        .unwrap_or(text.len());
    let mut output = Vec::with_capacity(capacity);
    let mut consumed = 0;

    loop {
        let (result, read) = encoder.encode_from_utf8_to_vec_without_replacement(&text[consumed..], &mut output, true);
        consumed += read;
        match result {
            EncoderResult::InputEmpty => return Ok(output),
            EncoderResult::OutputFull => {
                let remaining = text.len() - consumed;
                let additional = encoder
                    .max_buffer_length_from_utf8_without_replacement(remaining)
                    .unwrap_or(remaining)
                    .max(8);
                output.reserve(additional);
            }
            EncoderResult::Unmappable(ch) => {
                return Err(CodecError::UnmappableTarget {
                    character: ch,
                    position: consumed - ch.len_utf8(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Registry;

    const TEXT_UTF8: &str = "こんにちは，世界！\n私の名前は Spiegel です。";
    const TEXT_SJIS: &[u8] = &[
        0x82, 0xb1, 0x82, 0xf1, 0x82, 0xc9, 0x82, 0xbf, 0x82, 0xcd, 0x81, 0x43, 0x90, 0xa2, 0x8a, 0x45, 0x81, 0x49,
        0x0a, 0x8e, 0x84, 0x82, 0xcc, 0x96, 0xbc, 0x91, 0x4f, 0x82, 0xcd, 0x20, 0x53, 0x70, 0x69, 0x65, 0x67, 0x65,
        0x6c, 0x20, 0x82, 0xc5, 0x82, 0xb7, 0x81, 0x42,
    ];

    fn codec(name: &str) -> Codec {
        Registry::new().resolve(name).unwrap()
    }

    #[test]
    fn test_shift_jis_both_ways() {
        let sjis = codec("Shift_JIS");

        assert_eq!(sjis.encode(TEXT_UTF8).unwrap(), TEXT_SJIS);
        assert_eq!(sjis.decode(TEXT_SJIS).unwrap(), TEXT_UTF8);
    }

    #[test]
    fn test_malformed_offset() {
        let sjis = codec("Shift_JIS");

        // 0xFF is never valid in Shift_JIS
        let err = sjis.decode(b"ab\xffcd").unwrap_err();
        assert_eq!(
            err,
            CodecError::UnmappableSource {
                bytes: vec![0xff],
                position: 2,
            }
        );
    }

    #[test]
    fn test_unmappable_offset() {
        let euc_kr = codec("EUC-KR");

        // Hiragana is in KS X 1001, the emoji is not
        let err = euc_kr.encode("ab\u{3042}\u{1F600}").unwrap_err();
        assert_eq!(
            err,
            CodecError::UnmappableTarget {
                character: '\u{1F600}',
                position: 5,
            }
        );
    }

    #[test]
    fn test_truncated_sample_is_not_malformed() {
        let utf8 = Codec::pivot();
        let cut = &"世界".as_bytes()[..4];

        assert_eq!(decode(utf8, cut, false).unwrap(), "世");
        assert!(decode(utf8, cut, true).is_err());
    }

    #[test]
    fn test_ascii_is_strict() {
        assert_eq!(Codec::Ascii.decode(b"plain").unwrap(), "plain");
        assert_eq!(
            Codec::Ascii.decode(b"caf\xe9").unwrap_err(),
            CodecError::UnmappableSource {
                bytes: vec![0xe9],
                position: 3,
            }
        );
        assert!(Codec::Ascii.encode("café").is_err());
    }

    #[test]
    fn test_latin1_maps_every_byte() {
        let all: Vec<u8> = (0..=255).collect();
        let text = Codec::Latin1.decode(&all).unwrap();

        assert_eq!(text.chars().count(), 256);
        assert_eq!(Codec::Latin1.encode(&text).unwrap(), all);
        assert!(Codec::Latin1.encode("\u{20AC}").is_err());
    }

    #[test]
    fn test_utf16_conversion() {
        let le = codec("UTF-16LE");
        let be = codec("UTF-16BE");
        let input = "Hi \u{1F30D}";

        let le_bytes = le.encode(input).unwrap();
        assert_eq!(&le_bytes[..4], &[0x48, 0x00, 0x69, 0x00]);
        assert_eq!(le.decode(&le_bytes).unwrap(), input);

        let be_bytes = be.encode(input).unwrap();
        assert_eq!(&be_bytes[..4], &[0x00, 0x48, 0x00, 0x69]);
        assert_eq!(be.decode(&be_bytes).unwrap(), input);
    }

    #[test]
    fn test_utf16_follows_bom() {
        let utf16 = codec("UTF-16");

        assert_eq!(utf16.decode(&[0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42]).unwrap(), "AB");
        assert_eq!(utf16.decode(&[0xFF, 0xFE, 0x41, 0x00, 0x42, 0x00]).unwrap(), "AB");
        // Big-endian without a BOM
        assert_eq!(utf16.decode(&[0x00, 0x41, 0x00, 0x42]).unwrap(), "AB");
        assert_eq!(utf16.encode("AB").unwrap(), [0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42]);

        // Offsets count the BOM
        let err = utf16.decode(&[0xFE, 0xFF, 0x00, 0x41, 0xDC, 0x00]).unwrap_err();
        assert!(matches!(err, CodecError::UnmappableSource { position: 4, .. }), "{err:?}");
    }

    #[test]
    fn test_iso_2022_jp_escapes() {
        let jis = codec("ISO-2022-JP");

        let bytes = jis.encode("日本").unwrap();
        assert!(bytes.starts_with(b"\x1b$B"));
        assert!(bytes.ends_with(b"\x1b(B"));
        assert_eq!(jis.decode(&bytes).unwrap(), "日本");
    }

    #[test]
    fn test_large_input_grows_buffers() {
        let euc_jp = codec("EUC-JP");
        let text = TEXT_UTF8.repeat(500);

        let bytes = euc_jp.encode(&text).unwrap();
        assert_eq!(euc_jp.decode(&bytes).unwrap(), text);
    }
}
