//! Removal of UTF-8 byte order marks

use crate::Result;
use crate::pipeline::pivot_text;

const BOM: char = '\u{FEFF}';

/// Remove every byte order mark from UTF-8 bytes
///
/// Marks are removed wherever they occur, not only at the start. Input
/// that is not valid UTF-8 is an error.
pub fn remove_bom(input: &[u8]) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    let text = pivot_text(input)?;
    Ok(remove_bom_str(text).into_bytes())
}

/// Remove every byte order mark from a string
pub fn remove_bom_str(text: &str) -> String {
    text.replace(BOM, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, Error};

    #[test]
    fn test_remove_bom() {
        let cases: [(&[u8], &[u8]); 4] = [
            (b"", b""),
            (b"Hello", b"Hello"),
            (b"\xef\xbb\xbfHello", b"Hello"),
            (b"\xef\xbb\xbfHell\xef\xbb\xbfo", b"Hello"),
        ];
        for (input, expected) in cases {
            assert_eq!(remove_bom(input).unwrap(), expected);
        }
    }

    #[test]
    fn test_remove_bom_rejects_invalid_utf8() {
        let err = remove_bom(b"\xef\xbb\xbf\xff").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidEncodingInput {
                direction: Direction::Decode,
                encoding: "UTF-8",
                ..
            }
        ));
    }

    #[test]
    fn test_remove_bom_str() {
        assert_eq!(remove_bom_str(""), "");
        assert_eq!(remove_bom_str("\u{FEFF}こんにちは"), "こんにちは");
    }
}
