//! Hexadecimal views of byte streams and text, in C array style

use crate::Result;
use crate::pipeline::pivot_text;

/// Format every byte as `0x..`, comma separated
pub fn octets(input: &[u8]) -> String {
    input
        .iter()
        .map(|byte| format!("0x{byte:02x}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format every code point of UTF-8 text
///
/// Code points in the Basic Multilingual Plane take four hex digits, the
/// rest take eight.
pub fn code_points(input: &[u8]) -> Result<String> {
    let text = pivot_text(input)?;
    let points = text
        .chars()
        .map(|ch| match u32::from(ch) {
            cp @ 0..=0xFFFF => format!("0x{cp:04x}"),
            cp => format!("0x{cp:08x}"),
        })
        .collect::<Vec<_>>();
    Ok(points.join(", "))
}
