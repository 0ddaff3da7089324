//! Encoding name resolution.
//!
//! Names are looked up in the IANA character set table first, then among the
//! MIME labels known to `encoding_rs` (the WHATWG label set). Lookups ignore
//! ASCII case and surrounding whitespace.

use std::collections::HashMap;
use std::fmt;

use encoding_rs::Encoding;
use tracing::debug;

use crate::{Error, Result, Unsupported};

/// A resolved character encoding
///
/// Codecs compare equal when they denote the same encoding, whichever name
/// or naming authority they were resolved through.
#[derive(Debug, Clone, Copy)]
pub enum Codec {
    /// 7-bit US-ASCII; bytes above 0x7F are malformed
    Ascii,
    /// ISO-8859-1, each byte is the code point of the same value
    Latin1,
    /// UTF-16 with its byte order taken from a leading BOM, big-endian
    /// without one (RFC 2781); encodes big-endian with a BOM
    Utf16,
    /// An encoding backed by `encoding_rs`
    Standard(&'static Encoding),
}

impl Codec {
    /// The pivot encoding every conversion goes through
    pub fn pivot() -> Self {
        Codec::Standard(encoding_rs::UTF_8)
    }

    /// Get the canonical name of this encoding
    pub fn name(self) -> &'static str {
        match self {
            Codec::Ascii => "US-ASCII",
            Codec::Latin1 => "ISO-8859-1",
            Codec::Utf16 => "UTF-16",
            Codec::Standard(encoding) => encoding.name(),
        }
    }

    /// Whether this is the UTF-8 pivot
    pub fn is_pivot(self) -> bool {
        self == Codec::pivot()
    }

    /// Check if this encoding is ASCII-compatible (ASCII bytes 0-127 have same meaning)
    pub fn is_ascii_compatible(self) -> bool {
        match self {
            Codec::Ascii | Codec::Latin1 => true,
            Codec::Utf16 => false,
            Codec::Standard(encoding) => encoding.is_ascii_compatible(),
        }
    }

    /// Check if this encoding uses variable-length character representation
    pub fn is_multibyte(self) -> bool {
        match self {
            Codec::Ascii | Codec::Latin1 => false,
            Codec::Utf16 => true,
            Codec::Standard(encoding) => !encoding.is_single_byte(),
        }
    }

    /// Get the byte order mark (BOM) for this encoding if it has one
    pub fn bom(self) -> Option<&'static [u8]> {
        match self {
            Codec::Standard(encoding) if encoding == encoding_rs::UTF_8 => Some(&[0xEF, 0xBB, 0xBF]),
            Codec::Standard(encoding) if encoding == encoding_rs::UTF_16LE => Some(&[0xFF, 0xFE]),
            Codec::Standard(encoding) if encoding == encoding_rs::UTF_16BE => Some(&[0xFE, 0xFF]),
            Codec::Utf16 => Some(&[0xFE, 0xFF]),
            _ => None,
        }
    }

    /// Whether the codec can carry text in both directions
    fn is_usable(self) -> bool {
        match self {
            Codec::Standard(encoding) => encoding != encoding_rs::REPLACEMENT,
            _ => true,
        }
    }
}

impl PartialEq for Codec {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Codec {}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Naming authority that resolved an encoding name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// The IANA character set registry
    Iana,
    /// MIME charset labels as used on the web
    Mime,
}

/// One entry of the IANA character set table
#[derive(Debug)]
pub struct Charset {
    /// Preferred MIME name, or the IANA primary name
    pub name: &'static str,
    /// Registered aliases
    pub aliases: &'static [&'static str],
    codec: fn() -> Codec,
}

impl Charset {
    /// The codec this charset resolves to
    pub fn codec(&self) -> Codec {
        (self.codec)()
    }
}

macro_rules! charset {
    ($name:expr, [$($alias:expr),* $(,)?], $codec:expr) => {
        Charset {
            name: $name,
            aliases: &[$($alias),*],
            codec: || $codec,
        }
    };
}

fn standard(encoding: &'static Encoding) -> Codec {
    Codec::Standard(encoding)
}

static IANA_CHARSETS: &[Charset] = &[
    // Unicode
    charset!("UTF-8", ["csUTF8"], Codec::pivot()),
    charset!("UTF-16BE", ["csUTF16BE"], standard(encoding_rs::UTF_16BE)),
    charset!("UTF-16LE", ["csUTF16LE"], standard(encoding_rs::UTF_16LE)),
    charset!("UTF-16", ["csUTF16"], Codec::Utf16),
    // ASCII and Latin
    charset!(
        "US-ASCII",
        [
            "iso-ir-6",
            "ANSI_X3.4-1968",
            "ANSI_X3.4-1986",
            "ISO_646.irv:1991",
            "ISO646-US",
            "us",
            "IBM367",
            "cp367",
            "csASCII",
        ],
        Codec::Ascii
    ),
    charset!(
        "ISO-8859-1",
        ["iso-ir-100", "ISO_8859-1", "ISO_8859-1:1987", "latin1", "l1", "IBM819", "CP819", "csISOLatin1"],
        Codec::Latin1
    ),
    charset!(
        "ISO-8859-2",
        ["iso-ir-101", "ISO_8859-2", "ISO_8859-2:1987", "latin2", "l2", "csISOLatin2"],
        standard(encoding_rs::ISO_8859_2)
    ),
    charset!(
        "ISO-8859-3",
        ["iso-ir-109", "ISO_8859-3", "ISO_8859-3:1988", "latin3", "l3", "csISOLatin3"],
        standard(encoding_rs::ISO_8859_3)
    ),
    charset!(
        "ISO-8859-4",
        ["iso-ir-110", "ISO_8859-4", "ISO_8859-4:1988", "latin4", "l4", "csISOLatin4"],
        standard(encoding_rs::ISO_8859_4)
    ),
    charset!(
        "ISO-8859-5",
        ["iso-ir-144", "ISO_8859-5", "ISO_8859-5:1988", "cyrillic", "csISOLatinCyrillic"],
        standard(encoding_rs::ISO_8859_5)
    ),
    charset!(
        "ISO-8859-6",
        ["iso-ir-127", "ISO_8859-6", "ISO_8859-6:1987", "ECMA-114", "ASMO-708", "arabic", "csISOLatinArabic"],
        standard(encoding_rs::ISO_8859_6)
    ),
    charset!(
        "ISO-8859-7",
        ["iso-ir-126", "ISO_8859-7", "ISO_8859-7:1987", "ELOT_928", "ECMA-118", "greek", "greek8", "csISOLatinGreek"],
        standard(encoding_rs::ISO_8859_7)
    ),
    charset!(
        "ISO-8859-8",
        ["iso-ir-138", "ISO_8859-8", "ISO_8859-8:1988", "hebrew", "csISOLatinHebrew"],
        standard(encoding_rs::ISO_8859_8)
    ),
    charset!("ISO-8859-8-I", ["ISO_8859-8-I", "csISO88598I"], standard(encoding_rs::ISO_8859_8_I)),
    charset!(
        "ISO-8859-10",
        ["iso-ir-157", "l6", "ISO_8859-10:1992", "csISOLatin6", "latin6"],
        standard(encoding_rs::ISO_8859_10)
    ),
    charset!("ISO-8859-13", ["csISO885913"], standard(encoding_rs::ISO_8859_13)),
    charset!(
        "ISO-8859-14",
        ["iso-ir-199", "ISO_8859-14:1998", "ISO_8859-14", "latin8", "iso-celtic", "l8", "csISO885914"],
        standard(encoding_rs::ISO_8859_14)
    ),
    charset!("ISO-8859-15", ["ISO_8859-15", "Latin-9", "csISO885915"], standard(encoding_rs::ISO_8859_15)),
    charset!(
        "ISO-8859-16",
        ["iso-ir-226", "ISO_8859-16:2001", "ISO_8859-16", "latin10", "l10", "csISO885916"],
        standard(encoding_rs::ISO_8859_16)
    ),
    // Cyrillic
    charset!("KOI8-R", ["csKOI8R"], standard(encoding_rs::KOI8_R)),
    charset!("KOI8-U", ["csKOI8U"], standard(encoding_rs::KOI8_U)),
    charset!("IBM866", ["cp866", "866", "csIBM866"], standard(encoding_rs::IBM866)),
    // Windows code pages
    charset!("windows-874", ["cswindows874"], standard(encoding_rs::WINDOWS_874)),
    charset!("windows-1250", ["cswindows1250"], standard(encoding_rs::WINDOWS_1250)),
    charset!("windows-1251", ["cswindows1251"], standard(encoding_rs::WINDOWS_1251)),
    charset!("windows-1252", ["cswindows1252"], standard(encoding_rs::WINDOWS_1252)),
    charset!("windows-1253", ["cswindows1253"], standard(encoding_rs::WINDOWS_1253)),
    charset!("windows-1254", ["cswindows1254"], standard(encoding_rs::WINDOWS_1254)),
    charset!("windows-1255", ["cswindows1255"], standard(encoding_rs::WINDOWS_1255)),
    charset!("windows-1256", ["cswindows1256"], standard(encoding_rs::WINDOWS_1256)),
    charset!("windows-1257", ["cswindows1257"], standard(encoding_rs::WINDOWS_1257)),
    charset!("windows-1258", ["cswindows1258"], standard(encoding_rs::WINDOWS_1258)),
    // Mac
    charset!("macintosh", ["mac", "csMacintosh"], standard(encoding_rs::MACINTOSH)),
    // Japanese
    charset!("Shift_JIS", ["MS_Kanji", "csShiftJIS"], standard(encoding_rs::SHIFT_JIS)),
    charset!("Windows-31J", ["csWindows31J"], standard(encoding_rs::SHIFT_JIS)),
    charset!(
        "EUC-JP",
        ["Extended_UNIX_Code_Packed_Format_for_Japanese", "csEUCPkdFmtJapanese"],
        standard(encoding_rs::EUC_JP)
    ),
    charset!("ISO-2022-JP", ["csISO2022JP"], standard(encoding_rs::ISO_2022_JP)),
    // Korean
    charset!("EUC-KR", ["csEUCKR"], standard(encoding_rs::EUC_KR)),
    // Chinese
    charset!("GBK", ["CP936", "MS936", "windows-936", "csGBK"], standard(encoding_rs::GBK)),
    charset!("GB2312", ["csGB2312"], standard(encoding_rs::GBK)),
    charset!("GB18030", ["csGB18030"], standard(encoding_rs::GB18030)),
    charset!("Big5", ["csBig5"], standard(encoding_rs::BIG5)),
    charset!("Big5-HKSCS", ["csBig5HKSCS"], standard(encoding_rs::BIG5)),
];

/// Resolves encoding names to codecs
///
/// Build one at startup and share it by reference; it is immutable after
/// construction.
#[derive(Debug)]
pub struct Registry {
    iana: HashMap<String, Codec>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a registry holding the IANA table
    pub fn new() -> Self {
        let mut iana = HashMap::new();
        for charset in IANA_CHARSETS {
            let codec = charset.codec();
            for name in std::iter::once(&charset.name).chain(charset.aliases) {
                iana.insert(name.to_ascii_lowercase(), codec);
            }
        }
        Self { iana }
    }

    /// The IANA table, in registry order
    pub fn charsets(&self) -> &'static [Charset] {
        IANA_CHARSETS
    }

    /// Resolve a name, reporting which authority knew it
    pub fn lookup(&self, name: &str) -> Result<(Codec, Authority)> {
        let key = name.trim().to_ascii_lowercase();
        let found = match self.iana.get(&key) {
            Some(codec) => Some((*codec, Authority::Iana)),
            None => Encoding::for_label(key.as_bytes()).map(|e| (Codec::Standard(e), Authority::Mime)),
        };

        match found {
            Some((codec, authority)) if codec.is_usable() => {
                debug!(name, codec = codec.name(), ?authority, "resolved encoding name");
                Ok((codec, authority))
            }
            Some((codec, authority)) => {
                debug!(name, codec = codec.name(), ?authority, "encoding name resolves to no usable codec");
                Err(unsupported(name, Unsupported::Unusable))
            }
            None => Err(unsupported(name, Unsupported::NotFound)),
        }
    }

    /// Resolve a name to a codec
    pub fn resolve(&self, name: &str) -> Result<Codec> {
        self.lookup(name).map(|(codec, _)| codec)
    }
}

fn unsupported(name: &str, reason: Unsupported) -> Error {
    Error::UnsupportedEncoding {
        name: name.to_string(),
        reason,
        side: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = Registry::new();

        let names = ["utf-8", "UTF-8", "Utf-8", " utf-8 "];
        for name in names {
            assert_eq!(registry.resolve(name).unwrap(), Codec::pivot(), "{name}");
        }

        let sjis = registry.resolve("Shift_JIS").unwrap();
        assert_eq!(registry.resolve("shift_jis").unwrap(), sjis);
        assert_eq!(registry.resolve("SHIFT_JIS").unwrap(), sjis);
        assert_eq!(sjis.name(), "Shift_JIS");
    }

    #[test]
    fn test_iana_before_mime() {
        let registry = Registry::new();

        // The IANA table maps these to strict codecs; MIME labels would give windows-1252
        let (ascii, authority) = registry.lookup("us-ascii").unwrap();
        assert_eq!(ascii, Codec::Ascii);
        assert_eq!(authority, Authority::Iana);

        let (latin1, authority) = registry.lookup("latin1").unwrap();
        assert_eq!(latin1.name(), "ISO-8859-1");
        assert_eq!(authority, Authority::Iana);

        // MIME "utf-16" means little-endian; IANA UTF-16 sniffs the BOM
        let (utf16, authority) = registry.lookup("utf-16").unwrap();
        assert_eq!(utf16, Codec::Utf16);
        assert_eq!(authority, Authority::Iana);
        assert_eq!(utf16.bom(), Some([0xFE, 0xFF].as_slice()));
    }

    #[test]
    fn test_mime_fallback() {
        let registry = Registry::new();

        let (codec, authority) = registry.lookup("x-sjis").unwrap();
        assert_eq!(authority, Authority::Mime);
        assert_eq!(codec, registry.resolve("Shift_JIS").unwrap());

        let (codec, authority) = registry.lookup("unicode-1-1-utf-8").unwrap();
        assert_eq!(authority, Authority::Mime);
        assert!(codec.is_pivot());
    }

    #[test]
    fn test_unknown_name() {
        let registry = Registry::new();

        for name in ["definitely-not-an-encoding", "foo", ""] {
            let err = registry.resolve(name).unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::UnsupportedEncoding {
                        reason: Unsupported::NotFound,
                        side: None,
                        ..
                    }
                ),
                "{name}: {err:?}"
            );
        }
    }

    #[test]
    fn test_unusable_codec_is_distinguished() {
        let registry = Registry::new();

        let err = registry.resolve("iso-2022-kr").unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedEncoding {
                reason: Unsupported::Unusable,
                ..
            }
        ));
    }

    #[test]
    fn test_codec_equality_by_name() {
        let registry = Registry::new();

        // Different names and authorities, same encoding
        assert_eq!(registry.resolve("GB2312").unwrap(), registry.resolve("gbk").unwrap());
        assert_eq!(registry.resolve("csEUCKR").unwrap(), registry.resolve("korean").unwrap());
        assert_ne!(registry.resolve("ISO-8859-1").unwrap(), registry.resolve("windows-1252").unwrap());
    }

    #[test]
    fn test_codec_properties() {
        let registry = Registry::new();
        let sjis = registry.resolve("Shift_JIS").unwrap();
        let latin1 = registry.resolve("ISO-8859-1").unwrap();
        let utf16 = registry.resolve("UTF-16BE").unwrap();

        assert!(sjis.is_multibyte());
        assert!(sjis.is_ascii_compatible());
        assert!(!latin1.is_multibyte());
        assert!(!utf16.is_ascii_compatible());

        assert_eq!(Codec::pivot().bom(), Some([0xEF, 0xBB, 0xBF].as_slice()));
        assert_eq!(utf16.bom(), Some([0xFE, 0xFF].as_slice()));
        assert_eq!(sjis.bom(), None);
    }

    #[test]
    fn test_every_charset_resolves_to_itself() {
        let registry = Registry::new();

        for charset in registry.charsets() {
            assert_eq!(registry.resolve(charset.name).unwrap(), charset.codec(), "{}", charset.name);
            for alias in charset.aliases {
                assert_eq!(registry.resolve(alias).unwrap(), charset.codec(), "{alias}");
            }
        }
    }
}
