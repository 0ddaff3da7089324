//! Encoding detection on top of `chardetng`
//!
//! A byte order mark decides on its own. Otherwise the Unicode encodings,
//! ASCII and ISO-2022-JP are judged by byte structure, and `chardetng` ranks
//! the legacy encodings. It is asked once without a domain hint and once per
//! language's top-level domain, so that the runners-up show in the result.
//! Every candidate has to decode the sample without a single error.

use std::io::Read;

use chardetng::EncodingDetector;
use serde::Serialize;
use tracing::{debug, trace};

use crate::multibyte;
use crate::registry::{Codec, Registry};
use crate::{Error, Result};

/// Default number of leading bytes examined
pub const DEFAULT_SAMPLE_SIZE: usize = 8192;

const MIN_SAMPLE_SIZE: usize = 64;

/// One candidate encoding with its confidence
#[derive(Debug, Clone, Serialize)]
pub struct Guess {
    /// Canonical encoding name
    pub encoding: &'static str,
    /// Confidence score (0 to 100)
    pub confidence: u8,
    /// The candidate's codec
    #[serde(skip)]
    pub codec: Codec,
}

/// Ranked result of encoding detection
///
/// Never empty: detection that finds no candidate fails instead.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    bom_detected: bool,
    sample_size: usize,
    guesses: Vec<Guess>,
}

impl DetectionResult {
    fn single(codec: Codec, bom_detected: bool, sample_size: usize) -> Self {
        Self {
            bom_detected,
            sample_size,
            guesses: vec![Guess {
                encoding: codec.name(),
                confidence: 100,
                codec,
            }],
        }
    }

    /// Most likely encoding
    pub fn best(&self) -> &Guess {
        &self.guesses[0]
    }

    /// All candidates, best first
    pub fn guesses(&self) -> &[Guess] {
        &self.guesses
    }

    /// Candidate names, best first
    pub fn names(&self) -> Vec<&'static str> {
        self.guesses.iter().map(|guess| guess.encoding).collect()
    }

    /// Whether a byte order mark decided the result
    pub fn bom_detected(&self) -> bool {
        self.bom_detected
    }

    /// Number of bytes examined
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }
}

/// Sort by descending confidence, then by name so that ties are stable
/// across runs.
fn rank(guesses: &mut [Guess]) {
    guesses.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then_with(|| a.encoding.cmp(b.encoding))
    });
}

/// Encoding detector over a fixed candidate set
#[derive(Debug)]
pub struct Detector {
    /// Maximum bytes to analyze for detection
    max_sample_size: usize,
    candidates: Vec<Candidate>,
    legacy: Vec<Codec>,
}

#[derive(Debug)]
struct Candidate {
    codec: Codec,
    model: Model,
}

static CANDIDATES: &[(&str, Model)] = &[
    ("UTF-8", Model::Utf8),
    ("UTF-16LE", Model::Utf16 { big_endian: false }),
    ("UTF-16BE", Model::Utf16 { big_endian: true }),
    ("US-ASCII", Model::Ascii),
    ("ISO-2022-JP", Model::Iso2022Jp),
];

/// Legacy encodings `chardetng` can answer with
static LEGACY: &[&str] = &[
    "Shift_JIS",
    "EUC-JP",
    "EUC-KR",
    "GBK",
    "Big5",
    "windows-874",
    "windows-1250",
    "windows-1251",
    "windows-1252",
    "windows-1253",
    "windows-1254",
    "windows-1255",
    "windows-1256",
    "windows-1257",
    "windows-1258",
    "ISO-8859-2",
    "ISO-8859-4",
    "ISO-8859-5",
    "ISO-8859-6",
    "ISO-8859-7",
    "ISO-8859-8",
    "ISO-8859-8-I",
    "ISO-8859-13",
    "IBM866",
    "KOI8-U",
];

/// Confidence of the guess made without a domain hint
const UNHINTED: (u8, u8) = (95, 85);
/// Confidence of a guess steered by a language's top-level domain
const DOMAIN_HINTED: (u8, u8) = (60, 40);

impl Detector {
    /// Create a detector, resolving its candidates through `registry`
    pub fn new(registry: &Registry) -> Result<Self> {
        Self::with_sample_size(registry, DEFAULT_SAMPLE_SIZE)
    }

    /// Create detector with custom sample size
    pub fn with_sample_size(registry: &Registry, max_sample_size: usize) -> Result<Self> {
        let candidates = CANDIDATES
            .iter()
            .map(|&(name, model)| -> Result<Candidate> {
                Ok(Candidate {
                    codec: registry.resolve(name)?,
                    model,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let legacy = LEGACY
            .iter()
            .map(|name| registry.resolve(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            max_sample_size: max_sample_size.max(MIN_SAMPLE_SIZE),
            candidates,
            legacy,
        })
    }

    /// Detect encoding of the given data
    pub fn detect(&self, data: &[u8]) -> Result<DetectionResult> {
        let truncated = data.len() > self.max_sample_size;
        let sample = &data[..data.len().min(self.max_sample_size)];

        if sample.is_empty() {
            return Ok(DetectionResult::single(Codec::pivot(), false, 0));
        }

        // A BOM decides on its own
        if let Some(codec) = self.detect_bom(sample) {
            debug!(encoding = codec.name(), "byte order mark found");
            return Ok(DetectionResult::single(codec, true, sample.len()));
        }

        let mut guesses = Vec::new();
        for candidate in &self.candidates {
            let text = match multibyte::decode(candidate.codec, sample, !truncated) {
                Ok(text) => text,
                Err(err) => {
                    trace!(encoding = candidate.codec.name(), %err, "candidate rejected");
                    continue;
                }
            };

            let score = candidate.model.score(sample, &text);
            let confidence = score.round().clamp(0.0, 100.0) as u8;
            trace!(encoding = candidate.codec.name(), confidence, "candidate scored");

            if confidence > 0 {
                guesses.push(Guess {
                    encoding: candidate.codec.name(),
                    confidence,
                    codec: candidate.codec,
                });
            }
        }

        if !sample.is_ascii() {
            guesses.extend(self.legacy_guesses(sample, !truncated));
        }

        if guesses.is_empty() {
            return Err(Error::DetectionFailed {
                cause: format!("no candidate encoding fits the {} byte sample", sample.len()),
            });
        }

        rank(&mut guesses);
        debug!(
            best = guesses[0].encoding,
            confidence = guesses[0].confidence,
            candidates = guesses.len(),
            "encoding detected"
        );

        Ok(DetectionResult {
            bom_detected: false,
            sample_size: sample.len(),
            guesses,
        })
    }

    /// Read a whole stream and detect its encoding
    ///
    /// A missing stream is [`Error::NullSource`]; an empty one detects as UTF-8.
    pub fn detect_reader<R: Read>(&self, reader: Option<R>) -> Result<DetectionResult> {
        let input = crate::read_source(reader)?;
        self.detect(&input)
    }

    /// Detect encoding with language hint
    ///
    /// Candidates used for the hinted language get a 10% boost. Unknown
    /// hints leave the result unchanged.
    pub fn detect_with_hint(&self, data: &[u8], language_hint: &str) -> Result<DetectionResult> {
        let mut result = self.detect(data)?;

        let Some(language) = Language::from_hint(language_hint) else {
            return Ok(result);
        };

        for guess in &mut result.guesses {
            if language.encodings().contains(&guess.encoding) {
                guess.confidence = (f64::from(guess.confidence) * 1.1).round().min(100.0) as u8;
            }
        }
        rank(&mut result.guesses);

        Ok(result)
    }

    /// Ask `chardetng` without a domain and then with each language's
    /// domain; every distinct answer that decodes into text is kept at its
    /// best confidence.
    fn legacy_guesses(&self, sample: &[u8], last: bool) -> Vec<Guess> {
        let mut detector = EncodingDetector::new();
        detector.feed(sample, last);

        let domains = Language::ALL.iter().map(|language| Some(language.top_level_domain()));
        let mut guesses: Vec<Guess> = Vec::new();
        let mut rejected: Vec<Codec> = Vec::new();

        for domain in std::iter::once(None).chain(domains) {
            let (encoding, assured) = detector.guess_assess(domain.map(str::as_bytes), false);
            let (high, low) = if domain.is_none() { UNHINTED } else { DOMAIN_HINTED };
            let confidence = if assured { high } else { low };

            let Some(&codec) = self.legacy.iter().find(|codec| codec.name() == encoding.name()) else {
                trace!(encoding = encoding.name(), "guess outside the candidate set");
                continue;
            };
            if rejected.contains(&codec) {
                continue;
            }
            if let Some(guess) = guesses.iter_mut().find(|guess| guess.codec == codec) {
                guess.confidence = guess.confidence.max(confidence);
                continue;
            }

            match multibyte::decode(codec, sample, last) {
                Ok(text) if reads_as_text(&text) => {
                    trace!(encoding = codec.name(), domain, assured, confidence, "candidate scored");
                    guesses.push(Guess {
                        encoding: codec.name(),
                        confidence,
                        codec,
                    });
                }
                Ok(_) => {
                    trace!(encoding = codec.name(), "candidate decodes to no words");
                    rejected.push(codec);
                }
                Err(err) => {
                    trace!(encoding = codec.name(), %err, "candidate rejected");
                    rejected.push(codec);
                }
            }
        }

        guesses
    }

    fn detect_bom(&self, sample: &[u8]) -> Option<Codec> {
        self.candidates
            .iter()
            .map(|candidate| candidate.codec)
            .find(|codec| codec.bom().is_some_and(|bom| sample.starts_with(bom)))
    }
}

/// Languages a detection hint can name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// Japanese
    Japanese,
    /// Korean
    Korean,
    /// Chinese in simplified script
    SimplifiedChinese,
    /// Chinese in traditional script
    TraditionalChinese,
    /// Russian and other Cyrillic languages
    Russian,
    /// Greek
    Greek,
    /// Hebrew
    Hebrew,
    /// Arabic
    Arabic,
    /// English, German, French, Spanish and related languages
    WesternEuropean,
    /// Polish, Czech, Hungarian and related languages
    CentralEuropean,
}

impl Language {
    /// Every language, in declaration order
    pub const ALL: [Language; 10] = [
        Language::Japanese,
        Language::Korean,
        Language::SimplifiedChinese,
        Language::TraditionalChinese,
        Language::Russian,
        Language::Greek,
        Language::Hebrew,
        Language::Arabic,
        Language::WesternEuropean,
        Language::CentralEuropean,
    ];

    /// Parse a language name or code, ignoring case
    pub fn from_hint(hint: &str) -> Option<Self> {
        let language = match hint.trim().to_lowercase().as_str() {
            "japanese" | "ja" | "jp" => Language::Japanese,
            "korean" | "ko" | "kr" => Language::Korean,
            "chinese" | "zh" | "zh-cn" | "zh-hans" => Language::SimplifiedChinese,
            "zh-tw" | "zh-hk" | "zh-hant" => Language::TraditionalChinese,
            "russian" | "ru" | "ukrainian" | "uk" | "cyrillic" => Language::Russian,
            "greek" | "el" => Language::Greek,
            "hebrew" | "he" => Language::Hebrew,
            "arabic" | "ar" => Language::Arabic,
            "english" | "en" | "german" | "de" | "french" | "fr" | "spanish" | "es" => Language::WesternEuropean,
            "polish" | "pl" | "czech" | "cs" | "cz" | "hungarian" | "hu" => Language::CentralEuropean,
            _ => return None,
        };
        Some(language)
    }

    /// Canonical names of the encodings commonly used for this language
    pub fn encodings(self) -> &'static [&'static str] {
        match self {
            Language::Japanese => &["Shift_JIS", "EUC-JP", "ISO-2022-JP"],
            Language::Korean => &["EUC-KR"],
            Language::SimplifiedChinese => &["GBK", "gb18030"],
            Language::TraditionalChinese => &["Big5"],
            Language::Russian => &["windows-1251", "KOI8-U", "IBM866", "ISO-8859-5"],
            Language::Greek => &["windows-1253", "ISO-8859-7"],
            Language::Hebrew => &["windows-1255", "ISO-8859-8", "ISO-8859-8-I"],
            Language::Arabic => &["windows-1256", "ISO-8859-6"],
            Language::WesternEuropean => &["windows-1252"],
            Language::CentralEuropean => &["windows-1250", "ISO-8859-2"],
        }
    }

    /// Top-level domain whose content `chardetng` associates with the language
    fn top_level_domain(self) -> &'static str {
        match self {
            Language::Japanese => "jp",
            Language::Korean => "kr",
            Language::SimplifiedChinese => "cn",
            Language::TraditionalChinese => "tw",
            Language::Russian => "ru",
            Language::Greek => "gr",
            Language::Hebrew => "il",
            Language::Arabic => "sa",
            Language::WesternEuropean => "de",
            Language::CentralEuropean => "pl",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Model {
    Utf8,
    Utf16 { big_endian: bool },
    Ascii,
    Iso2022Jp,
}

impl Model {
    /// Score a sample that already decoded cleanly into `text`
    fn score(self, sample: &[u8], text: &str) -> f64 {
        match self {
            // Valid UTF-8 with any non-ASCII character beats every legacy guess
            Model::Utf8 if text.is_ascii() => 80.0,
            Model::Utf8 => 100.0,
            Model::Utf16 { big_endian } => score_utf16(sample, big_endian),
            Model::Ascii => 70.0,
            Model::Iso2022Jp => score_iso_2022_jp(sample),
        }
    }
}

/// Text in UTF-16 without a BOM still shows zero high bytes for every
/// ASCII character.
fn score_utf16(sample: &[u8], big_endian: bool) -> f64 {
    let mut total_units = 0u32;
    let mut text_units = 0u32;

    for unit in sample.chunks_exact(2) {
        let (high, low) = if big_endian { (unit[0], unit[1]) } else { (unit[1], unit[0]) };
        total_units += 1;
        if high == 0 && (low.is_ascii_graphic() || low.is_ascii_whitespace()) {
            text_units += 1;
        }
    }

    if total_units == 0 {
        return 0.0;
    }
    let ratio = f64::from(text_units) / f64::from(total_units);
    if ratio > 0.6 { ratio * 90.0 } else { 0.0 }
}

/// Pure ASCII decodes as ISO-2022-JP too; only a JIS escape counts.
fn score_iso_2022_jp(sample: &[u8]) -> f64 {
    let escaped = sample
        .windows(3)
        .any(|seq| matches!(seq, [0x1b, b'$', b'@' | b'B'] | [0x1b, b'(', b'J' | b'I']));
    if escaped { 95.0 } else { 0.0 }
}

/// A lone non-ASCII symbol is how mis-decoded bytes usually look; text has
/// at least one non-ASCII letter next to another letter.
fn reads_as_text(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(2).any(|pair| {
        pair.iter().all(|ch| ch.is_alphabetic()) && pair.iter().any(|ch| !ch.is_ascii())
    })
}
