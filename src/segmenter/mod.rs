//! Morphological segmentation: Japanese text → ordered morpheme sequence.
//!
//! Two dispatch modes, matching the `{primary, fallback}` capability split
//! called out for this component: a `primary` externally supplied analyzer
//! (consumed via the [`MorphologicalAnalyzer`] trait, e.g. a MeCab/UniDic
//! tagger — not implemented in this core) and a `fallback` script-boundary
//! segmenter, fully implemented here.

use crate::error::Result;

/// Offset between the Katakana and Hiragana blocks (`0x30A1 - 0x3041`).
const KATAKANA_HIRAGANA_OFFSET: u32 = 0x60;

const HIRAGANA_RANGE: std::ops::RangeInclusive<u32> = 0x3040..=0x309F;
const KATAKANA_RANGE: std::ops::RangeInclusive<u32> = 0x30A0..=0x30FF;
const KANJI_RANGE: std::ops::RangeInclusive<u32> = 0x4E00..=0x9FAF;

/// A single morphological unit produced by the segmenter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Morpheme {
    /// The literal text as it appeared in the input.
    pub surface: String,
    /// Katakana reading; empty when the segmenter lacks coverage (e.g. Kanji
    /// under the fallback segmenter).
    pub reading: String,
    /// Pronunciation (phonetic spelling); primary analyzers may distinguish
    /// this from `reading` (e.g. sandhi). The fallback segmenter sets it
    /// equal to `reading`.
    pub pronunciation: String,
    /// Part of speech tag. `"symbol"` for fallback-segmented punctuation.
    pub pos: String,
    /// Dictionary base/lemma form; the fallback segmenter sets it equal to
    /// `surface`.
    pub base_form: String,
}

impl Morpheme {
    fn new(surface: impl Into<String>, reading: impl Into<String>, pos: impl Into<String>) -> Self {
        let surface = surface.into();
        let reading = reading.into();
        let base_form = surface.clone();
        Self {
            pronunciation: reading.clone(),
            surface,
            reading,
            pos: pos.into(),
            base_form,
        }
    }
}

/// A consumed external collaborator: a Japanese morphological analyzer
/// (e.g. MeCab/UniDic-backed). The core only defines the seam; no concrete
/// implementation ships here (see SPEC_FULL §6).
pub trait MorphologicalAnalyzer: Send + Sync {
    /// Parse `text` into an ordered morpheme sequence.
    fn parse(&self, text: &str) -> Result<Vec<Morpheme>>;
}

/// Character-script classification used to decide where fallback morpheme
/// boundaries fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Hiragana,
    Katakana,
    Kanji,
    Other,
}

fn classify(c: char) -> Script {
    let code = c as u32;
    if HIRAGANA_RANGE.contains(&code) {
        Script::Hiragana
    } else if KATAKANA_RANGE.contains(&code) {
        Script::Katakana
    } else if KANJI_RANGE.contains(&code) {
        Script::Kanji
    } else {
        Script::Other
    }
}

/// True if `c` is punctuation or ASCII (the fallback segmenter's "other"
/// script class, emitted one morpheme per codepoint).
fn is_punctuation_or_ascii(c: char) -> bool {
    classify(c) == Script::Other
}

/// True if `s` contains at least one Kanji codepoint.
#[must_use]
pub fn contains_kanji(s: &str) -> bool {
    s.chars().any(|c| classify(c) == Script::Kanji)
}

/// True if `s` is non-empty and every codepoint is Hiragana.
#[must_use]
pub fn is_pure_hiragana(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| classify(c) == Script::Hiragana)
}

/// True if `s` is non-empty and every codepoint is Katakana.
#[must_use]
pub fn is_pure_katakana(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| classify(c) == Script::Katakana)
}

/// Convert a Hiragana string to Katakana, codepoint by codepoint. Codepoints
/// outside the Hiragana range pass through unchanged.
#[must_use]
pub fn hiragana_to_katakana(s: &str) -> String {
    s.chars()
        .map(|c| {
            if classify(c) == Script::Hiragana {
                char::from_u32(c as u32 + KATAKANA_HIRAGANA_OFFSET).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

/// Convert a Katakana string to Hiragana, codepoint by codepoint. Codepoints
/// outside the Katakana range pass through unchanged.
#[must_use]
pub fn katakana_to_hiragana(s: &str) -> String {
    s.chars()
        .map(|c| {
            if classify(c) == Script::Katakana {
                char::from_u32(c as u32 - KATAKANA_HIRAGANA_OFFSET).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

/// Normalize text before segmentation: full-width ASCII `U+FF01..U+FF5E` →
/// half-width, ideographic space `U+3000` → `0x20`.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if code == 0x3000 {
                ' '
            } else if (0xFF01..=0xFF5E).contains(&code) {
                char::from_u32(code - 0xFEE0).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

/// Segments Japanese text into morphemes, optionally deferring to a
/// primary [`MorphologicalAnalyzer`] before falling back to script-boundary
/// segmentation.
pub struct Segmenter {
    primary: Option<Box<dyn MorphologicalAnalyzer>>,
    normalize_by_default: bool,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            primary: None,
            normalize_by_default: true,
        }
    }
}

impl Segmenter {
    /// A segmenter that always uses the fallback script-boundary algorithm.
    #[must_use]
    pub fn fallback_only(normalize_by_default: bool) -> Self {
        Self {
            primary: None,
            normalize_by_default,
        }
    }

    /// A segmenter backed by a primary analyzer, falling back to
    /// script-boundary segmentation if none is supplied.
    #[must_use]
    pub fn with_primary(analyzer: Box<dyn MorphologicalAnalyzer>, normalize_by_default: bool) -> Self {
        Self {
            primary: Some(analyzer),
            normalize_by_default,
        }
    }

    /// Segment `text`, applying [`normalize_text`] first unless
    /// `normalize` is explicitly `Some(false)` (defaults to the segmenter's
    /// configured default).
    pub fn segment(&self, text: &str, normalize: Option<bool>) -> Result<Vec<Morpheme>> {
        let should_normalize = normalize.unwrap_or(self.normalize_by_default);
        let text = if should_normalize {
            normalize_text(text)
        } else {
            text.to_owned()
        };

        if let Some(analyzer) = &self.primary {
            return analyzer.parse(&text);
        }

        Ok(fallback_segment(&text))
    }
}

/// Script-boundary fallback segmentation (component B, fully implemented in
/// this core — see SPEC_FULL §4.2).
#[must_use]
pub fn fallback_segment(text: &str) -> Vec<Morpheme> {
    let mut morphemes = Vec::new();
    let mut current = String::new();
    let mut current_script: Option<Script> = None;

    let flush = |current: &mut String, morphemes: &mut Vec<Morpheme>| {
        if current.is_empty() {
            return;
        }
        let reading = if is_pure_hiragana(current) {
            hiragana_to_katakana(current)
        } else if is_pure_katakana(current) {
            current.clone()
        } else {
            String::new()
        };
        morphemes.push(Morpheme::new(current.clone(), reading, "word"));
        current.clear();
    };

    for c in text.chars() {
        let script = classify(c);
        if script == Script::Other {
            flush(&mut current, &mut morphemes);
            if !c.is_whitespace() {
                morphemes.push(Morpheme::new(c.to_string(), "", "symbol"));
            }
            current_script = None;
            continue;
        }

        if current_script.is_some_and(|prev| prev != script) {
            flush(&mut current, &mut morphemes);
        }
        current.push(c);
        current_script = Some(script);
    }
    flush(&mut current, &mut morphemes);

    morphemes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_segments_script_transitions() {
        let morphemes = fallback_segment("こんにちは世界");
        // "こんにちは" (hiragana) then "世界" (kanji)
        assert_eq!(morphemes.len(), 2);
        assert_eq!(morphemes[0].surface, "こんにちは");
        assert_eq!(morphemes[0].reading, "コンニチハ");
        assert_eq!(morphemes[1].surface, "世界");
        assert_eq!(morphemes[1].reading, "");
    }

    #[test]
    fn fallback_emits_one_morpheme_per_punctuation_codepoint() {
        let morphemes = fallback_segment("あ、い。う！");
        let symbols: Vec<_> = morphemes.iter().filter(|m| m.pos == "symbol").collect();
        assert_eq!(symbols.len(), 3);
        for m in symbols {
            assert_eq!(m.surface.chars().count(), 1);
        }
    }

    #[test]
    fn fallback_katakana_reading_equals_surface() {
        let morphemes = fallback_segment("コーヒー");
        assert_eq!(morphemes.len(), 1);
        assert_eq!(morphemes[0].reading, "コーヒー");
    }

    #[test]
    fn whitespace_is_dropped_not_emitted_as_symbol() {
        let morphemes = fallback_segment("あ い");
        assert_eq!(morphemes.len(), 2);
        assert!(morphemes.iter().all(|m| m.pos != "symbol"));
    }

    #[test]
    fn kana_round_trip_hiragana_to_katakana_to_hiragana() {
        let s = "こんにちは";
        assert_eq!(katakana_to_hiragana(&hiragana_to_katakana(s)), s);
    }

    #[test]
    fn normalize_text_maps_fullwidth_ascii_and_ideographic_space() {
        assert_eq!(normalize_text("\u{3000}"), " ");
        assert_eq!(normalize_text("\u{FF21}"), "A"); // fullwidth 'A'
        assert_eq!(normalize_text("\u{FF01}"), "!"); // fullwidth '!'
    }

    #[test]
    fn contains_kanji_predicate() {
        assert!(contains_kanji("世界"));
        assert!(!contains_kanji("こんにちは"));
    }

    #[test]
    fn segmenter_default_normalizes_before_fallback() {
        let segmenter = Segmenter::default();
        let morphemes = segmenter.segment("\u{3000}あ", None).expect("segment");
        // The leading ideographic space normalizes to an ASCII space and is dropped.
        assert_eq!(morphemes.len(), 1);
        assert_eq!(morphemes[0].surface, "あ");
    }
}
