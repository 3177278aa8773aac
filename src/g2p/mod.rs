//! Grapheme-to-phoneme resolution: the three-level cascade that converts
//! morphemes into IPA-ish phoneme symbols (component C).

pub mod dictionary;
pub mod kana_rules;
pub mod neural;

use crate::segmenter::Morpheme;
use dictionary::Dictionary;
use neural::NeuralPhonemizer;
use std::sync::atomic::{AtomicU64, Ordering};

/// A single capability in the resolver cascade: attempt to resolve one
/// morpheme to phonemes, given the full request text as disambiguation
/// context. Composing an ordered `Vec<Box<dyn G2pStrategy>>` is itself a
/// `G2pStrategy` (see [`Resolver::resolve_morpheme`]).
pub trait G2pStrategy: Send + Sync {
    /// Attempt to resolve `morpheme`. `context` is the surrounding text the
    /// morpheme was segmented from, used by dictionary context matching.
    fn resolve(&self, morpheme: &Morpheme, context: &str) -> Option<Vec<String>>;

    /// Human-readable name, used by statistics/logging.
    fn name(&self) -> &'static str;
}

struct DictionaryStrategy<'a> {
    dictionary: &'a Dictionary,
}

impl G2pStrategy for DictionaryStrategy<'_> {
    fn resolve(&self, morpheme: &Morpheme, context: &str) -> Option<Vec<String>> {
        self.dictionary
            .lookup_conditioned(&morpheme.surface, &morpheme.reading, &morpheme.pos, context)
            .or_else(|| self.dictionary.lookup_scalar(&morpheme.surface))
    }

    fn name(&self) -> &'static str {
        "dictionary"
    }
}

struct NeuralStrategy<'a> {
    phonemizer: &'a NeuralPhonemizer,
}

impl G2pStrategy for NeuralStrategy<'_> {
    fn resolve(&self, morpheme: &Morpheme, _context: &str) -> Option<Vec<String>> {
        let symbols = self.phonemizer.phonemize(&morpheme.surface).ok()?;
        if symbols.is_empty() {
            None
        } else {
            Some(symbols)
        }
    }

    fn name(&self) -> &'static str {
        "neural"
    }
}

struct KanaRuleStrategy;

impl G2pStrategy for KanaRuleStrategy {
    fn resolve(&self, morpheme: &Morpheme, _context: &str) -> Option<Vec<String>> {
        if morpheme.reading.is_empty() {
            return None;
        }
        let phonemes = kana_rules::transliterate(&morpheme.reading);
        if phonemes.is_empty() {
            None
        } else {
            Some(phonemes.split_whitespace().map(str::to_owned).collect())
        }
    }

    fn name(&self) -> &'static str {
        "kana_rules"
    }
}

struct LastResortStrategy;

impl G2pStrategy for LastResortStrategy {
    fn resolve(&self, morpheme: &Morpheme, _context: &str) -> Option<Vec<String>> {
        let phonemes = kana_rules::transliterate(&morpheme.surface);
        if phonemes.is_empty() {
            None
        } else {
            Some(phonemes.split_whitespace().map(str::to_owned).collect())
        }
    }

    fn name(&self) -> &'static str {
        "last_resort"
    }
}

/// Resolver statistics (dictionary hits, neural fallbacks, total
/// morphemes processed), updated atomically.
#[derive(Debug, Default)]
pub struct ResolverStats {
    pub dictionary_hits: AtomicU64,
    pub neural_fallbacks: AtomicU64,
    pub total_morphemes: AtomicU64,
}

/// A snapshot of [`ResolverStats`] at a point in time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolverStatsSnapshot {
    pub dictionary_hits: u64,
    pub neural_fallbacks: u64,
    pub total_morphemes: u64,
}

impl ResolverStats {
    fn snapshot(&self) -> ResolverStatsSnapshot {
        ResolverStatsSnapshot {
            dictionary_hits: self.dictionary_hits.load(Ordering::Relaxed),
            neural_fallbacks: self.neural_fallbacks.load(Ordering::Relaxed),
            total_morphemes: self.total_morphemes.load(Ordering::Relaxed),
        }
    }
}

/// G2P resolver: the dictionary + neural + kana-rule cascade (component C).
pub struct Resolver {
    dictionary: Dictionary,
    phonemizer: Option<NeuralPhonemizer>,
    stats: ResolverStats,
}

impl Resolver {
    #[must_use]
    pub fn new(dictionary: Dictionary, phonemizer: Option<NeuralPhonemizer>) -> Self {
        Self {
            dictionary,
            phonemizer,
            stats: ResolverStats::default(),
        }
    }

    /// Resolve a single morpheme through the full cascade, in order:
    /// dictionary → neural → kana rules → last resort. The only hard
    /// failure is an empty surface, which yields no phonemes.
    fn resolve_morpheme(&self, morpheme: &Morpheme, context: &str) -> Vec<String> {
        if morpheme.surface.is_empty() {
            return Vec::new();
        }

        self.stats.total_morphemes.fetch_add(1, Ordering::Relaxed);

        let dict_strategy = DictionaryStrategy {
            dictionary: &self.dictionary,
        };
        if let Some(phonemes) = dict_strategy.resolve(morpheme, context) {
            self.stats.dictionary_hits.fetch_add(1, Ordering::Relaxed);
            return phonemes;
        }

        if let Some(phonemizer) = &self.phonemizer {
            let neural_strategy = NeuralStrategy { phonemizer };
            if let Some(phonemes) = neural_strategy.resolve(morpheme, context) {
                self.stats.neural_fallbacks.fetch_add(1, Ordering::Relaxed);
                return phonemes;
            }
        }

        if let Some(phonemes) = KanaRuleStrategy.resolve(morpheme, context) {
            return phonemes;
        }

        LastResortStrategy.resolve(morpheme, context).unwrap_or_default()
    }

    /// Resolve an ordered morpheme sequence to a single space-joined,
    /// post-processed phoneme string.
    #[must_use]
    pub fn resolve(&self, morphemes: &[Morpheme], full_text: &str) -> String {
        if morphemes.is_empty() {
            return String::new();
        }

        let mut joined = String::new();
        for morpheme in morphemes {
            let phonemes = self.resolve_morpheme(morpheme, full_text);
            if phonemes.is_empty() {
                continue;
            }
            if !joined.is_empty() {
                joined.push(' ');
            }
            joined.push_str(&phonemes.join(" "));
        }

        let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
        kana_rules::realize_geminates(collapsed.trim())
    }

    /// Current resolver statistics.
    #[must_use]
    pub fn stats(&self) -> ResolverStatsSnapshot {
        self.stats.snapshot()
    }

    /// Direct access to the dictionary, for runtime additions.
    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::fallback_segment;

    #[test]
    fn empty_input_yields_empty_output() {
        let resolver = Resolver::new(Dictionary::default(), None);
        assert_eq!(resolver.resolve(&[], ""), "");
    }

    #[test]
    fn scalar_dictionary_hit_is_used_and_counted() {
        let mut dict = Dictionary::default();
        dict.add_scalar("こんにちは", vec![
            "k".into(), "o".into(), "ɴ".into(), "n".into(), "i".into(),
            "tɕ".into(), "i".into(), "w".into(), "a".into(),
        ]);
        let resolver = Resolver::new(dict, None);
        let morphemes = fallback_segment("こんにちは");
        let phonemes = resolver.resolve(&morphemes, "こんにちは");
        assert_eq!(phonemes, "k o ɴ n i tɕ i w a");
        assert_eq!(resolver.stats().dictionary_hits, 1);
        assert_eq!(resolver.stats().total_morphemes, 1);
    }

    #[test]
    fn falls_back_to_kana_rules_without_dictionary_entry() {
        let resolver = Resolver::new(Dictionary::default(), None);
        let morphemes = fallback_segment("ほん");
        let phonemes = resolver.resolve(&morphemes, "ほん");
        assert_eq!(phonemes, "h o ɴ");
    }

    #[test]
    fn last_resort_handles_kanji_with_no_reading() {
        // Kanji morphemes from the fallback segmenter carry an empty
        // reading, so kana rules can't help; last resort falls through to
        // the surface, which also has no kana to transliterate, so the
        // Kanji passes through untouched as a single leftover token.
        let resolver = Resolver::new(Dictionary::default(), None);
        let morphemes = fallback_segment("世界");
        let phonemes = resolver.resolve(&morphemes, "世界");
        assert_eq!(phonemes, "世 界");
    }

    #[test]
    fn geminate_is_realized_across_morpheme_join() {
        let mut dict = Dictionary::default();
        dict.add_scalar("学校", vec!["g".into(), "a".into(), "q".into(), "k".into(), "o".into(), "u".into()]);
        let resolver = Resolver::new(dict, None);
        let morphemes = fallback_segment("学校");
        assert_eq!(resolver.resolve(&morphemes, "学校"), "g a k k o u");
    }
}
