//! Phoneme vocabulary: a bijective map between symbols and token ids.
//!
//! Four special tokens are always reserved at ids 0..3 (`PAD`, `UNK`, `BOS`,
//! `EOS`) so the Inference Session can rely on their positions regardless of
//! how the rest of the vocabulary was built.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Reserved special-token ids.
pub const PAD: u32 = 0;
pub const UNK: u32 = 1;
pub const BOS: u32 = 2;
pub const EOS: u32 = 3;

const SPECIAL_SYMBOLS: [&str; 4] = ["<pad>", "<unk>", "<bos>", "<eos>"];

/// On-disk representation of a vocabulary: `{symbol: id}`.
type VocabMap = HashMap<String, u32>;

/// Bijective phoneme symbol ↔ token id map.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    symbol_to_id: HashMap<String, u32>,
    id_to_symbol: HashMap<u32, String>,
}

impl Vocabulary {
    /// An empty vocabulary containing only the four special tokens at ids 0..3.
    #[must_use]
    pub fn with_special_tokens() -> Self {
        let mut vocab = Self::default();
        for (id, symbol) in SPECIAL_SYMBOLS.iter().enumerate() {
            vocab.insert_at(*symbol, id as u32);
        }
        vocab
    }

    /// Build a vocabulary from a corpus of phoneme strings (space-separated
    /// symbols). Special tokens are inserted at ids 0..3, followed by the
    /// sorted-unique non-special symbols observed in the corpus.
    #[must_use]
    pub fn build_from_corpus<I, S>(corpus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut symbols: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        for line in corpus {
            for symbol in line.as_ref().split_whitespace() {
                if !SPECIAL_SYMBOLS.contains(&symbol) {
                    symbols.insert(symbol.to_owned());
                }
            }
        }

        let mut vocab = Self::with_special_tokens();
        for symbol in symbols {
            vocab.add(&symbol);
        }
        vocab
    }

    /// Load from a JSON object `{symbol: id}`, a JSON array of symbols
    /// (implicit positional ids), or a two-column whitespace-separated text
    /// form (`symbol<TAB or space>id` per line).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse vocabulary contents in any of the three accepted forms.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim_start();
        if trimmed.starts_with('{') {
            let map: VocabMap = serde_json::from_str(raw)?;
            Ok(Self::from_map(map))
        } else if trimmed.starts_with('[') {
            let symbols: Vec<String> = serde_json::from_str(raw)?;
            Ok(Self::from_ordered_symbols(symbols))
        } else {
            Self::from_text_columns(raw)
        }
    }

    fn from_map(map: VocabMap) -> Self {
        let mut vocab = Self::default();
        for (symbol, id) in map {
            vocab.insert_at(&symbol, id);
        }
        vocab
    }

    fn from_ordered_symbols(symbols: Vec<String>) -> Self {
        let mut vocab = Self::default();
        for (id, symbol) in symbols.into_iter().enumerate() {
            vocab.insert_at(&symbol, id as u32);
        }
        vocab
    }

    fn from_text_columns(raw: &str) -> Result<Self> {
        let mut vocab = Self::default();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let symbol = parts.next().ok_or_else(|| {
                EngineError::InvalidInput(format!("malformed vocabulary line: {line:?}"))
            })?;
            let id: u32 = parts
                .next()
                .ok_or_else(|| {
                    EngineError::InvalidInput(format!("missing id in vocabulary line: {line:?}"))
                })?
                .parse()
                .map_err(|_| {
                    EngineError::InvalidInput(format!("non-numeric id in vocabulary line: {line:?}"))
                })?;
            vocab.insert_at(symbol, id);
        }
        Ok(vocab)
    }

    /// Serialize as the `{symbol: id}` object form.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Serialize as the `{symbol: id}` object form, in-memory.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.symbol_to_id)?)
    }

    fn insert_at(&mut self, symbol: &str, id: u32) {
        self.symbol_to_id.insert(symbol.to_owned(), id);
        self.id_to_symbol.insert(id, symbol.to_owned());
    }

    /// Add `symbol` if not already present, assigning the next free id.
    /// Returns the symbol's (possibly pre-existing) id.
    pub fn add(&mut self, symbol: &str) -> u32 {
        if let Some(&id) = self.symbol_to_id.get(symbol) {
            return id;
        }
        let next_id = self.id_to_symbol.keys().max().map_or(0, |max| max + 1);
        self.insert_at(symbol, next_id);
        next_id
    }

    /// Token id for `symbol`, or [`UNK`] if unknown.
    #[must_use]
    pub fn id_of(&self, symbol: &str) -> u32 {
        self.symbol_to_id.get(symbol).copied().unwrap_or(UNK)
    }

    /// Symbol for `id`, or the empty string if unknown.
    #[must_use]
    pub fn symbol_of(&self, id: u32) -> &str {
        self.id_to_symbol.get(&id).map_or("", String::as_str)
    }

    /// Number of entries, including special tokens.
    #[must_use]
    pub fn size(&self) -> usize {
        self.symbol_to_id.len()
    }

    /// Whether `symbol` has an assigned id.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbol_to_id.contains_key(symbol)
    }

    /// Tokenize a space-joined phoneme string into ids, mapping unknown
    /// symbols to [`UNK`].
    #[must_use]
    pub fn encode(&self, phonemes: &str) -> Vec<u32> {
        phonemes
            .split_whitespace()
            .map(|symbol| self.id_of(symbol))
            .collect()
    }
}

/// Serializable snapshot of a vocabulary, for callers that want a typed view
/// rather than raw JSON (matches the `{symbol: id}` wire representation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularySnapshot(pub VocabMap);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_tokens_occupy_ids_zero_to_three() {
        let vocab = Vocabulary::with_special_tokens();
        assert_eq!(vocab.id_of("<pad>"), PAD);
        assert_eq!(vocab.id_of("<unk>"), UNK);
        assert_eq!(vocab.id_of("<bos>"), BOS);
        assert_eq!(vocab.id_of("<eos>"), EOS);
    }

    #[test]
    fn unknown_symbol_maps_to_unk() {
        let vocab = Vocabulary::with_special_tokens();
        assert_eq!(vocab.id_of("q"), UNK);
    }

    #[test]
    fn add_assigns_next_free_id_and_is_idempotent() {
        let mut vocab = Vocabulary::with_special_tokens();
        let id1 = vocab.add("a");
        let id2 = vocab.add("a");
        assert_eq!(id1, id2);
        assert_eq!(id1, 4);
    }

    #[test]
    fn build_from_corpus_inserts_sorted_unique_symbols() {
        let vocab = Vocabulary::build_from_corpus(["k o", "o a", "k a"]);
        // Special tokens first.
        assert_eq!(vocab.id_of("<pad>"), PAD);
        // Then sorted-unique: "a", "k", "o"
        assert_eq!(vocab.id_of("a"), 4);
        assert_eq!(vocab.id_of("k"), 5);
        assert_eq!(vocab.id_of("o"), 6);
    }

    #[test]
    fn round_trip_preserves_every_pair() {
        let mut vocab = Vocabulary::with_special_tokens();
        vocab.add("k");
        vocab.add("a");
        let json = vocab.to_json().expect("serialize");
        let restored = Vocabulary::parse(&json).expect("parse");
        assert_eq!(restored.size(), vocab.size());
        for (symbol, &id) in &vocab.symbol_to_id {
            assert_eq!(restored.id_of(symbol), id);
        }
    }

    #[test]
    fn parse_accepts_array_form() {
        let vocab = Vocabulary::parse(r#"["<pad>", "<unk>", "<bos>", "<eos>", "k", "a"]"#)
            .expect("parse array");
        assert_eq!(vocab.id_of("k"), 4);
        assert_eq!(vocab.id_of("a"), 5);
    }

    #[test]
    fn parse_accepts_two_column_text_form() {
        let vocab = Vocabulary::parse("<pad> 0\n<unk> 1\nk 10\na 11\n").expect("parse text");
        assert_eq!(vocab.id_of("k"), 10);
        assert_eq!(vocab.symbol_of(10), "k");
    }

    #[test]
    fn id_of_symbol_of_round_trip_or_unk() {
        let vocab = Vocabulary::build_from_corpus(["k a t a"]);
        for symbol in ["<pad>", "<unk>", "k", "a", "t"] {
            let id = vocab.id_of(symbol);
            let back = vocab.symbol_of(id);
            assert!(back == symbol || id == UNK);
        }
    }

    #[test]
    fn encode_maps_unknown_symbols_to_unk() {
        let vocab = Vocabulary::build_from_corpus(["k a"]);
        let ids = vocab.encode("k a q");
        assert_eq!(ids, vec![vocab.id_of("k"), vocab.id_of("a"), UNK]);
    }
}
