//! Pronunciation dictionary: scalar and reading-conditioned word → phoneme
//! mappings (G2P cascade levels 1 and 2).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A single reading-conditioned dictionary entry. `reading`, `pos`, and
/// `context` are disambiguators: an empty value matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictEntry {
    #[serde(default)]
    pub reading: String,
    #[serde(default)]
    pub pos: String,
    /// Substring that must appear in the surrounding text for this entry to
    /// match; empty matches unconditionally.
    #[serde(default)]
    pub context: String,
    pub phonemes: Vec<String>,
}

/// On-disk dictionary snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionarySnapshot {
    /// Reading-conditioned table: surface → ordered candidate entries.
    #[serde(default)]
    pub conditioned: HashMap<String, Vec<DictEntry>>,
    /// Scalar table: surface → phonemes.
    #[serde(default)]
    pub scalar: HashMap<String, Vec<String>>,
}

/// Bulk-loaded, runtime-addable, snapshot-serializable pronunciation
/// dictionary.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    conditioned: HashMap<String, Vec<DictEntry>>,
    scalar: HashMap<String, Vec<String>>,
}

impl Dictionary {
    /// Load a dictionary snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse a dictionary snapshot from a JSON string.
    pub fn parse(raw: &str) -> Result<Self> {
        let snapshot: DictionarySnapshot = serde_json::from_str(raw)?;
        Ok(Self {
            conditioned: snapshot.conditioned,
            scalar: snapshot.scalar,
        })
    }

    /// Serialize to a JSON snapshot.
    pub fn to_json(&self) -> Result<String> {
        let snapshot = DictionarySnapshot {
            conditioned: self.conditioned.clone(),
            scalar: self.scalar.clone(),
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Add a reading-conditioned entry at runtime.
    pub fn add_conditioned(&mut self, surface: &str, entry: DictEntry) {
        self.conditioned
            .entry(surface.to_owned())
            .or_default()
            .push(entry);
    }

    /// Add (or overwrite) a scalar entry at runtime.
    pub fn add_scalar(&mut self, surface: &str, phonemes: Vec<String>) {
        self.scalar.insert(surface.to_owned(), phonemes);
    }

    /// Level 1: reading-conditioned lookup with disambiguation.
    ///
    /// Iterates candidate entries for `surface`; returns the phonemes of the
    /// first entry whose `reading` matches (or is empty) AND whose `pos`
    /// matches (or is empty) AND whose `context` is empty or appears in
    /// `surrounding_text`. If no entry satisfies all three but candidates
    /// exist, returns the first candidate's phonemes.
    #[must_use]
    pub fn lookup_conditioned(
        &self,
        surface: &str,
        reading: &str,
        pos: &str,
        surrounding_text: &str,
    ) -> Option<Vec<String>> {
        let candidates = self.conditioned.get(surface)?;
        if candidates.is_empty() {
            return None;
        }

        for entry in candidates {
            let reading_ok = entry.reading.is_empty() || entry.reading == reading;
            let pos_ok = entry.pos.is_empty() || entry.pos == pos;
            let context_ok = entry.context.is_empty() || surrounding_text.contains(&entry.context);
            if reading_ok && pos_ok && context_ok {
                return Some(entry.phonemes.clone());
            }
        }

        Some(candidates[0].phonemes.clone())
    }

    /// Level 2: flat scalar lookup, with a case-insensitive fallback.
    #[must_use]
    pub fn lookup_scalar(&self, surface: &str) -> Option<Vec<String>> {
        if let Some(phonemes) = self.scalar.get(surface) {
            return Some(phonemes.clone());
        }
        let lower = surface.to_lowercase();
        self.scalar
            .iter()
            .find(|(key, _)| key.to_lowercase() == lower)
            .map(|(_, phonemes)| phonemes.clone())
    }

    /// Total number of distinct surfaces across both tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditioned.len() + self.scalar.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditioned.is_empty() && self.scalar.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(reading: &str, pos: &str, context: &str, phonemes: &[&str]) -> DictEntry {
        DictEntry {
            reading: reading.to_owned(),
            pos: pos.to_owned(),
            context: context.to_owned(),
            phonemes: phonemes.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[test]
    fn conditioned_lookup_picks_matching_reading_and_pos() {
        let mut dict = Dictionary::default();
        dict.add_conditioned("今日", entry("キョウ", "noun", "", &["k", "j", "o", "u"]));
        dict.add_conditioned("今日", entry("コンニチ", "noun", "", &["k", "o", "n", "n", "i", "t", "ɕ", "i"]));

        let phonemes = dict
            .lookup_conditioned("今日", "コンニチ", "noun", "")
            .expect("found");
        assert_eq!(phonemes, vec!["k", "o", "n", "n", "i", "t", "ɕ", "i"]);
    }

    #[test]
    fn conditioned_lookup_falls_back_to_first_entry() {
        let mut dict = Dictionary::default();
        dict.add_conditioned("今日", entry("キョウ", "noun", "", &["k", "j", "o", "u"]));
        let phonemes = dict
            .lookup_conditioned("今日", "ゼンゼン違うヨミ", "verb", "")
            .expect("fallback to first");
        assert_eq!(phonemes, vec!["k", "j", "o", "u"]);
    }

    #[test]
    fn conditioned_lookup_respects_context_substring() {
        let mut dict = Dictionary::default();
        dict.add_conditioned("人気", entry("", "", "芸能人", &["n", "i", "n", "k", "i"]));
        dict.add_conditioned("人気", entry("", "", "", &["h", "i", "t", "o", "k", "e"]));

        assert_eq!(
            dict.lookup_conditioned("人気", "", "", "あの芸能人は人気だ").unwrap(),
            vec!["n", "i", "n", "k", "i"]
        );
        assert_eq!(
            dict.lookup_conditioned("人気", "", "", "この道は人気がない").unwrap(),
            vec!["h", "i", "t", "o", "k", "e"]
        );
    }

    #[test]
    fn scalar_lookup_is_case_insensitive() {
        let mut dict = Dictionary::default();
        dict.add_scalar("OK", vec!["o".into(), "k".into()]);
        assert_eq!(dict.lookup_scalar("ok"), Some(vec!["o".into(), "k".into()]));
    }

    #[test]
    fn snapshot_round_trips() {
        let mut dict = Dictionary::default();
        dict.add_scalar("猫", vec!["n".into(), "e".into(), "k".into(), "o".into()]);
        dict.add_conditioned("今日", entry("キョウ", "", "", &["k", "j", "o", "u"]));

        let json = dict.to_json().expect("serialize");
        let restored = Dictionary::parse(&json).expect("parse");
        assert_eq!(restored.len(), dict.len());
        assert_eq!(restored.lookup_scalar("猫"), dict.lookup_scalar("猫"));
    }
}
