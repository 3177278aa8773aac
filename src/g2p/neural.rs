//! Neural G2P fallback (cascade level 3): an ONNX character-to-phoneme
//! model, invoked when the dictionary has no entry for a morpheme's
//! surface form.
//!
//! Mirrors the acoustic [`crate::inference::InferenceSession`]'s use of
//! `ort` directly rather than hiding it behind an abstract runtime trait —
//! this is the one other opaque inference graph the core owns.

use crate::error::{EngineError, Result};
use ort::session::{Session, SessionInputValue, SessionInputs};
use ort::value::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Fixed input length the phonemizer graph was traced/exported with.
const MAX_INPUT_LEN: usize = 64;

const CHAR_PAD: i64 = 0;
const CHAR_BOS: i64 = 1;
const CHAR_EOS: i64 = 2;

/// Character-in / phoneme-out vocabularies loaded from a sidecar JSON file
/// alongside the phonemizer model (never hard-coded — SPEC_FULL §9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhonemizerVocab {
    /// Input character → id. Covers Hiragana, Katakana, common Kanji, ASCII,
    /// and punctuation; ids 0..2 are reserved for pad/bos/eos.
    pub char_to_id: HashMap<char, i64>,
    /// Output id → phoneme symbol.
    pub id_to_phoneme: HashMap<i64, String>,
}

impl PhonemizerVocab {
    /// Load from a JSON sidecar file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn encode_char(&self, c: char) -> i64 {
        self.char_to_id.get(&c).copied().unwrap_or(CHAR_PAD)
    }
}

/// Neural phonemizer: owns an ONNX session plus its character/phoneme
/// vocabularies.
pub struct NeuralPhonemizer {
    session: Mutex<Session>,
    vocab: PhonemizerVocab,
}

impl NeuralPhonemizer {
    /// Load the phonemizer graph from a file path, together with its
    /// sidecar vocabularies (`<model>.vocab.json`, or an explicit path).
    pub fn from_paths(model_path: &Path, vocab_path: &Path) -> Result<Self> {
        let session = Session::builder()
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| EngineError::InitializationFailed(format!(
                "failed to load phonemizer model: {e}"
            )))?;
        let vocab = PhonemizerVocab::load(vocab_path)?;
        Ok(Self {
            session: Mutex::new(session),
            vocab,
        })
    }

    /// Run the phonemizer on a single morpheme surface, returning the
    /// decoded phoneme symbols in order. Reserved ids (pad/bos/eos) are
    /// dropped from the decoded output.
    pub fn phonemize(&self, surface: &str) -> Result<Vec<String>> {
        let input_ids = encode(&self.vocab, surface);
        let seq_len = input_ids.len();

        let tensor = Tensor::from_array(([1_usize, seq_len], input_ids)).map_err(|e| {
            EngineError::InferenceFailed(format!("failed to build phonemizer input tensor: {e}"))
        })?;

        let mut feed: HashMap<String, SessionInputValue> = HashMap::new();
        feed.insert("input_ids".to_owned(), tensor.into());

        let mut session = self
            .session
            .lock()
            .map_err(|_| EngineError::InferenceFailed("phonemizer session lock poisoned".into()))?;

        let outputs = session
            .run(SessionInputs::from(feed))
            .map_err(|e| EngineError::InferenceFailed(format!("phonemizer inference failed: {e}")))?;

        let output_value = &outputs[0_usize];
        let (_shape, data) = output_value
            .try_extract_tensor::<i64>()
            .map_err(|e| EngineError::InferenceFailed(format!(
                "failed to extract phonemizer output: {e}"
            )))?;

        let symbols = data
            .iter()
            .filter(|&&id| id != CHAR_PAD && id != CHAR_BOS && id != CHAR_EOS)
            .filter_map(|id| self.vocab.id_to_phoneme.get(id).cloned())
            .collect();

        Ok(symbols)
    }
}

/// Encode `surface` into the fixed-length, BOS/EOS-bracketed id sequence
/// the phonemizer graph expects. Free function so it can be exercised
/// without constructing a [`NeuralPhonemizer`] (which requires a loaded
/// ONNX session).
fn encode(vocab: &PhonemizerVocab, surface: &str) -> Vec<i64> {
    let mut ids = Vec::with_capacity(MAX_INPUT_LEN);
    ids.push(CHAR_BOS);
    for c in surface.chars().take(MAX_INPUT_LEN - 2) {
        ids.push(vocab.encode_char(c));
    }
    ids.push(CHAR_EOS);
    ids.resize(MAX_INPUT_LEN, CHAR_PAD);
    ids
}
