//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration for the synthesis engine.
///
/// Mirrors the recognized `create_engine(config)` options: every field has a
/// sensible default so a binding can start from `EngineConfig::default()`
/// and override only what it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to the Kokoro-style acoustic model ONNX graph.
    pub kokoro_model_path: Option<PathBuf>,
    /// Path to the neural phonemizer ONNX graph (G2P fallback level 3).
    pub phonemizer_model_path: Option<PathBuf>,
    /// Path to the pronunciation dictionary (scalar + reading-conditioned entries).
    pub dictionary_path: Option<PathBuf>,
    /// Path to the phoneme vocabulary (symbol ↔ id bijection).
    pub tokenizer_vocab_path: Option<PathBuf>,
    /// Directory of voice JSON descriptors.
    pub voices_dir: Option<PathBuf>,
    /// Worker pool size; 0 means `std::thread::available_parallelism()`.
    pub max_concurrent_requests: usize,
    /// Request the GPU execution provider for ONNX sessions, when compiled in.
    pub enable_gpu: bool,
    /// Enable the fingerprint-keyed result cache.
    pub enable_cache: bool,
    /// Cache byte budget in mebibytes.
    pub max_cache_size_mb: u64,
    /// Cache entry TTL in seconds; 0 disables expiry.
    pub cache_ttl_seconds: u64,
    /// Nominal output sample rate; the loaded model fixes the actual rate.
    pub target_sample_rate: u32,
    /// Peak-normalize synthesized audio to 0.95 when the input peak is nonzero.
    pub normalize_audio: bool,
    /// Enable dispatch to an externally supplied Japanese morphological analyzer.
    pub enable_mecab: bool,
    /// Apply text normalization (full-width → half-width, ideographic space) by default.
    pub normalize_text: bool,
    /// Intra-op thread count for ONNX sessions; 0 = auto.
    pub intra_op_threads: usize,
    /// Inter-op thread count for ONNX sessions; 0 = auto.
    pub inter_op_threads: usize,
    /// Optional entry-count ceiling for the cache, in addition to the byte budget.
    pub max_cache_entries: Option<usize>,
    /// Style vector dimension the acoustic model declares (Kokoro-82M uses 128).
    pub acoustic_style_dim: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kokoro_model_path: None,
            phonemizer_model_path: None,
            dictionary_path: None,
            tokenizer_vocab_path: None,
            voices_dir: None,
            max_concurrent_requests: 0,
            enable_gpu: false,
            enable_cache: true,
            max_cache_size_mb: 100,
            cache_ttl_seconds: 0,
            target_sample_rate: 24_000,
            normalize_audio: true,
            enable_mecab: false,
            normalize_text: true,
            intra_op_threads: 0,
            inter_op_threads: 0,
            max_cache_entries: None,
            acoustic_style_dim: 128,
        }
    }
}

impl EngineConfig {
    /// Resolve `max_concurrent_requests` against the host, applying the
    /// `0 = auto` convention.
    #[must_use]
    pub fn resolved_worker_count(&self) -> usize {
        if self.max_concurrent_requests == 0 {
            std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
        } else {
            self.max_concurrent_requests
        }
    }

    /// Cache byte budget, converted from mebibytes.
    #[must_use]
    pub fn max_cache_size_bytes(&self) -> u64 {
        self.max_cache_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: EngineConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.max_cache_size_mb, cfg.max_cache_size_mb);
        assert_eq!(back.normalize_text, cfg.normalize_text);
    }

    #[test]
    fn zero_workers_resolves_to_auto() {
        let cfg = EngineConfig {
            max_concurrent_requests: 0,
            ..Default::default()
        };
        assert!(cfg.resolved_worker_count() >= 1);
    }

    #[test]
    fn explicit_worker_count_is_preserved() {
        let cfg = EngineConfig {
            max_concurrent_requests: 7,
            ..Default::default()
        };
        assert_eq!(cfg.resolved_worker_count(), 7);
    }
}
