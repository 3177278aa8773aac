//! Koe: an on-device Japanese text-to-speech synthesis pipeline.
//!
//! Given Japanese text and a voice id, the engine produces a float sample
//! buffer suitable for WAV encoding by the caller.
//!
//! # Architecture
//!
//! Six components in dependency order (leaves first):
//! - [`vocab`]: phoneme ↔ token-id bijection
//! - [`segmenter`]: Japanese text → morphemes
//! - [`g2p`]: morphemes → IPA phonemes, via dictionary + neural fallback + kana rules
//! - [`voice`]: voice id → style vector + default prosody
//! - [`inference`]: tokens + style → float sample buffer, via an ONNX acoustic model
//! - [`orchestrator`]: request flow, worker pool, cache, statistics, cancellation
//!
//! [`orchestrator::create_engine`] is the entry point.

pub mod audio;
pub mod config;
pub mod error;
pub mod g2p;
pub mod inference;
pub mod orchestrator;
pub mod segmenter;
pub mod vocab;
pub mod voice;

pub use config::EngineConfig;
pub use error::{EngineError, ErrorKind, Result};
pub use orchestrator::types::{
    AudioData, PhonemeSpan, RequestStatus, RequestTimings, SynthesisRequest, SynthesisResult,
};
pub use orchestrator::{create_engine, Engine, RequestHandle};
pub use voice::{Gender, Voice, VoiceLoadReport};
