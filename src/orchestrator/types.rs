//! Request/result types for the orchestrator.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};

/// A synthesis request. `phonemes`, when present, overrides the G2P
/// resolver entirely — the Resolver's statistics are untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    pub speed: f32,
    pub pitch: f32,
    pub volume: f32,
    pub phonemes: Option<String>,
    pub normalize_text: bool,
    pub use_cache: bool,
    /// Reserved: does not reorder the FIFO submission queue in this core.
    pub priority: u8,
}

impl Default for SynthesisRequest {
    fn default() -> Self {
        Self {
            text: String::new(),
            voice_id: String::new(),
            speed: 1.0,
            pitch: 1.0,
            volume: 1.0,
            phonemes: None,
            normalize_text: true,
            use_cache: true,
            priority: 0,
        }
    }
}

impl SynthesisRequest {
    /// Validate the request's scalar ranges. Does not check the voice id
    /// (that happens downstream, against the registry).
    pub fn validate(&self) -> Result<(), String> {
        if self.text.is_empty() && self.phonemes.is_none() {
            return Err("text must not be empty unless phonemes is given".to_owned());
        }
        if !(0.5..=2.0).contains(&self.speed) {
            return Err(format!("speed {} out of range [0.5, 2.0]", self.speed));
        }
        if !(0.5..=2.0).contains(&self.pitch) {
            return Err(format!("pitch {} out of range [0.5, 2.0]", self.pitch));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(format!("volume {} out of range [0.0, 1.0]", self.volume));
        }
        Ok(())
    }
}

/// Synthesis outcome classification, mirroring [`ErrorKind`] plus `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Ok,
    InvalidInput,
    NotInitialized,
    VoiceNotFound,
    InferenceFailed,
    Cancelled,
    Unknown,
}

impl From<ErrorKind> for RequestStatus {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidInput => Self::InvalidInput,
            ErrorKind::NotInitialized => Self::NotInitialized,
            ErrorKind::VoiceNotFound => Self::VoiceNotFound,
            ErrorKind::InferenceFailed | ErrorKind::ModelNotLoaded => Self::InferenceFailed,
            ErrorKind::Cancelled => Self::Cancelled,
            _ => Self::Unknown,
        }
    }
}

/// Raw float sample buffer, mono, in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: f64,
}

impl AudioData {
    #[must_use]
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        let duration_ms = if sample_rate == 0 {
            0.0
        } else {
            (samples.len() as f64 / sample_rate as f64) * 1000.0
        };
        Self {
            samples,
            sample_rate,
            channels: 1,
            duration_ms,
        }
    }
}

/// A single resolved phoneme symbol and its position in the sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhonemeSpan {
    pub symbol: String,
    pub position: usize,
}

/// Per-stage timing captured for one request, in milliseconds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RequestTimings {
    pub phonemization_ms: f64,
    pub tokenization_ms: f64,
    pub inference_ms: f64,
    pub audio_post_ms: f64,
    pub total_ms: f64,
}

/// The outcome of one synthesis, whether served from cache or computed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub status: Option<RequestStatus>,
    pub audio: AudioData,
    pub phonemes: Vec<PhonemeSpan>,
    pub token_ids: Vec<u32>,
    pub stats: RequestTimings,
    pub error_message: String,
    pub cache_hit: bool,
}

impl Default for RequestStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl SynthesisResult {
    #[must_use]
    pub fn status(&self) -> RequestStatus {
        self.status.unwrap_or_default()
    }

    #[must_use]
    pub fn failure(status: RequestStatus, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            error_message: message.into(),
            ..Default::default()
        }
    }

    /// Estimated memory footprint for cache accounting:
    /// `sample_count·4 + phoneme_count·entry_size + token_count·4 + error_len + constant_overhead`.
    #[must_use]
    pub fn memory_footprint(&self) -> usize {
        const ENTRY_SIZE: usize = 48;
        const CONSTANT_OVERHEAD: usize = 128;
        self.audio.samples.len() * 4
            + self.phonemes.len() * ENTRY_SIZE
            + self.token_ids.len() * 4
            + self.error_message.len()
            + CONSTANT_OVERHEAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_request_passes_validation_with_text() {
        let req = SynthesisRequest {
            text: "こんにちは".to_owned(),
            ..Default::default()
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn empty_text_without_phoneme_override_fails_validation() {
        let req = SynthesisRequest::default();
        assert!(req.validate().is_err());
    }

    #[test]
    fn out_of_range_speed_fails_validation() {
        let req = SynthesisRequest {
            text: "x".to_owned(),
            speed: 5.0,
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn audio_data_computes_duration_from_sample_rate() {
        let audio = AudioData::new(vec![0.0; 24_000], 24_000);
        assert!((audio.duration_ms - 1000.0).abs() < 1e-6);
    }
}
