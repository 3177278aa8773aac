//! Inference Session: drives the Kokoro-style acoustic model graph
//! (component E).

use crate::error::{EngineError, Result};
use ort::session::{Session, SessionInputValue, SessionInputs};
use ort::value::Tensor;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};

/// Latency accumulator (count, running sum, min, max), guarded by its own
/// mutex independent of the session lock.
#[derive(Debug, Default)]
struct LatencyStats {
    count: u64,
    sum_ms: f64,
    min_ms: f64,
    max_ms: f64,
}

impl LatencyStats {
    fn record(&mut self, elapsed_ms: f64) {
        if self.count == 0 {
            self.min_ms = elapsed_ms;
            self.max_ms = elapsed_ms;
        } else {
            self.min_ms = self.min_ms.min(elapsed_ms);
            self.max_ms = self.max_ms.max(elapsed_ms);
        }
        self.sum_ms += elapsed_ms;
        self.count += 1;
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A point-in-time snapshot of [`LatencyStats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceStats {
    pub count: u64,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl From<&LatencyStats> for InferenceStats {
    fn from(s: &LatencyStats) -> Self {
        Self {
            count: s.count,
            mean_ms: if s.count == 0 { 0.0 } else { s.sum_ms / s.count as f64 },
            min_ms: s.min_ms,
            max_ms: s.max_ms,
        }
    }
}

/// Thread/provider configuration for the underlying `ort` session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionConfig {
    /// 0 = let `ort` decide.
    pub intra_op_threads: usize,
    pub inter_op_threads: usize,
    pub enable_gpu: bool,
}

/// Minimum number of inputs a usable acoustic graph must declare: tokens,
/// style, speed. A fourth declared input is treated as `pitch`.
const MIN_DECLARED_INPUTS: usize = 3;

/// Owns the acoustic model's ONNX session. Inputs are fed *positionally* —
/// the graph is queried at load time for its declared input names, since
/// "names are whatever the graph declares" rather than a fixed contract.
/// Position 0 is tokens (int64, `[1, T]`), position 1 is style (float32,
/// `[1, D]`), position 2 is speed (float32, `[1]`); a declared fourth input
/// is fed `pitch` (float32, `[1]`). Output is the first declared output,
/// flattened to a float32 sample buffer.
pub struct InferenceSession {
    session: Mutex<Session>,
    input_names: Vec<String>,
    style_dim: usize,
    stats: Mutex<LatencyStats>,
}

fn declared_input_names(session: &Session) -> Result<Vec<String>> {
    let names: Vec<String> = session.inputs.iter().map(|input| input.name.clone()).collect();
    if names.len() < MIN_DECLARED_INPUTS {
        return Err(EngineError::InitializationFailed(format!(
            "acoustic graph declares {} input(s), need at least {MIN_DECLARED_INPUTS} (tokens, style, speed)",
            names.len()
        )));
    }
    Ok(names)
}

impl InferenceSession {
    /// Load the acoustic model graph from a filesystem path.
    pub fn from_path(path: &Path, config: SessionConfig, style_dim: usize) -> Result<Self> {
        let mut builder = Session::builder()
            .map_err(|e| EngineError::InitializationFailed(format!("failed to create session builder: {e}")))?;
        if config.intra_op_threads > 0 {
            builder = builder
                .with_intra_threads(config.intra_op_threads)
                .map_err(|e| EngineError::InitializationFailed(format!("failed to set intra-op threads: {e}")))?;
        }
        if config.inter_op_threads > 0 {
            builder = builder
                .with_inter_threads(config.inter_op_threads)
                .map_err(|e| EngineError::InitializationFailed(format!("failed to set inter-op threads: {e}")))?;
        }
        let session = builder
            .commit_from_file(path)
            .map_err(|e| EngineError::InitializationFailed(format!("failed to load acoustic model: {e}")))?;
        let input_names = declared_input_names(&session)?;
        info!(
            path = %path.display(),
            style_dim,
            inputs = ?input_names,
            accepts_pitch = input_names.len() >= 4,
            "acoustic model loaded"
        );
        Ok(Self {
            session: Mutex::new(session),
            input_names,
            style_dim,
            stats: Mutex::new(LatencyStats::default()),
        })
    }

    /// Load the acoustic model graph from an in-memory buffer.
    pub fn from_bytes(bytes: &[u8], config: SessionConfig, style_dim: usize) -> Result<Self> {
        let mut builder = Session::builder()
            .map_err(|e| EngineError::InitializationFailed(format!("failed to create session builder: {e}")))?;
        if config.intra_op_threads > 0 {
            builder = builder
                .with_intra_threads(config.intra_op_threads)
                .map_err(|e| EngineError::InitializationFailed(format!("failed to set intra-op threads: {e}")))?;
        }
        if config.inter_op_threads > 0 {
            builder = builder
                .with_inter_threads(config.inter_op_threads)
                .map_err(|e| EngineError::InitializationFailed(format!("failed to set inter-op threads: {e}")))?;
        }
        let session = builder
            .commit_from_memory(bytes)
            .map_err(|e| EngineError::InitializationFailed(format!("failed to load acoustic model: {e}")))?;
        let input_names = declared_input_names(&session)?;
        Ok(Self {
            session: Mutex::new(session),
            input_names,
            style_dim,
            stats: Mutex::new(LatencyStats::default()),
        })
    }

    /// The style vector dimension this session's graph was declared with.
    #[must_use]
    pub fn style_dim(&self) -> usize {
        self.style_dim
    }

    /// Whether the graph declares a fourth input, fed as `pitch`.
    #[must_use]
    pub fn accepts_pitch(&self) -> bool {
        self.input_names.len() >= 4
    }

    /// Run one forward pass. `tokens` must be BOS/EOS-bracketed by the
    /// caller unless the graph's declared inputs indicate otherwise.
    /// Failures yield `Err`; callers (the orchestrator) turn this into an
    /// empty sample buffer per the failure policy.
    pub fn run(&self, tokens: &[i64], style: &[f32], speed: f32, pitch: f32) -> Result<Vec<f32>> {
        if style.len() != self.style_dim {
            return Err(EngineError::InvalidInput(format!(
                "style vector has length {}, session expects {}",
                style.len(),
                self.style_dim
            )));
        }

        let start = Instant::now();

        let seq_len = tokens.len();
        let tokens_tensor = Tensor::from_array(([1_usize, seq_len], tokens.to_vec())).map_err(|e| {
            EngineError::InferenceFailed(format!("failed to build tokens tensor: {e}"))
        })?;
        let style_tensor = Tensor::from_array(([1_usize, self.style_dim], style.to_vec())).map_err(|e| {
            EngineError::InferenceFailed(format!("failed to build style tensor: {e}"))
        })?;
        let speed_tensor = Tensor::from_array(([1_usize], vec![speed])).map_err(|e| {
            EngineError::InferenceFailed(format!("failed to build speed tensor: {e}"))
        })?;

        let mut feed: HashMap<String, SessionInputValue> = HashMap::new();
        feed.insert(self.input_names[0].clone(), tokens_tensor.into());
        feed.insert(self.input_names[1].clone(), style_tensor.into());
        feed.insert(self.input_names[2].clone(), speed_tensor.into());

        if self.accepts_pitch() {
            let pitch_tensor = Tensor::from_array(([1_usize], vec![pitch])).map_err(|e| {
                EngineError::InferenceFailed(format!("failed to build pitch tensor: {e}"))
            })?;
            feed.insert(self.input_names[3].clone(), pitch_tensor.into());
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| EngineError::InferenceFailed("acoustic session lock poisoned".into()))?;

        let outputs = session
            .run(SessionInputs::from(feed))
            .map_err(|e| EngineError::InferenceFailed(format!("acoustic inference failed: {e}")))?;
        drop(session);

        let output_value = &outputs[0_usize];
        let (_shape, data) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| EngineError::InferenceFailed(format!("failed to extract acoustic output: {e}")))?;
        let samples = data.to_vec();

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        if let Ok(mut stats) = self.stats.lock() {
            stats.record(elapsed_ms);
        }
        debug!(elapsed_ms, samples = samples.len(), "acoustic inference completed");

        Ok(samples)
    }

    /// Run a dummy inference with a 10-token sequence and a zero-valued
    /// style vector, then reset latency statistics so they reflect only
    /// real requests.
    pub fn warmup(&self) -> Result<()> {
        let tokens = vec![0_i64; 10];
        let style = vec![0.0_f32; self.style_dim];
        self.run(&tokens, &style, 1.0, 1.0)?;
        if let Ok(mut stats) = self.stats.lock() {
            stats.reset();
        }
        Ok(())
    }

    /// Current latency statistics.
    #[must_use]
    pub fn stats(&self) -> InferenceStats {
        self.stats
            .lock()
            .map(|s| InferenceStats::from(&*s))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_stats_track_count_mean_min_max() {
        let mut stats = LatencyStats::default();
        stats.record(10.0);
        stats.record(30.0);
        stats.record(20.0);
        let snapshot = InferenceStats::from(&stats);
        assert_eq!(snapshot.count, 3);
        assert!((snapshot.mean_ms - 20.0).abs() < 1e-9);
        assert_eq!(snapshot.min_ms, 10.0);
        assert_eq!(snapshot.max_ms, 30.0);
    }

    #[test]
    fn latency_stats_reset_clears_accumulators() {
        let mut stats = LatencyStats::default();
        stats.record(5.0);
        stats.reset();
        let snapshot = InferenceStats::from(&stats);
        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.mean_ms, 0.0);
    }
}
