//! Request Orchestrator: the control-flow hub tying every other component
//! together — synchronous synthesis, the async submission surface, the
//! result cache, single-flight, and statistics (component F).

pub mod cache;
pub mod fingerprint;
pub mod pool;
pub mod singleflight;
pub mod stats;
pub mod types;

use crate::audio::post_process;
use crate::config::EngineConfig;
use crate::error::{EngineError, ErrorKind, Result};
use crate::g2p::Resolver;
use crate::inference::InferenceSession;
use crate::segmenter::{normalize_text, Segmenter};
use crate::vocab::{Vocabulary, BOS, EOS};
use crate::voice::VoiceRegistry;
use cache::{CacheStats, ResultCache};
use fingerprint::fingerprint;
use pool::WorkerPool;
use singleflight::{SingleFlight, Token};
use stats::{EngineStats, PerformanceStats};
use types::{AudioData, PhonemeSpan, RequestStatus, RequestTimings, SynthesisRequest, SynthesisResult};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Everything a single synthesis needs, shared between the synchronous
/// entry point and worker-pool tasks behind one `Arc`.
pub(crate) struct Core {
    config: EngineConfig,
    vocab: RwLock<Vocabulary>,
    segmenter: Segmenter,
    resolver: RwLock<Resolver>,
    voices: VoiceRegistry,
    inference: Option<InferenceSession>,
    cache: Option<ResultCache>,
    single_flight: SingleFlight,
    stats: EngineStats,
}

impl Core {
    /// Synchronous synthesis control flow (§4.6 steps 1-13; step 1's
    /// not-initialized check happens one layer up in [`Engine`]).
    pub(crate) fn synthesize(&self, request: &SynthesisRequest) -> SynthesisResult {
        let start = Instant::now();

        if let Err(message) = request.validate() {
            let result = SynthesisResult::failure(RequestStatus::InvalidInput, message);
            self.stats.record(false, elapsed_ms(start));
            return result;
        }

        let fp = fingerprint(request);

        if request.use_cache {
            if let Some(cache) = &self.cache {
                if let Some(mut cached) = cache.get(&fp) {
                    cached.cache_hit = true;
                    self.stats.record(cached.status() == RequestStatus::Ok, elapsed_ms(start));
                    return cached;
                }
            }
        }

        let leader = match self.single_flight.enter(&fp) {
            Token::Joined(mut result) => {
                result.cache_hit = false;
                self.stats.record(result.status() == RequestStatus::Ok, elapsed_ms(start));
                return result;
            }
            Token::Leader(guard) => guard,
        };

        let computed = self.compute(request, start);
        let succeeded = computed.status() == RequestStatus::Ok;

        if request.use_cache && succeeded {
            if let Some(cache) = &self.cache {
                cache.put(fp, computed.clone());
            }
        }

        let result = leader.finish(&self.single_flight, computed);
        self.stats.record(succeeded, elapsed_ms(start));
        result
    }

    fn compute(&self, request: &SynthesisRequest, start: Instant) -> SynthesisResult {
        let voice = match self.voices.get(&request.voice_id) {
            Ok(voice) => voice,
            Err(e) => return SynthesisResult::failure(e.kind().into(), e.to_string()),
        };

        let mut timings = RequestTimings::default();

        let phonemize_start = Instant::now();
        let phoneme_string = match &request.phonemes {
            Some(overridden) => overridden.clone(),
            None => {
                let text = if request.normalize_text {
                    normalize_text(&request.text)
                } else {
                    request.text.clone()
                };
                // `text` is already normalized above (or deliberately left raw); don't
                // have the segmenter redo it.
                let morphemes = match self.segmenter.segment(&text, Some(false)) {
                    Ok(m) => m,
                    Err(e) => return SynthesisResult::failure(e.kind().into(), e.to_string()),
                };
                let resolver = self.resolver.read().expect("resolver lock poisoned");
                resolver.resolve(&morphemes, &text)
            }
        };
        timings.phonemization_ms = elapsed_ms(phonemize_start);

        let tokenize_start = Instant::now();
        let symbols: Vec<&str> = phoneme_string.split_whitespace().collect();
        let (token_ids, phonemes) = {
            let vocab = self.vocab.read().expect("vocabulary lock poisoned");
            // Invariant 2: the acoustic graph's token stream is BOS/EOS-bracketed
            // by the caller unless its declared inputs say otherwise; this
            // component has no such signal, so it always brackets.
            let mut token_ids: Vec<u32> = Vec::with_capacity(symbols.len() + 2);
            token_ids.push(BOS);
            token_ids.extend(symbols.iter().map(|s| vocab.id_of(s)));
            token_ids.push(EOS);
            let phonemes: Vec<PhonemeSpan> = symbols
                .iter()
                .enumerate()
                .map(|(position, symbol)| PhonemeSpan {
                    symbol: (*symbol).to_owned(),
                    position,
                })
                .collect();
            (token_ids, phonemes)
        };
        timings.tokenization_ms = elapsed_ms(tokenize_start);

        let Some(inference) = &self.inference else {
            return SynthesisResult::failure(
                RequestStatus::InferenceFailed,
                "no acoustic model loaded".to_owned(),
            );
        };

        let inference_start = Instant::now();
        let tokens_i64: Vec<i64> = token_ids.iter().map(|&id| i64::from(id)).collect();
        let speed = request.speed * voice.default_speed;
        let pitch = request.pitch * voice.default_pitch;
        // Mirrors the reference crate's Kokoro engine: the inference runtime
        // has its own internal thread pool, so the blocking call is wrapped
        // rather than offloaded to a separate async task.
        let samples = match tokio::task::block_in_place(|| {
            inference.run(&tokens_i64, &voice.style_vector, speed, pitch)
        }) {
            Ok(samples) => samples,
            Err(e) => return SynthesisResult::failure(RequestStatus::InferenceFailed, e.to_string()),
        };
        timings.inference_ms = elapsed_ms(inference_start);

        let post_start = Instant::now();
        let samples = post_process(samples, request.volume, self.config.normalize_audio);
        timings.audio_post_ms = elapsed_ms(post_start);
        timings.total_ms = elapsed_ms(start);

        SynthesisResult {
            status: Some(RequestStatus::Ok),
            audio: AudioData::new(samples, self.config.target_sample_rate),
            phonemes,
            token_ids,
            stats: timings,
            error_message: String::new(),
            cache_hit: false,
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Handle for an in-flight asynchronous submission.
pub struct RequestHandle {
    id: Uuid,
    cancel: CancellationToken,
    completed: Arc<AtomicBool>,
    receiver: tokio::sync::oneshot::Receiver<SynthesisResult>,
}

impl RequestHandle {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Cancel this request if it hasn't been dequeued yet.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether this request has finished (completed, cancelled, or failed)
    /// and its result is ready to be picked up by [`RequestHandle::result`].
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Await the result.
    pub async fn result(self) -> Result<SynthesisResult> {
        self.receiver
            .await
            .map_err(|_| EngineError::Unknown("worker task dropped its result sender".into()))
    }
}

/// The synthesis engine: owns every loaded component and exposes the public
/// API surface (`initialize`, `synthesize`, `submit`, ...).
pub struct Engine {
    config: EngineConfig,
    core: Option<Arc<Core>>,
    pool: Option<WorkerPool>,
    initialized: AtomicBool,
}

impl Engine {
    /// Construct an uninitialized engine from configuration. Loading of
    /// models/dictionary/voices happens in [`Engine::initialize`].
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            core: None,
            pool: None,
            initialized: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn require_core(&self) -> Result<&Arc<Core>> {
        self.core.as_ref().ok_or(EngineError::NotInitialized)
    }

    /// Load the vocabulary, dictionary, voices, and inference sessions
    /// named by the configuration, then spin up the worker pool.
    pub fn initialize(&mut self) -> Result<()> {
        let vocab = match &self.config.tokenizer_vocab_path {
            Some(path) => Vocabulary::load(path)?,
            None => Vocabulary::with_special_tokens(),
        };

        let dictionary = match &self.config.dictionary_path {
            Some(path) => crate::g2p::dictionary::Dictionary::load(path)?,
            None => crate::g2p::dictionary::Dictionary::default(),
        };

        let phonemizer = match &self.config.phonemizer_model_path {
            Some(model_path) => {
                let vocab_path = model_path.with_extension("vocab.json");
                Some(crate::g2p::neural::NeuralPhonemizer::from_paths(model_path, &vocab_path)?)
            }
            None => None,
        };

        let session_config = crate::inference::SessionConfig {
            intra_op_threads: self.config.intra_op_threads,
            inter_op_threads: self.config.inter_op_threads,
            enable_gpu: self.config.enable_gpu,
        };

        let inference = match &self.config.kokoro_model_path {
            Some(path) => Some(InferenceSession::from_path(
                path,
                session_config,
                self.config.acoustic_style_dim,
            )?),
            None => None,
        };

        let voices = match inference.as_ref() {
            Some(session) => VoiceRegistry::with_expected_style_len(session.style_dim()),
            None => VoiceRegistry::unchecked(),
        };
        if let Some(voices_dir) = &self.config.voices_dir {
            let report = voices.load_dir(voices_dir)?;
            info!(
                loaded = report.success_count(),
                failed = report.failure_count(),
                "voice directory loaded"
            );
            for (path, error) in &report.failed {
                warn!(path = %path.display(), %error, "voice descriptor rejected");
            }
        }

        let cache = self.config.enable_cache.then(|| {
            ResultCache::new(
                self.config.max_cache_size_bytes() as usize,
                self.config.max_cache_entries,
                self.config.cache_ttl_seconds,
            )
        });

        let core = Arc::new(Core {
            config: self.config.clone(),
            vocab: RwLock::new(vocab),
            segmenter: Segmenter::fallback_only(self.config.normalize_text),
            resolver: RwLock::new(Resolver::new(dictionary, phonemizer)),
            voices,
            inference,
            cache,
            single_flight: SingleFlight::new(),
            stats: EngineStats::new(),
        });

        let pool = WorkerPool::new(self.config.resolved_worker_count(), Arc::clone(&core));

        self.core = Some(core);
        self.pool = Some(pool);
        self.initialized.store(true, Ordering::SeqCst);
        info!("engine initialized");
        Ok(())
    }

    /// Stop accepting new requests and drain the worker pool, completing
    /// any queued-but-unstarted request with `Cancelled`.
    pub async fn shutdown(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown().await;
        }
        self.initialized.store(false, Ordering::SeqCst);
    }

    /// Run one synthesis on the calling task, bypassing the worker pool.
    /// Must be called from within a `tokio` multi-threaded runtime, as the
    /// inference stage uses `tokio::task::block_in_place`.
    pub fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResult> {
        let core = self.require_core()?;
        Ok(core.synthesize(request))
    }

    /// Enqueue a request on the worker pool and await its result.
    pub async fn synthesize_async(&self, request: SynthesisRequest) -> Result<SynthesisResult> {
        let handle = self.submit(request)?;
        handle.result().await
    }

    /// Enqueue a request on the worker pool, returning a handle immediately.
    pub fn submit(&self, request: SynthesisRequest) -> Result<RequestHandle> {
        self.require_core()?;
        let pool = self.pool.as_ref().ok_or(EngineError::NotInitialized)?;
        let (receiver, cancel, completed) = pool.submit(request);
        Ok(RequestHandle {
            id: Uuid::new_v4(),
            cancel,
            completed,
            receiver,
        })
    }

    /// Current queue depth and active-worker count, for observability.
    pub fn queue_stats(&self) -> Result<(usize, usize)> {
        let pool = self.pool.as_ref().ok_or(EngineError::NotInitialized)?;
        Ok((pool.queue_depth(), pool.active_count()))
    }

    pub fn load_voice(&self, path: &std::path::Path) -> Result<String> {
        let core = self.require_core()?;
        core.voices.load_file(path)
    }

    pub fn get_voice(&self, id: &str) -> Result<crate::voice::Voice> {
        let core = self.require_core()?;
        core.voices.get(id)
    }

    pub fn list_voices(&self) -> Result<Vec<crate::voice::Voice>> {
        let core = self.require_core()?;
        core.voices.list()
    }

    pub fn set_default_voice(&self, id: &str) -> Result<()> {
        let core = self.require_core()?;
        core.voices.set_default(id)
    }

    pub fn clear_cache(&self) -> Result<()> {
        let core = self.require_core()?;
        if let Some(cache) = &core.cache {
            cache.clear();
        }
        Ok(())
    }

    pub fn cache_stats(&self) -> Result<CacheStats> {
        let core = self.require_core()?;
        Ok(core.cache.as_ref().map(ResultCache::stats).unwrap_or_default())
    }

    pub fn performance_stats(&self) -> Result<PerformanceStats> {
        let core = self.require_core()?;
        Ok(core.stats.snapshot(core.cache.as_ref().map(ResultCache::stats).unwrap_or_default()))
    }

    /// Warm up the inference session, if one is loaded. A no-op otherwise.
    pub fn warmup(&self) -> Result<()> {
        let core = self.require_core()?;
        if let Some(inference) = &core.inference {
            tokio::task::block_in_place(|| inference.warmup())?;
        }
        Ok(())
    }

    pub fn text_to_phonemes(&self, text: &str) -> Result<String> {
        let core = self.require_core()?;
        let normalized = normalize_text(text);
        let morphemes = core.segmenter.segment(&normalized, Some(false))?;
        let resolver = core.resolver.read().expect("resolver lock poisoned");
        Ok(resolver.resolve(&morphemes, &normalized))
    }

    pub fn phonemes_to_tokens(&self, phonemes: &str) -> Result<Vec<u32>> {
        let core = self.require_core()?;
        let vocab = core.vocab.read().expect("vocabulary lock poisoned");
        Ok(vocab.encode(phonemes))
    }

    pub fn segment_text(&self, text: &str) -> Result<Vec<crate::segmenter::Morpheme>> {
        let core = self.require_core()?;
        core.segmenter.segment(text, None)
    }
}

/// Creates a new, uninitialized engine from configuration. Mirrors the
/// `create_engine(config)` entry point a binding exposes.
#[must_use]
pub fn create_engine(config: EngineConfig) -> Engine {
    Engine::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::g2p::dictionary::Dictionary;

    fn bare_core() -> Arc<Core> {
        Arc::new(Core {
            config: EngineConfig::default(),
            vocab: RwLock::new(Vocabulary::with_special_tokens()),
            segmenter: Segmenter::fallback_only(true),
            resolver: RwLock::new(Resolver::new(Dictionary::default(), None)),
            voices: VoiceRegistry::unchecked(),
            inference: None,
            cache: None,
            single_flight: SingleFlight::new(),
            stats: EngineStats::new(),
        })
    }

    #[test]
    fn missing_voice_yields_voice_not_found_status() {
        let core = bare_core();
        let request = SynthesisRequest {
            text: "こんにちは".to_owned(),
            voice_id: "does_not_exist".to_owned(),
            use_cache: false,
            ..Default::default()
        };
        let result = core.synthesize(&request);
        assert_eq!(result.status(), RequestStatus::VoiceNotFound);
        assert!(result.audio.samples.is_empty());
        assert!(result.error_message.contains("does_not_exist"));
    }

    #[test]
    fn invalid_request_short_circuits_before_cache_or_single_flight() {
        let core = bare_core();
        let request = SynthesisRequest::default(); // empty text, no phonemes override
        let result = core.synthesize(&request);
        assert_eq!(result.status(), RequestStatus::InvalidInput);
    }

    #[test]
    fn missing_inference_session_yields_inference_failed_with_registered_voice() {
        let core = bare_core();
        core.voices
            .load_voice(crate::voice::Voice {
                id: "jf_alpha".to_owned(),
                name: "Alpha".to_owned(),
                language: "ja".to_owned(),
                gender: crate::voice::Gender::Female,
                style_vector: vec![0.0; 4],
                default_speed: 1.0,
                default_pitch: 1.0,
                description: None,
                preview_url: None,
            })
            .unwrap();
        let request = SynthesisRequest {
            text: "こんにちは".to_owned(),
            voice_id: "jf_alpha".to_owned(),
            use_cache: false,
            ..Default::default()
        };
        let result = core.synthesize(&request);
        assert_eq!(result.status(), RequestStatus::InferenceFailed);
    }

    #[test]
    fn engine_without_initialize_reports_not_initialized() {
        let engine = Engine::new(EngineConfig::default());
        let request = SynthesisRequest {
            text: "x".to_owned(),
            voice_id: "v".to_owned(),
            ..Default::default()
        };
        let err = engine.synthesize(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
    }
}
