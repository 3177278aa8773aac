//! Error types for the synthesis pipeline.

/// Error kind, exposed separately from the error itself so bindings can
/// switch on a stable taxonomy without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    FileNotFound,
    NotInitialized,
    InitializationFailed,
    ModelNotLoaded,
    InferenceFailed,
    VoiceNotFound,
    Cancelled,
    Timeout,
    Unknown,
}

/// Top-level error type for the synthesis engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Request text/parameters fail validation (empty text, out-of-range scalar, null voice id).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced file (dictionary, voice descriptor, model) does not exist.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// The engine was used before `initialize()` completed.
    #[error("engine not initialized")]
    NotInitialized,

    /// Engine initialization failed (vocabulary, dictionary, voice, or session load).
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// An inference session was required but no model graph is loaded.
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),

    /// The acoustic or phonemizer model raised an error during `run`.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// The requested voice id is not registered.
    #[error("voice not found: {0}")]
    VoiceNotFound(String),

    /// The request was cancelled before it started executing.
    #[error("request cancelled")]
    Cancelled,

    /// The caller-imposed timeout elapsed (the core never imposes one itself).
    #[error("request timed out")]
    Timeout,

    /// I/O error (dictionary/voice load, vocabulary persistence).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Anything that does not fit the taxonomy above.
    #[error("{0}")]
    Unknown(String),
}

impl EngineError {
    /// Stable error kind for this error, independent of the message text.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::FileNotFound(_) => ErrorKind::FileNotFound,
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::InitializationFailed(_) => ErrorKind::InitializationFailed,
            Self::ModelNotLoaded(_) => ErrorKind::ModelNotLoaded,
            Self::InferenceFailed(_) => ErrorKind::InferenceFailed,
            Self::VoiceNotFound(_) => ErrorKind::VoiceNotFound,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Timeout => ErrorKind::Timeout,
            Self::Io(_) | Self::Serde(_) => ErrorKind::Unknown,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, EngineError>;
