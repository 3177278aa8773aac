//! Voice Registry: named style-vector bundles loaded from JSON descriptors
//! (component D).

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};

/// Speaker gender tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Neutral,
}

/// A loaded voice: style vector plus default prosody scalars. Immutable
/// once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub language: String,
    pub gender: Gender,
    pub style_vector: Vec<f32>,
    #[serde(default = "default_speed")]
    pub default_speed: f32,
    #[serde(default = "default_pitch")]
    pub default_pitch: f32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

fn default_speed() -> f32 {
    1.0
}

fn default_pitch() -> f32 {
    1.0
}

/// Outcome of loading a directory of voice descriptors: partial success is
/// preserved rather than aborting the whole load on one bad file.
#[derive(Debug, Clone, Default)]
pub struct VoiceLoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(PathBuf, String)>,
}

impl VoiceLoadReport {
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.loaded.len()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

#[derive(Debug, Default)]
struct Registry {
    voices: HashMap<String, Voice>,
    default_id: Option<String>,
}

/// Thread-safe voice registry. Reads never block each other; loads and
/// `set_default` serialize behind an `RwLock`, matching the Vocabulary and
/// Dictionary's read-mostly sharing policy.
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    inner: RwLock<Registry>,
    expected_style_len: Option<usize>,
}

impl VoiceRegistry {
    /// A registry that rejects voices whose style vector length doesn't
    /// match the acoustic model's declared style input dimension.
    #[must_use]
    pub fn with_expected_style_len(expected_style_len: usize) -> Self {
        Self {
            inner: RwLock::new(Registry::default()),
            expected_style_len: Some(expected_style_len),
        }
    }

    /// A registry that accepts any style vector length (no inference
    /// session loaded yet to check against).
    #[must_use]
    pub fn unchecked() -> Self {
        Self::default()
    }

    fn validate(&self, voice: &Voice) -> Result<()> {
        if let Some(expected) = self.expected_style_len {
            if voice.style_vector.len() != expected {
                return Err(EngineError::InvalidInput(format!(
                    "voice '{}' style vector has length {}, expected {}",
                    voice.id,
                    voice.style_vector.len(),
                    expected
                )));
            }
        }
        Ok(())
    }

    /// Load a single voice from parsed JSON and register it. The first
    /// voice ever loaded becomes the default unless one has already been
    /// set explicitly.
    pub fn load_voice(&self, voice: Voice) -> Result<()> {
        self.validate(&voice)?;
        let mut registry = self
            .inner
            .write()
            .map_err(|_| EngineError::Unknown("voice registry lock poisoned".into()))?;
        let id = voice.id.clone();
        let is_first = registry.voices.is_empty();
        registry.voices.insert(id.clone(), voice);
        if is_first {
            registry.default_id = Some(id.clone());
        }
        info!(voice_id = %id, "voice loaded");
        Ok(())
    }

    /// Load a single voice descriptor file.
    pub fn load_file(&self, path: &Path) -> Result<String> {
        let raw = std::fs::read_to_string(path)?;
        let voice: Voice = serde_json::from_str(&raw)?;
        let id = voice.id.clone();
        self.load_voice(voice)?;
        Ok(id)
    }

    /// Load every `*.json` descriptor in `dir`. A parse/validation failure
    /// on one file does not abort the others; failures are collected into
    /// the returned report.
    pub fn load_dir(&self, dir: &Path) -> Result<VoiceLoadReport> {
        let mut report = VoiceLoadReport::default();
        let entries = std::fs::read_dir(dir)?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.load_file(&path) {
                Ok(id) => report.loaded.push(id),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "voice descriptor failed to load");
                    report.failed.push((path, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Remove a voice by id. Clears the default if it was the default.
    pub fn unload(&self, id: &str) -> Result<()> {
        let mut registry = self
            .inner
            .write()
            .map_err(|_| EngineError::Unknown("voice registry lock poisoned".into()))?;
        registry.voices.remove(id);
        if registry.default_id.as_deref() == Some(id) {
            registry.default_id = None;
        }
        Ok(())
    }

    /// Fetch a voice by id.
    pub fn get(&self, id: &str) -> Result<Voice> {
        let registry = self
            .inner
            .read()
            .map_err(|_| EngineError::Unknown("voice registry lock poisoned".into()))?;
        registry
            .voices
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::VoiceNotFound(id.to_owned()))
    }

    /// All registered voice ids, unordered.
    pub fn list(&self) -> Result<Vec<Voice>> {
        let registry = self
            .inner
            .read()
            .map_err(|_| EngineError::Unknown("voice registry lock poisoned".into()))?;
        Ok(registry.voices.values().cloned().collect())
    }

    /// Explicitly set the default voice. Errors if the id isn't registered.
    pub fn set_default(&self, id: &str) -> Result<()> {
        let mut registry = self
            .inner
            .write()
            .map_err(|_| EngineError::Unknown("voice registry lock poisoned".into()))?;
        if !registry.voices.contains_key(id) {
            return Err(EngineError::VoiceNotFound(id.to_owned()));
        }
        registry.default_id = Some(id.to_owned());
        Ok(())
    }

    /// The current default voice id, if any voice has been loaded.
    pub fn get_default_id(&self) -> Result<Option<String>> {
        let registry = self
            .inner
            .read()
            .map_err(|_| EngineError::Unknown("voice registry lock poisoned".into()))?;
        Ok(registry.default_id.clone())
    }

    /// Serialize a voice back to its JSON descriptor form.
    pub fn export(&self, id: &str) -> Result<String> {
        let voice = self.get(id)?;
        Ok(serde_json::to_string_pretty(&voice)?)
    }

    /// Approximate heap usage: style vectors dominate.
    pub fn memory_usage(&self) -> Result<usize> {
        let registry = self
            .inner
            .read()
            .map_err(|_| EngineError::Unknown("voice registry lock poisoned".into()))?;
        Ok(registry
            .voices
            .values()
            .map(|v| {
                v.style_vector.len() * std::mem::size_of::<f32>()
                    + v.id.len()
                    + v.name.len()
                    + v.language.len()
            })
            .sum())
    }
}
