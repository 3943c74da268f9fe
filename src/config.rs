//! Configuration loading and validation.
//!
//! Settings come from a TOML file with every field optional, then
//! environment variable overrides on top. Defaults live in [`crate::defaults`].

use crate::defaults;
use crate::error::{Result, StreamscribeError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub audio: AudioConfig,
    pub stream: StreamConfig,
    pub batch: BatchConfig,
    pub stt: SttConfig,
}

/// Server listen and storage endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    /// Vector-store endpoint; documents are kept in memory when absent.
    pub store_url: Option<String>,
}

/// Audio format and voice-activity gating
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub bytes_per_sample: u32,
    pub silence_threshold: f32,
    pub energy_smoothing: f32,
}

/// Per-connection stream buffer and reconciliation tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    pub max_buffer_secs: f32,
    pub min_buffer_secs: f32,
    pub pause_secs: f32,
    pub long_silence_frames: u32,
    pub overlap_fraction: f32,
    pub timestamp_tolerance_secs: f64,
    pub max_concurrent_transcriptions: usize,
}

/// Context aggregation windowing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    pub duration_secs: f64,
}

/// Speech-to-text engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub model_path: PathBuf,
    pub language: String,
    /// Inference threads (None = auto-detect).
    pub threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: defaults::LISTEN_ADDR.to_string(),
            store_url: None,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            bytes_per_sample: defaults::BYTES_PER_SAMPLE,
            silence_threshold: defaults::SILENCE_THRESHOLD,
            energy_smoothing: defaults::ENERGY_SMOOTHING,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_buffer_secs: defaults::MAX_BUFFER_SECS,
            min_buffer_secs: defaults::MIN_BUFFER_SECS,
            pause_secs: defaults::PAUSE_SECS,
            long_silence_frames: defaults::LONG_SILENCE_FRAMES,
            overlap_fraction: defaults::OVERLAP_FRACTION,
            timestamp_tolerance_secs: defaults::TIMESTAMP_TOLERANCE_SECS,
            max_concurrent_transcriptions: defaults::MAX_CONCURRENT_TRANSCRIPTIONS,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            duration_secs: defaults::BATCH_DURATION_SECS,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.bin"),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file, or defaults if the file doesn't exist
    ///
    /// Only falls back to defaults when the file is missing. Invalid TOML
    /// is still an error so typos don't silently revert to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(StreamscribeError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - STREAMSCRIBE_LISTEN → server.listen
    /// - STREAMSCRIBE_STORE_URL → server.store_url
    /// - STREAMSCRIBE_MODEL → stt.model_path
    /// - STREAMSCRIBE_LANGUAGE → stt.language
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(listen) = std::env::var("STREAMSCRIBE_LISTEN")
            && !listen.is_empty()
        {
            self.server.listen = listen;
        }
        if let Ok(url) = std::env::var("STREAMSCRIBE_STORE_URL")
            && !url.is_empty()
        {
            self.server.store_url = Some(url);
        }
        if let Ok(model) = std::env::var("STREAMSCRIBE_MODEL")
            && !model.is_empty()
        {
            self.stt.model_path = PathBuf::from(model);
        }
        if let Ok(language) = std::env::var("STREAMSCRIBE_LANGUAGE")
            && !language.is_empty()
        {
            self.stt.language = language;
        }
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(StreamscribeError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.bytes_per_sample == 0 {
            return Err(StreamscribeError::ConfigInvalidValue {
                key: "audio.bytes_per_sample".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.audio.energy_smoothing) {
            return Err(StreamscribeError::ConfigInvalidValue {
                key: "audio.energy_smoothing".to_string(),
                message: "must be within [0, 1]".to_string(),
            });
        }
        if self.stream.max_buffer_secs <= 0.0 {
            return Err(StreamscribeError::ConfigInvalidValue {
                key: "stream.max_buffer_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.stream.min_buffer_secs > self.stream.max_buffer_secs {
            return Err(StreamscribeError::ConfigInvalidValue {
                key: "stream.min_buffer_secs".to_string(),
                message: "must not exceed stream.max_buffer_secs".to_string(),
            });
        }
        if !(0.0..1.0).contains(&self.stream.overlap_fraction) {
            return Err(StreamscribeError::ConfigInvalidValue {
                key: "stream.overlap_fraction".to_string(),
                message: "must be within [0, 1)".to_string(),
            });
        }
        if self.stream.max_concurrent_transcriptions == 0 {
            return Err(StreamscribeError::ConfigInvalidValue {
                key: "stream.max_concurrent_transcriptions".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.batch.duration_secs <= 0.0 {
            return Err(StreamscribeError::ConfigInvalidValue {
                key: "batch.duration_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Maximum stream buffer size in bytes.
    pub fn max_buffer_bytes(&self) -> usize {
        (self.audio.sample_rate as f32
            * self.audio.bytes_per_sample as f32
            * self.stream.max_buffer_secs) as usize
    }

    /// Minimum stream buffer size in bytes for the pause trigger.
    pub fn min_buffer_bytes(&self) -> usize {
        (self.audio.sample_rate as f32
            * self.audio.bytes_per_sample as f32
            * self.stream.min_buffer_secs) as usize
    }
}
