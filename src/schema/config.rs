//! Configuration types for replay recording and playback.

use serde::{Deserialize, Serialize};

/// Default frame skip (record every tick).
fn default_frame_skip() -> u32 {
    1
}

/// Default checkpoint spacing for the player's seek cache.
fn default_checkpoint_interval() -> usize {
    64
}

/// Top-level replay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Enable the keyframe recorder. Playback works either way.
    #[serde(default)]
    pub enable_save: bool,
    /// Keyframe recording parameters.
    #[serde(default)]
    pub recorder: RecorderConfig,
    /// Playback parameters.
    #[serde(default)]
    pub player: PlayerConfig,
    /// Encoding used when writing replay documents.
    #[serde(default)]
    pub encoding: DocumentEncoding,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            enable_save: false,
            recorder: RecorderConfig::default(),
            player: PlayerConfig::default(),
            encoding: DocumentEncoding::default(),
        }
    }
}

/// Configuration for keyframe recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Record every Nth tick (1 = every tick).
    #[serde(default = "default_frame_skip")]
    pub frame_skip: u32,
    /// Maximum keyframes to record (0 = unlimited).
    #[serde(default)]
    pub max_keyframes: usize,
    /// Tick rate written to the document metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f32>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            frame_skip: 1,
            max_keyframes: 0,
            frame_rate: None,
        }
    }
}

/// Configuration for keyframe playback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Cache the reconstructed scene every N keyframes (0 = no cache).
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: default_checkpoint_interval(),
        }
    }
}

/// On-disk encoding of a replay document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentEncoding {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// JSON wrapped in an LZ4 envelope (requires the `lz4` feature).
    JsonLz4,
}

impl ReplayConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recorder.frame_skip == 0 {
            return Err(ConfigError::InvalidFrameSkip);
        }
        if let Some(rate) = self.recorder.frame_rate {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(ConfigError::InvalidFrameRate(rate));
            }
        }
        if self.encoding == DocumentEncoding::JsonLz4 && !cfg!(feature = "lz4") {
            return Err(ConfigError::CompressionUnavailable);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Frame skip must be at least 1")]
    InvalidFrameSkip,
    #[error("Frame rate must be positive and finite, got {0}")]
    InvalidFrameRate(f32),
    #[error("LZ4 encoding requested but the `lz4` feature is disabled")]
    CompressionUnavailable,
}
