//! Tunable pipeline settings.
//!
//! Everything has a default, so an empty JSON object (or no settings at all)
//! gives the standard behaviour:
//!
//! ```json
//! { "chunkSize": 44100, "vocoder": { "windowSize": 2048, "hop": 1024, "bands": 40 } }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineSettings {
    /// Samples per read-ahead and render chunk.
    pub chunk_size: usize,
    pub vocoder: VocoderSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VocoderSettings {
    pub window_size: usize,
    pub hop: usize,
    /// Number of mel bands in the envelope.
    pub bands: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            chunk_size: 44_100,
            vocoder: VocoderSettings::default(),
        }
    }
}

impl Default for VocoderSettings {
    fn default() -> Self {
        VocoderSettings {
            window_size: 2048,
            hop: 1024,
            bands: 40,
        }
    }
}

impl PipelineSettings {
    /// Parse and validate settings from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let settings: PipelineSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidSettings("chunkSize must be positive".into()));
        }
        self.vocoder.validate()
    }
}

impl VocoderSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size < 2 {
            return Err(ConfigError::InvalidSettings(format!(
                "vocoder windowSize must be at least 2, got {}",
                self.window_size
            )));
        }
        if self.hop == 0 || self.hop > self.window_size {
            return Err(ConfigError::InvalidSettings(format!(
                "vocoder hop must be in 1..={}, got {}",
                self.window_size, self.hop
            )));
        }
        if self.bands < 2 {
            return Err(ConfigError::InvalidSettings(format!(
                "vocoder needs at least 2 bands, got {}",
                self.bands
            )));
        }
        Ok(())
    }
}
