use serde::{Deserialize, Serialize};

/// Encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Encoder executable, a bare name is looked up on PATH
    pub binary: String,
    /// Progress polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            poll_interval_ms: 100,
        }
    }
}

/// Quality configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Level used when the app starts (1-10)
    pub default_level: u8,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self { default_level: 3 }
    }
}

/// File selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Extensions listed by the file explorer
    pub sound_extensions: Vec<String>,
    /// Directory the explorer opens in
    pub start_directory: Option<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            sound_extensions: ["wav", "mp3", "wma", "amr", "3gp"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            start_directory: None,
        }
    }
}
