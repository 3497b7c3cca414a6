use super::output_path::resolve_output_path;
use super::quality::Quality;
use std::path::PathBuf;

/// Lifecycle of a conversion job. `Succeeded` and `Failed` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// One source file converted to one destination at one bitrate
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub quality: Quality,
}

impl ConversionJob {
    /// Create a job, picking a destination that does not exist yet
    pub fn new(source: impl Into<PathBuf>, quality: Quality) -> Self {
        let source = source.into();
        let destination = resolve_output_path(&source);
        Self {
            source,
            destination,
            quality,
        }
    }

    pub fn source_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}
