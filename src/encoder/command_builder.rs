use super::job::ConversionJob;
use std::ffi::OsString;
use std::path::PathBuf;

/// Everything needed to invoke the encoder for one job
#[derive(Debug, Clone)]
pub struct EncodeParams {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub bitrate: &'static str,
    pub progress_file: PathBuf,
}

impl EncodeParams {
    pub fn for_job(job: &ConversionJob, progress_file: PathBuf) -> Self {
        Self {
            source: job.source.clone(),
            destination: job.destination.clone(),
            bitrate: job.quality.bitrate(),
            progress_file,
        }
    }
}

/// Build encoder arguments
pub fn build_encoder_args(params: &EncodeParams) -> Vec<OsString> {
    vec![
        "-i".into(),
        params.source.clone().into_os_string(),
        "-b:a".into(),
        params.bitrate.into(),
        // Machine-readable progress goes to a side file
        "-progress".into(),
        params.progress_file.clone().into_os_string(),
        "-nostats".into(),
        // Destination was already checked to be free
        "-y".into(),
        params.destination.clone().into_os_string(),
    ]
}
