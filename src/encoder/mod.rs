pub mod command_builder;
pub mod controller;
pub mod duration;
pub mod job;
pub mod output_path;
pub mod progress;
pub mod quality;

pub use controller::{EncoderJobController, EncoderSettings, FailureReason, JobEvent, JobOutcome};
pub use job::{ConversionJob, JobState};
pub use output_path::resolve_output_path;
pub use progress::ProgressSnapshot;
pub use quality::Quality;
