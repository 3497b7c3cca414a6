//! Encoder job supervision
//!
//! Spawns the external encoder for one job and watches it from a single
//! background thread. The UI never touches the process or the progress file;
//! it only drains [`JobEvent`]s from the channel returned by
//! [`EncoderJobController::start`].

use super::command_builder::{EncodeParams, build_encoder_args};
use super::duration::extract_duration;
use super::job::{ConversionJob, JobState};
use super::progress::{ProgressSampler, ProgressSnapshot};
use crate::config::AppConfig;
use crate::error::AppError;
use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Diagnostic lines kept for the log when the encoder fails
const STDERR_TAIL_LINES: usize = 5;

const PROGRESS_FILE_PREFIX: &str = "kazait_progress_";

/// How the encoder is located and polled
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub binary: PathBuf,
    pub poll_interval: Duration,
    /// Where the progress file is created, the system temp dir when `None`
    pub progress_dir: Option<PathBuf>,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            poll_interval: Duration::from_millis(100),
            progress_dir: None,
        }
    }
}

impl From<&AppConfig> for EncoderSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            binary: PathBuf::from(&config.encoder.binary),
            poll_interval: Duration::from_millis(config.encoder.poll_interval_ms),
            progress_dir: None,
        }
    }
}

/// Why a job failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("could not start the encoder: {0}")]
    CouldNotStart(String),
    #[error("encoder reported failure ({})", describe_exit(.code))]
    EncoderExited { code: Option<i32> },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Terminal result of a job, delivered exactly once
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub result: Result<(), FailureReason>,
}

impl JobOutcome {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Messages sent from the encoder thread to the UI
#[derive(Debug, Clone)]
pub enum JobEvent {
    Progress(ProgressSnapshot),
    Complete(JobOutcome),
}

/// Runs exactly one [`ConversionJob`] through `Idle -> Running -> Succeeded | Failed`.
///
/// Only one job may be active at a time; the caller enforces that. A started
/// job cannot be cancelled and runs until the encoder exits.
pub struct EncoderJobController {
    job: ConversionJob,
    settings: EncoderSettings,
    state: Arc<Mutex<JobState>>,
    worker: Option<JoinHandle<()>>,
}

impl EncoderJobController {
    pub fn new(job: ConversionJob, settings: EncoderSettings) -> Self {
        Self {
            job,
            settings,
            state: Arc::new(Mutex::new(JobState::Idle)),
            worker: None,
        }
    }

    pub fn job(&self) -> &ConversionJob {
        &self.job
    }

    pub fn state(&self) -> JobState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Launch the encoder and return the channel its events arrive on.
    ///
    /// Fails only if the job was already started. A spawn failure is not an
    /// error here: it arrives on the channel as a `CouldNotStart` outcome.
    pub fn start(&mut self) -> Result<Receiver<JobEvent>, AppError> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != JobState::Idle {
                return Err(AppError::JobAlreadyStarted);
            }
            *state = JobState::Running;
        }

        let (tx, rx) = mpsc::channel();
        let started = Instant::now();

        info!(
            "Encoding: {} -> {} at {}",
            self.job.source.display(),
            self.job.destination.display(),
            self.job.quality.bitrate()
        );

        match launch(&self.job, &self.settings) {
            Ok((child, progress_file)) => {
                let job = self.job.clone();
                let state = Arc::clone(&self.state);
                let poll_interval = self.settings.poll_interval;

                self.worker = Some(thread::spawn(move || {
                    let result = supervise(child, progress_file, &tx, started, poll_interval);
                    finish(&state, &tx, job, result);
                }));
            }
            Err(reason) => {
                error!("{}", reason);
                finish(&self.state, &tx, self.job.clone(), Err(reason));
            }
        }

        Ok(rx)
    }

    /// Wait for the encoder thread to finish, if one was started
    pub fn join(&mut self) {
        if let Some(handle) = self.worker.take()
            && handle.join().is_err()
        {
            error!("Encoder thread panicked");
        }
    }
}

/// Create the progress file and spawn the encoder
fn launch(
    job: &ConversionJob,
    settings: &EncoderSettings,
) -> Result<(Child, TempPath), FailureReason> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(PROGRESS_FILE_PREFIX);
    let created = match &settings.progress_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    };
    let progress_file = created
        .map_err(|e| FailureReason::CouldNotStart(format!("failed to create progress file: {}", e)))?
        .into_temp_path();

    let params = EncodeParams::for_job(job, progress_file.to_path_buf());

    let mut command = Command::new(&settings.binary);
    command
        .args(build_encoder_args(&params))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    // On failure `progress_file` is dropped here, which deletes it
    let child = command.spawn().map_err(|e| {
        FailureReason::CouldNotStart(format!("{}: {}", settings.binary.display(), e))
    })?;

    debug!(
        "Encoder started (pid {}), progress file {}",
        child.id(),
        params.progress_file.display()
    );
    Ok((child, progress_file))
}

/// Body of the encoder thread: duration, progress loop, exit, cleanup.
fn supervise(
    mut child: Child,
    progress_file: TempPath,
    tx: &Sender<JobEvent>,
    started: Instant,
    poll_interval: Duration,
) -> Result<(), FailureReason> {
    let mut diagnostics = child.stderr.take().map(BufReader::new);

    let duration_secs = diagnostics.as_mut().map(extract_duration).unwrap_or(0);
    if duration_secs == 0 {
        warn!("Source duration unknown, progress will be indeterminate");
    }

    // Keep the pipe empty or a chatty encoder blocks on write and never exits
    let drain = diagnostics.map(|reader| thread::spawn(move || collect_stderr_tail(reader)));

    let mut sampler = ProgressSampler::new(progress_file.to_path_buf(), duration_secs);
    let status = wait_with_progress(&mut child, &mut sampler, tx, started, poll_interval);
    debug!("Consumed {} bytes of progress output", sampler.cursor());

    // The progress file goes away before anyone hears about the outcome
    remove_progress_file(progress_file);

    let tail = match drain.map(JoinHandle::join) {
        Some(Ok(tail)) => tail,
        Some(Err(_)) => {
            error!("Diagnostics reader panicked");
            VecDeque::new()
        }
        None => VecDeque::new(),
    };

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => {
            log_stderr_tail(tail);
            Err(FailureReason::EncoderExited {
                code: status.code(),
            })
        }
        Err(e) => {
            error!("Failed to wait for encoder: {}", e);
            Err(FailureReason::EncoderExited { code: None })
        }
    }
}

/// Sample progress on every tick until the encoder exits.
///
/// Exit is checked before sampling so the last lines written before exit
/// are still reported.
fn wait_with_progress(
    child: &mut Child,
    sampler: &mut ProgressSampler,
    tx: &Sender<JobEvent>,
    started: Instant,
    poll_interval: Duration,
) -> io::Result<ExitStatus> {
    loop {
        let exited = child.try_wait();

        if let Some(snapshot) = sampler.sample(started.elapsed()) {
            // A closed channel only means nobody is watching
            let _ = tx.send(JobEvent::Progress(snapshot));
        }

        match exited {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => thread::sleep(poll_interval),
            Err(e) => {
                warn!("Failed to poll encoder status: {}", e);
                return child.wait();
            }
        }
    }
}

fn remove_progress_file(progress_file: TempPath) {
    let path = progress_file.to_path_buf();
    match progress_file.close() {
        Ok(()) => debug!("Removed progress file {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove progress file {}: {}", path.display(), e),
    }
}

/// Read diagnostics to the end, keeping only the last few lines
fn collect_stderr_tail(reader: BufReader<ChildStderr>) -> VecDeque<String> {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    for line in reader.lines().map_while(Result::ok) {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail
}

fn log_stderr_tail(tail: VecDeque<String>) {
    if !tail.is_empty() {
        warn!(
            "Encoder output:\n{}",
            tail.into_iter().collect::<Vec<_>>().join("\n")
        );
    }
}

/// Record the terminal state, then deliver the single terminal event
fn finish(
    state: &Mutex<JobState>,
    tx: &Sender<JobEvent>,
    job: ConversionJob,
    result: Result<(), FailureReason>,
) {
    let terminal = if result.is_ok() {
        JobState::Succeeded
    } else {
        JobState::Failed
    };
    *state.lock().unwrap_or_else(PoisonError::into_inner) = terminal;

    match &result {
        Ok(()) => info!("Encoding finished: {}", job.destination.display()),
        Err(reason) => warn!("Encoding failed for {}: {}", job.source.display(), reason),
    }

    let outcome = JobOutcome {
        source: job.source,
        destination: job.destination,
        result,
    };
    if tx.send(JobEvent::Complete(outcome)).is_err() {
        debug!("Job finished with nobody listening");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Quality;
    use std::fs;
    use std::path::Path;
    use std::sync::MutexGuard;
    use tempfile::tempdir;

    // Serializes tests that fork, so a freshly written script is never
    // held open by another test's child (ETXTBSY).
    static SPAWN_LOCK: Mutex<()> = Mutex::new(());

    fn spawn_lock() -> MutexGuard<'static, ()> {
        SPAWN_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Settings whose progress files land in `dir/progress`
    fn settings(binary: impl Into<PathBuf>, dir: &Path) -> EncoderSettings {
        let progress_dir = dir.join("progress");
        fs::create_dir_all(&progress_dir).unwrap();
        EncoderSettings {
            binary: binary.into(),
            poll_interval: Duration::from_millis(100),
            progress_dir: Some(progress_dir),
        }
    }

    fn leftover_progress_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir.join("progress"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(PROGRESS_FILE_PREFIX))
            })
            .collect()
    }

    fn completions(events: &[JobEvent]) -> Vec<&JobOutcome> {
        events
            .iter()
            .filter_map(|e| match e {
                JobEvent::Complete(outcome) => Some(outcome),
                JobEvent::Progress(_) => None,
            })
            .collect()
    }

    fn percents(events: &[JobEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|e| match e {
                JobEvent::Progress(snap) => Some(snap.percent),
                JobEvent::Complete(_) => None,
            })
            .collect()
    }

    #[test]
    fn missing_binary_could_not_start() {
        let _guard = spawn_lock();
        let dir = tempdir().unwrap();
        let job = ConversionJob::new(dir.path().join("song.wav"), Quality::default());
        let mut controller =
            EncoderJobController::new(job, settings(dir.path().join("no-such-encoder"), dir.path()));

        let rx = controller.start().unwrap();
        assert_eq!(controller.state(), JobState::Failed);

        let events: Vec<JobEvent> = rx.iter().collect();
        assert_eq!(events.len(), 1);
        let outcome = completions(&events)[0];
        assert!(!outcome.success());
        assert!(matches!(outcome.result, Err(FailureReason::CouldNotStart(_))));
        assert_eq!(outcome.source, dir.path().join("song.wav"));
        assert!(leftover_progress_files(dir.path()).is_empty());
    }

    #[test]
    fn second_start_is_rejected() {
        let _guard = spawn_lock();
        let dir = tempdir().unwrap();
        let job = ConversionJob::new(dir.path().join("song.wav"), Quality::default());
        let mut controller =
            EncoderJobController::new(job, settings(dir.path().join("no-such-encoder"), dir.path()));

        assert_eq!(controller.state(), JobState::Idle);
        let _rx = controller.start().unwrap();
        assert!(matches!(controller.start(), Err(AppError::JobAlreadyStarted)));
    }

    #[test]
    fn failure_reason_wording() {
        let reason = FailureReason::EncoderExited { code: Some(1) };
        assert_eq!(reason.to_string(), "encoder reported failure (exit code 1)");
        let reason = FailureReason::EncoderExited { code: None };
        assert_eq!(reason.to_string(), "encoder reported failure (terminated by signal)");
    }

    #[cfg(unix)]
    mod simulated_encoder {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Write a shell script standing in for the encoder.
        ///
        /// Arguments arrive as `-i SRC -b:a RATE -progress FILE -nostats -y DEST`,
        /// so the progress file is `$6` and the destination `$9`. The script
        /// records `$6` in `progress_path` so tests can check it was removed.
        fn fake_encoder(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-encoder.sh");
            let marker = dir.join("progress_path");
            let script = format!(
                "#!/bin/sh\nprintf '%s' \"$6\" > '{}'\n{}\n",
                marker.display(),
                body
            );
            fs::write(&path, script).unwrap();
            let mut perms = fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).unwrap();
            path
        }

        fn recorded_progress_path(dir: &Path) -> PathBuf {
            PathBuf::from(fs::read_to_string(dir.join("progress_path")).unwrap())
        }

        fn start(dir: &Path, body: &str) -> (EncoderJobController, Receiver<JobEvent>) {
            let source = dir.join("song.wav");
            fs::write(&source, b"RIFF").unwrap();
            let encoder = fake_encoder(dir, body);

            let job = ConversionJob::new(source, Quality::default());
            let mut controller = EncoderJobController::new(job, settings(encoder, dir));
            let rx = controller.start().unwrap();
            (controller, rx)
        }

        fn run(dir: &Path, body: &str) -> (EncoderJobController, Vec<JobEvent>) {
            let (mut controller, rx) = start(dir, body);
            let events: Vec<JobEvent> = rx.iter().collect();
            controller.join();
            (controller, events)
        }

        /// Wait for the terminal event, giving up instead of hanging the suite
        fn wait_for_outcome(rx: &Receiver<JobEvent>) -> JobOutcome {
            let deadline = Instant::now() + Duration::from_secs(30);
            loop {
                let left = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(left) {
                    Ok(JobEvent::Complete(outcome)) => return outcome,
                    Ok(JobEvent::Progress(_)) => {}
                    Err(e) => panic!("job did not complete: {}", e),
                }
            }
        }

        // Far more than a pipe buffer (64 KiB on Linux) after the duration line
        const STDERR_FLOOD: &str = r#"
echo "  Duration: 00:00:10.00, bitrate: 1411 kb/s" >&2
i=0
while [ $i -lt 3000 ]; do
  echo "[mp3 @ 0x5581] Application provided invalid, non monotonically increasing dts to muxer in stream 0: 4608 >= 4608" >&2
  i=$((i+1))
done
"#;

        #[test]
        fn successful_run_reports_progress_then_success() {
            let _guard = spawn_lock();
            let dir = tempdir().unwrap();
            let body = r#"
echo "Input #0, wav, from '$2':" >&2
echo "  Duration: 00:00:10.00, bitrate: 1411 kb/s" >&2
printf 'out_time_ms=5000000\nprogress=continue\n' >> "$6"
sleep 1
printf 'out_time_ms=10000000\nprogress=end\n' >> "$6"
: > "$9"
exit 0
"#;
            let (controller, events) = run(dir.path(), body);

            assert_eq!(percents(&events), vec![50, 100]);

            let done = completions(&events);
            assert_eq!(done.len(), 1);
            assert!(done[0].success());
            assert_eq!(done[0].destination, dir.path().join("song.mp3"));
            assert_eq!(done[0].source, dir.path().join("song.wav"));
            assert!(matches!(events.last(), Some(JobEvent::Complete(_))));

            assert_eq!(controller.state(), JobState::Succeeded);
            assert!(!recorded_progress_path(dir.path()).exists());
            assert!(dir.path().join("song.mp3").exists());
        }

        #[test]
        fn non_zero_exit_fails_and_still_cleans_up() {
            let _guard = spawn_lock();
            let dir = tempdir().unwrap();
            let body = r#"
echo "  Duration: 00:00:10.00, bitrate: 1411 kb/s" >&2
echo "song.wav: Invalid data found when processing input" >&2
exit 3
"#;
            let (controller, events) = run(dir.path(), body);

            let done = completions(&events);
            assert_eq!(done.len(), 1);
            assert!(!done[0].success());
            assert_eq!(
                done[0].result,
                Err(FailureReason::EncoderExited { code: Some(3) })
            );
            assert!(matches!(events.last(), Some(JobEvent::Complete(_))));

            assert_eq!(controller.state(), JobState::Failed);
            assert!(!recorded_progress_path(dir.path()).exists());
        }

        #[test]
        fn unknown_duration_still_succeeds_without_progress() {
            let _guard = spawn_lock();
            let dir = tempdir().unwrap();
            let body = r#"
echo "  Duration: N/A, bitrate: N/A" >&2
printf 'out_time_ms=5000000\nprogress=continue\n' >> "$6"
exit 0
"#;
            let (controller, events) = run(dir.path(), body);

            assert!(percents(&events).is_empty());
            assert_eq!(events.len(), 1);
            assert!(completions(&events)[0].success());
            assert_eq!(controller.state(), JobState::Succeeded);
            assert!(!recorded_progress_path(dir.path()).exists());
        }

        #[test]
        fn progress_file_removed_by_encoder_is_fine() {
            let _guard = spawn_lock();
            let dir = tempdir().unwrap();
            let body = r#"
echo "  Duration: 00:00:04.00, bitrate: 1411 kb/s" >&2
rm -f "$6"
exit 0
"#;
            let (controller, events) = run(dir.path(), body);

            assert_eq!(completions(&events).len(), 1);
            assert_eq!(controller.state(), JobState::Succeeded);
        }

        #[test]
        fn chatty_encoder_still_completes() {
            let _guard = spawn_lock();
            let dir = tempdir().unwrap();
            let body = format!("{}\n: > \"$9\"\nexit 0", STDERR_FLOOD);
            let (mut controller, rx) = start(dir.path(), &body);

            let outcome = wait_for_outcome(&rx);
            controller.join();

            assert!(outcome.success());
            assert_eq!(controller.state(), JobState::Succeeded);
            assert!(leftover_progress_files(dir.path()).is_empty());
        }

        #[test]
        fn chatty_encoder_failure_is_reported() {
            let _guard = spawn_lock();
            let dir = tempdir().unwrap();
            let body = format!("{}\nexit 1", STDERR_FLOOD);
            let (mut controller, rx) = start(dir.path(), &body);

            let outcome = wait_for_outcome(&rx);
            controller.join();

            assert_eq!(outcome.result, Err(FailureReason::EncoderExited { code: Some(1) }));
            assert_eq!(controller.state(), JobState::Failed);
            assert!(leftover_progress_files(dir.path()).is_empty());
        }
    }
}
