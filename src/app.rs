//! Application Module
//!
//! Main application state and logic. This is the UI side of the encoder
//! boundary: it owns the job controller but only ever sees the events the
//! encoder thread sends back.

use crate::config::AppConfig;
use crate::encoder::{
    ConversionJob, EncoderJobController, EncoderSettings, JobEvent, JobOutcome, JobState,
    ProgressSnapshot, Quality, resolve_output_path,
};
use ratatui::widgets::ListState;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};
use tracing::{error, info, warn};

/// Application screens
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Home,
    FileExplorer,
    Progress,
    Finish,
}

/// Confirmation dialog action
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmAction {
    ExitApp,
}

/// Main application state
pub struct App {
    pub current_screen: Screen,
    pub should_quit: bool,

    // File explorer
    pub current_dir: PathBuf,
    pub dir_entries: Vec<PathBuf>,
    pub explorer_index: usize,
    pub explorer_list_state: ListState,

    // Selected file
    pub source: Option<PathBuf>,
    pub destination_preview: Option<PathBuf>,
    pub quality: Quality,

    // Encoding
    pub controller: Option<EncoderJobController>,
    pub job_events: Option<Receiver<JobEvent>>,
    pub last_snapshot: Option<ProgressSnapshot>,
    pub outcome: Option<JobOutcome>,
    pub output_size: Option<u64>,

    // Configuration
    pub config: AppConfig,
    pub encoder_settings: EncoderSettings,

    // UI state
    pub message: Option<String>,
    pub confirm_dialog: Option<ConfirmAction>,
    pub confirm_selection: bool,
}

impl App {
    pub fn new(config: AppConfig, encoder_settings: EncoderSettings, quality: Quality) -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        info!("Using encoder: {}", encoder_settings.binary.display());

        Self {
            current_screen: Screen::Home,
            should_quit: false,
            current_dir: config.start_directory(),
            dir_entries: Vec::new(),
            explorer_index: 0,
            explorer_list_state: list_state,
            source: None,
            destination_preview: None,
            quality,
            controller: None,
            job_events: None,
            last_snapshot: None,
            outcome: None,
            output_size: None,
            config,
            encoder_settings,
            message: None,
            confirm_dialog: None,
            confirm_selection: false,
        }
    }

    // Message handling

    pub fn set_message(&mut self, msg: &str) {
        self.message = Some(msg.to_string());
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    // Navigation

    pub fn navigate_to_home(&mut self) {
        self.current_screen = Screen::Home;
    }

    pub fn navigate_to_explorer(&mut self) {
        if let Some(parent) = self.source.as_deref().and_then(Path::parent)
            && parent.is_dir()
        {
            self.current_dir = parent.to_path_buf();
        }
        self.refresh_dir_entries();
        self.current_screen = Screen::FileExplorer;
    }

    pub fn navigate_to_progress(&mut self) {
        self.current_screen = Screen::Progress;
    }

    pub fn navigate_to_finish(&mut self) {
        self.current_screen = Screen::Finish;
    }

    // File explorer

    pub fn refresh_dir_entries(&mut self) {
        self.dir_entries.clear();

        // Add parent directory
        if let Some(parent) = self.current_dir.parent()
            && parent != self.current_dir
        {
            self.dir_entries.push(PathBuf::from(".."));
        }

        // Read directory contents
        if let Ok(entries) = std::fs::read_dir(&self.current_dir) {
            let mut paths: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir() || self.config.is_sound_file(p))
                .collect();

            // Sort: directories first, then files
            paths.sort_by(|a, b| match (a.is_dir(), b.is_dir()) {
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
                _ => a.file_name().cmp(&b.file_name()),
            });

            self.dir_entries.extend(paths);
        }

        self.explorer_index = 0;
        self.explorer_list_state.select(Some(0));
    }

    pub fn explorer_move_up(&mut self) {
        if self.explorer_index > 0 {
            self.explorer_index -= 1;
            self.explorer_list_state.select(Some(self.explorer_index));
        }
    }

    pub fn explorer_move_down(&mut self) {
        if self.explorer_index < self.dir_entries.len().saturating_sub(1) {
            self.explorer_index += 1;
            self.explorer_list_state.select(Some(self.explorer_index));
        }
    }

    pub fn enter_directory(&mut self) {
        let Some(selected) = self.dir_entries.get(self.explorer_index).cloned() else {
            return;
        };

        if selected == Path::new("..") {
            if let Some(parent) = self.current_dir.parent() {
                self.current_dir = parent.to_path_buf();
                self.refresh_dir_entries();
            }
        } else if selected.is_dir() {
            self.current_dir = selected;
            self.refresh_dir_entries();
        }
    }

    pub fn select_explorer_entry(&mut self) {
        let Some(selected) = self.dir_entries.get(self.explorer_index).cloned() else {
            return;
        };

        if selected == Path::new("..") || selected.is_dir() {
            self.enter_directory();
        } else if selected.is_file() {
            self.set_source(selected);
            self.navigate_to_home();
        }
    }

    // Source and quality

    /// Choose the file to compress and preview where the MP3 will go
    pub fn set_source(&mut self, path: PathBuf) {
        info!("Selected source: {}", path.display());
        self.destination_preview = Some(resolve_output_path(&path));
        self.source = Some(path);
    }

    pub fn quality_up(&mut self) {
        self.quality = self.quality.increase();
    }

    pub fn quality_down(&mut self) {
        self.quality = self.quality.decrease();
    }

    pub fn reset_quality(&mut self) {
        self.quality = Quality::DEFAULT;
    }

    // Encoding

    pub fn encoding_active(&self) -> bool {
        self.job_events.is_some()
    }

    pub fn job_state(&self) -> JobState {
        self.controller
            .as_ref()
            .map(EncoderJobController::state)
            .unwrap_or(JobState::Idle)
    }

    pub fn can_start(&self) -> bool {
        self.source.is_some() && !self.encoding_active()
    }

    /// Start compressing the selected file. Only one job runs at a time.
    pub fn start_job(&mut self) {
        if self.encoding_active() {
            warn!("Ignoring start request, a job is already running");
            return;
        }
        let Some(source) = self.source.clone() else {
            self.set_message("Select a sound file first");
            return;
        };

        let job = ConversionJob::new(source, self.quality);
        self.destination_preview = Some(job.destination.clone());

        let mut controller = EncoderJobController::new(job, self.encoder_settings.clone());
        match controller.start() {
            Ok(events) => {
                self.clear_message();
                self.last_snapshot = None;
                self.outcome = None;
                self.output_size = None;
                self.job_events = Some(events);
                self.controller = Some(controller);
                self.navigate_to_progress();
            }
            Err(e) => {
                error!("Failed to start job: {}", e);
                self.set_message(&e.to_string());
            }
        }
    }

    /// Drain events from the encoder thread; called once per UI tick
    pub fn process_job_events(&mut self) {
        let mut events = Vec::new();
        let mut disconnected = false;

        if let Some(ref rx) = self.job_events {
            loop {
                match rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        } else {
            return;
        }

        for event in events {
            match event {
                JobEvent::Progress(snapshot) => self.last_snapshot = Some(snapshot),
                JobEvent::Complete(outcome) => {
                    self.complete_job(outcome);
                    return;
                }
            }
        }

        if disconnected {
            error!("Encoder thread stopped without reporting an outcome");
            self.job_events = None;
            if let Some(mut controller) = self.controller.take() {
                controller.join();
            }
            self.set_message("Encoding stopped unexpectedly");
            self.navigate_to_home();
        }
    }

    fn complete_job(&mut self, outcome: JobOutcome) {
        self.job_events = None;
        if let Some(mut controller) = self.controller.take() {
            controller.join();
        }

        if outcome.success() {
            self.output_size = std::fs::metadata(&outcome.destination)
                .ok()
                .map(|m| m.len());
        }

        // Running again must not overwrite the file just written
        if let Some(source) = self.source.clone() {
            self.destination_preview = Some(resolve_output_path(&source));
        }

        self.outcome = Some(outcome);
        self.navigate_to_finish();
    }

    /// Leave the finish screen for another round
    pub fn acknowledge_outcome(&mut self) {
        self.outcome = None;
        self.last_snapshot = None;
        self.output_size = None;
        self.navigate_to_home();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::FailureReason;
    use std::sync::mpsc;
    use tempfile::tempdir;

    fn app() -> App {
        App::new(
            AppConfig::default(),
            EncoderSettings::default(),
            Quality::DEFAULT,
        )
    }

    fn snapshot(percent: u8) -> ProgressSnapshot {
        ProgressSnapshot {
            percent,
            elapsed_secs: 1.0,
            remaining_secs: 1.0,
            total_estimate_secs: 2.0,
        }
    }

    #[test]
    fn selecting_a_source_previews_destination() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("class.mp3"), b"").unwrap();

        let mut app = app();
        assert!(!app.can_start());
        app.set_source(dir.path().join("class.wav"));

        assert!(app.can_start());
        assert_eq!(
            app.destination_preview,
            Some(dir.path().join("class_1.mp3"))
        );
    }

    #[test]
    fn start_without_source_sets_message() {
        let mut app = app();
        app.start_job();
        assert!(app.message.is_some());
        assert_eq!(app.current_screen, Screen::Home);
        assert!(!app.encoding_active());
    }

    #[test]
    fn quality_controls() {
        let mut app = app();
        app.quality_up();
        app.quality_up();
        assert_eq!(app.quality.bitrate(), "40k");
        app.reset_quality();
        assert!(app.quality.is_default());
        for _ in 0..20 {
            app.quality_down();
        }
        assert_eq!(app.quality.bitrate(), "8k");
    }

    #[test]
    fn events_update_progress_then_finish() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("song.wav");
        let destination = dir.path().join("song.mp3");

        let mut app = app();
        app.set_source(source.clone());
        let (tx, rx) = mpsc::channel();
        app.job_events = Some(rx);
        app.navigate_to_progress();

        tx.send(JobEvent::Progress(snapshot(50))).unwrap();
        app.process_job_events();
        assert_eq!(app.last_snapshot.map(|s| s.percent), Some(50));
        assert_eq!(app.current_screen, Screen::Progress);
        assert!(app.encoding_active());

        std::fs::write(&destination, b"ID3").unwrap();
        tx.send(JobEvent::Progress(snapshot(100))).unwrap();
        tx.send(JobEvent::Complete(JobOutcome {
            source: source.clone(),
            destination: destination.clone(),
            result: Ok(()),
        }))
        .unwrap();
        app.process_job_events();

        assert_eq!(app.current_screen, Screen::Finish);
        assert!(!app.encoding_active());
        assert!(app.outcome.as_ref().is_some_and(JobOutcome::success));
        assert_eq!(app.output_size, Some(3));
        // Next run gets a fresh name
        assert_eq!(app.destination_preview, Some(dir.path().join("song_1.mp3")));

        app.acknowledge_outcome();
        assert_eq!(app.current_screen, Screen::Home);
        assert!(app.outcome.is_none());
    }

    #[test]
    fn failure_outcome_is_kept_for_display() {
        let mut app = app();
        let (tx, rx) = mpsc::channel();
        app.job_events = Some(rx);

        tx.send(JobEvent::Complete(JobOutcome {
            source: PathBuf::from("broken.wma"),
            destination: PathBuf::from("broken.mp3"),
            result: Err(FailureReason::EncoderExited { code: Some(1) }),
        }))
        .unwrap();
        app.process_job_events();

        let outcome = app.outcome.as_ref().unwrap();
        assert!(!outcome.success());
        assert_eq!(app.output_size, None);
        assert_eq!(app.current_screen, Screen::Finish);
    }

    #[test]
    fn lost_encoder_thread_returns_home() {
        let mut app = app();
        let (tx, rx) = mpsc::channel::<JobEvent>();
        app.job_events = Some(rx);
        app.navigate_to_progress();
        drop(tx);

        app.process_job_events();
        assert_eq!(app.current_screen, Screen::Home);
        assert!(!app.encoding_active());
        assert!(app.message.is_some());
    }

    #[test]
    fn explorer_lists_directories_and_sound_files() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lessons")).unwrap();
        std::fs::write(dir.path().join("b.wav"), b"").unwrap();
        std::fs::write(dir.path().join("a.wma"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let mut app = app();
        app.current_dir = dir.path().to_path_buf();
        app.refresh_dir_entries();

        let names: Vec<String> = app
            .dir_entries
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| p.to_string_lossy().to_string())
            })
            .collect();
        assert_eq!(names, vec!["..", "lessons", "a.wma", "b.wav"]);

        // Pick a.wma
        app.explorer_move_down();
        app.explorer_move_down();
        app.select_explorer_entry();
        assert_eq!(app.source, Some(dir.path().join("a.wma")));
        assert_eq!(app.current_screen, Screen::Home);
    }
}
