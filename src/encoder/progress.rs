use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Progress key carrying output time. Despite the name the value is in microseconds.
const OUT_TIME_KEY: &str = "out_time_ms";
const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// One progress reading for the UI
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    /// 0-100
    pub percent: u8,
    pub elapsed_secs: f64,
    pub remaining_secs: f64,
    pub total_estimate_secs: f64,
}

impl ProgressSnapshot {
    /// Derive a snapshot from encoded output time and the source duration.
    ///
    /// Returns `None` when the duration is unknown or no output has been
    /// produced yet, since percent and remaining time are undefined then.
    pub fn compute(out_time_secs: f64, duration_secs: u64, elapsed_secs: f64) -> Option<Self> {
        if duration_secs == 0 || out_time_secs <= 0.0 {
            return None;
        }

        let done = out_time_secs / duration_secs as f64;
        // The encoder may run slightly past the declared duration
        let percent = (done * 100.0).floor().min(100.0) as u8;
        let total_estimate_secs = if done > 0.0 { elapsed_secs / done } else { 0.0 };
        let remaining_secs = (total_estimate_secs - elapsed_secs).max(0.0);

        Some(Self {
            percent,
            elapsed_secs,
            remaining_secs,
            total_estimate_secs,
        })
    }
}

/// Scan complete `key=value` lines for the latest output time.
///
/// Returns the last parseable `out_time_ms` value (microseconds) and the
/// number of bytes consumed. A trailing line without `\n` is not consumed.
pub fn scan_out_time(chunk: &[u8]) -> (Option<i64>, usize) {
    let consumed = match chunk.iter().rposition(|&b| b == b'\n') {
        Some(pos) => pos + 1,
        None => return (None, 0),
    };

    let mut latest = None;
    for raw in chunk[..consumed].split(|&b| b == b'\n') {
        let line = String::from_utf8_lossy(raw);
        if let Some((key, value)) = line.trim().split_once('=')
            && key.trim() == OUT_TIME_KEY
            && let Ok(micros) = value.trim().parse::<i64>()
        {
            latest = Some(micros);
        }
    }

    (latest, consumed)
}

/// Polls the encoder's progress file, remembering how far it has read.
///
/// The cursor only moves forward, so each tick scans just the bytes the
/// encoder appended since the previous one.
#[derive(Debug)]
pub struct ProgressSampler {
    path: PathBuf,
    duration_secs: u64,
    cursor: u64,
}

impl ProgressSampler {
    pub fn new(path: impl Into<PathBuf>, duration_secs: u64) -> Self {
        Self {
            path: path.into(),
            duration_secs,
            cursor: 0,
        }
    }

    /// Byte offset of the first unread byte
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Consume newly appended bytes, starting at the current cursor.
    pub fn feed(&mut self, chunk: &[u8], elapsed: Duration) -> Option<ProgressSnapshot> {
        let (latest, consumed) = scan_out_time(chunk);
        self.cursor += consumed as u64;

        let out_time_secs = latest?.max(0) as f64 / MICROS_PER_SECOND;
        ProgressSnapshot::compute(out_time_secs, self.duration_secs, elapsed.as_secs_f64())
    }

    /// Read whatever the encoder appended since the last tick.
    ///
    /// A missing or unreadable file means "no sample yet", never an error.
    pub fn sample(&mut self, elapsed: Duration) -> Option<ProgressSnapshot> {
        match self.read_new_bytes() {
            Ok(chunk) => self.feed(&chunk, elapsed),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                debug!("Progress file {} not readable yet: {}", self.path.display(), e);
                None
            }
        }
    }

    fn read_new_bytes(&self) -> io::Result<Vec<u8>> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.cursor))?;
        let mut chunk = Vec::new();
        file.read_to_end(&mut chunk)?;
        Ok(chunk)
    }
}
