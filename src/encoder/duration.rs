use regex::Regex;
use std::io::BufRead;
use std::sync::LazyLock;
use tracing::{debug, warn};

// Exactly two fractional digits; anything else is treated as unknown.
static DURATION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Duration: (\d{2}):(\d{2}):(\d{2})\.\d{2}\b").ok());

/// Parse whole seconds out of a `Duration: HH:MM:SS.ff` diagnostic line
pub fn parse_duration_line(line: &str) -> Option<u64> {
    let caps = DURATION_RE.as_ref()?.captures(line)?;
    let hours: u64 = caps[1].parse().ok()?;
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: u64 = caps[3].parse().ok()?;
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Read the encoder's diagnostic stream until the source duration shows up.
///
/// Consumes lines up to and including the first match and leaves the rest of
/// the stream unread. Returns `0` (unknown) when the stream ends first.
pub fn extract_duration<R: BufRead>(reader: &mut R) -> u64 {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                debug!("Diagnostic stream ended without a duration line");
                return 0;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if let Some(seconds) = parse_duration_line(&line) {
                    debug!("Source duration: {}s", seconds);
                    return seconds;
                }
            }
            Err(e) => {
                warn!("Failed to read encoder diagnostics: {}", e);
                return 0;
            }
        }
    }
}
