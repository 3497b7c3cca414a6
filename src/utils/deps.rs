use std::path::Path;
use std::process::{Command, Stdio};

/// Check that the encoder can be launched at all
pub fn encoder_available(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}
