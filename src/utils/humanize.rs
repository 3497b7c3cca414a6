use humansize::{DECIMAL, format_size};

/// Whole seconds, as shown next to the progress gauge
pub fn format_seconds(secs: f64) -> String {
    format!("{}", secs.max(0.0) as u64)
}

pub fn format_file_size(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}
