use std::ffi::OsString;
use std::path::{Path, PathBuf};

const OUTPUT_EXTENSION: &str = "mp3";

/// Pick an `.mp3` destination next to `source` that does not exist yet.
///
/// The source extension is replaced with `.mp3`. When that name is taken,
/// `_1`, `_2`, ... are tried in order before the extension until a free
/// name is found. The check is not atomic: another writer may still create
/// the file between this call and the encoder opening it.
pub fn resolve_output_path(source: &Path) -> PathBuf {
    let base = source.with_extension("");

    let candidate = with_suffix(&base, &format!(".{}", OUTPUT_EXTENSION));
    if !candidate.exists() {
        return candidate;
    }

    let mut counter: u64 = 1;
    loop {
        let candidate = with_suffix(&base, &format!("_{}.{}", counter, OUTPUT_EXTENSION));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
