pub mod deps;
pub mod humanize;
pub mod logger;

pub use deps::encoder_available;
pub use humanize::{format_file_size, format_seconds};
pub use logger::init_logging;
