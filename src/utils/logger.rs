use tracing_appender::non_blocking::WorkerGuard;

/// Initialize file logging when KAZAIT_DEBUG is set.
///
/// The terminal belongs to the UI, so logs only ever go to a daily file.
pub fn init_logging() -> Option<WorkerGuard> {
    std::env::var_os("KAZAIT_DEBUG")?;

    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("kazait");

    let _ = std::fs::create_dir_all(&log_dir);

    let file_appender = tracing_appender::rolling::daily(&log_dir, "kazait.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_thread_names(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::DEBUG.into()),
        )
        .init();

    tracing::info!("KaZait logging initialized in {}", log_dir.display());
    Some(guard)
}
