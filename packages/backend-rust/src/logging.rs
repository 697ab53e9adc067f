use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "kaiwa.log";

/// Keeps the non-blocking file writer flushing until dropped
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

pub fn file_logging_enabled() -> bool {
    env_flag("ENABLE_FILE_LOGS")
}

/// `LOG_FORMAT=json` switches stdout to one JSON object per event
pub fn json_logging_enabled() -> bool {
    std::env::var("LOG_FORMAT")
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let json = json_logging_enabled();
    let stdout_text = (!json).then(|| fmt::layer().with_target(true));
    let stdout_json = json.then(|| fmt::layer().json().with_target(true));

    let mut guard = None;
    let mut file_layer = None;
    if file_logging_enabled() {
        let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
        match std::fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
                let (writer, worker_guard) = tracing_appender::non_blocking(appender);
                file_layer = Some(
                    fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true),
                );
                guard = Some(FileLogGuard { _guard: worker_guard });
            }
            Err(err) => eprintln!("failed to create log directory {log_dir}: {err}"),
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_text)
        .with(stdout_json)
        .with(file_layer)
        .init();

    guard
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}
