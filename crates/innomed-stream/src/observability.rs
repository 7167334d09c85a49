//! Process-wide `tracing` setup for binaries and examples.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INSTALLED: OnceCell<LogSettings> = OnceCell::new();

const DEFAULT_LOG_FILE: &str = "innomed.logs.jsonl";

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    /// Compact human-readable lines on stderr; stdout stays free for results.
    Stderr,
    /// One JSON object per line appended to this file.
    JsonFile(PathBuf),
}

/// Logging setup resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub enabled: bool,
    pub filter: String,
    pub sink: LogSink,
}

impl LogSettings {
    /// Resolves settings from the process environment.
    ///
    /// - `INNOMED_OBSERVABILITY_ENABLED` / `INNOMED_OBSERVABILITY`: on/off
    ///   (unrecognized values count as on).
    /// - `INNOMED_LOG_LEVEL`, then `RUST_LOG`: filter directives.
    /// - `INNOMED_JSON_LOG_PATH`: switches output to a JSON-lines file.
    ///
    /// `default_level` is used when no filter variable is set.
    pub fn from_env(default_level: &str) -> Self {
        Self::resolve(default_level, |key| std::env::var(key).ok())
    }

    fn resolve(default_level: &str, var: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = ["INNOMED_OBSERVABILITY_ENABLED", "INNOMED_OBSERVABILITY"]
            .into_iter()
            .find_map(|key| var(key))
            .is_none_or(|raw| switch_value(&raw).unwrap_or(true));
        let filter = ["INNOMED_LOG_LEVEL", "RUST_LOG"]
            .into_iter()
            .filter_map(|key| var(key))
            .find(|directives| !directives.trim().is_empty())
            .unwrap_or_else(|| default_level.to_string());
        let sink = var("INNOMED_JSON_LOG_PATH")
            .filter(|path| !path.trim().is_empty())
            .map_or(LogSink::Stderr, |path| LogSink::JsonFile(PathBuf::from(path)));
        Self {
            enabled,
            filter,
            sink,
        }
    }

    fn env_filter(&self, default_level: &str) -> EnvFilter {
        EnvFilter::try_new(&self.filter)
            .or_else(|_| EnvFilter::try_new(default_level))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    }

    fn install(&self, default_level: &str) {
        if !self.enabled {
            return;
        }
        let registry = tracing_subscriber::registry().with(self.env_filter(default_level));
        match &self.sink {
            LogSink::Stderr => {
                let _ = registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_target(false)
                            .with_writer(std::io::stderr),
                    )
                    .try_init();
            }
            LogSink::JsonFile(path) => {
                let (dir, file_name) = split_log_path(path);
                let _ = std::fs::create_dir_all(&dir);
                let _ = registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_current_span(true)
                            .with_target(false)
                            .with_writer(tracing_appender::rolling::never(dir, file_name)),
                    )
                    .try_init();
            }
        }
    }
}

fn switch_value(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file_name)
}

/// Installs the global subscriber once per process and returns the settings
/// it was installed with. Later calls are no-ops returning the first
/// settings.
pub fn init_observability(default_level: &str) -> &'static LogSettings {
    INSTALLED.get_or_init(|| {
        let settings = LogSettings::from_env(default_level);
        settings.install(default_level);
        settings
    })
}
