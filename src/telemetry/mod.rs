//! Tracing subscriber setup
//!
//! The crate itself only emits `tracing` events. Applications that do not
//! install their own subscriber can use the helpers here.
//!
//! ```rust,ignore
//! use unillm::telemetry::{init_subscriber, OutputFormat, SubscriberConfig};
//!
//! let config = SubscriberConfig::builder()
//!     .log_level(tracing::Level::DEBUG)
//!     .output_format(OutputFormat::Json)
//!     .build();
//! let _guard = init_subscriber(config)?;
//! ```

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::error::{LlmError, Result};

/// Environment variable holding the log level.
pub const ENV_LOG_LEVEL: &str = "UNILLM_LOG_LEVEL";
/// Environment variable holding the output format.
pub const ENV_LOG_FORMAT: &str = "UNILLM_LOG_FORMAT";
/// Environment variable holding the log file path.
pub const ENV_LOG_FILE: &str = "UNILLM_LOG_FILE";

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON with span context
    Json,
    /// Flattened JSON without span context
    JsonCompact,
}

impl std::str::FromStr for OutputFormat {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "json-compact" => Ok(Self::JsonCompact),
            _ => Err(LlmError::TelemetryInit(format!(
                "Invalid log format: {}. Valid options: text, json, json-compact",
                s
            ))),
        }
    }
}

/// Configuration for the tracing subscriber
///
/// Logs go to `log_file` when set, otherwise to stdout when `enable_console`
/// is on.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberConfig {
    pub log_level: tracing::Level,
    pub output_format: OutputFormat,
    pub enable_console: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            log_level: tracing::Level::INFO,
            output_format: OutputFormat::Text,
            enable_console: true,
            log_file: None,
        }
    }
}

impl SubscriberConfig {
    pub fn builder() -> SubscriberConfigBuilder {
        SubscriberConfigBuilder::default()
    }

    pub fn debug() -> Self {
        Self {
            log_level: tracing::Level::DEBUG,
            ..Self::default()
        }
    }

    /// Warnings and errors only, as JSON, to a file.
    pub fn production(log_file: PathBuf) -> Self {
        Self {
            log_level: tracing::Level::WARN,
            output_format: OutputFormat::Json,
            enable_console: false,
            log_file: Some(log_file),
        }
    }

    /// Read the configuration from `UNILLM_LOG_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            builder = builder.log_level_str(&level)?;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            builder = builder.output_format(format.parse()?);
        }
        if let Some(path) = lookup(ENV_LOG_FILE) {
            builder = builder.log_file(PathBuf::from(path));
        }
        Ok(builder.build())
    }
}

/// Builder for [`SubscriberConfig`]
#[derive(Debug, Default)]
pub struct SubscriberConfigBuilder {
    log_level: Option<tracing::Level>,
    output_format: Option<OutputFormat>,
    enable_console: Option<bool>,
    log_file: Option<PathBuf>,
}

impl SubscriberConfigBuilder {
    pub fn log_level(mut self, level: tracing::Level) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn log_level_str(mut self, level: &str) -> Result<Self> {
        let level = match level.to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => {
                return Err(LlmError::TelemetryInit(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    level
                )));
            }
        };
        self.log_level = Some(level);
        Ok(self)
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn enable_console(mut self, enable: bool) -> Self {
        self.enable_console = Some(enable);
        self
    }

    pub fn log_file(mut self, path: PathBuf) -> Self {
        self.log_file = Some(path);
        self
    }

    pub fn build(self) -> SubscriberConfig {
        SubscriberConfig {
            log_level: self.log_level.unwrap_or(tracing::Level::INFO),
            output_format: self.output_format.unwrap_or_default(),
            enable_console: self.enable_console.unwrap_or(true),
            log_file: self.log_file,
        }
    }
}

macro_rules! try_init_formatted {
    ($builder:expr, $format:expr) => {
        match $format {
            OutputFormat::Json => $builder
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .json()
                .try_init(),
            OutputFormat::JsonCompact => $builder
                .with_target(true)
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .try_init(),
            OutputFormat::Text => $builder.with_target(true).try_init(),
        }
    };
}

/// Install a global subscriber.
///
/// Returns the file writer's guard when logging to a file; keep it alive for
/// as long as logs should be flushed. An already installed subscriber is not
/// an error.
pub fn init_subscriber(config: SubscriberConfig) -> Result<Option<WorkerGuard>> {
    let filter = format!("unillm={}", level_directive(config.log_level));

    let (init_result, guard) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path)?);
            let builder = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(writer);
            (try_init_formatted!(builder, config.output_format), Some(guard))
        }
        None if config.enable_console => {
            let builder = tracing_subscriber::fmt().with_env_filter(filter);
            (try_init_formatted!(builder, config.output_format), None)
        }
        None => return Ok(None),
    };

    match init_result {
        Ok(()) => Ok(guard),
        Err(e) => {
            if e.to_string()
                .contains("global default trace dispatcher has already been set")
            {
                Ok(None)
            } else {
                Err(LlmError::TelemetryInit(format!(
                    "Failed to initialize tracing: {}",
                    e
                )))
            }
        }
    }
}

pub fn init_default() -> Result<Option<WorkerGuard>> {
    init_subscriber(SubscriberConfig::default())
}

pub fn init_debug() -> Result<Option<WorkerGuard>> {
    init_subscriber(SubscriberConfig::debug())
}

/// See [`SubscriberConfig::from_env`].
pub fn init_from_env() -> Result<Option<WorkerGuard>> {
    init_subscriber(SubscriberConfig::from_env()?)
}

fn level_directive(level: tracing::Level) -> &'static str {
    match level {
        tracing::Level::TRACE => "trace",
        tracing::Level::DEBUG => "debug",
        tracing::Level::INFO => "info",
        tracing::Level::WARN => "warn",
        tracing::Level::ERROR => "error",
    }
}

fn file_appender(path: &Path) -> Result<RollingFileAppender> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            LlmError::TelemetryInit(format!("Invalid log file path: {}", path.display()))
        })?;
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .map_err(|e| LlmError::TelemetryInit(format!("Failed to open log file: {}", e)))
}
