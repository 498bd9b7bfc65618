//! Flagway Logging
//!
//! Diagnostics for the Flagway feature-flag gateway. Two layers live here:
//!
//! - the [`Logger`] seam the gateway reports evaluation failures and the
//!   startup announcement through, with [`ScopedLogger`] as the default sink;
//! - the `debug!`/`info!` macros the crates use for their own tracing lines.
//!
//! Both write one line per event to stderr, as JSON by default.
//!
//! ```rust
//! use flagway_log::{Logger, ScopedLogger, debug};
//! use serde_json::json;
//!
//! let key = "BE_checkout";
//! debug!(target: "flagway::gateway", "hasFeature {} for {}", key, "all");
//!
//! let logger = ScopedLogger::new();
//! logger.set_scope("feature flags");
//! logger.info("Enabled Feature flags", Some(&json!([key])));
//! ```
//!
//! # Environment Variables
//!
//! - `FLAGWAY_LOG_LEVEL=debug|info|error|off` (default `info`)
//! - `FLAGWAY_DEBUG=1` - shorthand for `FLAGWAY_LOG_LEVEL=debug`
//! - `FLAGWAY_LOG_FORMAT=json|pretty` (default `json`)
//! - `FLAGWAY_LOG_COLOR=1|0` - colored level names in `pretty` output
//! - `FLAGWAY_LOG_TIMESTAMPS=1|0`

mod logger;

pub use logger::{Logger, NoopLogger, ScopedLogger, error_chain};

use once_cell::sync::Lazy;
use serde_json::Value;
use std::env;
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};

/// Severity of a line. The gateway only ever reports at these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Error = 2,
    /// Silences everything.
    Off = 3,
}

impl Level {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "error" => Some(Level::Error),
            "off" => Some(Level::Off),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Debug,
            1 => Level::Info,
            2 => Level::Error,
            _ => Level::Off,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `{"timestamp","level","target","message","data"}` per line.
    Json,
    /// `timestamp LEVEL [target] message data`
    Pretty,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "pretty" => Some(Format::Pretty),
            _ => None,
        }
    }
}

/// Output settings, read once from the environment.
#[derive(Debug, Clone)]
pub struct Output {
    pub level: Level,
    pub format: Format,
    pub color: bool,
    pub timestamps: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Json,
            color: false,
            timestamps: true,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl Output {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let debug = env_flag("FLAGWAY_DEBUG").unwrap_or(false);

        Self {
            level: env::var("FLAGWAY_LOG_LEVEL")
                .ok()
                .and_then(|s| Level::parse(&s))
                .unwrap_or(if debug { Level::Debug } else { defaults.level }),
            format: env::var("FLAGWAY_LOG_FORMAT")
                .ok()
                .and_then(|s| Format::parse(&s))
                .unwrap_or(defaults.format),
            color: env_flag("FLAGWAY_LOG_COLOR").unwrap_or_else(|| env::var("NO_COLOR").is_err()),
            timestamps: env_flag("FLAGWAY_LOG_TIMESTAMPS").unwrap_or(defaults.timestamps),
        }
    }
}

static OUTPUT: Lazy<Output> = Lazy::new(Output::from_env);

// u8::MAX until the environment has been read
static LEVEL_OVERRIDE: AtomicU8 = AtomicU8::new(u8::MAX);

/// Read the environment now instead of on the first line.
pub fn init() {
    Lazy::force(&OUTPUT);
}

pub fn output() -> &'static Output {
    &OUTPUT
}

/// The active threshold: the last [`set_level`], else the environment's.
pub fn level() -> Level {
    match LEVEL_OVERRIDE.load(Ordering::Relaxed) {
        u8::MAX => OUTPUT.level,
        raw => Level::from_u8(raw),
    }
}

pub fn set_level(level: Level) {
    LEVEL_OVERRIDE.store(level as u8, Ordering::Relaxed);
}

#[inline]
pub fn enabled(level: Level) -> bool {
    level != Level::Off && level >= self::level()
}

/// Write one line at `level` under `target`, with an optional payload.
pub fn log_with_data(level: Level, target: &str, message: &str, data: Option<&Value>) {
    if !enabled(level) {
        return;
    }
    let output = output();
    let line = match output.format {
        Format::Json => json_line(level, target, message, data),
        Format::Pretty => pretty_line(level, target, message, data, output),
    };
    let _ = writeln!(std::io::stderr().lock(), "{}", line);
}

fn pretty_line(
    level: Level,
    target: &str,
    message: &str,
    data: Option<&Value>,
    output: &Output,
) -> String {
    let mut line = String::new();
    if output.timestamps {
        line.push_str(&chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f ").to_string());
    }
    line.push_str(&level_label(level, output.color));
    if !target.is_empty() {
        line.push_str(&format!(" [{}]", target));
    }
    line.push(' ');
    line.push_str(message);
    if let Some(data) = data {
        line.push_str(&format!(" {}", data));
    }
    line
}

#[cfg(feature = "color")]
fn level_label(level: Level, color: bool) -> String {
    use colored::Colorize;
    let label = format!("{:5}", level.as_str());
    if !color {
        return label;
    }
    match level {
        Level::Debug => label.blue().to_string(),
        Level::Info => label.green().to_string(),
        Level::Error => label.red().bold().to_string(),
        Level::Off => label,
    }
}

#[cfg(not(feature = "color"))]
fn level_label(level: Level, _color: bool) -> String {
    format!("{:5}", level.as_str())
}

#[cfg(feature = "json")]
fn json_line(level: Level, target: &str, message: &str, data: Option<&Value>) -> String {
    use serde::Serialize;

    #[derive(Serialize)]
    struct Line<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        message: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<&'a Value>,
    }

    let line = Line {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: level.as_str(),
        target,
        message,
        data,
    };
    serde_json::to_string(&line).unwrap_or_else(|_| message.to_string())
}

#[cfg(not(feature = "json"))]
fn json_line(level: Level, target: &str, message: &str, data: Option<&Value>) -> String {
    let mut line = serde_json::Map::new();
    line.insert("timestamp".into(), chrono::Utc::now().to_rfc3339().into());
    line.insert("level".into(), level.as_str().into());
    line.insert("target".into(), target.into());
    line.insert("message".into(), message.into());
    if let Some(data) = data {
        line.insert("data".into(), data.clone());
    }
    Value::Object(line).to_string()
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:expr, $target:expr, $($arg:tt)+) => {
        if $crate::enabled($level) {
            $crate::log_with_data($level, $target, &format!($($arg)+), None);
        }
    };
}

/// Log at debug level. The message is only formatted when debug is on.
///
/// ```rust
/// use flagway_log::debug;
///
/// debug!(target: "flagway::local", "Datafile swapped to revision {}", 7);
/// debug!("no target, defaults to the module path");
/// ```
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::__log!($crate::Level::Debug, $target, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Debug, module_path!(), $($arg)+)
    };
}

/// Log at info level.
#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::__log!($crate::Level::Info, $target, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Info, module_path!(), $($arg)+)
    };
}

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! A `tracing` subscriber whose default filter follows
    //! `FLAGWAY_LOG_LEVEL`, for hosts that embed the gateway in a `tracing`
    //! stack. `RUST_LOG` still wins when set.

    use super::{Level, level, output};

    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let directive = match level() {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Error => "error",
            Level::Off => "off",
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(output().color))
    }
}
