use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::level::LogLevel;

// ===== Значения по умолчанию =====

pub const DEFAULT_PREFIX: &str = "LOG";
pub const DEFAULT_LOG_DIR: &str = "logFiles";
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(200);
pub const DEFAULT_MAX_CACHE_SIZE: usize = 1 << 15; // 32 КБ
pub const DEFAULT_SIZE_POLL_INTERVAL: Duration = Duration::from_millis(10);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_IDLE_CHECK_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_RETAIN_LIMIT: usize = 1 << 20; // 1 МБ

// ===== Режим сброса =====

/// Когда содержимое буфера уходит в файл.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushMode {
    /// Каждая запись пишется в файл синхронно, до возврата из вызова.
    PerRecord,
    /// Буфер сбрасывается по таймеру.
    ByDuration,
    /// Буфер сбрасывается, когда его размер достигает порога.
    BySize,
}

impl FlushMode {
    pub fn is_buffered(&self) -> bool {
        !matches!(self, FlushMode::PerRecord)
    }
}

impl fmt::Display for FlushMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlushMode::PerRecord => "per-record",
            FlushMode::ByDuration => "by-duration",
            FlushMode::BySize => "by-size",
        })
    }
}

impl FromStr for FlushMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-record" | "every-log" => Ok(FlushMode::PerRecord),
            "by-duration" => Ok(FlushMode::ByDuration),
            "by-size" => Ok(FlushMode::BySize),
            other => Err(Error::Config(format!("unknown flush mode: {}", other))),
        }
    }
}

// ===== Конфигурация логгера =====

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub prefix: String,
    pub flush_mode: FlushMode,
    pub debug_echo: bool,
    /// Начальное состояние выключателя; [`crate::Logger::off`] это поле не меняет.
    pub off: bool,
    pub log_dir: PathBuf,
    pub min_level: LogLevel,
    pub flush_interval: Duration,
    pub max_cache_size: usize,
    pub size_poll_interval: Duration,
    pub idle_timeout: Duration,
    pub idle_check_interval: Duration,
    pub retain_limit: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            prefix: DEFAULT_PREFIX.to_owned(),
            flush_mode: FlushMode::ByDuration,
            debug_echo: false,
            off: false,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            min_level: LogLevel::Trace,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            size_poll_interval: DEFAULT_SIZE_POLL_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            idle_check_interval: DEFAULT_IDLE_CHECK_INTERVAL,
            retain_limit: DEFAULT_RETAIN_LIMIT,
        }
    }
}

impl LoggerConfig {
    pub fn new(prefix: &str, flush_mode: FlushMode) -> Self {
        LoggerConfig {
            prefix: prefix.to_owned(),
            flush_mode,
            ..Default::default()
        }
    }

    pub fn with_log_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.log_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_debug_echo(mut self, echo: bool) -> Self {
        self.debug_echo = echo;
        self
    }

    pub fn with_off(mut self, off: bool) -> Self {
        self.off = off;
        self
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_max_cache_size(mut self, bytes: usize) -> Self {
        self.max_cache_size = bytes;
        self
    }

    pub fn with_size_poll_interval(mut self, interval: Duration) -> Self {
        self.size_poll_interval = interval;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_idle_check_interval(mut self, interval: Duration) -> Self {
        self.idle_check_interval = interval;
        self
    }

    pub fn with_retain_limit(mut self, bytes: usize) -> Self {
        self.retain_limit = bytes;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_empty() {
            return Err(Error::Config("prefix must not be empty".into()));
        }
        if self.prefix.contains(['/', '\\']) {
            return Err(Error::Config(format!(
                "prefix must not contain a path separator: {}",
                self.prefix
            )));
        }

        let intervals = [
            ("flush_interval", self.flush_interval),
            ("size_poll_interval", self.size_poll_interval),
            ("idle_timeout", self.idle_timeout),
            ("idle_check_interval", self.idle_check_interval),
        ];
        for (name, value) in intervals {
            if value.is_zero() {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }

        if self.max_cache_size == 0 {
            return Err(Error::Config("max_cache_size must be greater than zero".into()));
        }
        if self.retain_limit < self.max_cache_size {
            return Err(Error::Config(format!(
                "retain_limit ({}) must be at least max_cache_size ({})",
                self.retain_limit, self.max_cache_size
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = LoggerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.flush_mode, FlushMode::ByDuration);
        assert_eq!(config.max_cache_size, 32 * 1024);
    }

    #[test]
    fn rejects_bad_prefix() {
        assert!(LoggerConfig::new("", FlushMode::BySize).validate().is_err());
        assert!(LoggerConfig::new("a/b", FlushMode::BySize).validate().is_err());
    }

    #[test]
    fn rejects_zero_intervals_and_sizes() {
        let config = LoggerConfig::new("T", FlushMode::ByDuration)
            .with_flush_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = LoggerConfig::new("T", FlushMode::BySize).with_max_cache_size(0);
        assert!(config.validate().is_err());

        let config = LoggerConfig::new("T", FlushMode::BySize)
            .with_max_cache_size(1024)
            .with_retain_limit(512);
        assert!(config.validate().is_err());
    }

    #[test]
    fn flush_mode_parses_aliases() {
        assert_eq!("every-log".parse::<FlushMode>().ok(), Some(FlushMode::PerRecord));
        assert_eq!("BY-SIZE".parse::<FlushMode>().ok(), Some(FlushMode::BySize));
        assert!("hourly".parse::<FlushMode>().is_err());
        assert!(!FlushMode::PerRecord.is_buffered());
        assert!(FlushMode::ByDuration.is_buffered());
    }
}
