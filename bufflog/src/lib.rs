//! # bufflog
//!
//! Буферизованный файловый логгер. Записи копятся в памяти и переносятся в
//! посуточные файлы `<каталог>/<префикс>-<ГГГГ-ММ-ДД>.log` по одному из
//! режимов: на каждую запись, по таймеру или по размеру буфера. По сигналу
//! завершения буфер сбрасывается до выхода процесса.
//!
//! ```no_run
//! use bufflog::{FlushMode, Logger, LoggerConfig};
//! use serde_json::json;
//!
//! let config = LoggerConfig::new("APP", FlushMode::ByDuration).with_log_dir("logs");
//! let logger = Logger::new(config)?;
//! logger.error(&json!({"userId": 1}));
//! logger.shutdown()?;
//! # Ok::<(), bufflog::Error>(())
//! ```

use std::sync::Arc;

use once_cell::sync::OnceCell;

mod buffer;
mod config;
mod error;
mod level;
mod logger;
mod monitor;
mod serializer;
mod shutdown;
mod system;
mod writer;

pub use buffer::RecordBuffer;
pub use config::{
    FlushMode, LoggerConfig, DEFAULT_FLUSH_INTERVAL, DEFAULT_IDLE_CHECK_INTERVAL,
    DEFAULT_IDLE_TIMEOUT, DEFAULT_LOG_DIR, DEFAULT_MAX_CACHE_SIZE, DEFAULT_PREFIX,
    DEFAULT_RETAIN_LIMIT, DEFAULT_SIZE_POLL_INTERVAL,
};
pub use error::{Error, Result};
pub use level::LogLevel;
pub use logger::{format_log_line, Logger};
pub use monitor::MonitorState;
pub use serializer::{JsonSerializer, Serializer};
#[cfg(unix)]
pub use shutdown::ShutdownGuard;
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
pub use writer::{FileWriter, WriterStats};

// ===== Макросы =====

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.trace(&format!($($arg)*));
    }};
}
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.debug(&format!($($arg)*));
    }};
}
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.info(&format!($($arg)*));
    }};
}
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.warn(&format!($($arg)*));
    }};
}
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.error(&format!($($arg)*));
    }};
}
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.fatal(&format!($($arg)*));
    }};
}

// ===== Глобальные макросы =====

#[macro_export]
macro_rules! gtrace {
    ($($arg:tt)*) => {{
        if let Some(logger) = $crate::global_logger() {
            logger.trace(&format!($($arg)*));
        }
    }};
}
#[macro_export]
macro_rules! gdebug {
    ($($arg:tt)*) => {{
        if let Some(logger) = $crate::global_logger() {
            logger.debug(&format!($($arg)*));
        }
    }};
}
#[macro_export]
macro_rules! ginfo {
    ($($arg:tt)*) => {{
        if let Some(logger) = $crate::global_logger() {
            logger.info(&format!($($arg)*));
        }
    }};
}
#[macro_export]
macro_rules! gwarn {
    ($($arg:tt)*) => {{
        if let Some(logger) = $crate::global_logger() {
            logger.warn(&format!($($arg)*));
        }
    }};
}
#[macro_export]
macro_rules! gerror {
    ($($arg:tt)*) => {{
        if let Some(logger) = $crate::global_logger() {
            logger.error(&format!($($arg)*));
        }
    }};
}
#[macro_export]
macro_rules! gfatal {
    ($($arg:tt)*) => {{
        if let Some(logger) = $crate::global_logger() {
            logger.fatal(&format!($($arg)*));
        }
    }};
}

// ===== Глобальный логгер =====
//
// Инициализируется один раз за процесс. Статические значения не
// уничтожаются при выходе, поэтому остаток буфера записывает
// `flush_global_logger` (его же вызывает обработчик сигналов).

static GLOBAL_LOGGER: OnceCell<Arc<Logger>> = OnceCell::new();

pub fn init_global_logger(config: LoggerConfig) -> Result<()> {
    if GLOBAL_LOGGER.get().is_some() {
        return Err(Error::AlreadyInitialized);
    }
    let logger = Arc::new(Logger::new(config)?);
    GLOBAL_LOGGER
        .set(logger)
        .map_err(|_| Error::AlreadyInitialized)
}

pub fn global_logger() -> Option<&'static Arc<Logger>> {
    GLOBAL_LOGGER.get()
}

/// Записывает остаток буфера глобального логгера. Без логгера ничего не делает.
pub fn flush_global_logger() -> Result<()> {
    match GLOBAL_LOGGER.get() {
        Some(logger) => logger.flush(),
        None => Ok(()),
    }
}

/// Вешает на глобальный логгер сброс по SIGTERM/SIGINT/SIGQUIT/SIGHUP
/// (с завершением процесса) и по SIGUSR1/SIGUSR2 (без завершения).
///
/// Вызывается после [`init_global_logger`]; без логгера сигналы не
/// перехватываются и возвращается [`Error::Config`].
#[cfg(unix)]
pub fn install_global_shutdown_handler() -> Result<ShutdownGuard> {
    let logger = GLOBAL_LOGGER.get().ok_or_else(|| {
        Error::Config("global logger is not initialized, call init_global_logger first".into())
    })?;
    let coordinator = ShutdownCoordinator::new();
    coordinator.register(logger);
    coordinator.install()
}
