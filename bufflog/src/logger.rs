use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver};
use serde::Serialize;

use crate::config::{FlushMode, LoggerConfig};
use crate::error::{Error, Result};
use crate::level::LogLevel;
use crate::monitor::{Core, MonitorHandle, MonitorState};
use crate::serializer::{render_payload, JsonSerializer, Serializer};
use crate::writer::{create_log_dir, WriterStats};

const ERROR_CHANNEL_CAPACITY: usize = 64;

/// `[<prefix>] | LEVEL:<level> | message:<payload>\n`
pub fn format_log_line(prefix: &str, level: LogLevel, message: &str) -> String {
    format!("[{}] | LEVEL:{} | message:{}\n", prefix, level.as_str(), message)
}

// ===== Основной логгер =====

/// Логгер с буфером в памяти и фоновым монитором сброса.
///
/// В режиме [`FlushMode::PerRecord`] каждая запись попадает в файл до
/// возврата из вызова. В режимах `ByDuration` и `BySize` вызов только
/// дописывает строку в буфер, а в файл её переносит монитор. В `BySize`
/// запись, на которой буфер дорос до порога, ждёт, пока монитор его сбросит.
///
/// При `Drop` выполняется [`Logger::shutdown`]: монитор останавливается,
/// остаток буфера записывается.
pub struct Logger {
    core: Arc<Core>,
    monitor: MonitorHandle,
    serializer: Box<dyn Serializer>,
    off: AtomicBool,
    closed: AtomicBool,
    errors: Receiver<Error>,
}

impl Logger {
    pub fn new(config: LoggerConfig) -> Result<Self> {
        Self::with_serializer(config, JsonSerializer)
    }

    /// Логгер с префиксом по умолчанию и сбросом по таймеру.
    pub fn default_logger() -> Result<Self> {
        Self::new(LoggerConfig::default())
    }

    pub fn with_serializer<S>(config: LoggerConfig, serializer: S) -> Result<Self>
    where
        S: Serializer + 'static,
    {
        config.validate()?;
        create_log_dir(&config.log_dir)?;

        let off = config.off;
        let (errors_tx, errors_rx) = bounded(ERROR_CHANNEL_CAPACITY);
        let core = Arc::new(Core::new(config, errors_tx));
        let monitor = MonitorHandle::spawn(Arc::clone(&core))?;

        Ok(Logger {
            core,
            monitor,
            serializer: Box::new(serializer),
            off: AtomicBool::new(off),
            closed: AtomicBool::new(false),
            errors: errors_rx,
        })
    }

    pub fn trace<T: Serialize + ?Sized>(&self, payload: &T) {
        self.log(LogLevel::Trace, payload);
    }

    pub fn debug<T: Serialize + ?Sized>(&self, payload: &T) {
        self.log(LogLevel::Debug, payload);
    }

    pub fn info<T: Serialize + ?Sized>(&self, payload: &T) {
        self.log(LogLevel::Info, payload);
    }

    pub fn warn<T: Serialize + ?Sized>(&self, payload: &T) {
        self.log(LogLevel::Warn, payload);
    }

    pub fn error<T: Serialize + ?Sized>(&self, payload: &T) {
        self.log(LogLevel::Error, payload);
    }

    pub fn fatal<T: Serialize + ?Sized>(&self, payload: &T) {
        self.log(LogLevel::Fatal, payload);
    }

    pub fn any<T: Serialize + ?Sized>(&self, level: LogLevel, payload: &T) {
        self.log(level, payload);
    }

    /// Ошибка синхронной записи (PerRecord) фатальна: вызывающий рассчитывает,
    /// что запись уже в файле. Для обработки ошибки вручную есть [`Logger::try_log`].
    fn log<T: Serialize + ?Sized>(&self, level: LogLevel, payload: &T) {
        if let Err(e) = self.try_log(level, payload) {
            self.core.system.report(
                LogLevel::Fatal,
                &format!("synchronous log write failed: {}", e),
            );
            panic!("bufflog: synchronous log write failed: {}", e);
        }
    }

    /// Как [`Logger::any`], но ошибку синхронной записи возвращает.
    /// В буферизованных режимах всегда `Ok`.
    ///
    /// После [`Logger::shutdown`] буферизованные режимы записи отбрасывают:
    /// монитор остановлен, и буфер больше никто не сбросит. В `PerRecord`
    /// запись по-прежнему уходит в файл, но дескриптор сразу закрывается.
    pub fn try_log<T: Serialize + ?Sized>(&self, level: LogLevel, payload: &T) -> Result<()> {
        let config = &self.core.config;
        if self.is_off() || level < config.min_level {
            return Ok(());
        }
        if config.flush_mode.is_buffered() && self.is_closed() {
            return Ok(());
        }

        let message = render_payload(self.serializer.as_ref(), payload);
        let line = format_log_line(&config.prefix, level, &message);

        if config.debug_echo {
            let _ = io::stderr().write_all(line.as_bytes());
        }

        match config.flush_mode {
            FlushMode::PerRecord => {
                self.core.writer.write(line.as_bytes())?;
                // без монитора простой дескриптор закрыть некому
                if self.is_closed() {
                    self.core.writer.close();
                }
                Ok(())
            }
            FlushMode::ByDuration => {
                self.core.buffer.append(line.as_bytes());
                Ok(())
            }
            FlushMode::BySize => {
                if self.core.buffer.append(line.as_bytes()) >= config.max_cache_size {
                    self.monitor.drain_and_wait();
                }
                Ok(())
            }
        }
    }

    /// Отключает логгер навсегда. Повторный вызов ничего не меняет.
    pub fn off(&self) {
        self.off.store(true, Ordering::SeqCst);
    }

    pub fn is_off(&self) -> bool {
        self.off.load(Ordering::SeqCst)
    }

    /// Синхронно переносит буфер в файл.
    pub fn flush(&self) -> Result<()> {
        self.core.flush().map(|_| ())
    }

    /// Просит монитор сбросить буфер вне расписания и сразу возвращается.
    pub fn force_sync(&self) {
        self.monitor.force();
    }

    /// Останавливает монитор и записывает остаток буфера. Идемпотентно.
    pub fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.monitor.stop();
        let result = self.core.flush().map(|_| ());
        self.core.writer.close();
        result
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Конфигурация, с которой логгер создан. Текущее состояние выключателя
    /// смотрите через [`Logger::is_off`]: [`Logger::off`] её не меняет.
    pub fn config(&self) -> &LoggerConfig {
        &self.core.config
    }

    pub fn buffered_len(&self) -> usize {
        self.core.buffer.len()
    }

    pub fn monitor_state(&self) -> MonitorState {
        self.core.state.get()
    }

    /// Путь файла, в который ушла бы запись прямо сейчас.
    pub fn current_path(&self) -> PathBuf {
        self.core.writer.current_path()
    }

    pub fn writer_stats(&self) -> WriterStats {
        self.core.writer.stats()
    }

    /// Ошибки фоновых сбросов. Канал ограничен, лишние ошибки отбрасываются.
    pub fn errors(&self) -> Receiver<Error> {
        self.errors.clone()
    }

    pub(crate) fn report(&self, err: Error) {
        self.core.report(err);
    }

    pub(crate) fn notice(&self, level: LogLevel, message: &str) {
        self.core.system.report(level, message);
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            self.core.report(e);
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("prefix", &self.core.config.prefix)
            .field("flush_mode", &self.core.config.flush_mode)
            .field("off", &self.is_off())
            .field("monitor", &self.monitor_state())
            .finish()
    }
}
