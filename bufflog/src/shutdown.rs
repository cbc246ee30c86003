use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::level::LogLevel;
use crate::logger::Logger;

// ===== Сброс по сигналам =====

/// Что сделать с зарегистрированными логгерами.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Синхронный сброс, затем завершение процесса.
    FlushAndTerminate,
    /// Внеплановый сброс через монитор, процесс продолжает работу.
    FlushOnly,
}

#[cfg(unix)]
const HANDLED_SIGNALS: [std::os::raw::c_int; 6] = {
    use signal_hook::consts::signal::*;
    [SIGTERM, SIGINT, SIGQUIT, SIGHUP, SIGUSR1, SIGUSR2]
};

impl ShutdownSignal {
    #[cfg(unix)]
    pub fn classify(signal: std::os::raw::c_int) -> Option<ShutdownSignal> {
        use signal_hook::consts::signal::*;
        match signal {
            SIGTERM | SIGINT | SIGQUIT | SIGHUP => Some(ShutdownSignal::FlushAndTerminate),
            SIGUSR1 | SIGUSR2 => Some(ShutdownSignal::FlushOnly),
            _ => None,
        }
    }
}

/// Держит слабые ссылки на логгеры и сбрасывает их по сигналу.
///
/// Сам координатор от платформы не зависит: [`ShutdownCoordinator::dispatch`]
/// можно вызвать откуда угодно, а слушатель сигналов из
/// [`ShutdownCoordinator::install`] лишь один из источников.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    targets: Arc<Mutex<Vec<Weak<Logger>>>>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, logger: &Arc<Logger>) {
        let mut targets = self.targets.lock().unwrap_or_else(PoisonError::into_inner);
        targets.retain(|t| t.strong_count() > 0);
        targets.push(Arc::downgrade(logger));
    }

    /// Возвращает число обработанных живых логгеров.
    pub fn dispatch(&self, signal: ShutdownSignal) -> usize {
        let loggers: Vec<Arc<Logger>> = {
            let mut targets = self.targets.lock().unwrap_or_else(PoisonError::into_inner);
            targets.retain(|t| t.strong_count() > 0);
            targets.iter().filter_map(Weak::upgrade).collect()
        };

        for logger in &loggers {
            match signal {
                ShutdownSignal::FlushAndTerminate => {
                    logger.notice(LogLevel::Info, "termination requested, flushing buffer");
                    if let Err(e) = logger.flush() {
                        logger.report(e);
                    }
                }
                ShutdownSignal::FlushOnly => logger.force_sync(),
            }
        }

        loggers.len()
    }

    /// Запускает поток, слушающий сигналы. После сброса по сигналу завершения
    /// процесс выходит так, как вышел бы по этому сигналу без обработчика.
    #[cfg(unix)]
    pub fn install(self) -> crate::Result<ShutdownGuard> {
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new(HANDLED_SIGNALS).map_err(crate::Error::Signal)?;
        let handle = signals.handle();

        let thread = std::thread::Builder::new()
            .name("bufflog-signals".into())
            .spawn(move || {
                for raw in signals.forever() {
                    let Some(signal) = ShutdownSignal::classify(raw) else {
                        continue;
                    };
                    self.dispatch(signal);
                    if signal == ShutdownSignal::FlushAndTerminate {
                        let _ = signal_hook::low_level::emulate_default_handler(raw);
                        std::process::exit(128 + raw);
                    }
                }
            })
            .map_err(crate::Error::Spawn)?;

        Ok(ShutdownGuard {
            handle,
            thread: Some(thread),
        })
    }
}

/// Останавливает слушатель сигналов при `close` или `Drop`.
#[cfg(unix)]
pub struct ShutdownGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<std::thread::JoinHandle<()>>,
}

#[cfg(unix)]
impl ShutdownGuard {
    pub fn close(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(unix)]
impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FlushMode, LoggerConfig};
    use std::fs;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn buffered_logger(dir: &TempDir) -> Arc<Logger> {
        let config = LoggerConfig::new("SIG", FlushMode::ByDuration)
            .with_log_dir(dir.path())
            .with_flush_interval(Duration::from_secs(3600));
        Arc::new(Logger::new(config).unwrap())
    }

    #[cfg(unix)]
    #[test]
    fn classifies_signals() {
        use signal_hook::consts::signal::*;
        assert_eq!(ShutdownSignal::classify(SIGTERM), Some(ShutdownSignal::FlushAndTerminate));
        assert_eq!(ShutdownSignal::classify(SIGINT), Some(ShutdownSignal::FlushAndTerminate));
        assert_eq!(ShutdownSignal::classify(SIGUSR1), Some(ShutdownSignal::FlushOnly));
        assert_eq!(ShutdownSignal::classify(SIGCHLD), None);
    }

    #[test]
    fn terminate_flushes_synchronously() {
        let tmp = TempDir::new().unwrap();
        let logger = buffered_logger(&tmp);
        let coordinator = ShutdownCoordinator::new();
        coordinator.register(&logger);

        logger.info("bye");
        assert_eq!(coordinator.dispatch(ShutdownSignal::FlushAndTerminate), 1);

        assert_eq!(logger.buffered_len(), 0);
        assert_eq!(
            fs::read_to_string(logger.current_path()).unwrap(),
            "[SIG] | LEVEL:info | message:\"bye\"\n"
        );
    }

    #[test]
    fn flush_only_goes_through_monitor() {
        let tmp = TempDir::new().unwrap();
        let logger = buffered_logger(&tmp);
        let coordinator = ShutdownCoordinator::new();
        coordinator.register(&logger);

        logger.warn("later");
        coordinator.dispatch(ShutdownSignal::FlushOnly);

        let read = || fs::read_to_string(logger.current_path()).unwrap_or_default();
        let deadline = Instant::now() + Duration::from_secs(2);
        while !read().contains("later") && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(read().contains("later"));
        assert_eq!(logger.buffered_len(), 0);
    }

    #[test]
    fn dropped_loggers_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let coordinator = ShutdownCoordinator::new();
        let kept = buffered_logger(&tmp);
        coordinator.register(&kept);
        {
            let gone = buffered_logger(&tmp);
            coordinator.register(&gone);
        }
        assert_eq!(coordinator.dispatch(ShutdownSignal::FlushOnly), 1);
    }
}
