use crate::level::LogLevel;

// ===== Системный журнал для собственных сообщений логгера =====
//
// Ошибки сброса, отброшенные блоки и сигналы логгер не может записать в свой
// же файл, поэтому они уходят в syslog (Linux) или в stderr.

#[cfg(target_os = "linux")]
type SystemLogger = syslog::Logger<syslog::LoggerBackend, syslog::Formatter3164>;

pub(crate) struct SystemLog {
    tag: String,
    #[cfg(target_os = "linux")]
    logger: std::sync::Mutex<Option<SystemLogger>>,
}

impl SystemLog {
    pub(crate) fn new(tag: &str) -> Self {
        SystemLog {
            tag: tag.to_owned(),
            #[cfg(target_os = "linux")]
            logger: std::sync::Mutex::new(Self::connect(tag)),
        }
    }

    #[cfg(target_os = "linux")]
    fn connect(tag: &str) -> Option<SystemLogger> {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_USER,
            hostname: None,
            process: format!("bufflog[{}]", tag),
            pid: std::process::id(),
        };
        syslog::unix(formatter).ok()
    }

    pub(crate) fn report(&self, level: LogLevel, message: &str) {
        if !self.report_impl(level, message) {
            eprintln!("[bufflog:{}] {}: {}", self.tag, level, message);
        }
    }

    #[cfg(target_os = "linux")]
    fn report_impl(&self, level: LogLevel, message: &str) -> bool {
        use std::sync::PoisonError;

        let mut guard = self.logger.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(logger) = guard.as_mut() else {
            return false;
        };
        let sent = match level {
            LogLevel::Trace | LogLevel::Debug | LogLevel::Info => logger.info(message),
            LogLevel::Warn => logger.warning(message),
            LogLevel::Error | LogLevel::Fatal => logger.err(message),
        };
        sent.is_ok()
    }

    #[cfg(not(target_os = "linux"))]
    fn report_impl(&self, _level: LogLevel, _message: &str) -> bool {
        false
    }
}

impl std::fmt::Debug for SystemLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemLog").field("tag", &self.tag).finish()
    }
}
