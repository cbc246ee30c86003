//! Глобальный логгер живёт в отдельном процессе теста: OnceCell нельзя сбросить.

use std::fs;
use std::time::Duration;

use bufflog::{
    flush_global_logger, gdebug, gerror, ginfo, global_logger, gwarn, init_global_logger,
    info, Error, FlushMode, Logger, LoggerConfig,
};
use tempfile::TempDir;

#[test]
fn global_logger_lifecycle() {
    assert!(global_logger().is_none());
    // без логгера макросы и сброс ничего не делают
    ginfo!("dropped {}", 0);
    flush_global_logger().unwrap();
    #[cfg(unix)]
    assert!(matches!(
        bufflog::install_global_shutdown_handler(),
        Err(Error::Config(_))
    ));

    let tmp = TempDir::new().unwrap();
    let config = LoggerConfig::new("G", FlushMode::ByDuration)
        .with_log_dir(tmp.path())
        .with_flush_interval(Duration::from_secs(3600));
    init_global_logger(config.clone()).unwrap();
    assert!(matches!(
        init_global_logger(config),
        Err(Error::AlreadyInitialized)
    ));

    gdebug!("user {} logged in", 7);
    gwarn!("disk at {}%", 91);
    gerror!("failed: {}", "timeout");

    let logger = global_logger().unwrap();
    assert!(logger.buffered_len() > 0);
    flush_global_logger().unwrap();

    assert_eq!(
        fs::read_to_string(logger.current_path()).unwrap(),
        concat!(
            "[G] | LEVEL:debug | message:\"user 7 logged in\"\n",
            "[G] | LEVEL:warn | message:\"disk at 91%\"\n",
            "[G] | LEVEL:error | message:\"failed: timeout\"\n",
        )
    );
}

#[test]
fn per_logger_macros_format_messages() {
    let tmp = TempDir::new().unwrap();
    let config = LoggerConfig::new("M", FlushMode::PerRecord).with_log_dir(tmp.path());
    let logger = Logger::new(config).unwrap();

    info!(logger, "worker {} started", 3);
    bufflog::fatal!(logger, "quote \" inside");

    assert_eq!(
        fs::read_to_string(logger.current_path()).unwrap(),
        concat!(
            "[M] | LEVEL:info | message:\"worker 3 started\"\n",
            "[M] | LEVEL:fatal | message:\"quote \\\" inside\"\n",
        )
    );
}
