// example_simple — простой пример: инициализация, записи в файл, завершение

use bufflog::{debug, error, warn, FlushMode, Logger, LoggerConfig};
use serde_json::json;

const APP_NAME: &str = "example_simple";
const APP_VERSION: &str = "1.0.0";

fn main() {
    // 1. Преамбула
    eprintln!("Starting {} v{}", APP_NAME, APP_VERSION);

    // 2. Инициализация: каталог создаётся здесь, ошибка фатальна
    let config = LoggerConfig::new("simple", FlushMode::PerRecord)
        .with_log_dir("logs")
        .with_debug_echo(true);
    let logger = match Logger::new(config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("[FATAL] Cannot initialize logger: {}", e);
            std::process::exit(1);
        }
    };

    // 3. Основной код — каждая запись в файле до возврата из вызова
    debug!(logger, "Application initialized successfully");
    logger.info(&json!({"block": 1, "status": "processing"}));
    warn!(logger, "Non-critical issue detected");
    error!(logger, "An error occurred, but we continue");
    logger.info(&json!({"block": 2, "status": "done"}));

    // 4. Финальная часть
    if let Err(e) = logger.shutdown() {
        eprintln!("[ERROR] Final flush failed: {}", e);
    }
    eprintln!("Log written to {}", logger.current_path().display());
}
