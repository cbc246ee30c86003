// example_error_init — пример с ошибкой инициализации

use bufflog::{Error, FlushMode, Logger, LoggerConfig};

const APP_NAME: &str = "example_error_init";
const APP_VERSION: &str = "1.0.0";

fn main() {
    // 1. Преамбула
    eprintln!("Starting {} v{}", APP_NAME, APP_VERSION);

    // 2. Инициализация — неверная конфигурация
    let config = LoggerConfig::new("bad/prefix", FlushMode::BySize);
    if let Err(e) = Logger::new(config) {
        eprintln!("[ERROR] {}", e);
    }

    // Недоступный каталог: логгер не стартует
    let log_dir = "/root/forbidden/logs";
    let config = LoggerConfig::new("error_init", FlushMode::BySize).with_log_dir(log_dir);
    let logger = match Logger::new(config) {
        Ok(l) => l,
        Err(Error::CreateDir { path, source }) => {
            eprintln!("[FATAL] Cannot create {}: {}", path.display(), source);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("[FATAL] {}", e);
            std::process::exit(1);
        }
    };

    // 3. Основной код (достигается только при наличии прав)
    logger.info("This is logged only when the directory is writable");

    // 4. Финальная часть
    let _ = logger.shutdown();
    eprintln!("Application finished successfully");
}
