//! example_signals — глобальный логгер и сброс по сигналам
//!
//! kill -USR1 <pid>  — записать буфер и продолжить
//! kill -TERM <pid>  — записать буфер и завершиться

use bufflog::{ginfo, gwarn, FlushMode, LoggerConfig};
use std::thread;
use std::time::Duration;

fn main() {
    // Буфер сбрасывается только по размеру, так что без сигнала данные
    // долго живут в памяти
    let config = LoggerConfig::new("signals", FlushMode::BySize)
        .with_log_dir("logs")
        .with_max_cache_size(1 << 20)
        .with_retain_limit(1 << 20);
    if let Err(e) = bufflog::init_global_logger(config) {
        eprintln!("[FATAL] Cannot initialize logger: {}", e);
        std::process::exit(1);
    }

    #[cfg(unix)]
    let _guard = match bufflog::install_global_shutdown_handler() {
        Ok(g) => g,
        Err(e) => {
            eprintln!("[FATAL] {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("pid {}: send SIGUSR1 to flush, SIGTERM to stop", std::process::id());

    for i in 0.. {
        ginfo!("heartbeat {}", i);
        if i % 10 == 9 {
            gwarn!("{} heartbeats buffered since start", i + 1);
        }
        thread::sleep(Duration::from_millis(500));
    }
}
