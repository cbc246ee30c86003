//! example_flush_modes — сравнение трёх режимов сброса на одной нагрузке

use bufflog::{FlushMode, Logger, LoggerConfig};
use serde_json::json;
use std::thread;
use std::time::{Duration, Instant};

const RECORDS: u32 = 2_000;

fn run(mode: FlushMode) -> Result<(), bufflog::Error> {
    let config = LoggerConfig::new(&format!("modes-{}", mode), mode)
        .with_log_dir("logs")
        .with_flush_interval(Duration::from_millis(100))
        .with_max_cache_size(4 * 1024);
    let logger = Logger::new(config)?;

    let started = Instant::now();
    for i in 0..RECORDS {
        logger.info(&json!({
            "ip": "127.0.0.1",
            "userId": i,
            "event": {"gameId": "dddjs"},
        }));
    }
    let elapsed = started.elapsed();

    // Даём монитору поработать по расписанию
    thread::sleep(Duration::from_millis(150));
    let pending = logger.buffered_len();
    let opens = logger.writer_stats().opens;
    logger.shutdown()?;

    eprintln!(
        "{:<12} {} records in {:?}, pending after 150ms: {} bytes, file opened {} times",
        mode, RECORDS, elapsed, pending, opens
    );
    Ok(())
}

fn main() {
    for mode in [FlushMode::PerRecord, FlushMode::ByDuration, FlushMode::BySize] {
        if let Err(e) = run(mode) {
            eprintln!("[ERROR] {}: {}", mode, e);
            std::process::exit(1);
        }
    }
}
