// example_workers — пул потоков, общий Arc<Logger> и сброс по таймеру
// Записи всех потоков копятся в одном буфере; внутри одного потока порядок
// строк в файле совпадает с порядком вызовов.

use bufflog::{debug, error, FlushMode, LogLevel, Logger, LoggerConfig};
use serde_json::json;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct Job {
    id: u32,
    size: u64,
}

fn worker(name: String, jobs: Arc<std::sync::Mutex<mpsc::Receiver<Job>>>, log: Arc<Logger>) {
    debug!(log, "{} ready", name);
    loop {
        let job = match jobs.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => break,
        };
        let Ok(job) = job else { break };

        thread::sleep(Duration::from_millis(job.size));
        let level = if job.size > 40 { LogLevel::Warn } else { LogLevel::Info };
        log.any(level, &json!({"worker": name, "job": job.id, "ms": job.size}));

        if job.id == 13 {
            error!(log, "{} rejected unlucky job {}", name, job.id);
        }
    }
    debug!(log, "{} drained the queue", name);
}

fn main() {
    let config = LoggerConfig::new("workers", FlushMode::ByDuration)
        .with_log_dir("logs")
        .with_flush_interval(Duration::from_millis(100));
    let log = match Logger::new(config) {
        Ok(l) => Arc::new(l),
        Err(e) => {
            eprintln!("[FATAL] Cannot initialize logger: {}", e);
            std::process::exit(1);
        }
    };

    let (tx, rx) = mpsc::channel();
    let rx = Arc::new(std::sync::Mutex::new(rx));

    let pool: Vec<_> = (0..4)
        .map(|n| {
            let (rx, log) = (Arc::clone(&rx), Arc::clone(&log));
            thread::spawn(move || worker(format!("worker-{}", n), rx, log))
        })
        .collect();

    for id in 0..40 {
        let _ = tx.send(Job { id, size: 10 + (id as u64 * 7) % 50 });
    }
    drop(tx);

    for handle in pool {
        let _ = handle.join();
    }

    if let Err(e) = log.shutdown() {
        eprintln!("[ERROR] Final flush failed: {}", e);
    }
}
