// example_tokio — логгер внутри tokio-рантайма
// В режиме BySize вызов только дописывает строку в буфер, поэтому его
// безопасно звать из async-задач. Сброс делает поток монитора, а
// периодический force_sync показывает внеплановый сброс без блокировки.

use bufflog::{warn, FlushMode, Logger, LoggerConfig};
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{interval, sleep, Duration};

const REQUESTS_PER_CLIENT: u32 = 20;

async fn serve_client(client: u32, log: Arc<Logger>) -> u32 {
    let mut failed = 0;
    for request in 0..REQUESTS_PER_CLIENT {
        sleep(Duration::from_millis(5 + client as u64)).await;
        let status = if (client + request) % 13 == 0 { 500 } else { 200 };
        log.info(&json!({
            "client": client,
            "request": request,
            "status": status,
        }));
        if status != 200 {
            failed += 1;
            warn!(log, "client {} request {} failed", client, request);
        }
    }
    failed
}

#[tokio::main]
async fn main() {
    let config = LoggerConfig::new("tokio", FlushMode::BySize)
        .with_log_dir("logs")
        .with_max_cache_size(2 * 1024);
    let log = match Logger::new(config) {
        Ok(l) => Arc::new(l),
        Err(e) => {
            eprintln!("[FATAL] Cannot initialize logger: {}", e);
            std::process::exit(1);
        }
    };

    // Раз в 250 мс просим монитор сбросить хвост, даже если порог не достигнут
    let ticker_log = Arc::clone(&log);
    let ticker = tokio::spawn(async move {
        let mut every = interval(Duration::from_millis(250));
        loop {
            every.tick().await;
            ticker_log.force_sync();
        }
    });

    let mut clients = JoinSet::new();
    for client in 0..6 {
        clients.spawn(serve_client(client, Arc::clone(&log)));
    }

    let mut failed = 0;
    while let Some(result) = clients.join_next().await {
        failed += result.unwrap_or(0);
    }
    ticker.abort();

    log.info(&json!({"summary": {"clients": 6, "failed": failed}}));

    // shutdown ждёт поток монитора, поэтому уводим его с рабочих потоков рантайма
    let closing = Arc::clone(&log);
    match tokio::task::spawn_blocking(move || closing.shutdown()).await {
        Ok(Ok(())) => eprintln!("Log written to {}", log.current_path().display()),
        Ok(Err(e)) => eprintln!("[ERROR] Final flush failed: {}", e),
        Err(e) => eprintln!("[ERROR] Shutdown task failed: {}", e),
    }
}
