use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TrySendError};

use crate::buffer::RecordBuffer;
use crate::config::{FlushMode, LoggerConfig};
use crate::error::{Error, Result};
use crate::level::LogLevel;
use crate::system::SystemLog;
use crate::writer::FileWriter;

const DRAIN_QUEUE_CAPACITY: usize = 16;

// ===== Состояние монитора =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Ждёт таймера, порога размера или принудительного сброса.
    Idle,
    /// Выполняет drain + запись.
    Draining,
    /// Канал остановки закрыт, монитор больше ничего не сбрасывает.
    Stopped,
}

#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        StateCell(AtomicU8::new(MonitorState::Idle as u8))
    }

    fn set(&self, state: MonitorState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    pub(crate) fn get(&self) -> MonitorState {
        match self.0.load(Ordering::SeqCst) {
            0 => MonitorState::Idle,
            1 => MonitorState::Draining,
            _ => MonitorState::Stopped,
        }
    }

    /// Idle → Draining. Из Stopped не выводит.
    fn draining(&self) -> DrainingGuard<'_> {
        let _ = self.0.compare_exchange(
            MonitorState::Idle as u8,
            MonitorState::Draining as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        DrainingGuard(self)
    }
}

struct DrainingGuard<'a>(&'a StateCell);

impl Drop for DrainingGuard<'_> {
    fn drop(&mut self) {
        let _ = (self.0).0.compare_exchange(
            MonitorState::Draining as u8,
            MonitorState::Idle as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

// ===== Общее ядро логгера =====

/// Всё, что делят фасад логгера, монитор и обработчик сигналов.
#[derive(Debug)]
pub(crate) struct Core {
    pub(crate) config: LoggerConfig,
    pub(crate) buffer: RecordBuffer,
    pub(crate) writer: FileWriter,
    pub(crate) system: SystemLog,
    pub(crate) state: StateCell,
    flush_lock: Mutex<()>,
    errors: Sender<Error>,
}

impl Core {
    pub(crate) fn new(config: LoggerConfig, errors: Sender<Error>) -> Self {
        let buffer = if config.flush_mode == FlushMode::BySize {
            RecordBuffer::with_capacity(config.max_cache_size)
        } else {
            RecordBuffer::new()
        };
        Core {
            writer: FileWriter::new(&config.log_dir, &config.prefix),
            system: SystemLog::new(&config.prefix),
            buffer,
            config,
            state: StateCell::new(),
            flush_lock: Mutex::new(()),
            errors,
        }
    }

    /// Сбрасывает буфер в файл. Единственный путь, которым байты покидают
    /// буфер; вызовы из монитора и из обработчика сигналов идут по очереди.
    ///
    /// Возвращает число записанных байтов, на пустом буфере файл не трогается.
    /// На время сброса монитор показывает `Draining`, кто бы сброс ни вызвал.
    pub(crate) fn flush(&self) -> Result<usize> {
        let _guard = self.flush_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _draining = self.state.draining();

        let block = self.buffer.drain();
        if block.is_empty() {
            return Ok(0);
        }

        let len = block.len();
        match self.writer.write_and_close(&block) {
            Ok(()) => Ok(len),
            Err(e) => {
                // при ошибке открытия ничего не записано: следующий сброс повторит блок
                if e.is_open_failure() && self.buffer.restore(block, self.config.retain_limit) {
                    return Err(e);
                }
                self.system.report(
                    LogLevel::Error,
                    &format!("discarded {} buffered bytes after failed flush", len),
                );
                Err(e)
            }
        }
    }

    /// Ошибка уходит в системный журнал и в канал ошибок логгера.
    /// Если канал полон, новая ошибка в него не попадает.
    pub(crate) fn report(&self, err: Error) {
        self.system.report(LogLevel::Error, &err.to_string());
        if let Err(TrySendError::Full(_)) = self.errors.try_send(err) {
            self.system
                .report(LogLevel::Warn, "error channel is full, dropping error");
        }
    }
}

// ===== Фоновый монитор =====

struct Monitor {
    core: Arc<Core>,
    force: Receiver<()>,
    drain: Receiver<Sender<()>>,
    halt: Receiver<()>,
    // закрывается вместе с потоком и отпускает ждущих производителей
    _done: Sender<()>,
}

impl Monitor {
    fn run(self) {
        let config = &self.core.config;
        let mode = config.flush_mode;
        let ticker = match mode {
            FlushMode::ByDuration => tick(config.flush_interval),
            FlushMode::BySize => tick(config.size_poll_interval),
            FlushMode::PerRecord => tick(config.idle_check_interval),
        };

        loop {
            select! {
                recv(ticker) -> _ => self.on_tick(mode),
                recv(self.drain) -> msg => match msg {
                    Ok(reply) => {
                        self.on_size_check();
                        let _ = reply.try_send(());
                    }
                    Err(_) => break,
                },
                recv(self.force) -> msg => match msg {
                    Ok(()) => self.drain_and_write(),
                    Err(_) => break,
                },
                recv(self.halt) -> _ => break,
            }
        }

        self.core.state.set(MonitorState::Stopped);
    }

    fn on_tick(&self, mode: FlushMode) {
        match mode {
            FlushMode::ByDuration => self.drain_and_write(),
            FlushMode::BySize => self.on_size_check(),
            FlushMode::PerRecord => {
                self.core.writer.close_if_idle(self.core.config.idle_timeout);
            }
        }
    }

    fn on_size_check(&self) {
        if self.core.buffer.len() >= self.core.config.max_cache_size {
            self.drain_and_write();
        }
    }

    fn drain_and_write(&self) {
        if let Err(e) = self.core.flush() {
            self.core.report(e);
        }
    }
}

/// Управление потоком монитора со стороны логгера.
#[derive(Debug)]
pub(crate) struct MonitorHandle {
    force: Sender<()>,
    drain: Sender<Sender<()>>,
    done: Receiver<()>,
    halt: Mutex<Option<Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorHandle {
    pub(crate) fn spawn(core: Arc<Core>) -> Result<Self> {
        // ёмкость 1: повторные запросы, пока предыдущий не обработан, сливаются
        let (force_tx, force_rx) = bounded(1);
        let (drain_tx, drain_rx) = bounded(DRAIN_QUEUE_CAPACITY);
        let (halt_tx, halt_rx) = bounded(0);
        let (done_tx, done_rx) = bounded(0);

        let name = format!("bufflog-monitor-{}", core.config.prefix);
        let monitor = Monitor {
            core,
            force: force_rx,
            drain: drain_rx,
            halt: halt_rx,
            _done: done_tx,
        };
        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || monitor.run())
            .map_err(Error::Spawn)?;

        Ok(MonitorHandle {
            force: force_tx,
            drain: drain_tx,
            done: done_rx,
            halt: Mutex::new(Some(halt_tx)),
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Внеплановый сброс, не сбивая ритм таймера.
    pub(crate) fn force(&self) {
        let _ = self.force.try_send(());
    }

    /// Буфер дорос до порога: монитор сбрасывает его, а вызывающий ждёт
    /// окончания сброса и только потом дописывает следующую запись.
    /// Сам вызывающий файл не трогает. Остановленный монитор отпускает сразу.
    pub(crate) fn drain_and_wait(&self) {
        let (reply_tx, reply_rx) = bounded(1);
        if self.drain.send(reply_tx).is_err() {
            return;
        }
        select! {
            recv(reply_rx) -> _ => {}
            recv(self.done) -> _ => {}
        }
    }

    /// Закрывает канал остановки и дожидается завершения потока.
    pub(crate) fn stop(&self) {
        drop(self.halt.lock().unwrap_or_else(PoisonError::into_inner).take());
        let thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(thread) = thread {
            let _ = thread.join();
        }
    }
}
