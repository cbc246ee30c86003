use std::fs::{DirBuilder, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};

use crate::error::{Error, Result};

// ===== Каталог логов =====

/// Создаёт каталог логов (rwx для всех, с учётом umask), если его ещё нет.
pub(crate) fn create_log_dir(dir: &Path) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o777);
    }
    builder.create(dir).map_err(|source| Error::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ===== Посуточный писатель =====

#[derive(Debug, Default)]
struct WriterState {
    file: Option<File>,
    day: Option<NaiveDate>,
    path: Option<PathBuf>,
    last_write: Option<Instant>,
}

impl WriterState {
    fn close(&mut self) -> bool {
        self.day = None;
        self.path = None;
        self.file.take().is_some()
    }
}

/// Снимок состояния писателя.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterStats {
    /// Сколько раз файл открывался за время жизни писателя.
    pub opens: u64,
    pub is_open: bool,
    pub path: Option<PathBuf>,
}

/// Владеет единственным дескриптором файла текущего дня.
///
/// Файл открывается лениво при первой записи, закрывается при смене дня,
/// по простою или явно. Все операции идут под собственным мьютексом писателя,
/// отдельным от блокировки буфера.
#[derive(Debug)]
pub struct FileWriter {
    dir: PathBuf,
    prefix: String,
    state: Mutex<WriterState>,
    opens: AtomicU64,
}

impl FileWriter {
    pub(crate) fn new<P: AsRef<Path>>(dir: P, prefix: &str) -> Self {
        FileWriter {
            dir: dir.as_ref().to_path_buf(),
            prefix: prefix.to_owned(),
            state: Mutex::new(WriterState::default()),
            opens: AtomicU64::new(0),
        }
    }

    /// `<dir>/<prefix>-<YYYY-MM-DD>.log`
    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}-{}.log", self.prefix, day.format("%Y-%m-%d")))
    }

    pub fn current_path(&self) -> PathBuf {
        self.path_for(today())
    }

    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        self.write_locked(&mut state, today(), bytes)
    }

    /// Запись с немедленным закрытием дескриптора (буферизованные режимы).
    pub fn write_and_close(&self, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        let result = self.write_locked(&mut state, today(), bytes);
        state.close();
        result
    }

    #[cfg(test)]
    pub(crate) fn write_on(&self, day: NaiveDate, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        self.write_locked(&mut state, day, bytes)
    }

    fn write_locked(&self, state: &mut WriterState, day: NaiveDate, bytes: &[u8]) -> Result<()> {
        if state.day != Some(day) {
            state.close();
        }

        if state.file.is_none() {
            let path = self.path_for(day);
            let file = Self::open(&path)?;
            self.opens.fetch_add(1, Ordering::Relaxed);
            state.file = Some(file);
            state.day = Some(day);
            state.path = Some(path);
        }

        let written = match state.file {
            Some(ref mut file) => file.write_all(bytes).and_then(|_| file.flush()),
            None => Ok(()),
        };

        match written {
            Ok(()) => {
                state.last_write = Some(Instant::now());
                Ok(())
            }
            Err(source) => {
                let path = state.path.clone().unwrap_or_else(|| self.path_for(day));
                // битый дескриптор не переиспользуем
                state.close();
                Err(Error::Write { path, source })
            }
        }
    }

    fn open(path: &Path) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(|source| Error::Open {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Закрывает дескриптор, если он открыт. Следующая запись откроет файл заново.
    pub fn close(&self) -> bool {
        self.lock().close()
    }

    /// Закрывает дескриптор, если с последней записи прошло больше `idle`.
    pub fn close_if_idle(&self, idle: Duration) -> bool {
        let mut state = self.lock();
        if state.file.is_none() {
            return false;
        }
        let expired = state
            .last_write
            .map_or(true, |at| at.elapsed() >= idle);
        if expired {
            state.close()
        } else {
            false
        }
    }

    pub fn stats(&self) -> WriterStats {
        let state = self.lock();
        WriterStats {
            opens: self.opens.load(Ordering::Relaxed),
            is_open: state.file.is_some(),
            path: state.path.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn file_name_follows_prefix_and_date() {
        let writer = FileWriter::new("/var/log/app", "T");
        assert_eq!(
            writer.path_for(day(2024, 3, 7)),
            PathBuf::from("/var/log/app/T-2024-03-07.log")
        );
    }

    #[test]
    fn opens_lazily_and_reuses_handle() {
        let tmp = TempDir::new().unwrap();
        let writer = FileWriter::new(tmp.path(), "T");
        assert_eq!(writer.stats().opens, 0);
        assert!(!writer.current_path().exists());

        writer.write(b"one\n").unwrap();
        writer.write(b"two\n").unwrap();

        let stats = writer.stats();
        assert_eq!(stats.opens, 1);
        assert!(stats.is_open);
        assert_eq!(fs::read_to_string(writer.current_path()).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn appends_to_existing_file() {
        let tmp = TempDir::new().unwrap();
        let writer = FileWriter::new(tmp.path(), "T");
        fs::write(writer.current_path(), "old\n").unwrap();

        writer.write_and_close(b"new\n").unwrap();
        assert!(!writer.stats().is_open);
        assert_eq!(fs::read_to_string(writer.current_path()).unwrap(), "old\nnew\n");
    }

    #[test]
    fn new_day_switches_file() {
        let tmp = TempDir::new().unwrap();
        let writer = FileWriter::new(tmp.path(), "T");

        writer.write_on(day(2024, 1, 1), b"a\n").unwrap();
        writer.write_on(day(2024, 1, 1), b"b\n").unwrap();
        writer.write_on(day(2024, 1, 2), b"c\n").unwrap();

        assert_eq!(writer.stats().opens, 2);
        assert_eq!(
            fs::read_to_string(writer.path_for(day(2024, 1, 1))).unwrap(),
            "a\nb\n"
        );
        assert_eq!(
            fs::read_to_string(writer.path_for(day(2024, 1, 2))).unwrap(),
            "c\n"
        );
    }

    #[test]
    fn idle_handle_is_closed_and_reopened() {
        let tmp = TempDir::new().unwrap();
        let writer = FileWriter::new(tmp.path(), "T");

        writer.write(b"a\n").unwrap();
        assert!(!writer.close_if_idle(Duration::from_secs(60)));
        assert!(writer.stats().is_open);

        thread::sleep(Duration::from_millis(30));
        assert!(writer.close_if_idle(Duration::from_millis(10)));
        assert!(!writer.stats().is_open);
        assert!(!writer.close_if_idle(Duration::from_millis(10)));

        writer.write(b"b\n").unwrap();
        assert_eq!(writer.stats().opens, 2);
    }

    #[test]
    fn open_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        let writer = FileWriter::new(tmp.path().join("missing"), "T");
        let err = writer.write(b"x\n").unwrap_err();
        assert!(err.is_open_failure());
        assert_eq!(writer.stats().opens, 0);
    }

    #[test]
    fn creates_nested_log_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a").join("b");
        create_log_dir(&dir).unwrap();
        assert!(dir.is_dir());
        // повторный вызов не ошибка
        create_log_dir(&dir).unwrap();
    }
}
