use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid logger configuration: {0}")]
    Config(String),

    #[error("failed to create log directory {path:?}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to open log file {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to write log file {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("global logger is already initialized")]
    AlreadyInitialized,

    #[error("failed to register signal handlers: {0}")]
    Signal(io::Error),

    #[error("failed to spawn background thread: {0}")]
    Spawn(io::Error),
}

impl Error {
    /// Ошибка открытия: ни один байт не записан, блок можно вернуть в буфер.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Error::Open { .. })
    }
}
