use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rate must be at least 1, got {0}")]
    InvalidRate(usize),

    #[error("rate must be at most {max}, got {rate}")]
    RateTooHigh { rate: usize, max: usize },

    #[error("invalid max duration '{input}': {reason}")]
    InvalidMax { input: String, reason: String },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read command file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to create command file {path}: {source}")]
    Create { path: PathBuf, source: io::Error },

    #[error("failed to launch editor '{editor}': {source}")]
    EditorSpawn { editor: String, source: io::Error },

    #[error("editor '{editor}' exited with {status}")]
    EditorFailed { editor: String, status: std::process::ExitStatus },

    #[error("command source {0} is empty")]
    Empty(String),
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to write probe script: {0}")]
    Write(#[source] io::Error),

    #[error("failed to set permissions on probe script {path}: {source}")]
    Permissions { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Display(#[from] DisplayError),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
