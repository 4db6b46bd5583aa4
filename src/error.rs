#[cfg(feature = "live")]
use std::sync::mpsc::RecvError;

use camino::Utf8PathBuf;
use thiserror::Error;

pub use crate::task::images::ImageError;
pub use crate::task::scripts::ScriptError;
pub use crate::task::styles::StyleError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Error while building the storefront.\n{0}")]
    Build(#[from] BuildError),

    #[cfg(feature = "live")]
    #[error("Error while watching for file changes:\n{0}")]
    Watch(#[from] WatchError),

    #[cfg(feature = "server")]
    #[error("Error while serving the output directory:\n{0}")]
    Serve(#[from] ServeError),

    #[error("Service '{0}' is not available, rebuild with the `{1}` feature")]
    Unsupported(&'static str, &'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Couldn't read config file '{0}'.\n{1}")]
    Read(Utf8PathBuf, std::io::Error),

    #[error("Couldn't parse config file '{0}'.\n{1}")]
    Parse(Utf8PathBuf, toml::de::Error),

    #[error("Couldn't resolve the working directory.\n{0}")]
    WorkingDir(std::io::Error),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised while resolving the files matched by a source glob.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Couldn't compile glob pattern.\n{0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Couldn't run glob.\n{0}")]
    Glob(#[from] glob::GlobError),

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),

    #[error("File '{0}' is outside of the glob base '{1}'")]
    OutsideBase(Utf8PathBuf, Utf8PathBuf),
}

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("Couldn't list '{0}'.\n{1}")]
    Read(Utf8PathBuf, std::io::Error),

    #[error("Couldn't remove '{0}'.\n{1}")]
    Remove(Utf8PathBuf, std::io::Error),

    #[error("Couldn't create '{0}'.\n{1}")]
    Create(Utf8PathBuf, std::io::Error),
}

#[derive(Debug, Error)]
pub enum CopyError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Cycle detected in the task graph at '{0}'")]
    Cycle(&'static str),

    #[error("Task '{0}':\n{1}")]
    Task(&'static str, anyhow::Error),

    #[error("Task '{0}' panicked: {1}")]
    Panic(&'static str, String),

    #[error("Scheduler lost track of {0} pending task(s)")]
    Stalled(usize),
}

#[cfg(feature = "live")]
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Recv(#[from] RecvError),
}

#[cfg(feature = "server")]
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Failed to bind to {0}.\n{1}")]
    Bind(std::net::SocketAddr, std::io::Error),

    #[error("Failed to build runtime.\n{0}")]
    Runtime(std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Thread '{0}' panicked")]
    Panicked(&'static str),
}
