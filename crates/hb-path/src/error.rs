use std::io;
use std::path::PathBuf;

/// The single error type for the whole `hb` evaluation pipeline.
///
/// Every subsystem (path resolution, script discovery, rule/build
/// registration, Ninja emission) returns `Result<T, BuildError>`. There is
/// no local recovery anywhere in the pipeline: any error aborts the whole
/// evaluation and no partial manifest is written.
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("cannot find project root (.hbroot) above {}", start.display())]
    RootNotFound { start: PathBuf },

    #[error("rule {name:?} already defined")]
    NameAlreadyDefined { name: String },

    #[error("failed to read list file {}: {source}", path.display())]
    MissingListFile { path: PathBuf, source: io::Error },

    #[error("failed to load script {}: {source}", path.display())]
    MissingScript { path: PathBuf, source: io::Error },

    #[error("{operation} called on an empty path set")]
    EmptySetArgument { operation: &'static str },

    #[error("error running script {}: {cause}", path.display())]
    ScriptExecutionError { path: PathBuf, cause: String },

    #[error("{what} is not allowed after the manifest has been emitted")]
    EvaluationFrozen { what: &'static str },

    #[error("invalid filter pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, BuildError>;
