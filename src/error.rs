use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Every way a submission can fail before (or while) reaching the scheduler
///
/// Nothing here is recovered from: each variant ends the process with a message naming what went
/// wrong. Variants are grouped the same way the user sees them: usage, validation, filesystem and
/// scheduler errors.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("{0}")]
    Usage(String),

    #[error("unknown queue '{name}', pick one of the listed queues")]
    UnknownPartition { name: String },

    #[error("node count '{value}' is not a non-negative integer")]
    NodeCountFormat { value: String },

    #[error("node count {nodes} is outside the queue limits [{min}, {max}]")]
    NodeCountRange { nodes: String, min: u32, max: String },

    #[error("wall-clock time '{value}' does not match [D-]HH:MM:SS")]
    WallTimeFormat { value: String },

    #[error("wall-clock time {value} is outside the queue limits [{min}, {max}]")]
    WallTimeRange { value: String, min: String, max: String },

    #[error("input file {} does not exist", path.display())]
    MissingInput { path: PathBuf },

    #[error("restart file {} referenced by the input does not exist", path.display())]
    MissingRestart { path: PathBuf },

    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to run {command}: {message}")]
    SchedulerQuery { command: String, message: String },

    #[error("can't parse scheduler output: {line}")]
    SchedulerOutput { line: String },

    #[error("{message}")]
    Submission { message: String },

    #[error("can't render job script: {0}")]
    Template(#[from] tinytemplate::error::Error),

    #[error("can't read answer: {0}")]
    Prompt(#[from] io::Error),
}

impl RunError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> RunError {
        RunError::Io { path: path.into(), source }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, RunError::Usage(_))
    }
}
