use refmatch_core::MatchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RisError {
    #[error("RIS parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Record(#[from] MatchError),
}

pub type Result<T> = std::result::Result<T, RisError>;
