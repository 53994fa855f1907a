use std::fmt;

#[derive(Debug, Clone)]
pub enum Error {
    InvalidData(String),
    InvalidConfig(String),
    InvalidShape(String),
    /// A dataset row violated the expected layout (1-based row number).
    DatasetFormat { row: usize, reason: String },
    /// A persisted model is missing, unreadable, or incompatible.
    ModelLoad(String),
    /// A feature vector does not have the length the model expects.
    DimensionMismatch { expected: usize, actual: usize },
    /// Training produced a non-finite error or parameter.
    NumericInstability(String),
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            Error::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Error::InvalidShape(msg) => write!(f, "invalid shape: {msg}"),
            Error::DatasetFormat { row, reason } => {
                write!(f, "dataset format error at row {row}: {reason}")
            }
            Error::ModelLoad(msg) => write!(f, "failed to load model: {msg}"),
            Error::DimensionMismatch { expected, actual } => write!(
                f,
                "dimension mismatch: expected a vector of length {expected}, got {actual}"
            ),
            Error::NumericInstability(msg) => write!(f, "numeric instability: {msg}"),
            Error::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
