//! Engine error types.

use std::fmt;

/// Error type for engine operations.
///
/// Index arguments in the engine are 1-based; a failed check reports the
/// offending number exactly as it was passed in.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Row number outside `1..=count`.
    RowOutOfRange { row: usize, count: usize },
    /// Column number outside `1..=count`.
    ColOutOfRange { col: usize, count: usize },
    /// Same row or column listed twice in one call.
    DuplicateIndex { index: usize },
    /// Lower bound above upper bound.
    InvalidBounds { lower: f64, upper: f64 },
    /// Row or column count argument was zero.
    ZeroCount,
    /// Subproblem number not present in the search tree.
    UnknownNode(usize),
    /// File could not be opened, read or written.
    Io(String),
    /// File was read but its contents are malformed.
    Parse { line: usize, message: String },
    /// Format is recognised but this engine does not handle it.
    Unsupported(&'static str),
    /// Operation needs an optimal basic solution and there is none.
    NotOptimal,
}

impl EngineError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::RowOutOfRange { .. } => "ENGINE_ROW_RANGE",
            EngineError::ColOutOfRange { .. } => "ENGINE_COL_RANGE",
            EngineError::DuplicateIndex { .. } => "ENGINE_DUPLICATE_INDEX",
            EngineError::InvalidBounds { .. } => "ENGINE_INVALID_BOUNDS",
            EngineError::ZeroCount => "ENGINE_ZERO_COUNT",
            EngineError::UnknownNode(_) => "ENGINE_UNKNOWN_NODE",
            EngineError::Io(_) => "ENGINE_IO",
            EngineError::Parse { .. } => "ENGINE_PARSE",
            EngineError::Unsupported(_) => "ENGINE_UNSUPPORTED",
            EngineError::NotOptimal => "ENGINE_NOT_OPTIMAL",
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::RowOutOfRange { row, count } => write!(
                f,
                "[{}] row number {} out of range (num_rows = {})",
                self.code(),
                row,
                count
            ),
            EngineError::ColOutOfRange { col, count } => write!(
                f,
                "[{}] column number {} out of range (num_cols = {})",
                self.code(),
                col,
                count
            ),
            EngineError::DuplicateIndex { index } => {
                write!(f, "[{}] index {} listed more than once", self.code(), index)
            }
            EngineError::InvalidBounds { lower, upper } => write!(
                f,
                "[{}] lower bound {} exceeds upper bound {}",
                self.code(),
                lower,
                upper
            ),
            EngineError::ZeroCount => write!(f, "[{}] count must be positive", self.code()),
            EngineError::UnknownNode(p) => {
                write!(f, "[{}] subproblem {} does not exist", self.code(), p)
            }
            EngineError::Io(msg) => write!(f, "[{}] {}", self.code(), msg),
            EngineError::Parse { line, message } => {
                write!(f, "[{}] line {}: {}", self.code(), line, message)
            }
            EngineError::Unsupported(what) => {
                write!(f, "[{}] {} is not supported", self.code(), what)
            }
            EngineError::NotOptimal => {
                write!(f, "[{}] basic solution is not optimal", self.code())
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}
