//! Binding error types.

use crate::bar::BarKind;
use crate::callback::Phase;
use lpbind_engine::EngineError;
use std::fmt;

/// Error type for binding operations.
///
/// Indices carried by variants are 0-based, as seen by binding users.
#[derive(Debug, Clone)]
pub enum Error {
    /// A solver option failed validation; the message names the field.
    InvalidOption(String),
    /// A problem source named more than one file.
    MultipleSources,
    /// Problem, objective, row or column name above 255 characters.
    NameTooLong,
    /// Lower bound above upper bound, or a NaN bound.
    InvalidBounds { lower: f64, upper: f64 },
    /// Basis status string could not be parsed.
    InvalidStatus(String),
    /// Row variables are always continuous.
    RowKind(&'static str),
    /// Argument rejected for a reason not covered by another variant.
    InvalidArgument(String),
    /// Index outside the collection.
    IndexOutOfRange {
        kind: BarKind,
        index: isize,
        len: usize,
    },
    /// No entity carries the name.
    NotFound { kind: BarKind, name: String },
    /// More than one entity carries the name.
    Ambiguous { kind: BarKind, name: String },
    /// A deletion since the Bar was created moved or removed its entity.
    StaleEntity { kind: BarKind, index: usize },
    /// Key of a type the collection cannot resolve.
    BadKey(String),
    /// Same entity selected twice in one call.
    DuplicateIndex,
    /// Sequence length does not match the selection.
    LengthMismatch { expected: usize, found: usize },
    /// Search tree used after its callback returned.
    TreeInvalid,
    /// Tree operation called outside the phase that allows it.
    WrongPhase(Phase),
    /// Second node selection within one select invocation.
    AlreadySelected,
    /// Node belongs to another search tree.
    ForeignNode,
    /// Node is not in the active list.
    InactiveNode,
    /// Column index outside the problem during a branch query.
    ColumnOutOfBound { index: usize, count: usize },
    /// Column cannot be branched upon.
    CannotBranch,
    /// KKT conditions need a defined solution.
    KktUndefined(&'static str),
    /// MIP values on a problem without integer columns.
    NotMip,
    /// Integer solver without presolve needs an optimal basis.
    NoOptimalBasis,
    /// A problem reader failed.
    ReaderFailed {
        reader: &'static str,
        detail: String,
    },
    /// A writer failed.
    WriterFailed { option: &'static str, path: String },
    /// Error raised by a search callback.
    Callback(String),
    /// Logging could not be configured.
    Logging(String),
    /// Engine rejected an operation.
    Engine(EngineError),
}

impl Error {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidOption(_) => "OPTION_INVALID",
            Error::MultipleSources => "SOURCE_MULTIPLE",
            Error::NameTooLong => "NAME_TOO_LONG",
            Error::InvalidBounds { .. } => "BOUNDS_INVALID",
            Error::InvalidStatus(_) => "STATUS_INVALID",
            Error::RowKind(_) => "ROW_KIND_INVALID",
            Error::InvalidArgument(_) => "ARGUMENT_INVALID",
            Error::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            Error::NotFound { .. } => "NAME_NOT_FOUND",
            Error::Ambiguous { .. } => "NAME_AMBIGUOUS",
            Error::StaleEntity { .. } => "BAR_STALE",
            Error::BadKey(_) => "KEY_INVALID",
            Error::DuplicateIndex => "INDEX_DUPLICATE",
            Error::LengthMismatch { .. } => "LENGTH_MISMATCH",
            Error::TreeInvalid => "TREE_INVALID",
            Error::WrongPhase(_) => "TREE_WRONG_PHASE",
            Error::AlreadySelected => "TREE_ALREADY_SELECTED",
            Error::ForeignNode => "NODE_FOREIGN",
            Error::InactiveNode => "NODE_INACTIVE",
            Error::ColumnOutOfBound { .. } => "TREE_COLUMN_RANGE",
            Error::CannotBranch => "TREE_CANNOT_BRANCH",
            Error::KktUndefined(_) => "KKT_UNDEFINED",
            Error::NotMip => "MIP_REQUIRED",
            Error::NoOptimalBasis => "BASIS_NOT_OPTIMAL",
            Error::ReaderFailed { .. } => "READER_FAILED",
            Error::WriterFailed { .. } => "WRITER_FAILED",
            Error::Callback(_) => "CALLBACK_FAILED",
            Error::Logging(_) => "LOGGING_INIT",
            Error::Engine(err) => err.code(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code();
        match self {
            Error::InvalidOption(msg) => write!(f, "[{code}] {msg}"),
            Error::MultipleSources => write!(f, "[{code}] cannot specify multiple data sources"),
            Error::NameTooLong => write!(f, "[{code}] name may be at most 255 chars"),
            Error::InvalidBounds { lower, upper } => write!(
                f,
                "[{code}] lower bound {lower} may not exceed upper bound {upper}"
            ),
            Error::InvalidStatus(msg) => write!(f, "[{code}] {msg}"),
            Error::RowKind(kind) => write!(f, "[{code}] row variables cannot be {kind}"),
            Error::InvalidArgument(msg) => write!(f, "[{code}] {msg}"),
            Error::IndexOutOfRange { kind, index, len } => write!(
                f,
                "[{code}] index {index} out of bound for {len} {}",
                kind.plural()
            ),
            Error::NotFound { kind, name } => {
                write!(f, "[{code}] {kind} named '{name}' does not exist")
            }
            Error::Ambiguous { kind, name } => {
                write!(f, "[{code}] more than one {kind} is named '{name}'")
            }
            Error::StaleEntity { kind, index } => write!(
                f,
                "[{code}] {kind} {index} was shifted or removed by a deletion"
            ),
            Error::BadKey(msg) => write!(f, "[{code}] {msg}"),
            Error::DuplicateIndex => write!(f, "[{code}] duplicate index detected"),
            Error::LengthMismatch { expected, found } => write!(
                f,
                "[{code}] sequence has {found} values, but {expected} required"
            ),
            Error::TreeInvalid => write!(f, "[{code}] tree object no longer valid"),
            Error::WrongPhase(phase) => write!(
                f,
                "[{code}] function may only be called during {} phase",
                phase.as_str()
            ),
            Error::AlreadySelected => write!(f, "[{code}] function must be called only once"),
            Error::ForeignNode => write!(f, "[{code}] node did not come from this tree"),
            Error::InactiveNode => write!(f, "[{code}] node is not active"),
            Error::ColumnOutOfBound { index, count } => write!(
                f,
                "[{code}] index {index} out of bound for {count} columns"
            ),
            Error::CannotBranch => write!(f, "[{code}] cannot branch upon this column"),
            Error::KktUndefined(what) => write!(f, "[{code}] cannot get KKT when {what} undefined"),
            Error::NotMip => write!(f, "[{code}] MIP values require mixed integer problem"),
            Error::NoOptimalBasis => write!(
                f,
                "[{code}] integer solver without presolve requires existing optimal basic solution"
            ),
            Error::ReaderFailed { reader, detail } => {
                write!(f, "[{code}] {reader} reader failed: {detail}")
            }
            Error::WriterFailed { option, path } => write!(
                f,
                "[{code}] writer for '{option}' failed to write to '{path}'"
            ),
            Error::Callback(msg) => write!(f, "[{code}] search callback failed: {msg}"),
            Error::Logging(msg) => write!(f, "[{code}] {msg}"),
            Error::Engine(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        Error::Engine(err)
    }
}

/// Result alias for binding operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_name_lookup() {
        let err = Error::NotFound {
            kind: BarKind::Row,
            name: "x".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("NAME_NOT_FOUND"));
        assert!(msg.contains("row named 'x' does not exist"));
    }

    #[test]
    fn test_error_display_wrong_phase() {
        let msg = Error::WrongPhase(Phase::Select).to_string();
        assert!(msg.contains("TREE_WRONG_PHASE"));
        assert!(msg.contains("function may only be called during select phase"));
    }

    #[test]
    fn test_error_display_out_of_bound() {
        let err = Error::IndexOutOfRange {
            kind: BarKind::Col,
            index: -5,
            len: 3,
        };
        assert!(err.to_string().contains("index -5 out of bound for 3 cols"));
        let err = Error::ColumnOutOfBound { index: 7, count: 4 };
        assert!(err.to_string().contains("index 7 out of bound for 4 columns"));
    }

    #[test]
    fn test_engine_error_keeps_code() {
        let err = Error::from(EngineError::ZeroCount);
        assert_eq!(err.code(), "ENGINE_ZERO_COUNT");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_writer_failure_names_option_and_path() {
        let err = Error::WriterFailed {
            option: "mps",
            path: "/nowhere/out.mps".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "[WRITER_FAILED] writer for 'mps' failed to write to '/nowhere/out.mps'"
        );
    }
}
