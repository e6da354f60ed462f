use thiserror::Error;

/// Typed failure conditions raised by the adapters and the factory.
///
/// Functions in this crate return `anyhow::Result`; these variants are
/// wrapped into it and can be recovered with `err.downcast_ref::<FormatError>()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("{context}: block structure mismatch: expected [{expected}], got [{actual}]")]
    StructureMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("{context}: column '{column}' has {actual} rows, expected {expected}")]
    RowCountMismatch {
        context: String,
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column name '{0}' in header")]
    DuplicateColumn(String),

    #[error("unknown format '{0}'")]
    UnknownFormat(String),

    #[error("format '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("malformed statistics trailer: {0}")]
    MalformedTrailer(String),

    #[error("{context}: expected a statistics trailer after the suffix, got [{actual}]")]
    UnexpectedTrailingBlock { context: String, actual: String },
}
