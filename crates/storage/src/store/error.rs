#![forbid(unsafe_code)]

use toc_core::ItemError;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    NotFound(&'static str),
    InvalidMove,
    OrderOutOfRange { requested: i64, max: i64 },
    DuplicateKey(String),
    InvalidParentKey { section_key: String, parent_key: String },
}

impl StoreError {
    /// Stable machine-readable code for the surrounding request layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO",
            Self::Sql(_) => "SQL",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidMove => "INVALID_MOVE",
            Self::OrderOutOfRange { .. } => "ORDER_OUT_OF_RANGE",
            Self::DuplicateKey(_) => "DUPLICATE_KEY",
            Self::InvalidParentKey { .. } => "INVALID_PARENT_KEY",
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::NotFound(what) => write!(f, "{what} not found"),
            Self::InvalidMove => write!(f, "invalid move: cannot move into own descendant"),
            Self::OrderOutOfRange { requested, max } => write!(
                f,
                "order out of range for target parent (requested={requested}, max allowed={max})"
            ),
            Self::DuplicateKey(key) => write!(f, "duplicate section_key: {key}"),
            Self::InvalidParentKey {
                section_key,
                parent_key,
            } => write!(
                f,
                "invalid parent_key '{parent_key}' for section_key '{section_key}'"
            ),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}

impl From<ItemError> for StoreError {
    fn from(value: ItemError) -> Self {
        match value {
            ItemError::MissingName { .. } => {
                Self::InvalidInput("each section must include a non-empty name")
            }
            ItemError::BadOrder { .. } => Self::InvalidInput("order must be >= 1"),
            ItemError::DuplicateKey(key) => Self::DuplicateKey(key),
            ItemError::InvalidParentKey {
                section_key,
                parent_key,
            } => Self::InvalidParentKey {
                section_key,
                parent_key,
            },
        }
    }
}
