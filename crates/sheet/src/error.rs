use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during sheet operations
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to load {what}: {message}")]
    Load { what: String, message: String },

    #[error("Failed to save {}: {message}", path.display())]
    SaveIo { path: PathBuf, message: String },

    #[error("Failed to write workbook: {0}")]
    Write(String),

    #[error("Expected a table: {0}")]
    InvalidTable(String),

    #[error("Index out of bounds: row {row}, col {col} (sheet has {rows} rows, {cols} cols)")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Column not found: {name}")]
    ColumnNotFound { name: String },

    #[error("Sheet not found: {name}")]
    SheetNotFound { name: String },

    #[error("Sheet already exists: {name}")]
    SheetAlreadyExists { name: String },

    #[error("Data length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Duplicate column name: {name}")]
    DuplicateColumnName { name: String },
}

impl SheetError {
    /// Short machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SheetError::FileNotFound { .. } => "file_not_found",
            SheetError::Load { .. } => "load_error",
            SheetError::SaveIo { .. } | SheetError::Write(_) => "save_io_error",
            SheetError::InvalidTable(_)
            | SheetError::LengthMismatch { .. }
            | SheetError::DuplicateColumnName { .. } => "type_error",
            SheetError::IndexOutOfBounds { .. } | SheetError::ColumnNotFound { .. } => {
                "out_of_bounds"
            }
            SheetError::SheetNotFound { .. } => "sheet_not_found",
            SheetError::SheetAlreadyExists { .. } => "sheet_exists",
        }
    }

    pub(crate) fn load(what: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SheetError::Load {
            what: what.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn write(err: impl std::fmt::Display) -> Self {
        SheetError::Write(err.to_string())
    }

    pub(crate) fn save_io(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        SheetError::SaveIo {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SheetError>;
