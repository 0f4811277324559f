//! Error types for excelspec

use crate::types::{CellRange, CellRef};
use thiserror::Error;

/// Result type alias for excelspec operations
pub type Result<T> = std::result::Result<T, ExcelError>;

/// Coarse classification of an [`ExcelError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The workbook description asked for something the document rejects
    /// (bad sheet name, overlapping merge, coordinates beyond the format limits, ...)
    Configuration,
    /// The output sink or temporary storage could not be written
    Io,
}

/// Main error type for all workbook writing operations
#[derive(Error, Debug)]
pub enum ExcelError {
    /// Workbook content the file format cannot encode
    #[error("Failed to encode workbook: {0}")]
    EncodingError(String),

    /// Sheet name rejected by the document
    #[error("Invalid sheet name '{name}': {reason}")]
    InvalidSheetName { name: String, reason: &'static str },

    /// Sheet name already used in this workbook
    #[error("Sheet name '{0}' is already used in this workbook")]
    DuplicateSheetName(String),

    /// Sheet handle does not belong to this document
    #[error("Sheet #{0} does not exist in this document")]
    SheetNotFound(usize),

    /// Row index beyond the format limit
    #[error("Row {row} is out of range (format allows {max} rows)")]
    RowOutOfRange { row: u64, max: u32 },

    /// Column index beyond the format limit
    #[error("Column {col} is out of range (format allows {max} columns)")]
    ColumnOutOfRange { col: u64, max: u32 },

    /// Row was never created
    #[error("Row {0} does not exist")]
    RowNotFound(u32),

    /// Cell was never created
    #[error("Cell {0} does not exist")]
    CellNotFound(CellRef),

    /// Row already left the streaming window
    #[error("Row {row} was already flushed to disk; rows up to {flushed_through} can no longer be accessed")]
    RowFlushed { row: u32, flushed_through: u32 },

    /// Malformed cell range
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Merged regions must not overlap
    #[error("Merged region {region} overlaps existing merged region {existing}")]
    OverlappingMergedRegion { region: CellRange, existing: CellRange },

    /// Style record limit of the format reached
    #[error("Maximum number of cell styles ({max}) exceeded")]
    TooManyStyles { max: usize },

    /// Style id not issued by this document
    #[error("Style #{0} is not defined in this document")]
    StyleNotFound(u32),

    /// Writer configuration rejected
    #[error("Invalid writer option: {0}")]
    InvalidOption(String),

    /// Unsupported or unknown output format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Error occurred while writing one sheet of the workbook
    #[error("Failed to write sheet #{index} '{name}': {source}")]
    SheetWriteError {
        index: usize,
        name: String,
        #[source]
        source: Box<ExcelError>,
    },

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// ZIP packaging error
    #[error("ZIP error: {0}")]
    ZipError(String),
}

impl ExcelError {
    /// Classify the error as a configuration or IO failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExcelError::IoError(_) | ExcelError::ZipError(_) => ErrorKind::Io,
            ExcelError::SheetWriteError { source, .. } => source.kind(),
            _ => ErrorKind::Configuration,
        }
    }

    /// True when the underlying cause is an IO failure
    pub fn is_io(&self) -> bool {
        self.kind() == ErrorKind::Io
    }

    /// Strip [`ExcelError::SheetWriteError`] wrappers and return the root cause
    pub fn root_cause(&self) -> &ExcelError {
        match self {
            ExcelError::SheetWriteError { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<zip::result::ZipError> for ExcelError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(io) => ExcelError::IoError(io),
            other => ExcelError::ZipError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_source() {
        let err = ExcelError::SheetWriteError {
            index: 1,
            name: "Data".to_string(),
            source: Box::new(ExcelError::IoError(std::io::Error::other("disk full"))),
        };
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.is_io());
        assert!(matches!(err.root_cause(), ExcelError::IoError(_)));

        let err = ExcelError::DuplicateSheetName("Data".to_string());
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = ExcelError::EncodingError("record 0x00FC exceeds 8224 bytes".to_string());
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!err.is_io());
    }

    #[test]
    fn test_sheet_error_message() {
        let err = ExcelError::SheetWriteError {
            index: 0,
            name: "Report".to_string(),
            source: Box::new(ExcelError::RowNotFound(3)),
        };
        assert_eq!(
            err.to_string(),
            "Failed to write sheet #0 'Report': Row 3 does not exist"
        );
    }
}
