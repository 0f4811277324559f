//! Spreadsheet documents the sheet writer populates
//!
//! A [`Document`] is an open, initially empty workbook of one
//! [`FormatVariant`]. Sheets are [`SheetGrid`] arenas addressed by [`SheetId`];
//! style records are appended with [`Document::create_style`]. Once populated,
//! [`Document::write_to`] encodes the whole workbook into a sink.
//!
//! Three back-ends implement the trait:
//!
//! - [`XlsDocument`]: BIFF8 records inside an OLE compound file (`.xls`)
//! - [`XlsxDocument`]: SpreadsheetML package built in memory (`.xlsx`)
//! - [`StreamingXlsxDocument`]: SpreadsheetML with a bounded row window,
//!   older rows spill to an anonymous temporary file

pub mod grid;
pub mod memory;
mod ooxml;
pub mod shared_strings;
pub mod streaming;
pub mod styles;
pub mod xls;
pub mod xlsx;
pub mod xml_writer;

use std::fmt;
use std::io::Write;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ExcelError, Result};
use crate::types::CellRef;

pub use grid::{GridCell, GridRow, SheetGrid, SheetList};
pub use memory::MemoryProfile;
pub use streaming::StreamingXlsxDocument;
pub use styles::{FontColor, HorizontalAlign, StyleDef, StyleId, StyleTable};
pub use xls::XlsDocument;
pub use xlsx::XlsxDocument;

/// Maximum sheet name length in characters
pub const MAX_SHEET_NAME_LEN: usize = 31;

const INVALID_SHEET_NAME_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Output format of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FormatVariant {
    /// Legacy binary workbook (BIFF8)
    Xls,
    /// SpreadsheetML workbook held in memory
    #[default]
    Xlsx,
    /// SpreadsheetML workbook with a bounded in-memory row window
    StreamingXlsx,
}

impl FormatVariant {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            FormatVariant::Xls => "xls",
            FormatVariant::Xlsx | FormatVariant::StreamingXlsx => "xlsx",
        }
    }

    /// Infer the variant from a file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("xls") => Ok(FormatVariant::Xls),
            Some("xlsx") => Ok(FormatVariant::Xlsx),
            _ => Err(ExcelError::InvalidFormat(format!(
                "cannot infer workbook format from '{}'",
                path.display()
            ))),
        }
    }

    /// Grid and style limits of the format
    pub fn limits(&self) -> FormatLimits {
        match self {
            FormatVariant::Xls => FormatLimits::XLS,
            FormatVariant::Xlsx | FormatVariant::StreamingXlsx => FormatLimits::XLSX,
        }
    }
}

impl fmt::Display for FormatVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatVariant::Xls => "xls",
            FormatVariant::Xlsx => "xlsx",
            FormatVariant::StreamingXlsx => "streaming xlsx",
        };
        f.write_str(name)
    }
}

/// Hard limits of a file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatLimits {
    pub max_rows: u32,
    pub max_cols: u32,
    /// Cell style records, the base format included
    pub max_styles: usize,
}

impl FormatLimits {
    pub const XLS: FormatLimits = FormatLimits {
        max_rows: 65_536,
        max_cols: 256,
        max_styles: 4_000,
    };

    pub const XLSX: FormatLimits = FormatLimits {
        max_rows: 1_048_576,
        max_cols: 16_384,
        max_styles: 64_000,
    };
}

/// Handle to a sheet inside one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetId(pub(crate) usize);

impl SheetId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Capabilities the sheet writer needs from a workbook document
pub trait Document {
    /// Format this document encodes
    fn variant(&self) -> FormatVariant;

    /// Add a sheet; `None` lets the document pick a free name
    fn create_sheet(&mut self, name: Option<&str>) -> Result<SheetId>;

    fn sheet(&self, id: SheetId) -> Result<&SheetGrid>;

    fn sheet_mut(&mut self, id: SheetId) -> Result<&mut SheetGrid>;

    /// Create (or replace) the row at `row`
    fn create_row(&mut self, id: SheetId, row: u32) -> Result<()> {
        self.sheet_mut(id)?.create_row(row)
    }

    /// Append a style record
    fn create_style(&mut self, def: StyleDef) -> Result<StyleId>;

    /// Number of style records, the base format included
    fn styles(&self) -> usize;

    /// Assign a style issued by this document to an existing cell
    fn set_cell_style(&mut self, id: SheetId, at: CellRef, style: StyleId) -> Result<()> {
        if style.index() as usize >= self.styles() {
            return Err(ExcelError::StyleNotFound(style.index()));
        }
        self.sheet_mut(id)?.set_cell_style(at, style)
    }

    /// Encode the workbook into `sink`, returning the number of bytes written
    ///
    /// The sink is written only after the whole workbook was encoded.
    fn write_to<W: Write>(self, sink: &mut W) -> Result<u64>
    where
        Self: Sized;
}

/// Check a sheet name against the rules shared by both formats
pub fn validate_sheet_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.chars().count() > MAX_SHEET_NAME_LEN {
        Some("name is longer than 31 characters")
    } else if name.contains(INVALID_SHEET_NAME_CHARS) {
        Some("name contains one of []:*?/\\")
    } else if name.starts_with('\'') || name.ends_with('\'') {
        Some("name starts or ends with an apostrophe")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ExcelError::InvalidSheetName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            FormatVariant::from_path("report.XLS").unwrap(),
            FormatVariant::Xls
        );
        assert_eq!(
            FormatVariant::from_path("/tmp/out/report.xlsx").unwrap(),
            FormatVariant::Xlsx
        );
        assert!(FormatVariant::from_path("report.csv").is_err());
        assert!(FormatVariant::from_path("report").is_err());
    }

    #[test]
    fn test_format_limits() {
        assert_eq!(FormatVariant::Xls.limits().max_cols, 256);
        assert_eq!(FormatVariant::StreamingXlsx.limits().max_rows, 1_048_576);
        assert_eq!(FormatVariant::StreamingXlsx.extension(), "xlsx");
    }

    #[test]
    fn test_sheet_name_rules() {
        assert!(validate_sheet_name("Q1 Sales").is_ok());
        assert!(validate_sheet_name(&"x".repeat(31)).is_ok());
        assert!(validate_sheet_name(&"x".repeat(32)).is_err());
        assert!(validate_sheet_name("").is_err());
        assert!(validate_sheet_name("a/b").is_err());
        assert!(validate_sheet_name("what?").is_err());
        assert!(validate_sheet_name("'quoted'").is_err());
        assert!(validate_sheet_name("it's").is_ok());
    }
}
