//! # excelspec
//!
//! Declarative Excel workbook writer: describe sheets as data, get a `.xls`
//! or `.xlsx` file back.
//!
//! ## Features
//!
//! - **Titles**: header cells at absolute coordinates, merged when they span
//!   more than one cell, with the style applied across the whole region
//! - **Rows**: body rows appended below the titles, cells left to right
//! - **Style presets**: default, highlighted (red font) and centered, each
//!   turned into a single style record per workbook
//! - **Three back-ends**: BIFF8 `.xls`, in-memory `.xlsx`, and streaming
//!   `.xlsx` with a bounded row window for large sheets
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use excelspec::types::{CellSpec, RowSpec, SheetSpec, StyleTag, TitleSpec, WorkbookSpec};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sheet = SheetSpec::named("People")
//!     .with_titles(vec![
//!         TitleSpec::new("Staff list", 0).with_y(0).with_width(3).with_style(StyleTag::Centered),
//!         TitleSpec::new("Name", 0).with_y(1),
//!         TitleSpec::new("Age", 1).with_y(1),
//!         TitleSpec::new("City", 2).with_y(1),
//!     ])
//!     .with_rows(vec![
//!         ["Alice", "30", "NYC"].into_iter().collect(),
//!         RowSpec::new(vec![
//!             CellSpec::new("Bob"),
//!             CellSpec::styled("17", StyleTag::Highlighted),
//!             CellSpec::new("SF"),
//!         ]),
//!     ]);
//!
//! excelspec::save(&WorkbookSpec::new(vec![sheet]), "people.xlsx")?;
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod style;
pub mod types;
pub mod writer;

pub use document::{Document, FormatVariant, MemoryProfile};
pub use error::{ExcelError, Result};
pub use style::StyleCache;
pub use types::{CellRange, CellRef, CellSpec, RowSpec, SheetSpec, StyleTag, TitleSpec, WorkbookSpec};
pub use writer::{save, write, SheetWriter, WorkbookWriter, WorkbookWriterBuilder, WriteOptions};
