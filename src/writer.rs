//! Workbook writing: turns a [`WorkbookSpec`] into a populated document
//!
//! [`SheetWriter`] holds the placement algorithm and works on any
//! [`Document`]. [`WorkbookWriter`] picks the back-end from its
//! [`WriteOptions`] and flushes the result to a sink or a file.
//!
//! # Examples
//!
//! ```no_run
//! use excelspec::types::{CellSpec, RowSpec, SheetSpec, StyleTag, TitleSpec, WorkbookSpec};
//! use excelspec::writer::WorkbookWriterBuilder;
//! use excelspec::FormatVariant;
//!
//! let workbook = WorkbookSpec::new(vec![SheetSpec::named("Report")
//!     .with_titles(vec![
//!         TitleSpec::new("Quarterly report", 0).with_width(4).with_style(StyleTag::Centered),
//!     ])
//!     .with_rows(vec![RowSpec::new(vec![
//!         CellSpec::new("Revenue"),
//!         CellSpec::styled("-12", StyleTag::Highlighted),
//!     ])])]);
//!
//! let writer = WorkbookWriterBuilder::new(FormatVariant::StreamingXlsx)
//!     .with_row_access_window(500)
//!     .build()?;
//! writer.save(&workbook, "report.xlsx")?;
//! # Ok::<(), excelspec::ExcelError>(())
//! ```

use std::io::Write;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::document::streaming::DEFAULT_ROW_ACCESS_WINDOW;
use crate::document::xlsx::DEFAULT_COMPRESSION_LEVEL;
use crate::document::{
    Document, FormatVariant, MemoryProfile, SheetId, StreamingXlsxDocument, StyleId, XlsDocument,
    XlsxDocument,
};
use crate::error::{ExcelError, Result};
use crate::style::StyleCache;
use crate::types::{CellRange, CellRef, CellSpec, RowSpec, SheetSpec, StyleTag, TitleSpec, WorkbookSpec};

/// Text of a cell created implicitly while placing titles
pub const PLACEHOLDER: &str = " ";

/// Populates one document from workbook descriptions
///
/// The writer owns the document and a [`StyleCache`] for it, so each style
/// tag yields one style record no matter how many cells use it.
#[derive(Debug)]
pub struct SheetWriter<D: Document> {
    doc: D,
    styles: StyleCache,
}

impl<D: Document> SheetWriter<D> {
    /// Writer over an open, empty document
    pub fn new(doc: D) -> Self {
        SheetWriter {
            doc,
            styles: StyleCache::new(),
        }
    }

    /// Write every sheet in order
    ///
    /// A failure is reported as [`ExcelError::SheetWriteError`] naming the sheet.
    pub fn write_workbook(&mut self, workbook: &WorkbookSpec) -> Result<()> {
        for (index, spec) in workbook.sheets.iter().enumerate() {
            let wrap = |name: String, source: ExcelError| ExcelError::SheetWriteError {
                index,
                name,
                source: Box::new(source),
            };

            let id = self
                .doc
                .create_sheet(spec.name.as_deref())
                .map_err(|e| wrap(spec.name.clone().unwrap_or_default(), e))?;
            let name = self.doc.sheet(id)?.name().to_string();
            self.populate_sheet(id, spec).map_err(|e| wrap(name, e))?;
        }
        Ok(())
    }

    /// Create a sheet for `spec` and fill it
    pub fn write_sheet(&mut self, spec: &SheetSpec) -> Result<SheetId> {
        let id = self.doc.create_sheet(spec.name.as_deref())?;
        self.populate_sheet(id, spec)?;
        Ok(id)
    }

    /// Place titles, then rows, into an existing sheet
    pub fn populate_sheet(&mut self, id: SheetId, spec: &SheetSpec) -> Result<()> {
        let titles = spec.titles();
        self.write_titles(id, titles)?;

        let start_row = if spec.has_titles() {
            self.doc.sheet(id)?.last_row_num() + 1
        } else {
            0
        };
        self.write_rows(id, start_row, &spec.rows)?;

        log::debug!(
            "sheet '{}': {} titles, {} rows from row {}, {} merged regions",
            self.doc.sheet(id)?.name(),
            titles.len(),
            spec.rows.len(),
            start_row,
            self.doc.sheet(id)?.merged_regions().len()
        );
        Ok(())
    }

    /// Place titles in list order
    pub fn write_titles(&mut self, id: SheetId, titles: &[TitleSpec]) -> Result<()> {
        titles.iter().try_for_each(|title| self.write_title(id, title))
    }

    /// Place one title; a title spanning several cells becomes a merged region
    ///
    /// Without `y` the title goes to the sheet's current last row. Every cell
    /// of a merged region gets the style, only the top-left one the value.
    pub fn write_title(&mut self, id: SheetId, title: &TitleSpec) -> Result<()> {
        let row = self.get_row(id, title.y)?;
        let anchor = self.get_cell(id, row, Some(title.x))?;
        let region = CellRange::spanning(anchor, title.height, title.width)?;

        if region.cell_count() > 1 {
            self.doc.sheet_mut(id)?.add_merged_region(region)?;
            let style = self.resolve_style(title.style)?;
            // The anchor row may leave a streaming window while the lower rows are created
            self.doc.sheet_mut(id)?.set_cell_value(anchor, &title.value)?;
            self.set_region_style(id, region, style)
        } else {
            let style = self.resolve_style(title.style)?;
            self.doc.set_cell_style(id, anchor, style)?;
            self.doc.sheet_mut(id)?.set_cell_value(anchor, &title.value)
        }
    }

    /// Append rows from `start_row` on, one row per [`RowSpec`]
    pub fn write_rows(&mut self, id: SheetId, start_row: u32, rows: &[RowSpec]) -> Result<()> {
        let mut row_num = start_row;
        for row in rows {
            self.doc.create_row(id, row_num)?;
            self.write_cells(id, row_num, &row.cells)?;
            row_num += 1;
        }
        Ok(())
    }

    /// Append cells to the end of `row`
    pub fn write_cells(&mut self, id: SheetId, row: u32, cells: &[CellSpec]) -> Result<()> {
        for cell in cells {
            let col = self.doc.sheet(id)?.last_cell_num(row)?;
            let at = CellRef::new(row, col);
            self.doc.sheet_mut(id)?.create_cell(at)?;

            let style = self.resolve_style(cell.style)?;
            self.doc.set_cell_style(id, at, style)?;
            self.doc.sheet_mut(id)?.set_cell_value(at, &cell.value)?;
        }
        Ok(())
    }

    /// Assign `style` to every cell of `region`, creating missing rows and cells
    pub fn set_region_style(&mut self, id: SheetId, region: CellRange, style: StyleId) -> Result<()> {
        for at in region.cells() {
            self.get_row(id, Some(at.row))?;
            self.get_cell(id, at.row, Some(at.col))?;
            self.doc.set_cell_style(id, at, style)?;
        }
        Ok(())
    }

    /// Row `index` (or the current last row), created when missing
    pub fn get_row(&mut self, id: SheetId, index: Option<u32>) -> Result<u32> {
        let sheet = self.doc.sheet(id)?;
        let row = index.unwrap_or_else(|| sheet.last_row_num());
        if sheet.row(row)?.is_none() {
            self.doc.create_row(id, row)?;
        }
        Ok(row)
    }

    /// Cell `index` of `row` (or the first free column), created with the
    /// placeholder text when missing
    pub fn get_cell(&mut self, id: SheetId, row: u32, index: Option<u32>) -> Result<CellRef> {
        let sheet = self.doc.sheet(id)?;
        let col = match index {
            Some(col) => col,
            None => sheet.last_cell_num(row)?,
        };
        let at = CellRef::new(row, col);

        if sheet.cell(at)?.is_none() {
            let sheet = self.doc.sheet_mut(id)?;
            sheet.create_cell(at)?;
            sheet.set_cell_value(at, PLACEHOLDER)?;
        }
        Ok(at)
    }

    /// Style record for `tag`, created in the document on first use
    pub fn resolve_style(&mut self, tag: StyleTag) -> Result<StyleId> {
        self.styles.resolve(&mut self.doc, tag)
    }

    /// Document being populated
    pub fn document(&self) -> &D {
        &self.doc
    }

    /// Tags resolved so far and their style records
    pub fn style_cache(&self) -> &StyleCache {
        &self.styles
    }

    /// Give back the populated document without encoding it
    pub fn into_document(self) -> D {
        self.doc
    }

    /// Encode the document into `sink`
    pub fn finish<W: Write>(self, sink: &mut W) -> Result<u64> {
        self.doc.write_to(sink)
    }
}

/// Settings of a [`WorkbookWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WriteOptions {
    pub format: FormatVariant,
    /// Rows per sheet kept in memory by the streaming back-end
    pub row_access_window: usize,
    /// Deflate level 0-9 of XLSX package parts
    pub compression_level: u32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            format: FormatVariant::Xlsx,
            row_access_window: DEFAULT_ROW_ACCESS_WINDOW,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl WriteOptions {
    /// Reject a zero row window and levels above 9
    pub fn validate(&self) -> Result<()> {
        if self.row_access_window == 0 {
            return Err(ExcelError::InvalidOption(
                "row access window must keep at least one row".to_string(),
            ));
        }
        if self.compression_level > 9 {
            return Err(ExcelError::InvalidOption(format!(
                "compression level {} is outside 0-9",
                self.compression_level
            )));
        }
        Ok(())
    }
}

/// Builder for creating configured workbook writers
#[derive(Debug, Clone)]
pub struct WorkbookWriterBuilder {
    options: WriteOptions,
}

impl WorkbookWriterBuilder {
    /// Builder with default options for `format`
    pub fn new(format: FormatVariant) -> Self {
        WorkbookWriterBuilder {
            options: WriteOptions {
                format,
                ..Default::default()
            },
        }
    }

    /// Rows per sheet kept in memory (streaming format only)
    pub fn with_row_access_window(mut self, rows: usize) -> Self {
        self.options.row_access_window = rows;
        self
    }

    /// Row window taken from a memory profile
    pub fn with_memory_profile(mut self, profile: MemoryProfile) -> Self {
        self.options.row_access_window = profile.row_access_window();
        self
    }

    /// Deflate level 0-9 (XLSX formats only)
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.options.compression_level = level;
        self
    }

    /// Validate the options and create the writer
    pub fn build(self) -> Result<WorkbookWriter> {
        self.options.validate()?;
        Ok(WorkbookWriter {
            options: self.options,
        })
    }
}

/// Writes whole workbooks with a fixed set of [`WriteOptions`]
#[derive(Debug, Clone)]
pub struct WorkbookWriter {
    options: WriteOptions,
}

impl WorkbookWriter {
    /// Writer with default options for `format`
    pub fn new(format: FormatVariant) -> Self {
        WorkbookWriter {
            options: WriteOptions {
                format,
                ..Default::default()
            },
        }
    }

    /// Writer with explicit options, validated first
    pub fn with_options(options: WriteOptions) -> Result<Self> {
        options.validate()?;
        Ok(WorkbookWriter { options })
    }

    /// Options this writer was built with
    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Encode `workbook` into `sink`, returning the number of bytes written
    ///
    /// Nothing reaches the sink unless every sheet was written.
    pub fn write<W: Write>(&self, workbook: &WorkbookSpec, sink: &mut W) -> Result<u64> {
        let options = &self.options;
        match options.format {
            FormatVariant::Xls => write_document(XlsDocument::new(), workbook, sink),
            FormatVariant::Xlsx => write_document(
                XlsxDocument::with_compression_level(options.compression_level),
                workbook,
                sink,
            ),
            FormatVariant::StreamingXlsx => write_document(
                StreamingXlsxDocument::with_window(options.row_access_window)
                    .compression_level(options.compression_level),
                workbook,
                sink,
            ),
        }
    }

    /// Write `workbook` to `path`
    ///
    /// Output goes to a temporary file next to `path` that replaces it only
    /// once the workbook was fully written.
    pub fn save<P: AsRef<Path>>(&self, workbook: &WorkbookSpec, path: P) -> Result<u64> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut staging = tempfile::NamedTempFile::new_in(dir)?;
        let written = self.write(workbook, &mut staging)?;
        staging.persist(path).map_err(|e| e.error)?;

        log::debug!("saved {} workbook to {}", self.options.format, path.display());
        Ok(written)
    }
}

fn write_document<D: Document, W: Write>(doc: D, workbook: &WorkbookSpec, sink: &mut W) -> Result<u64> {
    log::debug!(
        "writing {} workbook with {} sheets",
        doc.variant(),
        workbook.sheets.len()
    );
    let mut writer = SheetWriter::new(doc);
    writer.write_workbook(workbook)?;
    writer.finish(sink)
}

/// Write `workbook` to `sink` in `format` with default options
pub fn write<W: Write>(workbook: &WorkbookSpec, sink: &mut W, format: FormatVariant) -> Result<()> {
    WorkbookWriter::new(format).write(workbook, sink).map(|_| ())
}

/// Write `workbook` to `path`, choosing the format from the file extension
pub fn save<P: AsRef<Path>>(workbook: &WorkbookSpec, path: P) -> Result<()> {
    let format = FormatVariant::from_path(path.as_ref())?;
    WorkbookWriter::new(format).save(workbook, path).map(|_| ())
}
