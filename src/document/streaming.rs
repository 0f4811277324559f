//! SpreadsheetML workbook with a bounded in-memory row window
//!
//! Each sheet keeps at most `row_access_window` rows in memory. Creating a row
//! beyond the window serializes the lowest retained row to an anonymous
//! temporary file; that row and every row above it can no longer be touched.
//! Strings are written inline so spilled rows need no workbook-wide state.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use zip::ZipWriter;

use super::grid::{GridRow, SheetGrid, SheetList};
use super::ooxml::{self, CellText};
use super::styles::{StyleDef, StyleId, StyleTable};
use super::xlsx::DEFAULT_COMPRESSION_LEVEL;
use super::{Document, FormatLimits, FormatVariant, SheetId};
use crate::error::{ExcelError, Result};

/// Rows kept in memory per sheet unless configured otherwise
pub const DEFAULT_ROW_ACCESS_WINDOW: usize = 100;

/// Serialized rows of one sheet that left the window
#[derive(Debug)]
struct SpillFile {
    writer: BufWriter<File>,
    rows: u64,
    buf: Vec<u8>,
}

impl SpillFile {
    fn create() -> Result<Self> {
        let file = tempfile::tempfile()?;
        Ok(SpillFile {
            writer: BufWriter::with_capacity(64 * 1024, file),
            rows: 0,
            buf: Vec::with_capacity(4096),
        })
    }

    fn append(&mut self, idx: u32, row: &GridRow) -> Result<()> {
        self.buf.clear();
        ooxml::push_row_xml(&mut self.buf, idx, row, &mut CellText::Inline);
        self.writer.write_all(&self.buf)?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and rewind for reading
    fn into_file(self) -> Result<File> {
        let mut file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.seek(SeekFrom::Start(0))?;
        Ok(file)
    }
}

/// Streaming `.xlsx` document
#[derive(Debug)]
pub struct StreamingXlsxDocument {
    sheets: SheetList,
    spills: Vec<Option<SpillFile>>,
    styles: StyleTable,
    row_access_window: usize,
    compression_level: u32,
    peak_retained_rows: usize,
}

impl StreamingXlsxDocument {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_ROW_ACCESS_WINDOW)
    }

    /// Document keeping `row_access_window` rows per sheet (at least one)
    pub fn with_window(row_access_window: usize) -> Self {
        StreamingXlsxDocument {
            sheets: SheetList::new(FormatLimits::XLSX),
            spills: Vec::new(),
            styles: StyleTable::new(FormatLimits::XLSX.max_styles),
            row_access_window: row_access_window.max(1),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            peak_retained_rows: 0,
        }
    }

    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    pub fn row_access_window(&self) -> usize {
        self.row_access_window
    }

    /// Highest number of rows any sheet held in memory at once
    pub fn peak_retained_rows(&self) -> usize {
        self.peak_retained_rows
    }

    /// Rows of sheet `id` already serialized to the spill file
    pub fn spilled_rows(&self, id: SheetId) -> u64 {
        self.spills
            .get(id.0)
            .and_then(Option::as_ref)
            .map_or(0, |s| s.rows)
    }
}

impl Default for StreamingXlsxDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for StreamingXlsxDocument {
    fn variant(&self) -> FormatVariant {
        FormatVariant::StreamingXlsx
    }

    fn create_sheet(&mut self, name: Option<&str>) -> Result<SheetId> {
        let index = self.sheets.add(name)?;
        self.spills.push(None);
        Ok(SheetId(index))
    }

    fn sheet(&self, id: SheetId) -> Result<&SheetGrid> {
        self.sheets.get(id.0)
    }

    fn sheet_mut(&mut self, id: SheetId) -> Result<&mut SheetGrid> {
        self.sheets.get_mut(id.0)
    }

    fn create_row(&mut self, id: SheetId, row: u32) -> Result<()> {
        let grid = self.sheets.get_mut(id.0)?;
        grid.create_row(row)?;

        while grid.retained_rows() > self.row_access_window {
            let Some((idx, evicted)) = grid.pop_first_row() else {
                break;
            };
            let slot = self
                .spills
                .get_mut(id.0)
                .ok_or(ExcelError::SheetNotFound(id.0))?;
            let spill = match slot.take() {
                Some(spill) => spill,
                None => SpillFile::create()?,
            };
            let spill = slot.insert(spill);
            spill.append(idx, &evicted)?;
            log::trace!("sheet '{}': spilled row {}", grid.name(), idx);
        }

        self.peak_retained_rows = self.peak_retained_rows.max(grid.retained_rows());
        Ok(())
    }

    fn create_style(&mut self, def: StyleDef) -> Result<StyleId> {
        self.styles.push(def)
    }

    fn styles(&self) -> usize {
        self.styles.len()
    }

    fn write_to<W: Write>(mut self, sink: &mut W) -> Result<u64> {
        let options = ooxml::file_options(self.compression_level as i64);
        let mut zip = ZipWriter::new(tempfile::tempfile()?);
        let mut row_xml = Vec::with_capacity(8192);

        for (i, (sheet, spill)) in self.sheets.iter().zip(self.spills.iter_mut()).enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
            zip.write_all(ooxml::sheet_head().as_bytes())?;

            if let Some(spill) = spill.take() {
                let mut file = spill.into_file()?;
                io::copy(&mut file, &mut zip)?;
            }

            for (idx, row) in sheet.rows() {
                row_xml.clear();
                ooxml::push_row_xml(&mut row_xml, idx, row, &mut CellText::Inline);
                zip.write_all(&row_xml)?;
            }
            ooxml::write_sheet_tail(&mut zip, sheet.merged_regions())?;
        }

        let names: Vec<&str> = self.sheets.names().collect();
        ooxml::write_package_parts(&mut zip, options, &names, &self.styles, None)?;

        let mut staging = zip.finish()?;
        staging.seek(SeekFrom::Start(0))?;
        let written = io::copy(&mut staging, sink)?;
        sink.flush()?;

        log::debug!(
            "wrote streaming xlsx workbook: {} sheets, {} styles, peak {} rows in memory, {} bytes",
            names.len(),
            self.styles.len(),
            self.peak_retained_rows,
            written
        );
        Ok(written)
    }
}
