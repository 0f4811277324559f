//! Sparse in-memory sheet arena used by every back-end

use std::collections::BTreeMap;

use super::styles::StyleId;
use super::FormatLimits;
use crate::error::{ExcelError, Result};
use crate::types::{CellRange, CellRef};

/// One physical cell
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridCell {
    value: Option<String>,
    style: StyleId,
}

impl GridCell {
    /// Cell text; `None` for a blank cell
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn style(&self) -> StyleId {
        self.style
    }
}

/// One physical row: cells keyed by column
#[derive(Debug, Clone, Default)]
pub struct GridRow {
    cells: BTreeMap<u32, GridCell>,
}

impl GridRow {
    pub fn cell(&self, col: u32) -> Option<&GridCell> {
        self.cells.get(&col)
    }

    /// Cells in column order
    pub fn cells(&self) -> impl Iterator<Item = (u32, &GridCell)> {
        self.cells.iter().map(|(col, cell)| (*col, cell))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Index of the last cell plus one, 0 for an empty row
    pub fn last_cell_num(&self) -> u32 {
        self.cells
            .last_key_value()
            .map(|(col, _)| col + 1)
            .unwrap_or(0)
    }
}

/// Rows, cells and merged regions of a single sheet
///
/// Rows and cells are created explicitly and then looked up by index. A
/// streaming back-end may evict the lowest rows with [`SheetGrid::pop_first_row`];
/// evicted rows can no longer be touched.
#[derive(Debug, Clone)]
pub struct SheetGrid {
    name: String,
    rows: BTreeMap<u32, GridRow>,
    merged: Vec<CellRange>,
    limits: FormatLimits,
    highest_row: Option<u32>,
    highest_col: Option<u32>,
    flushed_through: Option<u32>,
}

impl SheetGrid {
    pub fn new(name: impl Into<String>, limits: FormatLimits) -> Self {
        SheetGrid {
            name: name.into(),
            rows: BTreeMap::new(),
            merged: Vec::new(),
            limits,
            highest_row: None,
            highest_col: None,
            flushed_through: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limits(&self) -> FormatLimits {
        self.limits
    }

    /// Highest row index ever created, 0 on an empty sheet
    pub fn last_row_num(&self) -> u32 {
        self.highest_row.unwrap_or(0)
    }

    /// Highest column index ever created
    pub fn last_col_num(&self) -> Option<u32> {
        self.highest_col
    }

    /// True when no row was ever created
    pub fn is_empty(&self) -> bool {
        self.highest_row.is_none()
    }

    /// Row at `row`, `None` if it was never created
    pub fn row(&self, row: u32) -> Result<Option<&GridRow>> {
        self.check_row(row)?;
        Ok(self.rows.get(&row))
    }

    /// Create an empty row at `row`, replacing any row already there
    pub fn create_row(&mut self, row: u32) -> Result<()> {
        self.check_row(row)?;
        self.rows.insert(row, GridRow::default());
        self.highest_row = Some(self.highest_row.map_or(row, |r| r.max(row)));
        Ok(())
    }

    /// Index of the last cell of `row` plus one, 0 for an empty row
    pub fn last_cell_num(&self, row: u32) -> Result<u32> {
        self.row(row)?
            .map(GridRow::last_cell_num)
            .ok_or(ExcelError::RowNotFound(row))
    }

    pub fn cell(&self, at: CellRef) -> Result<Option<&GridCell>> {
        self.check_col(at.col)?;
        Ok(self.row(at.row)?.and_then(|r| r.cell(at.col)))
    }

    /// Create a blank cell with the base style, replacing any cell already there
    pub fn create_cell(&mut self, at: CellRef) -> Result<()> {
        self.check_col(at.col)?;
        let row = self.row_mut(at.row)?;
        row.cells.insert(at.col, GridCell::default());
        self.highest_col = Some(self.highest_col.map_or(at.col, |c| c.max(at.col)));
        Ok(())
    }

    pub fn set_cell_style(&mut self, at: CellRef, style: StyleId) -> Result<()> {
        self.cell_mut(at)?.style = style;
        Ok(())
    }

    pub fn set_cell_value(&mut self, at: CellRef, value: &str) -> Result<()> {
        self.cell_mut(at)?.value = Some(value.to_string());
        Ok(())
    }

    /// Register a merged region; it must fit the format and overlap no existing region
    pub fn add_merged_region(&mut self, region: CellRange) -> Result<usize> {
        self.check_row(region.last_row)?;
        self.check_col(region.last_col)?;
        if let Some(existing) = self.merged.iter().find(|m| m.intersects(&region)) {
            return Err(ExcelError::OverlappingMergedRegion {
                region,
                existing: *existing,
            });
        }
        log::trace!("sheet '{}': merged region {}", self.name, region);
        self.merged.push(region);
        Ok(self.merged.len() - 1)
    }

    pub fn merged_regions(&self) -> &[CellRange] {
        &self.merged
    }

    /// Rows still held in memory, in row order
    pub fn rows(&self) -> impl Iterator<Item = (u32, &GridRow)> {
        self.rows.iter().map(|(idx, row)| (*idx, row))
    }

    /// Number of rows still held in memory
    pub fn retained_rows(&self) -> usize {
        self.rows.len()
    }

    /// Highest row index that was evicted, if any
    pub fn flushed_through(&self) -> Option<u32> {
        self.flushed_through
    }

    /// Evict the lowest row; every row up to it becomes inaccessible
    pub fn pop_first_row(&mut self) -> Option<(u32, GridRow)> {
        let (idx, row) = self.rows.pop_first()?;
        self.flushed_through = Some(idx);
        Some((idx, row))
    }

    fn row_mut(&mut self, row: u32) -> Result<&mut GridRow> {
        self.check_row(row)?;
        self.rows.get_mut(&row).ok_or(ExcelError::RowNotFound(row))
    }

    fn cell_mut(&mut self, at: CellRef) -> Result<&mut GridCell> {
        self.row_mut(at.row)?
            .cells
            .get_mut(&at.col)
            .ok_or(ExcelError::CellNotFound(at))
    }

    fn check_row(&self, row: u32) -> Result<()> {
        if row as u64 >= self.limits.max_rows as u64 {
            return Err(ExcelError::RowOutOfRange {
                row: row as u64,
                max: self.limits.max_rows,
            });
        }
        match self.flushed_through {
            Some(flushed_through) if row <= flushed_through => Err(ExcelError::RowFlushed {
                row,
                flushed_through,
            }),
            _ => Ok(()),
        }
    }

    fn check_col(&self, col: u32) -> Result<()> {
        if col as u64 >= self.limits.max_cols as u64 {
            return Err(ExcelError::ColumnOutOfRange {
                col: col as u64,
                max: self.limits.max_cols,
            });
        }
        Ok(())
    }
}

/// Sheets of one document, in creation order
#[derive(Debug, Clone)]
pub struct SheetList {
    sheets: Vec<SheetGrid>,
    limits: FormatLimits,
}

impl SheetList {
    pub fn new(limits: FormatLimits) -> Self {
        SheetList {
            sheets: Vec::new(),
            limits,
        }
    }

    /// Add a sheet named `name`, or the first free `SheetN` name when absent
    pub fn add(&mut self, name: Option<&str>) -> Result<usize> {
        let name = match name {
            Some(name) => {
                super::validate_sheet_name(name)?;
                if self.is_taken(name) {
                    return Err(ExcelError::DuplicateSheetName(name.to_string()));
                }
                name.to_string()
            }
            None => self.next_free_name(),
        };

        log::debug!("created sheet #{} '{}'", self.sheets.len(), name);
        self.sheets.push(SheetGrid::new(name, self.limits));
        Ok(self.sheets.len() - 1)
    }

    pub fn get(&self, index: usize) -> Result<&SheetGrid> {
        self.sheets.get(index).ok_or(ExcelError::SheetNotFound(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut SheetGrid> {
        self.sheets
            .get_mut(index)
            .ok_or(ExcelError::SheetNotFound(index))
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SheetGrid> {
        self.sheets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SheetGrid> {
        self.sheets.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(SheetGrid::name)
    }

    fn is_taken(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.sheets.iter().any(|s| s.name.to_lowercase() == lower)
    }

    fn next_free_name(&self) -> String {
        (self.sheets.len()..)
            .map(|n| format!("Sheet{}", n))
            .find(|candidate| !self.is_taken(candidate))
            .unwrap_or_default()
    }
}
