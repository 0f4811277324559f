//! Type definitions for workbook descriptions and cell coordinates

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cell style presets a workbook description may ask for
///
/// The enumeration is closed on purpose: every tag maps to exactly one style
/// record per document (see [`crate::style::StyleCache`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StyleTag {
    /// Document base style
    #[default]
    Default = 0,
    /// Red font
    Highlighted = 1,
    /// Horizontally centered text
    Centered = 2,
}

impl StyleTag {
    /// All tags, in code order
    pub const ALL: [StyleTag; 3] = [StyleTag::Default, StyleTag::Highlighted, StyleTag::Centered];

    /// Numeric style code (0: default, 1: red font, 2: centered)
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Map a numeric style code; unknown codes fall back to [`StyleTag::Default`]
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => StyleTag::Highlighted,
            2 => StyleTag::Centered,
            _ => StyleTag::Default,
        }
    }
}

/// Whole workbook: an ordered list of sheets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WorkbookSpec {
    pub sheets: Vec<SheetSpec>,
}

impl WorkbookSpec {
    pub fn new(sheets: Vec<SheetSpec>) -> Self {
        WorkbookSpec { sheets }
    }
}

/// One sheet: optional name, optional coordinate-addressed titles, sequential rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SheetSpec {
    /// Sheet name; the document picks one when absent
    pub name: Option<String>,
    /// Header cells placed by absolute coordinates
    pub titles: Option<Vec<TitleSpec>>,
    /// Body rows, written after the titles
    pub rows: Vec<RowSpec>,
}

impl SheetSpec {
    /// Unnamed sheet without titles or rows
    pub fn new() -> Self {
        SheetSpec::default()
    }

    /// Sheet with an explicit name
    pub fn named(name: impl Into<String>) -> Self {
        SheetSpec {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_titles(mut self, titles: Vec<TitleSpec>) -> Self {
        self.titles = Some(titles);
        self
    }

    pub fn with_rows(mut self, rows: Vec<RowSpec>) -> Self {
        self.rows = rows;
        self
    }

    /// Titles as a slice; absent and empty are the same thing
    pub fn titles(&self) -> &[TitleSpec] {
        self.titles.as_deref().unwrap_or(&[])
    }

    pub fn has_titles(&self) -> bool {
        !self.titles().is_empty()
    }
}

/// Header cell placed at an absolute position, optionally spanning a merged region
///
/// `width` and `height` must be at least 1. A zero span is rejected with
/// [`ExcelError::InvalidRange`](crate::error::ExcelError::InvalidRange) when the
/// title is written, rather than being treated as a single cell.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TitleSpec {
    /// Cell text
    pub value: String,
    /// Style preset
    pub style: StyleTag,
    /// Column (0-based)
    pub x: u32,
    /// Row (0-based); `None` means the sheet's current last row
    pub y: Option<u32>,
    /// Number of columns covered
    pub width: u32,
    /// Number of rows covered
    pub height: u32,
}

impl Default for TitleSpec {
    fn default() -> Self {
        TitleSpec {
            value: String::new(),
            style: StyleTag::Default,
            x: 0,
            y: None,
            width: 1,
            height: 1,
        }
    }
}

impl TitleSpec {
    pub fn new(value: impl Into<String>, x: u32) -> Self {
        TitleSpec {
            value: value.into(),
            x,
            ..Default::default()
        }
    }

    pub fn with_y(mut self, y: u32) -> Self {
        self.y = Some(y);
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn with_style(mut self, style: StyleTag) -> Self {
        self.style = style;
        self
    }

    /// True when the title covers more than one cell
    pub fn is_merged(&self) -> bool {
        self.width > 1 || self.height > 1
    }
}

/// Body row: cells are appended left to right
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RowSpec {
    pub cells: Vec<CellSpec>,
}

impl RowSpec {
    pub fn new(cells: Vec<CellSpec>) -> Self {
        RowSpec { cells }
    }
}

impl<C: Into<CellSpec>> FromIterator<C> for RowSpec {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        RowSpec {
            cells: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Body cell: text plus style preset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CellSpec {
    pub value: String,
    pub style: StyleTag,
}

impl CellSpec {
    pub fn new(value: impl Into<String>) -> Self {
        CellSpec {
            value: value.into(),
            style: StyleTag::Default,
        }
    }

    pub fn styled(value: impl Into<String>, style: StyleTag) -> Self {
        CellSpec {
            value: value.into(),
            style,
        }
    }
}

impl From<&str> for CellSpec {
    fn from(s: &str) -> Self {
        CellSpec::new(s)
    }
}

impl From<String> for CellSpec {
    fn from(s: String) -> Self {
        CellSpec::new(s)
    }
}

/// Zero-based cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    /// Row index (0-based)
    pub row: u32,
    /// Column index (0-based)
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        CellRef { row, col }
    }

    /// Convert column index to Excel letter (0 -> A, 25 -> Z, 26 -> AA)
    pub fn col_to_letter(col: u32) -> String {
        let mut result = String::new();
        let mut col = col as u64 + 1;

        while col > 0 {
            col -= 1;
            result.insert(0, (b'A' + (col % 26) as u8) as char);
            col /= 26;
        }

        result
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::col_to_letter(self.col), self.row as u64 + 1)
    }
}

/// Inclusive rectangular cell range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub first_row: u32,
    pub last_row: u32,
    pub first_col: u32,
    pub last_col: u32,
}

impl CellRange {
    /// Build a range from inclusive bounds; first must not exceed last
    pub fn new(
        first_row: u32,
        last_row: u32,
        first_col: u32,
        last_col: u32,
    ) -> crate::error::Result<Self> {
        if first_row > last_row || first_col > last_col {
            return Err(crate::error::ExcelError::InvalidRange(format!(
                "rows {}..={} columns {}..={}",
                first_row, last_row, first_col, last_col
            )));
        }
        Ok(CellRange {
            first_row,
            last_row,
            first_col,
            last_col,
        })
    }

    /// Range anchored at `anchor` covering `height` rows and `width` columns
    pub fn spanning(anchor: CellRef, height: u32, width: u32) -> crate::error::Result<Self> {
        if height == 0 || width == 0 {
            return Err(crate::error::ExcelError::InvalidRange(format!(
                "{} spanning {} rows x {} columns",
                anchor, height, width
            )));
        }
        let last_row = anchor.row.checked_add(height - 1).ok_or_else(|| {
            crate::error::ExcelError::RowOutOfRange {
                row: anchor.row as u64 + height as u64 - 1,
                max: u32::MAX,
            }
        })?;
        let last_col = anchor.col.checked_add(width - 1).ok_or_else(|| {
            crate::error::ExcelError::ColumnOutOfRange {
                col: anchor.col as u64 + width as u64 - 1,
                max: u32::MAX,
            }
        })?;
        CellRange::new(anchor.row, last_row, anchor.col, last_col)
    }

    /// Top-left cell
    pub fn anchor(&self) -> CellRef {
        CellRef::new(self.first_row, self.first_col)
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        (self.first_row..=self.last_row).contains(&cell.row)
            && (self.first_col..=self.last_col).contains(&cell.col)
    }

    pub fn intersects(&self, other: &CellRange) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }

    /// Number of cells covered
    pub fn cell_count(&self) -> u64 {
        ((self.last_row - self.first_row) as u64 + 1) * ((self.last_col - self.first_col) as u64 + 1)
    }

    /// Cells row by row, left to right
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        (self.first_row..=self.last_row)
            .flat_map(move |row| (self.first_col..=self.last_col).map(move |col| CellRef::new(row, col)))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            CellRef::new(self.first_row, self.first_col),
            CellRef::new(self.last_row, self.last_col)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_reference() {
        assert_eq!(CellRef::new(0, 0).to_string(), "A1");
        assert_eq!(CellRef::new(0, 25).to_string(), "Z1");
        assert_eq!(CellRef::new(0, 26).to_string(), "AA1");
        assert_eq!(CellRef::new(99, 701).to_string(), "ZZ100");
    }

    #[test]
    fn test_range_display_and_anchor() {
        let range = CellRange::spanning(CellRef::new(0, 1), 1, 10).unwrap();
        assert_eq!(range.to_string(), "B1:K1");
        assert_eq!(range.anchor(), CellRef::new(0, 1));
        assert_eq!(range.cells().count(), 10);
        assert_eq!(range.cell_count(), 10);
    }

    #[test]
    fn test_range_rejects_empty_span() {
        assert!(CellRange::spanning(CellRef::new(0, 0), 0, 2).is_err());
        assert!(CellRange::new(3, 2, 0, 0).is_err());
    }

    #[test]
    fn test_range_intersects() {
        let a = CellRange::new(0, 1, 0, 3).unwrap();
        let b = CellRange::new(1, 2, 3, 4).unwrap();
        let c = CellRange::new(2, 2, 0, 2).unwrap();
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(!b.intersects(&c));
        assert!(b.contains(CellRef::new(2, 3)));
    }

    #[test]
    fn test_style_codes() {
        assert_eq!(StyleTag::from_code(1), StyleTag::Highlighted);
        assert_eq!(StyleTag::from_code(2), StyleTag::Centered);
        assert_eq!(StyleTag::from_code(7), StyleTag::Default);
        assert_eq!(StyleTag::Centered.code(), 2);
    }

    #[test]
    fn test_title_defaults() {
        let title = TitleSpec::new("Name", 3);
        assert_eq!(title.width, 1);
        assert_eq!(title.height, 1);
        assert_eq!(title.y, None);
        assert_eq!(title.style, StyleTag::Default);
        assert!(!title.is_merged());
        assert!(title.with_height(2).is_merged());
    }

    #[test]
    fn test_row_from_iter() {
        let row: RowSpec = ["a", "b"].into_iter().collect();
        assert_eq!(row.cells.len(), 2);
        assert_eq!(row.cells[1], CellSpec::new("b"));
    }
}
