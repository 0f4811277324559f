//! Legacy binary workbook (BIFF8 records in an OLE compound file)
//!
//! Layout of the `Workbook` stream:
//!
//! ```text
//! BOF(globals) CODEPAGE WINDOW1 FONT*5 XF*16(style) XF*n(cell) BOUNDSHEET*s SST CONTINUE* EOF
//! BOF(sheet) DIMENSIONS LABELSST|BLANK* WINDOW2 MERGEDCELLS* EOF      (per sheet)
//! ```
//!
//! Style id `k` maps to cell XF `16 + k`. Cell text always lives in the shared
//! string table and is stored as UTF-16.

use std::io::{Cursor, Write};

use super::grid::{SheetGrid, SheetList};
use super::shared_strings::SharedStrings;
use super::styles::{FontColor, HorizontalAlign, StyleDef, StyleId, StyleTable};
use super::{Document, FormatLimits, FormatVariant, SheetId};
use crate::error::{ExcelError, Result};
use crate::types::CellRef;

const RECORD_BOF: u16 = 0x0809;
const RECORD_EOF: u16 = 0x000A;
const RECORD_CODEPAGE: u16 = 0x0042;
const RECORD_WINDOW1: u16 = 0x003D;
const RECORD_FONT: u16 = 0x0031;
const RECORD_XF: u16 = 0x00E0;
const RECORD_BOUNDSHEET: u16 = 0x0085;
const RECORD_SST: u16 = 0x00FC;
const RECORD_CONTINUE: u16 = 0x003C;
const RECORD_DIMENSIONS: u16 = 0x0200;
const RECORD_LABELSST: u16 = 0x00FD;
const RECORD_BLANK: u16 = 0x0201;
const RECORD_WINDOW2: u16 = 0x023E;
const RECORD_MERGEDCELLS: u16 = 0x00E5;

const BOF_VERSION_BIFF8: u16 = 0x0600;
const BOF_DT_WORKBOOK_GLOBALS: u16 = 0x0005;
const BOF_DT_WORKSHEET: u16 = 0x0010;

const CODEPAGE_UTF16: u16 = 1200;

/// Largest record payload; longer data continues in CONTINUE records
const MAX_RECORD_DATA: usize = 8224;
/// Ranges per MERGEDCELLS record
const MAX_MERGES_PER_RECORD: usize = 1026;
/// Characters per cell string
const MAX_STRING_UNITS: usize = 32_767;

const XF_FLAG_LOCKED: u16 = 0x0001;
const XF_FLAG_STYLE: u16 = 0x0004;
const XF_ALIGN_GENERAL_BOTTOM: u8 = 0x20;
const XF_ALIGN_CENTER: u8 = 0x02;
const STYLE_XF_COUNT: u16 = 16;

const COLOR_AUTOMATIC: u16 = 0x7FFF;
const COLOR_RED: u16 = 0x000A;
/// Index of the red FONT record; readers skip index 4
const FONT_RED_INDEX: u16 = 5;

const STRING_FLAG_UTF16: u8 = 0x01;
const WINDOW2_SELECTED: u16 = 0x0200;

/// `.xls` document
#[derive(Debug)]
pub struct XlsDocument {
    sheets: SheetList,
    styles: StyleTable,
}

impl XlsDocument {
    pub fn new() -> Self {
        XlsDocument {
            sheets: SheetList::new(FormatLimits::XLS),
            styles: StyleTable::new(FormatLimits::XLS.max_styles),
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Encode the `Workbook` stream without the compound-file container
    pub fn workbook_stream(&self) -> Result<Vec<u8>> {
        let mut strings = SharedStrings::new();
        let sheet_streams = self
            .sheets
            .iter()
            .enumerate()
            .map(|(i, sheet)| sheet_stream(sheet, i == 0, &mut strings))
            .collect::<Result<Vec<_>>>()?;

        let mut globals = Vec::new();
        push_record(&mut globals, RECORD_BOF, &bof(BOF_DT_WORKBOOK_GLOBALS));
        push_record(&mut globals, RECORD_CODEPAGE, &CODEPAGE_UTF16.to_le_bytes());
        push_record(&mut globals, RECORD_WINDOW1, &window1());

        for _ in 0..4 {
            push_record(&mut globals, RECORD_FONT, &font(COLOR_AUTOMATIC));
        }
        push_record(&mut globals, RECORD_FONT, &font(COLOR_RED));

        for _ in 0..STYLE_XF_COUNT {
            push_record(&mut globals, RECORD_XF, &xf_record(&StyleDef::default(), true));
        }
        for def in self.styles.iter() {
            push_record(&mut globals, RECORD_XF, &xf_record(def, false));
        }

        let mut offset_positions = Vec::with_capacity(sheet_streams.len());
        for sheet in self.sheets.iter() {
            let mut boundsheet = Vec::new();
            boundsheet.extend_from_slice(&0u32.to_le_bytes()); // patched below
            boundsheet.extend_from_slice(&0u16.to_le_bytes()); // visible worksheet
            push_short_string(&mut boundsheet, sheet.name());
            offset_positions.push(globals.len() + 4);
            push_record(&mut globals, RECORD_BOUNDSHEET, &boundsheet);
        }

        push_sst(&mut globals, &strings)?;
        push_record(&mut globals, RECORD_EOF, &[]);

        let mut offset = globals.len();
        for (pos, stream) in offset_positions.iter().zip(&sheet_streams) {
            globals[*pos..*pos + 4].copy_from_slice(&(offset as u32).to_le_bytes());
            offset += stream.len();
        }
        for stream in sheet_streams {
            globals.extend_from_slice(&stream);
        }
        Ok(globals)
    }
}

impl Default for XlsDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for XlsDocument {
    fn variant(&self) -> FormatVariant {
        FormatVariant::Xls
    }

    fn create_sheet(&mut self, name: Option<&str>) -> Result<SheetId> {
        self.sheets.add(name).map(SheetId)
    }

    fn sheet(&self, id: SheetId) -> Result<&SheetGrid> {
        self.sheets.get(id.0)
    }

    fn sheet_mut(&mut self, id: SheetId) -> Result<&mut SheetGrid> {
        self.sheets.get_mut(id.0)
    }

    fn create_style(&mut self, def: StyleDef) -> Result<StyleId> {
        self.styles.push(def)
    }

    fn styles(&self) -> usize {
        self.styles.len()
    }

    fn write_to<W: Write>(self, sink: &mut W) -> Result<u64> {
        let stream = self.workbook_stream()?;

        // Version 3 keeps 512-byte sectors, which BIFF8 readers expect
        let mut ole =
            cfb::CompoundFile::create_with_version(cfb::Version::V3, Cursor::new(Vec::new()))?;
        {
            let mut workbook = ole.create_stream("Workbook")?;
            workbook.write_all(&stream)?;
            workbook.flush()?;
        }
        ole.flush()?;
        let bytes = ole.into_inner().into_inner();

        sink.write_all(&bytes)?;
        sink.flush()?;

        log::debug!(
            "wrote xls workbook: {} sheets, {} styles, {} byte Workbook stream, {} bytes",
            self.sheets.len(),
            self.styles.len(),
            stream.len(),
            bytes.len()
        );
        Ok(bytes.len() as u64)
    }
}

fn sheet_stream(sheet: &SheetGrid, first: bool, strings: &mut SharedStrings) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    push_record(&mut out, RECORD_BOF, &bof(BOF_DT_WORKSHEET));
    push_record(&mut out, RECORD_DIMENSIONS, &dimensions(sheet));

    for (row, cells) in sheet.rows() {
        for (col, cell) in cells.cells() {
            let xf = (STYLE_XF_COUNT as u32 + cell.style().index()) as u16;
            let mut data = Vec::with_capacity(10);
            data.extend_from_slice(&(row as u16).to_le_bytes());
            data.extend_from_slice(&(col as u16).to_le_bytes());
            data.extend_from_slice(&xf.to_le_bytes());
            match cell.value() {
                Some(value) => {
                    if value.encode_utf16().count() > MAX_STRING_UNITS {
                        return Err(ExcelError::InvalidFormat(format!(
                            "cell {} in sheet '{}' holds more than {} characters",
                            CellRef::new(row, col),
                            sheet.name(),
                            MAX_STRING_UNITS
                        )));
                    }
                    data.extend_from_slice(&strings.add_string(value).to_le_bytes());
                    push_record(&mut out, RECORD_LABELSST, &data);
                }
                None => push_record(&mut out, RECORD_BLANK, &data),
            }
        }
    }

    let grbit: u16 = if first { 0x02B6 } else { 0x02B6 & !WINDOW2_SELECTED };
    let mut window2 = [0u8; 18];
    window2[0..2].copy_from_slice(&grbit.to_le_bytes());
    push_record(&mut out, RECORD_WINDOW2, &window2);

    for chunk in sheet.merged_regions().chunks(MAX_MERGES_PER_RECORD) {
        let mut merged = Vec::with_capacity(2 + chunk.len() * 8);
        merged.extend_from_slice(&(chunk.len() as u16).to_le_bytes());
        for region in chunk {
            merged.extend_from_slice(&(region.first_row as u16).to_le_bytes());
            merged.extend_from_slice(&(region.last_row as u16).to_le_bytes());
            merged.extend_from_slice(&(region.first_col as u16).to_le_bytes());
            merged.extend_from_slice(&(region.last_col as u16).to_le_bytes());
        }
        push_record(&mut out, RECORD_MERGEDCELLS, &merged);
    }

    push_record(&mut out, RECORD_EOF, &[]);
    Ok(out)
}

fn push_record(out: &mut Vec<u8>, id: u16, data: &[u8]) {
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
}

fn bof(dt: u16) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..2].copy_from_slice(&BOF_VERSION_BIFF8.to_le_bytes());
    out[2..4].copy_from_slice(&dt.to_le_bytes());
    out[4..6].copy_from_slice(&0x0DBBu16.to_le_bytes()); // build
    out[6..8].copy_from_slice(&0x07CCu16.to_le_bytes()); // year
    out
}

fn window1() -> [u8; 18] {
    let mut out = [0u8; 18];
    out[14..16].copy_from_slice(&1u16.to_le_bytes()); // selected tabs
    out[16..18].copy_from_slice(&600u16.to_le_bytes()); // tab bar ratio
    out
}

/// Arial 10pt in the given palette color
fn font(color: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(26);
    out.extend_from_slice(&200u16.to_le_bytes()); // height in twips
    out.extend_from_slice(&0u16.to_le_bytes()); // flags
    out.extend_from_slice(&color.to_le_bytes());
    out.extend_from_slice(&400u16.to_le_bytes()); // weight
    out.extend_from_slice(&0u16.to_le_bytes()); // escapement
    out.extend_from_slice(&[0, 0, 0, 0]); // underline, family, charset, reserved
    push_short_string(&mut out, "Arial");
    out
}

fn xf_record(def: &StyleDef, is_style_xf: bool) -> [u8; 20] {
    let font_idx = match def.font_color {
        FontColor::Automatic => 0,
        FontColor::Red => FONT_RED_INDEX,
    };
    let mut out = [0u8; 20];
    out[0..2].copy_from_slice(&font_idx.to_le_bytes());
    out[2..4].copy_from_slice(&0u16.to_le_bytes()); // General number format

    let flags = XF_FLAG_LOCKED | if is_style_xf { XF_FLAG_STYLE } else { 0 };
    out[4..6].copy_from_slice(&flags.to_le_bytes());

    out[6] = match def.horizontal_align {
        HorizontalAlign::General => XF_ALIGN_GENERAL_BOTTOM,
        HorizontalAlign::Center => XF_ALIGN_GENERAL_BOTTOM | XF_ALIGN_CENTER,
    };
    out[9] = 0x3F;
    out
}

fn dimensions(sheet: &SheetGrid) -> [u8; 14] {
    let mut out = [0u8; 14];
    let first_row = sheet.rows().next().map(|(r, _)| r);
    let first_col = sheet
        .rows()
        .filter_map(|(_, row)| row.cells().next().map(|(c, _)| c))
        .min();

    if let (Some(first_row), Some(first_col)) = (first_row, first_col) {
        let last_col = sheet.last_col_num().unwrap_or(first_col);
        out[0..4].copy_from_slice(&first_row.to_le_bytes());
        out[4..8].copy_from_slice(&(sheet.last_row_num() + 1).to_le_bytes());
        out[8..10].copy_from_slice(&(first_col as u16).to_le_bytes());
        out[10..12].copy_from_slice(&(last_col as u16 + 1).to_le_bytes());
    }
    out
}

/// ShortXLUnicodeString, always UTF-16
fn push_short_string(out: &mut Vec<u8>, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    out.push(units.len().min(u8::MAX as usize) as u8);
    out.push(STRING_FLAG_UTF16);
    for unit in units.iter().take(u8::MAX as usize) {
        out.extend_from_slice(&unit.to_le_bytes());
    }
}

/// SST record plus CONTINUE records once the table outgrows one record
///
/// A string header never splits; character data splits on UTF-16 unit
/// boundaries (never inside a surrogate pair) and every continued fragment
/// starts with a repeated flags byte.
fn push_sst(out: &mut Vec<u8>, strings: &SharedStrings) -> Result<()> {
    let mut chunks: Vec<Vec<u8>> = Vec::new();
    let mut current = Vec::with_capacity(MAX_RECORD_DATA);
    current.extend_from_slice(&(strings.references() as u32).to_le_bytes());
    current.extend_from_slice(&(strings.count() as u32).to_le_bytes());

    for s in strings.iter() {
        let units: Vec<u16> = s.encode_utf16().collect();
        let header = 3 + 2 * units.len().min(2);
        if MAX_RECORD_DATA - current.len() < header {
            chunks.push(std::mem::replace(
                &mut current,
                Vec::with_capacity(MAX_RECORD_DATA),
            ));
        }
        current.extend_from_slice(&(units.len() as u16).to_le_bytes());
        current.push(STRING_FLAG_UTF16);

        let mut rest = &units[..];
        loop {
            let room = (MAX_RECORD_DATA - current.len()) / 2;
            let mut take = room.min(rest.len());
            if take < rest.len() && take > 0 && is_high_surrogate(rest[take - 1]) {
                take -= 1;
            }
            for unit in &rest[..take] {
                current.extend_from_slice(&unit.to_le_bytes());
            }
            rest = &rest[take..];
            if rest.is_empty() {
                break;
            }
            chunks.push(std::mem::replace(
                &mut current,
                Vec::with_capacity(MAX_RECORD_DATA),
            ));
            current.push(STRING_FLAG_UTF16);
        }
    }
    chunks.push(current);

    if chunks.len() > 1 {
        log::trace!(
            "SST of {} strings spans {} CONTINUE records",
            strings.count(),
            chunks.len() - 1
        );
    }
    for (i, chunk) in chunks.iter().enumerate() {
        let id = if i == 0 { RECORD_SST } else { RECORD_CONTINUE };
        if chunk.len() > MAX_RECORD_DATA {
            return Err(ExcelError::EncodingError(format!(
                "record 0x{:04X} exceeds {} bytes",
                id, MAX_RECORD_DATA
            )));
        }
        push_record(out, id, chunk);
    }
    Ok(())
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..0xDC00).contains(&unit)
}
