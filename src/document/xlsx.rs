//! SpreadsheetML workbook held entirely in memory

use std::io::{Cursor, Write};

use zip::ZipWriter;

use super::grid::{SheetGrid, SheetList};
use super::ooxml::{self, CellText};
use super::shared_strings::SharedStrings;
use super::styles::{StyleDef, StyleId, StyleTable};
use super::{Document, FormatLimits, FormatVariant, SheetId};
use crate::error::Result;

/// Default deflate level of package parts
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// `.xlsx` document; every row stays in memory until [`Document::write_to`]
#[derive(Debug)]
pub struct XlsxDocument {
    sheets: SheetList,
    styles: StyleTable,
    compression_level: u32,
}

impl XlsxDocument {
    pub fn new() -> Self {
        Self::with_compression_level(DEFAULT_COMPRESSION_LEVEL)
    }

    /// Deflate level 0-9 for the package parts
    pub fn with_compression_level(level: u32) -> Self {
        XlsxDocument {
            sheets: SheetList::new(FormatLimits::XLSX),
            styles: StyleTable::new(FormatLimits::XLSX.max_styles),
            compression_level: level.min(9),
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn style_table(&self) -> &StyleTable {
        &self.styles
    }
}

impl Default for XlsxDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for XlsxDocument {
    fn variant(&self) -> FormatVariant {
        FormatVariant::Xlsx
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
        let options = ooxml::file_options(self.compression_level as i64);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let mut strings = SharedStrings::new();
        let mut row_xml = Vec::with_capacity(8192);

        for (i, sheet) in self.sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
            zip.write_all(ooxml::sheet_head().as_bytes())?;

            let mut text = CellText::Shared(&mut strings);
            for (idx, row) in sheet.rows() {
                row_xml.clear();
                ooxml::push_row_xml(&mut row_xml, idx, row, &mut text);
                zip.write_all(&row_xml)?;
            }
            ooxml::write_sheet_tail(&mut zip, sheet.merged_regions())?;
        }

        let names: Vec<&str> = self.sheets.names().collect();
        ooxml::write_package_parts(&mut zip, options, &names, &self.styles, Some(&strings))?;

        let bytes = zip.finish()?.into_inner();
        sink.write_all(&bytes)?;
        sink.flush()?;

        log::debug!(
            "wrote xlsx workbook: {} sheets, {} styles, {} unique strings, {} bytes",
            names.len(),
            self.styles.len(),
            strings.count(),
            bytes.len()
        );
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellRef;
    use std::io::Read;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut xml = String::new();
        part.read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn test_write_package() {
        let mut doc = XlsxDocument::new();
        let sheet = doc.create_sheet(Some("Data")).unwrap();
        let red = doc.create_style(StyleDef::red_font()).unwrap();
        doc.create_row(sheet, 0).unwrap();
        let at = CellRef::new(0, 1);
        let grid = doc.sheet_mut(sheet).unwrap();
        grid.create_cell(at).unwrap();
        grid.set_cell_value(at, "Hello").unwrap();
        doc.set_cell_style(sheet, at, red).unwrap();

        let mut out = Vec::new();
        let written = doc.write_to(&mut out).unwrap();
        assert_eq!(written, out.len() as u64);

        let workbook = read_part(&out, "xl/workbook.xml");
        assert!(workbook.contains("<sheet name=\"Data\" sheetId=\"1\" r:id=\"rId1\"/>"));

        let sheet_xml = read_part(&out, "xl/worksheets/sheet1.xml");
        assert!(sheet_xml.contains("<c r=\"B1\" s=\"1\" t=\"s\"><v>0</v></c>"));

        let strings = read_part(&out, "xl/sharedStrings.xml");
        assert!(strings.contains("<t>Hello</t>"));

        let types = read_part(&out, "[Content_Types].xml");
        assert!(types.contains("/xl/worksheets/sheet1.xml"));
    }

    #[test]
    fn test_unknown_style_rejected() {
        let mut doc = XlsxDocument::new();
        let sheet = doc.create_sheet(None).unwrap();
        doc.create_row(sheet, 0).unwrap();
        doc.sheet_mut(sheet)
            .unwrap()
            .create_cell(CellRef::new(0, 0))
            .unwrap();
        let err = doc
            .set_cell_style(sheet, CellRef::new(0, 0), StyleId(5))
            .unwrap_err();
        assert!(matches!(err, crate::error::ExcelError::StyleNotFound(5)));
    }
}
