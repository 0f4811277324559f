//! SpreadsheetML package parts shared by the two XLSX back-ends

use std::io::{Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::grid::GridRow;
use super::shared_strings::SharedStrings;
use super::styles::{FontColor, HorizontalAlign, StyleTable};
use super::xml_writer::{escape_into, needs_space_preserve, XmlWriter};
use crate::error::Result;
use crate::types::CellRange;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// How cell text is stored in sheet parts
pub(crate) enum CellText<'a> {
    /// Index into `xl/sharedStrings.xml`
    Shared(&'a mut SharedStrings),
    /// Inline `<is>` element, no workbook-wide state
    Inline,
}

pub(crate) fn file_options(compression_level: i64) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(compression_level))
}

/// Append the `<row>` element for `row` to `buf`
pub(crate) fn push_row_xml(buf: &mut Vec<u8>, row_idx: u32, row: &GridRow, text: &mut CellText<'_>) {
    let mut num = itoa::Buffer::new();
    let row_num = row_idx as u64 + 1;

    buf.extend_from_slice(b"<row r=\"");
    buf.extend_from_slice(num.format(row_num).as_bytes());
    if row.is_empty() {
        buf.extend_from_slice(b"\"/>");
        return;
    }
    buf.extend_from_slice(b"\">");

    for (col, cell) in row.cells() {
        buf.extend_from_slice(b"<c r=\"");
        push_column_letter(buf, col);
        buf.extend_from_slice(num.format(row_num).as_bytes());
        buf.push(b'"');

        let style = cell.style().index();
        if style > 0 {
            buf.extend_from_slice(b" s=\"");
            buf.extend_from_slice(num.format(style).as_bytes());
            buf.push(b'"');
        }

        match (cell.value(), &mut *text) {
            (None, _) => buf.extend_from_slice(b"/>"),
            (Some(value), CellText::Shared(strings)) => {
                let index = strings.add_string(value);
                buf.extend_from_slice(b" t=\"s\"><v>");
                buf.extend_from_slice(num.format(index).as_bytes());
                buf.extend_from_slice(b"</v></c>");
            }
            (Some(value), CellText::Inline) => {
                buf.extend_from_slice(b" t=\"inlineStr\"><is><t");
                if needs_space_preserve(value) {
                    buf.extend_from_slice(b" xml:space=\"preserve\"");
                }
                buf.push(b'>');
                escape_into(buf, value);
                buf.extend_from_slice(b"</t></is></c>");
            }
        }
    }

    buf.extend_from_slice(b"</row>");
}

/// Column letters for a 0-based column index
fn push_column_letter(buffer: &mut Vec<u8>, col: u32) {
    let mut n = col + 1;
    let mut tmp = [0u8; 4];
    let mut len = 0;
    while n > 0 {
        let rem = (n - 1) % 26;
        tmp[len] = b'A' + rem as u8;
        len += 1;
        n = (n - 1) / 26;
    }
    buffer.extend(tmp[..len].iter().rev());
}

/// Worksheet prologue up to and including `<sheetData>`
pub(crate) fn sheet_head() -> String {
    format!(
        "{}<worksheet xmlns=\"{}\" xmlns:r=\"{}\"><sheetData>",
        super::xml_writer::XML_DECLARATION,
        NS_MAIN,
        NS_REL
    )
}

/// Worksheet epilogue: closes `sheetData`, lists merged regions
pub(crate) fn write_sheet_tail<W: Write>(writer: &mut W, merged: &[CellRange]) -> Result<()> {
    let mut xml = XmlWriter::new(writer);
    xml.end_element("sheetData")?;

    if !merged.is_empty() {
        xml.start_element("mergeCells")?;
        xml.attribute_int("count", merged.len() as u64)?;
        xml.close_start_tag()?;
        for region in merged {
            xml.start_element("mergeCell")?;
            xml.attribute("ref", &region.to_string())?;
            xml.close_empty()?;
        }
        xml.end_element("mergeCells")?;
    }

    xml.end_element("worksheet")?;
    xml.flush()
}

/// Every package part except the worksheets themselves
pub(crate) fn write_package_parts<Z: Write + Seek>(
    zip: &mut ZipWriter<Z>,
    options: SimpleFileOptions,
    sheet_names: &[&str],
    styles: &StyleTable,
    shared_strings: Option<&SharedStrings>,
) -> Result<()> {
    zip.start_file("[Content_Types].xml", options)?;
    write_content_types(zip, sheet_names.len(), shared_strings.is_some())?;

    zip.start_file("_rels/.rels", options)?;
    write_root_rels(zip)?;

    zip.start_file("docProps/core.xml", options)?;
    write_core_props(zip)?;

    zip.start_file("docProps/app.xml", options)?;
    write_app_props(zip)?;

    zip.start_file("xl/workbook.xml", options)?;
    write_workbook_xml(zip, sheet_names)?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    write_workbook_rels(zip, sheet_names.len(), shared_strings.is_some())?;

    zip.start_file("xl/styles.xml", options)?;
    write_styles(zip, styles)?;

    if let Some(strings) = shared_strings {
        zip.start_file("xl/sharedStrings.xml", options)?;
        strings.write_xml(&mut XmlWriter::new(&mut *zip))?;
    }

    Ok(())
}

fn write_content_types<W: Write>(writer: &mut W, sheets: usize, shared_strings: bool) -> Result<()> {
    let mut xml = XmlWriter::new(writer);
    xml.declaration()?;
    xml.write_str(
        "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>",
    )?;
    for i in 1..=sheets {
        xml.write_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
            i
        ))?;
    }
    xml.write_str("<Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>")?;
    if shared_strings {
        xml.write_str("<Override PartName=\"/xl/sharedStrings.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml\"/>")?;
    }
    xml.write_str(
        "<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>\
<Override PartName=\"/docProps/app.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.extended-properties+xml\"/>\
</Types>",
    )?;
    xml.flush()
}

fn write_root_rels<W: Write>(writer: &mut W) -> Result<()> {
    let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;
    writer.write_all(xml.as_bytes())?;
    Ok(())
}

fn write_core_props<W: Write>(writer: &mut W) -> Result<()> {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let mut xml = XmlWriter::new(writer);
    xml.declaration()?;
    xml.write_str(
        "<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" \
xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">",
    )?;
    xml.text_element("dc:creator", env!("CARGO_PKG_NAME"))?;
    xml.start_element("dcterms:created")?;
    xml.attribute("xsi:type", "dcterms:W3CDTF")?;
    xml.close_start_tag()?;
    xml.write_str(&now)?;
    xml.end_element("dcterms:created")?;
    xml.start_element("dcterms:modified")?;
    xml.attribute("xsi:type", "dcterms:W3CDTF")?;
    xml.close_start_tag()?;
    xml.write_str(&now)?;
    xml.end_element("dcterms:modified")?;
    xml.end_element("cp:coreProperties")?;
    xml.flush()
}

fn write_app_props<W: Write>(writer: &mut W) -> Result<()> {
    let mut xml = XmlWriter::new(writer);
    xml.declaration()?;
    xml.write_str("<Properties xmlns=\"http://schemas.openxmlformats.org/officeDocument/2006/extended-properties\">")?;
    xml.text_element("Application", env!("CARGO_PKG_NAME"))?;
    xml.text_element("DocSecurity", "0")?;
    xml.text_element("ScaleCrop", "false")?;
    xml.text_element("AppVersion", env!("CARGO_PKG_VERSION"))?;
    xml.end_element("Properties")?;
    xml.flush()
}

fn write_workbook_xml<W: Write>(writer: &mut W, sheet_names: &[&str]) -> Result<()> {
    let mut xml = XmlWriter::new(writer);
    xml.declaration()?;
    xml.start_element("workbook")?;
    xml.attribute("xmlns", NS_MAIN)?;
    xml.attribute("xmlns:r", NS_REL)?;
    xml.close_start_tag()?;

    xml.start_element("sheets")?;
    xml.close_start_tag()?;
    for (i, name) in sheet_names.iter().enumerate() {
        let sheet_id = i as u64 + 1;
        xml.start_element("sheet")?;
        xml.attribute("name", name)?;
        xml.attribute_int("sheetId", sheet_id)?;
        xml.attribute("r:id", &format!("rId{}", sheet_id))?;
        xml.close_empty()?;
    }
    xml.end_element("sheets")?;

    xml.end_element("workbook")?;
    xml.flush()
}

fn write_workbook_rels<W: Write>(writer: &mut W, sheets: usize, shared_strings: bool) -> Result<()> {
    let mut xml = XmlWriter::new(writer);
    xml.declaration()?;
    xml.start_element("Relationships")?;
    xml.attribute("xmlns", NS_PKG_REL)?;
    xml.close_start_tag()?;

    for i in 1..=sheets {
        relationship(&mut xml, i, "worksheet", &format!("worksheets/sheet{}.xml", i))?;
    }
    relationship(&mut xml, sheets + 1, "styles", "styles.xml")?;
    if shared_strings {
        relationship(&mut xml, sheets + 2, "sharedStrings", "sharedStrings.xml")?;
    }

    xml.end_element("Relationships")?;
    xml.flush()
}

fn relationship<W: Write>(xml: &mut XmlWriter<W>, id: usize, kind: &str, target: &str) -> Result<()> {
    xml.start_element("Relationship")?;
    xml.attribute("Id", &format!("rId{}", id))?;
    xml.attribute("Type", &format!("{}/{}", NS_REL, kind))?;
    xml.attribute("Target", target)?;
    xml.close_empty()
}

/// `xl/styles.xml`: font 0 is the default font, font 1 the red one
fn write_styles<W: Write>(writer: &mut W, styles: &StyleTable) -> Result<()> {
    let mut xml = XmlWriter::new(writer);
    xml.declaration()?;
    xml.write_str(
        "<styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
<fonts count=\"2\">\
<font><sz val=\"11\"/><name val=\"Calibri\"/><family val=\"2\"/></font>\
<font><sz val=\"11\"/><color rgb=\"FFFF0000\"/><name val=\"Calibri\"/><family val=\"2\"/></font>\
</fonts>\
<fills count=\"2\">\
<fill><patternFill patternType=\"none\"/></fill>\
<fill><patternFill patternType=\"gray125\"/></fill>\
</fills>\
<borders count=\"1\">\
<border><left/><right/><top/><bottom/><diagonal/></border>\
</borders>\
<cellStyleXfs count=\"1\">\
<xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/>\
</cellStyleXfs>",
    )?;

    xml.start_element("cellXfs")?;
    xml.attribute_int("count", styles.len() as u64)?;
    xml.close_start_tag()?;
    for def in styles.iter() {
        let font_id = match def.font_color {
            FontColor::Automatic => 0,
            FontColor::Red => 1,
        };
        xml.start_element("xf")?;
        xml.attribute("numFmtId", "0")?;
        xml.attribute_int("fontId", font_id)?;
        xml.attribute("fillId", "0")?;
        xml.attribute("borderId", "0")?;
        xml.attribute("xfId", "0")?;
        if font_id > 0 {
            xml.attribute("applyFont", "1")?;
        }
        match def.horizontal_align {
            HorizontalAlign::General => xml.close_empty()?,
            HorizontalAlign::Center => {
                xml.attribute("applyAlignment", "1")?;
                xml.close_start_tag()?;
                xml.start_element("alignment")?;
                xml.attribute("horizontal", "center")?;
                xml.close_empty()?;
                xml.end_element("xf")?;
            }
        }
    }
    xml.end_element("cellXfs")?;

    xml.write_str(
        "<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>\
</styleSheet>",
    )?;
    xml.flush()
}
