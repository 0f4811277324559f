//! Shared string table for string deduplication

use super::xml_writer::{needs_space_preserve, XmlWriter};
use crate::error::Result;
use indexmap::IndexSet;
use std::io::Write;

/// Workbook-wide table of unique cell strings
///
/// Cells reference strings by index. Both the SpreadsheetML `sst` part and the
/// BIFF8 `SST` record are built from it.
#[derive(Debug, Default)]
pub struct SharedStrings {
    strings: IndexSet<String>,
    references: u64,
}

impl SharedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a string and get its index
    pub fn add_string(&mut self, s: &str) -> u32 {
        self.references += 1;
        if let Some(index) = self.strings.get_index_of(s) {
            return index as u32;
        }
        let (index, _) = self.strings.insert_full(s.to_string());
        index as u32
    }

    /// Number of unique strings
    pub fn count(&self) -> usize {
        self.strings.len()
    }

    /// Number of cells referencing the table
    pub fn references(&self) -> u64 {
        self.references
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// Write the `xl/sharedStrings.xml` part
    pub fn write_xml<W: Write>(&self, writer: &mut XmlWriter<W>) -> Result<()> {
        writer.declaration()?;
        writer.start_element("sst")?;
        writer.attribute(
            "xmlns",
            "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
        )?;
        writer.attribute_int("count", self.references)?;
        writer.attribute_int("uniqueCount", self.strings.len() as u64)?;
        writer.close_start_tag()?;

        for s in &self.strings {
            writer.start_element("si")?;
            writer.close_start_tag()?;
            writer.start_element("t")?;
            if needs_space_preserve(s) {
                writer.attribute("xml:space", "preserve")?;
            }
            writer.close_start_tag()?;
            writer.write_escaped(s)?;
            writer.end_element("t")?;
            writer.end_element("si")?;
        }

        writer.end_element("sst")?;
        writer.flush()
    }
}
