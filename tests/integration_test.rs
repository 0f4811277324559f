//! Integration tests for excelspec

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xls, Xlsx};
use excelspec::types::{CellSpec, RowSpec, SheetSpec, StyleTag, TitleSpec, WorkbookSpec};
use excelspec::document::{Document, XlsDocument};
use excelspec::{ExcelError, FormatVariant, SheetWriter, WorkbookWriterBuilder};
use tempfile::{tempdir, NamedTempFile};

fn text(range: &Range<Data>, row: u32, col: u32) -> Option<String> {
    match range.get_value((row, col)) {
        Some(Data::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn zip_part(path: &Path, name: &str) -> String {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

fn row_of(values: &[&str]) -> RowSpec {
    values.iter().copied().collect()
}

/// Two merged two-row headers over five columns, then data rows
fn grouped_report() -> WorkbookSpec {
    WorkbookSpec::new(vec![SheetSpec::named("Report")
        .with_titles(vec![
            TitleSpec::new("Group A", 0)
                .with_y(0)
                .with_width(2)
                .with_height(2)
                .with_style(StyleTag::Centered),
            TitleSpec::new("Group B", 2)
                .with_y(0)
                .with_width(3)
                .with_height(2)
                .with_style(StyleTag::Centered),
        ])
        .with_rows(vec![
            row_of(&["a1", "a2", "b1", "b2", "b3"]),
            row_of(&["c1", "c2", "d1", "d2", "d3"]),
        ])])
}

fn save_as(workbook: &WorkbookSpec, format: FormatVariant, file: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join(file);
    WorkbookWriterBuilder::new(format)
        .build()
        .unwrap()
        .save(workbook, &path)
        .unwrap();
    (dir, path)
}

#[test]
fn test_xlsx_merged_headers_roundtrip() {
    let (_dir, path) = save_as(&grouped_report(), FormatVariant::Xlsx, "report.xlsx");

    let mut workbook: Xlsx<BufReader<File>> = open_workbook(&path).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Report".to_string()]);
    let range = workbook.worksheet_range("Report").unwrap();

    assert_eq!(text(&range, 0, 0).as_deref(), Some("Group A"));
    assert_eq!(text(&range, 0, 2).as_deref(), Some("Group B"));
    // Data starts right below the two header rows
    assert_eq!(text(&range, 2, 0).as_deref(), Some("a1"));
    assert_eq!(text(&range, 3, 4).as_deref(), Some("d3"));

    let sheet = zip_part(&path, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains("<mergeCells count=\"2\">"));
    assert!(sheet.contains("<mergeCell ref=\"A1:B2\"/>"));
    assert!(sheet.contains("<mergeCell ref=\"C1:E2\"/>"));
    // Every cell of a merged region carries the centered style
    assert!(sheet.contains("<c r=\"E2\" s=\"1\""));
    assert!(sheet.contains("<c r=\"B1\" s=\"1\""));
}

#[test]
fn test_xls_merged_headers_roundtrip() {
    let (_dir, path) = save_as(&grouped_report(), FormatVariant::Xls, "report.xls");

    let mut workbook: Xls<BufReader<File>> = open_workbook(&path).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["Report".to_string()]);
    let range = workbook.worksheet_range("Report").unwrap();

    assert_eq!(text(&range, 0, 0).as_deref(), Some("Group A"));
    assert_eq!(text(&range, 0, 2).as_deref(), Some("Group B"));
    assert_eq!(text(&range, 2, 1).as_deref(), Some("a2"));
    assert_eq!(text(&range, 3, 4).as_deref(), Some("d3"));

    let mut merges: Vec<_> = workbook
        .worksheet_merge_cells("Report")
        .unwrap()
        .into_iter()
        .map(|dim| (dim.start, dim.end))
        .collect();
    merges.sort();
    assert_eq!(merges, vec![((0, 0), (1, 1)), ((0, 2), (1, 4))]);
}

#[test]
fn test_rows_start_at_top_without_titles() {
    let workbook = WorkbookSpec::new(vec![SheetSpec::named("Plain")
        .with_rows(vec![row_of(&["first", "row"]), row_of(&["second"])])]);

    for (format, file) in [
        (FormatVariant::Xls, "plain.xls"),
        (FormatVariant::Xlsx, "plain.xlsx"),
        (FormatVariant::StreamingXlsx, "plain-stream.xlsx"),
    ] {
        let (_dir, path) = save_as(&workbook, format, file);
        let range = match format {
            FormatVariant::Xls => {
                let mut wb: Xls<BufReader<File>> = open_workbook(&path).unwrap();
                wb.worksheet_range("Plain").unwrap()
            }
            _ => {
                let mut wb: Xlsx<BufReader<File>> = open_workbook(&path).unwrap();
                wb.worksheet_range("Plain").unwrap()
            }
        };

        assert_eq!(text(&range, 0, 0).as_deref(), Some("first"), "{format}");
        assert_eq!(text(&range, 0, 1).as_deref(), Some("row"), "{format}");
        assert_eq!(text(&range, 1, 0).as_deref(), Some("second"), "{format}");
    }
}

#[test]
fn test_body_follows_title_rows() {
    let workbook = WorkbookSpec::new(vec![SheetSpec::new()
        .with_titles(vec![
            TitleSpec::new("Monthly totals", 0).with_y(0).with_width(3),
            TitleSpec::new("Month", 0).with_y(1),
            TitleSpec::new("In", 1).with_y(1),
            TitleSpec::new("Out", 2).with_y(1),
            TitleSpec::new("EUR", 1).with_y(2),
        ])
        .with_rows(vec![row_of(&["Jan", "10", "4"])])]);

    let (_dir, path) = save_as(&workbook, FormatVariant::Xlsx, "titles.xlsx");
    let mut wb: Xlsx<BufReader<File>> = open_workbook(&path).unwrap();
    let range = wb.worksheet_range("Sheet0").unwrap();

    assert_eq!(text(&range, 1, 2).as_deref(), Some("Out"));
    assert_eq!(text(&range, 2, 1).as_deref(), Some("EUR"));
    assert_eq!(text(&range, 3, 0).as_deref(), Some("Jan"));
    assert_eq!(text(&range, 3, 2).as_deref(), Some("4"));
}

#[test]
fn test_highlighted_column_shares_one_style() {
    let sheet = |name: &str| {
        let rows = (0..5)
            .map(|r| {
                (0..8)
                    .map(|c| {
                        let value = format!("{}-{}", r, c);
                        if c == 2 {
                            CellSpec::styled(value, StyleTag::Highlighted)
                        } else {
                            CellSpec::new(value)
                        }
                    })
                    .collect()
            })
            .collect();
        SheetSpec::named(name).with_rows(rows)
    };
    let workbook = WorkbookSpec::new(vec![sheet("North"), sheet("South")]);

    let (_dir, path) = save_as(&workbook, FormatVariant::Xlsx, "regions.xlsx");

    // Base format, then one record per tag in first-use order
    let styles = zip_part(&path, "xl/styles.xml");
    assert!(styles.contains("<cellXfs count=\"3\">"));
    assert!(styles.contains("<color rgb=\"FFFF0000\"/>"));

    for part in ["xl/worksheets/sheet1.xml", "xl/worksheets/sheet2.xml"] {
        let xml = zip_part(&path, part);
        for r in 1..=5 {
            assert!(xml.contains(&format!("<c r=\"A{}\" s=\"1\"", r)));
            assert!(xml.contains(&format!("<c r=\"C{}\" s=\"2\"", r)));
            assert!(xml.contains(&format!("<c r=\"H{}\" s=\"1\"", r)));
        }
    }

    let mut wb: Xlsx<BufReader<File>> = open_workbook(&path).unwrap();
    let range = wb.worksheet_range("South").unwrap();
    assert_eq!(text(&range, 4, 7).as_deref(), Some("4-7"));
}

#[test]
fn test_style_count_independent_of_cell_count() {
    let workbook = |rows: usize| {
        WorkbookSpec::new(vec![SheetSpec::new().with_rows(
            (0..rows)
                .map(|i| {
                    RowSpec::new(vec![
                        CellSpec::new(i.to_string()),
                        CellSpec::styled("!", StyleTag::Highlighted),
                        CellSpec::styled("~", StyleTag::Centered),
                    ])
                })
                .collect(),
        )])
    };

    for rows in [10, 5_000] {
        let (_dir, path) = save_as(&workbook(rows), FormatVariant::Xlsx, "styles.xlsx");
        let styles = zip_part(&path, "xl/styles.xml");
        assert!(styles.contains("<cellXfs count=\"4\">"), "{rows} rows");
    }
}

#[test]
fn test_streaming_large_sheet() {
    let rows: Vec<RowSpec> = (0..12_000)
        .map(|i| {
            let id = format!("id-{}", i);
            let total = (i * 3).to_string();
            row_of(&[id.as_str(), "payload", total.as_str()])
        })
        .collect();
    let workbook = WorkbookSpec::new(vec![SheetSpec::named("Events")
        .with_titles(vec![TitleSpec::new("Event log", 0).with_width(3)])
        .with_rows(rows)]);

    let writer = WorkbookWriterBuilder::new(FormatVariant::StreamingXlsx)
        .with_row_access_window(64)
        .with_compression_level(1)
        .build()
        .unwrap();

    let temp = NamedTempFile::new().unwrap();
    writer.save(&workbook, temp.path()).unwrap();

    let mut wb: Xlsx<BufReader<File>> = open_workbook(temp.path()).unwrap();
    let range = wb.worksheet_range("Events").unwrap();
    assert_eq!(range.height(), 12_001);
    assert_eq!(text(&range, 0, 0).as_deref(), Some("Event log"));
    assert_eq!(text(&range, 1, 0).as_deref(), Some("id-0"));
    assert_eq!(text(&range, 12_000, 0).as_deref(), Some("id-11999"));
    assert_eq!(text(&range, 12_000, 2).as_deref(), Some("35997"));

    let sheet = zip_part(temp.path(), "xl/worksheets/sheet1.xml");
    assert!(sheet.contains("<mergeCell ref=\"A1:C1\"/>"));
}

#[test]
fn test_auto_sheet_names() {
    let workbook = WorkbookSpec::new(vec![
        SheetSpec::new(),
        SheetSpec::named("Data"),
        SheetSpec::new(),
        SheetSpec::named("Sheet4"),
        SheetSpec::new(),
    ]);

    let (_dir, path) = save_as(&workbook, FormatVariant::Xls, "names.xls");
    let wb: Xls<BufReader<File>> = open_workbook(&path).unwrap();
    assert_eq!(
        wb.sheet_names(),
        vec!["Sheet0", "Data", "Sheet2", "Sheet4", "Sheet5"]
    );
}

#[test]
fn test_overlapping_titles_write_nothing() {
    let workbook = WorkbookSpec::new(vec![SheetSpec::named("Clash").with_titles(vec![
        TitleSpec::new("Wide", 0).with_y(0).with_width(4),
        TitleSpec::new("Tall", 3).with_y(0).with_height(3),
    ])]);

    for format in [
        FormatVariant::Xls,
        FormatVariant::Xlsx,
        FormatVariant::StreamingXlsx,
    ] {
        let mut sink = Cursor::new(Vec::new());
        let err = excelspec::write(&workbook, &mut sink, format).unwrap_err();

        assert!(matches!(
            err.root_cause(),
            ExcelError::OverlappingMergedRegion { .. }
        ));
        assert!(err.to_string().contains("'Clash'"), "{err}");
        assert!(sink.get_ref().is_empty());
    }
}

#[test]
fn test_xls_limits_enforced() {
    let wide: RowSpec = (0..300).map(|c| c.to_string()).collect();
    let workbook = WorkbookSpec::new(vec![SheetSpec::new().with_rows(vec![wide])]);

    let mut sink = Vec::new();
    let err = excelspec::write(&workbook, &mut sink, FormatVariant::Xls).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        ExcelError::ColumnOutOfRange { col: 256, max: 256 }
    ));

    // The same row fits in SpreadsheetML
    excelspec::write(&workbook, &mut sink, FormatVariant::Xlsx).unwrap();
    assert!(!sink.is_empty());
}

#[test]
fn test_save_infers_format_and_keeps_failures_off_disk() {
    let dir = tempdir().unwrap();
    let workbook = grouped_report();

    let xls = dir.path().join("report.xls");
    excelspec::save(&workbook, &xls).unwrap();
    let mut header = [0u8; 8];
    File::open(&xls).unwrap().read_exact(&mut header).unwrap();
    assert_eq!(header, [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);

    let xlsx = dir.path().join("report.xlsx");
    excelspec::save(&workbook, &xlsx).unwrap();
    File::open(&xlsx).unwrap().read_exact(&mut header[..4]).unwrap();
    assert_eq!(&header[..4], b"PK\x03\x04");

    assert!(matches!(
        excelspec::save(&workbook, dir.path().join("report.csv")),
        Err(ExcelError::InvalidFormat(_))
    ));

    let broken = WorkbookSpec::new(vec![SheetSpec::named("a:b")]);
    let target = dir.path().join("broken.xlsx");
    assert!(excelspec::save(&broken, &target).is_err());
    assert!(!target.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

fn open_range(path: &Path, format: FormatVariant, sheet: &str) -> Range<Data> {
    match format {
        FormatVariant::Xls => {
            let mut wb: Xls<BufReader<File>> = open_workbook(path).unwrap();
            wb.worksheet_range(sheet).unwrap()
        }
        _ => {
            let mut wb: Xlsx<BufReader<File>> = open_workbook(path).unwrap();
            wb.worksheet_range(sheet).unwrap()
        }
    }
}

#[test]
fn test_two_unnamed_sheets_with_highlighted_column() {
    let sheet = || {
        let rows = (0..5)
            .map(|r| {
                (0..8)
                    .map(|c| {
                        let value = format!("r{}c{}", r, c);
                        if c == 2 {
                            CellSpec::styled(value, StyleTag::Highlighted)
                        } else {
                            CellSpec::new(value)
                        }
                    })
                    .collect()
            })
            .collect();
        SheetSpec::new().with_rows(rows)
    };
    let workbook = WorkbookSpec::new(vec![sheet(), sheet()]);

    // Base format plus one record each for the default and highlighted tags
    let mut writer = SheetWriter::new(XlsDocument::new());
    writer.write_workbook(&workbook).unwrap();
    assert_eq!(writer.document().styles(), 3);

    for (format, file) in [
        (FormatVariant::Xls, "unnamed.xls"),
        (FormatVariant::Xlsx, "unnamed.xlsx"),
    ] {
        let (_dir, path) = save_as(&workbook, format, file);
        for name in ["Sheet0", "Sheet1"] {
            let range = open_range(&path, format, name);
            assert_eq!(range.height(), 5, "{format} {name}");
            assert_eq!(range.width(), 8, "{format} {name}");
            assert_eq!(text(&range, 0, 0).as_deref(), Some("r0c0"));
            assert_eq!(text(&range, 3, 2).as_deref(), Some("r3c2"));
            assert_eq!(text(&range, 4, 7).as_deref(), Some("r4c7"));
        }
    }
}

#[test]
fn test_two_wide_headers_over_subtitles() {
    let mut titles = vec![
        TitleSpec::new("A", 1)
            .with_y(0)
            .with_width(10)
            .with_style(StyleTag::Centered),
        TitleSpec::new("B", 11)
            .with_y(0)
            .with_width(10)
            .with_style(StyleTag::Centered),
    ];
    titles.extend((0..12).map(|x| TitleSpec::new(format!("sub{}", x), x).with_y(1)));
    let workbook = WorkbookSpec::new(vec![SheetSpec::named("Headers")
        .with_titles(titles)
        .with_rows(vec![row_of(&["d0", "d1", "d2"])])]);

    let (_dir, xls) = save_as(&workbook, FormatVariant::Xls, "headers.xls");
    let (_dir2, xlsx) = save_as(&workbook, FormatVariant::Xlsx, "headers.xlsx");

    for (format, path) in [(FormatVariant::Xls, &xls), (FormatVariant::Xlsx, &xlsx)] {
        let range = open_range(path, format, "Headers");
        assert_eq!(text(&range, 0, 1).as_deref(), Some("A"), "{format}");
        assert_eq!(text(&range, 0, 11).as_deref(), Some("B"), "{format}");
        assert_eq!(text(&range, 1, 0).as_deref(), Some("sub0"), "{format}");
        assert_eq!(text(&range, 1, 11).as_deref(), Some("sub11"), "{format}");
        assert_eq!(text(&range, 2, 0).as_deref(), Some("d0"), "{format}");
        assert_eq!(text(&range, 2, 2).as_deref(), Some("d2"), "{format}");
    }

    let mut wb: Xls<BufReader<File>> = open_workbook(&xls).unwrap();
    let mut merges: Vec<_> = wb
        .worksheet_merge_cells("Headers")
        .unwrap()
        .into_iter()
        .map(|dim| (dim.start, dim.end))
        .collect();
    merges.sort();
    assert_eq!(merges, vec![((0, 1), (0, 10)), ((0, 11), (0, 20))]);

    let sheet = zip_part(&xlsx, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains("<mergeCells count=\"2\">"));
    assert!(sheet.contains("<mergeCell ref=\"B1:K1\"/>"));
    assert!(sheet.contains("<mergeCell ref=\"L1:U1\"/>"));
}

#[test]
fn test_xls_large_sheet_roundtrip() {
    let long_text: String = "Long cell text. ".repeat(1250);
    let emoji = "\u{1F600}\u{1F680}".repeat(40);

    let mut rows: Vec<RowSpec> = (0..3000)
        .map(|i| {
            let id = format!("row-{}", i);
            let note = format!("{} #{}", emoji, i);
            row_of(&[id.as_str(), note.as_str(), "shared"])
        })
        .collect();
    rows.push(RowSpec::new(vec![CellSpec::new(long_text.clone())]));

    let workbook = WorkbookSpec::new(vec![SheetSpec::named("Big")
        .with_titles(vec![TitleSpec::new("Big sheet", 0).with_width(3)])
        .with_rows(rows)]);

    let (_dir, path) = save_as(&workbook, FormatVariant::Xls, "big.xls");
    let range = open_range(&path, FormatVariant::Xls, "Big");

    assert_eq!(range.height(), 3002);
    assert_eq!(text(&range, 0, 0).as_deref(), Some("Big sheet"));
    for i in [0u32, 1, 999, 2048, 2999] {
        assert_eq!(text(&range, i + 1, 0), Some(format!("row-{}", i)));
        assert_eq!(text(&range, i + 1, 1), Some(format!("{} #{}", emoji, i)));
        assert_eq!(text(&range, i + 1, 2).as_deref(), Some("shared"));
    }
    assert_eq!(text(&range, 3001, 0), Some(long_text));
}
