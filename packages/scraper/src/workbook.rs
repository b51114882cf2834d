//! XLSX workbook reader.
//!
//! Reads the first worksheet of a workbook into a [`Table`]: the first row
//! becomes the header row and every cell is rendered as text.

use std::io::Cursor;

use calamine::{Data, Reader as _, Xlsx};

use crate::delimited::clean_header;
use crate::{ScrapeError, Table};

/// Renders a cell as text. Date cells become `YYYY-MM-DDTHH:MM:SS`.
#[must_use]
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_owned(),
        Data::DateTime(dt) => dt.as_datetime().map_or_else(
            || dt.as_f64().to_string(),
            |naive| naive.format("%Y-%m-%dT%H:%M:%S").to_string(),
        ),
        other => other.to_string().trim().to_owned(),
    }
}

/// Reads the first worksheet of an in-memory XLSX workbook.
///
/// # Errors
///
/// Returns [`ScrapeError::Workbook`] if the bytes are not a readable
/// workbook, or [`ScrapeError::Parse`] if it has no worksheet or no header
/// row.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Table, ScrapeError> {
    let mut workbook: Xlsx<_> = calamine::open_workbook_from_rs(Cursor::new(bytes))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ScrapeError::Parse("workbook has no worksheets".to_owned()))??;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| ScrapeError::Parse("worksheet has no header row".to_owned()))?
        .iter()
        .map(|cell| clean_header(&cell_to_string(cell)))
        .collect();

    let rows: Vec<Vec<String>> = rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    log::debug!(
        "Read worksheet with {} rows x {} columns",
        rows.len(),
        headers.len()
    );

    Ok(Table { headers, rows })
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/></Types>"#;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Reclamacoes" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#;

    // Style 1 uses built-in format 22 (`m/d/yy h:mm`), which marks dates.
    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="22" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

    const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4"><si><t>Marca</t></si><si><t xml:space="preserve"> Data Abertura </t></si><si><t>CLARO S/A</t></si><si><t>VIVO</t></si></sst>"#;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:B3"/><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row><row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2" s="1"><v>45000.5</v></c></row><row r="3"><c r="A3" t="s"><v>3</v></c><c r="B3" s="1"><v>45001.25</v></c></row></sheetData></worksheet>"#;

    fn build_workbook() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, data) in [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            ("xl/styles.xml", STYLES),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/worksheets/sheet1.xml", SHEET),
        ] {
            writer.start_file(name, options).unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn reads_headers_and_dates_from_first_sheet() {
        let table = read_first_sheet(&build_workbook()).unwrap();

        assert_eq!(table.headers, vec!["Marca", "Data Abertura"]);
        assert_eq!(
            table.rows,
            vec![
                vec!["CLARO S/A".to_owned(), "2023-03-15T12:00:00".to_owned()],
                vec!["VIVO".to_owned(), "2023-03-16T06:00:00".to_owned()],
            ]
        );
    }

    #[test]
    fn renders_plain_cells() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("  CLARO ".to_owned())), "CLARO");
        assert_eq!(cell_to_string(&Data::Int(42)), "42");
        assert_eq!(
            cell_to_string(&Data::DateTimeIso("2023-03-01T10:00:00".to_owned())),
            "2023-03-01T10:00:00"
        );
    }

    #[test]
    fn rejects_bytes_that_are_not_a_workbook() {
        let result = read_first_sheet(b"not a workbook");
        assert!(matches!(result, Err(ScrapeError::Workbook(_))));
    }
}
