//! Shared test fixtures: minimal `.docx` and `.xlsx` packages built in memory, and a sample fee
//! list.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::model::Table;
use crate::ooxml::write_zip;
use chrono::NaiveDate;

const DOCX_CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"</Types>"#,
);

const DOCX_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#,
);

/// A billing template body: three placeholder paragraphs (one split across runs), an uppercase
/// amount paragraph and a one-row, three-column table.
pub(crate) const BILLING_DOCUMENT_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    r#"<w:body>"#,
    r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>致：{{申请人}}</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>合计{{合计}}元</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>{{日</w:t></w:r><w:r><w:t>期}}</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>大写：{{大写}}</w:t></w:r></w:p>"#,
    r#"<w:tbl>"#,
    r#"<w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr>"#,
    r#"<w:tblGrid><w:gridCol w:w="2000"/><w:gridCol w:w="2000"/><w:gridCol w:w="2000"/></w:tblGrid>"#,
    r#"<w:tr>"#,
    r#"<w:tc><w:tcPr><w:tcW w:w="2000" w:type="dxa"/></w:tcPr>"#,
    r#"<w:p><w:pPr><w:spacing w:after="0"/><w:rPr><w:b/></w:rPr></w:pPr>"#,
    r#"<w:r><w:rPr><w:b/></w:rPr><w:t>项目</w:t></w:r></w:p></w:tc>"#,
    r#"<w:tc><w:tcPr><w:tcW w:w="2000" w:type="dxa"/></w:tcPr><w:p/></w:tc>"#,
    r#"<w:tc><w:tcPr><w:tcW w:w="2000" w:type="dxa"/></w:tcPr><w:p/></w:tc>"#,
    r#"</w:tr>"#,
    r#"</w:tbl>"#,
    r#"<w:sectPr/>"#,
    r#"</w:body>"#,
    r#"</w:document>"#,
);

/// Packs `document_xml` as the main part of a `.docx`.
pub(crate) fn docx_bytes(document_xml: &str) -> Vec<u8> {
    write_zip([
        ("[Content_Types].xml", DOCX_CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", DOCX_RELS.as_bytes()),
        ("word/document.xml", document_xml.as_bytes()),
    ])
    .unwrap()
}

pub(crate) fn billing_docx() -> Vec<u8> {
    docx_bytes(BILLING_DOCUMENT_XML)
}

const XLSX_CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#,
    r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
    r#"</Types>"#,
);

const XLSX_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#,
);

const XLSX_WORKBOOK: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    r#"<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>"#,
    r#"</workbook>"#,
);

const XLSX_STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="2"><font><sz val="11"/></font><font><b/><sz val="11"/></font></fonts>"#,
    r#"<cellXfs count="2"><xf numFmtId="0" fontId="0"/><xf numFmtId="0" fontId="1" applyFont="1"/></cellXfs>"#,
    r#"</styleSheet>"#,
);

/// An invoice request ledger with a header row only. Two headers are shared strings, one is an
/// inline string.
pub(crate) const LEDGER_SHEET_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<dimension ref="A1:C1"/>"#,
    r#"<sheetData>"#,
    r#"<row r="1" spans="1:3">"#,
    r#"<c r="A1" s="1" t="s"><v>0</v></c>"#,
    r#"<c r="B1" s="1" t="s"><v>1</v></c>"#,
    r#"<c r="C1" t="inlineStr"><is><t>案号</t></is></c>"#,
    r#"</row>"#,
    r#"</sheetData>"#,
    r#"</worksheet>"#,
);

/// A fee list with a shared string header row and two data rows.
pub(crate) const FEE_LIST_SHEET_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<dimension ref="A1:D3"/>"#,
    r#"<sheetData>"#,
    r#"<row r="1">"#,
    r#"<c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c>"#,
    r#"<c r="C1" t="s"><v>2</v></c><c r="D1" t="s"><v>3</v></c>"#,
    r#"</row>"#,
    r#"<row r="2">"#,
    r#"<c r="A2" t="inlineStr"><is><t>F1</t></is></c>"#,
    r#"<c r="B2" t="inlineStr"><is><t>甲公司</t></is></c>"#,
    r#"<c r="C2"><v>1000</v></c><c r="D2"><v>500</v></c>"#,
    r#"</row>"#,
    r#"<row r="3">"#,
    r#"<c r="A3" t="inlineStr"><is><t>F2</t></is></c>"#,
    r#"<c r="B3" t="inlineStr"><is><t>乙公司</t></is></c>"#,
    r#"<c r="C3"><v>100</v></c><c r="D3"><v>250.5</v></c>"#,
    r#"</row>"#,
    r#"</sheetData>"#,
    r#"</worksheet>"#,
);

/// A billing template: placeholders in row 1 and a stale value in row 3 where the data starts.
const BILLING_SHEET_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<dimension ref="A1:C3"/>"#,
    r#"<sheetData>"#,
    r#"<row r="1">"#,
    r#"<c r="A1" s="1" t="s"><v>0</v></c>"#,
    r#"<c r="B1" t="inlineStr"><is><t>合计：{{合计}}</t></is></c>"#,
    r#"<c r="C1" t="s"><v>1</v></c>"#,
    r#"</row>"#,
    r#"<row r="3"><c r="A3" t="inlineStr"><is><t>示例</t></is></c></row>"#,
    r#"</sheetData>"#,
    r#"</worksheet>"#,
);

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Packs `sheet_xml` as the only worksheet of an `.xlsx`, with `shared_strings` as its shared
/// string table.
pub(crate) fn xlsx_bytes(sheet_xml: &str, shared_strings: &[&str]) -> Vec<u8> {
    let mut workbook_rels = String::from(concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
        r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    ));
    if !shared_strings.is_empty() {
        workbook_rels.push_str(
            r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
        );
    }
    workbook_rels.push_str("</Relationships>");

    let items: String = shared_strings
        .iter()
        .map(|s| format!("<si><t>{}</t></si>", xml_escape(s)))
        .collect();
    let shared_strings_xml = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{n}" uniqueCount="{n}">"#,
            "{items}</sst>",
        ),
        n = shared_strings.len(),
        items = items,
    );

    write_zip([
        ("[Content_Types].xml", XLSX_CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", XLSX_RELS.as_bytes()),
        ("xl/workbook.xml", XLSX_WORKBOOK.as_bytes()),
        ("xl/_rels/workbook.xml.rels", workbook_rels.as_bytes()),
        ("xl/worksheets/sheet1.xml", sheet_xml.as_bytes()),
        ("xl/sharedStrings.xml", shared_strings_xml.as_bytes()),
        ("xl/styles.xml", XLSX_STYLES.as_bytes()),
    ])
    .unwrap()
}

pub(crate) fn ledger_xlsx() -> Vec<u8> {
    xlsx_bytes(LEDGER_SHEET_XML, &["发票类型", "申请人"])
}

pub(crate) fn billing_xlsx() -> Vec<u8> {
    xlsx_bytes(BILLING_SHEET_XML, &["请款单 {{申请人}}", "{{日期}}"])
}

pub(crate) fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

/// Two groups, F1 and F2, interleaved. F2's first row has no primary case number.
pub(crate) fn sample_table() -> Table {
    Table::parse(vec![
        vec!["序号", "分割号", "申请人", "集佳案号", "我方案号", "官费", "代理费"],
        vec!["1", "F1", "甲公司", "JJ2024001", "W001", "500", "1000"],
        vec!["2", "F2", "乙公司", "", "W002", "300", "600"],
        vec!["3", "F1", "甲公司", "JJ2024002", "", "1000", "2000"],
        vec!["4", "F2", "乙公司", "JJ2024003", "", "200", "400"],
    ])
    .unwrap()
}
