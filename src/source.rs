//! Reads the fee list into a `Table`, from the first worksheet of an Excel workbook or from a CSV
//! file. Every cell becomes text; numbers that are whole are written without a fraction so that
//! `100.0` in a sheet reads back as `100`.

use crate::error::Res;
use crate::model::Table;
use crate::utils;
use anyhow::{bail, Context};
use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Reads `path`, choosing the format by its extension.
pub(crate) fn read_table(path: &Path) -> Res<Table> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let bytes = utils::read_bytes(path)?;
    let table = match extension.as_str() {
        "xlsx" | "xlsm" => read_xlsx(&bytes),
        "csv" => read_csv(&bytes),
        _ => bail!(
            "Unsupported fee list '{}', expected an .xlsx, .xlsm or .csv file",
            path.display()
        ),
    }
    .with_context(|| format!("Unable to read the fee list '{}'", path.display()))?;
    debug!(
        "Read {} rows with columns {:?} from {}",
        table.len(),
        table.headers(),
        path.display()
    );
    Ok(table)
}

pub(crate) fn read_xlsx(bytes: &[u8]) -> Res<Table> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).context("The file is not an Excel workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("The workbook has no worksheets")?
        .context("Unable to read the first worksheet")?;
    Table::parse(
        range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<Vec<_>>()),
    )
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_text(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(dt) if dt.time() == chrono::NaiveTime::MIN => dt.format("%Y-%m-%d").to_string(),
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

fn float_text(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

pub(crate) fn read_csv(bytes: &[u8]) -> Res<Table> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut rows = Vec::new();
    for (ix, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed CSV record {}", ix + 1))?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    Table::parse(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{xlsx_bytes, FEE_LIST_SHEET_XML};
    use tempfile::TempDir;

    #[test]
    fn test_read_csv() {
        let csv = "\u{feff}分割号,申请人,官费,代理费\nF1,甲公司,\"1,000\",500\n,,,\nF2,乙公司,abc\n";
        let table = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "分割号"), Some("F1"));
        assert_eq!(table.cell(0, "官费"), Some("1,000"));
        assert_eq!(table.cell(1, "代理费"), Some(""));
    }

    #[test]
    fn test_read_xlsx() {
        let bytes = xlsx_bytes(FEE_LIST_SHEET_XML, &["分割号", "申请人", "官费", "代理费"]);
        let table = read_xlsx(&bytes).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "申请人"), Some("甲公司"));
        assert_eq!(table.cell(0, "官费"), Some("1000"));
        assert_eq!(table.cell(1, "代理费"), Some("250.5"));
    }

    #[test]
    fn test_float_text() {
        assert_eq!(float_text(100.0), "100");
        assert_eq!(float_text(-3.0), "-3");
        assert_eq!(float_text(0.5), "0.5");
    }

    #[test]
    fn test_read_table_by_extension() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("fees.CSV");
        utils::write(&csv, "分割号,官费\nF1,1\n").unwrap();
        assert_eq!(read_table(&csv).unwrap().len(), 1);

        let txt = dir.path().join("fees.txt");
        utils::write(&txt, "x").unwrap();
        let err = read_table(&txt).unwrap_err();
        assert!(err.to_string().contains("Unsupported fee list"));
    }

    #[test]
    fn test_read_table_not_a_workbook() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fees.xlsx");
        utils::write(&path, "not a zip").unwrap();
        assert!(read_table(&path).is_err());
    }
}
