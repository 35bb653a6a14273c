//! Appends invoice requests for the billed groups to the invoice request ledger (发票申请表).
//!
//! Each group gets two rows: one requesting an ordinary electronic invoice for the official fees
//! and one requesting a special electronic invoice for the agency fees.

use crate::aggregate::GroupSummary;
use crate::config::{LedgerColumn, LedgerLayout};
use crate::error::Res;
use crate::ooxml::{CellRef, Workbook};
use crate::pipeline::Artifact;
use chrono::NaiveDate;
use tracing::debug;

pub const LEDGER_FILE_NAME: &str = "发票申请表.xlsx";
pub const ORDINARY_INVOICE: &str = "普通发票（电子）";
pub const SPECIAL_INVOICE: &str = "专用发票（电子）";
/// Row 1 holds the ledger's headers.
pub const FIRST_DATA_ROW: u32 = 2;
const LEDGER_DATE_FORMAT: &str = "%Y-%m-%d";

/// The labels written into every ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLabels<'a> {
    pub company: &'a str,
    pub office: &'a str,
}

/// Writes two rows per summary into the first worksheet of `template`, starting at the first row
/// from row 2 on whose invoice type cell is empty. Returns `None` when there is nothing to write.
pub fn append_ledger(
    summaries: &[GroupSummary],
    template: &[u8],
    layout: &LedgerLayout,
    labels: &LedgerLabels<'_>,
    run_date: NaiveDate,
) -> Res<Option<Artifact>> {
    if summaries.is_empty() {
        return Ok(None);
    }
    let mut workbook = Workbook::from_bytes(template)?;
    let mut row = workbook.first_empty_row(layout.invoice_type.index(), FIRST_DATA_ROW);
    debug!("Appending {} ledger rows from row {row}", summaries.len() * 2);

    let date = run_date.format(LEDGER_DATE_FORMAT).to_string();
    for summary in summaries {
        for (invoice_type, fee) in [
            (ORDINARY_INVOICE, summary.official_total),
            (SPECIAL_INVOICE, summary.agency_total),
        ] {
            let mut writer = RowWriter {
                workbook: &mut workbook,
                row,
            };
            writer.text(layout.invoice_type, invoice_type)?;
            writer.text(layout.applicant, &summary.applicant)?;
            writer.text(layout.case_reference, &summary.case_reference)?;
            for column in layout.fee {
                writer.number(column, fee)?;
            }
            writer.number(layout.grand_total, summary.grand_total)?;
            for column in layout.company {
                writer.text(column, labels.company)?;
            }
            writer.text(layout.office, labels.office)?;
            writer.text(layout.date, &date)?;
            row += 1;
        }
    }

    Ok(Some(Artifact::new(LEDGER_FILE_NAME, workbook.to_bytes()?)))
}

struct RowWriter<'a> {
    workbook: &'a mut Workbook,
    row: u32,
}

impl RowWriter<'_> {
    fn text(&mut self, column: LedgerColumn, value: &str) -> Res<()> {
        self.workbook
            .set_text(CellRef::new(self.row, column.index()), value)
    }

    fn number(&mut self, column: LedgerColumn, value: i64) -> Res<()> {
        self.workbook
            .set_number(CellRef::new(self.row, column.index()), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{ledger_xlsx, run_date};

    fn summary(key: &str, applicant: &str, official: i64, agency: i64) -> GroupSummary {
        GroupSummary {
            group_key: key.to_string(),
            applicant: applicant.to_string(),
            case_reference: format!("JJ-{key}"),
            official_total: official,
            agency_total: agency,
            grand_total: official + agency,
            file_name: format!("{key}.docx"),
        }
    }

    fn labels() -> LedgerLabels<'static> {
        LedgerLabels {
            company: "深佳",
            office: "专利代理部",
        }
    }

    fn text(workbook: &Workbook, cell: &str) -> Option<String> {
        workbook.cell_text(cell.parse().unwrap())
    }

    #[test]
    fn test_nothing_to_append() {
        let out = append_ledger(
            &[],
            &ledger_xlsx(),
            &LedgerLayout::default(),
            &labels(),
            run_date(),
        )
        .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_two_rows_per_group() {
        let summaries = [summary("F1", "甲公司", 1500, 3000), summary("F2", "乙公司", 500, 1000)];
        let artifact = append_ledger(
            &summaries,
            &ledger_xlsx(),
            &LedgerLayout::default(),
            &labels(),
            run_date(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(artifact.file_name(), "发票申请表.xlsx");

        let wb = Workbook::from_bytes(artifact.bytes()).unwrap();
        let invoice_types: Vec<Option<String>> =
            (2..=6).map(|r| text(&wb, &format!("A{r}"))).collect();
        assert_eq!(
            invoice_types,
            vec![
                Some(ORDINARY_INVOICE.to_string()),
                Some(SPECIAL_INVOICE.to_string()),
                Some(ORDINARY_INVOICE.to_string()),
                Some(SPECIAL_INVOICE.to_string()),
                None,
            ]
        );

        // Ordinary invoice row: the official total in both fee columns.
        assert_eq!(text(&wb, "B2").as_deref(), Some("甲公司"));
        assert_eq!(text(&wb, "C2").as_deref(), Some("JJ-F1"));
        assert_eq!(text(&wb, "D2").as_deref(), Some("1500"));
        assert_eq!(text(&wb, "E2").as_deref(), Some("1500"));
        assert_eq!(text(&wb, "F2").as_deref(), Some("4500"));
        assert_eq!(text(&wb, "G2").as_deref(), Some("深佳"));
        assert_eq!(text(&wb, "I2").as_deref(), Some("深佳"));
        assert_eq!(text(&wb, "J2").as_deref(), Some("专利代理部"));
        assert_eq!(text(&wb, "K2").as_deref(), Some("2024-03-15"));

        // Special invoice row: the agency total.
        assert_eq!(text(&wb, "D3").as_deref(), Some("3000"));
        assert_eq!(text(&wb, "E3").as_deref(), Some("3000"));
        assert_eq!(text(&wb, "F3").as_deref(), Some("4500"));
        assert_eq!(text(&wb, "B5").as_deref(), Some("乙公司"));

        // The header row is untouched.
        assert_eq!(text(&wb, "A1").as_deref(), Some("发票类型"));
    }

    #[test]
    fn test_appends_after_existing_rows() {
        let summaries = [summary("F1", "甲公司", 1, 2)];
        let first = append_ledger(
            &summaries,
            &ledger_xlsx(),
            &LedgerLayout::default(),
            &labels(),
            run_date(),
        )
        .unwrap()
        .unwrap();
        let second = append_ledger(
            &summaries,
            first.bytes(),
            &LedgerLayout::default(),
            &labels(),
            run_date(),
        )
        .unwrap()
        .unwrap();
        let wb = Workbook::from_bytes(second.bytes()).unwrap();
        assert_eq!(text(&wb, "A4").as_deref(), Some(ORDINARY_INVOICE));
        assert_eq!(text(&wb, "A5").as_deref(), Some(SPECIAL_INVOICE));
        assert_eq!(text(&wb, "A6"), None);
    }

    #[test]
    fn test_custom_layout() {
        let layout = LedgerLayout {
            date: LedgerColumn::parse("M").unwrap(),
            ..LedgerLayout::default()
        };
        let artifact = append_ledger(
            &[summary("F1", "甲公司", 1, 2)],
            &ledger_xlsx(),
            &layout,
            &labels(),
            run_date(),
        )
        .unwrap()
        .unwrap();
        let wb = Workbook::from_bytes(artifact.bytes()).unwrap();
        assert_eq!(text(&wb, "M2").as_deref(), Some("2024-03-15"));
        assert_eq!(text(&wb, "K2"), None);
    }

    #[test]
    fn test_unreadable_template() {
        let result = append_ledger(
            &[summary("F1", "甲公司", 1, 2)],
            b"not a workbook",
            &LedgerLayout::default(),
            &labels(),
            run_date(),
        );
        assert!(result.is_err());
    }
}
