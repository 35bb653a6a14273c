//! Splits the fee list into billing groups, one per distinct value of the grouping column, and
//! computes the totals that go on each group's billing document.

use crate::config::ColumnNames;
use crate::error::Res;
use crate::model::{Amount, Mapping, Table};
use anyhow::bail;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

/// Separator between case references in the ledger.
pub const CASE_REFERENCE_SEPARATOR: &str = "、";

/// Fee totals for one group. Totals are summed exactly and only truncated to whole yuan when
/// they are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupTotals {
    official: Amount,
    agency: Amount,
    grand: Amount,
}

impl GroupTotals {
    pub fn new(official: Amount, agency: Amount) -> Self {
        Self {
            official,
            agency,
            grand: official + agency,
        }
    }

    pub fn official(&self) -> Amount {
        self.official
    }

    pub fn agency(&self) -> Amount {
        self.agency
    }

    pub fn grand(&self) -> Amount {
        self.grand
    }
}

/// All rows of the fee list that share a grouping key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    key: String,
    applicant: String,
    case_reference: String,
    totals: GroupTotals,
    table: Table,
    official_column: String,
    agency_column: String,
}

impl Group {
    pub(crate) fn from_parts(
        key: impl Into<String>,
        applicant: impl Into<String>,
        case_reference: impl Into<String>,
        totals: GroupTotals,
        table: Table,
        columns: &ColumnNames,
    ) -> Self {
        Self {
            key: key.into(),
            applicant: applicant.into(),
            case_reference: case_reference.into(),
            totals,
            table,
            official_column: columns.official_fee.clone(),
            agency_column: columns.agency_fee.clone(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The applicant of the group's first row.
    pub fn applicant(&self) -> &str {
        &self.applicant
    }

    /// The case numbers of the group's rows joined by `、`.
    pub fn case_reference(&self) -> &str {
        &self.case_reference
    }

    pub fn totals(&self) -> GroupTotals {
        self.totals
    }

    /// The group's rows as they are printed: a fresh `序号` column first, without the grouping
    /// column.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// The names of the official and agency fee columns in `table()`.
    pub fn fee_columns(&self) -> (&str, &str) {
        (&self.official_column, &self.agency_column)
    }

    pub fn summary(&self, file_name: impl Into<String>) -> GroupSummary {
        GroupSummary {
            group_key: self.key.clone(),
            applicant: self.applicant.clone(),
            case_reference: self.case_reference.clone(),
            official_total: self.totals.official.whole(),
            agency_total: self.totals.agency.whole(),
            grand_total: self.totals.grand.whole(),
            file_name: file_name.into(),
        }
    }
}

/// What the ledger needs to know about a group that was billed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub group_key: String,
    pub applicant: String,
    pub case_reference: String,
    pub official_total: i64,
    pub agency_total: i64,
    pub grand_total: i64,
    pub file_name: String,
}

/// Groups the rows of `table` by the grouping column, keeping groups in the order their keys are
/// first seen.
///
/// # Errors
/// The grouping column and both fee columns must exist.
pub fn aggregate(table: &Table, columns: &ColumnNames) -> Res<Vec<Group>> {
    let mapping = table.mapping();
    let missing: Vec<&str> = [
        columns.group_key.as_str(),
        columns.official_fee.as_str(),
        columns.agency_fee.as_str(),
    ]
    .into_iter()
    .filter(|name| !mapping.contains(name))
    .collect();
    if !missing.is_empty() {
        bail!(
            "The fee list is missing the required column(s) {}",
            missing.join(", ")
        );
    }

    let mut keyed: IndexMap<String, Vec<usize>> = IndexMap::new();
    for row in 0..table.len() {
        let key = cell(table, row, &columns.group_key);
        keyed.entry(key.to_string()).or_default().push(row);
    }

    let layout = GroupLayout::new(mapping, columns);
    let groups = keyed
        .into_iter()
        .map(|(key, rows)| build_group(table, columns, &layout, key, &rows))
        .collect::<Res<Vec<_>>>()?;
    debug!("Split {} rows into {} groups", table.len(), groups.len());
    Ok(groups)
}

/// The trimmed cell, empty when the column does not exist.
fn cell<'a>(table: &'a Table, row: usize, header: &str) -> &'a str {
    table.cell(row, header).map(str::trim).unwrap_or_default()
}

/// The columns of a group table and where each one comes from in the source table.
struct GroupLayout {
    mapping: Mapping,
    source_columns: Vec<usize>,
}

impl GroupLayout {
    fn new(source: &Mapping, columns: &ColumnNames) -> Self {
        let source_columns: Vec<usize> = source
            .headers()
            .iter()
            .enumerate()
            .filter(|(_, h)| {
                let name: &str = h.as_ref();
                name != columns.group_key && name != columns.sequence
            })
            .map(|(ix, _)| ix)
            .collect();
        let headers = std::iter::once(columns.sequence.clone()).chain(
            source_columns
                .iter()
                .map(|&ix| source.headers()[ix].to_string()),
        );
        Self {
            mapping: Mapping::new(headers),
            source_columns,
        }
    }
}

fn build_group(
    table: &Table,
    columns: &ColumnNames,
    layout: &GroupLayout,
    key: String,
    rows: &[usize],
) -> Res<Group> {
    let official: Amount = rows
        .iter()
        .map(|&r| Amount::parse_or_zero(cell(table, r, &columns.official_fee)))
        .sum();
    let agency: Amount = rows
        .iter()
        .map(|&r| Amount::parse_or_zero(cell(table, r, &columns.agency_fee)))
        .sum();

    let applicant = rows
        .first()
        .map(|&r| cell(table, r, &columns.applicant))
        .unwrap_or_default()
        .to_string();

    let case_reference = rows
        .iter()
        .filter_map(|&r| {
            let primary = cell(table, r, &columns.primary_case_number);
            let internal = cell(table, r, &columns.internal_case_number);
            [primary, internal].into_iter().find(|s| !s.is_empty())
        })
        .collect::<Vec<_>>()
        .join(CASE_REFERENCE_SEPARATOR);

    let group_rows: Vec<Vec<String>> = rows
        .iter()
        .enumerate()
        .map(|(ix, &r)| {
            let source = &table.rows()[r];
            std::iter::once((ix + 1).to_string())
                .chain(layout.source_columns.iter().map(|&c| source[c].clone()))
                .collect::<Vec<_>>()
        })
        .collect();

    Ok(Group::from_parts(
        key,
        applicant,
        case_reference,
        GroupTotals::new(official, agency),
        Table::new(layout.mapping.clone(), group_rows)?,
        columns,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::sample_table;

    fn names(groups: &[Group]) -> Vec<&str> {
        groups.iter().map(|g| g.key()).collect()
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let table = Table::parse(vec![
            vec!["分割号", "官费", "代理费"],
            vec!["B", "1", "1"],
            vec!["A", "1", "1"],
            vec!["B", "1", "1"],
            vec!["A", "1", "1"],
        ])
        .unwrap();
        let groups = aggregate(&table, &ColumnNames::default()).unwrap();
        assert_eq!(names(&groups), vec!["B", "A"]);
        assert_eq!(groups[0].table().len(), 2);
    }

    #[test]
    fn test_dirty_fees_count_as_zero() {
        let table = Table::parse(vec![
            vec!["分割号", "官费", "代理费"],
            vec!["F1", "100", "10"],
            vec!["F1", "abc", " 2.9 "],
            vec!["F1", "", ""],
            vec!["F1", "50", "1,000"],
        ])
        .unwrap();
        let groups = aggregate(&table, &ColumnNames::default()).unwrap();
        let totals = groups[0].totals();
        assert_eq!(totals.official().whole(), 150);
        assert_eq!(totals.agency().whole(), 1012);
        assert_eq!(totals.grand().whole(), 1162);
    }

    #[test]
    fn test_grand_total_is_exact_before_truncation() {
        let table = Table::parse(vec![
            vec!["分割号", "官费", "代理费"],
            vec!["F1", "0.6", "0.6"],
        ])
        .unwrap();
        let groups = aggregate(&table, &ColumnNames::default()).unwrap();
        assert_eq!(groups[0].totals().official().whole(), 0);
        assert_eq!(groups[0].totals().grand().whole(), 1);
    }

    #[test]
    fn test_case_reference_precedence() {
        let table = Table::parse(vec![
            vec!["分割号", "官费", "代理费", "集佳案号", "我方案号"],
            vec!["F1", "1", "1", "JJ-1", "W-1"],
            vec!["F1", "1", "1", "", "W-2"],
            vec!["F1", "1", "1", " ", ""],
            vec!["F1", "1", "1", "JJ-4", ""],
        ])
        .unwrap();
        let groups = aggregate(&table, &ColumnNames::default()).unwrap();
        assert_eq!(groups[0].case_reference(), "JJ-1、W-2、JJ-4");
    }

    #[test]
    fn test_case_reference_without_columns() {
        let table = Table::parse(vec![vec!["分割号", "官费", "代理费"], vec!["F1", "1", "1"]])
            .unwrap();
        let groups = aggregate(&table, &ColumnNames::default()).unwrap();
        assert_eq!(groups[0].case_reference(), "");
        assert_eq!(groups[0].applicant(), "");
    }

    #[test]
    fn test_missing_required_columns() {
        let table = Table::parse(vec![vec!["分割号", "申请人"], vec!["F1", "甲"]]).unwrap();
        let err = aggregate(&table, &ColumnNames::default()).unwrap_err();
        assert!(err.to_string().contains("官费, 代理费"));
    }

    #[test]
    fn test_group_table_has_fresh_sequence() {
        let groups = aggregate(&sample_table(), &ColumnNames::default()).unwrap();
        assert_eq!(names(&groups), vec!["F1", "F2"]);
        let f2 = &groups[1];
        let headers: Vec<&str> = f2.table().headers().iter().map(|h| h.as_ref()).collect();
        assert_eq!(
            headers,
            vec!["序号", "申请人", "集佳案号", "我方案号", "官费", "代理费"]
        );
        let sequence: Vec<&str> = (0..f2.table().len())
            .map(|r| f2.table().cell(r, "序号").unwrap())
            .collect();
        assert_eq!(sequence, vec!["1", "2"]);
        assert_eq!(f2.applicant(), "乙公司");
    }

    #[test]
    fn test_custom_column_names() {
        let columns = ColumnNames {
            group_key: "批次".to_string(),
            official_fee: "官方费用".to_string(),
            ..ColumnNames::default()
        };
        let table = Table::parse(vec![
            vec!["批次", "官方费用", "代理费"],
            vec!["1", "10", "5"],
        ])
        .unwrap();
        let groups = aggregate(&table, &columns).unwrap();
        assert_eq!(groups[0].totals().grand().whole(), 15);
    }

    #[test]
    fn test_summary() {
        let groups = aggregate(&sample_table(), &ColumnNames::default()).unwrap();
        let summary = groups[0].summary("a.docx");
        assert_eq!(summary.group_key, "F1");
        assert_eq!(summary.applicant, "甲公司");
        assert_eq!(summary.case_reference, "JJ2024001、JJ2024002");
        assert_eq!(summary.official_total, 1500);
        assert_eq!(summary.agency_total, 3000);
        assert_eq!(summary.grand_total, 4500);
        assert_eq!(summary.file_name, "a.docx");
    }
}
