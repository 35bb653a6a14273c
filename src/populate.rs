//! Fills one group into a billing template, either a Word document or an Excel workbook.
//!
//! The Word template must contain a table; its first row becomes the header row and the group's
//! rows and a totals row are appended below it. Placeholders in the body text are replaced run by
//! run, so a placeholder has to sit inside a single run of the template to be found.

use crate::aggregate::Group;
use crate::error::Res;
use crate::filename::billing_file_name;
use crate::numeral::to_uppercase_numeral;
use crate::ooxml::{CellRef, WordDocument, Workbook};
use crate::pipeline::Artifact;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Where the official total goes when the fee columns cannot be found by name.
pub const FALLBACK_OFFICIAL_INDEX: usize = 0;
/// Where the agency total goes when the fee columns cannot be found by name.
pub const FALLBACK_AGENCY_INDEX: usize = 1;

pub const TOTAL_LABEL: &str = "合计";
/// The first worksheet row the Excel template receives group rows in.
pub const EXCEL_FIRST_DATA_ROW: u32 = 3;

pub const APPLICANT_PLACEHOLDER: &str = "{{申请人}}";
pub const TOTAL_PLACEHOLDER: &str = "{{合计}}";
pub const UPPERCASE_PLACEHOLDER: &str = "{{大写}}";
pub const DATE_PLACEHOLDER: &str = "{{日期}}";
const DATE_FORMAT: &str = "%Y年%m月%d日";

/// The kind of billing template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BillingFormat {
    /// A `.docx` template with a table.
    #[default]
    Word,
    /// An `.xlsx` template, rows are written from row 3.
    Excel,
}

serde_plain::derive_display_from_serialize!(BillingFormat);
serde_plain::derive_fromstr_from_deserialize!(BillingFormat);

impl BillingFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            BillingFormat::Word => "docx",
            BillingFormat::Excel => "xlsx",
        }
    }

    /// Picks the format from a template's file extension.
    pub(crate) fn from_path(path: &Path) -> Res<Self> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "docx" => Ok(BillingFormat::Word),
            "xlsx" => Ok(BillingFormat::Excel),
            _ => bail!(
                "Unsupported billing template '{}', expected a .docx or .xlsx file",
                path.display()
            ),
        }
    }
}

/// A filled billing document plus anything worth telling the user about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Populated {
    pub artifact: Artifact,
    pub warnings: Vec<String>,
}

/// Fills `group` into `template` using the given format.
pub fn populate(
    format: BillingFormat,
    template: &[u8],
    group: &Group,
    company_label: &str,
    run_date: NaiveDate,
) -> Res<Populated> {
    match format {
        BillingFormat::Word => populate_document(template, group, company_label, run_date),
        BillingFormat::Excel => populate_workbook(template, group, company_label, run_date),
    }
}

/// The placeholder values for a group. Fails when the grand total is negative because it cannot
/// be written as an uppercase amount.
fn replacements(group: &Group, run_date: NaiveDate) -> Res<Vec<(&'static str, String)>> {
    let grand = group.totals().grand().whole();
    let uppercase = u64::try_from(grand)
        .map(to_uppercase_numeral)
        .map_err(|_| anyhow::anyhow!("The grand total {grand} is negative"))?;
    Ok(vec![
        (APPLICANT_PLACEHOLDER, group.applicant().to_string()),
        (TOTAL_PLACEHOLDER, grand.to_string()),
        (UPPERCASE_PLACEHOLDER, uppercase),
        (DATE_PLACEHOLDER, run_date.format(DATE_FORMAT).to_string()),
    ])
}

/// Fills `group` into a Word billing template.
pub fn populate_document(
    template: &[u8],
    group: &Group,
    company_label: &str,
    run_date: NaiveDate,
) -> Res<Populated> {
    let replacements = replacements(group, run_date)?;
    let mut document = WordDocument::from_bytes(template)?;
    let replaced = document.replace_placeholders(&replacements);
    debug!("Replaced placeholders in {replaced} runs for group '{}'", group.key());

    let mut warnings = Vec::new();
    {
        let mut table = document
            .first_table_mut()
            .context("The billing template has no table")?;
        let data = group.table();
        let headers = data.headers();

        if table.row_count() == 0 {
            table.add_row();
        }
        while table.grid_len() < headers.len() {
            table.add_column();
        }
        for (col, header) in headers.iter().enumerate() {
            table.set_cell_text(0, col, header.as_ref())?;
        }
        for values in data.rows() {
            let row = table.add_row();
            for (col, value) in values.iter().enumerate() {
                table.set_cell_text(row, col, value)?;
            }
        }

        let (official_name, agency_name) = group.fee_columns();
        let fallback = (FALLBACK_OFFICIAL_INDEX, FALLBACK_AGENCY_INDEX);
        let (official_col, agency_col) =
            data.mapping().pair_index_or(official_name, agency_name, fallback);
        if !(data.mapping().contains(official_name) && data.mapping().contains(agency_name)) {
            let message = format!(
                "Columns '{official_name}' and '{agency_name}' were not both found, totals were \
                written to columns {official_col} and {agency_col}"
            );
            warn!("Group '{}': {message}", group.key());
            warnings.push(message);
        }
        let total_col = agency_col + 1;
        while table.grid_len() <= total_col.max(official_col) {
            table.add_column();
        }

        let totals = group.totals();
        let row = table.add_row();
        table.set_cell_text(row, 0, TOTAL_LABEL)?;
        table.align_right(row, 0)?;
        table.merge_cells(row, 0, official_col)?;
        table.set_cell_text(row, official_col, &totals.official().to_string())?;
        table.set_cell_text(row, agency_col, &totals.agency().to_string())?;
        table.set_cell_text(row, total_col, &totals.grand().to_string())?;
    }

    let file_name = billing_file_name(
        group.applicant(),
        group.totals().grand().whole(),
        company_label,
        run_date,
        BillingFormat::Word.extension(),
    );
    Ok(Populated {
        artifact: Artifact::new(file_name, document.to_bytes()?),
        warnings,
    })
}

/// Fills `group` into an Excel billing template. Placeholders are replaced in the first
/// worksheet's text cells and the group's rows are written from row 3, column A.
pub fn populate_workbook(
    template: &[u8],
    group: &Group,
    company_label: &str,
    run_date: NaiveDate,
) -> Res<Populated> {
    let replacements = replacements(group, run_date)?;
    let mut workbook = Workbook::from_bytes(template)?;
    let replaced = workbook.replace_placeholders(&replacements);
    debug!("Replaced placeholders in {replaced} cells for group '{}'", group.key());

    for (ix, values) in group.table().rows().iter().enumerate() {
        let row = EXCEL_FIRST_DATA_ROW + u32::try_from(ix).context("Too many rows")?;
        for (col, value) in values.iter().enumerate() {
            let cell = CellRef::new(row, u32::try_from(col + 1).context("Too many columns")?);
            if is_plain_number(value) {
                workbook.set_number(cell, value)?;
            } else {
                workbook.set_text(cell, value)?;
            }
        }
    }

    let file_name = billing_file_name(
        group.applicant(),
        group.totals().grand().whole(),
        company_label,
        run_date,
        BillingFormat::Excel.extension(),
    );
    Ok(Populated {
        artifact: Artifact::new(file_name, workbook.to_bytes()?),
        warnings: Vec::new(),
    })
}

/// True when `value` reads back unchanged as a number, so `"0012"` stays text.
fn is_plain_number(value: &str) -> bool {
    Decimal::from_str(value).is_ok_and(|d| d.to_string() == value)
}
