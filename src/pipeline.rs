//! One billing run: group the fee list, fill a billing document per group, then append the billed
//! groups to the ledger.
//!
//! Nothing here touches the filesystem. Templates come in as bytes and every produced file goes
//! out as an `Artifact`, which leaves writing them to the caller.

use crate::aggregate::{aggregate, GroupSummary};
use crate::config::{ColumnNames, LedgerLayout, DEFAULT_OFFICE_LABEL};
use crate::error::{Error, ErrorType, IntoResult};
use crate::filename::archive_file_name;
use crate::ledger::{append_ledger, LedgerLabels};
use crate::model::Table;
use crate::ooxml::write_zip;
use crate::populate::{populate, BillingFormat};
use crate::Result;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

/// A produced file: its name and contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    file_name: String,
    #[serde(skip)]
    bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Everything a run needs besides the fee list and the templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub company_label: String,
    pub office_label: String,
    pub run_date: NaiveDate,
    pub format: BillingFormat,
    pub columns: ColumnNames,
    pub ledger_layout: LedgerLayout,
    /// Also bundle every produced file into one zip archive.
    pub archive: bool,
}

impl RunContext {
    pub fn new(company_label: impl Into<String>, run_date: NaiveDate) -> Self {
        Self {
            company_label: company_label.into(),
            office_label: DEFAULT_OFFICE_LABEL.to_string(),
            run_date,
            format: BillingFormat::default(),
            columns: ColumnNames::default(),
            ledger_layout: LedgerLayout::default(),
            archive: false,
        }
    }
}

/// What happened to one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum GroupOutcome {
    Billed {
        summary: GroupSummary,
        warnings: Vec<String>,
    },
    Failed {
        group_key: String,
        error: String,
    },
}

impl GroupOutcome {
    pub fn group_key(&self) -> &str {
        match self {
            GroupOutcome::Billed { summary, .. } => &summary.group_key,
            GroupOutcome::Failed { group_key, .. } => group_key,
        }
    }

    pub fn is_billed(&self) -> bool {
        matches!(self, GroupOutcome::Billed { .. })
    }
}

/// The result of a run. Per-group failures and a ledger failure are recorded here rather than
/// failing the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<GroupOutcome>,
    pub documents: Vec<Artifact>,
    pub ledger: Option<Artifact>,
    pub ledger_error: Option<String>,
    pub archive: Option<Artifact>,
    pub archive_error: Option<String>,
}

impl RunReport {
    pub fn billed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_billed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.billed_count()
    }

    /// Summaries of the billed groups, in group order.
    pub fn summaries(&self) -> Vec<GroupSummary> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                GroupOutcome::Billed { summary, .. } => Some(summary.clone()),
                GroupOutcome::Failed { .. } => None,
            })
            .collect()
    }

    /// Every file the run produced, the archive last.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.documents
            .iter()
            .chain(self.ledger.iter())
            .chain(self.archive.iter())
    }
}

/// Runs the billing for `table`.
///
/// # Errors
/// - `ErrorType::Config` when the fee list lacks a required column.
///
/// A group that cannot be billed, a ledger that cannot be written or an archive that cannot be
/// built does not fail the run.
pub fn run(
    table: &Table,
    billing_template: &[u8],
    ledger_template: &[u8],
    ctx: &RunContext,
) -> Result<RunReport> {
    let groups = aggregate(table, &ctx.columns).pub_result(ErrorType::Config)?;
    info!("Billing {} groups", groups.len());

    let mut report = RunReport::default();
    for group in &groups {
        match populate(
            ctx.format,
            billing_template,
            group,
            &ctx.company_label,
            ctx.run_date,
        ) {
            Ok(populated) => {
                info!(
                    "Group '{}' billed as {}",
                    group.key(),
                    populated.artifact.file_name()
                );
                let summary = group.summary(populated.artifact.file_name());
                report.documents.push(populated.artifact);
                report.outcomes.push(GroupOutcome::Billed {
                    summary,
                    warnings: populated.warnings,
                });
            }
            Err(e) => {
                let error = Error::new(ErrorType::Group, e);
                warn!("Group '{}' was skipped: {error}", group.key());
                report.outcomes.push(GroupOutcome::Failed {
                    group_key: group.key().to_string(),
                    error: error.to_string(),
                });
            }
        }
    }

    let labels = LedgerLabels {
        company: &ctx.company_label,
        office: &ctx.office_label,
    };
    match append_ledger(
        &report.summaries(),
        ledger_template,
        &ctx.ledger_layout,
        &labels,
        ctx.run_date,
    ) {
        Ok(ledger) => report.ledger = ledger,
        Err(e) => {
            let error = Error::new(ErrorType::Ledger, e);
            warn!("The ledger was not written: {error}");
            report.ledger_error = Some(error.to_string());
        }
    }

    if ctx.archive && report.artifacts().next().is_some() {
        // Same-named files overwrite each other on disk, so the archive keeps the last one too.
        let entries: IndexMap<&str, &[u8]> = report
            .artifacts()
            .map(|a| (a.file_name(), a.bytes()))
            .collect();
        match write_zip(entries) {
            Ok(bytes) => {
                report.archive = Some(Artifact::new(
                    archive_file_name(&ctx.company_label, ctx.run_date),
                    bytes,
                ))
            }
            Err(e) => {
                let error = Error::new(ErrorType::Internal, e);
                warn!("The archive was not written: {error}");
                report.archive_error = Some(error.to_string());
            }
        }
    }

    info!(
        "Billed {} of {} groups",
        report.billed_count(),
        report.outcomes.len()
    );
    Ok(report)
}
