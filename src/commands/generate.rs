use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::pipeline::{run, RunContext, RunReport};
use crate::populate::BillingFormat;
use crate::{source, utils, Config, Error, Result};
use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Values given on the command line that take precedence over `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub company: Option<String>,
    pub format: Option<BillingFormat>,
    pub template: Option<PathBuf>,
    pub ledger_template: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub date: Option<NaiveDate>,
    pub zip: bool,
}

/// Bills every group of the fee list at `input` and writes the billing documents and the updated
/// ledger into the output directory.
///
/// A group that cannot be billed is reported and skipped. The command only fails when the run
/// cannot start or the produced files cannot be written.
pub fn generate(config: &Config, input: &Path, overrides: Overrides) -> Result<Out<RunReport>> {
    let table = source::read_table(input)
        .with_context(|| format!("Unable to read the fee list at {}", input.display()))
        .pub_result(ErrorType::Config)?;
    debug!("Read {} rows from {}", table.len(), input.display());

    let format = overrides.format.unwrap_or(config.billing_format());
    let billing_template = overrides
        .template
        .unwrap_or_else(|| config.billing_template());
    let ledger_template = overrides
        .ledger_template
        .unwrap_or_else(|| config.ledger_template());
    let billing_bytes = read_template(&billing_template, "billing")?;
    let ledger_bytes = read_template(&ledger_template, "ledger")?;

    let ctx = RunContext {
        company_label: overrides
            .company
            .unwrap_or_else(|| config.company_label().to_string()),
        office_label: config.office_label().to_string(),
        run_date: overrides.date.unwrap_or_else(|| Local::now().date_naive()),
        format,
        columns: config.columns().clone(),
        ledger_layout: config.ledger_layout().clone(),
        archive: overrides.zip,
    };
    let report = run(&table, &billing_bytes, &ledger_bytes, &ctx)?;

    let output_dir = overrides.output.unwrap_or_else(|| config.output_dir());
    utils::make_dir(&output_dir).pub_result(ErrorType::Io)?;
    for artifact in report.artifacts() {
        let path = output_dir.join(artifact.file_name());
        utils::write(&path, artifact.bytes()).pub_result(ErrorType::Io)?;
        info!("Wrote {}", path.display());
    }
    for error in report.ledger_error.iter().chain(report.archive_error.iter()) {
        warn!("{error}");
    }

    let message = format!(
        "Billed {} of {} groups into {}",
        report.billed_count(),
        report.outcomes.len(),
        output_dir.display()
    );
    Ok(Out::new(message, report))
}

fn read_template(path: &Path, kind: &str) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(Error::new(
            ErrorType::Config,
            anyhow!("The {kind} template is missing '{}'", path.display()),
        ));
    }
    utils::read_bytes(path).pub_result(ErrorType::Io)
}
