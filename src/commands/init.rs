use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the home directory, its `templates` and `output` subdirectories and an initial
/// `config.json` with default settings.
///
/// # Arguments
/// - `home` - The directory that will be the home directory, e.g. `$HOME/invoicer`
/// - `billing_template` - A `.docx` or `.xlsx` billing template to copy into `templates/`.
/// - `ledger_template` - An `.xlsx` invoice request ledger to copy into `templates/`.
///
/// # Errors
/// - Returns an error if any file operations fail.
pub fn init(
    home: &Path,
    billing_template: Option<&Path>,
    ledger_template: Option<&Path>,
) -> Result<Out<()>> {
    let config = Config::create(home, billing_template, ledger_template)
        .context("Unable to create the home directory and config")
        .pub_result(ErrorType::Config)?;
    Ok(format!(
        "Successfully created the invoicer home directory at {}",
        config.root().display()
    )
    .into())
}
