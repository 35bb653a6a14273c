//! These structs provide the CLI interface for the invoicer CLI.

use crate::commands::Overrides;
use crate::populate::BillingFormat;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// invoicer: Turns a patent fee list into per-group billing documents.
///
/// The fee list (an .xlsx or .csv file) is split into groups by its 分割号 column. Each group gets
/// a billing document (请款单) filled in from a Word or Excel template, and every billed group is
/// appended to the invoice request ledger (发票申请表) as two rows: one for the official fees and
/// one for the agency fees.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and initialize the configuration file.
    ///
    /// This is the first command you should run. The templates can be passed now or copied into
    /// $INVOICER_HOME/templates later.
    Init(InitArgs),
    /// Bill every group of a fee list and update the invoice request ledger.
    Generate(GenerateArgs),
    /// Print the uppercase numeral (大写金额) of a whole yuan amount.
    Numeral(NumeralArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the configuration, templates and output are held. Defaults to
    /// ~/invoicer
    #[arg(long, env = "INVOICER_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// (Not shown): Args for the `invoicer init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// A .docx or .xlsx billing template to copy into the home directory. An .xlsx template
    /// switches the billing format to excel.
    #[arg(long)]
    template: Option<PathBuf>,

    /// An .xlsx invoice request ledger to copy into the home directory.
    #[arg(long)]
    ledger_template: Option<PathBuf>,
}

impl InitArgs {
    pub fn new(template: Option<PathBuf>, ledger_template: Option<PathBuf>) -> Self {
        Self {
            template,
            ledger_template,
        }
    }

    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    pub fn ledger_template(&self) -> Option<&Path> {
        self.ledger_template.as_deref()
    }
}

/// (Not shown): Args for the `invoicer generate` command.
#[derive(Debug, Parser, Clone)]
pub struct GenerateArgs {
    /// The fee list, an .xlsx (first worksheet) or .csv file with a header row.
    input: PathBuf,

    /// The company name printed on the documents and in the ledger.
    #[arg(long)]
    company: Option<String>,

    /// The kind of billing template to fill in.
    #[arg(long, value_enum)]
    format: Option<BillingFormat>,

    /// The billing template, overriding the one in config.json.
    #[arg(long)]
    template: Option<PathBuf>,

    /// The invoice request ledger, overriding the one in config.json.
    #[arg(long)]
    ledger_template: Option<PathBuf>,

    /// Where to write the documents, overriding the one in config.json.
    #[arg(long)]
    output: Option<PathBuf>,

    /// The billing date as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Also bundle every produced file into one zip archive.
    #[arg(long)]
    zip: bool,
}

impl GenerateArgs {
    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            company: self.company.clone(),
            format: self.format,
            template: self.template.clone(),
            ledger_template: self.ledger_template.clone(),
            output: self.output.clone(),
            date: self.date,
            zip: self.zip,
        }
    }
}

/// (Not shown): Args for the `invoicer numeral` command.
#[derive(Debug, Parser, Clone)]
pub struct NumeralArgs {
    /// A non-negative whole amount in yuan.
    amount: u64,
}

impl NumeralArgs {
    pub fn amount(&self) -> u64 {
        self.amount
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("invoicer"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or INVOICER_HOME instead of relying on the default \
                home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("invoicer")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
