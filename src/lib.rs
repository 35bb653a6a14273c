//! Patent fee billing.
//!
//! A fee list is split into groups by its 分割号 column. Every group is filled into a Word or
//! Excel billing template (请款单), and the billed groups are appended to the invoice request
//! ledger (发票申请表). The engine in `pipeline` works on bytes only; `commands` does the file
//! I/O around it.

mod aggregate;
pub mod args;
pub mod commands;
mod config;
mod error;
mod filename;
mod ledger;
mod model;
mod numeral;
mod ooxml;
mod pipeline;
mod populate;
mod source;
#[cfg(test)]
mod test;
mod utils;

pub use aggregate::{aggregate, Group, GroupSummary, GroupTotals, CASE_REFERENCE_SEPARATOR};
pub use config::{ColumnNames, Config, LedgerColumn, LedgerLayout};
pub use error::{Error, ErrorType, Result};
pub use filename::sanitize_filename;
pub use ledger::{append_ledger, LedgerLabels, LEDGER_FILE_NAME, ORDINARY_INVOICE, SPECIAL_INVOICE};
pub use model::{Amount, AmountError, Header, Mapping, Table};
pub use numeral::{to_uppercase_numeral, ZERO_AMOUNT};
pub use pipeline::{run, Artifact, GroupOutcome, RunContext, RunReport};
pub use populate::{populate, BillingFormat, Populated};
