//! Types that represent the core data model: the fee list as a `Table` and fee `Amount`s.
mod amount;
mod mapping;
mod table;

pub use amount::{Amount, AmountError};
pub use mapping::{Header, Mapping};
pub use table::Table;
