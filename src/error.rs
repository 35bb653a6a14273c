//! Error types.
//!
//! Internally everything returns `Res<T>`, which is plain `anyhow`. At the public boundary errors
//! are wrapped in `Error`, which remembers which class of failure occurred so that callers can
//! tell a broken configuration apart from a single group that could not be billed.

use serde::Serialize;
use std::fmt::{Display, Formatter};

pub(crate) type Res<T> = std::result::Result<T, anyhow::Error>;

pub type Result<T> = std::result::Result<T, Error>;

/// The class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The run cannot start: missing columns, missing templates, a bad config file.
    Config,
    /// A single group could not be turned into a billing document.
    Group,
    /// The invoice request ledger could not be produced.
    Ledger,
    /// Reading or writing files failed.
    Io,
    /// Anything else.
    Internal,
}

serde_plain::derive_display_from_serialize!(ErrorType);

/// The public error type.
#[derive(Debug)]
pub struct Error {
    error_type: ErrorType,
    source: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, source: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            source: source.into(),
        }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:#}", self.error_type, self.source)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Self::new(ErrorType::Internal, value)
    }
}

/// Converts an internal result into the public `Result`, tagging the error with `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_pub_result_tags_error_type() {
        let res: Res<()> = Err(anyhow!("missing column 官费"));
        let err = res.pub_result(ErrorType::Config).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert_eq!(err.to_string(), "config error: missing column 官费");
    }

    #[test]
    fn test_display_includes_context_chain() {
        let res: Res<()> = Err(anyhow!("inner")).map_err(|e| e.context("outer"));
        let err = res.pub_result(ErrorType::Ledger).unwrap_err();
        assert_eq!(err.to_string(), "ledger error: outer: inner");
    }
}
