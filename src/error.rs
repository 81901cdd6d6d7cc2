use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced to the presentation layer.
///
/// An empty search or filter result is not an error; those come back as
/// `NoMatch` outcomes from the resolver and page functions.
#[derive(Debug, Error)]
pub enum Error {
    #[error("file '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read spreadsheet: {0}")]
    Read(String),

    #[error("required column(s) missing: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("parse error: {0}")]
    Parse(String),

    /// Never says which half of the credential pair was wrong.
    #[error("invalid username or password")]
    Auth,

    #[error("credential store error: {0}")]
    Store(String),

    #[error("export failed: {0}")]
    Export(String),
}

impl Error {
    pub fn schema(column: &str) -> Self {
        Error::Schema {
            missing: vec![column.to_string()],
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
