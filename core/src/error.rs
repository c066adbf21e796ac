use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the reconciliation engine.
///
/// Only failures that must abort an invocation end up here. Unreadable or
/// malformed result documents are not errors: they load as empty documents.
#[derive(Error, Debug)]
pub enum TallyError {
    /// No report can be produced without a catalog
    #[error("Catalog {} not found", .0.display())]
    MissingCatalog(PathBuf),

    #[error("Cannot parse catalog {}: {source}", path.display())]
    MalformedCatalog {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Catalog {} contains no tests", .0.display())]
    EmptyCatalog(PathBuf),

    /// A result document could not be durably written
    #[error("Failed to persist results to {}: {source}", path.display())]
    PersistFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock {}: {source}", path.display())]
    LockFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TallyError>;
