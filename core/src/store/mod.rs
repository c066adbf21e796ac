//! Result store and merge engine
//!
//! Every result source owns one JSON document on disk. Reads are lenient:
//! an absent or unparsable document reads as empty. Writes are strict: a
//! document that cannot be written is an error, since a dropped write would
//! lose a scenario's outcome for good.
//!
//! End-to-end scenarios run as separate processes that only share the
//! document file. [`merge`] serializes their read-modify-write cycles with
//! an advisory lock, and [`persist`] replaces the file through an atomic
//! rename so a reader never observes a half-written document.

pub mod document;
pub mod lock;

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use log::*;
use tempfile::NamedTempFile;

use crate::error::{Result, TallyError};

pub use document::{ResultDocument, ResultRecord, Source, Status, Summary};
pub use lock::DocumentLock;

/// Reads a document, or `None` when it is absent or malformed.
///
/// Malformed documents are reported as a warning.
pub fn try_load(path: &Path, source: Source) -> Option<ResultDocument> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} result document {} not found", source, path.display());
            return None;
        }
        Err(e) => {
            warn!("Cannot read {}: {}", path.display(), e);
            return None;
        }
    };

    match ResultDocument::from_json(source, &text) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!("Ignoring malformed result document {}: {}", path.display(), e);
            None
        }
    }
}

/// Reads a document, starting from an empty one when there is nothing
/// usable on disk.
pub fn load(path: &Path, source: Source) -> ResultDocument {
    try_load(path, source).unwrap_or_else(|| ResultDocument::new(source))
}

/// Writes the full document over `path`.
///
/// The document is written to a temporary file next to the target and then
/// renamed over it.
pub fn persist(doc: &ResultDocument, path: &Path) -> Result<()> {
    write_atomic(doc, path).map_err(|source| TallyError::PersistFailure {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "Persisted {} records ({} document) to {}",
        doc.len(),
        doc.source(),
        path.display()
    );
    Ok(())
}

fn write_atomic(doc: &ResultDocument, path: &Path) -> io::Result<()> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, doc)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Overwrites the document unconditionally with a complete snapshot.
///
/// Used by single-pass producers that own the whole document.
pub fn replace(path: &Path, doc: &ResultDocument) -> Result<()> {
    info!(
        "Writing {} results to {} (passed: {}, failed: {}, errors: {}, skipped: {})",
        doc.len(),
        path.display(),
        doc.summary().passed,
        doc.summary().failed,
        doc.summary().errors,
        doc.summary().skipped,
    );
    persist(doc, path)
}

/// Merges one record into the document at `path`.
///
/// Runs the whole load, upsert, recompute, persist cycle while holding
/// the document's lock and returns the document as persisted.
pub fn merge(path: &Path, source: Source, record: ResultRecord) -> Result<ResultDocument> {
    let _lock = DocumentLock::acquire(path)?;

    let mut doc = load(path, source);
    debug!(
        "Merging {:?} ({}) into {} existing records",
        record.test_id,
        record.status,
        doc.len()
    );
    doc.upsert(record);
    doc.recompute_summary();
    doc.touch();
    persist(&doc, path)?;
    Ok(doc)
}
