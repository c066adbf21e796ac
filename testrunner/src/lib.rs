//! Automated run collector
//!
//! Observes one complete automated test pass and turns it into a single
//! result document. The pass owns the whole document: it is written with
//! [`tally_core::store::replace`], never merged.

pub mod libtest;
pub mod tags;

use std::path::Path;
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use log::*;
use tally_core::store::{self, ResultDocument, ResultRecord, Source, Status};

/// One executed test as observed by the collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedTest {
    /// Full test path, e.g. `tasks::tests::tc016_crud`
    pub name: String,
    /// Identifier tag, `None` for untagged tests
    pub test_id: Option<String>,
    pub status: Status,
    pub description: Option<String>,
    /// Failure detail, such as the panic output
    pub failure: Option<String>,
}

impl CapturedTest {
    fn into_record(self) -> ResultRecord {
        let (class, method) = match self.name.rsplit_once("::") {
            Some((class, method)) => (Some(class.to_string()), method.to_string()),
            None => (None, self.name.clone()),
        };

        let mut record = ResultRecord::new(self.test_id, self.status)
            .with_error_message(self.failure)
            .with_description(self.description)
            .with_meta("test_method", method)
            .with_meta("test_name", self.name);
        if let Some(class) = class {
            record = record.with_meta("test_class", class);
        }
        record
    }
}

/// Accumulates the outcomes of a single pass
pub struct RunCollector {
    started: Instant,
    started_at: NaiveDateTime,
    records: Vec<ResultRecord>,
}

impl RunCollector {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            started_at: Local::now().naive_local(),
            records: vec![],
        }
    }

    pub fn record(&mut self, test: CapturedTest) {
        match test.test_id.as_deref() {
            Some(id) => debug!("{} [{}]: {}", test.name, id, test.status),
            None => debug!("{} (untagged): {}", test.name, test.status),
        }
        self.records.push(test.into_record());
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Builds the document, timed by the wall clock since [`Self::start`]
    pub fn finish(self) -> ResultDocument {
        let elapsed = self.started.elapsed().as_secs_f64();
        self.finish_with_duration(elapsed)
    }

    /// Builds the document with an externally measured duration in seconds
    pub fn finish_with_duration(self, duration: f64) -> ResultDocument {
        let untagged = self.records.iter().filter(|r| r.test_id.is_none()).count();
        if untagged > 0 {
            info!("{} of {} tests carry no identifier tag", untagged, self.records.len());
        }

        let mut doc = ResultDocument::from_records(
            Source::Automated,
            self.records,
            Some((duration * 1000.0).round() / 1000.0),
        );
        doc.timestamp = Some(self.started_at);
        doc
    }

    /// Finishes the pass and replaces the document at `path` with it
    pub fn finish_into(self, path: &Path) -> tally_core::Result<ResultDocument> {
        let doc = self.finish();
        store::replace(path, &doc)?;
        Ok(doc)
    }
}
