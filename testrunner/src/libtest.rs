//! Adapter for the libtest JSON event stream
//!
//! `cargo test -- -Z unstable-options --format json` prints one JSON object
//! per line. Every finished test becomes a [`CapturedTest`]; everything
//! else on the stream (cargo's own progress lines, bench events) is skipped.

use std::io::BufRead;

use anyhow::Result;
use itertools::Itertools;
use log::*;
use serde::Deserialize;
use tally_core::store::{ResultDocument, Status};

use crate::tags::Tagger;
use crate::{CapturedTest, RunCollector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    Started,
    Ok,
    Failed,
    Ignored,
    Timeout,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct TestEvent {
    pub event: EventKind,
    pub name: String,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuiteEvent {
    pub event: EventKind,
    #[serde(default)]
    pub exec_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Suite(SuiteEvent),
    Test(TestEvent),
    #[serde(other)]
    Other,
}

/// Parses one line of the stream. Lines that are not libtest events
/// yield `None`.
pub fn parse_line(line: &str) -> Option<Message> {
    let line = line.trim();
    if !line.starts_with('{') {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(msg) => Some(msg),
        Err(e) => {
            debug!("Skipping unrecognized line ({}): {}", e, line);
            None
        }
    }
}

/// Assertion panics are plain failures, any other panic is an error.
fn failure_status(output: &str) -> Status {
    let payload = output.lines().find_map(|l| {
        let (_, after) = l.split_once("panicked at")?;
        // Older toolchains quote the payload on the same line
        Some(after.trim_start().strip_prefix('\'').map(str::to_string))
    });
    let payload = match payload {
        Some(Some(inline)) => inline,
        Some(None) => output
            .lines()
            .skip_while(|l| !l.contains("panicked at"))
            .nth(1)
            .unwrap_or_default()
            .to_string(),
        None => return Status::Error,
    };
    if payload.trim_start().starts_with("assertion") {
        Status::Failed
    } else {
        Status::Error
    }
}

/// Strips the backtrace hint libtest appends to every panic
fn failure_detail(output: &str) -> Option<String> {
    let detail = output
        .lines()
        .filter(|l| !l.starts_with("note: run with `RUST_BACKTRACE"))
        .join("\n");
    let detail = detail.trim();
    (!detail.is_empty()).then(|| detail.to_string())
}

/// Feeds libtest events into a [`RunCollector`]
pub struct LibtestObserver<'a> {
    tagger: &'a Tagger,
    collector: RunCollector,
    suite_time: Option<f64>,
}

impl<'a> LibtestObserver<'a> {
    pub fn new(tagger: &'a Tagger) -> Self {
        Self {
            tagger,
            collector: RunCollector::start(),
            suite_time: None,
        }
    }

    pub fn observe(&mut self, msg: Message) {
        match msg {
            Message::Suite(s) => {
                if let Some(t) = s.exec_time {
                    *self.suite_time.get_or_insert(0.0) += t;
                }
                if s.event == EventKind::Started {
                    debug!("Test suite started");
                }
            }
            Message::Test(t) => self.observe_test(t),
            Message::Other => (),
        }
    }

    fn observe_test(&mut self, t: TestEvent) {
        trace!("{}: {}", t.name, t.event);
        let status = match t.event {
            EventKind::Ok => Status::Passed,
            EventKind::Ignored => Status::Skipped,
            EventKind::Failed => {
                failure_status(t.stdout.as_deref().or(t.message.as_deref()).unwrap_or_default())
            }
            EventKind::Timeout => {
                warn!("{} is taking a long time", t.name);
                return;
            }
            EventKind::Started | EventKind::Other => return,
        };

        let failure = match status {
            Status::Failed | Status::Error => {
                let output = [t.stdout.as_deref(), t.message.as_deref()]
                    .into_iter()
                    .flatten()
                    .join("\n");
                failure_detail(&output)
            }
            _ => t.message,
        };
        let (test_id, description) = self.tagger.tag(&t.name);
        self.collector.record(CapturedTest {
            name: t.name,
            test_id,
            status,
            description,
            failure,
        });
    }

    pub fn observe_line(&mut self, line: &str) {
        if let Some(msg) = parse_line(line) {
            self.observe(msg);
        }
    }

    /// Consumes the whole stream
    pub fn observe_reader(&mut self, reader: impl BufRead) -> Result<()> {
        for line in reader.lines() {
            self.observe_line(&line?);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.collector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collector.is_empty()
    }

    /// Builds the document. Suite-reported execution time is preferred
    /// over wall clock, which would include compilation.
    pub fn finish(self) -> ResultDocument {
        match self.suite_time {
            Some(t) => self.collector.finish_with_duration(t),
            None => self.collector.finish(),
        }
    }
}
