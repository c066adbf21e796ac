use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use strum::IntoEnumIterator;

use crate::util::deserialize_opt_ident;

/// Outcome of a single test execution
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    /// Failed with an unexpected exception rather than an assertion
    Error,
    Skipped,
}

/// The producer a result document belongs to.
///
/// Both producers share one document model; only the on-disk shape
/// differs (key field name and tracked summary counters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display)]
pub enum Source {
    /// Single-pass automated run, document replaced as a whole
    #[default]
    Automated,
    /// Independently invoked scenarios, document merged record by record
    EndToEnd,
}

impl Source {
    /// Name of the identifier field in this source's records
    pub fn key_field(self) -> &'static str {
        match self {
            Self::Automated => "test_id",
            Self::EndToEnd => "test_number",
        }
    }

    fn tracks_skipped(self) -> bool {
        matches!(self, Self::Automated)
    }
}

/// One test outcome.
///
/// `test_id` is the join key against the catalog. Producer-specific fields
/// (`test_class`, `test_name`, `details`, ...) are carried in `metadata`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultRecord {
    #[serde(
        default,
        alias = "test_number",
        deserialize_with = "deserialize_opt_ident"
    )]
    pub test_id: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub metadata: BTreeMap<String, Value>,
}

/// Field names owned by `ResultRecord` itself; never emitted from metadata.
const RESERVED_FIELDS: &[&str] = &[
    "test_id",
    "test_number",
    "status",
    "error_message",
    "description",
];

impl ResultRecord {
    pub fn new(test_id: Option<String>, status: Status) -> Self {
        Self {
            test_id,
            status,
            error_message: None,
            description: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_error_message(mut self, msg: Option<String>) -> Self {
        self.error_message = msg;
        self
    }

    pub fn with_description(mut self, desc: Option<String>) -> Self {
        self.description = desc;
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Looks up a string metadata value
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// Serializes a record with its source's key field name
struct KeyedRecord<'a> {
    source: Source,
    record: &'a ResultRecord,
}

impl Serialize for KeyedRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let r = self.record;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(self.source.key_field(), &r.test_id)?;
        for (k, v) in r
            .metadata
            .iter()
            .filter(|(k, _)| !RESERVED_FIELDS.contains(&k.as_str()))
        {
            map.serialize_entry(k, v)?;
        }
        map.serialize_entry("status", &r.status)?;
        map.serialize_entry("error_message", &r.error_message)?;
        map.serialize_entry("description", &r.description)?;
        map.end()
    }
}

/// Per-status record counts. Always derived from the records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ResultRecord>) -> Self {
        let mut summary = Self::default();
        for r in records {
            *summary.slot(r.status) += 1;
        }
        summary
    }

    fn slot(&mut self, status: Status) -> &mut usize {
        match status {
            Status::Passed => &mut self.passed,
            Status::Failed => &mut self.failed,
            Status::Error => &mut self.errors,
            Status::Skipped => &mut self.skipped,
        }
    }

    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Passed => self.passed,
            Status::Failed => self.failed,
            Status::Error => self.errors,
            Status::Skipped => self.skipped,
        }
    }

    pub fn total(&self) -> usize {
        Status::iter().map(|s| self.count(s)).sum()
    }

    fn wire_key(status: Status) -> &'static str {
        match status {
            Status::Error => "errors",
            s => s.into(),
        }
    }
}

/// A persisted collection of results from one source.
///
/// The summary is private and only changes through
/// [`ResultDocument::recompute_summary`], so it cannot drift from the
/// records once recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDocument {
    source: Source,
    pub timestamp: Option<NaiveDateTime>,
    pub duration: Option<f64>,
    tests: Vec<ResultRecord>,
    summary: Summary,
}

impl ResultDocument {
    /// Creates an empty document stamped with the current local time
    pub fn new(source: Source) -> Self {
        Self {
            source,
            timestamp: Some(Local::now().naive_local()),
            duration: None,
            tests: vec![],
            summary: Summary::default(),
        }
    }

    /// Builds a complete document from a finished pass
    pub fn from_records(source: Source, records: Vec<ResultRecord>, duration: Option<f64>) -> Self {
        let mut doc = Self {
            duration,
            tests: records,
            ..Self::new(source)
        };
        doc.recompute_summary();
        doc
    }

    /// Parses a document. The stored summary is ignored and recomputed.
    pub fn from_json(source: Source, text: &str) -> serde_json::Result<Self> {
        let raw: RawDocument = serde_json::from_str(text)?;
        let mut doc = Self {
            source,
            timestamp: raw.timestamp,
            duration: raw.duration,
            tests: raw.tests,
            summary: Summary::default(),
        };
        doc.recompute_summary();
        Ok(doc)
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn tests(&self) -> &[ResultRecord] {
        &self.tests
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// First record carrying the given identifier
    pub fn find(&self, test_id: &str) -> Option<&ResultRecord> {
        self.tests
            .iter()
            .find(|r| r.test_id.as_deref() == Some(test_id))
    }

    /// Replaces the record with the same identifier in place, or appends.
    ///
    /// Records without an identifier cannot be matched and are always
    /// appended. Does not touch the summary.
    pub fn upsert(&mut self, record: ResultRecord) {
        // Records without an id replace each other like any other key
        let existing = self.tests.iter().position(|r| r.test_id == record.test_id);
        match existing {
            Some(idx) => self.tests[idx] = record,
            None => self.tests.push(record),
        }
    }

    pub fn recompute_summary(&mut self) {
        self.summary = Summary::from_records(&self.tests);
    }

    /// Stamps the document with the current local time
    pub fn touch(&mut self) {
        self.timestamp = Some(Local::now().naive_local());
    }
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    tests: Vec<ResultRecord>,
}

/// Accepts naive ISO-8601 stamps as well as RFC 3339 with an offset.
/// Anything else is dropped rather than failing the whole document.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(text
        .parse::<NaiveDateTime>()
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(&text)
                .ok()
                .map(|t| t.naive_local())
        }))
}

impl Serialize for ResultDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let summary: BTreeMap<&str, usize> = Status::iter()
            .filter(|&s| {
                s != Status::Skipped || self.source.tracks_skipped() || self.summary.skipped > 0
            })
            .map(|s| (Summary::wire_key(s), self.summary.count(s)))
            .collect();
        let tests: Vec<KeyedRecord> = self
            .tests
            .iter()
            .map(|record| KeyedRecord {
                source: self.source,
                record,
            })
            .collect();

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(
            "timestamp",
            &self
                .timestamp
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
        )?;
        if let Some(duration) = self.duration {
            map.serialize_entry("duration", &duration)?;
        }
        map.serialize_entry("total_tests", &self.tests.len())?;
        map.serialize_entry("summary", &summary)?;
        map.serialize_entry("tests", &tests)?;
        map.end()
    }
}
