//! Per-test status classification
//!
//! A catalog entry is only ever looked up in the document belonging to its
//! own execution type. Identifiers routinely collide between the automated
//! suite and the end-to-end scenarios, so an `auto` entry must never be
//! satisfied by an end-to-end record (or the other way around).

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::{Catalog, CatalogEntry, TestType};
use crate::store::{ResultDocument, ResultRecord, Source, Status};

/// Reporting bucket of a classified test
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClassKey {
    Passed,
    Failed,
    NotFound,
    Manual,
    Skipped,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub icon: &'static str,
    pub label: &'static str,
    pub key: ClassKey,
}

impl Classification {
    pub const PASSED: Self = Self {
        icon: "✅",
        label: "Passed",
        key: ClassKey::Passed,
    };
    pub const FAILED: Self = Self {
        icon: "❌",
        label: "Failed",
        key: ClassKey::Failed,
    };
    /// Errors are reported in the failed bucket, only the label differs
    pub const ERROR: Self = Self {
        icon: "❌",
        label: "Error",
        key: ClassKey::Failed,
    };
    pub const SKIPPED: Self = Self {
        icon: "⏭️",
        label: "Skipped",
        key: ClassKey::Skipped,
    };
    pub const NOT_FOUND: Self = Self {
        icon: "🕳",
        label: "Not found",
        key: ClassKey::NotFound,
    };
    pub const MANUAL: Self = Self {
        icon: "🫱",
        label: "Manual test needed",
        key: ClassKey::Manual,
    };
    pub const UNKNOWN: Self = Self {
        icon: "❓",
        label: "Unknown",
        key: ClassKey::Unknown,
    };

    /// Maps a found (or missing) record of the given source
    fn from_record(record: Option<&ResultRecord>, source: Source) -> Self {
        let Some(record) = record else {
            return Self::NOT_FOUND;
        };
        match (record.status, source) {
            (Status::Passed, _) => Self::PASSED,
            (Status::Failed, _) => Self::FAILED,
            (Status::Error, _) => Self::ERROR,
            (Status::Skipped, Source::Automated) => Self::SKIPPED,
            // Scenarios have no skipped outcome to report
            (Status::Skipped, Source::EndToEnd) => Self::NOT_FOUND,
        }
    }
}

/// Records of one document keyed by identifier.
///
/// Records without an identifier are left out. When an identifier occurs
/// more than once the first record wins.
#[derive(Debug, Default)]
pub struct ResultIndex<'a> {
    by_id: HashMap<&'a str, &'a ResultRecord>,
}

impl<'a> ResultIndex<'a> {
    pub fn new(doc: &'a ResultDocument) -> Self {
        let mut by_id = HashMap::with_capacity(doc.len());
        for record in doc.tests() {
            if let Some(id) = record.test_id.as_deref() {
                by_id.entry(id).or_insert(record);
            }
        }
        Self { by_id }
    }

    pub fn get(&self, test_id: &str) -> Option<&'a ResultRecord> {
        self.by_id.get(test_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Classifies catalog entries against the automated and end-to-end
/// documents. Indexes are built once and reused for every entry.
pub struct Classifier<'a> {
    automated: Option<ResultIndex<'a>>,
    e2e: Option<ResultIndex<'a>>,
}

impl<'a> Classifier<'a> {
    pub fn new(automated: Option<&'a ResultDocument>, e2e: Option<&'a ResultDocument>) -> Self {
        Self {
            automated: automated.map(ResultIndex::new),
            e2e: e2e.map(ResultIndex::new),
        }
    }

    pub fn classify(&self, entry: &CatalogEntry) -> Classification {
        let lookup = |index: &Option<ResultIndex<'a>>, source| {
            let record = index.as_ref().and_then(|idx| idx.get(&entry.id));
            Classification::from_record(record, source)
        };

        match entry.kind {
            TestType::Manual => Classification::MANUAL,
            TestType::Auto => lookup(&self.automated, Source::Automated),
            TestType::AutoSelenium => lookup(&self.e2e, Source::EndToEnd),
            TestType::Unrecognized(_) => Classification::UNKNOWN,
        }
    }

    /// Classifies the whole catalog, in catalog order
    pub fn classify_all<'c>(
        &self,
        catalog: &'c Catalog,
    ) -> Vec<(&'c CatalogEntry, Classification)> {
        catalog
            .entries()
            .iter()
            .map(|entry| (entry, self.classify(entry)))
            .collect()
    }
}

/// Classifies a single entry. Prefer [`Classifier`] for more than one.
pub fn classify(
    entry: &CatalogEntry,
    automated: Option<&ResultDocument>,
    e2e: Option<&ResultDocument>,
) -> Classification {
    Classifier::new(automated, e2e).classify(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(source: Source, records: &[(&str, Status)]) -> ResultDocument {
        ResultDocument::from_records(
            source,
            records
                .iter()
                .map(|&(id, status)| ResultRecord::new(Some(id.to_string()), status))
                .collect(),
            None,
        )
    }

    fn entry(id: &str, kind: TestType) -> CatalogEntry {
        CatalogEntry::new(id, kind)
    }

    #[test]
    fn test_auto_statuses() {
        let auto = doc(
            Source::Automated,
            &[
                ("1", Status::Passed),
                ("2", Status::Failed),
                ("3", Status::Error),
                ("4", Status::Skipped),
            ],
        );
        let c = Classifier::new(Some(&auto), None);

        assert_eq!(c.classify(&entry("1", TestType::Auto)), Classification::PASSED);
        assert_eq!(c.classify(&entry("2", TestType::Auto)), Classification::FAILED);
        assert_eq!(c.classify(&entry("3", TestType::Auto)), Classification::ERROR);
        assert_eq!(c.classify(&entry("3", TestType::Auto)).key, ClassKey::Failed);
        assert_eq!(c.classify(&entry("4", TestType::Auto)), Classification::SKIPPED);
        assert_eq!(
            c.classify(&entry("5", TestType::Auto)),
            Classification::NOT_FOUND
        );
    }

    #[test]
    fn test_e2e_statuses() {
        let e2e = doc(
            Source::EndToEnd,
            &[
                ("16", Status::Passed),
                ("17", Status::Error),
                ("18", Status::Skipped),
            ],
        );
        let c = Classifier::new(None, Some(&e2e));

        let selenium = |id| entry(id, TestType::AutoSelenium);
        assert_eq!(c.classify(&selenium("16")).key, ClassKey::Passed);
        assert_eq!(c.classify(&selenium("17")).key, ClassKey::Failed);
        assert_eq!(c.classify(&selenium("18")).key, ClassKey::NotFound);
        assert_eq!(c.classify(&selenium("19")).key, ClassKey::NotFound);
    }

    #[test]
    fn test_absent_documents() {
        let c = Classifier::new(None, None);
        assert_eq!(c.classify(&entry("1", TestType::Auto)).key, ClassKey::NotFound);
        assert_eq!(
            c.classify(&entry("1", TestType::AutoSelenium)).key,
            ClassKey::NotFound
        );
        assert_eq!(c.classify(&entry("1", TestType::Manual)).key, ClassKey::Manual);
    }

    #[test]
    fn test_manual_ignores_records() {
        let auto = doc(Source::Automated, &[("T2", Status::Failed)]);
        assert_eq!(
            classify(&entry("T2", TestType::Manual), Some(&auto), Some(&auto)),
            Classification::MANUAL
        );
    }

    #[test]
    fn test_no_cross_source_lookup() {
        let auto = doc(Source::Automated, &[("7", Status::Passed)]);
        let e2e = doc(Source::EndToEnd, &[("8", Status::Passed)]);
        let c = Classifier::new(Some(&auto), Some(&e2e));

        assert_eq!(
            c.classify(&entry("7", TestType::AutoSelenium)).key,
            ClassKey::NotFound
        );
        assert_eq!(c.classify(&entry("8", TestType::Auto)).key, ClassKey::NotFound);
    }

    #[test]
    fn test_unrecognized_type() {
        let auto = doc(Source::Automated, &[("9", Status::Passed)]);
        assert_eq!(
            classify(
                &entry("9", TestType::Unrecognized("perf".to_string())),
                Some(&auto),
                None
            ),
            Classification::UNKNOWN
        );
    }

    #[test]
    fn test_index_first_record_wins_and_skips_untagged() {
        let mut auto = ResultDocument::new(Source::Automated);
        auto.upsert(ResultRecord::new(None, Status::Passed));
        // Bypass upsert to get a duplicate identifier into the document
        let dup = ResultDocument::from_records(
            Source::Automated,
            vec![
                ResultRecord::new(Some("1".to_string()), Status::Failed),
                ResultRecord::new(Some("1".to_string()), Status::Passed),
            ],
            None,
        );

        assert!(ResultIndex::new(&auto).is_empty());
        let idx = ResultIndex::new(&dup);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.get("1").unwrap().status, Status::Failed);
    }

    #[test]
    fn test_classify_all_keeps_catalog_order() {
        let catalog = Catalog::new(vec![
            entry("3", TestType::Manual),
            entry("1", TestType::Auto),
            entry("2", TestType::AutoSelenium),
        ]);
        let c = Classifier::new(None, None);
        let ids: Vec<_> = c
            .classify_all(&catalog)
            .into_iter()
            .map(|(e, _)| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }
}
