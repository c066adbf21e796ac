use std::io::{self, Write};

use serde::Serialize;

use crate::catalog::{Catalog, CatalogEntry};
use crate::classify::{ClassKey, Classification, Classifier};
use crate::stats::{self, Statistics};
use crate::store::ResultDocument;

const RULE_WIDTH: usize = 70;

/// A classified catalog, ready for output
#[derive(Debug)]
pub struct Report<'c> {
    rows: Vec<(&'c CatalogEntry, Classification)>,
    stats: Statistics,
}

#[derive(Serialize)]
struct JsonRow<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(flatten)]
    classification: &'a Classification,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    tests: Vec<JsonRow<'a>>,
    statistics: &'a Statistics,
    success_combined: usize,
}

impl<'c> Report<'c> {
    pub fn build(
        catalog: &'c Catalog,
        automated: Option<&ResultDocument>,
        e2e: Option<&ResultDocument>,
    ) -> Self {
        let rows = Classifier::new(automated, e2e).classify_all(catalog);
        let stats = stats::aggregate(&rows);
        Self { rows, stats }
    }

    pub fn rows(&self) -> &[(&'c CatalogEntry, Classification)] {
        &self.rows
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn write_rule(w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "{}", "=".repeat(RULE_WIDTH))
    }

    /// One `id | type | icon label` line per catalog entry
    pub fn write_rows(&self, w: &mut impl Write) -> io::Result<()> {
        for (entry, c) in &self.rows {
            writeln!(w, "{} | {:15} | {} {}", entry.id, entry.kind, c.icon, c.label)?;
        }
        Ok(())
    }

    pub fn write_statistics(&self, w: &mut impl Write) -> io::Result<()> {
        let s = &self.stats;
        let line = |w: &mut dyn Write, prefix: &str, key: ClassKey| {
            writeln!(w, "{}: {} ({:.1}%)", prefix, s.count(key), s.percent(key))
        };

        writeln!(w, "\nNumber of tests: {}", s.total)?;
        line(w, "✅ Passed tests", ClassKey::Passed)?;
        line(w, "❌ Failed tests", ClassKey::Failed)?;
        line(w, "🕳  Not found tests", ClassKey::NotFound)?;
        line(w, "🫱  Test to pass manually", ClassKey::Manual)?;
        if s.skipped > 0 {
            line(w, "⏭️  Skipped tests", ClassKey::Skipped)?;
        }
        if s.unknown > 0 {
            line(w, "❓ Unknown test type", ClassKey::Unknown)?;
        }
        writeln!(
            w,
            "✅ Passed + 🫱 Manual: {} ({:.1}%)",
            s.success_combined(),
            s.success_percent()
        )
    }

    pub fn write_json(&self, w: &mut impl Write) -> io::Result<()> {
        let report = JsonReport {
            tests: self
                .rows
                .iter()
                .map(|(entry, classification)| JsonRow {
                    id: &entry.id,
                    kind: entry.kind.as_str(),
                    classification,
                })
                .collect(),
            statistics: &self.stats,
            success_combined: self.stats.success_combined(),
        };
        serde_json::to_writer_pretty(&mut *w, &report)?;
        writeln!(w)
    }
}
