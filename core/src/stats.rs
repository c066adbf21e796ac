use serde::Serialize;

use crate::classify::{ClassKey, Classification};
use crate::util::percentage;

/// Aggregate counts over a classified catalog.
///
/// Every classification lands in exactly one bucket, so the buckets always
/// add up to `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub not_found: usize,
    pub manual: usize,
    pub skipped: usize,
    pub unknown: usize,
}

impl Statistics {
    pub fn aggregate<'a>(classifications: impl IntoIterator<Item = &'a Classification>) -> Self {
        let mut stats = Self::default();
        for c in classifications {
            stats.total += 1;
            *stats.bucket_mut(c.key) += 1;
        }
        stats
    }

    fn bucket_mut(&mut self, key: ClassKey) -> &mut usize {
        match key {
            ClassKey::Passed => &mut self.passed,
            ClassKey::Failed => &mut self.failed,
            ClassKey::NotFound => &mut self.not_found,
            ClassKey::Manual => &mut self.manual,
            ClassKey::Skipped => &mut self.skipped,
            ClassKey::Unknown => &mut self.unknown,
        }
    }

    pub fn count(&self, key: ClassKey) -> usize {
        match key {
            ClassKey::Passed => self.passed,
            ClassKey::Failed => self.failed,
            ClassKey::NotFound => self.not_found,
            ClassKey::Manual => self.manual,
            ClassKey::Skipped => self.skipped,
            ClassKey::Unknown => self.unknown,
        }
    }

    /// Manual tests count as accepted coverage
    pub fn success_combined(&self) -> usize {
        self.passed + self.manual
    }

    pub fn percent(&self, key: ClassKey) -> f64 {
        percentage(self.count(key), self.total)
    }

    pub fn success_percent(&self) -> f64 {
        percentage(self.success_combined(), self.total)
    }
}

/// Aggregates classifications from a classified catalog
pub fn aggregate<'a, T: 'a>(
    classified: impl IntoIterator<Item = &'a (T, Classification)>,
) -> Statistics {
    Statistics::aggregate(classified.into_iter().map(|(_, c)| c))
}
