//! Declarative test catalog
//!
//! The catalog is a YAML document listing every test the project tracks,
//! each with an identifier and the way it is executed:
//!
//! ```yaml
//! tests:
//!   - id: 1
//!     type: auto
//!   - id: 16
//!     type: auto-selenium
//!   - id: 20
//!     type: manual
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use itertools::Itertools;
use log::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};
use crate::util::deserialize_ident;

/// How a catalogued test is executed, which determines where its outcome
/// is looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TestType {
    /// Performed by a human, never looked up
    Manual,
    /// Part of the automated run
    Auto,
    /// Separately invoked end-to-end scenario
    AutoSelenium,
    /// Anything else found in the catalog, kept verbatim
    Unrecognized(String),
}

impl TestType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
            Self::AutoSelenium => "auto-selenium",
            Self::Unrecognized(s) => s,
        }
    }
}

impl From<String> for TestType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "manual" => Self::Manual,
            "auto" => Self::Auto,
            "auto-selenium" => Self::AutoSelenium,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<TestType> for String {
    fn from(value: TestType) -> Self {
        match value {
            TestType::Unrecognized(s) => s,
            t => t.as_str().to_string(),
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Forward to str so width/alignment flags apply
        fmt::Display::fmt(self.as_str(), f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(deserialize_with = "deserialize_ident")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TestType,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, kind: TestType) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// The ordered list of catalogued tests. Order defines report order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    tests: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(tests: Vec<CatalogEntry>) -> Self {
        Self { tests }
    }

    /// Parses a catalog from YAML text. Blank input is an empty catalog.
    pub fn from_yaml(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let catalog: Self = serde_yaml::from_str(text)?;
        for id in catalog.tests.iter().map(|t| &t.id).duplicates() {
            warn!("Catalog lists test {} more than once", id);
        }
        Ok(catalog)
    }

    /// Loads the catalog for a reporting pass. Every failure here is fatal
    /// to the report, including a catalog without any tests.
    pub fn from_file(path: &Path) -> Result<Self> {
        let Ok(text) = fs::read_to_string(path) else {
            return Err(TallyError::MissingCatalog(path.to_path_buf()));
        };
        let catalog = Self::from_yaml(&text).map_err(|source| TallyError::MalformedCatalog {
            path: path.to_path_buf(),
            source,
        })?;
        if catalog.is_empty() {
            return Err(TallyError::EmptyCatalog(path.to_path_buf()));
        }
        debug!("Loaded {} catalog entries from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}
