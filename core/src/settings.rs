use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::deserialize_ident;

/// Settings file picked up from the working directory when present
pub const DEFAULT_SETTINGS_FILE: &str = "tally.json";

/// Identifier (and optionally a description) assigned to an automated test
/// by its full name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TestTag {
    #[serde(deserialize_with = "deserialize_ident")]
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Declarative test list
    pub catalog: PathBuf,
    /// Document written by the automated run collector
    pub automated_results: PathBuf,
    /// Document merged by end-to-end scenarios
    pub e2e_results: PathBuf,
    /// Explicit tags for automated tests, keyed by full test name
    pub tags: BTreeMap<String, TestTag>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("test_list.yaml"),
            automated_results: PathBuf::from("result_test_auto.json"),
            e2e_results: PathBuf::from("result_test_selenium.json"),
            tags: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Cannot open settings {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Cannot parse settings {}", path.display()))
    }

    /// Loads settings from an explicit path, which must exist, or else from
    /// `tally.json` in the working directory if there is one.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => Ok(Self::discover(Path::new(DEFAULT_SETTINGS_FILE))),
        }
    }

    /// Settings from a file that may not exist. An unusable file is
    /// ignored with a warning.
    fn discover(local: &Path) -> Self {
        if !local.exists() {
            return Self::default();
        }
        match Self::from_file(local) {
            Ok(settings) => {
                log::debug!("Using settings from {}", local.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring settings: {:#}", e);
                Self::default()
            }
        }
    }
}
