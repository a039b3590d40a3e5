//! Serializable description of a built registry.
//!
//! Snapshots are generated at build/deploy time and checked at startup with
//! `Registry::verify`, so a handler map that drifted from the reviewed one
//! fails fast instead of routing commands somewhere unexpected.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::SnapshotError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub handler: String,
    pub transaction: bool,
    #[serde(default)]
    pub rollback: bool,
    #[serde(default)]
    pub deferred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryEntry {
    pub handler: String,
}

/// Handler map keyed by request name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub commands: BTreeMap<String, CommandEntry>,
    #[serde(default)]
    pub queries: BTreeMap<String, QueryEntry>,
}

impl RegistrySnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SnapshotError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// One line per entry that differs between `self` (expected) and `actual`.
    pub fn diff(&self, actual: &RegistrySnapshot) -> Vec<String> {
        let mut drift = diff_maps("command", &self.commands, &actual.commands);
        drift.extend(diff_maps("query", &self.queries, &actual.queries));
        drift
    }
}

fn diff_maps<T: PartialEq + std::fmt::Debug>(
    kind: &str,
    expected: &BTreeMap<String, T>,
    actual: &BTreeMap<String, T>,
) -> Vec<String> {
    let mut drift = Vec::new();
    for (name, entry) in expected {
        match actual.get(name) {
            None => drift.push(format!("{} {} is not registered", kind, name)),
            Some(found) if found != entry => drift.push(format!(
                "{} {} expected {:?}, found {:?}",
                kind, name, entry, found
            )),
            Some(_) => {}
        }
    }
    for name in actual.keys() {
        if !expected.contains_key(name) {
            drift.push(format!("{} {} is missing from the snapshot", kind, name));
        }
    }
    drift
}
