//! File-overlap conflicts between enabled mods.
//!
//! Only the asset replacement buckets (`UIScripts`, `ImportFiles`) are
//! compared. The report is rebuilt from scratch for every call.

use crate::library::InstalledMod;
use crate::metadata::ModDescriptor;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ConflictEntry {
    pub other_mod_id: String,
    pub file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConflictReport {
    entries: BTreeMap<String, BTreeSet<ConflictEntry>>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of mods with at least one conflict.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn has_conflicts(&self, mod_id: &str) -> bool {
        self.entries.contains_key(mod_id)
    }

    pub fn conflicts_for(&self, mod_id: &str) -> impl Iterator<Item = &ConflictEntry> {
        self.entries.get(mod_id).into_iter().flatten()
    }

    pub fn conflicting_mods(&self, mod_id: &str) -> BTreeSet<&str> {
        self.conflicts_for(mod_id)
            .map(|entry| entry.other_mod_id.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<ConflictEntry>)> {
        self.entries
            .iter()
            .map(|(mod_id, entries)| (mod_id.as_str(), entries))
    }

    fn record(&mut self, mod_id: &str, other_mod_id: &str, file: &str) {
        self.entries
            .entry(mod_id.to_string())
            .or_default()
            .insert(ConflictEntry {
                other_mod_id: other_mod_id.to_string(),
                file: file.to_string(),
            });
    }
}

/// Pairwise overlap of every enabled descriptor. Descriptors sharing a
/// `mod_id` are never compared with each other.
pub fn analyze<'a, I>(enabled: I) -> ConflictReport
where
    I: IntoIterator<Item = &'a ModDescriptor>,
{
    let mods: Vec<(&str, BTreeSet<&str>)> = enabled
        .into_iter()
        .map(|descriptor| (descriptor.mod_id.as_str(), descriptor.conflict_files()))
        .collect();

    let mut report = ConflictReport::default();
    for (index, (mod_id, files)) in mods.iter().enumerate() {
        for (other_id, other_files) in mods.iter().skip(index + 1) {
            if mod_id == other_id {
                continue;
            }
            for file in files.intersection(other_files) {
                report.record(mod_id, other_id, file);
                report.record(other_id, mod_id, file);
            }
        }
    }
    report
}

pub fn analyze_installed(mods: &[InstalledMod]) -> ConflictReport {
    analyze(
        mods.iter()
            .filter(|entry| entry.enabled)
            .map(|entry| &entry.descriptor),
    )
}
