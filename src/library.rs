use crate::metadata::ModDescriptor;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

/// Record store for installed mods. The core only reads from it and hands
/// it finished descriptors.
pub trait ModRepository {
    fn upsert(&mut self, descriptor: ModDescriptor) -> Result<()>;
    fn remove(&mut self, mod_id: &str) -> Result<Option<InstalledMod>>;
    fn list(&self, enabled_only: bool) -> Vec<InstalledMod>;
    fn set_enabled(&mut self, mod_id: &str, enabled: bool) -> Result<()>;
    fn get(&self, mod_id: &str) -> Option<InstalledMod>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledMod {
    pub descriptor: ModDescriptor,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub installed_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModCount {
    pub total: usize,
    pub enabled: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Library {
    pub mods: Vec<InstalledMod>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Library {
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let library_path = data_dir.join("library.json");
        if library_path.exists() {
            let raw = fs::read_to_string(&library_path).context("read library.json")?;
            let mut library: Library = serde_json::from_str(&raw).context("parse library.json")?;
            library.mods.sort_by(|a, b| a.descriptor.mod_id.cmp(&b.descriptor.mod_id));
            library.mods.dedup_by(|a, b| a.descriptor.mod_id == b.descriptor.mod_id);
            library.path = Some(library_path);
            return Ok(library);
        }

        fs::create_dir_all(data_dir).context("create data dir")?;
        let library = Library {
            mods: Vec::new(),
            path: Some(library_path),
        };
        library.save()?;
        Ok(library)
    }

    /// Writes `library.json`. In-memory libraries are a no-op.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_string_pretty(self).context("serialize library.json")?;
        fs::write(path, raw).context("write library.json")?;
        Ok(())
    }

    pub fn set_all_enabled(&mut self, enabled: bool) -> Result<()> {
        for entry in &mut self.mods {
            entry.enabled = enabled;
        }
        self.save()
    }

    pub fn counts(&self) -> ModCount {
        ModCount {
            total: self.mods.len(),
            enabled: self.mods.iter().filter(|entry| entry.enabled).count(),
        }
    }

    /// Dependencies declared by enabled mods that are not installed.
    pub fn missing_dependencies(&self) -> Vec<(String, String)> {
        let installed: BTreeSet<&str> = self
            .mods
            .iter()
            .map(|entry| entry.descriptor.mod_id.as_str())
            .collect();
        let mut missing = Vec::new();
        for entry in self.mods.iter().filter(|entry| entry.enabled) {
            for dep in &entry.descriptor.dependencies {
                if !installed.contains(dep.as_str()) {
                    missing.push((entry.descriptor.mod_id.clone(), dep.clone()));
                }
            }
        }
        missing
    }

    fn position(&self, mod_id: &str) -> Option<usize> {
        self.mods
            .iter()
            .position(|entry| entry.descriptor.mod_id == mod_id)
    }
}

impl ModRepository for Library {
    /// Replaces any record with the same id wholesale. A reinstalled mod
    /// starts out disabled.
    fn upsert(&mut self, descriptor: ModDescriptor) -> Result<()> {
        let record = InstalledMod {
            descriptor,
            enabled: false,
            installed_at: now_timestamp(),
        };
        match self.position(&record.descriptor.mod_id) {
            Some(index) => self.mods[index] = record,
            None => {
                let index = self
                    .mods
                    .partition_point(|entry| entry.descriptor.mod_id < record.descriptor.mod_id);
                self.mods.insert(index, record);
            }
        }
        self.save()
    }

    fn remove(&mut self, mod_id: &str) -> Result<Option<InstalledMod>> {
        let Some(index) = self.position(mod_id) else {
            return Ok(None);
        };
        let removed = self.mods.remove(index);
        self.save()?;
        Ok(Some(removed))
    }

    fn list(&self, enabled_only: bool) -> Vec<InstalledMod> {
        self.mods
            .iter()
            .filter(|entry| !enabled_only || entry.enabled)
            .cloned()
            .collect()
    }

    fn set_enabled(&mut self, mod_id: &str, enabled: bool) -> Result<()> {
        let index = self
            .position(mod_id)
            .with_context(|| format!("mod {mod_id} is not installed"))?;
        self.mods[index].enabled = enabled;
        self.save()
    }

    fn get(&self, mod_id: &str) -> Option<InstalledMod> {
        self.position(mod_id).map(|index| self.mods[index].clone())
    }
}

fn now_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
