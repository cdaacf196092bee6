use crate::archive::{self, is_supported_archive, mod_dir_name, Extractor};
use crate::config::AppConfig;
use crate::error::{ArchiveError, InstallError};
use crate::library::ModRepository;
use crate::metadata::{self, ModDescriptor};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    Replace,
    Forbid,
}

/// Extract, parse and place mods into a storage root. Callers must not run
/// two installers against the same storage root at once.
#[derive(Debug, Clone)]
pub struct Installer {
    storage_root: PathBuf,
    temp_root: PathBuf,
    extractor: Extractor,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstallStatus {
    Installed { mod_id: String, display_name: String },
    Skipped { mod_id: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallOutcome {
    pub archive: PathBuf,
    #[serde(flatten)]
    pub status: InstallStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<InstallOutcome>,
}

impl BatchSummary {
    fn push(&mut self, archive: &Path, status: InstallStatus) {
        match status {
            InstallStatus::Installed { .. } => self.succeeded += 1,
            InstallStatus::Skipped { .. } => self.skipped += 1,
            InstallStatus::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(InstallOutcome {
            archive: archive.to_path_buf(),
            status,
        });
    }
}

impl Installer {
    pub fn new(storage_root: PathBuf, temp_root: PathBuf, extractor: Extractor) -> Self {
        Self {
            storage_root,
            temp_root,
            extractor,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.storage_dir.clone(),
            config.temp_root(),
            Extractor::new(config.unrar_path.clone()),
        )
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn install_dir(&self, mod_id: &str) -> PathBuf {
        self.storage_root.join(mod_dir_name(mod_id))
    }

    pub fn install(
        &self,
        archive: &Path,
        overwrite: OverwritePolicy,
    ) -> Result<ModDescriptor, InstallError> {
        fs::create_dir_all(&self.temp_root)
            .map_err(|err| InstallError::fs("create temp root", &self.temp_root, err))?;
        // Dropping `scratch` deletes everything extracted, on every path out.
        let scratch = tempfile::Builder::new()
            .prefix("civforge-")
            .tempdir_in(&self.temp_root)
            .map_err(|err| InstallError::fs("create temp dir", &self.temp_root, err))?;

        let extracted = self.extractor.extract(archive, scratch.path())?;
        let descriptor =
            metadata::parse_modinfo_named(&extracted.metadata_file, &extracted.folder_name)?;

        let dest = self.install_dir(&descriptor.mod_id);
        if dest.exists() {
            if let Some(existing) = installed_mod_id(&dest) {
                if existing != descriptor.mod_id {
                    return Err(InstallError::IdCollision {
                        mod_id: descriptor.mod_id,
                        existing,
                    });
                }
            }
            if overwrite == OverwritePolicy::Forbid {
                return Err(InstallError::AlreadyExists(descriptor.mod_id));
            }
            fs::remove_dir_all(&dest)
                .map_err(|err| InstallError::fs("remove installed mod", &dest, err))?;
        }
        fs::create_dir_all(&self.storage_root)
            .map_err(|err| InstallError::fs("create storage root", &self.storage_root, err))?;
        if let Err(err) = archive::move_dir(&extracted.root, &dest) {
            let _ = fs::remove_dir_all(&dest);
            return Err(into_install_error(err));
        }

        Ok(descriptor.with_source_path(dest))
    }

    /// Deletes the installed directory. Returns false if nothing was there.
    pub fn uninstall(&self, mod_id: &str) -> Result<bool, InstallError> {
        remove_if_present(&self.install_dir(mod_id))
    }

    /// Deletes a recorded `source_path`, refusing paths outside the
    /// storage root.
    pub fn uninstall_path(&self, path: &Path) -> Result<bool, InstallError> {
        if !path.starts_with(&self.storage_root) || path == self.storage_root {
            return Ok(false);
        }
        remove_if_present(path)
    }

    /// Installs archives one after another, recording each success in
    /// `repository`. A failing archive never stops the rest.
    pub fn install_batch(
        &self,
        inputs: &[PathBuf],
        overwrite: OverwritePolicy,
        repository: &mut dyn ModRepository,
    ) -> BatchSummary {
        let archives = expand_inputs(inputs);
        let total = archives.len();
        let mut summary = BatchSummary::default();

        for (index, archive) in archives.iter().enumerate() {
            log::info!("[{}/{}] installing {}", index + 1, total, archive.display());
            let status = match self.install(archive, overwrite) {
                Ok(descriptor) => {
                    let mod_id = descriptor.mod_id.clone();
                    let display_name = descriptor.display_name.clone();
                    match repository.upsert(descriptor) {
                        Ok(()) => {
                            log::info!("installed {display_name} ({mod_id})");
                            InstallStatus::Installed {
                                mod_id,
                                display_name,
                            }
                        }
                        Err(err) => {
                            log::warn!("record {mod_id} failed: {err:#}");
                            InstallStatus::Failed {
                                error: format!("{err:#}"),
                            }
                        }
                    }
                }
                Err(InstallError::AlreadyExists(mod_id)) => {
                    log::warn!("{mod_id} is already installed, skipping {}", archive.display());
                    InstallStatus::Skipped { mod_id }
                }
                Err(err) => {
                    log::warn!("install {} failed: {err}", archive.display());
                    InstallStatus::Failed {
                        error: err.to_string(),
                    }
                }
            };
            summary.push(archive, status);
        }

        log::info!(
            "batch finished: {} installed, {} failed, {} skipped",
            summary.succeeded,
            summary.failed,
            summary.skipped
        );
        summary
    }
}

/// Directories expand to the supported archives directly inside them,
/// sorted by name. Files pass through untouched.
pub fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            out.push(input.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = match fs::read_dir(input) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| is_supported_archive(path))
                .collect(),
            Err(err) => {
                log::warn!("read {} failed: {err}", input.display());
                continue;
            }
        };
        found.sort();
        out.extend(found);
    }
    out
}

/// Id recorded in the `.modinfo` of an installed folder.
fn installed_mod_id(dir: &Path) -> Option<String> {
    let metadata_file = archive::find_modinfo(dir)?;
    metadata::read_mod_id(&metadata_file)
}

fn remove_if_present(path: &Path) -> Result<bool, InstallError> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(path).map_err(|err| InstallError::fs("remove installed mod", path, err))?;
    Ok(true)
}

fn into_install_error(err: ArchiveError) -> InstallError {
    match err {
        ArchiveError::Filesystem {
            context,
            path,
            source,
        } => InstallError::Filesystem {
            context,
            path,
            source,
        },
        other => InstallError::Archive(other),
    }
}
