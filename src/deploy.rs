use crate::archive::mod_dir_name;
use crate::library::InstalledMod;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::{
    fs,
    path::Path,
};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    /// Mod ids copied into the game directory, in deploy order.
    pub deployed: Vec<String>,
    /// Entries cleared from the game directory before copying.
    pub removed: usize,
}

/// Replaces the contents of `game_mods_dir` with the enabled mods.
pub fn deploy_enabled(mods: &[InstalledMod], game_mods_dir: &Path) -> Result<DeployReport> {
    if !game_mods_dir.is_dir() {
        bail!("game mods directory {:?} does not exist", game_mods_dir);
    }

    let removed = clear_dir(game_mods_dir)?;
    let mut deployed = Vec::new();
    for entry in mods.iter().filter(|entry| entry.enabled) {
        let descriptor = &entry.descriptor;
        if !descriptor.source_path.is_dir() {
            log::warn!(
                "skipping {}: {:?} is missing",
                descriptor.mod_id,
                descriptor.source_path
            );
            continue;
        }
        let dest = game_mods_dir.join(mod_dir_name(&descriptor.mod_id));
        let files = copy_tree(&descriptor.source_path, &dest)
            .with_context(|| format!("deploy {}", descriptor.mod_id))?;
        log::info!("deployed {} ({files} files) to {:?}", descriptor.mod_id, dest);
        deployed.push(descriptor.mod_id.clone());
    }

    Ok(DeployReport { deployed, removed })
}

fn clear_dir(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir).with_context(|| format!("read {:?}", dir))? {
        let path = entry.context("read dir entry")?.path();
        if path.is_dir() && !path.is_symlink() {
            fs::remove_dir_all(&path).with_context(|| format!("remove {:?}", path))?;
        } else {
            fs::remove_file(&path).with_context(|| format!("remove {:?}", path))?;
        }
        removed += 1;
    }
    Ok(removed)
}

fn copy_tree(source: &Path, dest: &Path) -> Result<usize> {
    let mut copied = 0;
    let walker = WalkDir::new(source)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_ignored_deploy_path(entry.path()));
    for entry in walker {
        let entry = entry.context("walk mod dir")?;
        let rel = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).with_context(|| format!("create {:?}", target))?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).context("create deploy dir")?;
            }
            fs::copy(entry.path(), &target).with_context(|| format!("copy {:?}", entry.path()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn is_ignored_deploy_path(path: &Path) -> bool {
    path.file_name().is_some_and(|name| {
        let part = name.to_string_lossy();
        part.eq_ignore_ascii_case("__MACOSX")
            || part.eq_ignore_ascii_case(".ds_store")
            || part.eq_ignore_ascii_case("thumbs.db")
            || part == ".git"
    })
}
