use crate::archive::DEFAULT_UNRAR;
use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const APP_DIR: &str = "civforge";
const GAME_DIR: &str = "Sid Meier's Civilization VII";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub game_mods_dir: PathBuf,
    /// Parent of the per-install scratch roots. System temp dir when unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    #[serde(default = "default_unrar")]
    pub unrar_path: PathBuf,
    #[serde(default = "default_true")]
    pub confirm_overwrite: bool,
}

impl AppConfig {
    pub fn load_or_create() -> Result<Self> {
        let data_dir = base_data_dir()?;
        fs::create_dir_all(&data_dir).context("create app data dir")?;
        let path = data_dir.join("config.json");
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read app config")?;
            let mut config: AppConfig = serde_json::from_str(&raw).context("parse app config")?;
            config.data_dir = data_dir;
            config.ensure_dirs()?;
            return Ok(config);
        }

        let mut config = AppConfig::with_data_dir(&data_dir);
        config.game_mods_dir = default_game_mods_dir()?;
        config.ensure_dirs()?;
        config.save()?;
        Ok(config)
    }

    /// Config rooted at an explicit directory, for portable setups and tests.
    pub fn with_data_dir(data_dir: &Path) -> Self {
        AppConfig {
            data_dir: data_dir.to_path_buf(),
            storage_dir: data_dir.join("ModStorage"),
            game_mods_dir: data_dir.join("GameMods"),
            temp_dir: None,
            unrar_path: default_unrar(),
            confirm_overwrite: true,
        }
    }

    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).context("create app data dir")?;
        let path = self.data_dir.join("config.json");
        let raw = serde_json::to_string_pretty(self).context("serialize app config")?;
        fs::write(path, raw).context("write app config")?;
        Ok(())
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.storage_dir).context("create mod storage dir")?;
        if let Some(temp_dir) = &self.temp_dir {
            fs::create_dir_all(temp_dir).context("create temp dir")?;
        }
        Ok(())
    }

    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn default_true() -> bool {
    true
}

fn default_unrar() -> PathBuf {
    PathBuf::from(DEFAULT_UNRAR)
}

fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join(APP_DIR))
}

fn default_game_mods_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base
        .data_local_dir()
        .join("Firaxis Games")
        .join(GAME_DIR)
        .join("Mods"))
}
