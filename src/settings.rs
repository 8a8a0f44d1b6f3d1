//! Saved settings (`config.json`) and the user's model replacement file

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::replace::{self, ModelReplacementTable};
use crate::sky::GenerationConfig;

pub const SETTINGS_FILE: &str = "config.json";
pub const USER_TABLE_FILE: &str = "modelreplace.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub input_path: String,
    pub output_path: String,
    pub skybox_only: bool,
    pub replace_models: bool,
    pub copy_fog_settings: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            input_path: String::new(),
            output_path: String::new(),
            skybox_only: false,
            replace_models: true,
            copy_fog_settings: true,
        }
    }
}

impl Settings {
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            input_path: PathBuf::from(&self.input_path),
            output_path: PathBuf::from(&self.output_path),
            skybox_only: self.skybox_only,
            replace_models: self.replace_models,
            copy_fog_settings: self.copy_fog_settings,
        }
    }
}

/// Directory holding `config.json` and `modelreplace.json`
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> SettingsStore {
        SettingsStore { dir: dir.into() }
    }

    /// `<platform config dir>/autosky`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("autosky"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|err| Error::Settings(format!("could not create {}: {}", self.dir.display(), err)))
    }

    /// Loads the saved settings, writing the defaults out if there are none yet
    pub fn load_settings(&self) -> Result<Settings> {
        let path = self.dir.join(SETTINGS_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|err| Error::Settings(format!("{} is not valid: {}", path.display(), err))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings at {}; Using defaults", path.display());
                let settings = Settings::default();
                self.save_settings(&settings)?;
                Ok(settings)
            }
            Err(err) => Err(Error::Settings(format!("could not read {}: {}", path.display(), err))),
        }
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(SETTINGS_FILE);
        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(&path, content)
            .map_err(|err| Error::Settings(format!("could not write {}: {}", path.display(), err)))
    }

    /// Built-in replacement index merged with the user's entries
    pub fn load_table(&self) -> Result<ModelReplacementTable> {
        ModelReplacementTable::with_builtin(replace::load_user_table(self.dir.join(USER_TABLE_FILE))?)
    }

    pub fn save_table(&self, table: &ModelReplacementTable) -> Result<()> {
        self.ensure_dir()?;
        replace::save_user_table(self.dir.join(USER_TABLE_FILE), table)
    }
}
