//! Application settings
//!
//! Settings are read from a JSON file and then overridden by command-line
//! options. Every field has a default, so a partial file (or no file at all)
//! is fine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::executor::{self, ShortcutParams, DEFAULT_SHORTCUTS_FILE};

/// Application settings loaded from `settings.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Path to the shortcuts document
    pub shortcuts_file: PathBuf,
    /// Profile to use; empty means the first profile
    pub profile: String,
    /// Program whose first line of output names the profile to use
    pub profile_selector: Option<PathBuf>,
    /// Log debug information
    pub log: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            shortcuts_file: PathBuf::from(DEFAULT_SHORTCUTS_FILE),
            profile: String::new(),
            profile_selector: None,
            log: false,
        }
    }
}

impl AppSettings {
    /// `<config dir>/hotcuts/settings.json`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hotcuts").join("settings.json"))
    }

    /// Load settings from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path.as_ref()))?;

        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings JSON in {:?}", path.as_ref()))?;

        Ok(settings)
    }

    /// Load from `path`, or the default location; a missing file gives defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            debug!("No config directory; using default settings");
            return Ok(Self::default());
        };

        if !path.exists() {
            debug!("Settings file {:?} not found; using defaults", path);
            return Ok(Self::default());
        }

        Self::load_from_file(&path)
    }

    /// Override settings with values given on the command line
    pub fn apply_overrides(
        &mut self,
        file: Option<PathBuf>,
        profile: Option<String>,
        selector: Option<PathBuf>,
    ) {
        if let Some(file) = file {
            self.shortcuts_file = file;
        }
        if let Some(profile) = profile {
            self.profile = profile;
        }
        if let Some(selector) = selector {
            self.profile_selector = Some(selector);
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.shortcuts_file.as_os_str().is_empty() {
            anyhow::bail!("Shortcuts file must be specified");
        }

        if let Some(selector) = &self.profile_selector {
            if selector.as_os_str().is_empty() {
                anyhow::bail!("Profile selector path cannot be empty");
            }
        }

        Ok(())
    }

    /// Build resolution parameters, running the profile selector if set
    ///
    /// A selector that prints a name wins over the configured profile.
    pub fn shortcut_params(&self) -> crate::Result<ShortcutParams> {
        let mut profile = self.profile.clone();
        if let Some(selector) = &self.profile_selector {
            let selected = executor::select_profile(selector)?;
            if !selected.is_empty() {
                profile = selected;
            }
        }

        Ok(ShortcutParams::new()
            .with_file(&self.shortcuts_file)
            .with_profile(profile))
    }
}
