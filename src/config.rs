use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{BrainError, Result};

/// Colour scheme remembered for the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

/// User preferences, exported alongside the notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: Theme,
    /// Whether to offer forgotten notes when the application starts
    pub show_resurface_on_open: bool,
    /// How many notes a resurface pick returns by default
    pub resurface_count: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            theme: Theme::Dark,
            show_resurface_on_open: true,
            resurface_count: 2,
        }
    }
}

impl Settings {
    /// Updates one setting from a `key=value` pair as typed on the command line.
    pub fn set(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .ok_or_else(|| BrainError::ConfigError {
                message: format!("Expected key=value, got '{}'", assignment),
            })?;

        let invalid = |value: &str| BrainError::ConfigError {
            message: format!("Invalid value '{}' for {}", value, key),
        };

        match key {
            "theme" => {
                self.theme = match value.to_lowercase().as_str() {
                    "light" => Theme::Light,
                    "dark" => Theme::Dark,
                    _ => return Err(invalid(value)),
                }
            }
            "show_resurface_on_open" | "showResurfaceOnOpen" => {
                self.show_resurface_on_open = value.parse().map_err(|_| invalid(value))?
            }
            "resurface_count" | "resurfaceCount" => {
                self.resurface_count = value.parse().map_err(|_| invalid(value))?
            }
            _ => {
                return Err(BrainError::ConfigError {
                    message: format!("Unknown setting: {}", key),
                })
            }
        }
        Ok(())
    }
}

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Directory where notes are stored
    pub notes_dir: PathBuf,

    /// User preferences
    #[serde(default)]
    pub settings: Settings,
}

impl Default for Config {
    fn default() -> Self {
        let notes_dir = project_dirs()
            .map(|dirs| dirs.data_dir().join("notes"))
            .unwrap_or_else(|| PathBuf::from(".quickbrain").join("notes"));
        Config {
            notes_dir,
            settings: Settings::default(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "quickbrain", "quickbrain")
}

impl Config {
    /// Where the configuration file lives when no path is given.
    pub fn default_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from(".quickbrain").join("config.json"))
    }

    /// Reads the configuration, or the defaults when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(
                "No configuration at {}, using defaults",
                path.display()
            );
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| BrainError::ConfigError {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })
    }

    /// Writes the configuration atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|_| BrainError::DirectoryError { path: dir.clone() })?;

        let mut temp_file = NamedTempFile::new_in(&dir)?;
        temp_file.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        temp_file.flush()?;
        temp_file
            .persist(path)
            .map_err(|e| BrainError::Io(e.error))?;

        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}
