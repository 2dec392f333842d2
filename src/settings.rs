//! Runner settings and preferences
//!
//! Persisted as JSON next to the save directory, separate from game saves.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_AUTOSAVES, MAX_PLAYERS, SAVE_DIR};

/// Difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    #[default]
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" | "1" => Some(Difficulty::Easy),
            "normal" | "2" => Some(Difficulty::Normal),
            "hard" | "3" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Numeric level written to save files
    pub fn level(&self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Normal => 2,
            Difficulty::Hard => 3,
        }
    }
}

/// Settings load/save errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory for autosaves, named saves and replays
    pub save_dir: PathBuf,
    /// Autosaves kept before the oldest are deleted
    pub max_autosaves: usize,
    /// Difficulty for new games
    pub difficulty: Difficulty,
    /// Players for new games
    pub players: usize,
    /// Ticks within which a second press counts as a double use
    pub double_use_ticks: u32,
    /// Ticks the headless runner simulates
    pub demo_ticks: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from(SAVE_DIR),
            max_autosaves: MAX_AUTOSAVES,
            difficulty: Difficulty::Easy,
            players: 1,
            double_use_ticks: 15,
            demo_ticks: 60 * 60,
        }
    }
}

impl Settings {
    /// Player count clamped to what a level supports
    pub fn effective_players(&self) -> usize {
        self.players.clamp(1, MAX_PLAYERS)
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::info!("Using default settings ({e})");
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}
