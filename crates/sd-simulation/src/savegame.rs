use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use sd_core::{EntityId, Value, World};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Current save file schema version.
pub const SAVE_VERSION: u32 = 1;

/// A saved game: where the player was, plus free-form properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    /// Schema version the file was written with.
    pub version: u32,
    /// When the save was made.
    pub created: DateTime<Utc>,
    /// Name of the cell the player was in.
    #[serde(default)]
    pub cell: Option<String>,
    /// Free-form game state.
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl Default for SaveGame {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveGame {
    /// An empty save game stamped with the current time.
    pub fn new() -> Self {
        Self {
            version: SAVE_VERSION,
            created: Utc::now(),
            cell: None,
            properties: BTreeMap::new(),
        }
    }

    /// A save game recording the cell `player` is in.
    pub fn capture(world: &World, player: EntityId) -> Self {
        let cell = world
            .cell_of(player)
            .map(|cell| world.entity_name(cell).to_string());
        Self {
            cell,
            ..Self::new()
        }
    }

    /// Set a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Write the save as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> SimResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("saved game to {}", path.display());
        Ok(())
    }

    /// Load a save file, rejecting versions newer than this build knows.
    pub fn load(path: &Path) -> SimResult<Self> {
        let text = fs::read_to_string(path)?;
        let save: Self = serde_json::from_str(&text).map_err(|e| SimError::InvalidSave {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if save.version > SAVE_VERSION {
            return Err(SimError::InvalidSave {
                path: path.to_path_buf(),
                reason: format!(
                    "version {} is newer than supported version {SAVE_VERSION}",
                    save.version
                ),
            });
        }
        Ok(save)
    }
}
