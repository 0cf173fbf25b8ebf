use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use sd_core::GridLayout;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Gravity applied to dynamic bodies, in world units per second squared.
    pub gravity: Vector3<f32>,
    /// Physics step length in seconds. 0 steps by whatever `dt` the caller passes.
    pub fixed_step: f64,
    /// Most physics steps taken for one call to `step`; the rest of the
    /// accumulated time is dropped.
    pub max_substeps: u32,
    /// Maximum event log size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: Vector3::new(0.0, 0.0, -9.81),
            fixed_step: 1.0 / 60.0,
            max_substeps: 5,
            max_events: 0,
        }
    }
}

impl SimConfig {
    /// Set gravity.
    pub fn with_gravity(mut self, gravity: Vector3<f32>) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the physics step length (0 = variable step).
    pub fn with_fixed_step(mut self, step: f64) -> Self {
        self.fixed_step = step;
        self
    }

    /// Set the most physics steps per frame.
    pub fn with_max_substeps(mut self, n: u32) -> Self {
        self.max_substeps = n;
        self
    }

    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }
}

/// Where the player starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroSpawn {
    /// Name of the starting cell, e.g. `cell 1:1`.
    pub cell: String,
    /// Height above the cell origin.
    #[serde(default = "default_spawn_height")]
    pub height: f32,
}

fn default_spawn_height() -> f32 {
    2.0
}

/// A scripted entity placed by the level file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    /// Unique entity name, used by links.
    pub name: String,
    /// Built-in class name, e.g. `timer` or `TriggerEntity`.
    pub class: String,
    /// Name of the cell to place the entity in.
    #[serde(default)]
    pub cell: Option<String>,
    /// Extra whitespace-separated tags.
    #[serde(default)]
    pub tags: String,
    /// Offset from the cell origin (or the world origin).
    #[serde(default)]
    pub position: Option<[f32; 3]>,
    /// Inputs triggered once after the level is built, in order.
    #[serde(default)]
    pub start: Vec<StartInput>,
}

/// An input to trigger when the level starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartInput {
    /// The input to trigger.
    pub input: String,
    /// The value to trigger it with.
    #[serde(default)]
    pub value: sd_core::Value,
}

/// One output→input wire between level entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    /// Name of the entity whose output is wired.
    pub from: String,
    /// The output to wire.
    pub output: String,
    /// Name of the receiving entity.
    pub to: String,
    /// The input the output triggers.
    pub input: String,
}

/// A game folder's configuration: simulation settings plus the level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Display name of the game.
    pub name: String,
    /// Simulation settings.
    #[serde(default)]
    pub sim: SimConfig,
    /// The cell grid.
    pub level: GridLayout,
    /// Where the player starts; no hero without it.
    #[serde(default)]
    pub hero: Option<HeroSpawn>,
    /// Scripted entities, in creation order.
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
    /// Output→input wiring between entities.
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

impl GameConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> SimResult<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| SimError::InvalidConfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate(path)?;
        log::info!("loaded config \"{}\" from {}", config.name, path.display());
        Ok(config)
    }

    /// Locate `<dir>/config/<name>.cfg` and load it.
    pub fn discover(dir: &Path, name: &str) -> SimResult<Self> {
        Self::load(&locate_config(dir, name)?)
    }

    fn validate(&self, path: &Path) -> SimResult<()> {
        let invalid = |reason: &str| SimError::InvalidConfig {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };
        if self.sim.fixed_step < 0.0 {
            return Err(invalid("sim.fixed_step must not be negative"));
        }
        if self.level.cell_size <= 0.0 {
            return Err(invalid("level.cell_size must be positive"));
        }
        if self.level.rows.is_empty() {
            return Err(invalid("level has no cells"));
        }
        Ok(())
    }
}

/// Find a config file: `<dir>/config/<name>.cfg`, else the same path with the
/// host OS appended (`<name>.cfg.linux`, `<name>.cfg.windows`, ...).
pub fn locate_config(dir: &Path, name: &str) -> SimResult<PathBuf> {
    let base = dir.join("config").join(format!("{name}.cfg"));
    if base.is_file() {
        return Ok(base);
    }
    let specific = dir
        .join("config")
        .join(format!("{name}.cfg.{}", std::env::consts::OS));
    if specific.is_file() {
        return Ok(specific);
    }
    Err(SimError::MissingConfig {
        name: name.to_string(),
        dir: dir.to_path_buf(),
    })
}
