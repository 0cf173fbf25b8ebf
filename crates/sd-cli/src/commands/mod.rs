pub mod cells;
pub mod run;
pub mod tags;

use std::path::Path;

use sd_core::Entity;
use sd_simulation::GameConfig;

/// Find and load a game folder's config.
fn load_config(dir: &Path, name: &str) -> Result<GameConfig, String> {
    GameConfig::discover(dir, name).map_err(|e| e.to_string())
}

fn format_position(entity: &Entity) -> String {
    let p = &entity.position;
    format!("({:.1}, {:.1}, {:.1})", p.x, p.y, p.z)
}
