use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use sd_core::Direction;
use sd_simulation::build_world;

pub fn run(dir: &Path, config_name: &str) -> Result<(), String> {
    let config = super::load_config(dir, config_name)?;
    let world = build_world(&config).map_err(|e| format!("failed to build level: {e}"))?;

    let mut header = vec!["Cell".to_string(), "Position".to_string(), "Members".to_string()];
    header.extend(Direction::ALL.iter().map(|d| d.key().to_uppercase()));

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);

    for cell_id in world.grid().iter().flatten() {
        let Some(cell) = world.get_entity(*cell_id) else {
            continue;
        };
        let members = cell
            .components
            .cell
            .as_ref()
            .map_or(0, |c| c.members.len());
        let mut row = vec![
            cell.name.clone(),
            super::format_position(cell),
            members.to_string(),
        ];
        for dir in Direction::ALL {
            row.push(match world.neighbour(*cell_id, dir) {
                Some(n) => short_name(world.entity_name(n)).to_string(),
                None => "--".to_string(),
            });
        }
        table.add_row(row);
    }

    let rows = world.grid().len();
    let cols = world.grid().first().map_or(0, Vec::len);
    println!(
        "  {} '{}' {}",
        "Cells".bold(),
        config.name,
        format!("({cols}x{rows}, size {})", config.level.cell_size).dimmed()
    );
    println!();
    println!("{table}");
    Ok(())
}

/// `cell 1:2` -> `1:2`
fn short_name(name: &str) -> &str {
    name.strip_prefix("cell ").unwrap_or(name)
}
