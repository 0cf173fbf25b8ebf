use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use sd_core::TagRegistry;
use sd_simulation::build_world;

/// Register every tag the level uses, in entity order, and show the bit each
/// one got and how many entities carry it.
pub fn run(dir: &Path, config_name: &str) -> Result<(), String> {
    let config = super::load_config(dir, config_name)?;
    let world = build_world(&config).map_err(|e| format!("failed to build level: {e}"))?;

    let mut registry = TagRegistry::new();
    for entity in world.all_entities() {
        registry.bits(&entity.tags).map_err(|e| e.to_string())?;
        if let Some(body) = &entity.components.body {
            registry
                .bits(&body.collision_tags)
                .map_err(|e| e.to_string())?;
        }
    }

    if registry.is_empty() {
        println!("  No tags in use.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Tag", "Bit", "Mask", "Entities"]);
    for (tag, bit) in registry.iter() {
        let count = world.tagged(tag).len();
        table.add_row(vec![
            tag.to_string(),
            bit.to_string(),
            format!("{:#010x}", 1u32 << bit),
            count.to_string(),
        ]);
    }

    println!(
        "  {} {}",
        "Tags".bold(),
        format!("({} of 32 bits assigned)", registry.len()).dimmed()
    );
    println!();
    println!("{table}");
    Ok(())
}
