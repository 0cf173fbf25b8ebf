use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use sd_core::Value;
use sd_simulation::{SaveGame, SimEventKind, start_game};

pub fn run(
    dir: &Path,
    config_name: &str,
    frames: u64,
    dt: f64,
    send: &[String],
    show_events: bool,
    save: Option<&Path>,
) -> Result<(), String> {
    let config = super::load_config(dir, config_name)?;
    let mut game = start_game(&config).map_err(|e| format!("failed to build level: {e}"))?;

    for spec in send {
        let (name, args) = parse_send(spec)?;
        game.sim
            .send(name, &args)
            .map_err(|e| format!("event \"{name}\" failed: {e}"))?;
    }
    game.sim
        .run(frames, dt)
        .map_err(|e| format!("simulation error: {e}"))?;

    let sim = &game.sim;
    let world = sim.world();

    // Header
    println!(
        "  {} '{}' {}",
        "Level".bold(),
        config.name,
        format!("({frames} frames, dt={dt:.4}s)").dimmed()
    );
    println!(
        "  {} entities, {} events logged",
        world.entity_count(),
        sim.events().len()
    );
    if let Some(hero) = game.hero {
        match world.cell_of(hero) {
            Some(cell) => println!("  Hero in {}", world.entity_name(cell).cyan()),
            None => println!("  Hero is {}", "gone".red()),
        }
    }
    println!();

    if show_events {
        println!("  {}", "Event Log".bold().underline());
        println!();
        for event in sim.events().events() {
            let tick_label = format!("[frame {:>4}]", event.tick).dimmed();
            let desc = colorize_event(&event.kind, &event.description);
            println!("  {tick_label} {desc}");
        }
        if sim.events().is_empty() {
            println!("  {}", "(no events)".dimmed());
        }
        println!();
    }

    // Scripted entities; cells have their own command.
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Entity", "Class", "Cell", "Tags", "Position"]);
    let mut rows = 0;
    for entity in world.all_entities().filter(|e| !e.is_cell()) {
        let cell = entity
            .cell
            .map(|c| world.entity_name(c).to_string())
            .unwrap_or_else(|| "--".to_string());
        table.add_row(vec![
            entity.name.clone(),
            entity.class().name().to_string(),
            cell,
            entity.tags.join(" "),
            super::format_position(entity),
        ]);
        rows += 1;
    }
    if rows > 0 {
        println!("{table}");
        println!();
    }

    if let Some(path) = save {
        let save_game = match game.hero {
            Some(hero) => SaveGame::capture(world, hero),
            None => SaveGame::new(),
        };
        save_game
            .with_property("frames", sim.current_tick())
            .save(path)
            .map_err(|e| format!("failed to save game: {e}"))?;
        println!("  Saved game to {}", path.display());
    }

    Ok(())
}

/// Split `name=[args]` into the event name and its arguments.
fn parse_send(spec: &str) -> Result<(&str, Vec<Value>), String> {
    let Some((name, json)) = spec.split_once('=') else {
        return Ok((spec, Vec::new()));
    };
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| format!("bad arguments for event \"{name}\": {e}"))?;
    let args = match parsed {
        serde_json::Value::Array(items) => items.iter().map(to_value).collect::<Result<_, _>>()?,
        other => vec![to_value(&other)?],
    };
    Ok((name, args))
}

fn to_value(json: &serde_json::Value) -> Result<Value, String> {
    Ok(match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().ok_or_else(|| format!("number out of range: {n}"))?),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(items) => {
            Value::List(items.iter().map(to_value).collect::<Result<_, _>>()?)
        }
        serde_json::Value::Object(_) => return Err("event arguments cannot be objects".into()),
    })
}

fn colorize_event(kind: &SimEventKind, description: &str) -> colored::ColoredString {
    match kind {
        SimEventKind::Spawned { .. } => description.green(),
        SimEventKind::Removed { .. } => description.red(),
        SimEventKind::Collided { .. } => description.yellow(),
        SimEventKind::ChangedCell { .. } => description.cyan(),
        SimEventKind::Used { .. } => description.blue(),
        SimEventKind::Custom { .. } => description.normal(),
    }
}
