use nalgebra::Vector3;
use sd_core::logic::builtin;
use sd_core::{Entity, EntityId, World};

use crate::config::GameConfig;
use crate::error::{SimError, SimResult};
use crate::hero::{ControllerSystem, spawn_hero};
use crate::simulation::Simulation;

/// A running game: the simulation plus the player, if the level has one.
#[derive(Debug)]
pub struct Game {
    /// The running simulation.
    pub sim: Simulation,
    /// The player entity.
    pub hero: Option<EntityId>,
}

/// Build the world a config describes: the cell grid, the scripted
/// entities, their wiring, and their start inputs.
pub fn build_world(config: &GameConfig) -> SimResult<World> {
    let mut world = World::new();
    world.build_grid(&config.level)?;

    for spec in &config.entities {
        let class = builtin(&spec.class).ok_or_else(|| SimError::UnknownClass(spec.class.clone()))?;
        let mut entity = Entity::new(&class, spec.name.clone()).with_tags(&spec.tags);
        let mut origin = Vector3::zeros();
        if let Some(cell_name) = &spec.cell {
            let cell = lookup(&world, cell_name)?;
            origin = world.entity(cell)?.position;
            entity = entity.in_cell(cell);
        }
        let offset = spec.position.map_or(Vector3::zeros(), Vector3::from);
        world.add_entity(entity.at(origin + offset))?;
    }

    for link in &config.links {
        let from = lookup(&world, &link.from)?;
        let to = lookup(&world, &link.to)?;
        world.bind_output(from, &link.output, to, &link.input)?;
    }

    for spec in &config.entities {
        let id = lookup(&world, &spec.name)?;
        for start in &spec.start {
            world.trigger_input(id, &start.input, start.value.clone())?;
        }
    }

    log::info!(
        "built level \"{}\": {} entities, {} links",
        config.name,
        world.entity_count(),
        config.links.len()
    );
    Ok(world)
}

/// Build the world, wrap it in a simulation with the player controller, and
/// spawn the hero where the config says.
pub fn start_game(config: &GameConfig) -> SimResult<Game> {
    let world = build_world(config)?;
    let mut sim = Simulation::new(world, config.sim.clone());
    sim.add_system(ControllerSystem::new());

    let hero = match &config.hero {
        Some(spawn) => {
            let cell = lookup(sim.world(), &spawn.cell)?;
            let position = sim.world().entity(cell)?.position + Vector3::new(0.0, 0.0, spawn.height);
            Some(spawn_hero(&mut sim, Some(cell), position)?)
        }
        None => None,
    };
    Ok(Game { sim, hero })
}

fn lookup(world: &World, name: &str) -> SimResult<EntityId> {
    world
        .find_id_by_name(name)
        .ok_or_else(|| SimError::UnknownEntity(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EntitySpec, HeroSpawn, LinkSpec, SimConfig, StartInput};
    use sd_core::{GridLayout, Value};

    fn entity(name: &str, class: &str) -> EntitySpec {
        EntitySpec {
            name: name.into(),
            class: class.into(),
            cell: None,
            tags: String::new(),
            position: None,
            start: Vec::new(),
        }
    }

    fn config() -> GameConfig {
        let mut clock = entity("clock", "timer");
        clock.start = vec![
            StartInput {
                input: "RefireTime".into(),
                value: Value::Float(0.25),
            },
            StartInput {
                input: "Enable".into(),
                value: Value::Null,
            },
        ];
        let mut lamp = entity("lamp", "VisibleEntity");
        lamp.cell = Some("cell 1:0".into());
        lamp.position = Some([1.0, 2.0, 3.0]);
        lamp.tags = "light".into();

        GameConfig {
            name: "test".into(),
            sim: SimConfig::default(),
            level: GridLayout::uniform(1, 2, 64.0),
            hero: Some(HeroSpawn {
                cell: "cell 0:0".into(),
                height: 2.0,
            }),
            entities: vec![clock, lamp],
            links: vec![LinkSpec {
                from: "clock".into(),
                output: "OnTimer".into(),
                to: "lamp".into(),
                input: "Kill".into(),
            }],
        }
    }

    #[test]
    fn builds_grid_entities_and_links() {
        let world = build_world(&config()).unwrap();
        assert_eq!(world.cells().count(), 2);

        let lamp = world.find_by_name("lamp").unwrap();
        assert_eq!(lamp.position, Vector3::new(65.0, 2.0, 3.0));
        assert!(lamp.has_tag("light"));
        assert_eq!(lamp.cell, world.find_id_by_name("cell 1:0"));

        let clock = world.find_by_name("clock").unwrap();
        assert!(clock.is_enabled());
        assert_eq!(clock.components.timer.as_ref().unwrap().interval, 0.25);
        assert_eq!(clock.bindings("OnTimer").len(), 1);
    }

    #[test]
    fn started_game_runs_the_wiring() {
        let mut game = start_game(&config()).unwrap();
        let lamp = game.sim.world().find_id_by_name("lamp").unwrap();
        let hero = game.hero.unwrap();
        assert_eq!(
            game.sim.world().cell_of(hero),
            game.sim.world().find_id_by_name("cell 0:0")
        );

        game.sim.run(20, 1.0 / 60.0).unwrap();
        assert!(game.sim.world().is_killed(lamp));
    }

    #[test]
    fn unknown_names_are_reported() {
        let mut bad_class = config();
        bad_class.entities.push(entity("ghost", "PoltergeistEntity"));
        assert!(matches!(
            build_world(&bad_class),
            Err(SimError::UnknownClass(name)) if name == "PoltergeistEntity"
        ));

        let mut bad_link = config();
        bad_link.links[0].to = "nobody".into();
        assert!(matches!(
            build_world(&bad_link),
            Err(SimError::UnknownEntity(name)) if name == "nobody"
        ));

        let mut bad_input = config();
        bad_input.links[0].input = "Explode".into();
        assert!(matches!(
            build_world(&bad_input),
            Err(SimError::Core(sd_core::CoreError::UnknownInput { .. }))
        ));
    }
}
