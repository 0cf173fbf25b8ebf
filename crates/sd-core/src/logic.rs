//! Built-in entity classes.
//!
//! Every class derives from [`LOGIC`], which carries the standard
//! capability set: `Kill`, `Enable`, `Disable`, `Toggle`, `FireUser1..4`
//! inputs and `OnKill`, `OnUser1..4` outputs.

use std::sync::{Arc, LazyLock};

use crate::class::{EntityClass, InputHandler};
use crate::component::{
    BodyComponent, BodyKind, BodyShape, CellComponent, TimerComponent, TimerPhase,
};
use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::value::Value;
use crate::world::World;

fn kill(world: &mut World, id: EntityId, _: &Value, _: &[Value]) -> CoreResult<()> {
    world.finish_kill(id)
}

fn enable(world: &mut World, id: EntityId, _: &Value, _: &[Value]) -> CoreResult<()> {
    world.set_enabled(id, true)
}

fn disable(world: &mut World, id: EntityId, _: &Value, _: &[Value]) -> CoreResult<()> {
    world.set_enabled(id, false)
}

fn toggle(world: &mut World, id: EntityId, _: &Value, _: &[Value]) -> CoreResult<()> {
    let enabled = world.entity(id)?.is_enabled();
    world.set_enabled(id, !enabled)
}

/// Base class of every entity.
pub static LOGIC: LazyLock<Arc<EntityClass>> = LazyLock::new(|| {
    let mut class = EntityClass::root("LogicEntity")
        .input("Kill", "Kill the entity. Fires OnKill.", InputHandler::Call(kill))
        .input("Enable", "Enable the entity's outputs.", InputHandler::Call(enable))
        .input("Disable", "Disable the entity's outputs.", InputHandler::Call(disable))
        .input("Toggle", "Flip the enabled flag.", InputHandler::Call(toggle))
        .output_with_params("OnKill", &["entity"], "Fired when the entity is killed.");
    for n in 1..=4 {
        class = class
            .input(
                &format!("FireUser{n}"),
                &format!("Fire OnUser{n} with the given value."),
                InputHandler::Fire(format!("OnUser{n}")),
            )
            .output(&format!("OnUser{n}"), &format!("Fired by FireUser{n}."));
    }
    class.shared()
});

/// Entities with a scene node.
pub static VISIBLE: LazyLock<Arc<EntityClass>> = LazyLock::new(|| {
    EntityClass::extends("VisibleEntity", &LOGIC)
        .output_with_params("OnUse", &["entity"], "Fired when a player uses the entity.")
        .shared()
});

/// Entities with a rigid body.
pub static PHYSICS: LazyLock<Arc<EntityClass>> = LazyLock::new(|| {
    EntityClass::extends("PhysicsEntity", &VISIBLE)
        .tags("physics")
        .component(|c| c.body = Some(BodyComponent::new(BodyKind::Dynamic).with_mass(1.0)))
        .output_with_params(
            "OnCollide",
            &["entity"],
            "Fired when the body touches another entity.",
        )
        .shared()
});

/// Immovable collision geometry.
pub static STATIC: LazyLock<Arc<EntityClass>> = LazyLock::new(|| {
    EntityClass::extends("StaticEntity", &PHYSICS)
        .tags("static")
        .component(|c| c.body = Some(BodyComponent::new(BodyKind::Static)))
        .shared()
});

fn trigger_setup(world: &mut World, id: EntityId) -> CoreResult<()> {
    world.bind_output(id, "OnCollide", id, "Trigger")
}

/// A volume that fires `OnTrigger` when something enters it.
pub static TRIGGER: LazyLock<Arc<EntityClass>> = LazyLock::new(|| {
    EntityClass::extends("TriggerEntity", &PHYSICS)
        .tags("trigger")
        .component(|c| c.body = Some(BodyComponent::new(BodyKind::Trigger)))
        .input(
            "Trigger",
            "Fire OnTrigger with the given entity.",
            InputHandler::Fire("OnTrigger".into()),
        )
        .input_params("Trigger", &["entity"])
        .output_with_params("OnTrigger", &["entity"], "Fired when the volume is entered.")
        .on_setup(trigger_setup)
        .shared()
});

/// A region of terrain linked to its neighbours.
pub static CELL: LazyLock<Arc<EntityClass>> = LazyLock::new(|| {
    EntityClass::extends("Cell", &STATIC)
        .tags("cell terrain")
        .component(|c| {
            c.cell = Some(CellComponent::default());
            c.body = Some(
                BodyComponent::new(BodyKind::Static)
                    .with_shape(BodyShape::Ground)
                    .colliding_with("!static"),
            );
        })
        .shared()
});

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// Seconds between fires for a timer nobody configured.
pub const DEFAULT_TIMER_INTERVAL: f64 = 1.0;
/// Most intervals a timer catches up on in one tick; the rest are skipped.
pub const MAX_TIMER_FIRES_PER_TICK: u32 = 64;

fn timer_mut(world: &mut World, id: EntityId) -> CoreResult<&mut TimerComponent> {
    let entity = world.entity_mut(id)?;
    let name = entity.name.clone();
    entity
        .components
        .timer
        .as_mut()
        .ok_or_else(|| CoreError::InvalidValue {
            input: name,
            reason: "entity has no timer component".to_string(),
        })
}

/// Fire `OnTimer` and the current phase output with `[count, elapsed]`.
fn fire_timer(world: &mut World, id: EntityId) -> CoreResult<()> {
    let timer = timer_mut(world, id)?;
    timer.count += 1;
    let args = Value::List(vec![Value::from(timer.count), Value::Float(timer.elapsed)]);
    let phase = timer.phase;
    world.fire_output(id, "OnTimer", args.clone())?;
    world.fire_output(id, phase.output(), args)
}

fn timer_reset(world: &mut World, id: EntityId, _: &Value, _: &[Value]) -> CoreResult<()> {
    timer_mut(world, id)?.reset();
    Ok(())
}

fn timer_fire(world: &mut World, id: EntityId, _: &Value, _: &[Value]) -> CoreResult<()> {
    fire_timer(world, id)
}

fn timer_refire_time(world: &mut World, id: EntityId, value: &Value, _: &[Value]) -> CoreResult<()> {
    let interval = value.first_f64().filter(|t| *t > 0.0).ok_or_else(|| {
        CoreError::InvalidValue {
            input: "RefireTime".to_string(),
            reason: format!("expected a positive number of seconds, got {value}"),
        }
    })?;
    let timer = timer_mut(world, id)?;
    timer.interval = interval;
    timer.reset();
    Ok(())
}

/// Timers reset before flipping, so a re-enabled timer starts a fresh interval.
fn timer_toggle(world: &mut World, id: EntityId, value: &Value, args: &[Value]) -> CoreResult<()> {
    timer_mut(world, id)?.reset();
    toggle(world, id, value, args)
}

fn timer_set_high(world: &mut World, id: EntityId, _: &Value, _: &[Value]) -> CoreResult<()> {
    timer_mut(world, id)?.phase = TimerPhase::High;
    Ok(())
}

fn timer_set_low(world: &mut World, id: EntityId, _: &Value, _: &[Value]) -> CoreResult<()> {
    timer_mut(world, id)?.phase = TimerPhase::Low;
    Ok(())
}

fn timer_setup(world: &mut World, id: EntityId) -> CoreResult<()> {
    world.bind_output(id, "OnTimerHigh", id, "SetLow")?;
    world.bind_output(id, "OnTimerLow", id, "SetHigh")
}

fn timer_simulate(world: &mut World, id: EntityId, dt: f64) -> CoreResult<()> {
    if !world.entity(id)?.is_enabled() {
        return Ok(());
    }
    timer_mut(world, id)?.elapsed += dt;
    for _ in 0..MAX_TIMER_FIRES_PER_TICK {
        if world.is_killed(id) {
            return Ok(());
        }
        let timer = timer_mut(world, id)?;
        if timer.elapsed - timer.last_fired < timer.interval {
            return Ok(());
        }
        timer.last_fired += timer.interval;
        fire_timer(world, id)?;
    }
    if world.is_killed(id) {
        return Ok(());
    }
    let timer = timer_mut(world, id)?;
    let behind = timer.elapsed - timer.last_fired;
    if behind >= timer.interval {
        let skipped = (behind / timer.interval).floor();
        timer.last_fired += skipped * timer.interval;
        log::warn!("timer {id} skipped {skipped} interval(s) of {}s", timer.interval);
    }
    Ok(())
}

/// Fires at a fixed interval while enabled, alternating high and low.
pub static TIMER: LazyLock<Arc<EntityClass>> = LazyLock::new(|| {
    EntityClass::extends("TimerEntity", &LOGIC)
        .tags("logic timer")
        .starts_disabled()
        .component(|c| c.timer = Some(TimerComponent::new(DEFAULT_TIMER_INTERVAL)))
        .input("Reset", "Restart the interval.", InputHandler::Call(timer_reset))
        .input("FireTimer", "Fire the timer now.", InputHandler::Call(timer_fire))
        .input(
            "RefireTime",
            "Set the interval in seconds and restart it.",
            InputHandler::Call(timer_refire_time),
        )
        .input_params("RefireTime", &["float"])
        .input(
            "Toggle",
            "Restart the interval and flip the enabled flag.",
            InputHandler::Call(timer_toggle),
        )
        .input("SetHigh", "Fire OnTimerHigh next.", InputHandler::Call(timer_set_high))
        .input("SetLow", "Fire OnTimerLow next.", InputHandler::Call(timer_set_low))
        .output_with_params("OnTimer", &["int", "float"], "Fired every interval.")
        .output_with_params(
            "OnTimerHigh",
            &["int", "float"],
            "Fired on every other interval, starting with the first.",
        )
        .output_with_params(
            "OnTimerLow",
            &["int", "float"],
            "Fired on the intervals OnTimerHigh skips.",
        )
        .on_setup(timer_setup)
        .on_simulate(timer_simulate)
        .shared()
});

/// Look up a built-in class by its name or short name (`timer`,
/// `TimerEntity`), ignoring case.
pub fn builtin(name: &str) -> Option<Arc<EntityClass>> {
    let classes: [&LazyLock<Arc<EntityClass>>; 7] =
        [&LOGIC, &VISIBLE, &PHYSICS, &STATIC, &TRIGGER, &TIMER, &CELL];
    classes
        .into_iter()
        .map(|class| Arc::clone(LazyLock::force(class)))
        .find(|class| {
            let full = class.name();
            let short = full.strip_suffix("Entity").unwrap_or(full);
            full.eq_ignore_ascii_case(name) || short.eq_ignore_ascii_case(name)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    #[test]
    fn builtin_lookup_accepts_short_names() {
        assert_eq!(builtin("timer").unwrap().name(), "TimerEntity");
        assert_eq!(builtin("TriggerEntity").unwrap().name(), "TriggerEntity");
        assert_eq!(builtin("cell").unwrap().name(), "Cell");
        assert!(builtin("dragon").is_none());
    }

    fn timer(world: &mut World, interval: f64) -> EntityId {
        let id = world
            .add_entity(Entity::new(&TIMER, "clock"))
            .unwrap();
        world.trigger_input(id, "RefireTime", interval).unwrap();
        id
    }

    fn count(world: &World, id: EntityId) -> u64 {
        world
            .get_entity(id)
            .and_then(|e| e.components.timer.as_ref())
            .map_or(0, |t| t.count)
    }

    #[test]
    fn every_class_has_the_standard_ports() {
        for class in [&*LOGIC, &*VISIBLE, &*PHYSICS, &*STATIC, &*TRIGGER, &*CELL, &*TIMER] {
            for input in ["Kill", "Enable", "Disable", "Toggle", "FireUser1", "FireUser4"] {
                assert!(class.declares_input(input), "{} lacks {input}", class.name());
            }
            for output in ["OnKill", "OnUser1", "OnUser4"] {
                assert!(class.declares_output(output), "{} lacks {output}", class.name());
            }
        }
    }

    #[test]
    fn cell_class_lineage_and_tags() {
        assert!(CELL.is_a("PhysicsEntity"));
        assert!(CELL.is_a("LogicEntity"));
        assert_eq!(CELL.default_tags(), ["physics", "static", "cell", "terrain"]);
        let template = CELL.components();
        assert!(template.cell.is_some());
        let body = template.body.unwrap();
        assert_eq!(body.shape, BodyShape::Ground);
        assert_eq!(body.collision_tags, ["!static"]);
    }

    #[test]
    fn trigger_fires_on_collide() {
        let mut world = World::new();
        let plate = world.add_entity(Entity::new(&TRIGGER, "plate")).unwrap();
        let rock = world.add_entity(Entity::new(&PHYSICS, "rock")).unwrap();

        world.fire_output(plate, "OnCollide", Value::Entity(rock)).unwrap();
        assert_eq!(world.last_output(plate, "OnTrigger"), Some(&Value::Entity(rock)));
    }

    #[test]
    fn disabled_timer_does_not_fire() {
        let mut world = World::new();
        let id = timer(&mut world, 1.0);
        world.simulate(5.0).unwrap();
        assert_eq!(count(&world, id), 0);
    }

    #[test]
    fn timer_catches_up_and_alternates() {
        let mut world = World::new();
        let id = timer(&mut world, 1.0);
        world.trigger_input(id, "Enable", Value::Null).unwrap();

        world.simulate(0.5).unwrap();
        assert_eq!(count(&world, id), 0);
        world.simulate(2.6).unwrap();
        assert_eq!(count(&world, id), 3);

        let high = world.last_output(id, "OnTimerHigh").unwrap().clone();
        let low = world.last_output(id, "OnTimerLow").unwrap().clone();
        assert_eq!(high, Value::List(vec![Value::Int(3), Value::Float(3.1)]));
        assert_eq!(low, Value::List(vec![Value::Int(2), Value::Float(3.1)]));
        let phase = world.get_entity(id).unwrap().components.timer.as_ref().unwrap().phase;
        assert_eq!(phase, TimerPhase::Low);
    }

    #[test]
    fn long_tick_fires_a_bounded_number_of_times() {
        let mut world = World::new();
        let id = timer(&mut world, 0.25);
        world.trigger_input(id, "Enable", Value::Null).unwrap();

        world.simulate(100.0).unwrap();
        assert_eq!(count(&world, id), u64::from(MAX_TIMER_FIRES_PER_TICK));

        // Skipped intervals are dropped, not owed to later ticks.
        world.simulate(0.125).unwrap();
        assert_eq!(count(&world, id), u64::from(MAX_TIMER_FIRES_PER_TICK));
        world.simulate(0.125).unwrap();
        assert_eq!(count(&world, id), u64::from(MAX_TIMER_FIRES_PER_TICK) + 1);
    }

    #[test]
    fn toggle_resets_before_flipping() {
        let mut world = World::new();
        let id = timer(&mut world, 1.0);
        world.trigger_input(id, "Toggle", Value::Null).unwrap();
        world.simulate(1.5).unwrap();
        assert_eq!(count(&world, id), 1);

        world.trigger_input(id, "Toggle", Value::Null).unwrap();
        assert!(!world.get_entity(id).unwrap().is_enabled());
        assert_eq!(count(&world, id), 0);
        world.trigger_input(id, "Toggle", Value::Null).unwrap();
        world.simulate(0.9).unwrap();
        assert_eq!(count(&world, id), 0);
    }

    #[test]
    fn refire_time_rejects_non_positive() {
        let mut world = World::new();
        let id = timer(&mut world, 2.0);
        assert!(matches!(
            world.trigger_input(id, "RefireTime", 0.0),
            Err(CoreError::InvalidValue { .. })
        ));
        assert!(world.trigger_input(id, "RefireTime", "soon").is_err());
        let interval = world.get_entity(id).unwrap().components.timer.as_ref().unwrap().interval;
        assert_eq!(interval, 2.0);
    }

    #[test]
    fn timer_killed_by_its_own_output_stops() {
        let mut world = World::new();
        let id = timer(&mut world, 1.0);
        world.bind_output(id, "OnTimer", id, "Kill").unwrap();
        world.trigger_input(id, "Enable", Value::Null).unwrap();
        world.simulate(10.0).unwrap();
        assert!(world.is_killed(id));
    }
}
