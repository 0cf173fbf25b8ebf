//! The player character: a physics body steered by key and mouse events.
//!
//! [`spawn_hero`] adds the hero to the world and subscribes its handlers to
//! the messenger. Key handlers only record intent on the hero's
//! [`ControllerComponent`]; the [`ControllerSystem`] turns that into forces,
//! heading, and camera pitch once per frame.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use nalgebra::{Rotation3, Vector3};
use sd_core::component::{BodyComponent, BodyKind, ControllerComponent};
use sd_core::logic::PHYSICS;
use sd_core::messenger::DEFAULT_PRIORITY;
use sd_core::{
    CoreError, CoreResult, Entity, EntityClass, EntityEvent, EntityId, EventFilter, EventKind,
    Match, Value,
};

use crate::backend::NodeHandle;
use crate::error::SimResult;
use crate::event::SimEventKind;
use crate::simulation::Simulation;
use crate::stage::Stage;
use crate::system::System;

/// Force per held movement key.
pub const SPEED: f32 = 10.0;
/// Upward force of a jump.
pub const JUMP_FORCE: f32 = 200.0;
/// Squared horizontal speed limit while walking.
pub const MAX_SLOW_SPEED: f32 = 1000.0;
/// Squared horizontal speed limit while running (shift held).
pub const MAX_FAST_SPEED: f32 = 20000.0;
/// Upper bound of the accumulated vertical look.
pub const MAX_LOOK: f32 = 1000.0;
/// Mass of the hero's body.
pub const HERO_MASS: f32 = 10.0;
/// Mesh shown for the hero.
pub const HERO_MESH: &str = "testhero.mesh";
/// Entity name of the hero.
pub const HERO_NAME: &str = "Hero";

/// Camera position relative to the hero's node.
const CAMERA_OFFSET: Vector3<f32> = Vector3::new(0.0, -10.0, 2.0);

/// The player-controlled entity class.
pub static HERO: LazyLock<Arc<EntityClass>> = LazyLock::new(|| {
    EntityClass::extends("Hero", &PHYSICS)
        .tags("hero")
        .component(|c| {
            c.body = Some(
                BodyComponent::new(BodyKind::Dynamic)
                    .with_mass(HERO_MASS)
                    .with_mesh(HERO_MESH),
            );
            c.controller = Some(ControllerComponent::new(MAX_SLOW_SPEED));
        })
        .shared()
});

/// Movement keys and the (strafe, forward) force each one holds.
const MOVE_KEYS: [(&str, (f32, f32)); 4] = [
    ("w", (0.0, SPEED)),
    ("s", (0.0, -SPEED)),
    ("a", (-SPEED, 0.0)),
    ("d", (SPEED, 0.0)),
];

/// Add the hero to the world and subscribe it to input events.
///
/// Movement keys are `w`, `a`, `s`, `d` (with `-up` variants on release),
/// `space` jumps, `shift` / `shift-up` toggle running, and `mouse-moved`
/// takes `[dx, dy]`.
pub fn spawn_hero(
    sim: &mut Simulation,
    cell: Option<EntityId>,
    position: Vector3<f32>,
) -> SimResult<EntityId> {
    let mut hero = Entity::new(&HERO, HERO_NAME).at(position);
    if let Some(cell) = cell {
        hero = hero.in_cell(cell);
    }
    let id = sim.world_mut().add_entity(hero)?;
    log::info!("spawned hero at {position:?}");

    let messenger = sim.messenger_mut();
    for (key, (strafe, forward)) in MOVE_KEYS {
        let held = vec![Value::from(strafe), Value::from(forward)];
        messenger.accept(
            key,
            move |stage: &mut Stage, args: &[Value]| {
                let (x, y) = pair(args, "move")?;
                with_controller(stage, id, |c| c.press(x, y))
            },
            held.clone(),
            DEFAULT_PRIORITY,
        );
        messenger.accept(
            &format!("{key}-up"),
            move |stage: &mut Stage, args: &[Value]| {
                let (x, y) = pair(args, "move")?;
                with_controller(stage, id, |c| c.release(x, y))
            },
            held,
            DEFAULT_PRIORITY,
        );
    }
    messenger.accept(
        "space",
        move |stage: &mut Stage, _args: &[Value]| jump(stage, id),
        Vec::new(),
        DEFAULT_PRIORITY,
    );
    for (key, limit) in [("shift", MAX_FAST_SPEED), ("shift-up", MAX_SLOW_SPEED)] {
        messenger.accept(
            key,
            move |stage: &mut Stage, _args: &[Value]| {
                with_controller(stage, id, |c| c.max_speed = limit)
            },
            Vec::new(),
            DEFAULT_PRIORITY,
        );
    }
    messenger.accept(
        "mouse-moved",
        move |stage: &mut Stage, args: &[Value]| {
            let (dx, dy) = pair(args, "mouse-moved")?;
            with_controller(stage, id, |c| {
                c.yaw += dx;
                c.look = (c.look + dy).clamp(0.0, MAX_LOOK);
            })
        },
        Vec::new(),
        DEFAULT_PRIORITY,
    );

    let from_hero = EventFilter::new(EventKind::Collided).from(Match::Entity(id));
    messenger.accept_entity(
        from_hero.clone(),
        move |stage: &mut Stage, _event: &EntityEvent, _args: &[Value]| {
            with_controller(stage, id, |c| c.can_jump = true)
        },
        Vec::new(),
        DEFAULT_PRIORITY,
    );
    messenger.accept_entity(
        from_hero.to(Match::tagged("cell")),
        move |stage: &mut Stage, event: &EntityEvent, _args: &[Value]| enter_cell(stage, id, event),
        Vec::new(),
        DEFAULT_PRIORITY,
    );
    Ok(id)
}

/// Read two numbers from the front of an argument list.
fn pair(args: &[Value], event: &str) -> CoreResult<(f32, f32)> {
    match args {
        [x, y, ..] => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => Ok((x as f32, y as f32)),
            _ => Err(invalid_args(event, args)),
        },
        _ => Err(invalid_args(event, args)),
    }
}

fn invalid_args(event: &str, args: &[Value]) -> CoreError {
    CoreError::InvalidValue {
        input: event.to_string(),
        reason: format!("expected two numbers, got {}", Value::List(args.to_vec())),
    }
}

/// Run `f` on the hero's controller. A killed hero ignores input.
fn with_controller(
    stage: &mut Stage,
    hero: EntityId,
    f: impl FnOnce(&mut ControllerComponent),
) -> CoreResult<()> {
    if let Some(controller) = stage
        .world
        .get_entity_mut(hero)
        .and_then(|e| e.components.controller.as_mut())
    {
        f(controller);
    }
    Ok(())
}

fn jump(stage: &mut Stage, hero: EntityId) -> CoreResult<()> {
    let Some(body) = stage.body_of(hero) else {
        return Ok(());
    };
    let Some(controller) = stage
        .world
        .get_entity_mut(hero)
        .and_then(|e| e.components.controller.as_mut())
    else {
        return Ok(());
    };
    if !controller.can_jump {
        return Ok(());
    }
    controller.can_jump = false;
    stage
        .physics_mut()
        .apply_force(body, Vector3::new(0.0, 0.0, JUMP_FORCE));
    Ok(())
}

fn enter_cell(stage: &mut Stage, hero: EntityId, event: &EntityEvent) -> CoreResult<()> {
    let Some(cell) = event.target else {
        return Ok(());
    };
    let Some(change) = stage.world.move_to_cell(hero, cell)? else {
        return Ok(());
    };
    let description = format!(
        "\"{}\" entered \"{}\"",
        stage.world.entity_name(hero),
        stage.world.entity_name(cell)
    );
    stage.record(
        SimEventKind::ChangedCell {
            entity: change.entity,
            from: change.from,
            to: change.to,
        },
        description,
    );
    let event = EntityEvent::between(
        EventKind::ChangeCell,
        stage.world.entity(hero)?,
        stage.world.entity(cell)?,
    );
    stage.post(event);
    Ok(())
}

/// Turns controller state into forces, heading, and camera pitch.
#[derive(Debug, Default)]
pub struct ControllerSystem {
    cameras: HashMap<EntityId, NodeHandle>,
}

impl ControllerSystem {
    /// A controller system with no cameras yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The camera node following a controlled entity.
    pub fn camera_of(&self, id: EntityId) -> Option<NodeHandle> {
        self.cameras.get(&id).copied()
    }

    fn camera(&mut self, stage: &mut Stage, id: EntityId) -> Option<NodeHandle> {
        if let Some(camera) = self.cameras.get(&id) {
            return Some(*camera);
        }
        let parent = stage.node_of(id)?;
        let name = format!("{} camera", stage.world.entity_name(id));
        let camera = stage.scene_mut().create_node(&name, Some(parent));
        stage.scene_mut().set_position(camera, CAMERA_OFFSET);
        self.cameras.insert(id, camera);
        Some(camera)
    }
}

impl System for ControllerSystem {
    fn name(&self) -> &str {
        "controller"
    }

    fn tick(&mut self, stage: &mut Stage, _dt: f64) -> SimResult<()> {
        self.cameras.retain(|id, _| stage.world.contains(*id));

        let controlled: Vec<(EntityId, ControllerComponent)> = stage
            .world
            .all_entities()
            .filter_map(|e| e.components.controller.clone().map(|c| (e.id, c)))
            .collect();

        for (id, controller) in controlled {
            let Some(body) = stage.body_of(id) else {
                continue;
            };
            let physics = stage.physics_mut();

            if let Some(v) = physics.velocity(body) {
                let speed = v.x * v.x + v.y * v.y;
                if speed > controller.max_speed {
                    let scale = (controller.max_speed / speed).sqrt();
                    physics.set_velocity(body, Vector3::new(v.x * scale, v.y * scale, v.z));
                }
            }

            let (strafe, forward) = controller.walk_input();
            if strafe != 0.0 || forward != 0.0 {
                let heading =
                    Rotation3::from_axis_angle(&Vector3::z_axis(), controller.yaw.to_radians());
                physics.apply_force(body, heading * Vector3::new(strafe, forward, 0.0));
            }
            physics.set_yaw(body, controller.yaw);

            if let Some(node) = stage.node_of(id) {
                stage
                    .scene_mut()
                    .set_orientation(node, Vector3::new(controller.yaw, 0.0, 0.0));
            }
            if let Some(camera) = self.camera(stage, id) {
                let pitch = controller.look / MAX_LOOK * 90.0 - 90.0;
                stage
                    .scene_mut()
                    .set_orientation(camera, Vector3::new(0.0, pitch, 0.0));
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
