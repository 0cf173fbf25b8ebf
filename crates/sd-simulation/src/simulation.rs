use std::collections::HashSet;

use sd_core::messenger::DEFAULT_PRIORITY;
use sd_core::{
    CoreResult, EntityEvent, EntityId, EventFilter, EventKind, Messenger, SubscriptionId, Value,
    World,
};

use crate::backend::{PhysicsBackend, SceneBackend};
use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::error::SimResult;
use crate::event::{EventLog, SimEventKind};
use crate::stage::Stage;
use crate::system::System;

/// Posted events dispatched per flush before the rest are dropped.
const MAX_POST_ROUNDS: usize = 64;

/// The top-level step loop.
///
/// Owns the stage, the messenger, the clock, and registered systems. Each
/// [`Simulation::step`] runs one frame:
///
/// 1. create engine objects for new entities and drop those of killed ones
/// 2. step physics (in fixed substeps) and turn contacts into `Collided`
///    events and `OnCollide` outputs
/// 3. tick systems in registration order
/// 4. run every entity's simulate hook
/// 5. sync engine objects again so the frame ends consistent
pub struct Simulation {
    stage: Stage,
    messenger: Messenger<Stage>,
    clock: SimClock,
    systems: Vec<Box<dyn System>>,
    touching: HashSet<(EntityId, EntityId)>,
    initialized: bool,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.clock.tick())
            .field("entities", &self.stage.world.entity_count())
            .field("systems", &self.systems.len())
            .field("events", &self.stage.events.len())
            .finish()
    }
}

impl Simulation {
    /// Create a simulation over the in-memory engine adapters.
    pub fn new(world: World, config: SimConfig) -> Self {
        let stage = Stage::headless(world, config.max_events);
        Self::with_stage(stage, &config)
    }

    /// Create a simulation driving the given engine adapters.
    pub fn with_backends(
        world: World,
        config: SimConfig,
        physics: Box<dyn PhysicsBackend>,
        scene: Box<dyn SceneBackend>,
    ) -> Self {
        let stage = Stage::new(world, physics, scene, config.max_events);
        Self::with_stage(stage, &config)
    }

    fn with_stage(mut stage: Stage, config: &SimConfig) -> Self {
        stage.physics_mut().set_gravity(config.gravity);
        Self {
            stage,
            messenger: Messenger::new(),
            clock: SimClock::new(config.fixed_step, config.max_substeps),
            systems: Vec::new(),
            touching: HashSet::new(),
            initialized: false,
        }
    }

    /// Register a system. Systems are ticked in registration order.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    /// Initialize all registered systems.
    pub fn init(&mut self) -> SimResult<()> {
        if self.initialized {
            return Ok(());
        }
        self.stage.sync()?;
        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            system.init(&mut self.stage)?;
            self.systems[i] = system;
        }
        self.initialized = true;
        Ok(())
    }

    /// Advance the simulation by one frame of `dt` seconds.
    pub fn step(&mut self, dt: f64) -> SimResult<()> {
        if !self.initialized {
            self.init()?;
        }

        let substeps = self.clock.advance(dt);
        self.stage.set_tick(self.clock.tick());
        self.stage.sync()?;

        // A frame without substeps saw no contacts; keep last frame's pairs.
        if !substeps.is_empty() {
            let mut touching = HashSet::new();
            for h in substeps {
                self.stage.physics_mut().step(h);
                self.stage.pull_positions();
                self.handle_contacts(&mut touching)?;
            }
            self.touching = touching;
        }

        for i in 0..self.systems.len() {
            let mut system = std::mem::replace(&mut self.systems[i], Box::new(NoopSystem));
            let result = system.tick(&mut self.stage, dt);
            self.systems[i] = system;
            result?;
        }
        self.flush_posted()?;

        self.stage.world.simulate(dt)?;
        self.stage.sync()?;
        self.flush_posted()?;
        Ok(())
    }

    /// Advance the simulation by `frames` frames of `dt` seconds each.
    pub fn run(&mut self, frames: u64, dt: f64) -> SimResult<()> {
        for _ in 0..frames {
            self.step(dt)?;
        }
        Ok(())
    }

    /// Turn the physics step's contact pairs into entity events and
    /// `OnCollide` outputs, in both directions.
    fn handle_contacts(&mut self, touching: &mut HashSet<(EntityId, EntityId)>) -> SimResult<()> {
        let contacts = self.stage.physics().contacts();
        for (a, b) in contacts {
            let physics = self.stage.physics();
            let (Some(ea), Some(eb)) = (physics.owner(a), physics.owner(b)) else {
                continue;
            };
            let (Some(first), Some(second)) =
                (self.stage.world.get_entity(ea), self.stage.world.get_entity(eb))
            else {
                continue;
            };
            let event = EntityEvent::between(EventKind::Collided, first, second);

            if touching.insert((ea, eb)) && !self.touching.contains(&(ea, eb)) {
                let description = format!(
                    "\"{}\" touched \"{}\"",
                    event.source_name,
                    event.target_name.as_deref().unwrap_or("?")
                );
                self.stage
                    .record(SimEventKind::Collided { a: ea, b: eb }, description);
            }

            self.messenger.dispatch(&mut self.stage, &event)?;
            if let Some(reversed) = event.reversed() {
                self.messenger.dispatch(&mut self.stage, &reversed)?;
            }
            for (id, other) in [(ea, eb), (eb, ea)] {
                let declares = self
                    .stage
                    .world
                    .get_entity(id)
                    .is_some_and(|e| e.class().declares_output("OnCollide"));
                if declares {
                    self.stage
                        .world
                        .fire_output(id, "OnCollide", Value::Entity(other))?;
                }
            }
            self.flush_posted()?;
        }
        Ok(())
    }

    /// Dispatch events handlers posted to the stage, including any they post
    /// in turn.
    fn flush_posted(&mut self) -> SimResult<()> {
        for _ in 0..MAX_POST_ROUNDS {
            let posted = self.stage.take_posted();
            if posted.is_empty() {
                return Ok(());
            }
            for event in &posted {
                self.record_custom(event);
                self.messenger.dispatch(&mut self.stage, event)?;
            }
        }
        let dropped = self.stage.take_posted().len();
        if dropped > 0 {
            log::warn!("dropped {dropped} posted event(s): handlers kept posting");
        }
        Ok(())
    }

    /// Log game-defined entity events; built-in kinds have their own records.
    fn record_custom(&mut self, event: &EntityEvent) {
        let EventKind::Custom(label) = &event.kind else {
            return;
        };
        let mut entities = vec![event.source];
        entities.extend(event.target);
        let description = match &event.target_name {
            Some(target) => format!("{label}: \"{}\" -> \"{target}\"", event.source_name),
            None => format!("{label}: \"{}\"", event.source_name),
        };
        self.stage.record(
            SimEventKind::Custom {
                label: label.clone(),
                entities,
            },
            description,
        );
    }

    /// Send a named event (a key press, a mouse move, a custom message).
    ///
    /// Returns the number of handlers run.
    pub fn send(&mut self, event: &str, args: &[Value]) -> SimResult<usize> {
        let ran = self.messenger.send(&mut self.stage, event, args)?;
        self.flush_posted()?;
        Ok(ran)
    }

    /// Dispatch an entity event to matching handlers.
    pub fn dispatch(&mut self, event: &EntityEvent) -> SimResult<usize> {
        self.record_custom(event);
        let ran = self.messenger.dispatch(&mut self.stage, event)?;
        self.flush_posted()?;
        Ok(ran)
    }

    /// Subscribe to a named event at the default priority.
    pub fn accept(
        &mut self,
        event: &str,
        handler: impl FnMut(&mut Stage, &[Value]) -> CoreResult<()> + 'static,
    ) -> SubscriptionId {
        self.messenger
            .accept(event, handler, Vec::new(), DEFAULT_PRIORITY)
    }

    /// Subscribe to entity events at the default priority.
    pub fn accept_entity(
        &mut self,
        filter: EventFilter,
        handler: impl FnMut(&mut Stage, &EntityEvent, &[Value]) -> CoreResult<()> + 'static,
    ) -> SubscriptionId {
        self.messenger
            .accept_entity(filter, handler, Vec::new(), DEFAULT_PRIORITY)
    }

    /// `user` starts using `target`: dispatches `StartUse` and fires the
    /// target's `OnUse` output if it has one.
    pub fn use_entity(&mut self, user: EntityId, target: EntityId) -> SimResult<()> {
        let world = &self.stage.world;
        let event = EntityEvent::between(EventKind::StartUse, world.entity(user)?, world.entity(target)?);
        let description = format!(
            "\"{}\" used \"{}\"",
            event.source_name,
            event.target_name.as_deref().unwrap_or("?")
        );
        self.stage
            .record(SimEventKind::Used { user, target }, description);
        self.dispatch(&event)?;
        let declares = self
            .stage
            .world
            .get_entity(target)
            .is_some_and(|e| e.class().declares_output("OnUse"));
        if declares {
            self.stage
                .world
                .fire_output(target, "OnUse", Value::Entity(user))?;
        }
        Ok(())
    }

    /// `user` stops using `target`.
    pub fn end_use(&mut self, user: EntityId, target: EntityId) -> SimResult<()> {
        let world = &self.stage.world;
        let event = EntityEvent::between(EventKind::EndUse, world.entity(user)?, world.entity(target)?);
        self.dispatch(&event)?;
        Ok(())
    }

    /// The messenger, for subscribing with explicit priorities.
    pub fn messenger_mut(&mut self) -> &mut Messenger<Stage> {
        &mut self.messenger
    }

    /// The stage: world, tags, engines, event log.
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Mutable access to the stage.
    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    /// The world being simulated.
    pub fn world(&self) -> &World {
        &self.stage.world
    }

    /// Mutable access to the world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.stage.world
    }

    /// The frame clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// The simulation event log.
    pub fn events(&self) -> &EventLog {
        &self.stage.events
    }

    /// Access a system by downcasting to a concrete type.
    pub fn get_system<T: System + 'static>(&self) -> Option<&T> {
        self.systems
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<T>())
    }

    /// Access a system mutably by downcasting to a concrete type.
    pub fn get_system_mut<T: System + 'static>(&mut self) -> Option<&mut T> {
        self.systems
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<T>())
    }

    /// Extract the world, consuming the simulation.
    pub fn into_world(self) -> World {
        self.stage.world
    }

    /// Frames stepped so far.
    pub fn current_tick(&self) -> u64 {
        self.clock.tick()
    }
}

/// Placeholder system used during the swap-and-tick pattern.
#[derive(Debug)]
struct NoopSystem;

impl System for NoopSystem {
    fn name(&self) -> &str {
        "noop"
    }
    fn tick(&mut self, _stage: &mut Stage, _dt: f64) -> SimResult<()> {
        Ok(())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
