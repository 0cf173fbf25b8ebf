use std::collections::HashMap;

use sd_core::{EntityEvent, EntityId, TagRegistry, World};

use crate::backend::{BodyDesc, BodyHandle, NodeHandle, PhysicsBackend, SceneBackend};
use crate::error::SimResult;
use crate::event::{EventLog, SimEvent, SimEventKind};
use crate::headless::{HeadlessPhysics, HeadlessScene};

/// Everything messenger handlers and systems get to touch: the world, the
/// tag registry, the engine adapters, and the event log.
///
/// The stage keeps the engine side in step with the world: entities added to
/// the world get a scene node (and a body, if they have a body component) on
/// the next [`Stage::sync`], and killed entities lose theirs.
#[derive(Debug)]
pub struct Stage {
    /// The entities being simulated.
    pub world: World,
    /// Tag bits used for collision filters.
    pub tags: TagRegistry,
    /// What has happened so far.
    pub events: EventLog,
    physics: Box<dyn PhysicsBackend>,
    scene: Box<dyn SceneBackend>,
    bodies: HashMap<EntityId, BodyHandle>,
    nodes: HashMap<EntityId, NodeHandle>,
    posted: Vec<EntityEvent>,
    tick: u64,
}

impl Stage {
    /// A stage driving the given engine adapters.
    pub fn new(
        world: World,
        physics: Box<dyn PhysicsBackend>,
        scene: Box<dyn SceneBackend>,
        max_events: usize,
    ) -> Self {
        Self {
            world,
            tags: TagRegistry::new(),
            events: EventLog::new(max_events),
            physics,
            scene,
            bodies: HashMap::new(),
            nodes: HashMap::new(),
            posted: Vec::new(),
            tick: 0,
        }
    }

    /// A stage backed by the in-memory adapters.
    pub fn headless(world: World, max_events: usize) -> Self {
        Self::new(
            world,
            Box::new(HeadlessPhysics::new()),
            Box::new(HeadlessScene::new()),
            max_events,
        )
    }

    /// The physics engine.
    pub fn physics(&self) -> &dyn PhysicsBackend {
        self.physics.as_ref()
    }

    /// Mutable access to the physics engine.
    pub fn physics_mut(&mut self) -> &mut dyn PhysicsBackend {
        self.physics.as_mut()
    }

    /// The scene graph.
    pub fn scene(&self) -> &dyn SceneBackend {
        self.scene.as_ref()
    }

    /// Mutable access to the scene graph.
    pub fn scene_mut(&mut self) -> &mut dyn SceneBackend {
        self.scene.as_mut()
    }

    /// The body created for an entity.
    pub fn body_of(&self, id: EntityId) -> Option<BodyHandle> {
        self.bodies.get(&id).copied()
    }

    /// The scene node created for an entity.
    pub fn node_of(&self, id: EntityId) -> Option<NodeHandle> {
        self.nodes.get(&id).copied()
    }

    /// The current frame number.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn set_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    /// Record a simulation event at the current frame.
    pub fn record(&mut self, kind: SimEventKind, description: impl Into<String>) {
        self.events.push(SimEvent::new(self.tick, kind, description));
    }

    /// Queue an entity event for dispatch once the current handler returns.
    pub fn post(&mut self, event: EntityEvent) {
        self.posted.push(event);
    }

    pub(crate) fn take_posted(&mut self) -> Vec<EntityEvent> {
        std::mem::take(&mut self.posted)
    }

    /// Create and destroy engine objects for entities added or killed since
    /// the last sync.
    pub fn sync(&mut self) -> SimResult<()> {
        for id in self.world.take_removed() {
            self.dematerialize(id);
        }
        // An entity that fails to materialize is dropped; the ones queued
        // behind it wait for the next sync.
        let spawned = self.world.take_spawned();
        for (i, id) in spawned.iter().enumerate() {
            if let Err(e) = self.materialize(*id) {
                self.world.requeue_spawned(spawned[i + 1..].iter().copied());
                return Err(e);
            }
        }
        Ok(())
    }

    fn materialize(&mut self, id: EntityId) -> SimResult<()> {
        let Some(entity) = self.world.get_entity(id) else {
            return Ok(());
        };

        // Filter bits can overflow the registry, so work them out before
        // touching either engine.
        let desc = match &entity.components.body {
            Some(spec) => Some(BodyDesc {
                owner: id,
                kind: spec.kind,
                shape: spec.shape,
                mass: spec.mass,
                radius: spec.radius,
                position: entity.position,
                group: self.tags.bits(&entity.tags)?,
                mask: self.tags.bits(&spec.collision_tags)?,
            }),
            None => None,
        };

        let node = self.scene.create_node(&entity.name, None);
        self.scene.set_position(node, entity.position);
        if let Some(mesh) = entity.components.body.as_ref().and_then(|b| b.mesh.as_ref()) {
            self.scene.attach_mesh(node, mesh);
        }
        let body = desc.map(|desc| {
            log::trace!(
                "body for \"{}\": group {} mask {}",
                entity.name,
                desc.group,
                desc.mask
            );
            self.physics.add_body(desc)
        });

        let description = format!("spawned \"{}\"", entity.name);
        self.nodes.insert(id, node);
        if let Some(body) = body {
            self.bodies.insert(id, body);
        }
        self.record(SimEventKind::Spawned { entity: id }, description);
        Ok(())
    }

    fn dematerialize(&mut self, id: EntityId) {
        if let Some(body) = self.bodies.remove(&id) {
            self.physics.remove_body(body);
        }
        if let Some(node) = self.nodes.remove(&id) {
            self.scene.remove_node(node);
        }
        let description = format!("removed \"{}\"", self.world.entity_name(id));
        self.record(SimEventKind::Removed { entity: id }, description);
    }

    /// Copy body positions back onto their entities and scene nodes.
    pub fn pull_positions(&mut self) {
        for (id, body) in &self.bodies {
            let Some(position) = self.physics.position(*body) else {
                continue;
            };
            if let Some(entity) = self.world.get_entity_mut(*id) {
                entity.position = position;
            }
            if let Some(node) = self.nodes.get(id) {
                self.scene.set_position(*node, position);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use sd_core::Entity;
    use sd_core::logic::{LOGIC, PHYSICS};

    #[test]
    fn sync_creates_and_removes_engine_objects() {
        let mut world = World::new();
        let rock = world
            .add_entity(Entity::new(&PHYSICS, "rock").at(Vector3::new(1.0, 2.0, 3.0)))
            .unwrap();
        let relay = world.add_entity(Entity::new(&LOGIC, "relay")).unwrap();
        let mut stage = Stage::headless(world, 0);

        stage.sync().unwrap();
        assert!(stage.body_of(rock).is_some());
        assert!(stage.body_of(relay).is_none());
        assert!(stage.node_of(relay).is_some());
        assert_eq!(stage.physics().body_count(), 1);
        assert_eq!(stage.scene().node_count(), 2);
        let body = stage.body_of(rock).unwrap();
        assert_eq!(stage.physics().owner(body), Some(rock));
        assert_eq!(
            stage.physics().position(body),
            Some(Vector3::new(1.0, 2.0, 3.0))
        );

        stage.world.kill(rock).unwrap();
        stage.sync().unwrap();
        assert!(stage.body_of(rock).is_none());
        assert_eq!(stage.physics().body_count(), 0);
        assert_eq!(stage.scene().node_count(), 1);
        assert_eq!(stage.events.events_for_entity(rock).len(), 2);
    }

    #[test]
    fn tag_overflow_leaves_later_spawns_queued() {
        let mut world = World::new();
        let tagged: Vec<EntityId> = (0..32)
            .map(|i| {
                let entity = Entity::new(&PHYSICS, format!("crate {i}")).with_tags(&format!("t{i}"));
                world.add_entity(entity).unwrap()
            })
            .collect();
        let late = world.add_entity(Entity::new(&PHYSICS, "late")).unwrap();
        let mut stage = Stage::headless(world, 0);

        // "physics" and t0..t30 fill the registry; t31 does not fit.
        let err = stage.sync().unwrap_err();
        assert!(matches!(
            err,
            crate::error::SimError::Core(sd_core::CoreError::TagOverflow { .. })
        ));
        assert!(stage.node_of(tagged[31]).is_none());
        assert_eq!(stage.scene().node_count(), 31);
        assert_eq!(stage.physics().body_count(), 31);

        stage.sync().unwrap();
        assert!(stage.node_of(late).is_some());
        assert!(stage.body_of(late).is_some());
        assert_eq!(stage.scene().node_count(), 32);
        assert_eq!(stage.physics().body_count(), 32);
    }

    #[test]
    fn collision_tags_become_filter_bits() {
        let mut world = World::new();
        world
            .add_entity(Entity::new(&PHYSICS, "crate").with_tags("loot"))
            .unwrap();
        let mut stage = Stage::headless(world, 0);
        stage.sync().unwrap();
        assert_eq!(stage.tags.index_of("physics"), Some(0));
        assert_eq!(stage.tags.index_of("loot"), Some(1));
    }
}
