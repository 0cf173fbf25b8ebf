//! In-memory engine adapters for tests and the command line.
//!
//! The physics here is deliberately small: explicit Euler integration,
//! spheres and upward-facing ground squares, and positional separation
//! against static geometry. It honours the tag filter rule exactly, which is
//! what the scripting layer cares about.

use std::collections::BTreeMap;

use nalgebra::Vector3;
use sd_core::component::{BodyKind, BodyShape};
use sd_core::{EntityId, TagMask};

use crate::backend::{BodyDesc, BodyHandle, NodeHandle, PhysicsBackend, SceneBackend};

#[derive(Debug, Clone)]
struct Body {
    desc: BodyDesc,
    position: Vector3<f32>,
    velocity: Vector3<f32>,
    force: Vector3<f32>,
    yaw: f32,
}

impl Body {
    fn moves(&self) -> bool {
        matches!(self.desc.kind, BodyKind::Dynamic | BodyKind::Kinematic)
    }

    /// Push the body along `dir` and drop any velocity back into the contact.
    fn separate(&mut self, dir: Vector3<f32>, depth: f32) {
        self.position += dir * depth;
        let into = self.velocity.dot(&dir);
        if into < 0.0 {
            self.velocity -= dir * into;
        }
    }
}

/// Contact normal (pointing from the first body to the second) and depth.
fn overlap(a: &Body, b: &Body) -> Option<(Vector3<f32>, f32)> {
    match (a.desc.shape, b.desc.shape) {
        (BodyShape::Sphere, BodyShape::Sphere) => {
            let d = b.position - a.position;
            let reach = a.desc.radius + b.desc.radius;
            let dist = d.norm();
            if dist >= reach {
                return None;
            }
            let normal = if dist > f32::EPSILON {
                d / dist
            } else {
                Vector3::z()
            };
            Some((normal, reach - dist))
        }
        (BodyShape::Ground, BodyShape::Sphere) => {
            let local = b.position - a.position;
            let half = a.desc.radius;
            if local.x.abs() > half || local.y.abs() > half || local.z.abs() > b.desc.radius {
                return None;
            }
            let normal = if local.z >= 0.0 {
                Vector3::z()
            } else {
                -Vector3::z()
            };
            Some((normal, b.desc.radius - local.z.abs()))
        }
        (BodyShape::Sphere, BodyShape::Ground) => overlap(b, a).map(|(n, depth)| (-n, depth)),
        (BodyShape::Ground, BodyShape::Ground) => None,
    }
}

/// Physics without an engine.
#[derive(Debug, Default)]
pub struct HeadlessPhysics {
    gravity: Vector3<f32>,
    next: u64,
    bodies: BTreeMap<BodyHandle, Body>,
    contacts: Vec<(BodyHandle, BodyHandle)>,
}

impl HeadlessPhysics {
    /// An empty world without gravity.
    pub fn new() -> Self {
        Self::default()
    }

    fn find_contacts(&mut self) {
        self.contacts.clear();
        let handles: Vec<BodyHandle> = self.bodies.keys().copied().collect();
        for (i, &a) in handles.iter().enumerate() {
            for &b in &handles[i + 1..] {
                let (Some(ba), Some(bb)) = (self.bodies.get(&a), self.bodies.get(&b)) else {
                    continue;
                };
                if !ba.moves() && !bb.moves() {
                    continue;
                }
                if !TagMask::accepts(ba.desc.group, ba.desc.mask, bb.desc.group, bb.desc.mask) {
                    continue;
                }
                let Some((normal, depth)) = overlap(ba, bb) else {
                    continue;
                };
                self.contacts.push((a, b));

                let solid = |body: &Body| body.desc.kind != BodyKind::Trigger;
                if !solid(ba) || !solid(bb) {
                    continue;
                }
                let (a_moves, b_moves) = (ba.moves(), bb.moves());
                let share = if a_moves && b_moves { 0.5 } else { 1.0 };
                if a_moves {
                    if let Some(body) = self.bodies.get_mut(&a) {
                        body.separate(-normal, depth * share);
                    }
                }
                if b_moves {
                    if let Some(body) = self.bodies.get_mut(&b) {
                        body.separate(normal, depth * share);
                    }
                }
            }
        }
    }
}

impl PhysicsBackend for HeadlessPhysics {
    fn set_gravity(&mut self, gravity: Vector3<f32>) {
        self.gravity = gravity;
    }

    fn step(&mut self, dt: f64) {
        let h = dt as f32;
        let gravity = self.gravity;
        for body in self.bodies.values_mut() {
            match body.desc.kind {
                BodyKind::Dynamic => {
                    if body.desc.mass > 0.0 {
                        body.velocity += (gravity + body.force / body.desc.mass) * h;
                    }
                    body.position += body.velocity * h;
                }
                BodyKind::Kinematic => body.position += body.velocity * h,
                BodyKind::Static | BodyKind::Trigger => {}
            }
            body.force = Vector3::zeros();
        }
        self.find_contacts();
    }

    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        self.next += 1;
        let handle = BodyHandle(self.next);
        let body = Body {
            position: desc.position,
            velocity: Vector3::zeros(),
            force: Vector3::zeros(),
            yaw: 0.0,
            desc,
        };
        self.bodies.insert(handle, body);
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) {
        self.bodies.remove(&body);
        self.contacts.retain(|(a, b)| *a != body && *b != body);
    }

    fn position(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        self.bodies.get(&body).map(|b| b.position)
    }

    fn set_position(&mut self, body: BodyHandle, position: Vector3<f32>) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.position = position;
        }
    }

    fn velocity(&self, body: BodyHandle) -> Option<Vector3<f32>> {
        self.bodies.get(&body).map(|b| b.velocity)
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vector3<f32>) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.velocity = velocity;
        }
    }

    fn yaw(&self, body: BodyHandle) -> Option<f32> {
        self.bodies.get(&body).map(|b| b.yaw)
    }

    fn set_yaw(&mut self, body: BodyHandle, degrees: f32) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.yaw = degrees.rem_euclid(360.0);
        }
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vector3<f32>) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.force += force;
        }
    }

    fn contacts(&self) -> Vec<(BodyHandle, BodyHandle)> {
        self.contacts.clone()
    }

    fn owner(&self, body: BodyHandle) -> Option<EntityId> {
        self.bodies.get(&body).map(|b| b.desc.owner)
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

/// A node in the headless scene graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Name given at creation.
    pub name: String,
    /// The node this one moves with.
    pub parent: Option<NodeHandle>,
    /// Position relative to the parent.
    pub position: Vector3<f32>,
    /// Heading, pitch, and roll in degrees.
    pub orientation: Vector3<f32>,
    /// Attached mesh resource.
    pub mesh: Option<String>,
}

/// A scene graph that only remembers what it was told.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    next: u64,
    nodes: BTreeMap<NodeHandle, SceneNode>,
}

impl HeadlessScene {
    /// An empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a node.
    pub fn node(&self, node: NodeHandle) -> Option<&SceneNode> {
        self.nodes.get(&node)
    }

    /// Direct children of a node.
    pub fn children(&self, node: NodeHandle) -> Vec<NodeHandle> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent == Some(node))
            .map(|(h, _)| *h)
            .collect()
    }
}

impl SceneBackend for HeadlessScene {
    fn create_node(&mut self, name: &str, parent: Option<NodeHandle>) -> NodeHandle {
        self.next += 1;
        let handle = NodeHandle(self.next);
        self.nodes.insert(
            handle,
            SceneNode {
                name: name.to_string(),
                parent,
                position: Vector3::zeros(),
                orientation: Vector3::zeros(),
                mesh: None,
            },
        );
        handle
    }

    fn set_position(&mut self, node: NodeHandle, position: Vector3<f32>) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.position = position;
        }
    }

    fn set_orientation(&mut self, node: NodeHandle, hpr: Vector3<f32>) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.orientation = hpr;
        }
    }

    fn attach_mesh(&mut self, node: NodeHandle, mesh: &str) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.mesh = Some(mesh.to_string());
        }
    }

    fn remove_node(&mut self, node: NodeHandle) {
        let mut doomed = vec![node];
        while let Some(next) = doomed.pop() {
            doomed.extend(self.children(next));
            self.nodes.remove(&next);
        }
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(kind: BodyKind, shape: BodyShape, radius: f32, z: f32) -> BodyDesc {
        BodyDesc {
            owner: EntityId::new(),
            kind,
            shape,
            mass: 1.0,
            radius,
            position: Vector3::new(0.0, 0.0, z),
            group: TagMask::ALL,
            mask: TagMask::ALL,
        }
    }

    #[test]
    fn falling_sphere_lands_on_ground() {
        let mut physics = HeadlessPhysics::new();
        physics.set_gravity(Vector3::new(0.0, 0.0, -10.0));
        let ground = physics.add_body(desc(BodyKind::Static, BodyShape::Ground, 8.0, 0.0));
        let ball = physics.add_body(desc(BodyKind::Dynamic, BodyShape::Sphere, 0.5, 1.0));

        let mut touched = false;
        for _ in 0..60 {
            physics.step(1.0 / 30.0);
            touched |= physics.contacts().contains(&(ground, ball));
        }

        assert!(touched);
        let z = physics.position(ball).unwrap().z;
        assert!((z - 0.5).abs() < 1e-3, "ball rests on the ground, z = {z}");
        assert!(physics.velocity(ball).unwrap().z >= 0.0);
    }

    #[test]
    fn filter_masks_suppress_contacts() {
        let mut physics = HeadlessPhysics::new();
        let mut ground = desc(BodyKind::Static, BodyShape::Ground, 8.0, 0.0);
        ground.group = TagMask(0b01);
        ground.mask = TagMask(0b01);
        physics.add_body(ground);
        let mut ball = desc(BodyKind::Dynamic, BodyShape::Sphere, 1.0, 0.5);
        ball.group = TagMask(0b10);
        physics.add_body(ball);

        physics.step(0.01);
        assert!(physics.contacts().is_empty());
    }

    #[test]
    fn triggers_report_but_do_not_push() {
        let mut physics = HeadlessPhysics::new();
        let plate = physics.add_body(desc(BodyKind::Trigger, BodyShape::Sphere, 2.0, 0.0));
        let ball = physics.add_body(desc(BodyKind::Kinematic, BodyShape::Sphere, 1.0, 0.0));

        physics.step(0.01);
        assert_eq!(physics.contacts(), vec![(plate, ball)]);
        assert_eq!(physics.position(ball).unwrap(), Vector3::zeros());
    }

    #[test]
    fn static_bodies_never_touch_each_other() {
        let mut physics = HeadlessPhysics::new();
        physics.add_body(desc(BodyKind::Static, BodyShape::Sphere, 5.0, 0.0));
        physics.add_body(desc(BodyKind::Static, BodyShape::Sphere, 5.0, 1.0));
        physics.step(0.01);
        assert!(physics.contacts().is_empty());
    }

    #[test]
    fn forces_last_one_step() {
        let mut physics = HeadlessPhysics::new();
        let ball = physics.add_body(desc(BodyKind::Dynamic, BodyShape::Sphere, 1.0, 0.0));
        physics.apply_force(ball, Vector3::new(2.0, 0.0, 0.0));
        physics.step(0.5);
        assert_eq!(physics.velocity(ball).unwrap().x, 1.0);
        physics.step(0.5);
        assert_eq!(physics.velocity(ball).unwrap().x, 1.0);
        assert_eq!(physics.position(ball).unwrap().x, 1.0);
    }

    #[test]
    fn removing_a_body_forgets_it() {
        let mut physics = HeadlessPhysics::new();
        let d = desc(BodyKind::Dynamic, BodyShape::Sphere, 1.0, 0.0);
        let owner = d.owner;
        let ball = physics.add_body(d);
        assert_eq!(physics.owner(ball), Some(owner));
        physics.remove_body(ball);
        assert_eq!(physics.owner(ball), None);
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn removing_a_node_removes_children() {
        let mut scene = HeadlessScene::new();
        let hero = scene.create_node("hero", None);
        let camera = scene.create_node("camera", Some(hero));
        scene.create_node("lens", Some(camera));
        let other = scene.create_node("rock", None);
        scene.attach_mesh(other, "rock.mesh");

        scene.remove_node(hero);
        assert_eq!(scene.node_count(), 1);
        assert_eq!(scene.node(other).unwrap().mesh.as_deref(), Some("rock.mesh"));
    }
}
