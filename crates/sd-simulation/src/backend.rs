use std::fmt;

use nalgebra::Vector3;
use sd_core::component::{BodyKind, BodyShape};
use sd_core::{EntityId, TagMask};

/// Opaque handle to a body owned by a [`PhysicsBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

/// Opaque handle to a node owned by a [`SceneBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub u64);

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Everything a physics engine needs to create a body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    /// The entity the body resolves back to.
    pub owner: EntityId,
    /// How the body moves.
    pub kind: BodyKind,
    /// Collision shape.
    pub shape: BodyShape,
    /// Mass of dynamic bodies.
    pub mass: f32,
    /// Sphere radius, or half the side of a ground square.
    pub radius: f32,
    /// Initial position.
    pub position: Vector3<f32>,
    /// Collision filter group: the owner's tag bits.
    pub group: TagMask,
    /// Collision filter mask: the tag bits this body collides with.
    pub mask: TagMask,
}

/// The physics engine as seen by the step loop.
///
/// Forces are in world space. Yaw is a heading in degrees about the up axis.
pub trait PhysicsBackend: fmt::Debug {
    /// Set the acceleration applied to dynamic bodies.
    fn set_gravity(&mut self, gravity: Vector3<f32>);

    /// Advance the simulation by `dt` seconds.
    fn step(&mut self, dt: f64);

    /// Create a body.
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle;

    /// Destroy a body. Unknown handles are ignored.
    fn remove_body(&mut self, body: BodyHandle);

    /// Current position of a body.
    fn position(&self, body: BodyHandle) -> Option<Vector3<f32>>;

    /// Move a body.
    fn set_position(&mut self, body: BodyHandle, position: Vector3<f32>);

    /// Current velocity of a body.
    fn velocity(&self, body: BodyHandle) -> Option<Vector3<f32>>;

    /// Overwrite a body's velocity.
    fn set_velocity(&mut self, body: BodyHandle, velocity: Vector3<f32>);

    /// Current heading of a body.
    fn yaw(&self, body: BodyHandle) -> Option<f32>;

    /// Turn a body to a heading.
    fn set_yaw(&mut self, body: BodyHandle, degrees: f32);

    /// Add a force for the next step.
    fn apply_force(&mut self, body: BodyHandle, force: Vector3<f32>);

    /// Contact pairs found during the most recent step.
    fn contacts(&self) -> Vec<(BodyHandle, BodyHandle)>;

    /// The entity a body was created for.
    fn owner(&self, body: BodyHandle) -> Option<EntityId>;

    /// Number of live bodies.
    fn body_count(&self) -> usize;
}

/// The scene graph as seen by the step loop.
pub trait SceneBackend: fmt::Debug {
    /// Create a node, optionally under a parent.
    fn create_node(&mut self, name: &str, parent: Option<NodeHandle>) -> NodeHandle;

    /// Move a node relative to its parent.
    fn set_position(&mut self, node: NodeHandle, position: Vector3<f32>);

    /// Heading, pitch, and roll in degrees.
    fn set_orientation(&mut self, node: NodeHandle, hpr: Vector3<f32>);

    /// Show a mesh resource at a node.
    fn attach_mesh(&mut self, node: NodeHandle, mesh: &str);

    /// Remove a node and its children.
    fn remove_node(&mut self, node: NodeHandle);

    /// Number of live nodes.
    fn node_count(&self) -> usize;
}
