use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::grid::Direction;

/// The set of typed components attached to an entity.
/// Each built-in class uses one of these, but entities can hold any combination.
#[derive(Debug, Clone, Default)]
pub struct ComponentSet {
    /// Cell membership and neighbours.
    pub cell: Option<CellComponent>,
    /// Interval timer state.
    pub timer: Option<TimerComponent>,
    /// Rigid body description.
    pub body: Option<BodyComponent>,
    /// Player input state.
    pub controller: Option<ControllerComponent>,
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// Terrain region state: contained entities and up to eight neighbours.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellComponent {
    /// Entities placed in this cell, in insertion order.
    pub members: Vec<EntityId>,
    /// Adjacent cells. A missing key means there is no neighbour that way.
    pub neighbours: BTreeMap<Direction, EntityId>,
}

impl CellComponent {
    /// The neighbour in a direction, if any.
    pub fn neighbour(&self, dir: Direction) -> Option<EntityId> {
        self.neighbours.get(&dir).copied()
    }

    /// Returns true if `id` is placed in this cell.
    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// Which of the alternating outputs a timer fires next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerPhase {
    /// The next fire is `OnTimerHigh`.
    #[default]
    High,
    /// The next fire is `OnTimerLow`.
    Low,
}

impl TimerPhase {
    /// The output fired for this phase.
    pub fn output(self) -> &'static str {
        match self {
            Self::High => "OnTimerHigh",
            Self::Low => "OnTimerLow",
        }
    }
}

/// Interval timer state.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerComponent {
    /// Seconds between fires.
    pub interval: f64,
    /// Seconds accumulated while enabled.
    pub elapsed: f64,
    /// Value of `elapsed` at the most recent scheduled fire.
    pub last_fired: f64,
    /// Number of fires since the last reset.
    pub count: u64,
    /// Which phase output fires next.
    pub phase: TimerPhase,
}

impl TimerComponent {
    /// A stopped timer with the given interval in seconds.
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            elapsed: 0.0,
            last_fired: 0.0,
            count: 0,
            phase: TimerPhase::High,
        }
    }

    /// Start counting from zero again.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.last_fired = 0.0;
        self.count = 0;
    }
}

// ---------------------------------------------------------------------------
// Physics body
// ---------------------------------------------------------------------------

/// How the physics engine should treat a body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    /// Simulated rigid body affected by gravity and forces.
    #[default]
    Dynamic,
    /// Immovable collision geometry.
    Static,
    /// Reports contacts but never pushes anything.
    Trigger,
    /// Moved by a character controller rather than by forces.
    Kinematic,
}

/// Collision shape for adapters without mesh collision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyShape {
    /// A sphere of the body's radius.
    #[default]
    Sphere,
    /// An upward-facing square of half-width `radius`, for terrain.
    Ground,
}

/// What the engine adapter needs to create a body for an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyComponent {
    /// How the body moves.
    pub kind: BodyKind,
    /// Collision shape.
    pub shape: BodyShape,
    /// Mass; ignored for static bodies.
    pub mass: f32,
    /// Sphere radius, or half-width of a ground square.
    pub radius: f32,
    /// Visual mesh resource name.
    pub mesh: Option<String>,
    /// Tags this body collides with. Empty collides with everything.
    pub collision_tags: Vec<String>,
}

impl BodyComponent {
    /// A unit sphere of the given kind.
    pub fn new(kind: BodyKind) -> Self {
        Self {
            kind,
            shape: BodyShape::Sphere,
            mass: 0.0,
            radius: 1.0,
            mesh: None,
            collision_tags: Vec::new(),
        }
    }

    /// Set the collision shape.
    pub fn with_shape(mut self, shape: BodyShape) -> Self {
        self.shape = shape;
        self
    }

    /// Set the mass.
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Set the sphere radius.
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Set the visual mesh resource.
    pub fn with_mesh(mut self, mesh: impl Into<String>) -> Self {
        self.mesh = Some(mesh.into());
        self
    }

    /// Set the collision tags from a whitespace-separated string.
    pub fn colliding_with(mut self, tags: &str) -> Self {
        self.collision_tags = tags.split_whitespace().map(str::to_string).collect();
        self
    }
}

// ---------------------------------------------------------------------------
// Player controller
// ---------------------------------------------------------------------------

/// Input-driven movement state for a player-controlled body.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerComponent {
    /// Held movement keys as (strafe, forward) contributions.
    pub moves: Vec<(f32, f32)>,
    /// Set by any collision, cleared by a jump.
    pub can_jump: bool,
    /// Squared horizontal speed limit.
    pub max_speed: f32,
    /// Heading in degrees.
    pub yaw: f32,
    /// Accumulated vertical look, clamped by the controller.
    pub look: f32,
}

impl ControllerComponent {
    /// An idle controller with the given speed limit.
    pub fn new(max_speed: f32) -> Self {
        Self {
            moves: Vec::new(),
            can_jump: false,
            max_speed,
            yaw: 0.0,
            look: 0.0,
        }
    }

    /// Start a movement contribution (key down).
    pub fn press(&mut self, strafe: f32, forward: f32) {
        self.moves.push((strafe, forward));
    }

    /// Stop one matching movement contribution (key up).
    pub fn release(&mut self, strafe: f32, forward: f32) {
        if let Some(pos) = self.moves.iter().position(|m| *m == (strafe, forward)) {
            self.moves.remove(pos);
        }
    }

    /// Sum of all held movement contributions.
    pub fn walk_input(&self) -> (f32, f32) {
        self.moves
            .iter()
            .fold((0.0, 0.0), |(x, y), (dx, dy)| (x + dx, y + dy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_release_removes_one_press() {
        let mut c = ControllerComponent::new(1.0);
        c.press(0.0, 10.0);
        c.press(0.0, 10.0);
        c.press(10.0, 0.0);
        c.release(0.0, 10.0);
        assert_eq!(c.walk_input(), (10.0, 10.0));
        c.release(5.0, 5.0);
        assert_eq!(c.moves.len(), 2);
    }

    #[test]
    fn timer_reset_keeps_interval_and_phase() {
        let mut t = TimerComponent::new(2.0);
        t.elapsed = 5.0;
        t.count = 2;
        t.phase = TimerPhase::Low;
        t.reset();
        assert_eq!(t.elapsed, 0.0);
        assert_eq!(t.count, 0);
        assert_eq!(t.interval, 2.0);
        assert_eq!(t.phase, TimerPhase::Low);
    }

    #[test]
    fn body_collision_tags_split_on_whitespace() {
        let body = BodyComponent::new(BodyKind::Static).colliding_with(" !static  !cell ");
        assert_eq!(body.collision_tags, ["!static", "!cell"]);
    }
}
