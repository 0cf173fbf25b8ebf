//! The frame loop for supyrdupyr.
//!
//! Ties the scripting layer in [`sd_core`] to a physics engine and a scene
//! graph through the [`PhysicsBackend`] and [`SceneBackend`] traits. Bodies
//! and scene nodes are created and destroyed as entities come and go; contact
//! pairs come back as `Collided` entity events and `OnCollide` outputs. The
//! in-memory adapters in [`headless`] stand in for a real engine in tests and
//! on the command line.

/// Engine boundary traits and handles.
pub mod backend;
/// Frame counter and fixed-step accumulator.
pub mod clock;
/// Game folder configuration and discovery.
pub mod config;
/// Error types for the simulation crate.
pub mod error;
/// Simulation event types and the event log.
pub mod event;
/// In-memory physics and scene adapters.
pub mod headless;
/// The player character and its controller system.
pub mod hero;
/// Building a world from a game config.
pub mod level;
/// Save game files.
pub mod savegame;
/// Top-level frame loop.
pub mod simulation;
/// The context handed to handlers and systems.
pub mod stage;
/// The trait that all per-frame systems implement.
pub mod system;

/// Re-exports of the engine boundary.
pub use backend::{BodyDesc, BodyHandle, NodeHandle, PhysicsBackend, SceneBackend};
/// Re-export of [`clock::SimClock`].
pub use clock::SimClock;
/// Re-exports of the configuration types.
pub use config::{GameConfig, SimConfig, locate_config};
/// Re-exports of [`error::SimError`] and [`error::SimResult`].
pub use error::{SimError, SimResult};
/// Re-exports of [`event::EventLog`], [`event::SimEvent`], and [`event::SimEventKind`].
pub use event::{EventLog, SimEvent, SimEventKind};
/// Re-exports of the in-memory adapters.
pub use headless::{HeadlessPhysics, HeadlessScene};
/// Re-exports of the player character.
pub use hero::{ControllerSystem, HERO, spawn_hero};
/// Re-exports of level building.
pub use level::{Game, build_world, start_game};
/// Re-export of [`savegame::SaveGame`].
pub use savegame::SaveGame;
/// Re-export of [`simulation::Simulation`].
pub use simulation::Simulation;
/// Re-export of [`stage::Stage`].
pub use stage::Stage;
/// Re-export of [`system::System`].
pub use system::System;
