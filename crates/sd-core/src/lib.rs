//! Core scripting types for supyrdupyr: tags, entities, cells, and events.
//!
//! This crate holds the bookkeeping layer that sits on top of the physics and
//! rendering engines. Nothing here touches an engine type: collision filters
//! are plain bitmasks, cells are plain entities with neighbour links, and the
//! messenger dispatches to closures over a caller-chosen context.

/// Entity classes: the declared inputs, outputs, and hooks of each variant.
pub mod class;
/// Typed components attached to entities (cells, timers, bodies, controllers).
pub mod component;
/// Entity types and identifiers.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// Typed entity events and the filters that match them.
pub mod event;
/// Rectangular cell grids and neighbour assignment.
pub mod grid;
/// Input/output wiring between entities.
pub mod io;
/// The built-in entity classes (logic, visible, physics, trigger, timer, cell).
pub mod logic;
/// Priority-ordered publish/subscribe dispatch.
pub mod messenger;
/// The tag registry and collision bitmasks.
pub mod tags;
/// Dynamic values carried by inputs, outputs, and messenger events.
pub mod value;
/// The world model that owns entities and cells.
pub mod world;

/// Re-export entity class types.
pub use class::{EntityClass, InputHandler};
/// Re-export core entity types.
pub use entity::{Entity, EntityId};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export event types.
pub use event::{EntityEvent, EventFilter, EventKind, Match};
/// Re-export grid types.
pub use grid::{Direction, GridLayout};
/// Re-export the messenger.
pub use messenger::{Messenger, SubscriptionId};
/// Re-export tag types.
pub use tags::{TagMask, TagRegistry};
/// Re-export the value type.
pub use value::Value;
/// Re-export the world model.
pub use world::{CellChange, World};
