use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::class::EntityClass;
use crate::component::ComponentSet;
use crate::tags::is_wildcard;
use crate::value::Value;

/// Unique identifier for every entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Generate a new random entity ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// One edge of the input/output graph: fire `input` on `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// The entity receiving the input.
    pub target: EntityId,
    /// The input triggered on the target.
    pub input: String,
}

/// Core entity struct. Every scripted world object is an Entity.
///
/// What an entity can do is fixed by its [`EntityClass`]; the per-instance
/// state is the enabled/killed flags, the output bindings, and whatever
/// components the class needs.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// Unique name within the world.
    pub name: String,
    /// Tags used for collision filtering and event matching.
    pub tags: Vec<String>,
    /// The cell this entity lives in, if any.
    pub cell: Option<EntityId>,
    /// World-space position.
    pub position: Vector3<f32>,
    /// Opaque per-entity payload.
    pub data: Option<Value>,
    /// Typed component data attached to this entity.
    pub components: ComponentSet,
    class: Arc<EntityClass>,
    pub(crate) enabled: bool,
    pub(crate) killed: bool,
    pub(crate) bindings: HashMap<String, Vec<Binding>>,
    pub(crate) last_inputs: HashMap<String, Value>,
    pub(crate) last_outputs: HashMap<String, Value>,
}

impl Entity {
    /// Create an entity of the given class with a random ID.
    ///
    /// The class's default tags come first, followed by any added with
    /// [`Entity::with_tags`].
    pub fn new(class: &Arc<EntityClass>, name: impl Into<String>) -> Self {
        let components = class.components();
        Self {
            id: EntityId::new(),
            name: name.into(),
            tags: class.default_tags().to_vec(),
            cell: None,
            position: Vector3::zeros(),
            data: None,
            components,
            class: Arc::clone(class),
            enabled: class.starts_enabled(),
            killed: false,
            bindings: HashMap::new(),
            last_inputs: HashMap::new(),
            last_outputs: HashMap::new(),
        }
    }

    /// Append whitespace-separated tags, skipping ones already present.
    pub fn with_tags(mut self, tags: &str) -> Self {
        for tag in tags.split_whitespace() {
            if !self.tags.iter().any(|t| t == tag) {
                self.tags.push(tag.to_string());
            }
        }
        self
    }

    /// Place the entity at a world-space position.
    pub fn at(mut self, position: Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    /// Put the entity in a cell when it is added to the world.
    pub fn in_cell(mut self, cell: EntityId) -> Self {
        self.cell = Some(cell);
        self
    }

    /// Attach free-form data.
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Adjust the components copied from the class.
    pub fn with_components(mut self, f: impl FnOnce(&mut ComponentSet)) -> Self {
        f(&mut self.components);
        self
    }

    /// The class that declares this entity's inputs and outputs.
    pub fn class(&self) -> &Arc<EntityClass> {
        &self.class
    }

    /// Whether the entity fires outputs.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the entity has been killed.
    pub fn is_killed(&self) -> bool {
        self.killed
    }

    /// Returns true for cells.
    pub fn is_cell(&self) -> bool {
        self.components.cell.is_some()
    }

    /// Returns true if the entity carries `tag`. Wildcards match every entity.
    pub fn has_tag(&self, tag: &str) -> bool {
        is_wildcard(tag) || self.tags.iter().any(|t| t == tag)
    }

    /// Bindings recorded for an output, in the order they were bound.
    pub fn bindings(&self, output: &str) -> &[Binding] {
        self.bindings.get(output).map(Vec::as_slice).unwrap_or_default()
    }

    /// The last value an input received, if it has been triggered.
    pub fn last_input(&self, input: &str) -> Option<&Value> {
        self.last_inputs.get(input)
    }

    /// The last value an output fired with, if it has fired.
    pub fn last_output(&self, output: &str) -> Option<&Value> {
        self.last_outputs.get(output)
    }
}
