use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::component::ComponentSet;
use crate::entity::EntityId;
use crate::error::CoreResult;
use crate::value::Value;
use crate::world::World;

/// Handler invoked when an input is triggered: `(world, entity, value, extra args)`.
pub type InputFn = fn(&mut World, EntityId, &Value, &[Value]) -> CoreResult<()>;
/// Hook run once when an entity of the class is added to a world.
pub type SetupFn = fn(&mut World, EntityId) -> CoreResult<()>;
/// Hook run every tick for each live entity of the class.
pub type SimulateFn = fn(&mut World, EntityId, f64) -> CoreResult<()>;

/// What triggering an input does.
#[derive(Clone)]
pub enum InputHandler {
    /// Call a function.
    Call(InputFn),
    /// Fire the named output on the same entity, passing the value along.
    Fire(String),
}

impl fmt::Debug for InputHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call(_) => f.write_str("Call(..)"),
            Self::Fire(output) => f.debug_tuple("Fire").field(output).finish(),
        }
    }
}

/// A declared input.
#[derive(Debug, Clone)]
pub struct InputSpec {
    /// What the input does.
    pub doc: String,
    /// Names of the expected value types, for documentation.
    pub params: Vec<String>,
    /// `None` declares the input without giving it behaviour.
    pub handler: Option<InputHandler>,
    /// Extra arguments handed to the handler after the triggering value.
    pub args: Vec<Value>,
}

/// A declared output.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    /// What the output means.
    pub doc: String,
    /// Names of the value types the output fires with, for documentation.
    pub params: Vec<String>,
}

/// The static capability set of an entity variant.
///
/// Classes are built once (usually in a `LazyLock`) and shared by every
/// instance. [`EntityClass::extends`] copies the parent's declarations;
/// anything the child then declares under the same name replaces the
/// inherited entry.
#[derive(Clone)]
pub struct EntityClass {
    name: String,
    lineage: Vec<String>,
    tags: Vec<String>,
    inputs: BTreeMap<String, InputSpec>,
    outputs: BTreeMap<String, OutputSpec>,
    template: ComponentSet,
    enabled: bool,
    setup: Option<SetupFn>,
    simulate: Option<SimulateFn>,
}

impl fmt::Debug for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityClass")
            .field("name", &self.name)
            .field("lineage", &self.lineage)
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EntityClass {
    /// A class with no inputs, outputs, or hooks.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lineage: Vec::new(),
            tags: Vec::new(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            template: ComponentSet::default(),
            enabled: true,
            setup: None,
            simulate: None,
        }
    }

    /// Derive a class from `parent`, inheriting everything it declares.
    pub fn extends(name: impl Into<String>, parent: &EntityClass) -> Self {
        let mut lineage = parent.lineage.clone();
        lineage.push(parent.name.clone());
        Self {
            name: name.into(),
            lineage,
            ..parent.clone()
        }
    }

    /// Declare an input with a handler.
    pub fn input(self, name: &str, doc: &str, handler: InputHandler) -> Self {
        self.input_with_args(name, doc, handler, Vec::new())
    }

    /// Declare an input whose handler also receives fixed extra arguments.
    pub fn input_with_args(
        mut self,
        name: &str,
        doc: &str,
        handler: InputHandler,
        args: Vec<Value>,
    ) -> Self {
        self.inputs.insert(
            name.to_string(),
            InputSpec {
                doc: doc.to_string(),
                params: Vec::new(),
                handler: Some(handler),
                args,
            },
        );
        self
    }

    /// Declare an input that accepts triggers but does nothing.
    pub fn declare_input(mut self, name: &str, doc: &str) -> Self {
        self.inputs.insert(
            name.to_string(),
            InputSpec {
                doc: doc.to_string(),
                params: Vec::new(),
                handler: None,
                args: Vec::new(),
            },
        );
        self
    }

    /// Document the value types an already declared input expects.
    pub fn input_params(mut self, name: &str, params: &[&str]) -> Self {
        if let Some(spec) = self.inputs.get_mut(name) {
            spec.params = params.iter().map(|p| p.to_string()).collect();
        }
        self
    }

    /// Declare an output that fires without a documented payload.
    pub fn output(self, name: &str, doc: &str) -> Self {
        self.output_with_params(name, &[], doc)
    }

    /// Declare an output and the value types it fires with.
    pub fn output_with_params(mut self, name: &str, params: &[&str], doc: &str) -> Self {
        self.outputs.insert(
            name.to_string(),
            OutputSpec {
                doc: doc.to_string(),
                params: params.iter().map(|p| p.to_string()).collect(),
            },
        );
        self
    }

    /// Add default tags carried by every instance.
    pub fn tags(mut self, tags: &str) -> Self {
        for tag in tags.split_whitespace() {
            if !self.tags.iter().any(|t| t == tag) {
                self.tags.push(tag.to_string());
            }
        }
        self
    }

    /// Adjust the components every new instance starts with.
    pub fn component(mut self, f: impl FnOnce(&mut ComponentSet)) -> Self {
        f(&mut self.template);
        self
    }

    /// New instances start disabled.
    pub fn starts_disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Run `hook` once when an instance is added to a world.
    pub fn on_setup(mut self, hook: SetupFn) -> Self {
        self.setup = Some(hook);
        self
    }

    /// Run `hook` on every instance each tick.
    pub fn on_simulate(mut self, hook: SimulateFn) -> Self {
        self.simulate = Some(hook);
        self
    }

    /// Freeze the class for sharing between instances.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The class name, e.g. `TimerEntity`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ancestor class names, root first.
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// Returns true if this class is `name` or derives from it.
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.lineage.iter().any(|n| n == name)
    }

    /// Declared inputs by name.
    pub fn inputs(&self) -> &BTreeMap<String, InputSpec> {
        &self.inputs
    }

    /// Declared outputs by name.
    pub fn outputs(&self) -> &BTreeMap<String, OutputSpec> {
        &self.outputs
    }

    /// Look up one declared input.
    pub fn input_spec(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.get(name)
    }

    /// Returns true if the class declares input `name`.
    pub fn declares_input(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
    }

    /// Returns true if the class declares output `name`.
    pub fn declares_output(&self, name: &str) -> bool {
        self.outputs.contains_key(name)
    }

    /// Tags every instance starts with, inherited ones first.
    pub fn default_tags(&self) -> &[String] {
        &self.tags
    }

    /// A fresh copy of the components new instances start with.
    pub fn components(&self) -> ComponentSet {
        self.template.clone()
    }

    /// Whether new instances start enabled.
    pub fn starts_enabled(&self) -> bool {
        self.enabled
    }

    /// The spawn-time hook, if any.
    pub fn setup_hook(&self) -> Option<SetupFn> {
        self.setup
    }

    /// The per-tick hook, if any.
    pub fn simulate_hook(&self) -> Option<SimulateFn> {
        self.simulate
    }

    /// Human-readable listing of the class's inputs and outputs.
    pub fn describe(&self) -> String {
        fn port(out: &mut String, name: &str, params: &[String], doc: &str) {
            let params = if params.is_empty() {
                "none".to_string()
            } else {
                params
                    .iter()
                    .map(|p| format!("<{p}>"))
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            out.push_str(&format!("    {name} : {params}\n      {doc}\n"));
        }

        let mut out = format!("{}\n\n  Inputs:\n", self.name);
        for (name, spec) in &self.inputs {
            port(&mut out, name, &spec.params, &spec.doc);
        }
        out.push_str("\n  Outputs:\n");
        for (name, spec) in &self.outputs {
            port(&mut out, name, &spec.params, &spec.doc);
        }
        out
    }
}
