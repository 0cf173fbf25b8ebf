//! The entity input/output graph.
//!
//! Outputs are wired to inputs with [`World::bind_output`]. Firing an output
//! triggers every bound input synchronously, in the order the bindings were
//! made. Killed entities ignore everything.

use std::sync::Arc;

use crate::class::InputHandler;
use crate::entity::{Binding, EntityId};
use crate::error::{CoreError, CoreResult};
use crate::value::Value;
use crate::world::World;

impl World {
    /// Wire `source`'s `output` to `target`'s `input`.
    ///
    /// The target may be added to the world later; if it is already live it
    /// must declare the input.
    pub fn bind_output(
        &mut self,
        source: EntityId,
        output: &str,
        target: EntityId,
        input: &str,
    ) -> CoreResult<()> {
        if let Some(t) = self.get_entity(target) {
            if !t.class().declares_input(input) {
                return Err(CoreError::UnknownInput {
                    entity: t.name.clone(),
                    input: input.to_string(),
                });
            }
        }
        let entity = self.entity_mut(source)?;
        if !entity.class().declares_output(output) {
            return Err(CoreError::UnknownOutput {
                entity: entity.name.clone(),
                output: output.to_string(),
            });
        }
        entity
            .bindings
            .entry(output.to_string())
            .or_default()
            .push(Binding {
                target,
                input: input.to_string(),
            });
        log::debug!(
            "bound \"{}\".{output} -> \"{}\".{input}",
            self.entity_name(source),
            self.entity_name(target)
        );
        Ok(())
    }

    /// Fire an output, triggering every bound input in binding order.
    ///
    /// Does nothing if the entity is disabled or killed.
    pub fn fire_output(
        &mut self,
        id: EntityId,
        output: &str,
        value: impl Into<Value>,
    ) -> CoreResult<()> {
        if self.is_killed(id) {
            return Ok(());
        }
        if self.entity(id)?.killed {
            return Ok(());
        }
        self.emit(id, output, value.into())
    }

    /// Fire without the killed check, for the entity's own last words.
    fn emit(&mut self, id: EntityId, output: &str, value: Value) -> CoreResult<()> {
        let entity = self.entity_mut(id)?;
        if !entity.class().declares_output(output) {
            return Err(CoreError::UnknownOutput {
                entity: entity.name.clone(),
                output: output.to_string(),
            });
        }
        if !entity.enabled {
            log::trace!("\"{}\" is disabled, {output} not fired", entity.name);
            return Ok(());
        }
        entity.last_outputs.insert(output.to_string(), value.clone());
        let bindings = entity.bindings(output).to_vec();
        log::trace!(
            "\"{}\" fires {output}({value}) to {} binding(s)",
            entity.name,
            bindings.len()
        );
        for binding in bindings {
            self.trigger_input(binding.target, &binding.input, value.clone())?;
        }
        Ok(())
    }

    /// Trigger an input, running its handler with the value and the input's
    /// extra arguments.
    ///
    /// Does nothing if the entity is killed. Declared inputs without a
    /// handler accept the trigger and do nothing.
    pub fn trigger_input(
        &mut self,
        id: EntityId,
        input: &str,
        value: impl Into<Value>,
    ) -> CoreResult<()> {
        if self.is_killed(id) {
            return Ok(());
        }
        let entity = self.entity_mut(id)?;
        if entity.killed {
            return Ok(());
        }
        let class = Arc::clone(entity.class());
        let Some(spec) = class.input_spec(input) else {
            return Err(CoreError::UnknownInput {
                entity: entity.name.clone(),
                input: input.to_string(),
            });
        };
        let value = value.into();
        entity.last_inputs.insert(input.to_string(), value.clone());

        match &spec.handler {
            None => Ok(()),
            Some(InputHandler::Call(handler)) => handler(self, id, &value, &spec.args),
            Some(InputHandler::Fire(output)) => self.fire_output(id, output, value),
        }
    }

    /// Kill an entity through its `Kill` input.
    pub fn kill(&mut self, id: EntityId) -> CoreResult<()> {
        self.trigger_input(id, "Kill", Value::Null)
    }

    /// Mark the entity killed, fire `OnKill`, and move it to the graveyard.
    pub(crate) fn finish_kill(&mut self, id: EntityId) -> CoreResult<()> {
        let entity = self.entity_mut(id)?;
        if entity.killed {
            return Ok(());
        }
        entity.killed = true;
        self.emit(id, "OnKill", Value::Entity(id))?;
        self.bury(id);
        Ok(())
    }

    /// Enable or disable an entity without going through its inputs.
    pub fn set_enabled(&mut self, id: EntityId, enabled: bool) -> CoreResult<()> {
        let entity = self.entity_mut(id)?;
        if entity.enabled != enabled {
            log::trace!(
                "\"{}\" {}",
                entity.name,
                if enabled { "enabled" } else { "disabled" }
            );
        }
        entity.enabled = enabled;
        Ok(())
    }

    /// The last value an entity's input received, live or killed.
    pub fn last_input(&self, id: EntityId, input: &str) -> Option<&Value> {
        self.get_entity(id)
            .or_else(|| self.killed_entity(id))
            .and_then(|e| e.last_input(input))
    }

    /// The last value an entity's output fired with, live or killed.
    pub fn last_output(&self, id: EntityId, output: &str) -> Option<&Value> {
        self.get_entity(id)
            .or_else(|| self.killed_entity(id))
            .and_then(|e| e.last_output(output))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use super::*;
    use crate::class::EntityClass;
    use crate::entity::Entity;
    use crate::logic::LOGIC;

    /// Appends each triggering value to the entity's data list.
    fn record(world: &mut World, id: EntityId, value: &Value, args: &[Value]) -> CoreResult<()> {
        let entity = world.entity_mut(id)?;
        let mut seen = match entity.data.take() {
            Some(Value::List(items)) => items,
            _ => Vec::new(),
        };
        seen.push(value.clone());
        seen.extend_from_slice(args);
        entity.data = Some(Value::List(seen));
        Ok(())
    }

    static PROBE: LazyLock<Arc<EntityClass>> = LazyLock::new(|| {
        EntityClass::extends("Probe", &LOGIC)
            .input("Hit", "Record the value.", InputHandler::Call(record))
            .input_with_args(
                "Tagged",
                "Record the value and a marker.",
                InputHandler::Call(record),
                vec![Value::from("marker")],
            )
            .declare_input("Ignore", "Accepts anything.")
            .output("OnPing", "Test output.")
            .input("Ping", "Fire OnPing.", InputHandler::Fire("OnPing".into()))
            .shared()
    });

    fn seen(world: &World, id: EntityId) -> Vec<Value> {
        match world.get_entity(id).and_then(|e| e.data.clone()) {
            Some(Value::List(items)) => items,
            _ => Vec::new(),
        }
    }

    fn spawn(world: &mut World, name: &str) -> EntityId {
        world.add_entity(Entity::new(&PROBE, name)).unwrap()
    }

    #[test]
    fn fire_reaches_targets_in_binding_order() {
        let mut world = World::new();
        let src = spawn(&mut world, "src");
        let a = spawn(&mut world, "a");
        let b = spawn(&mut world, "b");
        world.bind_output(src, "OnUser1", b, "Hit").unwrap();
        world.bind_output(src, "OnUser1", a, "Hit").unwrap();
        world.bind_output(src, "OnUser1", b, "Tagged").unwrap();

        world.trigger_input(src, "FireUser1", 7).unwrap();

        assert_eq!(seen(&world, a), [Value::Int(7)]);
        assert_eq!(
            seen(&world, b),
            [Value::Int(7), Value::Int(7), Value::from("marker")]
        );
        assert_eq!(world.last_output(src, "OnUser1"), Some(&Value::Int(7)));
        assert_eq!(world.last_input(a, "Hit"), Some(&Value::Int(7)));
    }

    #[test]
    fn binding_undeclared_ports_fails() {
        let mut world = World::new();
        let src = spawn(&mut world, "src");
        let dst = spawn(&mut world, "dst");

        let err = world.bind_output(src, "OnNothing", dst, "Hit").unwrap_err();
        assert!(matches!(err, CoreError::UnknownOutput { output, .. } if output == "OnNothing"));

        let err = world.bind_output(src, "OnUser1", dst, "Nope").unwrap_err();
        assert!(matches!(err, CoreError::UnknownInput { input, .. } if input == "Nope"));
        assert!(world.get_entity(src).unwrap().bindings("OnUser1").is_empty());
    }

    #[test]
    fn undeclared_input_and_output_fail() {
        let mut world = World::new();
        let id = spawn(&mut world, "probe");
        assert!(matches!(
            world.trigger_input(id, "Explode", Value::Null),
            Err(CoreError::UnknownInput { .. })
        ));
        assert!(matches!(
            world.fire_output(id, "OnExplode", Value::Null),
            Err(CoreError::UnknownOutput { .. })
        ));
    }

    #[test]
    fn declared_input_without_handler_is_accepted() {
        let mut world = World::new();
        let id = spawn(&mut world, "probe");
        world.trigger_input(id, "Ignore", true).unwrap();
        assert_eq!(world.last_input(id, "Ignore"), Some(&Value::Bool(true)));
    }

    #[test]
    fn fire_handler_passes_value_on() {
        let mut world = World::new();
        let src = spawn(&mut world, "src");
        let dst = spawn(&mut world, "dst");
        world.bind_output(src, "OnPing", dst, "Hit").unwrap();
        world.trigger_input(src, "Ping", "hello").unwrap();
        assert_eq!(seen(&world, dst), [Value::from("hello")]);
    }

    #[test]
    fn disabled_entities_do_not_fire() {
        let mut world = World::new();
        let src = spawn(&mut world, "src");
        let dst = spawn(&mut world, "dst");
        world.bind_output(src, "OnUser2", dst, "Hit").unwrap();

        world.trigger_input(src, "Disable", Value::Null).unwrap();
        world.fire_output(src, "OnUser2", 1).unwrap();
        assert!(seen(&world, dst).is_empty());

        world.trigger_input(src, "Enable", Value::Null).unwrap();
        world.fire_output(src, "OnUser2", 2).unwrap();
        assert_eq!(seen(&world, dst), [Value::Int(2)]);
    }

    #[test]
    fn disabled_entities_still_take_inputs() {
        let mut world = World::new();
        let id = spawn(&mut world, "probe");
        world.set_enabled(id, false).unwrap();
        world.trigger_input(id, "Hit", 3).unwrap();
        assert_eq!(seen(&world, id), [Value::Int(3)]);
    }

    #[test]
    fn disable_toggle_toggle_ends_disabled() {
        let mut world = World::new();
        let id = spawn(&mut world, "probe");
        let enabled = |w: &World| w.get_entity(id).unwrap().is_enabled();

        world.trigger_input(id, "Disable", Value::Null).unwrap();
        assert!(!enabled(&world));
        world.trigger_input(id, "Toggle", Value::Null).unwrap();
        assert!(enabled(&world));
        world.trigger_input(id, "Toggle", Value::Null).unwrap();
        assert!(!enabled(&world));
    }

    #[test]
    fn enable_and_disable_are_idempotent() {
        let mut world = World::new();
        let id = spawn(&mut world, "probe");
        world.trigger_input(id, "Enable", Value::Null).unwrap();
        world.trigger_input(id, "Enable", Value::Null).unwrap();
        assert!(world.get_entity(id).unwrap().is_enabled());
        world.trigger_input(id, "Disable", Value::Null).unwrap();
        world.trigger_input(id, "Disable", Value::Null).unwrap();
        assert!(!world.get_entity(id).unwrap().is_enabled());
    }

    #[test]
    fn kill_fires_on_kill_once_and_is_terminal() {
        let mut world = World::new();
        let victim = spawn(&mut world, "victim");
        let witness = spawn(&mut world, "witness");
        world.bind_output(victim, "OnKill", witness, "Hit").unwrap();
        world.bind_output(victim, "OnUser1", witness, "Hit").unwrap();

        world.kill(victim).unwrap();
        world.kill(victim).unwrap();
        world.trigger_input(victim, "FireUser1", 1).unwrap();
        world.fire_output(victim, "OnUser1", 2).unwrap();

        assert_eq!(seen(&world, witness), [Value::Entity(victim)]);
        assert!(world.is_killed(victim));
        assert!(world.get_entity(victim).is_none());
        assert!(world.find_by_name("victim").is_none());
        assert!(world.killed_entity(victim).unwrap().is_killed());
        assert_eq!(world.take_removed(), vec![victim]);
    }

    #[test]
    fn self_kill_binding_does_not_recurse() {
        let mut world = World::new();
        let id = spawn(&mut world, "loop");
        world.bind_output(id, "OnKill", id, "Kill").unwrap();
        world.kill(id).unwrap();
        assert!(world.is_killed(id));
    }

    #[test]
    fn killed_name_can_be_reused() {
        let mut world = World::new();
        let first = spawn(&mut world, "crate");
        world.kill(first).unwrap();
        let second = spawn(&mut world, "crate");
        assert_ne!(first, second);
        assert_eq!(world.find_id_by_name("crate"), Some(second));
    }

    #[test]
    fn disabled_kill_is_silent() {
        let mut world = World::new();
        let victim = spawn(&mut world, "victim");
        let witness = spawn(&mut world, "witness");
        world.bind_output(victim, "OnKill", witness, "Hit").unwrap();
        world.set_enabled(victim, false).unwrap();
        world.kill(victim).unwrap();
        assert!(world.is_killed(victim));
        assert!(seen(&world, witness).is_empty());
    }

    #[test]
    fn unknown_entity_is_an_error() {
        let mut world = World::new();
        let ghost = EntityId::new();
        assert!(matches!(
            world.trigger_input(ghost, "Kill", Value::Null),
            Err(CoreError::EntityNotFound(_))
        ));
    }
}
