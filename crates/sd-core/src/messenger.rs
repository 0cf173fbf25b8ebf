use std::collections::HashMap;
use std::fmt;

use crate::error::CoreResult;
use crate::event::{EntityEvent, EventFilter};
use crate::value::Value;

/// Priority used when a subscriber does not care about ordering.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Handler for a named event: `(context, extra args ++ call args)`.
pub type Handler<C> = Box<dyn FnMut(&mut C, &[Value]) -> CoreResult<()>>;
/// Handler for a typed entity event: `(context, event, extra args)`.
pub type EntityHandler<C> = Box<dyn FnMut(&mut C, &EntityEvent, &[Value]) -> CoreResult<()>>;

/// Identifies one subscription for [`Messenger::ignore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription<H> {
    id: SubscriptionId,
    priority: i32,
    extra_args: Vec<Value>,
    handler: H,
}

/// Insert keeping ascending priority; equal priorities keep registration order.
fn insert_sorted<H>(subs: &mut Vec<Subscription<H>>, sub: Subscription<H>) {
    let at = subs.partition_point(|s| s.priority <= sub.priority);
    subs.insert(at, sub);
}

/// Publish/subscribe bus for named events and typed entity events.
///
/// Handlers receive the context `C` mutably rather than the messenger, so a
/// dispatch always runs over the subscriber list as it was when it started.
pub struct Messenger<C> {
    next_id: u64,
    named: HashMap<String, Vec<Subscription<Handler<C>>>>,
    entity: Vec<(EventFilter, Subscription<EntityHandler<C>>)>,
}

impl<C> Default for Messenger<C> {
    fn default() -> Self {
        Self {
            next_id: 0,
            named: HashMap::new(),
            entity: Vec::new(),
        }
    }
}

impl<C> fmt::Debug for Messenger<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<_> = self.named.iter().map(|(k, v)| (k, v.len())).collect();
        events.sort();
        f.debug_struct("Messenger")
            .field("events", &events)
            .field("entity_subscriptions", &self.entity.len())
            .finish()
    }
}

impl<C> Messenger<C> {
    /// An empty messenger.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    /// Subscribe to a named event.
    ///
    /// `extra_args` are passed to the handler ahead of the arguments given to
    /// [`Messenger::send`]. Lower priorities run first.
    pub fn accept(
        &mut self,
        event: &str,
        handler: impl FnMut(&mut C, &[Value]) -> CoreResult<()> + 'static,
        extra_args: Vec<Value>,
        priority: i32,
    ) -> SubscriptionId {
        let id = self.next_id();
        log::debug!("accept \"{event}\" priority {priority}");
        let subs = self.named.entry(event.to_string()).or_default();
        insert_sorted(
            subs,
            Subscription {
                id,
                priority,
                extra_args,
                handler: Box::new(handler),
            },
        );
        id
    }

    /// Invoke every handler for `event` in priority order.
    ///
    /// Returns the number of handlers run. Nobody listening is not an error.
    /// The first handler error stops the dispatch and is returned.
    pub fn send(&mut self, ctx: &mut C, event: &str, args: &[Value]) -> CoreResult<usize> {
        let Some(subs) = self.named.get_mut(event) else {
            log::trace!("send \"{event}\": no listeners");
            return Ok(0);
        };
        log::debug!("send \"{event}\" {args:?} to {} handler(s)", subs.len());
        for sub in subs.iter_mut() {
            let mut call_args = sub.extra_args.clone();
            call_args.extend_from_slice(args);
            (sub.handler)(ctx, &call_args)?;
        }
        Ok(subs.len())
    }

    /// Subscribe to entity events matching `filter`.
    pub fn accept_entity(
        &mut self,
        filter: EventFilter,
        handler: impl FnMut(&mut C, &EntityEvent, &[Value]) -> CoreResult<()> + 'static,
        extra_args: Vec<Value>,
        priority: i32,
    ) -> SubscriptionId {
        let id = self.next_id();
        log::debug!("accept entity event {filter:?} priority {priority}");
        let at = self
            .entity
            .partition_point(|(_, s)| s.priority <= priority);
        self.entity.insert(
            at,
            (
                filter,
                Subscription {
                    id,
                    priority,
                    extra_args,
                    handler: Box::new(handler),
                },
            ),
        );
        id
    }

    /// Invoke every entity handler whose filter matches `event`.
    pub fn dispatch(&mut self, ctx: &mut C, event: &EntityEvent) -> CoreResult<usize> {
        let mut ran = 0;
        for (filter, sub) in self.entity.iter_mut() {
            if !filter.matches(event) {
                continue;
            }
            (sub.handler)(ctx, event, &sub.extra_args)?;
            ran += 1;
        }
        if ran > 0 {
            log::debug!(
                "dispatched {} from \"{}\" to {ran} handler(s)",
                event.kind,
                event.source_name
            );
        }
        Ok(ran)
    }

    /// Remove one subscription. Returns false if it was already gone.
    pub fn ignore(&mut self, id: SubscriptionId) -> bool {
        for subs in self.named.values_mut() {
            if let Some(pos) = subs.iter().position(|s| s.id == id) {
                subs.remove(pos);
                return true;
            }
        }
        if let Some(pos) = self.entity.iter().position(|(_, s)| s.id == id) {
            self.entity.remove(pos);
            return true;
        }
        false
    }

    /// Drop every handler for a named event.
    pub fn ignore_all(&mut self, event: &str) {
        self.named.remove(event);
    }

    /// Number of handlers subscribed to a named event.
    pub fn listeners(&self, event: &str) -> usize {
        self.named.get(event).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::error::CoreError;
    use crate::event::{EventKind, Match};
    use crate::logic::PHYSICS;

    type Log = Vec<String>;

    fn record(label: &'static str) -> impl FnMut(&mut Log, &[Value]) -> CoreResult<()> {
        move |log: &mut Log, args: &[Value]| {
            log.push(format!("{label}{args:?}"));
            Ok(())
        }
    }

    #[test]
    fn ascending_priority_with_stable_ties() {
        let mut bus = Messenger::new();
        bus.accept("tick", record("first@5"), vec![], 5);
        bus.accept("tick", record("only@1"), vec![], 1);
        bus.accept("tick", record("second@5"), vec![], 5);

        let mut log = Log::new();
        assert_eq!(bus.send(&mut log, "tick", &[]).unwrap(), 3);
        assert_eq!(log, ["only@1[]", "first@5[]", "second@5[]"]);
    }

    #[test]
    fn extra_args_come_first() {
        let mut bus = Messenger::new();
        bus.accept("w", record("walk"), vec![Value::Float(0.0), Value::Float(10.0)], DEFAULT_PRIORITY);

        let mut log = Log::new();
        bus.send(&mut log, "w", &[Value::Bool(true)]).unwrap();
        assert_eq!(log, ["walk[Float(0.0), Float(10.0), Bool(true)]"]);
    }

    #[test]
    fn args_do_not_leak_between_sends() {
        let mut bus = Messenger::new();
        bus.accept("use", record("h"), vec![Value::Int(1)], DEFAULT_PRIORITY);

        let mut log = Log::new();
        bus.send(&mut log, "use", &[Value::Int(2)]).unwrap();
        bus.send(&mut log, "use", &[]).unwrap();
        assert_eq!(log, ["h[Int(1), Int(2)]", "h[Int(1)]"]);
    }

    #[test]
    fn unknown_event_is_a_noop() {
        let mut bus: Messenger<Log> = Messenger::new();
        let mut log = Log::new();
        assert_eq!(bus.send(&mut log, "nobody", &[]).unwrap(), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn ignore_removes_one_subscription() {
        let mut bus = Messenger::new();
        let a = bus.accept("jump", record("a"), vec![], DEFAULT_PRIORITY);
        bus.accept("jump", record("b"), vec![], DEFAULT_PRIORITY);
        assert!(bus.ignore(a));
        assert!(!bus.ignore(a));
        assert_eq!(bus.listeners("jump"), 1);

        bus.ignore_all("jump");
        assert_eq!(bus.listeners("jump"), 0);
    }

    #[test]
    fn handler_error_stops_dispatch() {
        let mut bus = Messenger::new();
        bus.accept(
            "boom",
            |_: &mut Log, _: &[Value]| {
                Err(CoreError::InvalidValue {
                    input: "boom".into(),
                    reason: "always fails".into(),
                })
            },
            vec![],
            1,
        );
        bus.accept("boom", record("late"), vec![], 2);

        let mut log = Log::new();
        assert!(bus.send(&mut log, "boom", &[]).is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn entity_events_route_by_filter_and_priority() {
        let hero = Entity::new(&PHYSICS, "hero").with_tags("hero");
        let cell = Entity::new(&PHYSICS, "cell 1:1").with_tags("cell");
        let mut bus = Messenger::new();
        bus.accept_entity(
            EventFilter::new(EventKind::Collided).to(Match::tagged("cell")),
            |log: &mut Log, e: &EntityEvent, _: &[Value]| {
                log.push(format!("cell:{}", e.target_name.as_deref().unwrap_or("")));
                Ok(())
            },
            vec![],
            DEFAULT_PRIORITY,
        );
        bus.accept_entity(
            EventFilter::new(EventKind::Collided).from(Match::tagged("hero")),
            |log: &mut Log, e: &EntityEvent, _: &[Value]| {
                log.push(format!("hero:{}", e.source_name));
                Ok(())
            },
            vec![],
            0,
        );

        let mut log = Log::new();
        let event = EntityEvent::between(EventKind::Collided, &hero, &cell);
        assert_eq!(bus.dispatch(&mut log, &event).unwrap(), 2);
        assert_eq!(log, ["hero:hero", "cell:cell 1:1"]);

        log.clear();
        bus.dispatch(&mut log, &event.reversed().unwrap()).unwrap();
        assert!(log.is_empty());
    }
}
