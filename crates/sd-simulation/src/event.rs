use sd_core::EntityId;

/// What kind of simulation event occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEventKind {
    /// An entity was given a body and scene node.
    Spawned {
        /// The new entity.
        entity: EntityId,
    },
    /// A killed entity's body and scene node were removed.
    Removed {
        /// The removed entity.
        entity: EntityId,
    },
    /// Two bodies touched during a physics step.
    Collided {
        /// The first entity of the contact pair.
        a: EntityId,
        /// The second entity of the contact pair.
        b: EntityId,
    },
    /// An entity moved into another cell.
    ChangedCell {
        /// The entity that moved.
        entity: EntityId,
        /// The cell it left, if any.
        from: Option<EntityId>,
        /// The cell it entered.
        to: EntityId,
    },
    /// One entity used another.
    Used {
        /// The entity doing the using.
        user: EntityId,
        /// The entity being used.
        target: EntityId,
    },
    /// A user-defined event.
    Custom {
        /// A label identifying the custom event type.
        label: String,
        /// The entities involved in this custom event.
        entities: Vec<EntityId>,
    },
}

impl SimEventKind {
    /// Check whether a given entity is involved in this event.
    pub fn involves(&self, id: EntityId) -> bool {
        match self {
            Self::Spawned { entity } | Self::Removed { entity } => *entity == id,
            Self::Collided { a, b } => *a == id || *b == id,
            Self::ChangedCell { entity, from, to } => {
                *entity == id || *to == id || *from == Some(id)
            }
            Self::Used { user, target } => *user == id || *target == id,
            Self::Custom { entities, .. } => entities.contains(&id),
        }
    }
}

/// A record of something that happened during simulation.
#[derive(Debug, Clone)]
pub struct SimEvent {
    /// The simulation frame when this event occurred.
    pub tick: u64,
    /// The specific kind of event that occurred.
    pub kind: SimEventKind,
    /// A human-readable description of the event.
    pub description: String,
}

impl SimEvent {
    /// An event at frame `tick`.
    pub fn new(tick: u64, kind: SimEventKind, description: impl Into<String>) -> Self {
        Self {
            tick,
            kind,
            description: description.into(),
        }
    }
}

/// Accumulates events during a simulation run.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest events if the log exceeds its capacity.
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// All events, oldest first.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Events recorded at one frame.
    pub fn events_at_tick(&self, tick: u64) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    /// Events involving one entity.
    pub fn events_for_entity(&self, id: EntityId) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.kind.involves(id)).collect()
    }

    /// Number of events held.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawned(tick: u64, entity: EntityId) -> SimEvent {
        SimEvent::new(tick, SimEventKind::Spawned { entity }, "spawned")
    }

    #[test]
    fn event_log_push_and_query() {
        let mut log = EventLog::new(0);
        let id = EntityId::new();
        log.push(spawned(1, id));
        assert_eq!(log.len(), 1);
        assert_eq!(log.events_at_tick(1).len(), 1);
        assert_eq!(log.events_for_entity(id).len(), 1);
        assert!(log.events_for_entity(EntityId::new()).is_empty());
    }

    #[test]
    fn event_log_max_events_trims() {
        let mut log = EventLog::new(2);
        let id = EntityId::new();
        for i in 0..5 {
            log.push(spawned(i, id));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[0].tick, 3);
        assert_eq!(log.events()[1].tick, 4);
    }

    #[test]
    fn event_kind_involves_entity() {
        let (e1, e2, e3) = (EntityId::new(), EntityId::new(), EntityId::new());

        let kind = SimEventKind::Collided { a: e1, b: e2 };
        assert!(kind.involves(e1));
        assert!(kind.involves(e2));
        assert!(!kind.involves(e3));

        let kind = SimEventKind::ChangedCell {
            entity: e1,
            from: None,
            to: e2,
        };
        assert!(kind.involves(e2));
        assert!(!kind.involves(e3));

        let kind = SimEventKind::ChangedCell {
            entity: e1,
            from: Some(e3),
            to: e2,
        };
        assert!(kind.involves(e3));

        let kind = SimEventKind::Custom {
            label: "test".into(),
            entities: vec![e1, e2],
        };
        assert!(kind.involves(e1));
        assert!(!kind.involves(e3));
    }

    #[test]
    fn event_log_clear() {
        let mut log = EventLog::new(0);
        log.push(spawned(1, EntityId::new()));
        assert!(!log.is_empty());
        log.clear();
        assert!(log.is_empty());
    }
}
