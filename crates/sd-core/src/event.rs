use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId};
use crate::value::Value;

/// What happened between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Two bodies touched during a physics step.
    Collided,
    /// The source entered the target cell.
    ChangeCell,
    /// One entity started using another.
    StartUse,
    /// One entity stopped using another.
    EndUse,
    /// Game-specific event.
    Custom(String),
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collided => write!(f, "collided"),
            Self::ChangeCell => write!(f, "change-cell"),
            Self::StartUse => write!(f, "start-use"),
            Self::EndUse => write!(f, "end-use"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// A typed event about an entity and, optionally, the entity it involves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEvent {
    /// What happened.
    pub kind: EventKind,
    /// The entity the event is about.
    pub source: EntityId,
    /// Name of the source entity.
    pub source_name: String,
    /// Tags of the source entity.
    pub source_tags: Vec<String>,
    /// The other entity involved, if any.
    pub target: Option<EntityId>,
    /// Name of the target entity.
    pub target_name: Option<String>,
    /// Tags of the target entity.
    #[serde(default)]
    pub target_tags: Vec<String>,
    /// Extra values carried with the event.
    #[serde(default)]
    pub args: Vec<Value>,
}

impl EntityEvent {
    /// An event with no target.
    pub fn about(kind: EventKind, source: &Entity) -> Self {
        Self {
            kind,
            source: source.id,
            source_name: source.name.clone(),
            source_tags: source.tags.clone(),
            target: None,
            target_name: None,
            target_tags: Vec::new(),
            args: Vec::new(),
        }
    }

    /// An event from `source` involving `target`.
    pub fn between(kind: EventKind, source: &Entity, target: &Entity) -> Self {
        Self {
            target: Some(target.id),
            target_name: Some(target.name.clone()),
            target_tags: target.tags.clone(),
            ..Self::about(kind, source)
        }
    }

    /// Attach extra values.
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// The same event seen from the target's side.
    pub fn reversed(&self) -> Option<Self> {
        let target = self.target?;
        Some(Self {
            kind: self.kind.clone(),
            source: target,
            source_name: self.target_name.clone().unwrap_or_default(),
            source_tags: self.target_tags.clone(),
            target: Some(self.source),
            target_name: Some(self.source_name.clone()),
            target_tags: self.source_tags.clone(),
            args: self.args.clone(),
        })
    }
}

/// A predicate on one side of an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Match {
    /// Matches anything, including no entity.
    #[default]
    Any,
    /// Matches one entity.
    Entity(EntityId),
    /// Matches an entity by name.
    Named(String),
    /// Matches an entity carrying a tag (wildcards match any entity).
    Tagged(String),
}

impl Match {
    /// Match entities carrying `tag`.
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self::Tagged(tag.into())
    }

    /// Match the entity called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    fn matches(&self, id: Option<EntityId>, name: Option<&str>, tags: &[String]) -> bool {
        match self {
            Self::Any => true,
            Self::Entity(want) => id == Some(*want),
            Self::Named(want) => name == Some(want.as_str()),
            Self::Tagged(tag) => {
                id.is_some() && (crate::tags::is_wildcard(tag) || tags.iter().any(|t| t == tag))
            }
        }
    }
}

/// Which entity events a subscriber wants.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFilter {
    /// The event kind to accept.
    pub kind: EventKind,
    /// Which sources to accept.
    pub source: Match,
    /// Which targets to accept.
    pub target: Match,
}

impl EventFilter {
    /// Accept every event of `kind`.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            source: Match::Any,
            target: Match::Any,
        }
    }

    /// Only accept events from `source`.
    pub fn from(mut self, source: Match) -> Self {
        self.source = source;
        self
    }

    /// Only accept events involving `target`.
    pub fn to(mut self, target: Match) -> Self {
        self.target = target;
        self
    }

    /// Returns true if `event` passes the filter.
    pub fn matches(&self, event: &EntityEvent) -> bool {
        self.kind == event.kind
            && self.source.matches(
                Some(event.source),
                Some(&event.source_name),
                &event.source_tags,
            )
            && self.target.matches(
                event.target,
                event.target_name.as_deref(),
                &event.target_tags,
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{LOGIC, PHYSICS};

    fn pair() -> (Entity, Entity) {
        let hero = Entity::new(&PHYSICS, "hero").with_tags("hero");
        let cell = Entity::new(&PHYSICS, "cell 0:0").with_tags("cell");
        (hero, cell)
    }

    #[test]
    fn tag_filters_match_either_side() {
        let (hero, cell) = pair();
        let event = EntityEvent::between(EventKind::Collided, &hero, &cell);

        let filter = EventFilter::new(EventKind::Collided)
            .from(Match::tagged("hero"))
            .to(Match::tagged("cell"));
        assert!(filter.matches(&event));
        assert!(!filter.matches(&event.reversed().unwrap()));
    }

    #[test]
    fn wildcard_tag_needs_a_target() {
        let (hero, _) = pair();
        let lone = EntityEvent::about(EventKind::Collided, &hero);
        let filter = EventFilter::new(EventKind::Collided).to(Match::tagged("*"));
        assert!(!filter.matches(&lone));
        assert!(EventFilter::new(EventKind::Collided).matches(&lone));
    }

    #[test]
    fn kind_must_match() {
        let (hero, cell) = pair();
        let event = EntityEvent::between(EventKind::ChangeCell, &hero, &cell);
        assert!(!EventFilter::new(EventKind::Collided).matches(&event));
        assert!(
            EventFilter::new(EventKind::ChangeCell)
                .from(Match::Entity(hero.id))
                .to(Match::named("cell 0:0"))
                .matches(&event)
        );
    }

    #[test]
    fn custom_kinds_compare_by_name() {
        let relay = Entity::new(&LOGIC, "relay");
        let event = EntityEvent::about(EventKind::Custom("door-open".into()), &relay);
        assert!(EventFilter::new(EventKind::Custom("door-open".into())).matches(&event));
        assert!(!EventFilter::new(EventKind::Custom("door-shut".into())).matches(&event));
        assert_eq!(event.kind.to_string(), "door-open");
    }
}
