use std::collections::HashMap;

use nalgebra::Vector3;

use crate::component::{BodyComponent, BodyKind, BodyShape, CellComponent};
use crate::entity::{Entity, EntityId};
use crate::error::{CoreError, CoreResult};
use crate::grid::{Direction, GridLayout, neighbour_links};
use crate::logic::CELL;

/// An entity moved from one cell to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellChange {
    /// The entity that moved.
    pub entity: EntityId,
    /// The cell it left, if any.
    pub from: Option<EntityId>,
    /// The cell it joined.
    pub to: EntityId,
}

/// The world model. Owns every live entity, including cells.
///
/// Entities are kept in insertion order, which is also the order
/// [`World::simulate`] visits them. Killed entities move to a graveyard so
/// that bindings pointing at them quietly become no-ops.
#[derive(Debug, Default)]
pub struct World {
    entities: HashMap<EntityId, Entity>,
    order: Vec<EntityId>,
    by_name: HashMap<String, EntityId>,
    graveyard: HashMap<EntityId, Entity>,
    grid: Vec<Vec<EntityId>>,

    // Engine adapters drain these to create and destroy bodies.
    spawned: Vec<EntityId>,
    removed: Vec<EntityId>,
}

impl World {
    /// An empty world.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Entity registration
    // -----------------------------------------------------------------------

    /// Add an entity to the world and run its class setup hook.
    ///
    /// If the entity names a cell, it is also registered as a member of that
    /// cell. Returns the entity's ID.
    pub fn add_entity(&mut self, entity: Entity) -> CoreResult<EntityId> {
        if self.by_name.contains_key(&entity.name) {
            return Err(CoreError::DuplicateEntityName(entity.name.clone()));
        }
        if let Some(cell) = entity.cell {
            self.cell_mut(cell)?;
        }

        let id = entity.id;
        let setup = entity.class().setup_hook();
        log::debug!(
            "adding {} \"{}\" ({id})",
            entity.class().name(),
            entity.name
        );

        if let Some(cell) = entity.cell {
            self.cell_mut(cell)?.members.push(id);
        }
        self.by_name.insert(entity.name.clone(), id);
        self.order.push(id);
        self.spawned.push(id);
        self.entities.insert(id, entity);

        if let Some(setup) = setup {
            setup(self, id)?;
        }
        Ok(id)
    }

    /// Get a reference to a live entity by ID.
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to a live entity by ID.
    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Look up a live entity, failing with `EntityNotFound`.
    pub fn entity(&self, id: EntityId) -> CoreResult<&Entity> {
        self.entities.get(&id).ok_or(CoreError::EntityNotFound(id))
    }

    /// Mutable access to a live entity, or `EntityNotFound`.
    pub fn entity_mut(&mut self, id: EntityId) -> CoreResult<&mut Entity> {
        self.entities
            .get_mut(&id)
            .ok_or(CoreError::EntityNotFound(id))
    }

    /// Find a live entity by its exact name.
    pub fn find_by_name(&self, name: &str) -> Option<&Entity> {
        self.by_name.get(name).and_then(|id| self.entities.get(id))
    }

    /// ID of the live entity called `name`.
    pub fn find_id_by_name(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    /// Name of a live or killed entity, or `"?"`.
    pub fn entity_name(&self, id: EntityId) -> &str {
        self.entities
            .get(&id)
            .or_else(|| self.graveyard.get(&id))
            .map(|e| e.name.as_str())
            .unwrap_or("?")
    }

    /// Returns true if `id` is a live entity.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Returns true if the entity was killed and removed.
    pub fn is_killed(&self, id: EntityId) -> bool {
        self.graveyard.contains_key(&id)
    }

    /// A killed entity's final state.
    pub fn killed_entity(&self, id: EntityId) -> Option<&Entity> {
        self.graveyard.get(&id)
    }

    /// All live entities in insertion order.
    pub fn all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// All live cells in insertion order.
    pub fn cells(&self) -> impl Iterator<Item = &Entity> {
        self.all_entities().filter(|e| e.is_cell())
    }

    /// Live entities carrying `tag`.
    pub fn tagged(&self, tag: &str) -> Vec<&Entity> {
        self.all_entities().filter(|e| e.has_tag(tag)).collect()
    }

    /// Number of live entities, cells included.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Move a killed entity out of the live set.
    pub(crate) fn bury(&mut self, id: EntityId) {
        let Some(entity) = self.entities.remove(&id) else {
            return;
        };
        self.by_name.remove(&entity.name);
        self.order.retain(|eid| *eid != id);
        if let Some(cell) = entity.cell {
            if let Some(c) = self
                .entities
                .get_mut(&cell)
                .and_then(|e| e.components.cell.as_mut())
            {
                c.members.retain(|m| *m != id);
            }
        }
        if let Some(c) = &entity.components.cell {
            for member in &c.members {
                if let Some(e) = self.entities.get_mut(member) {
                    e.cell = None;
                }
            }
        }
        log::debug!("killed \"{}\" ({id})", entity.name);
        self.removed.push(id);
        self.graveyard.insert(id, entity);
    }

    /// Entities added since the last call, for engine adapters.
    pub fn take_spawned(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.spawned)
    }

    /// Put entities an adapter could not handle yet back at the front of
    /// the spawn queue, ahead of anything added since.
    pub fn requeue_spawned(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        let mut queue: Vec<EntityId> = ids.into_iter().collect();
        queue.append(&mut self.spawned);
        self.spawned = queue;
    }

    /// Entities killed since the last call, for engine adapters.
    pub fn take_removed(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.removed)
    }

    // -----------------------------------------------------------------------
    // Cells
    // -----------------------------------------------------------------------

    fn cell_mut(&mut self, id: EntityId) -> CoreResult<&mut CellComponent> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(CoreError::EntityNotFound(id))?;
        let name = entity.name.clone();
        entity
            .components
            .cell
            .as_mut()
            .ok_or(CoreError::NotACell(name))
    }

    /// The grid built by [`World::build_grid`], rows north to south.
    pub fn grid(&self) -> &[Vec<EntityId>] {
        &self.grid
    }

    /// The cell an entity currently lives in.
    pub fn cell_of(&self, id: EntityId) -> Option<EntityId> {
        self.entities.get(&id).and_then(|e| e.cell)
    }

    /// Neighbours of a cell with their direction.
    pub fn neighbours(&self, cell: EntityId) -> Vec<(Direction, EntityId)> {
        self.entities
            .get(&cell)
            .and_then(|e| e.components.cell.as_ref())
            .map(|c| c.neighbours.iter().map(|(d, id)| (*d, *id)).collect())
            .unwrap_or_default()
    }

    /// The neighbour of a cell in one direction.
    pub fn neighbour(&self, cell: EntityId, dir: Direction) -> Option<EntityId> {
        self.entities
            .get(&cell)
            .and_then(|e| e.components.cell.as_ref())
            .and_then(|c| c.neighbour(dir))
    }

    /// Move an entity into another cell.
    ///
    /// Returns `None` if it already lives there.
    pub fn move_to_cell(&mut self, id: EntityId, cell: EntityId) -> CoreResult<Option<CellChange>> {
        let from = self.entity(id)?.cell;
        if from == Some(cell) {
            return Ok(None);
        }
        self.cell_mut(cell)?.members.push(id);
        if let Some(old) = from {
            if let Ok(c) = self.cell_mut(old) {
                c.members.retain(|m| *m != id);
            }
        }
        self.entity_mut(id)?.cell = Some(cell);
        log::debug!(
            "\"{}\" moved to cell \"{}\"",
            self.entity_name(id),
            self.entity_name(cell)
        );
        Ok(Some(CellChange {
            entity: id,
            from,
            to: cell,
        }))
    }

    /// Link every cell of a rectangular grid to its eight-way neighbours.
    pub fn assign_neighbours(&mut self, grid: &[Vec<EntityId>]) -> CoreResult<()> {
        let links = neighbour_links(grid)?;
        for id in grid.iter().flatten() {
            self.cell_mut(*id)?;
        }
        for link in links {
            self.cell_mut(link.from)?.neighbours.insert(link.dir, link.to);
        }
        Ok(())
    }

    /// Spawn one cell per layout slot and link them.
    ///
    /// Cells are named `cell {x}:{y}` and placed at
    /// `(x * cell_size, y * cell_size, 0)`.
    pub fn build_grid(&mut self, layout: &GridLayout) -> CoreResult<Vec<Vec<EntityId>>> {
        let mut grid = Vec::with_capacity(layout.rows.len());
        for (y, row) in layout.rows.iter().enumerate() {
            let mut cell_row = Vec::with_capacity(row.len());
            for (x, spec) in row.iter().enumerate() {
                let mut body = BodyComponent::new(BodyKind::Static)
                    .with_shape(BodyShape::Ground)
                    .with_radius(layout.cell_size / 2.0)
                    .colliding_with("!static");
                if let Some(mesh) = &spec.mesh {
                    body = body.with_mesh(mesh.clone());
                }
                let cell = Entity::new(&CELL, format!("cell {x}:{y}"))
                    .with_tags(&spec.tags)
                    .at(Vector3::new(
                        x as f32 * layout.cell_size,
                        y as f32 * layout.cell_size,
                        0.0,
                    ))
                    .with_components(|c| c.body = Some(body));
                cell_row.push(self.add_entity(cell)?);
            }
            grid.push(cell_row);
        }
        self.assign_neighbours(&grid)?;
        log::info!(
            "built {}x{} cell grid",
            grid.len(),
            grid.first().map_or(0, Vec::len)
        );
        self.grid = grid.clone();
        Ok(grid)
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run every live entity's simulate hook, in insertion order.
    pub fn simulate(&mut self, dt: f64) -> CoreResult<()> {
        let order = self.order.clone();
        for id in order {
            let Some(hook) = self
                .entities
                .get(&id)
                .filter(|e| !e.killed)
                .and_then(|e| e.class().simulate_hook())
            else {
                continue;
            };
            hook(self, id, dt)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{LOGIC, PHYSICS};

    #[test]
    fn add_and_find_entity() {
        let mut world = World::new();
        let id = world.add_entity(Entity::new(&LOGIC, "relay")).unwrap();
        assert_eq!(world.find_id_by_name("relay"), Some(id));
        assert_eq!(world.get_entity(id).unwrap().name, "relay");
        assert!(world.find_by_name("Relay").is_none());
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut world = World::new();
        world.add_entity(Entity::new(&LOGIC, "relay")).unwrap();
        let err = world.add_entity(Entity::new(&PHYSICS, "relay")).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateEntityName(name) if name == "relay"));
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn entity_joins_its_cell() {
        let mut world = World::new();
        let grid = world.build_grid(&GridLayout::uniform(1, 1, 10.0)).unwrap();
        let cell = grid[0][0];
        let crate_id = world
            .add_entity(Entity::new(&PHYSICS, "crate").in_cell(cell))
            .unwrap();
        let members = &world.get_entity(cell).unwrap().components.cell.as_ref().unwrap().members;
        assert_eq!(members, &vec![crate_id]);
        assert_eq!(world.cell_of(crate_id), Some(cell));
    }

    #[test]
    fn non_cell_parent_rejected() {
        let mut world = World::new();
        let relay = world.add_entity(Entity::new(&LOGIC, "relay")).unwrap();
        let err = world
            .add_entity(Entity::new(&LOGIC, "child").in_cell(relay))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotACell(_)));
        assert!(world.find_by_name("child").is_none());
    }

    #[test]
    fn build_grid_places_and_links_cells() {
        let mut world = World::new();
        let grid = world.build_grid(&GridLayout::uniform(4, 4, 512.0)).unwrap();

        let origin = world.get_entity(grid[0][0]).unwrap();
        assert_eq!(origin.name, "cell 0:0");
        let mut keys: Vec<_> = world.neighbours(grid[0][0]).into_iter().map(|(d, _)| d).collect();
        keys.sort();
        assert_eq!(keys, [Direction::E, Direction::S, Direction::SE]);
        assert_eq!(world.neighbours(grid[1][1]).len(), 8);

        let far = world.get_entity(grid[2][3]).unwrap();
        assert_eq!(far.name, "cell 3:2");
        assert_eq!(far.position, Vector3::new(1536.0, 1024.0, 0.0));
        assert!(far.has_tag("cell"));
        assert_eq!(world.grid().len(), 4);
    }

    #[test]
    fn neighbour_links_are_symmetric() {
        let mut world = World::new();
        let grid = world.build_grid(&GridLayout::uniform(3, 5, 1.0)).unwrap();
        for id in grid.iter().flatten() {
            for (dir, other) in world.neighbours(*id) {
                assert_eq!(world.neighbour(other, dir.opposite()), Some(*id));
            }
        }
    }

    #[test]
    fn assign_neighbours_requires_cells() {
        let mut world = World::new();
        let a = world.add_entity(Entity::new(&LOGIC, "a")).unwrap();
        let b = world.add_entity(Entity::new(&LOGIC, "b")).unwrap();
        let err = world.assign_neighbours(&[vec![a, b]]).unwrap_err();
        assert!(matches!(err, CoreError::NotACell(_)));
    }

    #[test]
    fn move_to_cell_updates_membership() {
        let mut world = World::new();
        let grid = world.build_grid(&GridLayout::uniform(1, 2, 10.0)).unwrap();
        let (west, east) = (grid[0][0], grid[0][1]);
        let hero = world
            .add_entity(Entity::new(&PHYSICS, "hero").in_cell(west))
            .unwrap();

        let change = world.move_to_cell(hero, east).unwrap().unwrap();
        assert_eq!(change.from, Some(west));
        assert_eq!(change.to, east);
        assert!(world.move_to_cell(hero, east).unwrap().is_none());

        let west_cell = world.get_entity(west).unwrap().components.cell.clone().unwrap();
        let east_cell = world.get_entity(east).unwrap().components.cell.clone().unwrap();
        assert!(!west_cell.contains(hero));
        assert!(east_cell.contains(hero));
    }

    #[test]
    fn spawn_queue_drains_once() {
        let mut world = World::new();
        let id = world.add_entity(Entity::new(&LOGIC, "relay")).unwrap();
        assert_eq!(world.take_spawned(), vec![id]);
        assert!(world.take_spawned().is_empty());
    }

    #[test]
    fn requeued_spawns_go_first() {
        let mut world = World::new();
        let a = world.add_entity(Entity::new(&LOGIC, "a")).unwrap();
        let b = world.add_entity(Entity::new(&LOGIC, "b")).unwrap();
        let queued = world.take_spawned();
        let c = world.add_entity(Entity::new(&LOGIC, "c")).unwrap();

        world.requeue_spawned(queued.into_iter().skip(1));
        assert_eq!(world.take_spawned(), vec![b, c]);
        assert_ne!(a, b);
    }
}
