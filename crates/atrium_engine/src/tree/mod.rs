//! Entity tree
//!
//! The shared, octree-indexed store of replicated entities. The
//! network-ingestion side mutates it through the write API; everything
//! else reads it inside `with_read_lock` closures, so a containment
//! pass can never observe a half-applied mutation.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::TreeConfig;
use crate::entity::{Entity, EntityId};
use crate::foundation::math::{Aabb, Vec3};

pub mod octree;

pub use octree::{Octree, OctreeConfig, OctreeEntry};

/// The entity records plus their spatial index
///
/// Only reachable through [`EntityTree`] lock scopes.
pub struct EntityStore {
    entities: HashMap<EntityId, Entity>,
    octree: Octree,
}

impl EntityStore {
    fn new(config: &TreeConfig) -> Self {
        let half_extent = config.world_extent * 0.5;
        let bounds = Aabb::from_center_extents(
            Vec3::zeros(),
            Vec3::new(half_extent, half_extent, half_extent),
        );
        Self {
            entities: HashMap::new(),
            octree: Octree::new(bounds, config.octree.clone()),
        }
    }

    /// Look up an entity record
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Coarse broad-phase: ids of entities whose bounding sphere touches
    /// the query sphere
    ///
    /// Callers still need the precise [`Entity::contains`] test; this
    /// only narrows the candidate set.
    pub fn find_entities_near(&self, point: Vec3, radius: f32) -> Vec<EntityId> {
        self.octree
            .query_radius(point, radius)
            .into_iter()
            .map(|entry| entry.id)
            .collect()
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the store holds no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn add(&mut self, entity: Entity) {
        let id = entity.id;
        if self.entities.contains_key(&id) {
            log::debug!("entity {id} re-added, replacing record");
            self.octree.remove(id);
        }
        if !self.octree.insert(id, entity.position, entity.bounding_radius()) {
            log::warn!("entity {id} is outside world bounds and will not be spatially indexed");
        }
        self.entities.insert(id, entity);
    }

    fn update(&mut self, id: EntityId, apply: impl FnOnce(&mut Entity)) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        apply(entity);
        let (position, radius) = (entity.position, entity.bounding_radius());

        // re-index under the new transform
        self.octree.remove(id);
        if !self.octree.insert(id, position, radius) {
            log::warn!("entity {id} moved outside world bounds and will not be spatially indexed");
        }
        true
    }

    fn remove(&mut self, id: EntityId) -> bool {
        self.octree.remove(id);
        self.entities.remove(&id).is_some()
    }
}

/// Thread-safe entity tree
///
/// Wraps the store in a read-write lock. Reads take the lock for the
/// whole closure, which is what keeps a containment pass consistent
/// while the network thread is streaming edits.
pub struct EntityTree {
    inner: RwLock<EntityStore>,
}

impl EntityTree {
    /// Create an empty tree covering the configured world extent
    pub fn new(config: &TreeConfig) -> Self {
        Self {
            inner: RwLock::new(EntityStore::new(config)),
        }
    }

    /// Run a closure with shared read access to the store
    pub fn with_read_lock<R>(&self, f: impl FnOnce(&EntityStore) -> R) -> R {
        let store = self.inner.read().unwrap();
        f(&store)
    }

    /// Insert or replace an entity record
    pub fn add_entity(&self, entity: Entity) {
        self.inner.write().unwrap().add(entity);
    }

    /// Apply an edit to an entity record and re-index it
    ///
    /// Returns false when the entity is unknown.
    pub fn update_entity(&self, id: EntityId, apply: impl FnOnce(&mut Entity)) -> bool {
        self.inner.write().unwrap().update(id, apply)
    }

    /// Remove an entity record
    pub fn remove_entity(&self, id: EntityId) -> bool {
        self.inner.write().unwrap().remove(id)
    }

    /// Number of stored entities
    pub fn entity_count(&self) -> usize {
        self.inner.read().unwrap().len()
    }
}

impl Default for EntityTree {
    fn default() -> Self {
        Self::new(&TreeConfig::default())
    }
}
