//! Ordered zone layer stack
//!
//! A sorted vector of zone layers plus an id-to-position index, kept in
//! lock-step by the mutation API. The skybox marker is a cross-cutting
//! reference into the stack; storing it as an entity id (rather than a
//! position) keeps it valid across reordering, and a marker whose zone
//! has left the stack simply resolves past the end.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::entity::{Entity, EntityId};

/// One zone's entry in the layer stack
///
/// Layers are ranked by volume, smallest first, with the id as a
/// deterministic tie-break. Layer equivalence compares the ranking key
/// only; the skybox flag never participates.
#[derive(Debug, Clone, Copy)]
pub struct ZoneLayer {
    /// Zone entity this layer represents
    pub id: EntityId,
    /// Bounding volume measure, the ranking key (smaller wins)
    pub volume: f32,
    /// Whether the zone supplies a skybox
    pub skybox: bool,
}

impl ZoneLayer {
    /// Create a layer from its parts
    pub fn new(id: EntityId, volume: f32, skybox: bool) -> Self {
        Self { id, volume, skybox }
    }

    /// Derive the layer for a zone entity
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            id: entity.id,
            volume: entity.compute_volume(),
            skybox: entity.zone.map_or(false, |z| z.skybox),
        }
    }
}

impl Ord for ZoneLayer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.volume
            .total_cmp(&other.volume)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for ZoneLayer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ZoneLayer {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ZoneLayer {}

/// Marker for the layer that owns the skybox
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SkyboxLayer {
    /// No skybox layer; resolves past the end of the stack
    #[default]
    None,
    /// Skybox owned by the layer of this zone
    At(EntityId),
}

/// The ordered set of zones currently containing the viewpoint
///
/// Rebuilt each containment pass by move-displacing the previous
/// instance (`std::mem::take`), which leaves the source empty and
/// carries the skybox marker with the moved stack.
#[derive(Debug, Default)]
pub struct ZoneLayerSet {
    /// Layers sorted by `ZoneLayer` ordering
    layers: Vec<ZoneLayer>,
    /// Zone id to position in `layers`
    index: HashMap<EntityId, usize>,
    skybox_layer: SkyboxLayer,
}

impl ZoneLayerSet {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the freshly constructed state
    pub fn clear(&mut self) {
        self.layers.clear();
        self.index.clear();
        self.skybox_layer = SkyboxLayer::None;
    }

    /// Number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the stack has no layers
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers in rank order, smallest volume first
    pub fn iter(&self) -> std::slice::Iter<'_, ZoneLayer> {
        self.layers.iter()
    }

    /// Whether a zone is currently in the stack
    pub fn contains_id(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// The highest-priority zone, if any
    pub fn best_zone(&self) -> Option<EntityId> {
        self.layers.first().map(|layer| layer.id)
    }

    /// Current skybox marker
    pub fn skybox_layer(&self) -> SkyboxLayer {
        self.skybox_layer
    }

    /// Position the marker resolves to; `len()` when none or stale
    fn skybox_offset(&self) -> usize {
        match self.skybox_layer {
            SkyboxLayer::None => self.layers.len(),
            SkyboxLayer::At(id) => self.index.get(&id).copied().unwrap_or(self.layers.len()),
        }
    }

    /// Insert a layer at its rank
    ///
    /// Returns the layer's position and whether it was inserted. A layer
    /// whose zone is already present is rejected (the index stays
    /// authoritative); use [`update`](Self::update) to re-rank it.
    pub fn insert(&mut self, layer: ZoneLayer) -> (usize, bool) {
        if let Some(&position) = self.index.get(&layer.id) {
            return (position, false);
        }
        let position = match self.layers.binary_search(&layer) {
            Ok(position) | Err(position) => position,
        };
        self.layers.insert(position, layer);
        self.reindex_from(position);
        (position, true)
    }

    /// Re-rank one zone after its properties changed
    ///
    /// A volume change re-sorts the layer, losing visibility removes it,
    /// and an unchanged visible layer is left alone.
    pub fn update(&mut self, entity: &Entity) {
        let layer = ZoneLayer::from_entity(entity);

        if self.is_empty() && entity.visible {
            // there are no zones: this one is the stack
            self.insert(layer);
            self.apply();
            return;
        }

        let mut present = false;
        if let Some(&position) = self.index.get(&layer.id) {
            present = true;
            if self.layers[position] != layer || !entity.visible {
                self.erase(layer.id);
                present = false;
            }
        }

        if !present && entity.visible {
            self.insert(layer);
        }
    }

    /// Layer-equivalence check against the previous stack
    ///
    /// Compares only the prefix up to `other`'s skybox offset; layers
    /// past that offset never participate in change detection. On
    /// success the marker is transplanted to the same offset here,
    /// which lands on a real layer whenever this stack is longer. A
    /// stack shorter than the compared prefix is never equivalent.
    pub fn contains(&mut self, other: &Self) -> bool {
        let offset = other.skybox_offset();
        if self.layers.len() < offset {
            return false;
        }
        if self.layers[..offset] != other.layers[..offset] {
            return false;
        }
        self.skybox_layer = match self.layers.get(offset) {
            Some(layer) => SkyboxLayer::At(layer.id),
            None => SkyboxLayer::None,
        };
        true
    }

    /// Commit this stack as the active one
    ///
    /// The trigger point dependent subsystems react to; callers only
    /// invoke it after detecting an actual change.
    pub fn apply(&self) {
        match self.layers.first() {
            Some(best) => {
                log::debug!("zone stack applied: {} layer(s), best zone {}", self.len(), best.id);
            }
            None => log::debug!("zone stack applied: empty"),
        }
    }

    fn erase(&mut self, id: EntityId) -> bool {
        let Some(position) = self.index.remove(&id) else {
            return false;
        };
        self.layers.remove(position);
        self.reindex_from(position);
        true
    }

    fn reindex_from(&mut self, from: usize) {
        for (position, layer) in self.layers.iter().enumerate().skip(from) {
            self.index.insert(layer.id, position);
        }
    }
}
