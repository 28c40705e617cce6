//! Octree spatial partitioning structure
//!
//! Divides world space into hierarchical regions for fast point-radius
//! queries. Each node subdivides into 8 octants when entity density
//! exceeds a threshold. Entries carry a bounding radius, and queries
//! match on the combined radius, so a small query sphere still finds
//! every large volume that reaches into it.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::foundation::math::{Aabb, Vec3};

/// Configuration for octree behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Maximum entities per node before subdivision
    pub max_entities_per_node: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Minimum node size (prevents excessive subdivision)
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_entities_per_node: 8,
            max_depth: 8,
            min_node_size: 1.0,
        }
    }
}

/// Entity reference stored in the octree
#[derive(Debug, Clone, Copy)]
pub struct OctreeEntry {
    /// Entity this entry indexes
    pub id: EntityId,
    /// World-space position of the entity's volume center
    pub position: Vec3,
    /// Bounding radius of the entity's volume
    pub radius: f32,
}

/// Octant index (0-7) for a position relative to a node center
fn octant_index(center: Vec3, position: Vec3) -> usize {
    let x_bit = usize::from(position.x >= center.x);
    let y_bit = usize::from(position.y >= center.y);
    let z_bit = usize::from(position.z >= center.z);
    (z_bit << 2) | (y_bit << 1) | x_bit
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
struct OctreeNode {
    /// World-space bounds of this node
    bounds: Aabb,

    /// Entries stored at this node
    entries: Vec<OctreeEntry>,

    /// Child nodes (8 octants), None if this is a leaf
    children: Option<Box<[OctreeNode; 8]>>,

    /// Depth in the tree (0 = root)
    depth: u32,
}

impl OctreeNode {
    fn new(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            entries: Vec::new(),
            children: None,
            depth,
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Split this node into 8 children and redistribute its entries
    fn subdivide(&mut self) {
        if self.children.is_some() {
            return;
        }

        let center = self.bounds.center();
        let quarter_extents = self.bounds.extents() * 0.5;

        let children = std::array::from_fn(|octant| {
            let x_sign = if octant & 1 != 0 { 1.0 } else { -1.0 };
            let y_sign = if octant & 2 != 0 { 1.0 } else { -1.0 };
            let z_sign = if octant & 4 != 0 { 1.0 } else { -1.0 };

            let child_center = Vec3::new(
                center.x + quarter_extents.x * x_sign,
                center.y + quarter_extents.y * y_sign,
                center.z + quarter_extents.z * z_sign,
            );
            OctreeNode::new(
                Aabb::from_center_extents(child_center, quarter_extents),
                self.depth + 1,
            )
        });
        self.children = Some(Box::new(children));

        let displaced = std::mem::take(&mut self.entries);
        if let Some(children) = &mut self.children {
            for entry in displaced {
                children[octant_index(center, entry.position)].entries.push(entry);
            }
        }
    }

    fn insert(&mut self, entry: OctreeEntry, config: &OctreeConfig) -> bool {
        if !self.bounds.contains_point(entry.position) {
            return false;
        }

        if self.is_leaf() {
            let should_subdivide = self.entries.len() >= config.max_entities_per_node
                && self.depth < config.max_depth
                && self.bounds.extents().x > config.min_node_size;

            if !should_subdivide {
                self.entries.push(entry);
                return true;
            }
            self.subdivide();
        }

        let octant = octant_index(self.bounds.center(), entry.position);
        match &mut self.children {
            Some(children) => children[octant].insert(entry, config),
            None => false,
        }
    }

    fn remove(&mut self, entity_id: EntityId) -> bool {
        if let Some(index) = self.entries.iter().position(|e| e.id == entity_id) {
            self.entries.swap_remove(index);
            return true;
        }

        if let Some(children) = &mut self.children {
            for child in children.iter_mut() {
                if child.remove(entity_id) {
                    return true;
                }
            }
        }

        false
    }

    fn query_radius(
        &self,
        center: Vec3,
        radius: f32,
        max_entry_radius: f32,
        results: &mut Vec<OctreeEntry>,
    ) {
        // Entries are stored by center and can reach past their node, so
        // the subtree reject test inflates the query by the largest
        // radius in the tree.
        let reach = radius + max_entry_radius;
        if self.bounds.distance_squared_to_point(center) > reach * reach {
            return;
        }

        for entry in &self.entries {
            let distance_sq = (entry.position - center).magnitude_squared();
            let combined_radius = radius + entry.radius;
            if distance_sq <= combined_radius * combined_radius {
                results.push(*entry);
            }
        }

        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query_radius(center, radius, max_entry_radius, results);
            }
        }
    }

    fn find_entity(&self, entity_id: EntityId) -> Option<OctreeEntry> {
        if let Some(entry) = self.entries.iter().find(|e| e.id == entity_id) {
            return Some(*entry);
        }

        if let Some(children) = &self.children {
            for child in children.iter() {
                if let Some(entry) = child.find_entity(entity_id) {
                    return Some(entry);
                }
            }
        }

        None
    }

    fn count_entities(&self) -> usize {
        let mut count = self.entries.len();
        if let Some(children) = &self.children {
            for child in children.iter() {
                count += child.count_entities();
            }
        }
        count
    }
}

/// Octree spatial partitioning structure
#[derive(Debug, Clone)]
pub struct Octree {
    root: OctreeNode,
    config: OctreeConfig,
    /// Largest entry radius ever inserted, used to expand node bounds
    /// during queries
    max_entry_radius: f32,
}

impl Octree {
    /// Create a new octree covering the given world bounds
    pub fn new(world_bounds: Aabb, config: OctreeConfig) -> Self {
        Self {
            root: OctreeNode::new(world_bounds, 0),
            config,
            max_entry_radius: 0.0,
        }
    }

    /// Insert an entity reference
    ///
    /// Returns false when the position lies outside the world bounds.
    pub fn insert(&mut self, entity_id: EntityId, position: Vec3, radius: f32) -> bool {
        let entry = OctreeEntry {
            id: entity_id,
            position,
            radius,
        };
        if radius > self.max_entry_radius {
            self.max_entry_radius = radius;
        }
        self.root.insert(entry, &self.config)
    }

    /// Remove an entity reference
    pub fn remove(&mut self, entity_id: EntityId) -> bool {
        self.root.remove(entity_id)
    }

    /// Collect all entries whose bounding sphere touches the query sphere
    pub fn query_radius(&self, center: Vec3, radius: f32) -> Vec<OctreeEntry> {
        let mut results = Vec::new();
        self.root
            .query_radius(center, radius, self.max_entry_radius, &mut results);
        results
    }

    /// Look up the stored entry for an entity
    pub fn find_entity(&self, entity_id: EntityId) -> Option<OctreeEntry> {
        self.root.find_entity(entity_id)
    }

    /// Total entry count
    pub fn entity_count(&self) -> usize {
        self.root.count_entities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_bounds() -> Aabb {
        Aabb::new(Vec3::new(-100.0, -100.0, -100.0), Vec3::new(100.0, 100.0, 100.0))
    }

    #[test]
    fn test_octree_basic_insertion() {
        let mut octree = Octree::new(world_bounds(), OctreeConfig::default());

        let id = EntityId::random();
        assert!(octree.insert(id, Vec3::new(0.0, 0.0, 0.0), 1.0));
        assert_eq!(octree.entity_count(), 1);
        assert!(octree.find_entity(id).is_some());
    }

    #[test]
    fn test_octree_rejects_out_of_bounds() {
        let mut octree = Octree::new(world_bounds(), OctreeConfig::default());
        assert!(!octree.insert(EntityId::random(), Vec3::new(500.0, 0.0, 0.0), 1.0));
        assert_eq!(octree.entity_count(), 0);
    }

    #[test]
    fn test_octree_subdivision() {
        let config = OctreeConfig {
            max_entities_per_node: 4,
            max_depth: 3,
            min_node_size: 1.0,
        };
        let mut octree = Octree::new(world_bounds(), config);

        // same position forces overflow in a single octant chain
        for _ in 0..10 {
            octree.insert(EntityId::random(), Vec3::new(10.0, 10.0, 10.0), 1.0);
        }

        assert_eq!(octree.entity_count(), 10);
        assert!(octree.root.children.is_some());
    }

    #[test]
    fn test_octree_radius_query() {
        let mut octree = Octree::new(world_bounds(), OctreeConfig::default());

        octree.insert(EntityId::random(), Vec3::new(0.0, 0.0, 0.0), 1.0);
        octree.insert(EntityId::random(), Vec3::new(5.0, 0.0, 0.0), 1.0);
        octree.insert(EntityId::random(), Vec3::new(50.0, 0.0, 0.0), 1.0);

        let results = octree.query_radius(Vec3::new(0.0, 0.0, 0.0), 10.0);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_octree_query_inflated_by_entry_radius() {
        let mut octree = Octree::new(world_bounds(), OctreeConfig::default());

        // a large volume whose center is far from the query point but
        // whose bounding sphere reaches it
        let big = EntityId::random();
        octree.insert(big, Vec3::new(20.0, 0.0, 0.0), 25.0);
        octree.insert(EntityId::random(), Vec3::new(20.0, 0.0, 0.0), 1.0);

        let results = octree.query_radius(Vec3::zeros(), 0.01);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, big);
    }

    #[test]
    fn test_octree_query_across_node_boundaries() {
        let config = OctreeConfig {
            max_entities_per_node: 2,
            max_depth: 4,
            min_node_size: 1.0,
        };
        let mut octree = Octree::new(world_bounds(), config);

        // crowd the +X octant until it subdivides
        for i in 0..5 {
            octree.insert(
                EntityId::random(),
                Vec3::new(30.0 + i as f32, 10.0, 10.0),
                1.0,
            );
        }
        // stored deep in the +X subtree, but reaching across x = 0
        let spanning = EntityId::random();
        octree.insert(spanning, Vec3::new(20.0, 10.0, 10.0), 25.0);

        let results = octree.query_radius(Vec3::new(-1.0, 10.0, 10.0), 0.01);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, spanning);
    }

    #[test]
    fn test_octree_remove() {
        let config = OctreeConfig {
            max_entities_per_node: 2,
            max_depth: 4,
            min_node_size: 1.0,
        };
        let mut octree = Octree::new(world_bounds(), config);

        let ids: Vec<_> = (0..6).map(|_| EntityId::random()).collect();
        for (i, id) in ids.iter().enumerate() {
            octree.insert(*id, Vec3::new(i as f32 * 10.0 - 25.0, 0.0, 0.0), 1.0);
        }

        assert!(octree.remove(ids[3]));
        assert!(!octree.remove(ids[3]));
        assert_eq!(octree.entity_count(), 5);
        assert!(octree.find_entity(ids[3]).is_none());
    }
}
