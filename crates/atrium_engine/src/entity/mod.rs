//! Replicated entity records
//!
//! Entities are synchronized from the server into the local tree. This
//! module defines the record the rest of the crate consumes: identity,
//! transform, visibility, script binding, and the containment volume
//! used to answer "does this entity contain the viewpoint".

use bitflags::bitflags;
use uuid::Uuid;

use crate::foundation::math::{Quat, Vec3};

pub mod volume;

pub use volume::ContainmentVolume;

/// Server-assigned entity identifier
///
/// Stable for the lifetime of the entity across all clients. The null id
/// is reserved for "no entity".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generate a fresh random id
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The reserved null id
    pub const fn null() -> Self {
        Self(Uuid::nil())
    }

    /// Check whether this is the reserved null id
    pub fn is_null(self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of replicated entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Mesh-backed model
    Model,
    /// Primitive shape
    Shape,
    /// Light source
    Light,
    /// 3D text
    Text,
    /// Web surface
    Web,
    /// Volumetric zone defining an environmental region
    Zone,
}

/// Zone-specific properties
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneInfo {
    /// Whether this zone supplies a skybox
    pub skybox: bool,
}

bitflags! {
    /// Which entity properties a network edit touched
    ///
    /// Drives update routing: script changes trigger a script reload,
    /// and anything that can move the entity's volume relative to the
    /// viewpoint triggers a zone re-evaluation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntityChanges: u32 {
        /// Position or rotation changed
        const TRANSFORM = 1 << 0;
        /// Dimensions or containment volume changed
        const GEOMETRY = 1 << 1;
        /// Script URL changed
        const SCRIPT = 1 << 2;
        /// Visibility toggled
        const VISIBILITY = 1 << 3;
        /// Zone properties (skybox etc.) changed
        const ZONE_PROPERTIES = 1 << 4;
    }
}

impl EntityChanges {
    /// Whether this change can alter what contains the viewpoint
    pub fn affects_containment(self) -> bool {
        self.intersects(
            Self::TRANSFORM | Self::GEOMETRY | Self::VISIBILITY | Self::ZONE_PROPERTIES,
        )
    }
}

/// A replicated entity as stored in the local tree
#[derive(Debug, Clone)]
pub struct Entity {
    /// Server-assigned identity
    pub id: EntityId,
    /// Entity kind
    pub kind: EntityKind,
    /// World-space position of the volume center
    pub position: Vec3,
    /// World-space rotation
    pub rotation: Quat,
    /// Size along each local axis, in meters
    pub dimensions: Vec3,
    /// Whether the entity is currently visible
    pub visible: bool,
    /// Script URL bound to this entity, if any
    pub script: Option<String>,
    /// Shape of the containment region
    pub volume: ContainmentVolume,
    /// Zone properties, present for zone entities
    pub zone: Option<ZoneInfo>,
}

impl Entity {
    /// Create an entity with default transform and a small box volume
    pub fn new(id: EntityId, kind: EntityKind) -> Self {
        Self {
            id,
            kind,
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            // default entity size, matching freshly created server entities
            dimensions: Vec3::new(0.1, 0.1, 0.1),
            visible: true,
            script: None,
            volume: ContainmentVolume::Box,
            zone: if kind == EntityKind::Zone {
                Some(ZoneInfo::default())
            } else {
                None
            },
        }
    }

    /// Set the position (builder style)
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set the rotation (builder style)
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the dimensions (builder style)
    pub fn with_dimensions(mut self, dimensions: Vec3) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Set the visibility (builder style)
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set the script URL (builder style)
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Set the containment volume (builder style)
    pub fn with_volume(mut self, volume: ContainmentVolume) -> Self {
        self.volume = volume;
        self
    }

    /// Whether this entity is a zone
    pub fn is_zone(&self) -> bool {
        self.kind == EntityKind::Zone
    }

    /// Whether this entity has a non-empty script binding
    pub fn has_script(&self) -> bool {
        self.script.as_ref().map_or(false, |s| !s.is_empty())
    }

    /// Precise containment test against a world-space point
    ///
    /// Transforms the point into the entity's local frame and tests it
    /// against the containment volume. Can be expensive for hulls.
    pub fn contains(&self, point: Vec3) -> bool {
        let local = self.rotation.inverse_transform_vector(&(point - self.position));
        self.volume.contains_local(local, self.dimensions * 0.5)
    }

    /// Bounding measure used to rank zone layers (smaller wins)
    pub fn compute_volume(&self) -> f32 {
        self.dimensions.x * self.dimensions.y * self.dimensions.z
    }

    /// Radius of the sphere enclosing the entity's volume
    ///
    /// Half of the dimensions diagonal. Storing entities in the octree
    /// under this radius makes a point-radius query a correct broad
    /// phase: any entity whose volume could contain the point is found.
    pub fn bounding_radius(&self) -> f32 {
        self.dimensions.magnitude() * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_contains_respects_rotation() {
        let point = Vec3::new(0.0, 0.0, 1.5);
        let upright = Entity::new(EntityId::random(), EntityKind::Zone)
            .with_dimensions(Vec3::new(4.0, 1.0, 1.0));
        assert!(!upright.contains(point));

        // same box, long axis rotated onto world Z
        let rotated = upright
            .clone()
            .with_rotation(Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2));
        assert!(rotated.contains(point));
        assert!(!rotated.contains(Vec3::new(0.0, 0.0, 2.5)));
    }

    #[test]
    fn test_contains_respects_translation() {
        let entity = Entity::new(EntityId::random(), EntityKind::Zone)
            .with_position(Vec3::new(10.0, 0.0, 0.0))
            .with_dimensions(Vec3::new(2.0, 2.0, 2.0));
        assert!(entity.contains(Vec3::new(10.5, 0.5, 0.0)));
        assert!(!entity.contains(Vec3::zeros()));
    }

    #[test]
    fn test_volume_and_bounding_radius() {
        let entity = Entity::new(EntityId::random(), EntityKind::Zone)
            .with_dimensions(Vec3::new(2.0, 3.0, 4.0));
        assert_relative_eq!(entity.compute_volume(), 24.0);
        assert_relative_eq!(entity.bounding_radius(), 29.0_f32.sqrt() * 0.5);
    }

    #[test]
    fn test_has_script_ignores_empty_url() {
        let mut entity = Entity::new(EntityId::random(), EntityKind::Shape);
        assert!(!entity.has_script());
        entity.script = Some(String::new());
        assert!(!entity.has_script());
        entity.script = Some("https://example.com/ball.js".into());
        assert!(entity.has_script());
    }

    #[test]
    fn test_zone_info_only_for_zones() {
        assert!(Entity::new(EntityId::random(), EntityKind::Zone).zone.is_some());
        assert!(Entity::new(EntityId::random(), EntityKind::Model).zone.is_none());
    }

    #[test]
    fn test_null_id_is_recognized() {
        assert!(EntityId::null().is_null());
        assert!(!EntityId::random().is_null());
    }

    #[test]
    fn test_changes_affecting_containment() {
        assert!(EntityChanges::TRANSFORM.affects_containment());
        assert!(EntityChanges::VISIBILITY.affects_containment());
        assert!(!EntityChanges::SCRIPT.affects_containment());
        assert!((EntityChanges::SCRIPT | EntityChanges::GEOMETRY).affects_containment());
    }
}
