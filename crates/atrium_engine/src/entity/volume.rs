//! Containment volume shapes
//!
//! Volumes are stored in model space and tested against points already
//! transformed into the entity's local frame, so the shape data never
//! changes when the entity moves or rotates.

use crate::foundation::math::{Plane, Vec3};

/// Shape of the region an entity occupies for containment tests
///
/// `Box` and `Ellipsoid` derive their size from the entity's dimensions;
/// `Hull` carries an explicit convex plane set (the expensive precise
/// test, typically derived from a collision model).
#[derive(Debug, Clone)]
pub enum ContainmentVolume {
    /// Axis-aligned box in local space, sized by the entity dimensions
    Box,
    /// Ellipsoid with the entity dimensions as axis lengths
    Ellipsoid,
    /// Convex hull as a set of local-space planes with outward normals
    ///
    /// A point is inside when it is on the non-positive side of every
    /// plane. An empty plane set contains every point.
    Hull(Vec<Plane>),
}

impl ContainmentVolume {
    /// Test a local-space point against this volume
    ///
    /// `half_extents` is half the entity's dimensions on each axis.
    pub fn contains_local(&self, local: Vec3, half_extents: Vec3) -> bool {
        match self {
            Self::Box => {
                local.x.abs() <= half_extents.x
                    && local.y.abs() <= half_extents.y
                    && local.z.abs() <= half_extents.z
            }
            Self::Ellipsoid => {
                let scaled = Vec3::new(
                    local.x / half_extents.x,
                    local.y / half_extents.y,
                    local.z / half_extents.z,
                );
                scaled.magnitude_squared() <= 1.0
            }
            Self::Hull(planes) => planes.iter().all(|p| p.distance_to_point(local) <= 0.0),
        }
    }
}
