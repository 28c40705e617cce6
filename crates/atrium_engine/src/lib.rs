//! # Atrium Engine
//!
//! Client-side core for a networked virtual world: a spatial entity
//! tree, layered zone resolution and entity lifecycle events.
//!
//! ## Features
//!
//! - **Spatial Entity Tree**: Octree-indexed entity storage with radius queries
//! - **Zone Layering**: Volume-ranked zone stacks with skybox tracking
//! - **Presence Tracking**: Enter/leave detection for the viewpoint
//! - **Pointer Interaction**: Hover and click event delivery
//! - **Script Lifecycle**: Preload/unload protocol over a pluggable host
//! - **Scene Transactions**: Ordered, wholesale scene and selection updates
//!
//! ## Quick Start
//!
//! ```rust
//! use atrium_engine::prelude::*;
//! use std::sync::Arc;
//!
//! let tree = Arc::new(EntityTree::default());
//! let scene = Arc::new(Scene::new());
//! let mut view = EntityTreeView::new(Arc::clone(&tree));
//! view.set_scene(Arc::clone(&scene));
//!
//! let zone = Entity::new(EntityId::random(), EntityKind::Zone)
//!     .with_dimensions(Vec3::new(10.0, 10.0, 10.0));
//! let zone_id = zone.id;
//! tree.add_entity(zone);
//! view.entity_added(zone_id);
//!
//! view.update(Vec3::zeros());
//! assert!(view.is_inside(zone_id));
//! scene.process_transactions();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Entity and spatial foundations
pub mod config;
pub mod entity;
pub mod foundation;
pub mod tree;

// Per-client derived state
pub mod events;
pub mod interaction;
pub mod presence;
pub mod scene;
pub mod script;
pub mod zones;

mod view;

pub use view::EntityTreeView;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, EngineConfig, PresenceConfig, TreeConfig},
        entity::{ContainmentVolume, Entity, EntityChanges, EntityId, EntityKind, ZoneInfo},
        events::{EntityEvent, EntityEventListener, EventDispatcher},
        foundation::math::{Aabb, Plane, Quat, Vec3},
        interaction::PointerTracker,
        presence::PresenceTracker,
        scene::{ItemId, Scene, Selection, Transaction, RANKED_ZONES_SELECTION},
        script::{EntityMethod, EntityScriptHost, NullScriptHost},
        tree::{EntityTree, Octree, OctreeConfig},
        zones::{SkyboxLayer, ZoneLayer, ZoneLayerSet},
        EntityTreeView,
    };
}
