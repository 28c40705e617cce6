//! Layered zone resolution
//!
//! When the viewpoint sits inside several nested zones at once, the
//! zones form an ordered stack: smallest volume first, so the most
//! specific zone wins for environmental effects. This module owns that
//! stack and its change detection.

pub mod layer_set;

pub use layer_set::{SkyboxLayer, ZoneLayer, ZoneLayerSet};
