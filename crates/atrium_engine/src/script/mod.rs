//! Entity script host seam
//!
//! The script runtime itself lives outside this crate; the core only
//! needs a narrow capability surface to preload, unload, and invoke the
//! fixed set of entity lifecycle hooks. Everything here is
//! fire-and-forget: hosts resolve ids lazily and tolerate ids that no
//! longer exist, so callers never hold the entity tree lock across a
//! script call and never need to handle a script failure.

use crate::entity::EntityId;

/// Lifecycle hooks an entity script can implement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityMethod {
    /// Viewpoint entered the entity
    Enter,
    /// Viewpoint left the entity
    Leave,
    /// Pointer started hovering the entity
    HoverEnter,
    /// Pointer moved while over the entity
    HoverOver,
    /// Pointer stopped hovering the entity
    HoverLeave,
    /// Click started on the entity
    ClickDown,
    /// Started click is still held
    HoldingClick,
    /// Click on the entity released
    ClickRelease,
}

/// Capability surface of an entity script runtime
///
/// Implementations are shared behind `Arc` and called from the thread
/// that owns the trackers; hosts that marshal to a script thread do so
/// internally.
pub trait EntityScriptHost: Send + Sync {
    /// Fetch and run an entity's script
    ///
    /// `reload` forces a re-fetch even when the URL is unchanged.
    fn load_entity_script(&self, id: EntityId, script_url: &str, reload: bool);

    /// Stop and discard an entity's script, if one is loaded
    fn unload_entity_script(&self, id: EntityId);

    /// Stop and discard every loaded entity script
    fn unload_all_entity_scripts(&self);

    /// Invoke a lifecycle hook on an entity's script
    ///
    /// A no-op when the entity has no script or no longer exists.
    fn call_entity_method(&self, id: EntityId, method: EntityMethod);
}

/// Host that ignores every call
///
/// Stands in when scripting is disabled.
#[derive(Debug, Default)]
pub struct NullScriptHost;

impl EntityScriptHost for NullScriptHost {
    fn load_entity_script(&self, _id: EntityId, _script_url: &str, _reload: bool) {}
    fn unload_entity_script(&self, _id: EntityId) {}
    fn unload_all_entity_scripts(&self) {}
    fn call_entity_method(&self, _id: EntityId, _method: EntityMethod) {}
}
