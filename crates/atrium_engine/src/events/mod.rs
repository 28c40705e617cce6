//! Entity lifecycle events
//!
//! Replaces signal wiring with an explicit listener list: subsystems
//! that care about the viewpoint entering or leaving entities, or about
//! pointer interaction, register a listener and get every event
//! synchronously on the thread that raised it.
//!
//! Ordering contract: within one containment recheck, every `Leave` is
//! dispatched before any `Enter`.

use std::sync::Mutex;

use crate::entity::EntityId;

/// Something happened between the viewpoint (or pointer) and an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityEvent {
    /// The viewpoint is now inside the entity
    Enter(EntityId),
    /// The viewpoint is no longer inside the entity
    Leave(EntityId),
    /// The pointer started hovering the entity
    HoverEnter(EntityId),
    /// The pointer moved while over the entity
    HoverOver(EntityId),
    /// The pointer stopped hovering the entity
    HoverLeave(EntityId),
    /// A click started on the entity
    ClickDown(EntityId),
    /// A started click is still being held
    HoldingClick(EntityId),
    /// A click on the entity was released
    ClickRelease(EntityId),
}

impl EntityEvent {
    /// The entity this event concerns
    pub fn entity_id(self) -> EntityId {
        match self {
            Self::Enter(id)
            | Self::Leave(id)
            | Self::HoverEnter(id)
            | Self::HoverOver(id)
            | Self::HoverLeave(id)
            | Self::ClickDown(id)
            | Self::HoldingClick(id)
            | Self::ClickRelease(id) => id,
        }
    }
}

/// Receives entity events
///
/// Every registered listener observes every event; there is no
/// consumed-and-stop semantics, because enter/leave pairs must reach
/// all interested subsystems.
pub trait EntityEventListener: Send {
    /// Handle an event
    fn on_event(&mut self, event: &EntityEvent);
}

/// Synchronous fan-out to registered listeners
///
/// Shared as `Arc` between the trackers that raise events. Dispatch
/// holds the listener list lock, so listeners must not emit from inside
/// `on_event`.
pub struct EventDispatcher {
    listeners: Mutex<Vec<Box<dyn EntityEventListener>>>,
}

impl EventDispatcher {
    /// Create a dispatcher with no listeners
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Register a listener; delivery order follows registration order
    pub fn add_listener(&self, listener: Box<dyn EntityEventListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    /// Deliver an event to every listener, in registration order
    pub fn emit(&self, event: &EntityEvent) {
        for listener in self.listeners.lock().unwrap().iter_mut() {
            listener.on_event(event);
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
