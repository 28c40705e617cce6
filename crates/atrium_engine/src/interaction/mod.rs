//! Pointer interaction with entities
//!
//! Turns per-frame pointer hit results into hover and click
//! transitions. Hit testing itself happens elsewhere; callers resolve
//! the pointer ray against the tree and feed the topmost hit, or
//! `None` for empty space, into the tracker.

use std::sync::Arc;

use crate::entity::EntityId;
use crate::events::{EntityEvent, EventDispatcher};
use crate::script::{EntityMethod, EntityScriptHost};

/// Tracks which entity the pointer is hovering and which one a press
/// started on.
///
/// The pressed entity keeps receiving holding-click reports until the
/// release, even when the pointer has long moved off it.
pub struct PointerTracker {
    events: Arc<EventDispatcher>,
    script_host: Option<Arc<dyn EntityScriptHost>>,
    hovered: Option<EntityId>,
    clicking: Option<EntityId>,
}

impl PointerTracker {
    /// Creates a tracker emitting into `events`.
    pub fn new(events: Arc<EventDispatcher>) -> Self {
        Self {
            events,
            script_host: None,
            hovered: None,
            clicking: None,
        }
    }

    /// Attaches the host that pointer methods are forwarded to.
    pub fn set_script_host(&mut self, host: Arc<dyn EntityScriptHost>) {
        self.script_host = Some(host);
    }

    /// The entity currently under the pointer, if any.
    pub fn hovered(&self) -> Option<EntityId> {
        self.hovered
    }

    /// The entity a press started on, until the matching release.
    pub fn clicking(&self) -> Option<EntityId> {
        self.clicking
    }

    /// Feeds a button press with the entity under the pointer.
    ///
    /// A press on empty space does nothing.
    pub fn pointer_press(&mut self, hit: Option<EntityId>) {
        if let Some(id) = hit {
            self.clicking = Some(id);
            self.notify(EntityEvent::ClickDown(id), EntityMethod::ClickDown);
        }
    }

    /// Feeds a pointer move with the entity now under the pointer.
    ///
    /// A hover target change delivers the leave for the old entity
    /// before the enter for the new one; hover-over repeats on every
    /// move that stays on the same entity.
    pub fn pointer_move(&mut self, hit: Option<EntityId>) {
        match hit {
            Some(id) => {
                if self.hovered != Some(id) {
                    if let Some(previous) = self.hovered {
                        self.notify(EntityEvent::HoverLeave(previous), EntityMethod::HoverLeave);
                    }
                    self.notify(EntityEvent::HoverEnter(id), EntityMethod::HoverEnter);
                }
                self.notify(EntityEvent::HoverOver(id), EntityMethod::HoverOver);
                self.hovered = Some(id);
            }
            None => {
                if let Some(previous) = self.hovered.take() {
                    self.notify(EntityEvent::HoverLeave(previous), EntityMethod::HoverLeave);
                }
            }
        }
        // A held button reports against the pressed entity no matter
        // what the pointer is over now.
        if let Some(id) = self.clicking {
            self.notify(EntityEvent::HoldingClick(id), EntityMethod::HoldingClick);
        }
    }

    /// Feeds a button release.
    ///
    /// The release is delivered to the entity the press started on,
    /// regardless of what is under the pointer now.
    pub fn pointer_release(&mut self) {
        if let Some(id) = self.clicking.take() {
            self.notify(EntityEvent::ClickRelease(id), EntityMethod::ClickRelease);
        }
    }

    /// Per-frame tick; keeps a held click reporting while the pointer
    /// is still.
    pub fn tick(&self) {
        if let Some(id) = self.clicking {
            self.notify(EntityEvent::HoldingClick(id), EntityMethod::HoldingClick);
        }
    }

    /// Drops hover and click state without delivering anything.
    pub fn reset(&mut self) {
        self.hovered = None;
        self.clicking = None;
    }

    fn notify(&self, event: EntityEvent, method: EntityMethod) {
        let id = event.entity_id();
        self.events.emit(&event);
        if let Some(host) = &self.script_host {
            host.call_entity_method(id, method);
        }
    }
}
