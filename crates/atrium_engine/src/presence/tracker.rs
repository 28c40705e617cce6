//! Containment checks and enter/leave delivery
//!
//! The tracker owns two pieces of derived state: the set of entities the
//! viewpoint is currently inside, and the ranked stack of zones covering
//! it. Both are refreshed by [`PresenceTracker::check_enter_leave_entities`],
//! which the embedder calls once per frame with the viewpoint position.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::config::PresenceConfig;
use crate::entity::EntityId;
use crate::events::{EntityEvent, EventDispatcher};
use crate::foundation::math::Vec3;
use crate::scene::{Scene, Selection, Transaction, RANKED_ZONES_SELECTION};
use crate::script::{EntityMethod, EntityScriptHost};
use crate::tree::EntityTree;
use crate::zones::{ZoneLayer, ZoneLayerSet};

/// Where and when the last containment check ran.
#[derive(Debug, Clone, Copy)]
struct RecheckPoint {
    position: Vec3,
    time: Instant,
}

/// Tracks which entities contain the viewpoint.
///
/// Containment is re-evaluated when the viewpoint has moved far enough
/// or enough time has passed since the last check, whichever comes
/// first. The time trigger matters for a stationary viewpoint: zones
/// can be created or reshaped around it without it moving at all.
pub struct PresenceTracker {
    tree: Arc<EntityTree>,
    events: Arc<EventDispatcher>,
    scene: Option<Arc<Scene>>,
    script_host: Option<Arc<dyn EntityScriptHost>>,
    layered_zones: ZoneLayerSet,
    entities_inside: HashSet<EntityId>,
    last_check: Option<RecheckPoint>,
    config: PresenceConfig,
}

impl PresenceTracker {
    /// Creates a tracker over `tree` with default thresholds.
    pub fn new(tree: Arc<EntityTree>, events: Arc<EventDispatcher>) -> Self {
        Self::with_config(tree, events, PresenceConfig::default())
    }

    /// Creates a tracker with explicit thresholds.
    pub fn with_config(
        tree: Arc<EntityTree>,
        events: Arc<EventDispatcher>,
        config: PresenceConfig,
    ) -> Self {
        Self {
            tree,
            events,
            scene: None,
            script_host: None,
            layered_zones: ZoneLayerSet::new(),
            entities_inside: HashSet::new(),
            last_check: None,
            config,
        }
    }

    /// Attaches the scene the ranked zone selection is published to.
    pub fn set_scene(&mut self, scene: Arc<Scene>) {
        self.scene = Some(scene);
    }

    /// Attaches the host that entity lifecycle methods are forwarded to.
    pub fn set_script_host(&mut self, host: Arc<dyn EntityScriptHost>) {
        self.script_host = Some(host);
    }

    /// The current ranked zone stack, smallest volume first.
    pub fn layered_zones(&self) -> &ZoneLayerSet {
        &self.layered_zones
    }

    /// The entities the viewpoint was inside at the last check.
    pub fn entities_inside(&self) -> &HashSet<EntityId> {
        &self.entities_inside
    }

    /// Re-evaluates containment for `avatar_position` if a check is due.
    ///
    /// Delivers leave transitions before enter transitions, each as an
    /// [`EntityEvent`] plus the matching script method call. Returns
    /// whether the zone stack changed.
    pub fn check_enter_leave_entities(&mut self, avatar_position: Vec3) -> bool {
        let now = Instant::now();
        let due = match self.last_check {
            Some(last) => {
                (avatar_position - last.position).magnitude() > self.config.check_distance
                    || now.duration_since(last.time).as_secs_f32() > self.config.check_interval
            }
            None => true,
        };
        if !due {
            return false;
        }
        self.last_check = Some(RecheckPoint {
            position: avatar_position,
            time: now,
        });

        let (did_update, containing) = self.find_best_zone_and_containing_entities(avatar_position);

        let leaves: Vec<EntityId> = self
            .entities_inside
            .iter()
            .copied()
            .filter(|id| !containing.contains(id))
            .collect();
        let enters: Vec<EntityId> = containing
            .iter()
            .copied()
            .filter(|id| !self.entities_inside.contains(id))
            .collect();
        for id in leaves {
            self.notify(EntityEvent::Leave(id), EntityMethod::Leave);
        }
        for id in enters {
            self.notify(EntityEvent::Enter(id), EntityMethod::Enter);
        }
        self.entities_inside = containing.into_iter().collect();

        did_update
    }

    /// Delivers a leave for everything the viewpoint is inside, then
    /// forgets it and forces the next check.
    pub fn leave_all_entities(&mut self) {
        let inside: Vec<EntityId> = self.entities_inside.drain().collect();
        for id in inside {
            self.notify(EntityEvent::Leave(id), EntityMethod::Leave);
        }
        self.force_recheck_entities();
    }

    /// Drops all containment state without delivering any events.
    pub fn reset(&mut self) {
        self.entities_inside.clear();
        self.layered_zones.clear();
        self.last_check = None;
    }

    /// Makes the next [`check_enter_leave_entities`] unconditional.
    ///
    /// [`check_enter_leave_entities`]: Self::check_enter_leave_entities
    pub fn force_recheck_entities(&mut self) {
        self.last_check = None;
    }

    /// Re-evaluates a single zone in place after its properties changed.
    ///
    /// Uses the position of the last containment check. A zone that no
    /// longer contains that position is left in the stack untouched;
    /// the next full check removes it. With no check on record there is
    /// nothing to compare against and the change is picked up by the
    /// pending full check instead.
    pub fn update_zone(&mut self, id: EntityId) {
        let Some(last) = self.last_check else { return };
        let zones = &mut self.layered_zones;
        self.tree.with_read_lock(|store| {
            let Some(entity) = store.entity(id) else { return };
            if entity.is_zone() && entity.contains(last.position) {
                zones.update(entity);
            }
        });
    }

    /// Rebuilds the zone stack and the containing-entity list for one
    /// position. Returns whether the stack changed semantically.
    fn find_best_zone_and_containing_entities(
        &mut self,
        avatar_position: Vec3,
    ) -> (bool, Vec<EntityId>) {
        let mut containing = Vec::new();

        // Move the previous stack aside; its skybox marker travels with it.
        let old_layered_zones = std::mem::take(&mut self.layered_zones);
        let radius = self.config.query_radius;

        self.layered_zones = self.tree.with_read_lock(|store| {
            let mut zones = ZoneLayerSet::new();
            for id in store.find_entities_near(avatar_position, radius) {
                let Some(entity) = store.entity(id) else { continue };
                let is_zone = entity.is_zone();
                // Only zones and scripted entities matter here; nothing
                // else can have enter or leave fired on it.
                if !is_zone && !entity.has_script() {
                    continue;
                }
                // The precise test. Can be expensive for hull volumes,
                // hence the filters above.
                if !entity.contains(avatar_position) {
                    continue;
                }
                containing.push(id);
                if is_zone && entity.visible {
                    zones.insert(ZoneLayer::from_entity(entity));
                }
            }
            zones
        });

        // An equivalent stack is left alone. Equivalence is judged by
        // the prefix comparison, which also keeps the skybox marker of
        // the new stack in step with the old one.
        let changed = if self.layered_zones.is_empty() {
            !old_layered_zones.is_empty()
        } else if old_layered_zones.is_empty() {
            true
        } else {
            !self.layered_zones.contains(&old_layered_zones)
        };
        if changed {
            self.layered_zones.apply();
            self.apply_layered_zones();
        }
        (changed, containing)
    }

    /// Publishes the current stack as the ranked zone selection.
    fn apply_layered_zones(&self) {
        let Some(scene) = &self.scene else {
            log::warn!("unexpected null scene, possibly during application shutdown");
            return;
        };
        let mut items = Vec::with_capacity(self.layered_zones.len());
        for layer in self.layered_zones.iter() {
            match scene.item_for_entity(layer.id) {
                Some(item) => items.push(item),
                None => {
                    debug_assert!(false, "zone entity {} has no scene item", layer.id);
                    log::warn!("zone entity {} has no scene item, skipping", layer.id);
                }
            }
        }
        let mut transaction = Transaction::new();
        transaction.reset_selection(Selection::new(RANKED_ZONES_SELECTION, items));
        scene.enqueue_transaction(transaction);
    }

    fn notify(&self, event: EntityEvent, method: EntityMethod) {
        let id = event.entity_id();
        self.events.emit(&event);
        if let Some(host) = &self.script_host {
            host.call_entity_method(id, method);
        }
    }
}
