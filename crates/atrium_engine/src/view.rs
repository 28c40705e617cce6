//! Client-side view over one entity tree
//!
//! [`EntityTreeView`] ties the containment tracker, the pointer
//! tracker, the scene and the script host together and exposes the
//! entity lifecycle the network layer drives: added, updated, removed,
//! plus wholesale clear and shutdown.

use std::sync::Arc;

use crate::config::PresenceConfig;
use crate::entity::{EntityChanges, EntityId};
use crate::events::EventDispatcher;
use crate::foundation::math::Vec3;
use crate::interaction::PointerTracker;
use crate::presence::PresenceTracker;
use crate::scene::{Scene, Transaction};
use crate::script::EntityScriptHost;
use crate::tree::EntityTree;
use crate::zones::ZoneLayerSet;

/// Coordinates presence and pointer tracking over one tree, scene and
/// script host.
///
/// The embedder owns the tree and feeds entity lifecycle notifications
/// in; the view keeps every derived piece of state consistent with
/// them. After [`shutdown`](Self::shutdown) the view goes quiet: no
/// further events, script calls or scene traffic.
pub struct EntityTreeView {
    tree: Arc<EntityTree>,
    scene: Option<Arc<Scene>>,
    script_host: Option<Arc<dyn EntityScriptHost>>,
    events: Arc<EventDispatcher>,
    presence: PresenceTracker,
    pointer: PointerTracker,
    shutting_down: bool,
}

impl EntityTreeView {
    /// Creates a view over `tree` with default presence thresholds.
    pub fn new(tree: Arc<EntityTree>) -> Self {
        Self::with_config(tree, PresenceConfig::default())
    }

    /// Creates a view with explicit presence thresholds.
    pub fn with_config(tree: Arc<EntityTree>, config: PresenceConfig) -> Self {
        let events = Arc::new(EventDispatcher::new());
        let presence = PresenceTracker::with_config(Arc::clone(&tree), Arc::clone(&events), config);
        let pointer = PointerTracker::new(Arc::clone(&events));
        Self {
            tree,
            scene: None,
            script_host: None,
            events,
            presence,
            pointer,
            shutting_down: false,
        }
    }

    /// Attaches the scene that items and selections are published to.
    pub fn set_scene(&mut self, scene: Arc<Scene>) {
        self.presence.set_scene(Arc::clone(&scene));
        self.scene = Some(scene);
    }

    /// Attaches the host entity scripts run on.
    pub fn set_script_host(&mut self, host: Arc<dyn EntityScriptHost>) {
        self.presence.set_script_host(Arc::clone(&host));
        self.pointer.set_script_host(Arc::clone(&host));
        self.script_host = Some(host);
    }

    /// The dispatcher this view emits entity events through.
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// The current ranked zone stack.
    pub fn layered_zones(&self) -> &ZoneLayerSet {
        self.presence.layered_zones()
    }

    /// Whether the viewpoint was inside `id` at the last check.
    pub fn is_inside(&self, id: EntityId) -> bool {
        self.presence.entities_inside().contains(&id)
    }

    /// The entity currently under the pointer, if any.
    pub fn hovered(&self) -> Option<EntityId> {
        self.pointer.hovered()
    }

    /// The entity a pointer press started on, until its release.
    pub fn clicking(&self) -> Option<EntityId> {
        self.pointer.clicking()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Per-frame drive: containment check plus held-click re-emit.
    pub fn update(&mut self, avatar_position: Vec3) {
        if self.shutting_down {
            return;
        }
        self.presence.check_enter_leave_entities(avatar_position);
        self.pointer.tick();
    }

    /// Notification that an entity was added to the tree.
    ///
    /// Forces the next containment check, preloads the entity script
    /// and allocates a scene item.
    pub fn entity_added(&mut self, id: EntityId) {
        self.presence.force_recheck_entities();
        self.check_and_call_preload(id, false, false);

        let in_tree = self.tree.with_read_lock(|store| store.entity(id).is_some());
        if !in_tree {
            return;
        }
        match &self.scene {
            Some(scene) => {
                scene.allocate_item(id);
            }
            None => log::warn!("unexpected null scene, possibly during application shutdown"),
        }
    }

    /// Notification that an entity's properties changed.
    ///
    /// Script changes reload the entity script from scratch; changes
    /// that can affect containment re-evaluate the zone in place.
    pub fn entity_updated(&mut self, id: EntityId, changes: EntityChanges) {
        if changes.contains(EntityChanges::SCRIPT) {
            self.check_and_call_preload(id, true, true);
        }
        if changes.affects_containment() {
            self.presence.update_zone(id);
        }
    }

    /// Notification that an entity is being removed from the tree.
    ///
    /// Unloads its script, releases its scene item and forces the next
    /// containment check. Unknown entities are ignored.
    pub fn entity_removed(&mut self, id: EntityId) {
        let Some(scene) = self.scene.clone() else {
            log::warn!("unexpected null scene, possibly during application shutdown");
            return;
        };
        let Some(item) = scene.release_item(id) else {
            return;
        };

        if !self.shutting_down {
            if let Some(host) = &self.script_host {
                host.unload_entity_script(id);
            }
        }

        self.presence.force_recheck_entities();
        let mut transaction = Transaction::new();
        transaction.remove_item(item);
        scene.enqueue_transaction(transaction);
    }

    /// Drops every entity this view knows about.
    ///
    /// On a live view this delivers leave transitions first; once the
    /// shutdown latch is set the state is dropped silently. Scripts
    /// are unloaded wholesale and every scene item is released through
    /// one transaction.
    pub fn clear(&mut self) {
        if !self.shutting_down {
            self.presence.leave_all_entities();
        }
        self.presence.reset();

        if let Some(host) = &self.script_host {
            host.unload_all_entity_scripts();
        }

        match &self.scene {
            Some(scene) => {
                let mut transaction = Transaction::new();
                for item in scene.release_all_items() {
                    transaction.remove_item(item);
                }
                scene.enqueue_transaction(transaction);
            }
            None => log::warn!("unexpected null scene, possibly during application shutdown"),
        }
    }

    /// Latches the view shut, then clears it.
    ///
    /// The latch makes the clear silent and turns every later update
    /// or pointer call into a no-op.
    pub fn shutdown(&mut self) {
        self.shutting_down = true;
        self.clear();
    }

    /// Feeds a pointer press with the entity under the pointer.
    pub fn pointer_press(&mut self, hit: Option<EntityId>) {
        if self.shutting_down {
            return;
        }
        self.pointer.pointer_press(hit);
    }

    /// Feeds a pointer move with the entity now under the pointer.
    pub fn pointer_move(&mut self, hit: Option<EntityId>) {
        if self.shutting_down {
            return;
        }
        self.pointer.pointer_move(hit);
    }

    /// Feeds a pointer release.
    pub fn pointer_release(&mut self) {
        if self.shutting_down {
            return;
        }
        self.pointer.pointer_release();
    }

    /// Runs the preload protocol for one entity's script.
    ///
    /// An empty or vanished script unloads whatever the host may hold
    /// for the entity; `unload_first` forces a clean slate before a
    /// reload.
    fn check_and_call_preload(&self, id: EntityId, reload: bool, unload_first: bool) {
        if self.shutting_down {
            return;
        }
        let Some(host) = &self.script_host else { return };
        let Some(script) = self
            .tree
            .with_read_lock(|store| store.entity(id).map(|e| e.script.clone()))
        else {
            return;
        };

        let url = script.filter(|s| !s.is_empty());
        let should_load = url.is_some();
        if (should_load && unload_first) || !should_load {
            host.unload_entity_script(id);
        }
        if let Some(url) = url {
            host.load_entity_script(id, &url, reload);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::entity::{Entity, EntityKind};
    use crate::events::test_support::RecordingListener;
    use crate::events::EntityEvent;
    use crate::scene::RANKED_ZONES_SELECTION;
    use crate::script::test_support::{HostCall, RecordingHost};
    use crate::script::EntityMethod;

    struct Fixture {
        tree: Arc<EntityTree>,
        scene: Arc<Scene>,
        host: Arc<RecordingHost>,
        log: Arc<Mutex<Vec<EntityEvent>>>,
        view: EntityTreeView,
    }

    impl Fixture {
        fn new() -> Self {
            let tree = Arc::new(EntityTree::default());
            let scene = Arc::new(Scene::new());
            let host = RecordingHost::new();
            // A long interval so only movement and forced rechecks
            // trigger containment passes.
            let mut view = EntityTreeView::with_config(
                Arc::clone(&tree),
                PresenceConfig {
                    check_interval: 3600.0,
                    ..PresenceConfig::default()
                },
            );
            view.set_scene(Arc::clone(&scene));
            view.set_script_host(host.clone());
            let log = Arc::new(Mutex::new(Vec::new()));
            view.events()
                .add_listener(Box::new(RecordingListener(Arc::clone(&log))));
            Self {
                tree,
                scene,
                host,
                log,
                view,
            }
        }

        fn events(&self) -> Vec<EntityEvent> {
            self.log.lock().unwrap().clone()
        }

        fn add(&mut self, entity: Entity) -> EntityId {
            let id = entity.id;
            self.tree.add_entity(entity);
            self.view.entity_added(id);
            id
        }
    }

    fn zone_at(position: Vec3, extent: f32) -> Entity {
        Entity::new(EntityId::random(), EntityKind::Zone)
            .with_position(position)
            .with_dimensions(Vec3::new(extent, extent, extent))
    }

    fn origin() -> Vec3 {
        Vec3::zeros()
    }

    #[test]
    fn test_added_entity_is_entered_without_waiting_for_thresholds() {
        let mut fx = Fixture::new();
        fx.view.update(origin());

        let zone_id = fx.add(zone_at(origin(), 10.0));

        // Same position, long interval: only the forced recheck makes
        // this pass run.
        fx.view.update(origin());
        assert_eq!(fx.events(), vec![EntityEvent::Enter(zone_id)]);
        assert!(fx.view.is_inside(zone_id));
        assert!(fx.scene.item_for_entity(zone_id).is_some());
    }

    #[test]
    fn test_added_scripted_entity_preloads() {
        let mut fx = Fixture::new();
        let ball = Entity::new(EntityId::random(), EntityKind::Shape)
            .with_script("https://example.com/ball.js");
        let ball_id = fx.add(ball);

        assert_eq!(
            fx.host.calls(),
            vec![HostCall::Load(
                ball_id,
                "https://example.com/ball.js".to_string(),
                false,
            )]
        );
    }

    #[test]
    fn test_added_scriptless_entity_unloads_any_stale_script() {
        let mut fx = Fixture::new();
        let prop = Entity::new(EntityId::random(), EntityKind::Model);
        let prop_id = fx.add(prop);

        assert_eq!(fx.host.calls(), vec![HostCall::Unload(prop_id)]);
    }

    #[test]
    fn test_entity_added_for_unknown_id_allocates_nothing() {
        let mut fx = Fixture::new();
        fx.view.entity_added(EntityId::random());
        assert_eq!(fx.scene.item_count(), 0);
        assert!(fx.host.calls().is_empty());
    }

    #[test]
    fn test_script_change_reloads_from_a_clean_slate() {
        let mut fx = Fixture::new();
        let ball = Entity::new(EntityId::random(), EntityKind::Shape)
            .with_script("https://example.com/ball.js");
        let ball_id = fx.add(ball);
        fx.host.clear();

        fx.tree.update_entity(ball_id, |entity| {
            entity.script = Some("https://example.com/v2.js".to_string());
        });
        fx.view.entity_updated(ball_id, EntityChanges::SCRIPT);

        assert_eq!(
            fx.host.calls(),
            vec![
                HostCall::Unload(ball_id),
                HostCall::Load(ball_id, "https://example.com/v2.js".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_zone_growth_reranks_through_entity_updated() {
        let mut fx = Fixture::new();
        let stable_id = fx.add(zone_at(origin(), 10.0));
        let growing_id = fx.add(zone_at(origin(), 4.0));
        fx.view.update(origin());
        let ids: Vec<EntityId> = fx.view.layered_zones().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![growing_id, stable_id]);

        fx.tree.update_entity(growing_id, |entity| {
            entity.dimensions = Vec3::new(30.0, 30.0, 30.0);
        });
        fx.view.entity_updated(growing_id, EntityChanges::GEOMETRY);

        let ids: Vec<EntityId> = fx.view.layered_zones().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![stable_id, growing_id]);
    }

    #[test]
    fn test_entity_removed_unloads_and_releases_the_item() {
        let mut fx = Fixture::new();
        let zone_id = fx.add(zone_at(origin(), 10.0));
        fx.view.update(origin());
        assert!(fx.view.is_inside(zone_id));
        fx.host.clear();

        fx.tree.remove_entity(zone_id);
        fx.view.entity_removed(zone_id);

        assert_eq!(fx.scene.item_for_entity(zone_id), None);
        assert!(fx.host.calls().contains(&HostCall::Unload(zone_id)));

        // The removal forced a recheck; the stationary viewpoint
        // leaves on the next update.
        fx.view.update(origin());
        assert_eq!(fx.events().last(), Some(&EntityEvent::Leave(zone_id)));
        assert!(!fx.view.is_inside(zone_id));

        fx.scene.process_transactions();
        assert_eq!(fx.scene.item_count(), 0);
    }

    #[test]
    fn test_entity_removed_for_unknown_id_is_silent() {
        let mut fx = Fixture::new();
        fx.view.entity_removed(EntityId::random());
        assert!(fx.host.calls().is_empty());
    }

    #[test]
    fn test_clear_delivers_leaves_and_empties_the_scene() {
        let mut fx = Fixture::new();
        let zone_id = fx.add(zone_at(origin(), 10.0));
        let ball_id = fx.add(
            Entity::new(EntityId::random(), EntityKind::Shape)
                .with_dimensions(Vec3::new(2.0, 2.0, 2.0))
                .with_script("https://example.com/ball.js"),
        );
        fx.view.update(origin());
        let entered = fx.events().len();
        assert_eq!(entered, 2);

        fx.view.clear();

        let tail: Vec<EntityEvent> = fx.events().split_off(entered);
        assert!(tail.contains(&EntityEvent::Leave(zone_id)));
        assert!(tail.contains(&EntityEvent::Leave(ball_id)));
        assert!(fx.host.calls().contains(&HostCall::UnloadAll));
        assert!(fx.view.layered_zones().is_empty());
        assert_eq!(fx.scene.item_for_entity(zone_id), None);

        fx.scene.process_transactions();
        assert_eq!(fx.scene.item_count(), 0);
    }

    #[test]
    fn test_shutdown_clears_silently_and_latches() {
        let mut fx = Fixture::new();
        let zone_id = fx.add(zone_at(origin(), 10.0));
        fx.view.update(origin());
        assert!(fx.view.is_inside(zone_id));
        let before = fx.events().len();

        fx.view.shutdown();

        // No leave events, but scripts and scene are still torn down.
        assert_eq!(fx.events().len(), before);
        assert!(fx.view.layered_zones().is_empty());
        assert!(fx.host.calls().contains(&HostCall::UnloadAll));
        assert!(fx.view.is_shutting_down());
        assert!(!fx
            .host
            .calls()
            .contains(&HostCall::Method(zone_id, EntityMethod::Leave)));

        // Latched views ignore updates and pointer input.
        fx.view.update(Vec3::new(50.0, 0.0, 0.0));
        fx.view.pointer_move(Some(zone_id));
        assert_eq!(fx.events().len(), before);
    }

    #[test]
    fn test_pointer_input_flows_through_the_view() {
        let mut fx = Fixture::new();
        let a = EntityId::random();

        fx.view.pointer_move(Some(a));
        fx.view.pointer_press(Some(a));
        fx.view.pointer_release();

        assert_eq!(
            fx.events(),
            vec![
                EntityEvent::HoverEnter(a),
                EntityEvent::HoverOver(a),
                EntityEvent::ClickDown(a),
                EntityEvent::ClickRelease(a),
            ]
        );
        assert_eq!(fx.view.hovered(), Some(a));
        assert_eq!(fx.view.clicking(), None);
    }

    #[test]
    fn test_ranked_zone_selection_reaches_the_scene() {
        let mut fx = Fixture::new();
        let big_id = fx.add(zone_at(origin(), 20.0));
        let small_id = fx.add(zone_at(origin(), 4.0));

        fx.view.update(origin());
        fx.scene.process_transactions();

        let expected = vec![
            fx.scene.item_for_entity(small_id).unwrap(),
            fx.scene.item_for_entity(big_id).unwrap(),
        ];
        assert_eq!(fx.scene.selection(RANKED_ZONES_SELECTION), Some(expected));
    }
}
