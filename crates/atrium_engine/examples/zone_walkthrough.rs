//! Walks a viewpoint through nested zones and prints the transitions.
//!
//! Run with `RUST_LOG=debug` to also see the zone stack commits as the
//! containment tracker makes them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use atrium_engine::prelude::*;

struct Recorder(Arc<Mutex<Vec<EntityEvent>>>);

impl EntityEventListener for Recorder {
    fn on_event(&mut self, event: &EntityEvent) {
        self.0.lock().unwrap().push(*event);
    }
}

fn main() {
    env_logger::init();

    let tree = Arc::new(EntityTree::default());
    let scene = Arc::new(Scene::new());
    let mut view = EntityTreeView::new(Arc::clone(&tree));
    view.set_scene(Arc::clone(&scene));
    view.set_script_host(Arc::new(NullScriptHost));

    let events = Arc::new(Mutex::new(Vec::new()));
    view.events()
        .add_listener(Box::new(Recorder(Arc::clone(&events))));

    let atrium = Entity::new(EntityId::random(), EntityKind::Zone)
        .with_dimensions(Vec3::new(40.0, 20.0, 40.0));
    let alcove = Entity::new(EntityId::random(), EntityKind::Zone)
        .with_position(Vec3::new(12.0, 0.0, 0.0))
        .with_dimensions(Vec3::new(8.0, 8.0, 8.0));
    let pedestal = Entity::new(EntityId::random(), EntityKind::Shape)
        .with_position(Vec3::new(12.0, 0.0, 0.0))
        .with_dimensions(Vec3::new(2.0, 2.0, 2.0))
        .with_script("https://worlds.example/pedestal.js");

    let mut names = HashMap::new();
    names.insert(atrium.id, "atrium");
    names.insert(alcove.id, "alcove");
    names.insert(pedestal.id, "pedestal");

    for entity in [atrium, alcove, pedestal] {
        let id = entity.id;
        tree.add_entity(entity);
        view.entity_added(id);
    }

    let path = [
        Vec3::new(-30.0, 0.0, 0.0), // outside everything
        Vec3::new(-10.0, 0.0, 0.0), // inside the atrium
        Vec3::new(12.0, 0.0, 0.0),  // into the alcove, onto the pedestal
        Vec3::new(-10.0, 0.0, 0.0), // back out of the alcove
        Vec3::new(-30.0, 0.0, 0.0), // outside again
    ];

    for position in path {
        view.update(position);
        scene.process_transactions();
        report(&names, &events, &scene, position);
    }

    view.shutdown();
    scene.process_transactions();
    println!("shut down with {} scene items left", scene.item_count());
}

fn report(
    names: &HashMap<EntityId, &str>,
    events: &Arc<Mutex<Vec<EntityEvent>>>,
    scene: &Scene,
    position: Vec3,
) {
    println!(
        "at ({:.0}, {:.0}, {:.0})",
        position.x, position.y, position.z
    );
    for event in events.lock().unwrap().drain(..) {
        let name = names.get(&event.entity_id()).copied().unwrap_or("?");
        println!("  {} {name}", event_label(event));
    }
    let stack: Vec<&str> = scene
        .selection(RANKED_ZONES_SELECTION)
        .unwrap_or_default()
        .iter()
        .filter_map(|item| scene.entity_for_item(*item))
        .filter_map(|id| names.get(&id).copied())
        .collect();
    println!("  ranked zones: {stack:?}");
}

fn event_label(event: EntityEvent) -> &'static str {
    match event {
        EntityEvent::Enter(_) => "enter",
        EntityEvent::Leave(_) => "leave",
        EntityEvent::HoverEnter(_) => "hover enter",
        EntityEvent::HoverOver(_) => "hover over",
        EntityEvent::HoverLeave(_) => "hover leave",
        EntityEvent::ClickDown(_) => "click down",
        EntityEvent::HoldingClick(_) => "holding click",
        EntityEvent::ClickRelease(_) => "click release",
    }
}
