//! Render scene interface
//!
//! The render engine proper is out of scope; this is the narrow surface
//! the core talks to: a registry mapping entities to their render items,
//! named item selections, and a transaction queue. Edits are batched
//! into transactions and applied in enqueue order when the render side
//! calls [`Scene::process_transactions`], so a selection swap is always
//! observed wholesale and never half-applied.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use slotmap::SlotMap;

use crate::entity::EntityId;

slotmap::new_key_type! {
    /// Key of a render item in the scene
    pub struct ItemId;
}

/// Name of the selection carrying the ranked zone stack
pub const RANKED_ZONES_SELECTION: &str = "RankedZones";

/// Named, ordered set of render items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Selection name, the key dependent render jobs look up
    pub name: String,
    /// Items in selection order
    pub items: Vec<ItemId>,
}

impl Selection {
    /// Create a selection
    pub fn new(name: impl Into<String>, items: Vec<ItemId>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }
}

/// One edit inside a transaction
#[derive(Debug, Clone)]
pub enum TransactionOp {
    /// Replace a named selection wholesale
    ResetSelection(Selection),
    /// Remove an item and drop it from every selection
    RemoveItem(ItemId),
}

/// Batch of scene edits applied together, in order
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    ops: Vec<TransactionOp>,
}

impl Transaction {
    /// Create an empty transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a selection replacement
    pub fn reset_selection(&mut self, selection: Selection) {
        self.ops.push(TransactionOp::ResetSelection(selection));
    }

    /// Queue an item removal
    pub fn remove_item(&mut self, item: ItemId) {
        self.ops.push(TransactionOp::RemoveItem(item));
    }

    /// Whether the transaction carries no edits
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[derive(Default)]
struct SceneItems {
    items: SlotMap<ItemId, EntityId>,
    by_entity: HashMap<EntityId, ItemId>,
}

/// Scene-side state the core is allowed to touch
///
/// Item allocation is synchronous (ids must exist before they can be
/// referenced from a transaction); everything else goes through the
/// transaction queue.
#[derive(Default)]
pub struct Scene {
    items: Mutex<SceneItems>,
    selections: Mutex<HashMap<String, Vec<ItemId>>>,
    pending: Mutex<VecDeque<Transaction>>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a render item for an entity
    ///
    /// Returns the existing item when the entity already has one.
    pub fn allocate_item(&self, entity: EntityId) -> ItemId {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.by_entity.get(&entity) {
            log::debug!("entity {entity} already has a scene item");
            return *item;
        }
        let item = items.items.insert(entity);
        items.by_entity.insert(entity, item);
        item
    }

    /// Look up the render item allocated for an entity
    pub fn item_for_entity(&self, entity: EntityId) -> Option<ItemId> {
        self.items.lock().unwrap().by_entity.get(&entity).copied()
    }

    /// Look up the entity a render item was allocated for
    pub fn entity_for_item(&self, item: ItemId) -> Option<EntityId> {
        self.items.lock().unwrap().items.get(item).copied()
    }

    /// Forget the entity-to-item association for one entity
    ///
    /// The item itself stays allocated until a transaction removes it,
    /// so a pending removal can still reference it. Returns the item
    /// that was associated, if any.
    pub fn release_item(&self, entity: EntityId) -> Option<ItemId> {
        self.items.lock().unwrap().by_entity.remove(&entity)
    }

    /// Forget every entity-to-item association
    ///
    /// As with [`release_item`](Self::release_item), the items stay
    /// allocated until transactions remove them.
    pub fn release_all_items(&self) -> Vec<ItemId> {
        let mut items = self.items.lock().unwrap();
        items.by_entity.drain().map(|(_, item)| item).collect()
    }

    /// Snapshot of every allocated item id
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.lock().unwrap().items.keys().collect()
    }

    /// Number of allocated items
    pub fn item_count(&self) -> usize {
        self.items.lock().unwrap().items.len()
    }

    /// Queue a transaction for the next processing pass
    pub fn enqueue_transaction(&self, transaction: Transaction) {
        if transaction.is_empty() {
            return;
        }
        self.pending.lock().unwrap().push_back(transaction);
    }

    /// Apply every queued transaction, in enqueue order
    ///
    /// Called by the render side once per frame.
    pub fn process_transactions(&self) {
        let drained: Vec<Transaction> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain(..).collect()
        };

        for transaction in drained {
            for op in transaction.ops {
                self.apply(op);
            }
        }
    }

    /// Current content of a named selection
    pub fn selection(&self, name: &str) -> Option<Vec<ItemId>> {
        self.selections.lock().unwrap().get(name).cloned()
    }

    fn apply(&self, op: TransactionOp) {
        match op {
            TransactionOp::ResetSelection(selection) => {
                self.selections
                    .lock()
                    .unwrap()
                    .insert(selection.name, selection.items);
            }
            TransactionOp::RemoveItem(item) => {
                let mut items = self.items.lock().unwrap();
                match items.items.remove(item) {
                    Some(entity) => {
                        // The entity may have been re-allocated a fresh
                        // item since this removal was queued.
                        if items.by_entity.get(&entity) == Some(&item) {
                            items.by_entity.remove(&entity);
                        }
                    }
                    None => {
                        log::debug!("transaction removed unknown scene item");
                    }
                }
                drop(items);
                for selection in self.selections.lock().unwrap().values_mut() {
                    selection.retain(|i| *i != item);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_idempotent_per_entity() {
        let scene = Scene::new();
        let entity = EntityId::random();
        let item = scene.allocate_item(entity);
        assert_eq!(scene.allocate_item(entity), item);
        assert_eq!(scene.item_count(), 1);
        assert_eq!(scene.item_for_entity(entity), Some(item));
        assert_eq!(scene.entity_for_item(item), Some(entity));
    }

    #[test]
    fn test_selection_reset_is_wholesale_and_ordered() {
        let scene = Scene::new();
        let a = scene.allocate_item(EntityId::random());
        let b = scene.allocate_item(EntityId::random());

        let mut first = Transaction::new();
        first.reset_selection(Selection::new(RANKED_ZONES_SELECTION, vec![a, b]));
        let mut second = Transaction::new();
        second.reset_selection(Selection::new(RANKED_ZONES_SELECTION, vec![b]));

        scene.enqueue_transaction(first);
        scene.enqueue_transaction(second);
        assert_eq!(scene.selection(RANKED_ZONES_SELECTION), None); // nothing applied yet

        scene.process_transactions();
        assert_eq!(scene.selection(RANKED_ZONES_SELECTION), Some(vec![b]));
    }

    #[test]
    fn test_remove_item_scrubs_registry_and_selections() {
        let scene = Scene::new();
        let entity = EntityId::random();
        let doomed = scene.allocate_item(entity);
        let kept = scene.allocate_item(EntityId::random());

        let mut setup = Transaction::new();
        setup.reset_selection(Selection::new(RANKED_ZONES_SELECTION, vec![doomed, kept]));
        scene.enqueue_transaction(setup);

        let mut removal = Transaction::new();
        removal.remove_item(doomed);
        scene.enqueue_transaction(removal);

        scene.process_transactions();
        assert_eq!(scene.item_for_entity(entity), None);
        assert_eq!(scene.item_count(), 1);
        assert_eq!(scene.selection(RANKED_ZONES_SELECTION), Some(vec![kept]));
    }

    #[test]
    fn test_release_forgets_the_entity_while_the_removal_is_pending() {
        let scene = Scene::new();
        let entity = EntityId::random();
        let item = scene.allocate_item(entity);

        assert_eq!(scene.release_item(entity), Some(item));
        assert_eq!(scene.item_for_entity(entity), None);
        assert_eq!(scene.entity_for_item(item), Some(entity));

        // A re-added entity gets a fresh item while the released one
        // is still awaiting its removal transaction.
        let fresh = scene.allocate_item(entity);
        assert_ne!(fresh, item);

        let mut removal = Transaction::new();
        removal.remove_item(item);
        scene.enqueue_transaction(removal);
        scene.process_transactions();

        assert_eq!(scene.entity_for_item(item), None);
        assert_eq!(scene.item_for_entity(entity), Some(fresh));
        assert_eq!(scene.item_count(), 1);
    }

    #[test]
    fn test_release_all_returns_every_associated_item() {
        let scene = Scene::new();
        let a = scene.allocate_item(EntityId::random());
        let b = scene.allocate_item(EntityId::random());

        let mut released = scene.release_all_items();
        released.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(released, expected);

        // The items themselves stay allocated, awaiting transactions.
        let mut remaining = scene.item_ids();
        remaining.sort();
        assert_eq!(remaining, expected);
        assert_eq!(scene.item_count(), 2);
    }

    #[test]
    fn test_empty_transactions_are_dropped() {
        let scene = Scene::new();
        scene.enqueue_transaction(Transaction::new());
        scene.process_transactions();
        assert_eq!(scene.item_count(), 0);
    }
}
