//! View-model notifications.
//!
//! Front ends subscribe a [`ViewModel`] and receive item-changed pings,
//! scoped insert/remove/move brackets and full resets. The system only keeps
//! weak references, so a dropped view model silently unsubscribes.

use std::rc::{Rc, Weak};

use crate::items::{ComboId, GroupId, ItemId, ProgId, TravSide, TraversalId};

/// Something a view model can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRef {
    /// The system root.
    System,
    Item(ItemId),
    ComboPair { combo: ComboId, row: usize },
    TravPoint {
        traversal: TraversalId,
        point: TravSide,
    },
    TravPair {
        traversal: TraversalId,
        point: TravSide,
        row: usize,
    },
    ProgPair { prog: ProgId, row: usize },
}

impl From<ItemId> for ItemRef {
    fn from(item: ItemId) -> Self {
        ItemRef::Item(item)
    }
}

impl From<GroupId> for ItemRef {
    fn from(id: GroupId) -> Self {
        ItemRef::Item(ItemId::Group(id))
    }
}

/// Notification contract implemented by tree-view front ends.
///
/// Every method has an empty default, so a model only overrides what it
/// draws.
pub trait ViewModel {
    fn item_data_changed(&self, _item: ItemRef) {}

    fn begin_insert(&self, _parent: ItemRef, _row: usize) {}

    fn end_insert(&self) {}

    fn begin_remove(&self, _item: ItemRef) {}

    fn end_remove(&self) {}

    fn begin_move(&self, _item: ItemRef, _new_parent: ItemRef) {}

    fn end_move(&self) {}

    fn reset_model(&self) {}
}

/// Weak subscriber list.
#[derive(Default)]
pub struct Observers {
    models: Vec<Weak<dyn ViewModel>>,
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("live", &self.live().len())
            .finish()
    }
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, model: &Rc<dyn ViewModel>) {
        self.models.retain(|m| m.strong_count() > 0);
        self.models.push(Rc::downgrade(model));
    }

    pub fn unsubscribe(&mut self, model: &Rc<dyn ViewModel>) {
        let target = Rc::downgrade(model);
        self.models
            .retain(|m| m.strong_count() > 0 && !Weak::ptr_eq(m, &target));
    }

    fn live(&self) -> Vec<Rc<dyn ViewModel>> {
        self.models.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn data_changed(&self, item: ItemRef) {
        for model in self.live() {
            model.item_data_changed(item);
        }
    }

    /// Bracket an insertion under `parent` at `row`.
    pub fn inserting(&self, parent: ItemRef, row: usize) -> Bracket {
        let models = self.live();
        for model in &models {
            model.begin_insert(parent, row);
        }
        Bracket {
            models,
            kind: BracketKind::Insert,
        }
    }

    /// Bracket the removal of `item`.
    pub fn removing(&self, item: ItemRef) -> Bracket {
        let models = self.live();
        for model in &models {
            model.begin_remove(item);
        }
        Bracket {
            models,
            kind: BracketKind::Remove,
        }
    }

    /// Bracket moving `item` under `new_parent`.
    pub fn moving(&self, item: ItemRef, new_parent: ItemRef) -> Bracket {
        let models = self.live();
        for model in &models {
            model.begin_move(item, new_parent);
        }
        Bracket {
            models,
            kind: BracketKind::Move,
        }
    }

    pub fn reset(&self) {
        for model in self.live() {
            model.reset_model();
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum BracketKind {
    Insert,
    Remove,
    Move,
}

/// Closes a structural-change bracket when dropped.
#[must_use = "the bracket closes as soon as it is dropped"]
pub struct Bracket {
    models: Vec<Rc<dyn ViewModel>>,
    kind: BracketKind,
}

impl Drop for Bracket {
    fn drop(&mut self) {
        for model in &self.models {
            match self.kind {
                BracketKind::Insert => model.end_insert(),
                BracketKind::Remove => model.end_remove(),
                BracketKind::Move => model.end_move(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<String>>,
    }

    impl ViewModel for Recorder {
        fn item_data_changed(&self, item: ItemRef) {
            self.events.borrow_mut().push(format!("changed {:?}", item));
        }

        fn begin_insert(&self, _parent: ItemRef, row: usize) {
            self.events.borrow_mut().push(format!("begin insert {}", row));
        }

        fn end_insert(&self) {
            self.events.borrow_mut().push("end insert".to_string());
        }

        fn reset_model(&self) {
            self.events.borrow_mut().push("reset".to_string());
        }
    }

    #[test]
    fn test_bracket_closes_on_drop() {
        let recorder = Rc::new(Recorder::default());
        let model: Rc<dyn ViewModel> = recorder.clone();
        let mut observers = Observers::new();
        observers.subscribe(&model);

        {
            let _bracket = observers.inserting(ItemRef::System, 2);
            observers.data_changed(ItemRef::System);
        }
        observers.reset();

        assert_eq!(
            *recorder.events.borrow(),
            vec!["begin insert 2", "changed System", "end insert", "reset"]
        );
    }

    #[test]
    fn test_dropped_models_are_skipped() {
        let mut observers = Observers::new();
        {
            let model: Rc<dyn ViewModel> = Rc::new(Recorder::default());
            observers.subscribe(&model);
        }
        assert!(observers.live().is_empty());
        observers.reset();
    }
}
