//! Typed entity storage.
//!
//! Every entity of a system lives in an [`Arena`] owned by the graph and is
//! addressed by a small copyable handle. Slots are never reused, so a handle
//! that outlives its entity can only miss, never alias another entity.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use crate::error::{Result, SimplexError};

/// A handle type that can address an [`Arena`] slot.
pub trait ArenaId: Copy + Eq + std::hash::Hash + Ord + fmt::Debug + fmt::Display {
    /// Human readable entity kind, used in error messages.
    const KIND: &'static str;

    fn from_index(index: usize) -> Self;

    fn index(self) -> usize;
}

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $crate::items::arena::ArenaId for $name {
            const KIND: &'static str = $kind;

            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", $kind, self.0)
            }
        }
    };
}

pub(crate) use arena_id;

/// Slot storage for one entity kind.
#[derive(Debug, Clone)]
pub struct Arena<I, T> {
    slots: Vec<Option<T>>,
    live: usize,
    marker: PhantomData<fn() -> I>,
}

impl<I, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
            marker: PhantomData,
        }
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value and return its new handle.
    pub fn insert(&mut self, value: T) -> I {
        let id = I::from_index(self.slots.len());
        self.slots.push(Some(value));
        self.live += 1;
        id
    }

    pub fn get(&self, id: I) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Like [`Arena::get`], but a missing entity is an error.
    pub fn require(&self, id: I) -> Result<&T> {
        self.get(id).ok_or_else(|| unknown(id))
    }

    pub fn require_mut(&mut self, id: I) -> Result<&mut T> {
        self.get_mut(id).ok_or_else(|| unknown(id))
    }

    pub fn remove(&mut self, id: I) -> Option<T> {
        let taken = self.slots.get_mut(id.index()).and_then(Option::take);
        if taken.is_some() {
            self.live -= 1;
        }
        taken
    }

    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live entities in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (I::from_index(i), v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (I, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|v| (I::from_index(i), v)))
    }
}

fn unknown<I: ArenaId>(id: I) -> SimplexError {
    SimplexError::UnknownItem {
        kind: I::KIND,
        name: id.to_string(),
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    /// Handles held inside the graph always resolve; a miss here is a bug.
    fn index(&self, id: I) -> &T {
        match self.get(id) {
            Some(value) => value,
            None => panic!("stale {} handle: {}", I::KIND, id),
        }
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        match self.get_mut(id) {
            Some(value) => value,
            None => panic!("stale {} handle: {}", I::KIND, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    arena_id!(TestId, "test");

    #[test]
    fn test_insert_and_get() {
        let mut arena: Arena<TestId, &str> = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");

        assert_eq!(arena.len(), 2);
        assert_eq!(arena[a], "a");
        assert_eq!(arena.get(b), Some(&"b"));
    }

    #[test]
    fn test_slots_are_not_reused() {
        let mut arena: Arena<TestId, u32> = Arena::new();
        let a = arena.insert(1);
        assert_eq!(arena.remove(a), Some(1));
        let b = arena.insert(2);

        assert_ne!(a, b);
        assert!(arena.get(a).is_none());
        assert!(arena.require(a).is_err());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_iter_skips_removed() {
        let mut arena: Arena<TestId, u32> = Arena::new();
        let ids: Vec<_> = (0..4).map(|v| arena.insert(v)).collect();
        arena.remove(ids[1]);

        let values: Vec<u32> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0, 2, 3]);
    }
}
