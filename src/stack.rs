//! Revision-keyed undo log
//!
//! The host application owns the real undo stack. Every outermost
//! transaction asks the host for a fresh revision number and files a full
//! snapshot of the graph under it; when the host later undoes or redoes,
//! the snapshot for the host's current revision is restored wholesale.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use log::debug;

/// A stored copy of the graph.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    /// Deep copy of the graph at commit time.
    pub graph: T,

    /// When the snapshot was taken.
    pub committed_at: DateTime<Utc>,
}

/// The undo log.
#[derive(Debug)]
pub struct Stack<T> {
    /// Snapshots keyed by host revision.
    snapshots: BTreeMap<u64, Snapshot<T>>,

    /// Revision the graph currently reflects.
    current_revision: u64,

    /// Open transaction depth. Shared with live sessions.
    depth: Rc<Cell<usize>>,

    /// A disabled stack never records anything.
    enabled: bool,
}

impl<T: Clone> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Stack<T> {
    /// Create an empty, enabled stack.
    pub fn new() -> Self {
        Self {
            snapshots: BTreeMap::new(),
            current_revision: 0,
            depth: Rc::new(Cell::new(0)),
            enabled: true,
        }
    }

    /// Create a stack that records nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn current_revision(&self) -> u64 {
        self.current_revision
    }

    /// Current transaction nesting depth.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Open a transaction. Nested sessions share one depth counter.
    pub fn begin(&self) -> Session {
        self.depth.set(self.depth.get() + 1);
        Session {
            depth: Rc::clone(&self.depth),
        }
    }

    /// File `graph` under `revision`, discarding every later revision.
    pub fn insert(&mut self, revision: u64, graph: T) {
        let pruned = self.snapshots.split_off(&revision);
        if pruned.keys().any(|&k| k > revision) {
            debug!(
                "Discarding {} redo snapshot(s) after revision {}",
                pruned.keys().filter(|&&k| k > revision).count(),
                revision
            );
        }
        self.snapshots.insert(
            revision,
            Snapshot {
                graph,
                committed_at: Utc::now(),
            },
        );
    }

    /// Store a copy of `graph` under `revision` and make it current.
    pub fn commit(&mut self, revision: u64, graph: &T) {
        debug!("Committing snapshot at revision {}", revision);
        self.insert(revision, graph.clone());
        self.current_revision = revision;
    }

    /// Snapshot stored for `revision`.
    ///
    /// Returns `None` when `revision` is already current or was never
    /// stored. Otherwise `revision` becomes current.
    pub fn get_revision(&mut self, revision: u64) -> Option<&Snapshot<T>> {
        if revision == self.current_revision {
            return None;
        }
        let snapshot = self.snapshots.get(&revision)?;
        self.current_revision = revision;
        Some(snapshot)
    }

    /// Forget every snapshot.
    pub fn purge(&mut self) {
        self.snapshots.clear();
        self.current_revision = 0;
        self.depth.set(0);
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Stored revisions in ascending order.
    pub fn revisions(&self) -> Vec<u64> {
        self.snapshots.keys().copied().collect()
    }
}

/// An open transaction.
///
/// Dropping a session without finishing it (an early `?` return) still
/// releases its depth.
#[derive(Debug)]
pub struct Session {
    depth: Rc<Cell<usize>>,
}

impl Session {
    /// Close the session. Returns `true` if it was the outermost one.
    pub fn finish(self) -> bool {
        self.depth.get() == 1
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed(revisions: std::ops::RangeInclusive<u64>) -> Stack<String> {
        let mut stack = Stack::new();
        for rev in revisions {
            stack.commit(rev, &format!("graph {}", rev));
        }
        stack
    }

    #[test]
    fn test_commit_and_restore() {
        let mut stack = committed(1..=3);
        assert_eq!(stack.current_revision(), 3);
        assert!(stack.get_revision(3).is_none());

        let snap = stack.get_revision(1).unwrap();
        assert_eq!(snap.graph, "graph 1");
        assert_eq!(stack.current_revision(), 1);
    }

    #[test]
    fn test_insert_prunes_redo_branch() {
        let mut stack = committed(1..=5);
        assert!(stack.get_revision(2).is_some());

        stack.commit(3, &"branch".to_string());
        assert_eq!(stack.revisions(), vec![1, 2, 3]);
        assert!(stack.get_revision(4).is_none());
        assert_eq!(stack.get_revision(1).unwrap().graph, "graph 1");
        assert_eq!(stack.get_revision(3).unwrap().graph, "branch");
    }

    #[test]
    fn test_unknown_revision_is_noop() {
        let mut stack = committed(1..=2);
        assert!(stack.get_revision(9).is_none());
        assert_eq!(stack.current_revision(), 2);
    }

    #[test]
    fn test_nested_sessions() {
        let stack: Stack<String> = Stack::new();
        let outer = stack.begin();
        {
            let inner = stack.begin();
            assert_eq!(stack.depth(), 2);
            assert!(!inner.finish());
        }
        assert_eq!(stack.depth(), 1);
        assert!(outer.finish());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_dropped_session_releases_depth() {
        let stack: Stack<String> = Stack::new();
        let attempt = || -> Result<(), ()> {
            let _session = stack.begin();
            Err(())
        };
        assert!(attempt().is_err());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_purge() {
        let mut stack = committed(1..=3);
        stack.purge();
        assert!(stack.is_empty());
        assert_eq!(stack.current_revision(), 0);
    }
}
