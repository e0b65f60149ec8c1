//! Host application seams
//!
//! - [`HostAdapter`]: the narrow interface into a 3D application's scene
//! - [`HostHandle`]: an opaque, persistable reference to a host object
//! - [`Progress`]: cooperative progress reporting and cancellation
//! - [`MemoryHost`]: an adapter that keeps everything in memory

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::items::{FalloffKind, Points};

pub use memory::MemoryHost;

/// Persisted reference to a host-side object.
///
/// The system never owns host objects. It keeps the handle's persistent
/// representation and asks the adapter to resolve it when needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostHandle(String);

impl HostHandle {
    pub fn new(repr: impl Into<String>) -> Self {
        Self(repr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HostHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interface into the host application.
///
/// Only revision bookkeeping and the object lookups are required. Every
/// other hook defaults to a silent no-op, which is how hosts opt out of
/// features they don't have.
pub trait HostAdapter {
    /// Current host undo revision.
    fn revision(&self) -> u64;

    /// Bump the host revision and return the new value.
    fn increment_revision(&mut self) -> u64;

    /// Force the host revision.
    fn set_revision(&mut self, revision: u64);

    /// Create a blendshape target.
    fn create_shape(&mut self, name: &str, is_rest: bool) -> Result<HostHandle>;

    /// Look up an existing target by name.
    fn find_shape(&self, name: &str) -> Option<HostHandle>;

    /// Pull a target's vertex buffer.
    fn shape_vertices(&mut self, shape: &HostHandle) -> Result<Option<Points>>;

    /// Create a slider control.
    fn create_slider(&mut self, name: &str) -> Result<HostHandle>;

    /// Look up an existing slider control by name.
    fn find_slider(&self, name: &str) -> Option<HostHandle>;

    /// Load (or create) the host nodes that carry a system.
    fn load_nodes(&mut self, system: &str, create: bool) -> Result<()> {
        let _ = (system, create);
        Ok(())
    }

    fn rename_system(&mut self, name: &str) -> Result<()> {
        let _ = name;
        Ok(())
    }

    fn delete_shape(&mut self, shape: &HostHandle) -> Result<()> {
        let _ = shape;
        Ok(())
    }

    fn rename_shape(&mut self, shape: &HostHandle, name: &str) -> Result<()> {
        let _ = (shape, name);
        Ok(())
    }

    fn push_shape_vertices(&mut self, shape: &HostHandle, verts: &Points) -> Result<()> {
        let _ = (shape, verts);
        Ok(())
    }

    /// Reset a target to the rest pose.
    fn zero_shape(&mut self, shape: &HostHandle) -> Result<()> {
        let _ = shape;
        Ok(())
    }

    /// Extract a target into a standalone mesh, optionally kept live.
    fn extract_shape(
        &mut self,
        shape: &HostHandle,
        live: bool,
        offset: f64,
    ) -> Result<Option<HostHandle>> {
        let _ = (shape, live, offset);
        Ok(None)
    }

    /// Connect a mesh back into a target. `None` means look it up by name.
    fn connect_shape(
        &mut self,
        shape: &HostHandle,
        mesh: Option<&HostHandle>,
        live: bool,
        delete: bool,
    ) -> Result<()> {
        let _ = (shape, mesh, live, delete);
        Ok(())
    }

    fn rename_slider(&mut self, slider: &HostHandle, name: &str) -> Result<()> {
        let _ = (slider, name);
        Ok(())
    }

    fn delete_slider(&mut self, slider: &HostHandle) -> Result<()> {
        let _ = slider;
        Ok(())
    }

    fn set_slider_range(&mut self, slider: &HostHandle, min: f64, max: f64) -> Result<()> {
        let _ = (slider, min, max);
        Ok(())
    }

    fn set_slider_weight(&mut self, slider: &HostHandle, weight: f64) -> Result<()> {
        let _ = (slider, weight);
        Ok(())
    }

    fn create_falloff(&mut self, name: &str, kind: &FalloffKind) -> Result<()> {
        let _ = (name, kind);
        Ok(())
    }

    /// Whether the host already carries a falloff with this name. Hosts
    /// without falloff nodes report every falloff as present.
    fn has_falloff(&self, name: &str) -> bool {
        let _ = name;
        true
    }

    fn rename_falloff(&mut self, old: &str, new: &str) -> Result<()> {
        let _ = (old, new);
        Ok(())
    }

    fn set_falloff_data(&mut self, name: &str, kind: &FalloffKind) -> Result<()> {
        let _ = (name, kind);
        Ok(())
    }

    fn delete_falloff(&mut self, name: &str) -> Result<()> {
        let _ = name;
        Ok(())
    }

    fn add_prog_falloff(&mut self, prog: &str, falloff: &str) -> Result<()> {
        let _ = (prog, falloff);
        Ok(())
    }

    fn remove_prog_falloff(&mut self, prog: &str, falloff: &str) -> Result<()> {
        let _ = (prog, falloff);
        Ok(())
    }

    /// Persisted name of a handle.
    fn persistent_name(&self, handle: &HostHandle) -> Option<String> {
        Some(handle.as_str().to_string())
    }

    /// Resolve a persisted name back into a handle.
    fn handle_for_name(&self, name: &str) -> Option<HostHandle> {
        Some(HostHandle::new(name))
    }

    /// Definition string stored on the host-side operator.
    fn definition_string(&self) -> Option<String> {
        None
    }

    fn set_definition_string(&mut self, definition: &str) -> Result<()> {
        let _ = definition;
        Ok(())
    }

    /// Open a host undo bracket.
    fn undo_open(&mut self) {}

    /// Close the innermost host undo bracket.
    fn undo_close(&mut self) {}
}

/// Cooperative progress sink for long operations.
pub trait Progress {
    /// Announce how many steps are coming.
    fn set_range(&mut self, steps: usize) {
        let _ = steps;
    }

    /// Report one finished step. Returning `false` cancels the operation.
    fn advance(&mut self, message: &str) -> bool;
}

/// Progress sink that never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&mut self, _message: &str) -> bool {
        true
    }
}

/// Whether a long operation ran to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Finished,
    /// The progress sink asked to stop. Work done so far is kept.
    Cancelled,
}

impl Completion {
    pub fn is_finished(self) -> bool {
        self == Completion::Finished
    }
}
