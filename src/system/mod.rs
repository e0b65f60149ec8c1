//! The aggregate root.
//!
//! [`Simplex`] owns the entity [`Graph`], the undo [`Stack`], the host
//! adapter and the observer list. Every public mutator goes through
//! [`Simplex::transact`], which brackets host undo and commits one snapshot
//! per outermost call.

pub mod clone;
pub mod graph;
pub mod query;
pub mod split;

use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::config::SimplexConfig;
use crate::error::Result;
use crate::interface::{HostAdapter, MemoryHost};
use crate::items::{
    Color, Combo, ComboId, Controller, Falloff, FalloffId, Group, GroupId, ItemId, ProgId,
    Progression, Shape, ShapeId, Slider, SliderId, Traversal, TraversalId,
};
use crate::observer::{ItemRef, Observers, ViewModel};
use crate::stack::Stack;

pub use clone::clone_subgraph;
pub use graph::{Graph, DEFAULT_CLUSTER_NAME};
pub use query::{InputVectors, VectorFilter};
pub use split::SplitOutcome;

/// Prefix of the generated rest shape name.
pub const REST_PREFIX: &str = "Rest_";

/// A blendshape rig system.
pub struct Simplex {
    pub(crate) graph: Graph,
    pub(crate) stack: Stack<Graph>,
    pub(crate) host: Box<dyn HostAdapter>,
    pub(crate) observers: Observers,
    pub(crate) config: SimplexConfig,
}

impl fmt::Debug for Simplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simplex")
            .field("name", &self.graph.name)
            .field("shapes", &self.graph.shape_list.len())
            .field("sliders", &self.graph.slider_list.len())
            .field("combos", &self.graph.combo_list.len())
            .field("traversals", &self.graph.traversal_list.len())
            .field("revision", &self.stack.current_revision())
            .finish()
    }
}

impl Simplex {
    /// Wrap a graph. Nothing is created on the host.
    pub(crate) fn with_graph(
        graph: Graph,
        host: Box<dyn HostAdapter>,
        config: SimplexConfig,
    ) -> Self {
        let stack = if config.undo_enabled {
            Stack::new()
        } else {
            Stack::disabled()
        };
        Self {
            graph,
            stack,
            host,
            observers: Observers::new(),
            config,
        }
    }

    /// A new system holding only its generated rest shape.
    pub fn build_empty(
        name: &str,
        host: Box<dyn HostAdapter>,
        config: SimplexConfig,
    ) -> Result<Self> {
        let mut sx = Self::with_graph(Graph::new(name), host, config);
        sx.transact(|sx| {
            sx.host.load_nodes(name, true)?;
            sx.create_rest_shape()
        })?;
        debug!("Built empty system '{}'", name);
        Ok(sx)
    }

    /// [`Simplex::build_empty`] on a fresh [`MemoryHost`] with default
    /// configuration.
    pub fn in_memory(name: &str) -> Result<Self> {
        Self::build_empty(name, Box::new(MemoryHost::new()), SimplexConfig::default())
    }

    fn create_rest_shape(&mut self) -> Result<ShapeId> {
        let name = format!("{}{}", REST_PREFIX, self.graph.name);
        let handle = match self.host.find_shape(&name) {
            Some(handle) => handle,
            None => self.host.create_shape(&name, true)?,
        };
        let mut shape = Shape::new(name, Color::GREY);
        shape.is_rest = true;
        shape.handle = Some(handle);
        let id = self.graph.shapes.insert(shape);
        self.graph.shape_list.insert(0, id);
        self.graph.rest_shape = Some(id);
        Ok(id)
    }

    /// Run `f` as one undoable step.
    ///
    /// Calls nest. Only the outermost one asks the host for a revision and
    /// stores a snapshot, and only when `f` succeeded. A failing `f` leaves
    /// the graph as far mutated as it got; the host undo bracket is closed
    /// either way.
    pub fn transact<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if !self.stack.is_enabled() {
            return f(self);
        }
        self.host.undo_open();
        let session = self.stack.begin();
        let result = f(self);
        let outermost = session.finish();
        if outermost && result.is_ok() {
            let revision = self.host.increment_revision();
            self.stack.commit(revision, &self.graph);
        }
        self.host.undo_close();
        result
    }

    /// Restore the snapshot matching the host's current revision.
    ///
    /// Call this from the host's undo and redo callbacks. Returns `false`
    /// when there was nothing to restore.
    pub fn handle_host_undo(&mut self) -> bool {
        let revision = self.host.revision();
        match self.stack.get_revision(revision) {
            Some(snapshot) => {
                debug!("Restoring snapshot for revision {}", revision);
                self.graph = snapshot.graph.clone();
                self.observers.reset();
                true
            }
            None => false,
        }
    }

    /// Drop all undo history.
    pub fn purge(&mut self) {
        self.stack.purge();
    }

    pub fn subscribe(&mut self, model: &Rc<dyn ViewModel>) {
        self.observers.subscribe(model);
    }

    pub fn unsubscribe(&mut self, model: &Rc<dyn ViewModel>) {
        self.observers.unsubscribe(model);
    }

    pub fn name(&self) -> &str {
        &self.graph.name
    }

    /// Rename the system. The rest shape follows the new name.
    pub fn set_name(&mut self, name: &str) -> Result<()> {
        self.transact(|sx| {
            sx.host.rename_system(name)?;
            sx.graph.name = name.to_string();
            if let Some(rest) = sx.graph.rest_shape {
                sx.rename_shape(rest, &format!("{}{}", REST_PREFIX, name))?;
            }
            sx.observers.data_changed(ItemRef::System);
            Ok(())
        })
    }

    pub fn cluster_name(&self) -> &str {
        &self.graph.cluster_name
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn config(&self) -> &SimplexConfig {
        &self.config
    }

    pub fn stack(&self) -> &Stack<Graph> {
        &self.stack
    }

    pub fn host(&self) -> &dyn HostAdapter {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn HostAdapter {
        self.host.as_mut()
    }

    pub fn rest_shape(&self) -> Result<ShapeId> {
        self.graph.rest_shape()
    }

    pub fn shapes(&self) -> &[ShapeId] {
        &self.graph.shape_list
    }

    pub fn sliders(&self) -> &[SliderId] {
        &self.graph.slider_list
    }

    pub fn combos(&self) -> &[ComboId] {
        &self.graph.combo_list
    }

    pub fn traversals(&self) -> &[TraversalId] {
        &self.graph.traversal_list
    }

    pub fn falloffs(&self) -> &[FalloffId] {
        &self.graph.falloff_list
    }

    pub fn slider_groups(&self) -> &[GroupId] {
        &self.graph.slider_groups
    }

    pub fn combo_groups(&self) -> &[GroupId] {
        &self.graph.combo_groups
    }

    pub fn traversal_groups(&self) -> &[GroupId] {
        &self.graph.traversal_groups
    }

    pub fn shape(&self, id: ShapeId) -> Result<&Shape> {
        self.graph.shapes.require(id)
    }

    pub fn progression(&self, id: ProgId) -> Result<&Progression> {
        self.graph.progressions.require(id)
    }

    pub fn slider(&self, id: SliderId) -> Result<&Slider> {
        self.graph.sliders.require(id)
    }

    pub fn combo(&self, id: ComboId) -> Result<&Combo> {
        self.graph.combos.require(id)
    }

    pub fn traversal(&self, id: TraversalId) -> Result<&Traversal> {
        self.graph.traversals.require(id)
    }

    pub fn group(&self, id: GroupId) -> Result<&Group> {
        self.graph.groups.require(id)
    }

    pub fn falloff(&self, id: FalloffId) -> Result<&Falloff> {
        self.graph.falloffs.require(id)
    }

    /// Name of a live controller.
    pub fn controller_name(&self, ctrl: Controller) -> Result<&str> {
        match ctrl {
            Controller::Slider(id) => Ok(&self.graph.sliders.require(id)?.name),
            Controller::Combo(id) => Ok(&self.graph.combos.require(id)?.name),
            Controller::Traversal(id) => Ok(&self.graph.traversals.require(id)?.name),
        }
    }

    /// Delete any controller.
    pub fn delete_controller(&mut self, ctrl: Controller) -> Result<()> {
        match ctrl {
            Controller::Slider(id) => self.delete_slider(id),
            Controller::Combo(id) => self.delete_combo(id),
            Controller::Traversal(id) => self.delete_traversal(id),
        }
    }

    /// Drop a controller, its progression and whatever shapes that leaves
    /// unused. Dependents are the caller's business.
    pub(crate) fn discard_controller(&mut self, ctrl: Controller) -> Result<()> {
        let prog = self.graph.controller_prog(ctrl);
        let shapes = self.graph.progressions[prog].shapes();
        {
            let _remove = self.observers.removing(ItemId::from(ctrl).into());
            self.graph.forget(ctrl.into());
            self.graph.forget(ItemId::Progression(prog));
        }
        for shape in shapes {
            self.release_shape(shape)?;
        }
        Ok(())
    }

    pub fn find_shape(&self, name: &str) -> Option<ShapeId> {
        self.graph.find_shape(name)
    }

    pub fn find_slider(&self, name: &str) -> Option<SliderId> {
        self.graph.find_slider(name)
    }

    pub fn find_combo(&self, name: &str) -> Option<ComboId> {
        self.graph.find_combo(name)
    }

    pub fn find_traversal(&self, name: &str) -> Option<TraversalId> {
        self.graph.find_traversal(name)
    }

    pub fn find_group(&self, name: &str) -> Option<GroupId> {
        self.graph.find_group(name)
    }

    pub fn find_falloff(&self, name: &str) -> Option<FalloffId> {
        self.graph.find_falloff(name)
    }
}
