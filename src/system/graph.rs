//! The plain-data half of a simplex system.
//!
//! A [`Graph`] owns every entity arena plus the ordered top-level lists. It
//! carries no host or observer state, so cloning it is a complete snapshot.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{Result, SimplexError};
use crate::items::{
    Arena, Combo, ComboId, Controller, Falloff, FalloffId, Group, GroupId, GroupKind, ItemId,
    ProgId, Progression, Shape, ShapeId, Slider, SliderId, Traversal, TraversalId,
};

/// Default cluster name written to new definitions.
pub const DEFAULT_CLUSTER_NAME: &str = "Shape";

/// All entities of one system.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) name: String,
    pub(crate) cluster_name: String,
    pub(crate) rest_shape: Option<ShapeId>,
    /// Unknown top-level definition keys, written back verbatim.
    pub(crate) extras: Map<String, Value>,

    pub(crate) shapes: Arena<ShapeId, Shape>,
    pub(crate) progressions: Arena<ProgId, Progression>,
    pub(crate) sliders: Arena<SliderId, Slider>,
    pub(crate) combos: Arena<ComboId, Combo>,
    pub(crate) traversals: Arena<TraversalId, Traversal>,
    pub(crate) groups: Arena<GroupId, Group>,
    pub(crate) falloffs: Arena<FalloffId, Falloff>,

    pub(crate) shape_list: Vec<ShapeId>,
    pub(crate) slider_list: Vec<SliderId>,
    pub(crate) combo_list: Vec<ComboId>,
    pub(crate) traversal_list: Vec<TraversalId>,
    pub(crate) slider_groups: Vec<GroupId>,
    pub(crate) combo_groups: Vec<GroupId>,
    pub(crate) traversal_groups: Vec<GroupId>,
    pub(crate) falloff_list: Vec<FalloffId>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            rest_shape: None,
            extras: Map::new(),
            shapes: Arena::new(),
            progressions: Arena::new(),
            sliders: Arena::new(),
            combos: Arena::new(),
            traversals: Arena::new(),
            groups: Arena::new(),
            falloffs: Arena::new(),
            shape_list: Vec::new(),
            slider_list: Vec::new(),
            combo_list: Vec::new(),
            traversal_list: Vec::new(),
            slider_groups: Vec::new(),
            combo_groups: Vec::new(),
            traversal_groups: Vec::new(),
            falloff_list: Vec::new(),
        }
    }

    pub fn rest_shape(&self) -> Result<ShapeId> {
        self.rest_shape
            .ok_or_else(|| SimplexError::MissingRestShape {
                system: self.name.clone(),
            })
    }

    pub(crate) fn group_list(&self, kind: GroupKind) -> &Vec<GroupId> {
        match kind {
            GroupKind::Slider => &self.slider_groups,
            GroupKind::Combo => &self.combo_groups,
            GroupKind::Traversal => &self.traversal_groups,
        }
    }

    pub(crate) fn group_list_mut(&mut self, kind: GroupKind) -> &mut Vec<GroupId> {
        match kind {
            GroupKind::Slider => &mut self.slider_groups,
            GroupKind::Combo => &mut self.combo_groups,
            GroupKind::Traversal => &mut self.traversal_groups,
        }
    }

    /// Slider groups, then combo groups, then traversal groups.
    pub fn group_order(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.slider_groups
            .iter()
            .chain(&self.combo_groups)
            .chain(&self.traversal_groups)
            .copied()
    }

    /// Sliders, then combos, then traversals.
    pub fn controllers(&self) -> impl Iterator<Item = Controller> + '_ {
        self.slider_list
            .iter()
            .map(|&s| Controller::Slider(s))
            .chain(self.combo_list.iter().map(|&c| Controller::Combo(c)))
            .chain(self.traversal_list.iter().map(|&t| Controller::Traversal(t)))
    }

    /// Every controller's progression, in controller order.
    pub fn progression_order(&self) -> Vec<ProgId> {
        self.controllers().map(|c| self.controller_prog(c)).collect()
    }

    pub fn controller_exists(&self, ctrl: Controller) -> bool {
        match ctrl {
            Controller::Slider(id) => self.sliders.contains(id),
            Controller::Combo(id) => self.combos.contains(id),
            Controller::Traversal(id) => self.traversals.contains(id),
        }
    }

    pub fn controller_prog(&self, ctrl: Controller) -> ProgId {
        match ctrl {
            Controller::Slider(id) => self.sliders[id].prog,
            Controller::Combo(id) => self.combos[id].prog,
            Controller::Traversal(id) => self.traversals[id].prog,
        }
    }

    pub fn controller_name(&self, ctrl: Controller) -> &str {
        match ctrl {
            Controller::Slider(id) => &self.sliders[id].name,
            Controller::Combo(id) => &self.combos[id].name,
            Controller::Traversal(id) => &self.traversals[id].name,
        }
    }

    pub fn controller_group(&self, ctrl: Controller) -> GroupId {
        match ctrl {
            Controller::Slider(id) => self.sliders[id].group,
            Controller::Combo(id) => self.combos[id].group,
            Controller::Traversal(id) => self.traversals[id].group,
        }
    }

    pub(crate) fn set_controller_group(&mut self, ctrl: Controller, group: GroupId) {
        match ctrl {
            Controller::Slider(id) => self.sliders[id].group = group,
            Controller::Combo(id) => self.combos[id].group = group,
            Controller::Traversal(id) => self.traversals[id].group = group,
        }
    }

    /// Rename a controller and the progression it owns.
    pub(crate) fn set_controller_name(&mut self, ctrl: Controller, name: &str) {
        let prog = self.controller_prog(ctrl);
        match ctrl {
            Controller::Slider(id) => self.sliders[id].name = name.to_string(),
            Controller::Combo(id) => self.combos[id].name = name.to_string(),
            Controller::Traversal(id) => self.traversals[id].name = name.to_string(),
        }
        self.progressions[prog].name = name.to_string();
    }

    pub fn find_shape(&self, name: &str) -> Option<ShapeId> {
        self.shape_list
            .iter()
            .copied()
            .find(|&id| self.shapes[id].name == name)
    }

    pub fn find_slider(&self, name: &str) -> Option<SliderId> {
        self.slider_list
            .iter()
            .copied()
            .find(|&id| self.sliders[id].name == name)
    }

    pub fn find_combo(&self, name: &str) -> Option<ComboId> {
        self.combo_list
            .iter()
            .copied()
            .find(|&id| self.combos[id].name == name)
    }

    pub fn find_traversal(&self, name: &str) -> Option<TraversalId> {
        self.traversal_list
            .iter()
            .copied()
            .find(|&id| self.traversals[id].name == name)
    }

    pub fn find_group(&self, name: &str) -> Option<GroupId> {
        self.group_order().find(|&id| self.groups[id].name == name)
    }

    pub fn find_falloff(&self, name: &str) -> Option<FalloffId> {
        self.falloff_list
            .iter()
            .copied()
            .find(|&id| self.falloffs[id].name == name)
    }

    /// Number of progression pairs that point at `shape`.
    pub fn shape_use_count(&self, shape: ShapeId) -> usize {
        self.progressions
            .iter()
            .map(|(_, p)| p.pairs.iter().filter(|pp| pp.shape == shape).count())
            .sum()
    }

    /// Whether any live entity still refers to `item`.
    pub(crate) fn is_referenced(&self, item: ItemId) -> bool {
        match item {
            ItemId::Shape(id) => {
                self.rest_shape == Some(id)
                    || self.progressions.iter().any(|(_, p)| p.has_shape(id))
            }
            ItemId::Progression(id) => self
                .sliders
                .iter()
                .map(|(_, s)| s.prog)
                .chain(self.combos.iter().map(|(_, c)| c.prog))
                .chain(self.traversals.iter().map(|(_, t)| t.prog))
                .any(|p| p == id),
            ItemId::Slider(id) => {
                self.slider_list.contains(&id)
                    || self.combos.iter().any(|(_, c)| c.has_slider(id))
                    || self.traversals.iter().any(|(_, t)| t.has_slider(id))
                    || self
                        .groups
                        .iter()
                        .any(|(_, g)| g.items.contains(&Controller::Slider(id)))
            }
            ItemId::Combo(id) => {
                self.combo_list.contains(&id)
                    || self
                        .groups
                        .iter()
                        .any(|(_, g)| g.items.contains(&Controller::Combo(id)))
            }
            ItemId::Traversal(id) => {
                self.traversal_list.contains(&id)
                    || self
                        .groups
                        .iter()
                        .any(|(_, g)| g.items.contains(&Controller::Traversal(id)))
            }
            ItemId::Group(id) => self.group_order().any(|g| g == id),
            ItemId::Falloff(id) => self.falloff_list.contains(&id),
        }
    }

    /// Drop an entity from its arena and from every list or index that
    /// mentions it. Callers are responsible for the entity's own children.
    pub(crate) fn forget(&mut self, item: ItemId) {
        match item {
            ItemId::Shape(id) => {
                self.shape_list.retain(|&s| s != id);
                self.shapes.remove(id);
            }
            ItemId::Progression(id) => {
                for (_, falloff) in self.falloffs.iter_mut() {
                    falloff.children.retain(|&p| p != id);
                }
                self.progressions.remove(id);
            }
            ItemId::Slider(id) => {
                self.slider_list.retain(|&s| s != id);
                self.remove_from_groups(Controller::Slider(id));
                self.sliders.remove(id);
            }
            ItemId::Combo(id) => {
                self.combo_list.retain(|&c| c != id);
                self.remove_from_groups(Controller::Combo(id));
                self.combos.remove(id);
            }
            ItemId::Traversal(id) => {
                self.traversal_list.retain(|&t| t != id);
                self.remove_from_groups(Controller::Traversal(id));
                self.traversals.remove(id);
            }
            ItemId::Group(id) => {
                self.slider_groups.retain(|&g| g != id);
                self.combo_groups.retain(|&g| g != id);
                self.traversal_groups.retain(|&g| g != id);
                self.groups.remove(id);
            }
            ItemId::Falloff(id) => {
                self.falloff_list.retain(|&f| f != id);
                for (_, prog) in self.progressions.iter_mut() {
                    prog.falloffs.retain(|&f| f != id);
                }
                self.falloffs.remove(id);
            }
        }
    }

    fn remove_from_groups(&mut self, ctrl: Controller) {
        for (_, group) in self.groups.iter_mut() {
            group.items.retain(|&c| c != ctrl);
        }
    }

    /// Names already used by shapes.
    pub fn shape_names(&self) -> HashSet<&str> {
        self.shape_list
            .iter()
            .map(|&id| self.shapes[id].name.as_str())
            .collect()
    }

    pub fn slider_names(&self) -> HashSet<&str> {
        self.slider_list
            .iter()
            .map(|&id| self.sliders[id].name.as_str())
            .collect()
    }
}
