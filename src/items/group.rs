//! Groups: single-typed organisational buckets.
//!
//! Groups carry no meaning for the solver. They only order controllers
//! for display and for the definition file.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimplexError};
use crate::items::{Color, Controller, GroupId, ItemId};
use crate::observer::ItemRef;
use crate::system::Simplex;

/// The controller type a group may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKind {
    Slider,
    Combo,
    Traversal,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKind::Slider => write!(f, "Slider"),
            GroupKind::Combo => write!(f, "Combo"),
            GroupKind::Traversal => write!(f, "Traversal"),
        }
    }
}

/// Named, ordered list of same-typed controllers.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub(crate) name: String,
    pub(crate) kind: GroupKind,
    pub(crate) items: Vec<Controller>,
    pub(crate) color: Color,
}

impl Group {
    pub fn new(name: impl Into<String>, kind: GroupKind) -> Self {
        Self {
            name: name.into(),
            kind,
            items: Vec::new(),
            color: Color::GREY,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn items(&self) -> &[Controller] {
        &self.items
    }

    pub fn color(&self) -> Color {
        self.color
    }
}

impl Simplex {
    /// Create an empty group at the end of its kind's list.
    pub fn create_group(&mut self, name: &str, kind: GroupKind) -> Result<GroupId> {
        self.create_group_with_color(name, kind, Color::GREY)
    }

    pub(crate) fn create_group_with_color(
        &mut self,
        name: &str,
        kind: GroupKind,
        color: Color,
    ) -> Result<GroupId> {
        self.transact(|sx| {
            let row = sx.group_insertion_row(kind);
            let _insert = sx.observers.inserting(ItemRef::System, row);
            let mut group = Group::new(name, kind);
            group.color = color;
            let id = sx.graph.groups.insert(group);
            sx.graph.group_list_mut(kind).push(id);
            Ok(id)
        })
    }

    /// Display row of the next group of `kind`: slider groups come first,
    /// then combo groups, then traversal groups.
    fn group_insertion_row(&self, kind: GroupKind) -> usize {
        let sliders = self.graph.slider_groups.len();
        let combos = sliders + self.graph.combo_groups.len();
        match kind {
            GroupKind::Slider => sliders,
            GroupKind::Combo => combos,
            GroupKind::Traversal => combos + self.graph.traversal_groups.len(),
        }
    }

    /// The group of `kind` named `name`, created if needed.
    pub(crate) fn group_named(&mut self, name: &str, kind: GroupKind) -> Result<GroupId> {
        let existing = self
            .graph
            .group_list(kind)
            .iter()
            .copied()
            .find(|&g| self.graph.groups[g].name == name);
        match existing {
            Some(id) => Ok(id),
            None => self.create_group(name, kind),
        }
    }

    /// Fail unless `group` holds controllers of `kind`.
    pub(crate) fn check_group_kind(&self, group: GroupId, kind: GroupKind, item: &str) -> Result<()> {
        let g = self.graph.groups.require(group)?;
        if g.kind != kind {
            return Err(SimplexError::WrongGroupType {
                group: g.name.clone(),
                expected: g.kind.to_string(),
                item: format!("{} '{}'", kind, item),
            });
        }
        Ok(())
    }

    pub fn rename_group(&mut self, id: GroupId, name: &str) -> Result<()> {
        self.transact(|sx| {
            sx.graph.groups.require_mut(id)?.name = name.to_string();
            sx.observers.data_changed(id.into());
            Ok(())
        })
    }

    pub fn set_group_color(&mut self, id: GroupId, color: Color) -> Result<()> {
        self.transact(|sx| {
            sx.graph.groups.require_mut(id)?.color = color;
            sx.observers.data_changed(id.into());
            Ok(())
        })
    }

    /// Move one controller into `group`.
    pub fn set_controller_group(&mut self, ctrl: Controller, group: GroupId) -> Result<()> {
        self.transact(|sx| {
            let name = sx.controller_name(ctrl)?.to_string();
            sx.check_group_kind(group, ctrl.kind(), &name)?;
            let old = sx.graph.controller_group(ctrl);
            if old == group {
                return Ok(());
            }
            let _move = sx.observers.moving(ItemId::from(ctrl).into(), group.into());
            sx.graph.groups[old].items.retain(|&c| c != ctrl);
            sx.graph.groups[group].items.push(ctrl);
            sx.graph.set_controller_group(ctrl, group);
            Ok(())
        })
    }

    /// Move several controllers into `group`, keeping their order. Every
    /// controller is type-checked before anything moves.
    pub fn take_into_group(&mut self, group: GroupId, ctrls: &[Controller]) -> Result<()> {
        self.transact(|sx| {
            for &ctrl in ctrls {
                let name = sx.controller_name(ctrl)?.to_string();
                sx.check_group_kind(group, ctrl.kind(), &name)?;
            }
            for &ctrl in ctrls {
                sx.set_controller_group(ctrl, group)?;
            }
            Ok(())
        })
    }

    /// Delete a group and every controller in it.
    ///
    /// The last group of a kind is never deleted; asking for it is a no-op.
    pub fn delete_group(&mut self, id: GroupId) -> Result<()> {
        self.transact(|sx| {
            let kind = sx.graph.groups.require(id)?.kind;
            if sx.graph.group_list(kind).len() <= 1 {
                return Ok(());
            }
            let members = sx.graph.groups[id].items.clone();
            for ctrl in members {
                if sx.graph.controller_exists(ctrl) {
                    sx.delete_controller(ctrl)?;
                }
            }
            let _remove = sx.observers.removing(id.into());
            sx.graph.forget(ItemId::Group(id));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_group_is_kept() {
        let mut sx = Simplex::in_memory("Face").unwrap();
        let slider = sx.create_slider("Smile", None, None, 1.0).unwrap();
        let group = sx.slider(slider).unwrap().group();

        sx.delete_group(group).unwrap();
        assert_eq!(sx.slider_groups(), &[group]);
        assert_eq!(sx.sliders(), &[slider]);
    }

    #[test]
    fn test_delete_group_deletes_members() {
        let mut sx = Simplex::in_memory("Face").unwrap();
        let keep = sx.create_group("Keep", GroupKind::Slider).unwrap();
        let doomed = sx.create_group("Doomed", GroupKind::Slider).unwrap();
        let a = sx.create_slider("A", Some(keep), None, 1.0).unwrap();
        sx.create_slider("B", Some(doomed), None, 1.0).unwrap();

        sx.delete_group(doomed).unwrap();
        assert_eq!(sx.slider_groups(), &[keep]);
        assert_eq!(sx.sliders(), &[a]);
        assert_eq!(sx.shapes().len(), 2);
    }

    #[test]
    fn test_wrong_group_type() {
        let mut sx = Simplex::in_memory("Face").unwrap();
        let combos = sx.create_group("DEPTH_2", GroupKind::Combo).unwrap();
        let err = sx.create_slider("Smile", Some(combos), None, 1.0).unwrap_err();
        assert_eq!(err.error_code(), "WRONG_GROUP_TYPE");
        assert!(err.is_structural());
    }

    #[test]
    fn test_take_into_group() {
        let mut sx = Simplex::in_memory("Face").unwrap();
        let first = sx.create_group("First", GroupKind::Slider).unwrap();
        let second = sx.create_group("Second", GroupKind::Slider).unwrap();
        let a = sx.create_slider("A", Some(first), None, 1.0).unwrap();
        let b = sx.create_slider("B", Some(first), None, 1.0).unwrap();

        sx.take_into_group(second, &[Controller::Slider(b), Controller::Slider(a)])
            .unwrap();
        assert!(sx.group(first).unwrap().items().is_empty());
        assert_eq!(
            sx.group(second).unwrap().items(),
            &[Controller::Slider(b), Controller::Slider(a)]
        );
        assert_eq!(sx.slider(a).unwrap().group(), second);
    }
}
