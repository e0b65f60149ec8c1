//! Sliders: the user-facing scalar controls.

use std::collections::BTreeSet;

use log::debug;

use crate::error::{Result, SimplexError};
use crate::interface::HostHandle;
use crate::items::{
    next_name, Axis, Color, Controller, GroupId, GroupKind, ItemId, ProgId, ProgPair,
    Progression, ShapeId, SliderId,
};
use crate::system::Simplex;

/// A named scalar control owning one progression.
#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    pub(crate) name: String,
    pub(crate) prog: ProgId,
    pub(crate) group: GroupId,
    pub(crate) color: Color,
    pub(crate) enabled: bool,
    pub(crate) value: f64,
    pub(crate) min_value: f64,
    pub(crate) max_value: f64,
    pub(crate) handle: Option<HostHandle>,
    pub(crate) split_applied: BTreeSet<Axis>,
}

impl Slider {
    pub(crate) fn new(name: impl Into<String>, prog: ProgId, group: GroupId) -> Self {
        Self {
            name: name.into(),
            prog,
            group,
            color: Color::GREY,
            enabled: true,
            value: 0.0,
            min_value: 0.0,
            max_value: 1.0,
            handle: None,
            split_applied: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prog(&self) -> ProgId {
        self.prog
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Range spanned by the progression values.
    pub fn range(&self) -> (f64, f64) {
        (self.min_value, self.max_value)
    }

    pub fn handle(&self) -> Option<&HostHandle> {
        self.handle.as_ref()
    }
}

impl Simplex {
    /// Create a slider driving a new shape (or `shape`) at `value`.
    ///
    /// The slider lands in `group`, else the first slider group, else a new
    /// `{name}_GROUP`. The name is made unique among sliders.
    pub fn create_slider(
        &mut self,
        name: &str,
        group: Option<GroupId>,
        shape: Option<ShapeId>,
        value: f64,
    ) -> Result<SliderId> {
        self.transact(|sx| {
            let rest = sx.graph.rest_shape()?;
            let group = sx.slider_group_for(name, group)?;
            let name = next_name(name, sx.graph.slider_names());
            let shape = match shape {
                Some(shape) => {
                    sx.graph.shapes.require(shape)?;
                    shape
                }
                None => {
                    let shape_name = next_name(&name, sx.graph.shape_names());
                    sx.spawn_shape(&shape_name)?
                }
            };
            let pairs = vec![ProgPair::new(rest, 0.0), ProgPair::new(shape, value)];
            let prog = sx.graph.progressions.insert(Progression::with_pairs(&name, pairs));
            sx.add_slider(&name, prog, group, Color::GREY)
        })
    }

    /// Create a slider over several existing shapes at once.
    pub fn create_multi_slider(
        &mut self,
        name: &str,
        shapes: &[(ShapeId, f64)],
        group: Option<GroupId>,
    ) -> Result<SliderId> {
        self.transact(|sx| {
            let rest = sx.graph.rest_shape()?;
            let group = sx.slider_group_for(name, group)?;
            let name = next_name(name, sx.graph.slider_names());
            let mut pairs = vec![ProgPair::new(rest, 0.0)];
            for &(shape, value) in shapes {
                sx.graph.shapes.require(shape)?;
                pairs.push(ProgPair::new(shape, value));
            }
            let prog = sx.graph.progressions.insert(Progression::with_pairs(&name, pairs));
            sx.add_slider(&name, prog, group, Color::GREY)
        })
    }

    fn slider_group_for(&mut self, name: &str, group: Option<GroupId>) -> Result<GroupId> {
        match group {
            Some(group) => {
                self.check_group_kind(group, GroupKind::Slider, name)?;
                Ok(group)
            }
            None => match self.graph.slider_groups.first() {
                Some(&first) => Ok(first),
                None => self.create_group(&format!("{}_GROUP", name), GroupKind::Slider),
            },
        }
    }

    /// Wire a new slider to its progression and group, then create its host
    /// control.
    fn add_slider(&mut self, name: &str, prog: ProgId, group: GroupId, color: Color) -> Result<SliderId> {
        let handle = self.host.create_slider(name)?;
        let id = self.insert_slider(name, prog, group, color)?;
        self.graph.sliders[id].handle = Some(handle);
        self.update_slider_range(id)?;
        Ok(id)
    }

    /// Graph-side slider insertion shared by creation and loading.
    pub(crate) fn insert_slider(
        &mut self,
        name: &str,
        prog: ProgId,
        group: GroupId,
        color: Color,
    ) -> Result<SliderId> {
        self.check_group_kind(group, GroupKind::Slider, name)?;
        let mut slider = Slider::new(name, prog, group);
        slider.color = color;
        let (min, max) = self.graph.progressions.require(prog)?.range();
        slider.min_value = min;
        slider.max_value = max;

        let row = self.graph.groups[group].items.len();
        let _insert = self.observers.inserting(group.into(), row);
        let id = self.graph.sliders.insert(slider);
        self.graph.progressions[prog].controller = Some(Controller::Slider(id));
        self.graph.groups[group].items.push(Controller::Slider(id));
        self.graph.slider_list.push(id);
        Ok(id)
    }

    /// Recompute a slider's range from its progression and push it to the
    /// host, scaled by the configured multiplier.
    pub(crate) fn update_slider_range(&mut self, id: SliderId) -> Result<()> {
        let prog = self.graph.sliders.require(id)?.prog;
        let (min, max) = self.graph.progressions.require(prog)?.range();
        let slider = &mut self.graph.sliders[id];
        slider.min_value = min;
        slider.max_value = max;
        if let Some(handle) = slider.handle.clone() {
            let mul = self.config.slider_mul;
            self.host.set_slider_range(&handle, min * mul, max * mul)?;
        }
        Ok(())
    }

    pub fn rename_slider(&mut self, id: SliderId, name: &str) -> Result<()> {
        self.transact(|sx| {
            let slider = sx.graph.sliders.require(id)?;
            if slider.name == name {
                return Ok(());
            }
            if sx.graph.find_slider(name).is_some() {
                return Err(SimplexError::DuplicateName {
                    kind: "slider",
                    name: name.to_string(),
                });
            }
            if let Some(handle) = slider.handle.clone() {
                sx.host.rename_slider(&handle, name)?;
            }
            sx.graph.set_controller_name(Controller::Slider(id), name);
            sx.observers.data_changed(ItemId::Slider(id).into());
            Ok(())
        })
    }

    pub fn set_slider_color(&mut self, id: SliderId, color: Color) -> Result<()> {
        self.transact(|sx| {
            sx.graph.sliders.require_mut(id)?.color = color;
            sx.observers.data_changed(ItemId::Slider(id).into());
            Ok(())
        })
    }

    pub fn set_slider_enabled(&mut self, id: SliderId, enabled: bool) -> Result<()> {
        self.transact(|sx| {
            sx.graph.sliders.require_mut(id)?.enabled = enabled;
            sx.observers.data_changed(ItemId::Slider(id).into());
            Ok(())
        })
    }

    /// Set one slider's live value.
    pub fn set_slider_value(&mut self, id: SliderId, value: f64) -> Result<()> {
        self.set_sliders_weights(&[(id, value)])
    }

    /// Set several live slider values in one host undo step.
    ///
    /// Live values are not part of the rig definition, so no snapshot is
    /// taken.
    pub fn set_sliders_weights(&mut self, weights: &[(SliderId, f64)]) -> Result<()> {
        self.host.undo_open();
        let result = weights.iter().try_for_each(|&(id, value)| {
            let slider = self.graph.sliders.require_mut(id)?;
            slider.value = value;
            if let Some(handle) = slider.handle.clone() {
                self.host.set_slider_weight(&handle, value)?;
            }
            self.observers.data_changed(ItemId::Slider(id).into());
            Ok(())
        });
        self.host.undo_close();
        result
    }

    /// Delete a slider together with every combo and traversal built on it.
    pub fn delete_slider(&mut self, id: SliderId) -> Result<()> {
        self.transact(|sx| {
            let handle = sx.graph.sliders.require(id)?.handle.clone();
            for combo in sx.downstream_combos(id) {
                sx.delete_combo(combo)?;
            }
            for trav in sx.downstream_traversals(id) {
                sx.delete_traversal(trav)?;
            }
            debug!("Deleting slider '{}'", sx.graph.sliders[id].name);
            sx.discard_controller(Controller::Slider(id))?;
            if let Some(handle) = handle {
                sx.host.delete_slider(&handle)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::MemoryHost;
    use crate::system::Simplex;

    #[test]
    fn test_create_slider_default_shape() {
        let mut sx = Simplex::in_memory("Face").unwrap();
        let rest = sx.rest_shape().unwrap();
        let id = sx.create_slider("Smile_X_", None, None, 1.0).unwrap();

        let slider = sx.slider(id).unwrap();
        let prog = sx.progression(slider.prog()).unwrap();
        assert_eq!(sx.shapes().len(), 2);
        assert_eq!(prog.values(), vec![0.0, 1.0]);
        assert_eq!(prog.pairs()[0].shape, rest);
        assert_eq!(sx.shape(prog.pairs()[1].shape).unwrap().name(), "Smile_X_");
        assert_eq!(prog.controller(), Some(Controller::Slider(id)));

        let group = sx.group(slider.group()).unwrap();
        assert_eq!(group.name(), "Smile_X__GROUP");
    }

    #[test]
    fn test_slider_names_are_unique() {
        let mut sx = Simplex::in_memory("Face").unwrap();
        let a = sx.create_slider("Smile", None, None, 1.0).unwrap();
        let b = sx.create_slider("Smile", None, None, 1.0).unwrap();
        assert_eq!(sx.slider(a).unwrap().name(), "Smile");
        assert_eq!(sx.slider(b).unwrap().name(), "Smile1");
        assert_eq!(sx.slider(a).unwrap().group(), sx.slider(b).unwrap().group());
    }

    #[test]
    fn test_create_slider_requires_rest() {
        let mut sx = Simplex::with_graph(
            crate::system::Graph::new("Face"),
            Box::new(MemoryHost::new()),
            Default::default(),
        );
        let err = sx.create_slider("Smile", None, None, 1.0).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_REST_SHAPE");
    }

    #[test]
    fn test_range_follows_progression() {
        let mut sx = Simplex::in_memory("Face").unwrap();
        let id = sx.create_slider("Brow", None, None, 1.0).unwrap();
        let prog = sx.slider(id).unwrap().prog();
        sx.create_prog_shape(prog, None, Some(-1.0)).unwrap();
        assert_eq!(sx.slider(id).unwrap().range(), (-1.0, 1.0));
    }

    #[test]
    fn test_rename_slider_renames_prog() {
        let mut sx = Simplex::in_memory("Face").unwrap();
        let id = sx.create_slider("Brow", None, None, 1.0).unwrap();
        sx.rename_slider(id, "BrowUp").unwrap();
        let prog = sx.slider(id).unwrap().prog();
        assert_eq!(sx.progression(prog).unwrap().name(), "BrowUp");
    }

    #[test]
    fn test_delete_slider_removes_shapes() {
        let mut sx = Simplex::in_memory("Face").unwrap();
        let id = sx.create_slider("Brow", None, None, 1.0).unwrap();
        sx.delete_slider(id).unwrap();
        assert!(sx.sliders().is_empty());
        assert_eq!(sx.shapes().len(), 1);
    }

    #[test]
    fn test_set_sliders_weights() {
        let mut sx = Simplex::in_memory("Face").unwrap();
        let a = sx.create_slider("A", None, None, 1.0).unwrap();
        let b = sx.create_slider("B", None, None, 1.0).unwrap();
        sx.set_sliders_weights(&[(a, 0.25), (b, 0.75)]).unwrap();
        assert_eq!(sx.slider(a).unwrap().value(), 0.25);
        assert_eq!(sx.slider(b).unwrap().value(), 0.75);
    }
}
