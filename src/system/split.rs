//! Bilateral splitting.
//!
//! Every progression that carries a falloff is duplicated into one copy per
//! side of the falloff's axis, together with its controller, its shapes and
//! (for sliders) every combo and traversal built on it. Copies are renamed by
//! axis-token substitution and their shape deltas are attenuated by the
//! falloff weights. Everything else is shared untouched. Each axis is a
//! separate pass over the previous pass's output.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use log::{debug, info, warn};

use crate::config::SimplexConfig;
use crate::error::{Result, SimplexError};
use crate::interface::{Completion, MemoryHost, Progress};
use crate::items::falloff::sided_name;
use crate::items::{Axis, Controller, FalloffId, ItemId, Points, ShapeId, Side};
use crate::system::clone::{clone_subgraph, references};
use crate::system::{Graph, Simplex};

/// Result of [`Simplex::split`].
#[derive(Debug)]
pub struct SplitOutcome {
    /// The split system, hosted in memory.
    pub system: Simplex,

    /// `Cancelled` when the progress sink stopped the run. The system then
    /// holds whatever was split up to that point.
    pub completion: Completion,
}

fn item_name(graph: &Graph, item: ItemId) -> Option<&str> {
    match item {
        ItemId::Shape(id) => Some(&graph.shapes[id].name),
        ItemId::Progression(id) => Some(&graph.progressions[id].name),
        ItemId::Slider(id) => Some(&graph.sliders[id].name),
        ItemId::Combo(id) => Some(&graph.combos[id].name),
        ItemId::Traversal(id) => Some(&graph.traversals[id].name),
        ItemId::Group(_) | ItemId::Falloff(_) => None,
    }
}

fn set_item_name(graph: &mut Graph, item: ItemId, name: String) {
    match item {
        ItemId::Shape(id) => graph.shapes[id].name = name,
        ItemId::Progression(id) => graph.progressions[id].name = name,
        ItemId::Slider(id) => graph.sliders[id].name = name,
        ItemId::Combo(id) => graph.combos[id].name = name,
        ItemId::Traversal(id) => graph.traversals[id].name = name,
        ItemId::Group(_) | ItemId::Falloff(_) => {}
    }
}

fn split_applied(graph: &mut Graph, item: ItemId) -> Option<&mut BTreeSet<Axis>> {
    match item {
        ItemId::Shape(id) => Some(&mut graph.shapes[id].split_applied),
        ItemId::Progression(id) => Some(&mut graph.progressions[id].split_applied),
        ItemId::Slider(id) => Some(&mut graph.sliders[id].split_applied),
        ItemId::Combo(id) => Some(&mut graph.combos[id].split_applied),
        ItemId::Traversal(id) => Some(&mut graph.traversals[id].split_applied),
        ItemId::Group(_) | ItemId::Falloff(_) => None,
    }
}

/// Every live entity id in the graph.
fn all_items(graph: &Graph) -> HashSet<ItemId> {
    graph
        .shapes
        .iter()
        .map(|(id, _)| ItemId::Shape(id))
        .chain(graph.progressions.iter().map(|(id, _)| ItemId::Progression(id)))
        .chain(graph.sliders.iter().map(|(id, _)| ItemId::Slider(id)))
        .chain(graph.combos.iter().map(|(id, _)| ItemId::Combo(id)))
        .chain(graph.traversals.iter().map(|(id, _)| ItemId::Traversal(id)))
        .chain(graph.groups.iter().map(|(id, _)| ItemId::Group(id)))
        .chain(graph.falloffs.iter().map(|(id, _)| ItemId::Falloff(id)))
        .collect()
}

/// What one axis pass will split, and which falloff drives each item.
struct SplitPlan {
    items: Vec<ItemId>,
    driver: HashMap<ItemId, FalloffId>,
}

impl SplitPlan {
    /// Partition the items into units closed under references: a combo or
    /// traversal travels with the split sliders it uses, a controller with
    /// its progression and shapes. Units come back in plan order.
    fn units(&self, graph: &Graph) -> Vec<Vec<ItemId>> {
        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        let index: HashMap<ItemId, usize> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, &item)| (item, i))
            .collect();
        let mut parent: Vec<usize> = (0..self.items.len()).collect();
        for (i, &item) in self.items.iter().enumerate() {
            for next in references(graph, item) {
                if let Some(&j) = index.get(&next) {
                    let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                    parent[a.max(b)] = a.min(b);
                }
            }
        }

        let mut units: BTreeMap<usize, Vec<ItemId>> = BTreeMap::new();
        for (i, &item) in self.items.iter().enumerate() {
            let root = find(&mut parent, i);
            units.entry(root).or_default().push(item);
        }
        units.into_values().collect()
    }
}

impl Simplex {
    /// Check that splitting cannot leave anything half renamed.
    ///
    /// For every falloff with an axis and every controller, the controller,
    /// its progression and all of its non-rest shapes must either all carry
    /// the axis token or none of them. A splittable slider additionally
    /// requires every combo and traversal built on it to be splittable.
    pub fn validate_split(&self) -> Result<()> {
        let g = &self.graph;
        for &fo in &g.falloff_list {
            let Some(axis) = g.falloffs[fo].axis() else {
                continue;
            };
            let renames = |name: &str| sided_name(name, axis, Side::First) != name;

            for ctrl in g.controllers() {
                let prog = &g.progressions[g.controller_prog(ctrl)];
                let shapes: Vec<bool> = prog
                    .pairs
                    .iter()
                    .filter(|p| !g.shapes[p.shape].is_rest)
                    .map(|p| renames(&g.shapes[p.shape].name))
                    .collect();

                if shapes.windows(2).any(|w| w[0] != w[1]) {
                    let names: Vec<&str> = prog
                        .pairs
                        .iter()
                        .map(|p| g.shapes[p.shape].name.as_str())
                        .collect();
                    return Err(SimplexError::PartialSplit {
                        name: prog.name.clone(),
                        reason: format!("mix of splittable and unsplittable shapes: {}", names.join(", ")),
                    });
                }
                let prog_split = renames(&prog.name);
                if shapes.first().is_some_and(|&s| s != prog_split) {
                    return Err(SimplexError::PartialSplit {
                        name: prog.name.clone(),
                        reason: "the progression name and its shapes disagree".to_string(),
                    });
                }
                if renames(g.controller_name(ctrl)) != prog_split {
                    return Err(SimplexError::PartialSplit {
                        name: g.controller_name(ctrl).to_string(),
                        reason: "the controller name and its progression disagree".to_string(),
                    });
                }
            }

            for &slider in &g.slider_list {
                let s = &g.sliders[slider];
                if !g.progressions[s.prog].falloffs.contains(&fo) || !renames(&s.name) {
                    continue;
                }
                let downstream = self
                    .downstream_combos(slider)
                    .into_iter()
                    .map(Controller::Combo)
                    .chain(self.downstream_traversals(slider).into_iter().map(Controller::Traversal));
                for ctrl in downstream {
                    if !renames(g.controller_name(ctrl)) {
                        return Err(SimplexError::PartialSplit {
                            name: g.controller_name(ctrl).to_string(),
                            reason: format!("depends on '{}', which splits on {}", s.name, axis),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Produce a split copy of this system.
    ///
    /// The copy lives on a fresh [`MemoryHost`] with undo disabled, so it can
    /// be written out straight away. This system is only read, apart from
    /// pulling vertex buffers into its cache.
    pub fn split(&mut self, progress: &mut dyn Progress) -> Result<SplitOutcome> {
        self.validate_split()?;
        self.pull_all_shape_vertices()?;

        let config = SimplexConfig {
            undo_enabled: false,
            ..self.config.clone()
        };
        let mut out = Simplex::with_graph(self.graph.clone(), Box::new(MemoryHost::new()), config);

        let mut by_axis: BTreeMap<Axis, Vec<FalloffId>> = BTreeMap::new();
        for &fo in &out.graph.falloff_list {
            if let Some(axis) = out.graph.falloffs[fo].axis() {
                by_axis.entry(axis).or_default().push(fo);
            }
        }

        let mut completion = Completion::Finished;
        for (axis, falloffs) in by_axis {
            debug!("Splitting on {} axis", axis);
            if !out.split_axis(axis, &falloffs, progress)? {
                info!("Split cancelled during the {} pass", axis);
                completion = Completion::Cancelled;
                break;
            }
        }
        out.rehost()?;
        Ok(SplitOutcome {
            system: out,
            completion,
        })
    }

    /// Pick the items one pass splits. `falloffs` is in priority order; an
    /// item reached through several falloffs is driven by the first.
    fn plan_split(&self, axis: Axis, falloffs: &[FalloffId]) -> SplitPlan {
        let g = &self.graph;
        let mut priority: BTreeMap<ItemId, usize> = BTreeMap::new();
        let mut note = |item: ItemId, rank: usize| {
            let slot = priority.entry(item).or_insert(rank);
            *slot = (*slot).min(rank);
        };
        let note_controller = |ctrl: Controller, rank: usize, note: &mut dyn FnMut(ItemId, usize)| {
            let prog = g.controller_prog(ctrl);
            note(ctrl.into(), rank);
            note(ItemId::Progression(prog), rank);
            for pair in &g.progressions[prog].pairs {
                note(ItemId::Shape(pair.shape), rank);
            }
        };

        for ctrl in g.controllers() {
            let prog = &g.progressions[g.controller_prog(ctrl)];
            let Some(rank) = falloffs.iter().position(|f| prog.falloffs.contains(f)) else {
                continue;
            };
            note_controller(ctrl, rank, &mut note);
            if let Controller::Slider(slider) = ctrl {
                for combo in self.downstream_combos(slider) {
                    note_controller(Controller::Combo(combo), rank, &mut note);
                }
                for trav in self.downstream_traversals(slider) {
                    note_controller(Controller::Traversal(trav), rank, &mut note);
                }
            }
        }

        let rest = g.rest_shape;
        let mut items = Vec::new();
        let mut driver = HashMap::new();
        for (item, rank) in priority {
            if Some(item) == rest.map(ItemId::Shape) {
                continue;
            }
            let Some(name) = item_name(g, item) else {
                continue;
            };
            let already = match item {
                ItemId::Shape(id) => g.shapes[id].split_applied.contains(&axis),
                ItemId::Progression(id) => g.progressions[id].split_applied.contains(&axis),
                ItemId::Slider(id) => g.sliders[id].split_applied.contains(&axis),
                ItemId::Combo(id) => g.combos[id].split_applied.contains(&axis),
                ItemId::Traversal(id) => g.traversals[id].split_applied.contains(&axis),
                ItemId::Group(_) | ItemId::Falloff(_) => true,
            };
            if already || sided_name(name, axis, Side::First) == name {
                continue;
            }
            items.push(item);
            driver.insert(item, falloffs[rank]);
        }
        SplitPlan { items, driver }
    }

    /// Run one axis pass. Returns `false` when cancelled.
    ///
    /// Units are split one at a time and each is finished before the progress
    /// sink is polled, so a cancelled pass leaves a consistent graph.
    fn split_axis(&mut self, axis: Axis, falloffs: &[FalloffId], progress: &mut dyn Progress) -> Result<bool> {
        let plan = self.plan_split(axis, falloffs);
        if plan.items.is_empty() {
            return Ok(true);
        }
        let units = plan.units(&self.graph);
        let rest_verts = self
            .graph
            .rest_shape
            .and_then(|r| self.graph.shapes.get(r))
            .and_then(|r| r.verts.clone());

        progress.set_range(units.len());
        for unit in &units {
            let label = unit
                .iter()
                .find(|item| matches!(item, ItemId::Slider(_) | ItemId::Combo(_) | ItemId::Traversal(_)))
                .and_then(|&item| item_name(&self.graph, item))
                .unwrap_or_default()
                .to_string();
            self.split_unit(axis, unit, &plan.driver, rest_verts.as_ref())?;

            if !progress.advance(&format!("Splitting {}", label)) {
                return Ok(false);
            }
        }
        debug!("{} pass split {} items in {} units", axis, plan.items.len(), units.len());
        Ok(true)
    }

    /// Clone one unit twice, rename and attenuate the copies, splice them in
    /// and drop the originals.
    fn split_unit(
        &mut self,
        axis: Axis,
        unit: &[ItemId],
        driver: &HashMap<ItemId, FalloffId>,
        rest_verts: Option<&Points>,
    ) -> Result<()> {
        for &item in unit {
            if let Some(applied) = split_applied(&mut self.graph, item) {
                applied.insert(axis);
            }
        }

        let mut exempt = all_items(&self.graph);
        for item in unit {
            exempt.remove(item);
        }
        let first = clone_subgraph(&mut self.graph, unit, &exempt);
        let second = clone_subgraph(&mut self.graph, unit, &exempt);

        for &old in unit {
            let (Some(&left), Some(&right)) = (first.get(&old), second.get(&old)) else {
                continue;
            };
            let name = item_name(&self.graph, old).unwrap_or_default().to_string();
            set_item_name(&mut self.graph, left, sided_name(&name, axis, Side::First));
            set_item_name(&mut self.graph, right, sided_name(&name, axis, Side::Second));

            if let (ItemId::Shape(l), ItemId::Shape(r), Some(&fo)) = (left, right, driver.get(&old)) {
                self.attenuate(fo, l, rest_verts, Side::First)?;
                self.attenuate(fo, r, rest_verts, Side::Second)?;
            }
            self.splice(old, left, right);
        }

        for &old in unit {
            match old {
                ItemId::Shape(id) => drop(self.graph.shapes.remove(id)),
                ItemId::Progression(id) => drop(self.graph.progressions.remove(id)),
                ItemId::Slider(id) => drop(self.graph.sliders.remove(id)),
                ItemId::Combo(id) => drop(self.graph.combos.remove(id)),
                ItemId::Traversal(id) => drop(self.graph.traversals.remove(id)),
                ItemId::Group(_) | ItemId::Falloff(_) => {}
            }
        }
        Ok(())
    }

    /// Scale a shape's deltas from rest by the falloff weights. Missing
    /// vertex data skips the shape with a warning.
    fn attenuate(
        &mut self,
        fo: FalloffId,
        shape: ShapeId,
        rest: Option<&Points>,
        side: Side,
    ) -> Result<()> {
        let Some(rest) = rest else {
            warn!("No rest vertices; '{}' is not attenuated", self.graph.shapes[shape].name);
            return Ok(());
        };
        let Some(mut verts) = self.graph.shapes[shape].verts.take() else {
            warn!("Shape '{}' has no vertices to attenuate", self.graph.shapes[shape].name);
            return Ok(());
        };
        let falloff = &mut self.graph.falloffs[fo];
        if falloff.is_map() && falloff.stored_weights().is_none() {
            warn!("Map falloff '{}' has no weights; shapes are not attenuated", falloff.name);
            self.graph.shapes[shape].verts = Some(verts);
            return Ok(());
        }
        if !falloff.is_map() && falloff.verts().is_none() {
            falloff.set_verts(rest.clone());
        }
        let result = falloff.apply(rest, &mut verts, side);
        self.graph.shapes[shape].verts = Some(verts);
        result
    }

    /// Replace `old` by its two copies wherever the graph lists it.
    fn splice(&mut self, old: ItemId, left: ItemId, right: ItemId) {
        let g = &mut self.graph;
        match (old, left, right) {
            (ItemId::Shape(o), ItemId::Shape(l), ItemId::Shape(r)) => {
                g.shape_list.retain(|&s| s != o);
                g.shape_list.extend([l, r]);
            }
            (ItemId::Progression(o), ItemId::Progression(l), ItemId::Progression(r)) => {
                for fo in g.progressions[l].falloffs.clone() {
                    let children = &mut g.falloffs[fo].children;
                    children.retain(|&p| p != o);
                    children.extend([l, r]);
                }
            }
            (ItemId::Slider(o), ItemId::Slider(l), ItemId::Slider(r)) => {
                let group = g.sliders[l].group;
                g.groups[group].items.retain(|&c| c != Controller::Slider(o));
                g.groups[group].items.extend([Controller::Slider(l), Controller::Slider(r)]);
                g.slider_list.retain(|&s| s != o);
                g.slider_list.extend([l, r]);
            }
            (ItemId::Combo(o), ItemId::Combo(l), ItemId::Combo(r)) => {
                let group = g.combos[l].group;
                g.groups[group].items.retain(|&c| c != Controller::Combo(o));
                g.groups[group].items.extend([Controller::Combo(l), Controller::Combo(r)]);
                g.combo_list.retain(|&c| c != o);
                g.combo_list.extend([l, r]);
            }
            (ItemId::Traversal(o), ItemId::Traversal(l), ItemId::Traversal(r)) => {
                let group = g.traversals[l].group;
                g.groups[group].items.retain(|&c| c != Controller::Traversal(o));
                g.groups[group]
                    .items
                    .extend([Controller::Traversal(l), Controller::Traversal(r)]);
                g.traversal_list.retain(|&t| t != o);
                g.traversal_list.extend([l, r]);
            }
            _ => {}
        }
    }

    /// Recreate every host object on the current (in-memory) host and push
    /// the cached vertex buffers into it.
    fn rehost(&mut self) -> Result<()> {
        let name = self.graph.name.clone();
        self.host.load_nodes(&name, true)?;

        for &id in &self.graph.shape_list {
            let shape = &mut self.graph.shapes[id];
            shape.handle = Some(self.host.create_shape(&shape.name, shape.is_rest)?);
        }
        self.push_all_shape_vertices()?;

        for id in self.graph.slider_list.clone() {
            let handle = self.host.create_slider(&self.graph.sliders[id].name)?;
            self.graph.sliders[id].handle = Some(handle);
            self.update_slider_range(id)?;
        }

        for &fo in &self.graph.falloff_list {
            let falloff = &self.graph.falloffs[fo];
            self.host.create_falloff(&falloff.name, &falloff.kind)?;
            for &prog in &falloff.children {
                self.host
                    .add_prog_falloff(&self.graph.progressions[prog].name, &falloff.name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::NoProgress;
    use crate::items::PlanarFalloff;
    use crate::system::VectorFilter;
    use approx::assert_relative_eq;

    struct StopAfter(usize);

    impl Progress for StopAfter {
        fn advance(&mut self, _message: &str) -> bool {
            if self.0 == 0 {
                return false;
            }
            self.0 -= 1;
            true
        }
    }

    /// Rest along x, a smile shape lifting every vertex by 1 in y.
    fn smile_rig() -> (Simplex, FalloffId) {
        let mut sx = Simplex::in_memory("Face").unwrap();
        let rest = sx.rest_shape().unwrap();
        let rest_verts = vec![[-2.0, 0.0, 0.0], [0.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        sx.set_shape_vertices(rest, rest_verts).unwrap();

        let slider = sx.create_slider("Smile_X_", None, None, 1.0).unwrap();
        let prog = sx.slider(slider).unwrap().prog();
        let shape = sx.progression(prog).unwrap().shapes()[1];
        sx.set_shape_vertices(shape, vec![[-2.0, 1.0, 0.0], [0.0, 1.0, 0.0], [2.0, 1.0, 0.0]])
            .unwrap();

        let fo = sx
            .create_planar_falloff("Center", PlanarFalloff::new(Axis::X, -1.0, 0.33, 0.66, 1.0))
            .unwrap();
        sx.add_falloff(prog, fo).unwrap();
        (sx, fo)
    }

    #[test]
    fn test_split_smile() {
        let (mut sx, _) = smile_rig();
        let out = sx.split(&mut NoProgress).unwrap();
        assert!(out.completion.is_finished());

        let split = out.system;
        let names: Vec<&str> = split
            .sliders()
            .iter()
            .map(|&s| split.slider(s).unwrap().name())
            .collect();
        assert_eq!(names, vec!["Smile_L_", "Smile_R_"]);

        let left = split.find_shape("Smile_L_").unwrap();
        let right = split.find_shape("Smile_R_").unwrap();
        let left_verts = split.shape(left).unwrap().verts().unwrap();
        let right_verts = split.shape(right).unwrap().verts().unwrap();
        assert_eq!(left_verts[0], [-2.0, 0.0, 0.0]);
        assert_eq!(left_verts[2], [2.0, 1.0, 0.0]);
        assert_eq!(right_verts[0], [-2.0, 1.0, 0.0]);
        assert_eq!(right_verts[2], [2.0, 0.0, 0.0]);
        assert_relative_eq!(left_verts[1][1] + right_verts[1][1], 1.0, epsilon = 1e-9);

        assert_eq!(split.shapes().len(), 3);
        assert_eq!(sx.sliders().len(), 1);
    }

    #[test]
    fn test_split_keeps_unsplit_entities() {
        let (mut sx, _) = smile_rig();
        let jaw = sx.create_slider("JawOpen", None, None, 1.0).unwrap();
        let jaw_prog = sx.slider(jaw).unwrap().prog();

        let split = sx.split(&mut NoProgress).unwrap().system;
        assert!(split.sliders().contains(&jaw));
        assert_eq!(split.slider(jaw).unwrap().prog(), jaw_prog);
        assert_eq!(split.slider(jaw).unwrap().name(), "JawOpen");
    }

    #[test]
    fn test_split_twice_does_not_resplit() {
        let (mut sx, _) = smile_rig();
        let mut once = sx.split(&mut NoProgress).unwrap().system;
        let twice = once.split(&mut NoProgress).unwrap().system;
        let names: Vec<&str> = twice
            .sliders()
            .iter()
            .map(|&s| twice.slider(s).unwrap().name())
            .collect();
        assert_eq!(names, vec!["Smile_L_", "Smile_R_"]);
    }

    #[test]
    fn test_split_carries_downstream_combos() {
        let (mut sx, _) = smile_rig();
        let smile = sx.find_slider("Smile_X_").unwrap();
        let jaw = sx.create_slider("Jaw", None, None, 1.0).unwrap();
        sx.create_combo("Smile_X__Jaw", &[(smile, 1.0), (jaw, 1.0)], None, None, None, 1.0)
            .unwrap();

        let split = sx.split(&mut NoProgress).unwrap().system;
        let names: Vec<&str> = split
            .combos()
            .iter()
            .map(|&c| split.combo(c).unwrap().name())
            .collect();
        assert_eq!(names, vec!["Smile_L__Jaw", "Smile_R__Jaw"]);

        let left = split.find_combo("Smile_L__Jaw").unwrap();
        let left_smile = split.find_slider("Smile_L_").unwrap();
        assert!(split.combo(left).unwrap().has_slider(left_smile));
        assert!(split.combo(left).unwrap().has_slider(jaw));
    }

    #[test]
    fn test_partial_split_is_rejected() {
        let (mut sx, _) = smile_rig();
        let smile = sx.find_slider("Smile_X_").unwrap();
        let prog = sx.slider(smile).unwrap().prog();
        sx.create_prog_shape(prog, Some("SmileHalf"), Some(0.5)).unwrap();

        let err = sx.split(&mut NoProgress).unwrap_err();
        assert_eq!(err.error_code(), "PARTIAL_SPLIT");
        assert!(err.is_structural());
    }

    #[test]
    fn test_cancel_keeps_partial_work() {
        let (mut sx, fo) = smile_rig();
        let frown = sx.create_slider("Frown_X_", None, None, 1.0).unwrap();
        let frown_prog = sx.slider(frown).unwrap().prog();
        sx.add_falloff(frown_prog, fo).unwrap();

        let out = sx.split(&mut StopAfter(0)).unwrap();
        assert_eq!(out.completion, Completion::Cancelled);

        let mut partial = out.system;
        assert_eq!(partial.sliders().len(), 3);
        assert!(partial.find_slider("Smile_X_").is_some() != partial.find_slider("Frown_X_").is_some());
        for &s in partial.sliders() {
            let prog = partial.slider(s).unwrap().prog();
            for shape in partial.progression(prog).unwrap().shapes() {
                assert!(partial.shapes().contains(&shape));
            }
        }
        assert!(partial.dump().is_ok());
        let vectors = partial.build_input_vectors(&VectorFilter::default()).unwrap();
        assert_eq!(vectors.len(), 3);

        let finished = partial.split(&mut NoProgress).unwrap();
        assert!(finished.completion.is_finished());
        assert_eq!(finished.system.sliders().len(), 4);
    }

    #[test]
    fn test_units_follow_references() {
        let (mut sx, fo) = smile_rig();
        let smile = sx.find_slider("Smile_X_").unwrap();
        let frown = sx.create_slider("Frown_X_", None, None, 1.0).unwrap();
        let frown_prog = sx.slider(frown).unwrap().prog();
        sx.add_falloff(frown_prog, fo).unwrap();

        let plan = sx.plan_split(Axis::X, &[fo]);
        assert_eq!(plan.units(&sx.graph).len(), 2);

        sx.create_combo("Smile_X__Frown_X_", &[(smile, 1.0), (frown, 1.0)], None, None, None, 1.0)
            .unwrap();
        let plan = sx.plan_split(Axis::X, &[fo]);
        let units = plan.units(&sx.graph);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].len(), plan.items.len());
    }
}
