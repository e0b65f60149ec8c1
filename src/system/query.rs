//! Read-only questions about the graph.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::error::{Result, SimplexError};
use crate::items::{ComboId, Controller, ProgId, ProgPair, ShapeId, SliderId, TraversalId};
use crate::solver::Solver;
use crate::system::Simplex;

/// Solver inputs that fully activate each non-rest target.
///
/// The three vectors are index aligned: `vectors[i]` is a slider-space input
/// (ordered like the system's slider list) that turns on the shape named
/// `names[i]`, which sits at `shape_indices[i]` in the shape list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InputVectors {
    pub names: Vec<String>,
    pub vectors: Vec<Vec<f64>>,
    pub shape_indices: Vec<usize>,
}

impl InputVectors {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn push(&mut self, name: &str, vector: Vec<f64>, shape_index: usize) {
        self.names.push(name.to_string());
        self.vectors.push(vector);
        self.shape_indices.push(shape_index);
    }
}

/// Filters for [`Simplex::build_input_vectors`].
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
    /// Only these sliders contribute their own shapes, when set.
    pub keep_sliders: Option<HashSet<String>>,

    /// Sliders skipped entirely, along with every combo that uses them.
    pub ignore_sliders: HashSet<String>,

    /// Skip combos with more inputs than this.
    pub depth_cutoff: Option<usize>,

    pub ignore_floaters: bool,

    pub ignore_traversals: bool,

    /// Only targets sitting at -1 or 1.
    pub extremes: bool,
}

impl Simplex {
    /// Combos that use `slider`.
    pub fn downstream_combos(&self, slider: SliderId) -> Vec<ComboId> {
        self.graph
            .combo_list
            .iter()
            .copied()
            .filter(|&c| self.graph.combos[c].has_slider(slider))
            .collect()
    }

    /// Traversals that mention `slider` at either point.
    pub fn downstream_traversals(&self, slider: SliderId) -> Vec<TraversalId> {
        self.graph
            .traversal_list
            .iter()
            .copied()
            .filter(|&t| self.graph.traversals[t].has_slider(slider))
            .collect()
    }

    /// Combos that are necessarily active whenever `combo` is.
    ///
    /// These are the non-floating combos over a strict subset of `combo`'s
    /// sliders whose values agree in sign.
    pub fn upstream_combos(&self, combo: ComboId) -> Result<Vec<ComboId>> {
        let target: HashMap<SliderId, f64> = self
            .graph
            .combos
            .require(combo)?
            .pairs
            .iter()
            .map(|p| (p.slider, p.value))
            .collect();

        Ok(self
            .graph
            .combo_list
            .iter()
            .copied()
            .filter(|&c| {
                let other = &self.graph.combos[c];
                !other.is_floating()
                    && other.pairs.len() < target.len()
                    && other.pairs.iter().all(|p| {
                        target
                            .get(&p.slider)
                            .is_some_and(|&v| v * p.value >= 0.0)
                    })
            })
            .collect())
    }

    /// Every shape owned by a floating combo, rest pairs included.
    pub fn floating_shapes(&self) -> Vec<ShapeId> {
        self.graph
            .combo_list
            .iter()
            .filter(|&&c| self.graph.combos[c].is_floating())
            .flat_map(|&c| self.graph.progressions[self.graph.combos[c].prog].shapes())
            .collect()
    }

    /// Sliders, then combos by input count (regular before floating at each
    /// depth), then traversals by start-point size.
    pub fn controllers_by_depth(&self) -> Vec<Controller> {
        let mut order: Vec<Controller> = self
            .graph
            .slider_list
            .iter()
            .map(|&s| Controller::Slider(s))
            .collect();

        let mut combos: BTreeMap<usize, (Vec<ComboId>, Vec<ComboId>)> = BTreeMap::new();
        for &c in &self.graph.combo_list {
            let combo = &self.graph.combos[c];
            let (regular, floating) = combos.entry(combo.pairs.len()).or_default();
            if combo.is_floating() {
                floating.push(c);
            } else {
                regular.push(c);
            }
        }
        for (regular, floating) in combos.into_values() {
            order.extend(regular.into_iter().chain(floating).map(Controller::Combo));
        }

        let mut travs: BTreeMap<usize, Vec<TraversalId>> = BTreeMap::new();
        for &t in &self.graph.traversal_list {
            travs
                .entry(self.graph.traversals[t].start.pairs.len())
                .or_default()
                .push(t);
        }
        order.extend(travs.into_values().flatten().map(Controller::Traversal));
        order
    }

    fn slider_indices(&self) -> HashMap<SliderId, usize> {
        self.graph
            .slider_list
            .iter()
            .enumerate()
            .map(|(i, &s)| (s, i))
            .collect()
    }

    /// Input that fully activates a combo.
    pub fn combo_input_vector(&self, combo: ComboId) -> Result<Vec<f64>> {
        let index = self.slider_indices();
        let mut vector = vec![0.0; self.graph.slider_list.len()];
        for pair in &self.graph.combos.require(combo)?.pairs {
            if let Some(&i) = index.get(&pair.slider) {
                vector[i] = pair.value;
            }
        }
        Ok(vector)
    }

    /// Input that puts a traversal at `value`, lerping between its points.
    pub fn traversal_input_vector(&self, trav: TraversalId, value: f64) -> Result<Vec<f64>> {
        let index = self.slider_indices();
        let t = self.graph.traversals.require(trav)?;
        let len = self.graph.slider_list.len();
        let mut start = vec![0.0; len];
        let mut end = vec![0.0; len];
        for (point, full) in [(&t.start, &mut start), (&t.end, &mut end)] {
            for pair in &point.pairs {
                if let Some(&i) = index.get(&pair.slider) {
                    full[i] = pair.value;
                }
            }
        }
        Ok(start
            .into_iter()
            .zip(end)
            .map(|(s, e)| s * (1.0 - value) + e * value)
            .collect())
    }

    /// Build a solver input for every enabled non-rest target.
    ///
    /// A target shape missing from the shape list is an `UnknownItem` error.
    pub fn build_input_vectors(&self, filter: &VectorFilter) -> Result<InputVectors> {
        let g = &self.graph;
        let shape_index: HashMap<ShapeId, usize> = g
            .shape_list
            .iter()
            .enumerate()
            .map(|(i, &s)| (s, i))
            .collect();
        let listed = |shape: ShapeId| -> Result<(String, usize)> {
            let name = g.shapes.require(shape)?.name.clone();
            match shape_index.get(&shape) {
                Some(&index) => Ok((name, index)),
                None => Err(SimplexError::UnknownItem { kind: "shape", name }),
            }
        };
        let targets = |prog: ProgId| -> Result<Vec<ProgPair>> {
            let mut pairs = Vec::new();
            for pair in &g.progressions.require(prog)?.pairs {
                if g.shapes.require(pair.shape)?.is_rest
                    || (filter.extremes && pair.value.abs() != 1.0)
                {
                    continue;
                }
                pairs.push(*pair);
            }
            Ok(pairs)
        };
        let mut out = InputVectors::default();

        for (i, &s) in g.slider_list.iter().enumerate() {
            let slider = g.sliders.require(s)?;
            if !slider.enabled || filter.ignore_sliders.contains(&slider.name) {
                continue;
            }
            if let Some(keep) = &filter.keep_sliders {
                if !keep.contains(&slider.name) {
                    continue;
                }
            }
            for pp in targets(slider.prog)? {
                let mut vector = vec![0.0; g.slider_list.len()];
                vector[i] = pp.value;
                let (name, index) = listed(pp.shape)?;
                out.push(&name, vector, index);
            }
        }

        for &c in &g.combo_list {
            let combo = g.combos.require(c)?;
            if !combo.enabled
                || (filter.ignore_floaters && combo.is_floating())
                || filter.depth_cutoff.is_some_and(|d| combo.pairs.len() > d)
                || combo.pairs.iter().any(|p| {
                    g.sliders
                        .get(p.slider)
                        .is_some_and(|s| filter.ignore_sliders.contains(&s.name))
                })
            {
                continue;
            }
            let Ok(base) = self.combo_input_vector(c) else {
                continue;
            };
            for pp in targets(combo.prog)? {
                let vector = base.iter().map(|x| x * pp.value).collect();
                let (name, index) = listed(pp.shape)?;
                out.push(&name, vector, index);
            }
        }

        if !filter.ignore_traversals {
            for &t in &g.traversal_list {
                let trav = g.traversals.require(t)?;
                if !trav.enabled {
                    continue;
                }
                for pp in targets(trav.prog)? {
                    let Ok(vector) = self.traversal_input_vector(t, pp.value) else {
                        continue;
                    };
                    let (name, index) = listed(pp.shape)?;
                    out.push(&name, vector, index);
                }
            }
        }
        Ok(out)
    }

    /// Run each input through a solver built from this system's definition.
    /// Outputs are ordered like the shape list.
    pub fn evaluate_inputs<S: Solver>(&self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let solver = S::from_definition(&self.dump()?)?;
        Ok(inputs.iter().map(|v| solver.solve(v)).collect())
    }
}
