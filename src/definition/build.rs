//! Definition writers.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use serde_json::Value;

use crate::definition::schema::{
    ComboRecord, ControlKind, ControlTraversal, Document, FalloffRecord, GroupRecord, IndexPair,
    LegacyCombo, LegacyDocument, LegacyFalloff, PointTraversal, ProgressionRecord, ShapeRecord,
    SliderRecord, TraversalRecord,
};
use crate::definition::{CURRENT_VERSION, LEGACY_VERSION};
use crate::error::{Result, SimplexError};
use crate::items::{
    Color, ComboId, FalloffId, FalloffKind, GroupId, ProgId, ShapeId, SliderId, SolveType,
    TravPoint, Traversal,
};
use crate::system::{Graph, Simplex};

/// Index tables for one write pass.
///
/// Everything but progressions is written in list order. Progressions are
/// written the first time a controller refers to them.
struct Indexer<'a> {
    graph: &'a Graph,
    shapes: HashMap<ShapeId, usize>,
    groups: HashMap<GroupId, usize>,
    sliders: HashMap<SliderId, usize>,
    combos: HashMap<ComboId, usize>,
    falloffs: HashMap<FalloffId, usize>,
    progs: HashMap<ProgId, usize>,
    prog_order: Vec<ProgId>,
}

fn positions<I: Copy + Hash + Eq>(ids: impl IntoIterator<Item = I>) -> HashMap<I, usize> {
    ids.into_iter().enumerate().map(|(i, id)| (id, i)).collect()
}

fn lookup<I: Hash + Eq + Display>(table: &HashMap<I, usize>, id: I, kind: &'static str) -> Result<usize> {
    table.get(&id).copied().ok_or_else(|| SimplexError::UnknownItem {
        kind,
        name: id.to_string(),
    })
}

impl<'a> Indexer<'a> {
    fn new(graph: &'a Graph) -> Self {
        Self {
            graph,
            shapes: positions(graph.shape_list.iter().copied()),
            groups: positions(graph.group_order()),
            sliders: positions(graph.slider_list.iter().copied()),
            combos: positions(graph.combo_list.iter().copied()),
            falloffs: positions(graph.falloff_list.iter().copied()),
            progs: HashMap::new(),
            prog_order: Vec::new(),
        }
    }

    fn shape(&self, id: ShapeId) -> Result<usize> {
        lookup(&self.shapes, id, "shape")
    }

    fn group(&self, id: GroupId) -> Result<usize> {
        lookup(&self.groups, id, "group")
    }

    fn slider(&self, id: SliderId) -> Result<usize> {
        lookup(&self.sliders, id, "slider")
    }

    fn combo(&self, id: ComboId) -> Result<usize> {
        lookup(&self.combos, id, "combo")
    }

    fn falloff(&self, id: FalloffId) -> Result<usize> {
        lookup(&self.falloffs, id, "falloff")
    }

    /// Index of a progression, assigning the next one on first use.
    fn prog(&mut self, id: ProgId) -> usize {
        let next = self.prog_order.len();
        *self.progs.entry(id).or_insert_with(|| {
            self.prog_order.push(id);
            next
        })
    }

    fn point(&self, point: &TravPoint) -> Result<Vec<IndexPair>> {
        point
            .pairs()
            .iter()
            .map(|p| Ok((self.slider(p.slider)?, p.value)))
            .collect()
    }

    fn prog_records(&self) -> Result<Vec<ProgressionRecord>> {
        self.prog_order
            .iter()
            .map(|&id| {
                let prog = &self.graph.progressions[id];
                let pairs = prog
                    .pairs
                    .iter()
                    .map(|p| Ok((self.shape(p.shape)?, p.value)))
                    .collect::<Result<Vec<_>>>()?;
                let falloffs = prog
                    .falloffs
                    .iter()
                    .map(|&f| self.falloff(f))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ProgressionRecord {
                    name: prog.name.clone(),
                    pairs,
                    interp: prog.interp,
                    falloffs,
                })
            })
            .collect()
    }
}

fn falloff_record(name: &str, kind: &FalloffKind, color: Color) -> FalloffRecord {
    match kind {
        FalloffKind::Planar(p) => FalloffRecord {
            name: name.to_string(),
            kind: "planar".to_string(),
            axis: Some(p.axis),
            max_val: Some(p.max_val),
            max_handle: Some(p.max_handle),
            min_handle: Some(p.min_handle),
            min_val: Some(p.min_val),
            map_name: None,
            color,
        },
        FalloffKind::Map { map_name, axis } => FalloffRecord {
            name: name.to_string(),
            kind: "map".to_string(),
            axis: *axis,
            max_val: None,
            max_handle: None,
            min_handle: None,
            min_val: None,
            map_name: Some(map_name.clone()),
            color,
        },
    }
}

fn legacy_falloff(name: &str, kind: &FalloffKind) -> LegacyFalloff {
    match kind {
        FalloffKind::Planar(p) => LegacyFalloff::Planar(
            name.to_string(),
            "planar".to_string(),
            p.axis,
            p.max_val,
            p.max_handle,
            p.min_handle,
            p.min_val,
        ),
        FalloffKind::Map { map_name, axis: None } => {
            LegacyFalloff::Map(name.to_string(), "map".to_string(), map_name.clone())
        }
        FalloffKind::Map { map_name, axis } => {
            LegacyFalloff::MapWithAxis(name.to_string(), "map".to_string(), map_name.clone(), *axis)
        }
    }
}

impl Simplex {
    /// Build the definition document in the current (`legacy == false`) or
    /// positional version 1 encoding.
    pub fn build_definition(&self, legacy: bool) -> Result<Value> {
        let value = if legacy {
            serde_json::to_value(self.legacy_document()?)?
        } else {
            serde_json::to_value(self.document()?)?
        };
        Ok(value)
    }

    /// Serialise the definition as configured.
    pub fn dump(&self) -> Result<String> {
        let value = self.build_definition(self.config.legacy)?;
        let text = if self.config.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(text)
    }

    fn document(&self) -> Result<Document> {
        let g = &self.graph;
        let mut ix = Indexer::new(g);

        let shapes = g
            .shape_list
            .iter()
            .map(|&s| ShapeRecord {
                name: g.shapes[s].name.clone(),
                color: g.shapes[s].color,
            })
            .collect();
        let groups = g
            .group_order()
            .map(|id| GroupRecord {
                name: g.groups[id].name.clone(),
                kind: g.groups[id].kind,
                color: g.groups[id].color,
            })
            .collect();
        let falloffs = g
            .falloff_list
            .iter()
            .map(|&f| falloff_record(&g.falloffs[f].name, &g.falloffs[f].kind, g.falloffs[f].color))
            .collect();

        let mut sliders = Vec::with_capacity(g.slider_list.len());
        for &id in &g.slider_list {
            let s = &g.sliders[id];
            sliders.push(SliderRecord {
                name: s.name.clone(),
                prog: ix.prog(s.prog),
                group: ix.group(s.group)?,
                color: s.color,
                enabled: s.enabled,
            });
        }

        let mut combos = Vec::with_capacity(g.combo_list.len());
        for &id in &g.combo_list {
            let c = &g.combos[id];
            let pairs = c
                .pairs
                .iter()
                .map(|p| Ok((ix.slider(p.slider)?, p.value)))
                .collect::<Result<Vec<_>>>()?;
            combos.push(ComboRecord {
                name: c.name.clone(),
                prog: ix.prog(c.prog),
                pairs,
                group: ix.group(c.group)?,
                color: c.color,
                enabled: c.enabled,
                solve_type: Some(SolveType::option_str(c.solve_type).to_string()),
            });
        }

        let mut traversals = Vec::with_capacity(g.traversal_list.len());
        for &id in &g.traversal_list {
            let t = &g.traversals[id];
            traversals.push(TraversalRecord::Points(PointTraversal {
                name: t.name.clone(),
                prog: ix.prog(t.prog),
                start: ix.point(&t.start)?,
                end: ix.point(&t.end)?,
                group: ix.group(t.group)?,
                color: t.color,
                enabled: t.enabled,
            }));
        }

        Ok(Document {
            encoding_version: CURRENT_VERSION,
            system_name: g.name.clone(),
            cluster_name: g.cluster_name.clone(),
            shapes,
            groups,
            falloffs,
            progressions: ix.prog_records()?,
            sliders,
            combos,
            traversals,
            extras: g.extras.clone(),
        })
    }

    fn legacy_document(&self) -> Result<LegacyDocument> {
        let g = &self.graph;
        let mut ix = Indexer::new(g);

        let mut sliders = Vec::with_capacity(g.slider_list.len());
        for &id in &g.slider_list {
            let s = &g.sliders[id];
            sliders.push((s.name.clone(), ix.prog(s.prog), ix.group(s.group)?));
        }

        let mut combos = Vec::with_capacity(g.combo_list.len());
        for &id in &g.combo_list {
            let c = &g.combos[id];
            let pairs = c
                .pairs
                .iter()
                .map(|p| Ok((ix.slider(p.slider)?, p.value)))
                .collect::<Result<Vec<_>>>()?;
            combos.push(LegacyCombo::Grouped(c.name.clone(), ix.prog(c.prog), pairs, ix.group(c.group)?));
        }

        let mut traversals = Vec::with_capacity(g.traversal_list.len());
        for &id in &g.traversal_list {
            let t = &g.traversals[id];
            traversals.push(self.control_traversal(t, &mut ix)?);
        }

        let progressions = ix
            .prog_records()?
            .into_iter()
            .map(|p| {
                let (shapes, values) = p.pairs.into_iter().unzip();
                (p.name, shapes, values, p.interp, p.falloffs)
            })
            .collect();

        Ok(LegacyDocument {
            encoding_version: LEGACY_VERSION,
            system_name: g.name.clone(),
            cluster_name: g.cluster_name.clone(),
            shapes: g.shape_list.iter().map(|&s| g.shapes[s].name.clone()).collect(),
            groups: g.group_order().map(|id| g.groups[id].name.clone()).collect(),
            falloffs: g
                .falloff_list
                .iter()
                .map(|&f| legacy_falloff(&g.falloffs[f].name, &g.falloffs[f].kind))
                .collect(),
            progressions,
            sliders,
            combos,
            traversals,
            extras: g.extras.clone(),
        })
    }

    /// Express a traversal as a progress control over a multiplier control.
    ///
    /// Sliders that move must all start at zero and form either one slider
    /// ending at +-1 or the exact pairs of an existing combo. Sliders that
    /// hold a non-zero value must do the same for the multiplier.
    fn control_traversal(&self, t: &Traversal, ix: &mut Indexer<'_>) -> Result<ControlTraversal> {
        let unrepresentable = |reason: &str| SimplexError::LegacyUnrepresentable {
            name: t.name.clone(),
            reason: reason.to_string(),
        };

        let mut progress = Vec::new();
        let mut multiplier = Vec::new();
        for slider in t.all_sliders() {
            let (start, end) = (t.start.value_of(slider), t.end.value_of(slider));
            if start == end {
                if start != 0.0 {
                    multiplier.push((slider, start));
                }
            } else if start == 0.0 {
                progress.push((slider, end));
            } else {
                return Err(unrepresentable("a moving slider does not start at zero"));
            }
        }

        let (progress_type, progress_control, progress_flip) = self
            .control_for(&progress, ix)?
            .ok_or_else(|| unrepresentable("no slider or combo matches the progress"))?;
        let (multiplier_type, multiplier_control, multiplier_flip) = self
            .control_for(&multiplier, ix)?
            .ok_or_else(|| unrepresentable("no slider or combo matches the multiplier"))?;

        Ok(ControlTraversal {
            name: t.name.clone(),
            prog: ix.prog(t.prog),
            progress_type,
            progress_control,
            progress_flip,
            multiplier_type,
            multiplier_control,
            multiplier_flip,
            group: ix.group(t.group)?,
            color: t.color,
            enabled: t.enabled,
        })
    }

    /// A single slider at +-1, or the combo whose pairs are exactly `pairs`.
    fn control_for(
        &self,
        pairs: &[(SliderId, f64)],
        ix: &Indexer<'_>,
    ) -> Result<Option<(ControlKind, usize, bool)>> {
        if let [(slider, value)] = pairs {
            if value.abs() == 1.0 {
                return Ok(Some((ControlKind::Slider, ix.slider(*slider)?, *value < 0.0)));
            }
        }
        if pairs.is_empty() {
            return Ok(None);
        }
        match self.combo_exists(pairs) {
            Some(combo) => Ok(Some((ControlKind::Combo, ix.combo(combo)?, false))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{Axis, PlanarFalloff};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn small_rig() -> Simplex {
        let mut sx = Simplex::in_memory("Face").unwrap();
        let a = sx.create_slider("A", None, None, 1.0).unwrap();
        let b = sx.create_slider("B", None, None, 1.0).unwrap();
        sx.create_combo("A_B", &[(a, 1.0), (b, 1.0)], None, None, None, 1.0)
            .unwrap();
        sx
    }

    #[test]
    fn test_current_layout() {
        let sx = small_rig();
        let def = sx.build_definition(false).unwrap();

        assert_eq!(def["encodingVersion"], 3);
        assert_eq!(def["systemName"], "Face");
        assert_eq!(def["shapes"][0]["name"], "Rest_Face");
        assert_eq!(def["sliders"][0], json!({
            "name": "A", "prog": 0, "group": 0, "color": [128, 128, 128], "enabled": true
        }));
        assert_eq!(def["combos"][0]["pairs"], json!([[0, 1.0], [1, 1.0]]));
        assert_eq!(def["combos"][0]["prog"], 2);
        assert_eq!(def["combos"][0]["group"], 1);
        assert_eq!(def["combos"][0]["solveType"], "None");
        assert_eq!(def["progressions"][2]["pairs"], json!([[0, 0.0], [3, 1.0]]));
        assert_eq!(def["groups"][1]["type"], "Combo");
    }

    #[test]
    fn test_legacy_layout() {
        let mut sx = small_rig();
        let prog = sx.slider(sx.find_slider("A").unwrap()).unwrap().prog();
        let fo = sx
            .create_planar_falloff("Center", PlanarFalloff::new(Axis::X, -1.0, 0.33, 0.66, 1.0))
            .unwrap();
        sx.add_falloff(prog, fo).unwrap();

        let def = sx.build_definition(true).unwrap();
        assert_eq!(def["encodingVersion"], 1);
        assert_eq!(def["shapes"], json!(["Rest_Face", "A", "B", "A_B"]));
        assert_eq!(def["groups"], json!(["A_GROUP", "DEPTH_2"]));
        assert_eq!(def["sliders"][1], json!(["B", 1, 0]));
        assert_eq!(def["combos"][0], json!(["A_B", 2, [[0, 1.0], [1, 1.0]], 1]));
        assert_eq!(
            def["progressions"][0],
            json!(["A", [0, 1], [0.0, 1.0], "spline", [0]])
        );
        assert_eq!(
            def["falloffs"][0],
            json!(["Center", "planar", "X", 1.0, 0.66, 0.33, -1.0])
        );
    }

    #[test]
    fn test_extras_pass_through() {
        let mut sx = small_rig();
        sx.graph.extras.insert("rigVersion".to_string(), json!("7"));
        let def = sx.build_definition(false).unwrap();
        assert_eq!(def["rigVersion"], "7");
    }

    #[test]
    fn test_legacy_traversal_controls() {
        let mut sx = small_rig();
        let a = sx.find_slider("A").unwrap();
        let b = sx.find_slider("B").unwrap();
        sx.create_traversal("Tv", &[(a, 0.0), (b, -1.0)], &[(a, 1.0), (b, -1.0)], None, 1)
            .unwrap();

        let def = sx.build_definition(true).unwrap();
        let trav = &def["traversals"][0];
        assert_eq!(trav["progressType"], "slider");
        assert_eq!(trav["progressControl"], 0);
        assert_eq!(trav["progressFlip"], false);
        assert_eq!(trav["multiplierType"], "slider");
        assert_eq!(trav["multiplierControl"], 1);
        assert_eq!(trav["multiplierFlip"], true);
    }

    #[test]
    fn test_legacy_rejects_free_traversal() {
        let mut sx = small_rig();
        let a = sx.find_slider("A").unwrap();
        let b = sx.find_slider("B").unwrap();
        sx.create_traversal("Tv", &[(a, 0.5), (b, 1.0)], &[(a, 1.0), (b, 1.0)], None, 1)
            .unwrap();

        let err = sx.build_definition(true).unwrap_err();
        assert_eq!(err.error_code(), "LEGACY_UNREPRESENTABLE");
        assert!(sx.build_definition(false).is_ok());
    }
}
