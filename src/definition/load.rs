//! Definition loaders.
//!
//! A load builds a complete new graph and only swaps it in when every record
//! resolved. Host objects are looked up by name and created when missing if
//! the configuration allows it.

use std::collections::HashMap;

use log::{debug, info};
use serde_json::{Map, Value};

use crate::definition::schema::{
    ComboRecord, ControlKind, ControlTraversal, Document, FalloffRecord, LegacyCombo,
    LegacyDocument, LegacyFalloff, PointTraversal, TraversalRecord,
};
use crate::config::SimplexConfig;
use crate::error::{Result, SimplexError};
use crate::interface::HostAdapter;
use crate::items::{
    Color, ComboId, ComboPair, Falloff, FalloffId, Group, GroupId, GroupKind, Interp,
    PlanarFalloff, ProgId, ProgPair, Progression, Shape, ShapeId, SliderId, SolveType, TravPair,
    TravPoint,
};
use crate::system::{Graph, Simplex};

/// A parsed document of any supported version.
enum Parsed {
    Legacy(LegacyDocument),
    Named(Document),
}

fn parse(definition: &Value) -> Result<Parsed> {
    let version = definition
        .get("encodingVersion")
        .ok_or_else(|| SimplexError::MalformedDefinition {
            reason: "missing encodingVersion".to_string(),
        })?;
    match version.as_u64() {
        Some(1) => Ok(Parsed::Legacy(serde_json::from_value(definition.clone())?)),
        Some(2) | Some(3) => Ok(Parsed::Named(serde_json::from_value(definition.clone())?)),
        _ => Err(SimplexError::UnsupportedVersion {
            version: version.to_string(),
        }),
    }
}

fn pick<T: Copy>(list: &[T], index: usize, kind: &'static str) -> Result<T> {
    list.get(index).copied().ok_or(SimplexError::IndexOutOfRange {
        kind,
        index,
        len: list.len(),
    })
}

fn malformed(reason: impl Into<String>) -> SimplexError {
    SimplexError::MalformedDefinition {
        reason: reason.into(),
    }
}

/// File index to entity id, per table.
#[derive(Default)]
struct Tables {
    shapes: Vec<ShapeId>,
    groups: Vec<GroupId>,
    falloffs: Vec<FalloffId>,
    progs: Vec<ProgId>,
    sliders: Vec<SliderId>,
    combos: Vec<ComboId>,
}

impl Tables {
    fn slider_pairs(&self, pairs: &[(usize, f64)]) -> Result<Vec<(SliderId, f64)>> {
        pairs
            .iter()
            .map(|&(i, v)| Ok((pick(&self.sliders, i, "sliders")?, v)))
            .collect()
    }
}

fn falloff_from_record(record: &FalloffRecord) -> Result<Falloff> {
    let mut falloff = match record.kind.to_ascii_lowercase().as_str() {
        "planar" => {
            let missing = |field: &str| malformed(format!("planar falloff '{}' has no {}", record.name, field));
            let planar = PlanarFalloff::new(
                record.axis.ok_or_else(|| missing("axis"))?,
                record.min_val.ok_or_else(|| missing("minVal"))?,
                record.min_handle.ok_or_else(|| missing("minHandle"))?,
                record.max_handle.ok_or_else(|| missing("maxHandle"))?,
                record.max_val.ok_or_else(|| missing("maxVal"))?,
            );
            Falloff::planar(&record.name, planar)
        }
        "map" => {
            let map_name = record
                .map_name
                .as_deref()
                .ok_or_else(|| malformed(format!("map falloff '{}' has no mapName", record.name)))?;
            Falloff::map(&record.name, map_name, record.axis)
        }
        other => return Err(malformed(format!("improper falloff type '{}'", other))),
    };
    falloff.color = record.color;
    Ok(falloff)
}

fn falloff_from_legacy(record: &LegacyFalloff) -> Result<Falloff> {
    let check = |name: &str, tag: &str, expected: &str| {
        if tag.eq_ignore_ascii_case(expected) {
            Ok(())
        } else {
            Err(malformed(format!("falloff '{}' has improper type '{}'", name, tag)))
        }
    };
    match record {
        LegacyFalloff::Planar(name, tag, axis, max_val, max_handle, min_handle, min_val) => {
            check(name, tag, "planar")?;
            let planar = PlanarFalloff::new(*axis, *min_val, *min_handle, *max_handle, *max_val);
            Ok(Falloff::planar(name, planar))
        }
        LegacyFalloff::Map(name, tag, map_name) => {
            check(name, tag, "map")?;
            Ok(Falloff::map(name, map_name, None))
        }
        LegacyFalloff::MapWithAxis(name, tag, map_name, axis) => {
            check(name, tag, "map")?;
            Ok(Falloff::map(name, map_name, *axis))
        }
    }
}

impl Simplex {
    /// Build a system from a definition string on `host`.
    pub fn from_definition_str(
        definition: &str,
        host: Box<dyn HostAdapter>,
        config: SimplexConfig,
    ) -> Result<Self> {
        let value: Value = serde_json::from_str(definition)?;
        Self::from_definition(&value, host, config)
    }

    /// Build a system from a parsed definition document on `host`.
    pub fn from_definition(
        definition: &Value,
        host: Box<dyn HostAdapter>,
        config: SimplexConfig,
    ) -> Result<Self> {
        let mut sx = Self::with_graph(Graph::new(""), host, config);
        sx.load_definition(definition)?;
        Ok(sx)
    }

    pub fn load_definition_str(&mut self, definition: &str) -> Result<()> {
        let value: Value = serde_json::from_str(definition)?;
        self.load_definition(&value)
    }

    /// Replace the whole system with a definition of any supported version.
    ///
    /// On failure the previous graph is put back.
    pub fn load_definition(&mut self, definition: &Value) -> Result<()> {
        let parsed = parse(definition)?;
        let create = self.config.create_missing;
        let previous = std::mem::replace(&mut self.graph, Graph::new(""));

        let result = self.transact(|sx| match parsed {
            Parsed::Legacy(doc) => sx.load_legacy(doc, create),
            Parsed::Named(doc) => sx.load_named(doc, create),
        });
        match result {
            Ok(()) => {
                info!(
                    "Loaded system '{}': {} shapes, {} sliders, {} combos, {} traversals",
                    self.graph.name,
                    self.graph.shape_list.len(),
                    self.graph.slider_list.len(),
                    self.graph.combo_list.len(),
                    self.graph.traversal_list.len()
                );
                self.observers.reset();
                Ok(())
            }
            Err(err) => {
                self.graph = previous;
                Err(err)
            }
        }
    }

    fn begin_load(
        &mut self,
        name: &str,
        cluster: &str,
        extras: Map<String, Value>,
        create: bool,
    ) -> Result<()> {
        self.graph.name = name.to_string();
        self.graph.cluster_name = cluster.to_string();
        self.graph.extras = extras;
        self.host.load_nodes(name, create)
    }

    fn load_named(&mut self, doc: Document, create: bool) -> Result<()> {
        debug!("Loading version {} definition '{}'", doc.encoding_version, doc.system_name);
        self.begin_load(&doc.system_name, &doc.cluster_name, doc.extras, create)?;
        let mut t = Tables::default();

        for record in &doc.falloffs {
            let falloff = falloff_from_record(record)?;
            t.falloffs.push(self.load_falloff(falloff, create)?);
        }

        if doc.groups.is_empty() {
            for (name, kind) in [
                ("Group_0", GroupKind::Slider),
                ("Group_1", GroupKind::Combo),
                ("Group_2", GroupKind::Traversal),
            ] {
                t.groups.push(self.load_group(name, kind, Color::GREY));
            }
        } else {
            for record in &doc.groups {
                t.groups.push(self.load_group(&record.name, record.kind, record.color));
            }
        }

        let shapes: Vec<(&str, Color)> = doc.shapes.iter().map(|s| (s.name.as_str(), s.color)).collect();
        t.shapes = self.load_shapes(&shapes, create)?;

        for record in &doc.progressions {
            let prog = self.load_progression(&record.name, &record.pairs, record.interp, &record.falloffs, &t)?;
            t.progs.push(prog);
        }

        for record in &doc.sliders {
            let prog = pick(&t.progs, record.prog, "progressions")?;
            let group = pick(&t.groups, record.group, "groups")?;
            let id = self.load_slider(&record.name, prog, group, record.color, create)?;
            self.graph.sliders[id].enabled = record.enabled;
            t.sliders.push(id);
        }

        for record in &doc.combos {
            let id = self.load_combo(record, &t)?;
            t.combos.push(id);
        }

        for record in &doc.traversals {
            match record {
                TraversalRecord::Points(p) => self.load_point_traversal(p, &t)?,
                TraversalRecord::Controls(c) => self.load_control_traversal(c, &t, |_, i| {
                    pick(&t.groups, i, "groups")
                })?,
            }
        }

        self.finish_load(create)
    }

    fn load_legacy(&mut self, doc: LegacyDocument, create: bool) -> Result<()> {
        debug!("Loading version 1 definition '{}'", doc.system_name);
        self.begin_load(&doc.system_name, &doc.cluster_name, doc.extras, create)?;
        let mut t = Tables::default();

        for record in &doc.falloffs {
            let falloff = falloff_from_legacy(record)?;
            t.falloffs.push(self.load_falloff(falloff, create)?);
        }

        let shapes: Vec<(&str, Color)> = doc.shapes.iter().map(|s| (s.as_str(), Color::GREY)).collect();
        t.shapes = self.load_shapes(&shapes, create)?;

        for (name, shapes, values, interp, falloffs) in &doc.progressions {
            if shapes.len() != values.len() {
                return Err(malformed(format!(
                    "progression '{}' has {} shapes but {} values",
                    name,
                    shapes.len(),
                    values.len()
                )));
            }
            let pairs: Vec<(usize, f64)> = shapes.iter().copied().zip(values.iter().copied()).collect();
            let prog = self.load_progression(name, &pairs, *interp, falloffs, &t)?;
            t.progs.push(prog);
        }

        // Version 1 only names groups; each name becomes one group per
        // controller type that uses it.
        let mut groups: HashMap<(GroupKind, String), GroupId> = HashMap::new();
        let mut group_for = |sx: &mut Simplex, kind: GroupKind, name: &str| -> GroupId {
            *groups
                .entry((kind, name.to_string()))
                .or_insert_with(|| sx.load_group(name, kind, Color::GREY))
        };

        for (name, prog, group) in &doc.sliders {
            let prog = pick(&t.progs, *prog, "progressions")?;
            let group_name = pick_name(&doc.groups, *group)?;
            let group = group_for(self, GroupKind::Slider, group_name);
            let id = self.load_slider(name, prog, group, Color::GREY, create)?;
            t.sliders.push(id);
        }

        for combo in &doc.combos {
            let (name, prog, pairs, group_name) = match combo {
                LegacyCombo::Grouped(name, prog, pairs, group) => {
                    (name, *prog, pairs, pick_name(&doc.groups, *group)?)
                }
                LegacyCombo::Ungrouped(name, prog, pairs) => (name, *prog, pairs, "DEPTH_0"),
            };
            let prog = pick(&t.progs, prog, "progressions")?;
            let pairs = t
                .slider_pairs(pairs)?
                .into_iter()
                .map(|(s, v)| ComboPair::new(s, v))
                .collect();
            let group = group_for(self, GroupKind::Combo, group_name);
            let id = self.insert_combo(name, pairs, prog, group, None, Color::GREY)?;
            t.combos.push(id);
        }

        for trav in &doc.traversals {
            let group_name = pick_name(&doc.groups, trav.group)?;
            self.load_control_traversal(trav, &t, |sx, _| {
                Ok(group_for(sx, GroupKind::Traversal, group_name))
            })?;
        }

        self.finish_load(create)
    }

    fn load_falloff(&mut self, falloff: Falloff, create: bool) -> Result<FalloffId> {
        if !self.host.has_falloff(&falloff.name) {
            if !create {
                return Err(SimplexError::MissingHostObject {
                    kind: "falloff",
                    name: falloff.name.clone(),
                });
            }
            self.host.create_falloff(&falloff.name, &falloff.kind)?;
        }
        let id = self.graph.falloffs.insert(falloff);
        self.graph.falloff_list.push(id);
        Ok(id)
    }

    fn load_group(&mut self, name: &str, kind: GroupKind, color: Color) -> GroupId {
        let mut group = Group::new(name, kind);
        group.color = color;
        let id = self.graph.groups.insert(group);
        self.graph.group_list_mut(kind).push(id);
        id
    }

    /// Load shapes in file order. The first one is the rest shape.
    fn load_shapes(&mut self, shapes: &[(&str, Color)], create: bool) -> Result<Vec<ShapeId>> {
        if shapes.is_empty() {
            return Err(SimplexError::MissingRestShape {
                system: self.graph.name.clone(),
            });
        }
        let mut ids = Vec::with_capacity(shapes.len());
        for (i, &(name, color)) in shapes.iter().enumerate() {
            let is_rest = i == 0;
            let handle = match self.host.find_shape(name) {
                Some(handle) => handle,
                None if create => self.host.create_shape(name, is_rest)?,
                None => {
                    return Err(SimplexError::MissingHostObject {
                        kind: "shape",
                        name: name.to_string(),
                    })
                }
            };
            let mut shape = Shape::new(name, color);
            shape.is_rest = is_rest;
            shape.handle = Some(handle);
            let id = self.graph.shapes.insert(shape);
            self.graph.shape_list.push(id);
            ids.push(id);
        }
        self.graph.rest_shape = ids.first().copied();
        Ok(ids)
    }

    fn load_progression(
        &mut self,
        name: &str,
        pairs: &[(usize, f64)],
        interp: Interp,
        falloffs: &[usize],
        t: &Tables,
    ) -> Result<ProgId> {
        let pairs = pairs
            .iter()
            .map(|&(i, v)| Ok(ProgPair::new(pick(&t.shapes, i, "shapes")?, v)))
            .collect::<Result<Vec<_>>>()?;
        let falloffs = falloffs
            .iter()
            .map(|&i| pick(&t.falloffs, i, "falloffs"))
            .collect::<Result<Vec<_>>>()?;

        let mut prog = Progression::with_pairs(name, pairs);
        prog.interp = interp;
        prog.falloffs = falloffs.clone();
        let id = self.graph.progressions.insert(prog);
        for fo in falloffs {
            self.graph.falloffs[fo].children.push(id);
        }
        Ok(id)
    }

    fn load_slider(
        &mut self,
        name: &str,
        prog: ProgId,
        group: GroupId,
        color: Color,
        create: bool,
    ) -> Result<SliderId> {
        let handle = match self.host.find_slider(name) {
            Some(handle) => handle,
            None if create => self.host.create_slider(name)?,
            None => {
                return Err(SimplexError::MissingHostObject {
                    kind: "slider",
                    name: name.to_string(),
                })
            }
        };
        let id = self.insert_slider(name, prog, group, color)?;
        self.graph.sliders[id].handle = Some(handle);
        self.update_slider_range(id)?;
        Ok(id)
    }

    fn load_combo(&mut self, record: &ComboRecord, t: &Tables) -> Result<ComboId> {
        let prog = pick(&t.progs, record.prog, "progressions")?;
        let group = pick(&t.groups, record.group, "groups")?;
        let solve_type = SolveType::parse_option(record.solve_type.as_deref())?;
        let pairs = t
            .slider_pairs(&record.pairs)?
            .into_iter()
            .map(|(s, v)| ComboPair::new(s, v))
            .collect();
        let id = self.insert_combo(&record.name, pairs, prog, group, solve_type, record.color)?;
        self.graph.combos[id].enabled = record.enabled;
        Ok(id)
    }

    /// Version 3 traversal: both points over the sorted union of their
    /// slider indices.
    fn load_point_traversal(&mut self, record: &PointTraversal, t: &Tables) -> Result<()> {
        let prog = pick(&t.progs, record.prog, "progressions")?;
        let group = pick(&t.groups, record.group, "groups")?;

        let start: HashMap<usize, f64> = record.start.iter().copied().collect();
        let end: HashMap<usize, f64> = record.end.iter().copied().collect();
        let mut indices: Vec<usize> = start.keys().chain(end.keys()).copied().collect();
        indices.sort_unstable();
        indices.dedup();

        let mut start_pairs = Vec::with_capacity(indices.len());
        let mut end_pairs = Vec::with_capacity(indices.len());
        for i in indices {
            let slider = pick(&t.sliders, i, "sliders")?;
            start_pairs.push(TravPair::new(slider, start.get(&i).copied().unwrap_or(0.0)));
            end_pairs.push(TravPair::new(slider, end.get(&i).copied().unwrap_or(0.0)));
        }

        let id = self.insert_traversal(
            &record.name,
            TravPoint::new(start_pairs),
            TravPoint::new(end_pairs),
            prog,
            group,
            record.color,
        )?;
        self.graph.traversals[id].enabled = record.enabled;
        Ok(())
    }

    /// Versions 1 and 2: the progress control moves from zero to its value
    /// while the multiplier control holds its value at both ends.
    fn load_control_traversal(
        &mut self,
        record: &ControlTraversal,
        t: &Tables,
        mut group_for: impl FnMut(&mut Simplex, usize) -> Result<GroupId>,
    ) -> Result<()> {
        let prog = pick(&t.progs, record.prog, "progressions")?;
        let group = group_for(self, record.group)?;

        let mut ranges: Vec<(SliderId, (f64, f64))> = Vec::new();
        let mut set = |slider: SliderId, range: (f64, f64)| {
            match ranges.iter_mut().find(|(s, _)| *s == slider) {
                Some(entry) => entry.1 = range,
                None => ranges.push((slider, range)),
            }
        };

        let sign = |flip: bool| if flip { -1.0 } else { 1.0 };
        let progress = self.control_pairs(
            record.progress_type,
            record.progress_control,
            sign(record.progress_flip),
            t,
        )?;
        let multiplier = self.control_pairs(
            record.multiplier_type,
            record.multiplier_control,
            sign(record.multiplier_flip),
            t,
        )?;
        for (slider, value) in progress {
            set(slider, (0.0, value));
        }
        for (slider, value) in multiplier {
            set(slider, (value, value));
        }

        ranges.sort_by(|a, b| self.graph.sliders[a.0].name.cmp(&self.graph.sliders[b.0].name));
        let start = ranges.iter().map(|&(s, (v, _))| TravPair::new(s, v)).collect();
        let end = ranges.iter().map(|&(s, (_, v))| TravPair::new(s, v)).collect();

        let id = self.insert_traversal(
            &record.name,
            TravPoint::new(start),
            TravPoint::new(end),
            prog,
            group,
            record.color,
        )?;
        self.graph.traversals[id].enabled = record.enabled;
        Ok(())
    }

    /// The slider values a legacy traversal control stands for.
    fn control_pairs(
        &self,
        kind: ControlKind,
        index: usize,
        sign: f64,
        t: &Tables,
    ) -> Result<Vec<(SliderId, f64)>> {
        match kind {
            ControlKind::Slider => Ok(vec![(pick(&t.sliders, index, "sliders")?, sign)]),
            ControlKind::Combo => {
                let combo = pick(&t.combos, index, "combos")?;
                Ok(self.graph.combos[combo]
                    .pairs
                    .iter()
                    .map(|p| (p.slider, p.value))
                    .collect())
            }
        }
    }

    /// Name progressions after their controllers, drop progressions nothing
    /// controls and link falloffs on the host.
    fn finish_load(&mut self, create: bool) -> Result<()> {
        let named: Vec<(ProgId, String)> = self
            .graph
            .controllers()
            .map(|c| (self.graph.controller_prog(c), self.graph.controller_name(c).to_string()))
            .collect();
        for (prog, name) in named {
            self.graph.progressions[prog].name = name;
        }

        let orphans: Vec<ProgId> = self
            .graph
            .progressions
            .iter()
            .filter(|(_, p)| p.controller.is_none())
            .map(|(id, _)| id)
            .collect();
        for prog in orphans {
            debug!("Dropping uncontrolled progression '{}'", self.graph.progressions[prog].name);
            for (_, falloff) in self.graph.falloffs.iter_mut() {
                falloff.children.retain(|&p| p != prog);
            }
            self.graph.progressions.remove(prog);
        }

        if create {
            for &fo in &self.graph.falloff_list {
                let falloff = &self.graph.falloffs[fo];
                for &prog in &falloff.children {
                    self.host
                        .add_prog_falloff(&self.graph.progressions[prog].name, &falloff.name)?;
                }
            }
        }
        Ok(())
    }
}

fn pick_name(names: &[String], index: usize) -> Result<&str> {
    names
        .get(index)
        .map(String::as_str)
        .ok_or(SimplexError::IndexOutOfRange {
            kind: "groups",
            index,
            len: names.len(),
        })
}
