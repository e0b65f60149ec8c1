//! Traversals: correctives driven along a path between two points in
//! slider space.
//!
//! A point is a sparse set of slider values; a slider missing from a point
//! sits at zero there. Both points of a traversal are kept over the same
//! slider universe.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::debug;

use crate::error::{Result, SimplexError};
use crate::items::{
    Axis, Color, Controller, GroupId, GroupKind, ItemId, ProgId, ProgPair, Progression, SliderId,
    TraversalId,
};
use crate::observer::ItemRef;
use crate::system::Simplex;

/// Values closer to zero than this snap to zero when a slider is added.
const CEILING_EPS: f64 = 0.001;

/// Per-slider `(start, end)` values of a traversal.
pub type TravRanges = BTreeMap<SliderId, (f64, f64)>;

/// Which end of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TravSide {
    Start,
    End,
}

impl TravSide {
    pub fn row(self) -> usize {
        match self {
            TravSide::Start => 0,
            TravSide::End => 1,
        }
    }
}

impl fmt::Display for TravSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TravSide::Start => write!(f, "START"),
            TravSide::End => write!(f, "END"),
        }
    }
}

/// A slider at a value within one traversal point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravPair {
    pub slider: SliderId,
    pub value: f64,
}

impl TravPair {
    pub fn new(slider: SliderId, value: f64) -> Self {
        Self { slider, value }
    }
}

/// One end of a traversal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TravPoint {
    pub(crate) pairs: Vec<TravPair>,
}

impl TravPoint {
    pub fn new(pairs: Vec<TravPair>) -> Self {
        Self { pairs }
    }

    pub fn pairs(&self) -> &[TravPair] {
        &self.pairs
    }

    pub fn sliders(&self) -> Vec<SliderId> {
        self.pairs.iter().map(|p| p.slider).collect()
    }

    /// Value of `slider` at this point; absent sliders are at zero.
    pub fn value_of(&self, slider: SliderId) -> f64 {
        self.pairs
            .iter()
            .find(|p| p.slider == slider)
            .map_or(0.0, |p| p.value)
    }

    fn index_of(&self, slider: SliderId) -> Option<usize> {
        self.pairs.iter().position(|p| p.slider == slider)
    }

    /// Snap a value to -1, 0 or 1.
    fn wide_ceiling(value: f64) -> f64 {
        if value > CEILING_EPS {
            1.0
        } else if value < -CEILING_EPS {
            -1.0
        } else {
            0.0
        }
    }
}

/// A progression driven from `start` (0) to `end` (1).
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    pub(crate) name: String,
    pub(crate) start: TravPoint,
    pub(crate) end: TravPoint,
    pub(crate) prog: ProgId,
    pub(crate) group: GroupId,
    pub(crate) color: Color,
    pub(crate) enabled: bool,
    pub(crate) split_applied: BTreeSet<Axis>,
}

impl Traversal {
    pub(crate) fn new(
        name: impl Into<String>,
        start: TravPoint,
        end: TravPoint,
        prog: ProgId,
        group: GroupId,
    ) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            prog,
            group,
            color: Color::GREY,
            enabled: true,
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

    pub fn start(&self) -> &TravPoint {
        &self.start
    }

    pub fn end(&self) -> &TravPoint {
        &self.end
    }

    pub fn point(&self, side: TravSide) -> &TravPoint {
        match side {
            TravSide::Start => &self.start,
            TravSide::End => &self.end,
        }
    }

    pub(crate) fn point_mut(&mut self, side: TravSide) -> &mut TravPoint {
        match side {
            TravSide::Start => &mut self.start,
            TravSide::End => &mut self.end,
        }
    }

    /// Start sliders first, then any only mentioned at the end.
    pub fn all_sliders(&self) -> Vec<SliderId> {
        let mut sliders = self.start.sliders();
        for p in &self.end.pairs {
            if !sliders.contains(&p.slider) {
                sliders.push(p.slider);
            }
        }
        sliders
    }

    pub fn has_slider(&self, slider: SliderId) -> bool {
        self.start.index_of(slider).is_some() || self.end.index_of(slider).is_some()
    }

    pub fn ranges(&self) -> TravRanges {
        self.all_sliders()
            .into_iter()
            .map(|s| (s, (self.start.value_of(s), self.end.value_of(s))))
            .collect()
    }

    /// Sliders that move between the two points.
    pub fn dynamic_sliders(&self) -> Vec<SliderId> {
        self.ranges()
            .into_iter()
            .filter(|(_, (s, e))| s != e)
            .map(|(slider, _)| slider)
            .collect()
    }

    /// Sliders held at the same value at both points.
    pub fn static_sliders(&self) -> Vec<SliderId> {
        self.ranges()
            .into_iter()
            .filter(|(_, (s, e))| s == e)
            .map(|(slider, _)| slider)
            .collect()
    }
}

/// Both points over one slider universe, in first-mention order.
pub(crate) fn aligned_points(start: &[(SliderId, f64)], end: &[(SliderId, f64)]) -> (TravPoint, TravPoint) {
    let mut order: Vec<SliderId> = Vec::new();
    for &(slider, _) in start.iter().chain(end) {
        if !order.contains(&slider) {
            order.push(slider);
        }
    }
    let lookup = |pairs: &[(SliderId, f64)], slider: SliderId| {
        pairs.iter().find(|p| p.0 == slider).map_or(0.0, |p| p.1)
    };
    let build = |pairs: &[(SliderId, f64)]| {
        TravPoint::new(
            order
                .iter()
                .map(|&s| TravPair::new(s, lookup(pairs, s)))
                .collect(),
        )
    };
    (build(start), build(end))
}

impl Simplex {
    /// The traversal with exactly these per-slider ranges, if any.
    pub fn traversal_exists(&self, ranges: &TravRanges) -> Option<TraversalId> {
        self.graph
            .traversal_list
            .iter()
            .copied()
            .find(|&t| &self.graph.traversals[t].ranges() == ranges)
    }

    /// Suggested name for a traversal over `ranges`.
    ///
    /// Static sliders come first, then dynamic ones prefixed with `Dy`, each
    /// set in slider-name order. Sliders held at zero, or with no shape at
    /// the relevant value, are skipped.
    pub fn build_traversal_name(&self, ranges: &TravRanges) -> Result<String> {
        let mut fixed = Vec::new();
        let mut moving = Vec::new();
        for (&slider, &range) in ranges {
            let s = self.graph.sliders.require(slider)?;
            if range.0 == range.1 {
                fixed.push((s, range));
            } else {
                moving.push((s, range));
            }
        }
        fixed.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        moving.sort_by(|a, b| a.0.name.cmp(&b.0.name));

        let stripped_at = |prog: ProgId, value: f64| {
            self.graph.progressions[prog]
                .shape_at_value(value)
                .map(|shape| self.graph.shapes[shape].stripped_name())
        };

        let mut parts: Vec<String> = Vec::new();
        for (slider, (start, _)) in fixed {
            if start == 0.0 {
                continue;
            }
            if let Some(name) = stripped_at(slider.prog, start) {
                parts.push(name);
            }
        }
        for (slider, (start, end)) in moving {
            let name = if start == 0.0 {
                stripped_at(slider.prog, end)
            } else if end == 0.0 {
                stripped_at(slider.prog, start)
            } else {
                Some(slider.name.clone())
            };
            if let Some(name) = name {
                parts.push("Dy".to_string());
                parts.push(name);
            }
        }
        Ok(format!("Tv_{}", parts.join("_")))
    }

    /// Create a traversal between two slider-space points.
    ///
    /// The traversal goes to `group`, else to `TRAVERSALS`. Its progression
    /// gets `count` evenly spaced shapes named `{name}_{pct}`, each zeroed on
    /// the host.
    pub fn create_traversal(
        &mut self,
        name: &str,
        start: &[(SliderId, f64)],
        end: &[(SliderId, f64)],
        group: Option<GroupId>,
        count: usize,
    ) -> Result<TraversalId> {
        self.transact(|sx| {
            let rest = sx.graph.rest_shape()?;
            if start.is_empty() && end.is_empty() {
                return Err(SimplexError::InvalidValue {
                    field: "traversal points".to_string(),
                    reason: format!("traversal '{}' needs at least one slider", name),
                });
            }
            for &(slider, _) in start.iter().chain(end) {
                sx.graph.sliders.require(slider)?;
            }
            if let Some(group) = group {
                sx.check_group_kind(group, GroupKind::Traversal, name)?;
            }
            let group = match group {
                Some(group) => group,
                None => sx.group_named("TRAVERSALS", GroupKind::Traversal)?,
            };

            let (start, end) = aligned_points(start, end);
            let prog = sx
                .graph
                .progressions
                .insert(Progression::with_pairs(name, vec![ProgPair::new(rest, 0.0)]));
            let id = sx.insert_traversal(name, start, end, prog, group, Color::GREY)?;

            for c in (0..count).rev() {
                let pct = 100 * (c + 1) / count;
                let shape_name = format!("{}_{}", name, pct);
                let shape = sx.create_prog_shape(prog, Some(&shape_name), Some(pct as f64 / 100.0))?;
                sx.zero_shape(shape)?;
            }
            debug!("Created traversal '{}' with {} shapes", name, count);
            Ok(id)
        })
    }

    /// Graph-side traversal insertion shared by creation and loading.
    pub(crate) fn insert_traversal(
        &mut self,
        name: &str,
        start: TravPoint,
        end: TravPoint,
        prog: ProgId,
        group: GroupId,
        color: Color,
    ) -> Result<TraversalId> {
        self.check_group_kind(group, GroupKind::Traversal, name)?;
        let mut trav = Traversal::new(name, start, end, prog, group);
        trav.color = color;

        let row = self.graph.groups[group].items.len();
        let _insert = self.observers.inserting(group.into(), row);
        let id = self.graph.traversals.insert(trav);
        self.graph.progressions[prog].controller = Some(Controller::Traversal(id));
        self.graph.groups[group].items.push(Controller::Traversal(id));
        self.graph.traversal_list.push(id);
        Ok(id)
    }

    /// Add a slider to both points: at zero on the start, at its current
    /// value snapped to -1, 0 or 1 on the end.
    pub fn traversal_add_slider(&mut self, id: TraversalId, slider: SliderId) -> Result<()> {
        self.transact(|sx| {
            let live = sx.graph.sliders.require(slider)?.value;
            sx.graph.traversals.require(id)?;
            sx.set_point_slider(id, TravSide::Start, slider, 0.0);
            sx.set_point_slider(id, TravSide::End, slider, TravPoint::wide_ceiling(live));
            Ok(())
        })
    }

    fn set_point_slider(&mut self, id: TraversalId, side: TravSide, slider: SliderId, value: f64) {
        let point = self.graph.traversals[id].point(side);
        match point.index_of(slider) {
            Some(row) => {
                self.graph.traversals[id].point_mut(side).pairs[row].value = value;
                self.observers.data_changed(ItemRef::TravPair {
                    traversal: id,
                    point: side,
                    row,
                });
            }
            None => {
                let row = point.pairs.len();
                let _insert = self.observers.inserting(
                    ItemRef::TravPoint {
                        traversal: id,
                        point: side,
                    },
                    row,
                );
                self.graph.traversals[id]
                    .point_mut(side)
                    .pairs
                    .push(TravPair::new(slider, value));
            }
        }
    }

    /// Remove every pair that uses one of `sliders`, from both points.
    pub fn remove_traversal_pairs(&mut self, id: TraversalId, sliders: &[SliderId]) -> Result<()> {
        self.transact(|sx| {
            sx.graph.traversals.require(id)?;
            for side in [TravSide::Start, TravSide::End] {
                while let Some(row) = sx.graph.traversals[id]
                    .point(side)
                    .pairs
                    .iter()
                    .position(|p| sliders.contains(&p.slider))
                {
                    let _remove = sx.observers.removing(ItemRef::TravPair {
                        traversal: id,
                        point: side,
                        row,
                    });
                    sx.graph.traversals[id].point_mut(side).pairs.remove(row);
                }
            }
            Ok(())
        })
    }

    /// Set one slider's value at one point, adding the pair if needed.
    pub fn set_trav_point_value(
        &mut self,
        id: TraversalId,
        side: TravSide,
        slider: SliderId,
        value: f64,
    ) -> Result<()> {
        self.transact(|sx| {
            sx.graph.traversals.require(id)?;
            sx.graph.sliders.require(slider)?;
            sx.set_point_slider(id, side, slider, value);
            Ok(())
        })
    }

    pub fn rename_traversal(&mut self, id: TraversalId, name: &str) -> Result<()> {
        self.transact(|sx| {
            sx.graph.traversals.require(id)?;
            sx.graph.set_controller_name(Controller::Traversal(id), name);
            sx.observers.data_changed(ItemId::Traversal(id).into());
            Ok(())
        })
    }

    pub fn set_traversal_color(&mut self, id: TraversalId, color: Color) -> Result<()> {
        self.transact(|sx| {
            sx.graph.traversals.require_mut(id)?.color = color;
            sx.observers.data_changed(ItemId::Traversal(id).into());
            Ok(())
        })
    }

    pub fn set_traversal_enabled(&mut self, id: TraversalId, enabled: bool) -> Result<()> {
        self.transact(|sx| {
            sx.graph.traversals.require_mut(id)?.enabled = enabled;
            sx.observers.data_changed(ItemId::Traversal(id).into());
            Ok(())
        })
    }

    pub fn delete_traversal(&mut self, id: TraversalId) -> Result<()> {
        self.transact(|sx| {
            debug!("Deleting traversal '{}'", sx.graph.traversals.require(id)?.name);
            sx.discard_controller(Controller::Traversal(id))
        })
    }
}
