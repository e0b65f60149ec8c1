//! Progressions: the ordered shape targets of one controller.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimplexError};
use crate::items::{next_name, Axis, Color, Controller, FalloffId, ItemId, ProgId, Shape, ShapeId};
use crate::observer::ItemRef;
use crate::system::Simplex;

/// Two values closer than this address the same pair.
pub const VALUE_TOLERANCE: f64 = 1.0e-4;

/// Interpolation between neighbouring shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interp {
    Linear,
    #[default]
    Spline,
    /// Separate splines for the positive and negative halves.
    SplitSpline,
}

impl fmt::Display for Interp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interp::Linear => write!(f, "linear"),
            Interp::Spline => write!(f, "spline"),
            Interp::SplitSpline => write!(f, "splitspline"),
        }
    }
}

/// A shape at a controller value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgPair {
    pub shape: ShapeId,
    pub value: f64,
}

impl ProgPair {
    pub fn new(shape: ShapeId, value: f64) -> Self {
        Self { shape, value }
    }
}

/// Ordered (shape, value) pairs plus interpolation and falloffs.
#[derive(Debug, Clone, PartialEq)]
pub struct Progression {
    pub(crate) name: String,
    /// Always sorted by value.
    pub(crate) pairs: Vec<ProgPair>,
    pub(crate) interp: Interp,
    pub(crate) falloffs: Vec<FalloffId>,
    pub(crate) controller: Option<Controller>,
    pub(crate) split_applied: BTreeSet<Axis>,
}

impl Progression {
    /// A progression holding only the rest pair.
    pub fn new(name: impl Into<String>, rest: ShapeId) -> Self {
        Self::with_pairs(name, vec![ProgPair::new(rest, 0.0)])
    }

    pub fn with_pairs(name: impl Into<String>, mut pairs: Vec<ProgPair>) -> Self {
        sort_pairs(&mut pairs);
        Self {
            name: name.into(),
            pairs,
            interp: Interp::default(),
            falloffs: Vec::new(),
            controller: None,
            split_applied: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pairs(&self) -> &[ProgPair] {
        &self.pairs
    }

    pub fn interp(&self) -> Interp {
        self.interp
    }

    pub fn falloffs(&self) -> &[FalloffId] {
        &self.falloffs
    }

    pub fn controller(&self) -> Option<Controller> {
        self.controller
    }

    pub fn values(&self) -> Vec<f64> {
        self.pairs.iter().map(|p| p.value).collect()
    }

    pub fn shapes(&self) -> Vec<ShapeId> {
        self.pairs.iter().map(|p| p.shape).collect()
    }

    pub fn has_shape(&self, shape: ShapeId) -> bool {
        self.pairs.iter().any(|p| p.shape == shape)
    }

    pub fn shape_index(&self, shape: ShapeId) -> Option<usize> {
        self.pairs.iter().position(|p| p.shape == shape)
    }

    /// Row a pair with `value` would be inserted at to keep the order.
    pub fn insert_index(&self, value: f64) -> usize {
        self.pairs.partition_point(|p| p.value <= value)
    }

    /// Insert a pair in value order and return its row.
    pub(crate) fn insert_pair(&mut self, pair: ProgPair) -> usize {
        let idx = self.insert_index(pair.value);
        self.pairs.insert(idx, pair);
        idx
    }

    pub(crate) fn resort(&mut self) {
        sort_pairs(&mut self.pairs);
    }

    /// Shape sitting at `value`, if any.
    pub fn shape_at_value(&self, value: f64) -> Option<ShapeId> {
        self.pairs
            .iter()
            .find(|p| (p.value - value).abs() < VALUE_TOLERANCE)
            .map(|p| p.shape)
    }

    /// A sensible value for the next shape: an unused intermediate or
    /// negative stop, falling back to 1.
    pub fn guess_next_value(&self) -> f64 {
        let values = self.values();
        let (min, max) = self.range();
        let candidates: &[f64] = if min == 0.0 && max == 1.0 {
            &[0.5, 0.25, 0.75, -1.0]
        } else if min == -1.0 && max == 1.0 {
            &[0.5, -0.5, 0.25, -0.25, 0.75, -0.75]
        } else {
            &[]
        };
        candidates
            .iter()
            .copied()
            .find(|c| !values.contains(c))
            .unwrap_or(1.0)
    }

    /// Smallest and largest pair values.
    pub fn range(&self) -> (f64, f64) {
        self.pairs.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
            (lo.min(p.value), hi.max(p.value))
        })
    }

    /// Pairs at exactly -1 or 1.
    pub fn extreme_pairs(&self) -> Vec<ProgPair> {
        self.pairs
            .iter()
            .filter(|p| p.value.abs() == 1.0)
            .copied()
            .collect()
    }
}

fn sort_pairs(pairs: &mut [ProgPair]) {
    pairs.sort_by(|a, b| a.value.total_cmp(&b.value));
}

/// Default name for a new shape of controller `ctrl` at `value`.
///
/// Full activations use the controller name; everything else gets a
/// percentage field, with an `n` prefix for negative values.
pub fn default_shape_name(ctrl: &str, value: f64) -> String {
    if value.abs() == 1.0 {
        ctrl.to_string()
    } else {
        let neg = if value < 0.0 { "n" } else { "" };
        format!("{}_{}{}", ctrl, neg, (value.abs() * 100.0) as i64)
    }
}

impl Simplex {
    /// Create a blank shape on the host and in the shape list.
    pub(crate) fn spawn_shape(&mut self, name: &str) -> Result<ShapeId> {
        let handle = self.host.create_shape(name, false)?;
        let mut shape = Shape::new(name, Color::GREY);
        shape.handle = Some(handle);
        let id = self.graph.shapes.insert(shape);
        self.graph.shape_list.push(id);
        Ok(id)
    }

    /// Add a new shape to a progression.
    ///
    /// Without a value the next free stop is guessed; without a name one is
    /// derived from the controller and made unique.
    pub fn create_prog_shape(
        &mut self,
        prog: ProgId,
        name: Option<&str>,
        value: Option<f64>,
    ) -> Result<ShapeId> {
        self.transact(|sx| {
            let p = sx.graph.progressions.require(prog)?;
            let value = value.unwrap_or_else(|| p.guess_next_value());
            let name = match name {
                Some(name) => name.to_string(),
                None => {
                    let base = default_shape_name(&p.name, value);
                    next_name(&base, sx.graph.shape_names())
                }
            };
            let shape = sx.spawn_shape(&name)?;
            let row = sx.graph.progressions[prog].insert_index(value);
            {
                let _insert = sx.observers.inserting(ItemId::Progression(prog).into(), row);
                sx.graph.progressions[prog].insert_pair(ProgPair::new(shape, value));
            }
            sx.refresh_controller_range(prog)?;
            Ok(shape)
        })
    }

    /// Remove a shape from a progression. Non-rest shapes that end up
    /// unused are deleted from the system and the host.
    pub fn delete_prog_shape(&mut self, prog: ProgId, shape: ShapeId) -> Result<()> {
        self.transact(|sx| {
            let row = sx
                .graph
                .progressions
                .require(prog)?
                .shape_index(shape)
                .ok_or_else(|| SimplexError::UnknownItem {
                    kind: "progression pair",
                    name: format!("{} in {}", shape, prog),
                })?;
            {
                let _remove = sx.observers.removing(ItemRef::ProgPair { prog, row });
                sx.graph.progressions[prog].pairs.remove(row);
            }
            sx.release_shape(shape)?;
            sx.refresh_controller_range(prog)
        })
    }

    /// Delete a non-rest shape nothing refers to any more.
    pub(crate) fn release_shape(&mut self, shape: ShapeId) -> Result<()> {
        let Some(s) = self.graph.shapes.get(shape) else {
            return Ok(());
        };
        if s.is_rest || self.graph.shape_use_count(shape) > 0 {
            return Ok(());
        }
        let handle = s.handle.clone();
        let _remove = self.observers.removing(ItemId::Shape(shape).into());
        self.graph.forget(ItemId::Shape(shape));
        if let Some(handle) = handle {
            self.host.delete_shape(&handle)?;
        }
        Ok(())
    }

    /// Move one pair to a new value, keeping the pairs ordered.
    pub fn set_pair_value(&mut self, prog: ProgId, shape: ShapeId, value: f64) -> Result<()> {
        self.transact(|sx| {
            let p = sx.graph.progressions.require_mut(prog)?;
            let row = p.shape_index(shape).ok_or_else(|| SimplexError::UnknownItem {
                kind: "progression pair",
                name: format!("{} in {}", shape, prog),
            })?;
            p.pairs[row].value = value;
            p.resort();
            sx.observers.data_changed(ItemId::Progression(prog).into());
            sx.refresh_controller_range(prog)
        })
    }

    /// Assign values to the pairs in their current order.
    pub fn set_prog_values(&mut self, prog: ProgId, values: &[f64]) -> Result<()> {
        self.transact(|sx| {
            let p = sx.graph.progressions.require_mut(prog)?;
            for (pair, &value) in p.pairs.iter_mut().zip(values) {
                pair.value = value;
            }
            p.resort();
            for row in 0..p.pairs.len() {
                sx.observers.data_changed(ItemRef::ProgPair { prog, row });
            }
            sx.refresh_controller_range(prog)
        })
    }

    pub fn set_interp(&mut self, prog: ProgId, interp: Interp) -> Result<()> {
        self.transact(|sx| {
            sx.graph.progressions.require_mut(prog)?.interp = interp;
            sx.observers.data_changed(ItemId::Progression(prog).into());
            Ok(())
        })
    }

    /// Link a falloff to a progression. Linking twice is a no-op.
    pub fn add_falloff(&mut self, prog: ProgId, falloff: FalloffId) -> Result<()> {
        self.transact(|sx| {
            let fo_name = sx.graph.falloffs.require(falloff)?.name.clone();
            let p = sx.graph.progressions.require_mut(prog)?;
            if p.falloffs.contains(&falloff) {
                return Ok(());
            }
            p.falloffs.push(falloff);
            let prog_name = p.name.clone();
            sx.graph.falloffs[falloff].children.push(prog);
            sx.host.add_prog_falloff(&prog_name, &fo_name)?;
            sx.observers.data_changed(ItemId::Progression(prog).into());
            Ok(())
        })
    }

    pub fn remove_falloff(&mut self, prog: ProgId, falloff: FalloffId) -> Result<()> {
        self.transact(|sx| {
            let fo_name = sx.graph.falloffs.require(falloff)?.name.clone();
            let p = sx.graph.progressions.require_mut(prog)?;
            if !p.falloffs.contains(&falloff) {
                return Ok(());
            }
            p.falloffs.retain(|&f| f != falloff);
            let prog_name = p.name.clone();
            sx.graph.falloffs[falloff].children.retain(|&child| child != prog);
            sx.host.remove_prog_falloff(&prog_name, &fo_name)?;
            sx.observers.data_changed(ItemId::Progression(prog).into());
            Ok(())
        })
    }

    /// Push a slider's range after its progression changed.
    pub(crate) fn refresh_controller_range(&mut self, prog: ProgId) -> Result<()> {
        match self.graph.progressions.require(prog)?.controller {
            Some(Controller::Slider(slider)) => self.update_slider_range(slider),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::ArenaId;

    fn shape(i: usize) -> ShapeId {
        ShapeId::from_index(i)
    }

    fn prog(values: &[f64]) -> Progression {
        let pairs = values
            .iter()
            .enumerate()
            .map(|(i, &v)| ProgPair::new(shape(i), v))
            .collect();
        Progression::with_pairs("Smile", pairs)
    }

    #[test]
    fn test_pairs_sorted_on_creation() {
        let p = prog(&[1.0, 0.0, -1.0, 0.5]);
        assert_eq!(p.values(), vec![-1.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_insert_pair_keeps_order() {
        let mut p = prog(&[0.0, 1.0]);
        assert_eq!(p.insert_pair(ProgPair::new(shape(5), 0.5)), 1);
        assert_eq!(p.insert_pair(ProgPair::new(shape(6), -1.0)), 0);
        assert_eq!(p.insert_pair(ProgPair::new(shape(7), 2.0)), 4);
        assert_eq!(p.values(), vec![-1.0, 0.0, 0.5, 1.0, 2.0]);
    }

    #[test]
    fn test_guess_next_value() {
        assert_eq!(prog(&[0.0, 1.0]).guess_next_value(), 0.5);
        assert_eq!(prog(&[0.0, 0.5, 1.0]).guess_next_value(), 0.25);
        assert_eq!(prog(&[0.0, 0.25, 0.5, 0.75, 1.0]).guess_next_value(), -1.0);
        assert_eq!(prog(&[-1.0, 0.0, 0.5, 1.0]).guess_next_value(), -0.5);
        assert_eq!(prog(&[0.0]).guess_next_value(), 1.0);
    }

    #[test]
    fn test_shape_at_value_tolerance() {
        let p = prog(&[0.0, 0.5, 1.0]);
        assert_eq!(p.shape_at_value(0.50005), Some(shape(1)));
        assert_eq!(p.shape_at_value(0.6), None);
    }

    #[test]
    fn test_extremes_and_range() {
        let p = prog(&[-1.0, 0.0, 0.5, 1.0]);
        assert_eq!(p.range(), (-1.0, 1.0));
        let extremes: Vec<f64> = p.extreme_pairs().iter().map(|p| p.value).collect();
        assert_eq!(extremes, vec![-1.0, 1.0]);
    }

    #[test]
    fn test_default_shape_name() {
        assert_eq!(default_shape_name("Smile", 1.0), "Smile");
        assert_eq!(default_shape_name("Smile", -1.0), "Smile");
        assert_eq!(default_shape_name("Smile", 0.5), "Smile_50");
        assert_eq!(default_shape_name("Smile", -0.25), "Smile_n25");
    }

    #[test]
    fn test_interp_serde() {
        assert_eq!(serde_json::to_string(&Interp::SplitSpline).unwrap(), "\"splitspline\"");
        let interp: Interp = serde_json::from_str("\"linear\"").unwrap();
        assert_eq!(interp, Interp::Linear);
    }
}
