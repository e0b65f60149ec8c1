//! Falloffs: scalar weight fields used to split shapes into sides.
//!
//! A planar falloff ramps from 0 to 1 along one axis following a cubic
//! bezier whose x-control points are `(0, min_handle, max_handle, 1)` over
//! `[min_val, max_val]`. A map falloff carries externally painted weights.
//!
//! Names are split with axis tokens: an `X` field becomes `L`/`R`, a `V`
//! field becomes `U`/`D` and a `Z` field becomes `F`/`B`.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimplexError};
use crate::items::{Color, FalloffId, ItemId, Points, ProgId};
use crate::observer::ItemRef;
use crate::system::Simplex;

/// Field separator in rig names.
pub const SEP: char = '_';

/// Split axis of a falloff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    #[serde(rename = "X", alias = "x")]
    X,
    #[serde(rename = "Y", alias = "y")]
    Y,
    #[serde(rename = "Z", alias = "z")]
    Z,
}

impl Axis {
    /// Vertex component the axis reads.
    pub fn component(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Name token that marks an item as splittable on this axis.
    pub fn search_token(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "V",
            Axis::Z => "Z",
        }
    }

    /// Replacement token for each side.
    pub fn side_token(self, side: Side) -> &'static str {
        match (self, side) {
            (Axis::X, Side::First) => "L",
            (Axis::X, Side::Second) => "R",
            (Axis::Y, Side::First) => "U",
            (Axis::Y, Side::Second) => "D",
            (Axis::Z, Side::First) => "F",
            (Axis::Z, Side::Second) => "B",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
            Axis::Z => write!(f, "Z"),
        }
    }
}

impl FromStr for Axis {
    type Err = SimplexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            _ => Err(SimplexError::InvalidValue {
                field: "axis".to_string(),
                reason: format!("'{}' is not one of X, Y, Z", s),
            }),
        }
    }
}

/// One half of a split. The first side keeps the falloff weight, the second
/// side keeps its complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    First,
    Second,
}

/// Planar ramp parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanarFalloff {
    pub axis: Axis,
    pub min_val: f64,
    pub min_handle: f64,
    pub max_handle: f64,
    pub max_val: f64,
}

impl PlanarFalloff {
    pub fn new(axis: Axis, min_val: f64, min_handle: f64, max_handle: f64, max_val: f64) -> Self {
        Self {
            axis,
            min_val,
            min_handle,
            max_handle,
            max_val,
        }
    }

    /// Weight at position `x` along the axis.
    pub fn multiplier(&self, x: f64) -> f64 {
        if x <= self.min_val {
            return 0.0;
        }
        if x >= self.max_val {
            return 1.0;
        }
        let t = (x - self.min_val) / (self.max_val - self.min_val);
        let u = self.bezier().solve(t).clamp(0.0, 1.0);
        let v = 1.0 - u;
        3.0 * v * u * u + u * u * u
    }

    fn bezier(&self) -> Bezier {
        Bezier::new(self.min_handle, self.max_handle)
    }
}

/// Pre-factored inverse of the x-curve of the falloff bezier.
#[derive(Debug, Clone, Copy)]
struct Bezier {
    min_handle: f64,
    max_handle: f64,
    qq: f64,
    r: f64,
    d: f64,
    n: f64,
}

impl Bezier {
    fn new(min_handle: f64, max_handle: f64) -> Self {
        let f = min_handle;
        let g = 1.0 - max_handle;
        let d = 3.0 * f + 3.0 * g - 2.0;
        let n = 2.0 * f + g - 1.0;
        let r = (n * n - f * d) / (d * d);
        let qq = (3.0 * f * d * n - 2.0 * n * n * n) / (d * d * d);
        Self {
            min_handle,
            max_handle,
            qq,
            r,
            d,
            n,
        }
    }

    /// Curve parameter `u` such that `x(u) == t`.
    fn solve(&self, t: f64) -> f64 {
        if self.d.abs() < 1e-9 {
            return self.bisect(t);
        }
        let q = self.qq - t / self.d;
        let discriminant = q * q - 4.0 * self.r * self.r * self.r;
        let u = if discriminant >= 0.0 {
            let pm = discriminant.sqrt() / 2.0;
            let w = (-q / 2.0 + pm).cbrt();
            w + self.r / w
        } else {
            let theta = (-q / (2.0 * self.r.powf(1.5))).clamp(-1.0, 1.0).acos();
            let phi = theta / 3.0 + 4.0 * PI / 3.0;
            2.0 * self.r.sqrt() * phi.cos()
        };
        let u = u + self.n / self.d;
        if u.is_finite() {
            u
        } else {
            self.bisect(t)
        }
    }

    fn x_at(&self, u: f64) -> f64 {
        let v = 1.0 - u;
        3.0 * v * v * u * self.min_handle + 3.0 * v * u * u * self.max_handle + u * u * u
    }

    /// Numeric fallback for the degenerate near-linear handle pairs.
    fn bisect(&self, t: f64) -> f64 {
        let (mut lo, mut hi) = (0.0, 1.0);
        for _ in 0..64 {
            let mid = 0.5 * (lo + hi);
            if self.x_at(mid) < t {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }
}

/// The two falloff flavors.
#[derive(Debug, Clone, PartialEq)]
pub enum FalloffKind {
    Planar(PlanarFalloff),
    Map { map_name: String, axis: Option<Axis> },
}

/// A named weight field referenced by progressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Falloff {
    pub(crate) name: String,
    pub(crate) kind: FalloffKind,
    pub(crate) color: Color,
    /// Reverse index of the progressions using this falloff.
    pub(crate) children: Vec<ProgId>,
    verts: Option<Points>,
    weights: Option<Vec<f64>>,
}

impl Falloff {
    pub fn planar(name: impl Into<String>, planar: PlanarFalloff) -> Self {
        Self::with_kind(name, FalloffKind::Planar(planar))
    }

    pub fn map(name: impl Into<String>, map_name: impl Into<String>, axis: Option<Axis>) -> Self {
        Self::with_kind(
            name,
            FalloffKind::Map {
                map_name: map_name.into(),
                axis,
            },
        )
    }

    fn with_kind(name: impl Into<String>, kind: FalloffKind) -> Self {
        Self {
            name: name.into(),
            kind,
            color: Color::GREY,
            children: Vec::new(),
            verts: None,
            weights: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FalloffKind {
        &self.kind
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn children(&self) -> &[ProgId] {
        &self.children
    }

    pub fn is_map(&self) -> bool {
        matches!(self.kind, FalloffKind::Map { .. })
    }

    pub fn axis(&self) -> Option<Axis> {
        match &self.kind {
            FalloffKind::Planar(p) => Some(p.axis),
            FalloffKind::Map { axis, .. } => *axis,
        }
    }

    /// Weight at position `x`. Map falloffs have no analytic curve and
    /// always return 0.
    pub fn multiplier(&self, x: f64) -> f64 {
        match &self.kind {
            FalloffKind::Planar(p) => p.multiplier(x),
            FalloffKind::Map { .. } => 0.0,
        }
    }

    pub(crate) fn set_kind(&mut self, kind: FalloffKind) {
        self.kind = kind;
        self.invalidate();
    }

    pub fn verts(&self) -> Option<&Points> {
        self.verts.as_ref()
    }

    /// Assign the vertex buffer weights are computed from.
    pub fn set_verts(&mut self, verts: Points) {
        self.verts = Some(verts);
        self.invalidate();
    }

    /// Drop computed weights. Map weights are data, not a cache, and stay.
    pub fn invalidate(&mut self) {
        if !self.is_map() {
            self.weights = None;
        }
    }

    /// Store explicit per-vertex weights.
    pub fn set_weights(&mut self, weights: Vec<f64>) {
        self.weights = Some(weights);
    }

    /// Stored weights without computing anything.
    pub fn stored_weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    /// Per-vertex weights, computed from the vertex buffer on first use.
    pub fn weights(&mut self) -> Result<&[f64]> {
        if self.weights.is_none() {
            let computed = self.compute_weights()?;
            self.weights = Some(computed);
        }
        Ok(self.weights.as_deref().unwrap_or_default())
    }

    fn compute_weights(&self) -> Result<Vec<f64>> {
        let planar = match &self.kind {
            FalloffKind::Planar(p) => p,
            FalloffKind::Map { .. } => {
                return Err(SimplexError::FalloffWeights {
                    name: self.name.clone(),
                    reason: "map falloffs never compute their own weights".to_string(),
                })
            }
        };
        let verts = self
            .verts
            .as_ref()
            .ok_or_else(|| SimplexError::FalloffWeights {
                name: self.name.clone(),
                reason: "no vertices have been set".to_string(),
            })?;
        let component = planar.axis.component();
        Ok(verts.iter().map(|v| planar.multiplier(v[component])).collect())
    }

    /// `name` with this falloff's axis token replaced by the side's token.
    ///
    /// An interior `_X_` field is replaced everywhere, then a trailing `_X`
    /// and a leading `X_`. Without an axis the name comes back unchanged.
    pub fn sided_name(&self, name: &str, side: Side) -> String {
        match self.axis() {
            Some(axis) => sided_name(name, axis, side),
            None => name.to_string(),
        }
    }

    /// Whether splitting would change `name`.
    pub fn can_rename(&self, name: &str) -> bool {
        self.sided_name(name, Side::First) != name
    }

    /// Attenuate `verts` towards `rest` by this falloff's weights.
    pub fn apply(&mut self, rest: &Points, verts: &mut Points, side: Side) -> Result<()> {
        self.weights()?;
        let weights = self.weights.as_deref().unwrap_or_default();
        if weights.len() != verts.len() || rest.len() != verts.len() {
            return Err(SimplexError::FalloffWeights {
                name: self.name.clone(),
                reason: format!(
                    "vertex count mismatch: {} weights, {} rest, {} shape",
                    weights.len(),
                    rest.len(),
                    verts.len()
                ),
            });
        }
        for ((point, rest_point), &w) in verts.iter_mut().zip(rest).zip(weights) {
            let w = match side {
                Side::First => w,
                Side::Second => 1.0 - w,
            };
            for c in 0..3 {
                point[c] = rest_point[c] + (point[c] - rest_point[c]) * w;
            }
        }
        Ok(())
    }
}

/// Token substitution shared by every falloff on the same axis.
pub fn sided_name(name: &str, axis: Axis, side: Side) -> String {
    let search = axis.search_token();
    let replace = axis.side_token(side);

    let interior = format!("{SEP}{search}{SEP}");
    let mut out = name.replace(&interior, &format!("{SEP}{replace}{SEP}"));

    let suffix = format!("{SEP}{search}");
    if out.ends_with(&suffix) {
        if let Some(pos) = out.rfind(&suffix) {
            out.replace_range(pos.., &format!("{SEP}{replace}"));
        }
    }

    let prefix = format!("{search}{SEP}");
    if out.starts_with(&prefix) {
        out.replace_range(..prefix.len(), &format!("{replace}{SEP}"));
    }
    out
}

impl Simplex {
    /// Create a planar falloff.
    pub fn create_planar_falloff(&mut self, name: &str, planar: PlanarFalloff) -> Result<FalloffId> {
        self.add_falloff_entity(Falloff::planar(name, planar))
    }

    /// Create a map falloff referencing a host weight map.
    pub fn create_map_falloff(
        &mut self,
        name: &str,
        map_name: &str,
        axis: Option<Axis>,
    ) -> Result<FalloffId> {
        self.add_falloff_entity(Falloff::map(name, map_name, axis))
    }

    fn add_falloff_entity(&mut self, falloff: Falloff) -> Result<FalloffId> {
        self.transact(|sx| {
            if sx.graph.find_falloff(&falloff.name).is_some() {
                return Err(SimplexError::DuplicateName {
                    kind: "falloff",
                    name: falloff.name.clone(),
                });
            }
            sx.host.create_falloff(&falloff.name, &falloff.kind)?;
            let row = sx.graph.falloff_list.len();
            let _insert = sx.observers.inserting(ItemRef::System, row);
            let id = sx.graph.falloffs.insert(falloff);
            sx.graph.falloff_list.push(id);
            Ok(id)
        })
    }

    /// Copy a falloff's parameters under a new name. Progression links are
    /// not copied.
    pub fn duplicate_falloff(&mut self, id: FalloffId, name: &str) -> Result<FalloffId> {
        let source = self.graph.falloffs.require(id)?;
        let mut copy = Falloff::with_kind(name, source.kind.clone());
        copy.color = source.color;
        if source.is_map() {
            if let Some(weights) = source.stored_weights() {
                copy.set_weights(weights.to_vec());
            }
        }
        self.add_falloff_entity(copy)
    }

    pub fn rename_falloff(&mut self, id: FalloffId, name: &str) -> Result<()> {
        self.transact(|sx| {
            let old = sx.graph.falloffs.require(id)?.name.clone();
            sx.host.rename_falloff(&old, name)?;
            sx.graph.falloffs[id].name = name.to_string();
            sx.observers.data_changed(ItemRef::Item(ItemId::Falloff(id)));
            Ok(())
        })
    }

    pub fn set_falloff_color(&mut self, id: FalloffId, color: Color) -> Result<()> {
        self.transact(|sx| {
            sx.graph.falloffs.require_mut(id)?.color = color;
            sx.observers.data_changed(ItemRef::Item(ItemId::Falloff(id)));
            Ok(())
        })
    }

    /// Turn a falloff into a planar one with the given parameters.
    pub fn set_planar_data(&mut self, id: FalloffId, planar: PlanarFalloff) -> Result<()> {
        self.set_falloff_kind(id, FalloffKind::Planar(planar))
    }

    /// Turn a falloff into a map falloff.
    pub fn set_map_data(&mut self, id: FalloffId, map_name: &str) -> Result<()> {
        let axis = self.graph.falloffs.require(id)?.axis();
        self.set_falloff_kind(
            id,
            FalloffKind::Map {
                map_name: map_name.to_string(),
                axis,
            },
        )
    }

    fn set_falloff_kind(&mut self, id: FalloffId, kind: FalloffKind) -> Result<()> {
        self.transact(|sx| {
            let falloff = sx.graph.falloffs.require_mut(id)?;
            falloff.set_kind(kind);
            let (name, kind) = (falloff.name.clone(), falloff.kind.clone());
            sx.host.set_falloff_data(&name, &kind)?;
            sx.observers.data_changed(ItemRef::Item(ItemId::Falloff(id)));
            Ok(())
        })
    }

    /// Delete a falloff and clear every progression's reference to it.
    pub fn delete_falloff(&mut self, id: FalloffId) -> Result<()> {
        self.transact(|sx| {
            let name = sx.graph.falloffs.require(id)?.name.clone();
            let _remove = sx.observers.removing(ItemRef::Item(ItemId::Falloff(id)));
            sx.graph.forget(ItemId::Falloff(id));
            sx.host.delete_falloff(&name)?;
            Ok(())
        })
    }

    /// Assign the vertex buffer a falloff computes weights from.
    pub fn set_falloff_verts(&mut self, id: FalloffId, verts: Points) -> Result<()> {
        self.graph.falloffs.require_mut(id)?.set_verts(verts);
        Ok(())
    }

    /// Store explicit weights on a falloff (map falloffs get theirs this way).
    pub fn set_falloff_weights(&mut self, id: FalloffId, weights: Vec<f64>) -> Result<()> {
        self.graph.falloffs.require_mut(id)?.set_weights(weights);
        Ok(())
    }

    /// Per-vertex weights of a falloff.
    pub fn falloff_weights(&mut self, id: FalloffId) -> Result<Vec<f64>> {
        Ok(self.graph.falloffs.require_mut(id)?.weights()?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    fn smile_falloff() -> Falloff {
        Falloff::planar("Center", PlanarFalloff::new(Axis::X, -1.0, 0.33, 0.66, 1.0))
    }

    #[test]
    fn test_multiplier_clamps() {
        let planar = PlanarFalloff::new(Axis::X, -1.0, 0.33, 0.66, 1.0);
        for x in [-5.0, -1.5, -1.0] {
            assert_eq!(planar.multiplier(x), 0.0);
        }
        for x in [1.0, 1.5, 10.0] {
            assert_eq!(planar.multiplier(x), 1.0);
        }
    }

    #[test_case(0.33, 0.66; "near linear")]
    #[test_case(0.1, 0.9; "symmetric")]
    #[test_case(0.5, 0.5; "steep")]
    #[test_case(0.2, 0.3; "low handles")]
    #[test_case(0.8, 0.9; "high handles")]
    #[test_case(1.0 / 3.0, 2.0 / 3.0; "degenerate linear")]
    fn test_multiplier_monotonic(min_handle: f64, max_handle: f64) {
        let planar = PlanarFalloff::new(Axis::X, -1.0, min_handle, max_handle, 1.0);
        let mut last = 0.0;
        for i in 1..200 {
            let x = -1.0 + i as f64 / 100.0;
            let w = planar.multiplier(x);
            assert!(w.is_finite());
            assert!(w >= last - 1e-9, "not monotonic at {x}: {w} < {last}");
            assert!((0.0..=1.0).contains(&w));
            last = w;
        }
    }

    #[test]
    fn test_multiplier_symmetric_midpoint() {
        let planar = PlanarFalloff::new(Axis::X, -1.0, 0.1, 0.9, 1.0);
        assert_relative_eq!(planar.multiplier(0.0), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_multiplier_matches_reference_values() {
        let planar = PlanarFalloff::new(Axis::X, -1.0, 0.33, 0.66, 1.0);
        assert_relative_eq!(planar.multiplier(-0.5), 0.1589, epsilon = 1e-3);
        assert_relative_eq!(planar.multiplier(0.5), 0.8474, epsilon = 1e-3);
    }

    #[test_case("Smile_X_", Axis::X, Side::First, "Smile_L_")]
    #[test_case("Smile_X_", Axis::X, Side::Second, "Smile_R_")]
    #[test_case("Brow_X", Axis::X, Side::First, "Brow_L")]
    #[test_case("X_Brow", Axis::X, Side::Second, "R_Brow")]
    #[test_case("Lid_V_Close", Axis::Y, Side::First, "Lid_U_Close")]
    #[test_case("Lip_Z", Axis::Z, Side::Second, "Lip_B")]
    #[test_case("JawOpen", Axis::X, Side::First, "JawOpen")]
    #[test_case("Lid_X_Close", Axis::Y, Side::First, "Lid_X_Close")]
    fn test_sided_name(name: &str, axis: Axis, side: Side, expected: &str) {
        assert_eq!(sided_name(name, axis, side), expected);
    }

    #[test]
    fn test_can_rename() {
        let fo = smile_falloff();
        assert!(fo.can_rename("Smile_X_"));
        assert!(!fo.can_rename("Smile"));
        assert!(!fo.can_rename("Rest_Face"));
    }

    #[test]
    fn test_weights_cache_invalidation() {
        let mut fo = smile_falloff();
        assert!(fo.weights().is_err());

        fo.set_verts(vec![[-2.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
        assert_eq!(fo.weights().unwrap(), &[0.0, 1.0]);

        fo.set_verts(vec![[2.0, 0.0, 0.0]]);
        assert_eq!(fo.weights().unwrap(), &[1.0]);
    }

    #[test]
    fn test_map_falloff_never_computes() {
        let mut fo = Falloff::map("Paint", "paintMap", Some(Axis::X));
        fo.set_verts(vec![[0.0, 0.0, 0.0]]);
        assert!(fo.weights().is_err());

        fo.set_weights(vec![0.25]);
        fo.set_verts(vec![[1.0, 0.0, 0.0]]);
        assert_eq!(fo.weights().unwrap(), &[0.25]);
    }

    #[test]
    fn test_apply_attenuates_deltas() {
        let mut fo = smile_falloff();
        let rest = vec![[-2.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        fo.set_verts(rest.clone());

        let mut first = vec![[-2.0, 1.0, 0.0], [2.0, 1.0, 0.0]];
        let mut second = first.clone();
        fo.apply(&rest, &mut first, Side::First).unwrap();
        fo.apply(&rest, &mut second, Side::Second).unwrap();

        assert_eq!(first, vec![[-2.0, 0.0, 0.0], [2.0, 1.0, 0.0]]);
        assert_eq!(second, vec![[-2.0, 1.0, 0.0], [2.0, 0.0, 0.0]]);
    }
}
