//! Combos: correctives that fire when several sliders are active together.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SimplexError};
use crate::items::shape::is_number_field;
use crate::items::{
    Axis, Color, ComboId, Controller, GroupId, GroupKind, ItemId, ProgId, ProgPair, Progression,
    ShapeId, SliderId,
};
use crate::observer::ItemRef;
use crate::system::Simplex;

/// A slider at an activation value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComboPair {
    pub slider: SliderId,
    pub value: f64,
}

impl ComboPair {
    pub fn new(slider: SliderId, value: f64) -> Self {
        Self { slider, value }
    }
}

/// How the solver blends a combo's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolveType {
    Min,
    AllMul,
    ExtMul,
    MulAvgExt,
    MulAvgAll,
}

impl SolveType {
    pub const ALL: [SolveType; 5] = [
        SolveType::Min,
        SolveType::AllMul,
        SolveType::ExtMul,
        SolveType::MulAvgExt,
        SolveType::MulAvgAll,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SolveType::Min => "min",
            SolveType::AllMul => "allMul",
            SolveType::ExtMul => "extMul",
            SolveType::MulAvgExt => "mulAvgExt",
            SolveType::MulAvgAll => "mulAvgAll",
        }
    }

    /// Definition-file spelling of an optional solve type. An unset solve
    /// type is written as `"None"`.
    pub fn option_str(solve: Option<SolveType>) -> &'static str {
        solve.map_or("None", SolveType::as_str)
    }

    /// Parse a definition-file solve type; `"None"`, `""` and `null` unset it.
    pub fn parse_option(value: Option<&str>) -> Result<Option<SolveType>> {
        match value {
            None | Some("None") | Some("") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }
}

impl fmt::Display for SolveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SolveType {
    type Err = SimplexError;

    fn from_str(s: &str) -> Result<Self> {
        SolveType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SimplexError::InvalidSolveType {
                value: s.to_string(),
            })
    }
}

impl Serialize for SolveType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SolveType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A corrective gated on several sliders at once.
#[derive(Debug, Clone, PartialEq)]
pub struct Combo {
    pub(crate) name: String,
    pub(crate) pairs: Vec<ComboPair>,
    pub(crate) prog: ProgId,
    pub(crate) group: GroupId,
    pub(crate) solve_type: Option<SolveType>,
    pub(crate) color: Color,
    pub(crate) enabled: bool,
    pub(crate) split_applied: BTreeSet<Axis>,
}

impl Combo {
    pub(crate) fn new(name: impl Into<String>, pairs: Vec<ComboPair>, prog: ProgId, group: GroupId) -> Self {
        Self {
            name: name.into(),
            pairs,
            prog,
            group,
            solve_type: None,
            color: Color::GREY,
            enabled: true,
            split_applied: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pairs(&self) -> &[ComboPair] {
        &self.pairs
    }

    pub fn prog(&self) -> ProgId {
        self.prog
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn solve_type(&self) -> Option<SolveType> {
        self.solve_type
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// A combo is floating when any input sits between the extremes.
    pub fn is_floating(&self) -> bool {
        self.pairs.iter().any(|p| p.value.abs() != 1.0)
    }

    pub fn sliders(&self) -> Vec<SliderId> {
        self.pairs.iter().map(|p| p.slider).collect()
    }

    pub fn has_slider(&self, slider: SliderId) -> bool {
        self.pairs.iter().any(|p| p.slider == slider)
    }

    pub fn slider_index(&self, slider: SliderId) -> Option<usize> {
        self.pairs.iter().position(|p| p.slider == slider)
    }

    pub fn value_of(&self, slider: SliderId) -> Option<f64> {
        self.pairs.iter().find(|p| p.slider == slider).map(|p| p.value)
    }
}

/// Percentage field for a value: `50`, or `n50` when negative.
fn value_field(value: f64) -> String {
    let pct = (value * 100.0).trunc().abs() as i64;
    if value < 0.0 {
        format!("n{}", pct)
    } else {
        pct.to_string()
    }
}

impl Simplex {
    /// The combo whose (slider, value) set equals `pairs`, if any.
    /// `-0.0` and `0.0` are the same value.
    pub fn combo_exists(&self, pairs: &[(SliderId, f64)]) -> Option<ComboId> {
        let key = |slider: SliderId, value: f64| {
            let value = if value == 0.0 { 0.0 } else { value };
            (self.graph.sliders[slider].name.clone(), value.to_bits())
        };
        let wanted: HashSet<_> = pairs.iter().map(|&(s, v)| key(s, v)).collect();
        self.graph.combo_list.iter().copied().find(|&c| {
            let have: HashSet<_> = self.graph.combos[c]
                .pairs
                .iter()
                .map(|p| key(p.slider, p.value))
                .collect();
            have == wanted
        })
    }

    /// Suggested name for a combo over `pairs`.
    ///
    /// Sliders are taken in name order. Each contributes the name of its
    /// shape at that value, or its extreme shape's name with a percentage
    /// field, or failing both its own name.
    pub fn build_combo_name(&self, pairs: &[(SliderId, f64)]) -> Result<String> {
        let mut sorted = Vec::with_capacity(pairs.len());
        for &(slider, value) in pairs {
            sorted.push((self.graph.sliders.require(slider)?, value));
        }
        sorted.sort_by(|a, b| a.0.name.cmp(&b.0.name));

        let mut parts = Vec::with_capacity(sorted.len());
        for (slider, value) in sorted {
            let prog = &self.graph.progressions[slider.prog];
            if let Some(shape) = prog.shape_at_value(value) {
                parts.push(self.graph.shapes[shape].name.clone());
                continue;
            }
            let extreme = if value > 0.0 { 1.0 } else { -1.0 };
            match prog.shape_at_value(extreme) {
                Some(shape) => {
                    let mut fields: Vec<String> = self.graph.shapes[shape]
                        .name
                        .split('_')
                        .map(str::to_string)
                        .collect();
                    let field = value_field(value);
                    match fields.last_mut() {
                        Some(last) if is_number_field(last) => *last = field,
                        _ => fields.push(field),
                    }
                    parts.push(fields.join("_"));
                }
                None => parts.push(slider.name.clone()),
            }
        }
        Ok(parts.join("_"))
    }

    /// Create a combo, or return the existing one with the same inputs.
    ///
    /// Without a group the combo goes to `DEPTH_{n}` for `n` inputs. Without
    /// a shape a new one is created at `value` and zeroed on the host.
    ///
    /// A single input is accepted, as loaded files may hold such combos; an
    /// empty input list is an `InvalidValue` error.
    pub fn create_combo(
        &mut self,
        name: &str,
        pairs: &[(SliderId, f64)],
        group: Option<GroupId>,
        shape: Option<ShapeId>,
        solve_type: Option<SolveType>,
        value: f64,
    ) -> Result<ComboId> {
        self.transact(|sx| {
            let rest = sx.graph.rest_shape()?;
            if pairs.is_empty() {
                return Err(SimplexError::InvalidValue {
                    field: "combo pairs".to_string(),
                    reason: format!("combo '{}' needs at least one slider", name),
                });
            }
            for &(slider, _) in pairs {
                sx.graph.sliders.require(slider)?;
            }
            if let Some(existing) = sx.combo_exists(pairs) {
                debug!("Combo over the same inputs already exists: '{}'", sx.graph.combos[existing].name);
                return Ok(existing);
            }
            if let Some(group) = group {
                sx.check_group_kind(group, GroupKind::Combo, name)?;
            }
            let group = match group {
                Some(group) => group,
                None => sx.group_named(&format!("DEPTH_{}", pairs.len()), GroupKind::Combo)?,
            };

            let mut prog_pairs = vec![ProgPair::new(rest, 0.0)];
            if let Some(shape) = shape {
                sx.graph.shapes.require(shape)?;
                prog_pairs.push(ProgPair::new(shape, value));
            }
            let prog = sx.graph.progressions.insert(Progression::with_pairs(name, prog_pairs));
            let combo_pairs = pairs.iter().map(|&(s, v)| ComboPair::new(s, v)).collect();
            let id = sx.insert_combo(name, combo_pairs, prog, group, solve_type, Color::GREY)?;

            if shape.is_none() {
                let shape = sx.create_prog_shape(prog, Some(name), Some(value))?;
                sx.zero_shape(shape)?;
            }
            Ok(id)
        })
    }

    /// Graph-side combo insertion shared by creation and loading.
    pub(crate) fn insert_combo(
        &mut self,
        name: &str,
        pairs: Vec<ComboPair>,
        prog: ProgId,
        group: GroupId,
        solve_type: Option<SolveType>,
        color: Color,
    ) -> Result<ComboId> {
        self.check_group_kind(group, GroupKind::Combo, name)?;
        let mut combo = Combo::new(name, pairs, prog, group);
        combo.solve_type = solve_type;
        combo.color = color;

        let row = self.graph.groups[group].items.len();
        let _insert = self.observers.inserting(group.into(), row);
        let id = self.graph.combos.insert(combo);
        self.graph.progressions[prog].controller = Some(Controller::Combo(id));
        self.graph.groups[group].items.push(Controller::Combo(id));
        self.graph.combo_list.push(id);
        Ok(id)
    }

    pub fn rename_combo(&mut self, id: ComboId, name: &str) -> Result<()> {
        self.transact(|sx| {
            sx.graph.combos.require(id)?;
            sx.graph.set_controller_name(Controller::Combo(id), name);
            sx.observers.data_changed(ItemId::Combo(id).into());
            Ok(())
        })
    }

    pub fn set_combo_color(&mut self, id: ComboId, color: Color) -> Result<()> {
        self.transact(|sx| {
            sx.graph.combos.require_mut(id)?.color = color;
            sx.observers.data_changed(ItemId::Combo(id).into());
            Ok(())
        })
    }

    pub fn set_combo_enabled(&mut self, id: ComboId, enabled: bool) -> Result<()> {
        self.transact(|sx| {
            sx.graph.combos.require_mut(id)?.enabled = enabled;
            sx.observers.data_changed(ItemId::Combo(id).into());
            Ok(())
        })
    }

    pub fn set_solve_type(&mut self, id: ComboId, solve_type: Option<SolveType>) -> Result<()> {
        self.transact(|sx| {
            sx.graph.combos.require_mut(id)?.solve_type = solve_type;
            sx.observers.data_changed(ItemId::Combo(id).into());
            Ok(())
        })
    }

    /// Change the activation value of one input.
    pub fn set_combo_value(&mut self, id: ComboId, slider: SliderId, value: f64) -> Result<()> {
        self.transact(|sx| {
            let combo = sx.graph.combos.require_mut(id)?;
            let row = combo.slider_index(slider).ok_or_else(|| SimplexError::UnknownItem {
                kind: "combo pair",
                name: format!("{} in {}", slider, id),
            })?;
            combo.pairs[row].value = value;
            sx.observers.data_changed(ItemRef::ComboPair { combo: id, row });
            Ok(())
        })
    }

    /// Add an input to a combo. The combo stays in its current group.
    pub fn append_combo_value(&mut self, id: ComboId, slider: SliderId, value: f64) -> Result<()> {
        self.transact(|sx| {
            sx.graph.sliders.require(slider)?;
            let row = sx.graph.combos.require(id)?.pairs.len();
            let _insert = sx.observers.inserting(ItemId::Combo(id).into(), row);
            sx.graph.combos[id].pairs.push(ComboPair::new(slider, value));
            Ok(())
        })
    }

    /// Remove the input at `row`. The last input cannot be removed; delete
    /// the combo instead.
    pub fn delete_combo_pair(&mut self, id: ComboId, row: usize) -> Result<()> {
        self.transact(|sx| {
            let combo = sx.graph.combos.require(id)?;
            let len = combo.pairs.len();
            if row >= len {
                return Err(SimplexError::IndexOutOfRange {
                    kind: "combo pair",
                    index: row,
                    len,
                });
            }
            if len == 1 {
                return Err(SimplexError::InvalidValue {
                    field: "combo pairs".to_string(),
                    reason: format!("'{}' would be left without inputs", combo.name),
                });
            }
            let _remove = sx.observers.removing(ItemRef::ComboPair { combo: id, row });
            sx.graph.combos[id].pairs.remove(row);
            Ok(())
        })
    }

    pub fn delete_combo(&mut self, id: ComboId) -> Result<()> {
        self.transact(|sx| {
            debug!("Deleting combo '{}'", sx.graph.combos.require(id)?.name);
            sx.discard_controller(Controller::Combo(id))
        })
    }
}
