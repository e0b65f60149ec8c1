//! Definition document records.
//!
//! Versions 2 and 3 share one named-field layout and differ only in how
//! traversals are written. Version 1 is positional: most records are plain
//! JSON arrays. Every cross reference is an index into one of the top-level
//! arrays.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::items::{Axis, Color, GroupKind, Interp};
use crate::system::DEFAULT_CLUSTER_NAME;

/// `(shape or slider index, value)`.
pub type IndexPair = (usize, f64);

fn default_cluster_name() -> String {
    DEFAULT_CLUSTER_NAME.to_string()
}

fn default_true() -> bool {
    true
}

fn default_combo_group() -> usize {
    1
}

fn default_traversal_group() -> usize {
    2
}

fn grey() -> Color {
    Color::GREY
}

fn black() -> Color {
    Color::BLACK
}

/// Named-field document, versions 2 and 3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub encoding_version: u32,

    pub system_name: String,

    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// Rest shape first.
    #[serde(default)]
    pub shapes: Vec<ShapeRecord>,

    #[serde(default)]
    pub groups: Vec<GroupRecord>,

    #[serde(default)]
    pub falloffs: Vec<FalloffRecord>,

    #[serde(default)]
    pub progressions: Vec<ProgressionRecord>,

    #[serde(default)]
    pub sliders: Vec<SliderRecord>,

    #[serde(default)]
    pub combos: Vec<ComboRecord>,

    #[serde(default)]
    pub traversals: Vec<TraversalRecord>,

    /// Top-level keys this crate does not know, carried through untouched.
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub name: String,

    #[serde(default = "black")]
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: GroupKind,

    #[serde(default = "grey")]
    pub color: Color,
}

/// Planar and map falloffs share one record. Fields that do not apply to
/// the falloff's type are written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FalloffRecord {
    pub name: String,

    /// `planar` or `map`.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub axis: Option<Axis>,

    #[serde(default)]
    pub max_val: Option<f64>,

    #[serde(default)]
    pub max_handle: Option<f64>,

    #[serde(default)]
    pub min_handle: Option<f64>,

    #[serde(default)]
    pub min_val: Option<f64>,

    #[serde(default)]
    pub map_name: Option<String>,

    #[serde(default = "grey")]
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionRecord {
    pub name: String,

    /// `(shape index, value)`, sorted by value.
    pub pairs: Vec<IndexPair>,

    #[serde(default)]
    pub interp: Interp,

    #[serde(default)]
    pub falloffs: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderRecord {
    pub name: String,

    pub prog: usize,

    #[serde(default)]
    pub group: usize,

    #[serde(default = "grey")]
    pub color: Color,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboRecord {
    pub name: String,

    pub prog: usize,

    /// `(slider index, value)`.
    pub pairs: Vec<IndexPair>,

    #[serde(default = "default_combo_group")]
    pub group: usize,

    #[serde(default = "grey")]
    pub color: Color,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// A solve type name, or `"None"`.
    #[serde(default)]
    pub solve_type: Option<String>,
}

/// A traversal in either encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraversalRecord {
    /// Version 3: explicit start and end points.
    Points(PointTraversal),
    /// Versions 1 and 2: a progress control driven over a multiplier control.
    Controls(ControlTraversal),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointTraversal {
    pub name: String,

    pub prog: usize,

    /// `(slider index, value)`. Sliders missing from one point sit at zero
    /// there.
    pub start: Vec<IndexPair>,

    pub end: Vec<IndexPair>,

    #[serde(default = "default_traversal_group")]
    pub group: usize,

    #[serde(default = "black")]
    pub color: Color,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Kind of control referenced by a [`ControlTraversal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    #[serde(alias = "Slider")]
    Slider,
    #[serde(alias = "Combo")]
    Combo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlTraversal {
    pub name: String,

    pub prog: usize,

    pub progress_type: ControlKind,

    pub progress_control: usize,

    #[serde(default)]
    pub progress_flip: bool,

    pub multiplier_type: ControlKind,

    pub multiplier_control: usize,

    #[serde(default)]
    pub multiplier_flip: bool,

    #[serde(default = "default_traversal_group")]
    pub group: usize,

    #[serde(default = "black")]
    pub color: Color,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Positional document, version 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDocument {
    pub encoding_version: u32,

    pub system_name: String,

    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// Shape names, rest first.
    #[serde(default)]
    pub shapes: Vec<String>,

    /// Group names. The type of each group follows from what uses it.
    #[serde(default)]
    pub groups: Vec<String>,

    #[serde(default)]
    pub falloffs: Vec<LegacyFalloff>,

    #[serde(default)]
    pub progressions: Vec<LegacyProgression>,

    #[serde(default)]
    pub sliders: Vec<LegacySlider>,

    #[serde(default)]
    pub combos: Vec<LegacyCombo>,

    #[serde(default)]
    pub traversals: Vec<ControlTraversal>,

    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

/// `[name, "planar", axis, maxVal, maxHandle, minHandle, minVal]` or
/// `[name, "map", mapName]`, optionally followed by an axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyFalloff {
    Planar(String, String, Axis, f64, f64, f64, f64),
    Map(String, String, String),
    MapWithAxis(String, String, String, Option<Axis>),
}

/// `[name, shape indices, values, interp, falloff indices]`.
pub type LegacyProgression = (String, Vec<usize>, Vec<f64>, Interp, Vec<usize>);

/// `[name, progression index, group index]`.
pub type LegacySlider = (String, usize, usize);

/// `[name, progression index, pairs]`, optionally followed by a group index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyCombo {
    Grouped(String, usize, Vec<IndexPair>, usize),
    Ungrouped(String, usize, Vec<IndexPair>),
}

impl LegacyCombo {
    pub fn name(&self) -> &str {
        match self {
            LegacyCombo::Grouped(name, ..) | LegacyCombo::Ungrouped(name, ..) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_defaults() {
        let doc: Document = serde_json::from_value(json!({
            "encodingVersion": 3,
            "systemName": "Face",
            "shapes": [{"name": "Rest_Face"}],
            "sliders": [{"name": "Smile", "prog": 0}],
            "combos": [{"name": "A_B", "prog": 1, "pairs": [[0, 1.0], [1, 1.0]]}],
        }))
        .unwrap();

        assert_eq!(doc.cluster_name, "Shape");
        assert_eq!(doc.shapes[0].color, Color::BLACK);
        assert_eq!(doc.sliders[0].group, 0);
        assert!(doc.sliders[0].enabled);
        assert_eq!(doc.combos[0].group, 1);
        assert_eq!(doc.combos[0].solve_type, None);
        assert!(doc.extras.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_extras() {
        let doc: Document = serde_json::from_value(json!({
            "encodingVersion": 2,
            "systemName": "Face",
            "rigVersion": "7",
        }))
        .unwrap();
        assert_eq!(doc.extras["rigVersion"], "7");
    }

    #[test]
    fn test_traversal_encodings() {
        let points: TraversalRecord = serde_json::from_value(json!({
            "name": "Tv", "prog": 2, "start": [[0, 0.0]], "end": [[0, 1.0]]
        }))
        .unwrap();
        assert!(matches!(points, TraversalRecord::Points(ref p) if p.group == 2));

        let controls: TraversalRecord = serde_json::from_value(json!({
            "name": "Tv", "prog": 2,
            "progressType": "Slider", "progressControl": 0, "progressFlip": true,
            "multiplierType": "combo", "multiplierControl": 1, "multiplierFlip": false
        }))
        .unwrap();
        match controls {
            TraversalRecord::Controls(c) => {
                assert_eq!(c.progress_type, ControlKind::Slider);
                assert_eq!(c.multiplier_type, ControlKind::Combo);
                assert!(c.progress_flip);
                assert_eq!(c.color, Color::BLACK);
            }
            other => panic!("decoded as {:?}", other),
        }
    }

    #[test]
    fn test_legacy_positional_records() {
        let doc: LegacyDocument = serde_json::from_value(json!({
            "encodingVersion": 1,
            "systemName": "Face",
            "clusterName": "Shape",
            "shapes": ["Rest_Face", "Smile"],
            "groups": ["Sliders"],
            "falloffs": [
                ["Center", "planar", "X", 1.0, 0.66, 0.33, -1.0],
                ["Painted", "map", "weights"]
            ],
            "progressions": [["Smile", [0, 1], [0.0, 1.0], "spline", [0]]],
            "sliders": [["Smile", 0, 0]],
            "combos": [["A_B", 0, [[0, 1.0]]], ["C_D", 0, [[0, 1.0]], 0]]
        }))
        .unwrap();

        assert!(matches!(doc.falloffs[0], LegacyFalloff::Planar(_, _, Axis::X, ..)));
        assert!(matches!(doc.falloffs[1], LegacyFalloff::Map(..)));
        assert!(matches!(doc.combos[0], LegacyCombo::Ungrouped(..)));
        assert!(matches!(doc.combos[1], LegacyCombo::Grouped(.., 0)));
        assert_eq!(doc.combos[1].name(), "C_D");
        assert_eq!(doc.sliders[0], ("Smile".to_string(), 0, 0));
    }
}
