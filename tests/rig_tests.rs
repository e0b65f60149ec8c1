//! Rig Tests
//!
//! End-to-end behaviour of a system: creation, undo, groups and splitting.

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;

use simplex::items::{Axis, GroupKind, PlanarFalloff};
use simplex::stack::Stack;
use simplex::system::VectorFilter;
use simplex::{Completion, HostAdapter, MemoryHost, NoProgress, Progress, Simplex, SimplexConfig};

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

fn names<'a>(sx: &'a Simplex, ids: &[simplex::items::SliderId]) -> Vec<&'a str> {
    ids.iter().map(|&s| sx.slider(s).unwrap().name()).collect()
}

// === Scenarios ===

#[test]
fn test_empty_system_has_rest_shape() {
    let sx = Simplex::in_memory("Face").unwrap();
    let rest = sx.rest_shape().unwrap();

    assert_eq!(sx.shapes(), &[rest]);
    assert!(sx.shape(rest).unwrap().is_rest());

    let doc = sx.build_definition(false).unwrap();
    assert_eq!(doc["shapes"][0]["name"], "Rest_Face");
}

#[test]
fn test_create_slider_with_default_target() {
    let mut sx = Simplex::in_memory("Face").unwrap();
    let rest = sx.rest_shape().unwrap();
    let slider = sx.create_slider("Smile_X_", None, None, 1.0).unwrap();

    assert_eq!(sx.shapes().len(), 2);
    let prog = sx.progression(sx.slider(slider).unwrap().prog()).unwrap();
    let pairs: Vec<_> = prog.pairs().iter().map(|p| (p.shape, p.value)).collect();
    let smile = sx.find_shape("Smile_X_").unwrap();
    assert_eq!(pairs, vec![(rest, 0.0), (smile, 1.0)]);
}

#[test]
fn test_duplicate_combo_returns_existing() {
    let mut sx = Simplex::in_memory("Face").unwrap();
    let smile = sx.create_slider("Smile_X_", None, None, 1.0).unwrap();
    let frown = sx.create_slider("Frown_X_", None, None, 1.0).unwrap();

    let first = sx
        .create_combo("C", &[(smile, 1.0), (frown, -1.0)], None, None, None, 1.0)
        .unwrap();
    let second = sx
        .create_combo("C", &[(frown, -1.0), (smile, 1.0)], None, None, None, 1.0)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(sx.combos().len(), 1);
}

#[test]
fn test_split_planar_falloff() {
    let mut sx = Simplex::in_memory("Face").unwrap();
    let rest = sx.rest_shape().unwrap();
    sx.set_shape_vertices(rest, vec![[-1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]])
        .unwrap();
    let slider = sx.create_slider("Smile_X_", None, None, 1.0).unwrap();
    let prog = sx.slider(slider).unwrap().prog();
    let shape = sx.find_shape("Smile_X_").unwrap();
    sx.set_shape_vertices(shape, vec![[-1.0, 2.0, 0.0], [0.0, 2.0, 0.0], [1.0, 2.0, 0.0]])
        .unwrap();
    let fo = sx
        .create_planar_falloff("Center", PlanarFalloff::new(Axis::X, -1.0, 0.33, 0.66, 1.0))
        .unwrap();
    sx.add_falloff(prog, fo).unwrap();

    let outcome = sx.split(&mut NoProgress).unwrap();
    assert!(outcome.completion.is_finished());
    let split = outcome.system;
    assert_eq!(names(&split, split.sliders()), vec!["Smile_L_", "Smile_R_"]);

    let verts = |name: &str| {
        let id = split.find_shape(name).unwrap();
        split.shape(id).unwrap().verts().unwrap().clone()
    };
    let (left, right) = (verts("Smile_L_"), verts("Smile_R_"));
    let planar = PlanarFalloff::new(Axis::X, -1.0, 0.33, 0.66, 1.0);
    for (i, x) in [-1.0, 0.0, 1.0].into_iter().enumerate() {
        let w = planar.multiplier(x);
        assert_relative_eq!(left[i][1], 2.0 * w, epsilon = 1e-9);
        assert_relative_eq!(right[i][1], 2.0 * (1.0 - w), epsilon = 1e-9);
    }

    // the source system is untouched
    assert_eq!(names(&sx, sx.sliders()), vec!["Smile_X_"]);
}

/// Brows split on both axes, a smile split on x, a combo of the two and a
/// traversal driven by the smile.
fn sided_rig() -> Simplex {
    let mut sx = Simplex::in_memory("Face").unwrap();
    let brow = sx.create_slider("Brow_X_V", None, None, 1.0).unwrap();
    let smile = sx.create_slider("Smile_X_", None, None, 1.0).unwrap();
    let jaw = sx.create_slider("Jaw", None, None, 1.0).unwrap();

    let sides = sx
        .create_planar_falloff("Sides", PlanarFalloff::new(Axis::X, -1.0, -0.1, 0.1, 1.0))
        .unwrap();
    let height = sx
        .create_planar_falloff("Height", PlanarFalloff::new(Axis::Y, -1.0, -0.1, 0.1, 1.0))
        .unwrap();
    let brow_prog = sx.slider(brow).unwrap().prog();
    let smile_prog = sx.slider(smile).unwrap().prog();
    sx.add_falloff(brow_prog, sides).unwrap();
    sx.add_falloff(brow_prog, height).unwrap();
    sx.add_falloff(smile_prog, sides).unwrap();

    sx.create_combo("Smile_X__Brow_X_V", &[(smile, 1.0), (brow, 1.0)], None, None, None, 1.0)
        .unwrap();
    sx.create_traversal("Tv_Smile_X_", &[(jaw, 1.0)], &[(jaw, 1.0), (smile, 1.0)], None, 2)
        .unwrap();
    sx
}

fn sorted<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut names: Vec<&str> = names.collect();
    names.sort();
    names
}

#[test]
fn test_split_on_two_axes() {
    let mut sx = sided_rig();
    let outcome = sx.split(&mut NoProgress).unwrap();
    assert!(outcome.completion.is_finished());
    let split = outcome.system;

    assert_eq!(
        sorted(split.sliders().iter().map(|&s| split.slider(s).unwrap().name())),
        vec!["Brow_L_D", "Brow_L_U", "Brow_R_D", "Brow_R_U", "Jaw", "Smile_L_", "Smile_R_"]
    );
    assert_eq!(
        sorted(split.combos().iter().map(|&c| split.combo(c).unwrap().name())),
        vec![
            "Smile_L__Brow_L_D",
            "Smile_L__Brow_L_U",
            "Smile_R__Brow_R_D",
            "Smile_R__Brow_R_U"
        ]
    );

    let combo = split.combo(split.find_combo("Smile_R__Brow_R_U").unwrap()).unwrap();
    assert!(combo.has_slider(split.find_slider("Smile_R_").unwrap()));
    assert!(combo.has_slider(split.find_slider("Brow_R_U").unwrap()));
    assert!(!combo.has_slider(split.find_slider("Smile_L_").unwrap()));
}

#[test]
fn test_split_traversals() {
    let mut sx = sided_rig();
    let jaw = sx.find_slider("Jaw").unwrap();
    let split = sx.split(&mut NoProgress).unwrap().system;

    assert_eq!(
        sorted(split.traversals().iter().map(|&t| split.traversal(t).unwrap().name())),
        vec!["Tv_Smile_L_", "Tv_Smile_R_"]
    );
    let left = split.traversal(split.find_traversal("Tv_Smile_L_").unwrap()).unwrap();
    let smile_left = split.find_slider("Smile_L_").unwrap();
    assert_eq!(left.end().value_of(smile_left), 1.0);
    assert_eq!(left.start().value_of(jaw), 1.0);
    assert!(split.find_shape("Tv_Smile_L__50").is_some());
    assert!(split.find_shape("Tv_Smile_R__100").is_some());
    assert!(split.find_shape("Tv_Smile_X__50").is_none());
}

#[test]
fn test_split_result_round_trips_legacy() {
    let mut sx = sided_rig();
    let split = sx.split(&mut NoProgress).unwrap().system;

    let doc = split.build_definition(true).unwrap();
    assert_eq!(doc["encodingVersion"], 1);
    let reloaded =
        Simplex::from_definition(&doc, Box::new(MemoryHost::new()), SimplexConfig::default())
            .unwrap();
    assert_eq!(
        sorted(reloaded.sliders().iter().map(|&s| reloaded.slider(s).unwrap().name())),
        sorted(split.sliders().iter().map(|&s| split.slider(s).unwrap().name()))
    );
    assert_eq!(reloaded.traversals().len(), 2);

    let vectors = split.build_input_vectors(&VectorFilter::default()).unwrap();
    assert_eq!(vectors.len(), 15);
}

#[test]
fn test_cancelled_split_is_usable() {
    let mut sx = sided_rig();
    let outcome = sx.split(&mut StopAfter(1)).unwrap();
    assert_eq!(outcome.completion, Completion::Cancelled);

    let partial = outcome.system;
    for &s in partial.shapes() {
        assert!(partial.shape(s).is_ok());
    }
    assert!(partial.dump().is_ok());
    assert!(partial.build_input_vectors(&VectorFilter::default()).is_ok());
}

// === Undo ===

#[test]
fn test_stack_discards_redo_history() {
    let mut stack: Stack<u32> = Stack::new();
    for revision in 1..=5 {
        stack.commit(revision, &(revision as u32 * 10));
    }
    assert!(stack.get_revision(2).is_some());

    stack.commit(3, &99);
    assert_eq!(stack.revisions(), vec![1, 2, 3]);
    assert!(stack.get_revision(4).is_none());
}

#[test]
fn test_host_undo_restores_snapshot() {
    let mut sx = Simplex::in_memory("Face").unwrap();
    sx.create_slider("Smile", None, None, 1.0).unwrap();
    let before = sx.host().revision();
    sx.create_slider("Frown", None, None, 1.0).unwrap();
    assert_eq!(sx.sliders().len(), 2);

    sx.host_mut().set_revision(before);
    assert!(sx.handle_host_undo());
    assert_eq!(names(&sx, sx.sliders()), vec!["Smile"]);

    sx.host_mut().set_revision(before + 1);
    assert!(sx.handle_host_undo());
    assert_eq!(sx.sliders().len(), 2);
}

#[test]
fn test_nested_transaction_is_one_revision() {
    let mut sx = Simplex::in_memory("Face").unwrap();
    let before = sx.host().revision();
    sx.transact(|sx| {
        sx.create_slider("A", None, None, 1.0)?;
        sx.create_slider("B", None, None, 1.0)
    })
    .unwrap();
    assert_eq!(sx.host().revision(), before + 1);
}

// === Groups ===

#[test]
fn test_last_group_is_kept() {
    let mut sx = Simplex::in_memory("Face").unwrap();
    let slider = sx.create_slider("Smile", None, None, 1.0).unwrap();
    let group = sx.slider(slider).unwrap().group();

    sx.delete_group(group).unwrap();

    assert_eq!(sx.slider_groups(), &[group]);
    assert!(sx.find_slider("Smile").is_some());
}

#[test]
fn test_delete_group_deletes_members() {
    let mut sx = Simplex::in_memory("Face").unwrap();
    sx.create_slider("Keep", None, None, 1.0).unwrap();
    let extra = sx.create_group("Extra", GroupKind::Slider).unwrap();
    sx.create_slider("Drop", Some(extra), None, 1.0).unwrap();

    sx.delete_group(extra).unwrap();

    assert!(sx.find_slider("Drop").is_none());
    assert!(sx.find_shape("Drop").is_none());
    assert!(sx.find_slider("Keep").is_some());
}
