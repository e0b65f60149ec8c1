//! Subgraph cloning with exemptions.
//!
//! Cloning starts from a set of roots and follows every reference. Exempt
//! entities are shared rather than copied, and every reference held by a
//! copied entity is re-pointed at the copy of its target when one exists.
//! New entities are stored in the arenas only; the caller decides where they
//! appear in the top-level lists and groups.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::items::{Controller, ItemId};
use crate::system::Graph;

/// Outgoing references of one entity.
pub(crate) fn references(graph: &Graph, item: ItemId) -> Vec<ItemId> {
    match item {
        ItemId::Shape(_) => Vec::new(),
        ItemId::Progression(id) => {
            let prog = &graph.progressions[id];
            prog.pairs
                .iter()
                .map(|p| ItemId::Shape(p.shape))
                .chain(prog.falloffs.iter().map(|&f| ItemId::Falloff(f)))
                .chain(prog.controller.map(ItemId::from))
                .collect()
        }
        ItemId::Slider(id) => {
            let slider = &graph.sliders[id];
            vec![ItemId::Progression(slider.prog), ItemId::Group(slider.group)]
        }
        ItemId::Combo(id) => {
            let combo = &graph.combos[id];
            combo
                .pairs
                .iter()
                .map(|p| ItemId::Slider(p.slider))
                .chain([ItemId::Progression(combo.prog), ItemId::Group(combo.group)])
                .collect()
        }
        ItemId::Traversal(id) => {
            let trav = &graph.traversals[id];
            trav.all_sliders()
                .into_iter()
                .map(ItemId::Slider)
                .chain([ItemId::Progression(trav.prog), ItemId::Group(trav.group)])
                .collect()
        }
        ItemId::Group(id) => graph.groups[id].items.iter().map(|&c| c.into()).collect(),
        ItemId::Falloff(id) => graph.falloffs[id]
            .children
            .iter()
            .map(|&p| ItemId::Progression(p))
            .collect(),
    }
}

/// Copy one entity into a fresh slot of its arena.
fn copy_entity(graph: &mut Graph, item: ItemId) -> ItemId {
    match item {
        ItemId::Shape(id) => ItemId::Shape(graph.shapes.insert(graph.shapes[id].clone())),
        ItemId::Progression(id) => {
            ItemId::Progression(graph.progressions.insert(graph.progressions[id].clone()))
        }
        ItemId::Slider(id) => ItemId::Slider(graph.sliders.insert(graph.sliders[id].clone())),
        ItemId::Combo(id) => ItemId::Combo(graph.combos.insert(graph.combos[id].clone())),
        ItemId::Traversal(id) => {
            ItemId::Traversal(graph.traversals.insert(graph.traversals[id].clone()))
        }
        ItemId::Group(id) => ItemId::Group(graph.groups.insert(graph.groups[id].clone())),
        ItemId::Falloff(id) => ItemId::Falloff(graph.falloffs.insert(graph.falloffs[id].clone())),
    }
}

/// Re-point the references held by `item` through `map`.
fn remap(graph: &mut Graph, item: ItemId, map: &HashMap<ItemId, ItemId>) {
    macro_rules! through {
        ($variant:ident, $id:expr) => {
            match map.get(&ItemId::$variant($id)) {
                Some(ItemId::$variant(new)) => *new,
                _ => $id,
            }
        };
    }
    let ctrl = |c: Controller| match map.get(&ItemId::from(c)) {
        Some(&ItemId::Slider(s)) => Controller::Slider(s),
        Some(&ItemId::Combo(c)) => Controller::Combo(c),
        Some(&ItemId::Traversal(t)) => Controller::Traversal(t),
        _ => c,
    };

    match item {
        ItemId::Shape(_) => {}
        ItemId::Progression(id) => {
            let prog = &mut graph.progressions[id];
            for pair in &mut prog.pairs {
                pair.shape = through!(Shape, pair.shape);
            }
            for falloff in &mut prog.falloffs {
                *falloff = through!(Falloff, *falloff);
            }
            prog.controller = prog.controller.map(ctrl);
        }
        ItemId::Slider(id) => {
            let slider = &mut graph.sliders[id];
            slider.prog = through!(Progression, slider.prog);
            slider.group = through!(Group, slider.group);
        }
        ItemId::Combo(id) => {
            let combo = &mut graph.combos[id];
            for pair in &mut combo.pairs {
                pair.slider = through!(Slider, pair.slider);
            }
            combo.prog = through!(Progression, combo.prog);
            combo.group = through!(Group, combo.group);
        }
        ItemId::Traversal(id) => {
            let trav = &mut graph.traversals[id];
            for pair in trav.start.pairs.iter_mut().chain(trav.end.pairs.iter_mut()) {
                pair.slider = through!(Slider, pair.slider);
            }
            trav.prog = through!(Progression, trav.prog);
            trav.group = through!(Group, trav.group);
        }
        ItemId::Group(id) => {
            for c in &mut graph.groups[id].items {
                *c = ctrl(*c);
            }
        }
        ItemId::Falloff(id) => {
            for p in &mut graph.falloffs[id].children {
                *p = through!(Progression, *p);
            }
        }
    }
}

/// Everything reachable from `roots` without passing through `exempt`.
pub fn reachable(graph: &Graph, roots: &[ItemId], exempt: &HashSet<ItemId>) -> BTreeSet<ItemId> {
    let mut seen = BTreeSet::new();
    let mut pending: Vec<ItemId> = roots.iter().copied().filter(|r| !exempt.contains(r)).collect();
    while let Some(item) = pending.pop() {
        if !seen.insert(item) {
            continue;
        }
        for next in references(graph, item) {
            if !exempt.contains(&next) && !seen.contains(&next) {
                pending.push(next);
            }
        }
    }
    seen
}

/// Clone every non-exempt entity reachable from `roots`.
///
/// Returns the original-to-copy mapping. Exempt entities are referenced by
/// the copies as they are.
pub fn clone_subgraph(
    graph: &mut Graph,
    roots: &[ItemId],
    exempt: &HashSet<ItemId>,
) -> HashMap<ItemId, ItemId> {
    let targets = reachable(graph, roots, exempt);
    let map: HashMap<ItemId, ItemId> = targets
        .iter()
        .map(|&item| (item, copy_entity(graph, item)))
        .collect();
    for copy in map.values() {
        remap(graph, *copy, &map);
    }
    map
}
