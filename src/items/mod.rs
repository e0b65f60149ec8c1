//! Rig entities.
//!
//! Each submodule defines one entity kind together with the [`Simplex`]
//! mutators that operate on it. Entities refer to each other through the
//! typed handles declared here; the graph owns them all.
//!
//! [`Simplex`]: crate::system::Simplex

pub mod arena;
pub mod combo;
pub mod falloff;
pub mod group;
pub mod progression;
pub mod shape;
pub mod slider;
pub mod traversal;

use serde::{Deserialize, Serialize};

use arena::arena_id;

pub use arena::{Arena, ArenaId};
pub use combo::{Combo, ComboPair, SolveType};
pub use falloff::{Axis, Falloff, FalloffKind, PlanarFalloff, Side};
pub use group::{Group, GroupKind};
pub use progression::{Interp, ProgPair, Progression};
pub use shape::{Point, Points, Shape};
pub use slider::Slider;
pub use traversal::{TravPair, TravPoint, TravRanges, TravSide, Traversal};

arena_id!(
    /// Handle to a [`Shape`].
    ShapeId,
    "shape"
);
arena_id!(
    /// Handle to a [`Progression`].
    ProgId,
    "progression"
);
arena_id!(
    /// Handle to a [`Slider`].
    SliderId,
    "slider"
);
arena_id!(
    /// Handle to a [`Combo`].
    ComboId,
    "combo"
);
arena_id!(
    /// Handle to a [`Traversal`].
    TraversalId,
    "traversal"
);
arena_id!(
    /// Handle to a [`Group`].
    GroupId,
    "group"
);
arena_id!(
    /// Handle to a [`Falloff`].
    FalloffId,
    "falloff"
);

/// RGB display color carried by most entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const GREY: Color = Color(128, 128, 128);
    pub const BLACK: Color = Color(0, 0, 0);
}

impl Default for Color {
    fn default() -> Self {
        Color::GREY
    }
}

/// The owner of a progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Controller {
    Slider(SliderId),
    Combo(ComboId),
    Traversal(TraversalId),
}

impl Controller {
    /// The group type that may hold this controller.
    pub fn kind(&self) -> GroupKind {
        match self {
            Controller::Slider(_) => GroupKind::Slider,
            Controller::Combo(_) => GroupKind::Combo,
            Controller::Traversal(_) => GroupKind::Traversal,
        }
    }
}

impl From<SliderId> for Controller {
    fn from(id: SliderId) -> Self {
        Controller::Slider(id)
    }
}

impl From<ComboId> for Controller {
    fn from(id: ComboId) -> Self {
        Controller::Combo(id)
    }
}

impl From<TraversalId> for Controller {
    fn from(id: TraversalId) -> Self {
        Controller::Traversal(id)
    }
}

/// Any entity stored in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemId {
    Shape(ShapeId),
    Progression(ProgId),
    Slider(SliderId),
    Combo(ComboId),
    Traversal(TraversalId),
    Group(GroupId),
    Falloff(FalloffId),
}

impl From<Controller> for ItemId {
    fn from(ctrl: Controller) -> Self {
        match ctrl {
            Controller::Slider(id) => ItemId::Slider(id),
            Controller::Combo(id) => ItemId::Combo(id),
            Controller::Traversal(id) => ItemId::Traversal(id),
        }
    }
}

macro_rules! item_from {
    ($($id:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$id> for ItemId {
                fn from(id: $id) -> Self {
                    ItemId::$variant(id)
                }
            }
        )*
    };
}

item_from!(
    ShapeId => Shape,
    ProgId => Progression,
    SliderId => Slider,
    ComboId => Combo,
    TraversalId => Traversal,
    GroupId => Group,
    FalloffId => Falloff,
);

/// Find the first name derived from `name` that is not in `taken`.
///
/// The name itself is tried first, then `name1`, `name2`, and so on.
pub fn next_name<'a, I>(name: &str, taken: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: std::collections::HashSet<&str> = taken.into_iter().collect();
    if !taken.contains(name) {
        return name.to_string();
    }
    let mut i = 1usize;
    loop {
        let candidate = format!("{}{}", name, i);
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        i += 1;
    }
}
