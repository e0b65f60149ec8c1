//! Simplex - Blendshape Rig Graph
//!
//! Simplex models a blendshape rig as a graph of named entities:
//! - Shapes: individual deformation targets, one of them the rest pose
//! - Progressions: ordered (shape, value) curves
//! - Sliders, Combos and Traversals: controllers that own one progression
//! - Groups and Falloffs: organisation and spatial attenuation
//!
//! # Architecture
//!
//! Every edit goes through a transaction on [`Simplex`]. When the outermost
//! transaction closes, the graph is snapshotted into the undo [`Stack`] under
//! the host's new revision. The graph serializes to a flat, index-referenced
//! definition document (versions 1 to 3) that external solvers consume, and
//! can be split along the axes of its planar falloffs into left and right
//! halves.
//!
//! [`Stack`]: stack::Stack

pub mod cli;
pub mod config;
pub mod container;
pub mod definition;
pub mod error;
pub mod interface;
pub mod items;
pub mod observer;
pub mod solver;
pub mod stack;
pub mod system;

pub use config::SimplexConfig;
pub use container::Container;
pub use error::{Result, SimplexError};
pub use interface::{Completion, HostAdapter, HostHandle, MemoryHost, NoProgress, Progress};
pub use observer::{ItemRef, ViewModel};
pub use solver::Solver;
pub use system::{InputVectors, Simplex, SplitOutcome, VectorFilter};
