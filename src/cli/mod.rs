//! CLI Module
//!
//! Command-line front end for inspecting, converting and splitting simplex
//! definitions and containers.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Simplex rig tool - inspect, convert and split blendshape rigs
#[derive(Parser, Debug)]
#[command(name = "simplex-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print entity counts for a definition or container
    #[command(name = "info")]
    Info {
        /// Definition (.json) or container (.smpx) file
        file: PathBuf,
    },

    /// Rewrite a definition in the current or legacy encoding
    #[command(name = "convert")]
    Convert {
        /// Definition or container to read
        file: PathBuf,

        /// Output definition file
        #[arg(short, long)]
        output: PathBuf,

        /// Write the positional version 1 encoding
        #[arg(long)]
        legacy: bool,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Split a container along its falloff axes
    #[command(name = "split")]
    Split {
        /// Container to read
        file: PathBuf,

        /// Output container
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print solver input vectors as JSON
    #[command(name = "vectors")]
    Vectors {
        /// Definition or container to read
        file: PathBuf,

        /// Only targets sitting at -1 or 1
        #[arg(long)]
        extremes: bool,

        /// Skip floating combos
        #[arg(long)]
        ignore_floaters: bool,

        /// Skip traversals
        #[arg(long)]
        ignore_traversals: bool,

        /// Skip combos deeper than this many sliders
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Report every definition under a directory that fails to load
    #[command(name = "check")]
    Check {
        /// Directory to walk
        dir: PathBuf,
    },
}
