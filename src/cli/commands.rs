//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::SimplexConfig;
use crate::container::Container;
use crate::interface::{MemoryHost, NoProgress};
use crate::system::{Simplex, VectorFilter};

/// File extension of container files.
pub const CONTAINER_EXTENSION: &str = "smpx";

fn is_container(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == CONTAINER_EXTENSION)
}

/// Load the configuration named on the command line, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<SimplexConfig> {
    match path {
        Some(path) => SimplexConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(SimplexConfig::default()),
    }
}

/// Load a definition file or a container into an in-memory system.
pub fn open(path: &Path, config: &SimplexConfig) -> Result<Simplex> {
    debug!("Opening {}", path.display());
    if is_container(path) {
        return Simplex::load_container(path, config.clone())
            .with_context(|| format!("loading container {}", path.display()));
    }
    let definition = fs::read_to_string(path)
        .with_context(|| format!("reading definition {}", path.display()))?;
    Simplex::from_definition_str(&definition, Box::new(MemoryHost::new()), config.clone())
        .with_context(|| format!("loading definition {}", path.display()))
}

/// Print entity counts.
pub fn info(path: &Path, config: &SimplexConfig) -> Result<()> {
    let sx = open(path, config)?;

    println!("System: {}", sx.name());
    println!("{:-<40}", "");
    println!("Shapes:      {}", sx.shapes().len());
    println!("Sliders:     {}", sx.sliders().len());
    println!("Combos:      {}", sx.combos().len());
    println!("Traversals:  {}", sx.traversals().len());
    println!("Falloffs:    {}", sx.falloffs().len());
    println!(
        "Groups:      {}",
        sx.slider_groups().len() + sx.combo_groups().len() + sx.traversal_groups().len()
    );
    let floating = sx.floating_shapes().len();
    if floating > 0 {
        println!("Floating:    {}", floating);
    }

    Ok(())
}

/// Rewrite a definition in the current or legacy encoding.
pub fn convert(
    path: &Path,
    output: &Path,
    legacy: bool,
    pretty: bool,
    config: &SimplexConfig,
) -> Result<()> {
    let config = SimplexConfig {
        legacy: legacy || config.legacy,
        pretty: pretty || config.pretty,
        ..config.clone()
    };
    let sx = open(path, &config)?;
    let definition = sx.dump()?;
    fs::write(output, definition)
        .with_context(|| format!("writing definition {}", output.display()))?;

    info!(
        "Converted {} to version {}",
        path.display(),
        if config.legacy { 1 } else { 3 }
    );
    println!("Wrote {}", output.display());
    Ok(())
}

/// Split a container and save the result.
pub fn split(path: &Path, output: &Path, config: &SimplexConfig) -> Result<()> {
    let mut sx = open(path, config)?;
    let outcome = sx.split(&mut NoProgress)?;
    if !outcome.completion.is_finished() {
        warn!("Split did not run to the end; saving partial result");
    }

    let mut split = outcome.system;
    split
        .save_container(output)
        .with_context(|| format!("saving container {}", output.display()))?;

    println!(
        "Split {} sliders into {} ({} shapes)",
        sx.sliders().len(),
        split.sliders().len(),
        split.shapes().len()
    );
    Ok(())
}

/// Print the solver input vectors as JSON.
pub fn vectors(path: &Path, filter: &VectorFilter, config: &SimplexConfig) -> Result<()> {
    let sx = open(path, config)?;
    let vectors = sx.build_input_vectors(filter)?;
    info!("Built {} input vectors", vectors.len());
    println!("{}", serde_json::to_string_pretty(&vectors)?);
    Ok(())
}

/// Try to load every definition and container under `dir`.
pub fn check(dir: &Path, config: &SimplexConfig) -> Result<()> {
    let mut checked = 0;
    let mut failed = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
        let path = entry.path();
        let candidate = path
            .extension()
            .is_some_and(|ext| ext == "json" || ext == CONTAINER_EXTENSION);
        if !entry.file_type().is_file() || !candidate {
            continue;
        }

        checked += 1;
        if let Err(e) = open(path, config) {
            println!("FAIL {}: {:#}", path.display(), e);
            failed.push(path.to_path_buf());
        } else {
            debug!("ok {}", path.display());
        }
    }

    println!("{:-<60}", "");
    println!("Checked {} files, {} failed", checked, failed.len());
    if !failed.is_empty() {
        bail!("{} of {} files failed to load", failed.len(), checked);
    }
    Ok(())
}
