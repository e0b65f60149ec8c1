//! CLI Tests
//!
//! Command functions run against files in a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

use simplex::cli::commands;
use simplex::items::{Axis, PlanarFalloff};
use simplex::{Simplex, SimplexConfig};

/// Write a small split-ready rig as a container and return its path.
fn write_container(dir: &Path) -> PathBuf {
    let mut sx = Simplex::in_memory("Face").unwrap();
    let rest = sx.rest_shape().unwrap();
    sx.set_shape_vertices(rest, vec![[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]])
        .unwrap();
    let slider = sx.create_slider("Smile_X_", None, None, 1.0).unwrap();
    let prog = sx.slider(slider).unwrap().prog();
    let shape = sx.find_shape("Smile_X_").unwrap();
    sx.set_shape_vertices(shape, vec![[-1.0, 1.0, 0.0], [1.0, 1.0, 0.0]])
        .unwrap();
    let fo = sx
        .create_planar_falloff("Center", PlanarFalloff::new(Axis::X, -1.0, -0.1, 0.1, 1.0))
        .unwrap();
    sx.add_falloff(prog, fo).unwrap();

    let path = dir.join("face.smpx");
    sx.save_container(&path).unwrap();
    path
}

#[test]
fn test_convert_to_legacy() {
    let dir = TempDir::new().unwrap();
    let input = write_container(dir.path());
    let output = dir.path().join("face.json");
    let config = SimplexConfig::default();

    commands::convert(&input, &output, true, false, &config).unwrap();

    let doc: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(doc["encodingVersion"], 1);
    assert_eq!(doc["shapes"][0], "Rest_Face");
    commands::info(&output, &config).unwrap();
}

#[test]
fn test_split_container() {
    let dir = TempDir::new().unwrap();
    let input = write_container(dir.path());
    let output = dir.path().join("face_split.smpx");
    let config = SimplexConfig::default();

    commands::split(&input, &output, &config).unwrap();

    let split = Simplex::load_container(&output, config).unwrap();
    assert!(split.find_slider("Smile_L_").is_some());
    assert!(split.find_slider("Smile_R_").is_some());
    assert!(split.find_slider("Smile_X_").is_none());
}

#[test]
fn test_check_reports_broken_files() {
    let dir = TempDir::new().unwrap();
    write_container(dir.path());
    let config = SimplexConfig::default();
    commands::check(dir.path(), &config).unwrap();

    let nested = dir.path().join("old");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("broken.json"), r#"{"encodingVersion": 7, "systemName": "X"}"#)
        .unwrap();
    fs::write(nested.join("notes.txt"), "not a rig").unwrap();

    let err = commands::check(dir.path(), &config).unwrap_err();
    assert!(err.to_string().contains("1 of 2"));
}

#[test]
fn test_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("simplex.json");
    fs::write(&path, r#"{"legacy": true, "slider_mul": 2.0}"#).unwrap();

    let config = commands::load_config(Some(&path)).unwrap();
    assert!(config.legacy);
    assert_eq!(config.slider_mul, 2.0);
    assert!(config.undo_enabled);

    fs::write(&path, r#"{"slider_mul": -1.0}"#).unwrap();
    assert!(commands::load_config(Some(&path)).is_err());
}
