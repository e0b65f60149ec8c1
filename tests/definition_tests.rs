//! Definition Tests
//!
//! Round trips through every supported encoding version.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;

use simplex::items::{Axis, GroupKind, PlanarFalloff, SolveType};
use simplex::{MemoryHost, Simplex, SimplexConfig};

/// Two sliders, a combo, a traversal and a falloff spread over custom groups.
fn build_rig() -> Simplex {
    let mut sx = Simplex::in_memory("Face").unwrap();
    let brows = sx.create_group("Brows", GroupKind::Slider).unwrap();
    let a = sx.create_slider("BrowUp", Some(brows), None, 1.0).unwrap();
    let b = sx.create_slider("JawOpen", None, None, 1.0).unwrap();
    let a_prog = sx.slider(a).unwrap().prog();
    sx.create_prog_shape(a_prog, Some("BrowDown"), Some(-1.0)).unwrap();

    sx.create_combo(
        "BrowUp_JawOpen",
        &[(a, 1.0), (b, 1.0)],
        None,
        None,
        Some(SolveType::Min),
        1.0,
    )
    .unwrap();
    sx.create_traversal("Tv", &[(a, 1.0)], &[(a, 1.0), (b, 1.0)], None, 2)
        .unwrap();

    let fo = sx
        .create_planar_falloff("Center", PlanarFalloff::new(Axis::X, -1.0, -0.1, 0.1, 1.0))
        .unwrap();
    sx.add_falloff(a_prog, fo).unwrap();
    sx
}

/// Names, pairs, group membership and falloff links, independent of ids.
fn summary(sx: &Simplex) -> Vec<String> {
    let shape_name = |id| sx.shape(id).unwrap().name().to_string();
    let slider_name = |id| sx.slider(id).unwrap().name().to_string();
    let prog_line = |prog| {
        let p = sx.progression(prog).unwrap();
        let pairs: Vec<String> = p
            .pairs()
            .iter()
            .map(|pp| format!("{}@{}", shape_name(pp.shape), pp.value))
            .collect();
        let falloffs: Vec<&str> = p
            .falloffs()
            .iter()
            .map(|&f| sx.falloff(f).unwrap().name())
            .collect();
        format!("[{}] falloffs={:?}", pairs.join(" "), falloffs)
    };

    let mut out = vec![format!("system {}", sx.name())];
    out.extend(sx.shapes().iter().map(|&s| format!("shape {}", shape_name(s))));
    for &s in sx.sliders() {
        let slider = sx.slider(s).unwrap();
        out.push(format!(
            "slider {} in {} {}",
            slider.name(),
            sx.group(slider.group()).unwrap().name(),
            prog_line(slider.prog())
        ));
    }
    for &c in sx.combos() {
        let combo = sx.combo(c).unwrap();
        let pairs: Vec<String> = combo
            .pairs()
            .iter()
            .map(|p| format!("{}={}", slider_name(p.slider), p.value))
            .collect();
        out.push(format!(
            "combo {} ({}) in {} {}",
            combo.name(),
            pairs.join(","),
            sx.group(combo.group()).unwrap().name(),
            prog_line(combo.prog())
        ));
    }
    for &t in sx.traversals() {
        let trav = sx.traversal(t).unwrap();
        let mut points: Vec<String> = trav
            .all_sliders()
            .into_iter()
            .map(|s| {
                format!(
                    "{}:{}->{}",
                    slider_name(s),
                    trav.start().value_of(s),
                    trav.end().value_of(s)
                )
            })
            .collect();
        points.sort();
        out.push(format!(
            "traversal {} ({}) in {} {}",
            trav.name(),
            points.join(","),
            sx.group(trav.group()).unwrap().name(),
            prog_line(trav.prog())
        ));
    }
    out
}

/// Rewrite a version 3 document's traversals in the version 2 control form.
fn to_version_2(mut doc: Value) -> Value {
    doc["encodingVersion"] = json!(2);
    let sliders: Vec<String> = doc["sliders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    let index = |name: &str| sliders.iter().position(|s| s == name).unwrap();
    for trav in doc["traversals"].as_array_mut().unwrap() {
        let group = trav["group"].clone();
        let prog = trav["prog"].clone();
        let name = trav["name"].clone();
        *trav = json!({
            "name": name,
            "prog": prog,
            "progressType": "slider",
            "progressControl": index("JawOpen"),
            "progressFlip": false,
            "multiplierType": "slider",
            "multiplierControl": index("BrowUp"),
            "multiplierFlip": false,
            "group": group,
        });
    }
    doc
}

fn encode(sx: &Simplex, version: u32) -> String {
    let doc = match version {
        1 => sx.build_definition(true).unwrap(),
        2 => to_version_2(sx.build_definition(false).unwrap()),
        _ => sx.build_definition(false).unwrap(),
    };
    doc.to_string()
}

// === Round Trips ===

#[test_case(1 ; "positional")]
#[test_case(2 ; "control traversals")]
#[test_case(3 ; "point traversals")]
fn test_round_trip(version: u32) {
    let original = build_rig();
    let text = encode(&original, version);

    let loaded =
        Simplex::from_definition_str(&text, Box::new(MemoryHost::new()), SimplexConfig::default())
            .unwrap();

    assert_eq!(summary(&loaded), summary(&original));
}

#[test]
fn test_current_round_trip_is_stable() {
    let original = build_rig();
    let first = original.build_definition(false).unwrap();
    let loaded = Simplex::from_definition(
        &first,
        Box::new(MemoryHost::new()),
        SimplexConfig::default(),
    )
    .unwrap();
    assert_eq!(loaded.build_definition(false).unwrap(), first);
}

// === Document Shape ===

#[test_case(true ; "legacy")]
#[test_case(false ; "current")]
fn test_rest_first_and_indices_in_bounds(legacy: bool) {
    let doc = build_rig().build_definition(legacy).unwrap();
    let len = |key: &str| doc[key].as_array().unwrap().len() as u64;
    let (shapes, progs, sliders) = (len("shapes"), len("progressions"), len("sliders"));

    let rest = if legacy {
        doc["shapes"][0].clone()
    } else {
        doc["shapes"][0]["name"].clone()
    };
    assert_eq!(rest, json!("Rest_Face"));

    for prog in doc["progressions"].as_array().unwrap() {
        let indices: Vec<u64> = if legacy {
            prog[1].as_array().unwrap().iter().map(|i| i.as_u64().unwrap()).collect()
        } else {
            prog["pairs"]
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p[0].as_u64().unwrap())
                .collect()
        };
        assert!(indices.iter().all(|&i| i < shapes));
    }
    for combo in doc["combos"].as_array().unwrap() {
        let (prog, pairs) = if legacy {
            (&combo[1], &combo[2])
        } else {
            (&combo["prog"], &combo["pairs"])
        };
        assert!(prog.as_u64().unwrap() < progs);
        for pair in pairs.as_array().unwrap() {
            assert!(pair[0].as_u64().unwrap() < sliders);
        }
    }
}

#[test]
fn test_unsupported_version() {
    let err = Simplex::from_definition_str(
        r#"{"encodingVersion": 9, "systemName": "Face"}"#,
        Box::new(MemoryHost::new()),
        SimplexConfig::default(),
    )
    .err()
    .unwrap();
    assert_eq!(err.error_code(), "UNSUPPORTED_VERSION");
}

#[test]
fn test_dump_honours_config() {
    let mut config = SimplexConfig::default();
    config.legacy = true;
    config.pretty = true;
    let text = encode(&build_rig(), 3);
    let sx = Simplex::from_definition_str(&text, Box::new(MemoryHost::new()), config).unwrap();

    let dumped = sx.dump().unwrap();
    assert!(dumped.contains('\n'));
    let doc: Value = serde_json::from_str(&dumped).unwrap();
    assert_eq!(doc["encodingVersion"], json!(1));
}
