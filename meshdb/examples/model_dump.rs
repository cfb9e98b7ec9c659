use std::path::PathBuf;

use meshdb::{import_scene, json, ImportConfig, WeightCapacity};
use serde_json::json;

fn main() {
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let scene_path = args
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./assets/body.scene.json"));
    let weights = args
        .get(1)
        .and_then(|w| w.parse::<usize>().ok())
        .and_then(WeightCapacity::from_limit)
        .unwrap_or_default();

    let text = std::fs::read_to_string(&scene_path).expect("read scene");
    let doc = json::load(&text).expect("parse scene");

    let config = ImportConfig {
        weight_capacity: weights,
        ..ImportConfig::default()
    };
    let import = import_scene(doc, &config).expect("import scene");
    let model = &import.model;

    let groups: Vec<_> = model
        .mesh_groups
        .iter()
        .map(|group| {
            let parts: Vec<_> = group
                .parts
                .iter()
                .map(|part| {
                    json!({
                        "part": part.id,
                        "name": part.name,
                        "vertices": part.vertices.len(),
                        "triangles": part.indices.len() / 3,
                        "shapes": part.shapes.keys().collect::<Vec<_>>(),
                    })
                })
                .collect();
            json!({
                "mesh": group.id,
                "name": group.name,
                "palette": group.bone_palette,
                "parts": parts,
            })
        })
        .collect();

    let bones: Vec<_> = model
        .skeleton
        .bones
        .iter()
        .map(|bone| {
            json!({
                "name": bone.name,
                "parent": bone.parent_name,
            })
        })
        .collect();

    let out = json!({
        "root": model.root_name,
        "unit": model.unit,
        "axis": {
            "up": model.axis.codes().0.to_string(),
            "front": model.axis.codes().1.to_string(),
            "handedness": model.axis.codes().2.to_string(),
        },
        "groups": groups,
        "skeleton": bones,
        "warnings": import.warnings,
    });
    println!("{}", serde_json::to_string_pretty(&out).expect("serialize"));
}
