//! Scene document JSON reader/writer.
//!
//! The loader is IO-free: it operates on an in-memory string.

use crate::scene::NodeAttribute;
use crate::{Error, SceneDocument};

pub fn load(text: &str) -> Result<SceneDocument, Error> {
    let doc: SceneDocument = serde_json::from_str(text).map_err(|e| Error::SceneParse {
        message: e.to_string(),
    })?;
    validate(&doc)?;
    Ok(doc)
}

pub fn save(doc: &SceneDocument) -> Result<String, Error> {
    serde_json::to_string_pretty(doc).map_err(|e| Error::SceneSerialize {
        message: e.to_string(),
    })
}

fn parse_error(message: String) -> Error {
    Error::SceneParse { message }
}

fn validate(doc: &SceneDocument) -> Result<(), Error> {
    let count = doc.nodes.len();

    for &root in &doc.roots {
        if root >= count {
            return Err(parse_error(format!("root id {root} out of range")));
        }
        if doc.nodes[root].parent.is_some() {
            return Err(parse_error(format!("root node {root} has a parent")));
        }
    }

    for (id, node) in doc.nodes.iter().enumerate() {
        for &child in &node.children {
            if child >= count {
                return Err(parse_error(format!(
                    "node '{}' references child {child} out of range",
                    node.name
                )));
            }
            if doc.nodes[child].parent != Some(id) {
                return Err(parse_error(format!(
                    "node '{}' lists child {child} that does not point back",
                    node.name
                )));
            }
        }

        if let Some(material) = node.material {
            if material >= doc.materials.len() {
                return Err(parse_error(format!(
                    "node '{}' references material {material} out of range",
                    node.name
                )));
            }
        }

        let NodeAttribute::Mesh(mesh) = &node.attribute else {
            continue;
        };

        let points = mesh.control_points.len();
        if mesh.polygon_vertices.iter().any(|&cp| cp as usize >= points) {
            return Err(parse_error(format!(
                "mesh '{}' has corner references past its control points",
                node.name
            )));
        }

        if let Some(skin) = &mesh.skin {
            for cluster in &skin.clusters {
                if cluster.bone_node >= count {
                    return Err(parse_error(format!(
                        "cluster '{}' links node {} out of range",
                        cluster.name, cluster.bone_node
                    )));
                }
                if cluster.control_points.len() != cluster.weights.len() {
                    return Err(parse_error(format!(
                        "cluster '{}' has {} control points but {} weights",
                        cluster.name,
                        cluster.control_points.len(),
                        cluster.weights.len()
                    )));
                }
            }
        }

        for channel in &mesh.blend_channels {
            for target in &channel.targets {
                if target.control_points.len() != points {
                    return Err(parse_error(format!(
                        "shape '{}' has {} control points, base mesh '{}' has {points}",
                        target.name,
                        target.control_points.len(),
                        node.name
                    )));
                }
            }
        }
    }

    Ok(())
}
