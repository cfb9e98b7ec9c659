//! Scene -> Model import pipeline.
//!
//! Walks the node tree depth-first, admits mesh nodes whose names carry a
//! trailing `<separator><mesh>[.<part>]` tag, and runs each admitted node
//! through shape collapsing, weight resolution and vertex welding. Per-node
//! problems are warnings; the only fatal condition is untriangulated
//! geometry.

use std::collections::BTreeSet;

use log::warn;
use regex::Regex;

use crate::axis::AxisSystem;
use crate::model::{Material, Model};
use crate::scene::SceneDocument;
use crate::skeleton::{self, BoneSeed};
use crate::weights::WeightCapacity;
use crate::{shape, weld, Error};

#[derive(Clone, Debug)]
pub struct ImportConfig {
    pub weight_capacity: WeightCapacity,
    /// Recorded into the database metadata.
    pub application: String,
    pub version: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            weight_capacity: WeightCapacity::default(),
            application: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A finished import: the model plus every non-fatal warning raised while
/// building it (the store persists these alongside the rows).
#[derive(Clone, Debug)]
pub struct Import {
    pub model: Model,
    pub warnings: Vec<String>,
}

/// Parses the trailing mesh/part tag out of node names.
///
/// The separator before the mesh index is `_`, space or `^`; an optional part
/// index follows after `.` or `-` and defaults to 0.
pub struct NodeSelector {
    pattern: Regex,
}

impl Default for NodeSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeSelector {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"[_ ^]([0-9]+)[.\-]?([0-9]+)?$").expect("static pattern"),
        }
    }

    pub fn parse(&self, name: &str) -> Option<(usize, usize)> {
        let caps = self.pattern.captures(name)?;
        let mesh = caps[1].parse().ok()?;
        let part = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        Some((mesh, part))
    }
}

/// Converts a loaded scene into the flat model.
///
/// The scene is normalized to meters and the canonical axis frame first; the
/// model metadata keeps the scene's original unit and axis codes so a later
/// export can restore them.
pub fn import_scene(mut doc: SceneDocument, config: &ImportConfig) -> Result<Import, Error> {
    let mut model = Model {
        root_name: doc.name.clone(),
        unit: doc.settings.unit.clone(),
        axis: doc.settings.axis,
        application: config.application.clone(),
        version: config.version.clone(),
        model_names: vec![doc.name.clone()],
        ..Model::default()
    };

    doc.convert_to_meters();
    doc.convert_to_axis(AxisSystem::CANONICAL);

    let mut warnings = Vec::new();
    let selector = NodeSelector::new();
    let mut seen: BTreeSet<(usize, usize)> = BTreeSet::new();

    for id in doc.depth_first() {
        let node = doc.node(id);
        if node.mesh().is_none() || !node.visible {
            continue;
        }
        let Some((mesh_id, part_id)) = selector.parse(&node.name) else {
            continue;
        };
        import_node(
            &doc,
            id,
            mesh_id,
            part_id,
            &mut model,
            &mut seen,
            &mut warnings,
            config,
        )?;
    }

    capture_skeleton(&doc, &mut model)?;

    model.materials = doc
        .materials
        .iter()
        .map(|m| Material {
            name: m.name.clone(),
            diffuse: m.diffuse.clone(),
            normal: m.normal.clone(),
            specular: m.specular.clone(),
            opacity: m.opacity.clone(),
            emissive: m.emissive.clone(),
        })
        .collect();

    Ok(Import { model, warnings })
}

fn record(warnings: &mut Vec<String>, text: String) {
    warn!("{text}");
    warnings.push(text);
}

#[allow(clippy::too_many_arguments)]
fn import_node(
    doc: &SceneDocument,
    id: usize,
    mesh_id: usize,
    part_id: usize,
    model: &mut Model,
    seen: &mut BTreeSet<(usize, usize)>,
    warnings: &mut Vec<String>,
    config: &ImportConfig,
) -> Result<(), Error> {
    let node = doc.node(id);
    let Some(mesh) = node.mesh() else {
        return Ok(());
    };
    let name = node.name.clone();

    let num_vertices = mesh.control_points.len();
    let num_indices = mesh.corner_count();
    if num_indices == 0 || num_vertices == 0 {
        record(
            warnings,
            format!("Ignored mesh: {name} - Mesh had no vertices/triangles."),
        );
        return Ok(());
    }
    if mesh.skin.is_none() {
        record(
            warnings,
            format!(
                "Mesh: {name} - Does not have a valid skin element. This will cause \
                 animation issues if this is intended to be an animated mesh."
            ),
        );
    }
    if !seen.insert((mesh_id, part_id)) {
        record(
            warnings,
            format!("Ignored mesh: {name} - Mesh {mesh_id} Part {part_id} already exists."),
        );
        return Ok(());
    }
    if num_indices != mesh.polygon_count * 3 {
        return Err(Error::NotTriangulated {
            mesh: name,
            polygons: mesh.polygon_count,
            corners: num_indices,
        });
    }

    let parent_name = match node.parent {
        Some(p) => doc.node(p).name.clone(),
        None => format!("Group {mesh_id}"),
    };

    let collapsed = shape::collapse_channels(mesh, &name);
    warnings.extend(collapsed.warnings.iter().cloned());

    let group = model.mesh_group_mut(mesh_id);
    if group.name.is_empty() {
        group.name = parent_name;
        group.material_id = node.material.unwrap_or(0);
    }

    let weights = weld::resolve_weights(doc, mesh, group, config.weight_capacity);

    let world = doc.global_matrix(id);
    let welded = weld::weld_mesh(mesh, &collapsed.control_points, &weights, world);

    let part = group.part_mut(part_id);
    part.name = name;
    part.channels = welded.channels;
    part.shapes = shape::remap_morphs(collapsed.morphs, &welded, world);
    part.vertices = welded.vertices;
    part.indices = welded.indices;

    Ok(())
}

/// Collects the skeleton the scene actually uses: nodes flagged as skeleton
/// limbs plus every cluster link target. Parent links skip over any non-bone
/// nodes in between, so bone-local pose matrices stay relative to the parent
/// bone.
fn capture_skeleton(doc: &SceneDocument, model: &mut Model) -> Result<(), Error> {
    let mut bone_nodes: BTreeSet<usize> = BTreeSet::new();
    for id in 0..doc.nodes.len() {
        if doc.node(id).is_skeleton() {
            bone_nodes.insert(id);
        }
    }
    for node in &doc.nodes {
        let Some(mesh) = node.mesh() else { continue };
        let Some(skin) = &mesh.skin else { continue };
        for cluster in &skin.clusters {
            bone_nodes.insert(cluster.bone_node);
        }
    }
    if bone_nodes.is_empty() {
        return Ok(());
    }

    let mut seeds = Vec::new();
    for id in doc.depth_first() {
        if !bone_nodes.contains(&id) {
            continue;
        }

        let mut parent_bone = doc.node(id).parent;
        while let Some(p) = parent_bone {
            if bone_nodes.contains(&p) {
                break;
            }
            parent_bone = doc.node(p).parent;
        }

        let (parent_name, matrix) = match parent_bone {
            Some(p) => (
                doc.node(p).name.clone(),
                doc.global_matrix(p).inverse() * doc.global_matrix(id),
            ),
            None => (String::new(), doc.global_matrix(id)),
        };
        seeds.push(BoneSeed {
            name: doc.node(id).name.clone(),
            parent_name,
            matrix,
        });
    }

    model.skeleton = skeleton::assemble(&seeds)?;
    Ok(())
}
