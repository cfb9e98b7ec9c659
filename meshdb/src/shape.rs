//! Blend-shape collapsing.
//!
//! Channels whose single target carries the reserved name prefix become named
//! morph targets, recorded as sparse replacements. Everything else is a baked
//! deformer: its position delta, scaled by the channel's deform percentage,
//! is accumulated straight into the base control points before welding.

use std::collections::BTreeMap;

use glam::{DMat4, DVec3};
use log::{info, warn};

use crate::model::ShapePart;
use crate::scene::SceneMesh;
use crate::weld::WeldOutput;

/// Target-shape names starting with this are discrete morph targets.
pub const MORPH_PREFIX: &str = "shp_";

pub(crate) struct CollapsedShapes {
    /// Base control points with every baked channel applied.
    pub control_points: Vec<DVec3>,
    /// Named morphs still keyed by control point, in node-local space.
    pub morphs: Vec<PendingMorph>,
    pub warnings: Vec<String>,
}

pub(crate) struct PendingMorph {
    pub name: String,
    pub replacements: BTreeMap<usize, DVec3>,
}

pub(crate) fn collapse_channels(mesh: &SceneMesh, mesh_name: &str) -> CollapsedShapes {
    let mut baked = mesh.control_points.clone();
    let mut morphs = Vec::new();
    let mut warnings = Vec::new();

    for channel in &mesh.blend_channels {
        if channel.targets.is_empty() {
            continue;
        }
        if channel.targets.len() > 1 {
            let text = format!(
                "{mesh_name} contains invalid shape channel '{}'. Channel will be ignored.",
                channel.name
            );
            warn!("{text}");
            warnings.push(text);
            continue;
        }

        let target = &channel.targets[0];

        if target.name.starts_with(MORPH_PREFIX) {
            // Deltas are measured against the unbaked base positions.
            let mut replacements = BTreeMap::new();
            for (cp, &shape_point) in target.control_points.iter().enumerate() {
                if Some(&shape_point) == mesh.control_points.get(cp) {
                    continue;
                }
                replacements.insert(cp, shape_point);
            }
            morphs.push(PendingMorph {
                name: target.name.clone(),
                replacements,
            });
        } else {
            let pct = channel.deform_percent;
            if pct == 0.0 {
                continue;
            }
            info!("Applying blend shape {} to mesh {mesh_name}", target.name);
            for (point, &shape_point) in baked.iter_mut().zip(&target.control_points) {
                let influence = (shape_point - *point) * pct * 0.01;
                *point += influence;
            }
        }
    }

    CollapsedShapes {
        control_points: baked,
        morphs,
        warnings,
    }
}

/// Rekeys morph replacements from control-point index to output-vertex index.
/// A split control point applies its replacement to every derived vertex; all
/// attributes except the position come from the base vertex.
pub(crate) fn remap_morphs(
    morphs: Vec<PendingMorph>,
    weld: &WeldOutput,
    world: DMat4,
) -> BTreeMap<String, ShapePart> {
    let mut shapes = BTreeMap::new();

    for morph in morphs {
        let mut part = ShapePart {
            name: morph.name.clone(),
            replacements: BTreeMap::new(),
        };
        for (cp, local_position) in morph.replacements {
            let position = world.transform_point3(local_position);
            for &vertex_id in weld
                .vertex_sources
                .get(cp)
                .map(Vec::as_slice)
                .unwrap_or(&[])
            {
                let mut replacement = weld.vertices[vertex_id].clone();
                replacement.position = position;
                part.replacements.insert(vertex_id, replacement);
            }
        }
        shapes.insert(morph.name, part);
    }

    shapes
}
