//! Vertex welding and skin-weight resolution.
//!
//! Every face corner yields a candidate vertex; corners sharing a control
//! point collapse into one output vertex when every attribute matches and
//! split into several when they diverge (UV seams, hard normals). Welding
//! rewrites index values only, never the index count or the winding.

use glam::{DMat4, DVec2, DVec3, DVec4};

use crate::model::{MeshGroup, Vertex, VertexChannels};
use crate::scene::{SceneDocument, SceneMesh};
use crate::weights::{WeightCapacity, WeightSet};

// Attribute fallbacks when a layer is absent or a lookup misses.
const DEFAULT_UV3: DVec2 = DVec2::new(1.0, 0.0);
const DEFAULT_COLOR: DVec4 = DVec4::ONE;

pub(crate) struct WeldOutput {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Control point -> the output vertices derived from it.
    pub vertex_sources: Vec<Vec<usize>>,
    pub channels: VertexChannels,
}

/// Resolves skin clusters to palette-local bone ids and accumulates bounded
/// weight sets per control point. Palette order is first-encounter order and
/// is shared by every part of the mesh group.
pub(crate) fn resolve_weights(
    doc: &SceneDocument,
    mesh: &SceneMesh,
    group: &mut MeshGroup,
    capacity: WeightCapacity,
) -> Vec<WeightSet> {
    let mut sets = vec![WeightSet::new(capacity); mesh.control_points.len()];

    let Some(skin) = &mesh.skin else {
        return sets;
    };

    for cluster in &skin.clusters {
        if cluster.control_points.is_empty() {
            continue;
        }
        let bone_name = &doc.node(cluster.bone_node).name;
        let bone_id = group.palette_id(bone_name) as i32;

        for (&cp, &weight) in cluster.control_points.iter().zip(&cluster.weights) {
            if let Some(set) = sets.get_mut(cp as usize) {
                set.add(bone_id, weight);
            }
        }
    }

    sets
}

/// Welds one mesh into deduplicated vertices plus rewritten triangle indices.
///
/// `control_points` are the (possibly shape-baked) positions in node-local
/// space; `world` is the node's evaluated global transform.
pub(crate) fn weld_mesh(
    mesh: &SceneMesh,
    control_points: &[DVec3],
    weights: &[WeightSet],
    world: DMat4,
) -> WeldOutput {
    let corner_count = mesh.corner_count();
    let point_count = control_points.len();

    let channels = VertexChannels {
        uv3: mesh.uv_layers.len() > 2,
        color2: mesh.color_layers.len() > 1,
        tangents: mesh.tangents.is_some() || mesh.binormals.is_some(),
    };

    // Corners grouped by originating control point.
    let mut corners_of_point: Vec<Vec<usize>> = vec![Vec::new(); point_count];
    for corner in 0..corner_count {
        corners_of_point[mesh.control_point_of_corner(corner)].push(corner);
    }

    let normal_matrix = world.inverse().transpose();

    let mut vertices: Vec<Vertex> = Vec::new();
    let mut indices: Vec<u32> = vec![0; corner_count];
    let mut vertex_sources: Vec<Vec<usize>> = vec![Vec::new(); point_count];

    for (cp, corners) in corners_of_point.iter().enumerate() {
        // Orphaned control point: nothing references it, emit nothing.
        if corners.is_empty() {
            continue;
        }

        let base = vertices.len();
        let mut shared: Vec<Vertex> = Vec::new();

        for &corner in corners {
            let candidate = corner_vertex(
                mesh,
                control_points,
                weights,
                channels,
                world,
                normal_matrix,
                corner,
                cp,
            );

            let slot = match shared.iter().position(|v| *v == candidate) {
                Some(existing) => existing,
                None => {
                    shared.push(candidate);
                    shared.len() - 1
                }
            };
            indices[corner] = (base + slot) as u32;
        }

        for slot in 0..shared.len() {
            vertex_sources[cp].push(base + slot);
        }
        vertices.extend(shared);
    }

    WeldOutput {
        vertices,
        indices,
        vertex_sources,
        channels,
    }
}

#[allow(clippy::too_many_arguments)]
fn corner_vertex(
    mesh: &SceneMesh,
    control_points: &[DVec3],
    weights: &[WeightSet],
    channels: VertexChannels,
    world: DMat4,
    normal_matrix: DMat4,
    corner: usize,
    cp: usize,
) -> Vertex {
    let position = world.transform_point3(control_points[cp]);

    let raw_normal = mesh
        .normals
        .as_ref()
        .and_then(|l| l.value_at(corner, cp))
        .unwrap_or(DVec3::ZERO);
    let normal = normal_matrix
        .transform_vector3(raw_normal)
        .normalize_or_zero();

    let uv = |layer: usize, default: DVec2| {
        mesh.uv_layers
            .get(layer)
            .and_then(|l| l.value_at(corner, cp))
            .unwrap_or(default)
    };
    let color = |layer: usize| {
        mesh.color_layers
            .get(layer)
            .and_then(|l| l.value_at(corner, cp))
            .unwrap_or(DEFAULT_COLOR)
    };

    Vertex {
        position,
        normal,
        color: color(0),
        color2: channels.color2.then(|| color(1)),
        uv1: uv(0, DVec2::ZERO),
        uv2: uv(1, DVec2::ZERO),
        uv3: channels.uv3.then(|| uv(2, DEFAULT_UV3)),
        tangent: channels.tangents.then(|| {
            mesh.tangents
                .as_ref()
                .and_then(|l| l.value_at(corner, cp))
                .unwrap_or(DVec3::ZERO)
        }),
        binormal: channels.tangents.then(|| {
            mesh.binormals
                .as_ref()
                .and_then(|l| l.value_at(corner, cp))
                .unwrap_or(DVec3::ZERO)
        }),
        weights: weights[cp],
    }
}
