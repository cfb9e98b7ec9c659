//! Model -> Scene export pipeline.
//!
//! Materializes the flat model back into a scene document: skeleton nodes
//! first, then one group node per mesh group with one mesh node per part,
//! each carrying geometry, skin clusters and blend-shape targets. The scene
//! is built in the canonical frame and re-oriented to the model's recorded
//! axis system at the end.

use glam::{DMat4, DQuat, DVec3};

use crate::model::{MeshGroup, Model, Part, Skeleton};
use crate::scene::{
    euler_degrees_from_quat, AttributeLayer, BindPose, BindPoseEntry, BlendShapeChannel,
    LayerMapping, NodeAttribute, SceneDocument, SceneMaterial, SceneMesh, SceneNode, ShapeTarget,
    SkeletonNodeKind, SkinCluster, SkinDeformer,
};
use crate::Error;

/// How vertex colors are laid out on exported meshes. Some downstream tools
/// only pick colors up through a per-corner index layer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum ColorMapping {
    #[default]
    ByControlPoint,
    CornerIndexed,
}

#[derive(Clone, Debug, Default)]
pub struct ExportConfig {
    pub color_mapping: ColorMapping,
}

pub fn export_model(model: &Model, config: &ExportConfig) -> Result<SceneDocument, Error> {
    let mut doc = SceneDocument::new(&model.root_name);
    let mut skeleton = model.skeleton.clone();

    let root = doc.add_root(SceneNode::new(&model.root_name));
    doc.poses.push(BindPose {
        name: "Bindpose".to_string(),
        entries: Vec::new(),
    });

    if let Some(skeleton_root) = skeleton.root {
        add_bone(&mut doc, &mut skeleton, skeleton_root, root);
    }

    doc.materials = model
        .materials
        .iter()
        .map(|m| SceneMaterial {
            name: m.name.clone(),
            diffuse: m.diffuse.clone(),
            normal: m.normal.clone(),
            specular: m.specular.clone(),
            opacity: m.opacity.clone(),
            emissive: m.emissive.clone(),
        })
        .collect();

    for group in &model.mesh_groups {
        let mut group_node = SceneNode::new(&format!("Group {}", group.id));
        if group.material_id < doc.materials.len() {
            group_node.material = Some(group.material_id);
        }
        let group_id = doc.add_child(root, group_node);
        add_pose_entry(&mut doc, group_id);

        for part in &group.parts {
            add_part(&mut doc, &skeleton, group, part, group_id, config)?;
        }
    }

    add_pose_entry(&mut doc, root);

    doc.convert_to_axis(model.axis);
    Ok(doc)
}

fn add_pose_entry(doc: &mut SceneDocument, node: usize) {
    let matrix = doc.global_matrix(node);
    doc.poses[0].entries.push(BindPoseEntry { node, matrix });
}

fn add_bone(doc: &mut SceneDocument, skeleton: &mut Skeleton, bone: usize, parent_node: usize) {
    let (translation, rotation, scale) = decompose_pose(skeleton.bones[bone].pose_matrix);

    let mut node = SceneNode::new(&skeleton.bones[bone].name);
    node.attribute = NodeAttribute::Skeleton(if skeleton.root == Some(bone) {
        SkeletonNodeKind::Root
    } else {
        SkeletonNodeKind::Limb
    });
    node.translation = translation;
    node.rotation = rotation;
    node.scale = scale;

    let id = doc.add_child(parent_node, node);
    skeleton.bones[bone].node = Some(id);
    add_pose_entry(doc, id);

    for child in skeleton.bones[bone].children.clone() {
        add_bone(doc, skeleton, child, id);
    }
}

/// Splits a local pose into node TRS. Bones are expected to carry unit scale;
/// column lengths are extracted anyway so a scaled pose survives the trip.
fn decompose_pose(matrix: DMat4) -> (DVec3, DVec3, DVec3) {
    let translation = matrix.w_axis.truncate();

    let x = matrix.x_axis.truncate();
    let y = matrix.y_axis.truncate();
    let z = matrix.z_axis.truncate();
    let scale = DVec3::new(x.length(), y.length(), z.length());

    let rotation = DMat4::from_cols(
        (x / non_zero(scale.x)).extend(0.0),
        (y / non_zero(scale.y)).extend(0.0),
        (z / non_zero(scale.z)).extend(0.0),
        glam::DVec4::W,
    );
    let degrees = euler_degrees_from_quat(DQuat::from_mat4(&rotation));

    (translation, degrees, scale)
}

fn non_zero(v: f64) -> f64 {
    if v == 0.0 { 1.0 } else { v }
}

fn add_part(
    doc: &mut SceneDocument,
    skeleton: &Skeleton,
    group: &MeshGroup,
    part: &Part,
    parent: usize,
    config: &ExportConfig,
) -> Result<(), Error> {
    let part_name = format!("Part_{}.{}", group.id, part.id);

    let node_id = doc.add_child(parent, SceneNode::new(&part_name));
    let node_global = doc.global_matrix(node_id);

    let positions: Vec<DVec3> = part.vertices.iter().map(|v| v.position).collect();

    let mut mesh = SceneMesh {
        control_points: positions.clone(),
        polygon_vertices: part.indices.clone(),
        polygon_count: part.indices.len() / 3,
        normals: Some(AttributeLayer::direct(
            LayerMapping::ByControlPoint,
            part.vertices.iter().map(|v| v.normal).collect(),
        )),
        ..SceneMesh::default()
    };

    mesh.uv_layers.push(AttributeLayer::direct(
        LayerMapping::ByControlPoint,
        part.vertices.iter().map(|v| v.uv1).collect(),
    ));
    mesh.uv_layers.push(AttributeLayer::direct(
        LayerMapping::ByControlPoint,
        part.vertices.iter().map(|v| v.uv2).collect(),
    ));
    if part.channels.uv3 {
        mesh.uv_layers.push(AttributeLayer::direct(
            LayerMapping::ByControlPoint,
            part.vertices
                .iter()
                .map(|v| v.uv3.unwrap_or_default())
                .collect(),
        ));
    }

    mesh.color_layers
        .push(color_layer(part, config, |v| v.color));
    if part.channels.color2 {
        mesh.color_layers
            .push(color_layer(part, config, |v| v.color2.unwrap_or(glam::DVec4::ONE)));
    }

    if part.channels.tangents {
        mesh.tangents = Some(AttributeLayer::direct(
            LayerMapping::ByControlPoint,
            part.vertices
                .iter()
                .map(|v| v.tangent.unwrap_or_default())
                .collect(),
        ));
        mesh.binormals = Some(AttributeLayer::direct(
            LayerMapping::ByControlPoint,
            part.vertices
                .iter()
                .map(|v| v.binormal.unwrap_or_default())
                .collect(),
        ));
    }

    mesh.skin = build_skin(doc, skeleton, group, part, &part_name, node_global)?;

    for (name, shape) in &part.shapes {
        let mut points = positions.clone();
        for (&vertex_id, replacement) in &shape.replacements {
            if vertex_id < points.len() {
                points[vertex_id] = replacement.position;
            }
        }
        mesh.blend_channels.push(BlendShapeChannel {
            name: name.clone(),
            deform_percent: 0.0,
            targets: vec![ShapeTarget {
                name: name.clone(),
                control_points: points,
            }],
        });
    }

    doc.node_mut(node_id).attribute = NodeAttribute::Mesh(Box::new(mesh));
    add_pose_entry(doc, node_id);

    Ok(())
}

fn color_layer(
    part: &Part,
    config: &ExportConfig,
    pick: impl Fn(&crate::model::Vertex) -> glam::DVec4,
) -> AttributeLayer<glam::DVec4> {
    let values: Vec<glam::DVec4> = part.vertices.iter().map(pick).collect();
    match config.color_mapping {
        ColorMapping::ByControlPoint => {
            AttributeLayer::direct(LayerMapping::ByControlPoint, values)
        }
        ColorMapping::CornerIndexed => {
            AttributeLayer::indexed(LayerMapping::ByCorner, values, part.indices.clone())
        }
    }
}

/// One cluster per palette bone, linked to the bone's scene node and fed the
/// (control point, weight) pairs of every vertex that references the bone.
/// Clusters that end up empty are discarded; an empty skeleton means no skin
/// at all rather than a failure.
fn build_skin(
    doc: &SceneDocument,
    skeleton: &Skeleton,
    group: &MeshGroup,
    part: &Part,
    part_name: &str,
    node_global: DMat4,
) -> Result<Option<SkinDeformer>, Error> {
    if skeleton.is_empty() || group.bone_palette.is_empty() {
        return Ok(None);
    }

    let mut clusters = Vec::new();
    for (local_id, bone_name) in group.bone_palette.iter().enumerate() {
        let bone_node = skeleton
            .bone_by_name(bone_name)
            .and_then(|b| skeleton.bones[b].node)
            .ok_or_else(|| Error::UnknownPaletteBone {
                mesh: group.id,
                bone: bone_name.clone(),
            })?;

        let mut control_points = Vec::new();
        let mut weights = Vec::new();
        for (vertex_id, vertex) in part.vertices.iter().enumerate() {
            for w in vertex.weights.slots() {
                if w.bone_id == local_id as i32 && w.weight > 0.0 {
                    control_points.push(vertex_id as u32);
                    weights.push(w.weight);
                }
            }
        }
        if control_points.is_empty() {
            continue;
        }

        clusters.push(SkinCluster {
            name: format!("{part_name} {bone_name} Cluster"),
            bone_node,
            control_points,
            weights,
            transform: node_global,
            transform_link: doc.global_matrix(bone_node),
        });
    }

    if clusters.is_empty() {
        return Ok(None);
    }
    Ok(Some(SkinDeformer { clusters }))
}
