use glam::{DMat4, DVec2, DVec3, DVec4};

use crate::model::MeshGroup;
use crate::scene::{
    AttributeLayer, LayerMapping, SceneDocument, SceneMesh, SceneNode, SkinCluster, SkinDeformer,
};
use crate::weights::WeightCapacity;
use crate::weld::{resolve_weights, weld_mesh};

fn no_weights(count: usize) -> Vec<crate::weights::WeightSet> {
    vec![crate::weights::WeightSet::new(WeightCapacity::Four); count]
}

/// One triangle, three distinct control points, everything by control point.
fn triangle_mesh() -> SceneMesh {
    SceneMesh {
        control_points: vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ],
        polygon_vertices: vec![0, 1, 2],
        polygon_count: 1,
        normals: Some(AttributeLayer::direct(
            LayerMapping::ByControlPoint,
            vec![DVec3::Z, DVec3::Z, DVec3::Z],
        )),
        uv_layers: vec![AttributeLayer::direct(
            LayerMapping::ByControlPoint,
            vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(1.0, 0.0),
                DVec2::new(0.0, 1.0),
            ],
        )],
        ..SceneMesh::default()
    }
}

#[test]
fn welds_unique_corners_one_to_one() {
    let mesh = triangle_mesh();
    let out = weld_mesh(&mesh, &mesh.control_points, &no_weights(3), DMat4::IDENTITY);

    assert_eq!(out.vertices.len(), 3);
    assert_eq!(out.indices, vec![0, 1, 2]);
    assert_eq!(out.vertices[1].position, DVec3::new(1.0, 0.0, 0.0));
    assert_eq!(out.vertices[1].uv1, DVec2::new(1.0, 0.0));
    for sources in &out.vertex_sources {
        assert_eq!(sources.len(), 1);
    }
}

#[test]
fn preserves_corner_order_and_winding() {
    let mut mesh = triangle_mesh();
    mesh.polygon_vertices = vec![2, 1, 0];
    let out = weld_mesh(&mesh, &mesh.control_points, &no_weights(3), DMat4::IDENTITY);

    // Vertices come out in control-point order, corners keep their slots.
    assert_eq!(out.indices, vec![2, 1, 0]);
    assert_eq!(out.vertices[2].position, DVec3::new(0.0, 1.0, 0.0));
}

#[test]
fn welding_is_idempotent() {
    let mesh = triangle_mesh();
    let first = weld_mesh(&mesh, &mesh.control_points, &no_weights(3), DMat4::IDENTITY);

    // Rebuild a mesh from the welded output, the way the exporter does.
    let rebuilt = SceneMesh {
        control_points: first.vertices.iter().map(|v| v.position).collect(),
        polygon_vertices: first.indices.clone(),
        polygon_count: first.indices.len() / 3,
        normals: Some(AttributeLayer::direct(
            LayerMapping::ByControlPoint,
            first.vertices.iter().map(|v| v.normal).collect(),
        )),
        uv_layers: vec![AttributeLayer::direct(
            LayerMapping::ByControlPoint,
            first.vertices.iter().map(|v| v.uv1).collect(),
        )],
        ..SceneMesh::default()
    };

    let second = weld_mesh(
        &rebuilt,
        &rebuilt.control_points,
        &no_weights(first.vertices.len()),
        DMat4::IDENTITY,
    );

    assert_eq!(second.indices, first.indices);
    assert_eq!(second.vertices.len(), first.vertices.len());
    for (a, b) in second.vertices.iter().zip(&first.vertices) {
        assert_eq!(a, b);
    }
    for (cp, sources) in second.vertex_sources.iter().enumerate() {
        assert_eq!(sources.as_slice(), &[cp]);
    }
}

#[test]
fn splits_control_points_on_uv_seams() {
    // Two triangles share control points 1 and 2; corner UVs disagree on
    // control point 1 only.
    let mesh = SceneMesh {
        control_points: vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
        ],
        polygon_vertices: vec![0, 1, 2, 1, 3, 2],
        polygon_count: 2,
        uv_layers: vec![AttributeLayer::direct(
            LayerMapping::ByCorner,
            vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(0.5, 0.0), // corner 1 -> control point 1
                DVec2::new(0.0, 1.0),
                DVec2::new(0.9, 0.0), // corner 3 -> control point 1, differs
                DVec2::new(1.0, 1.0),
                DVec2::new(0.0, 1.0),
            ],
        )],
        ..SceneMesh::default()
    };

    let out = weld_mesh(&mesh, &mesh.control_points, &no_weights(4), DMat4::IDENTITY);

    // Control point 1 split into two vertices, the rest stayed whole.
    assert_eq!(out.vertices.len(), 5);
    assert_eq!(out.indices.len(), 6);
    assert_eq!(out.vertex_sources[1].len(), 2);
    assert_eq!(out.vertex_sources[0].len(), 1);

    // Both split vertices sit at the same position with their own UVs.
    let (a, b) = (out.indices[1] as usize, out.indices[3] as usize);
    assert_ne!(a, b);
    assert_eq!(out.vertices[a].position, out.vertices[b].position);
    assert_ne!(out.vertices[a].uv1, out.vertices[b].uv1);

    // Corners 2 and 5 reference the same welded vertex.
    assert_eq!(out.indices[2], out.indices[5]);
}

#[test]
fn index_count_matches_three_per_polygon() {
    let mesh = triangle_mesh();
    let out = weld_mesh(&mesh, &mesh.control_points, &no_weights(3), DMat4::IDENTITY);
    assert_eq!(out.indices.len(), 3 * mesh.polygon_count);
}

#[test]
fn resolves_indexed_corner_layers() {
    let mut mesh = triangle_mesh();
    mesh.uv_layers = vec![AttributeLayer::indexed(
        LayerMapping::ByCorner,
        vec![DVec2::new(0.25, 0.25), DVec2::new(0.75, 0.75)],
        vec![1, 0, 1],
    )];

    let out = weld_mesh(&mesh, &mesh.control_points, &no_weights(3), DMat4::IDENTITY);
    assert_eq!(out.vertices[out.indices[0] as usize].uv1, DVec2::new(0.75, 0.75));
    assert_eq!(out.vertices[out.indices[1] as usize].uv1, DVec2::new(0.25, 0.25));
}

#[test]
fn missing_layers_fall_back_to_defaults() {
    let mesh = SceneMesh {
        control_points: vec![DVec3::ZERO, DVec3::X, DVec3::Y],
        polygon_vertices: vec![0, 1, 2],
        polygon_count: 1,
        ..SceneMesh::default()
    };

    let out = weld_mesh(&mesh, &mesh.control_points, &no_weights(3), DMat4::IDENTITY);
    let v = &out.vertices[0];
    assert_eq!(v.normal, DVec3::ZERO);
    assert_eq!(v.color, DVec4::ONE);
    assert_eq!(v.uv1, DVec2::ZERO);
    assert_eq!(v.uv2, DVec2::ZERO);
    assert!(v.uv3.is_none());
    assert!(v.color2.is_none());
    assert!(v.tangent.is_none());
    assert!(!out.channels.uv3);
    assert!(!out.channels.color2);
    assert!(!out.channels.tangents);
}

#[test]
fn orphaned_control_points_emit_nothing() {
    let mut mesh = triangle_mesh();
    mesh.control_points.push(DVec3::new(9.0, 9.0, 9.0));
    if let Some(normals) = &mut mesh.normals {
        normals.values.push(DVec3::Z);
    }
    mesh.uv_layers[0].values.push(DVec2::ZERO);

    let out = weld_mesh(&mesh, &mesh.control_points, &no_weights(4), DMat4::IDENTITY);
    assert_eq!(out.vertices.len(), 3);
    assert!(out.vertex_sources[3].is_empty());
}

#[test]
fn transforms_positions_and_normals_into_world_space() {
    let mesh = triangle_mesh();
    // Rotate -90 degrees about X and push up: Z normals become Y normals.
    let world = DMat4::from_translation(DVec3::new(0.0, 5.0, 0.0))
        * DMat4::from_rotation_x(-std::f64::consts::FRAC_PI_2)
        * DMat4::from_scale(DVec3::splat(2.0));

    let out = weld_mesh(&mesh, &mesh.control_points, &no_weights(3), world);

    let p = out.vertices[1].position;
    assert!((p - DVec3::new(2.0, 5.0, 0.0)).length() < 1e-9);

    let n = out.vertices[0].normal;
    assert!((n - DVec3::Y).length() < 1e-9, "normal renormalized, got {n:?}");
}

#[test]
fn cluster_order_defines_the_palette() {
    let mut doc = SceneDocument::new("skin test");
    let hips = doc.add_root(SceneNode::new("hips"));
    let arm = doc.add_child(hips, SceneNode::new("arm"));

    let mut mesh = triangle_mesh();
    mesh.skin = Some(SkinDeformer {
        clusters: vec![
            SkinCluster {
                name: "arm cluster".to_string(),
                bone_node: arm,
                control_points: vec![0, 1],
                weights: vec![0.7, 0.6],
                transform: DMat4::IDENTITY,
                transform_link: DMat4::IDENTITY,
            },
            SkinCluster {
                name: "empty cluster".to_string(),
                bone_node: hips,
                control_points: vec![],
                weights: vec![],
                transform: DMat4::IDENTITY,
                transform_link: DMat4::IDENTITY,
            },
            SkinCluster {
                name: "hips cluster".to_string(),
                bone_node: hips,
                control_points: vec![0, 2, 99],
                weights: vec![0.3, 1.0, 1.0],
                transform: DMat4::IDENTITY,
                transform_link: DMat4::IDENTITY,
            },
        ],
    });

    let mut group = MeshGroup::new(0);
    let sets = resolve_weights(&doc, &mesh, &mut group, WeightCapacity::Four);

    // First-seen order, and the empty cluster never touched the palette.
    assert_eq!(group.bone_palette, vec!["arm".to_string(), "hips".to_string()]);

    let live0: Vec<(i32, f64)> = sets[0].live().map(|w| (w.bone_id, w.weight)).collect();
    assert_eq!(live0, vec![(0, 0.7), (1, 0.3)]);
    let live2: Vec<(i32, f64)> = sets[2].live().map(|w| (w.bone_id, w.weight)).collect();
    assert_eq!(live2, vec![(1, 1.0)]);
    // Control point 99 is out of range and silently dropped.
}
