use std::collections::BTreeMap;

use glam::{DMat4, DVec2, DVec3, DVec4};
use meshdb::{
    AxisSystem, Bone, Material, MeshGroup, Model, Part, ShapePart, Skeleton, Vertex,
    WeightCapacity, WeightSet,
};
use rusqlite::Connection;

use crate::columns::VertexColumns;
use crate::{read_model, write_model, Error};

fn vertex(position: DVec3, bone: i32, weight: f64, capacity: WeightCapacity) -> Vertex {
    let mut weights = WeightSet::new(capacity);
    if bone >= 0 {
        weights.add(bone, weight);
    }
    Vertex {
        position,
        normal: DVec3::Z,
        color: DVec4::new(0.2, 0.4, 0.6, 1.0),
        uv1: DVec2::new(0.5, 0.5),
        weights,
        ..Vertex::default()
    }
}

fn sample_model(capacity: WeightCapacity) -> Model {
    let mut part = Part::new(0);
    part.name = "Body 0.0".to_string();
    part.vertices = vec![
        vertex(DVec3::new(0.0, 0.0, 0.0), 0, 1.0, capacity),
        vertex(DVec3::new(1.0, 0.0, 0.0), 0, 0.75, capacity),
        vertex(DVec3::new(0.0, 1.0, 0.0), -1, 0.0, capacity),
    ];
    part.indices = vec![0, 1, 2];

    let mut replacement = part.vertices[1].clone();
    replacement.position = DVec3::new(2.0, 0.0, 0.0);
    part.shapes.insert(
        "shp_wide".to_string(),
        ShapePart {
            name: "shp_wide".to_string(),
            replacements: BTreeMap::from([(1, replacement)]),
        },
    );

    Model {
        root_name: "Sample".to_string(),
        unit: "centimeter".to_string(),
        axis: AxisSystem::from_codes('z', 'y', 'r').expect("valid axis"),
        application: "meshdb".to_string(),
        version: "0.1.0".to_string(),
        model_names: vec!["Sample".to_string()],
        materials: vec![Material {
            name: "mat".to_string(),
            diffuse: "mat_d.tex".to_string(),
            ..Material::default()
        }],
        mesh_groups: vec![MeshGroup {
            id: 0,
            name: "Group 0".to_string(),
            material_id: 0,
            model_name_id: 0,
            bone_palette: vec!["root".to_string(), "arm".to_string()],
            parts: vec![part],
        }],
        skeleton: Skeleton {
            bones: vec![
                Bone {
                    name: "root".to_string(),
                    parent_name: String::new(),
                    parent: None,
                    children: vec![1],
                    pose_matrix: DMat4::from_translation(DVec3::new(0.0, 1.0, 0.0)),
                    node: None,
                },
                Bone {
                    name: "arm".to_string(),
                    parent_name: "root".to_string(),
                    parent: Some(0),
                    children: Vec::new(),
                    pose_matrix: DMat4::from_translation(DVec3::new(0.5, 0.0, 0.0)),
                    node: None,
                },
            ],
            root: Some(0),
        },
    }
}

fn round_trip(model: &Model, warnings: &[String]) -> Model {
    let mut conn = Connection::open_in_memory().expect("in-memory db");
    write_model(&mut conn, model, warnings).expect("writes");
    read_model(&conn).expect("reads back")
}

#[test]
fn model_round_trips_through_the_store() {
    let model = sample_model(WeightCapacity::Four);
    let loaded = round_trip(&model, &[]);

    assert_eq!(loaded.root_name, "Sample");
    assert_eq!(loaded.unit, "centimeter");
    assert_eq!(loaded.axis.codes(), ('z', 'y', 'r'));
    assert_eq!(loaded.application, "meshdb");
    assert_eq!(loaded.version, "0.1.0");
    assert_eq!(loaded.model_names, vec!["Sample".to_string()]);
    assert_eq!(loaded.materials.len(), 1);
    assert_eq!(loaded.materials[0].diffuse, "mat_d.tex");

    assert_eq!(loaded.mesh_groups.len(), 1);
    let group = &loaded.mesh_groups[0];
    assert_eq!(group.name, "Group 0");
    assert_eq!(
        group.bone_palette,
        vec!["root".to_string(), "arm".to_string()]
    );

    let part = &group.parts[0];
    let original = &model.mesh_groups[0].parts[0];
    assert_eq!(part.name, original.name);
    assert_eq!(part.indices, original.indices);
    assert_eq!(part.vertices, original.vertices);

    let shape = part.shapes.get("shp_wide").expect("shape kept");
    assert_eq!(shape.replacements.len(), 1);
    assert_eq!(
        shape.replacements.get(&1).map(|r| r.position),
        Some(DVec3::new(2.0, 0.0, 0.0))
    );

    let root = loaded.skeleton.root.expect("skeleton kept");
    assert_eq!(loaded.skeleton.bones[root].name, "root");
    let arm = loaded.skeleton.bone_by_name("arm").expect("arm kept");
    assert_eq!(loaded.skeleton.bones[arm].parent, Some(root));
    assert_eq!(
        loaded.skeleton.bones[arm].pose_matrix,
        model.skeleton.bones[1].pose_matrix
    );
}

#[test]
fn eight_weight_models_get_wide_columns() {
    let mut model = sample_model(WeightCapacity::Eight);
    {
        let vertex = &mut model.mesh_groups[0].parts[0].vertices[0];
        let mut weights = WeightSet::new(WeightCapacity::Eight);
        for bone in 0..6 {
            weights.add(bone, 0.1 + f64::from(bone) * 0.01);
        }
        vertex.weights = weights;
    }

    let mut conn = Connection::open_in_memory().expect("in-memory db");
    write_model(&mut conn, &model, &[]).expect("writes");

    let columns = VertexColumns::detect(&conn).expect("detects");
    assert_eq!(columns.capacity, WeightCapacity::Eight);

    let loaded = read_model(&conn).expect("reads back");
    let vertex = &loaded.mesh_groups[0].parts[0].vertices[0];
    assert_eq!(vertex.weights.live_count(), 6);
    assert_eq!(vertex.weights, model.mesh_groups[0].parts[0].vertices[0].weights);
}

#[test]
fn optional_channels_round_trip_when_present() {
    let mut model = sample_model(WeightCapacity::Four);
    {
        let part = &mut model.mesh_groups[0].parts[0];
        part.channels.uv3 = true;
        part.channels.color2 = true;
        part.channels.tangents = true;
        for vertex in &mut part.vertices {
            vertex.uv3 = Some(DVec2::new(1.0, 0.0));
            vertex.color2 = Some(DVec4::new(0.1, 0.2, 0.3, 0.4));
            vertex.tangent = Some(DVec3::X);
            vertex.binormal = Some(DVec3::Y);
        }
    }

    let loaded = round_trip(&model, &[]);
    let part = &loaded.mesh_groups[0].parts[0];
    assert!(part.channels.uv3);
    assert!(part.channels.color2);
    assert!(part.channels.tangents);
    assert_eq!(part.vertices, model.mesh_groups[0].parts[0].vertices);
}

#[test]
fn optional_columns_are_absent_when_unused() {
    let model = sample_model(WeightCapacity::Four);
    let mut conn = Connection::open_in_memory().expect("in-memory db");
    write_model(&mut conn, &model, &[]).expect("writes");

    let columns = VertexColumns::detect(&conn).expect("detects");
    assert!(!columns.color2);
    assert!(!columns.uv3);
    assert!(!columns.tangents);
    assert_eq!(columns.capacity, WeightCapacity::Four);
}

#[test]
fn warnings_are_persisted() {
    let model = sample_model(WeightCapacity::Four);
    let mut conn = Connection::open_in_memory().expect("in-memory db");
    write_model(
        &mut conn,
        &model,
        &["first warning".to_string(), "second warning".to_string()],
    )
    .expect("writes");

    let mut stmt = conn
        .prepare("select text from warnings order by rowid")
        .expect("prepares");
    let texts: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .expect("queries")
        .collect::<Result<_, _>>()
        .expect("reads");
    assert_eq!(
        texts,
        vec!["first warning".to_string(), "second warning".to_string()]
    );
}

#[test]
fn skeleton_rows_carry_parent_links() {
    let model = sample_model(WeightCapacity::Four);
    let mut conn = Connection::open_in_memory().expect("in-memory db");
    write_model(&mut conn, &model, &[]).expect("writes");

    let mut stmt = conn
        .prepare(
            "select bone_id, parent_id, parent_name, name from bones \
             where mesh = -1 order by bone_id",
        )
        .expect("prepares");
    let rows: Vec<(i64, i64, String, String)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .expect("queries")
        .collect::<Result<_, _>>()
        .expect("reads");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], (0, -1, String::new(), "root".to_string()));
    assert_eq!(rows[1], (1, 0, "root".to_string(), "arm".to_string()));
}

#[test]
fn palette_rows_do_not_disturb_the_skeleton() {
    let model = sample_model(WeightCapacity::Four);
    let mut conn = Connection::open_in_memory().expect("in-memory db");
    write_model(&mut conn, &model, &[]).expect("writes");

    let count: i64 = conn
        .query_row("select count(*) from bones where mesh = 0", [], |row| {
            row.get(0)
        })
        .expect("counts");
    assert_eq!(count, 2);
}

#[test]
fn bootstrapping_twice_is_a_schema_error() {
    let model = sample_model(WeightCapacity::Four);
    let mut conn = Connection::open_in_memory().expect("in-memory db");
    write_model(&mut conn, &model, &[]).expect("first write");

    match write_model(&mut conn, &model, &[]) {
        Err(Error::Schema(_)) => {}
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn empty_skeleton_writes_no_skeleton_rows() {
    let mut model = sample_model(WeightCapacity::Four);
    model.skeleton = Skeleton::default();

    let loaded = round_trip(&model, &[]);
    assert!(loaded.skeleton.is_empty());
}
