//! Model -> rows. The whole model goes out in one transaction; positional
//! binds follow the declared column order exactly.

use glam::DMat4;
use meshdb::skeleton;
use meshdb::{Model, Vertex};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Transaction};

use crate::columns::VertexColumns;
use crate::{schema, Error};

pub fn write_model(conn: &mut Connection, model: &Model, warnings: &[String]) -> Result<(), Error> {
    let columns = VertexColumns::for_model(model);
    schema::create(conn, &columns)?;

    let tx = conn.transaction()?;
    write_meta(&tx, model)?;
    write_models(&tx, model)?;
    write_materials(&tx, model)?;
    write_skeleton(&tx, model)?;
    write_groups(&tx, model, &columns)?;
    write_warnings(&tx, warnings)?;
    tx.commit()?;
    Ok(())
}

fn write_meta(tx: &Transaction, model: &Model) -> Result<(), Error> {
    let (up, front, handedness) = model.axis.codes();
    let (up, front, handedness) = (up.to_string(), front.to_string(), handedness.to_string());
    let mut stmt = tx.prepare("insert into meta (key, value) values (?1, ?2)")?;
    for (key, value) in [
        ("unit", model.unit.as_str()),
        ("up", up.as_str()),
        ("front", front.as_str()),
        ("handedness", handedness.as_str()),
        ("root_name", model.root_name.as_str()),
        ("application", model.application.as_str()),
        ("version", model.version.as_str()),
    ] {
        stmt.execute(params![key, value])?;
    }
    Ok(())
}

fn write_models(tx: &Transaction, model: &Model) -> Result<(), Error> {
    let mut stmt = tx.prepare("insert into models (model, name) values (?1, ?2)")?;
    for (id, name) in model.model_names.iter().enumerate() {
        stmt.execute(params![id as i64, name])?;
    }
    Ok(())
}

fn write_materials(tx: &Transaction, model: &Model) -> Result<(), Error> {
    let mut stmt = tx.prepare(
        "insert into materials (material_id, diffuse, normal, specular, opacity, emissive, name) \
         values (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for (id, material) in model.materials.iter().enumerate() {
        stmt.execute(params![
            id as i64,
            material.diffuse,
            material.normal,
            material.specular,
            material.opacity,
            material.emissive,
            material.name,
        ])?;
    }
    Ok(())
}

/// Full-skeleton rows under mesh = -1, root first. `parent_id` is the row
/// index of the parent within this flattened list, -1 for the root.
fn write_skeleton(tx: &Transaction, model: &Model) -> Result<(), Error> {
    let seeds = skeleton::flatten(&model.skeleton);
    if seeds.is_empty() {
        return Ok(());
    }

    let mut sql = String::from(
        "insert into bones (mesh, bone_id, parent_id, parent_name, name",
    );
    for i in 0..16 {
        sql.push_str(&format!(", matrix_{i}"));
    }
    sql.push_str(") values (?1, ?2, ?3, ?4, ?5");
    for i in 0..16 {
        sql.push_str(&format!(", ?{}", i + 6));
    }
    sql.push(')');

    let mut stmt = tx.prepare(&sql)?;
    for (id, seed) in seeds.iter().enumerate() {
        let parent_id = match seeds.iter().position(|s| s.name == seed.parent_name) {
            Some(p) => p as i64,
            None => -1,
        };
        let mut values = vec![
            Value::Integer(-1),
            Value::Integer(id as i64),
            Value::Integer(parent_id),
            Value::Text(seed.parent_name.clone()),
            Value::Text(seed.name.clone()),
        ];
        for v in row_major(seed.matrix) {
            values.push(Value::Real(v));
        }
        stmt.execute(params_from_iter(values))?;
    }
    Ok(())
}

fn row_major(matrix: DMat4) -> [f64; 16] {
    let cols = matrix.to_cols_array();
    let mut out = [0.0; 16];
    for (i, slot) in out.iter_mut().enumerate() {
        let (row, col) = (i / 4, i % 4);
        *slot = cols[col * 4 + row];
    }
    out
}

fn write_groups(tx: &Transaction, model: &Model, columns: &VertexColumns) -> Result<(), Error> {
    let mut mesh_stmt = tx.prepare(
        "insert into meshes (mesh, name, material_id, model) values (?1, ?2, ?3, ?4)",
    )?;
    let mut palette_stmt =
        tx.prepare("insert into bones (mesh, bone_id, name) values (?1, ?2, ?3)")?;
    let mut part_stmt =
        tx.prepare("insert into parts (mesh, part, name) values (?1, ?2, ?3)")?;
    let mut index_stmt = tx.prepare(
        "insert into indices (mesh, part, index_id, vertex_id) values (?1, ?2, ?3, ?4)",
    )?;
    let mut shape_stmt = tx.prepare(
        "insert into shape_vertices (shape, mesh, part, vertex_id, position_x, position_y, position_z) \
         values (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    let value_columns = columns.value_columns();
    let mut vertex_sql = String::from("insert into vertices (mesh, part, vertex_id");
    for name in &value_columns {
        vertex_sql.push_str(&format!(", {name}"));
    }
    vertex_sql.push_str(") values (?1, ?2, ?3");
    for i in 0..value_columns.len() {
        vertex_sql.push_str(&format!(", ?{}", i + 4));
    }
    vertex_sql.push(')');
    let mut vertex_stmt = tx.prepare(&vertex_sql)?;

    for group in &model.mesh_groups {
        let mesh_id = group.id as i64;
        mesh_stmt.execute(params![
            mesh_id,
            group.name,
            group.material_id as i64,
            group.model_name_id as i64,
        ])?;

        for (bone_id, name) in group.bone_palette.iter().enumerate() {
            palette_stmt.execute(params![mesh_id, bone_id as i64, name])?;
        }

        for part in &group.parts {
            let part_id = part.id as i64;
            part_stmt.execute(params![mesh_id, part_id, part.name])?;

            for (index_id, vertex_id) in part.indices.iter().enumerate() {
                index_stmt.execute(params![
                    mesh_id,
                    part_id,
                    index_id as i64,
                    *vertex_id as i64,
                ])?;
            }

            for (vertex_id, vertex) in part.vertices.iter().enumerate() {
                let mut values = vec![
                    Value::Integer(mesh_id),
                    Value::Integer(part_id),
                    Value::Integer(vertex_id as i64),
                ];
                vertex_values(vertex, columns, &mut values);
                vertex_stmt.execute(params_from_iter(values))?;
            }

            for shape in part.shapes.values() {
                for (&vertex_id, replacement) in &shape.replacements {
                    shape_stmt.execute(params![
                        shape.name,
                        mesh_id,
                        part_id,
                        vertex_id as i64,
                        replacement.position.x,
                        replacement.position.y,
                        replacement.position.z,
                    ])?;
                }
            }
        }
    }
    Ok(())
}

fn vertex_values(vertex: &Vertex, columns: &VertexColumns, values: &mut Vec<Value>) {
    let real = Value::Real;

    values.extend([
        real(vertex.position.x),
        real(vertex.position.y),
        real(vertex.position.z),
        real(vertex.normal.x),
        real(vertex.normal.y),
        real(vertex.normal.z),
        real(vertex.color.x),
        real(vertex.color.y),
        real(vertex.color.z),
        real(vertex.color.w),
    ]);

    if columns.color2 {
        match vertex.color2 {
            Some(c) => values.extend([real(c.x), real(c.y), real(c.z), real(c.w)]),
            None => values.extend([Value::Null, Value::Null, Value::Null, Value::Null]),
        }
    }

    values.extend([
        real(vertex.uv1.x),
        real(vertex.uv1.y),
        real(vertex.uv2.x),
        real(vertex.uv2.y),
    ]);
    if columns.uv3 {
        match vertex.uv3 {
            Some(uv) => values.extend([real(uv.x), real(uv.y)]),
            None => values.extend([Value::Null, Value::Null]),
        }
    }

    // Empty weight slots bind NULL, mirroring sparse source rows.
    for slot in 0..columns.capacity.limit() {
        let w = vertex.weights.slot(slot);
        if w.bone_id >= 0 {
            values.push(Value::Integer(w.bone_id as i64));
            values.push(Value::Real(w.weight));
        } else {
            values.push(Value::Null);
            values.push(Value::Null);
        }
    }

    if columns.tangents {
        match vertex.binormal {
            Some(b) => values.extend([real(b.x), real(b.y), real(b.z)]),
            None => values.extend([Value::Null, Value::Null, Value::Null]),
        }
        match vertex.tangent {
            Some(t) => values.extend([real(t.x), real(t.y), real(t.z)]),
            None => values.extend([Value::Null, Value::Null, Value::Null]),
        }
    }
}

fn write_warnings(tx: &Transaction, warnings: &[String]) -> Result<(), Error> {
    let mut stmt = tx.prepare("insert into warnings (text) values (?1)")?;
    for warning in warnings {
        stmt.execute(params![warning])?;
    }
    Ok(())
}
