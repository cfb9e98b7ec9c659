//! Rows -> Model. Dense ids grow the aggregates while scanning, so a row for
//! mesh 3 implies groups 0..=3 exist even if their own rows come later.

use glam::{DMat4, DVec2, DVec3, DVec4};
use log::warn;
use meshdb::skeleton::{self, BoneSeed};
use meshdb::{AxisSystem, Model, Vertex, WeightSet};
use rusqlite::{Connection, Row};

use crate::columns::VertexColumns;
use crate::Error;

pub fn read_model(conn: &Connection) -> Result<Model, Error> {
    let columns = VertexColumns::detect(conn)?;
    let mut model = Model::default();

    read_meta(conn, &mut model)?;
    read_models(conn, &mut model)?;
    read_materials(conn, &mut model)?;
    read_meshes(conn, &mut model)?;
    read_parts(conn, &mut model)?;
    read_bones(conn, &mut model)?;
    read_indices(conn, &mut model)?;
    read_vertices(conn, &mut model, &columns)?;
    read_shapes(conn, &mut model)?;

    Ok(model)
}

fn meta_value(conn: &Connection, key: &str) -> Result<Option<String>, Error> {
    let mut stmt = conn.prepare("select value from meta where key = ?1")?;
    let mut rows = stmt.query_map([key], |row| row.get::<_, String>(0))?;
    match rows.next() {
        Some(value) => Ok(Some(value?)),
        None => Ok(None),
    }
}

fn read_meta(conn: &Connection, model: &mut Model) -> Result<(), Error> {
    model.root_name = meta_value(conn, "root_name")?.unwrap_or_else(|| "Export".to_string());
    model.unit = meta_value(conn, "unit")?.unwrap_or_else(|| "meter".to_string());
    model.application = meta_value(conn, "application")?.unwrap_or_default();
    model.version = meta_value(conn, "version")?.unwrap_or_default();

    let code = |value: Option<String>, fallback: char| {
        value.and_then(|v| v.chars().next()).unwrap_or(fallback)
    };
    let up = code(meta_value(conn, "up")?, 'y');
    let front = code(meta_value(conn, "front")?, 'z');
    let handedness = code(meta_value(conn, "handedness")?, 'r');
    model.axis = AxisSystem::from_codes(up, front, handedness)?;

    Ok(())
}

fn read_models(conn: &Connection, model: &mut Model) -> Result<(), Error> {
    let mut stmt = conn.prepare("select model, name from models order by model asc")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (id, name) = row?;
        let id = id.max(0) as usize;
        while model.model_names.len() <= id {
            model.model_names.push(String::new());
        }
        model.model_names[id] = name;
    }
    Ok(())
}

fn read_materials(conn: &Connection, model: &mut Model) -> Result<(), Error> {
    let mut stmt = conn.prepare(
        "select material_id, diffuse, normal, specular, opacity, emissive, name \
         from materials order by material_id asc",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            meshdb::Material {
                diffuse: row.get(1)?,
                normal: row.get(2)?,
                specular: row.get(3)?,
                opacity: row.get(4)?,
                emissive: row.get(5)?,
                name: row.get(6)?,
            },
        ))
    })?;
    for row in rows {
        let (id, material) = row?;
        let id = id.max(0) as usize;
        while model.materials.len() <= id {
            model.materials.push(meshdb::Material::default());
        }
        model.materials[id] = material;
    }
    Ok(())
}

fn read_meshes(conn: &Connection, model: &mut Model) -> Result<(), Error> {
    let mut stmt =
        conn.prepare("select mesh, name, material_id, model from meshes order by mesh asc")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, i64>(3)?,
        ))
    })?;
    for row in rows {
        let (mesh, name, material_id, model_name_id) = row?;
        let group = model.mesh_group_mut(mesh.max(0) as usize);
        group.name = name;
        group.material_id = material_id.max(0) as usize;
        group.model_name_id = model_name_id.max(0) as usize;
    }
    Ok(())
}

fn read_parts(conn: &Connection, model: &mut Model) -> Result<(), Error> {
    let mut stmt =
        conn.prepare("select mesh, part, name from parts order by mesh asc, part asc")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    for row in rows {
        let (mesh, part, name) = row?;
        model
            .mesh_group_mut(mesh.max(0) as usize)
            .part_mut(part.max(0) as usize)
            .name = name;
    }
    Ok(())
}

fn read_bones(conn: &Connection, model: &mut Model) -> Result<(), Error> {
    let mut sql = String::from("select mesh, bone_id, parent_name, name");
    for i in 0..16 {
        sql.push_str(&format!(", matrix_{i}"));
    }
    sql.push_str(" from bones order by mesh asc, bone_id asc");

    let mut seeds: Vec<BoneSeed> = Vec::new();

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mesh: i64 = row.get(0)?;
        let bone_id: i64 = row.get(1)?;
        let name: String = row.get(3)?;

        if mesh == -1 {
            let parent_name: Option<String> = row.get(2)?;
            seeds.push(BoneSeed {
                name,
                parent_name: parent_name.unwrap_or_default(),
                matrix: read_matrix(row)?,
            });
        } else {
            let palette = &mut model.mesh_group_mut(mesh.max(0) as usize).bone_palette;
            let bone_id = bone_id.max(0) as usize;
            while palette.len() <= bone_id {
                palette.push(String::new());
            }
            palette[bone_id] = name;
        }
    }

    model.skeleton = skeleton::assemble(&seeds)?;
    Ok(())
}

fn read_matrix(row: &Row) -> rusqlite::Result<DMat4> {
    let mut cells = [0.0_f64; 16];
    let mut complete = true;
    for (i, cell) in cells.iter_mut().enumerate() {
        match row.get::<_, Option<f64>>(4 + i)? {
            Some(v) => *cell = v,
            None => complete = false,
        }
    }
    if !complete {
        return Ok(DMat4::IDENTITY);
    }

    // Stored row-major, glam wants column-major.
    let mut cols = [0.0_f64; 16];
    for (i, &cell) in cells.iter().enumerate() {
        let (row_i, col_i) = (i / 4, i % 4);
        cols[col_i * 4 + row_i] = cell;
    }
    Ok(DMat4::from_cols_array(&cols))
}

fn read_indices(conn: &Connection, model: &mut Model) -> Result<(), Error> {
    let mut stmt = conn.prepare(
        "select mesh, part, index_id, vertex_id from indices \
         order by mesh asc, part asc, index_id asc",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, i64>(3)?,
        ))
    })?;
    for row in rows {
        let (mesh, part, vertex_id) = row?;
        model
            .mesh_group_mut(mesh.max(0) as usize)
            .part_mut(part.max(0) as usize)
            .indices
            .push(vertex_id.max(0) as u32);
    }
    Ok(())
}

fn read_vertices(
    conn: &Connection,
    model: &mut Model,
    columns: &VertexColumns,
) -> Result<(), Error> {
    let mut sql = String::from("select mesh, part, vertex_id");
    for name in columns.value_columns() {
        sql.push_str(&format!(", {name}"));
    }
    sql.push_str(" from vertices order by mesh asc, part asc, vertex_id asc");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mesh: i64 = row.get(0)?;
        let part: i64 = row.get(1)?;
        let vertex = read_vertex(row, columns)?;
        model
            .mesh_group_mut(mesh.max(0) as usize)
            .part_mut(part.max(0) as usize)
            .vertices
            .push(vertex);
    }

    for group in &mut model.mesh_groups {
        for part in &mut group.parts {
            part.channels.color2 = part.vertices.iter().any(|v| v.color2.is_some());
            part.channels.uv3 = part.vertices.iter().any(|v| v.uv3.is_some());
            part.channels.tangents = part
                .vertices
                .iter()
                .any(|v| v.tangent.is_some() || v.binormal.is_some());
        }
    }
    Ok(())
}

struct Cursor<'a, 'b> {
    row: &'a Row<'b>,
    index: usize,
}

impl Cursor<'_, '_> {
    fn f64(&mut self) -> rusqlite::Result<f64> {
        let v: Option<f64> = self.row.get(self.index)?;
        self.index += 1;
        Ok(v.unwrap_or(0.0))
    }

    fn opt_f64(&mut self) -> rusqlite::Result<Option<f64>> {
        let v = self.row.get(self.index)?;
        self.index += 1;
        Ok(v)
    }

    fn opt_i64(&mut self) -> rusqlite::Result<Option<i64>> {
        let v = self.row.get(self.index)?;
        self.index += 1;
        Ok(v)
    }

    fn vec3(&mut self) -> rusqlite::Result<DVec3> {
        Ok(DVec3::new(self.f64()?, self.f64()?, self.f64()?))
    }

    fn opt_vec3(&mut self) -> rusqlite::Result<Option<DVec3>> {
        let (x, y, z) = (self.opt_f64()?, self.opt_f64()?, self.opt_f64()?);
        Ok(match (x, y, z) {
            (Some(x), Some(y), Some(z)) => Some(DVec3::new(x, y, z)),
            _ => None,
        })
    }

    fn vec4(&mut self) -> rusqlite::Result<DVec4> {
        Ok(DVec4::new(
            self.f64()?,
            self.f64()?,
            self.f64()?,
            self.f64()?,
        ))
    }
}

fn read_vertex(row: &Row, columns: &VertexColumns) -> rusqlite::Result<Vertex> {
    let mut cursor = Cursor { row, index: 3 };

    let position = cursor.vec3()?;
    let normal = cursor.vec3()?;
    let color = cursor.vec4()?;

    let color2 = if columns.color2 {
        let (r, g, b) = (cursor.opt_f64()?, cursor.opt_f64()?, cursor.opt_f64()?);
        let a = cursor.opt_f64()?;
        match (r, g, b, a) {
            (Some(r), Some(g), Some(b), Some(a)) => Some(DVec4::new(r, g, b, a)),
            _ => None,
        }
    } else {
        None
    };

    let uv1 = DVec2::new(cursor.f64()?, cursor.f64()?);
    let uv2 = DVec2::new(cursor.f64()?, cursor.f64()?);
    let uv3 = if columns.uv3 {
        match (cursor.opt_f64()?, cursor.opt_f64()?) {
            (Some(u), Some(v)) => Some(DVec2::new(u, v)),
            _ => None,
        }
    } else {
        None
    };

    let mut weights = WeightSet::new(columns.capacity);
    for slot in 0..columns.capacity.limit() {
        let bone_id = cursor.opt_i64()?;
        let weight = cursor.opt_f64()?;
        if let Some(bone_id) = bone_id {
            weights.set_slot(slot, bone_id as i32, weight.unwrap_or(0.0));
        }
    }

    let (binormal, tangent) = if columns.tangents {
        (cursor.opt_vec3()?, cursor.opt_vec3()?)
    } else {
        (None, None)
    };

    Ok(Vertex {
        position,
        normal,
        color,
        color2,
        uv1,
        uv2,
        uv3,
        tangent,
        binormal,
        weights,
    })
}

fn read_shapes(conn: &Connection, model: &mut Model) -> Result<(), Error> {
    let mut stmt = conn.prepare(
        "select shape, mesh, part, vertex_id, position_x, position_y, position_z \
         from shape_vertices order by shape asc, mesh asc, part asc, vertex_id asc",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let shape: String = row.get(0)?;
        let mesh: i64 = row.get(1)?;
        let part_id: i64 = row.get(2)?;
        let vertex_id: i64 = row.get(3)?;
        let position = DVec3::new(row.get(4)?, row.get(5)?, row.get(6)?);

        let part = model
            .mesh_group_mut(mesh.max(0) as usize)
            .part_mut(part_id.max(0) as usize);
        let vertex_id = vertex_id.max(0) as usize;
        let Some(base) = part.vertices.get(vertex_id) else {
            warn!(
                "shape '{shape}' references vertex {vertex_id} past part {} of mesh {}",
                part_id, mesh
            );
            continue;
        };

        let mut replacement = base.clone();
        replacement.position = position;
        let entry = part
            .shapes
            .entry(shape.clone())
            .or_insert_with(|| meshdb::ShapePart {
                name: shape,
                replacements: Default::default(),
            });
        entry.replacements.insert(vertex_id, replacement);
    }
    Ok(())
}
