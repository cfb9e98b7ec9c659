//! The vertices table layout.
//!
//! Databases differ in which optional column groups they carry (second color
//! set, third UV set, tangent frame, bones 5..8). The writer derives the
//! layout from the model; the reader recovers it from the table itself so
//! both 4- and 8-weight databases load with one code path.

use meshdb::{Model, WeightCapacity};
use rusqlite::Connection;

use crate::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VertexColumns {
    pub color2: bool,
    pub uv3: bool,
    pub tangents: bool,
    pub capacity: WeightCapacity,
}

impl VertexColumns {
    /// Union of the channels used anywhere in the model.
    pub fn for_model(model: &Model) -> Self {
        let mut columns = Self {
            color2: false,
            uv3: false,
            tangents: false,
            capacity: WeightCapacity::Four,
        };
        for group in &model.mesh_groups {
            for part in &group.parts {
                columns.color2 |= part.channels.color2;
                columns.uv3 |= part.channels.uv3;
                columns.tangents |= part.channels.tangents;
                for vertex in &part.vertices {
                    if vertex.weights.capacity() == WeightCapacity::Eight {
                        columns.capacity = WeightCapacity::Eight;
                    }
                }
            }
        }
        columns
    }

    /// Recovers the layout of an existing database.
    pub fn detect(conn: &Connection) -> Result<Self, Error> {
        let mut stmt = conn.prepare("PRAGMA table_info(vertices)")?;
        let names: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<_, _>>()?;
        let has = |name: &str| names.iter().any(|n| n == name);

        Ok(Self {
            color2: has("color2_r"),
            uv3: has("uv_3_u"),
            tangents: has("tangent_x"),
            capacity: if has("bone_5_id") {
                WeightCapacity::Eight
            } else {
                WeightCapacity::Four
            },
        })
    }

    /// Ordered column names after the (mesh, part, vertex_id) key.
    pub fn value_columns(&self) -> Vec<String> {
        let mut names: Vec<String> = [
            "position_x",
            "position_y",
            "position_z",
            "normal_x",
            "normal_y",
            "normal_z",
            "color_r",
            "color_g",
            "color_b",
            "color_a",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if self.color2 {
            for c in ["color2_r", "color2_g", "color2_b", "color2_a"] {
                names.push(c.to_string());
            }
        }

        names.push("uv_1_u".to_string());
        names.push("uv_1_v".to_string());
        names.push("uv_2_u".to_string());
        names.push("uv_2_v".to_string());
        if self.uv3 {
            names.push("uv_3_u".to_string());
            names.push("uv_3_v".to_string());
        }

        for bone in 1..=self.capacity.limit() {
            names.push(format!("bone_{bone}_id"));
            names.push(format!("bone_{bone}_weight"));
        }

        if self.tangents {
            for c in [
                "binormal_x",
                "binormal_y",
                "binormal_z",
                "tangent_x",
                "tangent_y",
                "tangent_z",
            ] {
                names.push(c.to_string());
            }
        }

        names
    }
}
