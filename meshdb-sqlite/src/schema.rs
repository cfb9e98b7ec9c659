//! Schema bootstrap for a fresh interchange database.

use rusqlite::Connection;

use crate::columns::VertexColumns;
use crate::Error;

pub fn create(conn: &Connection, columns: &VertexColumns) -> Result<(), Error> {
    let mut ddl = String::from(
        "BEGIN;
         CREATE TABLE meta (
             key TEXT PRIMARY KEY,
             value TEXT NOT NULL
         );
         CREATE TABLE models (
             model INTEGER PRIMARY KEY,
             name TEXT NOT NULL
         );
         CREATE TABLE materials (
             material_id INTEGER PRIMARY KEY,
             diffuse TEXT NOT NULL DEFAULT '',
             normal TEXT NOT NULL DEFAULT '',
             specular TEXT NOT NULL DEFAULT '',
             opacity TEXT NOT NULL DEFAULT '',
             emissive TEXT NOT NULL DEFAULT '',
             name TEXT NOT NULL DEFAULT ''
         );
         CREATE TABLE meshes (
             mesh INTEGER PRIMARY KEY,
             name TEXT NOT NULL,
             material_id INTEGER NOT NULL DEFAULT 0,
             model INTEGER NOT NULL DEFAULT 0
         );
         CREATE TABLE parts (
             mesh INTEGER NOT NULL,
             part INTEGER NOT NULL,
             name TEXT NOT NULL,
             PRIMARY KEY (mesh, part)
         );
         CREATE TABLE bones (
             mesh INTEGER NOT NULL,
             bone_id INTEGER NOT NULL,
             parent_id INTEGER,
             parent_name TEXT,
             name TEXT NOT NULL,
    ",
    );
    for i in 0..16 {
        ddl.push_str(&format!("         matrix_{i} REAL,\n"));
    }
    ddl.push_str(
        "         PRIMARY KEY (mesh, bone_id)
         );
         CREATE TABLE indices (
             mesh INTEGER NOT NULL,
             part INTEGER NOT NULL,
             index_id INTEGER NOT NULL,
             vertex_id INTEGER NOT NULL,
             PRIMARY KEY (mesh, part, index_id)
         );
         CREATE TABLE vertices (
             mesh INTEGER NOT NULL,
             part INTEGER NOT NULL,
             vertex_id INTEGER NOT NULL,
    ",
    );
    for name in columns.value_columns() {
        let kind = if name.ends_with("_id") { "INTEGER" } else { "REAL" };
        ddl.push_str(&format!("         {name} {kind},\n"));
    }
    ddl.push_str(
        "         PRIMARY KEY (mesh, part, vertex_id)
         );
         CREATE TABLE shape_vertices (
             shape TEXT NOT NULL,
             mesh INTEGER NOT NULL,
             part INTEGER NOT NULL,
             vertex_id INTEGER NOT NULL,
             position_x REAL NOT NULL,
             position_y REAL NOT NULL,
             position_z REAL NOT NULL,
             PRIMARY KEY (shape, mesh, part, vertex_id)
         );
         CREATE TABLE warnings (
             text TEXT NOT NULL
         );
         COMMIT;",
    );

    conn.execute_batch(&ddl).map_err(Error::Schema)
}
