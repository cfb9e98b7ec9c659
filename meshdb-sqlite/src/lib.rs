//! SQLite storage for the mesh interchange schema.
//!
//! One flat schema, written and read whole: `meta`, `models`, `materials`,
//! `meshes`, `parts`, `bones` (palette rows per mesh group plus full-skeleton
//! rows under mesh = -1), `indices`, `vertices`, `shape_vertices` and
//! `warnings`. Writes happen inside a single transaction with positional
//! binds in declared column order.

#![forbid(unsafe_code)]

mod columns;
mod error;
mod read;
mod schema;
mod write;

pub use columns::VertexColumns;
pub use error::Error;
pub use read::read_model;
pub use write::write_model;

pub use rusqlite;
pub use rusqlite::Connection;

use std::path::Path;

/// Opens (or creates) a database file.
pub fn open(path: &Path) -> Result<Connection, Error> {
    Ok(Connection::open(path)?)
}

/// Bootstraps the schema for a model about to be written. `write_model` does
/// this itself; the standalone entry point exists so setup failures can be
/// told apart from row failures.
pub use schema::create as create_schema;

#[cfg(test)]
mod store_tests;
