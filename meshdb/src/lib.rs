//! Conversion engine between a hierarchical scene graph and the flat
//! relational model used by the mesh interchange database.
//!
//! This crate is store-agnostic. The SQLite binding lives in a separate
//! crate (`meshdb-sqlite`); the CLI front-end in `meshdb-cli`.

#![forbid(unsafe_code)]

mod error;

mod axis;
mod export;
mod import;
mod model;
mod scene;
mod shape;
mod weights;
mod weld;

pub mod skeleton;

#[cfg(feature = "json")]
pub mod json;

pub use axis::*;
pub use error::*;
pub use export::*;
pub use import::*;
pub use model::*;
pub use scene::*;
pub use shape::MORPH_PREFIX;
pub use weights::*;



#[cfg(test)]
mod skeleton_tests;

#[cfg(test)]
mod weld_tests;
