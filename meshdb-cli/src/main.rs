//! Command-line converter between scene documents and the interchange
//! database. A `*.db` argument exports `result.scene.json`; anything else is
//! parsed as a scene document and imported into `result.db`.
//!
//! Each failure stage has its own exit code so callers can tell setup
//! problems, store problems and structural problems apart.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::Parser;
use log::info;
use meshdb::{
    export_model, import_scene, json, ColorMapping, ExportConfig, ImportConfig, WeightCapacity,
};
use meshdb_sqlite as store;

const DB_OUTPUT: &str = "result.db";
const SCENE_OUTPUT: &str = "result.scene.json";

const EXIT_NO_ARGUMENT: i32 = 101;
const EXIT_REMOVE_FAILED: i32 = 102;
const EXIT_DB_OPEN_FAILED: i32 = 103;
const EXIT_SCHEMA_FAILED: i32 = 104;
const EXIT_SCENE_LOAD_FAILED: i32 = 105;
const EXIT_SQL_FAILED: i32 = 201;
const EXIT_BAD_GEOMETRY: i32 = 500;
const EXIT_EXPORT_FAILED: i32 = 800;

#[derive(Parser)]
#[command(name = "meshdb")]
#[command(about = "Convert scene documents to/from the mesh interchange database")]
#[command(version)]
struct Cli {
    /// Input file; `*.db` runs the exporter, anything else the importer.
    input: Option<PathBuf>,

    /// Skin influences per vertex (4 or 8).
    #[arg(long, default_value_t = 4)]
    weights: usize,

    /// Vertex-color layout on exported meshes.
    #[arg(long, value_enum, default_value_t = ColorMappingArg::ControlPoint)]
    color_mapping: ColorMappingArg,
}

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum ColorMappingArg {
    ControlPoint,
    CornerIndexed,
}

impl From<ColorMappingArg> for ColorMapping {
    fn from(arg: ColorMappingArg) -> Self {
        match arg {
            ColorMappingArg::ControlPoint => ColorMapping::ByControlPoint,
            ColorMappingArg::CornerIndexed => ColorMapping::CornerIndexed,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let Some(input) = cli.input else {
        eprintln!("No file path supplied.");
        process::exit(EXIT_NO_ARGUMENT);
    };

    let Some(weight_capacity) = WeightCapacity::from_limit(cli.weights) else {
        eprintln!("--weights must be 4 or 8.");
        process::exit(2);
    };

    let is_db = input
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("db"));

    let code = if is_db {
        run_export(&input, cli.color_mapping.into())
    } else {
        run_import(&input, weight_capacity)
    };
    process::exit(code);
}

fn fail(code: i32, error: &anyhow::Error) -> i32 {
    eprintln!("Critical Error: {error:#}");
    code
}

fn store_error_code(error: &store::Error) -> i32 {
    match error {
        store::Error::Schema(_) => EXIT_SCHEMA_FAILED,
        store::Error::Sqlite(_) => EXIT_SQL_FAILED,
        store::Error::Model(_) => EXIT_BAD_GEOMETRY,
    }
}

fn run_import(input: &Path, weight_capacity: WeightCapacity) -> i32 {
    info!("Attempting to process scene file: {}", input.display());

    let output = Path::new(DB_OUTPUT);
    if output.exists() {
        if let Err(e) = fs::remove_file(output) {
            return fail(
                EXIT_REMOVE_FAILED,
                &anyhow::Error::new(e).context("Unable to remove existing database"),
            );
        }
    }

    let text = match fs::read_to_string(input)
        .with_context(|| format!("Unable to load scene file {}", input.display()))
    {
        Ok(text) => text,
        Err(e) => return fail(EXIT_SCENE_LOAD_FAILED, &e),
    };
    let doc = match json::load(&text) {
        Ok(doc) => doc,
        Err(e) => {
            return fail(
                EXIT_SCENE_LOAD_FAILED,
                &anyhow::Error::new(e).context("Unable to load scene file"),
            );
        }
    };

    let config = ImportConfig {
        weight_capacity,
        ..ImportConfig::default()
    };
    let import = match import_scene(doc, &config) {
        Ok(import) => import,
        Err(e) => return fail(EXIT_BAD_GEOMETRY, &anyhow::Error::new(e)),
    };

    let mut conn = match store::open(output) {
        Ok(conn) => conn,
        Err(e) => {
            return fail(
                EXIT_DB_OPEN_FAILED,
                &anyhow::Error::new(e).context("Failed to create database"),
            );
        }
    };
    if let Err(e) = store::write_model(&mut conn, &import.model, &import.warnings) {
        let code = store_error_code(&e);
        return fail(code, &anyhow::Error::new(e));
    }

    info!("Successfully processed scene file.");
    0
}

fn run_export(input: &Path, color_mapping: ColorMapping) -> i32 {
    info!("Attempting to process DB file: {}", input.display());

    let conn = match store::open(input) {
        Ok(conn) => conn,
        Err(e) => {
            return fail(
                EXIT_DB_OPEN_FAILED,
                &anyhow::Error::new(e).context("Failed to connect to database"),
            );
        }
    };
    let model = match store::read_model(&conn) {
        Ok(model) => model,
        Err(e) => {
            let code = store_error_code(&e);
            return fail(code, &anyhow::Error::new(e));
        }
    };

    let config = ExportConfig { color_mapping };
    let doc = match export_model(&model, &config) {
        Ok(doc) => doc,
        Err(e) => return fail(EXIT_EXPORT_FAILED, &anyhow::Error::new(e)),
    };
    let text = match json::save(&doc) {
        Ok(text) => text,
        Err(e) => return fail(EXIT_EXPORT_FAILED, &anyhow::Error::new(e)),
    };
    if let Err(e) = fs::write(SCENE_OUTPUT, text)
        .with_context(|| format!("Failed to write {SCENE_OUTPUT}"))
    {
        return fail(EXIT_EXPORT_FAILED, &e);
    }

    info!("Successfully exported scene file.");
    0
}
