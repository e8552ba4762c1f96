//! graphgen - tool catalog generator
//!
//! Ingests vendor API spec files (one JSON description of fields, enums,
//! and endpoints per object) and emits a typed tool catalog: one argument
//! struct, one JSON Schema, and one dispatch handler per endpoint, plus a
//! closed tool-name list per object so scopes can be unloaded tool by
//! tool.
//!
//! The pipeline is offline and deterministic: spec loader -> name mangler
//! -> type mapper -> schema synthesizer -> emitter. Byte-identical inputs
//! produce byte-identical output, which `graphgen --check` relies on.
//!
//! The name mangling and schema synthesis rules are part of the external
//! contract: changing them renames every generated identifier and
//! reshapes every schema agents see.

pub mod emit;
pub mod naming;
pub mod schema;
pub mod spec;
pub mod types;

use std::path::Path;

use thiserror::Error;

/// Errors raised by the generator.
#[derive(Debug, Error)]
pub enum GenError {
    /// IO error while reading spec files or writing output.
    #[error("io error: {0}")]
    Io(String),

    /// The global enum file failed to parse. Per-object parse failures
    /// are warnings, but without the enum table every schema is wrong.
    #[error("enum file error: {0}")]
    EnumFile(String),

    /// Two endpoints mangled to the same tool name.
    #[error("tool name collision: {0}")]
    NameCollision(String),

    /// A spec violated a structural assumption.
    #[error("spec error: {0}")]
    Spec(String),
}

/// Load specs from `dir` and render the full catalog source.
pub fn generate_from_dir(dir: &Path) -> Result<String, GenError> {
    let specs = spec::load_dir(dir)?;
    let catalog = schema::build_catalog(&specs)?;
    Ok(emit::emit_catalog(&catalog))
}
