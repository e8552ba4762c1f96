//! Regenerates the tool catalog from `api_specs/` on every build where
//! the spec files changed. The server includes the output from OUT_DIR,
//! so the catalog can never drift from the specs.

use std::path::{Path, PathBuf};

fn main() -> anyhow::Result<()> {
    let specs = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../api_specs");
    println!("cargo:rerun-if-changed={}", specs.display());
    if let Ok(entries) = std::fs::read_dir(&specs) {
        for entry in entries.flatten() {
            println!("cargo:rerun-if-changed={}", entry.path().display());
        }
    }

    let code = graphgen::generate_from_dir(&specs)
        .map_err(|e| anyhow::anyhow!("catalog generation failed: {}", e))?;
    let out = PathBuf::from(std::env::var("OUT_DIR")?).join("catalog.rs");
    std::fs::write(&out, code)?;
    Ok(())
}
