//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document of the viewer API (page navigation,
//! annotations, catalogs and export) for client generation.
//!
//! Usage: `openapi [OUTPUT]`, where `OUTPUT` defaults to `openapi.json`.

use api_lib::web::rest::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn output_path(mut args: impl Iterator<Item = String>) -> PathBuf {
    args.nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = output_path(std::env::args());
    let doc = ApiDoc::openapi();
    std::fs::write(&path, doc.to_pretty_json()?)?;
    println!(
        "Wrote {} viewer API routes to {}",
        doc.paths.paths.len(),
        path.display()
    );
    Ok(())
}
