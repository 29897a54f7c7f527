//! services/api/src/bin/openapi.rs
//!
//! Writes the Wanderlust OpenAPI document to disk, `openapi.json` unless a
//! path is given as the first argument.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn write_document(
    doc: &utoipa::openapi::OpenApi,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, doc.to_pretty_json()?)?;
    println!("Wrote {} documented paths to {}", doc.paths.paths.len(), path);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    write_document(&ApiDoc::openapi(), &output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_covers_listing_and_review_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/listing",
            "/listing/new",
            "/listing/{id}",
            "/listing/{id}/edit",
            "/listing/{id}/review",
            "/listing/{id}/review/{reviewId}",
            "/user/login",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let path = std::env::temp_dir()
            .join(format!("wanderlust-openapi-{}.json", std::process::id()))
            .to_string_lossy()
            .to_string();
        write_document(&doc, &path).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(written["paths"]["/listing/new"].is_object());
        std::fs::remove_file(&path).unwrap();
    }
}
