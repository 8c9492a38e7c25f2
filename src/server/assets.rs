//! Static file serving under the `/assets/` prefix.

use std::path::Path;

use anyhow::Result;
use tiny_http::{Header, Request, Response, StatusCode};

use crate::content::path as site_path;
use crate::utils::mime;

use super::response::respond_not_found;

/// Serve a file below the assets directory.
///
/// The request path is normalized before joining, so `..` segments cannot
/// escape the assets root.
pub fn respond_asset(request: Request, assets_dir: Option<&Path>, rel: &str) -> Result<()> {
    let Some(assets_dir) = assets_dir else {
        return respond_not_found(request);
    };

    let clean = site_path::normalize(rel);
    if clean.is_empty() {
        return respond_not_found(request);
    }
    let abs = assets_dir.join(&clean);
    if !abs.is_file() {
        return respond_not_found(request);
    }

    let body = match std::fs::read(&abs) {
        Ok(body) => body,
        Err(_) => return respond_not_found(request),
    };
    let content_type = mime::from_path(&abs);
    let response = Response::from_data(body).with_header(
        Header::from_bytes("Content-Type", content_type.as_bytes())
            .expect("static header name is valid"),
    );
    request.respond(response)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::content::path as site_path;

    #[test]
    fn test_traversal_is_neutralized_by_normalization() {
        // `..` resolves within the relative path; it can never climb above
        // the assets root after normalization.
        assert_eq!(site_path::normalize("../secret.txt"), "secret.txt");
        assert_eq!(site_path::normalize("a/../../b"), "b");
        assert_eq!(site_path::normalize("css/../img/logo.png"), "img/logo.png");
    }
}
