//! Artifact resolution and response writers.

use anyhow::Result;
use tiny_http::{Header, Request, Response, StatusCode};

use crate::content::FileStore;
use crate::utils::mime;

/// What a registered route resolves to at request time.
#[derive(Debug, PartialEq)]
pub enum ArtifactResponse {
    /// 302 with a Location header.
    Redirect(String),
    /// 200 with body and Content-Type.
    Content { mime: String, body: Vec<u8> },
    /// 404: the file vanished from the graph or has no cached content yet.
    Missing,
}

/// Resolve a file path to its servable artifact.
pub fn resolve_artifact(store: &FileStore, path: &str) -> ArtifactResponse {
    let Some(file) = store.get_file(path) else {
        return ArtifactResponse::Missing;
    };
    if !file.metadata.redirect_url.is_empty() {
        return ArtifactResponse::Redirect(file.metadata.redirect_url.clone());
    }
    match file.content {
        Some(ref body) => ArtifactResponse::Content {
            mime: file.mime_or_default().to_string(),
            body: body.clone(),
        },
        None => ArtifactResponse::Missing,
    }
}

/// Write the resolved artifact for `path` to the client.
pub fn respond_artifact(request: Request, store: &FileStore, path: &str) -> Result<()> {
    match resolve_artifact(store, path) {
        ArtifactResponse::Redirect(location) => respond_redirect(request, &location),
        ArtifactResponse::Content { mime, body } => {
            let response = Response::from_data(body)
                .with_status_code(StatusCode(200))
                .with_header(content_type(&mime));
            request.respond(response)?;
            Ok(())
        }
        ArtifactResponse::Missing => respond_not_found(request),
    }
}

pub fn respond_redirect(request: Request, location: &str) -> Result<()> {
    let response = Response::empty(StatusCode(302)).with_header(
        Header::from_bytes("Location", location.as_bytes())
            .map_err(|_| anyhow::anyhow!("invalid redirect location {location:?}"))?,
    );
    request.respond(response)?;
    Ok(())
}

pub fn respond_not_found(request: Request) -> Result<()> {
    let response = Response::from_string("404 Not Found")
        .with_status_code(StatusCode(404))
        .with_header(content_type(mime::types::PLAIN));
    request.respond(response)?;
    Ok(())
}

pub fn respond_server_error(request: Request) -> Result<()> {
    let response = Response::from_string("500 Internal Server Error")
        .with_status_code(StatusCode(500))
        .with_header(content_type(mime::types::PLAIN));
    request.respond(response)?;
    Ok(())
}

/// 503 while the process is shutting down.
pub fn respond_unavailable(request: Request) -> Result<()> {
    let response = Response::from_string("503 Service Unavailable")
        .with_status_code(StatusCode(503))
        .with_header(content_type(mime::types::PLAIN));
    request.respond(response)?;
    Ok(())
}

fn content_type(value: &str) -> Header {
    Header::from_bytes("Content-Type", value.as_bytes()).expect("static header name is valid")
}
