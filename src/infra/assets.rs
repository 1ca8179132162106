//! Embedded static asset serving utilities.

use axum::{
    body::Body,
    extract::Path,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, include_dir};
use mime_guess::Mime;

use crate::application::error::ErrorReport;

/// Site and syntax-theme stylesheets copied in by the build script.
static STATIC_ASSETS: Dir<'_> = include_dir!("$OUT_DIR/static_public");

const SOURCE: &str = "infra::assets::serve_static";

/// Serve an embedded asset below `/static/`.
pub async fn serve_static(path: Option<Path<String>>) -> Response {
    let captured = path.map(|Path(value)| value).unwrap_or_default();
    match resolve_asset(&captured) {
        Some(asset) => asset.into_response(),
        None => {
            let mut response = StatusCode::NOT_FOUND.into_response();
            ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "Static asset not found")
                .attach(&mut response);
            response
        }
    }
}

/// Whether an embedded asset exists, for startup diagnostics.
pub fn has_asset(path: &str) -> bool {
    STATIC_ASSETS.get_file(path).is_some()
}

struct Asset {
    contents: &'static [u8],
    mime: Mime,
}

fn resolve_asset(path: &str) -> Option<Asset> {
    let candidate = path.trim_start_matches('/');
    if candidate.is_empty() || candidate.ends_with('/') || candidate.contains("..") {
        return None;
    }

    let file = STATIC_ASSETS.get_file(candidate)?;
    Some(Asset {
        contents: file.contents(),
        mime: mime_guess::from_path(candidate).first_or_octet_stream(),
    })
}

impl IntoResponse for Asset {
    fn into_response(self) -> Response {
        build_response(Bytes::from_static(self.contents), self.mime)
    }
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_stylesheets_are_embedded() {
        assert!(has_asset("styles/site.css"));
        assert!(has_asset("styles/code.css"));
    }

    #[test]
    fn traversal_and_directories_are_rejected() {
        assert!(resolve_asset("../Cargo.toml").is_none());
        assert!(resolve_asset("styles/").is_none());
        assert!(resolve_asset("").is_none());
    }

    #[test]
    fn css_is_served_with_css_mime() {
        let asset = resolve_asset("/styles/site.css").expect("embedded");
        assert_eq!(asset.mime.essence_str(), "text/css");
    }
}
