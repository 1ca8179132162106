//! Fallback route: files below the content root, with strong ETags.

use axum::{
    body::Body,
    extract::State,
    http::{
        HeaderMap, HeaderValue, Method, StatusCode, Uri,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::error;

use crate::application::error::{ErrorReport, HttpError};
use crate::infra::fs::ContentFileError;
use crate::presentation::views::render_not_found_response;

use super::HttpState;

const SOURCE: &str = "infra::http::files::serve_content_file";

pub(super) async fn serve_content_file(
    State(state): State<HttpState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return HttpError::new(
            SOURCE,
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
            format!("{method} is not supported for content files"),
        )
        .into_response();
    }

    let path = uri.path();
    match state.files.read(path).await {
        Ok(bytes) => file_response(path, bytes, &headers),
        Err(ContentFileError::InvalidPath | ContentFileError::NotFound) => {
            render_not_found_response(
                state.chrome(),
                ErrorReport::from_message(
                    SOURCE,
                    StatusCode::NOT_FOUND,
                    format!("No content file at `{path}`"),
                ),
            )
        }
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read content file"
            );
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read file",
                &err,
            )
            .into_response()
        }
    }
}

/// Strong validator: quoted hex SHA-256 of the body.
pub(crate) fn entity_tag(bytes: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(bytes)))
}

/// Whether `If-None-Match` lists `etag` (weak comparison) or `*`.
fn none_match_satisfied(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|candidate| candidate.trim())
        .any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
}

fn file_response(path: &str, bytes: Bytes, headers: &HeaderMap) -> Response {
    let etag = entity_tag(&bytes);
    let etag_value = HeaderValue::from_str(&etag).ok();

    if none_match_satisfied(headers, &etag) {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        if let Some(value) = etag_value {
            response.headers_mut().insert(ETAG, value);
        }
        return response;
    }

    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_text_plain();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    if let Some(value) = etag_value {
        headers.insert(ETAG, value);
    }
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, no-cache"));

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_tag_is_quoted_sha256() {
        assert_eq!(
            entity_tag(b"abc"),
            "\"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad\""
        );
    }

    #[test]
    fn if_none_match_accepts_lists_weak_tags_and_wildcard() {
        let etag = entity_tag(b"abc");
        let mut headers = HeaderMap::new();
        headers.insert(
            IF_NONE_MATCH,
            HeaderValue::from_str(&format!("\"other\", W/{etag}")).expect("header"),
        );
        assert!(none_match_satisfied(&headers, &etag));

        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("*"));
        assert!(none_match_satisfied(&headers, &etag));

        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("\"nope\""));
        assert!(!none_match_satisfied(&headers, &etag));
    }

    #[test]
    fn unknown_extensions_are_served_as_text() {
        let response = file_response(
            "/notes.unknownext",
            Bytes::from_static(b"x"),
            &HeaderMap::new(),
        );
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        assert!(response.headers().contains_key(ETAG));
    }

    #[test]
    fn matching_etag_yields_not_modified() {
        let bytes = Bytes::from_static(b"cached");
        let mut headers = HeaderMap::new();
        headers.insert(
            IF_NONE_MATCH,
            HeaderValue::from_str(&entity_tag(&bytes)).expect("header"),
        );
        let response = file_response("/a.txt", bytes, &headers);
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }
}
