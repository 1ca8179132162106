//! `Accept-Encoding` negotiation and response compression.

use std::fmt;
use std::io::{self, Read, Write};

use axum::{
    body::Body,
    extract::State,
    http::{
        HeaderMap, HeaderValue, Request, StatusCode,
        header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG, VARY},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use brotli::CompressorReader;
use bytes::Bytes;
use flate2::{
    Compression,
    write::{DeflateEncoder, GzEncoder},
};
use http_body_util::BodyExt;
use metrics::{counter, histogram};
use tracing::{debug, warn};

use crate::application::error::HttpError;
use crate::config::CompressionSettings;

pub const METRIC_COMPRESSED_RESPONSES: &str = "folio_http_compressed_total";
pub const METRIC_COMPRESSION_RATIO: &str = "folio_http_compression_ratio";

const SOURCE: &str = "infra::http::encoding::compress_responses";

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_QUALITY: u32 = 9;
const BROTLI_LGWIN: u32 = 16;

/// Supported content codings, in ascending order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentCoding {
    Deflate,
    Gzip,
    Brotli,
}

impl ContentCoding {
    pub const ALL: [ContentCoding; 3] = [
        ContentCoding::Deflate,
        ContentCoding::Gzip,
        ContentCoding::Brotli,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentCoding::Deflate => "deflate",
            ContentCoding::Gzip => "gzip",
            ContentCoding::Brotli => "br",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|coding| token.eq_ignore_ascii_case(coding.as_str()))
    }
}

impl fmt::Display for ContentCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `coding;q=value` item of an `Accept-Encoding` header.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptItem {
    pub coding: String,
    pub quality: f32,
}

/// Parse an `Accept-Encoding` value. Items with a malformed or out-of-range
/// `q` parameter are ignored.
pub fn parse_accept_encoding(header: &str) -> Vec<AcceptItem> {
    header
        .split(',')
        .filter_map(|raw| {
            let mut parts = raw.split(';');
            let coding = parts.next()?.trim().to_ascii_lowercase();
            if coding.is_empty() {
                return None;
            }

            let mut quality = 1.0_f32;
            for param in parts {
                let Some((key, value)) = param.split_once('=') else {
                    continue;
                };
                if key.trim().eq_ignore_ascii_case("q") {
                    quality = value.trim().parse::<f32>().ok()?;
                    if !(0.0..=1.0).contains(&quality) {
                        return None;
                    }
                }
            }

            Some(AcceptItem { coding, quality })
        })
        .collect()
}

/// Choose the most preferred supported coding the client accepts.
///
/// Explicit entries win over `*`; `q=0` refuses a coding. `None` means the
/// identity coding.
pub fn negotiate(items: &[AcceptItem]) -> Option<ContentCoding> {
    let wildcard = items
        .iter()
        .find(|item| item.coding == "*")
        .map(|item| item.quality);

    ContentCoding::ALL
        .into_iter()
        .rev()
        .find(|coding| {
            let explicit = items
                .iter()
                .find(|item| ContentCoding::from_token(&item.coding) == Some(*coding))
                .map(|item| item.quality);
            explicit.or(wildcard).is_some_and(|quality| quality > 0.0)
        })
}

pub fn negotiate_header(headers: &HeaderMap) -> Option<ContentCoding> {
    let raw = headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join(",");
    if raw.trim().is_empty() {
        return None;
    }
    negotiate(&parse_accept_encoding(&raw))
}

/// Compress `content` with the given coding.
pub fn encode(content: &[u8], coding: ContentCoding) -> io::Result<Vec<u8>> {
    match coding {
        ContentCoding::Brotli => {
            let mut reader =
                CompressorReader::new(content, BROTLI_BUFFER_SIZE, BROTLI_QUALITY, BROTLI_LGWIN);
            let mut encoded = Vec::new();
            reader.read_to_end(&mut encoded)?;
            Ok(encoded)
        }
        ContentCoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(content)?;
            encoder.finish()
        }
        ContentCoding::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(content)?;
            encoder.finish()
        }
    }
}

/// Types that are already compressed or gain nothing from it.
fn is_compressible(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "image/svg+xml" {
        return true;
    }
    if essence.starts_with("image/")
        || essence.starts_with("audio/")
        || essence.starts_with("video/")
        || essence.starts_with("font/")
    {
        return false;
    }
    !matches!(
        essence.as_str(),
        "application/zip"
            | "application/gzip"
            | "application/x-gzip"
            | "application/x-bzip2"
            | "application/x-7z-compressed"
            | "application/x-xz"
            | "application/zstd"
            | "application/pdf"
            | "application/octet-stream"
            | "application/wasm"
    )
}

fn append_vary(headers: &mut HeaderMap) {
    let already = headers
        .get_all(VARY)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| {
            let token = token.trim();
            token == "*" || token.eq_ignore_ascii_case("accept-encoding")
        });
    if !already {
        headers.append(VARY, HeaderValue::from_static("accept-encoding"));
    }
}

/// Compress response bodies according to the request's `Accept-Encoding`.
pub async fn compress_responses(
    State(settings): State<CompressionSettings>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let coding = settings
        .enabled
        .then(|| negotiate_header(request.headers()))
        .flatten();

    let response = next.run(request).await;
    if !settings.enabled {
        return response;
    }

    let status = response.status();
    if status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
        || response.headers().contains_key(CONTENT_ENCODING)
        || !is_compressible(response.headers())
    {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    append_vary(&mut parts.headers);

    let Some(coding) = coding else {
        return Response::from_parts(parts, body);
    };

    let bytes: Bytes = match BodyExt::collect(body).await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!(target = SOURCE, error = %err, "Failed to buffer response body");
            return HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                err.to_string(),
            )
            .into_response();
        }
    };

    if (bytes.len() as u64) < settings.min_bytes {
        return Response::from_parts(parts, Body::from(bytes));
    }

    let encoded = match encode(&bytes, coding) {
        Ok(encoded) => encoded,
        Err(err) => {
            warn!(
                target = SOURCE,
                coding = %coding,
                error = %err,
                "Compression failed; sending identity body"
            );
            return Response::from_parts(parts, Body::from(bytes));
        }
    };

    debug!(
        target = SOURCE,
        coding = %coding,
        original = bytes.len(),
        compressed = encoded.len(),
        "Compressed response"
    );
    counter!(METRIC_COMPRESSED_RESPONSES, "coding" => coding.as_str()).increment(1);
    if !bytes.is_empty() {
        histogram!(METRIC_COMPRESSION_RATIO)
            .record(encoded.len() as f64 * 100.0 / bytes.len() as f64);
    }

    parts
        .headers
        .insert(CONTENT_ENCODING, HeaderValue::from_static(coding.as_str()));
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(encoded.len()));
    weaken_etag(&mut parts.headers);

    Response::from_parts(parts, Body::from(encoded))
}

/// A strong validator names exact bytes, so an encoded body may only carry
/// the weak form of the identity body's tag.
fn weaken_etag(headers: &mut HeaderMap) {
    let Some(current) = headers.get(ETAG).and_then(|value| value.to_str().ok()) else {
        return;
    };
    if current.starts_with("W/") {
        return;
    }
    if let Ok(weak) = HeaderValue::from_str(&format!("W/{current}")) {
        headers.insert(ETAG, weak);
    }
}
