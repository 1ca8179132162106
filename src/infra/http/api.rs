//! JSON listing endpoints and raw markdown access.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use folio_api_types::{ApiErrorBody, ArticleList};
use serde::Deserialize;

use crate::application::{
    articles::ArticleError,
    error::{ErrorReport, HttpError},
};

use super::HttpState;

const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

/// JSON error response carrying the same [`ErrorReport`] as an [`HttpError`].
pub(super) struct ApiError(HttpError);

impl From<ArticleError> for ApiError {
    fn from(error: ArticleError) -> Self {
        Self(HttpError::from(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let body = ApiErrorBody {
            status: status.as_u16(),
            error: self.0.public_message().to_string(),
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(report) = self.0.into_response().extensions_mut().remove::<ErrorReport>() {
            report.attach(&mut response);
        }
        response
    }
}

pub(super) async fn article_list(State(state): State<HttpState>) -> Result<Response, ApiError> {
    let names = state.articles.list().await?;
    let body = ArticleList {
        articles: names.into_iter().map(|name| name.to_string()).collect(),
    };
    Ok(Json(body).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

pub(super) async fn article_page(
    State(state): State<HttpState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let page = match query.page.as_deref().map(str::trim) {
        None | Some("") => 1,
        Some(raw) => raw.parse::<usize>().map_err(|_| {
            ApiError(HttpError::new(
                "infra::http::api::article_page",
                StatusCode::BAD_REQUEST,
                "Invalid page number",
                format!("`{raw}` is not a page number"),
            ))
        })?,
    };

    let page = state.articles.page(page).await?;
    Ok(Json(page).into_response())
}

/// Leading lines of an article as markdown text.
pub(super) async fn article_preview(
    State(state): State<HttpState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let preview = state.articles.preview(&name).await?;
    Ok(markdown_response(preview))
}

/// Full article source as markdown text.
pub(super) async fn article_source(
    State(state): State<HttpState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let article = state.articles.load(&name).await?;
    Ok(markdown_response(article.markdown))
}

fn markdown_response(body: String) -> Response {
    let mut response = body.into_response();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(MARKDOWN_CONTENT_TYPE),
    );
    response
}
