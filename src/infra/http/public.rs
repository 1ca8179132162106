use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::{
    articles::ArticleError,
    error::{ErrorReport, HttpError},
};
use crate::presentation::views::{
    AboutTemplate, AboutView, ArticleTemplate, ArticleView, IndexTemplate, IndexView,
    LayoutContext, render_error_response, render_not_found_response, render_template_response,
};

use super::HttpState;

pub(super) async fn index(State(state): State<HttpState>) -> Response {
    render_index(&state, 1).await
}

pub(super) async fn index_page(
    State(state): State<HttpState>,
    Path(page): Path<String>,
) -> Response {
    match page.parse::<usize>() {
        Ok(page) => render_index(&state, page).await,
        Err(_) => render_not_found_response(
            state.chrome(),
            ErrorReport::from_message(
                "infra::http::public::index_page",
                StatusCode::NOT_FOUND,
                format!("`{page}` is not a page number"),
            ),
        ),
    }
}

async fn render_index(state: &HttpState, page: usize) -> Response {
    match state.articles.index(page).await {
        Ok(index) => {
            let view = LayoutContext::new(state.chrome(), IndexView::from_page(index));
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => article_error_page(state, err),
    }
}

pub(super) async fn article(
    State(state): State<HttpState>,
    Path(name): Path<String>,
) -> Response {
    match state.articles.render(&name).await {
        Ok(rendered) => {
            let view = LayoutContext::new(state.chrome(), ArticleView::from(rendered));
            render_template_response(ArticleTemplate { view }, StatusCode::OK)
        }
        Err(err) => article_error_page(&state, err),
    }
}

pub(super) async fn about(State(state): State<HttpState>) -> Response {
    let view = LayoutContext::new(
        state.chrome(),
        AboutView {
            paragraphs: state.site.about.clone(),
        },
    );
    render_template_response(AboutTemplate { view }, StatusCode::OK)
}

/// 204 while the articles directory is readable.
pub(super) async fn health(State(state): State<HttpState>) -> Response {
    match state.articles.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::public::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

fn article_error_page(state: &HttpState, err: ArticleError) -> Response {
    let error = HttpError::from(err);
    if error.status() == StatusCode::NOT_FOUND {
        let mut response = error.into_response();
        let report = response
            .extensions_mut()
            .remove::<ErrorReport>()
            .unwrap_or_else(|| {
                ErrorReport::from_message(
                    "infra::http::public",
                    StatusCode::NOT_FOUND,
                    "Resource not found",
                )
            });
        return render_not_found_response(state.chrome(), report);
    }
    render_error_response(state.chrome(), error)
}
