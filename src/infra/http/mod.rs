mod api;
pub mod encoding;
mod files;
mod middleware;
mod public;

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware, routing::get};

use crate::application::articles::ArticleService;
use crate::application::render::RenderService;
use crate::cache::ArticleCache;
use crate::config::{CompressionSettings, Settings, SiteSettings};
use crate::infra::fs::{ContentFiles, FsArticleRepository};
use crate::presentation::views::LayoutChrome;

pub use middleware::{REQUEST_ID_HEADER, RequestContext};

#[derive(Clone)]
pub struct HttpState {
    pub articles: Arc<ArticleService>,
    pub files: Arc<ContentFiles>,
    pub site: Arc<SiteSettings>,
}

impl HttpState {
    /// Wire the filesystem repository, caches and renderer from settings.
    pub fn from_settings(settings: &Settings, renderer: Arc<dyn RenderService>) -> Self {
        let repo = Arc::new(FsArticleRepository::new(&settings.content.articles_dir));
        let cache = Arc::new(ArticleCache::new(&settings.cache));
        let articles = ArticleService::new(repo, cache, renderer, &settings.content);

        Self {
            articles: Arc::new(articles),
            files: Arc::new(ContentFiles::new(&settings.content.root)),
            site: Arc::new(settings.site.clone()),
        }
    }

    pub(crate) fn chrome(&self) -> LayoutChrome {
        LayoutChrome {
            site_title: self.site.title.clone(),
        }
    }
}

/// Assemble every route with request ids, response logging and compression.
pub fn build_router(state: HttpState, compression: CompressionSettings) -> Router {
    let pages = Router::new()
        .route("/", get(public::index))
        .route("/page/{page}", get(public::index_page))
        .route("/posts/{name}", get(public::article))
        .route("/about", get(public::about))
        .route("/_health", get(public::health));

    let api = Router::new()
        .route("/article_list", get(api::article_list))
        .route("/api/articles", get(api::article_page))
        .route("/preview/articles/{name}", get(api::article_preview))
        .route("/articles/{name}", get(api::article_source));

    pages
        .merge(api)
        .route("/static/{*path}", get(crate::infra::assets::serve_static))
        .fallback(files::serve_content_file)
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            compression,
            encoding::compress_responses,
        ))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
