//! Article listing, loading and rendering on top of an [`ArticleRepo`].

use std::{num::NonZeroUsize, sync::Arc};

use folio_api_types::{ArticleEntry, ArticlePage};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::application::pagination::{PageWindow, PaginationError};
use crate::application::render::{
    RenderError, RenderOutput, RenderRequest, RenderService, RenderTarget,
};
use crate::application::repos::{ArticleRepo, RepoError};
use crate::cache::{ArticleCache, RenderKind};
use crate::config::ContentSettings;
use crate::domain::articles::{Article, ArticleName, preview_lines};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("invalid article name")]
    InvalidName(#[from] DomainError),
    #[error("article `{name}` not found")]
    NotFound { name: String },
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error("article storage failed")]
    Repo(#[source] RepoError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ArticleError {
    fn from_repo(name: &ArticleName, error: RepoError) -> Self {
        match error {
            RepoError::NotFound => Self::NotFound {
                name: name.to_string(),
            },
            other => Self::Repo(other),
        }
    }
}

/// An article listed on an index page together with its rendered preview.
#[derive(Debug, Clone)]
pub struct ArticlePreview {
    pub name: ArticleName,
    pub title: String,
    pub html: String,
}

#[derive(Debug, Clone)]
pub struct IndexPage {
    pub window: PageWindow,
    pub total: usize,
    pub previews: Vec<ArticlePreview>,
}

#[derive(Debug, Clone)]
pub struct RenderedArticle {
    pub article: Article,
    pub output: RenderOutput,
}

#[derive(Clone)]
pub struct ArticleService {
    repo: Arc<dyn ArticleRepo>,
    cache: Arc<ArticleCache>,
    renderer: Arc<dyn RenderService>,
    preview_lines: NonZeroUsize,
    page_size: NonZeroUsize,
}

impl ArticleService {
    pub fn new(
        repo: Arc<dyn ArticleRepo>,
        cache: Arc<ArticleCache>,
        renderer: Arc<dyn RenderService>,
        content: &ContentSettings,
    ) -> Self {
        Self {
            repo,
            cache,
            renderer,
            preview_lines: content.preview_lines,
            page_size: content.page_size,
        }
    }

    /// All article names, newest first.
    ///
    /// Names are sorted and reversed, so date-prefixed file names list the
    /// latest article first.
    pub async fn list(&self) -> Result<Vec<ArticleName>, ArticleError> {
        let mut names = self.repo.list_names().await.map_err(ArticleError::Repo)?;
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    /// Titles and names for one listing page.
    pub async fn page(&self, page: usize) -> Result<ArticlePage, ArticleError> {
        let names = self.list().await?;
        let window = PageWindow::for_page(page, self.page_size, names.len())?;

        let articles = window
            .slice(&names)
            .iter()
            .map(|name| ArticleEntry {
                name: name.to_string(),
                title: name.title(),
            })
            .collect();

        Ok(ArticlePage {
            page: window.page,
            page_size: window.page_size,
            total: names.len(),
            articles,
            has_previous: window.has_previous,
            has_next: window.has_next,
        })
    }

    /// One index page with server-rendered previews.
    #[instrument(skip(self))]
    pub async fn index(&self, page: usize) -> Result<IndexPage, ArticleError> {
        let names = self.list().await?;
        let window = PageWindow::for_page(page, self.page_size, names.len())?;

        let mut previews = Vec::with_capacity(window.end - window.start);
        for name in window.slice(&names) {
            let output = self.render_named(name, RenderKind::Preview).await?;
            previews.push(ArticlePreview {
                name: name.clone(),
                title: name.title(),
                html: output.html,
            });
        }

        Ok(IndexPage {
            window,
            total: names.len(),
            previews,
        })
    }

    /// Load an article, reusing the cached copy while its mtime is unchanged.
    pub async fn load(&self, raw_name: &str) -> Result<Article, ArticleError> {
        let name = ArticleName::parse(raw_name)?;
        self.load_named(&name).await
    }

    /// The first `preview_lines` lines of an article's markdown.
    pub async fn preview(&self, raw_name: &str) -> Result<String, ArticleError> {
        let article = self.load(raw_name).await?;
        Ok(preview_lines(&article.markdown, self.preview_lines.get()))
    }

    /// Full article rendered to sanitised HTML.
    #[instrument(skip(self))]
    pub async fn render(&self, raw_name: &str) -> Result<RenderedArticle, ArticleError> {
        let name = ArticleName::parse(raw_name)?;
        let article = self.load_named(&name).await?;
        let output = self.render_article(&article, RenderKind::Body)?;
        Ok(RenderedArticle { article, output })
    }

    pub async fn health_check(&self) -> Result<(), ArticleError> {
        self.repo.health_check().await.map_err(ArticleError::Repo)
    }

    async fn load_named(&self, name: &ArticleName) -> Result<Article, ArticleError> {
        let modified = match self.repo.modified(name).await {
            Ok(modified) => modified,
            Err(err) => {
                if matches!(err, RepoError::NotFound) {
                    self.cache.invalidate(name);
                }
                return Err(ArticleError::from_repo(name, err));
            }
        };

        if let Some(article) = self.cache.get_article(name, modified) {
            return Ok(article);
        }

        let stored = self
            .repo
            .read(name)
            .await
            .map_err(|err| ArticleError::from_repo(name, err))?;
        debug!(
            target = "application::articles",
            article = %name,
            bytes = stored.markdown.len(),
            "Loaded article from storage"
        );

        let article = Article::new(name.clone(), stored.markdown, stored.modified);
        self.cache.set_article(article.clone());
        Ok(article)
    }

    async fn render_named(
        &self,
        name: &ArticleName,
        kind: RenderKind,
    ) -> Result<RenderOutput, ArticleError> {
        let article = self.load_named(name).await?;
        self.render_article(&article, kind)
    }

    fn render_article(
        &self,
        article: &Article,
        kind: RenderKind,
    ) -> Result<RenderOutput, ArticleError> {
        if let Some(output) = self.cache.get_render(&article.name, kind, article.modified) {
            return Ok(output);
        }

        let name = article.name.to_string();
        let request = match kind {
            RenderKind::Body => {
                RenderRequest::new(RenderTarget::ArticleBody { name }, article.markdown.as_str())
            }
            RenderKind::Preview => RenderRequest::new(
                RenderTarget::ArticlePreview { name },
                preview_lines(&article.markdown, self.preview_lines.get()),
            ),
        };

        let output = self.renderer.render(&request)?;
        self.cache
            .set_render(&article.name, kind, article.modified, output.clone());
        Ok(output)
    }
}
