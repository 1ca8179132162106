use crate::application::articles::{IndexPage, RenderedArticle};
use crate::application::error::{ErrorReport, HttpError};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// HTML 404 page. The `report` explains what was missing to the response logger.
pub fn render_not_found_response(chrome: LayoutChrome, report: ErrorReport) -> Response {
    let view = LayoutContext::new(chrome, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    report.attach(&mut response);
    response
}

/// HTML page for any [`HttpError`], keeping its status and report.
pub fn render_error_response(chrome: LayoutChrome, error: HttpError) -> Response {
    let status = error.status();
    let view = LayoutContext::new(
        chrome,
        ErrorPageView {
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: error.public_message().to_string(),
        },
    );
    let mut rendered = render_template_response(ErrorTemplate { view }, status);
    let mut original = error.into_response();
    if let Some(report) = original.extensions_mut().remove::<ErrorReport>() {
        report.attach(&mut rendered);
    }
    rendered
}

/// Site-wide header and footer data.
#[derive(Clone)]
pub struct LayoutChrome {
    pub site_title: String,
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: String,
    pub page_title: String,
    pub content: T,
}

impl<T: PageTitle> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        let page_title = match content.page_title() {
            Some(title) => format!("{title} · {}", chrome.site_title),
            None => chrome.site_title.clone(),
        };
        Self {
            site_title: chrome.site_title,
            page_title,
            content,
        }
    }
}

pub trait PageTitle {
    fn page_title(&self) -> Option<&str>;
}

#[derive(Clone)]
pub struct PreviewCard {
    pub href: String,
    pub raw_href: String,
    pub title: String,
    pub html: String,
}

#[derive(Clone)]
pub struct IndexView {
    pub previews: Vec<PreviewCard>,
    pub page: usize,
    pub total: usize,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
}

impl IndexView {
    pub fn from_page(index: IndexPage) -> Self {
        let page_href = |page: usize| {
            if page == 1 {
                "/".to_string()
            } else {
                format!("/page/{page}")
            }
        };

        Self {
            previous_href: index.window.previous_page().map(page_href),
            next_href: index.window.next_page().map(page_href),
            page: index.window.page,
            total: index.total,
            previews: index
                .previews
                .into_iter()
                .map(|preview| PreviewCard {
                    href: format!("/posts/{}", preview.name),
                    raw_href: format!("/articles/{}", preview.name),
                    title: preview.title,
                    html: preview.html,
                })
                .collect(),
        }
    }
}

impl PageTitle for IndexView {
    fn page_title(&self) -> Option<&str> {
        None
    }
}

#[derive(Clone)]
pub struct ArticleView {
    pub title: String,
    pub raw_href: String,
    pub html: String,
    pub contains_code: bool,
}

impl From<RenderedArticle> for ArticleView {
    fn from(rendered: RenderedArticle) -> Self {
        Self {
            raw_href: format!("/articles/{}", rendered.article.name),
            title: rendered.article.title,
            html: rendered.output.html,
            contains_code: rendered.output.contains_code,
        }
    }
}

impl PageTitle for ArticleView {
    fn page_title(&self) -> Option<&str> {
        Some(&self.title)
    }
}

#[derive(Clone)]
pub struct AboutView {
    pub paragraphs: Vec<String>,
}

impl PageTitle for AboutView {
    fn page_title(&self) -> Option<&str> {
        Some("About")
    }
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        }
    }
}

impl PageTitle for ErrorPageView {
    fn page_title(&self) -> Option<&str> {
        Some(&self.title)
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexView>,
}

#[derive(Template)]
#[template(path = "article.html")]
pub struct ArticleTemplate {
    pub view: LayoutContext<ArticleView>,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub view: LayoutContext<AboutView>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
