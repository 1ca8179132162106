use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies what is being rendered so callers can cache results appropriately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderTarget {
    /// The full body of an article.
    ArticleBody { name: String },
    /// The leading lines of an article shown on listing pages.
    ArticlePreview { name: String },
    /// A document outside the articles directory, such as a file passed on the CLI.
    Standalone { label: String },
}

impl RenderTarget {
    pub fn label(&self) -> &str {
        match self {
            RenderTarget::ArticleBody { name } | RenderTarget::ArticlePreview { name } => {
                name.as_str()
            }
            RenderTarget::Standalone { label } => label.as_str(),
        }
    }
}

/// Rendering request passed into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub target: RenderTarget,
    pub markdown: String,
}

impl RenderRequest {
    pub fn new(target: RenderTarget, markdown: impl Into<String>) -> Self {
        Self {
            target,
            markdown: markdown.into(),
        }
    }
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Sanitised HTML.
    pub html: String,
    /// Indicates whether the rendered HTML contains any code blocks.
    pub contains_code: bool,
    /// Syntax names used for code blocks, in order of first appearance.
    pub languages: Vec<String>,
}

/// Structured errors surfaced by the rendering pipeline.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
}

/// Trait exposed by the rendering pipeline. Implementations must be pure and
/// deterministic: given the same input, they return identical outputs or errors.
pub trait RenderService: Send + Sync {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError>;
}
