mod config;
mod highlight;
mod rewrite;

use std::sync::Arc;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use once_cell::sync::{Lazy, OnceCell};
use syntect::{dumps::from_uncompressed_data, html::ClassStyle, parsing::SyntaxSet};
use thiserror::Error;

use crate::application::render::types::{
    RenderError, RenderOutput, RenderRequest, RenderService,
};
use crate::config::RenderSettings;

use config::{build_sanitizer, comrak_options};
use rewrite::{RewriteOutcome, rewrite_ast};

pub use highlight::LanguageResolution;

/// Markdown options for the pipeline.
///
/// `smart_lists` is accepted for configuration compatibility; comrak always
/// produces tight/loose lists the way "smart lists" did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub gfm: bool,
    pub breaks: bool,
    pub header_ids: bool,
    pub smart_lists: bool,
    pub smarty_pants: bool,
    pub auto_detect: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&RenderSettings::default())
    }
}

impl From<&RenderSettings> for RenderOptions {
    fn from(settings: &RenderSettings) -> Self {
        Self {
            gfm: settings.gfm,
            breaks: settings.breaks,
            header_ids: settings.header_ids,
            smart_lists: settings.smart_lists,
            smarty_pants: settings.smarty_pants,
            auto_detect: settings.auto_detect,
        }
    }
}

/// Comrak-based rendering pipeline with Syntect highlighting and Ammonia sanitisation.
pub struct ComrakRenderService {
    render_options: RenderOptions,
    options: comrak::Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    sanitizer: ammonia::Builder<'static>,
}

impl ComrakRenderService {
    /// Construct a renderer that emits `syntax-` prefixed CSS classes for
    /// highlighted code.
    pub fn new(render_options: RenderOptions) -> Self {
        Self {
            render_options,
            options: comrak_options(&render_options),
            syntax_set: load_syntax_set(),
            class_style: ClassStyle::SpacedPrefixed { prefix: "syntax-" },
            sanitizer: build_sanitizer(),
        }
    }

    /// Render markdown into HTML while skipping the sanitisation stage. This is
    /// intended for diagnostics when refining sanitizer rules.
    pub fn render_unsanitized(&self, request: &RenderRequest) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);
        self.rewrite_stage(root)?;
        render_html_stage(root, &self.options)
    }

    fn rewrite_stage<'a>(&self, root: &'a AstNode<'a>) -> Result<RewriteOutcome, RenderError> {
        rewrite_ast(
            root,
            &self.syntax_set,
            &self.class_style,
            self.render_options.auto_detect,
        )
    }
}

impl Default for ComrakRenderService {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

impl RenderService for ComrakRenderService {
    fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, &request.markdown, &self.options);

        let outcome = self.rewrite_stage(root)?;
        let rendered_html = render_html_stage(root, &self.options)?;
        let html = self.sanitizer.clean(&rendered_html).to_string();

        Ok(RenderOutput {
            html,
            contains_code: outcome.contains_code,
            languages: outcome.languages,
        })
    }
}

/// Load the syntax pack embedded by the build script.
pub(crate) fn load_syntax_set() -> SyntaxSet {
    let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
    from_uncompressed_data(syntax_bytes).expect("syntax pack must be valid")
}

#[derive(Debug, Error)]
pub enum RenderConfigError {
    #[error("render service already configured")]
    AlreadyConfigured,
}

static RENDER_OPTIONS: OnceCell<RenderOptions> = OnceCell::new();

static RENDER_SERVICE: Lazy<Arc<ComrakRenderService>> = Lazy::new(|| {
    let options = RENDER_OPTIONS.get().copied().unwrap_or_default();
    Arc::new(ComrakRenderService::new(options))
});

/// Install render options for the shared service. Must run before the first
/// call to [`render_service`].
pub fn configure_render_service(options: RenderOptions) -> Result<(), RenderConfigError> {
    RENDER_OPTIONS
        .set(options)
        .map_err(|_| RenderConfigError::AlreadyConfigured)
}

/// Access the shared render service instance, initialised on first use.
pub fn render_service() -> Arc<ComrakRenderService> {
    Arc::clone(&RENDER_SERVICE)
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}
