//! Markdown rendering.
//!
//! The pipeline is pure: it accepts markdown, produces sanitised HTML with
//! highlighted code blocks, and surfaces structured errors. Caching happens in
//! the caller.

mod service;
mod types;

pub use service::{
    ComrakRenderService, LanguageResolution, RenderConfigError, RenderOptions,
    configure_render_service, render_service,
};
pub use types::{RenderError, RenderOutput, RenderRequest, RenderService, RenderTarget};
