use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "folio markdown blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the blog HTTP server.
    Serve(Box<ServeArgs>),
    /// Print the article listing, newest first.
    #[command(name = "list")]
    List(ListArgs),
    /// Render a markdown file to HTML on stdout.
    #[command(name = "render")]
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverride {
    /// Override the content root directory.
    #[arg(long = "content-root", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub content_root: Option<PathBuf>,

    /// Override the articles directory, relative to the content root.
    #[arg(long = "articles-dir", value_name = "PATH")]
    pub articles_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Toggle language auto-detection for code blocks without a recognised tag.
    #[arg(
        long = "render-auto-detect",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub auto_detect: Option<bool>,

    /// Toggle hard line breaks for single newlines.
    #[arg(
        long = "render-breaks",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub breaks: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub content: ContentOverride,

    #[command(flatten)]
    pub render: RenderOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the number of lines shown in article previews.
    #[arg(long = "preview-lines", value_name = "COUNT")]
    pub preview_lines: Option<u32>,

    /// Override the number of articles per listing page.
    #[arg(long = "page-size", value_name = "COUNT")]
    pub page_size: Option<u32>,

    /// Override the number of articles kept in the in-memory cache.
    #[arg(long = "cache-article-limit", value_name = "COUNT")]
    pub cache_article_limit: Option<u32>,

    /// Override the number of rendered articles kept in the in-memory cache.
    #[arg(long = "cache-render-limit", value_name = "COUNT")]
    pub cache_render_limit: Option<u32>,

    /// Toggle response compression.
    #[arg(
        long = "compression",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub compression: Option<bool>,

    /// Override the smallest body size that is compressed, in bytes.
    #[arg(long = "compression-min-bytes", value_name = "BYTES")]
    pub compression_min_bytes: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub content: ContentOverride,

    /// Emit the listing as JSON instead of one title per line.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub render: RenderOverrides,

    /// Skip the sanitisation stage (diagnostics only).
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub unsanitized: bool,

    /// Markdown file to render.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}
