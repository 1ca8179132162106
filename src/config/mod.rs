//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

pub use cli::{
    CliArgs, Command, ContentOverride, ListArgs, RenderArgs, RenderOverrides, ServeArgs,
    ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_CONTENT_ROOT: &str = "static";
const DEFAULT_ARTICLES_DIR: &str = "articles";
pub(crate) const DEFAULT_PREVIEW_LINES: u32 = 10;
pub(crate) const DEFAULT_PAGE_SIZE: u32 = 5;
const DEFAULT_CACHE_ARTICLE_LIMIT: u32 = 256;
const DEFAULT_CACHE_RENDER_LIMIT: u32 = 128;
const DEFAULT_COMPRESSION_MIN_BYTES: u64 = 256;
const DEFAULT_SITE_TITLE: &str = "folio";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content: ContentSettings,
    pub render: RenderSettings,
    pub cache: CacheSettings,
    pub compression: CompressionSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub root: PathBuf,
    /// Articles directory, already joined onto `root`.
    pub articles_dir: PathBuf,
    pub preview_lines: NonZeroUsize,
    pub page_size: NonZeroUsize,
}

/// Markdown options, named after the browser-side renderer options they replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub gfm: bool,
    pub breaks: bool,
    pub header_ids: bool,
    pub smart_lists: bool,
    pub smarty_pants: bool,
    pub auto_detect: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            gfm: true,
            breaks: false,
            header_ids: false,
            smart_lists: true,
            smarty_pants: false,
            auto_detect: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub article_limit: NonZeroUsize,
    pub render_limit: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct CompressionSettings {
    pub enabled: bool,
    pub min_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub title: String,
    pub about: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
///
/// The platform `PORT` variable is honoured at the environment layer.
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FOLIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_port_env(std::env::var("PORT").ok())?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::List(args)) => raw.apply_content_override(&args.content),
        Some(Command::Render(args)) => raw.apply_render_overrides(&args.render),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content: RawContentSettings,
    render: RawRenderSettings,
    cache: RawCacheSettings,
    compression: RawCompressionSettings,
    site: RawSiteSettings,
}

impl RawSettings {
    fn apply_port_env(&mut self, value: Option<String>) -> Result<(), LoadError> {
        let Some(value) = value else {
            return Ok(());
        };
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        let port = trimmed
            .parse::<u16>()
            .map_err(|err| LoadError::invalid("PORT", format!("failed to parse: {err}")))?;
        self.server.port = Some(port);
        Ok(())
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(lines) = overrides.preview_lines {
            self.content.preview_lines = Some(lines);
        }
        if let Some(size) = overrides.page_size {
            self.content.page_size = Some(size);
        }
        if let Some(limit) = overrides.cache_article_limit {
            self.cache.article_limit = Some(limit);
        }
        if let Some(limit) = overrides.cache_render_limit {
            self.cache.render_limit = Some(limit);
        }
        if let Some(enabled) = overrides.compression {
            self.compression.enabled = Some(enabled);
        }
        if let Some(min_bytes) = overrides.compression_min_bytes {
            self.compression.min_bytes = Some(min_bytes);
        }

        self.apply_content_override(&overrides.content);
        self.apply_render_overrides(&overrides.render);
    }

    fn apply_content_override(&mut self, overrides: &ContentOverride) {
        if let Some(root) = overrides.content_root.as_ref() {
            self.content.root = Some(root.clone());
        }
        if let Some(dir) = overrides.articles_dir.as_ref() {
            self.content.articles_dir = Some(dir.clone());
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(auto_detect) = overrides.auto_detect {
            self.render.auto_detect = Some(auto_detect);
        }
        if let Some(breaks) = overrides.breaks {
            self.render.breaks = Some(breaks);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content,
            render,
            cache,
            compression,
            site,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let content = build_content_settings(content)?;
        let render = build_render_settings(render);
        let cache = build_cache_settings(cache)?;
        let compression = build_compression_settings(compression);
        let site = build_site_settings(site);

        Ok(Self {
            server,
            logging,
            content,
            render,
            cache,
            compression,
            site,
        })
    }
}

/// Loopback while developing, every interface in release builds.
fn default_host() -> &'static str {
    if cfg!(debug_assertions) {
        "127.0.0.1"
    } else {
        "0.0.0.0"
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| default_host().to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let root = content
        .root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_ROOT));
    if root.as_os_str().is_empty() {
        return Err(LoadError::invalid("content.root", "path must not be empty"));
    }

    let articles = content
        .articles_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTICLES_DIR));
    if articles.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "content.articles_dir",
            "path must not be empty",
        ));
    }
    let articles_dir = if articles.is_absolute() {
        articles
    } else {
        root.join(articles)
    };

    let preview_lines = non_zero_usize(
        content.preview_lines.unwrap_or(DEFAULT_PREVIEW_LINES),
        "content.preview_lines",
    )?;
    let page_size = non_zero_usize(
        content.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        "content.page_size",
    )?;

    Ok(ContentSettings {
        root,
        articles_dir,
        preview_lines,
        page_size,
    })
}

fn build_render_settings(render: RawRenderSettings) -> RenderSettings {
    let defaults = RenderSettings::default();
    RenderSettings {
        gfm: render.gfm.unwrap_or(defaults.gfm),
        breaks: render.breaks.unwrap_or(defaults.breaks),
        header_ids: render.header_ids.unwrap_or(defaults.header_ids),
        smart_lists: render.smart_lists.unwrap_or(defaults.smart_lists),
        smarty_pants: render.smarty_pants.unwrap_or(defaults.smarty_pants),
        auto_detect: render.auto_detect.unwrap_or(defaults.auto_detect),
    }
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let article_limit = non_zero_usize(
        cache.article_limit.unwrap_or(DEFAULT_CACHE_ARTICLE_LIMIT),
        "cache.article_limit",
    )?;
    let render_limit = non_zero_usize(
        cache.render_limit.unwrap_or(DEFAULT_CACHE_RENDER_LIMIT),
        "cache.render_limit",
    )?;

    Ok(CacheSettings {
        article_limit,
        render_limit,
    })
}

fn build_compression_settings(compression: RawCompressionSettings) -> CompressionSettings {
    CompressionSettings {
        enabled: compression.enabled.unwrap_or(true),
        min_bytes: compression
            .min_bytes
            .unwrap_or(DEFAULT_COMPRESSION_MIN_BYTES),
    }
}

fn build_site_settings(site: RawSiteSettings) -> SiteSettings {
    let title = site
        .title
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string());

    SiteSettings {
        title,
        about: site.about.unwrap_or_default(),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    root: Option<PathBuf>,
    articles_dir: Option<PathBuf>,
    preview_lines: Option<u32>,
    page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    gfm: Option<bool>,
    breaks: Option<bool>,
    header_ids: Option<bool>,
    smart_lists: Option<bool>,
    smarty_pants: Option<bool>,
    auto_detect: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    article_limit: Option<u32>,
    render_limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCompressionSettings {
    enabled: Option<bool>,
    min_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    about: Option<Vec<String>>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_usize(value: u32, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value = NonZeroU32::new(value)
        .ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))?;
    NonZeroUsize::try_from(value)
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))
}
