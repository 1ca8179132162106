//! Article caching.
//!
//! Two LRU maps sit in front of the filesystem: loaded articles, and rendered
//! HTML keyed by `(name, kind)`. Both are sized from the `[cache]` section:
//!
//! ```toml
//! [cache]
//! article_limit = 256
//! render_limit = 128
//! ```

mod lock;
mod store;

pub use store::{ArticleCache, RenderKind};

pub const METRIC_ARTICLE_HIT: &str = "folio_article_cache_hit_total";
pub const METRIC_ARTICLE_MISS: &str = "folio_article_cache_miss_total";
pub const METRIC_ARTICLE_EVICT: &str = "folio_article_cache_evict_total";
pub const METRIC_RENDER_HIT: &str = "folio_render_cache_hit_total";
pub const METRIC_RENDER_MISS: &str = "folio_render_cache_miss_total";
pub const METRIC_RENDER_EVICT: &str = "folio_render_cache_evict_total";
