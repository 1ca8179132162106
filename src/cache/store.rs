//! In-memory article and render caches.
//!
//! Entries are validated against the file modification time on every read: a
//! stale entry counts as a miss and is dropped.

use std::{num::NonZeroUsize, sync::RwLock};

use lru::LruCache;
use metrics::counter;
use time::OffsetDateTime;

use crate::application::render::RenderOutput;
use crate::config::CacheSettings;
use crate::domain::articles::{Article, ArticleName};

use super::lock::rw_write;
use super::{
    METRIC_ARTICLE_EVICT, METRIC_ARTICLE_HIT, METRIC_ARTICLE_MISS, METRIC_RENDER_EVICT,
    METRIC_RENDER_HIT, METRIC_RENDER_MISS,
};

const SOURCE: &str = "cache::store";

/// Which rendering of an article is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderKind {
    Body,
    Preview,
}

#[derive(Debug, Clone)]
struct CachedRender {
    modified: OffsetDateTime,
    output: RenderOutput,
}

pub struct ArticleCache {
    articles: RwLock<LruCache<ArticleName, Article>>,
    renders: RwLock<LruCache<(ArticleName, RenderKind), CachedRender>>,
}

impl ArticleCache {
    pub fn new(settings: &CacheSettings) -> Self {
        Self::with_limits(settings.article_limit, settings.render_limit)
    }

    pub fn with_limits(article_limit: NonZeroUsize, render_limit: NonZeroUsize) -> Self {
        Self {
            articles: RwLock::new(LruCache::new(article_limit)),
            renders: RwLock::new(LruCache::new(render_limit)),
        }
    }

    /// Return the cached article when it was loaded from the same revision.
    pub fn get_article(&self, name: &ArticleName, modified: OffsetDateTime) -> Option<Article> {
        let mut articles = rw_write(&self.articles, SOURCE, "get_article");
        let fresh = match articles.get(name) {
            Some(article) if article.modified == modified => Some(article.clone()),
            Some(_) => {
                articles.pop(name);
                None
            }
            None => None,
        };
        drop(articles);

        record_lookup(fresh.is_some(), METRIC_ARTICLE_HIT, METRIC_ARTICLE_MISS);
        fresh
    }

    pub fn set_article(&self, article: Article) {
        let name = article.name.clone();
        let displaced = rw_write(&self.articles, SOURCE, "set_article").push(name.clone(), article);
        if matches!(displaced, Some((key, _)) if key != name) {
            counter!(METRIC_ARTICLE_EVICT).increment(1);
        }
    }

    pub fn get_render(
        &self,
        name: &ArticleName,
        kind: RenderKind,
        modified: OffsetDateTime,
    ) -> Option<RenderOutput> {
        let key = (name.clone(), kind);
        let mut renders = rw_write(&self.renders, SOURCE, "get_render");
        let fresh = match renders.get(&key) {
            Some(cached) if cached.modified == modified => Some(cached.output.clone()),
            Some(_) => {
                renders.pop(&key);
                None
            }
            None => None,
        };
        drop(renders);

        record_lookup(fresh.is_some(), METRIC_RENDER_HIT, METRIC_RENDER_MISS);
        fresh
    }

    pub fn set_render(
        &self,
        name: &ArticleName,
        kind: RenderKind,
        modified: OffsetDateTime,
        output: RenderOutput,
    ) {
        let key = (name.clone(), kind);
        let displaced = rw_write(&self.renders, SOURCE, "set_render")
            .push(key.clone(), CachedRender { modified, output });
        if matches!(displaced, Some((displaced_key, _)) if displaced_key != key) {
            counter!(METRIC_RENDER_EVICT).increment(1);
        }
    }

    /// Drop everything cached for `name`, e.g. after the file disappeared.
    pub fn invalidate(&self, name: &ArticleName) {
        rw_write(&self.articles, SOURCE, "invalidate").pop(name);
        let mut renders = rw_write(&self.renders, SOURCE, "invalidate");
        for kind in [RenderKind::Body, RenderKind::Preview] {
            renders.pop(&(name.clone(), kind));
        }
    }
}

fn record_lookup(hit: bool, hit_metric: &'static str, miss_metric: &'static str) {
    if hit {
        counter!(hit_metric).increment(1);
    } else {
        counter!(miss_metric).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    fn limit(value: usize) -> NonZeroUsize {
        NonZeroUsize::new(value).expect("non-zero")
    }

    fn article(raw: &str, modified: OffsetDateTime) -> Article {
        let name = ArticleName::parse(raw).expect("valid name");
        Article::new(name, format!("# {raw}"), modified)
    }

    fn output(html: &str) -> RenderOutput {
        RenderOutput {
            html: html.to_string(),
            contains_code: false,
            languages: Vec::new(),
        }
    }

    #[test]
    fn article_hit_requires_matching_mtime() {
        let cache = ArticleCache::with_limits(limit(4), limit(4));
        let at = OffsetDateTime::UNIX_EPOCH;
        let entry = article("a.md", at);
        let name = entry.name.clone();

        assert!(cache.get_article(&name, at).is_none());
        cache.set_article(entry.clone());
        assert_eq!(cache.get_article(&name, at), Some(entry));

        let later = at + Duration::seconds(5);
        assert!(cache.get_article(&name, later).is_none());
        assert!(
            cache.get_article(&name, at).is_none(),
            "stale entry is dropped"
        );
    }

    #[test]
    fn article_cache_evicts_least_recently_used() {
        let cache = ArticleCache::with_limits(limit(1), limit(1));
        let at = OffsetDateTime::UNIX_EPOCH;
        let first = article("first.md", at);
        let second = article("second.md", at);

        cache.set_article(first.clone());
        cache.set_article(second.clone());

        assert!(cache.get_article(&first.name, at).is_none());
        assert!(cache.get_article(&second.name, at).is_some());
    }

    #[test]
    fn renders_are_keyed_by_kind() {
        let cache = ArticleCache::with_limits(limit(4), limit(4));
        let at = OffsetDateTime::UNIX_EPOCH;
        let name = ArticleName::parse("a.md").expect("valid");

        cache.set_render(&name, RenderKind::Body, at, output("<p>body</p>"));
        assert!(cache.get_render(&name, RenderKind::Preview, at).is_none());
        assert_eq!(
            cache
                .get_render(&name, RenderKind::Body, at)
                .map(|out| out.html),
            Some("<p>body</p>".to_string())
        );
    }

    #[test]
    fn stale_render_is_a_miss() {
        let cache = ArticleCache::with_limits(limit(4), limit(4));
        let at = OffsetDateTime::UNIX_EPOCH;
        let name = ArticleName::parse("a.md").expect("valid");

        cache.set_render(&name, RenderKind::Body, at, output("old"));
        assert!(
            cache
                .get_render(&name, RenderKind::Body, at + Duration::minutes(1))
                .is_none()
        );
    }

    #[test]
    fn invalidate_clears_article_and_renders() {
        let cache = ArticleCache::with_limits(limit(4), limit(4));
        let at = OffsetDateTime::UNIX_EPOCH;
        let entry = article("a.md", at);
        let name = entry.name.clone();

        cache.set_article(entry);
        cache.set_render(&name, RenderKind::Body, at, output("x"));
        cache.set_render(&name, RenderKind::Preview, at, output("y"));
        cache.invalidate(&name);

        assert!(cache.get_article(&name, at).is_none());
        assert!(cache.get_render(&name, RenderKind::Body, at).is_none());
        assert!(cache.get_render(&name, RenderKind::Preview, at).is_none());
    }
}
