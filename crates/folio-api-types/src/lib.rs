//! Wire types exchanged between the folio server and its API consumers.

use serde::{Deserialize, Serialize};

/// Article file names, newest first. Served at `/article_list`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArticleList {
    pub articles: Vec<String>,
}

/// A single listing entry with its display title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleEntry {
    pub name: String,
    pub title: String,
}

/// One page of the article listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePage {
    /// 1-based page number.
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub articles: Vec<ArticleEntry>,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Error body returned by JSON endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub status: u16,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_list_uses_articles_key() {
        let list = ArticleList {
            articles: vec!["2020_01_01_hello.md".to_string()],
        };
        let json = serde_json::to_value(&list).expect("serialize");
        assert_eq!(json, serde_json::json!({ "articles": ["2020_01_01_hello.md"] }));
    }

    #[test]
    fn article_page_deserializes_from_json() {
        let raw = r#"{
            "page": 2,
            "page_size": 5,
            "total": 6,
            "articles": [{ "name": "a.md", "title": "A" }],
            "has_previous": true,
            "has_next": false
        }"#;
        let page: ArticlePage = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(page.page, 2);
        assert_eq!(page.articles[0].title, "A");
        assert!(page.has_previous);
        assert!(!page.has_next);
    }
}
