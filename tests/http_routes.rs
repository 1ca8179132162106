use std::{num::NonZeroUsize, path::Path, sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{
        Request, Response, StatusCode,
        header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE, ETAG, IF_NONE_MATCH, VARY},
    },
};
use folio::{
    application::render::ComrakRenderService,
    config::{
        CacheSettings, CompressionSettings, ContentSettings, LogFormat, LoggingSettings,
        RenderSettings, ServerSettings, Settings, SiteSettings,
    },
    infra::http::{HttpState, REQUEST_ID_HEADER, build_router},
};
use folio_api_types::{ApiErrorBody, ArticleList, ArticlePage};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use tracing::level_filters::LevelFilter;

fn non_zero(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).expect("non-zero")
}

fn settings(root: &Path, compression: bool) -> Settings {
    Settings {
        server: ServerSettings {
            addr: "127.0.0.1:0".parse().expect("addr"),
            graceful_shutdown: Duration::from_secs(1),
        },
        logging: LoggingSettings {
            level: LevelFilter::INFO,
            format: LogFormat::Compact,
        },
        content: ContentSettings {
            root: root.to_path_buf(),
            articles_dir: root.join("articles"),
            preview_lines: non_zero(3),
            page_size: non_zero(2),
        },
        render: RenderSettings::default(),
        cache: CacheSettings {
            article_limit: non_zero(16),
            render_limit: non_zero(16),
        },
        compression: CompressionSettings {
            enabled: compression,
            min_bytes: 32,
        },
        site: SiteSettings {
            title: "Test blog".to_string(),
            about: vec!["Written by a tester.".to_string()],
        },
    }
}

struct Fixture {
    _dir: TempDir,
    app: Router,
}

fn fixture(compression: bool) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let articles = dir.path().join("articles");
    std::fs::create_dir_all(&articles).expect("articles dir");
    std::fs::write(
        articles.join("2020_01_01_first_post.md"),
        "# First\n\nline two\nline three\n",
    )
    .expect("write");
    std::fs::write(
        articles.join("2021_06_01_code_sample.md"),
        "# Code\n\n```rust\nfn main() {}\n```\n",
    )
    .expect("write");
    std::fs::write(articles.join("2022_02_02_latest.md"), "Latest *news*.\n").expect("write");
    std::fs::write(dir.path().join("notes.txt"), "plain notes").expect("write");

    let settings = settings(dir.path(), compression);
    let state = HttpState::from_settings(&settings, Arc::new(ComrakRenderService::default()));
    let app = build_router(state, settings.compression.clone());
    Fixture { _dir: dir, app }
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("router responds")
}

async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(
        app,
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request"),
    )
    .await
}

async fn body_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

#[tokio::test]
async fn article_list_is_newest_first() {
    let fixture = fixture(false);
    let response = get(&fixture.app, "/article_list").await;
    assert_eq!(response.status(), StatusCode::OK);

    let list: ArticleList = serde_json::from_str(&body_string(response).await).expect("json");
    assert_eq!(
        list.articles,
        vec![
            "2022_02_02_latest.md",
            "2021_06_01_code_sample.md",
            "2020_01_01_first_post.md",
        ]
    );
}

#[tokio::test]
async fn api_pages_report_navigation() {
    let fixture = fixture(false);

    let first: ArticlePage =
        serde_json::from_str(&body_string(get(&fixture.app, "/api/articles").await).await)
            .expect("json");
    assert_eq!(first.page, 1);
    assert_eq!(first.total, 3);
    assert_eq!(first.articles.len(), 2);
    assert!(first.has_next);

    let second: ArticlePage =
        serde_json::from_str(&body_string(get(&fixture.app, "/api/articles?page=2").await).await)
            .expect("json");
    assert_eq!(second.articles.len(), 1);
    assert_eq!(second.articles[0].title, "2020 01 01 first post");
    assert!(!second.has_next);
}

#[tokio::test]
async fn api_rejects_bad_page_numbers() {
    let fixture = fixture(false);

    let response = get(&fixture.app, "/api/articles?page=abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ApiErrorBody = serde_json::from_str(&body_string(response).await).expect("json");
    assert_eq!(body.status, 400);

    let response = get(&fixture.app, "/api/articles?page=9").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn preview_returns_leading_lines_as_markdown() {
    let fixture = fixture(false);
    let response = get(&fixture.app, "/preview/articles/2020_01_01_first_post.md").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[CONTENT_TYPE]
            .to_str()
            .expect("ascii")
            .starts_with("text/markdown")
    );
    assert_eq!(body_string(response).await, "# First\n\nline two\n");
}

#[tokio::test]
async fn raw_article_is_served_verbatim() {
    let fixture = fixture(false);
    let response = get(&fixture.app, "/articles/2022_02_02_latest.md").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "Latest *news*.\n");
}

#[tokio::test]
async fn missing_and_traversal_names_are_not_found() {
    let fixture = fixture(false);

    let response = get(&fixture.app, "/articles/nope.md").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&fixture.app, "/articles/..%2Fnotes.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&fixture.app, "/posts/.hidden").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn article_page_renders_highlighted_code() {
    let fixture = fixture(false);
    let response = get(&fixture.app, "/posts/2021_06_01_code_sample.md").await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_string(response).await;
    assert!(html.contains("<title>2021 06 01 code sample · Test blog</title>"));
    assert!(html.contains("syntax-lang-rust"));
    assert!(html.contains("<h1>Code</h1>"));
}

#[tokio::test]
async fn index_shows_previews_and_pager() {
    let fixture = fixture(false);

    let html = body_string(get(&fixture.app, "/").await).await;
    assert!(html.contains("href=\"/posts/2022_02_02_latest.md\""));
    assert!(html.contains("<em>news</em>"));
    assert!(html.contains("href=\"/page/2\""));

    let html = body_string(get(&fixture.app, "/page/2").await).await;
    assert!(html.contains("2020 01 01 first post"));
    assert!(html.contains("line two"));
    assert!(!html.contains("line three"), "preview is limited to three lines");

    let response = get(&fixture.app, "/page/7").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = get(&fixture.app, "/page/zero").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn about_page_lists_configured_lines() {
    let fixture = fixture(false);
    let html = body_string(get(&fixture.app, "/about").await).await;
    assert!(html.contains("Written by a tester."));
}

#[tokio::test]
async fn static_assets_are_embedded() {
    let fixture = fixture(false);
    let response = get(&fixture.app, "/static/styles/code.css").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/css");

    let response = get(&fixture.app, "/static/styles/missing.css").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn content_files_support_conditional_requests() {
    let fixture = fixture(false);

    let response = get(&fixture.app, "/notes.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    let etag = response.headers()[ETAG].clone();
    assert_eq!(body_string(response).await, "plain notes");

    let conditional = Request::builder()
        .uri("/notes.txt")
        .header(IF_NONE_MATCH, etag)
        .body(Body::empty())
        .expect("request");
    let response = send(&fixture.app, conditional).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(body_string(response).await.is_empty());
}

#[tokio::test]
async fn content_root_directories_and_traversal_are_not_served() {
    let fixture = fixture(false);

    assert_eq!(
        get(&fixture.app, "/articles").await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(&fixture.app, "/../etc/passwd").await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        get(&fixture.app, "/does-not-exist.txt").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn health_reports_articles_directory_state() {
    let fixture = fixture(false);
    assert_eq!(
        get(&fixture.app, "/_health").await.status(),
        StatusCode::NO_CONTENT
    );

    let empty = tempfile::tempdir().expect("tempdir");
    let settings = settings(empty.path(), false);
    let state = HttpState::from_settings(&settings, Arc::new(ComrakRenderService::default()));
    let app = build_router(state, settings.compression.clone());
    assert_eq!(
        get(&app, "/_health").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn responses_carry_request_ids() {
    let fixture = fixture(false);
    let response = get(&fixture.app, "/about").await;
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn negotiated_compression_prefers_brotli() {
    let fixture = fixture(true);
    let request = Request::builder()
        .uri("/posts/2021_06_01_code_sample.md")
        .header(ACCEPT_ENCODING, "gzip, deflate, br")
        .body(Body::empty())
        .expect("request");
    let response = send(&fixture.app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_ENCODING], "br");
    assert_eq!(response.headers()[VARY], "accept-encoding");
}

#[tokio::test]
async fn refused_codings_fall_back_to_identity() {
    let fixture = fixture(true);
    let request = Request::builder()
        .uri("/posts/2021_06_01_code_sample.md")
        .header(ACCEPT_ENCODING, "br;q=0, gzip;q=0")
        .body(Body::empty())
        .expect("request");
    let response = send(&fixture.app, request).await;

    assert!(response.headers().get(CONTENT_ENCODING).is_none());
    assert!(body_string(response).await.contains("syntax-lang-rust"));
}

#[tokio::test]
async fn content_file_names_are_percent_decoded() {
    let fixture = fixture(false);
    std::fs::write(fixture._dir.path().join("my notes.txt"), "spaced").expect("write");

    let response = get(&fixture.app, "/my%20notes.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "spaced");

    let response = get(&fixture.app, "/%2e%2e/notes.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn compressed_content_files_get_a_distinct_validator() {
    let fixture = fixture(true);
    std::fs::write(
        fixture._dir.path().join("big.txt"),
        "compress me please ".repeat(64),
    )
    .expect("write");

    let identity = get(&fixture.app, "/big.txt").await;
    let strong = identity.headers()[ETAG].clone();

    let request = Request::builder()
        .uri("/big.txt")
        .header(ACCEPT_ENCODING, "gzip")
        .body(Body::empty())
        .expect("request");
    let compressed = send(&fixture.app, request).await;
    assert_eq!(compressed.headers()[CONTENT_ENCODING], "gzip");
    let weak = compressed.headers()[ETAG].clone();
    assert_ne!(weak, strong);
    assert_eq!(
        weak.to_str().expect("ascii"),
        format!("W/{}", strong.to_str().expect("ascii"))
    );

    let revalidate = Request::builder()
        .uri("/big.txt")
        .header(ACCEPT_ENCODING, "gzip")
        .header(IF_NONE_MATCH, weak)
        .body(Body::empty())
        .expect("request");
    let response = send(&fixture.app, revalidate).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
}
