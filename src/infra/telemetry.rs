use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_ARTICLE_EVICT, METRIC_ARTICLE_HIT, METRIC_ARTICLE_MISS, METRIC_RENDER_EVICT,
    METRIC_RENDER_HIT, METRIC_RENDER_MISS,
};
use crate::config::{LogFormat, LoggingSettings};
use crate::infra::http::encoding::{METRIC_COMPRESSED_RESPONSES, METRIC_COMPRESSION_RATIO};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so `list` and `render` output on stdout stays clean.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_ARTICLE_HIT,
            Unit::Count,
            "Article loads served from the cache."
        );
        describe_counter!(
            METRIC_ARTICLE_MISS,
            Unit::Count,
            "Article loads that read the file, including stale entries."
        );
        describe_counter!(
            METRIC_ARTICLE_EVICT,
            Unit::Count,
            "Articles evicted from the cache due to capacity."
        );
        describe_counter!(
            METRIC_RENDER_HIT,
            Unit::Count,
            "Rendered HTML served from the cache."
        );
        describe_counter!(
            METRIC_RENDER_MISS,
            Unit::Count,
            "Markdown renders performed because no fresh cached HTML existed."
        );
        describe_counter!(
            METRIC_RENDER_EVICT,
            Unit::Count,
            "Rendered HTML evicted from the cache due to capacity."
        );
        describe_counter!(
            METRIC_COMPRESSED_RESPONSES,
            Unit::Count,
            "Responses compressed, labelled by content coding."
        );
        describe_histogram!(
            METRIC_COMPRESSION_RATIO,
            Unit::Percent,
            "Compressed size as a percentage of the original body."
        );
    });
}
