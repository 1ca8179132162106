use std::{process, sync::Arc, time::Duration};

use folio::{
    application::{
        error::AppError,
        render::{
            RenderOptions, RenderRequest, RenderService, RenderTarget, configure_render_service,
            render_service,
        },
    },
    config::{self, Command, ListArgs, RenderArgs, Settings},
    infra::{
        assets,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use folio_api_types::ArticleList;
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;
    configure_render_service(RenderOptions::from(&settings.render))
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    match command {
        Command::Serve(_) => run_serve(settings).await,
        Command::List(args) => run_list(settings, args).await,
        Command::Render(args) => run_render(args).await,
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    if !settings.content.articles_dir.is_dir() {
        warn!(
            target = "folio::serve",
            articles_dir = %settings.content.articles_dir.display(),
            "Articles directory does not exist; the index will be empty"
        );
    }
    if !assets::has_asset("styles/site.css") {
        warn!(target = "folio::serve", "Site stylesheet missing from embedded assets");
    }

    let state = HttpState::from_settings(&settings, render_service());
    let router = http::build_router(state, settings.compression.clone());

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "folio::serve",
        addr = %settings.server.addr,
        content_root = %settings.content.root.display(),
        articles_dir = %settings.content.articles_dir.display(),
        "Listening"
    );

    let shutdown = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown({
        let shutdown = Arc::clone(&shutdown);
        async move {
            shutdown_signal().await;
            info!(target = "folio::serve", "Shutdown signal received; draining connections");
            shutdown.notify_one();
        }
    });

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_deadline(shutdown, grace) => {
            warn!(
                target = "folio::serve",
                grace_seconds = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!(target = "folio::serve", "Server stopped");
    Ok(())
}

async fn drain_deadline(shutdown: Arc<Notify>, grace: Duration) {
    shutdown.notified().await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "folio::serve", error = %err, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target = "folio::serve", error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn run_list(settings: Settings, args: ListArgs) -> Result<(), AppError> {
    let state = HttpState::from_settings(&settings, render_service());
    let names = state
        .articles
        .list()
        .await
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    if args.json {
        let list = ArticleList {
            articles: names.iter().map(ToString::to_string).collect(),
        };
        let json = serde_json::to_string_pretty(&list)
            .map_err(|err| AppError::unexpected(err.to_string()))?;
        println!("{json}");
    } else {
        for name in &names {
            println!("{}\t{}", name, name.title());
        }
    }

    info!(target = "folio::list", count = names.len(), "Listed articles");
    Ok(())
}

async fn run_render(args: RenderArgs) -> Result<(), AppError> {
    let markdown = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let request = RenderRequest::new(
        RenderTarget::Standalone {
            label: args.file.display().to_string(),
        },
        markdown,
    );
    let service = render_service();

    let html = if args.unsanitized {
        service.render_unsanitized(&request)
    } else {
        service.render(&request).map(|output| {
            info!(
                target = "folio::render",
                contains_code = output.contains_code,
                languages = ?output.languages,
                "Rendered document"
            );
            output.html
        })
    }
    .map_err(|err| AppError::unexpected(err.to_string()))?;

    println!("{html}");
    Ok(())
}
