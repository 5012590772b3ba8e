use std::ffi::OsStr;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wikirelay_api::{router, AppState, HttpNotifier, LogNotifier, Notifier, RelayConfig};
use wikirelay_store::KvSubscriptionRepository;

const DEFAULT_LOG_FILTER: &str = "wikirelay_api=debug,wikirelay_store=debug,wikirelay_core=info,tower_http=debug";

/// Install the global subscriber.
///
/// `LOG_FORMAT=json` switches to JSON lines, `LOG_FILE` sends output to a
/// daily-rotated file instead of stdout, and `RUST_LOG` overrides the filter.
/// The returned guard must outlive the server so buffered lines are flushed.
fn init_tracing() -> Option<WorkerGuard> {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (writer, guard) = match std::env::var("LOG_FILE").ok() {
        Some(path) => {
            let path = Path::new(&path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .unwrap_or(OsStr::new("wikirelay-api.log"));
            let (non_blocking, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(guard.is_none());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let config = RelayConfig::from_env()?;

    let store = config.kv_backend.connect().await?;
    let repo = KvSubscriptionRepository::with_config(store, config.atomic.clone());

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            info!(subsystem = "notify", "Delivering notifications to webhook");
            Arc::new(HttpNotifier::new(url.clone()))
        }
        None => {
            info!(
                subsystem = "notify",
                "NOTIFY_WEBHOOK_URL not set, notifications will only be logged"
            );
            Arc::new(LogNotifier)
        }
    };

    info!(
        server_v9_or_above = config.server_v9_or_above,
        wiki_url = %config.wiki_url,
        max_attempts = config.atomic.max_attempts,
        "Subscription registry ready"
    );

    let state = AppState::new(
        Arc::new(repo),
        notifier,
        config.server_v9_or_above,
        config.wiki_url.clone(),
    );
    let app = router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
