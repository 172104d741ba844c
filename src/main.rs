use std::future::IntoFuture;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use feed_pulse::config::ServerArgs;
use feed_pulse::metrics::{stream, MetricsCollector};
use feed_pulse::{server, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = ServerArgs::parse();

    // ── 1. Build the engine ─────────────────────────────────────
    let config = args.metrics_config();
    info!(
        history_capacity = config.history_capacity,
        context_limit = config.model_context_limit,
        tick_ms = args.tick_ms,
        "starting metrics engine"
    );
    let metrics = Arc::new(MetricsCollector::with_config(config));

    // ── 2. Start the snapshot ticker ────────────────────────────
    let (latest, publisher) = stream::spawn_publisher(metrics.clone(), args.tick());

    // ── 3. Build shared state & router ──────────────────────────
    let state = Arc::new(AppState::new(metrics, latest));
    let app = server::create_router(state, &args.static_dir);

    // ── 4. Bind & serve ─────────────────────────────────────────
    let listener = match tokio::net::TcpListener::bind(args.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %args.bind, "failed to bind: {e}");
            std::process::exit(1);
        }
    };

    info!("dashboard   → http://{}", args.bind);
    info!("metrics SSE → http://{}/api/metrics/stream", args.bind);
    info!("metrics JSON→ http://{}/api/metrics", args.bind);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down");
    };

    // The publisher never returns while the server holds a receiver
    tokio::select! {
        served = axum::serve(listener, app).with_graceful_shutdown(shutdown).into_future() => {
            if let Err(e) = served {
                error!("server exited with error: {e}");
                std::process::exit(1);
            }
        }
        joined = publisher => {
            match joined {
                Ok(()) => error!("snapshot publisher stopped unexpectedly"),
                Err(e) => error!("snapshot publisher crashed: {e}"),
            }
            std::process::exit(1);
        }
    }
}
