//! GeoQuiz backend binary entrypoint wiring configuration, reference data, and the REST layer.

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use geoquiz_back::{
    config::AppConfig,
    dao::{leaderboard_store::file::CsvLeaderboardStore, reference::load_catalog},
    routes,
    state::{AppState, SharedState, leaderboard::Module},
};
use tokio::net::TcpListener;
use tokio::time::{Instant, sleep};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let catalog = load_catalog(&config.data);

    let modules = Module::standard_set(catalog.grid_problems.len())
        .into_iter()
        .map(Module::key)
        .collect();
    let store = Arc::new(CsvLeaderboardStore::new(
        config.data.leaderboard.clone(),
        modules,
    ));

    let app_state = AppState::new(config, catalog, store).await;

    tokio::spawn(run_store_supervisor(app_state.clone()));
    tokio::spawn(run_session_reaper(app_state.clone()));
    tokio::spawn(log_degraded_changes(app_state.clone()));
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Retry failed loads and saves in the background so degraded mode clears once the store works again.
async fn run_store_supervisor(state: SharedState) {
    let initial_delay_ms = 1000;
    let mut delay = Duration::from_millis(initial_delay_ms);
    let max_delay = Duration::from_secs(30);

    loop {
        if state.recover_store().await {
            delay = Duration::from_millis(initial_delay_ms);
            sleep(Duration::from_secs(10)).await;
        } else {
            sleep(delay).await;
            delay = (delay * 2).min(max_delay);
        }
    }
}

/// Drop sessions nobody has used for longer than the configured idle time.
async fn run_session_reaper(state: SharedState) {
    let max_idle = state.config().session_idle;
    let period = (max_idle / 4).clamp(Duration::from_secs(1), Duration::from_secs(300));

    loop {
        sleep(period).await;
        let evicted = state.evict_idle_sessions(max_idle, Instant::now().into_std());
        if evicted > 0 {
            info!(evicted, remaining = state.session_count(), "evicted idle sessions");
        } else {
            debug!("no idle sessions to evict");
        }
    }
}

async fn log_degraded_changes(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    while watcher.changed().await.is_ok() {
        if *watcher.borrow_and_update() {
            warn!("leaderboard store unavailable; scores are kept in memory only");
        } else {
            info!("leaderboard store reachable; leaving degraded mode");
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "cannot install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
