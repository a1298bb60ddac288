mod app;
mod config;
mod state;
mod users;

/// `RUST_LOG` picks the filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "usercrud=debug,axum=info,tower_http=info".into());
    let json_logs = std::env::var("LOG_FORMAT").map_or(false, |v| v == "json");

    let fmt = tracing_subscriber::fmt().with_env_filter(filter);
    if json_logs {
        fmt.with_target(false).json().init();
    } else {
        fmt.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let app_state = state::AppState::init().await?;
    tracing::info!(store = app_state.config.store_kind(), "user store ready");

    let app = app::build_app(app_state.clone());
    app::serve(app, &app_state.config).await
}
