use lms_signup::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "lms_signup=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::init().await?;
    tracing::info!(
        store = ?state.config.store,
        identity = state.config.identity_kind(),
        "backends configured"
    );

    if let Some(db) = &state.db {
        if let Err(e) = sqlx::migrate!("./migrations").run(db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }
    }

    let host = state.config.host.clone();
    let port = state.config.port;
    app::serve(app::build_app(state), &host, port).await
}
