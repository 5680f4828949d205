mod api;
mod middleware;
mod notify;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
    notify::NotifyState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(farmgate_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = farmgate_db::PoolConfig::from_app_config(&config);
    let pool = farmgate_db::connect_pool(&config.database_url, pool_config).await?;
    farmgate_db::run_migrations(&pool).await?;

    let geocoder = Arc::new(farmgate_geocode::GeocodeClient::from_app_config(&config)?);
    let engine = Arc::new(
        farmgate_search::SearchEngine::new(
            farmgate_db::PgListingSource::with_rpc(pool.clone()),
            farmgate_geocode::GeocodeClient::from_app_config(&config)?,
        )
        .with_geocode_limits(
            std::time::Duration::from_secs(config.geocode_timeout_secs),
            config.geocode_max_concurrent,
        ),
    );
    let notify = match &config.notify_webhook_url {
        Some(url) => Some(NotifyState::new(url.clone())?),
        None => {
            tracing::info!("FARMGATE_NOTIFY_WEBHOOK_URL not set; application webhook disabled");
            None
        }
    };

    let _scheduler = scheduler::build_scheduler(pool.clone(), Arc::clone(&geocoder)).await?;

    let auth = AuthState::from_env(
        matches!(config.env, farmgate_core::Environment::Development),
        &config.api_key_hash_salt,
    )?;
    let app = build_app(
        AppState {
            pool,
            engine,
            geocoder,
            notify,
        },
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "farmgate server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
