//! Corral control plane - main server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::Settings;
use corral_api::AppState;
use corral_auth::{BrowserSessionStore, SessionAuthenticator, SessionConfig, SessionTokenService};
use corral_core::{ControllerId, Relation, TupleStore};
use corral_db::{MemoryGroupRepository, MemoryIdentityRepository, MemoryResourceRepository};
use corral_openfga::{CacheConfig, CachedTupleStore, OpenFgaClient, OpenFgaConfig, RelationService};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let settings = Settings::load().context("Failed to load configuration")?;

    info!("Starting corral v{}", env!("CARGO_PKG_VERSION"));

    let state = initialize_services(&settings).await?;
    let base_path = state.base_path.clone();
    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);
    info!("ReBAC admin: http://{}{}", addr, base_path);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,corral=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

async fn initialize_services(settings: &Settings) -> Result<AppState> {
    info!("Connecting to OpenFGA at {}...", settings.openfga.api_url);
    let client = OpenFgaClient::new(OpenFgaConfig {
        api_url: settings.openfga.api_url.clone(),
        api_token: settings.openfga.api_token.clone(),
        store_id: settings.openfga.store_id.clone(),
        authorization_model_id: settings.openfga.authorization_model_id.clone(),
        timeout: Duration::from_secs(settings.openfga.timeout_secs),
    })
    .context("Failed to create OpenFGA client")?;

    match client.health_check().await {
        Ok(()) => info!("OpenFGA store reachable"),
        Err(e) => warn!("OpenFGA health check failed: {}. Continuing; readiness will report it.", e),
    }

    let store: Arc<dyn TupleStore> = if settings.cache.enabled {
        info!(
            max_capacity = settings.cache.max_capacity,
            ttl_secs = settings.cache.ttl_secs,
            "Caching relation checks"
        );
        Arc::new(CachedTupleStore::new(
            Arc::new(client),
            CacheConfig {
                max_capacity: settings.cache.max_capacity,
                ttl: Duration::from_secs(settings.cache.ttl_secs),
            },
        ))
    } else {
        Arc::new(client)
    };

    let controller = ControllerId::from_uuid(settings.controller.uuid);
    bootstrap_admins(&store, controller, &settings.controller.admins).await?;

    let identities = Arc::new(MemoryIdentityRepository::new());
    let authenticator = SessionAuthenticator::new(
        BrowserSessionStore::new(SessionConfig {
            cookie_name: settings.session.cookie_name.clone(),
            max_age_secs: settings.session.cookie_max_age_secs,
            secure: settings.session.secure_cookie,
            ..SessionConfig::default()
        }),
        SessionTokenService::new(
            settings.session.secret.clone(),
            settings.session.issuer.clone(),
            settings.session.token_expiry_secs,
        ),
        identities.clone(),
        store.clone(),
        controller.entity(),
    );

    let state = AppState::new(
        store,
        Arc::new(authenticator),
        identities,
        Arc::new(MemoryGroupRepository::new()),
        Arc::new(MemoryResourceRepository::new()),
        controller.entity(),
    )
    .with_base_path(&settings.server.base_path);

    info!(controller = %settings.controller.name, uuid = %controller, "All services initialized");
    Ok(state)
}

/// Grant the configured identities administrator on the controller
async fn bootstrap_admins(
    store: &Arc<dyn TupleStore>,
    controller: ControllerId,
    admins: &[String],
) -> Result<()> {
    let relations = RelationService::new(store.clone());
    for admin in admins {
        relations
            .set_controller_access(admin, controller, Relation::Administrator)
            .await
            .with_context(|| format!("Failed to grant administrator to {}", admin))?;
        info!(identity = %admin, "Controller administrator ensured");
    }
    Ok(())
}

fn create_app(state: AppState) -> Router {
    corral_api::create_router_with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
