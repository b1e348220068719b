use std::sync::Arc;

use clap::Parser;
use scopegate_core::{CallerIdentity, PolicyRegistry};
use scopegate_server::api_key_repository::ApiKeyRepository;
use scopegate_server::auth;
use scopegate_server::cli::{Cli, Command};
use scopegate_server::config::{AppConfig, AuthMode, LogFormat, StorageBackend};
use scopegate_server::metrics::Metrics;
use scopegate_server::middleware::auth::AuthState;
use scopegate_server::rest;
use scopegate_server::service::GatewayService;
use scopegate_storage::postgres::migrations;
use scopegate_storage::{EntityStore, InMemoryStore, PostgresStore};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let registry = tracing_subscriber::registry().with(filter);

    match config.log.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer().json();
            registry.with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer().pretty();
            registry.with(fmt_layer).init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config);

    match cli.command {
        Some(Command::Migrate) => run_migrate(&config).await,
        Some(Command::CreateApiKey {
            user_id,
            account_id,
            profile_id,
        }) => {
            let mut identity = CallerIdentity::new(user_id);
            identity.account_id = account_id;
            identity.profile_id = profile_id;
            run_create_api_key(&config, &identity).await
        }
        Some(Command::RevokeApiKey { key_id }) => run_revoke_api_key(&config, &key_id).await,
        Some(Command::Serve) | None => run_serve(config).await,
    }
}

async fn connect(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
}

async fn run_migrate(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("running database migrations");
    let pool = connect(config).await?;
    migrations::run_migrations(&pool).await?;
    tracing::info!("migrations completed successfully");
    Ok(())
}

async fn run_create_api_key(
    config: &AppConfig,
    identity: &CallerIdentity,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect(config).await?;
    migrations::run_migrations(&pool).await?;

    let (full_key, secret) = auth::generate_api_key();
    let (key_id, _) = auth::parse_api_key(&full_key)?;
    let key_hash = auth::hash_secret(&secret)?;

    let repo = ApiKeyRepository::new(pool);
    repo.insert(identity, key_id, &key_hash).await?;

    println!("API key created successfully");
    println!("  Caller:  {identity}");
    println!("  Key ID:  {key_id}");
    println!("  API Key: {full_key}");
    println!();
    println!("Store this key securely. It will not be shown again.");
    Ok(())
}

async fn run_revoke_api_key(
    config: &AppConfig,
    key_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect(config).await?;
    let repo = ApiKeyRepository::new(pool);

    if repo.revoke(key_id).await? {
        println!("API key '{key_id}' revoked");
    } else {
        eprintln!("Error: no active api key with id '{key_id}'");
        std::process::exit(1);
    }
    Ok(())
}

async fn run_serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Arc::new(config.build_registry()?);
    tracing::info!(
        listen_addr = %config.listen_addr(),
        storage = ?config.storage.backend,
        auth = ?config.auth.mode,
        policies = registry.len(),
        "starting scopegate server"
    );

    let pool = if config.needs_database() {
        let pool = connect(&config).await?;
        migrations::run_migrations(&pool).await?;
        Some(pool)
    } else {
        None
    };

    let auth_state = match (config.auth.mode, &pool) {
        (AuthMode::ApiKey, Some(pool)) => {
            AuthState::with_repository(Arc::new(ApiKeyRepository::new(pool.clone())))
        }
        _ => {
            tracing::warn!("dev auth mode: caller identity is taken from request headers");
            AuthState::dev_mode()
        }
    };

    match (config.storage.backend, pool) {
        (StorageBackend::Postgres, Some(pool)) => {
            serve(&config, PostgresStore::new(pool), registry, auth_state).await
        }
        _ => serve(&config, InMemoryStore::new(), registry, auth_state).await,
    }
}

async fn serve<S: EntityStore + 'static>(
    config: &AppConfig,
    store: S,
    registry: Arc<PolicyRegistry>,
    auth_state: AuthState,
) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = Arc::new(Metrics::new());
    let service = Arc::new(
        GatewayService::new(Arc::new(store), registry).with_metrics(Arc::clone(&metrics)),
    );

    let state = rest::AppState {
        service,
        metrics,
        expose_error_details: config.server.expose_error_details,
    };
    let router = rest::create_router(state, auth_state);

    let addr: std::net::SocketAddr = config.listen_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "REST server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => { tracing::info!("received SIGINT"); }
                _ = sigterm.recv() => { tracing::info!("received SIGTERM"); }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to register SIGTERM handler, using SIGINT only");
            let _ = ctrl_c.await;
            tracing::info!("received SIGINT");
        }
    }
}
