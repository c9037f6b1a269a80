//! HHT diary authentication server binary.
//!
//! Serves the auth API over either Postgres or per-process in-memory
//! stores, with sponsors loaded from the database and/or a YAML catalog.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use hht_auth_api::AppState;
use hht_auth_api::config::ApiConfig;
use hht_auth_core::auth::keys::{TokenKeyPair, resolve_signing_keys};
use hht_auth_core::auth::queries::PgUserRepository;
use hht_auth_core::auth::repository::{InMemoryUserRepository, UserRepository};
use hht_auth_core::clock::{Clock, SystemClock};
use hht_auth_core::sponsor::catalog::SponsorCatalog;
use hht_auth_core::sponsor::config::SponsorConfigRegistry;
use hht_auth_core::sponsor::queries::{insert_sponsor_pattern, load_resolver};
use hht_auth_core::sponsor::resolver::SponsorPatternResolver;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the auth server.
#[derive(Parser, Debug)]
#[command(name = "hht_auth_server", about = "HHT diary authentication server")]
struct Args {
    /// Port to listen on; overrides the port in `BIND_ADDR`.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// PostgreSQL connection URL. Without it, users live in memory only.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// YAML file with sponsor patterns and sponsor configs.
    ///
    /// With a database, patterns seed an empty `sponsor_patterns` table.
    #[arg(long, env = "SPONSOR_CATALOG")]
    sponsor_catalog: Option<PathBuf>,

    /// PEM file with the Ed25519 signing key (PKCS#8).
    #[arg(long, env = "TOKEN_PRIVATE_KEY_PATH", requires = "token_public_key")]
    token_private_key: Option<PathBuf>,

    /// PEM file with the Ed25519 verification key (SPKI).
    #[arg(long, env = "TOKEN_PUBLIC_KEY_PATH", requires = "token_private_key")]
    token_public_key: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,hht_auth_api=debug,hht_auth_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(port) = args.port {
        config.bind_addr = with_port(&config.bind_addr, port);
    }
    info!(
        bind_addr = %config.bind_addr,
        trusted_proxy_hops = config.trusted_proxy_hops,
        "starting hht_auth_server"
    );

    let catalog = match &args.sponsor_catalog {
        Some(path) => Some(load_catalog(path)?),
        None => None,
    };

    let (users, sponsors, sponsor_configs) = match &args.database_url {
        Some(url) => {
            let pool = connect(url, args.max_connections).await?;
            let (sponsors, configs) = sponsors_from_db(&pool, catalog).await?;
            let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool));
            (users, sponsors, configs)
        }
        None => {
            warn!("no DATABASE_URL; user records are kept in memory and lost on exit");
            let (sponsors, configs) = match catalog {
                Some(catalog) => catalog.into_parts()?,
                None => (SponsorPatternResolver::default(), SponsorConfigRegistry::default()),
            };
            let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
            (users, sponsors, configs)
        }
    };
    if sponsors.is_empty() {
        warn!("no sponsor patterns loaded; every linking code will be rejected");
    }
    info!(
        patterns = sponsors.len(),
        configs = sponsor_configs.len(),
        "sponsors loaded"
    );

    let keys = match (&args.token_private_key, &args.token_public_key) {
        (Some(private), Some(public)) => TokenKeyPair::from_files(private, public)?,
        _ => resolve_signing_keys()?,
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(config.clone(), users, sponsors, sponsor_configs, &keys, clock)?;
    let cleanup = state.limiter.spawn_cleanup_task();

    let app = hht_auth_api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "auth API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cleanup.abort();
    info!("server stopped");
    Ok(())
}

/// Replace the port of a `host:port` bind address.
fn with_port(bind_addr: &str, port: u16) -> String {
    let host = bind_addr
        .rsplit_once(':')
        .map_or(bind_addr, |(host, _)| host);
    format!("{host}:{port}")
}

fn load_catalog(path: &Path) -> Result<SponsorCatalog, Box<dyn std::error::Error>> {
    let catalog = SponsorCatalog::load(path)?;
    info!(
        path = %path.display(),
        patterns = catalog.patterns.len(),
        configs = catalog.configs.len(),
        "sponsor catalog read"
    );
    Ok(catalog)
}

async fn connect(url: &str, max_connections: u32) -> Result<PgPool, Box<dyn std::error::Error>> {
    info!(max_connections, "configuring connection pool");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(url)
        .await?;

    info!("running database migrations");
    hht_auth_core::migrate::migrate(&pool).await?;
    Ok(pool)
}

/// Sponsor patterns come from the database, seeded from the catalog when
/// the table is empty. Configs always come from the catalog.
async fn sponsors_from_db(
    pool: &PgPool,
    catalog: Option<SponsorCatalog>,
) -> Result<(SponsorPatternResolver, SponsorConfigRegistry), Box<dyn std::error::Error>> {
    let mut resolver = load_resolver(pool).await?;
    let Some(catalog) = catalog else {
        return Ok((resolver, SponsorConfigRegistry::default()));
    };

    if resolver.is_empty() && !catalog.patterns.is_empty() {
        info!(patterns = catalog.patterns.len(), "seeding sponsor patterns from catalog");
        for pattern in &catalog.patterns {
            insert_sponsor_pattern(pool, pattern).await?;
        }
        resolver = load_resolver(pool).await?;
    }
    Ok((resolver, SponsorConfigRegistry::new(catalog.configs)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_port_replaces_only_the_port() {
        assert_eq!(with_port("127.0.0.1:3100", 8080), "127.0.0.1:8080");
        assert_eq!(with_port("0.0.0.0:0", 1), "0.0.0.0:1");
        assert_eq!(with_port("localhost", 9), "localhost:9");
    }

    #[test]
    fn args_parse_key_pair_together() {
        let args = Args::try_parse_from([
            "hht_auth_server",
            "--token-private-key",
            "a.pem",
            "--token-public-key",
            "b.pem",
        ])
        .unwrap();
        assert_eq!(args.token_private_key, Some(PathBuf::from("a.pem")));
        assert!(
            Args::try_parse_from(["hht_auth_server", "--token-private-key", "a.pem"]).is_err()
        );
    }
}
