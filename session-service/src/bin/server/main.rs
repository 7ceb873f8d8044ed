use std::sync::Arc;

use session_service::config::Config;
use session_service::domain::session::service::SessionPolicy;
use session_service::domain::session::service::SessionService;
use session_service::inbound::http::router::create_router;
use session_service::jobs::spawn_expiry_sweeper;
use session_service::outbound::crypto::Argon2PasswordVerifier;
use session_service::outbound::crypto::JwtTokenCodec;
use session_service::outbound::repositories::CassandraCredentialStore;
use session_service::outbound::repositories::PostgresUserRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "session-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        cassandra_nodes = ?config.cassandra.nodes,
        cassandra_keyspace = %config.cassandra.keyspace,
        access_ttl_minutes = config.jwt.access_ttl_minutes,
        refresh_ttl_days = config.session.refresh_ttl_days,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let credential_store = Arc::new(CassandraCredentialStore::new(&config).await?);
    tracing::info!(
        keyspace = %config.cassandra.keyspace,
        database = "cassandra",
        "Credential store ready"
    );

    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool));
    let password_verifier = Arc::new(Argon2PasswordVerifier::default());
    let token_codec = Arc::new(JwtTokenCodec::new(config.jwt.secret.as_bytes()));

    let session_service = Arc::new(SessionService::new(
        credential_store,
        password_verifier,
        token_codec,
        user_repository,
        SessionPolicy {
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
        },
    ));

    let sweeper = spawn_expiry_sweeper(Arc::clone(&session_service), config.sweep_interval());

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(Arc::clone(&session_service));
    let result = axum::serve(http_listener, http_application).await;

    sweeper.abort();

    match result {
        Ok(()) => tracing::info!("Server exited successfully"),
        Err(e) => tracing::error!(error = %e, "Server error"),
    };

    Ok(())
}
