use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use anonsocial::application::services::MessagingService;
use anonsocial::infrastructure::observability::{TracingConfig, init_tracing};
use anonsocial::infrastructure::persistence::{
    PgConversationStore, PgUserDirectory, create_pool, run_migrations,
};
use anonsocial::presentation::{AppState, Environment, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load settings")?;

    init_tracing(
        TracingConfig::from_settings(environment.as_str(), &settings.logging),
        settings.server.port,
    );

    let pool = create_pool(
        &settings.database.url,
        settings.database.max_connections,
        settings.database.acquire_timeout(),
    )
    .await
    .context("Failed to connect to PostgreSQL")?;

    if settings.database.run_migrations {
        run_migrations(&pool).await?;
    }

    let messaging_service = Arc::new(MessagingService::new(
        Arc::new(PgConversationStore::new(pool.clone())),
        Arc::new(PgUserDirectory::new(pool)),
        settings.messaging.store_timeout(),
        settings.messaging.max_write_attempts,
    ));

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;

    let router = create_router(AppState {
        messaging_service,
        settings,
    });

    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
