use dotenvy::dotenv;
use member_benefits::{
    api::{self, AppState},
    config::{self, Secrets, database},
    errors::Result,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars may also be set externally
    dotenv().ok();

    // 3. Settings and secrets
    let app_config = config::load_app_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    let secrets = Secrets::from_env().inspect_err(|e| error!("{}", e))?;
    if secrets.admin_code.is_none() {
        info!("ADMIN_SECRET_CODE not set; admin registration and login are disabled");
    }

    // 4. Database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;
    tokio::fs::create_dir_all(&app_config.uploads.directory).await?;

    // 5. Serve
    let bind_address = app_config.server.bind_address.clone();
    let state = AppState {
        db: Arc::new(db),
        config: Arc::new(app_config),
        secrets: Arc::new(secrets),
    };
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind_address, e))?;
    info!("Listening on {}", bind_address);
    axum::serve(listener, api::router(state)).await?;

    Ok(())
}
