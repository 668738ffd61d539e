use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use dds_core::config::{page_size_from_env_value, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use dds_core::directory::HttpUserDirectory;
use dds_core::notify::LogNotificationSink;
use dds_core::services::{
    ActivationService, AppointmentService, AssignmentService, DashboardService,
};
use dds_core::store::MemoryStore;
use dds_core::CoreConfig;

/// Main entry point for the doctor dashboard service
///
/// Starts the REST server with Swagger UI on `/swagger-ui`.
///
/// # Environment Variables
/// - `DDS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `DDS_USER_DIRECTORY_URL`: base URL of the user service
///   (default: "http://user-service:8080")
/// - `DDS_DEFAULT_PAGE_SIZE`: page size when a request omits one
/// - `DDS_MAX_PAGE_SIZE`: ceiling on requested page sizes
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration or startup fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dds_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("DDS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let directory_url = std::env::var("DDS_USER_DIRECTORY_URL")
        .unwrap_or_else(|_| "http://user-service:8080".into());
    let default_page_size = page_size_from_env_value(
        std::env::var("DDS_DEFAULT_PAGE_SIZE").ok(),
        DEFAULT_PAGE_SIZE,
    )?;
    let max_page_size =
        page_size_from_env_value(std::env::var("DDS_MAX_PAGE_SIZE").ok(), MAX_PAGE_SIZE)?;

    let cfg = Arc::new(CoreConfig::new(
        directory_url,
        default_page_size,
        max_page_size,
    )?);

    // The in-memory reference store; a document-database adapter replaces
    // this behind the same ports in production deployments.
    let store = Arc::new(MemoryStore::new());
    tracing::warn!("using the in-memory store: data does not survive restarts");

    let directory = Arc::new(HttpUserDirectory::new(
        cfg.user_directory_base_url().to_string(),
    ));
    let notifier = Arc::new(LogNotificationSink::new());

    let assignments = Arc::new(AssignmentService::new(
        store.clone(),
        store.clone(),
        directory.clone(),
    ));
    let state = AppState {
        cfg: cfg.clone(),
        activation: Arc::new(ActivationService::new(
            store.clone(),
            store.clone(),
            notifier,
        )),
        appointments: Arc::new(AppointmentService::new(
            store.clone(),
            store.clone(),
            directory.clone(),
            assignments.clone(),
        )),
        assignments,
        dashboard: Arc::new(DashboardService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            directory,
        )),
    };

    tracing::info!("++ Starting DDS REST on {}", rest_addr);

    let app = api_rest::router(state);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
