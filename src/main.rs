use api_rest::{build_state, router, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the MDSolo portal
///
/// Serves the portal pages, the asynchronous page endpoint and the OpenAPI document.
///
/// # Environment Variables
/// - `MDSOLO_REST_ADDR`: listen address (default: "0.0.0.0:3000")
/// - `MDSOLO_BASE_URL`: public URL used in redirects and links (default: "http://localhost:3000/")
/// - `MDSOLO_MASTER_SHEET_ID`: master index document id (default: "master-index")
/// - `MDSOLO_USER_EMAIL`: signed-in practitioner (default: "md@localhost")
/// - `MDSOLO_CALENDAR_ID`: practice calendar (default: the user email)
/// - `MDSOLO_ROOT_FOLDER`: folder holding patient folders
/// - `MDSOLO_TIME_ZONE`: calendar time zone shown on the calendar page (default: "UTC")
/// - `MDSOLO_DATA_FILE`: JSON snapshot for the local backend; in memory when unset
/// - `MDSOLO_TEMPLATE_DIR`: page templates (default: "templates")
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mdsolo=info".parse()?)
                .add_directive("mdsolo_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env();
    let rest_app = router(build_state(&settings)?);

    tracing::info!("++ Starting MDSolo REST on {}", settings.addr);

    let listener = tokio::net::TcpListener::bind(&settings.addr).await?;
    axum::serve(listener, rest_app).await?;

    Ok(())
}
