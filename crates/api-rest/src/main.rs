//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the portal's HTTP front end on its own.
//!
//! ## Intended use
//! Useful during development and template work. The workspace's `mdsolo-run` binary serves the
//! same router.

use api_rest::{build_state, router, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("mdsolo_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env();
    let app = router(build_state(&settings)?);

    tracing::info!("++ Starting MDSolo REST on {}", settings.addr);
    let listener = tokio::net::TcpListener::bind(&settings.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
