//! repokit - connectivity check.
//!
//! Connects to the configured database through the same path applications
//! use, reports what answered, then runs the shutdown callbacks.

use repokit::closer;
use repokit::config::Config;
use repokit::context::Context;
use repokit::db::Db;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    info!("Starting repokit v{}", env!("CARGO_PKG_VERSION"));

    let db_config = config.database_config()?;
    let root = Context::background();

    let connect_ctx = root.with_timeout(config.connect_timeout_duration());
    let result = match Db::connect(&connect_ctx, &db_config).await {
        Ok(db) => {
            let info = db.connection_info(&connect_ctx).await;
            info!(
                db_type = %info.database_type,
                server_version = info.server_version.as_deref().unwrap_or("unknown"),
                "Database is reachable"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, suggestion = e.suggestion().unwrap_or(""), "Connection check failed");
            Err(e)
        }
    };

    let shutdown_ctx = root.with_timeout(config.shutdown_timeout_duration());
    if shutdown_ctx
        .run(async {
            closer::close_all(&shutdown_ctx).await;
            Ok(())
        })
        .await
        .is_err()
    {
        error!("Shutdown callbacks did not finish in time");
    }

    result?;
    info!("Shutdown complete");
    Ok(())
}
