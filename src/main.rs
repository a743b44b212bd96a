// ------------------------------------------------------------
// Module declarations
// ------------------------------------------------------------
//
// Each module represents a well-defined responsibility:
//
// - config:    CLI flags + environment variable resolution
// - error:     source/collector error taxonomy
// - plex:      typed adapter over the Plex Media Server API
// - metrics:   the published metric schema and its registry
// - collector: the six sub-collectors, cycle, and scheduler
// - server:    the /metrics exposition endpoint
//
mod collector;
mod config;
mod error;
mod metrics;
mod plex;
mod server;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use tokio::time::sleep;

use collector::{CollectionCycle, Scheduler};
use config::Config;
use error::SourceError;
use metrics::MetricSchema;
use plex::{PlexClient, SnapshotSource};

/// Wait between reconnect attempts after the connection is lost
/// mid-run. Startup failures never retry; they exit non-zero.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(10);

// ------------------------------------------------------------
// Application entry point
// ------------------------------------------------------------
//
// Responsibilities:
// - Initialize logging
// - Resolve configuration (flags + environment)
// - Start the exposition endpoint (once, lives forever)
// - Supervise the collection side: connect, run the scheduler,
//   and rebuild the whole exporter after a lost connection
//
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let cfg = Config::parse();

    // A missing token is the one config error clap cannot catch,
    // because the flag itself is optional.
    let Some(token) = cfg.token.clone() else {
        error!("Plex token has not been defined (set PLEX_TOKEN or pass --token)");
        std::process::exit(1);
    };

    let metrics = Arc::new(MetricSchema::new()?);

    // The endpoint outlives reconnects: scraped values persist
    // while the collection side is being rebuilt.
    {
        let metrics = metrics.clone();
        let port = cfg.port;
        tokio::spawn(async move {
            if let Err(e) = server::serve(metrics, port).await {
                error!("metrics endpoint failed: {e}");
                std::process::exit(1);
            }
        });
    }

    // --------------------------------------------------------
    // Supervisory loop
    //
    // Connect-time failures are fatal: a rejected token or an
    // unreachable server will not fix itself by retrying here.
    // A connection lost *during* the run phase rebuilds the
    // exporter from scratch after a fixed backoff.
    // --------------------------------------------------------
    loop {
        let client = match PlexClient::new(&cfg.server, &token) {
            Ok(client) => client,
            Err(e) => {
                error!("failed to build the Plex client: {e}");
                std::process::exit(1);
            }
        };

        let identity = match client.identity().await {
            Ok(identity) => identity,
            Err(SourceError::Unauthorized) => {
                error!("Plex token is not valid");
                std::process::exit(1);
            }
            Err(SourceError::Unreachable(e)) => {
                error!("Plex Media Server '{}' is unreachable: {e}", cfg.server);
                std::process::exit(1);
            }
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        };
        info!("successfully connected to {}", identity.friendly_name);

        let cycle = CollectionCycle::new(
            Arc::new(client),
            metrics.clone(),
            identity.friendly_name,
        );
        let err = Scheduler::new(cycle, cfg.poll_interval()).run().await;

        error!(
            "connection to the server was lost: {err}; reconnecting in {}s",
            RECONNECT_BACKOFF.as_secs()
        );
        sleep(RECONNECT_BACKOFF).await;
    }
}
