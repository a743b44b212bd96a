// ------------------------------------------------------------
// Collection pipeline
// ------------------------------------------------------------
//
// Six independent sub-collectors, each split into a pure read phase
// (collect: snapshot in, plain data out) and a write phase (apply:
// data into the metric schema). The cycle runs them in a fixed
// order and owns the failure boundary between them.
//
// - identity:  server_info record + the cached server label
// - library:   library sizes/items/episodes + genre frequencies
// - sessions:  live sessions and deduplicated clients
// - playtime:  per-user cumulative watched duration
// - quality:   resolution distribution of movies and episodes
// - users:     account-id lookup feeding the playtime collector
//
pub mod identity;
pub mod library;
pub mod playtime;
pub mod quality;
pub mod sessions;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::time::sleep;

use crate::error::CollectError;
use crate::metrics::MetricSchema;
use crate::plex::SnapshotSource;

/// One full collection pass over all sub-collectors.
///
/// FAILURE BOUNDARY:
/// - A failing collector is logged and skipped; its metrics keep
///   last cycle's values and every other collector still runs.
/// - A lost connection is the exception: it escalates to the
///   caller so the supervisory loop can rebuild the exporter.
///
/// A scrape landing mid-cycle may observe a mix of this cycle's and
/// last cycle's values across different metrics. That inconsistency
/// window is accepted; there is no snapshot isolation.
pub struct CollectionCycle {
    source: Arc<dyn SnapshotSource>,
    metrics: Arc<MetricSchema>,
    /// `server` label value; refreshed whenever the identity
    /// collector succeeds, otherwise the last known name is used.
    server_name: String,
}

impl CollectionCycle {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        metrics: Arc<MetricSchema>,
        server_name: String,
    ) -> Self {
        CollectionCycle { source, metrics, server_name }
    }

    pub async fn run(&mut self) -> Result<(), CollectError> {
        let source = self.source.as_ref();

        match identity::collect(source).await {
            Ok(info) => {
                self.server_name = info.friendly_name.clone();
                identity::apply(&self.metrics, &info);
                debug!("identity metrics updated");
            }
            Err(e) => self.contain("identity", e)?,
        }

        match library::collect(source).await {
            Ok(scan) => {
                library::apply(&self.metrics, &self.server_name, &scan);
                debug!("library metrics updated ({} sections)", scan.sections.len());
            }
            Err(e) => self.contain("library", e)?,
        }

        match sessions::collect(source).await {
            Ok(scan) => {
                sessions::apply(&self.metrics, &self.server_name, &scan);
                debug!(
                    "session metrics updated ({} sessions, {} clients)",
                    scan.sessions.len(),
                    scan.clients.len()
                );
            }
            Err(e) => self.contain("sessions", e)?,
        }

        match playtime::collect(source).await {
            Ok(totals) => {
                playtime::apply(&self.metrics, &self.server_name, &totals);
                debug!("playtime metrics updated ({} users)", totals.per_user.len());
            }
            Err(e) => self.contain("playtime", e)?,
        }

        match quality::collect(source).await {
            Ok(scan) => {
                quality::apply(&self.metrics, &self.server_name, &scan);
                debug!("quality metrics updated ({} buckets)", scan.counts.len());
            }
            Err(e) => self.contain("quality", e)?,
        }

        Ok(())
    }

    /// Logs and swallows a per-collector failure; propagates only
    /// errors that mean the connection itself is gone.
    fn contain(&self, collector: &str, err: CollectError) -> Result<(), CollectError> {
        if err.is_transient() {
            return Err(err);
        }
        warn!("{collector} collector failed, keeping previous values: {err}");
        Ok(())
    }
}

/// Runs collection cycles forever on a fixed nominal interval.
///
/// The sleep starts after the cycle completes, so the actual period
/// is the interval plus the cumulative latency of the cycle's remote
/// calls. Returns only when a cycle reports a lost connection.
pub struct Scheduler {
    cycle: CollectionCycle,
    interval: Duration,
}

impl Scheduler {
    pub fn new(cycle: CollectionCycle, interval: Duration) -> Self {
        Scheduler { cycle, interval }
    }

    pub async fn run(mut self) -> CollectError {
        loop {
            if let Err(err) = self.cycle.run().await {
                return err;
            }
            sleep(self.interval).await;
        }
    }
}

// ------------------------------------------------------------
// Test fixtures
// ------------------------------------------------------------
