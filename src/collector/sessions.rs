use std::collections::HashSet;

use crate::error::CollectError;
use crate::metrics::MetricSchema;
use crate::plex::SnapshotSource;

/// One `sessions_total` series for the current cycle.
#[derive(Debug, Clone)]
pub struct SessionSeries {
    pub session_id: String,
    pub session_type: &'static str,
    pub username: String,
    pub title: String,
    pub player_product: String,
    pub player_state: String,
    pub location: String,
}

/// One `clients_total` series for the current cycle.
#[derive(Debug, Clone)]
pub struct ClientSeries {
    pub device: String,
    pub product: String,
    pub platform: String,
}

/// Everything the ClientAndSession pass wants to publish.
#[derive(Debug, Default)]
pub struct SessionScan {
    pub sessions: Vec<SessionSeries>,
    pub clients: Vec<ClientSeries>,
}

/// Walks the live session list.
///
/// Client series are deduplicated within the cycle by the player's
/// machine identifier, so a device with several open sessions still
/// yields exactly one client series.
pub async fn collect(source: &dyn SnapshotSource) -> Result<SessionScan, CollectError> {
    let live = source.sessions().await?;

    let mut scan = SessionScan::default();
    let mut seen_clients = HashSet::new();

    for session in live {
        scan.sessions.push(SessionSeries {
            session_id: session.session_id.clone(),
            session_type: session.session_type(),
            username: session.username.clone(),
            title: session.media.display_title(),
            player_product: session.player.product.clone(),
            player_state: session.player.state.clone(),
            location: session.location.clone(),
        });

        if seen_clients.insert(session.player.machine_id.clone()) {
            scan.clients.push(ClientSeries {
                device: session.player.device,
                product: session.player.product,
                platform: session.player.platform,
            });
        }
    }

    Ok(scan)
}

/// Replace semantics: every prior-cycle session and client series is
/// dropped before this cycle's are written, so ended sessions never
/// linger in the registry.
pub fn apply(metrics: &MetricSchema, server: &str, scan: &SessionScan) {
    metrics.sessions_total.reset();
    metrics.clients_total.reset();

    for s in &scan.sessions {
        metrics
            .sessions_total
            .with_label_values(&[
                s.session_id.as_str(),
                s.session_type,
                s.username.as_str(),
                s.title.as_str(),
                s.player_product.as_str(),
                s.player_state.as_str(),
                s.location.as_str(),
                server,
            ])
            .set(1);
    }
    for c in &scan.clients {
        metrics
            .clients_total
            .with_label_values(&[c.device.as_str(), c.product.as_str(), c.platform.as_str()])
            .set(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::testing::{FakeSource, fake_session, series_count};

    #[tokio::test]
    async fn clients_dedup_by_machine_identifier() {
        let source = FakeSource {
            sessions: vec![
                fake_session("1", "alice", "tablet-1"),
                fake_session("2", "alice", "tablet-1"),
                fake_session("3", "bob", "tv-9"),
            ],
            ..FakeSource::default()
        };

        let scan = collect(&source).await.unwrap();
        assert_eq!(scan.sessions.len(), 3);
        assert_eq!(scan.clients.len(), 2);
    }

    #[tokio::test]
    async fn ended_sessions_are_removed_on_the_next_pass() {
        let metrics = MetricSchema::new().unwrap();

        let busy = FakeSource {
            sessions: vec![
                fake_session("1", "alice", "tablet-1"),
                fake_session("2", "bob", "tv-9"),
            ],
            ..FakeSource::default()
        };
        apply(&metrics, "plex", &collect(&busy).await.unwrap());
        assert_eq!(series_count(&metrics, "sessions_total"), 2);
        assert_eq!(series_count(&metrics, "clients_total"), 2);

        let quiet = FakeSource {
            sessions: vec![fake_session("2", "bob", "tv-9")],
            ..FakeSource::default()
        };
        apply(&metrics, "plex", &collect(&quiet).await.unwrap());
        assert_eq!(series_count(&metrics, "sessions_total"), 1);
        assert_eq!(series_count(&metrics, "clients_total"), 1);
    }

    #[tokio::test]
    async fn empty_session_list_clears_everything() {
        let metrics = MetricSchema::new().unwrap();

        let busy = FakeSource {
            sessions: vec![fake_session("1", "alice", "tablet-1")],
            ..FakeSource::default()
        };
        apply(&metrics, "plex", &collect(&busy).await.unwrap());

        apply(&metrics, "plex", &collect(&FakeSource::default()).await.unwrap());
        assert_eq!(series_count(&metrics, "sessions_total"), 0);
        assert_eq!(series_count(&metrics, "clients_total"), 0);
    }
}
