use crate::error::CollectError;
use crate::metrics::MetricSchema;
use crate::plex::SnapshotSource;
use crate::plex::model::ServerIdentity;

/// Reads the server identity block.
///
/// Besides feeding `server_info`, the friendly name becomes the
/// `server` label value the cycle hands to every other collector.
pub async fn collect(source: &dyn SnapshotSource) -> Result<ServerIdentity, CollectError> {
    Ok(source.identity().await?)
}

/// Overwrites the info record in place.
///
/// The previous label set is dropped first so exactly one
/// `server_info` series exists at any time, even across server
/// upgrades that change the version label.
pub fn apply(metrics: &MetricSchema, identity: &ServerIdentity) {
    metrics.server_info.reset();
    metrics
        .server_info
        .with_label_values(&[
            identity.version.as_str(),
            identity.friendly_name.as_str(),
            identity.platform.as_str(),
            identity.platform_version.as_str(),
            if identity.subscription { "true" } else { "false" },
        ])
        .set(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::testing::FakeSource;

    #[tokio::test]
    async fn identity_is_a_singleton_across_version_changes() {
        let source = FakeSource::default();
        let metrics = MetricSchema::new().unwrap();

        let first = collect(&source).await.unwrap();
        apply(&metrics, &first);

        let upgraded = ServerIdentity { version: "1.41.0".into(), ..first };
        apply(&metrics, &upgraded);

        let families = metrics.gather();
        let info = families
            .iter()
            .find(|f| f.get_name() == "server_info")
            .expect("server_info must be registered");
        assert_eq!(info.get_metric().len(), 1);

        let labels: Vec<(&str, &str)> = info.get_metric()[0]
            .get_label()
            .iter()
            .map(|l| (l.get_name(), l.get_value()))
            .collect();
        assert!(labels.contains(&("version", "1.41.0")));
    }
}
