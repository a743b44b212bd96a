use prometheus::{IntGaugeVec, Opts, Registry, proto::MetricFamily};

/// Every metric published by the exporter, registered against one
/// private registry.
///
/// This is pure schema: names, kinds, and label sets. All update
/// behavior (replace vs overwrite-by-key) lives in the collectors'
/// apply steps, which receive this value explicitly.
///
/// CARDINALITY:
/// - `sessions_total` carries session_id and title, both unbounded
///   user-controlled strings. Series are replaced wholesale every
///   cycle, so only live sessions are exposed at any time, but a
///   busy server can still produce many distinct tuples per scrape.
///
/// `server_info` is the info-style record: the value is always 1 and
/// the labels carry the payload.
pub struct MetricSchema {
    registry: Registry,

    pub server_info: IntGaugeVec,
    pub clients_total: IntGaugeVec,
    pub sessions_total: IntGaugeVec,
    pub library_size_bytes_total: IntGaugeVec,
    pub library_items_total: IntGaugeVec,
    pub genres_total: IntGaugeVec,
    pub media_quality_total: IntGaugeVec,
    pub total_played_duration: IntGaugeVec,
}

impl MetricSchema {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let server_info = IntGaugeVec::new(
            Opts::new("server_info", "General Plex server information"),
            &["version", "name", "host_platform", "platform_version", "subscription"],
        )?;
        let clients_total = IntGaugeVec::new(
            Opts::new("clients_total", "Distinct Plex client devices with a live session"),
            &["device", "product", "platform"],
        )?;
        let sessions_total = IntGaugeVec::new(
            Opts::new("sessions_total", "Currently active playback sessions"),
            &[
                "session_id",
                "session_type",
                "username",
                "title",
                "player_product",
                "player_state",
                "location",
                "server",
            ],
        )?;
        let library_size_bytes_total = IntGaugeVec::new(
            Opts::new("library_size_bytes_total", "Total storage of a library in bytes"),
            &["name", "server", "type"],
        )?;
        let library_items_total = IntGaugeVec::new(
            Opts::new("library_items_total", "Total items in a library"),
            &["name", "server", "type"],
        )?;
        let genres_total = IntGaugeVec::new(
            Opts::new("genres_total", "Genre tag occurrences across all media items"),
            &["genre", "server"],
        )?;
        let media_quality_total = IntGaugeVec::new(
            Opts::new("media_quality_total", "Media items by resolution"),
            &["type", "quality", "server"],
        )?;
        let total_played_duration = IntGaugeVec::new(
            Opts::new("total_played_duration", "Cumulative watched duration per user (ms)"),
            &["server", "user"],
        )?;

        registry.register(Box::new(server_info.clone()))?;
        registry.register(Box::new(clients_total.clone()))?;
        registry.register(Box::new(sessions_total.clone()))?;
        registry.register(Box::new(library_size_bytes_total.clone()))?;
        registry.register(Box::new(library_items_total.clone()))?;
        registry.register(Box::new(genres_total.clone()))?;
        registry.register(Box::new(media_quality_total.clone()))?;
        registry.register(Box::new(total_played_duration.clone()))?;

        Ok(MetricSchema {
            registry,
            server_info,
            clients_total,
            sessions_total,
            library_size_bytes_total,
            library_items_total,
            genres_total,
            media_quality_total,
            total_played_duration,
        })
    }

    /// Current state of every registered metric, for exposition.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_registers_every_metric() {
        let schema = MetricSchema::new().expect("schema must build");
        schema.server_info.with_label_values(&["1.0", "plex", "Linux", "6.1", "true"]).set(1);
        schema.sessions_total
            .with_label_values(&["1", "direct", "alice", "Heat", "Plex Web", "playing", "lan", "plex"])
            .set(1);

        let names: Vec<String> =
            schema.gather().iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.contains(&"server_info".to_string()));
        assert!(names.contains(&"sessions_total".to_string()));
    }

    #[test]
    fn rewriting_a_label_tuple_keeps_the_last_value() {
        let schema = MetricSchema::new().unwrap();
        let labels = ["plex", "alice"];
        schema.total_played_duration.with_label_values(&labels).set(10);
        schema.total_played_duration.with_label_values(&labels).set(15);
        assert_eq!(schema.total_played_duration.with_label_values(&labels).get(), 15);
    }
}
