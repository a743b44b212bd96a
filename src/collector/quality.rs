use std::collections::BTreeMap;

use crate::error::CollectError;
use crate::metrics::MetricSchema;
use crate::plex::SnapshotSource;
use crate::plex::model::{MediaItem, SectionKind};

/// Bucket label for items whose media descriptor carries no
/// resolution. A missing descriptor is data, not an error.
pub const UNDEFINED_RESOLUTION: &str = "undefined";

/// Frequency of each (type tag, resolution) pair across the library.
#[derive(Debug, Default)]
pub struct QualityScan {
    pub counts: BTreeMap<(String, String), u64>,
}

impl QualityScan {
    fn record(&mut self, item: MediaItem) {
        let resolution = item
            .resolution
            .unwrap_or_else(|| UNDEFINED_RESOLUTION.to_string());
        *self.counts.entry((item.kind, resolution)).or_insert(0) += 1;
    }
}

/// Enumerates every movie and every episode of every show.
///
/// Movie sections contribute their items directly; show sections are
/// walked one show at a time so each show's leaf episodes are
/// counted, not the seasons or shows themselves.
pub async fn collect(source: &dyn SnapshotSource) -> Result<QualityScan, CollectError> {
    let sections = source.library_sections().await?;
    let mut scan = QualityScan::default();

    for section in &sections {
        match section.kind {
            SectionKind::Movie => {
                for item in source.section_items(section).await? {
                    scan.record(item);
                }
            }
            SectionKind::Show => {
                for show in source.section_items(section).await? {
                    for episode in source.episodes_of(&show).await? {
                        scan.record(episode);
                    }
                }
            }
            SectionKind::Other => {}
        }
    }

    Ok(scan)
}

/// Replace semantics: the whole distribution is rewritten each cycle.
pub fn apply(metrics: &MetricSchema, server: &str, scan: &QualityScan) {
    metrics.media_quality_total.reset();
    for ((kind, quality), count) in &scan.counts {
        metrics
            .media_quality_total
            .with_label_values(&[kind.as_str(), quality.as_str(), server])
            .set(*count as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::testing::{FakeSource, fake_item, fake_section, gauge_value};
    use crate::plex::model::SectionKind;

    fn quality_source() -> FakeSource {
        let mut source = FakeSource::default();
        source.sections = vec![
            fake_section("1", "Movies", SectionKind::Movie, 2, 0),
            fake_section("2", "TV Shows", SectionKind::Show, 1, 0),
        ];
        source.items.insert(
            "1".into(),
            vec![
                fake_item("10", "movie", Some("1080"), &[], 0),
                fake_item("11", "movie", None, &[], 0),
            ],
        );
        source.items.insert("2".into(), vec![fake_item("20", "show", None, &[], 0)]);
        source.episodes.insert(
            "20".into(),
            vec![
                fake_item("21", "episode", Some("1080"), &[], 0),
                fake_item("22", "episode", Some("1080"), &[], 0),
                fake_item("23", "episode", None, &[], 0),
            ],
        );
        source
    }

    #[tokio::test]
    async fn counts_sum_to_movies_plus_episodes() {
        let scan = collect(&quality_source()).await.unwrap();
        let total: u64 = scan.counts.values().sum();
        // 2 movies + 3 episodes; the show item itself is not counted.
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn missing_resolution_lands_in_the_undefined_bucket() {
        let scan = collect(&quality_source()).await.unwrap();
        assert_eq!(scan.counts.get(&("movie".into(), "undefined".into())), Some(&1));
        assert_eq!(scan.counts.get(&("episode".into(), "undefined".into())), Some(&1));
        assert_eq!(scan.counts.get(&("episode".into(), "1080".into())), Some(&2));
    }

    #[tokio::test]
    async fn distribution_is_rewritten_wholesale() {
        let metrics = MetricSchema::new().unwrap();
        apply(&metrics, "plex", &collect(&quality_source()).await.unwrap());
        assert_eq!(gauge_value(&metrics, "media_quality_total", &["movie", "1080", "plex"]), Some(1));

        // Next cycle sees an empty library: everything clears.
        apply(&metrics, "plex", &collect(&FakeSource::default()).await.unwrap());
        assert_eq!(gauge_value(&metrics, "media_quality_total", &["movie", "1080", "plex"]), None);
    }
}
