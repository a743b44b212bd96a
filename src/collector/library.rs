use std::collections::BTreeMap;

use crate::error::CollectError;
use crate::metrics::MetricSchema;
use crate::plex::SnapshotSource;
use crate::plex::model::SectionKind;

/// Per-section stats for the library metrics.
#[derive(Debug, Clone)]
pub struct SectionStats {
    pub title: String,
    pub kind: SectionKind,
    pub storage_bytes: u64,
    /// Declared top-level item count (movies, or shows).
    pub item_count: u64,
    /// Actual episode count from the dedicated episode search;
    /// show sections only.
    pub episode_count: Option<u64>,
}

#[derive(Debug, Default)]
pub struct LibraryScan {
    /// Genre tag frequencies across all movie- and show-section items.
    pub genres: BTreeMap<String, u64>,
    pub sections: Vec<SectionStats>,
}

/// Two passes over the library sections: first genre frequencies,
/// then per-section size/item stats.
///
/// Only movie- and show-type sections contribute genres; music and
/// photo sections are skipped entirely in the genre pass.
pub async fn collect(source: &dyn SnapshotSource) -> Result<LibraryScan, CollectError> {
    let sections = source.library_sections().await?;
    let mut scan = LibraryScan::default();

    for section in &sections {
        if !matches!(section.kind, SectionKind::Movie | SectionKind::Show) {
            continue;
        }
        for item in source.section_items(section).await? {
            for genre in item.genres {
                *scan.genres.entry(genre).or_insert(0) += 1;
            }
        }
    }

    for section in sections {
        let episode_count = match section.kind {
            SectionKind::Show => Some(source.episode_count(&section).await?),
            _ => None,
        };
        scan.sections.push(SectionStats {
            title: section.title,
            kind: section.kind,
            storage_bytes: section.storage_bytes,
            item_count: section.item_count,
            episode_count,
        });
    }

    Ok(scan)
}

/// Overwrite-by-key: no reset here. A deleted library or a genre that
/// stops occurring keeps its last-written series indefinitely.
pub fn apply(metrics: &MetricSchema, server: &str, scan: &LibraryScan) {
    for (genre, count) in &scan.genres {
        metrics
            .genres_total
            .with_label_values(&[genre.as_str(), server])
            .set(*count as i64);
    }

    for stats in &scan.sections {
        let kind = stats.kind.label();
        metrics
            .library_size_bytes_total
            .with_label_values(&[stats.title.as_str(), server, kind])
            .set(stats.storage_bytes as i64);
        metrics
            .library_items_total
            .with_label_values(&[stats.title.as_str(), server, kind])
            .set(stats.item_count as i64);

        // The episode series is keyed with its own type tag so it
        // never collides with the section's declared count.
        if let Some(episodes) = stats.episode_count {
            metrics
                .library_items_total
                .with_label_values(&[stats.title.as_str(), server, "episode"])
                .set(episodes as i64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::testing::{FakeSource, fake_item, fake_section, gauge_value};
    use crate::plex::model::SectionKind;

    #[tokio::test]
    async fn episode_count_is_distinct_from_declared_item_count() {
        let mut source = FakeSource::default();
        let shows = fake_section("2", "TV Shows", SectionKind::Show, 3, 9_000);
        source.episode_counts.insert("2".into(), 20);
        source.sections = vec![shows];

        let metrics = MetricSchema::new().unwrap();
        apply(&metrics, "plex", &collect(&source).await.unwrap());

        assert_eq!(gauge_value(&metrics, "library_items_total", &["TV Shows", "plex", "show"]), Some(3));
        assert_eq!(gauge_value(&metrics, "library_items_total", &["TV Shows", "plex", "episode"]), Some(20));
        assert_eq!(gauge_value(&metrics, "library_size_bytes_total", &["TV Shows", "plex", "show"]), Some(9_000));
    }

    #[tokio::test]
    async fn genres_count_across_movie_and_show_sections_only() {
        let mut source = FakeSource::default();
        source.sections = vec![
            fake_section("1", "Movies", SectionKind::Movie, 2, 100),
            fake_section("3", "Music", SectionKind::Other, 50, 100),
        ];
        source.items.insert(
            "1".into(),
            vec![
                fake_item("10", "movie", Some("1080"), &["Action", "Drama"], 0),
                fake_item("11", "movie", Some("720"), &["Drama"], 0),
            ],
        );
        source.items.insert(
            "3".into(),
            vec![fake_item("30", "artist", None, &["Jazz"], 0)],
        );

        let scan = collect(&source).await.unwrap();
        assert_eq!(scan.genres.get("Drama"), Some(&2));
        assert_eq!(scan.genres.get("Action"), Some(&1));
        assert!(!scan.genres.contains_key("Jazz"));
    }

    #[tokio::test]
    async fn vanished_sections_keep_their_last_series() {
        let metrics = MetricSchema::new().unwrap();

        let mut before = FakeSource::default();
        before.sections = vec![fake_section("1", "Movies", SectionKind::Movie, 7, 100)];
        apply(&metrics, "plex", &collect(&before).await.unwrap());

        // The section disappears from the live data; its series stays.
        apply(&metrics, "plex", &collect(&FakeSource::default()).await.unwrap());
        assert_eq!(gauge_value(&metrics, "library_items_total", &["Movies", "plex", "movie"]), Some(7));
    }
}
