use std::collections::BTreeMap;

use log::warn;

use crate::collector::users;
use crate::error::CollectError;
use crate::metrics::MetricSchema;
use crate::plex::SnapshotSource;

/// Cumulative watched duration per username, in milliseconds.
#[derive(Debug, Default)]
pub struct PlaytimeTotals {
    pub per_user: BTreeMap<String, u64>,
}

/// Sums watched duration per user over the whole history.
///
/// History entries and their batch-resolved items are paired
/// positionally, so the two sequences must stay aligned: entries
/// with malformed reference keys are dropped *before* the batch
/// call, and a post-call length mismatch aborts this collector's
/// update rather than risk attributing durations to the wrong user.
pub async fn collect(source: &dyn SnapshotSource) -> Result<PlaytimeTotals, CollectError> {
    let names = users::directory(source).await?;
    let history = source.history().await?;

    let mut entries = Vec::with_capacity(history.len());
    let mut ids = Vec::with_capacity(history.len());
    for entry in history {
        match entry.item_id() {
            Some(id) => {
                ids.push(id);
                entries.push(entry);
            }
            None => warn!(
                "skipping history entry with malformed reference key {:?}",
                entry.item_key
            ),
        }
    }

    let items = source.items_by_ids(&ids).await?;
    if items.len() != entries.len() {
        return Err(CollectError::Misaligned {
            entries: entries.len(),
            items: items.len(),
        });
    }

    let mut totals = PlaytimeTotals::default();
    for (entry, item) in entries.iter().zip(items.iter()) {
        let Some(name) = names.get(&entry.account_id) else {
            warn!("no account name for id {}, skipping history entry", entry.account_id);
            continue;
        };
        *totals.per_user.entry(name.clone()).or_insert(0) += item.duration_ms;
    }

    Ok(totals)
}

/// Overwrite-by-key: users absent from the current history keep
/// their last-written total.
pub fn apply(metrics: &MetricSchema, server: &str, totals: &PlaytimeTotals) {
    for (user, duration_ms) in &totals.per_user {
        metrics
            .total_played_duration
            .with_label_values(&[server, user.as_str()])
            .set(*duration_ms as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::testing::{FakeSource, fake_item};
    use crate::plex::model::{Account, HistoryEntry};

    fn entry(account_id: i64, item_id: u64) -> HistoryEntry {
        HistoryEntry { account_id, item_key: format!("/library/metadata/{item_id}") }
    }

    fn history_source() -> FakeSource {
        let mut source = FakeSource::default();
        source.accounts = vec![
            Account { id: 1, name: "alice".into() },
            Account { id: 2, name: "bob".into() },
        ];
        source.history = vec![entry(1, 100), entry(1, 101), entry(2, 102)];
        source.resolved.insert(100, fake_item("100", "movie", None, &[], 10));
        source.resolved.insert(101, fake_item("101", "movie", None, &[], 5));
        source.resolved.insert(102, fake_item("102", "episode", None, &[], 7));
        source
    }

    #[tokio::test]
    async fn durations_accumulate_per_user() {
        let totals = collect(&history_source()).await.unwrap();
        assert_eq!(totals.per_user.get("alice"), Some(&15));
        assert_eq!(totals.per_user.get("bob"), Some(&7));
    }

    #[tokio::test]
    async fn unresolved_accounts_are_skipped_not_fatal() {
        let mut source = history_source();
        source.history.push(entry(99, 100));

        let totals = collect(&source).await.unwrap();
        assert_eq!(totals.per_user.len(), 2);
        assert_eq!(totals.per_user.get("alice"), Some(&15));
    }

    #[tokio::test]
    async fn malformed_reference_keys_are_dropped_before_the_batch() {
        let mut source = history_source();
        source.history.push(HistoryEntry {
            account_id: 1,
            item_key: "/library/metadata/not-an-id".into(),
        });

        // Alignment survives because the bad entry never reaches the
        // batch call.
        let totals = collect(&source).await.unwrap();
        assert_eq!(totals.per_user.get("alice"), Some(&15));
    }

    #[tokio::test]
    async fn batch_length_mismatch_aborts_the_update() {
        let mut source = history_source();
        // One referenced item cannot be resolved any more.
        source.resolved.remove(&101);

        let err = collect(&source).await.unwrap_err();
        assert!(matches!(err, CollectError::Misaligned { entries: 3, items: 2 }));
    }

    #[tokio::test]
    async fn totals_overwrite_by_key() {
        let metrics = MetricSchema::new().unwrap();
        apply(&metrics, "plex", &collect(&history_source()).await.unwrap());

        // bob drops out of history; alice watches more.
        let mut source = history_source();
        source.history = vec![entry(1, 100)];
        apply(&metrics, "plex", &collect(&source).await.unwrap());

        use crate::collector::testing::gauge_value;
        assert_eq!(gauge_value(&metrics, "total_played_duration", &["plex", "alice"]), Some(10));
        assert_eq!(gauge_value(&metrics, "total_played_duration", &["plex", "bob"]), Some(7));
    }
}
