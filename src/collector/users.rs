use std::collections::BTreeMap;

use crate::error::CollectError;
use crate::plex::SnapshotSource;

/// Builds the account-id → name lookup for the current cycle.
///
/// Rebuilt from the live accounts query on every use, never cached
/// across cycles. Accounts without a name are left out; history
/// entries pointing at them are skipped by the playtime collector.
pub async fn directory(
    source: &dyn SnapshotSource,
) -> Result<BTreeMap<i64, String>, CollectError> {
    let mut names = BTreeMap::new();
    for account in source.accounts().await? {
        if !account.name.is_empty() {
            names.insert(account.id, account.name);
        }
    }
    Ok(names)
}
