use crate::error::SourceError;
use crate::plex::model::{
    Account, HistoryEntry, LibrarySection, MediaItem, ServerIdentity, Session,
};

/// SnapshotSource is the abstraction layer between:
/// - the collection pipeline
/// - the Plex HTTP API
///
/// One implementation talks to a live server; tests substitute an
/// in-memory fake, which makes every collector a pure function of
/// its snapshot.
///
/// CONTRACT:
/// - Calls are independent reads of current server state; no call
///   mutates anything.
/// - No retry, caching, or pooling policy lives behind this trait;
///   it is a typed adapter only.
/// - `items_by_ids` preserves request order so callers can pair
///   results positionally.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Server identity block (version, name, platform, subscription).
    async fn identity(&self) -> Result<ServerIdentity, SourceError>;

    /// Currently active playback sessions. May be empty.
    async fn sessions(&self) -> Result<Vec<Session>, SourceError>;

    /// All server accounts.
    async fn accounts(&self) -> Result<Vec<Account>, SourceError>;

    /// All library sections with their declared totals.
    async fn library_sections(&self) -> Result<Vec<LibrarySection>, SourceError>;

    /// Top-level items of a section (movies, or shows).
    async fn section_items(&self, section: &LibrarySection)
    -> Result<Vec<MediaItem>, SourceError>;

    /// Leaf episodes of one show item.
    async fn episodes_of(&self, show: &MediaItem) -> Result<Vec<MediaItem>, SourceError>;

    /// Episode count of a show section via the dedicated episode
    /// search, distinct from the section's own declared item count.
    async fn episode_count(&self, section: &LibrarySection) -> Result<u64, SourceError>;

    /// Watch history entries.
    async fn history(&self) -> Result<Vec<HistoryEntry>, SourceError>;

    /// Batch-resolve items by id, in request order.
    async fn items_by_ids(&self, ids: &[u64]) -> Result<Vec<MediaItem>, SourceError>;
}
