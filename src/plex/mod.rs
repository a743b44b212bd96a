// ------------------------------------------------------------
// Plex API boundary
// ------------------------------------------------------------
//
// - model:  domain records + serde wire types; the raw-to-typed
//           conversion happens here and nowhere else
// - source: the SnapshotSource trait consumed by all collectors
// - client: reqwest-backed implementation against a live server
//
pub mod client;
pub mod model;
pub mod source;

pub use client::PlexClient;
pub use source::SnapshotSource;
