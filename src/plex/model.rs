use serde::Deserialize;

// ------------------------------------------------------------
// Domain records
// ------------------------------------------------------------
//
// Everything the collectors consume is decided once, here, at the
// snapshot-source boundary. Collectors never look at raw Plex type
// tags or re-inspect JSON shapes.
//

/// Static identity of the Plex server, refreshed in place every cycle.
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    pub version: String,
    pub friendly_name: String,
    pub platform: String,
    pub platform_version: String,
    pub subscription: bool,
}

/// What a session is playing.
///
/// The episodic/movie distinction is made exactly once, when the raw
/// session record is converted. Episode titles are displayed together
/// with their show title; everything else uses the title as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMedia {
    Movie { title: String },
    Episode { show: String, title: String },
}

impl SessionMedia {
    pub fn display_title(&self) -> String {
        match self {
            SessionMedia::Movie { title } => title.clone(),
            SessionMedia::Episode { show, title } => format!("{show} - {title}"),
        }
    }
}

/// The client device a session is playing on.
#[derive(Debug, Clone)]
pub struct Player {
    pub product: String,
    pub state: String,
    pub device: String,
    pub platform: String,
    /// Unique device identifier, used for per-cycle client dedup.
    pub machine_id: String,
}

/// One live playback session.
///
/// Derived fresh each cycle from the server's session list; never
/// persisted across cycles.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub media: SessionMedia,
    pub username: String,
    pub player: Player,
    /// Playback location as reported by the server ("lan" / "wan").
    pub location: String,
    /// Whether any transcode sub-session is active.
    pub transcoding: bool,
}

impl Session {
    /// Label value for the session_type dimension.
    pub fn session_type(&self) -> &'static str {
        if self.transcoding { "transcode" } else { "direct" }
    }
}

/// A server account, used only as a per-cycle id → name lookup.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
}

/// Library section media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Movie,
    Show,
    Other,
}

impl SectionKind {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "movie" => SectionKind::Movie,
            "show" => SectionKind::Show,
            _ => SectionKind::Other,
        }
    }

    /// Stable label value for the library metrics' `type` dimension.
    pub fn label(&self) -> &'static str {
        match self {
            SectionKind::Movie => "movie",
            SectionKind::Show => "show",
            SectionKind::Other => "other",
        }
    }
}

/// One library section with its declared totals.
#[derive(Debug, Clone)]
pub struct LibrarySection {
    pub id: String,
    pub title: String,
    pub kind: SectionKind,
    /// Declared top-level item count (movies, or seasons/shows).
    pub item_count: u64,
    /// Total storage of the section in bytes.
    pub storage_bytes: u64,
}

/// One library item (movie, show, or episode).
///
/// Only the fields the collectors read survive the boundary; a
/// missing resolution stays `None` and is rendered as the
/// "undefined" bucket by the quality collector.
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub rating_key: String,
    /// Raw type tag ("movie", "show", "episode").
    pub kind: String,
    pub resolution: Option<String>,
    pub genres: Vec<String>,
    pub duration_ms: u64,
}

/// One watch-history entry.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub account_id: i64,
    /// Reference key of the watched item, `/library/metadata/{id}`.
    pub item_key: String,
}

impl HistoryEntry {
    /// Item id referenced by this entry, parsed from the trailing
    /// segment of the reference key. `None` for malformed keys.
    pub fn item_id(&self) -> Option<u64> {
        self.item_key.rsplit('/').next()?.parse().ok()
    }
}

// ------------------------------------------------------------
// Wire types
// ------------------------------------------------------------
//
// Serde mirrors of the Plex JSON containers. Every field the server
// might omit is Option or defaulted; shape anomalies degrade to
// sentinels instead of failing deserialization.
//

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    pub container: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawIdentity {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub platform_version: String,
    #[serde(default)]
    pub my_plex_subscription: bool,
}

impl From<RawIdentity> for ServerIdentity {
    fn from(raw: RawIdentity) -> Self {
        ServerIdentity {
            version: raw.version,
            friendly_name: raw.friendly_name,
            platform: raw.platform,
            platform_version: raw.platform_version,
            subscription: raw.my_plex_subscription,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSessionContainer {
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<RawSession>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawSession {
    #[serde(default)]
    pub session_key: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub grandparent_title: String,
    #[serde(rename = "User")]
    pub user: Option<RawUser>,
    #[serde(rename = "Player")]
    pub player: Option<RawPlayer>,
    #[serde(rename = "Session")]
    pub session: Option<RawSessionInfo>,
    #[serde(rename = "TranscodeSession")]
    pub transcode: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawUser {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPlayer {
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub machine_identifier: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSessionInfo {
    #[serde(default)]
    pub location: String,
}

/// Sentinel for string fields the server did not populate.
const UNKNOWN: &str = "unknown";

fn or_unknown(value: String) -> String {
    if value.is_empty() { UNKNOWN.to_string() } else { value }
}

impl From<RawSession> for Session {
    fn from(raw: RawSession) -> Self {
        let media = if raw.kind == "episode" {
            SessionMedia::Episode {
                show: raw.grandparent_title,
                title: raw.title,
            }
        } else {
            SessionMedia::Movie { title: raw.title }
        };
        let player = raw.player.unwrap_or_default();
        Session {
            session_id: raw.session_key,
            media,
            username: or_unknown(raw.user.map(|u| u.title).unwrap_or_default()),
            player: Player {
                product: player.product,
                state: player.state,
                device: player.device,
                platform: player.platform,
                machine_id: player.machine_identifier,
            },
            location: or_unknown(raw.session.map(|s| s.location).unwrap_or_default()),
            transcoding: raw.transcode.is_some(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawAccountContainer {
    #[serde(rename = "Account", default)]
    pub accounts: Vec<RawAccount>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAccount {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSectionContainer {
    #[serde(rename = "Directory", default)]
    pub directories: Vec<RawSection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSection {
    #[serde(default)]
    pub key: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawItemContainer {
    /// Declared total, present when paging parameters are sent.
    #[serde(default)]
    pub total_size: Option<u64>,
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawItem {
    #[serde(default)]
    pub rating_key: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(rename = "Media", default)]
    pub media: Vec<RawMedia>,
    #[serde(rename = "Genre", default)]
    pub genres: Vec<RawTag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawMedia {
    #[serde(default)]
    pub video_resolution: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTag {
    #[serde(default)]
    pub tag: String,
}

impl From<RawItem> for MediaItem {
    fn from(raw: RawItem) -> Self {
        // Resolution comes from the primary media descriptor only.
        let resolution = raw.media.first().and_then(|m| m.video_resolution.clone());
        MediaItem {
            rating_key: raw.rating_key,
            kind: raw.kind,
            resolution,
            genres: raw.genres.into_iter().map(|g| g.tag).collect(),
            duration_ms: raw.duration.unwrap_or(0),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawHistoryContainer {
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<RawHistoryEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawHistoryEntry {
    #[serde(rename = "accountID", default)]
    pub account_id: i64,
    #[serde(default)]
    pub key: String,
}

impl From<RawHistoryEntry> for HistoryEntry {
    fn from(raw: RawHistoryEntry) -> Self {
        HistoryEntry {
            account_id: raw.account_id,
            item_key: raw.key,
        }
    }
}

// Storage totals come from the media-providers feature listing,
// which nests per-section directories three levels deep.

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawProviderContainer {
    #[serde(rename = "MediaProvider", default)]
    pub providers: Vec<RawProvider>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawProvider {
    #[serde(rename = "Feature", default)]
    pub features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFeature {
    #[serde(rename = "Directory", default)]
    pub directories: Vec<RawStorageDirectory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawStorageDirectory {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub storage_total: Option<u64>,
}
