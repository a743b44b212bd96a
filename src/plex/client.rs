use std::collections::HashMap;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::error::SourceError;
use crate::plex::model::{
    Account, Envelope, HistoryEntry, LibrarySection, MediaItem, RawAccountContainer,
    RawHistoryContainer, RawIdentity, RawItemContainer, RawProviderContainer,
    RawSectionContainer, RawSessionContainer, SectionKind, ServerIdentity, Session,
};
use crate::plex::source::SnapshotSource;

/// Connection timeout applied when the client is built. This is the
/// only timeout in play; individual requests during the run phase can
/// block indefinitely (accepted risk, see DESIGN.md).
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Plex item type code for episodes, used by the section search API.
const EPISODE_TYPE: u32 = 4;

// ------------------------------------------------------------
// PlexClient
// ------------------------------------------------------------
//
// Typed adapter over the Plex Media Server HTTP API.
//
// RESPONSIBILITIES:
// - Attach the access token and JSON accept header
// - Map transport/status/decode failures onto SourceError
// - Convert raw containers into the domain records of plex::model
//
// NOT RESPONSIBLE FOR:
// - Retry or backoff (supervisory loop)
// - Failure containment (collection cycle)
// - Any caching between cycles
//
pub struct PlexClient {
    http: reqwest::Client,
    base: String,
}

impl PlexClient {
    pub fn new(server: &str, token: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut token_value = HeaderValue::from_str(token)?;
        token_value.set_sensitive(true);
        headers.insert("X-Plex-Token", token_value);

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(PlexClient {
            http,
            base: server.trim_end_matches('/').to_string(),
        })
    }

    /// Issues one GET and decodes the JSON body.
    ///
    /// Error mapping:
    /// - transport failure      -> Unreachable
    /// - HTTP 401               -> Unauthorized
    /// - other non-2xx status   -> Status
    /// - body decode failure    -> Protocol
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Unreachable(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(SourceError::Unauthorized),
            status if !status.is_success() => Err(SourceError::Status(status)),
            _ => response
                .json::<T>()
                .await
                .map_err(|e| SourceError::Protocol(e.to_string())),
        }
    }

    /// Per-section storage totals from the media-providers listing.
    async fn storage_totals(&self) -> Result<HashMap<String, u64>, SourceError> {
        let envelope: Envelope<RawProviderContainer> =
            self.get_json("/media/providers?includeStorage=1").await?;

        let mut totals = HashMap::new();
        for provider in envelope.container.providers {
            for feature in provider.features {
                for dir in feature.directories {
                    if let Some(bytes) = dir.storage_total {
                        totals.insert(dir.id, bytes);
                    }
                }
            }
        }
        Ok(totals)
    }

    /// Declared top-level item count of a section (zero-size page).
    async fn declared_total(&self, section_id: &str) -> Result<u64, SourceError> {
        let envelope: Envelope<RawItemContainer> = self
            .get_json(&format!(
                "/library/sections/{section_id}/all?X-Plex-Container-Start=0&X-Plex-Container-Size=0"
            ))
            .await?;
        Ok(envelope.container.total_size.unwrap_or(0))
    }
}

#[async_trait::async_trait]
impl SnapshotSource for PlexClient {
    async fn identity(&self) -> Result<ServerIdentity, SourceError> {
        let envelope: Envelope<RawIdentity> = self.get_json("/").await?;
        Ok(envelope.container.into())
    }

    async fn sessions(&self) -> Result<Vec<Session>, SourceError> {
        let envelope: Envelope<RawSessionContainer> =
            self.get_json("/status/sessions").await?;
        Ok(envelope.container.metadata.into_iter().map(Session::from).collect())
    }

    async fn accounts(&self) -> Result<Vec<Account>, SourceError> {
        let envelope: Envelope<RawAccountContainer> = self.get_json("/accounts").await?;
        Ok(envelope
            .container
            .accounts
            .into_iter()
            .map(|a| Account { id: a.id, name: a.name })
            .collect())
    }

    async fn library_sections(&self) -> Result<Vec<LibrarySection>, SourceError> {
        let envelope: Envelope<RawSectionContainer> =
            self.get_json("/library/sections").await?;
        let storage = self.storage_totals().await?;

        let mut sections = Vec::with_capacity(envelope.container.directories.len());
        for raw in envelope.container.directories {
            let item_count = self.declared_total(&raw.key).await?;
            sections.push(LibrarySection {
                storage_bytes: storage.get(&raw.key).copied().unwrap_or(0),
                id: raw.key,
                title: raw.title,
                kind: SectionKind::from_raw(&raw.kind),
                item_count,
            });
        }
        Ok(sections)
    }

    async fn section_items(
        &self,
        section: &LibrarySection,
    ) -> Result<Vec<MediaItem>, SourceError> {
        let envelope: Envelope<RawItemContainer> = self
            .get_json(&format!("/library/sections/{}/all", section.id))
            .await?;
        Ok(envelope.container.metadata.into_iter().map(MediaItem::from).collect())
    }

    async fn episodes_of(&self, show: &MediaItem) -> Result<Vec<MediaItem>, SourceError> {
        let envelope: Envelope<RawItemContainer> = self
            .get_json(&format!("/library/metadata/{}/allLeaves", show.rating_key))
            .await?;
        Ok(envelope.container.metadata.into_iter().map(MediaItem::from).collect())
    }

    async fn episode_count(&self, section: &LibrarySection) -> Result<u64, SourceError> {
        let envelope: Envelope<RawItemContainer> = self
            .get_json(&format!(
                "/library/sections/{}/all?type={EPISODE_TYPE}&X-Plex-Container-Start=0&X-Plex-Container-Size=0",
                section.id
            ))
            .await?;
        Ok(envelope.container.total_size.unwrap_or(0))
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, SourceError> {
        let envelope: Envelope<RawHistoryContainer> =
            self.get_json("/status/sessions/history/all").await?;
        Ok(envelope.container.metadata.into_iter().map(HistoryEntry::from).collect())
    }

    async fn items_by_ids(&self, ids: &[u64]) -> Result<Vec<MediaItem>, SourceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let envelope: Envelope<RawItemContainer> = self
            .get_json(&format!("/library/metadata/{joined}"))
            .await?;
        Ok(envelope.container.metadata.into_iter().map(MediaItem::from).collect())
    }
}
