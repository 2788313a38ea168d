use crate::error::{PlaylistError, Result};
use crate::provider::description;
use crate::provider::{
    Page, PlaylistItem, PlaylistStore, PlaylistSummary, ResourceRef, Thumbnail,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const MAX_PAGE_SIZE: u32 = 50;

pub struct YoutubeClient {
    api_base: String,
    api_key: Option<String>,
    page_size: u32,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct YoutubePlaylistResponse {
    #[serde(default)]
    items: Vec<YoutubePlaylist>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct YoutubePlaylist {
    id: String,
    snippet: YoutubePlaylistSnippet,
    #[serde(rename = "contentDetails")]
    content_details: Option<YoutubePlaylistContentDetails>,
}

#[derive(Deserialize)]
struct YoutubePlaylistSnippet {
    title: String,
    #[serde(default)]
    thumbnails: YoutubeThumbnails,
}

#[derive(Deserialize)]
struct YoutubePlaylistContentDetails {
    #[serde(rename = "itemCount", default)]
    item_count: u32,
}

#[derive(Deserialize, Default)]
struct YoutubeThumbnails {
    default: Option<YoutubeThumbnail>,
    medium: Option<YoutubeThumbnail>,
}

#[derive(Deserialize)]
struct YoutubeThumbnail {
    url: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

impl From<YoutubeThumbnail> for Thumbnail {
    fn from(t: YoutubeThumbnail) -> Self {
        Thumbnail {
            url: t.url,
            width: t.width,
            height: t.height,
        }
    }
}

#[derive(Deserialize)]
struct YoutubePlaylistItemsResponse {
    #[serde(default)]
    items: Vec<YoutubePlaylistItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct YoutubePlaylistItem {
    id: String,
    snippet: YoutubeItemSnippet,
}

#[derive(Deserialize)]
struct YoutubeItemSnippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(rename = "videoOwnerChannelTitle")]
    video_owner_channel_title: Option<String>,
    #[serde(rename = "videoOwnerChannelId")]
    video_owner_channel_id: Option<String>,
    #[serde(default)]
    position: u32,
    #[serde(rename = "resourceId")]
    resource_id: YoutubeResourceId,
    #[serde(default)]
    thumbnails: YoutubeThumbnails,
}

#[derive(Deserialize)]
struct YoutubeResourceId {
    kind: String,
    #[serde(rename = "videoId")]
    video_id: String,
}

impl From<YoutubePlaylist> for PlaylistSummary {
    fn from(p: YoutubePlaylist) -> Self {
        PlaylistSummary {
            id: p.id,
            title: p.snippet.title,
            thumbnail: p.snippet.thumbnails.medium.map(Thumbnail::from),
            item_count: p.content_details.map(|c| c.item_count).unwrap_or(0),
        }
    }
}

impl From<YoutubePlaylistItem> for PlaylistItem {
    fn from(item: YoutubePlaylistItem) -> Self {
        let snippet = item.snippet;
        let meta = description::parse(&snippet.description);
        let published_at = description::published_at(&meta, snippet.published_at.as_deref());

        PlaylistItem {
            id: item.id,
            resource_ref: ResourceRef {
                kind: snippet.resource_id.kind,
                video_id: snippet.resource_id.video_id,
            },
            title: snippet.title,
            author_label: snippet.video_owner_channel_title,
            author_id: snippet.video_owner_channel_id,
            position: snippet.position,
            thumbnail: snippet.thumbnails.default.map(Thumbnail::from),
            published_at,
            extracted_label: meta.label,
            target_position: None,
        }
    }
}

pub(crate) fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PlaylistError::Validation(format!("{} must not be empty", what)));
    }
    Ok(())
}

impl YoutubeClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_base: API_BASE.to_string(),
            api_key: None,
            page_size: MAX_PAGE_SIZE,
            http,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Result<Self> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(PlaylistError::Validation(format!(
                "page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, page_size
            )));
        }
        self.page_size = page_size;
        Ok(self)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_base, endpoint)
    }

    fn with_key<'a>(&'a self, mut query: Vec<(&'a str, String)>) -> Vec<(&'a str, String)> {
        if let Some(key) = &self.api_key {
            query.push(("key", key.clone()));
        }
        query
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PlaylistError::from_status(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| PlaylistError::malformed("Failed to parse API response", e))
    }

    async fn api_get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: Vec<(&str, String)>,
        token: &str,
    ) -> Result<T> {
        let url = self.url(endpoint);
        debug!("GET {} ({} params)", url, query.len());

        let request = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .query(&self.with_key(query));

        self.send(request).await
    }
}

#[async_trait]
impl PlaylistStore for YoutubeClient {
    async fn list_playlists_page(
        &self,
        page_token: Option<String>,
        access_token: &str,
    ) -> Result<Page<PlaylistSummary>> {
        let mut query = vec![
            ("part", "snippet,contentDetails".to_string()),
            ("mine", "true".to_string()),
            ("maxResults", self.page_size.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let resp: YoutubePlaylistResponse = self.api_get("playlists", query, access_token).await?;

        Ok(Page {
            items: resp.items.into_iter().map(PlaylistSummary::from).collect(),
            next_token: resp.next_page_token,
        })
    }

    async fn list_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<String>,
        access_token: &str,
    ) -> Result<Page<PlaylistItem>> {
        require(playlist_id, "playlist id")?;

        let mut query = vec![
            ("part", "snippet".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", self.page_size.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let resp: YoutubePlaylistItemsResponse =
            self.api_get("playlistItems", query, access_token).await?;

        Ok(Page {
            items: resp.items.into_iter().map(PlaylistItem::from).collect(),
            next_token: resp.next_page_token,
        })
    }

    async fn insert_item(
        &self,
        playlist_id: &str,
        video_id: &str,
        position: Option<u32>,
        access_token: &str,
    ) -> Result<PlaylistItem> {
        require(playlist_id, "playlist id")?;
        require(video_id, "video id")?;

        let mut snippet = serde_json::json!({
            "playlistId": playlist_id,
            "resourceId": {
                "kind": "youtube#video",
                "videoId": video_id
            }
        });
        // No position - adds to end
        if let Some(position) = position {
            snippet["position"] = serde_json::json!(position);
        }

        let url = self.url("playlistItems");
        debug!("POST {} video={} position={:?}", url, video_id, position);

        let request = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .query(&self.with_key(vec![("part", "snippet".to_string())]))
            .json(&serde_json::json!({ "snippet": snippet }));

        let created: YoutubePlaylistItem = self.send(request).await?;
        Ok(created.into())
    }

    async fn update_item_position(
        &self,
        playlist_id: &str,
        item: &PlaylistItem,
        position: u32,
        access_token: &str,
    ) -> Result<PlaylistItem> {
        require(playlist_id, "playlist id")?;
        require(&item.id, "playlist item id")?;
        require(&item.resource_ref.video_id, "video id")?;

        let body = serde_json::json!({
            "id": item.id,
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": {
                    "kind": item.resource_ref.kind,
                    "videoId": item.resource_ref.video_id
                },
                "position": position
            }
        });

        let url = self.url("playlistItems");
        debug!("PUT {} item={} position={}", url, item.id, position);

        let request = self
            .http
            .put(&url)
            .bearer_auth(access_token)
            .query(&self.with_key(vec![("part", "snippet".to_string())]))
            .json(&body);

        let updated: YoutubePlaylistItem = self.send(request).await?;
        Ok(updated.into())
    }

    async fn delete_item(&self, playlist_id: &str, item_id: &str, access_token: &str) -> Result<()> {
        require(playlist_id, "playlist id")?;
        require(item_id, "playlist item id")?;

        let url = self.url("playlistItems");
        debug!("DELETE {} item={} playlist={}", url, item_id, playlist_id);

        let response = self
            .http
            .delete(&url)
            .bearer_auth(access_token)
            .query(&self.with_key(vec![("id", item_id.to_string())]))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlaylistError::from_status(status.as_u16(), &body));
        }

        Ok(())
    }
}

/// Extract a playlist id from a YouTube URL (its `list` query parameter), or
/// return the input if it already is one.
pub fn extract_playlist_id(input: &str) -> String {
    let input = input.trim();

    if let Ok(url) = reqwest::Url::parse(input) {
        if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "list") {
            return id.into_owned();
        }
    }

    input.to_string()
}
