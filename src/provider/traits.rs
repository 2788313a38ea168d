use crate::error::Result;
use crate::provider::{OAuthToken, Page, PlaylistItem, PlaylistSummary};
use async_trait::async_trait;

/// The remote store that owns the authoritative playlist ordering.
///
/// Every call takes the bearer access token explicitly; credential lifetime is
/// managed by [`crate::session::Session`], not by the store.
#[async_trait]
pub trait PlaylistStore: Send + Sync {
    /// Fetch one page of the signed-in user's playlists
    async fn list_playlists_page(
        &self,
        page_token: Option<String>,
        access_token: &str,
    ) -> Result<Page<PlaylistSummary>>;

    /// Fetch one page of a playlist's items, in store order
    async fn list_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<String>,
        access_token: &str,
    ) -> Result<Page<PlaylistItem>>;

    /// Insert a video; `None` appends to the end
    async fn insert_item(
        &self,
        playlist_id: &str,
        video_id: &str,
        position: Option<u32>,
        access_token: &str,
    ) -> Result<PlaylistItem>;

    /// Move an existing item. The store re-indexes every other item.
    async fn update_item_position(
        &self,
        playlist_id: &str,
        item: &PlaylistItem,
        position: u32,
        access_token: &str,
    ) -> Result<PlaylistItem>;

    async fn delete_item(&self, playlist_id: &str, item_id: &str, access_token: &str)
        -> Result<()>;
}

/// Delegated OAuth against the platform's authorization server.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Generate OAuth authorization URL
    fn oauth_url(&self, redirect_uri: &str, state: &str) -> String;

    /// Exchange authorization code for tokens
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthToken>;

    /// Refresh an expired token
    async fn refresh_token(&self, token: &OAuthToken) -> Result<OAuthToken>;
}
