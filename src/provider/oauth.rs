use crate::error::{PlaylistError, Result};
use crate::provider::{Authenticator, OAuthToken};
use crate::state::credentials;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SCOPES: &str = "https://www.googleapis.com/auth/youtube";

pub struct YoutubeAuth {
    client_id: String,
    client_secret: String,
    auth_url: String,
    token_url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct YoutubeTokenResponse {
    access_token: String,
    #[serde(default = "bearer")]
    token_type: String,
    expires_in: u64,
    refresh_token: Option<String>,
    scope: Option<String>,
}

fn bearer() -> String {
    "Bearer".to_string()
}

impl YoutubeTokenResponse {
    fn into_oauth_token(self) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Some(credentials::now_secs() + self.expires_in),
            token_type: self.token_type,
            scope: self.scope,
        }
    }
}

impl YoutubeAuth {
    pub fn new(client_id: String, client_secret: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client_id,
            client_secret,
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            http,
        })
    }

    pub fn with_endpoints(mut self, auth_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<YoutubeTokenResponse> {
        debug!("POST {}", self.token_url);

        let response = self.http.post(&self.token_url).form(params).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // A rejected grant means the credential itself is no good.
            let err = PlaylistError::from_status(status.as_u16(), &body);
            return Err(match status.as_u16() {
                400 | 401 => PlaylistError::Auth(format!("Token request failed: {}", err)),
                _ => err,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| PlaylistError::malformed("Failed to parse token response", e))
    }
}

#[async_trait]
impl Authenticator for YoutubeAuth {
    fn oauth_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=offline&prompt=consent",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthToken> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        self.token_request(&params)
            .await
            .map(|r| r.into_oauth_token())
    }

    async fn refresh_token(&self, token: &OAuthToken) -> Result<OAuthToken> {
        let refresh = token
            .refresh_token
            .as_ref()
            .ok_or_else(|| PlaylistError::Auth("No refresh token available".to_string()))?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let mut new_token = self.token_request(&params).await?.into_oauth_token();

        // Google only returns a refresh_token on the first consent
        if new_token.refresh_token.is_none() {
            new_token.refresh_token = token.refresh_token.clone();
        }

        Ok(new_token)
    }
}
