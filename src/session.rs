use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{PlaylistError, Result};
use crate::provider::{Authenticator, OAuthToken};
use crate::state::credentials;

/// Seconds before the recorded expiry at which a token is already treated as
/// expired.
const EXPIRY_SKEW_SECS: u64 = 60;

/// The signed-in user's credential for the lifetime of one command.
///
/// Passed explicitly to every operation that talks to the store. A failed
/// refresh invalidates the session for good; the user has to sign in again.
pub struct Session<A: Authenticator> {
    auth: A,
    token: Mutex<Option<OAuthToken>>,
    data_dir: Option<PathBuf>,
}

impl<A: Authenticator> Session<A> {
    pub fn new(auth: A, token: OAuthToken) -> Self {
        Self {
            auth,
            token: Mutex::new(Some(token)),
            data_dir: None,
        }
    }

    /// Persist refreshed tokens to, and drop invalidated ones from,
    /// `data_dir`.
    pub fn persisted_in(mut self, data_dir: &Path) -> Self {
        self.data_dir = Some(data_dir.to_path_buf());
        self
    }

    /// A bearer token that is not about to expire, refreshing it once if
    /// needed.
    pub async fn valid_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        let current = guard
            .as_ref()
            .ok_or_else(|| PlaylistError::Auth("Not signed in to YouTube".to_string()))?;

        if !credentials::is_expired(current, EXPIRY_SKEW_SECS) {
            return Ok(current.access_token.clone());
        }

        debug!("access token expired, refreshing");
        let refreshed = match self.auth.refresh_token(current).await {
            Ok(token) => token,
            Err(err) => {
                warn!("token refresh failed: {}", err);
                *guard = None;
                drop(guard);
                self.forget_persisted();
                return Err(PlaylistError::Auth(format!(
                    "Session expired and could not be refreshed ({})",
                    err
                )));
            }
        };

        if let Some(dir) = &self.data_dir {
            if let Err(err) = credentials::save(dir, &refreshed) {
                warn!("could not persist refreshed token: {:#}", err);
            }
        }

        let access = refreshed.access_token.clone();
        *guard = Some(refreshed);
        Ok(access)
    }

    /// Drop the credential. Every later `valid_token` call fails with an
    /// auth error.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
        self.forget_persisted();
    }

    fn forget_persisted(&self) {
        if let Some(dir) = &self.data_dir {
            if let Err(err) = credentials::delete(dir) {
                warn!("could not remove stored credentials: {:#}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FakeAuth {
        refreshes: AtomicUsize,
        fail: bool,
    }

    impl FakeAuth {
        fn new(fail: bool) -> Self {
            Self {
                refreshes: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl Authenticator for FakeAuth {
        fn oauth_url(&self, _redirect_uri: &str, _state: &str) -> String {
            String::new()
        }

        async fn exchange_code(&self, _code: &str, _redirect_uri: &str) -> Result<OAuthToken> {
            unimplemented!()
        }

        async fn refresh_token(&self, token: &OAuthToken) -> Result<OAuthToken> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PlaylistError::Auth("invalid_grant".into()));
            }
            Ok(OAuthToken {
                access_token: "fresh".into(),
                refresh_token: token.refresh_token.clone(),
                expires_at: Some(credentials::now_secs() + 3600),
                token_type: "Bearer".into(),
                scope: None,
            })
        }
    }

    fn token(expires_at: u64) -> OAuthToken {
        OAuthToken {
            access_token: "stale".into(),
            refresh_token: Some("r".into()),
            expires_at: Some(expires_at),
            token_type: "Bearer".into(),
            scope: None,
        }
    }

    #[tokio::test]
    async fn test_valid_token_is_returned_as_is() {
        let session = Session::new(FakeAuth::new(false), token(credentials::now_secs() + 3600));
        assert_eq!(session.valid_token().await.unwrap(), "stale");
        assert_eq!(session.auth.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_persisted() {
        let temp = TempDir::new().unwrap();
        let session = Session::new(FakeAuth::new(false), token(1000)).persisted_in(temp.path());

        assert_eq!(session.valid_token().await.unwrap(), "fresh");
        assert_eq!(session.valid_token().await.unwrap(), "fresh");
        assert_eq!(session.auth.refreshes.load(Ordering::SeqCst), 1);

        let stored = credentials::load(temp.path()).unwrap().unwrap();
        assert_eq!(stored.access_token, "fresh");
    }

    #[tokio::test]
    async fn test_failed_refresh_invalidates_without_retry() {
        let temp = TempDir::new().unwrap();
        credentials::save(temp.path(), &token(1000)).unwrap();
        let session = Session::new(FakeAuth::new(true), token(1000)).persisted_in(temp.path());

        assert!(session.valid_token().await.unwrap_err().is_auth());
        assert!(session.token.lock().await.is_none());
        assert!(credentials::load(temp.path()).unwrap().is_none());

        // no second refresh attempt
        assert!(session.valid_token().await.unwrap_err().is_auth());
        assert_eq!(session.auth.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let session = Session::new(FakeAuth::new(false), token(credentials::now_secs() + 3600));
        session.invalidate().await;
        assert!(session.valid_token().await.unwrap_err().is_auth());
    }
}
