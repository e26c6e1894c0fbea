//! Per-provider access credential cache.
//!
//! Holds the current access token for one provider and refreshes it lazily.
//! Refreshes are single-flight: the session mutex is held across the token
//! exchange, so callers that arrive while a refresh is running wait for it
//! and then reuse the token it produced.

use crate::error::{AuthError, Result};
use crate::oauth::TokenRefresher;
use crate::types::{AccessToken, ProviderKind, ProviderSession};
use async_trait::async_trait;
use bridge_traits::time::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Tokens expiring within this window are refreshed before use.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound on one refresh exchange, retries included.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can hand out a currently valid bearer token.
///
/// Provider connectors depend on this seam rather than on the cache itself.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// A token that is valid right now.
    async fn access_token(&self) -> Result<String>;

    /// Drop the cached token, e.g. after the provider answered 401.
    async fn invalidate(&self);
}

pub struct CredentialCache {
    provider: ProviderKind,
    refresher: Arc<dyn TokenRefresher>,
    clock: Arc<dyn Clock>,
    safety_margin: Duration,
    refresh_timeout: Duration,
    session: Mutex<ProviderSession>,
}

impl CredentialCache {
    pub fn new(refresher: Arc<dyn TokenRefresher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider: refresher.provider(),
            refresher,
            clock,
            safety_margin: DEFAULT_SAFETY_MARGIN,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            session: Mutex::new(ProviderSession::default()),
        }
    }

    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    pub fn with_refresh_timeout(mut self, refresh_timeout: Duration) -> Self {
        self.refresh_timeout = refresh_timeout;
        self
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    fn margin(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.safety_margin).unwrap_or_else(|_| chrono::Duration::zero())
    }

    fn unavailable(&self, reason: impl Into<String>) -> AuthError {
        AuthError::CredentialUnavailable {
            provider: self.provider.as_str().to_string(),
            reason: reason.into(),
        }
    }

    /// Return a usable access token, refreshing first when the cached one is
    /// missing or inside the safety margin.
    ///
    /// # Errors
    ///
    /// [`AuthError::CredentialUnavailable`] when the refresh fails, times
    /// out or reports an unusable lifetime. The session is left empty in
    /// that case.
    #[instrument(skip(self), fields(provider = %self.provider.as_str()))]
    pub async fn get_valid_token(&self) -> Result<String> {
        // Held across the refresh below
        let mut session = self.session.lock().await;

        let now = self.clock.now();
        if let Some(token) = session.usable_token(now, self.margin()) {
            debug!("Cached access token is valid");
            return Ok(token.to_string());
        }

        info!("Access token missing or expiring, refreshing");

        let grant = match timeout(self.refresh_timeout, self.refresher.refresh()).await {
            Ok(Ok(grant)) => grant,
            Ok(Err(e)) => {
                warn!(error = %e, "Token refresh failed");
                session.clear();
                return Err(self.unavailable(e.to_string()));
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.refresh_timeout.as_millis() as u64,
                    "Token refresh timed out"
                );
                session.clear();
                return Err(self.unavailable(
                    AuthError::OperationTimeout {
                        operation: "token refresh".to_string(),
                    }
                    .to_string(),
                ));
            }
        };

        let issued_at = self.clock.now();
        let Some(token) = AccessToken::issued_at(grant.access_token, issued_at, grant.expires_in)
        else {
            warn!(expires_in = grant.expires_in, "Token endpoint reported an invalid lifetime");
            session.clear();
            return Err(self.unavailable(format!(
                "invalid token lifetime: {} seconds",
                grant.expires_in
            )));
        };
        let value = token.token.clone();
        session.store(token, issued_at);

        debug!(
            refresh_count = session.refresh_count,
            expires_in = grant.expires_in,
            "Stored refreshed access token"
        );

        Ok(value)
    }

    /// Forget the cached token.
    pub async fn invalidate(&self) {
        let mut session = self.session.lock().await;
        if session.access_token.is_some() {
            debug!(provider = %self.provider.as_str(), "Invalidating cached access token");
        }
        session.clear();
    }

    /// Copy of the current session state.
    pub async fn session(&self) -> ProviderSession {
        self.session.lock().await.clone()
    }
}

#[async_trait]
impl AccessTokenProvider for CredentialCache {
    async fn access_token(&self) -> Result<String> {
        self.get_valid_token().await
    }

    async fn invalidate(&self) {
        CredentialCache::invalidate(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::TokenGrant;
    use bridge_traits::time::FixedClock;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts refreshes and hands out `token-N`.
    struct CountingRefresher {
        calls: AtomicUsize,
        expires_in: i64,
        delay: Duration,
        fail: bool,
    }

    impl CountingRefresher {
        fn new(expires_in: i64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                expires_in,
                delay: Duration::ZERO,
                fail: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        fn provider(&self) -> ProviderKind {
            ProviderKind::Spotify
        }

        async fn refresh(&self) -> Result<TokenGrant> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(AuthError::TokenRefreshFailed(
                    "Token endpoint returned 400".to_string(),
                ));
            }
            Ok(TokenGrant {
                access_token: format!("token-{}", n),
                expires_in: self.expires_in,
            })
        }
    }

    fn cache_with(refresher: Arc<CountingRefresher>, clock: Arc<FixedClock>) -> CredentialCache {
        CredentialCache::new(refresher, clock)
    }

    #[tokio::test]
    async fn test_first_call_refreshes() {
        let refresher = Arc::new(CountingRefresher::new(3600));
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let cache = cache_with(refresher.clone(), clock);

        assert_eq!(cache.get_valid_token().await.unwrap(), "token-1");
        assert_eq!(refresher.calls(), 1);
        assert_eq!(cache.provider(), ProviderKind::Spotify);
    }

    #[tokio::test]
    async fn test_valid_token_is_reused_without_refresh() {
        let refresher = Arc::new(CountingRefresher::new(3600));
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let cache = cache_with(refresher.clone(), clock.clone());

        cache.get_valid_token().await.unwrap();
        clock.advance(chrono::Duration::minutes(30));

        assert_eq!(cache.get_valid_token().await.unwrap(), "token-1");
        assert_eq!(cache.get_valid_token().await.unwrap(), "token-1");
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn test_token_inside_safety_margin_is_refreshed() {
        let refresher = Arc::new(CountingRefresher::new(3600));
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let cache = cache_with(refresher.clone(), clock.clone());

        cache.get_valid_token().await.unwrap();
        // 3541s in: 59s left, inside the 60s margin
        clock.advance(chrono::Duration::seconds(3541));

        assert_eq!(cache.get_valid_token().await.unwrap(), "token-2");
        assert_eq!(refresher.calls(), 2);
        assert_eq!(cache.session().await.refresh_count, 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let refresher = Arc::new(CountingRefresher {
            delay: Duration::from_millis(50),
            ..CountingRefresher::new(3600)
        });
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let cache = Arc::new(cache_with(refresher.clone(), clock));

        let callers = (0..8).map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get_valid_token().await })
        });
        let results = futures::future::join_all(callers).await;

        for result in results {
            assert_eq!(result.unwrap().unwrap(), "token-1");
        }
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_credential_unavailable() {
        let refresher = Arc::new(CountingRefresher {
            fail: true,
            ..CountingRefresher::new(3600)
        });
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let cache = cache_with(refresher.clone(), clock);

        let result = cache.get_valid_token().await;
        match result {
            Err(AuthError::CredentialUnavailable { provider, reason }) => {
                assert_eq!(provider, "spotify");
                assert!(reason.contains("400"));
            }
            other => panic!("expected CredentialUnavailable, got {:?}", other),
        }
        assert!(cache.session().await.access_token.is_none());
    }

    #[tokio::test]
    async fn test_refresh_timeout_is_credential_unavailable() {
        let refresher = Arc::new(CountingRefresher {
            delay: Duration::from_millis(200),
            ..CountingRefresher::new(3600)
        });
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let cache =
            cache_with(refresher, clock).with_refresh_timeout(Duration::from_millis(20));

        let result = cache.get_valid_token().await;
        assert!(matches!(
            result,
            Err(AuthError::CredentialUnavailable { ref reason, .. }) if reason.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_is_credential_unavailable() {
        let refresher = Arc::new(CountingRefresher::new(i64::MAX));
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let cache = cache_with(refresher.clone(), clock);

        let result = cache.get_valid_token().await;
        assert!(matches!(
            result,
            Err(AuthError::CredentialUnavailable { ref reason, .. }) if reason.contains("lifetime")
        ));
        assert!(cache.session().await.access_token.is_none());

        // Later calls refresh again.
        assert!(cache.get_valid_token().await.is_err());
        assert_eq!(refresher.calls(), 2);
    }

    #[tokio::test]
    async fn test_non_positive_lifetime_is_credential_unavailable() {
        let refresher = Arc::new(CountingRefresher::new(0));
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let cache = cache_with(refresher, clock);

        assert!(matches!(
            cache.get_valid_token().await,
            Err(AuthError::CredentialUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let refresher = Arc::new(CountingRefresher::new(3600));
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let cache = cache_with(refresher.clone(), clock);

        cache.get_valid_token().await.unwrap();
        AccessTokenProvider::invalidate(&cache).await;

        assert_eq!(cache.access_token().await.unwrap(), "token-2");
        assert_eq!(refresher.calls(), 2);
    }

    #[tokio::test]
    async fn test_custom_safety_margin() {
        let refresher = Arc::new(CountingRefresher::new(600));
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let cache = cache_with(refresher.clone(), clock.clone())
            .with_safety_margin(Duration::from_secs(300));

        cache.get_valid_token().await.unwrap();
        clock.advance(chrono::Duration::seconds(301));

        cache.get_valid_token().await.unwrap();
        assert_eq!(refresher.calls(), 2);
    }
}
