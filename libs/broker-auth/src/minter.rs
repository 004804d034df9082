use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::AuthError;

/// A minted OIDC ID token and the instant it should be treated as expired,
/// already adjusted by the minter's expiry margin.
#[derive(Debug, Clone)]
pub struct MintedToken {
    pub token: String,
    pub expires_at: std::time::Instant,
}

impl MintedToken {
    fn is_fresh(&self) -> bool {
        std::time::Instant::now() < self.expires_at
    }
}

/// External collaborator performing the actual cluster token-request call
/// (or equivalent) to mint an ID token for a service account and audience.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn mint(&self, service_account: &str, audience: &str) -> Result<MintedToken, AuthError>;
}

type CacheKey = (String, String);

/// Caches minted ID tokens keyed by `(service_account, audience)`, refreshing
/// via the configured [`TokenSource`] on miss or once the cached token's
/// margin-adjusted lifetime has elapsed.
pub struct IdTokenMinter {
    source: Arc<dyn TokenSource>,
    margin: Duration,
    cache: ArcSwap<HashMap<CacheKey, MintedToken>>,
    refresh_lock: Mutex<()>,
}

impl IdTokenMinter {
    pub fn new(source: Arc<dyn TokenSource>, margin: Duration) -> Self {
        Self {
            source,
            margin,
            cache: ArcSwap::from_pointee(HashMap::new()),
            refresh_lock: Mutex::new(()),
        }
    }

    pub async fn mint(&self, service_account: &str, audience: &str) -> Result<String, AuthError> {
        let key: CacheKey = (service_account.to_owned(), audience.to_owned());

        if let Some(cached) = self.cache.load().get(&key) {
            if cached.is_fresh() {
                return Ok(cached.token.clone());
            }
        }

        // Serialize refreshes for the same minter so a burst of cache-miss
        // callers doesn't fan out into N concurrent mint calls.
        let _guard = self.refresh_lock.lock().await;

        if let Some(cached) = self.cache.load().get(&key) {
            if cached.is_fresh() {
                return Ok(cached.token.clone());
            }
        }

        let mut minted = self.source.mint(service_account, audience).await?;
        minted.expires_at = minted.expires_at.checked_sub(self.margin).unwrap_or(minted.expires_at);

        let token = minted.token.clone();
        let mut next = (**self.cache.load()).clone();
        next.insert(key, minted);
        self.cache.store(Arc::new(next));

        Ok(token)
    }
}
