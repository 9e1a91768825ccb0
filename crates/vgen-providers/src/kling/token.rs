//! Short-lived signed token cache for the Kling API.
//!
//! Kling authenticates with a self-signed HS256 JWT valid for 30 minutes.
//! The token is minted locally, cached in instance-scoped memory with its
//! issue time, and re-minted once it is within a safety margin of expiry.
//! Refresh is single-flight: the write lock is double-checked so concurrent
//! requests do not stampede the signer.

use std::time::{Duration, Instant};

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// Stated validity of a minted token.
const TOKEN_TTL: Duration = Duration::from_secs(1800);

/// Re-mint once the cached token is this close to expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(100);

/// Backdate `nbf` slightly to absorb clock skew.
const TOKEN_NBF_SKEW: i64 = 5;

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    exp: i64,
    nbf: i64,
}

struct CachedToken {
    token: String,
    issued_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.issued_at.elapsed() + TOKEN_REFRESH_MARGIN < TOKEN_TTL
    }
}

/// Instance-scoped token cache with expiry-check-then-refresh.
pub struct SignedTokenCache {
    access_key: String,
    secret_key: String,
    cache: RwLock<Option<CachedToken>>,
}

impl SignedTokenCache {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            cache: RwLock::new(None),
        }
    }

    /// Get a token that will stay valid for at least the refresh margin.
    pub async fn token(&self) -> ProviderResult<String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_fresh() {
                    return Ok(cached.token.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.token.clone());
            }
        }

        let token = self.mint()?;
        *cache = Some(CachedToken {
            token: token.clone(),
            issued_at: Instant::now(),
        });
        debug!("Minted Kling auth token, valid for {}s", TOKEN_TTL.as_secs());
        Ok(token)
    }

    fn mint(&self) -> ProviderResult<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.access_key,
            exp: now + TOKEN_TTL.as_secs() as i64,
            nbf: now - TOKEN_NBF_SKEW,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret_key.as_bytes()),
        )
        .map_err(|e| ProviderError::AuthError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    #[derive(serde::Deserialize)]
    struct DecodedClaims {
        iss: String,
        exp: i64,
        nbf: i64,
    }

    #[tokio::test]
    async fn test_minted_token_carries_expected_claims() {
        let cache = SignedTokenCache::new("ak", "sk");
        let token = cache.token().await.unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        let decoded = decode::<DecodedClaims>(
            &token,
            &DecodingKey::from_secret(b"sk"),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.iss, "ak");
        assert_eq!(decoded.claims.exp - decoded.claims.nbf, 1800 + TOKEN_NBF_SKEW);
    }

    #[tokio::test]
    async fn test_token_is_reused_while_fresh() {
        let cache = SignedTokenCache::new("ak", "sk");
        let first = cache.token().await.unwrap();
        let second = cache.token().await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_freshness_window() {
        let fresh = CachedToken {
            token: "t".into(),
            issued_at: Instant::now(),
        };
        assert!(fresh.is_fresh());

        // Older than TTL minus the margin: must re-mint
        if let Some(past) = Instant::now().checked_sub(Duration::from_secs(1750)) {
            let stale = CachedToken {
                token: "t".into(),
                issued_at: past,
            };
            assert!(!stale.is_fresh());
        }
    }
}
