//! HS256 session tokens.
//!
//! Two kinds are issued: short-lived access tokens accepted as bearer
//! credentials, and long-lived refresh tokens that can only be exchanged
//! for a new access token.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Actor, Role, UserId};
use crate::error::ApiError;

/// Purpose of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Bearer credential for API calls.
    Access,
    /// Exchangeable for a new access token.
    Refresh,
}

/// JWT claim set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: UserId,
    /// Role at issue time.
    pub role: Role,
    /// Token purpose.
    pub kind: TokenKind,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl Claims {
    /// The authenticated actor these claims describe.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.sub,
            role: self.role,
        }
    }
}

/// Access plus refresh token, as returned by login and register.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Bearer credential.
    pub access_token: String,
    /// Token for `/auth/refresh`.
    pub refresh_token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Signs and verifies tokens with one shared HS256 secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates an issuer for `secret` with the given token lifetimes.
    #[must_use]
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Signs a token of `kind` for `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if signing fails.
    pub fn issue(&self, actor: Actor, kind: TokenKind) -> Result<String, ApiError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: actor.user_id,
            role: actor.role,
            kind,
            iat,
            exp: iat.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| ApiError::Internal(format!("token signing failed: {err}")))
    }

    /// Signs an access and a refresh token for `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if signing fails.
    pub fn issue_pair(&self, actor: Actor) -> Result<TokenPair, ApiError> {
        Ok(TokenPair {
            access_token: self.issue(actor, TokenKind::Access)?,
            refresh_token: self.issue(actor, TokenKind::Refresh)?,
            token_type: "Bearer",
            expires_in: self.access_ttl.as_secs(),
        })
    }

    /// Access token lifetime in seconds.
    #[must_use]
    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl.as_secs()
    }

    /// Verifies signature, expiry and kind.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for a malformed, forged or
    /// expired token, or one of the wrong kind.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|err| {
                tracing::debug!(error = %err, "token rejected");
                ApiError::Unauthorized("invalid or expired token".to_string())
            })?;
        if data.claims.kind != expected {
            return Err(ApiError::Unauthorized("wrong token type".to_string()));
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(
            "test-secret",
            Duration::from_secs(900),
            Duration::from_secs(3600),
        )
    }

    fn actor() -> Actor {
        Actor {
            user_id: UserId::new(),
            role: Role::EventOrganizer,
        }
    }

    #[test]
    fn access_token_round_trips() {
        let issuer = issuer();
        let actor = actor();
        let Ok(token) = issuer.issue(actor, TokenKind::Access) else {
            panic!("signing failed");
        };
        let Ok(claims) = issuer.verify(&token, TokenKind::Access) else {
            panic!("verification failed");
        };
        assert_eq!(claims.actor(), actor);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let issuer = issuer();
        let Ok(pair) = issuer.issue_pair(actor()) else {
            panic!("signing failed");
        };
        assert!(matches!(
            issuer.verify(&pair.refresh_token, TokenKind::Access),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(issuer.verify(&pair.refresh_token, TokenKind::Refresh).is_ok());
        assert_eq!(pair.expires_in, 900);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = TokenIssuer::new("other", Duration::from_secs(60), Duration::from_secs(60));
        let Ok(token) = other.issue(actor(), TokenKind::Access) else {
            panic!("signing failed");
        };
        assert!(issuer().verify(&token, TokenKind::Access).is_err());
        assert!(issuer().verify("garbage", TokenKind::Access).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let short = TokenIssuer::new("test-secret", Duration::ZERO, Duration::ZERO);
        let Ok(token) = short.issue(actor(), TokenKind::Access) else {
            panic!("signing failed");
        };
        std::thread::sleep(Duration::from_millis(1100));
        assert!(short.verify(&token, TokenKind::Access).is_err());
    }
}
