//! Signed, time-limited bearer tokens

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and resolves HS256 access tokens
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.secret_key,
            Duration::minutes(config.access_token_minutes),
        )
    }

    /// Issue a token for `user_id` expiring one lifetime from now
    pub fn issue(&self, user_id: i32) -> Result<String> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, user_id: i32, now: DateTime<Utc>) -> Result<String> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| Error::Internal("token expiry out of range".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("failed to sign token: {e}")))
    }

    /// Resolve a token to the user id it was issued for
    pub fn resolve(&self, token: &str) -> Result<i32> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            Error::auth("Invalid token")
        })?;

        data.claims
            .sub
            .parse::<i32>()
            .map_err(|_| Error::auth("Invalid token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::days(7))
    }

    #[test]
    fn issued_token_resolves_to_its_user() {
        let tokens = service();
        let token = tokens.issue(42).unwrap();
        assert_eq!(tokens.resolve(&token).unwrap(), 42);
    }

    #[test]
    fn expiry_is_one_lifetime_out() {
        let tokens = service();
        let now = Utc::now();
        let token = tokens.issue_at(7, now).unwrap();

        let data = decode::<Claims>(&token, &tokens.decoding_key, &tokens.validation).unwrap();
        assert_eq!(data.claims.exp - data.claims.iat, 7 * 24 * 60 * 60);
        assert_eq!(data.claims.sub, "7");
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let token = tokens
            .issue_at(42, Utc::now() - Duration::days(8))
            .unwrap();

        assert!(matches!(tokens.resolve(&token), Err(Error::Auth(_))));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let tokens = service();
        let token = tokens.issue(42).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let forged = encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                sub: "1".to_string(),
                iat: 0,
                exp: Utc::now().timestamp() + 3600,
            },
            &EncodingKey::from_secret(b"other-secret"),
        )
        .unwrap();
        // Splice a foreign payload under the genuine signature
        parts[1] = forged.split('.').nth(1).unwrap().to_string();
        let tampered = parts.join(".");

        assert!(matches!(tokens.resolve(&tampered), Err(Error::Auth(_))));
    }

    #[test]
    fn token_signed_with_another_key_is_rejected() {
        let other = TokenService::new("other-secret", Duration::days(7));
        let token = other.issue(42).unwrap();

        assert!(service().resolve(&token).is_err());
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let tokens = service();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                sub: "alice".to_string(),
                iat: 0,
                exp: Utc::now().timestamp() + 3600,
            },
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(tokens.resolve(&token), Err(Error::Auth(_))));
    }

    #[test]
    fn unrepresentable_expiry_is_an_error() {
        let tokens = TokenService::new("test-secret", Duration::days(365 * 300_000));
        assert!(matches!(tokens.issue(42), Err(Error::Internal(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(service().resolve("not.a.token").is_err());
        assert!(service().resolve("").is_err());
    }
}
