use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{errors::Error as JwtError, DecodingKey, EncodingKey, Header, Validation};
use rocket::{
    http::{Cookie, SameSite},
    time::Duration,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::model::mongodb::{hex_id, Id};

use super::rights::Rights;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token representing a specific user with specific rights.
///
/// Tokens are minted by the sign-in service; this backend only verifies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    #[serde(with = "hex_id")]
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
}

impl AuthToken {
    /// A token for the given voter.
    pub fn voter(id: Id) -> Self {
        Self {
            id,
            rights: Rights::Voter,
        }
    }

    /// A token for the given administrator.
    pub fn admin(id: Id) -> Self {
        Self {
            id,
            rights: Rights::Admin,
        }
    }

    /// Does this token permit the given rights?
    pub fn permits(&self, target: Rights) -> bool {
        self.rights == target
    }

    /// Encode this token as a signed JWT that expires after `ttl`.
    pub fn into_jwt(self, secret: &[u8], ttl: chrono::Duration) -> Result<String, JwtError> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + ttl,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
    }

    #[allow(clippy::missing_panics_doc)]
    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let token = self
            .into_jwt(config.jwt_secret(), config.auth_ttl())
            .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Decode and validate a JWT. Expired or wrongly-signed tokens are rejected.
    pub fn from_jwt(jwt: &str, secret: &[u8]) -> Result<Self, JwtError> {
        let claims = jsonwebtoken::decode::<Claims>(
            jwt,
            &DecodingKey::from_secret(secret),
            &Validation::default(),
        )?;
        Ok(claims.claims.token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"token-test-secret";

    #[test]
    fn decodes_what_it_encodes() {
        let token = AuthToken::voter(Id::new());
        let jwt = token.clone().into_jwt(SECRET, chrono::Duration::minutes(5)).unwrap();
        assert_eq!(AuthToken::from_jwt(&jwt, SECRET).unwrap(), token);
    }

    #[test]
    fn rejects_wrong_secret() {
        let jwt = AuthToken::voter(Id::new())
            .into_jwt(SECRET, chrono::Duration::minutes(5))
            .unwrap();
        assert!(AuthToken::from_jwt(&jwt, b"some-other-secret").is_err());
    }

    #[test]
    fn rejects_expired_token() {
        // Well past the default validation leeway.
        let jwt = AuthToken::voter(Id::new())
            .into_jwt(SECRET, chrono::Duration::minutes(-10))
            .unwrap();
        assert!(AuthToken::from_jwt(&jwt, SECRET).is_err());
    }
}
