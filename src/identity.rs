//! Turning a request credential into a voter identity.
//!
//! Credentials are issued elsewhere; here they are only checked. The route
//! layer captures the raw credential into a [`RequestContext`] and hands that
//! to the admission controller explicitly.

use rocket::{
    http::Header,
    request::{FromRequest, Outcome},
    Request,
};

use crate::config::Config;
use crate::model::{
    api::auth::{AuthToken, Rights, AUTH_TOKEN_COOKIE},
    mongodb::Id,
};

/// Everything the core needs to know about the incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    credential: Option<String>,
}

impl RequestContext {
    /// A request carrying no credential at all.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A request carrying the given raw credential.
    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            credential: Some(credential.into()),
        }
    }

    /// The raw, unverified credential.
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }
}

/// Take the credential from the auth cookie, falling back to an
/// `Authorization: Bearer` header.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestContext {
    type Error = (); // No errors possible; a missing credential is not a request failure.

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        if let Some(cookie) = req.cookies().get(AUTH_TOKEN_COOKIE) {
            return Outcome::Success(Self::with_credential(cookie.value()));
        }
        let bearer = req
            .headers()
            .get_one("Authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());
        Outcome::Success(match bearer {
            Some(token) => Self::with_credential(token),
            None => Self::anonymous(),
        })
    }
}

/// Build an `Authorization` header for a token, for API clients that cannot hold cookies.
pub fn bearer_header(jwt: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {jwt}"))
}

/// Resolves a request credential to a stable voter ID.
///
/// Called synchronously; `None` means the request is unauthenticated.
pub trait IdentityVerifier: Send + Sync {
    fn resolve_identity(&self, ctx: &RequestContext) -> Option<Id>;
}

/// Verifies HS256 JWTs signed with the configured secret.
///
/// This is also the one place roles are looked at: a valid token only
/// resolves to a voter if its rights allow voting.
pub struct JwtIdentityVerifier {
    secret: Vec<u8>,
}

impl JwtIdentityVerifier {
    pub fn new(config: &Config) -> Self {
        Self {
            secret: config.jwt_secret().to_vec(),
        }
    }
}

impl IdentityVerifier for JwtIdentityVerifier {
    fn resolve_identity(&self, ctx: &RequestContext) -> Option<Id> {
        let jwt = ctx.credential()?;
        let token = match AuthToken::from_jwt(jwt, &self.secret) {
            Ok(token) => token,
            Err(e) => {
                debug!("Rejected credential: {e}");
                return None;
            }
        };
        if !token.rights.can_vote() {
            debug!("Credential for {} {} cannot vote", token.rights, token.id);
            return None;
        }
        debug_assert!(token.permits(Rights::Voter));
        Some(token.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> (JwtIdentityVerifier, Config) {
        let config = Config::example();
        (JwtIdentityVerifier::new(&config), config)
    }

    #[test]
    fn resolves_voter_token() {
        let (verifier, config) = verifier();
        let voter = Id::new();
        let jwt = AuthToken::voter(voter)
            .into_jwt(config.jwt_secret(), config.auth_ttl())
            .unwrap();

        let ctx = RequestContext::with_credential(jwt);
        assert_eq!(verifier.resolve_identity(&ctx), Some(voter));
    }

    #[test]
    fn anonymous_is_unresolved() {
        let (verifier, _) = verifier();
        assert_eq!(verifier.resolve_identity(&RequestContext::anonymous()), None);
    }

    #[test]
    fn garbage_is_unresolved() {
        let (verifier, _) = verifier();
        let ctx = RequestContext::with_credential("definitely.not.a-jwt");
        assert_eq!(verifier.resolve_identity(&ctx), None);
    }

    #[test]
    fn admin_cannot_vote() {
        let (verifier, config) = verifier();
        let jwt = AuthToken::admin(Id::new())
            .into_jwt(config.jwt_secret(), config.auth_ttl())
            .unwrap();

        let ctx = RequestContext::with_credential(jwt);
        assert_eq!(verifier.resolve_identity(&ctx), None);
    }
}
