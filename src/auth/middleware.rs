//! Bearer token middleware and the extractor handlers use to read its result.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::api::AppState;
use crate::error::{Error, Result};
use crate::models::User;

/// The user a request was authenticated as
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| Error::auth("Not authenticated"))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| Error::auth("Not authenticated"))?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(Error::auth("Not authenticated"));
    }

    Ok(token.trim())
}

/// Resolve the bearer token to a stored user and attach it to the request
///
/// Rejects with 401 when the header is missing, the token does not verify,
/// or the user it names no longer exists.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let user_id = state.tokens.resolve(bearer_token(req.headers())?)?;

    let mut session = state.store.session().await?;
    let user = session
        .find_user(user_id)
        .await?
        .ok_or_else(|| Error::auth("User not found"))?;
    session.commit().await?;

    tracing::Span::current().record("user_id", user.id);
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| Error::auth("Not authenticated"))
    }
}
