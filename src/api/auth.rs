//! Signup and login.

use axum::{Json, extract::State};

use super::AppState;
use super::extract::{ValidForm, ValidJson};
use super::schemas::{LoginForm, SignupRequest, TokenResponse};
use crate::auth::password::MAX_PASSWORD_BYTES;
use crate::db::StoreError;
use crate::error::{Error, Result};
use crate::models::NewUser;

const EMAIL_IN_USE: &str = "Email already in use";

/// POST /auth/signup
///
/// Registers the user and logs them in straight away.
pub async fn signup(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<SignupRequest>,
) -> Result<Json<TokenResponse>> {
    let email = payload.email.trim().to_lowercase();

    let mut session = state.store.session().await?;

    if session.find_user_by_email(&email).await?.is_some() {
        return Err(Error::validation(EMAIL_IN_USE));
    }

    if payload.password.len() > MAX_PASSWORD_BYTES {
        return Err(Error::validation("Password too long (max 72 characters)"));
    }

    let password_hash = state.hasher.hash_blocking(payload.password).await?;

    let user = session
        .create_user(NewUser {
            email,
            password_hash,
        })
        .await
        .map_err(|err| match err {
            // Lost a race with a concurrent signup for the same address
            StoreError::DuplicateEmail => Error::validation(EMAIL_IN_USE),
            other => Error::Store(other),
        })?;
    session.commit().await?;

    tracing::info!(user_id = user.id, "user registered");

    Ok(Json(TokenResponse::bearer(state.tokens.issue(user.id)?)))
}

/// POST /auth/login
///
/// Takes a form with `username` (the email) and `password`.
pub async fn login(
    State(state): State<AppState>,
    ValidForm(form): ValidForm<LoginForm>,
) -> Result<Json<TokenResponse>> {
    let email = form.username.trim().to_lowercase();

    let mut session = state.store.session().await?;
    let user = session.find_user_by_email(&email).await?;
    session.commit().await?;

    let Some(user) = user else {
        return Err(Error::validation("Invalid credentials"));
    };

    let verified = state
        .hasher
        .verify_blocking(form.password, user.password_hash.clone())
        .await?;
    if !verified {
        tracing::debug!(user_id = user.id, "password mismatch");
        return Err(Error::validation("Invalid credentials"));
    }

    Ok(Json(TokenResponse::bearer(state.tokens.issue(user.id)?)))
}
