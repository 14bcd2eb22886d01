use axum::{Json, extract::State};

use super::AppState;
use super::extract::ValidJson;
use super::schemas::ClientCreate;
use crate::auth::CurrentUser;
use crate::error::Result;
use crate::models::{Client, NewClient};

/// POST /clients
pub async fn create_client(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(payload): ValidJson<ClientCreate>,
) -> Result<Json<Client>> {
    let mut session = state.store.session().await?;
    let client = session
        .create_client(NewClient {
            owner_id: user.id,
            name: payload.name,
            email: payload.email,
        })
        .await?;
    session.commit().await?;

    tracing::info!(client_id = client.id, "client created");

    Ok(Json(client))
}

/// GET /clients
pub async fn list_clients(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Client>>> {
    let mut session = state.store.session().await?;
    let clients = session.find_by_owner(user.id).await?;
    session.commit().await?;

    Ok(Json(clients))
}
