//! Billing client endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::startup::AppState;
use verde_core::Client;
use verde_db::ClientInput;

#[derive(Debug, Deserialize)]
pub struct ClientBody {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub rfc: String,
    pub fiscal_regime: Option<String>,
    pub postal_code: Option<String>,
    pub cfdi_use: Option<String>,
}

impl From<ClientBody> for ClientInput {
    fn from(body: ClientBody) -> Self {
        ClientInput {
            name: body.name,
            email: body.email,
            phone: body.phone,
            rfc: body.rfc,
            fiscal_regime: body.fiscal_regime,
            postal_code: body.postal_code,
            cfdi_use: body.cfdi_use,
        }
    }
}

/// `GET /api/clients` — generic-public first, then alphabetical.
pub async fn list_clients(State(state): State<AppState>) -> Result<Json<Vec<Client>>, ApiError> {
    Ok(Json(state.db.clients().list().await?))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<i64>,
}

/// `GET /api/clients/search?q=...`
pub async fn search_clients(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Client>>, ApiError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    Ok(Json(state.db.clients().search(&query.q, limit).await?))
}

/// `POST /api/clients`
pub async fn create_client(
    State(state): State<AppState>,
    Json(body): Json<ClientBody>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = state.db.clients().create(body.into()).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// `GET /api/clients/:id`
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Client>, ApiError> {
    let client = state
        .db
        .clients()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Client".to_string(), id))?;
    Ok(Json(client))
}

/// `PUT /api/clients/:id` — the generic-public client is read-only.
pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ClientBody>,
) -> Result<Json<Client>, ApiError> {
    Ok(Json(state.db.clients().update(&id, body.into()).await?))
}

/// `DELETE /api/clients/:id`
pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.db.clients().delete(&id).await?;
    Ok(Json(json!({ "eliminado": id })))
}
