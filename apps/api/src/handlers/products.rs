//! Product catalog endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::dto::amount_to_cents;
use crate::error::ApiError;
use crate::startup::AppState;
use verde_core::Product;
use verde_db::ProductInput;

#[derive(Debug, Deserialize)]
pub struct ProductBody {
    pub name: String,
    pub sku: Option<String>,
    /// Two-decimal amount; stored as centavos.
    pub price: f64,
    #[serde(default)]
    pub track_stock: bool,
    #[serde(default)]
    pub stock: i64,
}

impl ProductBody {
    fn into_input(self) -> Result<ProductInput, ApiError> {
        let price_cents = amount_to_cents(self.price)
            .ok_or_else(|| ApiError::BadRequest("invalid price".to_string()))?;
        Ok(ProductInput {
            name: self.name,
            sku: self.sku,
            price_cents,
            track_stock: self.track_stock,
            stock: self.stock,
        })
    }
}

/// `GET /api/products`
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.db.products().list().await?))
}

/// `POST /api/products`
pub async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<ProductBody>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.db.products().create(body.into_input()?).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /api/products/:id`
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product".to_string(), id))?;
    Ok(Json(product))
}

/// `PUT /api/products/:id`
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ProductBody>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.db.products().update(&id, body.into_input()?).await?))
}

/// `DELETE /api/products/:id`
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.db.products().delete(&id).await?;
    Ok(Json(json!({ "eliminado": id })))
}
