//! Sale endpoints: capture, listing, stats, and the daily summary
//! report.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::dto::{amount_to_cents, cents_to_amount, SaleDto, SalesReportDto};
use crate::error::ApiError;
use crate::handlers::{parse_opt_date, resolve_period};
use crate::startup::AppState;
use verde_core::PaymentMethod;
use verde_db::{NewSale, NewSaleItem, SaleFilter};

// =============================================================================
// Capture
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct NewSaleItemDto {
    pub producto_id: String,
    pub nombre: String,
    pub precio_unitario: f64,
    pub cantidad: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewSaleDto {
    pub cliente_id: Option<String>,
    pub fecha: Option<DateTime<Utc>>,
    pub metodo_pago: PaymentMethod,
    pub notas: Option<String>,
    pub items: Vec<NewSaleItemDto>,
}

/// `POST /sale`
pub async fn create_sale(
    State(state): State<AppState>,
    Json(body): Json<NewSaleDto>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut items = Vec::with_capacity(body.items.len());
    for item in body.items {
        let unit_price_cents = amount_to_cents(item.precio_unitario).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "invalid precio_unitario for {}: expected a two-decimal amount",
                item.producto_id
            ))
        })?;
        items.push(NewSaleItem {
            product_id: item.producto_id,
            name: item.nombre,
            unit_price_cents,
            quantity: item.cantidad,
        });
    }

    let record = state
        .db
        .sales()
        .create(NewSale {
            client_id: body.cliente_id,
            sold_at: body.fecha,
            payment_method: body.metodo_pago,
            notes: body.notas,
            items,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "venta": SaleDto::from(&record.sale),
            "total": cents_to_amount(record.sale.total_cents),
        })),
    ))
}

// =============================================================================
// Listing & Stats
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SaleListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

/// `GET /api/sales`
pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SaleListQuery>,
) -> Result<Json<Value>, ApiError> {
    let filter = SaleFilter {
        start: parse_opt_date("start_date", query.start_date.as_deref())?,
        end: parse_opt_date("end_date", query.end_date.as_deref())?,
        min_cents: amount_filter("min_amount", query.min_amount)?,
        max_cents: amount_filter("max_amount", query.max_amount)?,
    };
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(20);

    let repo = state.db.sales();
    let sales = repo.list(&filter, page, per_page).await?;
    let total = repo.count(&filter).await?;

    Ok(Json(json!({
        "ventas": sales.iter().map(SaleDto::from).collect::<Vec<_>>(),
        "total": total,
        "page": page,
        "per_page": per_page.clamp(1, 100),
    })))
}

fn amount_filter(name: &str, amount: Option<f64>) -> Result<Option<i64>, ApiError> {
    match amount {
        None => Ok(None),
        Some(a) => amount_to_cents(a)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid {name}"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// `GET /sales/stats`
pub async fn sales_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Value>, ApiError> {
    let start = parse_opt_date("start_date", query.start_date.as_deref())?;
    let end = parse_opt_date("end_date", query.end_date.as_deref())?;

    let stats = state.db.sales().stats(start, end).await?;
    Ok(Json(json!({
        "total_ventas": stats.total_sales,
        "monto_total": cents_to_amount(stats.total_cents),
        "promedio": cents_to_amount(stats.average_cents),
        "venta_maxima": cents_to_amount(stats.max_cents),
    })))
}

/// `DELETE /sales/:id` — rejected once the sale is invoiced.
pub async fn delete_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.db.sales().delete(&id).await?;
    Ok(Json(json!({ "eliminada": id })))
}

// =============================================================================
// Daily Summary Report
// =============================================================================

/// `GET /daily_summary` — per-day aggregation plus the amount
/// distribution, defaulting to the current calendar month.
pub async fn daily_summary(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<SalesReportDto>, ApiError> {
    let period = resolve_period(query.start_date.as_deref(), query.end_date.as_deref())?;
    let records = state.db.sales().records_in_period(&period).await?;
    let report = verde_core::aggregate(&records, &period);
    Ok(Json(SalesReportDto::from(&report)))
}
