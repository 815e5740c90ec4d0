//! Global-invoice endpoints: preview/commit over a range, end-of-day
//! commit, pending sales and batch history.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::dto::{cents_to_amount, InvoiceBatchDto, SaleDto};
use crate::error::ApiError;
use crate::handlers::parse_opt_date;
use verde_core::period;
use crate::startup::AppState;
use verde_core::Period;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub start_date: String,
    pub end_date: String,
    /// When false or absent, only a preview is returned and nothing is
    /// written.
    #[serde(default)]
    pub generate: bool,
}

/// `POST /generate_global_invoice`
///
/// Dry run by default; set `"generate": true` to commit the batch.
pub async fn generate_global_invoice(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let period = Period::parse(&body.start_date, &body.end_date)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let coordinator = state.db.invoices();

    if !body.generate {
        let preview = coordinator.preview(&period).await?;
        return Ok((
            StatusCode::OK,
            Json(json!({
                "vista_previa": true,
                "fecha_inicio": period.start().to_string(),
                "fecha_fin": period.end().to_string(),
                "total_ventas": preview.sale_ids.len(),
                "subtotal": cents_to_amount(preview.total.cents() - preview.tax.cents()),
                "iva": cents_to_amount(preview.tax.cents()),
                "total": cents_to_amount(preview.total.cents()),
                "ventas": preview.sale_ids,
            })),
        ));
    }

    let committed = coordinator.commit(&period, state.issuer.as_ref()).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "factura": InvoiceBatchDto::from(&committed.batch),
            "ventas": committed.sale_ids,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct GenerateDayRequest {
    pub date: String,
}

/// `POST /global-invoice/generate` — end-of-day single-date commit.
pub async fn generate_for_day(
    State(state): State<AppState>,
    Json(body): Json<GenerateDayRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let date = period::parse_date(&body.date)
        .map_err(|_| ApiError::BadRequest("invalid date: expected YYYY-MM-DD".to_string()))?;
    let committed = state
        .db
        .invoices()
        .commit_day(date, state.issuer.as_ref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "factura": InvoiceBatchDto::from(&committed.batch),
            "ventas": committed.sale_ids,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// `GET /global-invoice/pending-sales`
pub async fn pending_sales(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Value>, ApiError> {
    let start = parse_opt_date("start_date", query.start_date.as_deref())?;
    let end = parse_opt_date("end_date", query.end_date.as_deref())?;

    let mut pending = state.db.invoices().pending().await?;
    if let Some(start) = start {
        pending.retain(|s| s.sold_on() >= start);
    }
    if let Some(end) = end {
        pending.retain(|s| s.sold_on() <= end);
    }

    let total_cents: i64 = pending.iter().map(|s| s.total_cents).sum();
    Ok(Json(json!({
        "ventas": pending.iter().map(SaleDto::from).collect::<Vec<_>>(),
        "total_ventas": pending.len(),
        "monto_total": cents_to_amount(total_cents),
    })))
}

/// `GET /global-invoice/history` — committed batches, newest first.
pub async fn history(State(state): State<AppState>) -> Result<Json<Vec<InvoiceBatchDto>>, ApiError> {
    let batches = state.db.invoices().history().await?;
    Ok(Json(batches.iter().map(InvoiceBatchDto::from).collect()))
}
