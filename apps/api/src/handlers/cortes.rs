//! Cash-cut endpoints (cortes de caja).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::dto::{amount_to_cents, CorteDto, CorteTotalsDto, NewCorteDto};
use crate::error::ApiError;
use crate::handlers::parse_opt_date;
use crate::startup::AppState;
use verde_core::Period;
use verde_db::NewCashCut;

#[derive(Debug, Deserialize)]
pub struct CorteListQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// `GET /api/cortes` — newest first, optionally limited to a range.
pub async fn list_cortes(
    State(state): State<AppState>,
    Query(query): Query<CorteListQuery>,
) -> Result<Json<Vec<CorteDto>>, ApiError> {
    let start = parse_opt_date("start_date", query.start_date.as_deref())?;
    let end = parse_opt_date("end_date", query.end_date.as_deref())?;
    let period = match (start, end) {
        (Some(s), Some(e)) => {
            Some(Period::new(s, e).map_err(|e| ApiError::BadRequest(e.to_string()))?)
        }
        (Some(s), None) => Some(Period::single_day(s)),
        (None, Some(_)) => {
            return Err(ApiError::BadRequest("end_date requires start_date".to_string()))
        }
        (None, None) => None,
    };

    let cuts = state.db.cuts().list(period.as_ref()).await?;
    Ok(Json(cuts.iter().map(CorteDto::from).collect()))
}

/// `POST /api/cortes`
pub async fn create_corte(
    State(state): State<AppState>,
    Json(body): Json<NewCorteDto>,
) -> Result<(StatusCode, Json<CorteDto>), ApiError> {
    let cents = |name: &str, amount: f64| {
        amount_to_cents(amount).ok_or_else(|| ApiError::BadRequest(format!("invalid {name}")))
    };

    let cut = state
        .db
        .cuts()
        .create(NewCashCut {
            recorded_at: body.fecha,
            opening_cents: cents("monto_inicial", body.monto_inicial)?,
            closing_cents: cents("monto_final", body.monto_final)?,
            cash_sales_cents: cents("ventas_efectivo", body.ventas_efectivo)?,
            card_sales_cents: cents("ventas_tarjeta", body.ventas_tarjeta)?,
            transfer_sales_cents: cents("ventas_transferencia", body.ventas_transferencia)?,
            withdrawals_cents: cents("retiros", body.retiros)?,
            notes: body.notas,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CorteDto::from(&cut))))
}

/// `GET /api/cortes/:id`
pub async fn get_corte(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CorteDto>, ApiError> {
    let cut = state
        .db
        .cuts()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("CashCut".to_string(), id))?;
    Ok(Json(CorteDto::from(&cut)))
}

/// `GET /api/cortes/totales/:year/:month`
pub async fn monthly_totals(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<CorteTotalsDto>, ApiError> {
    if !(1..=12).contains(&month) {
        return Err(ApiError::BadRequest(format!("invalid month: {month}")));
    }
    let totals = state.db.cuts().monthly_totals(year, month).await?;
    Ok(Json(CorteTotalsDto::from(&totals)))
}
