//! Wire DTOs.
//!
//! The JSON surface keeps the Spanish field names the POS front ends
//! already speak (`resumen_diario`, `monto_total`, `ventas_efectivo`...).
//! Money crosses the wire as two-decimal JSON numbers; everything inside
//! the engine stays integer centavos, so conversion happens only here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verde_core::{
    CashCut, CutMonthlyTotals, DailySummary, Distribution, GlobalInvoiceBatch, Sale, SalesReport,
};

// =============================================================================
// Money Conversion
// =============================================================================

/// Centavos to a two-decimal JSON amount.
pub fn cents_to_amount(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// A JSON amount to centavos, rejecting sub-cent precision noise.
pub fn amount_to_cents(amount: f64) -> Option<i64> {
    if !amount.is_finite() {
        return None;
    }
    let scaled = amount * 100.0;
    let rounded = scaled.round();
    if (scaled - rounded).abs() > 1e-6 {
        return None;
    }
    Some(rounded as i64)
}

// =============================================================================
// Sales Report
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ProductSummaryDto {
    pub producto_id: String,
    pub nombre: String,
    pub cantidad: i64,
    pub monto_total: f64,
    pub promedio: f64,
}

#[derive(Debug, Serialize)]
pub struct DaySummaryDto {
    /// `YYYY-MM-DD`
    pub fecha: String,
    pub total_ventas: i64,
    pub monto_total: f64,
    pub venta_minima: f64,
    pub venta_maxima: f64,
    pub promedio_venta: f64,
    pub productos: Vec<ProductSummaryDto>,
}

#[derive(Debug, Serialize)]
pub struct ReportTotalsDto {
    pub total_ventas: i64,
    pub total_monto: f64,
    pub promedio_diario: f64,
    pub total_dias: i64,
    pub efectivo: f64,
    pub tarjeta: f64,
    pub transferencia: f64,
}

#[derive(Debug, Serialize)]
pub struct SalesReportDto {
    pub resumen_general: ReportTotalsDto,
    pub resumen_diario: Vec<DaySummaryDto>,
    pub distribucion: Distribution,
    #[serde(skip_serializing_if = "is_zero")]
    pub registros_omitidos: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

fn day_dto(day: &DailySummary) -> DaySummaryDto {
    DaySummaryDto {
        fecha: day.date.to_string(),
        total_ventas: day.sale_count,
        monto_total: cents_to_amount(day.total_cents),
        venta_minima: cents_to_amount(day.min_cents),
        venta_maxima: cents_to_amount(day.max_cents),
        promedio_venta: cents_to_amount(day.average_cents),
        productos: day
            .products
            .iter()
            .map(|p| ProductSummaryDto {
                producto_id: p.product_id.clone(),
                nombre: p.name.clone(),
                cantidad: p.quantity,
                monto_total: cents_to_amount(p.total_cents),
                promedio: cents_to_amount(p.average_cents),
            })
            .collect(),
    }
}

impl From<&SalesReport> for SalesReportDto {
    fn from(report: &SalesReport) -> Self {
        SalesReportDto {
            resumen_general: ReportTotalsDto {
                total_ventas: report.totals.sale_count,
                total_monto: cents_to_amount(report.totals.total_cents),
                promedio_diario: cents_to_amount(report.totals.daily_average_cents),
                total_dias: report.totals.day_count,
                efectivo: cents_to_amount(report.totals.cash_cents),
                tarjeta: cents_to_amount(report.totals.card_cents),
                transferencia: cents_to_amount(report.totals.transfer_cents),
            },
            resumen_diario: report.daily.iter().map(day_dto).collect(),
            distribucion: Distribution::from_daily(&report.daily),
            registros_omitidos: report.skipped_records,
        }
    }
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Serialize)]
pub struct SaleDto {
    pub id: String,
    pub cliente_id: Option<String>,
    pub fecha: DateTime<Utc>,
    pub total: f64,
    pub metodo_pago: verde_core::PaymentMethod,
    pub facturada: bool,
    pub factura_global_id: Option<String>,
    pub notas: Option<String>,
}

impl From<&Sale> for SaleDto {
    fn from(sale: &Sale) -> Self {
        SaleDto {
            id: sale.id.clone(),
            cliente_id: sale.client_id.clone(),
            fecha: sale.sold_at,
            total: cents_to_amount(sale.total_cents),
            metodo_pago: sale.payment_method,
            facturada: sale.invoiced,
            factura_global_id: sale.global_invoice_id.clone(),
            notas: sale.notes.clone(),
        }
    }
}

// =============================================================================
// Cash Cuts (cortes)
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct NewCorteDto {
    pub fecha: Option<DateTime<Utc>>,
    pub monto_inicial: f64,
    pub monto_final: f64,
    pub ventas_efectivo: f64,
    pub ventas_tarjeta: f64,
    pub ventas_transferencia: f64,
    #[serde(default)]
    pub retiros: f64,
    pub notas: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CorteDto {
    pub id: String,
    pub fecha: DateTime<Utc>,
    pub monto_inicial: f64,
    pub monto_final: f64,
    pub ventas_efectivo: f64,
    pub ventas_tarjeta: f64,
    pub ventas_transferencia: f64,
    pub total_ventas: f64,
    pub retiros: f64,
    pub notas: Option<String>,
}

impl From<&CashCut> for CorteDto {
    fn from(cut: &CashCut) -> Self {
        CorteDto {
            id: cut.id.clone(),
            fecha: cut.recorded_at,
            monto_inicial: cents_to_amount(cut.opening_cents),
            monto_final: cents_to_amount(cut.closing_cents),
            ventas_efectivo: cents_to_amount(cut.cash_sales_cents),
            ventas_tarjeta: cents_to_amount(cut.card_sales_cents),
            ventas_transferencia: cents_to_amount(cut.transfer_sales_cents),
            total_ventas: cents_to_amount(cut.sales_total().cents()),
            retiros: cents_to_amount(cut.withdrawals_cents),
            notas: cut.notes.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CorteTotalsDto {
    pub anio: i32,
    pub mes: u32,
    pub ventas_efectivo: f64,
    pub ventas_tarjeta: f64,
    pub ventas_transferencia: f64,
    pub total_ventas: f64,
    pub retiros: f64,
    pub total_cortes: i64,
}

impl From<&CutMonthlyTotals> for CorteTotalsDto {
    fn from(totals: &CutMonthlyTotals) -> Self {
        CorteTotalsDto {
            anio: totals.year,
            mes: totals.month,
            ventas_efectivo: cents_to_amount(totals.cash_sales_cents),
            ventas_tarjeta: cents_to_amount(totals.card_sales_cents),
            ventas_transferencia: cents_to_amount(totals.transfer_sales_cents),
            total_ventas: cents_to_amount(totals.total_sales_cents),
            retiros: cents_to_amount(totals.withdrawals_cents),
            total_cortes: totals.cut_count,
        }
    }
}

// =============================================================================
// Global Invoices
// =============================================================================

#[derive(Debug, Serialize)]
pub struct InvoiceBatchDto {
    pub id: String,
    pub fecha_inicio: String,
    pub fecha_fin: String,
    pub total_ventas: i64,
    pub subtotal: f64,
    pub iva: f64,
    pub total: f64,
    pub efectivo: f64,
    pub tarjeta: f64,
    pub transferencia: f64,
    pub cfdi_uuid: String,
    pub folio: String,
    pub fecha_emision: DateTime<Utc>,
}

impl From<&GlobalInvoiceBatch> for InvoiceBatchDto {
    fn from(batch: &GlobalInvoiceBatch) -> Self {
        InvoiceBatchDto {
            id: batch.id.clone(),
            fecha_inicio: batch.start_date.to_string(),
            fecha_fin: batch.end_date.to_string(),
            total_ventas: batch.sale_count,
            subtotal: cents_to_amount(batch.total_cents - batch.tax_cents),
            iva: cents_to_amount(batch.tax_cents),
            total: cents_to_amount(batch.total_cents),
            efectivo: cents_to_amount(batch.cash_cents),
            tarjeta: cents_to_amount(batch.card_cents),
            transferencia: cents_to_amount(batch.transfer_cents),
            cfdi_uuid: batch.cfdi_uuid.clone(),
            folio: batch.folio.clone(),
            fecha_emision: batch.created_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_round_trips() {
        assert_eq!(amount_to_cents(128.55), Some(12855));
        assert_eq!(amount_to_cents(0.0), Some(0));
        assert_eq!(amount_to_cents(1.5), Some(150));
        assert_eq!(cents_to_amount(12855), 128.55);
    }

    #[test]
    fn test_amount_rejects_garbage() {
        assert_eq!(amount_to_cents(f64::NAN), None);
        assert_eq!(amount_to_cents(f64::INFINITY), None);
        assert_eq!(amount_to_cents(1.001), None);
    }

    #[test]
    fn test_corte_dto_keys() {
        let cut = CashCut {
            id: "c1".to_string(),
            recorded_at: Utc::now(),
            opening_cents: 50000,
            closing_cents: 62000,
            cash_sales_cents: 12000,
            card_sales_cents: 3000,
            transfer_sales_cents: 0,
            withdrawals_cents: 0,
            notes: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(CorteDto::from(&cut)).unwrap();
        assert_eq!(json["monto_inicial"], 500.0);
        assert_eq!(json["ventas_efectivo"], 120.0);
        assert_eq!(json["total_ventas"], 150.0);
    }
}
