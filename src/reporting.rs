use crate::engine::ConsolidatedSeries;
use crate::error::{PlannerError, Result};
use crate::template::{
    ModelKind, AMORTIZACION, COSTE_MANTENIMIENTO, TOTAL_GASTOS, TOTAL_INGRESOS, TOTAL_VENTAS,
};
use crate::utils::plan_year;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRow {
    #[serde(rename = "Mes")]
    pub mes: usize,
    #[serde(rename = "Total Ingresos")]
    pub total_ingresos: f64,
    #[serde(rename = "Total Gastos")]
    pub total_gastos: f64,
    #[serde(rename = "Flujo Neto Mensual")]
    pub flujo_neto_mensual: f64,
    #[serde(rename = "Flujo Neto Acumulado")]
    pub flujo_neto_acumulado: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualCashFlow {
    #[serde(rename = "Año")]
    pub anio: usize,
    #[serde(rename = "Total Ingresos")]
    pub total_ingresos: f64,
    #[serde(rename = "Total Gastos")]
    pub total_gastos: f64,
    #[serde(rename = "Flujo Neto")]
    pub flujo_neto: f64,
}

/// Monthly treasury view derived from a cash-flow series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowReport {
    pub rows: Vec<CashFlowRow>,
    /// Funding needed to keep cumulative cash non-negative: `max(0, -min cumulative)`.
    pub capital_necesario: f64,
    pub min_flujo_acumulado: f64,
    /// Month where the cumulative flow bottoms out (first one on ties).
    pub mes_capital_minimo: usize,
}

impl CashFlowReport {
    pub fn from_series(series: &ConsolidatedSeries) -> Result<Self> {
        let ingresos = series_column(series, ModelKind::CashFlow, TOTAL_INGRESOS)?;
        let gastos = series_column(series, ModelKind::CashFlow, TOTAL_GASTOS)?;

        let mut rows = Vec::with_capacity(series.horizon());
        let mut acumulado = 0.0;
        let mut min_flujo_acumulado = f64::INFINITY;
        let mut mes_capital_minimo = 1;

        for (idx, (ingreso, gasto)) in ingresos.iter().zip(gastos).enumerate() {
            let neto = ingreso + gasto;
            acumulado += neto;
            if acumulado < min_flujo_acumulado {
                min_flujo_acumulado = acumulado;
                mes_capital_minimo = idx + 1;
            }
            rows.push(CashFlowRow {
                mes: idx + 1,
                total_ingresos: *ingreso,
                total_gastos: *gasto,
                flujo_neto_mensual: neto,
                flujo_neto_acumulado: acumulado,
            });
        }

        if rows.is_empty() {
            min_flujo_acumulado = 0.0;
        }

        Ok(Self {
            rows,
            capital_necesario: (-min_flujo_acumulado).max(0.0),
            min_flujo_acumulado,
            mes_capital_minimo,
        })
    }

    pub fn annual(&self) -> Vec<AnnualCashFlow> {
        let mut years: BTreeMap<usize, AnnualCashFlow> = BTreeMap::new();
        for row in &self.rows {
            let anio = plan_year(row.mes);
            let entry = years.entry(anio).or_insert_with(|| AnnualCashFlow {
                anio,
                total_ingresos: 0.0,
                total_gastos: 0.0,
                flujo_neto: 0.0,
            });
            entry.total_ingresos += row.total_ingresos;
            entry.total_gastos += row.total_gastos;
            entry.flujo_neto += row.flujo_neto_mensual;
        }
        years.into_values().collect()
    }

    pub fn final_position(&self) -> f64 {
        self.rows
            .last()
            .map(|r| r.flujo_neto_acumulado)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlRow {
    #[serde(rename = "Mes")]
    pub mes: usize,
    #[serde(rename = "Total Ventas")]
    pub total_ventas: f64,
    #[serde(rename = "Coste Mantenimiento")]
    pub coste_mantenimiento: f64,
    #[serde(rename = "Amortizacion")]
    pub amortizacion: f64,
    #[serde(rename = "Margen Bruto")]
    pub margen_bruto: f64,
    #[serde(rename = "EBIT")]
    pub ebit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualPnl {
    #[serde(rename = "Año")]
    pub anio: usize,
    #[serde(rename = "Total Ventas")]
    pub total_ventas: f64,
    #[serde(rename = "Coste Mantenimiento")]
    pub coste_mantenimiento: f64,
    #[serde(rename = "Amortizacion")]
    pub amortizacion: f64,
    #[serde(rename = "Margen Bruto")]
    pub margen_bruto: f64,
    #[serde(rename = "EBIT")]
    pub ebit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLossReport {
    pub rows: Vec<PnlRow>,
}

impl ProfitAndLossReport {
    pub fn from_series(series: &ConsolidatedSeries) -> Result<Self> {
        let ventas = series_column(series, ModelKind::ProfitAndLoss, TOTAL_VENTAS)?;
        let mantenimiento = series_column(series, ModelKind::ProfitAndLoss, COSTE_MANTENIMIENTO)?;
        let amortizacion = series_column(series, ModelKind::ProfitAndLoss, AMORTIZACION)?;

        let rows = ventas
            .iter()
            .zip(mantenimiento)
            .zip(amortizacion)
            .enumerate()
            .map(|(idx, ((venta, coste), amort))| {
                let margen_bruto = venta - coste;
                PnlRow {
                    mes: idx + 1,
                    total_ventas: *venta,
                    coste_mantenimiento: *coste,
                    amortizacion: *amort,
                    margen_bruto,
                    ebit: margen_bruto - amort,
                }
            })
            .collect();

        Ok(Self { rows })
    }

    /// Rolls months up into plan years, month `m` going to year `(m - 1) / 12 + 1`.
    pub fn annual(&self) -> Vec<AnnualPnl> {
        let mut years: BTreeMap<usize, AnnualPnl> = BTreeMap::new();
        for row in &self.rows {
            let anio = plan_year(row.mes);
            let entry = years.entry(anio).or_insert_with(|| AnnualPnl {
                anio,
                total_ventas: 0.0,
                coste_mantenimiento: 0.0,
                amortizacion: 0.0,
                margen_bruto: 0.0,
                ebit: 0.0,
            });
            entry.total_ventas += row.total_ventas;
            entry.coste_mantenimiento += row.coste_mantenimiento;
            entry.amortizacion += row.amortizacion;
            entry.margen_bruto += row.margen_bruto;
            entry.ebit += row.ebit;
        }
        years.into_values().collect()
    }
}

fn series_column<'a>(
    series: &'a ConsolidatedSeries,
    expected: ModelKind,
    name: &str,
) -> Result<&'a [f64]> {
    if series.kind() != expected {
        return Err(PlannerError::KindMismatch {
            expected: expected.name(),
            actual: series.kind().name(),
        });
    }
    series
        .column(name)
        .ok_or_else(|| PlannerError::InvalidParameter {
            category: series.kind().name().to_string(),
            details: format!("series has no column '{}'", name),
        })
}
