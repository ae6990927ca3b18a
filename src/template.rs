//! Per-category payment templates.
//!
//! A template holds the financial effect of a single sale, one row per month
//! since the sale started (row 0 is the start month). Cash flow and P&L share
//! the same builder; [`ModelKind`] selects the columns and the handful of rules
//! that differ between the two views.

use crate::schema::ProductParameters;
use crate::utils::clamp_window;
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const TOTAL_INGRESOS: &str = "Total Ingresos";
pub const TOTAL_GASTOS: &str = "Total Gastos";
pub const TOTAL_VENTAS: &str = "Total Ventas";
pub const COSTE_MANTENIMIENTO: &str = "Coste Mantenimiento";
pub const AMORTIZACION: &str = "Amortizacion";

const CASH_FLOW_COLUMNS: [&str; 2] = [TOTAL_INGRESOS, TOTAL_GASTOS];
const PROFIT_AND_LOSS_COLUMNS: [&str; 3] = [TOTAL_VENTAS, COSTE_MANTENIMIENTO, AMORTIZACION];

// Revenue sits in the first column for both kinds.
const REVENUE: usize = 0;
const CASH_EXPENSES: usize = 1;
const MAINTENANCE: usize = 1;
const DEPRECIATION: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    CashFlow,
    ProfitAndLoss,
}

impl ModelKind {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ModelKind::CashFlow => &CASH_FLOW_COLUMNS,
            ModelKind::ProfitAndLoss => &PROFIT_AND_LOSS_COLUMNS,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns().iter().position(|c| *c == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::CashFlow => "CashFlow",
            ModelKind::ProfitAndLoss => "ProfitAndLoss",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    kind: ModelKind,
    len: usize,
    // Column-major: data[column][row].
    data: Vec<Vec<f64>>,
}

impl Template {
    fn zeroed(kind: ModelKind, len: usize) -> Self {
        Self {
            kind,
            len,
            data: vec![vec![0.0; len]; kind.columns().len()],
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.kind.columns()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.kind
            .column_index(name)
            .map(|idx| self.data[idx].as_slice())
    }

    /// Value at a 0-based month offset since the sale start.
    pub fn value(&self, offset: usize, column: &str) -> Option<f64> {
        self.column(column)?.get(offset).copied()
    }

    pub(crate) fn column_at(&self, idx: usize) -> &[f64] {
        &self.data[idx]
    }

    fn add(&mut self, column: usize, row: usize, amount: f64) {
        // Offsets past the template end are clipped, not an error.
        if let Some(cell) = self.data[column].get_mut(row) {
            *cell += amount;
        }
    }

    fn add_range(&mut self, column: usize, rows: Range<usize>, amount: f64) {
        for cell in &mut self.data[column][rows] {
            *cell += amount;
        }
    }

    fn set_range(&mut self, column: usize, rows: Range<usize>, amount: f64) {
        for cell in &mut self.data[column][rows] {
            *cell = amount;
        }
    }
}

/// Builds the template of one product category.
///
/// Parameters are expected to be validated already; this function never fails.
/// Anything that would land outside `[0, horizon)` is dropped.
pub fn generate_template(params: &ProductParameters, horizon: usize, kind: ModelKind) -> Template {
    let mut template = Template::zeroed(kind, horizon);

    for step in &params.esquema_pagos_venta {
        template.add(REVENUE, step.mes_relativo, params.valor_venta * step.porcentaje);
    }

    if kind == ModelKind::CashFlow {
        for step in &params.esquema_pago_coste {
            template.add(CASH_EXPENSES, step.mes_relativo, -params.coste_maquina * step.porcentaje);
        }
    }

    let recurring = clamp_window(
        params.mes_inicio_recurrentes,
        params.duracion_pagos_recurrentes,
        horizon,
    );

    if params.duracion_pagos_recurrentes > 0 {
        let cuota = params.financed_remainder() / params.duracion_pagos_recurrentes as f64;
        template.add_range(REVENUE, recurring.clone(), cuota);
    }

    let rate = params.porcentaje_mantenimiento_anual;
    if rate > 0.0 {
        let maintenance_revenue = 2.0 * rate * params.coste_maquina / 12.0;
        let maintenance_cost = rate * params.coste_maquina / 12.0;
        template.add_range(REVENUE, recurring.clone(), maintenance_revenue);
        match kind {
            ModelKind::CashFlow => {
                template.add_range(CASH_EXPENSES, recurring, -maintenance_cost)
            }
            // P&L assigns rather than accumulates.
            ModelKind::ProfitAndLoss => {
                template.set_range(MAINTENANCE, recurring, maintenance_cost)
            }
        }
    }

    if kind == ModelKind::ProfitAndLoss && params.meses_amortizacion > 0 {
        let monthly = params.coste_maquina / params.meses_amortizacion as f64;
        let window = clamp_window(
            params.mes_inicio_recurrentes,
            params.meses_amortizacion,
            horizon,
        );
        template.set_range(DEPRECIATION, window, monthly);
    }

    template
}
