//! # Financial Planner
//!
//! Monthly cash-flow and profit-and-loss projections for a portfolio of sold
//! products over a fixed horizon.
//!
//! ## Core Concepts
//!
//! - **Template**: the financial effect of one sale of a product category, one row per
//!   month since the sale started. Built once per category and reused for every sale.
//! - **Consolidation**: every sale's template is shifted to its start month and summed
//!   into a single series indexed by absolute plan month `1..=horizon`. Anything past
//!   the horizon is dropped.
//! - **Sales plan**: the list of sales to consolidate. It can be read from a file or
//!   synthesised to meet annual revenue targets.
//! - **Reports**: net and cumulative cash flow, the funding need, gross margin, EBIT
//!   and annual rollups derived from the consolidated series.
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_planner::*;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let config = config::load_config(
//!     Path::new("data/global_config.yaml"),
//!     Path::new("data/productos_config.yaml"),
//! )?;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let plan = FinancialPlanner::generate_plan(&config, &mut rng)?;
//! let projection = FinancialPlanner::project(&config, &plan)?;
//!
//! println!("Capital needed: {:.2}", projection.cash_flow.capital_necesario);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod reporting;
pub mod sales;
pub mod schema;
pub mod seasonality;
pub mod template;
pub mod utils;

pub use engine::{consolidate, ConsolidatedSeries, FinancialModel};
pub use error::{PlannerError, Result};
pub use reporting::{
    AnnualCashFlow, AnnualPnl, CashFlowReport, CashFlowRow, PnlRow, ProfitAndLossReport,
};
pub use sales::{category_weights, generate_goal_oriented_plan};
pub use schema::*;
pub use template::{
    generate_template, ModelKind, Template, AMORTIZACION, COSTE_MANTENIMIENTO, TOTAL_GASTOS,
    TOTAL_INGRESOS, TOTAL_VENTAS,
};

use log::{debug, info};
use rand::Rng;

/// Consolidated series and derived reports for one sales plan.
#[derive(Debug, Clone)]
pub struct Projection {
    pub cash_flow_series: ConsolidatedSeries,
    pub pnl_series: ConsolidatedSeries,
    pub cash_flow: CashFlowReport,
    pub pnl: ProfitAndLossReport,
}

pub struct FinancialPlanner;

impl FinancialPlanner {
    pub fn generate_plan<R: Rng + ?Sized>(config: &PlannerConfig, rng: &mut R) -> Result<SalesPlan> {
        generate_goal_oriented_plan(
            &config.global.objetivos_anuales,
            &config.global.distribucion_mensual,
            &config.productos,
            rng,
        )
    }

    pub fn project(config: &PlannerConfig, plan: &SalesPlan) -> Result<Projection> {
        Self::project_products(&config.productos, config.global.horizonte_plan_consolidado, plan)
    }

    pub fn project_products(
        products: &ProductCatalog,
        horizon: usize,
        plan: &SalesPlan,
    ) -> Result<Projection> {
        info!(
            "Projecting {} sales across {} categories over {} months",
            plan.len(),
            products.len(),
            horizon
        );

        let cash_model = FinancialModel::cash_flow(products, horizon)?;
        let cash_flow_series = cash_model.consolidate(plan)?;
        let cash_flow = CashFlowReport::from_series(&cash_flow_series)?;

        let pnl_model = FinancialModel::profit_and_loss(products, horizon)?;
        let pnl_series = pnl_model.consolidate(plan)?;
        let pnl = ProfitAndLossReport::from_series(&pnl_series)?;

        debug!(
            "Capital need {:.2} (minimum cumulative flow {:.2} at month {})",
            cash_flow.capital_necesario, cash_flow.min_flujo_acumulado, cash_flow.mes_capital_minimo
        );

        Ok(Projection {
            cash_flow_series,
            pnl_series,
            cash_flow,
            pnl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> PlannerConfig {
        let mut productos = ProductCatalog::new();
        productos.insert(
            "Compra".to_string(),
            ProductParameters {
                valor_venta: 20_000.0,
                coste_maquina: 12_000.0,
                esquema_pagos_venta: vec![PaymentStep::new(0, 0.5), PaymentStep::new(1, 0.5)],
                esquema_pago_coste: vec![PaymentStep::new(0, 1.0)],
                mes_inicio_recurrentes: 1,
                duracion_pagos_recurrentes: 0,
                porcentaje_mantenimiento_anual: 0.1,
                meses_amortizacion: 60,
            },
        );
        productos.insert(
            "Renting".to_string(),
            ProductParameters {
                valor_venta: 30_000.0,
                coste_maquina: 15_000.0,
                esquema_pagos_venta: vec![PaymentStep::new(0, 0.1)],
                esquema_pago_coste: vec![PaymentStep::new(0, 1.0)],
                mes_inicio_recurrentes: 1,
                duracion_pagos_recurrentes: 36,
                porcentaje_mantenimiento_anual: 0.08,
                meses_amortizacion: 60,
            },
        );

        let mut global = GlobalConfig::new(48);
        global.objetivos_anuales = [(1, 200_000.0), (2, 300_000.0)].into_iter().collect();
        PlannerConfig { global, productos }
    }

    #[test]
    fn test_end_to_end_projection() {
        let config = config();
        let mut rng = StdRng::seed_from_u64(2024);
        let plan = FinancialPlanner::generate_plan(&config, &mut rng).unwrap();
        assert!(!plan.is_empty());

        let projection = FinancialPlanner::project(&config, &plan).unwrap();
        assert_eq!(projection.cash_flow.rows.len(), 48);
        assert_eq!(projection.pnl.rows.len(), 48);
        assert_eq!(projection.pnl.annual().len(), 4);

        let cumulative = projection.cash_flow.rows.last().unwrap().flujo_neto_acumulado;
        let direct: f64 = projection
            .cash_flow_series
            .months()
            .filter_map(|m| projection.cash_flow_series.row(m))
            .map(|row| row.iter().sum::<f64>())
            .sum();
        assert!((cumulative - direct).abs() < 1e-6);
        assert!(projection.cash_flow.capital_necesario >= 0.0);
    }

    #[test]
    fn test_projection_rejects_unknown_category() {
        let config = config();
        let plan: SalesPlan = vec![SaleEvent::new("Venta-001", 1, "Nope")].into_iter().collect();
        let err = FinancialPlanner::project(&config, &plan).unwrap_err();
        assert!(err.is_configuration_error());
    }
}
