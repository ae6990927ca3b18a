use crate::error::{PlannerError, Result};
use crate::schema::{ProductCatalog, SalesPlan};
use crate::template::{generate_template, ModelKind, Template};
use crate::utils::shifted_overlap;
use log::{debug, info};
use std::collections::BTreeMap;

/// Horizon-wide projection indexed by absolute plan month (1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedSeries {
    kind: ModelKind,
    horizon: usize,
    data: Vec<Vec<f64>>,
}

impl ConsolidatedSeries {
    fn zeroed(kind: ModelKind, horizon: usize) -> Self {
        Self {
            kind,
            horizon,
            data: vec![vec![0.0; horizon]; kind.columns().len()],
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.kind.columns()
    }

    pub fn months(&self) -> std::ops::RangeInclusive<usize> {
        1..=self.horizon
    }

    /// Whole column, position `i` holding month `i + 1`.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.kind
            .column_index(name)
            .map(|idx| self.data[idx].as_slice())
    }

    pub fn value(&self, month: usize, column: &str) -> Option<f64> {
        let idx = month.checked_sub(1)?;
        self.column(column)?.get(idx).copied()
    }

    /// All columns for one month, in [`ConsolidatedSeries::columns`] order.
    pub fn row(&self, month: usize) -> Option<Vec<f64>> {
        let idx = month.checked_sub(1)?;
        if idx >= self.horizon {
            return None;
        }
        Some(self.data.iter().map(|col| col[idx]).collect())
    }

    pub fn column_total(&self, name: &str) -> Option<f64> {
        self.column(name).map(|col| col.iter().sum())
    }

    fn add_shifted(&mut self, template: &Template, start_month: usize) -> bool {
        let Some(rows) = shifted_overlap(start_month, template.len(), self.horizon) else {
            return false;
        };
        let offset = rows.start;
        for (idx, column) in self.data.iter_mut().enumerate() {
            let source = &template.column_at(idx)[..rows.len()];
            for (cell, value) in column[rows.clone()].iter_mut().zip(source) {
                *cell += value;
            }
        }
        debug!(
            "Applied template rows 0..{} at months {}..={}",
            rows.len(),
            offset + 1,
            rows.end
        );
        true
    }
}

/// Superposes each sale's template, shifted to its start month, over the horizon.
///
/// Template rows past the horizon are dropped, and a sale starting after the
/// horizon contributes nothing. Summation order does not matter.
pub fn consolidate(
    plan: &SalesPlan,
    templates: &BTreeMap<String, Template>,
    horizon: usize,
) -> Result<ConsolidatedSeries> {
    if horizon == 0 {
        return Err(PlannerError::InvalidHorizon(horizon));
    }
    let kind = templates
        .values()
        .next()
        .map(Template::kind)
        .ok_or(PlannerError::EmptyProductConfig)?;

    let mut consolidated = ConsolidatedSeries::zeroed(kind, horizon);
    let mut beyond_horizon = 0usize;

    for sale in plan {
        if sale.mes_inicio == 0 {
            return Err(PlannerError::InvalidSaleMonth {
                id: sale.id.clone(),
                month: sale.mes_inicio,
            });
        }
        let template = templates
            .get(&sale.categoria)
            .ok_or_else(|| PlannerError::UnknownCategory(sale.categoria.clone()))?;
        if template.kind() != kind {
            return Err(PlannerError::KindMismatch {
                expected: kind.name(),
                actual: template.kind().name(),
            });
        }

        if sale.mes_inicio > horizon {
            beyond_horizon += 1;
            debug!(
                "Sale {} starts at month {} beyond horizon {}; skipped",
                sale.id, sale.mes_inicio, horizon
            );
            continue;
        }
        if !consolidated.add_shifted(template, sale.mes_inicio) {
            debug!(
                "Template for {} is empty; sale {} adds nothing",
                sale.categoria, sale.id
            );
        }
    }

    info!(
        "Consolidated {} sales into {:?} series over {} months ({} outside horizon)",
        plan.len(),
        kind,
        horizon,
        beyond_horizon
    );

    Ok(consolidated)
}

/// Templates for every product category, built once and reused for each consolidation.
#[derive(Debug, Clone)]
pub struct FinancialModel {
    kind: ModelKind,
    horizon: usize,
    templates: BTreeMap<String, Template>,
}

impl FinancialModel {
    pub fn new(products: &ProductCatalog, horizon: usize, kind: ModelKind) -> Result<Self> {
        if horizon == 0 {
            return Err(PlannerError::InvalidHorizon(horizon));
        }
        if products.is_empty() {
            return Err(PlannerError::EmptyProductConfig);
        }

        for (category, params) in products {
            params.validate(category)?;
        }

        let templates = products
            .iter()
            .map(|(category, params)| {
                debug!("Building {:?} template for '{}'", kind, category);
                (category.clone(), generate_template(params, horizon, kind))
            })
            .collect();

        Ok(Self {
            kind,
            horizon,
            templates,
        })
    }

    pub fn cash_flow(products: &ProductCatalog, horizon: usize) -> Result<Self> {
        Self::new(products, horizon, ModelKind::CashFlow)
    }

    pub fn profit_and_loss(products: &ProductCatalog, horizon: usize) -> Result<Self> {
        Self::new(products, horizon, ModelKind::ProfitAndLoss)
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.kind.columns()
    }

    pub fn template(&self, category: &str) -> Option<&Template> {
        self.templates.get(category)
    }

    pub fn templates(&self) -> &BTreeMap<String, Template> {
        &self.templates
    }

    pub fn consolidate(&self, plan: &SalesPlan) -> Result<ConsolidatedSeries> {
        consolidate(plan, &self.templates, self.horizon)
    }
}
