//! Goal-oriented sales plan synthesis.
//!
//! Produces a sample workload for the consolidation engine: for every plan
//! year, sales are drawn at random until that year's revenue target is reached.
//! Cheaper products are drawn more often (weights are `1 / valor_venta`) and the
//! month of each sale follows the configured monthly distribution.

use crate::error::{PlannerError, Result};
use crate::schema::{ProductCatalog, SaleEvent, SalesPlan};
use crate::seasonality::normalize_monthly_distribution;
use crate::utils::{absolute_month, MONTHS_PER_YEAR};
use log::{debug, info};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::BTreeMap;

/// Sampling probability of each category, inversely proportional to its sale price.
///
/// Fails on a non-positive or non-finite price instead of producing infinite weights.
pub fn category_weights(products: &ProductCatalog) -> Result<Vec<(String, f64)>> {
    if products.is_empty() {
        return Err(PlannerError::EmptyProductConfig);
    }

    let mut inverse = Vec::with_capacity(products.len());
    for (category, params) in products {
        let price = params.valor_venta;
        if !price.is_finite() || price <= 0.0 {
            return Err(PlannerError::NonPositivePrice {
                category: category.clone(),
                price,
            });
        }
        inverse.push((category.clone(), 1.0 / price));
    }

    let total: f64 = inverse.iter().map(|(_, w)| w).sum();
    Ok(inverse
        .into_iter()
        .map(|(category, w)| (category, w / total))
        .collect())
}

pub fn sale_id(counter: usize) -> String {
    format!("Venta-{:03}", counter)
}

/// Draws sales year by year until each year's revenue reaches its target.
///
/// The sale that crosses the target is kept, so every year overshoots by at
/// most one sale. Identifiers run sequentially across the whole plan.
pub fn generate_goal_oriented_plan<R: Rng + ?Sized>(
    annual_targets: &BTreeMap<usize, f64>,
    monthly_distribution: &[f64],
    products: &ProductCatalog,
    rng: &mut R,
) -> Result<SalesPlan> {
    let month_weights = normalize_monthly_distribution(monthly_distribution)?;
    let month_dist = WeightedIndex::new(&month_weights)
        .map_err(|e| PlannerError::InvalidMonthlyDistribution(e.to_string()))?;

    let weights = category_weights(products)?;
    let prices: Vec<f64> = products.values().map(|p| p.valor_venta).collect();
    let category_dist = WeightedIndex::new(weights.iter().map(|(_, w)| *w)).map_err(|e| {
        PlannerError::InvalidParameter {
            category: "*".to_string(),
            details: format!("category weights are unusable: {}", e),
        }
    })?;

    for (year, target) in annual_targets {
        if *year == 0 {
            return Err(PlannerError::InvalidTarget {
                year: *year,
                details: "plan years are 1-based".to_string(),
            });
        }
        if !target.is_finite() {
            return Err(PlannerError::InvalidTarget {
                year: *year,
                details: format!("target must be finite, got {}", target),
            });
        }
        if absolute_month(*year, MONTHS_PER_YEAR).is_none() {
            return Err(PlannerError::InvalidTarget {
                year: *year,
                details: "year is too large to map onto plan months".to_string(),
            });
        }
    }

    let mut plan = SalesPlan::default();
    let mut sale_counter = 1usize;

    for (&year, &target) in annual_targets {
        let mut revenue = 0.0;
        let mut year_sales = 0usize;

        while revenue < target {
            let pick = category_dist.sample(rng);
            let (category, _) = &weights[pick];
            let month = month_dist.sample(rng) + 1;
            let start =
                absolute_month(year, month).ok_or_else(|| PlannerError::InvalidTarget {
                    year,
                    details: format!("month {} of year {} overflows the plan", month, year),
                })?;

            plan.push(SaleEvent::new(sale_id(sale_counter), start, category.clone()));
            revenue += prices[pick];
            sale_counter += 1;
            year_sales += 1;
        }

        debug!(
            "Year {}: {} sales, revenue {:.2} against target {:.2}",
            year, year_sales, revenue, target
        );
    }

    info!(
        "Generated sales plan with {} sales over {} years",
        plan.len(),
        annual_targets.len()
    );

    Ok(plan)
}
