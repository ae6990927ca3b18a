use crate::error::{PlannerError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Product configuration keyed by category name.
pub type ProductCatalog = BTreeMap<String, ProductParameters>;

/// Tolerance applied when checking that the sale payment schedule does not exceed 100%.
pub const PAYMENT_SUM_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PaymentStep {
    #[schemars(description = "Month offset from the sale start (0 = the month the sale starts).")]
    pub mes_relativo: usize,

    #[schemars(description = "Fraction of the amount paid in that month, between 0.0 and 1.0.")]
    pub porcentaje: f64,
}

impl PaymentStep {
    pub fn new(mes_relativo: usize, porcentaje: f64) -> Self {
        Self {
            mes_relativo,
            porcentaje,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProductParameters {
    #[schemars(description = "Sale price of one unit. Must be strictly positive.")]
    pub valor_venta: f64,

    #[schemars(description = "Unit cost of the machine. Paid per esquema_pago_coste and depreciated over meses_amortizacion.")]
    pub coste_maquina: f64,

    #[serde(default)]
    #[schemars(
        description = "Lump-sum payments of the sale price. The unpaid remainder is financed through recurring payments."
    )]
    pub esquema_pagos_venta: Vec<PaymentStep>,

    #[serde(default)]
    #[schemars(description = "Payment schedule of the unit cost (cash flow only).")]
    pub esquema_pago_coste: Vec<PaymentStep>,

    #[schemars(description = "Month offset where recurring revenue, maintenance and depreciation start.")]
    pub mes_inicio_recurrentes: usize,

    #[schemars(
        description = "Number of months the recurring payments last. 0 means no recurring payments and any unpaid remainder is not recognised."
    )]
    pub duracion_pagos_recurrentes: usize,

    #[serde(default)]
    #[schemars(description = "Annual maintenance rate over the unit cost, applied monthly during the recurring window.")]
    pub porcentaje_mantenimiento_anual: f64,

    #[serde(default)]
    #[schemars(description = "Months over which the unit cost is linearly depreciated (P&L only). 0 disables depreciation.")]
    pub meses_amortizacion: usize,
}

impl ProductParameters {
    /// Fraction of the sale price covered by the lump-sum schedule.
    pub fn paid_fraction(&self) -> f64 {
        self.esquema_pagos_venta.iter().map(|p| p.porcentaje).sum()
    }

    /// Amount left to be financed through recurring payments.
    pub fn financed_remainder(&self) -> f64 {
        self.valor_venta * (1.0 - self.paid_fraction())
    }

    pub fn validate(&self, category: &str) -> Result<()> {
        if !self.valor_venta.is_finite() {
            return Err(invalid(category, format!("valor_venta must be finite, got {}", self.valor_venta)));
        }
        if self.valor_venta <= 0.0 {
            return Err(PlannerError::NonPositivePrice {
                category: category.to_string(),
                price: self.valor_venta,
            });
        }

        if !self.coste_maquina.is_finite() || self.coste_maquina < 0.0 {
            return Err(invalid(
                category,
                format!("coste_maquina must be a finite non-negative amount, got {}", self.coste_maquina),
            ));
        }

        if !self.porcentaje_mantenimiento_anual.is_finite() || self.porcentaje_mantenimiento_anual < 0.0 {
            return Err(invalid(
                category,
                format!(
                    "porcentaje_mantenimiento_anual must be non-negative, got {}",
                    self.porcentaje_mantenimiento_anual
                ),
            ));
        }

        validate_schedule(category, "esquema_pagos_venta", &self.esquema_pagos_venta)?;
        validate_schedule(category, "esquema_pago_coste", &self.esquema_pago_coste)?;

        let paid = self.paid_fraction();
        if paid > 1.0 + PAYMENT_SUM_TOLERANCE {
            return Err(invalid(
                category,
                format!("esquema_pagos_venta sums to {} (must not exceed 1.0)", paid),
            ));
        }

        Ok(())
    }
}

fn validate_schedule(category: &str, field: &str, schedule: &[PaymentStep]) -> Result<()> {
    for (idx, step) in schedule.iter().enumerate() {
        if !step.porcentaje.is_finite() || !(0.0..=1.0).contains(&step.porcentaje) {
            return Err(invalid(
                category,
                format!(
                    "{} entry #{} has porcentaje {} outside [0, 1]",
                    field, idx, step.porcentaje
                ),
            ));
        }
    }
    Ok(())
}

fn invalid(category: &str, details: String) -> PlannerError {
    PlannerError::InvalidParameter {
        category: category.to_string(),
        details,
    }
}

/// Loosely typed mirror of [`ProductParameters`] as it appears in the products file.
///
/// Every field is optional so that a missing key is reported with the category
/// and field name instead of a bare parser location.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductParametersInput {
    pub valor_venta: Option<f64>,
    pub coste_maquina: Option<f64>,
    pub esquema_pagos_venta: Option<Vec<PaymentStepInput>>,
    pub esquema_pago_coste: Option<Vec<PaymentStepInput>>,
    pub mes_inicio_recurrentes: Option<i64>,
    pub duracion_pagos_recurrentes: Option<i64>,
    pub porcentaje_mantenimiento_anual: Option<f64>,
    pub meses_amortizacion: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentStepInput {
    pub mes_relativo: Option<i64>,
    pub porcentaje: Option<f64>,
}

impl ProductParametersInput {
    pub fn into_parameters(self, category: &str) -> Result<ProductParameters> {
        let params = ProductParameters {
            valor_venta: required(self.valor_venta, category, "valor_venta")?,
            coste_maquina: required(self.coste_maquina, category, "coste_maquina")?,
            esquema_pagos_venta: convert_schedule(
                self.esquema_pagos_venta,
                category,
                "esquema_pagos_venta",
            )?,
            esquema_pago_coste: convert_schedule(
                self.esquema_pago_coste,
                category,
                "esquema_pago_coste",
            )?,
            mes_inicio_recurrentes: non_negative(
                required(self.mes_inicio_recurrentes, category, "mes_inicio_recurrentes")?,
                category,
                "mes_inicio_recurrentes",
            )?,
            duracion_pagos_recurrentes: non_negative(
                required(
                    self.duracion_pagos_recurrentes,
                    category,
                    "duracion_pagos_recurrentes",
                )?,
                category,
                "duracion_pagos_recurrentes",
            )?,
            porcentaje_mantenimiento_anual: self.porcentaje_mantenimiento_anual.unwrap_or(0.0),
            meses_amortizacion: non_negative(
                self.meses_amortizacion.unwrap_or(0),
                category,
                "meses_amortizacion",
            )?,
        };

        params.validate(category)?;
        Ok(params)
    }
}

fn convert_schedule(
    steps: Option<Vec<PaymentStepInput>>,
    category: &str,
    field: &str,
) -> Result<Vec<PaymentStep>> {
    steps
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(idx, step)| {
            let label = format!("{}[{}].mes_relativo", field, idx);
            let mes = non_negative(required(step.mes_relativo, category, &label)?, category, &label)?;
            let porcentaje = required(
                step.porcentaje,
                category,
                &format!("{}[{}].porcentaje", field, idx),
            )?;
            Ok(PaymentStep::new(mes, porcentaje))
        })
        .collect()
}

fn required<T>(value: Option<T>, category: &str, field: &str) -> Result<T> {
    value.ok_or_else(|| PlannerError::MissingParameter {
        category: category.to_string(),
        field: field.to_string(),
    })
}

fn non_negative(value: i64, category: &str, field: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        invalid(
            category,
            format!("{} must be a non-negative month count, got {}", field, value),
        )
    })
}

/// Converts a raw products document into a validated catalog.
pub fn catalog_from_input(raw: BTreeMap<String, ProductParametersInput>) -> Result<ProductCatalog> {
    if raw.is_empty() {
        return Err(PlannerError::EmptyProductConfig);
    }

    raw.into_iter()
        .map(|(category, input)| {
            let params = input.into_parameters(&category)?;
            Ok((category, params))
        })
        .collect()
}

fn default_annual_targets() -> BTreeMap<usize, f64> {
    BTreeMap::from([
        (1, 750_000.0),
        (2, 1_200_000.0),
        (3, 2_100_000.0),
        (4, 3_000_000.0),
    ])
}

fn default_monthly_distribution() -> Vec<f64> {
    vec![1.0, 1.0, 1.5, 1.0, 1.0, 1.5, 1.0, 1.0, 1.5, 1.0, 1.0, 2.0]
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GlobalConfig {
    #[schemars(description = "Number of months covered by the consolidated projection.")]
    pub horizonte_plan_consolidado: usize,

    #[serde(default = "default_annual_targets")]
    #[schemars(description = "Revenue target per plan year (1-based). Used by the sales plan generator.")]
    pub objetivos_anuales: BTreeMap<usize, f64>,

    #[serde(default = "default_monthly_distribution")]
    #[schemars(description = "Twelve non-negative relative weights for the month a sale lands in.")]
    pub distribucion_mensual: Vec<f64>,

    #[serde(default)]
    #[schemars(description = "Seed for the sales plan generator. Omit for a different plan on every run.")]
    pub semilla: Option<u64>,

    #[serde(default)]
    #[schemars(description = "Calendar date of plan month 1 (YYYY-MM-DD). Only used to label exported months.")]
    pub fecha_inicio: Option<NaiveDate>,
}

impl GlobalConfig {
    pub fn new(horizonte_plan_consolidado: usize) -> Self {
        Self {
            horizonte_plan_consolidado,
            objetivos_anuales: default_annual_targets(),
            distribucion_mensual: default_monthly_distribution(),
            semilla: None,
            fecha_inicio: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlannerConfig {
    pub global: GlobalConfig,
    pub productos: ProductCatalog,
}

impl PlannerConfig {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PlannerConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleEvent {
    #[serde(rename = "ID Venta")]
    pub id: String,

    /// Absolute plan month (1-based) the sale starts in.
    #[serde(rename = "Mes de Inicio")]
    pub mes_inicio: usize,

    #[serde(rename = "Categoría Producto")]
    pub categoria: String,
}

impl SaleEvent {
    pub fn new(id: impl Into<String>, mes_inicio: usize, categoria: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mes_inicio,
            categoria: categoria.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesPlan {
    sales: Vec<SaleEvent>,
}

impl SalesPlan {
    pub fn new(sales: Vec<SaleEvent>) -> Self {
        Self { sales }
    }

    pub fn push(&mut self, sale: SaleEvent) {
        self.sales.push(sale);
    }

    pub fn sales(&self) -> &[SaleEvent] {
        &self.sales
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SaleEvent> {
        self.sales.iter()
    }

    pub fn len(&self) -> usize {
        self.sales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }

    /// Sum of sale prices grouped by plan year of each sale's start month.
    pub fn revenue_by_year(&self, products: &ProductCatalog) -> Result<BTreeMap<usize, f64>> {
        let mut totals = BTreeMap::new();
        for sale in &self.sales {
            let params = products
                .get(&sale.categoria)
                .ok_or_else(|| PlannerError::UnknownCategory(sale.categoria.clone()))?;
            let year = crate::utils::plan_year(sale.mes_inicio);
            *totals.entry(year).or_insert(0.0) += params.valor_venta;
        }
        Ok(totals)
    }
}

impl FromIterator<SaleEvent> for SalesPlan {
    fn from_iter<I: IntoIterator<Item = SaleEvent>>(iter: I) -> Self {
        Self {
            sales: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SalesPlan {
    type Item = &'a SaleEvent;
    type IntoIter = std::slice::Iter<'a, SaleEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.sales.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> ProductParametersInput {
        ProductParametersInput {
            valor_venta: Some(120.0),
            coste_maquina: Some(60.0),
            esquema_pagos_venta: Some(vec![PaymentStepInput {
                mes_relativo: Some(0),
                porcentaje: Some(1.0),
            }]),
            esquema_pago_coste: None,
            mes_inicio_recurrentes: Some(1),
            duracion_pagos_recurrentes: Some(0),
            porcentaje_mantenimiento_anual: None,
            meses_amortizacion: Some(12),
        }
    }

    #[test]
    fn test_input_defaults_optional_fields() {
        let params = sample_input().into_parameters("Test").unwrap();
        assert!(params.esquema_pago_coste.is_empty());
        assert_eq!(params.porcentaje_mantenimiento_anual, 0.0);
        assert_eq!(params.meses_amortizacion, 12);
    }

    #[test]
    fn test_missing_required_field_names_category_and_field() {
        let mut input = sample_input();
        input.valor_venta = None;
        match input.into_parameters("Test") {
            Err(PlannerError::MissingParameter { category, field }) => {
                assert_eq!(category, "Test");
                assert_eq!(field, "valor_venta");
            }
            other => panic!("expected MissingParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        let mut input = sample_input();
        input.duracion_pagos_recurrentes = Some(-3);
        let err = input.into_parameters("Test").unwrap_err();
        assert!(matches!(err, PlannerError::InvalidParameter { .. }));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_non_positive_price_is_rejected() {
        let mut input = sample_input();
        input.valor_venta = Some(0.0);
        let err = input.into_parameters("Test").unwrap_err();
        assert!(matches!(err, PlannerError::NonPositivePrice { .. }));
    }

    #[test]
    fn test_overpaid_schedule_is_rejected() {
        let mut input = sample_input();
        input.esquema_pagos_venta = Some(vec![
            PaymentStepInput {
                mes_relativo: Some(0),
                porcentaje: Some(0.6),
            },
            PaymentStepInput {
                mes_relativo: Some(1),
                porcentaje: Some(0.6),
            },
        ]);
        assert!(input.into_parameters("Test").is_err());
    }

    #[test]
    fn test_financed_remainder() {
        let mut params = sample_input().into_parameters("Test").unwrap();
        params.esquema_pagos_venta = vec![PaymentStep::new(0, 0.25)];
        assert!((params.financed_remainder() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_catalog_is_rejected() {
        let result = catalog_from_input(BTreeMap::new());
        assert!(matches!(result, Err(PlannerError::EmptyProductConfig)));
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = PlannerConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("horizonte_plan_consolidado"));
        assert!(schema_json.contains("esquema_pagos_venta"));
        assert!(schema_json.contains("meses_amortizacion"));
    }

    #[test]
    fn test_revenue_by_year() {
        let mut products = ProductCatalog::new();
        products.insert("A".to_string(), sample_input().into_parameters("A").unwrap());
        let plan: SalesPlan = vec![
            SaleEvent::new("Venta-001", 1, "A"),
            SaleEvent::new("Venta-002", 12, "A"),
            SaleEvent::new("Venta-003", 13, "A"),
        ]
        .into_iter()
        .collect();

        let totals = plan.revenue_by_year(&products).unwrap();
        assert_eq!(totals.get(&1), Some(&240.0));
        assert_eq!(totals.get(&2), Some(&120.0));
    }
}
