use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Product '{category}' is missing required parameter '{field}'")]
    MissingParameter { category: String, field: String },

    #[error("Invalid parameter for product '{category}': {details}")]
    InvalidParameter { category: String, details: String },

    #[error("Product '{category}' has non-positive sale price {price}: sampling weights are 1/price")]
    NonPositivePrice { category: String, price: f64 },

    #[error("Unknown product category referenced by sale: {0}")]
    UnknownCategory(String),

    #[error("Product configuration is empty")]
    EmptyProductConfig,

    #[error("Invalid horizon {0}: must be at least one month")]
    InvalidHorizon(usize),

    #[error("Sale '{id}' has invalid start month {month}: months are 1-based")]
    InvalidSaleMonth { id: String, month: usize },

    #[error("Invalid monthly distribution: {0}")]
    InvalidMonthlyDistribution(String),

    #[error("Invalid revenue target for year {year}: {details}")]
    InvalidTarget { year: usize, details: String },

    #[error("Series kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PlannerError {
    /// True for the errors caused by bad product parameters or a plan that
    /// references something the configuration does not define.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            PlannerError::MissingParameter { .. }
                | PlannerError::InvalidParameter { .. }
                | PlannerError::NonPositivePrice { .. }
                | PlannerError::UnknownCategory(_)
                | PlannerError::EmptyProductConfig
                | PlannerError::InvalidHorizon(_)
                | PlannerError::InvalidSaleMonth { .. }
                | PlannerError::InvalidMonthlyDistribution(_)
                | PlannerError::InvalidTarget { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;
