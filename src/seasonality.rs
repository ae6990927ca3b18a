use crate::error::{PlannerError, Result};
use crate::utils::MONTHS_PER_YEAR;

/// Turns twelve relative month weights into a probability distribution over months 1..=12.
pub fn normalize_monthly_distribution(weights: &[f64]) -> Result<Vec<f64>> {
    validate_monthly_distribution(weights)?;
    let sum: f64 = weights.iter().sum();
    Ok(weights.iter().map(|w| w / sum).collect())
}

fn validate_monthly_distribution(weights: &[f64]) -> Result<()> {
    if weights.len() != MONTHS_PER_YEAR {
        return Err(PlannerError::InvalidMonthlyDistribution(format!(
            "Expected {} weights, got {}",
            MONTHS_PER_YEAR,
            weights.len()
        )));
    }

    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(PlannerError::InvalidMonthlyDistribution(
            "All weights must be finite and non-negative".to_string(),
        ));
    }

    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return Err(PlannerError::InvalidMonthlyDistribution(
            "At least one month needs a positive weight".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_distribution() {
        let weights = normalize_monthly_distribution(&[1.0; 12]).unwrap();
        assert_eq!(weights.len(), 12);
        for w in weights {
            assert!((w - 1.0 / 12.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_quarter_end_peaks() {
        let raw = [1.0, 1.0, 1.5, 1.0, 1.0, 1.5, 1.0, 1.0, 1.5, 1.0, 1.0, 2.0];
        let weights = normalize_monthly_distribution(&raw).unwrap();
        let sum: f64 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!((weights[11] - 2.0 / 14.5).abs() < 1e-12);
        assert!(weights[2] > weights[0]);
    }

    #[test]
    fn test_invalid_length() {
        assert!(normalize_monthly_distribution(&[0.5, 0.5]).is_err());
    }

    #[test]
    fn test_negative_weight() {
        let mut raw = [1.0; 12];
        raw[4] = -0.1;
        assert!(normalize_monthly_distribution(&raw).is_err());
    }

    #[test]
    fn test_all_zero() {
        assert!(normalize_monthly_distribution(&[0.0; 12]).is_err());
    }
}
