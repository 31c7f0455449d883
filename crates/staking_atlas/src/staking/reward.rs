//! Annual yield estimate for a baker.

use crate::chain::decode::RawValidator;

/// Yield reported when the baker list carries no ROI estimate.
pub const MISSING_ROI_ANNUAL: f64 = 0.0;

/// Scale the baker's fractional `estimatedRoi` to a percentage.
///
/// Values are passed through unclamped: a negative or >100% estimate is the
/// display layer's problem, not ours.
pub fn estimate_annual_yield(raw: &RawValidator) -> f64 {
    match raw.estimated_roi {
        Some(roi) => roi * 100.0,
        None => MISSING_ROI_ANNUAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn baker(roi: Option<f64>) -> RawValidator {
        RawValidator {
            address: "tz1test".into(),
            name: None,
            logo: None,
            balance: None,
            staking_balance: None,
            staking_capacity: None,
            max_staking_balance: None,
            free_space: None,
            fee: None,
            min_delegation: None,
            payout_delay: None,
            payout_period: None,
            open_for_delegation: None,
            estimated_roi: roi,
            service_type: None,
            service_health: None,
            payout_timing: None,
            payout_accuracy: None,
            insurance_coverage: None,
        }
    }

    #[test]
    fn roi_scaled_to_percent() {
        assert_relative_eq!(
            estimate_annual_yield(&baker(Some(0.055564))),
            5.5564,
            epsilon = 1e-9
        );
    }

    #[test]
    fn missing_roi_is_sentinel() {
        assert_eq!(estimate_annual_yield(&baker(None)), MISSING_ROI_ANNUAL);
    }

    #[test]
    fn out_of_range_not_clamped() {
        assert_relative_eq!(estimate_annual_yield(&baker(Some(-0.02))), -2.0);
        assert_relative_eq!(estimate_annual_yield(&baker(Some(1.5))), 150.0);
    }
}
