//! Scalar Kalman filter correcting around the history mean.
//!
//! Each step appends the reading to the anchor's history, takes the history
//! mean as the prediction and corrects it toward the latest reading:
//!
//! ```text
//! K  = P / (P + q)
//! x' = mean + K * (latest - mean)
//! P' = (1 - K) * P
//! ```

use serde::{Deserialize, Serialize};

use super::dispatch::FilterVariant;
use super::traits::{AnchorFilterState, FilterParams, FilterResult, RssiFilter};

/// Gain and posterior variance for a prior variance `p` and noise `q`.
#[inline(always)]
pub(super) fn scalar_gain(p: f64, q: f64) -> (f64, f64) {
    let k = p / (p + q);
    (k, (1.0 - k) * p)
}

/// Kalman filter Type A.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KalmanTypeA {
    state: AnchorFilterState,
}

impl KalmanTypeA {
    pub fn new(history_window: Option<usize>) -> Self {
        Self {
            state: AnchorFilterState::new(history_window),
        }
    }
}

impl RssiFilter for KalmanTypeA {
    fn step(&mut self, rssi: f64, params: &FilterParams) -> FilterResult {
        self.state.history.push(rssi);
        let mean = self.state.history.mean();
        let history_variance = self.state.history.variance();

        let prior = self.state.variance_estimate;
        let (k, updated_variance) = scalar_gain(prior, params.kalman_noise);
        let estimate = mean + k * (rssi - mean);

        let result = FilterResult {
            filtered_rssi: estimate,
            updated_variance,
            previous_value_for_next_step: estimate,
            raw_prediction_before_correction: mean,
            history_variance,
            gain: k,
        };
        self.state.advance(&result);
        result
    }

    fn state(&self) -> &AnchorFilterState {
        &self.state
    }

    fn variant(&self) -> FilterVariant {
        FilterVariant::KalmanA
    }

    fn reset(&mut self) {
        self.state = AnchorFilterState::new(self.state.history.capacity());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kalman_a_first_step() {
        let mut filter = KalmanTypeA::new(None);
        let result = filter.step(-60.0, &FilterParams::new(1.0, 0.5));

        // Single reading: mean equals the reading, gain 1 / (1 + 1)
        assert_relative_eq!(result.raw_prediction_before_correction, -60.0);
        assert_relative_eq!(result.filtered_rssi, -60.0);
        assert_relative_eq!(result.gain, 0.5);
        assert_relative_eq!(result.updated_variance, 0.5);
        assert_eq!(filter.state().sample_count, 1);
    }

    #[test]
    fn test_kalman_a_corrects_around_mean() {
        let mut filter = KalmanTypeA::new(None);
        let params = FilterParams::new(1.0, 0.5);
        filter.step(-60.0, &params);
        let result = filter.step(-70.0, &params);

        // mean = -65, prior P = 0.5, K = 0.5 / 1.5
        let k = 0.5 / 1.5;
        assert_relative_eq!(result.raw_prediction_before_correction, -65.0, epsilon = 1e-12);
        assert_relative_eq!(result.filtered_rssi, -65.0 + k * -5.0, epsilon = 1e-12);
        assert_relative_eq!(result.updated_variance, (1.0 - k) * 0.5, epsilon = 1e-12);
        assert_relative_eq!(result.history_variance, 25.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kalman_a_constant_input_converges() {
        let mut filter = KalmanTypeA::new(None);
        let params = FilterParams::new(0.5, 0.5);
        let mut previous_variance = f64::INFINITY;

        for _ in 0..50 {
            let result = filter.step(-72.0, &params);
            assert_relative_eq!(result.filtered_rssi, -72.0, epsilon = 1e-9);
            assert!(result.updated_variance <= previous_variance);
            previous_variance = result.updated_variance;
        }
    }

    #[test]
    fn test_kalman_a_reset() {
        let mut filter = KalmanTypeA::new(Some(4));
        filter.step(-50.0, &FilterParams::default());
        filter.reset();

        assert_eq!(filter.state().sample_count, 0);
        assert_eq!(filter.state().variance_estimate, 1.0);
        assert!(filter.state().history.is_empty());
        assert_eq!(filter.state().history.capacity(), Some(4));
    }
}
