//! Scalar Kalman filter correcting around its own previous output.
//!
//! Same gain and variance recursion as Type A, but the prediction is the
//! previous filtered value (0 before the first sample) instead of the history
//! mean, so the estimate lags behind level changes.

use serde::{Deserialize, Serialize};

use super::dispatch::FilterVariant;
use super::kalman_a::scalar_gain;
use super::traits::{AnchorFilterState, FilterParams, FilterResult, RssiFilter};

/// Kalman filter Type B.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KalmanTypeB {
    state: AnchorFilterState,
}

impl KalmanTypeB {
    pub fn new(history_window: Option<usize>) -> Self {
        Self {
            state: AnchorFilterState::new(history_window),
        }
    }
}

impl RssiFilter for KalmanTypeB {
    fn step(&mut self, rssi: f64, params: &FilterParams) -> FilterResult {
        self.state.history.push(rssi);
        let previous = self.state.previous_filtered_value;

        let prior = self.state.variance_estimate;
        let (k, updated_variance) = scalar_gain(prior, params.kalman_noise);
        let estimate = previous + k * (rssi - previous);

        let result = FilterResult {
            filtered_rssi: estimate,
            updated_variance,
            previous_value_for_next_step: estimate,
            raw_prediction_before_correction: previous,
            history_variance: self.state.history.variance(),
            gain: k,
        };
        self.state.advance(&result);
        result
    }

    fn state(&self) -> &AnchorFilterState {
        &self.state
    }

    fn variant(&self) -> FilterVariant {
        FilterVariant::KalmanB
    }

    fn reset(&mut self) {
        self.state = AnchorFilterState::new(self.state.history.capacity());
    }
}
