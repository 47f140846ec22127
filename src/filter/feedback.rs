//! Exponential feedback filter.
//!
//! `x' = previous + alpha * (latest - previous)`; alpha near 1 tracks fast,
//! near 0 smooths heavily.

use serde::{Deserialize, Serialize};

use super::dispatch::FilterVariant;
use super::traits::{AnchorFilterState, FilterParams, FilterResult, RssiFilter};

/// Alpha-blend smoother.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackFilter {
    state: AnchorFilterState,
}

impl FeedbackFilter {
    pub fn new(history_window: Option<usize>) -> Self {
        Self {
            state: AnchorFilterState::new(history_window),
        }
    }

    /// Step with an externally supplied previous value instead of the carried one.
    pub fn step_from(&mut self, previous: f64, rssi: f64, params: &FilterParams) -> FilterResult {
        self.state.history.push(rssi);
        let alpha = params.feedback_alpha;
        let estimate = previous + alpha * (rssi - previous);

        let result = FilterResult {
            filtered_rssi: estimate,
            updated_variance: self.state.variance_estimate,
            previous_value_for_next_step: estimate,
            raw_prediction_before_correction: previous,
            history_variance: self.state.history.variance(),
            gain: alpha,
        };
        self.state.advance(&result);
        result
    }
}

impl RssiFilter for FeedbackFilter {
    fn step(&mut self, rssi: f64, params: &FilterParams) -> FilterResult {
        let previous = self.state.previous_filtered_value;
        self.step_from(previous, rssi, params)
    }

    fn state(&self) -> &AnchorFilterState {
        &self.state
    }

    fn variant(&self) -> FilterVariant {
        FilterVariant::Feedback
    }

    fn reset(&mut self) {
        self.state = AnchorFilterState::new(self.state.history.capacity());
    }
}
