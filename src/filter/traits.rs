//! Filter traits and shared per-anchor state.

use serde::{Deserialize, Serialize};

use super::dispatch::FilterVariant;
use crate::internal::history::RssiHistory;
use crate::{Error, Result};

/// Where the feedback filter takes its previous value from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSeed {
    /// The feedback filter's own previous output.
    #[default]
    SelfContained,
    /// The Type-A pre-correction mean of the same cycle (0 on an anchor's first
    /// sample).
    KalmanAMean,
}

/// Tunables read by the filters on every step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Kalman measurement noise `q`, must be positive.
    pub kalman_noise: f64,
    /// Feedback blend factor, within (0, 1).
    pub feedback_alpha: f64,
    pub feedback_seed: FeedbackSeed,
}

impl FilterParams {
    pub fn new(kalman_noise: f64, feedback_alpha: f64) -> Self {
        Self {
            kalman_noise,
            feedback_alpha,
            feedback_seed: FeedbackSeed::default(),
        }
    }

    /// Check the tunables without touching any filter state.
    pub fn validate(&self) -> Result<()> {
        if !(self.kalman_noise.is_finite() && self.kalman_noise > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "kalman noise must be positive, got {}",
                self.kalman_noise
            )));
        }
        if !(self.feedback_alpha > 0.0 && self.feedback_alpha < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "feedback alpha must be within (0, 1), got {}",
                self.feedback_alpha
            )));
        }
        Ok(())
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self::new(1.0, 0.5)
    }
}

/// Output of one filter step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    /// Smoothed RSSI in dBm.
    pub filtered_rssi: f64,
    /// Variance carried into the next step.
    pub updated_variance: f64,
    /// Value carried into the next step as "previous".
    pub previous_value_for_next_step: f64,
    /// Estimate before the correction: the history mean for Type A, the
    /// previous output for Type B and feedback.
    pub raw_prediction_before_correction: f64,
    /// Population variance of the RSSI history after this sample.
    pub history_variance: f64,
    /// Gain applied to the innovation (Kalman gain, or alpha).
    pub gain: f64,
}

impl FilterResult {
    /// Five-slot layout: pre-correction value, history variance, gain,
    /// filtered RSSI, updated variance.
    pub fn to_array(&self) -> [f64; 5] {
        [
            self.raw_prediction_before_correction,
            self.history_variance,
            self.gain,
            self.filtered_rssi,
            self.updated_variance,
        ]
    }
}

/// Running state of one filter variant for one anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorFilterState {
    pub sample_count: u64,
    pub variance_estimate: f64,
    pub previous_filtered_value: f64,
    pub history: RssiHistory,
}

impl AnchorFilterState {
    /// Fresh state: no samples, unit variance, previous value 0.
    pub fn new(history_window: Option<usize>) -> Self {
        Self {
            sample_count: 0,
            variance_estimate: 1.0,
            previous_filtered_value: 0.0,
            history: RssiHistory::new(history_window),
        }
    }

    /// Record the carried values of a finished step.
    pub(crate) fn advance(&mut self, result: &FilterResult) {
        self.sample_count += 1;
        self.variance_estimate = result.updated_variance;
        self.previous_filtered_value = result.previous_value_for_next_step;
    }
}

/// Recursive scalar filter over one anchor's RSSI stream.
pub trait RssiFilter: Send + Sync {
    /// Consume the latest RSSI and advance the state by one sample.
    fn step(&mut self, rssi: f64, params: &FilterParams) -> FilterResult;

    /// Current carried state.
    fn state(&self) -> &AnchorFilterState;

    /// Which variant this filter implements.
    fn variant(&self) -> FilterVariant;

    /// Drop all carried state, keeping the history window.
    fn reset(&mut self);
}
