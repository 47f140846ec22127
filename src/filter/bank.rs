//! Per-anchor filter state, keyed by anchor identifier.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::dispatch::{FilterVariant, VariantReadings};
use super::feedback::FeedbackFilter;
use super::kalman_a::KalmanTypeA;
use super::kalman_b::KalmanTypeB;
use super::traits::{FeedbackSeed, FilterParams, RssiFilter};

/// The three filters of one anchor plus its last readings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorFilters {
    pub kalman_a: KalmanTypeA,
    pub kalman_b: KalmanTypeB,
    pub feedback: FeedbackFilter,
    last: Option<VariantReadings>,
}

impl AnchorFilters {
    pub fn new(history_window: Option<usize>) -> Self {
        Self {
            kalman_a: KalmanTypeA::new(history_window),
            kalman_b: KalmanTypeB::new(history_window),
            feedback: FeedbackFilter::new(history_window),
            last: None,
        }
    }

    /// Run one sample through every variant.
    pub fn step(&mut self, rssi: f64, params: &FilterParams) -> VariantReadings {
        let first_sample = self.kalman_a.state().sample_count == 0;
        let kalman_a = self.kalman_a.step(rssi, params);
        let kalman_b = self.kalman_b.step(rssi, params);
        let feedback = match params.feedback_seed {
            FeedbackSeed::SelfContained => self.feedback.step(rssi, params),
            FeedbackSeed::KalmanAMean => {
                let previous = if first_sample {
                    0.0
                } else {
                    kalman_a.raw_prediction_before_correction
                };
                self.feedback.step_from(previous, rssi, params)
            }
        };

        let readings = VariantReadings {
            kalman_a,
            kalman_b,
            feedback,
        };
        self.last = Some(readings);
        readings
    }

    /// Readings of the most recent sample, if any.
    pub fn last(&self) -> Option<&VariantReadings> {
        self.last.as_ref()
    }

    /// The filter implementing `variant`.
    pub fn filter(&self, variant: FilterVariant) -> &dyn RssiFilter {
        match variant {
            FilterVariant::KalmanA => &self.kalman_a,
            FilterVariant::KalmanB => &self.kalman_b,
            FilterVariant::Feedback => &self.feedback,
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.kalman_a.state().sample_count
    }

    pub fn reset(&mut self) {
        self.kalman_a.reset();
        self.kalman_b.reset();
        self.feedback.reset();
        self.last = None;
    }
}

/// Filter states for every anchor seen in a session.
///
/// Entries are created on an anchor's first sample and never removed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorFilterBank {
    history_window: Option<usize>,
    anchors: BTreeMap<String, AnchorFilters>,
}

impl AnchorFilterBank {
    /// Create an empty bank whose histories keep at most `history_window` readings.
    pub fn new(history_window: Option<usize>) -> Self {
        Self {
            history_window,
            anchors: BTreeMap::new(),
        }
    }

    pub fn history_window(&self) -> Option<usize> {
        self.history_window
    }

    /// Advance `anchor_id`'s filters by one sample.
    pub fn step(&mut self, anchor_id: &str, rssi: f64, params: &FilterParams) -> VariantReadings {
        let window = self.history_window;
        let filters = self
            .anchors
            .entry(anchor_id.to_string())
            .or_insert_with(|| AnchorFilters::new(window));
        let readings = filters.step(rssi, params);

        trace!(
            anchor = anchor_id,
            rssi,
            kalman_a = readings.kalman_a.filtered_rssi,
            kalman_b = readings.kalman_b.filtered_rssi,
            feedback = readings.feedback.filtered_rssi,
            "filter step"
        );
        readings
    }

    pub fn get(&self, anchor_id: &str) -> Option<&AnchorFilters> {
        self.anchors.get(anchor_id)
    }

    /// Last readings of `anchor_id`, if it has ever reported.
    pub fn last_readings(&self, anchor_id: &str) -> Option<&VariantReadings> {
        self.anchors.get(anchor_id).and_then(|f| f.last())
    }

    pub fn contains(&self, anchor_id: &str) -> bool {
        self.anchors.contains_key(anchor_id)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn anchor_ids(&self) -> impl Iterator<Item = &str> {
        self.anchors.keys().map(|k| k.as_str())
    }

    /// Forget every anchor.
    pub fn clear(&mut self) {
        self.anchors.clear();
    }
}
