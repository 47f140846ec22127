//! Filter variant selection.
//!
//! Every anchor runs all three variants on each sample; `FilterVariant` picks
//! which one feeds positioning and `VariantReadings` holds one result per variant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::traits::FilterResult;
use crate::{Error, Result};

/// The three RSSI filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterVariant {
    #[default]
    KalmanA,
    KalmanB,
    Feedback,
}

impl FilterVariant {
    /// All variants, in reporting order.
    pub const ALL: [FilterVariant; 3] = [
        FilterVariant::KalmanA,
        FilterVariant::KalmanB,
        FilterVariant::Feedback,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterVariant::KalmanA => "kalman_a",
            FilterVariant::KalmanB => "kalman_b",
            FilterVariant::Feedback => "feedback",
        }
    }
}

impl fmt::Display for FilterVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterVariant {
    type Err = Error;

    /// Accepts the snake_case names plus the short names `kalman1`, `kalman2`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kalman_a" | "kalman1" | "kf1" => Ok(FilterVariant::KalmanA),
            "kalman_b" | "kalman2" | "kf2" => Ok(FilterVariant::KalmanB),
            "feedback" => Ok(FilterVariant::Feedback),
            other => Err(Error::InvalidParameter(format!(
                "unknown filter variant: {}",
                other
            ))),
        }
    }
}

/// One step result per variant for the same sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariantReadings {
    pub kalman_a: FilterResult,
    pub kalman_b: FilterResult,
    pub feedback: FilterResult,
}

impl VariantReadings {
    #[inline(always)]
    pub fn get(&self, variant: FilterVariant) -> &FilterResult {
        match variant {
            FilterVariant::KalmanA => &self.kalman_a,
            FilterVariant::KalmanB => &self.kalman_b,
            FilterVariant::Feedback => &self.feedback,
        }
    }

    /// Filtered RSSI of the given variant.
    #[inline(always)]
    pub fn filtered_rssi(&self, variant: FilterVariant) -> f64 {
        self.get(variant).filtered_rssi
    }

    /// Iterate `(variant, result)` pairs in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (FilterVariant, &FilterResult)> {
        FilterVariant::ALL.into_iter().map(move |v| (v, self.get(v)))
    }
}
