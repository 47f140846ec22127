//! Log-distance path-loss model.
//!
//! `distance = 10 ^ ((reference_rssi - rssi) / (10 * n))`, with `reference_rssi`
//! the signal strength measured at 1 meter and `n` the path-loss exponent.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Reference RSSI at 1 meter used when none is configured.
pub const DEFAULT_REFERENCE_RSSI: f64 = -40.0;

/// Path-loss exponent used when none is configured.
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 2.5;

/// Bounds of the signal quality scale.
const MIN_LEVEL_RSSI: f64 = -100.0;
const MAX_LEVEL_RSSI: f64 = -55.0;

/// RSSI to distance conversion with a fixed 1 m reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathLossModel {
    reference_rssi: f64,
    exponent: f64,
}

impl PathLossModel {
    /// Create a model.
    ///
    /// # Arguments
    /// * `reference_rssi` - RSSI at 1 meter (dBm)
    /// * `exponent` - Path-loss exponent `n`, must be positive
    pub fn new(reference_rssi: f64, exponent: f64) -> Result<Self> {
        if !(exponent.is_finite() && exponent > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "path-loss exponent must be positive, got {}",
                exponent
            )));
        }
        if !reference_rssi.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "reference RSSI must be finite, got {}",
                reference_rssi
            )));
        }
        Ok(Self {
            reference_rssi,
            exponent,
        })
    }

    #[inline(always)]
    pub fn reference_rssi(&self) -> f64 {
        self.reference_rssi
    }

    #[inline(always)]
    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    /// Distance in meters for a (filtered) RSSI.
    pub fn distance(&self, rssi: f64) -> f64 {
        10f64.powf((self.reference_rssi - rssi) / (10.0 * self.exponent))
    }

    /// RSSI expected at `distance` meters; inverse of [`PathLossModel::distance`].
    pub fn rssi_at_distance(&self, distance: f64) -> Result<f64> {
        if !(distance.is_finite() && distance > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "distance must be positive, got {}",
                distance
            )));
        }
        Ok(self.reference_rssi - 10.0 * self.exponent * distance.log10())
    }
}

impl Default for PathLossModel {
    fn default() -> Self {
        Self {
            reference_rssi: DEFAULT_REFERENCE_RSSI,
            exponent: DEFAULT_PATH_LOSS_EXPONENT,
        }
    }
}

/// Distance for `filtered_rssi` with the default 1 m reference.
pub fn distance(filtered_rssi: f64, exponent: f64) -> Result<f64> {
    Ok(PathLossModel::new(DEFAULT_REFERENCE_RSSI, exponent)?.distance(filtered_rssi))
}

/// RSSI at `distance` meters with the default 1 m reference.
pub fn rssi_at_distance(distance: f64, exponent: f64) -> Result<f64> {
    PathLossModel::new(DEFAULT_REFERENCE_RSSI, exponent)?.rssi_at_distance(distance)
}

/// Quantize an RSSI into `levels` signal bars, `0..levels`.
///
/// Readings at or below -100 dBm map to 0 and at or above -55 dBm to
/// `levels - 1`; values in between are spread linearly.
pub fn signal_level(rssi: f64, levels: u32) -> u32 {
    if levels < 2 {
        return 0;
    }
    if rssi <= MIN_LEVEL_RSSI {
        0
    } else if rssi >= MAX_LEVEL_RSSI {
        levels - 1
    } else {
        let span = MAX_LEVEL_RSSI - MIN_LEVEL_RSSI;
        ((rssi - MIN_LEVEL_RSSI) * (levels - 1) as f64 / span) as u32
    }
}
