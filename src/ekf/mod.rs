//! Kalman refinement of the trilaterated position.
//!
//! The state is the 2D position under a static-target model (identity
//! transition). Two observation models are available:
//! - [`EkfObservation::Position`] - the trilaterated point observed directly
//!   through an identity observation matrix
//! - [`EkfObservation::Ranges`] - the three anchor distances observed through
//!   `d_i = |x - a_i|`, linearized with its analytic Jacobian

mod jacobian;
mod refiner;

pub use jacobian::{predicted_ranges, range_jacobian};
pub use refiner::EkfRefiner;

use nalgebra::{DMatrix, Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::geometry::PositionEstimate;
use crate::internal::kalman::invert_spd;
use crate::{Error, Result};

/// Observation model used by the refiner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EkfObservation {
    #[default]
    Position,
    Ranges,
}

/// Scalar EKF settings, expanded into diagonal covariances by [`EkfNoise`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EkfConfig {
    /// Process noise variance per axis.
    pub q: f64,
    /// Position measurement noise variance per axis.
    pub r: f64,
    /// Covariance diagonal used when the state is seeded.
    pub initial_variance: f64,
    pub observation: EkfObservation,
    /// Measurement noise variance per range, for [`EkfObservation::Ranges`].
    pub range_variance: f64,
}

impl Default for EkfConfig {
    fn default() -> Self {
        Self {
            q: 0.001,
            r: 0.1,
            initial_variance: 1.0,
            observation: EkfObservation::Position,
            range_variance: 0.1,
        }
    }
}

impl EkfConfig {
    pub fn validate(&self) -> Result<()> {
        let check = |name: &str, value: f64, allow_zero: bool| {
            let ok = value.is_finite() && (value > 0.0 || (allow_zero && value == 0.0));
            if ok {
                Ok(())
            } else {
                Err(Error::InvalidParameter(format!(
                    "ekf {} must be {}, got {}",
                    name,
                    if allow_zero { "non-negative" } else { "positive" },
                    value
                )))
            }
        };
        check("process noise", self.q, true)?;
        check("measurement noise", self.r, false)?;
        check("initial variance", self.initial_variance, false)?;
        check("range variance", self.range_variance, false)?;
        Ok(())
    }
}

/// Process and measurement noise covariances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EkfNoise {
    pub q: Matrix2<f64>,
    pub r: Matrix2<f64>,
    /// Variance of each range observation.
    pub range_variance: f64,
    /// Covariance diagonal for a freshly seeded state.
    pub initial_variance: f64,
}

impl EkfNoise {
    pub fn from_config(config: &EkfConfig) -> Self {
        Self {
            q: Matrix2::identity() * config.q,
            r: Matrix2::identity() * config.r,
            range_variance: config.range_variance,
            initial_variance: config.initial_variance,
        }
    }
}

impl Default for EkfNoise {
    fn default() -> Self {
        Self::from_config(&EkfConfig::default())
    }
}

/// Position mean and covariance carried between refinement calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EkfState {
    pub mean: Vector2<f64>,
    pub covariance: Matrix2<f64>,
}

impl EkfState {
    pub fn new(mean: Vector2<f64>, covariance: Matrix2<f64>) -> Self {
        Self { mean, covariance }
    }

    /// State centered on `position` with isotropic covariance.
    pub fn seeded(position: &PositionEstimate, variance: f64) -> Self {
        Self::new(
            Vector2::new(position.x, position.y),
            Matrix2::identity() * variance,
        )
    }

    pub fn position(&self) -> PositionEstimate {
        PositionEstimate::new(self.mean[0], self.mean[1])
    }

    /// Check a state loaded from outside: finite values and a
    /// positive-definite covariance.
    pub fn validate(&self) -> Result<()> {
        if self.mean.iter().chain(self.covariance.iter()).any(|v| !v.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "ekf state must be finite, got {:?}",
                self
            )));
        }
        invert_spd(&DMatrix::from_column_slice(2, 2, self.covariance.as_slice()))?;
        Ok(())
    }
}
