//! Stateful position refiner.

use nalgebra::{DMatrix, DVector, Matrix2, Vector2};
use tracing::trace;

use super::jacobian::{predicted_ranges, range_jacobian};
use super::{EkfConfig, EkfNoise, EkfState};
use crate::geometry::PositionEstimate;
use crate::internal::kalman::KalmanFilter;
use crate::Result;

/// Kalman refiner over the 2D position.
///
/// The a-posteriori state of one call is the a-priori state of the next. A
/// failed update returns the error and keeps the prior state.
#[derive(Debug, Clone)]
pub struct EkfRefiner {
    noise: EkfNoise,
    state: Option<EkfState>,
}

impl EkfRefiner {
    /// Create a refiner with no state yet.
    ///
    /// # Arguments
    /// * `config` - Noise settings, validated here
    pub fn new(config: &EkfConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_noise(EkfNoise::from_config(config)))
    }

    /// Create a refiner from explicit covariances, without validation.
    pub fn with_noise(noise: EkfNoise) -> Self {
        Self { noise, state: None }
    }

    /// Replace the carried state.
    pub fn with_state(mut self, state: Option<EkfState>) -> Self {
        self.state = state;
        self
    }

    pub fn noise(&self) -> &EkfNoise {
        &self.noise
    }

    pub fn state(&self) -> Option<&EkfState> {
        self.state.as_ref()
    }

    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Refine with a direct position observation.
    ///
    /// The first call seeds the state at the measurement.
    ///
    /// # Arguments
    /// * `measured` - Trilaterated position for this cycle
    pub fn refine(&mut self, measured: &PositionEstimate) -> Result<EkfState> {
        let mut kf = self.filter_for(measured, 2);
        kf.r = to_dmatrix(&self.noise.r);

        kf.predict();
        let z = DVector::from_vec(vec![measured.x, measured.y]);
        kf.update(&z, None, None)?;

        Ok(self.commit(&kf))
    }

    /// Refine with the three anchor distances through the range model.
    ///
    /// # Arguments
    /// * `anchors` - Anchor coordinates, in the same order as `distances`
    /// * `distances` - Measured distance to each anchor
    /// * `seed` - Position used to seed the state on the first call
    pub fn refine_ranges(
        &mut self,
        anchors: &[PositionEstimate; 3],
        distances: [f64; 3],
        seed: &PositionEstimate,
    ) -> Result<EkfState> {
        let mut kf = self.filter_for(seed, 3);
        kf.predict();

        let x = Vector2::new(kf.x[0], kf.x[1]);
        let h = range_jacobian(&x, anchors);
        let predicted = predicted_ranges(&x, anchors);

        // Innovation against the nonlinear model, correction through its Jacobian
        let y = DVector::from_iterator(3, distances.iter().zip(predicted.iter()).map(|(d, p)| d - p));
        let h = DMatrix::from_iterator(3, 2, h.iter().copied());
        let r = DMatrix::identity(3, 3) * self.noise.range_variance;
        kf.correct(&y, &h, &r)?;

        Ok(self.commit(&kf))
    }

    fn filter_for(&self, seed: &PositionEstimate, dim_z: usize) -> KalmanFilter {
        let prior = self
            .state
            .unwrap_or_else(|| EkfState::seeded(seed, self.noise.initial_variance));

        let mut kf = KalmanFilter::new(2, dim_z);
        kf.x = DVector::from_column_slice(prior.mean.as_slice());
        kf.p = to_dmatrix(&prior.covariance);
        kf.q = to_dmatrix(&self.noise.q);
        kf
    }

    fn commit(&mut self, kf: &KalmanFilter) -> EkfState {
        let x = kf.get_state();
        let p = kf.get_covariance();
        let state = EkfState::new(
            Vector2::new(x[0], x[1]),
            Matrix2::new(p[(0, 0)], p[(0, 1)], p[(1, 0)], p[(1, 1)]),
        );
        trace!(x = state.mean[0], y = state.mean[1], variance_trace = state.covariance.trace(), "ekf update");
        self.state = Some(state);
        state
    }
}

fn to_dmatrix(m: &Matrix2<f64>) -> DMatrix<f64> {
    DMatrix::from_column_slice(2, 2, m.as_slice())
}
