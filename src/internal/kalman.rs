//! Linear Kalman filter core on dynamic nalgebra matrices.
//!
//! The update is fallible: the innovation covariance is inverted through a
//! Cholesky factorization and a failure leaves the filter untouched.

use nalgebra::{DMatrix, DVector};

use crate::{Error, Result};

/// Standard Kalman filter.
#[derive(Clone, Debug)]
pub struct KalmanFilter {
    /// State dimension
    pub dim_x: usize,
    /// Measurement dimension
    pub dim_z: usize,
    /// State vector
    pub x: DVector<f64>,
    /// State covariance matrix
    pub p: DMatrix<f64>,
    /// State transition matrix
    pub f: DMatrix<f64>,
    /// Measurement matrix
    pub h: DMatrix<f64>,
    /// Measurement noise covariance
    pub r: DMatrix<f64>,
    /// Process noise covariance
    pub q: DMatrix<f64>,
}

impl KalmanFilter {
    /// Create a new Kalman filter with identity matrices.
    ///
    /// # Arguments
    /// * `dim_x` - State dimension
    /// * `dim_z` - Measurement dimension
    pub fn new(dim_x: usize, dim_z: usize) -> Self {
        let mut h = DMatrix::zeros(dim_z, dim_x);
        for i in 0..dim_z.min(dim_x) {
            h[(i, i)] = 1.0;
        }

        Self {
            dim_x,
            dim_z,
            x: DVector::zeros(dim_x),
            p: DMatrix::identity(dim_x, dim_x),
            f: DMatrix::identity(dim_x, dim_x),
            h,
            r: DMatrix::identity(dim_z, dim_z),
            q: DMatrix::identity(dim_x, dim_x),
        }
    }

    /// Predict the next state.
    pub fn predict(&mut self) {
        // x = F @ x
        self.x = &self.f * &self.x;

        // P = F @ P @ F.T + Q
        self.p = &self.f * &self.p * self.f.transpose() + &self.q;
    }

    /// Update the state with a measurement through the linear model.
    ///
    /// # Arguments
    /// * `z` - Measurement vector
    /// * `r` - Optional measurement noise covariance (overrides self.r)
    /// * `h` - Optional measurement matrix (overrides self.h)
    pub fn update(
        &mut self,
        z: &DVector<f64>,
        r: Option<&DMatrix<f64>>,
        h: Option<&DMatrix<f64>>,
    ) -> Result<()> {
        let h = h.cloned().unwrap_or_else(|| self.h.clone());
        let r = r.cloned().unwrap_or_else(|| self.r.clone());

        if z.len() != h.nrows() {
            return Err(Error::InvalidParameter(format!(
                "measurement of length {} does not match H with {} rows",
                z.len(),
                h.nrows()
            )));
        }

        // y = z - H @ x (innovation)
        let y = z - &h * &self.x;
        self.correct(&y, &h, &r)
    }

    /// Apply a correction from a precomputed innovation.
    ///
    /// `h` is the observation matrix, or the Jacobian of a nonlinear observation
    /// evaluated at the current state.
    pub fn correct(&mut self, y: &DVector<f64>, h: &DMatrix<f64>, r: &DMatrix<f64>) -> Result<()> {
        if y.len() != self.dim_z
            || h.shape() != (self.dim_z, self.dim_x)
            || r.shape() != (self.dim_z, self.dim_z)
        {
            return Err(Error::InvalidParameter(format!(
                "measurement shapes y={} h={:?} r={:?} do not match dim_x={} dim_z={}",
                y.len(),
                h.shape(),
                r.shape(),
                self.dim_x,
                self.dim_z
            )));
        }

        // S = H @ P @ H.T + R (innovation covariance)
        let s = h * &self.p * h.transpose() + r;
        let si = invert_spd(&s)?;

        // K = P @ H.T @ S^-1 (Kalman gain)
        let k = &self.p * h.transpose() * si;

        // x = x + K @ y
        let x = &self.x + &k * y;

        // P = P - K @ H @ P
        let p = &self.p - &k * h * &self.p;
        let p = (&p + p.transpose()) * 0.5;

        if x.iter().chain(p.iter()).any(|v| !v.is_finite()) {
            return Err(Error::SingularCovariance);
        }

        self.x = x;
        self.p = p;
        Ok(())
    }

    /// Get the current state estimate.
    pub fn get_state(&self) -> &DVector<f64> {
        &self.x
    }

    /// Get the state covariance.
    pub fn get_covariance(&self) -> &DMatrix<f64> {
        &self.p
    }
}

/// Invert a symmetric positive-definite matrix.
pub fn invert_spd(m: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err(Error::SingularCovariance);
    }
    let symmetric = (m + m.transpose()) * 0.5;
    let inverse = symmetric
        .cholesky()
        .map(|c| c.inverse())
        .ok_or(Error::SingularCovariance)?;
    if inverse.iter().any(|v| !v.is_finite()) {
        return Err(Error::SingularCovariance);
    }
    Ok(inverse)
}
