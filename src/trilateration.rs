//! Closed-form three-circle trilateration.
//!
//! Subtracting the first circle equation from the other two gives a linear
//! 2x2 system; for i = 2, 3:
//!
//! ```text
//! 2(x1 - xi) x + 2(y1 - yi) y = (di^2 - d1^2) - (xi^2 - x1^2) - (yi^2 - y1^2)
//! ```
//!
//! solved with Cramer's rule. Collinear or coincident anchors make the system
//! singular.

use nalgebra::{Matrix2, Vector2};

use crate::geometry::{AnchorGeometry, PositionEstimate};
use crate::{Error, Result};

/// Default determinant threshold below which the geometry is rejected.
pub const DEFAULT_SINGULAR_EPSILON: f64 = 1e-9;

/// Trilateration solver for one fixed set of three anchors.
///
/// The left-hand matrix only depends on the anchors, so it is built and
/// checked once.
#[derive(Debug, Clone)]
pub struct Trilaterator {
    anchors: [PositionEstimate; 3],
    a: Matrix2<f64>,
    determinant: f64,
}

impl Trilaterator {
    /// Build a solver, failing with `SingularGeometry` on degenerate anchors.
    pub fn new(anchors: &[AnchorGeometry; 3], epsilon: f64) -> Result<Self> {
        let anchors = [
            anchors[0].position(),
            anchors[1].position(),
            anchors[2].position(),
        ];
        if anchors.iter().any(|p| !p.is_finite()) {
            return Err(Error::InvalidParameter(
                "anchor coordinates must be finite".to_string(),
            ));
        }

        let [p1, p2, p3] = anchors;
        let a = Matrix2::new(
            2.0 * (p1.x - p2.x), 2.0 * (p1.y - p2.y),
            2.0 * (p1.x - p3.x), 2.0 * (p1.y - p3.y),
        );
        let determinant = a.determinant();
        if determinant.is_nan() || determinant.abs() <= epsilon {
            return Err(Error::SingularGeometry { determinant });
        }

        Ok(Self {
            anchors,
            a,
            determinant,
        })
    }

    pub fn determinant(&self) -> f64 {
        self.determinant
    }

    pub fn anchors(&self) -> &[PositionEstimate; 3] {
        &self.anchors
    }

    /// Position consistent with the three anchor distances.
    pub fn solve(&self, distances: [f64; 3]) -> Result<PositionEstimate> {
        if distances.iter().any(|d| !(d.is_finite() && *d >= 0.0)) {
            return Err(Error::InvalidParameter(format!(
                "distances must be finite and non-negative, got {:?}",
                distances
            )));
        }

        let [p1, p2, p3] = self.anchors;
        let [d1, d2, d3] = distances;
        let rhs = |p: PositionEstimate, d: f64| {
            (d * d - d1 * d1) - (p.x * p.x - p1.x * p1.x) - (p.y * p.y - p1.y * p1.y)
        };
        let b = Vector2::new(rhs(p2, d2), rhs(p3, d3));
        if b.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "distances {:?} overflow the linearized system",
                distances
            )));
        }

        // Cramer's rule
        let det = self.determinant;
        let x = (b[0] * self.a[(1, 1)] - self.a[(0, 1)] * b[1]) / det;
        let y = (self.a[(0, 0)] * b[1] - b[0] * self.a[(1, 0)]) / det;

        let position = PositionEstimate::new(x, y);
        if !position.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "distances {:?} give a non-finite position",
                distances
            )));
        }
        Ok(position)
    }
}

/// One-shot trilateration.
pub fn trilaterate(
    anchors: &[AnchorGeometry; 3],
    distances: [f64; 3],
    epsilon: f64,
) -> Result<PositionEstimate> {
    Trilaterator::new(anchors, epsilon)?.solve(distances)
}
