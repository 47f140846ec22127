//! Range observation model `d_i = |x - a_i|` and its Jacobian.

use nalgebra::{Matrix3x2, Vector2, Vector3};

use crate::geometry::PositionEstimate;

// Floor on predicted range so the Jacobian stays finite at an anchor
const MIN_RANGE: f64 = 1e-12;

/// Distances from `x` to each anchor.
pub fn predicted_ranges(x: &Vector2<f64>, anchors: &[PositionEstimate; 3]) -> Vector3<f64> {
    Vector3::from_fn(|i, _| (x[0] - anchors[i].x).hypot(x[1] - anchors[i].y))
}

/// Row `i` is `((x - x_i) / d_i, (y - y_i) / d_i)`.
pub fn range_jacobian(x: &Vector2<f64>, anchors: &[PositionEstimate; 3]) -> Matrix3x2<f64> {
    let mut h = Matrix3x2::zeros();
    for (i, anchor) in anchors.iter().enumerate() {
        let dx = x[0] - anchor.x;
        let dy = x[1] - anchor.y;
        let d = dx.hypot(dy).max(MIN_RANGE);
        h[(i, 0)] = dx / d;
        h[(i, 1)] = dy / d;
    }
    h
}
