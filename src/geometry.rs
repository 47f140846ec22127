//! Anchor coordinates, position estimates and map bounds.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A 2D position in map units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionEstimate {
    pub x: f64,
    pub y: f64,
}

impl PositionEstimate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(&self, other: &PositionEstimate) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Round both coordinates to the nearest whole unit, halves away from zero.
    pub fn rounded(&self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A positioning anchor: an access point with known, fixed coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorGeometry {
    pub anchor_id: String,
    pub x: f64,
    pub y: f64,
}

impl AnchorGeometry {
    pub fn new(anchor_id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            anchor_id: anchor_id.into(),
            x,
            y,
        }
    }

    pub fn position(&self) -> PositionEstimate {
        PositionEstimate::new(self.x, self.y)
    }
}

/// Axis-aligned map rectangle used to clamp emitted positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl MapBounds {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let values = [self.min_x, self.max_x, self.min_y, self.max_y];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "map bounds must be finite, got {:?}",
                self
            )));
        }
        if self.min_x > self.max_x || self.min_y > self.max_y {
            return Err(Error::InvalidParameter(format!(
                "map bounds have min greater than max: {:?}",
                self
            )));
        }
        Ok(())
    }

    pub fn contains(&self, p: &PositionEstimate) -> bool {
        (self.min_x..=self.max_x).contains(&p.x) && (self.min_y..=self.max_y).contains(&p.y)
    }

    /// Clamp a position into the rectangle.
    pub fn clamp(&self, p: &PositionEstimate) -> PositionEstimate {
        PositionEstimate::new(
            p.x.clamp(self.min_x, self.max_x),
            p.y.clamp(self.min_y, self.max_y),
        )
    }
}
