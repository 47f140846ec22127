//! # rssi-locate - Indoor positioning from Wi-Fi signal strength
//!
//! Estimates a device's 2D position from the RSSI of three fixed anchor access
//! points.
//!
//! ## Pipeline
//!
//! - Per-anchor recursive smoothing with three filters run side by side
//!   (two scalar Kalman variants and an exponential feedback filter)
//! - Log-distance path-loss model converting filtered RSSI to meters
//! - Closed-form three-circle trilateration
//! - Optional Kalman refinement of the position, with a linear position
//!   observation or a nonlinear range observation
//!
//! ## Example
//!
//! ```rust,ignore
//! use rssi_locate::{AnchorGeometry, MapBounds, Pipeline, PipelineConfig, Sample};
//!
//! let anchors = [
//!     AnchorGeometry::new("ap1", 0.0, 0.0),
//!     AnchorGeometry::new("ap2", 20.0, 0.0),
//!     AnchorGeometry::new("ap3", 0.0, 20.0),
//! ];
//! let config = PipelineConfig::new(anchors, MapBounds::new(0.0, 20.0, 0.0, 20.0));
//! let mut pipeline = Pipeline::new(config).unwrap();
//!
//! let samples = vec![
//!     Sample::new("ap1", -55.0, 0.0),
//!     Sample::new("ap2", -60.0, 0.0),
//!     Sample::new("ap3", -65.0, 0.0),
//! ];
//! let output = pipeline.process_cycle(&samples).unwrap();
//! println!("{:?}", output.position);
//! ```

// Internal numeric helpers
pub(crate) mod internal;

// Public modules
pub mod sample;
pub mod path_loss;
pub mod filter;
pub mod geometry;
pub mod trilateration;
pub mod ekf;
pub mod pipeline;

// Re-exports for convenience
pub use sample::{Sample, ScanMetadata, ScanRecord};
pub use path_loss::{PathLossModel, signal_level};
pub use filter::{
    AnchorFilterBank, AnchorFilterState, FeedbackSeed, FilterParams, FilterResult,
    FilterVariant, RssiFilter, VariantReadings,
};
pub use geometry::{AnchorGeometry, MapBounds, PositionEstimate};
pub use trilateration::{trilaterate, Trilaterator};
pub use ekf::{EkfConfig, EkfNoise, EkfObservation, EkfRefiner, EkfState};
pub use pipeline::{
    AnchorReport, CycleOutput, Pipeline, PipelineConfig, SessionState, Tunables, VariantDistances,
};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur in the positioning pipeline
    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum Error {
        #[error("Invalid parameter: {0}")]
        InvalidParameter(String),

        #[error("Singular anchor geometry: determinant {determinant:e} is below epsilon")]
        SingularGeometry { determinant: f64 },

        #[error("Singular covariance: innovation covariance is not positive-definite")]
        SingularCovariance,
    }

    /// Result type for positioning operations
    pub type Result<T> = std::result::Result<T, Error>;
}
