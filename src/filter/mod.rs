//! Recursive RSSI filters.
//!
//! This module provides three per-anchor filter implementations:
//! - `KalmanTypeA` - Scalar Kalman filter correcting around the history mean
//! - `KalmanTypeB` - Scalar Kalman filter correcting around its previous output
//! - `FeedbackFilter` - Exponential alpha-blend smoother
//!
//! `AnchorFilterBank` holds one set of the three per anchor identifier.

mod traits;
mod kalman_a;
mod kalman_b;
mod feedback;
mod dispatch;
mod bank;

pub use traits::{AnchorFilterState, FeedbackSeed, FilterParams, FilterResult, RssiFilter};
pub use kalman_a::KalmanTypeA;
pub use kalman_b::KalmanTypeB;
pub use feedback::FeedbackFilter;
pub use dispatch::{FilterVariant, VariantReadings};
pub use bank::{AnchorFilterBank, AnchorFilters};
pub use crate::internal::history::RssiHistory;
