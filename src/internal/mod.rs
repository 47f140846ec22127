//! Internal numeric helpers.
//!
//! - history: bounded RSSI history with population statistics
//! - kalman: linear Kalman predict/correct core

pub mod history;
pub mod kalman;
