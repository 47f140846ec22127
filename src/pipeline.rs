//! Scan-cycle orchestration: filter, range, trilaterate, refine, clamp.
//!
//! A [`Pipeline`] owns all state of one tracking session. Independent sessions
//! are independent `Pipeline` values; nothing is shared between them.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::ekf::{EkfConfig, EkfObservation, EkfRefiner, EkfState};
use crate::filter::{AnchorFilterBank, FeedbackSeed, FilterParams, FilterVariant, VariantReadings};
use crate::geometry::{AnchorGeometry, MapBounds, PositionEstimate};
use crate::path_loss::{signal_level, PathLossModel, DEFAULT_PATH_LOSS_EXPONENT, DEFAULT_REFERENCE_RSSI};
use crate::sample::{sort_by_strength, Sample, ScanRecord};
use crate::trilateration::{Trilaterator, DEFAULT_SINGULAR_EPSILON};
use crate::{Error, Result};

/// Number of signal bars reported per sample.
pub const SIGNAL_LEVELS: u32 = 4;

/// Default bound on each anchor's RSSI history.
pub const DEFAULT_HISTORY_WINDOW: usize = 256;

/// Tunables the caller may change between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// Path-loss exponent `n`, positive.
    pub path_loss_exponent: f64,
    /// Kalman noise `q`, positive.
    pub kalman_noise: f64,
    /// Feedback blend factor, within (0, 1).
    pub feedback_alpha: f64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            path_loss_exponent: DEFAULT_PATH_LOSS_EXPONENT,
            kalman_noise: 1.0,
            feedback_alpha: 0.5,
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// The three positioning anchors.
    pub anchors: [AnchorGeometry; 3],
    /// Emitted positions are clamped into these bounds.
    pub bounds: MapBounds,
    /// RSSI at 1 meter (dBm).
    #[serde(default = "default_reference_rssi")]
    pub reference_rssi: f64,
    #[serde(default)]
    pub tunables: Tunables,
    /// Variant whose output feeds trilateration.
    #[serde(default)]
    pub filter_variant: FilterVariant,
    /// Bound on each RSSI history; `None` keeps every reading.
    #[serde(default = "default_history_window")]
    pub history_window: Option<usize>,
    #[serde(default)]
    pub feedback_seed: FeedbackSeed,
    #[serde(default)]
    pub ekf_enabled: bool,
    #[serde(default)]
    pub ekf: EkfConfig,
    /// Trilateration determinant threshold.
    #[serde(default = "default_singular_epsilon")]
    pub singular_epsilon: f64,
    /// Round the position to whole map units before clamping.
    #[serde(default)]
    pub round_position: bool,
}

fn default_reference_rssi() -> f64 {
    DEFAULT_REFERENCE_RSSI
}

fn default_history_window() -> Option<usize> {
    Some(DEFAULT_HISTORY_WINDOW)
}

fn default_singular_epsilon() -> f64 {
    DEFAULT_SINGULAR_EPSILON
}

impl PipelineConfig {
    /// Configuration with default tunables and options.
    ///
    /// # Arguments
    /// * `anchors` - The three anchors, in the order distances are reported
    /// * `bounds` - Map rectangle positions are clamped to
    pub fn new(anchors: [AnchorGeometry; 3], bounds: MapBounds) -> Self {
        Self {
            anchors,
            bounds,
            reference_rssi: DEFAULT_REFERENCE_RSSI,
            tunables: Tunables::default(),
            filter_variant: FilterVariant::default(),
            history_window: default_history_window(),
            feedback_seed: FeedbackSeed::default(),
            ekf_enabled: false,
            ekf: EkfConfig::default(),
            singular_epsilon: DEFAULT_SINGULAR_EPSILON,
            round_position: false,
        }
    }

    /// Check every setting. Anchor collinearity is checked by [`Pipeline::new`].
    pub fn validate(&self) -> Result<()> {
        PathLossModel::new(self.reference_rssi, self.tunables.path_loss_exponent)?;
        self.filter_params().validate()?;
        self.bounds.validate()?;
        self.ekf.validate()?;

        if self.history_window == Some(0) {
            return Err(Error::InvalidParameter(
                "history window must hold at least one reading".to_string(),
            ));
        }
        if !(self.singular_epsilon.is_finite() && self.singular_epsilon >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "singular epsilon must be non-negative, got {}",
                self.singular_epsilon
            )));
        }
        for (i, anchor) in self.anchors.iter().enumerate() {
            if self.anchors[..i].iter().any(|a| a.anchor_id == anchor.anchor_id) {
                return Err(Error::InvalidParameter(format!(
                    "duplicate anchor id {:?}",
                    anchor.anchor_id
                )));
            }
        }
        Ok(())
    }

    /// Filter tunables for the current settings.
    pub fn filter_params(&self) -> FilterParams {
        FilterParams {
            kalman_noise: self.tunables.kalman_noise,
            feedback_alpha: self.tunables.feedback_alpha,
            feedback_seed: self.feedback_seed,
        }
    }

    fn is_tracked(&self, anchor_id: &str) -> bool {
        self.anchors.iter().any(|a| a.anchor_id == anchor_id)
    }
}

/// Distance implied by each variant's filtered RSSI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariantDistances {
    pub kalman_a: f64,
    pub kalman_b: f64,
    pub feedback: f64,
}

impl VariantDistances {
    fn from_readings(readings: &VariantReadings, model: &PathLossModel) -> Self {
        Self {
            kalman_a: model.distance(readings.kalman_a.filtered_rssi),
            kalman_b: model.distance(readings.kalman_b.filtered_rssi),
            feedback: model.distance(readings.feedback.filtered_rssi),
        }
    }

    pub fn get(&self, variant: FilterVariant) -> f64 {
        match variant {
            FilterVariant::KalmanA => self.kalman_a,
            FilterVariant::KalmanB => self.kalman_b,
            FilterVariant::Feedback => self.feedback,
        }
    }
}

/// Per-cycle output for one tracked anchor sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorReport {
    pub anchor_id: String,
    pub rssi_dbm: f64,
    pub timestamp: f64,
    /// Distance from the unfiltered RSSI.
    pub raw_distance: f64,
    pub signal_level: u32,
    /// Every variant's result, regardless of which one is selected.
    pub readings: VariantReadings,
    pub distances: VariantDistances,
}

/// Result of one scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleOutput {
    /// 1-based index of this cycle within the session.
    pub cycle: u64,
    pub variant: FilterVariant,
    /// Final position: refined if enabled, optionally rounded, clamped.
    /// `None` until all three anchors have reported.
    pub position: Option<PositionEstimate>,
    /// Closed-form trilateration result, before refinement and clamping.
    pub trilaterated: Option<PositionEstimate>,
    pub ekf_state: Option<EkfState>,
    /// Selected-variant distance per anchor, in anchor order.
    pub distances: Option<[f64; 3]>,
    pub anchors: Vec<AnchorReport>,
    /// Every sample of the cycle, strongest first.
    pub access_points: Vec<ScanRecord>,
}

/// Serializable session state, see [`Pipeline::snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub bank: AnchorFilterBank,
    pub ekf: Option<EkfState>,
    pub cycles: u64,
}

/// One positioning session.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    path_loss: PathLossModel,
    trilaterator: Trilaterator,
    bank: AnchorFilterBank,
    ekf: EkfRefiner,
    cycles: u64,
}

impl Pipeline {
    /// Start a session.
    ///
    /// Fails with `InvalidParameter` on a bad setting and `SingularGeometry`
    /// when the anchors are collinear or coincident.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let path_loss = PathLossModel::new(config.reference_rssi, config.tunables.path_loss_exponent)?;
        let trilaterator = Trilaterator::new(&config.anchors, config.singular_epsilon)?;
        let ekf = EkfRefiner::new(&config.ekf)?;

        Ok(Self {
            bank: AnchorFilterBank::new(config.history_window),
            config,
            path_loss,
            trilaterator,
            ekf,
            cycles: 0,
        })
    }

    /// Resume a session from a snapshot.
    pub fn restore(config: PipelineConfig, state: SessionState) -> Result<Self> {
        let mut pipeline = Self::new(config)?;
        if state.bank.history_window() != pipeline.config.history_window {
            return Err(Error::InvalidParameter(format!(
                "snapshot history window {:?} does not match configured {:?}",
                state.bank.history_window(),
                pipeline.config.history_window
            )));
        }
        if let Some(ekf) = &state.ekf {
            ekf.validate()?;
        }
        pipeline.bank = state.bank;
        pipeline.ekf = pipeline.ekf.with_state(state.ekf);
        pipeline.cycles = state.cycles;
        Ok(pipeline)
    }

    /// Copy of the session state.
    pub fn snapshot(&self) -> SessionState {
        SessionState {
            bank: self.bank.clone(),
            ekf: self.ekf.state().copied(),
            cycles: self.cycles,
        }
    }

    /// Drop all filter and EKF state, keeping the configuration.
    pub fn reset(&mut self) {
        self.bank = AnchorFilterBank::new(self.config.history_window);
        self.ekf.reset();
        self.cycles = 0;
    }

    /// Replace the tunables. Nothing changes if they are invalid.
    pub fn set_tunables(&mut self, tunables: Tunables) -> Result<()> {
        let mut config = self.config.clone();
        config.tunables = tunables;
        config.validate()?;
        self.path_loss = PathLossModel::new(config.reference_rssi, tunables.path_loss_exponent)?;
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tunables(&self) -> &Tunables {
        &self.config.tunables
    }

    pub fn path_loss(&self) -> &PathLossModel {
        &self.path_loss
    }

    pub fn bank(&self) -> &AnchorFilterBank {
        &self.bank
    }

    pub fn ekf_state(&self) -> Option<&EkfState> {
        self.ekf.state()
    }

    /// Number of cycles processed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Process one scan cycle.
    ///
    /// Every tracked sample advances its anchor's filters. Anchors without a
    /// sample this cycle keep their last readings. Until each anchor has
    /// reported once the output has no position.
    ///
    /// # Arguments
    /// * `samples` - All access points seen in this scan
    pub fn process_cycle(&mut self, samples: &[Sample]) -> Result<CycleOutput> {
        if let Some(bad) = samples.iter().find(|s| !s.rssi_dbm.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "RSSI for {:?} must be finite, got {}",
                bad.anchor_id, bad.rssi_dbm
            )));
        }
        if let Some(bad) = samples.iter().find(|s| !self.in_range(s.rssi_dbm)) {
            return Err(Error::InvalidParameter(format!(
                "RSSI for {:?} is out of range, got {}",
                bad.anchor_id, bad.rssi_dbm
            )));
        }

        let params = self.config.filter_params();
        let variant = self.config.filter_variant;
        let mut anchors = Vec::new();
        let mut access_points = Vec::with_capacity(samples.len());

        for sample in samples {
            let tracked = self.config.is_tracked(&sample.anchor_id);
            let raw_distance = self.path_loss.distance(sample.rssi_dbm);
            let level = signal_level(sample.rssi_dbm, SIGNAL_LEVELS);

            if tracked {
                let readings = self.bank.step(&sample.anchor_id, sample.rssi_dbm, &params);
                anchors.push(AnchorReport {
                    anchor_id: sample.anchor_id.clone(),
                    rssi_dbm: sample.rssi_dbm,
                    timestamp: sample.timestamp,
                    raw_distance,
                    signal_level: level,
                    distances: VariantDistances::from_readings(&readings, &self.path_loss),
                    readings,
                });
            } else {
                trace!(anchor = %sample.anchor_id, rssi = sample.rssi_dbm, "untracked access point");
            }

            access_points.push(ScanRecord {
                anchor_id: sample.anchor_id.clone(),
                rssi_dbm: sample.rssi_dbm,
                timestamp: sample.timestamp,
                metadata: sample.metadata.clone(),
                raw_distance,
                signal_level: level,
                tracked,
            });
        }
        sort_by_strength(&mut access_points);
        self.cycles += 1;

        let mut output = CycleOutput {
            cycle: self.cycles,
            variant,
            position: None,
            trilaterated: None,
            ekf_state: None,
            distances: None,
            anchors,
            access_points,
        };

        let Some(distances) = self.selected_distances(variant) else {
            debug!(cycle = self.cycles, reported = self.bank.len(), "waiting for all anchors");
            return Ok(output);
        };

        let trilaterated = self.trilaterator.solve(distances).map_err(|e| {
            warn!(cycle = self.cycles, error = %e, "trilateration rejected");
            e
        })?;

        let mut estimate = trilaterated;
        if self.config.ekf_enabled {
            let refined = match self.config.ekf.observation {
                EkfObservation::Position => self.ekf.refine(&trilaterated),
                EkfObservation::Ranges => {
                    let anchors = *self.trilaterator.anchors();
                    self.ekf.refine_ranges(&anchors, distances, &trilaterated)
                }
            };
            let state = refined.map_err(|e| {
                warn!(cycle = self.cycles, error = %e, "ekf refinement rejected");
                e
            })?;
            estimate = state.position();
            output.ekf_state = Some(state);
        }

        if self.config.round_position {
            estimate = estimate.rounded();
        }
        let position = self.config.bounds.clamp(&estimate);

        debug!(
            cycle = self.cycles,
            variant = %variant,
            x = position.x,
            y = position.y,
            "position estimate"
        );

        output.position = Some(position);
        output.trilaterated = Some(trilaterated);
        output.distances = Some(distances);
        Ok(output)
    }

    /// Whether `rssi` maps to a distance whose square is still finite.
    fn in_range(&self, rssi: f64) -> bool {
        let d = self.path_loss.distance(rssi);
        (d * d).is_finite()
    }

    /// Selected-variant distances from each anchor's last readings.
    fn selected_distances(&self, variant: FilterVariant) -> Option<[f64; 3]> {
        let mut distances = [0.0; 3];
        for (slot, anchor) in distances.iter_mut().zip(self.config.anchors.iter()) {
            let readings = self.bank.last_readings(&anchor.anchor_id)?;
            *slot = self.path_loss.distance(readings.filtered_rssi(variant));
        }
        Some(distances)
    }
}
