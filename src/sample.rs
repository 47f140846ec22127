//! Scan samples supplied by the collaborator layer.

use serde::{Deserialize, Serialize};

/// Optional scan details carried alongside a sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    /// Network name advertised by the access point.
    pub ssid: Option<String>,
    /// Security/capability string as reported by the scanner.
    pub capabilities: Option<String>,
    /// Channel frequency in MHz.
    pub frequency_mhz: Option<u32>,
}

/// One RSSI reading of one access point in one scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Access point identifier (typically the BSSID).
    pub anchor_id: String,
    /// Received signal strength in dBm.
    pub rssi_dbm: f64,
    /// Scan timestamp in seconds.
    pub timestamp: f64,
    #[serde(default)]
    pub metadata: ScanMetadata,
}

impl Sample {
    /// Create a sample without scan metadata.
    pub fn new(anchor_id: impl Into<String>, rssi_dbm: f64, timestamp: f64) -> Self {
        Self {
            anchor_id: anchor_id.into(),
            rssi_dbm,
            timestamp,
            metadata: ScanMetadata::default(),
        }
    }

    /// Attach scan metadata.
    pub fn with_metadata(mut self, metadata: ScanMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// An access point as seen in one cycle, tracked or not.
///
/// Every sample of a cycle produces one record so the caller can list nearby
/// access points; only the tracked anchors feed positioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub anchor_id: String,
    pub rssi_dbm: f64,
    pub timestamp: f64,
    pub metadata: ScanMetadata,
    /// Distance implied by the unfiltered RSSI.
    pub raw_distance: f64,
    /// Signal quality bucket, see [`crate::signal_level`].
    pub signal_level: u32,
    /// Whether this access point is one of the positioning anchors.
    pub tracked: bool,
}

/// Sort records strongest signal first.
pub fn sort_by_strength(records: &mut [ScanRecord]) {
    records.sort_by(|a, b| b.rssi_dbm.total_cmp(&a.rssi_dbm));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, rssi: f64) -> ScanRecord {
        ScanRecord {
            anchor_id: id.to_string(),
            rssi_dbm: rssi,
            timestamp: 0.0,
            metadata: ScanMetadata::default(),
            raw_distance: 1.0,
            signal_level: 0,
            tracked: false,
        }
    }

    #[test]
    fn test_sample_new() {
        let sample = Sample::new("b6:e6:2d:23:84:90", -61.0, 12.5);
        assert_eq!(sample.anchor_id, "b6:e6:2d:23:84:90");
        assert_eq!(sample.rssi_dbm, -61.0);
        assert_eq!(sample.metadata, ScanMetadata::default());
    }

    #[test]
    fn test_sample_with_metadata() {
        let sample = Sample::new("ap", -70.0, 0.0).with_metadata(ScanMetadata {
            ssid: Some("Cocowork".to_string()),
            capabilities: Some("[WPA2-PSK-CCMP][ESS]".to_string()),
            frequency_mhz: Some(2437),
        });
        assert_eq!(sample.metadata.ssid.as_deref(), Some("Cocowork"));
        assert_eq!(sample.metadata.frequency_mhz, Some(2437));
    }

    #[test]
    fn test_sort_by_strength() {
        let mut records = vec![record("a", -80.0), record("b", -40.0), record("c", -65.0)];
        sort_by_strength(&mut records);
        let order: Vec<&str> = records.iter().map(|r| r.anchor_id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }
}
