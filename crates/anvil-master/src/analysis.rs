//! Mix-health analysis and crest-driven auto-mastering
//!
//! Both are evaluated once per correlation window: the health analyser
//! snapshots clipping/phase/loudness rules into a report, and the
//! auto-master policy picks multiband settings from the current crest
//! factor (dynamic material gets compressed harder; already-dense
//! material is left alone).

use serde::{Deserialize, Serialize};

/// Loudness verdict for the health report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoudnessVerdict {
    /// Integrated loudness below -30 LUFS
    WayTooQuiet,
    /// Below -20 LUFS
    TooQuiet,
    /// Between -20 and -10 LUFS
    Ok,
    /// Above -10 LUFS
    TooLoud,
    /// Above -8 LUFS
    WayTooLoud,
}

impl LoudnessVerdict {
    /// Classify an integrated loudness reading
    pub fn from_lufs(lufs: f64) -> Self {
        if lufs < -30.0 {
            LoudnessVerdict::WayTooQuiet
        } else if lufs < -20.0 {
            LoudnessVerdict::TooQuiet
        } else if lufs > -8.0 {
            LoudnessVerdict::WayTooLoud
        } else if lufs > -10.0 {
            LoudnessVerdict::TooLoud
        } else {
            LoudnessVerdict::Ok
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            LoudnessVerdict::WayTooQuiet => "Way Too Quiet",
            LoudnessVerdict::TooQuiet => "Too Quiet",
            LoudnessVerdict::Ok => "OK",
            LoudnessVerdict::TooLoud => "Too Loud",
            LoudnessVerdict::WayTooLoud => "Way Too Loud",
        }
    }
}

/// Snapshot of mix health, refreshed once per correlation window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixHealthReport {
    /// Peak within 0.1 dB of full scale
    pub clipping_detected: bool,
    /// Channels decorrelated (|correlation| < 0.3)
    pub phase_issues: bool,
    /// Loudness classification
    pub loudness_verdict: LoudnessVerdict,
    /// Peak level in dB at snapshot time
    pub peak_db: f64,
    /// Phase correlation at snapshot time
    pub phase_correlation: f64,
    /// Integrated loudness at snapshot time
    pub integrated_lufs: f64,
}

impl Default for MixHealthReport {
    fn default() -> Self {
        Self {
            clipping_detected: false,
            phase_issues: false,
            loudness_verdict: LoudnessVerdict::Ok,
            peak_db: -200.0,
            phase_correlation: 0.0,
            integrated_lufs: -70.0,
        }
    }
}

/// Rule-based mix health analyser
#[derive(Debug, Clone, Default)]
pub struct MixHealthAnalyzer {
    report: MixHealthReport,
}

impl MixHealthAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-evaluate the rule set against fresh meter readings
    pub fn analyze(&mut self, peak_db: f64, phase_correlation: f64, integrated_lufs: f64) {
        self.report = MixHealthReport {
            clipping_detected: peak_db >= -0.1,
            phase_issues: phase_correlation.abs() < 0.3,
            loudness_verdict: LoudnessVerdict::from_lufs(integrated_lufs),
            peak_db,
            phase_correlation,
            integrated_lufs,
        };
    }

    pub fn report(&self) -> &MixHealthReport {
        &self.report
    }
}

/// Threshold/ratio pair for one multiband band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandSetting {
    pub threshold_db: f64,
    pub ratio: f64,
}

impl BandSetting {
    pub const fn new(threshold_db: f64, ratio: f64) -> Self {
        Self { threshold_db, ratio }
    }
}

/// Multiband settings chosen by the auto-master policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultibandPolicy {
    pub low: BandSetting,
    pub mid: BandSetting,
    pub high: BandSetting,
}

/// Crest-factor-driven multiband policy
///
/// High crest factor means dynamic, uncompressed material; the policy
/// answers with progressively gentler settings as the crest factor falls,
/// and `None` (multiband off) once the material is already dense.
pub fn multiband_policy_for_crest(crest_db: f64) -> Option<MultibandPolicy> {
    if crest_db > 15.0 {
        Some(MultibandPolicy {
            low: BandSetting::new(-24.0, 3.0),
            mid: BandSetting::new(-20.0, 3.5),
            high: BandSetting::new(-18.0, 4.0),
        })
    } else if crest_db > 12.0 {
        Some(MultibandPolicy {
            low: BandSetting::new(-20.0, 2.5),
            mid: BandSetting::new(-18.0, 3.0),
            high: BandSetting::new(-16.0, 3.5),
        })
    } else if crest_db > 8.0 {
        Some(MultibandPolicy {
            low: BandSetting::new(-18.0, 2.0),
            mid: BandSetting::new(-16.0, 2.0),
            high: BandSetting::new(-14.0, 2.5),
        })
    } else {
        None
    }
}
