//! SoundAnvil Mastering Engine
//!
//! Real-time stereo mastering: ingest 64-bit float stereo, emit a
//! loudness-metered, peak-safe stream ready for broadcast or encoding.
//!
//! ## Features
//! - **Seven-band EQ**: ZDF filters, analog-accurate up to Nyquist
//! - **De-essing**: band-keyed broadband sibilance control
//! - **Stereo imaging**: frequency-dependent width with mono bass
//! - **Multiband dynamics**: LR4 crossovers, per-band attack/release
//! - **Analog saturation**: soft clipping with DC compensation
//! - **True-peak limiting**: 4x oversampled, 50 ms look-ahead, safe-clip mode
//! - **Dithering**: seeded TPDF for deterministic renders
//! - **Metering**: EBU R128 loudness, LRA, crest factor, phase correlation
//! - **Auto-mastering**: crest-factor-driven multiband policy
//!
//! ## Usage
//!
//! ```rust
//! use anvil_master::MasteringEngine;
//!
//! let mut engine = MasteringEngine::new(48000.0);
//! engine.set_limiter_threshold(-1.0);
//! engine.set_eq_gain(0, 2.0);
//!
//! let (mut left, mut right) = (0.25, 0.25);
//! engine.process_stereo(&mut left, &mut right);
//! let loudness = engine.integrated_lufs();
//! # let _ = loudness;
//! ```

pub mod analysis;
pub mod chain;
pub mod limiter;

mod error;

pub use analysis::{BandSetting, LoudnessVerdict, MixHealthAnalyzer, MixHealthReport};
pub use chain::MasteringEngine;
pub use error::{MasterError, MasterResult};
pub use limiter::TruePeakLimiter;

use anvil_dsp::eq::EQ_BANDS;
use serde::{Deserialize, Serialize};

/// Full parameter snapshot for the engine
///
/// A plain-data mirror of every setter, serialisable for session storage.
/// Applied through `MasteringEngine::apply_config`, so all the usual
/// clamping and smoothing behaviour holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// DC offset filter on/off
    pub dc_filter_enabled: bool,
    /// Input trim in dB
    pub input_gain_db: f64,
    /// Per-band EQ gains in dB
    pub eq_gains_db: [f64; EQ_BANDS],
    /// De-esser on/off
    pub deesser_enabled: bool,
    /// De-esser threshold in dB
    pub deesser_threshold_db: f64,
    /// De-esser ratio (1..10)
    pub deesser_ratio: f64,
    /// Multiband compressor on/off
    pub multiband_enabled: bool,
    /// Low band (<= 250 Hz) settings
    pub multiband_low: BandSetting,
    /// Mid band (250 Hz - 2 kHz) settings
    pub multiband_mid: BandSetting,
    /// High band (>= 2 kHz) settings
    pub multiband_high: BandSetting,
    /// Stereo width (0..2)
    pub stereo_width: f64,
    /// Saturation drive (1..4)
    pub saturation_drive: f64,
    /// Saturation dry/wet mix (0..1)
    pub saturation_mix: f64,
    /// Limiter threshold in dBTP
    pub limiter_threshold_db: f64,
    /// Limiter release in seconds
    pub limiter_release_sec: f64,
    /// Hard-clip mode instead of envelope limiting
    pub limiter_safe_clip: bool,
    /// Dithering on/off
    pub dither_enabled: bool,
    /// Dither target bit depth (8..24)
    pub dither_bits: u32,
    /// Crest-driven auto-mastering on/off
    pub ai_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dc_filter_enabled: true,
            input_gain_db: 0.0,
            eq_gains_db: [0.0; EQ_BANDS],
            deesser_enabled: false,
            deesser_threshold_db: -20.0,
            deesser_ratio: 4.0,
            multiband_enabled: false,
            multiband_low: BandSetting::new(-20.0, 4.0),
            multiband_mid: BandSetting::new(-20.0, 4.0),
            multiband_high: BandSetting::new(-20.0, 4.0),
            stereo_width: 1.0,
            saturation_drive: 1.0,
            saturation_mix: 0.5,
            limiter_threshold_db: -1.0,
            limiter_release_sec: 0.05,
            limiter_safe_clip: false,
            dither_enabled: false,
            dither_bits: 16,
            ai_enabled: false,
        }
    }
}

/// Delivery-oriented starting points
///
/// Each preset is an `EngineConfig`; nothing here is adaptive, the
/// crest-driven policy stays separate behind `set_ai_enabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MasteringPreset {
    /// Balanced settings for mixed material
    Universal,
    /// Bass weight, gentle top, moderate glue
    HipHop,
    /// Wide image, aggressive multiband, hot ceiling
    Edm,
    /// Speech-safe: de-essing on, conservative image and ceiling
    Broadcast,
}

impl MasteringPreset {
    /// The parameter snapshot this preset stands for
    pub fn config(&self) -> EngineConfig {
        match self {
            MasteringPreset::Universal => EngineConfig {
                eq_gains_db: [1.0, 0.5, 0.0, 0.0, 0.5, 1.0, 1.5],
                multiband_enabled: true,
                multiband_low: BandSetting::new(-18.0, 2.0),
                multiband_mid: BandSetting::new(-16.0, 2.0),
                multiband_high: BandSetting::new(-14.0, 2.5),
                stereo_width: 1.1,
                saturation_drive: 1.5,
                saturation_mix: 0.3,
                ..EngineConfig::default()
            },
            MasteringPreset::HipHop => EngineConfig {
                eq_gains_db: [3.0, 2.0, 0.5, 0.0, 0.5, 1.0, 1.0],
                multiband_enabled: true,
                multiband_low: BandSetting::new(-20.0, 2.5),
                multiband_mid: BandSetting::new(-18.0, 3.0),
                multiband_high: BandSetting::new(-16.0, 3.5),
                saturation_drive: 2.0,
                saturation_mix: 0.4,
                ..EngineConfig::default()
            },
            MasteringPreset::Edm => EngineConfig {
                eq_gains_db: [2.5, 1.5, 0.0, 0.5, 1.0, 2.0, 2.5],
                multiband_enabled: true,
                multiband_low: BandSetting::new(-24.0, 3.0),
                multiband_mid: BandSetting::new(-20.0, 3.5),
                multiband_high: BandSetting::new(-18.0, 4.0),
                stereo_width: 1.3,
                saturation_drive: 2.5,
                saturation_mix: 0.5,
                limiter_threshold_db: -0.5,
                limiter_safe_clip: true,
                ..EngineConfig::default()
            },
            MasteringPreset::Broadcast => EngineConfig {
                deesser_enabled: true,
                deesser_threshold_db: -24.0,
                deesser_ratio: 4.0,
                stereo_width: 0.9,
                saturation_mix: 0.0,
                limiter_threshold_db: -1.0,
                ..EngineConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_matches_engine_defaults() {
        let config = EngineConfig::default();
        assert!(config.dc_filter_enabled);
        assert_eq!(config.stereo_width, 1.0);
        assert_eq!(config.limiter_threshold_db, -1.0);
        assert!(!config.multiband_enabled);
        assert!(!config.dither_enabled);
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = MasteringPreset::Edm.config();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_preset_character() {
        // Hip-hop carries more low end than universal
        let hiphop = MasteringPreset::HipHop.config();
        let universal = MasteringPreset::Universal.config();
        assert!(hiphop.eq_gains_db[0] > universal.eq_gains_db[0]);

        // EDM is the widest and the only safe-clip preset
        let edm = MasteringPreset::Edm.config();
        assert!(edm.stereo_width > universal.stereo_width);
        assert!(edm.limiter_safe_clip);

        // Broadcast keeps speech honest
        let broadcast = MasteringPreset::Broadcast.config();
        assert!(broadcast.deesser_enabled);
        assert!(broadcast.stereo_width < 1.0);
    }

    #[test]
    fn test_with_config_applies_preset() {
        let engine = MasteringEngine::with_config(48000.0, &MasteringPreset::Universal.config());
        assert_eq!(engine.latency_samples(), 2400);
    }
}
