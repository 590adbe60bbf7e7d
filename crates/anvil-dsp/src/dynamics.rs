//! Dynamics processors
//!
//! Feed-forward peak compression with per-band attack/release, and the
//! de-esser: a band-keyed compressor whose sibilance detector drives
//! broadband gain reduction.

use anvil_core::{Sample, db_to_linear, linear_to_db};

use crate::svf::{FilterType, Svf};
use crate::{MonoProcessor, Processor, ProcessorConfig};

/// Feed-forward peak compressor for one frequency band
///
/// The envelope follows the *target gain*, not the signal: attack engages
/// when the target drops below the envelope (the signal got louder),
/// release otherwise.
#[derive(Debug, Clone)]
pub struct BandCompressor {
    threshold_db: f64,
    ratio: f64,
    attack_coeff: f64,
    release_coeff: f64,
    envelope: f64,
}

impl BandCompressor {
    pub fn new(attack_sec: f64, release_sec: f64, sample_rate: f64) -> Self {
        let mut comp = Self {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope: 0.0,
        };
        comp.set_attack(attack_sec, sample_rate);
        comp.set_release(release_sec, sample_rate);
        comp
    }

    pub fn set_threshold(&mut self, threshold_db: f64) {
        self.threshold_db = threshold_db;
    }

    pub fn set_ratio(&mut self, ratio: f64) {
        self.ratio = ratio;
    }

    pub fn set_attack(&mut self, attack_sec: f64, sample_rate: f64) {
        self.attack_coeff = (-1.0 / (attack_sec * sample_rate)).exp();
    }

    pub fn set_release(&mut self, release_sec: f64, sample_rate: f64) {
        self.release_coeff = (-1.0 / (release_sec * sample_rate)).exp();
    }

    pub fn gain_reduction_db(&self) -> f64 {
        linear_to_db(self.envelope)
    }
}

impl Processor for BandCompressor {
    fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

impl MonoProcessor for BandCompressor {
    #[inline(always)]
    fn process_sample(&mut self, input: Sample) -> Sample {
        let input_db = linear_to_db(input.abs());

        let mut reduction_db = 0.0;
        if input_db > self.threshold_db {
            reduction_db = (input_db - self.threshold_db) * (1.0 - 1.0 / self.ratio);
        }
        let target_gain = db_to_linear(-reduction_db);

        let coeff = if target_gain < self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = target_gain + coeff * (self.envelope - target_gain);

        input * self.envelope
    }
}

/// De-esser: broadband ducking keyed to the sibilance band
///
/// A 10 kHz Q=2 bandpass detects sibilant energy; the resulting gain is
/// applied to the full-band signal.
#[derive(Debug, Clone)]
pub struct DeEsser {
    detector: Svf,
    threshold_db: f64,
    ratio: f64,
    attack_coeff: f64,
    release_coeff: f64,
    envelope: f64,
    enabled: bool,
}

/// Sibilance detector centre frequency and Q
const DETECTOR_FREQ: f64 = 10000.0;
const DETECTOR_Q: f64 = 2.0;

/// Detector envelope times in seconds
const DEESSER_ATTACK: f64 = 0.001;
const DEESSER_RELEASE: f64 = 0.02;

impl DeEsser {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            detector: Svf::with_role(
                DETECTOR_FREQ,
                DETECTOR_Q,
                0.0,
                FilterType::Bandpass,
                sample_rate,
            ),
            threshold_db: -20.0,
            ratio: 4.0,
            attack_coeff: (-1.0 / (DEESSER_ATTACK * sample_rate)).exp(),
            release_coeff: (-1.0 / (DEESSER_RELEASE * sample_rate)).exp(),
            envelope: 1.0,
            enabled: false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_threshold(&mut self, threshold_db: f64) {
        self.threshold_db = threshold_db;
    }

    /// Ratio is clamped to 1..10
    pub fn set_ratio(&mut self, ratio: f64) {
        self.ratio = ratio.clamp(1.0, 10.0);
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Current gain applied to the signal, in dB (0 = no reduction)
    pub fn gain_reduction_db(&self) -> f64 {
        linear_to_db(self.envelope)
    }
}

impl Processor for DeEsser {
    fn reset(&mut self) {
        self.detector.reset();
        self.envelope = 1.0;
    }
}

impl MonoProcessor for DeEsser {
    #[inline]
    fn process_sample(&mut self, input: Sample) -> Sample {
        if !self.enabled {
            return input;
        }

        let sibilance = self.detector.process_sample(input);
        let sibilance_db = linear_to_db(sibilance.abs());

        let mut reduction_db = 0.0;
        if sibilance_db > self.threshold_db {
            reduction_db = (sibilance_db - self.threshold_db) * (1.0 - 1.0 / self.ratio);
        }
        let target_gain = db_to_linear(-reduction_db);

        let coeff = if target_gain < self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = target_gain + coeff * (self.envelope - target_gain);

        input * self.envelope
    }
}

impl ProcessorConfig for DeEsser {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.detector.set_sample_rate(sample_rate);
        self.detector
            .set(DETECTOR_FREQ, DETECTOR_Q, 0.0, FilterType::Bandpass);
        self.attack_coeff = (-1.0 / (DEESSER_ATTACK * sample_rate)).exp();
        self.release_coeff = (-1.0 / (DEESSER_RELEASE * sample_rate)).exp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const SAMPLE_RATE: f64 = 48000.0;

    #[test]
    fn test_compressor_static_curve() {
        // Constant 0.5 input, threshold -20 dB, ratio 4:
        // reduction = (−6.02 − (−20)) · 0.75 ≈ 10.48 dB
        let mut comp = BandCompressor::new(0.001, 0.01, SAMPLE_RATE);
        let mut output = 0.0;
        for _ in 0..48000 {
            output = comp.process_sample(0.5);
        }
        let expected = 0.5 * db_to_linear(-(linear_to_db(0.5) + 20.0) * 0.75);
        assert!(
            (output - expected).abs() < 0.02 * expected,
            "got {output}, expected {expected}"
        );
    }

    #[test]
    fn test_compressor_below_threshold_is_unity() {
        let mut comp = BandCompressor::new(0.001, 0.01, SAMPLE_RATE);
        comp.set_threshold(-6.0);
        let mut output = 0.0;
        for _ in 0..48000 {
            output = comp.process_sample(0.25);
        }
        // -12 dB input under a -6 dB threshold: envelope settles at unity
        assert!((output - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_attack_faster_than_release() {
        let mut comp = BandCompressor::new(0.001, 0.2, SAMPLE_RATE);
        // Let the envelope settle at unity on quiet input
        for _ in 0..96000 {
            comp.process_sample(0.01);
        }
        // Hot input engages within a few ms
        for _ in 0..480 {
            comp.process_sample(0.9);
        }
        let engaged = comp.gain_reduction_db();
        assert!(engaged < -3.0, "attack should engage quickly: {engaged}");

        // Back to quiet: 10 ms into a 200 ms release little has recovered
        for _ in 0..480 {
            comp.process_sample(0.01);
        }
        let recovering = comp.gain_reduction_db();
        assert!(recovering < -2.0, "release should be slow: {recovering}");
    }

    #[test]
    fn test_deesser_disabled_is_transparent() {
        let mut deesser = DeEsser::new(SAMPLE_RATE);
        for i in 0..1000 {
            let x = (i as f64 * 0.5).sin();
            assert_eq!(deesser.process_sample(x), x);
        }
    }

    #[test]
    fn test_deesser_ducks_sibilance() {
        let mut deesser = DeEsser::new(SAMPLE_RATE);
        deesser.set_enabled(true);
        deesser.set_threshold(-30.0);

        // Hot 10 kHz content looks like sibilance
        let mut output_peak: f64 = 0.0;
        for i in 0..48000 {
            let x = (2.0 * PI * 10000.0 * i as f64 / SAMPLE_RATE).sin() * 0.8;
            let y = deesser.process_sample(x);
            if i > 24000 {
                output_peak = output_peak.max(y.abs());
            }
        }
        assert!(
            output_peak < 0.5,
            "sibilance should be reduced, peak {output_peak}"
        );
        assert!(deesser.gain_reduction_db() < -3.0);
    }

    #[test]
    fn test_deesser_leaves_low_content_alone() {
        let mut deesser = DeEsser::new(SAMPLE_RATE);
        deesser.set_enabled(true);

        let mut output_peak: f64 = 0.0;
        for i in 0..48000 {
            let x = (2.0 * PI * 200.0 * i as f64 / SAMPLE_RATE).sin() * 0.8;
            let y = deesser.process_sample(x);
            if i > 24000 {
                output_peak = output_peak.max(y.abs());
            }
        }
        assert!(
            (output_peak - 0.8).abs() < 0.05,
            "low content should pass, peak {output_peak}"
        );
    }

    #[test]
    fn test_ratio_clamp() {
        let mut deesser = DeEsser::new(SAMPLE_RATE);
        deesser.set_ratio(50.0);
        assert_eq!(deesser.ratio(), 10.0);
        deesser.set_ratio(0.2);
        assert_eq!(deesser.ratio(), 1.0);
    }
}
