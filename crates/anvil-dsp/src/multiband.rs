//! Three-band multiband compressor
//!
//! LR4 crossovers split each channel at 250 Hz and 2 kHz; each band runs a
//! feed-forward peak compressor with band-appropriate attack/release.
//! Summing the compressed bands is phase-consistent because the LR4 sum is
//! allpass. One compressor instance per band serves both channels: the
//! envelope sees left then right within each frame, coupling the channels.

use anvil_core::Sample;

use crate::crossover::ThreeBandCrossover;
use crate::dynamics::BandCompressor;
use crate::{MonoProcessor, Processor, ProcessorConfig, StereoProcessor};

/// Crossover points in Hz
const LOW_MID_FREQ: f64 = 250.0;
const MID_HIGH_FREQ: f64 = 2000.0;

/// Per-band attack/release in seconds
const LOW_ATTACK: f64 = 0.010;
const LOW_RELEASE: f64 = 0.100;
const MID_ATTACK: f64 = 0.005;
const MID_RELEASE: f64 = 0.080;
const HIGH_ATTACK: f64 = 0.003;
const HIGH_RELEASE: f64 = 0.050;

/// Three-band feed-forward multiband compressor
#[derive(Debug, Clone)]
pub struct MultibandCompressor {
    crossover_l: ThreeBandCrossover,
    crossover_r: ThreeBandCrossover,
    low: BandCompressor,
    mid: BandCompressor,
    high: BandCompressor,
    enabled: bool,
}

impl MultibandCompressor {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            crossover_l: ThreeBandCrossover::new(LOW_MID_FREQ, MID_HIGH_FREQ, sample_rate),
            crossover_r: ThreeBandCrossover::new(LOW_MID_FREQ, MID_HIGH_FREQ, sample_rate),
            low: BandCompressor::new(LOW_ATTACK, LOW_RELEASE, sample_rate),
            mid: BandCompressor::new(MID_ATTACK, MID_RELEASE, sample_rate),
            high: BandCompressor::new(HIGH_ATTACK, HIGH_RELEASE, sample_rate),
            enabled: false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_low_band(&mut self, threshold_db: f64, ratio: f64) {
        self.low.set_threshold(threshold_db);
        self.low.set_ratio(ratio);
    }

    pub fn set_mid_band(&mut self, threshold_db: f64, ratio: f64) {
        self.mid.set_threshold(threshold_db);
        self.mid.set_ratio(ratio);
    }

    pub fn set_high_band(&mut self, threshold_db: f64, ratio: f64) {
        self.high.set_threshold(threshold_db);
        self.high.set_ratio(ratio);
    }
}

impl Processor for MultibandCompressor {
    fn reset(&mut self) {
        self.crossover_l.reset();
        self.crossover_r.reset();
        self.low.reset();
        self.mid.reset();
        self.high.reset();
    }
}

impl StereoProcessor for MultibandCompressor {
    #[inline]
    fn process_sample(&mut self, left: Sample, right: Sample) -> (Sample, Sample) {
        if !self.enabled {
            return (left, right);
        }

        let (low_l, mid_l, high_l) = self.crossover_l.process(left);
        let (low_r, mid_r, high_r) = self.crossover_r.process(right);

        let low_l = self.low.process_sample(low_l);
        let low_r = self.low.process_sample(low_r);
        let mid_l = self.mid.process_sample(mid_l);
        let mid_r = self.mid.process_sample(mid_r);
        let high_l = self.high.process_sample(high_l);
        let high_r = self.high.process_sample(high_r);

        (low_l + mid_l + high_l, low_r + mid_r + high_r)
    }
}

impl ProcessorConfig for MultibandCompressor {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.crossover_l.set_sample_rate(sample_rate);
        self.crossover_r.set_sample_rate(sample_rate);
        self.low.set_attack(LOW_ATTACK, sample_rate);
        self.low.set_release(LOW_RELEASE, sample_rate);
        self.mid.set_attack(MID_ATTACK, sample_rate);
        self.mid.set_release(MID_RELEASE, sample_rate);
        self.high.set_attack(HIGH_ATTACK, sample_rate);
        self.high.set_release(HIGH_RELEASE, sample_rate);
    }
}
