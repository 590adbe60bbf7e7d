//! Stereo field processing
//!
//! Frequency-dependent width control built on the mid/side transform:
//! bass is forced mono for punch and vinyl/club compatibility, the mid
//! band gets half the width amount, the top band the full amount. Bands
//! come from LR4 crossovers so the recombined signal stays phase-coherent.
//!
//! Also provides the standalone mono-bass utility: an LR4 lowpass with
//! `high = input - low` perfect reconstruction, mono below the crossover.

use anvil_core::{Sample, StereoSample};

use crate::crossover::ThreeBandCrossover;
use crate::smoothing::ParamSmoother;
use crate::svf::{FilterType, Svf};
use crate::{MonoProcessor, Processor, ProcessorConfig, StereoProcessor};

/// Width smoothing time
const WIDTH_SMOOTH_MS: f64 = 50.0;

/// Imager band split points in Hz
const LOW_MID_FREQ: f64 = 250.0;
const MID_HIGH_FREQ: f64 = 2000.0;

/// Frequency-dependent stereo widener with mono bass
#[derive(Debug, Clone)]
pub struct StereoImager {
    crossover_l: ThreeBandCrossover,
    crossover_r: ThreeBandCrossover,
    width_smoother: ParamSmoother,
}

impl StereoImager {
    pub fn new(sample_rate: f64) -> Self {
        let mut width_smoother = ParamSmoother::new(WIDTH_SMOOTH_MS, sample_rate);
        width_smoother.set_immediate(1.0);
        Self {
            crossover_l: ThreeBandCrossover::new(LOW_MID_FREQ, MID_HIGH_FREQ, sample_rate),
            crossover_r: ThreeBandCrossover::new(LOW_MID_FREQ, MID_HIGH_FREQ, sample_rate),
            width_smoother,
        }
    }

    /// Set stereo width: 0 collapses to mono, 1 is neutral, 2 is double
    pub fn set_width(&mut self, width: f64) {
        self.width_smoother.set_target(width.clamp(0.0, 2.0));
    }

    pub fn width_target(&self) -> f64 {
        self.width_smoother.target()
    }
}

impl Processor for StereoImager {
    fn reset(&mut self) {
        self.crossover_l.reset();
        self.crossover_r.reset();
    }
}

impl StereoProcessor for StereoImager {
    #[inline]
    fn process_sample(&mut self, left: Sample, right: Sample) -> (Sample, Sample) {
        let width = self.width_smoother.next();

        let (low_l, mid_l, high_l) = self.crossover_l.process(left);
        let (low_r, mid_r, high_r) = self.crossover_r.process(right);

        // Bass: forced mono
        let low_mono = (low_l + low_r) * 0.5;

        // Mids: half the width amount
        let mut mid = StereoSample::new(mid_l, mid_r).to_mid_side();
        mid.side *= 0.5 * width;
        let mid = mid.to_stereo();

        // Highs: full width amount
        let mut high = StereoSample::new(high_l, high_r).to_mid_side();
        high.side *= width;
        let high = high.to_stereo();

        (
            low_mono + mid.left + high.left,
            low_mono + mid.right + high.right,
        )
    }
}

impl ProcessorConfig for StereoImager {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.crossover_l.set_sample_rate(sample_rate);
        self.crossover_r.set_sample_rate(sample_rate);
        self.width_smoother
            .set_smooth_time(WIDTH_SMOOTH_MS, sample_rate);
    }
}

/// Mono-bass crossover utility
///
/// LR4 lowpass per channel; low bands are summed to mono and the stereo
/// remainder is recovered as `input - low`, so an already-mono signal
/// passes through bit-exactly.
#[derive(Debug, Clone)]
pub struct MonoBassFilter {
    lowpass_l: [Svf; 2],
    lowpass_r: [Svf; 2],
    freq: f64,
    sample_rate: f64,
}

/// Allowed crossover range in Hz
const MONO_BASS_MIN_FREQ: f64 = 80.0;
const MONO_BASS_MAX_FREQ: f64 = 200.0;

/// Default crossover in Hz
pub const MONO_BASS_DEFAULT_FREQ: f64 = 140.0;

impl MonoBassFilter {
    pub fn new(sample_rate: f64) -> Self {
        Self::with_frequency(MONO_BASS_DEFAULT_FREQ, sample_rate)
    }

    pub fn with_frequency(freq: f64, sample_rate: f64) -> Self {
        let mut filter = Self {
            lowpass_l: std::array::from_fn(|_| Svf::new(sample_rate)),
            lowpass_r: std::array::from_fn(|_| Svf::new(sample_rate)),
            freq: freq.clamp(MONO_BASS_MIN_FREQ, MONO_BASS_MAX_FREQ),
            sample_rate,
        };
        filter.update_coefficients();
        filter
    }

    pub fn set_crossover_frequency(&mut self, freq: f64) {
        self.freq = freq.clamp(MONO_BASS_MIN_FREQ, MONO_BASS_MAX_FREQ);
        self.update_coefficients();
    }

    pub fn crossover_frequency(&self) -> f64 {
        self.freq
    }

    fn update_coefficients(&mut self) {
        for stage in self.lowpass_l.iter_mut().chain(self.lowpass_r.iter_mut()) {
            stage.set_sample_rate(self.sample_rate);
            stage.set(self.freq, 0.707, 0.0, FilterType::Lowpass);
        }
    }
}

impl Processor for MonoBassFilter {
    fn reset(&mut self) {
        for stage in self.lowpass_l.iter_mut().chain(self.lowpass_r.iter_mut()) {
            stage.reset();
        }
    }
}

impl StereoProcessor for MonoBassFilter {
    #[inline]
    fn process_sample(&mut self, left: Sample, right: Sample) -> (Sample, Sample) {
        let low_l_stage0 = self.lowpass_l[0].process_sample(left);
        let low_l = self.lowpass_l[1].process_sample(low_l_stage0);
        let low_r_stage0 = self.lowpass_r[0].process_sample(right);
        let low_r = self.lowpass_r[1].process_sample(low_r_stage0);

        let mono_low = (low_l + low_r) * 0.5;

        // Perfect reconstruction: high = input - low
        let high_l = left - low_l;
        let high_r = right - low_r;

        (high_l + mono_low, high_r + mono_low)
    }
}

impl ProcessorConfig for MonoBassFilter {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }
}
