//! Analog-style saturation
//!
//! A rational tanh approximation drives the soft clipper; it is exact
//! enough through +/-3 and hard-limits beyond. The saturator follows
//! `tanh(x * drive) / drive` with a one-pole DC blocker on the wet path,
//! since tanh generates a small DC term under asymmetric input.

use anvil_core::Sample;

use crate::smoothing::ParamSmoother;
use crate::svf::{FilterType, Svf};
use crate::{MonoProcessor, Processor, ProcessorConfig};

/// Rational tanh approximation, clamped to +/-1 outside |x| > 3
#[inline(always)]
pub fn fast_tanh(x: Sample) -> Sample {
    if x > 3.0 {
        return 1.0;
    }
    if x < -3.0 {
        return -1.0;
    }
    let x2 = x * x;
    x * (27.0 + x2) / (27.0 + 9.0 * x2)
}

/// Wet-path DC blocker coefficient
const SAT_DC_COEFF: f64 = 0.995;

/// Parameter smoothing time
const SAT_SMOOTH_MS: f64 = 20.0;

/// Soft saturator with drive, dry/wet mix, and DC blocking
#[derive(Debug, Clone)]
pub struct AnalogSaturation {
    drive_smoother: ParamSmoother,
    mix_smoother: ParamSmoother,
    dc_state: f64,
}

impl AnalogSaturation {
    pub fn new(sample_rate: f64) -> Self {
        let mut drive_smoother = ParamSmoother::new(SAT_SMOOTH_MS, sample_rate);
        drive_smoother.set_immediate(1.0);
        let mut mix_smoother = ParamSmoother::new(SAT_SMOOTH_MS, sample_rate);
        mix_smoother.set_immediate(0.5);
        Self {
            drive_smoother,
            mix_smoother,
            dc_state: 0.0,
        }
    }

    /// Drive amount, clamped to 1..4
    pub fn set_drive(&mut self, drive: f64) {
        self.drive_smoother.set_target(drive.clamp(1.0, 4.0));
    }

    /// Dry/wet mix, clamped to 0..1
    pub fn set_mix(&mut self, mix: f64) {
        self.mix_smoother.set_target(mix.clamp(0.0, 1.0));
    }

    pub fn drive_target(&self) -> f64 {
        self.drive_smoother.target()
    }

    pub fn mix_target(&self) -> f64 {
        self.mix_smoother.target()
    }
}

impl Processor for AnalogSaturation {
    fn reset(&mut self) {
        self.dc_state = 0.0;
    }
}

impl MonoProcessor for AnalogSaturation {
    #[inline(always)]
    fn process_sample(&mut self, input: Sample) -> Sample {
        let drive = self.drive_smoother.next();
        let mix = self.mix_smoother.next();

        let driven = input * drive;
        let saturated = fast_tanh(driven) / drive;

        let blocked = saturated - self.dc_state;
        self.dc_state = self.dc_state * SAT_DC_COEFF + saturated * (1.0 - SAT_DC_COEFF);

        input * (1.0 - mix) + blocked * mix
    }
}

impl ProcessorConfig for AnalogSaturation {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.drive_smoother
            .set_smooth_time(SAT_SMOOTH_MS, sample_rate);
        self.mix_smoother.set_smooth_time(SAT_SMOOTH_MS, sample_rate);
    }
}

/// Air-band protection
///
/// Splits at 12 kHz and soft-clips only the high branch against a
/// configurable linear threshold. Keeps an aggressively boosted 14 kHz
/// EQ band from turning into square-wave edges further down the chain.
#[derive(Debug, Clone)]
pub struct HfProtection {
    highpass: Svf,
    lowpass: Svf,
    threshold: f64,
    enabled: bool,
}

/// Split frequency in Hz
const SPLIT_FREQ: f64 = 12000.0;

impl HfProtection {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            highpass: Svf::with_role(SPLIT_FREQ, 0.707, 0.0, FilterType::Highpass, sample_rate),
            lowpass: Svf::with_role(SPLIT_FREQ, 0.707, 0.0, FilterType::Lowpass, sample_rate),
            threshold: 0.9,
            enabled: true,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Soft-clip threshold (linear), clamped to 0.5..1.0
    pub fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold.clamp(0.5, 1.0);
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Processor for HfProtection {
    fn reset(&mut self) {
        self.highpass.reset();
        self.lowpass.reset();
    }
}

impl MonoProcessor for HfProtection {
    #[inline]
    fn process_sample(&mut self, input: Sample) -> Sample {
        if !self.enabled {
            return input;
        }

        let high = self.highpass.process_sample(input);
        let low_mid = self.lowpass.process_sample(input);

        let clipped = fast_tanh(high / self.threshold) * self.threshold;

        low_mid + clipped
    }
}

impl ProcessorConfig for HfProtection {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.highpass.set_sample_rate(sample_rate);
        self.lowpass.set_sample_rate(sample_rate);
        self.highpass
            .set(SPLIT_FREQ, 0.707, 0.0, FilterType::Highpass);
        self.lowpass.set(SPLIT_FREQ, 0.707, 0.0, FilterType::Lowpass);
    }
}
