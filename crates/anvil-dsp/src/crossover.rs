//! Linkwitz-Riley crossovers
//!
//! LR4 = two cascaded Q=0.707 Butterworth biquads per branch, giving
//! 24 dB/octave slopes whose low+high sum is allpass: flat magnitude,
//! phase-only disturbance through the crossover region. That property is
//! what lets the multiband compressor and the stereo imager recombine
//! bands without comb filtering.

use anvil_core::Sample;

use crate::svf::{FilterType, Svf};
use crate::{MonoProcessor, Processor, ProcessorConfig};

/// Butterworth Q for each cascaded stage
const STAGE_Q: f64 = 0.707;

/// Two-way Linkwitz-Riley 4th-order crossover
#[derive(Debug, Clone)]
pub struct LinkwitzRileyCrossover {
    lowpass: [Svf; 2],
    highpass: [Svf; 2],
    freq: f64,
    sample_rate: f64,
}

impl LinkwitzRileyCrossover {
    pub fn new(freq: f64, sample_rate: f64) -> Self {
        let mut crossover = Self {
            lowpass: std::array::from_fn(|_| Svf::new(sample_rate)),
            highpass: std::array::from_fn(|_| Svf::new(sample_rate)),
            freq,
            sample_rate,
        };
        crossover.update_coefficients();
        crossover
    }

    pub fn set_crossover_frequency(&mut self, freq: f64) {
        self.freq = freq;
        self.update_coefficients();
    }

    pub fn crossover_frequency(&self) -> f64 {
        self.freq
    }

    fn update_coefficients(&mut self) {
        for stage in &mut self.lowpass {
            stage.set_sample_rate(self.sample_rate);
            stage.set(self.freq, STAGE_Q, 0.0, FilterType::Lowpass);
        }
        for stage in &mut self.highpass {
            stage.set_sample_rate(self.sample_rate);
            stage.set(self.freq, STAGE_Q, 0.0, FilterType::Highpass);
        }
    }

    /// Split one sample into (low, high)
    #[inline]
    pub fn process(&mut self, input: Sample) -> (Sample, Sample) {
        let low_stage0 = self.lowpass[0].process_sample(input);
        let low = self.lowpass[1].process_sample(low_stage0);
        let high_stage0 = self.highpass[0].process_sample(input);
        let high = self.highpass[1].process_sample(high_stage0);
        (low, high)
    }
}

impl Processor for LinkwitzRileyCrossover {
    fn reset(&mut self) {
        for stage in self.lowpass.iter_mut().chain(self.highpass.iter_mut()) {
            stage.reset();
        }
    }
}

impl ProcessorConfig for LinkwitzRileyCrossover {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }
}

/// Three-band split: a low/mid crossover feeding a mid/high crossover
/// on its upper branch
#[derive(Debug, Clone)]
pub struct ThreeBandCrossover {
    low_mid: LinkwitzRileyCrossover,
    mid_high: LinkwitzRileyCrossover,
}

impl ThreeBandCrossover {
    pub fn new(low_mid_freq: f64, mid_high_freq: f64, sample_rate: f64) -> Self {
        Self {
            low_mid: LinkwitzRileyCrossover::new(low_mid_freq, sample_rate),
            mid_high: LinkwitzRileyCrossover::new(mid_high_freq, sample_rate),
        }
    }

    pub fn set_frequencies(&mut self, low_mid_freq: f64, mid_high_freq: f64) {
        self.low_mid.set_crossover_frequency(low_mid_freq);
        self.mid_high.set_crossover_frequency(mid_high_freq);
    }

    /// Split one sample into (low, mid, high)
    #[inline]
    pub fn process(&mut self, input: Sample) -> (Sample, Sample, Sample) {
        let (low, mid_high) = self.low_mid.process(input);
        let (mid, high) = self.mid_high.process(mid_high);
        (low, mid, high)
    }
}

impl Processor for ThreeBandCrossover {
    fn reset(&mut self) {
        self.low_mid.reset();
        self.mid_high.reset();
    }
}

impl ProcessorConfig for ThreeBandCrossover {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.low_mid.set_sample_rate(sample_rate);
        self.mid_high.set_sample_rate(sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realfft::RealFftPlanner;
    use std::f64::consts::PI;

    const SAMPLE_RATE: f64 = 48000.0;

    /// Magnitude response from an impulse response via FFT
    fn magnitude_response(impulse_response: &[f64]) -> Vec<f64> {
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(impulse_response.len());
        let mut input = impulse_response.to_vec();
        let mut spectrum = fft.make_output_vec();
        fft.process(&mut input, &mut spectrum).unwrap();
        spectrum.iter().map(|c| c.norm()).collect()
    }

    #[test]
    fn test_lr4_sum_is_flat() {
        // low(x) + high(x) must be allpass: flat magnitude 20 Hz - 20 kHz
        let fft_len = 16384;
        let mut crossover = LinkwitzRileyCrossover::new(250.0, SAMPLE_RATE);
        let mut sum_ir = vec![0.0; fft_len];
        for (i, out) in sum_ir.iter_mut().enumerate() {
            let x = if i == 0 { 1.0 } else { 0.0 };
            let (low, high) = crossover.process(x);
            *out = low + high;
        }

        let mags = magnitude_response(&sum_ir);
        let bin_hz = SAMPLE_RATE / fft_len as f64;
        let first = (20.0 / bin_hz).ceil() as usize;
        let last = (20000.0 / bin_hz).floor() as usize;
        for (bin, mag) in mags.iter().enumerate().take(last + 1).skip(first) {
            let db = 20.0 * mag.log10();
            assert!(
                db.abs() < 0.01,
                "LR4 sum not flat at {:.0} Hz: {db} dB",
                bin as f64 * bin_hz
            );
        }
    }

    #[test]
    fn test_branches_meet_at_minus_6db() {
        // Each LR4 branch sits at -6.02 dB at the crossover frequency
        let fft_len = 16384;
        let fc = 1000.0;
        let mut crossover = LinkwitzRileyCrossover::new(fc, SAMPLE_RATE);
        let mut low_ir = vec![0.0; fft_len];
        let mut high_ir = vec![0.0; fft_len];
        for i in 0..fft_len {
            let x = if i == 0 { 1.0 } else { 0.0 };
            let (low, high) = crossover.process(x);
            low_ir[i] = low;
            high_ir[i] = high;
        }

        let bin = (fc * fft_len as f64 / SAMPLE_RATE).round() as usize;
        let low_db = 20.0 * magnitude_response(&low_ir)[bin].log10();
        let high_db = 20.0 * magnitude_response(&high_ir)[bin].log10();
        assert!((low_db + 6.02).abs() < 0.1, "low branch at fc: {low_db} dB");
        assert!(
            (high_db + 6.02).abs() < 0.1,
            "high branch at fc: {high_db} dB"
        );
    }

    #[test]
    fn test_three_band_separation() {
        // A 60 Hz tone lands in the low band, 12 kHz in the high band
        let mut crossover = ThreeBandCrossover::new(250.0, 2000.0, SAMPLE_RATE);
        let mut low_energy = 0.0;
        let mut high_energy = 0.0;
        for i in 0..48000 {
            let t = i as f64 / SAMPLE_RATE;
            let x = (2.0 * PI * 60.0 * t).sin();
            let (low, _, high) = crossover.process(x);
            if i > 24000 {
                low_energy += low * low;
                high_energy += high * high;
            }
        }
        assert!(low_energy > 1000.0 * high_energy);

        crossover.reset();
        let mut low_energy = 0.0;
        let mut high_energy = 0.0;
        for i in 0..48000 {
            let t = i as f64 / SAMPLE_RATE;
            let x = (2.0 * PI * 12000.0 * t).sin();
            let (low, _, high) = crossover.process(x);
            if i > 24000 {
                low_energy += low * low;
                high_energy += high * high;
            }
        }
        assert!(high_energy > 1000.0 * low_energy);
    }

    #[test]
    fn test_rewarp_on_sample_rate_change() {
        let mut crossover = LinkwitzRileyCrossover::new(250.0, 48000.0);
        crossover.set_sample_rate(96000.0);
        // Same split behaviour at the new rate: DC still goes fully low
        let mut last = (0.0, 0.0);
        for _ in 0..96000 {
            last = crossover.process(1.0);
        }
        assert!((last.0 - 1.0).abs() < 0.01);
        assert!(last.1.abs() < 0.01);
    }
}
