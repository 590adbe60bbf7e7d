//! Loudness and stereo metering
//!
//! - K-weighted LUFS per ITU-R BS.1770-4 / EBU R128: momentary (400 ms),
//!   short-term (3 s), gated integrated, and loudness range, computed from
//!   per-sample weighted energies.
//! - Crest factor over a sliding mean-square window with a slow-decay
//!   peak register.
//! - Phase correlation integrated over a fixed window.

use anvil_core::{MIN_LEVEL, Sample, linear_to_db};

use crate::svf::{FilterType, Svf};
use crate::{MonoProcessor, Processor, ProcessorConfig};

/// Absolute gate for integrated loudness (LUFS)
pub const ABSOLUTE_GATE_LUFS: f64 = -70.0;

/// Relative gate offset below ungated loudness (LU)
const RELATIVE_GATE_OFFSET: f64 = -10.0;

/// Loudness of a mean-square energy value
#[inline]
fn energy_to_lufs(mean_square: f64) -> f64 {
    -0.691 + 10.0 * mean_square.log10()
}

/// Two-pass gated loudness over a per-sample energy sequence
///
/// Pass 1 keeps energies louder than the absolute gate; pass 2 re-gates
/// relative to the ungated mean of the survivors. Returns -70 when
/// nothing survives.
fn gated_loudness(energies: &[f64]) -> f64 {
    if energies.is_empty() {
        return ABSOLUTE_GATE_LUFS;
    }

    let gated: Vec<f64> = energies
        .iter()
        .copied()
        .filter(|&ms| energy_to_lufs(ms) > ABSOLUTE_GATE_LUFS)
        .collect();
    if gated.is_empty() {
        return ABSOLUTE_GATE_LUFS;
    }

    let ungated_mean: f64 = gated.iter().sum::<f64>() / gated.len() as f64;
    let relative_gate = energy_to_lufs(ungated_mean) + RELATIVE_GATE_OFFSET;

    let final_gated: Vec<f64> = gated
        .into_iter()
        .filter(|&ms| energy_to_lufs(ms) > relative_gate)
        .collect();
    if final_gated.is_empty() {
        return ABSOLUTE_GATE_LUFS;
    }

    let final_mean: f64 = final_gated.iter().sum::<f64>() / final_gated.len() as f64;
    energy_to_lufs(final_mean)
}

/// Loudness range: P95 - P10 of absolute-gated loudness values, >= 0
fn loudness_range(energies: &[f64]) -> f64 {
    if energies.len() < 10 {
        return 0.0;
    }

    let mut gated: Vec<f64> = energies
        .iter()
        .map(|&ms| -0.691 + 10.0 * ms.max(MIN_LEVEL).log10())
        .filter(|&lufs| lufs > ABSOLUTE_GATE_LUFS)
        .collect();
    if gated.len() < 10 {
        return 0.0;
    }

    gated.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let idx10 = ((gated.len() as f64 * 0.10) as usize).min(gated.len() - 1);
    let idx95 = ((gated.len() as f64 * 0.95) as usize).min(gated.len() - 1);

    (gated[idx95] - gated[idx10]).max(0.0)
}

/// One channel of K-weighting: 100 Hz highpass pre-filter into the
/// 1 kHz +4 dB RLB high shelf
#[derive(Debug, Clone)]
struct KWeightingFilter {
    pre_filter: Svf,
    rlb_shelf: Svf,
}

impl KWeightingFilter {
    fn new(sample_rate: f64) -> Self {
        Self {
            pre_filter: Svf::with_role(100.0, 0.707, 0.0, FilterType::Highpass, sample_rate),
            rlb_shelf: Svf::with_role(1000.0, 0.707, 4.0, FilterType::HighShelf, sample_rate),
        }
    }

    #[inline]
    fn process(&mut self, input: Sample) -> Sample {
        self.rlb_shelf
            .process_sample(self.pre_filter.process_sample(input))
    }

    fn reset(&mut self) {
        self.pre_filter.reset();
        self.rlb_shelf.reset();
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.pre_filter.set_sample_rate(sample_rate);
        self.rlb_shelf.set_sample_rate(sample_rate);
        self.pre_filter.set(100.0, 0.707, 0.0, FilterType::Highpass);
        self.rlb_shelf.set(1000.0, 0.707, 4.0, FilterType::HighShelf);
    }
}

/// EBU R128 loudness meter over per-sample weighted energies
///
/// The integrated sequence grows without bound until `reset()`; the
/// momentary and short-term readings come from fixed rings sized at
/// construction (400 ms and 3 s).
#[derive(Debug, Clone)]
pub struct LufsMeter {
    filter_l: KWeightingFilter,
    filter_r: KWeightingFilter,
    integrated: Vec<f64>,
    short_term: Vec<f64>,
    momentary: Vec<f64>,
    short_term_index: usize,
    momentary_index: usize,
}

impl LufsMeter {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            filter_l: KWeightingFilter::new(sample_rate),
            filter_r: KWeightingFilter::new(sample_rate),
            integrated: Vec::new(),
            short_term: vec![0.0; (3.0 * sample_rate) as usize],
            momentary: vec![0.0; (0.4 * sample_rate) as usize],
            short_term_index: 0,
            momentary_index: 0,
        }
    }

    /// Feed one stereo frame
    #[inline]
    pub fn process_sample(&mut self, left: Sample, right: Sample) {
        let weighted_l = self.filter_l.process(left);
        let weighted_r = self.filter_r.process(right);

        let mean_square = (weighted_l * weighted_l + weighted_r * weighted_r) / 2.0;

        self.integrated.push(mean_square);

        self.short_term[self.short_term_index] = mean_square;
        self.short_term_index = (self.short_term_index + 1) % self.short_term.len();

        self.momentary[self.momentary_index] = mean_square;
        self.momentary_index = (self.momentary_index + 1) % self.momentary.len();
    }

    /// Gated integrated loudness since construction or reset
    pub fn integrated_lufs(&self) -> f64 {
        gated_loudness(&self.integrated)
    }

    /// Loudness over the last 3 seconds, floored at -70
    pub fn short_term_lufs(&self) -> f64 {
        Self::window_lufs(&self.short_term)
    }

    /// Loudness over the last 400 ms, floored at -70
    pub fn momentary_lufs(&self) -> f64 {
        Self::window_lufs(&self.momentary)
    }

    /// Loudness range (LRA) in LU
    pub fn loudness_range(&self) -> f64 {
        loudness_range(&self.integrated)
    }

    fn window_lufs(window: &[f64]) -> f64 {
        let mean_power = window.iter().sum::<f64>() / window.len() as f64;
        -0.691 + 10.0 * mean_power.max(MIN_LEVEL).log10()
    }

    pub fn reset(&mut self) {
        self.filter_l.reset();
        self.filter_r.reset();
        self.integrated.clear();
        self.short_term.fill(0.0);
        self.momentary.fill(0.0);
        self.short_term_index = 0;
        self.momentary_index = 0;
    }
}

impl ProcessorConfig for LufsMeter {
    /// Re-warps the weighting filters and rebuilds the rate-dependent
    /// rings; all accumulated readings are cleared.
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.filter_l.set_sample_rate(sample_rate);
        self.filter_r.set_sample_rate(sample_rate);
        self.integrated = Vec::new();
        self.short_term = vec![0.0; (3.0 * sample_rate) as usize];
        self.momentary = vec![0.0; (0.4 * sample_rate) as usize];
        self.short_term_index = 0;
        self.momentary_index = 0;
    }
}

/// Crest factor reported under silence (dB)
pub const CREST_SILENCE_DB: f64 = 100.0;

/// Peak decay per sample for the crest-factor peak register
const PEAK_DECAY: f64 = 0.999;

/// Crest factor analyser: slow-decay peak against a sliding RMS window
#[derive(Debug, Clone)]
pub struct CrestFactorAnalyzer {
    ring: Vec<f64>,
    index: usize,
    peak: f64,
    running_sum: f64,
}

impl CrestFactorAnalyzer {
    pub fn new(window_samples: usize) -> Self {
        Self {
            ring: vec![0.0; window_samples.max(1)],
            index: 0,
            peak: 0.0,
            running_sum: 0.0,
        }
    }

    /// Feed one stereo frame
    #[inline]
    pub fn process_sample(&mut self, left: Sample, right: Sample) {
        let peak = left.abs().max(right.abs());
        self.peak = (self.peak * PEAK_DECAY).max(peak);

        let mean_square = (left * left + right * right) / 2.0;
        self.running_sum -= self.ring[self.index];
        self.ring[self.index] = mean_square;
        self.running_sum += mean_square;
        self.index = (self.index + 1) % self.ring.len();
    }

    /// Crest factor in dB; `CREST_SILENCE_DB` sentinel under silence
    pub fn crest_factor_db(&self) -> f64 {
        let rms = (self.running_sum / self.ring.len() as f64).sqrt();
        if rms < MIN_LEVEL {
            return CREST_SILENCE_DB;
        }
        linear_to_db(self.peak / rms)
    }

    pub fn peak_db(&self) -> f64 {
        linear_to_db(self.peak)
    }

    pub fn rms_db(&self) -> f64 {
        linear_to_db((self.running_sum / self.ring.len() as f64).sqrt())
    }

    pub fn reset(&mut self) {
        self.ring.fill(0.0);
        self.index = 0;
        self.peak = 0.0;
        self.running_sum = 0.0;
    }
}

/// Phase correlation accumulated over a fixed window
///
/// `sum(L*R) / sqrt(sum(L^2) * sum(R^2))`, reported as 0 when either
/// channel is essentially silent.
#[derive(Debug, Clone)]
pub struct CorrelationMeter {
    sum_ll: f64,
    sum_rr: f64,
    sum_lr: f64,
    count: usize,
    window: usize,
    correlation: f64,
}

impl CorrelationMeter {
    pub fn new(window_samples: usize) -> Self {
        Self {
            sum_ll: 0.0,
            sum_rr: 0.0,
            sum_lr: 0.0,
            count: 0,
            window: window_samples.max(1),
            correlation: 0.0,
        }
    }

    /// Feed one stereo frame; returns the fresh correlation each time a
    /// window completes
    #[inline]
    pub fn process_sample(&mut self, left: Sample, right: Sample) -> Option<f64> {
        self.sum_ll += left * left;
        self.sum_rr += right * right;
        self.sum_lr += left * right;
        self.count += 1;

        if self.count >= self.window {
            let denominator = (self.sum_ll * self.sum_rr).sqrt();
            self.correlation = if denominator > MIN_LEVEL {
                self.sum_lr / denominator
            } else {
                0.0
            };
            self.sum_ll = 0.0;
            self.sum_rr = 0.0;
            self.sum_lr = 0.0;
            self.count = 0;
            Some(self.correlation)
        } else {
            None
        }
    }

    /// Most recent completed-window correlation
    pub fn correlation(&self) -> f64 {
        self.correlation
    }

    pub fn reset(&mut self) {
        self.sum_ll = 0.0;
        self.sum_rr = 0.0;
        self.sum_lr = 0.0;
        self.count = 0;
        self.correlation = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    const SAMPLE_RATE: f64 = 48000.0;

    #[test]
    fn test_gated_loudness_uniform_energy() {
        // Constant energy 0.1: no gating, loudness = -0.691 + 10*log10(0.1)
        let energies = vec![0.1; 1000];
        let lufs = gated_loudness(&energies);
        assert_abs_diff_eq!(lufs, -10.691, epsilon = 1e-9);
    }

    #[test]
    fn test_gated_loudness_absolute_gate() {
        // Near-silence blocks fall under the absolute gate entirely
        let energies = vec![1e-12; 1000];
        assert_eq!(gated_loudness(&energies), -70.0);
        assert_eq!(gated_loudness(&[]), -70.0);
    }

    #[test]
    fn test_gated_loudness_relative_gate_drops_quiet_tail() {
        // 900 loud blocks at 0.1 and 100 much quieter at 1e-4: the
        // relative gate (-10 LU under ungated mean) removes the tail, so
        // the result equals the loud blocks alone
        let mut energies = vec![0.1; 900];
        energies.extend(vec![1e-4; 100]);
        let lufs = gated_loudness(&energies);
        assert_abs_diff_eq!(lufs, -10.691, epsilon = 1e-9);
    }

    #[test]
    fn test_loudness_range_of_two_levels() {
        // Half the blocks at energy 1.0 (=-0.691), half at 0.01 (=-20.691):
        // P95 - P10 spans the two levels -> 20 LU
        let mut energies = vec![1.0; 500];
        energies.extend(vec![0.01; 500]);
        let lra = loudness_range(&energies);
        assert_abs_diff_eq!(lra, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_loudness_range_needs_data() {
        assert_eq!(loudness_range(&[1.0; 5]), 0.0);
        assert_eq!(loudness_range(&[]), 0.0);
    }

    #[test]
    fn test_momentary_reading_for_sine() {
        // -6 dBFS 1 kHz sine on both channels. With the 1 kHz +4 dB shelf
        // the K-weighting contributes ~+5.6 dB at 1 kHz, so the window
        // reading sits near -4.1 LUFS.
        let mut meter = LufsMeter::new(SAMPLE_RATE);
        let amplitude = 0.501187;
        for i in 0..96000 {
            let x = (2.0 * PI * 1000.0 * i as f64 / SAMPLE_RATE).sin() * amplitude;
            meter.process_sample(x, x);
        }
        let momentary = meter.momentary_lufs();
        assert!(
            (-4.8..=-3.4).contains(&momentary),
            "momentary {momentary} out of expected range"
        );
        let short_term = meter.short_term_lufs();
        // 2 s of signal into a 3 s window: a fraction of a dB lower
        assert!(
            (-7.0..=-3.4).contains(&short_term),
            "short-term {short_term} out of expected range"
        );
    }

    #[test]
    fn test_silence_reads_floor() {
        let mut meter = LufsMeter::new(SAMPLE_RATE);
        for _ in 0..48000 {
            meter.process_sample(0.0, 0.0);
        }
        assert_eq!(meter.momentary_lufs(), -0.691 + 10.0 * MIN_LEVEL.log10());
        assert_eq!(meter.integrated_lufs(), -70.0);
        assert_eq!(meter.loudness_range(), 0.0);
    }

    #[test]
    fn test_meter_reset_clears_history() {
        let mut meter = LufsMeter::new(SAMPLE_RATE);
        for i in 0..48000 {
            let x = (2.0 * PI * 1000.0 * i as f64 / SAMPLE_RATE).sin() * 0.5;
            meter.process_sample(x, x);
        }
        meter.reset();
        assert_eq!(meter.integrated_lufs(), -70.0);
    }

    #[test]
    fn test_crest_factor_sentinel_on_silence() {
        let mut analyzer = CrestFactorAnalyzer::new(4800);
        for _ in 0..9600 {
            analyzer.process_sample(0.0, 0.0);
        }
        assert_eq!(analyzer.crest_factor_db(), 100.0);
    }

    #[test]
    fn test_crest_factor_of_sine() {
        // Peak/RMS of a sine is sqrt(2) = 3.01 dB; the 0.999 decay between
        // successive peaks pulls the register slightly under the true peak
        let mut analyzer = CrestFactorAnalyzer::new(4800);
        for i in 0..96000 {
            let x = (2.0 * PI * 1000.0 * i as f64 / SAMPLE_RATE).sin() * 0.5;
            analyzer.process_sample(x, x);
        }
        let crest = analyzer.crest_factor_db();
        assert!((2.0..=3.3).contains(&crest), "sine crest factor {crest}");
    }

    #[test]
    fn test_correlation_identical_channels() {
        let mut meter = CorrelationMeter::new(4800);
        let mut last = None;
        for i in 0..9600 {
            let x = (2.0 * PI * 440.0 * i as f64 / SAMPLE_RATE).sin();
            if let Some(c) = meter.process_sample(x, x) {
                last = Some(c);
            }
        }
        let correlation = last.expect("window should have completed");
        assert!((correlation - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_correlation_inverted_channels() {
        let mut meter = CorrelationMeter::new(4800);
        for i in 0..9600 {
            let x = (2.0 * PI * 440.0 * i as f64 / SAMPLE_RATE).sin();
            meter.process_sample(x, -x);
        }
        assert!((meter.correlation() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_correlation_silence_reports_zero() {
        let mut meter = CorrelationMeter::new(4800);
        for _ in 0..9600 {
            meter.process_sample(0.0, 0.0);
        }
        assert_eq!(meter.correlation(), 0.0);
    }
}
