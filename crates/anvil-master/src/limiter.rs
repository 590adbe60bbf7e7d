//! True-peak look-ahead limiter
//!
//! Per stereo frame: both channels are oversampled 4x, the largest
//! oversampled magnitude drives a gain envelope with instantaneous attack
//! (`min` against the target) and exponential release, gain is applied in
//! the oversampled domain, and the downsampled frame enters a 50 ms ring
//! whose read side trails the write side by the full ring. Limiting
//! happens *before* the delay: the ring time-aligns already-limited
//! material rather than predicting gain.
//!
//! Safe-clip mode hard-clips every oversampled value at the threshold
//! instead of applying the envelope; the envelope still runs so the
//! gain-reduction meter stays meaningful.

use anvil_core::{Sample, db_to_linear, linear_to_db};
use anvil_dsp::oversampling::{OVERSAMPLING_FACTOR, Oversampler};

/// Look-ahead length in seconds
const LOOKAHEAD_SECONDS: f64 = 0.05;

/// Hard clip to +/-ceiling
#[inline(always)]
fn hard_clip(x: Sample, ceiling: f64) -> Sample {
    x.clamp(-ceiling, ceiling)
}

/// True-peak limiter with look-ahead delay and safe-clip mode
#[derive(Debug, Clone)]
pub struct TruePeakLimiter {
    threshold_db: f64,
    threshold_linear: f64,
    release_sec: f64,
    release_coeff: f64,
    lookahead: Vec<Sample>,
    lookahead_index: usize,
    lookahead_size: usize,
    envelope: f64,
    sample_rate: f64,
    oversampler_l: Oversampler,
    oversampler_r: Oversampler,
    safe_clip: bool,
}

impl TruePeakLimiter {
    pub fn new(sample_rate: f64) -> Self {
        let lookahead_size = ((LOOKAHEAD_SECONDS * sample_rate) as usize).max(1);
        let mut limiter = Self {
            threshold_db: -1.0,
            threshold_linear: db_to_linear(-1.0),
            release_sec: 0.05,
            release_coeff: 0.0,
            lookahead: vec![0.0; lookahead_size * 2],
            lookahead_index: 0,
            lookahead_size,
            envelope: 0.0,
            sample_rate,
            oversampler_l: Oversampler::new(),
            oversampler_r: Oversampler::new(),
            safe_clip: false,
        };
        limiter.set_release(0.05);
        limiter
    }

    pub fn set_threshold(&mut self, threshold_db: f64) {
        self.threshold_db = threshold_db;
        self.threshold_linear = db_to_linear(threshold_db);
    }

    pub fn threshold_db(&self) -> f64 {
        self.threshold_db
    }

    pub fn set_release(&mut self, release_sec: f64) {
        self.release_sec = release_sec;
        self.release_coeff = (-1.0 / (release_sec * self.sample_rate)).exp();
    }

    pub fn set_safe_clip(&mut self, enabled: bool) {
        self.safe_clip = enabled;
    }

    pub fn safe_clip(&self) -> bool {
        self.safe_clip
    }

    /// Rebuilds the rate-dependent look-ahead ring (cleared) and release
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.lookahead_size = ((LOOKAHEAD_SECONDS * sample_rate) as usize).max(1);
        self.lookahead = vec![0.0; self.lookahead_size * 2];
        self.lookahead_index = 0;
        self.set_release(self.release_sec);
    }

    /// Process one stereo frame; returns the frame delayed by the ring
    #[inline]
    pub fn process_sample(&mut self, left: Sample, right: Sample) -> (Sample, Sample) {
        let up_l = self.oversampler_l.upsample(left);
        let up_r = self.oversampler_r.upsample(right);

        let mut true_peak = 0.0_f64;
        for i in 0..OVERSAMPLING_FACTOR {
            true_peak = true_peak.max(up_l[i].abs()).max(up_r[i].abs());
        }

        let target_gain = if true_peak > self.threshold_linear {
            self.threshold_linear / true_peak
        } else {
            1.0
        };
        // Instantaneous attack, exponential release
        self.envelope = target_gain
            .min(self.envelope * self.release_coeff + target_gain * (1.0 - self.release_coeff));

        let mut limited_l = [0.0; OVERSAMPLING_FACTOR];
        let mut limited_r = [0.0; OVERSAMPLING_FACTOR];
        if self.safe_clip {
            for i in 0..OVERSAMPLING_FACTOR {
                limited_l[i] = hard_clip(up_l[i], self.threshold_linear);
                limited_r[i] = hard_clip(up_r[i], self.threshold_linear);
            }
        } else {
            for i in 0..OVERSAMPLING_FACTOR {
                limited_l[i] = up_l[i] * self.envelope;
                limited_r[i] = up_r[i] * self.envelope;
            }
        }

        let out_l = self.oversampler_l.downsample(&limited_l);
        let out_r = self.oversampler_r.downsample(&limited_r);

        self.lookahead[self.lookahead_index * 2] = out_l;
        self.lookahead[self.lookahead_index * 2 + 1] = out_r;

        let read_index = (self.lookahead_index + 1) % self.lookahead_size;
        let delayed_l = self.lookahead[read_index * 2];
        let delayed_r = self.lookahead[read_index * 2 + 1];

        self.lookahead_index = (self.lookahead_index + 1) % self.lookahead_size;

        (delayed_l, delayed_r)
    }

    /// Current gain reduction in dB (0 = none)
    pub fn gain_reduction_db(&self) -> f64 {
        linear_to_db(self.envelope)
    }

    /// Latency equals the look-ahead ring length
    pub fn latency(&self) -> usize {
        self.lookahead_size
    }

    pub fn reset(&mut self) {
        self.lookahead.fill(0.0);
        self.lookahead_index = 0;
        self.envelope = 0.0;
        self.oversampler_l.reset();
        self.oversampler_r.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const SAMPLE_RATE: f64 = 48000.0;

    #[test]
    fn test_latency_matches_lookahead() {
        let limiter = TruePeakLimiter::new(48000.0);
        assert_eq!(limiter.latency(), 2400);

        let limiter = TruePeakLimiter::new(44100.0);
        assert_eq!(limiter.latency(), 2205);
    }

    #[test]
    fn test_output_zero_until_ring_fills() {
        let mut limiter = TruePeakLimiter::new(SAMPLE_RATE);
        for i in 0..2399 {
            let x = if i == 0 { 1.0 } else { 0.0 };
            let (l, r) = limiter.process_sample(x, x);
            assert!(
                l.abs() < 1e-12 && r.abs() < 1e-12,
                "ring must delay output, sample {i}: {l}"
            );
        }
    }

    #[test]
    fn test_ceiling_is_respected() {
        let mut limiter = TruePeakLimiter::new(SAMPLE_RATE);
        limiter.set_threshold(-3.0);
        let ceiling = db_to_linear(-3.0);

        let mut max_out: f64 = 0.0;
        for i in 0..192000 {
            let x = (2.0 * PI * 997.0 * i as f64 / SAMPLE_RATE).sin();
            let (l, r) = limiter.process_sample(x, x);
            if i > 96000 {
                max_out = max_out.max(l.abs()).max(r.abs());
            }
        }
        assert!(
            max_out <= ceiling * 1.02,
            "output {max_out} exceeds ceiling {ceiling}"
        );
        assert!(limiter.gain_reduction_db() < 0.0);
    }

    #[test]
    fn test_safe_clip_is_bounded_too() {
        let mut limiter = TruePeakLimiter::new(SAMPLE_RATE);
        limiter.set_threshold(-1.0);
        limiter.set_safe_clip(true);

        let mut max_out: f64 = 0.0;
        for i in 0..192000 {
            let x = if (i / 55) % 2 == 0 { 0.95 } else { -0.95 };
            let (l, _) = limiter.process_sample(x, x);
            if i > 96000 {
                max_out = max_out.max(l.abs());
            }
        }
        // The downsample reconstruction may overshoot slightly
        assert!(
            max_out <= db_to_linear(-1.0) * 1.1,
            "safe-clip output {max_out} far above threshold"
        );
        // The envelope keeps running in safe-clip mode
        assert!(limiter.gain_reduction_db() < 0.0);
    }

    #[test]
    fn test_silence_stays_silent() {
        let mut limiter = TruePeakLimiter::new(SAMPLE_RATE);
        for _ in 0..10000 {
            let (l, r) = limiter.process_sample(0.0, 0.0);
            assert_eq!(l, 0.0);
            assert_eq!(r, 0.0);
        }
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut limiter = TruePeakLimiter::new(SAMPLE_RATE);
        let first: Vec<(f64, f64)> = (0..4800)
            .map(|i| {
                let x = (2.0 * PI * 440.0 * i as f64 / SAMPLE_RATE).sin();
                limiter.process_sample(x, x)
            })
            .collect();

        limiter.reset();
        for (i, expected) in first.iter().enumerate() {
            let x = (2.0 * PI * 440.0 * i as f64 / SAMPLE_RATE).sin();
            let got = limiter.process_sample(x, x);
            assert_eq!(got, *expected, "state not fully reset at sample {i}");
        }
    }

    #[test]
    fn test_sample_rate_change_rebuilds_ring() {
        let mut limiter = TruePeakLimiter::new(48000.0);
        for i in 0..4800 {
            let x = (2.0 * PI * 440.0 * i as f64 / 48000.0).sin();
            limiter.process_sample(x, x);
        }
        limiter.set_sample_rate(96000.0);
        assert_eq!(limiter.latency(), 4800);
        // Fresh ring: output is zero again until it refills
        let (l, r) = limiter.process_sample(0.5, 0.5);
        assert_eq!(l, 0.0);
        assert_eq!(r, 0.0);
    }
}
