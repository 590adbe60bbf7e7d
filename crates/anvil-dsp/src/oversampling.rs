//! 4x FIR oversampler for true-peak detection and limiting
//!
//! A 64-tap windowed-sinc kernel (cutoff 0.25, Blackman window, scaled by
//! the cutoff) shared between the upsample and downsample paths. The two
//! paths keep separate history rings but advance a single shared index:
//! one step per upsample call, four per downsample call. This exact
//! traversal determines the limiter's observable behaviour (impulse
//! timing, reported latency) and must not be replaced with a textbook
//! polyphase split.

use anvil_core::Sample;
use std::f64::consts::PI;

/// Oversampling factor
pub const OVERSAMPLING_FACTOR: usize = 4;

/// FIR kernel length
pub const FIR_TAP_COUNT: usize = 64;

/// Normalised kernel cutoff
const CUTOFF: f64 = 0.25;

/// 4x polyphase FIR up/down sampler, one instance per audio channel
#[derive(Debug, Clone)]
pub struct Oversampler {
    coeffs: [f64; FIR_TAP_COUNT],
    up_history: [f64; FIR_TAP_COUNT],
    down_history: [f64; FIR_TAP_COUNT],
    history_index: usize,
}

fn generate_fir_coeffs() -> [f64; FIR_TAP_COUNT] {
    let mut coeffs = [0.0; FIR_TAP_COUNT];
    for (i, coeff) in coeffs.iter_mut().enumerate() {
        let n = i as i64 - (FIR_TAP_COUNT as i64) / 2;
        let sinc = if n == 0 {
            1.0
        } else {
            let x = PI * CUTOFF * n as f64;
            x.sin() / x
        };
        let window = 0.42 - 0.5 * (2.0 * PI * i as f64 / (FIR_TAP_COUNT - 1) as f64).cos()
            + 0.08 * (4.0 * PI * i as f64 / (FIR_TAP_COUNT - 1) as f64).cos();
        *coeff = sinc * window * CUTOFF;
    }
    coeffs
}

impl Oversampler {
    pub fn new() -> Self {
        Self {
            coeffs: generate_fir_coeffs(),
            up_history: [0.0; FIR_TAP_COUNT],
            down_history: [0.0; FIR_TAP_COUNT],
            history_index: 0,
        }
    }

    /// Produce the four oversampled values for one input sample
    #[inline]
    pub fn upsample(&mut self, input: Sample) -> [Sample; OVERSAMPLING_FACTOR] {
        self.up_history[self.history_index] = input * OVERSAMPLING_FACTOR as f64;

        let mut output = [0.0; OVERSAMPLING_FACTOR];
        for out in output.iter_mut() {
            let mut sum = 0.0;
            for (i, &coeff) in self.coeffs.iter().enumerate() {
                let idx = (self.history_index + FIR_TAP_COUNT - i) % FIR_TAP_COUNT;
                sum += self.up_history[idx] * coeff;
            }
            *out = sum;
        }

        self.history_index = (self.history_index + 1) % FIR_TAP_COUNT;
        output
    }

    /// Collapse four oversampled values back to one output sample
    #[inline]
    pub fn downsample(&mut self, input: &[Sample; OVERSAMPLING_FACTOR]) -> Sample {
        for &value in input.iter() {
            self.down_history[self.history_index] = value;
            self.history_index = (self.history_index + 1) % FIR_TAP_COUNT;
        }

        let mut sum = 0.0;
        let mut i = 0;
        while i < FIR_TAP_COUNT {
            let idx = (self.history_index + FIR_TAP_COUNT - i) % FIR_TAP_COUNT;
            sum += self.down_history[idx] * self.coeffs[i];
            i += OVERSAMPLING_FACTOR;
        }
        sum
    }

    pub fn reset(&mut self) {
        self.up_history = [0.0; FIR_TAP_COUNT];
        self.down_history = [0.0; FIR_TAP_COUNT];
        self.history_index = 0;
    }
}

impl Default for Oversampler {
    fn default() -> Self {
        Self::new()
    }
}
