//! Standalone sample-rate converter
//!
//! Offline windowed-sinc interpolation over a 128-tap table. This is a
//! utility for preparing material at the engine rate, not part of the
//! real-time chain.

use anvil_core::Sample;
use std::f64::consts::PI;

/// Interpolation kernel length
const SINC_TAPS: usize = 128;

/// Windowed-sinc sample-rate converter
#[derive(Debug, Clone)]
pub struct SampleRateConverter {
    sinc_table: [f64; SINC_TAPS],
}

impl SampleRateConverter {
    pub fn new() -> Self {
        let mut sinc_table = [0.0; SINC_TAPS];
        for (i, entry) in sinc_table.iter_mut().enumerate() {
            let n = i as i64 - (SINC_TAPS as i64) / 2;
            let x = n as f64 * 0.5;
            let sinc = if x == 0.0 { 1.0 } else { (PI * x).sin() / (PI * x) };
            let window = 0.42 - 0.5 * (2.0 * PI * i as f64 / (SINC_TAPS - 1) as f64).cos()
                + 0.08 * (4.0 * PI * i as f64 / (SINC_TAPS - 1) as f64).cos();
            *entry = sinc * window;
        }
        Self { sinc_table }
    }

    /// Interpolate one value at a (fractional) source position
    pub fn interpolate(&self, samples: &[Sample], position: f64) -> Sample {
        let base_index = position as i64;

        let mut sum = 0.0;
        for (i, &coeff) in self.sinc_table.iter().enumerate() {
            let sample_index = base_index + i as i64 - (SINC_TAPS as i64) / 2;
            if sample_index >= 0 && (sample_index as usize) < samples.len() {
                sum += samples[sample_index as usize] * coeff;
            }
        }
        sum
    }

    /// Convert a buffer from `input_rate` to `output_rate`
    pub fn convert(&self, input: &[Sample], input_rate: f64, output_rate: f64) -> Vec<Sample> {
        let ratio = output_rate / input_rate;
        let output_length = (input.len() as f64 * ratio) as usize;

        let mut output = Vec::with_capacity(output_length);
        for i in 0..output_length {
            let position = i as f64 / ratio;
            output.push(self.interpolate(input, position));
        }
        output
    }
}

impl Default for SampleRateConverter {
    fn default() -> Self {
        Self::new()
    }
}
