//! TPDF dither and bit-depth quantisation
//!
//! Two uniform draws summed and halved give triangular-PDF noise at one
//! LSB of the target depth, decorrelating quantisation error from the
//! signal. The PRNG is seeded so renders are reproducible sample-for-sample.

use anvil_core::Sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{MonoProcessor, Processor};

/// Fixed PRNG seed; reset() re-seeds so renders are repeatable
const DITHER_SEED: u64 = 12345;

/// TPDF dither processor with quantisation to the target bit depth
#[derive(Debug, Clone)]
pub struct TpdfDither {
    rng: ChaCha8Rng,
    target_bits: u32,
    enabled: bool,
}

impl TpdfDither {
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(DITHER_SEED),
            target_bits: 16,
            enabled: false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Target bit depth, clamped to 8..24
    pub fn set_target_bits(&mut self, bits: u32) {
        self.target_bits = bits.clamp(8, 24);
    }

    pub fn target_bits(&self) -> u32 {
        self.target_bits
    }
}

impl Default for TpdfDither {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for TpdfDither {
    fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(DITHER_SEED);
    }
}

impl MonoProcessor for TpdfDither {
    #[inline]
    fn process_sample(&mut self, input: Sample) -> Sample {
        if !self.enabled {
            return input;
        }

        let draw1: f64 = self.rng.random_range(-1.0..1.0);
        let draw2: f64 = self.rng.random_range(-1.0..1.0);
        let tpdf = (draw1 + draw2) * 0.5;

        let scale = 2.0_f64.powi(self.target_bits as i32 - 1);
        let lsb = 1.0 / scale;

        let dithered = input + tpdf * lsb;
        (dithered * scale).round() / scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_is_transparent() {
        let mut dither = TpdfDither::new();
        assert_eq!(dither.process_sample(0.123456789), 0.123456789);
    }

    #[test]
    fn test_deterministic_with_fixed_seed() {
        let input: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.07).sin() * 0.5).collect();

        let mut dither = TpdfDither::new();
        dither.set_enabled(true);
        let first: Vec<f64> = input.iter().map(|&x| dither.process_sample(x)).collect();

        dither.reset();
        for (i, &x) in input.iter().enumerate() {
            assert_eq!(
                dither.process_sample(x),
                first[i],
                "dither diverged at sample {i}"
            );
        }
    }

    #[test]
    fn test_output_lands_on_quantisation_grid() {
        let mut dither = TpdfDither::new();
        dither.set_enabled(true);
        dither.set_target_bits(16);
        let scale = 2.0_f64.powi(15);
        for i in 0..1000 {
            let x = (i as f64 * 0.07).sin() * 0.5;
            let y = dither.process_sample(x);
            let steps = y * scale;
            assert!(
                (steps - steps.round()).abs() < 1e-9,
                "output {y} is off the 16-bit grid"
            );
        }
    }

    #[test]
    fn test_bits_clamp() {
        let mut dither = TpdfDither::new();
        dither.set_target_bits(2);
        assert_eq!(dither.target_bits(), 8);
        dither.set_target_bits(32);
        assert_eq!(dither.target_bits(), 24);
    }

    #[test]
    fn test_error_stays_within_one_lsb() {
        let mut dither = TpdfDither::new();
        dither.set_enabled(true);
        dither.set_target_bits(16);
        let lsb = 1.0 / 2.0_f64.powi(15);
        for i in 0..1000 {
            let x = (i as f64 * 0.07).sin() * 0.5;
            let y = dither.process_sample(x);
            assert!((y - x).abs() <= 1.5 * lsb, "quantisation error too large");
        }
    }
}
