//! Seven-band parametric EQ
//!
//! Seven cascaded bell filters at fixed mastering-oriented centres. Each
//! band's gain runs through a 20 ms smoother and the filter coefficients
//! follow the smoothed value, so gain moves are zipper-free. Coefficients
//! are only re-derived when the smoothed gain has actually moved, which
//! keeps the cascade out of the recompute path once parameters settle.

use anvil_core::Sample;

use crate::smoothing::ParamSmoother;
use crate::svf::{FilterType, Svf};
use crate::{MonoProcessor, Processor, ProcessorConfig};

/// Number of EQ bands
pub const EQ_BANDS: usize = 7;

/// Fixed band centres in Hz
pub const CENTER_FREQS: [f64; EQ_BANDS] = [40.0, 120.0, 350.0, 1000.0, 3500.0, 8000.0, 14000.0];

/// Fixed bandwidth for every band
const BAND_Q: f64 = 0.707;

/// Gain smoothing time
const GAIN_SMOOTH_MS: f64 = 20.0;

/// Re-derive coefficients once the smoothed gain moved this far (dB)
const GAIN_EPSILON_DB: f64 = 0.01;

/// Seven-band bell EQ with smoothed gains
#[derive(Debug, Clone)]
pub struct SevenBandEq {
    filters: [Svf; EQ_BANDS],
    gain_smoothers: [ParamSmoother; EQ_BANDS],
    applied_gain: [f64; EQ_BANDS],
}

impl SevenBandEq {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            filters: std::array::from_fn(|band| {
                Svf::with_role(
                    CENTER_FREQS[band],
                    BAND_Q,
                    0.0,
                    FilterType::Bell,
                    sample_rate,
                )
            }),
            gain_smoothers: std::array::from_fn(|_| ParamSmoother::new(GAIN_SMOOTH_MS, sample_rate)),
            applied_gain: [0.0; EQ_BANDS],
        }
    }

    /// Set one band's gain in dB; takes effect over the smoothing time
    pub fn set_band_gain(&mut self, band: usize, gain_db: f64) {
        if band < EQ_BANDS {
            self.gain_smoothers[band].set_target(gain_db);
        }
    }

    /// Set all seven band gains at once
    pub fn set_all_gains(&mut self, gains_db: &[f64; EQ_BANDS]) {
        for (band, &gain) in gains_db.iter().enumerate() {
            self.set_band_gain(band, gain);
        }
    }

    pub fn band_gain_target(&self, band: usize) -> f64 {
        self.gain_smoothers[band].target()
    }
}

impl Processor for SevenBandEq {
    fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}

impl MonoProcessor for SevenBandEq {
    #[inline]
    fn process_sample(&mut self, input: Sample) -> Sample {
        let mut output = input;
        for band in 0..EQ_BANDS {
            let gain = self.gain_smoothers[band].next();
            if (gain - self.applied_gain[band]).abs() > GAIN_EPSILON_DB {
                self.filters[band].set(CENTER_FREQS[band], BAND_Q, gain, FilterType::Bell);
                self.applied_gain[band] = gain;
            }
            output = self.filters[band].process_sample(output);
        }
        output
    }
}

impl ProcessorConfig for SevenBandEq {
    fn set_sample_rate(&mut self, sample_rate: f64) {
        for band in 0..EQ_BANDS {
            self.filters[band].set_sample_rate(sample_rate);
            self.filters[band].set(
                CENTER_FREQS[band],
                BAND_Q,
                self.applied_gain[band],
                FilterType::Bell,
            );
            self.gain_smoothers[band].set_smooth_time(GAIN_SMOOTH_MS, sample_rate);
        }
    }
}
