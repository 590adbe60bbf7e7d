//! Zero-delay-feedback state-variable filter
//!
//! Trapezoidal-integration SVF. The `tan` pre-warp keeps the response
//! analog-accurate up to Nyquist, which matters for the 14 kHz air band
//! and the K-weighting shelf.

use anvil_core::{Sample, db_to_linear};
use std::f64::consts::PI;

use crate::{MonoProcessor, Processor, ProcessorConfig};

/// Filter roles supported by the SVF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
    Bell,
    LowShelf,
    HighShelf,
    Notch,
}

/// Derived SVF coefficients
///
/// A pure function of (frequency, Q, gain, role, sample rate): three state
/// weights `a1..a3` shared by every role, and the role-specific mix
/// weights `m0..m2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvfCoeffs {
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub m0: f64,
    pub m1: f64,
    pub m2: f64,
}

impl SvfCoeffs {
    /// Calculate coefficients for the given role
    pub fn new(freq: f64, q: f64, gain_db: f64, filter_type: FilterType, sample_rate: f64) -> Self {
        let g = (PI * freq / sample_rate).tan();
        let k = 1.0 / q;
        let a = db_to_linear(gain_db);

        let a1 = 1.0 / (1.0 + g * (g + k));
        let a2 = g * a1;
        let a3 = g * a2;

        let (m0, m1, m2) = match filter_type {
            FilterType::Lowpass => (0.0, 0.0, 1.0),
            FilterType::Highpass => (1.0, -k, -1.0),
            FilterType::Bandpass => (0.0, 1.0, 0.0),
            FilterType::Bell => (1.0, k * (a * a - 1.0), 0.0),
            FilterType::LowShelf => (1.0, k * (a - 1.0), a * a - 1.0),
            FilterType::HighShelf => (a * a, k * (1.0 - a) * a, 1.0 - a * a),
            FilterType::Notch => (1.0, -k, 0.0),
        };

        Self {
            a1,
            a2,
            a3,
            m0,
            m1,
            m2,
        }
    }
}

/// ZDF state-variable filter
#[derive(Debug, Clone)]
pub struct Svf {
    coeffs: SvfCoeffs,
    ic1: f64,
    ic2: f64,
    sample_rate: f64,
}

impl Svf {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            coeffs: SvfCoeffs::new(1000.0, 0.707, 0.0, FilterType::Bell, sample_rate),
            ic1: 0.0,
            ic2: 0.0,
            sample_rate,
        }
    }

    /// Create with a role already configured
    pub fn with_role(
        freq: f64,
        q: f64,
        gain_db: f64,
        filter_type: FilterType,
        sample_rate: f64,
    ) -> Self {
        Self {
            coeffs: SvfCoeffs::new(freq, q, gain_db, filter_type, sample_rate),
            ic1: 0.0,
            ic2: 0.0,
            sample_rate,
        }
    }

    /// Recompute coefficients; integrator state is kept
    pub fn set(&mut self, freq: f64, q: f64, gain_db: f64, filter_type: FilterType) {
        self.coeffs = SvfCoeffs::new(freq, q, gain_db, filter_type, self.sample_rate);
    }

    #[inline]
    pub fn set_coeffs(&mut self, coeffs: SvfCoeffs) {
        self.coeffs = coeffs;
    }

    #[inline]
    pub fn coeffs(&self) -> &SvfCoeffs {
        &self.coeffs
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

impl Processor for Svf {
    fn reset(&mut self) {
        self.ic1 = 0.0;
        self.ic2 = 0.0;
    }
}

impl MonoProcessor for Svf {
    #[inline(always)]
    fn process_sample(&mut self, input: Sample) -> Sample {
        let v3 = input - self.ic2;
        let v1 = self.coeffs.a1 * self.ic1 + self.coeffs.a2 * v3;
        let v2 = self.ic2 + self.coeffs.a2 * self.ic1 + self.coeffs.a3 * v3;
        self.ic1 = 2.0 * v1 - self.ic1;
        self.ic2 = 2.0 * v2 - self.ic2;
        self.coeffs.m0 * input + self.coeffs.m1 * v1 + self.coeffs.m2 * v2
    }
}

impl ProcessorConfig for Svf {
    // Stores the rate only; callers re-derive coefficients afterwards.
    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }
}
