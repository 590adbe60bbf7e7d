//! The mastering engine
//!
//! Fixed-order signal chain, one stereo frame at a time:
//!
//! DC block -> input trim -> 7-band EQ -> air protection -> de-esser ->
//! stereo imager -> multiband compression -> saturation -> true-peak
//! limiter -> dither -> metering taps
//!
//! The ordering matters: imaging precedes multiband so the
//! compressor glues the already-widened signal, saturation precedes
//! limiting so the limiter owns the output ceiling, dither is last.

use anvil_core::{Sample, db_to_linear};
use anvil_dsp::dc::DcBlocker;
use anvil_dsp::dither::TpdfDither;
use anvil_dsp::dynamics::DeEsser;
use anvil_dsp::eq::{EQ_BANDS, SevenBandEq};
use anvil_dsp::metering::{CREST_SILENCE_DB, CorrelationMeter, CrestFactorAnalyzer, LufsMeter};
use anvil_dsp::multiband::MultibandCompressor;
use anvil_dsp::saturation::{AnalogSaturation, HfProtection};
use anvil_dsp::smoothing::ParamSmoother;
use anvil_dsp::stereo::StereoImager;
use anvil_dsp::{MonoProcessor, Processor, ProcessorConfig, StereoProcessor};

use crate::EngineConfig;
use crate::analysis::{MixHealthAnalyzer, MixHealthReport, multiband_policy_for_crest};
use crate::error::{MasterError, MasterResult};
use crate::limiter::TruePeakLimiter;

/// Crest/correlation/health/auto-master evaluation cadence in samples
const ANALYSIS_WINDOW: usize = 4800;

/// Input-trim smoothing time
const INPUT_GAIN_SMOOTH_MS: f64 = 20.0;

/// Real-time stereo mastering engine
pub struct MasteringEngine {
    sample_rate: f64,

    // Signal chain, in processing order
    dc_l: DcBlocker,
    dc_r: DcBlocker,
    input_gain: ParamSmoother,
    eq_l: SevenBandEq,
    eq_r: SevenBandEq,
    hf_protect_l: HfProtection,
    hf_protect_r: HfProtection,
    deesser_l: DeEsser,
    deesser_r: DeEsser,
    imager: StereoImager,
    multiband: MultibandCompressor,
    saturation_l: AnalogSaturation,
    saturation_r: AnalogSaturation,
    limiter: TruePeakLimiter,
    dither_l: TpdfDither,
    dither_r: TpdfDither,

    // Metering & analysis
    lufs_meter: LufsMeter,
    crest: CrestFactorAnalyzer,
    correlation: CorrelationMeter,
    health: MixHealthAnalyzer,
    ai_enabled: bool,
}

impl MasteringEngine {
    pub fn new(sample_rate: f64) -> Self {
        let mut input_gain = ParamSmoother::new(INPUT_GAIN_SMOOTH_MS, sample_rate);
        input_gain.set_immediate(0.0);
        Self {
            sample_rate,
            dc_l: DcBlocker::new(),
            dc_r: DcBlocker::new(),
            input_gain,
            eq_l: SevenBandEq::new(sample_rate),
            eq_r: SevenBandEq::new(sample_rate),
            hf_protect_l: HfProtection::new(sample_rate),
            hf_protect_r: HfProtection::new(sample_rate),
            deesser_l: DeEsser::new(sample_rate),
            deesser_r: DeEsser::new(sample_rate),
            imager: StereoImager::new(sample_rate),
            multiband: MultibandCompressor::new(sample_rate),
            saturation_l: AnalogSaturation::new(sample_rate),
            saturation_r: AnalogSaturation::new(sample_rate),
            limiter: TruePeakLimiter::new(sample_rate),
            dither_l: TpdfDither::new(),
            dither_r: TpdfDither::new(),
            lufs_meter: LufsMeter::new(sample_rate),
            crest: CrestFactorAnalyzer::new(ANALYSIS_WINDOW),
            correlation: CorrelationMeter::new(ANALYSIS_WINDOW),
            health: MixHealthAnalyzer::new(),
            ai_enabled: false,
        }
    }

    /// Create with a full parameter snapshot applied
    pub fn with_config(sample_rate: f64, config: &EngineConfig) -> Self {
        let mut engine = Self::new(sample_rate);
        engine.apply_config(config);
        engine
    }

    /// Apply a parameter snapshot through the ordinary setters
    pub fn apply_config(&mut self, config: &EngineConfig) {
        self.set_dc_filter_enabled(config.dc_filter_enabled);
        self.set_input_gain(config.input_gain_db);
        self.set_all_eq_gains(&config.eq_gains_db);
        self.set_deesser_enabled(config.deesser_enabled);
        self.set_deesser_threshold(config.deesser_threshold_db);
        self.set_deesser_ratio(config.deesser_ratio);
        self.set_multiband_enabled(config.multiband_enabled);
        self.set_multiband_low_band(config.multiband_low.threshold_db, config.multiband_low.ratio);
        self.set_multiband_mid_band(config.multiband_mid.threshold_db, config.multiband_mid.ratio);
        self.set_multiband_high_band(
            config.multiband_high.threshold_db,
            config.multiband_high.ratio,
        );
        self.set_stereo_width(config.stereo_width);
        self.set_saturation_drive(config.saturation_drive);
        self.set_saturation_mix(config.saturation_mix);
        self.set_limiter_threshold(config.limiter_threshold_db);
        self.set_limiter_release(config.limiter_release_sec);
        self.set_limiter_safe_clip(config.limiter_safe_clip);
        self.set_dithering_enabled(config.dither_enabled);
        self.set_dithering_bits(config.dither_bits);
        self.set_ai_enabled(config.ai_enabled);
    }

    // ------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------

    /// Re-warp every filter and rebuild the rate-dependent buffers
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.input_gain
            .set_smooth_time(INPUT_GAIN_SMOOTH_MS, sample_rate);
        self.eq_l.set_sample_rate(sample_rate);
        self.eq_r.set_sample_rate(sample_rate);
        self.hf_protect_l.set_sample_rate(sample_rate);
        self.hf_protect_r.set_sample_rate(sample_rate);
        self.deesser_l.set_sample_rate(sample_rate);
        self.deesser_r.set_sample_rate(sample_rate);
        self.imager.set_sample_rate(sample_rate);
        self.multiband.set_sample_rate(sample_rate);
        self.saturation_l.set_sample_rate(sample_rate);
        self.saturation_r.set_sample_rate(sample_rate);
        self.limiter.set_sample_rate(sample_rate);
        self.lufs_meter.set_sample_rate(sample_rate);
        log::debug!("mastering engine re-warped for {sample_rate} Hz");
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn set_dc_filter_enabled(&mut self, enabled: bool) {
        self.dc_l.set_enabled(enabled);
        self.dc_r.set_enabled(enabled);
    }

    /// Input trim in dB; smoothed over 20 ms
    pub fn set_input_gain(&mut self, gain_db: f64) {
        self.input_gain.set_target(gain_db);
    }

    /// Gain for one EQ band (0..6) in dB
    pub fn set_eq_gain(&mut self, band: usize, gain_db: f64) {
        self.eq_l.set_band_gain(band, gain_db);
        self.eq_r.set_band_gain(band, gain_db);
    }

    pub fn set_all_eq_gains(&mut self, gains_db: &[f64; EQ_BANDS]) {
        self.eq_l.set_all_gains(gains_db);
        self.eq_r.set_all_gains(gains_db);
    }

    pub fn set_deesser_enabled(&mut self, enabled: bool) {
        self.deesser_l.set_enabled(enabled);
        self.deesser_r.set_enabled(enabled);
    }

    pub fn set_deesser_threshold(&mut self, threshold_db: f64) {
        self.deesser_l.set_threshold(threshold_db);
        self.deesser_r.set_threshold(threshold_db);
    }

    pub fn set_deesser_ratio(&mut self, ratio: f64) {
        self.deesser_l.set_ratio(ratio);
        self.deesser_r.set_ratio(ratio);
    }

    pub fn set_multiband_enabled(&mut self, enabled: bool) {
        self.multiband.set_enabled(enabled);
    }

    pub fn set_multiband_low_band(&mut self, threshold_db: f64, ratio: f64) {
        self.multiband.set_low_band(threshold_db, ratio);
    }

    pub fn set_multiband_mid_band(&mut self, threshold_db: f64, ratio: f64) {
        self.multiband.set_mid_band(threshold_db, ratio);
    }

    pub fn set_multiband_high_band(&mut self, threshold_db: f64, ratio: f64) {
        self.multiband.set_high_band(threshold_db, ratio);
    }

    /// Stereo width 0..2; smoothed over 50 ms
    pub fn set_stereo_width(&mut self, width: f64) {
        self.imager.set_width(width);
    }

    pub fn set_saturation_drive(&mut self, drive: f64) {
        self.saturation_l.set_drive(drive);
        self.saturation_r.set_drive(drive);
    }

    pub fn set_saturation_mix(&mut self, mix: f64) {
        self.saturation_l.set_mix(mix);
        self.saturation_r.set_mix(mix);
    }

    pub fn set_limiter_threshold(&mut self, threshold_db: f64) {
        self.limiter.set_threshold(threshold_db);
    }

    pub fn set_limiter_release(&mut self, release_sec: f64) {
        self.limiter.set_release(release_sec);
    }

    pub fn set_limiter_safe_clip(&mut self, enabled: bool) {
        self.limiter.set_safe_clip(enabled);
    }

    pub fn set_dithering_enabled(&mut self, enabled: bool) {
        self.dither_l.set_enabled(enabled);
        self.dither_r.set_enabled(enabled);
    }

    pub fn set_dithering_bits(&mut self, bits: u32) {
        self.dither_l.set_target_bits(bits);
        self.dither_r.set_target_bits(bits);
    }

    pub fn set_ai_enabled(&mut self, enabled: bool) {
        self.ai_enabled = enabled;
    }

    // ------------------------------------------------------------------
    // Processing
    // ------------------------------------------------------------------

    /// Process one stereo frame in place
    pub fn process_stereo(&mut self, left: &mut Sample, right: &mut Sample) {
        let mut l = self.dc_l.process_sample(*left);
        let mut r = self.dc_r.process_sample(*right);

        let gain = db_to_linear(self.input_gain.next());
        l *= gain;
        r *= gain;

        l = self.eq_l.process_sample(l);
        r = self.eq_r.process_sample(r);

        l = self.hf_protect_l.process_sample(l);
        r = self.hf_protect_r.process_sample(r);

        l = self.deesser_l.process_sample(l);
        r = self.deesser_r.process_sample(r);

        (l, r) = self.imager.process_sample(l, r);
        (l, r) = self.multiband.process_sample(l, r);

        l = self.saturation_l.process_sample(l);
        r = self.saturation_r.process_sample(r);

        (l, r) = self.limiter.process_sample(l, r);

        l = self.dither_l.process_sample(l);
        r = self.dither_r.process_sample(r);

        self.lufs_meter.process_sample(l, r);
        self.crest.process_sample(l, r);
        if let Some(correlation) = self.correlation.process_sample(l, r) {
            self.health.analyze(
                self.crest.peak_db(),
                correlation,
                self.lufs_meter.integrated_lufs(),
            );
            if self.ai_enabled {
                self.apply_auto_master();
            }
        }

        *left = l;
        *right = r;
    }

    /// Interleaved-stereo convenience wrapper over `process_stereo`
    pub fn process_buffer(
        &mut self,
        input: &[Sample],
        output: &mut [Sample],
        frames: usize,
    ) -> MasterResult<()> {
        let needed = frames * 2;
        if input.len() < needed {
            return Err(MasterError::BufferMismatch {
                expected: needed,
                got: input.len(),
            });
        }
        if output.len() < needed {
            return Err(MasterError::BufferMismatch {
                expected: needed,
                got: output.len(),
            });
        }

        for frame in 0..frames {
            let mut l = input[frame * 2];
            let mut r = input[frame * 2 + 1];
            self.process_stereo(&mut l, &mut r);
            output[frame * 2] = l;
            output[frame * 2 + 1] = r;
        }
        Ok(())
    }

    fn apply_auto_master(&mut self) {
        let crest_db = self.crest.crest_factor_db();
        // The silence sentinel is not a dynamics reading; leave settings be
        if crest_db >= CREST_SILENCE_DB {
            return;
        }

        match multiband_policy_for_crest(crest_db) {
            Some(policy) => {
                if !self.multiband.enabled() {
                    log::debug!("auto-master engaging multiband at crest {crest_db:.1} dB");
                }
                self.multiband.set_enabled(true);
                self.multiband
                    .set_low_band(policy.low.threshold_db, policy.low.ratio);
                self.multiband
                    .set_mid_band(policy.mid.threshold_db, policy.mid.ratio);
                self.multiband
                    .set_high_band(policy.high.threshold_db, policy.high.ratio);
            }
            None => {
                self.multiband.set_enabled(false);
            }
        }
    }

    // ------------------------------------------------------------------
    // Metering & utilities
    // ------------------------------------------------------------------

    pub fn integrated_lufs(&self) -> f64 {
        self.lufs_meter.integrated_lufs()
    }

    pub fn short_term_lufs(&self) -> f64 {
        self.lufs_meter.short_term_lufs()
    }

    pub fn momentary_lufs(&self) -> f64 {
        self.lufs_meter.momentary_lufs()
    }

    pub fn loudness_range(&self) -> f64 {
        self.lufs_meter.loudness_range()
    }

    pub fn phase_correlation(&self) -> f64 {
        self.correlation.correlation()
    }

    pub fn crest_factor_db(&self) -> f64 {
        self.crest.crest_factor_db()
    }

    pub fn limiter_gain_reduction_db(&self) -> f64 {
        self.limiter.gain_reduction_db()
    }

    pub fn peak_db(&self) -> f64 {
        self.crest.peak_db()
    }

    pub fn rms_db(&self) -> f64 {
        self.crest.rms_db()
    }

    pub fn deesser_gain_reduction_db(&self) -> f64 {
        self.deesser_l.gain_reduction_db()
    }

    /// Reported latency: the limiter's look-ahead ring length
    pub fn latency_samples(&self) -> usize {
        self.limiter.latency()
    }

    pub fn mix_health_report(&self) -> &MixHealthReport {
        self.health.report()
    }

    /// Restore every stateful component to its initial state
    pub fn reset(&mut self) {
        self.dc_l.reset();
        self.dc_r.reset();
        self.input_gain.reset();
        self.eq_l.reset();
        self.eq_r.reset();
        self.hf_protect_l.reset();
        self.hf_protect_r.reset();
        self.deesser_l.reset();
        self.deesser_r.reset();
        self.imager.reset();
        self.multiband.reset();
        self.saturation_l.reset();
        self.saturation_r.reset();
        self.limiter.reset();
        self.dither_l.reset();
        self.dither_r.reset();
        self.lufs_meter.reset();
        self.crest.reset();
        self.correlation.reset();
    }
}
