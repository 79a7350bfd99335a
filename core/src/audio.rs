//! Drains the FM chip and the PSG collaborator through a pair of Lanczos resamplers and
//! sums them into the host-rate stereo stream.

use bincode::{Decode, Encode};
use jgenesis_common::audio::lanczos::{MonoLanczosResampler, StereoLanczosResampler};
use jgenesis_common::frontend::TimingMode;

pub const NTSC_MCLK_FREQUENCY: f64 = 53_693_175.0;
pub const PAL_MCLK_FREQUENCY: f64 = 53_203_424.0;

const FM_MCLK_DIVIDER: f64 = 144.0;
const PSG_MCLK_DIVIDER: f64 = 15.0 * 16.0;

/// Approximates the Mega Drive's analog output filter.
const OUTPUT_LOW_PASS_CUTOFF_HZ: f64 = 22_000.0;

/// -7dB, matching the relative levels of the FM and PSG outputs on real hardware.
pub const PSG_COEFFICIENT: f64 = 0.446_683_592_150_963_15;

#[must_use]
pub fn mclk_frequency(timing_mode: TimingMode) -> f64 {
    match timing_mode {
        TimingMode::Ntsc => NTSC_MCLK_FREQUENCY,
        TimingMode::Pal => PAL_MCLK_FREQUENCY,
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Mixer {
    fm_resampler: StereoLanczosResampler,
    psg_resampler: MonoLanczosResampler,
    fm_enabled: bool,
    psg_enabled: bool,
}

impl Mixer {
    #[must_use]
    pub fn new(timing_mode: TimingMode, output_frequency: u64) -> Self {
        let mclk = mclk_frequency(timing_mode);
        let fm_rate = mclk / FM_MCLK_DIVIDER / 6.0;
        let psg_rate = mclk / PSG_MCLK_DIVIDER;

        let mut fm_resampler = StereoLanczosResampler::new(fm_rate, output_frequency as f64);
        fm_resampler.set_low_pass_cutoff(Some(OUTPUT_LOW_PASS_CUTOFF_HZ));

        let mut psg_resampler = MonoLanczosResampler::new(psg_rate, output_frequency as f64);
        psg_resampler.set_low_pass_cutoff(Some(OUTPUT_LOW_PASS_CUTOFF_HZ));

        Self { fm_resampler, psg_resampler, fm_enabled: true, psg_enabled: true }
    }

    pub fn update_timing_mode(&mut self, timing_mode: TimingMode) {
        let mclk = mclk_frequency(timing_mode);
        self.fm_resampler.update_source_frequency(mclk / FM_MCLK_DIVIDER / 6.0);
        self.psg_resampler.update_source_frequency(mclk / PSG_MCLK_DIVIDER);
    }

    pub fn update_output_frequency(&mut self, output_frequency: u64) {
        self.fm_resampler.update_target_frequency(output_frequency as f64);
        self.psg_resampler.update_target_frequency(output_frequency as f64);
    }

    pub fn set_fm_enabled(&mut self, enabled: bool) {
        self.fm_enabled = enabled;
    }

    pub fn set_psg_enabled(&mut self, enabled: bool) {
        self.psg_enabled = enabled;
    }

    pub fn collect_fm_sample(&mut self, left: i16, right: i16) {
        self.fm_resampler.collect([f64::from(left) / 0x2000 as f64, f64::from(right) / 0x2000 as f64]);
    }

    pub fn collect_psg_sample(&mut self, sample: i16) {
        self.psg_resampler.collect([f64::from(sample) / i16::MAX as f64]);
    }

    /// Drain every output-rate frame that's ready, delivering it through `audio_sample`.
    pub fn drain(&mut self, mut audio_sample: impl FnMut(i16, i16)) {
        let ready = std::cmp::min(
            self.fm_resampler.output_buffer_len(),
            self.psg_resampler.output_buffer_len(),
        );

        for _ in 0..ready {
            let [fm_l, fm_r] = self.fm_resampler.output_buffer_pop_front().unwrap();
            let [psg] = self.psg_resampler.output_buffer_pop_front().unwrap();

            let fm_l = if self.fm_enabled { fm_l } else { 0.0 };
            let fm_r = if self.fm_enabled { fm_r } else { 0.0 };
            let psg = if self.psg_enabled { psg } else { 0.0 };

            let left = (fm_l + PSG_COEFFICIENT * psg).clamp(-1.0, 1.0);
            let right = (fm_r + PSG_COEFFICIENT * psg).clamp(-1.0, 1.0);

            audio_sample((left * i16::MAX as f64) as i16, (right * i16::MAX as f64) as i16);
        }
    }
}
