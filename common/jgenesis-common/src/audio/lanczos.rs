//! Windowed-sinc resampling using a Lanczos (radius-3) kernel.
//!
//! Unlike the fixed-ratio FIR tables in [`super::sinc`], this resampler evaluates the
//! kernel analytically so it can be retuned to an arbitrary source/target rate ratio at
//! runtime, which the Genesis audio pipeline needs because the PSG and FM chips run at
//! different native rates than the host's requested output rate.

use bincode::{Decode, Encode};
use std::collections::VecDeque;
use std::f64::consts::PI;

/// Lanczos kernel half-width in source samples.
const RADIUS: i64 = 3;

#[must_use]
fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-9 { 1.0 } else { (PI * x).sin() / (PI * x) }
}

/// `Lanczos(x)`, zero outside `[-radius, radius]`.
#[must_use]
fn lanczos_weight(x: f64, radius: f64) -> f64 {
    if x.abs() >= radius { 0.0 } else { sinc(x) * sinc(x / radius) }
}

/// A streaming windowed-sinc resampler for an arbitrary source/target rate ratio.
///
/// Input samples are pushed one at a time via [`collect`](Self::collect); output samples
/// become available once enough future input has arrived to fully evaluate the kernel
/// around them, which introduces a fixed latency of [`RADIUS`] source samples.
#[derive(Debug, Clone, Encode, Decode)]
pub struct LanczosResampler<const CHANNELS: usize> {
    source_rate: f64,
    target_rate: f64,
    // Ring of input samples, indexed by `virtual_index - base_virtual_index`. Seeded with
    // `RADIUS` zero samples so the kernel never reads before the start of the stream.
    buffer: VecDeque<[f64; CHANNELS]>,
    base_virtual_index: i64,
    next_virtual_index: i64,
    next_output_position: f64,
    output: VecDeque<[f64; CHANNELS]>,
    // > 1.0 widens the kernel beyond what the rate ratio alone requires, approximating an
    // additional low-pass filter (e.g. the Genesis's ~22kHz analog output filter).
    low_pass_widen: f64,
}

impl<const CHANNELS: usize> LanczosResampler<CHANNELS> {
    #[must_use]
    pub fn new(source_rate: f64, target_rate: f64) -> Self {
        let mut buffer = VecDeque::with_capacity(64);
        buffer.extend(std::iter::repeat_n([0.0; CHANNELS], RADIUS as usize));

        Self {
            source_rate,
            target_rate,
            buffer,
            base_virtual_index: -RADIUS,
            next_virtual_index: 0,
            next_output_position: 0.0,
            output: VecDeque::with_capacity(64),
            low_pass_widen: 1.0,
        }
    }

    /// Approximate an analog low-pass filter at `cutoff_hz` by widening the kernel.
    /// Pass `None` to disable (unity width, subject to the rate-ratio low-pass below).
    pub fn set_low_pass_cutoff(&mut self, cutoff_hz: Option<f64>) {
        self.low_pass_widen = match cutoff_hz {
            Some(cutoff) if cutoff > 0.0 => (self.source_rate / (2.0 * cutoff)).max(1.0),
            _ => 1.0,
        };
    }

    pub fn update_source_frequency(&mut self, source_rate: f64) {
        self.source_rate = source_rate;
    }

    pub fn update_target_frequency(&mut self, target_rate: f64) {
        self.target_rate = target_rate;
    }

    /// Kernel time-scale: < 1.0 stretches the kernel (low-pass, used when downsampling or
    /// when an explicit low-pass cutoff is set), 1.0 is unity width.
    fn kernel_scale(&self) -> f64 {
        let rate_scale = if self.target_rate < self.source_rate {
            self.target_rate / self.source_rate
        } else {
            1.0
        };
        rate_scale.min(1.0 / self.low_pass_widen)
    }

    pub fn collect(&mut self, sample: [f64; CHANNELS]) {
        self.buffer.push_back(sample);
        self.next_virtual_index += 1;
        self.generate_ready_outputs();
    }

    /// Pad the tail with `RADIUS` zero samples so any output still pending near the end of
    /// a finite stream gets produced. The high-level, buffer-at-both-ends counterpart to
    /// the zero padding `new` seeds at the head.
    pub fn flush(&mut self) {
        for _ in 0..RADIUS {
            self.collect([0.0; CHANNELS]);
        }
    }

    fn generate_ready_outputs(&mut self) {
        if self.target_rate <= 0.0 || self.source_rate <= 0.0 {
            return;
        }
        let ratio = self.target_rate / self.source_rate;
        let scale = self.kernel_scale();
        let support_radius = RADIUS as f64 / scale;

        loop {
            let t = self.next_output_position;
            let floor_t = t.floor();
            let lo = (floor_t - support_radius.ceil() + 1.0) as i64;
            let hi = (floor_t + support_radius.ceil()) as i64;

            if hi >= self.next_virtual_index {
                break;
            }

            let mut sum = [0.0; CHANNELS];
            for v in lo..=hi {
                let idx = v - self.base_virtual_index;
                if idx < 0 {
                    continue;
                }
                let Some(&sample) = self.buffer.get(idx as usize) else { continue };

                let x = (t - v as f64) * scale;
                let weight = lanczos_weight(x, RADIUS as f64);
                if weight == 0.0 {
                    continue;
                }
                for ch in 0..CHANNELS {
                    sum[ch] += weight * sample[ch];
                }
            }
            // Widening the kernel by 1/scale spreads the same unit of energy over more
            // source samples; scale the output back down to preserve unity DC gain.
            for ch in &mut sum {
                *ch *= scale;
            }

            self.output.push_back(sum);
            self.next_output_position += 1.0 / ratio;

            while self.base_virtual_index < lo {
                self.buffer.pop_front();
                self.base_virtual_index += 1;
            }
        }
    }

    #[must_use]
    pub fn output_buffer_len(&self) -> usize {
        self.output.len()
    }

    pub fn output_buffer_pop_front(&mut self) -> Option<[f64; CHANNELS]> {
        self.output.pop_front()
    }
}

pub type MonoLanczosResampler = LanczosResampler<1>;
pub type StereoLanczosResampler = LanczosResampler<2>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_ratio_round_trips_with_kernel_radius_delay() {
        let mut resampler = MonoLanczosResampler::new(48000.0, 48000.0);
        let input: Vec<f64> = (0..64).map(|i| (i as f64 * 0.37).sin()).collect();
        for &sample in &input {
            resampler.collect([sample]);
        }
        resampler.flush();

        let mut outputs = Vec::new();
        while let Some([sample]) = resampler.output_buffer_pop_front() {
            outputs.push(sample);
        }

        // Output is the input delayed by RADIUS samples (the flush-added zeros trail off).
        for (i, &input_sample) in input.iter().enumerate() {
            let output_sample = outputs[i];
            assert!(
                (output_sample - input_sample).abs() < 1e-6,
                "sample {i}: expected {input_sample}, got {output_sample}"
            );
        }
    }

    #[test]
    fn two_to_one_downsample_attenuates_nyquist_and_preserves_dc() {
        let source_rate = 2000.0;
        let target_rate = 1000.0;
        let mut resampler = MonoLanczosResampler::new(source_rate, target_rate);

        let samples = 1024;
        for i in 0..samples {
            // Alternating 1/0: pure Nyquist-frequency content of the source rate, with a
            // DC offset of 0.5.
            let value = if i % 2 == 0 { 1.0 } else { 0.0 };
            resampler.collect([value]);
        }
        resampler.flush();

        let mut outputs = Vec::new();
        while let Some([sample]) = resampler.output_buffer_pop_front() {
            outputs.push(sample);
        }

        // Skip warm-up/cool-down samples near the edges where the kernel window is still
        // filling/draining.
        let steady = &outputs[8..outputs.len() - 8];

        let mean: f64 = steady.iter().sum::<f64>() / steady.len() as f64;
        assert!((mean - 0.5).abs() < 0.01, "DC component should be ~0.5, was {mean}");

        let ac_rms = (steady.iter().map(|&s| (s - mean).powi(2)).sum::<f64>()
            / steady.len() as f64)
            .sqrt();
        // -40dB relative to the 0.5 peak amplitude of the input AC component.
        assert!(ac_rms < 0.5 * 0.01, "Nyquist component insufficiently attenuated: rms={ac_rms}");
    }

    #[test]
    fn low_pass_cutoff_widens_kernel_without_changing_unity_ratio_gain_at_dc() {
        let mut resampler = MonoLanczosResampler::new(48000.0, 48000.0);
        resampler.set_low_pass_cutoff(Some(22000.0));
        for _ in 0..64 {
            resampler.collect([1.0]);
        }
        resampler.flush();

        let mut last = 0.0;
        while let Some([sample]) = resampler.output_buffer_pop_front() {
            last = sample;
        }
        assert!((last - 1.0).abs() < 0.05);
    }
}
