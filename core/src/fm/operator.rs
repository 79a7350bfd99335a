//! A single FM operator: phase accumulator, envelope, and sine-log sample synthesis.

use super::envelope::FmEnvelope;
use super::phase::FmPhase;
use super::tables::{attenuation_to_amplitude, sine_attenuation};
use bincode::{Decode, Encode};
use jgenesis_common::num::GetBit;

pub const OUTPUT_MIN: i16 = -0x2000;
pub const OUTPUT_MAX: i16 = 0x1FFF;

#[derive(Debug, Clone, Default, Encode, Decode)]
pub struct FmOperator {
    pub phase: FmPhase,
    pub envelope: FmEnvelope,
    pub current_output: i16,
    pub last_output: i16,
    f_number_and_block: u16,
    pub detune: u8,
    pub multiple: u8,
}

impl FmOperator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_frequency(&mut self, f_number_and_block: u16, detune: u8, multiple: u8) {
        self.f_number_and_block = f_number_and_block;
        self.detune = detune;
        self.multiple = multiple;
        self.phase.set_frequency(f_number_and_block, detune, multiple);
        self.envelope.update_key_scale_rate(&self.phase);
    }

    /// Re-derive the phase step after a detune/multiple register write, reusing the last
    /// known frequency (those registers are latched independently of frequency writes).
    pub fn set_detune_multiple(&mut self, detune: u8, multiple: u8) {
        self.update_frequency(self.f_number_and_block, detune, multiple);
    }

    pub fn key_on_or_off(&mut self, on: bool) {
        if on {
            if !self.envelope.is_key_on() {
                self.phase.reset();
                self.envelope.key_on();
            }
        } else {
            self.envelope.key_off();
        }
    }

    pub fn clock(&mut self) {
        self.envelope.clock();
    }

    /// Produce the next signed 14-bit sample, modulated by `phase_modulation`.
    pub fn process(&mut self, phase_modulation: i16) -> i16 {
        let raw_phase = self.phase.increment() >> 10;
        let phase = (raw_phase as i32 + i32::from(phase_modulation) / 2) as u16 & 0x3FF;

        let sign = phase.bit(9);
        let sine_attenuation_value = sine_attenuation(phase);

        let envelope_attenuation = self.envelope.current_attenuation();
        let total_attenuation = sine_attenuation_value + (envelope_attenuation << 2);

        let amplitude = attenuation_to_amplitude(total_attenuation);
        let output = if sign { -(amplitude as i16) } else { amplitude as i16 };

        self.last_output = self.current_output;
        self.current_output = output;

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_output_stays_within_fourteen_bit_range() {
        let mut op = FmOperator::new();
        op.update_frequency(0x0500, 0, 1);
        op.key_on_or_off(true);
        for _ in 0..2000 {
            op.clock();
            let sample = op.process(0);
            assert!((OUTPUT_MIN..=OUTPUT_MAX).contains(&sample));
        }
    }

    #[test]
    fn silent_operator_produces_near_zero_amplitude_at_phase_zero() {
        let mut op = FmOperator::new();
        op.envelope.total_level = 0x7F;
        let sample = op.process(0);
        assert_eq!(sample, 0);
    }
}
