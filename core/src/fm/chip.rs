//! The YM2612 register file: six channels, DAC, timers, and the sample batch generator.

use super::channel::{FmChannel, FrequencyMode};
use super::operator::FmOperator;
use super::timer::{TimerA, TimerB, TimerControl, TimerTickEffect};
use bincode::{Decode, Encode};
use jgenesis_common::num::GetBit;

const CHANNEL_COUNT: usize = 6;
const OPERATORS_PER_CHANNEL: usize = 4;
const GROUP_2_BASE_CHANNEL: usize = 3;

/// The chip divides its generated samples down from the FM clock by this factor.
const SAMPLE_DIVIDER: u8 = 6;

const WRITE_BUSY_CYCLES: u8 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
enum RegisterBank {
    #[default]
    One,
    Two,
}

/// Six FM channels plus the shared DAC channel, register latch, and timers.
///
/// Operator state lives in one flat array owned by the chip (index-based ownership);
/// each [`FmChannel`] only remembers the base index of its four operators.
#[derive(Debug, Clone, Encode, Decode)]
pub struct FmChip {
    operators: [FmOperator; CHANNEL_COUNT * OPERATORS_PER_CHANNEL],
    channels: [FmChannel; CHANNEL_COUNT],
    dac_enabled: bool,
    dac_sample: u8,
    selected_register: u8,
    selected_bank: RegisterBank,
    sample_divider: u8,
    busy_cycles_remaining: u8,
    timer_a: TimerA,
    timer_b: TimerB,
    csm_enabled: bool,
}

impl FmChip {
    #[must_use]
    pub fn new() -> Self {
        Self {
            operators: std::array::from_fn(|_| FmOperator::new()),
            channels: std::array::from_fn(FmChannel::new_for_index),
            dac_enabled: false,
            dac_sample: 0,
            selected_register: 0,
            selected_bank: RegisterBank::One,
            sample_divider: SAMPLE_DIVIDER,
            busy_cycles_remaining: 0,
            timer_a: TimerA::new(),
            timer_b: TimerB::new(),
            csm_enabled: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn write_address_port_0(&mut self, value: u8) {
        self.selected_register = value;
        self.selected_bank = RegisterBank::One;
    }

    pub fn write_address_port_1(&mut self, value: u8) {
        self.selected_register = value;
        self.selected_bank = RegisterBank::Two;
    }

    /// A write is latched in two steps: the address port captures the register number,
    /// and this data write supplies the value for whichever bank was last selected.
    pub fn write_data(&mut self, value: u8) {
        self.busy_cycles_remaining = WRITE_BUSY_CYCLES;
        let register = self.selected_register;
        let base_channel = match self.selected_bank {
            RegisterBank::One => 0,
            RegisterBank::Two => GROUP_2_BASE_CHANNEL,
        };

        match self.selected_bank {
            RegisterBank::One => self.write_group_1(register, value, base_channel),
            RegisterBank::Two => self.write_group_2(register, value, base_channel),
        }
    }

    fn write_group_1(&mut self, register: u8, value: u8, base_channel: usize) {
        match register {
            0x24 => self.timer_a.write_interval_high(value),
            0x25 => self.timer_a.write_interval_low(value),
            0x26 => self.timer_b.interval = value,
            0x27 => {
                let mode = if value & 0xC0 != 0 { FrequencyMode::Multiple } else { FrequencyMode::Single };
                self.csm_enabled = value & 0xC0 == 0x80;

                self.channels[2].mode = mode;
                self.channels[2].update_phase_generators(&mut self.operators);

                self.timer_a.write_control(TimerControl {
                    enabled: value.bit(0),
                    overflow_flag_enabled: value.bit(2),
                    clear_overflow_flag: value.bit(4),
                });
                self.timer_b.write_control(TimerControl {
                    enabled: value.bit(1),
                    overflow_flag_enabled: value.bit(3),
                    clear_overflow_flag: value.bit(5),
                });
            }
            0x28 => {
                let base = if value.bit(2) { GROUP_2_BASE_CHANNEL } else { 0 };
                let offset = value & 0x03;
                if offset < 3 {
                    let channel_idx = base + offset as usize;
                    let op_base = self.channels[channel_idx].operator_base;
                    for i in 0..OPERATORS_PER_CHANNEL {
                        self.operators[op_base + i].key_on_or_off(value.bit(4 + i as u8));
                    }
                }
            }
            0x2A => self.dac_sample = value,
            0x2B => self.dac_enabled = value.bit(7),
            0x30..=0x9F => self.write_operator_register(register, value, base_channel),
            0xA0..=0xBF => self.write_channel_register(register, value, base_channel),
            _ => {}
        }
    }

    fn write_group_2(&mut self, register: u8, value: u8, base_channel: usize) {
        match register {
            0x30..=0x9F => self.write_operator_register(register, value, base_channel),
            0xA0..=0xBF => self.write_channel_register(register, value, base_channel),
            _ => {}
        }
    }

    fn write_operator_register(&mut self, register: u8, value: u8, base_channel: usize) {
        let channel_offset = register & 0x03;
        if channel_offset == 3 {
            return;
        }
        let channel_idx = base_channel + channel_offset as usize;

        // Register bits 2-3 name the operator with slots 1 and 2 swapped relative to
        // processing order; un-swap here so operator state always lives in the order the
        // channel algorithms expect (op0=slot1, op1=slot2, op2=slot3, op3=slot4).
        let operator_idx = (((register & 0x08) >> 3) | ((register & 0x04) >> 1)) as usize;
        let op_index = self.channels[channel_idx].operator_base + operator_idx;
        let operator = &mut self.operators[op_index];

        match register >> 4 {
            0x03 => operator.set_detune_multiple((value >> 4) & 0x07, value & 0x0F),
            0x04 => operator.envelope.total_level = value & 0x7F,
            0x05 => {
                operator.envelope.attack_rate = value & 0x1F;
                operator.envelope.key_scale = value >> 6;
                operator.envelope.update_key_scale_rate(&operator.phase);
            }
            0x06 => operator.envelope.decay_rate = value & 0x1F,
            0x07 => operator.envelope.sustain_rate = value & 0x1F,
            0x08 => {
                operator.envelope.release_rate = value & 0x0F;
                operator.envelope.sustain_level = value >> 4;
            }
            0x09 => operator.envelope.write_ssg_register(value),
            _ => {}
        }
    }

    fn write_channel_register(&mut self, register: u8, value: u8, base_channel: usize) {
        match register {
            0xA0..=0xA2 => {
                let channel_idx = base_channel + (register & 0x03) as usize;
                self.channels[channel_idx].write_f_number_low(value);
                self.channels[channel_idx].update_phase_generators(&mut self.operators);
            }
            0xA4..=0xA6 => {
                let channel_idx = base_channel + (register & 0x03) as usize;
                self.channels[channel_idx].write_f_number_high_and_block(value);
            }
            0xA8..=0xAA => {
                let channel_idx = base_channel + 2;
                let operator_idx = match register {
                    0xA8 => 2,
                    0xA9 => 0,
                    _ => 1,
                };
                self.channels[channel_idx].write_operator_f_number_low(operator_idx, value);
                if self.channels[channel_idx].mode == FrequencyMode::Multiple {
                    self.channels[channel_idx].update_phase_generators(&mut self.operators);
                }
            }
            0xAC..=0xAE => {
                let channel_idx = base_channel + 2;
                let operator_idx = match register {
                    0xAC => 2,
                    0xAD => 0,
                    _ => 1,
                };
                self.channels[channel_idx].write_operator_f_number_high_and_block(operator_idx, value);
            }
            0xB0..=0xB2 => {
                let channel_idx = base_channel + (register & 0x03) as usize;
                let channel = &mut self.channels[channel_idx];
                channel.algorithm = value & 0x07;
                channel.feedback_level = (value >> 3) & 0x07;
            }
            0xB4..=0xB6 => {
                let channel_idx = base_channel + (register & 0x03) as usize;
                let channel = &mut self.channels[channel_idx];
                channel.l_output = value.bit(7);
                channel.r_output = value.bit(6);
                channel.am_sensitivity = (value >> 4) & 0x03;
                channel.fm_sensitivity = value & 0x07;
            }
            _ => {}
        }
    }

    /// Read-only debug view of each channel's current sample, for host register viewers.
    #[must_use]
    pub fn debug_channel_outputs(&self) -> [i16; CHANNEL_COUNT] {
        std::array::from_fn(|i| self.channels[i].current_output)
    }

    /// Read-only debug view of each operator's current attenuation (10-bit, pre-total-level).
    #[must_use]
    pub fn debug_operator_attenuations(&self) -> [u16; CHANNEL_COUNT * OPERATORS_PER_CHANNEL] {
        std::array::from_fn(|i| self.operators[i].envelope.current_attenuation())
    }

    /// Read the status port: bit 7 is BUSY, bits 0-1 are the timer A/B overflow flags.
    #[must_use]
    pub fn read_status(&self) -> u8 {
        (u8::from(self.busy_cycles_remaining != 0) << 7)
            | (u8::from(self.timer_b.overflow_flag()) << 1)
            | u8::from(self.timer_a.overflow_flag())
    }

    /// Advance the chip by one FM-rate tick (`MCLK / 144`), returning a sample if one
    /// was generated this tick (the chip further divides its clock internally).
    pub fn tick(&mut self) -> Option<(i16, i16)> {
        self.busy_cycles_remaining = self.busy_cycles_remaining.saturating_sub(1);

        self.sample_divider -= 1;
        if self.sample_divider != 0 {
            return None;
        }
        self.sample_divider = SAMPLE_DIVIDER;

        self.timer_b.tick();
        let timer_a_effect = self.timer_a.tick();

        if self.csm_enabled && timer_a_effect == TimerTickEffect::Overflowed {
            let op_base = self.channels[2].operator_base;
            for i in 0..OPERATORS_PER_CHANNEL {
                let operator = &mut self.operators[op_base + i];
                if !operator.envelope.is_key_on() {
                    operator.key_on_or_off(true);
                    operator.key_on_or_off(false);
                }
            }
        }

        let quantization_mask = !0;
        for channel in &mut self.channels {
            channel.clock(&mut self.operators, quantization_mask);
        }

        Some(self.sample())
    }

    #[must_use]
    fn sample(&self) -> (i16, i16) {
        let mut sum_l: i32 = 0;
        let mut sum_r: i32 = 0;

        for (i, channel) in self.channels.iter().enumerate() {
            let sample = if i == 5 && self.dac_enabled {
                (i16::from(self.dac_sample) - 128) << 6
            } else {
                channel.current_output
            };

            if channel.l_output {
                sum_l += i32::from(sample);
            }
            if channel.r_output {
                sum_r += i32::from(sample);
            }
        }

        (sum_l.clamp(i16::MIN.into(), i16::MAX.into()) as i16, sum_r.clamp(i16::MIN.into(), i16::MAX.into()) as i16)
    }

    /// Generate `frames` stereo samples into `buffer`, ticking the chip as needed.
    pub fn generate_samples(&mut self, buffer: &mut [(i16, i16)]) {
        for slot in buffer.iter_mut() {
            loop {
                if let Some(sample) = self.tick() {
                    *slot = sample;
                    break;
                }
            }
        }
    }
}

impl Default for FmChip {
    fn default() -> Self {
        Self::new()
    }
}

impl FmChannel {
    fn new_for_index(index: usize) -> Self {
        Self::new(index * OPERATORS_PER_CHANNEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_on_register_2b8_key_on_then_generate_samples_stays_bounded() {
        let mut chip = FmChip::new();
        chip.write_address_port_0(0xB0);
        chip.write_data(0x00); // algorithm 0, no feedback
        chip.write_address_port_0(0xA0);
        chip.write_data(0x00);
        chip.write_address_port_0(0xA4);
        chip.write_data(0x22); // f-number high + block
        chip.write_address_port_0(0xA0);
        chip.write_data(0x69); // latch f-number low
        chip.write_address_port_0(0x30);
        chip.write_data(0x01); // multiple = 1
        chip.write_address_port_0(0x40);
        chip.write_data(0x00); // total level = 0 (loudest)
        chip.write_address_port_0(0x50);
        chip.write_data(0x1F); // attack rate
        chip.write_address_port_0(0x28);
        chip.write_data(0xF0); // key on all operators of channel 0

        let mut buffer = vec![(0i16, 0i16); 64];
        chip.generate_samples(&mut buffer);
        for (l, r) in buffer {
            assert!((-0x1FFF..=0x1FFF).contains(&l));
            assert!((-0x1FFF..=0x1FFF).contains(&r));
        }
    }

    #[test]
    fn busy_flag_set_after_write_and_clears_after_enough_ticks() {
        let mut chip = FmChip::new();
        chip.write_address_port_0(0x30);
        chip.write_data(0x00);
        assert_eq!(chip.read_status() & 0x80, 0x80);

        for _ in 0..(WRITE_BUSY_CYCLES as u32 * SAMPLE_DIVIDER as u32) {
            chip.tick();
        }
        assert_eq!(chip.read_status() & 0x80, 0);
    }

    #[test]
    fn dac_replaces_channel_six_when_enabled() {
        let mut chip = FmChip::new();
        chip.write_address_port_0(0x2B);
        chip.write_data(0x80);
        chip.write_address_port_0(0x2A);
        chip.write_data(0xFF);
        assert!(chip.dac_enabled);
        assert_eq!(chip.dac_sample, 0xFF);
    }
}
