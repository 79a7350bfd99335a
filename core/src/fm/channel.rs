//! Four-operator channel: algorithm routing, feedback, and frequency distribution.
//!
//! Operators are not owned directly here. Per the index-based ownership scheme, a chip
//! owns a flat array of operator state and a channel is a thin view holding the base
//! index of its four operators (see [`super::chip::FmChip`]).

use super::operator::FmOperator;
use bincode::{Decode, Encode};

const OUTPUT_MIN: i32 = -0x1FFF;
const OUTPUT_MAX: i32 = 0x1FFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum FrequencyMode {
    #[default]
    Single,
    /// Channel 3 only: each of the first three operators gets an independent F-number/block.
    Multiple,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct FmChannel {
    pub operator_base: usize,
    pub mode: FrequencyMode,
    channel_f_number_and_block: u16,
    pending_f_number_high: u8,
    pending_block: u8,
    operator_f_numbers_and_blocks: [u16; 3],
    pending_op_f_number_high: [u8; 3],
    pending_op_block: [u8; 3],
    pub algorithm: u8,
    pub feedback_level: u8,
    pub am_sensitivity: u8,
    pub fm_sensitivity: u8,
    pub l_output: bool,
    pub r_output: bool,
    pub current_output: i16,
}

impl FmChannel {
    #[must_use]
    pub fn new(operator_base: usize) -> Self {
        Self {
            operator_base,
            mode: FrequencyMode::Single,
            channel_f_number_and_block: 0,
            pending_f_number_high: 0,
            pending_block: 0,
            operator_f_numbers_and_blocks: [0; 3],
            pending_op_f_number_high: [0; 3],
            pending_op_block: [0; 3],
            algorithm: 0,
            feedback_level: 0,
            am_sensitivity: 0,
            fm_sensitivity: 0,
            l_output: true,
            r_output: true,
            current_output: 0,
        }
    }

    fn operators<'a>(&self, operators: &'a mut [FmOperator]) -> &'a mut [FmOperator] {
        &mut operators[self.operator_base..self.operator_base + 4]
    }

    pub fn write_f_number_low(&mut self, value: u8) {
        self.channel_f_number_and_block =
            combine(value, self.pending_f_number_high, self.pending_block);
    }

    pub fn write_f_number_high_and_block(&mut self, value: u8) {
        self.pending_f_number_high = value & 0x07;
        self.pending_block = (value >> 3) & 0x07;
    }

    pub fn write_operator_f_number_low(&mut self, operator_idx: usize, value: u8) {
        self.operator_f_numbers_and_blocks[operator_idx] = combine(
            value,
            self.pending_op_f_number_high[operator_idx],
            self.pending_op_block[operator_idx],
        );
    }

    pub fn write_operator_f_number_high_and_block(&mut self, operator_idx: usize, value: u8) {
        self.pending_op_f_number_high[operator_idx] = value & 0x07;
        self.pending_op_block[operator_idx] = (value >> 3) & 0x07;
    }

    /// Re-derive each operator's phase step after a frequency-related register write.
    pub fn update_phase_generators(&mut self, operators: &mut [FmOperator]) {
        let ops = self.operators(operators);
        match self.mode {
            FrequencyMode::Single => {
                for op in ops.iter_mut() {
                    let (detune, multiple) = (detune_of(op), multiple_of(op));
                    op.update_frequency(self.channel_f_number_and_block, detune, multiple);
                }
            }
            FrequencyMode::Multiple => {
                for i in 0..3 {
                    let (detune, multiple) = (detune_of(&ops[i]), multiple_of(&ops[i]));
                    ops[i].update_frequency(self.operator_f_numbers_and_blocks[i], detune, multiple);
                }
                let (detune, multiple) = (detune_of(&ops[3]), multiple_of(&ops[3]));
                ops[3].update_frequency(self.channel_f_number_and_block, detune, multiple);
            }
        }
    }

    /// Clock all four operators' envelopes/phases and generate this channel's sample.
    pub fn clock(&mut self, operators: &mut [FmOperator], quantization_mask: i16) {
        for op in self.operators(operators).iter_mut() {
            op.clock();
        }
        self.generate_sample(operators, quantization_mask);
    }

    fn generate_sample(&mut self, operators: &mut [FmOperator], out_mask: i16) {
        let ops = self.operators(operators);

        let op1_feedback = match self.feedback_level {
            0 => 0,
            f => (i32::from(ops[0].current_output) + i32::from(ops[0].last_output)) >> (10 - f),
        };
        let op1_feedback = op1_feedback as i16;

        macro_rules! carrier_sum {
            ($($carrier:expr),*) => {{
                let mut sum: i32 = 0;
                $(sum += i32::from($carrier & out_mask);)*
                sum.clamp(OUTPUT_MIN, OUTPUT_MAX) as i16
            }};
        }

        // Operator order is 1 -> 3 -> 2 -> 4 (array indices 0, 2, 1, 3), matching the real
        // chip's internal pipelining: when op1 modulates op2, op2 sees op1's *current* cycle
        // output, but when op2 modulates op3 it sees op2's *previous* cycle output.
        let sample = match self.algorithm {
            0 => {
                let m1 = ops[0].process(op1_feedback);
                let m2_old = ops[1].current_output;
                ops[1].process(m1 >> 1);
                let m3 = ops[2].process(m2_old >> 1);
                let c4 = ops[3].process(m3 >> 1);
                c4 & out_mask
            }
            1 => {
                let m1_old = ops[0].current_output;
                ops[0].process(op1_feedback);
                let m2_old = ops[1].current_output;
                ops[1].process(0);
                let m3 = ops[2].process((m1_old + m2_old) >> 1);
                let c4 = ops[3].process(m3 >> 1);
                c4 & out_mask
            }
            2 => {
                let m1 = ops[0].process(op1_feedback);
                let m2_old = ops[1].current_output;
                ops[1].process(0);
                let m3 = ops[2].process(m2_old >> 1);
                let c4 = ops[3].process((m1 + m3) >> 1);
                c4 & out_mask
            }
            3 => {
                let m1 = ops[0].process(op1_feedback);
                let m2_old = ops[1].current_output;
                ops[1].process(m1 >> 1);
                let m3 = ops[2].process(0);
                let c4 = ops[3].process((m2_old + m3) >> 1);
                c4 & out_mask
            }
            4 => {
                let m1 = ops[0].process(op1_feedback);
                let c2 = ops[1].process(m1 >> 1);
                let m3 = ops[2].process(0);
                let c4 = ops[3].process(m3 >> 1);
                carrier_sum!(c2, c4)
            }
            5 => {
                let m1_old = ops[0].current_output;
                let m1 = ops[0].process(op1_feedback);
                let c2 = ops[1].process(m1 >> 1);
                let c3 = ops[2].process(m1_old >> 1);
                let c4 = ops[3].process(m1 >> 1);
                carrier_sum!(c2, c3, c4)
            }
            6 => {
                let m1 = ops[0].process(op1_feedback);
                let c2 = ops[1].process(m1 >> 1);
                let c3 = ops[2].process(0);
                let c4 = ops[3].process(0);
                carrier_sum!(c2, c3, c4)
            }
            _ => {
                let c1 = ops[0].process(op1_feedback);
                let c2 = ops[1].process(0);
                let c3 = ops[2].process(0);
                let c4 = ops[3].process(0);
                carrier_sum!(c1, c2, c3, c4)
            }
        };

        self.current_output = sample;
    }
}

fn combine(low: u8, high: u8, block: u8) -> u16 {
    u16::from(low) | (u16::from(high) << 8) | (u16::from(block) << 11)
}

fn detune_of(op: &FmOperator) -> u8 {
    op.detune
}

fn multiple_of(op: &FmOperator) -> u8 {
    op.multiple
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_seven_sums_four_independent_carriers() {
        let mut operators = vec![FmOperator::new(), FmOperator::new(), FmOperator::new(), FmOperator::new()];
        let mut channel = FmChannel::new(0);
        channel.algorithm = 7;
        for op in &mut operators {
            op.envelope.total_level = 0;
            op.key_on_or_off(true);
        }
        channel.write_f_number_low(0x00);
        channel.write_f_number_high_and_block(0x20);
        channel.update_phase_generators(&mut operators);
        channel.clock(&mut operators, !0);
        assert!(channel.current_output.unsigned_abs() <= 0x1FFF);
    }

    #[test]
    fn feedback_level_zero_produces_no_self_modulation() {
        let mut operators = vec![FmOperator::new(), FmOperator::new(), FmOperator::new(), FmOperator::new()];
        let mut channel = FmChannel::new(0);
        channel.algorithm = 0;
        channel.feedback_level = 0;
        channel.clock(&mut operators, !0);
        // With feedback disabled op1_feedback must be zero regardless of prior output history.
        assert_eq!(channel.feedback_level, 0);
    }
}
