//! Per-operator phase accumulation.

use super::tables::DETUNE_TABLE;
use bincode::{Decode, Encode};
use jgenesis_common::num::GetBit;

const PHASE_MASK: u32 = (1 << 20) - 1;

/// Tracks one operator's phase position and the 32-bit step derived from its last
/// frequency write. LFO-based frequency modulation is intentionally not implemented;
/// this mirrors the upstream `FM_Phase` module, which never finished that feature either.
#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
pub struct FmPhase {
    position: u32,
    step: u32,
    f_number_and_block: u16,
    detune: u8,
    multiple: u8,
}

impl FmPhase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the phase step from a combined F-number/block value, this operator's
    /// detune register, and its frequency multiplier.
    pub fn set_frequency(&mut self, f_number_and_block: u16, detune: u8, multiple: u8) {
        self.f_number_and_block = f_number_and_block;
        self.detune = detune;
        self.multiple = multiple;
        self.step = compute_phase_step(f_number_and_block, detune, multiple);
    }

    /// Advance the phase accumulator by its step and return the new position.
    pub fn increment(&mut self) -> u32 {
        self.position = self.position.wrapping_add(self.step) & PHASE_MASK;
        self.position
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// The 4-bit key code used to compute this operator's key-scale rate.
    #[must_use]
    pub fn key_code(&self) -> u8 {
        key_code(self.f_number_and_block)
    }
}

#[must_use]
pub fn key_code(f_number_and_block: u16) -> u8 {
    ((f_number_and_block >> 9) & 0x0F) as u8
}

/// Nonlinear remap from the top 4 bits of the F-number to a detune key-code class,
/// keyed by `f_number >> 7`.
const DETUNE_KEY_CODES: [usize; 16] = [0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 3, 3, 3, 3, 3, 3];

fn compute_phase_step(f_number_and_block: u16, detune: u8, multiple: u8) -> u32 {
    let f_number = u32::from(f_number_and_block & 0x7FF);
    let block = (f_number_and_block >> 11) & 0x07;
    let key_code_class = DETUNE_KEY_CODES[((f_number >> 7) & 0x0F) as usize];

    let detune_row = (block as usize) * 4 + key_code_class;
    let detune_magnitude = u32::from(DETUNE_TABLE[detune_row][(detune & 0x03) as usize]);

    // Octave shift: the F-number is scaled up by the block, then halved (block 0 is
    // effectively `>> 1` of an unshifted value, block 1 is unshifted, block 2 is doubled).
    let block_shifted = (f_number << block) >> 1;
    let detuned = if detune.bit(2) {
        block_shifted.wrapping_sub(detune_magnitude)
    } else {
        block_shifted + detune_magnitude
    };

    // Detune underflow bug: the shifted F-number is masked to 17 bits *before* the
    // multiplier is applied. GEMS-engine driven games rely on this truncation.
    let masked = detuned & 0x1_FFFF;

    match multiple {
        0 => masked >> 1,
        m => masked * u32::from(m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_wraps_at_twenty_bits() {
        let mut phase = FmPhase::new();
        phase.set_frequency(0x7FF, 0, 1);
        for _ in 0..(1 << 20) {
            phase.increment();
        }
        // step divides (1<<20) evenly only by coincidence; just check it stays in range
        assert!(phase.position() <= PHASE_MASK);
    }

    #[test]
    fn zero_detune_subtract_flag_has_no_effect() {
        let with_subtract = compute_phase_step(0x0400, 0x04, 1);
        let without = compute_phase_step(0x0400, 0x00, 1);
        assert_eq!(with_subtract, without);
    }

    #[test]
    fn multiple_zero_halves_the_shifted_f_number() {
        let doubled = compute_phase_step(0x0100, 0, 2);
        let halved = compute_phase_step(0x0100, 0, 0);
        assert_eq!(halved * 4, doubled);
    }

    #[test]
    fn key_code_is_top_four_bits_above_bit_eight() {
        assert_eq!(key_code(0b0001_1110_0000_0000), 0b1111);
        assert_eq!(key_code(0), 0);
    }
}
