//! Per-operator ADSR + SSG-EG envelope generator.

use super::phase::FmPhase;
use super::tables::ATTENUATION_INCREMENTS;
use bincode::{Decode, Encode};

pub const MAX_ATTENUATION: u16 = 0x3FF;
const SSG_ATTENUATION_THRESHOLD: u16 = 0x200;
const ENVELOPE_DIVIDER: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum EnvelopeMode {
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
struct SsgState {
    enabled: bool,
    attack: bool,
    alternate: bool,
    hold: bool,
    invert: bool,
}

impl SsgState {
    fn write_register(&mut self, value: u8) {
        self.enabled = value & 0x08 != 0;
        self.attack = value & 0x04 != 0;
        self.alternate = value & 0x02 != 0;
        self.hold = value & 0x01 != 0;
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct FmEnvelope {
    mode: EnvelopeMode,
    attenuation: u16,
    pub attack_rate: u8,
    pub decay_rate: u8,
    pub sustain_rate: u8,
    pub release_rate: u8,
    pub total_level: u8,
    pub sustain_level: u8,
    pub key_scale: u8,
    key_scale_rate: u8,
    ssg: SsgState,
    countdown: u8,
    cycle_count: u8,
    key_on: bool,
}

impl Default for FmEnvelope {
    fn default() -> Self {
        Self {
            mode: EnvelopeMode::Release,
            attenuation: MAX_ATTENUATION,
            attack_rate: 0,
            decay_rate: 0,
            sustain_rate: 0,
            release_rate: 0,
            total_level: 0,
            sustain_level: 0,
            key_scale: 0,
            key_scale_rate: 0,
            ssg: SsgState::default(),
            countdown: ENVELOPE_DIVIDER,
            cycle_count: 0,
            key_on: false,
        }
    }
}

impl FmEnvelope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_key_scale_rate(&mut self, phase: &FmPhase) {
        let key_code = phase.key_code();
        self.key_scale_rate = key_code >> (3 - self.key_scale.min(3));
    }

    fn rate_for(&self, mode_rate: u8) -> u8 {
        if mode_rate == 0 {
            0
        } else {
            (2 * mode_rate + self.key_scale_rate).min(0x3F)
        }
    }

    #[must_use]
    pub fn is_key_on(&self) -> bool {
        self.key_on
    }

    pub fn key_on(&mut self) {
        if self.key_on {
            return;
        }
        self.key_on = true;

        let rate = self.rate_for(self.attack_rate);
        if rate >= 0x3E {
            // Attack rate at or above 0x1F*2: skip straight to Decay with attenuation 0.
            self.mode = EnvelopeMode::Decay;
            self.attenuation = 0;
        } else {
            self.mode = EnvelopeMode::Attack;
        }
    }

    pub fn key_off(&mut self) {
        if !self.key_on {
            return;
        }
        self.key_on = false;

        if self.ssg.enabled && (self.ssg.invert != self.ssg.attack) {
            self.attenuation = (SSG_ATTENUATION_THRESHOLD.wrapping_sub(self.attenuation)) & MAX_ATTENUATION;
        }
        self.mode = EnvelopeMode::Release;
    }

    pub fn write_ssg_register(&mut self, value: u8) {
        self.ssg.write_register(value);
    }

    /// Advance by one internal FM clock tick.
    pub fn clock(&mut self) {
        self.countdown -= 1;
        if self.countdown != 0 {
            return;
        }
        self.countdown = ENVELOPE_DIVIDER;
        self.cycle_count = self.cycle_count.wrapping_add(1);

        let rate = match self.mode {
            EnvelopeMode::Attack => self.rate_for(self.attack_rate),
            EnvelopeMode::Decay => self.rate_for(self.decay_rate),
            EnvelopeMode::Sustain => self.rate_for(self.sustain_rate),
            EnvelopeMode::Release => self.rate_for(self.release_rate) | 0x01,
        };

        let delta = u16::from(ATTENUATION_INCREMENTS[rate as usize][(self.cycle_count & 0x07) as usize]);
        if delta == 0 {
            self.run_ssg();
            return;
        }

        match self.mode {
            EnvelopeMode::Attack => {
                // Full-width complement, not pre-masked to 10 bits: at attenuation 0x3FF the
                // upper bits of `!attenuation` are what drive the step to a nonzero value.
                let shift_amount = delta - 1;
                let complement = u32::from(!self.attenuation);
                let step = (complement << shift_amount) >> 4;
                self.attenuation = ((u32::from(self.attenuation) + step) & u32::from(MAX_ATTENUATION)) as u16;
                if self.attenuation == 0 {
                    self.mode = EnvelopeMode::Decay;
                }
            }
            EnvelopeMode::Decay => {
                self.attenuation = (self.attenuation + self.ssg_scaled_delta(delta)).min(MAX_ATTENUATION);
                if self.attenuation >= sustain_level_value(self.sustain_level) {
                    self.mode = EnvelopeMode::Sustain;
                }
            }
            EnvelopeMode::Sustain | EnvelopeMode::Release => {
                self.attenuation = (self.attenuation + self.ssg_scaled_delta(delta)).min(MAX_ATTENUATION);
            }
        }

        self.run_ssg();
    }

    /// Converts a table delta into its actual attenuation increment (`1 << (delta - 1)`),
    /// scaling by 4x while SSG-EG is active and still below its attenuation threshold.
    fn ssg_scaled_delta(&self, delta: u16) -> u16 {
        let extra_shift = if self.ssg.enabled && self.attenuation < SSG_ATTENUATION_THRESHOLD { 2 } else { 0 };
        let shift_amount = u32::from(delta - 1 + extra_shift);
        (1u32 << shift_amount).min(u32::from(MAX_ATTENUATION)) as u16
    }

    fn run_ssg(&mut self) {
        if !self.ssg.enabled || self.attenuation < SSG_ATTENUATION_THRESHOLD {
            return;
        }

        if self.ssg.alternate && !(self.ssg.hold && self.ssg.invert) {
            self.ssg.invert = !self.ssg.invert;
        }

        if self.mode != EnvelopeMode::Attack && !self.ssg.hold {
            self.mode = EnvelopeMode::Attack;
            self.attenuation = 0;
        }
    }

    /// Current attenuation, 10-bit, combined with total level and clamped to `MAX_ATTENUATION`.
    #[must_use]
    pub fn current_attenuation(&self) -> u16 {
        let inverted = self.ssg.invert ^ (self.mode == EnvelopeMode::Attack);
        let base = if self.ssg.enabled && inverted {
            (SSG_ATTENUATION_THRESHOLD.wrapping_sub(self.attenuation)) & MAX_ATTENUATION
        } else {
            self.attenuation
        };

        (base + (u16::from(self.total_level) << 3)).min(MAX_ATTENUATION)
    }
}

fn sustain_level_value(raw: u8) -> u16 {
    if raw == 0xF { 0x3E0 } else { u16::from(raw) * 0x20 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sustain_level_0xf_maps_to_special_value() {
        assert_eq!(sustain_level_value(0xF), 0x3E0);
        assert_eq!(sustain_level_value(0x8), 0x100);
    }

    #[test]
    fn key_on_from_fast_attack_rate_skips_straight_to_decay() {
        let mut env = FmEnvelope::new();
        env.attack_rate = 0x1F;
        env.key_scale_rate = 0x3F;
        env.key_on();
        assert_eq!(env.mode, EnvelopeMode::Decay);
        assert_eq!(env.current_attenuation(), 0);
    }

    #[test]
    fn key_on_then_key_off_enters_release() {
        let mut env = FmEnvelope::new();
        env.attack_rate = 10;
        env.key_on();
        assert_eq!(env.mode, EnvelopeMode::Attack);
        env.key_off();
        assert_eq!(env.mode, EnvelopeMode::Release);
    }

    #[test]
    fn repeated_key_on_while_already_key_on_is_ignored() {
        let mut env = FmEnvelope::new();
        env.attack_rate = 10;
        env.key_on();
        env.clock();
        let attenuation_after_first_clock = env.current_attenuation();
        env.key_on();
        assert_eq!(env.current_attenuation(), attenuation_after_first_clock);
    }

    #[test]
    fn key_on_from_rest_eventually_attacks_to_zero() {
        let mut env = FmEnvelope::new();
        env.attack_rate = 0x1A;
        env.key_on();
        assert_eq!(env.mode, EnvelopeMode::Attack);

        let mut reached_decay = false;
        for _ in 0..(4 * ENVELOPE_DIVIDER as u32 * 1024) {
            env.clock();
            if env.mode == EnvelopeMode::Decay {
                reached_decay = true;
                break;
            }
        }
        assert!(reached_decay, "attack never reached 0 attenuation and transitioned to decay");
        assert_eq!(env.current_attenuation(), 0);
    }

    #[test]
    fn attenuation_never_exceeds_max() {
        let mut env = FmEnvelope::new();
        env.release_rate = 0x1F;
        env.key_on();
        env.key_off();
        for _ in 0..2000 {
            env.clock();
            assert!(env.current_attenuation() <= MAX_ATTENUATION);
        }
    }
}
