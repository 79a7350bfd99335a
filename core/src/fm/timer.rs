//! Timer A and Timer B, used for CSM key-on triggering and host-visible overflow flags.

use bincode::{Decode, Encode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTickEffect {
    None,
    Overflowed,
}

pub struct TimerControl {
    pub enabled: bool,
    pub overflow_flag_enabled: bool,
    pub clear_overflow_flag: bool,
}

#[derive(Debug, Clone, Default, Encode, Decode)]
pub struct TimerA {
    enabled: bool,
    enabled_next: bool,
    overflow_flag_enabled: bool,
    overflow_flag: bool,
    interval: u16,
    counter: u16,
}

impl TimerA {
    const OVERFLOW: u16 = 1024;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) -> TimerTickEffect {
        if !self.enabled {
            if self.enabled_next {
                self.enabled = true;
                self.counter = self.interval;
            }
            return TimerTickEffect::None;
        }

        self.enabled = self.enabled_next;
        self.counter += 1;
        if self.counter == Self::OVERFLOW {
            self.overflow_flag |= self.overflow_flag_enabled;
            self.counter = self.interval;
            TimerTickEffect::Overflowed
        } else {
            TimerTickEffect::None
        }
    }

    #[must_use]
    pub fn overflow_flag(&self) -> bool {
        self.overflow_flag
    }

    #[must_use]
    pub fn interval(&self) -> u16 {
        self.interval
    }

    pub fn write_control(&mut self, control: TimerControl) {
        self.enabled_next = control.enabled;
        self.overflow_flag_enabled = control.overflow_flag_enabled;
        self.overflow_flag &= !control.clear_overflow_flag;
    }

    pub fn write_interval_high(&mut self, value: u8) {
        self.interval = (self.interval & 0x03) | (u16::from(value) << 2);
    }

    pub fn write_interval_low(&mut self, value: u8) {
        self.interval = (self.interval & !0x03) | u16::from(value & 0x03);
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct TimerB {
    enabled: bool,
    enabled_next: bool,
    overflow_flag_enabled: bool,
    overflow_flag: bool,
    pub interval: u8,
    counter: u8,
    divider: u8,
}

impl TimerB {
    const DIVIDER: u8 = 16;

    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: false,
            enabled_next: false,
            overflow_flag_enabled: false,
            overflow_flag: false,
            interval: 0,
            counter: 0,
            divider: Self::DIVIDER,
        }
    }

    pub fn tick(&mut self) {
        self.divider -= 1;
        if self.divider == 0 {
            self.divider = Self::DIVIDER;

            if self.enabled {
                let (next, overflowed) = self.counter.overflowing_add(1);
                self.counter = next;
                if overflowed {
                    self.overflow_flag |= self.overflow_flag_enabled;
                    self.counter = self.interval;
                }
            }
        }

        if !self.enabled && self.enabled_next {
            self.counter = self.interval;
        }
        self.enabled = self.enabled_next;
    }

    #[must_use]
    pub fn overflow_flag(&self) -> bool {
        self.overflow_flag
    }

    pub fn write_control(&mut self, control: TimerControl) {
        self.enabled_next = control.enabled;
        self.overflow_flag_enabled = control.overflow_flag_enabled;
        self.overflow_flag &= !control.clear_overflow_flag;
    }
}

impl Default for TimerB {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_a_overflows_at_1024_ticks_past_interval() {
        let mut timer = TimerA::new();
        timer.write_control(TimerControl { enabled: true, overflow_flag_enabled: true, clear_overflow_flag: false });
        timer.tick();
        let mut effect = TimerTickEffect::None;
        for _ in 0..TimerA::OVERFLOW {
            effect = timer.tick();
            if effect == TimerTickEffect::Overflowed {
                break;
            }
        }
        assert_eq!(effect, TimerTickEffect::Overflowed);
        assert!(timer.overflow_flag());
    }

    #[test]
    fn timer_b_eventually_overflows_when_enabled() {
        let mut timer = TimerB::new();
        timer.write_control(TimerControl { enabled: true, overflow_flag_enabled: true, clear_overflow_flag: false });
        timer.interval = 0xFE;
        for _ in 0..(16 * 300) {
            timer.tick();
        }
        assert!(timer.overflow_flag());
    }
}
