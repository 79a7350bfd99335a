//! Controller TH-line strobe protocol for 3-button and 6-button Mega Drive pads.

use bincode::{Decode, Encode};
use jgenesis_common::num::GetBit;

const TH_BIT: u8 = 6;

/// A strobe sequence with no new rising TH edge for this long resets back to strobe 0.
const DECAY_TIMEOUT_MICROS: u32 = 1500;

/// All reads return all-1s once a rising TH edge has gone unanswered this long without the
/// accompanying data: bit 7 always passes the last data write straight through.
const DATA_NO_CONTROLLER: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    C,
    Start,
    X,
    Y,
    Z,
    Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum ControllerKind {
    ThreeButton,
    #[default]
    SixButton,
    None,
}

/// One pad's pin state: last writes to the data/control ports, strobe counter, and the
/// decay timer that resets it after 1.5ms of silence.
#[derive(Debug, Clone, Encode, Decode)]
pub struct Controller {
    kind: ControllerKind,
    last_data_write: u8,
    last_ctrl_write: u8,
    strobes: u8,
    countdown_micros: u32,
    th: bool,
}

impl Controller {
    #[must_use]
    pub fn new(kind: ControllerKind) -> Self {
        Self {
            kind,
            last_data_write: 0,
            last_ctrl_write: 0,
            strobes: 0,
            countdown_micros: 0,
            // Some games freeze at boot if TH does not default high.
            th: true,
        }
    }

    pub fn set_kind(&mut self, kind: ControllerKind) {
        self.kind = kind;
    }

    pub fn write_data(&mut self, value: u8, elapsed_micros: u32) {
        self.tick(elapsed_micros);
        self.last_data_write = value;
        self.maybe_advance_strobe(value.bit(TH_BIT));
    }

    pub fn write_ctrl(&mut self, value: u8, elapsed_micros: u32) {
        self.tick(elapsed_micros);
        self.last_ctrl_write = value;
    }

    #[must_use]
    pub fn read_ctrl(&self) -> u8 {
        self.last_ctrl_write
    }

    fn maybe_advance_strobe(&mut self, new_th: bool) {
        if !self.last_ctrl_write.bit(TH_BIT) {
            // TH pin configured as input on this write; the controller won't see it.
            return;
        }

        if self.kind == ControllerKind::SixButton && !self.th && new_th {
            self.strobes = (self.strobes + 1) % 4;
            self.countdown_micros = DECAY_TIMEOUT_MICROS;
        }
        self.th = new_th;
    }

    fn tick(&mut self, elapsed_micros: u32) {
        self.countdown_micros = self.countdown_micros.saturating_sub(elapsed_micros);
        if self.countdown_micros == 0 {
            self.strobes = 0;
        }
    }

    /// Poll the host for button state and return the next data-port byte, after first
    /// decaying the strobe-reset countdown by `elapsed_micros`.
    pub fn read(&mut self, elapsed_micros: u32, is_pressed: impl Fn(Button) -> bool) -> u8 {
        self.tick(elapsed_micros);

        if self.kind == ControllerKind::None {
            return DATA_NO_CONTROLLER;
        }

        let p = |b: Button| u8::from(!is_pressed(b));

        let mut byte = match (self.strobes, self.th) {
            (0..=2, true) => {
                (p(Button::C) << 5)
                    | (p(Button::B) << 4)
                    | (p(Button::Right) << 3)
                    | (p(Button::Left) << 2)
                    | (p(Button::Down) << 1)
                    | p(Button::Up)
            }
            (0..=1, false) => {
                (p(Button::Start) << 5) | (p(Button::A) << 4) | (p(Button::Down) << 1) | p(Button::Up)
            }
            (3, true) => {
                (p(Button::C) << 5)
                    | (p(Button::B) << 4)
                    | (p(Button::Mode) << 3)
                    | (p(Button::X) << 2)
                    | (p(Button::Y) << 1)
                    | p(Button::Z)
            }
            (2, false) => (p(Button::Start) << 5) | (p(Button::A) << 4),
            (3, false) => (p(Button::Start) << 5) | (p(Button::A) << 4) | 0b0000_1111,
            _ => unreachable!("strobes is always reduced modulo 4"),
        };

        byte |= u8::from(self.th) << 6;
        // Only pins configured as input (ctrl bit clear) read back from the pad.
        byte &= !self.last_ctrl_write;

        let outputs_byte = self.last_data_write & (self.last_ctrl_write | 0x80);
        byte | outputs_byte
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_buttons(_: Button) -> bool {
        false
    }

    #[test]
    fn three_button_default_read_reports_all_released() {
        let mut pad = Controller::new(ControllerKind::ThreeButton);
        let byte = pad.read(0, no_buttons);
        assert_eq!(byte & 0x3F, 0x3F);
    }

    #[test]
    fn six_button_read_sequence_reaches_extended_buttons() {
        let mut pad = Controller::new(ControllerKind::SixButton);
        // TH is pin 6; setting it to output (bit set) lets data writes drive it.
        pad.write_ctrl(0x40, 0);

        let is_pressed = |b: Button| b == Button::Down;

        pad.write_data(0x00, 0); // TH low (no edge, th starts high)
        pad.write_data(0x40, 0); // TH high: rising edge, strobe 0 -> 1
        let read_with_th_high = pad.read(0, is_pressed);
        assert_eq!(read_with_th_high & 0x02, 0); // D pressed clears bit 1

        pad.write_data(0x00, 0); // TH low: strobe 1 -> 2 needs another rising edge
        pad.write_data(0x40, 0); // TH high: strobe 1 -> 2
        pad.write_data(0x00, 0);
        pad.write_data(0x40, 0); // TH high: strobe 2 -> 3
        pad.write_data(0x00, 0); // TH low, strobe stays at 3

        let read_at_strobe_three_th_low = pad.read(0, no_buttons);
        assert_eq!(read_at_strobe_three_th_low & 0x0F, 0x0F);
    }

    #[test]
    fn strobe_resets_to_zero_after_decay_timeout() {
        let mut pad = Controller::new(ControllerKind::SixButton);
        pad.write_ctrl(0x40, 0);
        pad.write_data(0x00, 0);
        pad.write_data(0x40, 0);
        assert_eq!(pad.strobes, 1);

        pad.read(DECAY_TIMEOUT_MICROS, no_buttons);
        assert_eq!(pad.strobes, 0);
    }

    #[test]
    fn disconnected_pad_always_reads_all_ones() {
        let mut pad = Controller::new(ControllerKind::None);
        assert_eq!(pad.read(0, no_buttons), 0xFF);
    }
}
