//! YM2612 FM synthesizer: six 4-operator channels plus an 8-bit DAC channel.

mod channel;
mod chip;
mod envelope;
mod operator;
mod phase;
mod tables;
mod timer;

pub use chip::FmChip;
