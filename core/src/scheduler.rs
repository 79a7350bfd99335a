//! Steps the 68k and Z80 one scanline at a time, raises vblank/hblank interrupts at the
//! right lines, and drains FM/PSG audio into the [`Mixer`] once per field.

use crate::audio::Mixer;
use crate::callbacks::Callbacks;
use crate::fm::FmChip;
use crate::memory::{MainBus, Memory};
use bincode::{Decode, Encode};
use jgenesis_common::frontend::TimingMode;
use m68000_emu::M68000;
use z80_emu::Z80;

pub const MCLK_CYCLES_PER_SCANLINE: u64 = 3420;
pub const NTSC_SCANLINES_PER_FRAME: u16 = 262;
pub const PAL_SCANLINES_PER_FRAME: u16 = 313;
pub const NTSC_VISIBLE_LINES: u16 = 224;
pub const PAL_VISIBLE_LINES: u16 = 240;
pub const SCREEN_WIDTH: u16 = 320;

const M68K_DIVIDER: u64 = 7;
const Z80_DIVIDER: u64 = 15;
const FM_DIVIDER: u64 = 144;
const PSG_DIVIDER: u64 = 15 * 16;

/// Mean 68000 cycles per instruction. The 68k core reports only whether an interrupt was
/// serviced, not a per-instruction cycle count, so the scheduler converts a master-clock
/// budget into an instruction budget with this constant rather than cycle-exact accounting
/// (sub-instruction bus arbitration is explicitly out of scope).
const AVERAGE_M68K_CYCLES_PER_INSTRUCTION: u64 = 7;

const VBLANK_INTERRUPT_LEVEL: u8 = 6;
const HBLANK_INTERRUPT_LEVEL: u8 = 4;

#[derive(Debug, Clone, Copy, Encode, Decode)]
pub struct Scheduler {
    timing_mode: TimingMode,
    hblank_enabled: bool,
    m68k_mclk_debt: u64,
    z80_mclk_debt: u64,
    fm_mclk_debt: u64,
    psg_mclk_debt: u64,
}

impl Scheduler {
    #[must_use]
    pub fn new(timing_mode: TimingMode) -> Self {
        Self {
            timing_mode,
            hblank_enabled: false,
            m68k_mclk_debt: 0,
            z80_mclk_debt: 0,
            fm_mclk_debt: 0,
            psg_mclk_debt: 0,
        }
    }

    pub fn set_timing_mode(&mut self, timing_mode: TimingMode) {
        self.timing_mode = timing_mode;
    }

    /// Enables the level-4 hblank interrupt. Most software only uses vblank; hblank is a
    /// per-game opt-in on real hardware, signaled through a VDP register the collaborator
    /// owns, so the host flips this when it sees that register written.
    pub fn set_hblank_enabled(&mut self, enabled: bool) {
        self.hblank_enabled = enabled;
    }

    #[must_use]
    fn scanlines_per_frame(&self) -> u16 {
        match self.timing_mode {
            TimingMode::Ntsc => NTSC_SCANLINES_PER_FRAME,
            TimingMode::Pal => PAL_SCANLINES_PER_FRAME,
        }
    }

    #[must_use]
    fn visible_lines(&self) -> u16 {
        match self.timing_mode {
            TimingMode::Ntsc => NTSC_VISIBLE_LINES,
            TimingMode::Pal => PAL_VISIBLE_LINES,
        }
    }

    #[must_use]
    fn mclk_frequency(&self) -> f64 {
        crate::audio::mclk_frequency(self.timing_mode)
    }

    /// Runs exactly one video field: every scanline of the current timing mode, in order,
    /// with no early exit. At the end, FM and PSG output accumulated during the field is
    /// resampled and delivered through `Callbacks::audio_sample`.
    #[allow(clippy::too_many_arguments)]
    pub fn iterate<C: Callbacks>(
        &mut self,
        m68k: &mut M68000,
        z80: &mut Z80,
        memory: &mut Memory,
        fm: &mut FmChip,
        mixer: &mut Mixer,
        callbacks: &mut C,
    ) {
        let total_lines = self.scanlines_per_frame();
        let visible_lines = self.visible_lines();

        for line in 0..total_lines {
            let mut interrupt_level = 0;
            if line == visible_lines {
                interrupt_level = VBLANK_INTERRUPT_LEVEL;
            } else if self.hblank_enabled && line < visible_lines {
                interrupt_level = HBLANK_INTERRUPT_LEVEL;
            }
            let z80_int_line = line == visible_lines;

            self.step_scanline(m68k, z80, memory, fm, mixer, callbacks, interrupt_level, z80_int_line);

            if line < visible_lines {
                callbacks.scanline_rendered(line, SCREEN_WIDTH, visible_lines);
            }
        }

        mixer.drain(|left, right| callbacks.audio_sample(left, right));
    }

    #[allow(clippy::too_many_arguments)]
    fn step_scanline<C: Callbacks>(
        &mut self,
        m68k: &mut M68000,
        z80: &mut Z80,
        memory: &mut Memory,
        fm: &mut FmChip,
        mixer: &mut Mixer,
        callbacks: &mut C,
        interrupt_level: u8,
        z80_int_line: bool,
    ) {
        memory.advance_input_clock(MCLK_CYCLES_PER_SCANLINE, self.mclk_frequency());

        let mut bus =
            MainBus::new(memory, fm, callbacks, self.timing_mode, interrupt_level, z80_int_line);

        self.m68k_mclk_debt += MCLK_CYCLES_PER_SCANLINE;
        let cycles_per_instruction = M68K_DIVIDER * AVERAGE_M68K_CYCLES_PER_INSTRUCTION;
        let instruction_budget = self.m68k_mclk_debt / cycles_per_instruction;
        self.m68k_mclk_debt %= cycles_per_instruction;
        for _ in 0..instruction_budget {
            m68k.execute_instruction(&mut bus);
        }

        self.z80_mclk_debt += MCLK_CYCLES_PER_SCANLINE;
        while self.z80_mclk_debt >= Z80_DIVIDER {
            let t_states = z80.execute_instruction(&mut bus);
            let consumed_mclk = if t_states == 0 { Z80_DIVIDER } else { u64::from(t_states) * Z80_DIVIDER };
            self.z80_mclk_debt = self.z80_mclk_debt.saturating_sub(consumed_mclk);
        }

        self.fm_mclk_debt += MCLK_CYCLES_PER_SCANLINE;
        while self.fm_mclk_debt >= FM_DIVIDER {
            self.fm_mclk_debt -= FM_DIVIDER;
            if let Some((left, right)) = fm.tick() {
                mixer.collect_fm_sample(left, right);
            }
        }

        self.psg_mclk_debt += MCLK_CYCLES_PER_SCANLINE;
        while self.psg_mclk_debt >= PSG_DIVIDER {
            self.psg_mclk_debt -= PSG_DIVIDER;
            mixer.collect_psg_sample(bus.psg_sample_needed());
        }
    }
}
