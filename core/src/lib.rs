//! A Sega Mega Drive / Genesis emulation core: 68000 and Z80 CPUs, the YM2612 FM chip, and
//! the master-clock scheduler that ties them together. The VDP and PSG are collaborators the
//! host frontend owns; this crate only forwards port accesses to them via [`Callbacks`].

pub mod audio;
pub mod callbacks;
pub mod controller;
pub mod error;
pub mod fm;
pub mod memory;
pub mod scheduler;

pub use callbacks::{Callbacks, ControllerPort};
pub use controller::{Button, ControllerKind};
pub use error::{CoreError, CoreResult, MAX_ROM_SIZE};

use bincode::{Decode, Encode};
use fm::FmChip;
use jgenesis_common::debug::DebugBytesView;
use jgenesis_common::frontend::TimingMode;
use memory::Memory;
use scheduler::Scheduler;

/// Domestic (Japanese) consoles report a different version-register bit, which some games use
/// to gate region-specific content. Corresponds to clownmdemu's `SetJapanese`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum Region {
    Domestic,
    Overseas,
}

impl Default for Region {
    fn default() -> Self {
        Self::Overseas
    }
}

/// Everything that makes up one emulated console: both CPUs, the FM chip, the Mixer, the
/// bus maps, and the scheduler's running cycle debts. Pure data plus `bincode` derives, so a
/// save state is just this struct serialized whole.
#[derive(Encode, Decode)]
pub struct CoreState {
    m68k: m68000_emu::M68000,
    z80: z80_emu::Z80,
    fm: FmChip,
    memory: Memory,
    mixer: audio::Mixer,
    scheduler: Scheduler,
    timing_mode: TimingMode,
    region: Region,
}

impl CoreState {
    /// Builds a fresh console state. `output_frequency` is the host audio sample rate the
    /// Mixer should resample to; it can be changed later via [`Self::set_output_frequency`].
    #[must_use]
    pub fn new_state(
        timing_mode: TimingMode,
        region: Region,
        p1_kind: ControllerKind,
        p2_kind: ControllerKind,
        output_frequency: u64,
    ) -> Self {
        Self {
            m68k: m68000_emu::M68000::new(),
            z80: z80_emu::Z80::new(),
            fm: FmChip::new(),
            memory: Memory::new(p1_kind, p2_kind),
            mixer: audio::Mixer::new(timing_mode, output_frequency),
            scheduler: Scheduler::new(timing_mode),
            timing_mode,
            region,
        }
    }

    /// Runs the 68k and Z80 reset sequence: the 68k loads its initial SSP/PC from the
    /// cartridge's vector table (read through `callbacks`), the Z80's registers clear, and
    /// the FM chip silences all channels.
    pub fn reset<C: Callbacks>(&mut self, callbacks: &mut C) {
        let mut bus = memory::MainBus::new(
            &mut self.memory,
            &mut self.fm,
            callbacks,
            self.timing_mode,
            0,
            false,
        );
        self.m68k.reset(&mut bus);
        self.z80.reset();
        self.fm.reset();
    }

    /// Runs exactly one video field (one frame, or one field of an interlaced frame) and
    /// delivers the resampled audio for it. Never returns early.
    pub fn iterate<C: Callbacks>(&mut self, callbacks: &mut C) {
        self.scheduler.iterate(
            &mut self.m68k,
            &mut self.z80,
            &mut self.memory,
            &mut self.fm,
            &mut self.mixer,
            callbacks,
        );
    }

    pub fn set_region(&mut self, region: Region) {
        self.region = region;
    }

    #[must_use]
    pub fn region(&self) -> Region {
        self.region
    }

    pub fn set_tv_standard(&mut self, timing_mode: TimingMode) {
        self.timing_mode = timing_mode;
        self.scheduler.set_timing_mode(timing_mode);
        self.mixer.update_timing_mode(timing_mode);
    }

    #[must_use]
    pub fn tv_standard(&self) -> TimingMode {
        self.timing_mode
    }

    pub fn set_output_frequency(&mut self, output_frequency: u64) {
        self.mixer.update_output_frequency(output_frequency);
    }

    pub fn set_controller_kinds(&mut self, p1_kind: ControllerKind, p2_kind: ControllerKind) {
        self.memory.set_controller_kinds(p1_kind, p2_kind);
    }

    pub fn set_fm_enabled(&mut self, enabled: bool) {
        self.mixer.set_fm_enabled(enabled);
    }

    pub fn set_psg_enabled(&mut self, enabled: bool) {
        self.mixer.set_psg_enabled(enabled);
    }

    pub fn set_hblank_interrupt_enabled(&mut self, enabled: bool) {
        self.scheduler.set_hblank_enabled(enabled);
    }

    /// Serializes the full console state for a save state. Platform-native, not portable
    /// across crate versions or architectures (matching the spec's "memcpy of POD state").
    pub fn save_state(&self) -> CoreResult<Vec<u8>> {
        Ok(bincode::encode_to_vec(self, bincode::config::standard())?)
    }

    /// Restores a console state produced by [`Self::save_state`] from the *same build* of
    /// this crate. A mismatched region/timing mode between `self` and the loaded state is a
    /// configuration error: the host keeps its previous state rather than loading a console
    /// that doesn't match the ROM currently mounted.
    pub fn load_state(&mut self, bytes: &[u8]) -> CoreResult<()> {
        let (loaded, _): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())?;

        if loaded.timing_mode != self.timing_mode || loaded.region != self.region {
            return Err(CoreError::SaveStateConfigMismatch);
        }

        *self = loaded;
        Ok(())
    }

    #[must_use]
    pub fn m68k_pc(&self) -> u32 {
        self.m68k.pc()
    }

    #[must_use]
    pub fn m68k_data_registers(&self) -> [u32; 8] {
        self.m68k.data_registers()
    }

    #[must_use]
    pub fn m68k_address_registers(&self) -> [u32; 7] {
        self.m68k.address_registers()
    }

    #[must_use]
    pub fn z80_pc(&self) -> u16 {
        self.z80.pc()
    }

    #[must_use]
    pub fn z80_af(&self) -> u16 {
        self.z80.af()
    }

    #[must_use]
    pub fn fm_channel_outputs(&self) -> [i16; 6] {
        self.fm.debug_channel_outputs()
    }

    #[must_use]
    pub fn fm_operator_attenuations(&self) -> [u16; 24] {
        self.fm.debug_operator_attenuations()
    }

    /// Read-only debug view of the 68k's 64 KiB work RAM.
    #[must_use]
    pub fn debug_work_ram(&mut self) -> DebugBytesView<'_> {
        DebugBytesView(self.memory.debug_work_ram_mut())
    }

    /// Read-only debug view of the Z80's 8 KiB sound RAM.
    #[must_use]
    pub fn debug_z80_ram(&mut self) -> DebugBytesView<'_> {
        DebugBytesView(self.memory.debug_z80_ram_mut())
    }
}
