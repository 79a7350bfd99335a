//! The 68k and Z80 bus maps, work RAM, Z80 RAM, and the bank register that windows one
//! CPU's bus onto the other's address space.

use crate::callbacks::{Callbacks, ControllerPort};
use crate::controller::Controller;
use crate::fm::FmChip;
use bincode::{Decode, Encode};
use jgenesis_common::num::{GetBit, U16Ext};
use jgenesis_common::frontend::TimingMode;

const WORK_RAM_LEN: usize = 0x10000;
const Z80_RAM_LEN: usize = 0x2000;

/// The 9-bit shift register the Z80 writes one bit at a time to build the 68k address it
/// wants its `0x8000..=0xFFFF` window mapped to.
#[derive(Debug, Clone, Copy, Default, Encode, Decode)]
pub struct Z80BankRegister {
    bank_number: u32,
    current_bit: u8,
}

impl Z80BankRegister {
    const BITS: u8 = 9;

    fn map_to_68k_address(self, z80_address: u16) -> u32 {
        (self.bank_number << 15) | u32::from(z80_address & 0x7FFF)
    }

    fn write_bit(&mut self, bit: bool) {
        self.bank_number = (self.bank_number >> 1) | (u32::from(bit) << (Self::BITS - 1));
        self.current_bit = (self.current_bit + 1) % Self::BITS;
    }
}

/// Z80 BUSREQ/RESET lines, driven by 68k writes to `0xA11100`/`0xA11200`.
#[derive(Debug, Clone, Copy, Encode, Decode)]
pub struct Z80Signals {
    pub busreq: bool,
    pub reset: bool,
}

impl Default for Z80Signals {
    fn default() -> Self {
        // The Z80 starts held in reset until the 68k releases it, same as real hardware.
        Self { busreq: false, reset: true }
    }
}

/// Everything the bus maps own directly, as opposed to what they forward to collaborators.
#[derive(Debug, Encode, Decode)]
pub struct Memory {
    work_ram: Box<[u8; WORK_RAM_LEN]>,
    z80_ram: Box<[u8; Z80_RAM_LEN]>,
    z80_bank: Z80BankRegister,
    z80_signals: Z80Signals,
    p1: Controller,
    p2: Controller,
    p1_ctrl: u8,
    p2_ctrl: u8,
    /// Accumulated microseconds since the last controller port access, used to decay the
    /// 6-button strobe timeout regardless of how CPU time is being budgeted.
    pending_input_micros: u32,
}

impl Memory {
    #[must_use]
    pub fn new(p1_kind: crate::controller::ControllerKind, p2_kind: crate::controller::ControllerKind) -> Self {
        Self {
            work_ram: vec![0; WORK_RAM_LEN].into_boxed_slice().try_into().unwrap(),
            z80_ram: vec![0; Z80_RAM_LEN].into_boxed_slice().try_into().unwrap(),
            z80_bank: Z80BankRegister::default(),
            z80_signals: Z80Signals::default(),
            p1: Controller::new(p1_kind),
            p2: Controller::new(p2_kind),
            p1_ctrl: 0,
            p2_ctrl: 0,
            pending_input_micros: 0,
        }
    }

    pub fn set_controller_kinds(
        &mut self,
        p1_kind: crate::controller::ControllerKind,
        p2_kind: crate::controller::ControllerKind,
    ) {
        self.p1.set_kind(p1_kind);
        self.p2.set_kind(p2_kind);
    }

    /// Advance the controller decay timer by the wall-clock time `mclk_cycles` of master
    /// clock ticks represent, at `master_clock_hz`.
    pub fn advance_input_clock(&mut self, mclk_cycles: u64, master_clock_hz: f64) {
        let micros = (mclk_cycles as f64 * 1_000_000.0 / master_clock_hz).round() as u32;
        self.pending_input_micros = self.pending_input_micros.saturating_add(micros);
    }

    fn take_pending_micros(&mut self) -> u32 {
        std::mem::take(&mut self.pending_input_micros)
    }

    /// Mutable debug view of the 64KiB 68k work RAM, for host memory-editing tools.
    pub fn debug_work_ram_mut(&mut self) -> &mut [u8] {
        self.work_ram.as_mut_slice()
    }

    /// Mutable debug view of the Z80's 8KiB sound RAM, for host memory-editing tools.
    pub fn debug_z80_ram_mut(&mut self) -> &mut [u8] {
        self.z80_ram.as_mut_slice()
    }
}

/// The 68k bus map is `0xFFFFFF`-masked (24-bit address bus).
const M68K_ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// Both CPUs' bus traits are implemented on the same struct, since the Z80's `0x8000..`
/// window reads and writes directly through to the 68k side and vice versa for Z80 RAM.
pub struct MainBus<'a, C> {
    memory: &'a mut Memory,
    fm: &'a mut FmChip,
    callbacks: &'a mut C,
    timing_mode: TimingMode,
    pending_interrupt_level: u8,
    z80_int_line: bool,
    z80_accessed_68k_bus: bool,
}

impl<'a, C: Callbacks> MainBus<'a, C> {
    pub fn new(
        memory: &'a mut Memory,
        fm: &'a mut FmChip,
        callbacks: &'a mut C,
        timing_mode: TimingMode,
        pending_interrupt_level: u8,
        z80_int_line: bool,
    ) -> Self {
        Self {
            memory,
            fm,
            callbacks,
            timing_mode,
            pending_interrupt_level,
            z80_int_line,
            z80_accessed_68k_bus: false,
        }
    }

    #[must_use]
    pub fn pending_interrupt_level(&self) -> u8 {
        self.pending_interrupt_level
    }

    #[must_use]
    pub fn z80_accessed_68k_bus(&self) -> bool {
        self.z80_accessed_68k_bus
    }

    /// Pulls one native-rate PSG sample from the host for the in-core Mixer to resample.
    pub fn psg_sample_needed(&mut self) -> i16 {
        self.callbacks.psg_sample_needed()
    }

    fn read_io_register(&mut self, address: u32) -> u8 {
        match address {
            // Version register: bit 7 domestic/overseas (collaborator-reported via region,
            // left at 0 here since region gating lives at the cartridge-medium level),
            // bit 6 PAL/NTSC, bits 0-4 identify a Model 1 console with no expansion unit.
            0xA10000 | 0xA10001 => 0x20 | (u8::from(self.timing_mode == TimingMode::Pal) << 6),
            0xA10002 | 0xA10003 => {
                let micros = self.memory.take_pending_micros();
                self.memory.p1.read(micros, |b| self.callbacks.input_read(ControllerPort::Player1, b))
            }
            0xA10004 | 0xA10005 => {
                let micros = self.memory.take_pending_micros();
                self.memory.p2.read(micros, |b| self.callbacks.input_read(ControllerPort::Player2, b))
            }
            0xA10008 | 0xA10009 => self.memory.p1.read_ctrl(),
            0xA1000A | 0xA1000B => self.memory.p2.read_ctrl(),
            0xA1000E | 0xA1000F | 0xA10014 | 0xA10015 | 0xA1001A | 0xA1001B => 0xFF,
            _ => 0x00,
        }
    }

    fn write_io_register(&mut self, address: u32, value: u8) {
        let micros = self.memory.take_pending_micros();
        match address {
            0xA10002 | 0xA10003 => self.memory.p1.write_data(value, micros),
            0xA10004 | 0xA10005 => self.memory.p2.write_data(value, micros),
            0xA10008 | 0xA10009 => {
                self.memory.p1_ctrl = value;
                self.memory.p1.write_ctrl(value, micros);
            }
            0xA1000A | 0xA1000B => {
                self.memory.p2_ctrl = value;
                self.memory.p2.write_ctrl(value, micros);
            }
            _ => {}
        }
    }

    fn read_vdp_byte(&mut self, offset: u8) -> u8 {
        if offset & 0x1F >= 0x10 {
            // PSG / unused space; the PSG has no readable state.
            return 0xFF;
        }
        let word = self.callbacks.vdp_port_read(offset & !1);
        if offset & 1 == 0 { word.msb() } else { word.lsb() }
    }

    fn write_vdp_byte(&mut self, offset: u8, value: u8) {
        match offset & 0x1F {
            0x11 | 0x13 | 0x15 | 0x17 => self.callbacks.psg_write(value),
            0x10 | 0x12 | 0x14 | 0x16 | 0x18..=0x1F => {}
            _ => {
                let word = u16::from_le_bytes([value, value]);
                self.callbacks.vdp_port_write(offset & !1, word);
            }
        }
    }
}

impl<'a, C: Callbacks> m68000_emu::BusInterface for MainBus<'a, C> {
    fn read_byte(&mut self, address: u32) -> u8 {
        let address = address & M68K_ADDRESS_MASK;
        match address {
            0x000000..=0x7FFFFF | 0xA12000..=0xA1500F => self.callbacks.cartridge_read(address),
            0xA00000..=0xA0FFFF => {
                <Self as z80_emu::BusInterface>::read_memory(self, (address & 0x7FFF) as u16)
            }
            0xA10000..=0xA1001F => self.read_io_register(address),
            0xA11100..=0xA11101 => u8::from(!self.memory.z80_signals.busreq),
            0xC00000..=0xC0001F => self.read_vdp_byte((address & 0x1F) as u8),
            0xE00000..=0xFFFFFF => self.memory.work_ram[(address & 0xFFFF) as usize],
            _ => 0xFF,
        }
    }

    fn read_word(&mut self, address: u32) -> u16 {
        let address = address & M68K_ADDRESS_MASK;
        match address {
            0x000000..=0x7FFFFF | 0xA12000..=0xA1500F => {
                let high = self.callbacks.cartridge_read(address);
                let low = self.callbacks.cartridge_read(address.wrapping_add(1));
                u16::from_be_bytes([high, low])
            }
            0xA00000..=0xA0FFFF => {
                let byte = self.read_byte(address);
                u16::from_le_bytes([byte, byte])
            }
            0xA10000..=0xA1001F => {
                let byte = self.read_io_register(address);
                u16::from_le_bytes([byte, byte])
            }
            0xA11100..=0xA11101 => {
                let byte = u8::from(!self.memory.z80_signals.busreq);
                u16::from_le_bytes([byte, byte])
            }
            0xC00000..=0xC0001F => self.callbacks.vdp_port_read((address & 0x1F) as u8),
            0xE00000..=0xFFFFFF => {
                let addr = (address & 0xFFFF) as usize;
                u16::from_be_bytes([
                    self.memory.work_ram[addr],
                    self.memory.work_ram[(addr + 1) & 0xFFFF],
                ])
            }
            _ => 0xFFFF,
        }
    }

    fn write_byte(&mut self, address: u32, value: u8) {
        let address = address & M68K_ADDRESS_MASK;
        match address {
            0x000000..=0x7FFFFF | 0xA12000..=0xA1500F => {
                self.callbacks.cartridge_write(address, value);
            }
            0xA00000..=0xA0FFFF => {
                <Self as z80_emu::BusInterface>::write_memory(self, (address & 0x7FFF) as u16, value);
            }
            0xA10000..=0xA1001F => self.write_io_register(address, value),
            0xA11100..=0xA11101 => self.memory.z80_signals.busreq = value.bit(0),
            0xA11200..=0xA11201 => self.memory.z80_signals.reset = !value.bit(0),
            0xC00000..=0xC0001F => self.write_vdp_byte((address & 0x1F) as u8, value),
            0xE00000..=0xFFFFFF => self.memory.work_ram[(address & 0xFFFF) as usize] = value,
            _ => {}
        }
    }

    fn write_word(&mut self, address: u32, value: u16) {
        let address = address & M68K_ADDRESS_MASK;
        match address {
            0x000000..=0x7FFFFF | 0xA12000..=0xA1500F => {
                self.callbacks.cartridge_write(address, value.msb());
                self.callbacks.cartridge_write(address.wrapping_add(1), value.lsb());
            }
            0xA00000..=0xA0FFFF => self.write_byte(address, value.msb()),
            0xA10000..=0xA1001F => self.write_io_register(address, value.lsb()),
            0xA11100..=0xA11101 => self.memory.z80_signals.busreq = value.bit(8),
            0xA11200..=0xA11201 => self.memory.z80_signals.reset = !value.bit(8),
            0xC00000..=0xC0001F => self.callbacks.vdp_port_write((address & 0x1F) as u8, value),
            0xE00000..=0xFFFFFF => {
                let addr = (address & 0xFFFF) as usize;
                self.memory.work_ram[addr] = value.msb();
                self.memory.work_ram[(addr + 1) & 0xFFFF] = value.lsb();
            }
            _ => {}
        }
    }

    fn interrupt_level(&self) -> u8 {
        self.pending_interrupt_level
    }

    fn acknowledge_interrupt(&mut self, _interrupt_level: u8) {
        self.pending_interrupt_level = 0;
    }

    fn halt(&self) -> bool {
        false
    }

    fn reset(&self) -> bool {
        false
    }
}

impl<'a, C: Callbacks> z80_emu::BusInterface for MainBus<'a, C> {
    fn read_memory(&mut self, address: u16) -> u8 {
        match address {
            0x0000..=0x3FFF => self.memory.z80_ram[(address & 0x1FFF) as usize],
            0x4000..=0x5FFF => self.fm.read_status(),
            0x6000..=0x60FF => 0xFF,
            0x6100..=0x7EFF => 0xFF,
            0x7F00..=0x7F1F => self.read_vdp_byte((address & 0x1F) as u8),
            0x7F20..=0x7FFF => 0xFF,
            0x8000..=0xFFFF => {
                self.z80_accessed_68k_bus = true;
                let m68k_addr = self.memory.z80_bank.map_to_68k_address(address);
                if (0xA00000..=0xA0FFFF).contains(&m68k_addr) {
                    self.callbacks.error_report(
                        "Z80 bank window points back at its own address space; returning open bus",
                    );
                    0xFF
                } else {
                    <Self as m68000_emu::BusInterface>::read_byte(self, m68k_addr)
                }
            }
        }
    }

    fn write_memory(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x3FFF => self.memory.z80_ram[(address & 0x1FFF) as usize] = value,
            0x4000..=0x5FFF => match address & 0x03 {
                0x00 => self.fm.write_address_port_0(value),
                0x02 => self.fm.write_address_port_1(value),
                0x01 | 0x03 => self.fm.write_data(value),
                _ => unreachable!("value & 0x03 is always <= 0x03"),
            },
            0x6000..=0x60FF => self.memory.z80_bank.write_bit(value.bit(0)),
            0x6100..=0x7EFF | 0x7F20..=0x7FFF => {}
            0x7F00..=0x7F1F => self.write_vdp_byte((address & 0x1F) as u8, value),
            0x8000..=0xFFFF => {
                self.z80_accessed_68k_bus = true;
                let m68k_addr = self.memory.z80_bank.map_to_68k_address(address);
                if (0xA00000..=0xA0FFFF).contains(&m68k_addr) {
                    self.callbacks.error_report(
                        "Z80 bank window points back at its own address space; write dropped",
                    );
                } else {
                    <Self as m68000_emu::BusInterface>::write_byte(self, m68k_addr, value);
                }
            }
        }
    }

    fn read_io(&mut self, _address: u16) -> u8 {
        0xFF
    }

    fn write_io(&mut self, _address: u16, _value: u8) {}

    fn nmi(&self) -> z80_emu::InterruptLine {
        z80_emu::InterruptLine::High
    }

    fn int(&self) -> z80_emu::InterruptLine {
        // The Z80's only interrupt source on real hardware is the VDP vblank line; the
        // Scheduler (which knows scanline position) drives this independently of the 68k's
        // own interrupt level.
        if self.z80_int_line {
            z80_emu::InterruptLine::Low
        } else {
            z80_emu::InterruptLine::High
        }
    }

    fn busreq(&self) -> bool {
        self.memory.z80_signals.busreq
    }

    fn reset(&self) -> bool {
        self.memory.z80_signals.reset
    }
}
