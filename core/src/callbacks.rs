//! The narrow interface the core calls out through for everything it does not own:
//! cartridge storage, the VDP and PSG collaborators, controller polling, and diagnostics.

use crate::controller::Button;

/// Which physical controller port a read targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPort {
    Player1,
    Player2,
}

/// Implemented by the host frontend. The core never assumes anything about how ROM bytes
/// are stored, how the VDP renders, or how input is physically read; it only issues these
/// calls at the moments the emulated hardware would.
pub trait Callbacks {
    /// Serve a cartridge ROM (or mapper-backed SRAM) byte for a 68k bus access.
    fn cartridge_read(&mut self, address: u32) -> u8;

    /// A 68k bus write landed in cartridge space. Most ROMs ignore this; mappers with
    /// battery-backed SRAM or bank-switching registers act on it.
    fn cartridge_write(&mut self, address: u32, value: u8);

    /// Forward a VDP port access. `offset` is the port-relative byte offset (0x00-0x1F on
    /// the 68k side, identical numbering on the Z80 side). The VDP itself is a collaborator
    /// the core does not implement.
    fn vdp_port_read(&mut self, offset: u8) -> u16;
    fn vdp_port_write(&mut self, offset: u8, value: u16);

    /// Forward a PSG register write. The PSG is a collaborator; the core never reads it.
    fn psg_write(&mut self, value: u8);

    /// One native-rate PSG sample, pulled once per PSG tick so the in-core Mixer can
    /// resample and sum it alongside the FM output.
    fn psg_sample_needed(&mut self) -> i16;

    /// Poll whether `button` is currently held on `port`.
    fn input_read(&self, port: ControllerPort, button: Button) -> bool;

    /// Notify the host that scanline `line` (of `screen_height` total, `screen_width` wide)
    /// has been reached. Actual pixel production belongs to the VDP collaborator; this is
    /// purely a timing hook the host uses to drive it.
    fn scanline_rendered(&mut self, line: u16, screen_width: u16, screen_height: u16);

    /// One final, resampled, host-rate stereo audio frame.
    fn audio_sample(&mut self, left: i16, right: i16);

    /// A non-fatal diagnostic (unimplemented opcode, malformed register write, etc).
    fn error_report(&mut self, message: &str);
}
