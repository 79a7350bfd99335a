use super::*;

fn indexed_memory_penalty(mode: RegisterMode) -> u32 {
    match mode {
        RegisterMode::Hl => 0,
        RegisterMode::Ix | RegisterMode::Iy => 5,
    }
}

pub(super) fn rlca<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let carry = cpu.registers.a.bit(7);
    cpu.registers.a = (cpu.registers.a << 1) | u8::from(carry);
    cpu.registers.f.half_carry = false;
    cpu.registers.f.subtract = false;
    cpu.registers.f.carry = carry;
    4
}

pub(super) fn rrca<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let carry = cpu.registers.a.bit(0);
    cpu.registers.a = (cpu.registers.a >> 1) | (u8::from(carry) << 7);
    cpu.registers.f.half_carry = false;
    cpu.registers.f.subtract = false;
    cpu.registers.f.carry = carry;
    4
}

pub(super) fn rla<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let carry_in = cpu.registers.f.carry;
    let carry_out = cpu.registers.a.bit(7);
    cpu.registers.a = (cpu.registers.a << 1) | u8::from(carry_in);
    cpu.registers.f.half_carry = false;
    cpu.registers.f.subtract = false;
    cpu.registers.f.carry = carry_out;
    4
}

pub(super) fn rra<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let carry_in = cpu.registers.f.carry;
    let carry_out = cpu.registers.a.bit(0);
    cpu.registers.a = (cpu.registers.a >> 1) | (u8::from(carry_in) << 7);
    cpu.registers.f.half_carry = false;
    cpu.registers.f.subtract = false;
    cpu.registers.f.carry = carry_out;
    4
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RotateShiftOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    /// Undocumented `SLL`/`SL1`: shifts left shifting a 1 into bit 0.
    Sll,
    Srl,
}

impl RotateShiftOp {
    fn decode(opcode: u8) -> Self {
        match (opcode >> 3) & 0x07 {
            0 => Self::Rlc,
            1 => Self::Rrc,
            2 => Self::Rl,
            3 => Self::Rr,
            4 => Self::Sla,
            5 => Self::Sra,
            6 => Self::Sll,
            _ => Self::Srl,
        }
    }

    fn apply(self, value: u8, carry_in: bool) -> (u8, bool) {
        match self {
            Self::Rlc => {
                let carry = value.bit(7);
                ((value << 1) | u8::from(carry), carry)
            }
            Self::Rrc => {
                let carry = value.bit(0);
                ((value >> 1) | (u8::from(carry) << 7), carry)
            }
            Self::Rl => {
                let carry = value.bit(7);
                ((value << 1) | u8::from(carry_in), carry)
            }
            Self::Rr => {
                let carry = value.bit(0);
                ((value >> 1) | (u8::from(carry_in) << 7), carry)
            }
            Self::Sla => {
                let carry = value.bit(7);
                (value << 1, carry)
            }
            Self::Sra => {
                let carry = value.bit(0);
                ((value >> 1) | (value & 0x80), carry)
            }
            Self::Sll => {
                let carry = value.bit(7);
                ((value << 1) | 0x01, carry)
            }
            Self::Srl => {
                let carry = value.bit(0);
                (value >> 1, carry)
            }
        }
    }
}

fn rotate_shift_flags(result: u8, carry: bool) -> Flags {
    let mut flags = Flags::default();
    flags.set_sign_zero_from(result);
    flags.half_carry = false;
    flags.set_parity_from(result);
    flags.subtract = false;
    flags.carry = carry;
    flags
}

/// The CB-prefix table: rotate/shift (0x00-0x3F), `BIT` (0x40-0x7F), `RES` (0x80-0xBF),
/// `SET` (0xC0-0xFF), each operating on `r` / `(HL)` / `(IX+d)` / `(IY+d)`.
///
/// When the current mode is IX/IY, every row operates on the displaced memory location
/// regardless of the low 3 bits of `opcode`; the register those bits name (if not 6) is
/// additionally written with the same result, matching the undocumented DDCB/FDCB copy
/// behavior real Z80s exhibit.
pub(super) fn execute_cb<B: BusInterface>(
    cpu: &mut InstructionExecutor<'_, '_, B>,
    opcode: u8,
    displaced_address: Option<u16>,
) -> u32 {
    let bit_index = (opcode >> 3) & 0x07;
    let targets_memory = (opcode & 0x07) == 0x06 || displaced_address.is_some();

    let read_operand = |cpu: &mut InstructionExecutor<'_, '_, B>| -> u8 {
        if let Some(address) = displaced_address {
            cpu.bus.read_memory(address)
        } else {
            cpu.read_r_or_hl(opcode, None)
        }
    };
    let write_operand = |cpu: &mut InstructionExecutor<'_, '_, B>, value: u8| {
        if let Some(address) = displaced_address {
            cpu.bus.write_memory(address, value);
            if (opcode & 0x07) != 0x06 {
                cpu.write_r_or_hl(opcode, None, value);
            }
        } else {
            cpu.write_r_or_hl(opcode, None, value);
        }
    };

    match opcode {
        0x00..=0x3F => {
            let op = RotateShiftOp::decode(opcode);
            let value = read_operand(cpu);
            let (result, carry) = op.apply(value, cpu.registers.f.carry);
            write_operand(cpu, result);
            cpu.registers.f = rotate_shift_flags(result, carry);
        }
        0x40..=0x7F => {
            let value = read_operand(cpu);
            let set = value.bit(bit_index);
            cpu.registers.f.zero = !set;
            cpu.registers.f.parity_overflow = !set;
            cpu.registers.f.sign = bit_index == 7 && set;
            cpu.registers.f.half_carry = true;
            cpu.registers.f.subtract = false;
        }
        0x80..=0xBF => {
            let value = read_operand(cpu) & !(1 << bit_index);
            write_operand(cpu, value);
        }
        _ => {
            let value = read_operand(cpu) | (1 << bit_index);
            write_operand(cpu, value);
        }
    }

    if targets_memory { 15 + indexed_memory_penalty(cpu.mode) } else { 8 }
}

#[cfg(test)]
mod tests {
    use crate::traits::InMemoryBus;
    use crate::Z80;

    #[test]
    fn rlca_rotates_through_bit_7_into_carry_and_bit_0() {
        let mut bus = InMemoryBus::new();
        let mut cpu = Z80::new();
        cpu.set_pc(0x100);
        cpu.set_af(0x8100); // A = 0x81
        bus.memory[0x100] = 0x07; // RLCA
        cpu.execute_instruction(&mut bus);
        assert_eq!(cpu.af() >> 8, 0x03);
        assert_eq!((cpu.af() as u8) & 0x01, 0x01); // carry out = old bit 7
    }

    #[test]
    fn cb_bit_instruction_sets_zero_flag_when_bit_clear() {
        let mut bus = InMemoryBus::new();
        let mut cpu = Z80::new();
        cpu.set_pc(0x100);
        cpu.set_af(0x0000);
        cpu.set_bc(0x0000); // B = 0
        bus.memory[0x100] = 0xCB;
        bus.memory[0x101] = 0x40; // BIT 0,B
        cpu.execute_instruction(&mut bus);
        assert_eq!((cpu.af() as u8) & 0x40, 0x40); // Z set, bit was 0
    }

    #[test]
    fn cb_set_instruction_on_indirect_hl() {
        let mut bus = InMemoryBus::new();
        let mut cpu = Z80::new();
        cpu.set_pc(0x100);
        cpu.set_hl(0x2000);
        bus.memory[0x2000] = 0x00;
        bus.memory[0x100] = 0xCB;
        bus.memory[0x101] = 0xC6; // SET 0,(HL)
        cpu.execute_instruction(&mut bus);
        assert_eq!(bus.memory[0x2000], 0x01);
    }

    #[test]
    fn sra_preserves_sign_bit() {
        let mut bus = InMemoryBus::new();
        let mut cpu = Z80::new();
        cpu.set_pc(0x100);
        cpu.set_bc(0x8000); // B = 0x80
        bus.memory[0x100] = 0xCB;
        bus.memory[0x101] = 0x28; // SRA B
        cpu.execute_instruction(&mut bus);
        assert_eq!(cpu.bc() >> 8, 0xC0);
    }
}
