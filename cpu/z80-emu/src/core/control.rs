use super::load::{block_compare, block_transfer, BlockDirection};
use super::*;

pub(super) fn djnz<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let displacement = cpu.fetch_byte() as i8;
    let b = cpu.registers.b.wrapping_sub(1);
    cpu.registers.b = b;
    if b != 0 {
        cpu.registers.pc = cpu.registers.pc.wrapping_add_signed(displacement as i16);
        13
    } else {
        8
    }
}

pub(super) fn jr_unconditional<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let displacement = cpu.fetch_byte() as i8;
    cpu.registers.pc = cpu.registers.pc.wrapping_add_signed(displacement as i16);
    12
}

pub(super) fn jr_conditional<B: BusInterface>(
    cpu: &mut InstructionExecutor<'_, '_, B>,
    condition: bool,
) -> u32 {
    let displacement = cpu.fetch_byte() as i8;
    if condition {
        cpu.registers.pc = cpu.registers.pc.wrapping_add_signed(displacement as i16);
        12
    } else {
        7
    }
}

pub(super) fn halt<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    cpu.registers.halted = true;
    4
}

fn condition_from_opcode(cpu: &InstructionExecutor<'_, '_, impl BusInterface>, opcode: u8) -> bool {
    match (opcode >> 3) & 0x07 {
        0 => !cpu.registers.f.zero,
        1 => cpu.registers.f.zero,
        2 => !cpu.registers.f.carry,
        3 => cpu.registers.f.carry,
        4 => !cpu.registers.f.parity_overflow,
        5 => cpu.registers.f.parity_overflow,
        6 => !cpu.registers.f.sign,
        _ => cpu.registers.f.sign,
    }
}

pub(super) fn ret_conditional<B: BusInterface>(
    cpu: &mut InstructionExecutor<'_, '_, B>,
    opcode: u8,
) -> u32 {
    if condition_from_opcode(cpu, opcode) {
        cpu.registers.pc = cpu.pop();
        11
    } else {
        5
    }
}

pub(super) fn ret_unconditional<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    cpu.registers.pc = cpu.pop();
    10
}

pub(super) fn jp_conditional<B: BusInterface>(
    cpu: &mut InstructionExecutor<'_, '_, B>,
    opcode: u8,
) -> u32 {
    let target = cpu.fetch_word();
    if condition_from_opcode(cpu, opcode) {
        cpu.registers.pc = target;
    }
    10
}

pub(super) fn jp_unconditional<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    cpu.registers.pc = cpu.fetch_word();
    10
}

pub(super) fn jp_hl<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    cpu.registers.pc = cpu.mode.read(cpu.registers);
    4
}

pub(super) fn call_conditional<B: BusInterface>(
    cpu: &mut InstructionExecutor<'_, '_, B>,
    opcode: u8,
) -> u32 {
    let target = cpu.fetch_word();
    if condition_from_opcode(cpu, opcode) {
        cpu.push(cpu.registers.pc);
        cpu.registers.pc = target;
        17
    } else {
        10
    }
}

pub(super) fn call_unconditional<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let target = cpu.fetch_word();
    cpu.push(cpu.registers.pc);
    cpu.registers.pc = target;
    17
}

pub(super) fn rst<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>, opcode: u8) -> u32 {
    cpu.push(cpu.registers.pc);
    cpu.registers.pc = u16::from(opcode & 0x38);
    11
}

pub(super) fn out_immediate<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let port = cpu.fetch_byte();
    let address = u16::from_le_bytes([port, cpu.registers.a]);
    cpu.bus.write_io(address, cpu.registers.a);
    11
}

pub(super) fn in_immediate<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let port = cpu.fetch_byte();
    let address = u16::from_le_bytes([port, cpu.registers.a]);
    cpu.registers.a = cpu.bus.read_io(address);
    11
}

pub(super) fn di<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    cpu.registers.iff1 = false;
    cpu.registers.iff2 = false;
    4
}

pub(super) fn ei<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    cpu.registers.iff1 = true;
    cpu.registers.iff2 = true;
    cpu.registers.ei_pending = true;
    4
}

/// The ED-prefix table: block transfer/compare/IO, 16-bit ADC/SBC, `NEG`, `RETN`/`RETI`,
/// interrupt mode selection, `I`/`R` loads, `RRD`/`RLD`, and the extended `LD (nn),rr` /
/// `LD rr,(nn)` forms.
pub(super) fn execute_ed<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>, opcode: u8) -> u32 {
    match opcode {
        0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => in_c(cpu, opcode),
        0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => out_c(cpu, opcode),
        0x42 | 0x52 | 0x62 | 0x72 => {
            let register = cpu.register16_from_dd_bits(opcode);
            arithmetic::sbc_hl_ss(cpu, register)
        }
        0x4A | 0x5A | 0x6A | 0x7A => {
            let register = cpu.register16_from_dd_bits(opcode);
            arithmetic::adc_hl_ss(cpu, register)
        }
        0x43 | 0x53 | 0x63 | 0x73 => {
            let address = cpu.fetch_word();
            let register = cpu.register16_from_dd_bits(opcode);
            let value = cpu.register16_read(register);
            cpu.write_word(address, value);
            20
        }
        0x4B | 0x5B | 0x6B | 0x7B => {
            let address = cpu.fetch_word();
            let value = cpu.read_word(address);
            let register = cpu.register16_from_dd_bits(opcode);
            cpu.register16_write(register, value);
            20
        }
        0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => arithmetic::neg(cpu),
        0x45 | 0x4D | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => retn_reti(cpu),
        0x46 | 0x4E | 0x66 | 0x6E => {
            cpu.registers.set_interrupt_mode(InterruptMode::Mode0);
            8
        }
        0x56 | 0x76 => {
            cpu.registers.set_interrupt_mode(InterruptMode::Mode1);
            8
        }
        0x5E | 0x7E => {
            cpu.registers.set_interrupt_mode(InterruptMode::Mode2);
            8
        }
        0x47 => {
            cpu.registers.i = cpu.registers.a;
            9
        }
        0x4F => {
            cpu.registers.r = cpu.registers.a;
            9
        }
        0x57 => {
            cpu.registers.a = cpu.registers.i;
            cpu.registers.f.sign = cpu.registers.a.bit(7);
            cpu.registers.f.zero = cpu.registers.a == 0;
            cpu.registers.f.half_carry = false;
            cpu.registers.f.parity_overflow = cpu.registers.iff2;
            cpu.registers.f.subtract = false;
            9
        }
        0x5F => {
            cpu.registers.a = cpu.registers.r;
            cpu.registers.f.sign = cpu.registers.a.bit(7);
            cpu.registers.f.zero = cpu.registers.a == 0;
            cpu.registers.f.half_carry = false;
            cpu.registers.f.parity_overflow = cpu.registers.iff2;
            cpu.registers.f.subtract = false;
            9
        }
        0x67 => rrd(cpu),
        0x6F => rld(cpu),
        0xA0 => block_transfer(cpu, BlockDirection::Increment, false),
        0xA8 => block_transfer(cpu, BlockDirection::Decrement, false),
        0xB0 => block_transfer(cpu, BlockDirection::Increment, true),
        0xB8 => block_transfer(cpu, BlockDirection::Decrement, true),
        0xA1 => block_compare(cpu, BlockDirection::Increment, false),
        0xA9 => block_compare(cpu, BlockDirection::Decrement, false),
        0xB1 => block_compare(cpu, BlockDirection::Increment, true),
        0xB9 => block_compare(cpu, BlockDirection::Decrement, true),
        0xA2 => block_in(cpu, BlockDirection::Increment, false),
        0xAA => block_in(cpu, BlockDirection::Decrement, false),
        0xB2 => block_in(cpu, BlockDirection::Increment, true),
        0xBA => block_in(cpu, BlockDirection::Decrement, true),
        0xA3 => block_out(cpu, BlockDirection::Increment, false),
        0xAB => block_out(cpu, BlockDirection::Decrement, false),
        0xB3 => block_out(cpu, BlockDirection::Increment, true),
        0xBB => block_out(cpu, BlockDirection::Decrement, true),
        // Undocumented ED opcodes (and 0x00-0x3F/0xC0-0xFF outside the table above) act as
        // an 8-cycle NOP on real hardware.
        _ => 8,
    }
}

fn in_c<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>, opcode: u8) -> u32 {
    let address = cpu.registers.bc();
    let value = cpu.bus.read_io(address);
    let dest = (opcode >> 3) & 0x07;
    // `IN (C)` (dest == 6, opcode 0x70) reads and sets flags but discards the value.
    if dest != 0x06 {
        cpu.write_r_or_hl(dest, None, value);
    }
    cpu.registers.f.sign = value.bit(7);
    cpu.registers.f.zero = value == 0;
    cpu.registers.f.half_carry = false;
    cpu.registers.f.set_parity_from(value);
    cpu.registers.f.subtract = false;
    12
}

fn out_c<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>, opcode: u8) -> u32 {
    let address = cpu.registers.bc();
    let src = (opcode >> 3) & 0x07;
    // `OUT (C),0` (src == 6, opcode 0x71) outputs a constant zero on real hardware.
    let value = if src == 0x06 { 0 } else { cpu.read_r_or_hl(src, None) };
    cpu.bus.write_io(address, value);
    12
}

fn retn_reti<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    cpu.registers.pc = cpu.pop();
    cpu.registers.iff1 = cpu.registers.iff2;
    14
}

fn rrd<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let address = cpu.registers.hl();
    let memory = cpu.bus.read_memory(address);
    let a = cpu.registers.a;

    let new_memory = (a << 4) | (memory >> 4);
    let new_a = (a & 0xF0) | (memory & 0x0F);

    cpu.bus.write_memory(address, new_memory);
    cpu.registers.a = new_a;

    cpu.registers.f.sign = new_a.bit(7);
    cpu.registers.f.zero = new_a == 0;
    cpu.registers.f.half_carry = false;
    cpu.registers.f.set_parity_from(new_a);
    cpu.registers.f.subtract = false;
    18
}

fn rld<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let address = cpu.registers.hl();
    let memory = cpu.bus.read_memory(address);
    let a = cpu.registers.a;

    let new_memory = (memory << 4) | (a & 0x0F);
    let new_a = (a & 0xF0) | (memory >> 4);

    cpu.bus.write_memory(address, new_memory);
    cpu.registers.a = new_a;

    cpu.registers.f.sign = new_a.bit(7);
    cpu.registers.f.zero = new_a == 0;
    cpu.registers.f.half_carry = false;
    cpu.registers.f.set_parity_from(new_a);
    cpu.registers.f.subtract = false;
    18
}

/// `INI`/`IND`/`INIR`/`INDR`: reads `(C)` into `(HL)`, stepping HL and decrementing B.
fn block_in<B: BusInterface>(
    cpu: &mut InstructionExecutor<'_, '_, B>,
    direction: BlockDirection,
    repeat: bool,
) -> u32 {
    let mut cycles = 0;
    loop {
        let address = cpu.registers.bc();
        let value = cpu.bus.read_io(address);
        let hl = cpu.registers.hl();
        cpu.bus.write_memory(hl, value);

        let step: i16 = match direction {
            BlockDirection::Increment => 1,
            BlockDirection::Decrement => -1,
        };
        cpu.registers.set_hl(hl.wrapping_add_signed(step));

        let b = cpu.registers.b.wrapping_sub(1);
        cpu.registers.b = b;

        cpu.registers.f.zero = b == 0;
        cpu.registers.f.subtract = true;

        cycles += 16;

        if !repeat || b == 0 {
            break;
        }
        cycles += 5;
    }
    cycles
}

/// `OUTI`/`OUTD`/`OTIR`/`OTDR`: writes `(HL)` to `(C)`, stepping HL and decrementing B.
fn block_out<B: BusInterface>(
    cpu: &mut InstructionExecutor<'_, '_, B>,
    direction: BlockDirection,
    repeat: bool,
) -> u32 {
    let mut cycles = 0;
    loop {
        let hl = cpu.registers.hl();
        let value = cpu.bus.read_memory(hl);

        let b = cpu.registers.b.wrapping_sub(1);
        cpu.registers.b = b;

        let address = cpu.registers.bc();
        cpu.bus.write_io(address, value);

        let step: i16 = match direction {
            BlockDirection::Increment => 1,
            BlockDirection::Decrement => -1,
        };
        cpu.registers.set_hl(hl.wrapping_add_signed(step));

        cpu.registers.f.zero = b == 0;
        cpu.registers.f.subtract = true;

        cycles += 16;

        if !repeat || b == 0 {
            break;
        }
        cycles += 5;
    }
    cycles
}

#[cfg(test)]
mod tests {
    use crate::traits::InMemoryBus;
    use crate::Z80;

    #[test]
    fn ldir_copies_block_and_decrements_bc_to_zero() {
        let mut bus = InMemoryBus::new();
        let mut cpu = Z80::new();
        cpu.set_pc(0x100);
        cpu.set_hl(0x2000);
        cpu.set_de(0x3000);
        cpu.set_bc(0x0003);
        bus.memory[0x2000] = 0xAA;
        bus.memory[0x2001] = 0xBB;
        bus.memory[0x2002] = 0xCC;
        bus.memory[0x100] = 0xED;
        bus.memory[0x101] = 0xB0; // LDIR

        cpu.execute_instruction(&mut bus);

        assert_eq!(bus.memory[0x3000], 0xAA);
        assert_eq!(bus.memory[0x3001], 0xBB);
        assert_eq!(bus.memory[0x3002], 0xCC);
        assert_eq!(cpu.bc(), 0);
        assert_eq!(cpu.hl(), 0x2003);
        assert_eq!(cpu.de(), 0x3003);
        // Parity/overflow flag reflects whether BC-1 (here 0) is nonzero; LDIR clears it
        // once the block finishes.
        assert_eq!(cpu.af() & 0x04, 0);
    }

    #[test]
    fn djnz_loops_until_b_reaches_zero() {
        let mut bus = InMemoryBus::new();
        let mut cpu = Z80::new();
        cpu.set_pc(0x100);
        cpu.set_bc(0x0300); // B = 3
        bus.memory[0x100] = 0x10; // DJNZ, branches back onto itself
        bus.memory[0x101] = 0xFE; // displacement -2

        let cycles_1 = cpu.execute_instruction(&mut bus);
        assert_eq!(cpu.bc() >> 8, 2);
        assert_eq!(cycles_1, 13);
        cpu.set_pc(0x100);

        let cycles_2 = cpu.execute_instruction(&mut bus);
        assert_eq!(cpu.bc() >> 8, 1);
        assert_eq!(cycles_2, 13);
        cpu.set_pc(0x100);

        let cycles_3 = cpu.execute_instruction(&mut bus);
        assert_eq!(cpu.bc() >> 8, 0);
        assert_eq!(cycles_3, 8);
    }

    #[test]
    fn call_and_ret_round_trip_through_the_stack() {
        let mut bus = InMemoryBus::new();
        let mut cpu = Z80::new();
        cpu.set_pc(0x100);
        cpu.set_sp(0x8000);
        bus.memory[0x100] = 0xCD; // CALL 0x2000
        bus.memory[0x101] = 0x00;
        bus.memory[0x102] = 0x20;
        bus.memory[0x2000] = 0xC9; // RET

        cpu.execute_instruction(&mut bus);
        assert_eq!(cpu.pc(), 0x2000);
        assert_eq!(cpu.sp(), 0x7FFE);

        cpu.execute_instruction(&mut bus);
        assert_eq!(cpu.pc(), 0x103);
        assert_eq!(cpu.sp(), 0x8000);
    }

    #[test]
    fn rst_pushes_return_address_and_jumps_to_fixed_vector() {
        let mut bus = InMemoryBus::new();
        let mut cpu = Z80::new();
        cpu.set_pc(0x100);
        cpu.set_sp(0x8000);
        bus.memory[0x100] = 0xEF; // RST 0x28

        cpu.execute_instruction(&mut bus);
        assert_eq!(cpu.pc(), 0x0028);
        assert_eq!(bus.memory[0x7FFE], 0x01);
        assert_eq!(bus.memory[0x7FFF], 0x01);
    }
}
