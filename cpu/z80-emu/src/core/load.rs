use super::*;

/// Extra T-states an indexed `(IX+d)`/`(IY+d)` memory access costs over the `(HL)` form,
/// per the simplified timing model in the spec: "indexed displacement adds 5 cycles".
const INDEXED_PENALTY: u32 = 5;

fn indexed_penalty(mode: RegisterMode) -> u32 {
    match mode {
        RegisterMode::Hl => 0,
        RegisterMode::Ix | RegisterMode::Iy => INDEXED_PENALTY,
    }
}

pub(super) fn load_r_r<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>, opcode: u8) -> u32 {
    let dest = (opcode >> 3) & 0x07;
    let is_memory_operand = (opcode & 0x07) == 0x06 || dest == 0x06;

    let value = cpu.read_r_or_hl(opcode, None);
    cpu.write_r_or_hl(dest, None, value);

    if is_memory_operand { 7 + indexed_penalty(cpu.mode) } else { 4 }
}

pub(super) fn load_r_immediate<B: BusInterface>(
    cpu: &mut InstructionExecutor<'_, '_, B>,
    opcode: u8,
) -> u32 {
    let dest = (opcode >> 3) & 0x07;
    let value = cpu.fetch_byte();
    cpu.write_r_or_hl(dest, None, value);
    7
}

pub(super) fn load_hl_immediate<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let address = cpu.hl_indirect_address();
    let value = cpu.fetch_byte();
    cpu.bus.write_memory(address, value);
    10 + indexed_penalty(cpu.mode)
}

pub(super) fn load_indirect_a<B: BusInterface>(
    cpu: &mut InstructionExecutor<'_, '_, B>,
    register: Register16,
) -> u32 {
    let address = cpu.register16_read(register);
    cpu.bus.write_memory(address, cpu.registers.a);
    7
}

pub(super) fn load_a_indirect<B: BusInterface>(
    cpu: &mut InstructionExecutor<'_, '_, B>,
    register: Register16,
) -> u32 {
    let address = cpu.register16_read(register);
    cpu.registers.a = cpu.bus.read_memory(address);
    7
}

pub(super) fn load_direct_a<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let address = cpu.fetch_word();
    cpu.bus.write_memory(address, cpu.registers.a);
    13
}

pub(super) fn load_a_direct<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let address = cpu.fetch_word();
    cpu.registers.a = cpu.bus.read_memory(address);
    13
}

pub(super) fn load_direct_hl<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let address = cpu.fetch_word();
    let value = cpu.mode.read(cpu.registers);
    cpu.write_word(address, value);
    16
}

pub(super) fn load_hl_direct<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    let address = cpu.fetch_word();
    let value = cpu.read_word(address);
    cpu.mode.write(cpu.registers, value);
    16
}

pub(super) fn load_dd_immediate<B: BusInterface>(
    cpu: &mut InstructionExecutor<'_, '_, B>,
    opcode: u8,
) -> u32 {
    let register = cpu.register16_from_dd_bits(opcode);
    let value = cpu.fetch_word();
    cpu.register16_write(register, value);
    10
}

pub(super) fn load_sp_hl<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>) -> u32 {
    cpu.registers.sp = cpu.mode.read(cpu.registers);
    6
}

pub(super) fn push_qq<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>, opcode: u8) -> u32 {
    let register = cpu.stack_register16_from_qq_bits(opcode);
    let value = cpu.stack_register16_read(register);
    cpu.push(value);
    11
}

pub(super) fn pop_qq<B: BusInterface>(cpu: &mut InstructionExecutor<'_, '_, B>, opcode: u8) -> u32 {
    let register = cpu.stack_register16_from_qq_bits(opcode);
    let value = cpu.pop();
    cpu.stack_register16_write(register, value);
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockDirection {
    Increment,
    Decrement,
}

/// `LDI`/`LDD`/`LDIR`/`LDDR`: copies `(HL)` to `(DE)`, stepping HL/DE and decrementing BC.
/// `repeat` requests the `R`-suffixed looping form.
pub(super) fn block_transfer<B: BusInterface>(
    cpu: &mut InstructionExecutor<'_, '_, B>,
    direction: BlockDirection,
    repeat: bool,
) -> u32 {
    let mut cycles = 0;
    loop {
        let hl = cpu.registers.hl();
        let de = cpu.registers.de();
        let value = cpu.bus.read_memory(hl);
        cpu.bus.write_memory(de, value);

        let step: i16 = match direction {
            BlockDirection::Increment => 1,
            BlockDirection::Decrement => -1,
        };
        cpu.registers.set_hl(hl.wrapping_add_signed(step));
        cpu.registers.set_de(de.wrapping_add_signed(step));

        let bc = cpu.registers.bc().wrapping_sub(1);
        cpu.registers.set_bc(bc);

        let _ = value.wrapping_add(cpu.registers.a);
        cpu.registers.f.half_carry = false;
        cpu.registers.f.subtract = false;
        cpu.registers.f.parity_overflow = bc != 0;

        cycles += 16;

        if !repeat || bc == 0 {
            break;
        }
        cycles += 5;
    }
    cycles
}

/// `CPI`/`CPD`/`CPIR`/`CPDR`: compares `A` against `(HL)`, stepping HL and decrementing BC.
pub(super) fn block_compare<B: BusInterface>(
    cpu: &mut InstructionExecutor<'_, '_, B>,
    direction: BlockDirection,
    repeat: bool,
) -> u32 {
    let mut cycles = 0;
    loop {
        let hl = cpu.registers.hl();
        let value = cpu.bus.read_memory(hl);
        let a = cpu.registers.a;
        let result = a.wrapping_sub(value);
        let half_carry = (a & 0x0F) < (value & 0x0F);

        let step: i16 = match direction {
            BlockDirection::Increment => 1,
            BlockDirection::Decrement => -1,
        };
        cpu.registers.set_hl(hl.wrapping_add_signed(step));

        let bc = cpu.registers.bc().wrapping_sub(1);
        cpu.registers.set_bc(bc);

        cpu.registers.f.sign = result.bit(7);
        cpu.registers.f.zero = result == 0;
        cpu.registers.f.half_carry = half_carry;
        cpu.registers.f.subtract = true;
        cpu.registers.f.parity_overflow = bc != 0;

        cycles += 16;

        if !repeat || bc == 0 || result == 0 {
            break;
        }
        cycles += 5;
    }
    cycles
}
