//! MOVE family: MOVE, MOVEA, MOVEQ, MOVEM, LEA, PEA, MOVE USP, and the
//! MOVE {to,from} SR/CCR variants.

use super::*;

pub(super) fn decode_move(opcode: u16) -> ExecuteResult<Instruction> {
    let size = match opcode & 0xF000 {
        0x1000 => OpSize::Byte,
        0x3000 => OpSize::Word,
        0x2000 => OpSize::LongWord,
        _ => unreachable!("caller already matched the top nibble to 0x1000/0x2000/0x3000"),
    };

    let source = AddressingMode::parse_from(((opcode >> 3) & 0x07) as u8, (opcode & 0x07) as u8)?;
    let dest_mode = ((opcode >> 6) & 0x07) as u8;
    let dest_register = ((opcode >> 9) & 0x07) as u8;

    // MOVEA.B does not exist; an address-register destination with byte size is illegal.
    if size == OpSize::Byte && dest_mode == 0x01 {
        return Err(Exception::IllegalInstruction(opcode));
    }

    let dest = AddressingMode::parse_from(dest_mode, dest_register)?;
    if !dest.is_writable() {
        return Err(Exception::IllegalInstruction(opcode));
    }

    Ok(Instruction::Move { size, source, dest })
}

pub(super) fn decode_movq(opcode: u16) -> ExecuteResult<Instruction> {
    if opcode.bit(8) {
        return Err(Exception::IllegalInstruction(opcode));
    }

    let data = opcode as u8;
    let register = DataRegister::from(((opcode >> 9) & 0x07) as u8);
    Ok(Instruction::MoveQuick(data as i8, register))
}

pub(super) fn decode_move_from_sr(opcode: u16) -> ExecuteResult<Instruction> {
    let dest = AddressingMode::parse_from_opcode(opcode)?;
    if !dest.is_data_alterable() {
        return Err(Exception::IllegalInstruction(opcode));
    }
    Ok(Instruction::MoveFromSr(dest))
}

pub(super) fn decode_move_to_ccr(opcode: u16) -> ExecuteResult<Instruction> {
    let source = AddressingMode::parse_from_opcode(opcode)?;
    Ok(Instruction::MoveToCcr(source))
}

pub(super) fn decode_move_to_sr(opcode: u16, supervisor_mode: bool) -> ExecuteResult<Instruction> {
    if !supervisor_mode {
        return Err(Exception::PrivilegeViolation);
    }
    let source = AddressingMode::parse_from_opcode(opcode)?;
    Ok(Instruction::MoveToSr(source))
}

pub(super) fn decode_move_usp(opcode: u16, supervisor_mode: bool) -> ExecuteResult<Instruction> {
    if !supervisor_mode {
        return Err(Exception::PrivilegeViolation);
    }

    let register = AddressRegister::from(opcode as u8);
    let direction =
        if opcode.bit(3) { UspDirection::UspToRegister } else { UspDirection::RegisterToUsp };
    Ok(Instruction::MoveUsp(direction, register))
}

pub(super) fn decode_lea(opcode: u16) -> ExecuteResult<Instruction> {
    let dest = AddressRegister::from(((opcode >> 9) & 0x07) as u8);
    let source = AddressingMode::parse_from_opcode(opcode)?;
    if matches!(
        source,
        AddressingMode::DataDirect(_)
            | AddressingMode::AddressDirect(_)
            | AddressingMode::AddressIndirectPostincrement(_)
            | AddressingMode::AddressIndirectPredecrement(_)
            | AddressingMode::Immediate
    ) {
        return Err(Exception::IllegalInstruction(opcode));
    }
    Ok(Instruction::LoadEffectiveAddress { source, dest })
}

pub(super) fn decode_pea(opcode: u16) -> ExecuteResult<Instruction> {
    let source = AddressingMode::parse_from_opcode(opcode)?;
    if matches!(
        source,
        AddressingMode::DataDirect(_)
            | AddressingMode::AddressDirect(_)
            | AddressingMode::AddressIndirectPostincrement(_)
            | AddressingMode::AddressIndirectPredecrement(_)
            | AddressingMode::Immediate
    ) {
        return Err(Exception::IllegalInstruction(opcode));
    }
    Ok(Instruction::PushEffectiveAddress(source))
}

pub(super) fn decode_movem(opcode: u16, size: OpSize) -> ExecuteResult<Instruction> {
    let direction = Direction::parse_from_opcode(opcode);
    let target = AddressingMode::parse_from_opcode(opcode)?;

    let target_valid = match (direction, target) {
        (Direction::RegisterToMemory, AddressingMode::AddressIndirectPredecrement(_)) => true,
        (Direction::RegisterToMemory, AddressingMode::AddressIndirectPostincrement(_)) => false,
        (Direction::RegisterToMemory, mode) => mode.is_data_alterable(),
        (Direction::MemoryToRegister, AddressingMode::AddressIndirectPostincrement(_)) => true,
        (Direction::MemoryToRegister, mode) => !matches!(
            mode,
            AddressingMode::DataDirect(_)
                | AddressingMode::AddressDirect(_)
                | AddressingMode::AddressIndirectPredecrement(_)
                | AddressingMode::Immediate
                | AddressingMode::Quick(..)
                | AddressingMode::Implied
        ),
    };

    if !target_valid {
        return Err(Exception::IllegalInstruction(opcode));
    }

    Ok(Instruction::MoveMultiple { size, direction, target })
}

/// Register-list bit order: bit N maps to (is_address_register, register_index). The
/// predecrement addressing mode walks the list from A7 down to D0; every other mode
/// walks it from D0 up to A7.
fn movem_register_order(predecrement: bool) -> Vec<(bool, u8)> {
    if predecrement {
        (0..8).rev().map(|n| (true, n)).chain((0..8).rev().map(|n| (false, n))).collect()
    } else {
        (0..8).map(|n| (false, n)).chain((0..8).map(|n| (true, n))).collect()
    }
}

fn movem_read_register(registers: &Registers, is_address: bool, index: u8) -> u32 {
    if is_address {
        AddressRegister::from(index).read_from(registers)
    } else {
        DataRegister::from(index).read_from(registers)
    }
}

fn movem_write_register(registers: &mut Registers, is_address: bool, index: u8, value: u32) {
    if is_address {
        AddressRegister::from(index).write_long_word_to(registers, value);
    } else {
        DataRegister::from(index).write_long_word_to(registers, value);
    }
}

impl<'registers, 'bus, B: BusInterface> InstructionExecutor<'registers, 'bus, B> {
    pub(super) fn move_(
        &mut self,
        size: OpSize,
        source: AddressingMode,
        dest: AddressingMode,
    ) -> ExecuteResult<()> {
        let value: u32 = self.read(source, size)?.into();
        self.write(dest, SizedValue::from_size(value, size))?;

        // MOVEA (dest is an address register) leaves the condition codes unaffected.
        if !dest.is_address_direct() {
            self.set_logical_flags(value, size);
        }
        Ok(())
    }

    pub(super) fn moveq(&mut self, data: i8, register: DataRegister) {
        let value = data as i32 as u32;
        register.write_long_word_to(self.registers, value);
        self.set_logical_flags(value, OpSize::LongWord);
    }

    pub(super) fn move_from_sr(&mut self, dest: AddressingMode) -> ExecuteResult<()> {
        let sr = self.registers.status_register();
        self.write_word(dest, sr)
    }

    pub(super) fn move_to_ccr(&mut self, source: AddressingMode) -> ExecuteResult<()> {
        let value = self.read_word(source)?;
        self.registers.ccr = (value as u8).into();
        Ok(())
    }

    pub(super) fn move_to_sr(&mut self, source: AddressingMode) -> ExecuteResult<()> {
        let value = self.read_word(source)?;
        self.registers.set_status_register(value);
        Ok(())
    }

    pub(super) fn move_usp(&mut self, direction: UspDirection, register: AddressRegister) {
        match direction {
            UspDirection::RegisterToUsp => {
                self.registers.usp = register.read_from(self.registers);
            }
            UspDirection::UspToRegister => {
                let usp = self.registers.usp;
                register.write_long_word_to(self.registers, usp);
            }
        }
    }

    pub(super) fn lea(&mut self, source: AddressingMode, dest: AddressRegister) -> ExecuteResult<()> {
        let resolved = self.resolve_address(source, OpSize::LongWord)?;
        let address =
            resolved.address().expect("LEA source addressing modes always resolve to an address");
        dest.write_long_word_to(self.registers, address);
        Ok(())
    }

    pub(super) fn pea(&mut self, source: AddressingMode) -> ExecuteResult<()> {
        let resolved = self.resolve_address(source, OpSize::LongWord)?;
        let address =
            resolved.address().expect("PEA source addressing modes always resolve to an address");
        self.push_stack_u32(address)
    }

    fn read_memory_for_movem(&mut self, address: u32, size: OpSize) -> ExecuteResult<u32> {
        match size {
            OpSize::Word => self.read_bus_word(address).map(|value| value as i16 as u32),
            OpSize::LongWord => self.read_bus_long_word(address),
            OpSize::Byte => unreachable!("MOVEM only operates on words and long words"),
        }
    }

    fn write_memory_for_movem(&mut self, address: u32, value: u32, size: OpSize) -> ExecuteResult<()> {
        match size {
            OpSize::Word => self.write_bus_word(address, value as u16),
            OpSize::LongWord => self.write_bus_long_word(address, value),
            OpSize::Byte => unreachable!("MOVEM only operates on words and long words"),
        }
    }

    pub(super) fn movem(
        &mut self,
        size: OpSize,
        direction: Direction,
        target: AddressingMode,
    ) -> ExecuteResult<()> {
        let register_list = self.fetch_operand()?;
        let step = size.bytes();
        let predecrement = matches!(target, AddressingMode::AddressIndirectPredecrement(_));
        let order = movem_register_order(predecrement);

        match (direction, target) {
            (Direction::RegisterToMemory, AddressingMode::AddressIndirectPredecrement(ea_register)) => {
                let mut address = ea_register.read_from(self.registers);
                for (bit, &(is_address, index)) in order.iter().enumerate() {
                    if !register_list.bit(bit as u8) {
                        continue;
                    }
                    address = address.wrapping_sub(step);
                    let value = movem_read_register(self.registers, is_address, index);
                    self.write_memory_for_movem(address, value, size)?;
                }
                ea_register.write_long_word_to(self.registers, address);
            }
            (Direction::RegisterToMemory, ea) => {
                let resolved = self.resolve_address(ea, size)?;
                let mut address =
                    resolved.address().expect("MOVEM memory target must resolve to an address");
                for (bit, &(is_address, index)) in order.iter().enumerate() {
                    if !register_list.bit(bit as u8) {
                        continue;
                    }
                    let value = movem_read_register(self.registers, is_address, index);
                    self.write_memory_for_movem(address, value, size)?;
                    address = address.wrapping_add(step);
                }
            }
            (Direction::MemoryToRegister, AddressingMode::AddressIndirectPostincrement(ea_register)) => {
                let mut address = ea_register.read_from(self.registers);
                for (bit, &(is_address, index)) in order.iter().enumerate() {
                    if !register_list.bit(bit as u8) {
                        continue;
                    }
                    let value = self.read_memory_for_movem(address, size)?;
                    movem_write_register(self.registers, is_address, index, value);
                    address = address.wrapping_add(step);
                }
                ea_register.write_long_word_to(self.registers, address);
            }
            (Direction::MemoryToRegister, ea) => {
                let resolved = self.resolve_address(ea, size)?;
                let mut address =
                    resolved.address().expect("MOVEM memory source must resolve to an address");
                for (bit, &(is_address, index)) in order.iter().enumerate() {
                    if !register_list.bit(bit as u8) {
                        continue;
                    }
                    let value = self.read_memory_for_movem(address, size)?;
                    movem_write_register(self.registers, is_address, index, value);
                    address = address.wrapping_add(step);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryBus;
    use crate::M68000;

    fn new_cpu(bus: &mut InMemoryBus, pc: u32) -> M68000 {
        bus.write_long_word(0, 0x0010_0000);
        bus.write_long_word(4, pc);
        let mut cpu = M68000::new();
        cpu.reset(bus);
        cpu
    }

    #[test]
    fn movea_does_not_affect_flags() {
        let mut bus = InMemoryBus::new();
        // MOVEA.L #$FFFFFFFF, A0
        bus.write_word(0x400, 0x207C);
        bus.write_long_word(0x402, 0xFFFF_FFFF);
        let mut cpu = new_cpu(&mut bus, 0x400);
        cpu.set_status_register(0x0000);
        cpu.execute_instruction(&mut bus);
        assert_eq!(cpu.address_registers()[0], 0xFFFF_FFFF);
        assert_eq!(cpu.status_register() & 0x1F, 0);
    }

    #[test]
    fn moveq_sign_extends_and_sets_flags() {
        let mut bus = InMemoryBus::new();
        // MOVEQ #-1, D0
        bus.write_word(0x400, 0x70FF);
        let mut cpu = new_cpu(&mut bus, 0x400);
        cpu.execute_instruction(&mut bus);
        assert_eq!(cpu.data_registers()[0], 0xFFFF_FFFF);
        assert_eq!(cpu.status_register() & 0x0F, 0x08);
    }

    #[test]
    fn movem_predecrement_then_postincrement_round_trips() {
        let mut bus = InMemoryBus::new();
        // MOVEM.L D0-D1/A0, -(A7)
        bus.write_word(0x400, 0x48E7);
        bus.write_word(0x402, 0b1100_0000_0000_0000);
        // MOVEM.L (A7)+, D0-D1/A0
        bus.write_word(0x404, 0x4CDF);
        bus.write_word(0x406, 0b0000_0000_0000_0011);
        let mut cpu = new_cpu(&mut bus, 0x400);
        cpu.set_data_registers([0x1111_1111, 0x2222_2222, 0, 0, 0, 0, 0, 0]);
        cpu.set_address_registers([0x3333_3333, 0, 0, 0, 0, 0, 0], 0, 0x1000);

        cpu.execute_instruction(&mut bus);
        cpu.set_data_registers([0, 0, 0, 0, 0, 0, 0, 0]);
        cpu.set_address_registers([0, 0, 0, 0, 0, 0, 0], 0, cpu.supervisor_stack_pointer());
        cpu.execute_instruction(&mut bus);

        assert_eq!(cpu.data_registers()[0], 0x1111_1111);
        assert_eq!(cpu.data_registers()[1], 0x2222_2222);
        assert_eq!(cpu.supervisor_stack_pointer(), 0x1000);
    }
}
