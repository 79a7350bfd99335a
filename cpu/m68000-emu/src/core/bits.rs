use super::arithmetic::parse_extend_operands;
use super::*;

fn decode_immediate_logical(
    opcode: u16,
    supervisor_mode: bool,
    to_ccr: Instruction,
    to_sr: Instruction,
    make: impl FnOnce(OpSize, AddressingMode) -> Instruction,
) -> ExecuteResult<Instruction> {
    let size = OpSize::parse_from_opcode(opcode)?;
    let ea = AddressingMode::parse_from_opcode(opcode)?;

    if ea == AddressingMode::Immediate {
        return match size {
            OpSize::Byte => Ok(to_ccr),
            OpSize::Word => {
                if supervisor_mode { Ok(to_sr) } else { Err(Exception::PrivilegeViolation) }
            }
            OpSize::LongWord => Err(Exception::IllegalInstruction(opcode)),
        };
    }

    if !ea.is_data_alterable() {
        return Err(Exception::IllegalInstruction(opcode));
    }

    Ok(make(size, ea))
}

pub(super) fn decode_ori(opcode: u16, supervisor_mode: bool) -> ExecuteResult<Instruction> {
    decode_immediate_logical(opcode, supervisor_mode, Instruction::OrToCcr, Instruction::OrToSr, |size, ea| {
        Instruction::Or { size, source: AddressingMode::Immediate, dest: ea }
    })
}

pub(super) fn decode_andi(opcode: u16, supervisor_mode: bool) -> ExecuteResult<Instruction> {
    decode_immediate_logical(opcode, supervisor_mode, Instruction::AndToCcr, Instruction::AndToSr, |size, ea| {
        Instruction::And { size, source: AddressingMode::Immediate, dest: ea }
    })
}

pub(super) fn decode_eori(opcode: u16, supervisor_mode: bool) -> ExecuteResult<Instruction> {
    decode_immediate_logical(
        opcode,
        supervisor_mode,
        Instruction::ExclusiveOrToCcr,
        Instruction::ExclusiveOrToSr,
        |size, ea| Instruction::ExclusiveOr { size, source: AddressingMode::Immediate, dest: ea },
    )
}

pub(super) fn decode_and(opcode: u16) -> ExecuteResult<Instruction> {
    let register = DataRegister::from(((opcode >> 9) & 0x07) as u8);
    let opmode = (opcode >> 6) & 0x07;
    let ea = AddressingMode::parse_from_opcode(opcode)?;

    if opmode.bit(2) {
        if !ea.is_data_alterable() {
            return Err(Exception::IllegalInstruction(opcode));
        }
        Ok(Instruction::And {
            size: size_from_opmode_bits(opmode),
            source: AddressingMode::DataDirect(register),
            dest: ea,
        })
    } else {
        Ok(Instruction::And {
            size: size_from_opmode_bits(opmode),
            source: ea,
            dest: AddressingMode::DataDirect(register),
        })
    }
}

pub(super) fn decode_or(opcode: u16) -> ExecuteResult<Instruction> {
    let register = DataRegister::from(((opcode >> 9) & 0x07) as u8);
    let opmode = (opcode >> 6) & 0x07;
    let ea = AddressingMode::parse_from_opcode(opcode)?;

    if opmode.bit(2) {
        if !ea.is_data_alterable() {
            return Err(Exception::IllegalInstruction(opcode));
        }
        Ok(Instruction::Or {
            size: size_from_opmode_bits(opmode),
            source: AddressingMode::DataDirect(register),
            dest: ea,
        })
    } else {
        Ok(Instruction::Or {
            size: size_from_opmode_bits(opmode),
            source: ea,
            dest: AddressingMode::DataDirect(register),
        })
    }
}

pub(super) fn decode_eor(opcode: u16) -> ExecuteResult<Instruction> {
    let size = OpSize::parse_from_opcode(opcode)?;
    let register = DataRegister::from(((opcode >> 9) & 0x07) as u8);
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    if !ea.is_data_alterable() {
        return Err(Exception::IllegalInstruction(opcode));
    }
    Ok(Instruction::ExclusiveOr { size, source: AddressingMode::DataDirect(register), dest: ea })
}

pub(super) fn decode_not(opcode: u16) -> ExecuteResult<Instruction> {
    let size = OpSize::parse_from_opcode(opcode)?;
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    if !ea.is_data_alterable() {
        return Err(Exception::IllegalInstruction(opcode));
    }
    Ok(Instruction::Not { size, dest: ea })
}

pub(super) fn decode_clr(opcode: u16) -> ExecuteResult<Instruction> {
    let size = OpSize::parse_from_opcode(opcode)?;
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    if !ea.is_data_alterable() {
        return Err(Exception::IllegalInstruction(opcode));
    }
    Ok(Instruction::Clear { size, dest: ea })
}

pub(super) fn decode_tst(opcode: u16) -> ExecuteResult<Instruction> {
    let size = OpSize::parse_from_opcode(opcode)?;
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    Ok(Instruction::Test { size, dest: ea })
}

fn bit_op_from_bits(bits: u16) -> BitOp {
    match bits & 0x03 {
        0 => BitOp::Test,
        1 => BitOp::Change,
        2 => BitOp::Clear,
        _ => BitOp::Set,
    }
}

pub(super) fn decode_bit_op_immediate(opcode: u16) -> ExecuteResult<Instruction> {
    let op = bit_op_from_bits(opcode >> 6);
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    if op != BitOp::Test && !ea.is_data_alterable() {
        return Err(Exception::IllegalInstruction(opcode));
    }
    let size = if matches!(ea, AddressingMode::DataDirect(_)) { OpSize::LongWord } else { OpSize::Byte };
    Ok(Instruction::BitOp { op, size, bit_source: AddressingMode::Immediate, dest: ea })
}

pub(super) fn decode_bit_op_dynamic(opcode: u16) -> ExecuteResult<Instruction> {
    let op = bit_op_from_bits(opcode >> 6);
    let register = DataRegister::from(((opcode >> 9) & 0x07) as u8);
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    if op != BitOp::Test && !ea.is_data_alterable() {
        return Err(Exception::IllegalInstruction(opcode));
    }
    let size = if matches!(ea, AddressingMode::DataDirect(_)) { OpSize::LongWord } else { OpSize::Byte };
    Ok(Instruction::BitOp { op, size, bit_source: AddressingMode::DataDirect(register), dest: ea })
}

pub(super) fn decode_abcd(opcode: u16) -> ExecuteResult<Instruction> {
    let (source, dest) = parse_extend_operands(opcode);
    Ok(Instruction::Bcd { op: BcdOp::Add, source, dest })
}

pub(super) fn decode_sbcd(opcode: u16) -> ExecuteResult<Instruction> {
    let (source, dest) = parse_extend_operands(opcode);
    Ok(Instruction::Bcd { op: BcdOp::Subtract, source, dest })
}

impl<'registers, 'bus, B: BusInterface> InstructionExecutor<'registers, 'bus, B> {
    pub(super) fn and(&mut self, size: OpSize, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<()> {
        let source_value: u32 = self.read(source, size)?.into();
        let dest_resolved = self.resolve_address_with_post(dest, size)?;
        let dest_value: u32 = self.read_resolved(dest_resolved, size)?.into();
        let result = dest_value & source_value;
        self.write_resolved(dest_resolved, SizedValue::from_size(result, size))?;
        self.set_logical_flags(result, size);
        Ok(())
    }

    pub(super) fn or(&mut self, size: OpSize, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<()> {
        let source_value: u32 = self.read(source, size)?.into();
        let dest_resolved = self.resolve_address_with_post(dest, size)?;
        let dest_value: u32 = self.read_resolved(dest_resolved, size)?.into();
        let result = dest_value | source_value;
        self.write_resolved(dest_resolved, SizedValue::from_size(result, size))?;
        self.set_logical_flags(result, size);
        Ok(())
    }

    pub(super) fn eor(&mut self, size: OpSize, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<()> {
        let source_value: u32 = self.read(source, size)?.into();
        let dest_resolved = self.resolve_address_with_post(dest, size)?;
        let dest_value: u32 = self.read_resolved(dest_resolved, size)?.into();
        let result = dest_value ^ source_value;
        self.write_resolved(dest_resolved, SizedValue::from_size(result, size))?;
        self.set_logical_flags(result, size);
        Ok(())
    }

    pub(super) fn not(&mut self, size: OpSize, dest: AddressingMode) -> ExecuteResult<()> {
        let dest_resolved = self.resolve_address_with_post(dest, size)?;
        let dest_value: u32 = self.read_resolved(dest_resolved, size)?.into();
        let result = !dest_value & sized_mask(size);
        self.write_resolved(dest_resolved, SizedValue::from_size(result, size))?;
        self.set_logical_flags(result, size);
        Ok(())
    }

    pub(super) fn clr(&mut self, size: OpSize, dest: AddressingMode) -> ExecuteResult<()> {
        let dest_resolved = self.resolve_address_with_post(dest, size)?;
        self.write_resolved(dest_resolved, SizedValue::from_size(0, size))?;
        self.set_logical_flags(0, size);
        Ok(())
    }

    pub(super) fn tst(&mut self, size: OpSize, dest: AddressingMode) -> ExecuteResult<()> {
        let value: u32 = self.read(dest, size)?.into();
        self.set_logical_flags(value, size);
        Ok(())
    }

    pub(super) fn andi_to_ccr(&mut self) -> ExecuteResult<()> {
        let mask = self.fetch_operand()? as u8;
        let ccr: u8 = self.registers.ccr.into();
        self.registers.ccr = (ccr & mask).into();
        Ok(())
    }

    pub(super) fn andi_to_sr(&mut self) -> ExecuteResult<()> {
        let mask = self.fetch_operand()?;
        let sr = self.registers.status_register();
        self.registers.set_status_register(sr & mask);
        Ok(())
    }

    pub(super) fn ori_to_ccr(&mut self) -> ExecuteResult<()> {
        let mask = self.fetch_operand()? as u8;
        let ccr: u8 = self.registers.ccr.into();
        self.registers.ccr = (ccr | mask).into();
        Ok(())
    }

    pub(super) fn ori_to_sr(&mut self) -> ExecuteResult<()> {
        let mask = self.fetch_operand()?;
        let sr = self.registers.status_register();
        self.registers.set_status_register(sr | mask);
        Ok(())
    }

    pub(super) fn eori_to_ccr(&mut self) -> ExecuteResult<()> {
        let mask = self.fetch_operand()? as u8;
        let ccr: u8 = self.registers.ccr.into();
        self.registers.ccr = (ccr ^ mask).into();
        Ok(())
    }

    pub(super) fn eori_to_sr(&mut self) -> ExecuteResult<()> {
        let mask = self.fetch_operand()?;
        let sr = self.registers.status_register();
        self.registers.set_status_register(sr ^ mask);
        Ok(())
    }

    pub(super) fn bit_op(
        &mut self,
        op: BitOp,
        size: OpSize,
        bit_source: AddressingMode,
        dest: AddressingMode,
    ) -> ExecuteResult<()> {
        let bit_number = self.read(bit_source, OpSize::Byte)?;
        let bit_number = u32::from(bit_number) as u8;
        let bit = bit_number % (size.bytes() * 8) as u8;

        let dest_resolved = self.resolve_address_with_post(dest, size)?;
        let dest_value: u32 = self.read_resolved(dest_resolved, size)?.into();

        self.registers.ccr.zero = !dest_value.bit(bit);

        let new_value = match op {
            BitOp::Test => dest_value,
            BitOp::Change => dest_value ^ (1u32 << bit),
            BitOp::Clear => dest_value & !(1u32 << bit),
            BitOp::Set => dest_value | (1u32 << bit),
        };

        if op != BitOp::Test {
            self.write_resolved(dest_resolved, SizedValue::from_size(new_value, size))?;
        }

        Ok(())
    }

    pub(super) fn bcd(&mut self, op: BcdOp, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<()> {
        let source_value = self.read_byte(source)?;
        let dest_resolved = self.resolve_address(dest, OpSize::Byte)?;
        let dest_value = self.read_byte_resolved(dest_resolved);

        let extend = self.registers.ccr.extend;
        let (result, carry) = match op {
            BcdOp::Add => bcd_add(dest_value, source_value, extend),
            BcdOp::Subtract => bcd_sub(dest_value, source_value, extend),
        };

        self.write_byte_resolved(dest_resolved, result);
        dest_resolved.apply_post(self.registers);

        let zero = result == 0 && self.registers.ccr.zero;
        self.registers.ccr.carry = carry;
        self.registers.ccr.extend = carry;
        self.registers.ccr.zero = zero;
        self.registers.ccr.negative = result.sign_bit();
        Ok(())
    }
}
