use super::*;

pub(super) fn decode_add_family(opcode: u16) -> ExecuteResult<Instruction> {
    let register = DataRegister::from(((opcode >> 9) & 0x07) as u8);
    let opmode = (opcode >> 6) & 0x07;
    let ea = AddressingMode::parse_from_opcode(opcode)?;

    match opmode {
        0b011 => Ok(Instruction::AddAddress {
            size: OpSize::Word,
            source: ea,
            dest: AddressRegister::from(register.0),
        }),
        0b111 => Ok(Instruction::AddAddress {
            size: OpSize::LongWord,
            source: ea,
            dest: AddressRegister::from(register.0),
        }),
        0b100 | 0b101 | 0b110 => {
            if !ea.is_data_alterable() {
                return Err(Exception::IllegalInstruction(opcode));
            }
            Ok(Instruction::Add {
                size: size_from_opmode_bits(opmode),
                source: AddressingMode::DataDirect(register),
                dest: ea,
            })
        }
        _ => Ok(Instruction::Add {
            size: size_from_opmode_bits(opmode),
            source: ea,
            dest: AddressingMode::DataDirect(register),
        }),
    }
}

pub(super) fn decode_sub_family(opcode: u16) -> ExecuteResult<Instruction> {
    let register = DataRegister::from(((opcode >> 9) & 0x07) as u8);
    let opmode = (opcode >> 6) & 0x07;
    let ea = AddressingMode::parse_from_opcode(opcode)?;

    match opmode {
        0b011 => Ok(Instruction::SubtractAddress {
            size: OpSize::Word,
            source: ea,
            dest: AddressRegister::from(register.0),
        }),
        0b111 => Ok(Instruction::SubtractAddress {
            size: OpSize::LongWord,
            source: ea,
            dest: AddressRegister::from(register.0),
        }),
        0b100 | 0b101 | 0b110 => {
            if !ea.is_data_alterable() {
                return Err(Exception::IllegalInstruction(opcode));
            }
            Ok(Instruction::Subtract {
                size: size_from_opmode_bits(opmode),
                source: AddressingMode::DataDirect(register),
                dest: ea,
            })
        }
        _ => Ok(Instruction::Subtract {
            size: size_from_opmode_bits(opmode),
            source: ea,
            dest: AddressingMode::DataDirect(register),
        }),
    }
}

pub(super) fn decode_addi(opcode: u16) -> ExecuteResult<Instruction> {
    let size = OpSize::parse_from_opcode(opcode)?;
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    if !ea.is_data_alterable() {
        return Err(Exception::IllegalInstruction(opcode));
    }
    Ok(Instruction::Add { size, source: AddressingMode::Immediate, dest: ea })
}

pub(super) fn decode_subi(opcode: u16) -> ExecuteResult<Instruction> {
    let size = OpSize::parse_from_opcode(opcode)?;
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    if !ea.is_data_alterable() {
        return Err(Exception::IllegalInstruction(opcode));
    }
    Ok(Instruction::Subtract { size, source: AddressingMode::Immediate, dest: ea })
}

pub(super) fn decode_cmpi(opcode: u16) -> ExecuteResult<Instruction> {
    let size = OpSize::parse_from_opcode(opcode)?;
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    if !ea.is_data_alterable() {
        return Err(Exception::IllegalInstruction(opcode));
    }
    Ok(Instruction::Compare { size, source: AddressingMode::Immediate, dest: ea })
}

pub(super) fn decode_addq_subq(opcode: u16, size: OpSize) -> ExecuteResult<Instruction> {
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    let mut data = ((opcode >> 9) & 0x07) as u8;
    if data == 0 {
        data = 8;
    }

    if opcode.bit(8) {
        Ok(Instruction::SubtractQuick { size, data, dest: ea })
    } else {
        Ok(Instruction::AddQuick { size, data, dest: ea })
    }
}

pub(super) fn decode_addx(opcode: u16) -> ExecuteResult<Instruction> {
    let size = OpSize::parse_from_opcode(opcode)?;
    let (source, dest) = parse_extend_operands(opcode);
    Ok(Instruction::AddExtend { size, source, dest })
}

pub(super) fn decode_subx(opcode: u16) -> ExecuteResult<Instruction> {
    let size = OpSize::parse_from_opcode(opcode)?;
    let (source, dest) = parse_extend_operands(opcode);
    Ok(Instruction::SubtractExtend { size, source, dest })
}

pub(super) fn parse_extend_operands(opcode: u16) -> (AddressingMode, AddressingMode) {
    let dest_reg = ((opcode >> 9) & 0x07) as u8;
    let src_reg = (opcode & 0x07) as u8;

    match ExtendOpMode::parse_from_opcode(opcode) {
        ExtendOpMode::DataDirect => (
            AddressingMode::DataDirect(src_reg.into()),
            AddressingMode::DataDirect(dest_reg.into()),
        ),
        ExtendOpMode::AddressIndirectPredecrement => (
            AddressingMode::AddressIndirectPredecrement(src_reg.into()),
            AddressingMode::AddressIndirectPredecrement(dest_reg.into()),
        ),
    }
}

pub(super) fn decode_cmp(opcode: u16) -> ExecuteResult<Instruction> {
    let size = OpSize::parse_from_opcode(opcode)?;
    let register = DataRegister::from(((opcode >> 9) & 0x07) as u8);
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    Ok(Instruction::Compare { size, source: ea, dest: AddressingMode::DataDirect(register) })
}

pub(super) fn decode_cmpa(opcode: u16) -> ExecuteResult<Instruction> {
    let size = if opcode.bit(8) { OpSize::LongWord } else { OpSize::Word };
    let register = AddressRegister::from(((opcode >> 9) & 0x07) as u8);
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    Ok(Instruction::CompareAddress { size, source: ea, dest: register })
}

pub(super) fn decode_cmpm(opcode: u16) -> ExecuteResult<Instruction> {
    let size = OpSize::parse_from_opcode(opcode)?;
    let dest = AddressRegister::from(((opcode >> 9) & 0x07) as u8);
    let source = AddressRegister::from((opcode & 0x07) as u8);
    Ok(Instruction::CompareMemory { size, source, dest })
}

pub(super) fn decode_mulu(opcode: u16) -> ExecuteResult<Instruction> {
    let register = DataRegister::from(((opcode >> 9) & 0x07) as u8);
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    Ok(Instruction::Multiply { signed: false, source: ea, dest: register })
}

pub(super) fn decode_muls(opcode: u16) -> ExecuteResult<Instruction> {
    let register = DataRegister::from(((opcode >> 9) & 0x07) as u8);
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    Ok(Instruction::Multiply { signed: true, source: ea, dest: register })
}

pub(super) fn decode_divu(opcode: u16) -> ExecuteResult<Instruction> {
    let register = DataRegister::from(((opcode >> 9) & 0x07) as u8);
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    Ok(Instruction::Divide { signed: false, source: ea, dest: register })
}

pub(super) fn decode_divs(opcode: u16) -> ExecuteResult<Instruction> {
    let register = DataRegister::from(((opcode >> 9) & 0x07) as u8);
    let ea = AddressingMode::parse_from_opcode(opcode)?;
    Ok(Instruction::Divide { signed: true, source: ea, dest: register })
}

impl<'registers, 'bus, B: BusInterface> InstructionExecutor<'registers, 'bus, B> {
    pub(super) fn add(&mut self, size: OpSize, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<()> {
        let source_value: u32 = self.read(source, size)?.into();
        let dest_resolved = self.resolve_address_with_post(dest, size)?;
        let dest_value: u32 = self.read_resolved(dest_resolved, size)?.into();

        let (result, carry, overflow) = add_flags(dest_value, source_value, size);
        self.write_resolved(dest_resolved, SizedValue::from_size(result, size))?;
        self.set_arithmetic_flags(result, size, carry, overflow);
        Ok(())
    }

    pub(super) fn sub(&mut self, size: OpSize, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<()> {
        let source_value: u32 = self.read(source, size)?.into();
        let dest_resolved = self.resolve_address_with_post(dest, size)?;
        let dest_value: u32 = self.read_resolved(dest_resolved, size)?.into();

        let (result, carry, overflow) = sub_flags(dest_value, source_value, size);
        self.write_resolved(dest_resolved, SizedValue::from_size(result, size))?;
        self.set_arithmetic_flags(result, size, carry, overflow);
        Ok(())
    }

    pub(super) fn adda(&mut self, size: OpSize, source: AddressingMode, dest: AddressRegister) -> ExecuteResult<()> {
        let source_value = self.read(source, size)?;
        let extended: u32 = match source_value {
            SizedValue::Word(value) => value as i16 as u32,
            SizedValue::LongWord(value) => value,
            SizedValue::Byte(value) => value as i8 as u32,
        };
        let dest_value = dest.read_from(self.registers);
        dest.write_long_word_to(self.registers, dest_value.wrapping_add(extended));
        Ok(())
    }

    pub(super) fn suba(&mut self, size: OpSize, source: AddressingMode, dest: AddressRegister) -> ExecuteResult<()> {
        let source_value = self.read(source, size)?;
        let extended: u32 = match source_value {
            SizedValue::Word(value) => value as i16 as u32,
            SizedValue::LongWord(value) => value,
            SizedValue::Byte(value) => value as i8 as u32,
        };
        let dest_value = dest.read_from(self.registers);
        dest.write_long_word_to(self.registers, dest_value.wrapping_sub(extended));
        Ok(())
    }

    pub(super) fn addq(&mut self, size: OpSize, data: u8, dest: AddressingMode) -> ExecuteResult<()> {
        if let AddressingMode::AddressDirect(register) = dest {
            // ADDQ to an address register always operates on the full long word and does
            // not affect any condition codes.
            let value = register.read_from(self.registers);
            register.write_long_word_to(self.registers, value.wrapping_add(u32::from(data)));
            return Ok(());
        }

        let dest_resolved = self.resolve_address_with_post(dest, size)?;
        let dest_value: u32 = self.read_resolved(dest_resolved, size)?.into();
        let (result, carry, overflow) = add_flags(dest_value, u32::from(data), size);
        self.write_resolved(dest_resolved, SizedValue::from_size(result, size))?;
        self.set_arithmetic_flags(result, size, carry, overflow);
        Ok(())
    }

    pub(super) fn subq(&mut self, size: OpSize, data: u8, dest: AddressingMode) -> ExecuteResult<()> {
        if let AddressingMode::AddressDirect(register) = dest {
            let value = register.read_from(self.registers);
            register.write_long_word_to(self.registers, value.wrapping_sub(u32::from(data)));
            return Ok(());
        }

        let dest_resolved = self.resolve_address_with_post(dest, size)?;
        let dest_value: u32 = self.read_resolved(dest_resolved, size)?.into();
        let (result, carry, overflow) = sub_flags(dest_value, u32::from(data), size);
        self.write_resolved(dest_resolved, SizedValue::from_size(result, size))?;
        self.set_arithmetic_flags(result, size, carry, overflow);
        Ok(())
    }

    pub(super) fn addx(&mut self, size: OpSize, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<()> {
        let source_value: u32 = self.read(source, size)?.into();
        let dest_resolved = self.resolve_address(dest, size)?;
        let dest_value: u32 = self.read_resolved(dest_resolved, size)?.into();

        let extend = u32::from(self.registers.ccr.extend);
        let (partial, carry_1, overflow_1) = add_flags(dest_value, source_value, size);
        let (result, carry_2, overflow_2) = add_flags(partial, extend, size);

        self.write_resolved(dest_resolved, SizedValue::from_size(result, size))?;
        dest_resolved.apply_post(self.registers);
        self.set_extend_flags(result, size, carry_1 || carry_2, overflow_1 || overflow_2);
        Ok(())
    }

    pub(super) fn subx(&mut self, size: OpSize, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<()> {
        let source_value: u32 = self.read(source, size)?.into();
        let dest_resolved = self.resolve_address(dest, size)?;
        let dest_value: u32 = self.read_resolved(dest_resolved, size)?.into();

        let extend = u32::from(self.registers.ccr.extend);
        let (partial, carry_1, overflow_1) = sub_flags(dest_value, source_value, size);
        let (result, carry_2, overflow_2) = sub_flags(partial, extend, size);

        self.write_resolved(dest_resolved, SizedValue::from_size(result, size))?;
        dest_resolved.apply_post(self.registers);
        self.set_extend_flags(result, size, carry_1 || carry_2, overflow_1 || overflow_2);
        Ok(())
    }

    pub(super) fn cmp(&mut self, size: OpSize, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<()> {
        let source_value: u32 = self.read(source, size)?.into();
        let dest_value: u32 = self.read(dest, size)?.into();
        let (result, carry, overflow) = sub_flags(dest_value, source_value, size);
        let extend = self.registers.ccr.extend;
        self.set_arithmetic_flags(result, size, carry, overflow);
        // CMP never affects X, unlike SUB.
        self.registers.ccr.extend = extend;
        Ok(())
    }

    pub(super) fn cmpa(&mut self, size: OpSize, source: AddressingMode, dest: AddressRegister) -> ExecuteResult<()> {
        let source_value = self.read(source, size)?;
        let extended: u32 = match source_value {
            SizedValue::Word(value) => value as i16 as u32,
            SizedValue::LongWord(value) => value,
            SizedValue::Byte(value) => value as i8 as u32,
        };
        let dest_value = dest.read_from(self.registers);
        let (result, carry, overflow) = sub_flags(dest_value, extended, OpSize::LongWord);
        let extend = self.registers.ccr.extend;
        self.set_arithmetic_flags(result, OpSize::LongWord, carry, overflow);
        self.registers.ccr.extend = extend;
        Ok(())
    }

    pub(super) fn cmpm(&mut self, size: OpSize, source: AddressRegister, dest: AddressRegister) -> ExecuteResult<()> {
        let source_value: u32 =
            self.read(AddressingMode::AddressIndirectPostincrement(source), size)?.into();
        let dest_value: u32 =
            self.read(AddressingMode::AddressIndirectPostincrement(dest), size)?.into();
        let (result, carry, overflow) = sub_flags(dest_value, source_value, size);
        let extend = self.registers.ccr.extend;
        self.set_arithmetic_flags(result, size, carry, overflow);
        self.registers.ccr.extend = extend;
        Ok(())
    }

    pub(super) fn multiply(&mut self, signed: bool, source: AddressingMode, dest: DataRegister) -> ExecuteResult<()> {
        let source_value = self.read_word(source)?;
        let dest_value = dest.read_from(self.registers) as u16;

        let result = if signed {
            (i32::from(source_value as i16) * i32::from(dest_value as i16)) as u32
        } else {
            u32::from(source_value) * u32::from(dest_value)
        };

        dest.write_long_word_to(self.registers, result);
        self.registers.ccr.carry = false;
        self.registers.ccr.overflow = false;
        self.registers.ccr.zero = result == 0;
        self.registers.ccr.negative = result.sign_bit();
        Ok(())
    }

    pub(super) fn divide(&mut self, signed: bool, source: AddressingMode, dest: DataRegister) -> ExecuteResult<()> {
        let divisor_word = self.read_word(source)?;
        if divisor_word == 0 {
            return Err(Exception::DivideByZero);
        }

        let dividend = dest.read_from(self.registers);

        if signed {
            let dividend = dividend as i32;
            let divisor = i32::from(divisor_word as i16);
            let quotient = dividend.wrapping_div(divisor);
            let remainder = dividend.wrapping_rem(divisor);

            if quotient > i32::from(i16::MAX) || quotient < i32::from(i16::MIN) {
                self.registers.ccr.overflow = true;
                return Ok(());
            }

            let packed = ((remainder as u32) << 16) | (quotient as u16 as u32);
            dest.write_long_word_to(self.registers, packed);
            self.registers.ccr.carry = false;
            self.registers.ccr.overflow = false;
            self.registers.ccr.zero = quotient == 0;
            self.registers.ccr.negative = (quotient as i16).is_negative();
        } else {
            let divisor = u32::from(divisor_word);
            let quotient = dividend / divisor;
            let remainder = dividend % divisor;

            if quotient > u32::from(u16::MAX) {
                self.registers.ccr.overflow = true;
                return Ok(());
            }

            let packed = (remainder << 16) | (quotient & 0xFFFF);
            dest.write_long_word_to(self.registers, packed);
            self.registers.ccr.carry = false;
            self.registers.ccr.overflow = false;
            self.registers.ccr.zero = quotient == 0;
            self.registers.ccr.negative = (quotient as u16).sign_bit();
        }

        Ok(())
    }
}
