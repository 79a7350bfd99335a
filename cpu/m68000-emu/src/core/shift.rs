use super::*;

/// Register shifts/rotates: `1110 ccc d ss i tt rrr`, where `ccc` is either an immediate
/// count (1-8, with 0 meaning 8) or a data register number depending on the `i` bit.
pub(super) fn decode_register_shift(opcode: u16) -> ExecuteResult<Instruction> {
    let direction = if opcode.bit(8) { ShiftDirection::Left } else { ShiftDirection::Right };
    let size = OpSize::parse_from_opcode(opcode)?;

    let shift_type = match (opcode >> 3) & 0x03 {
        0b00 => ShiftType::Arithmetic,
        0b01 => ShiftType::Logical,
        0b10 => ShiftType::RotateThruExtend,
        _ => ShiftType::Rotate,
    };

    let count_field = ((opcode >> 9) & 0x07) as u8;
    let count = if opcode.bit(5) {
        ShiftCount::Register(DataRegister::from(count_field))
    } else {
        ShiftCount::Immediate(((count_field.wrapping_sub(1)) & 0x07) + 1)
    };

    let dest = AddressingMode::DataDirect(DataRegister::from(opcode as u8));

    Ok(Instruction::Shift { shift_type, direction, size, count, dest })
}

/// Memory shifts/rotates: `1110 tt d 11 mmm rrr`. Always word-sized, count is always 1.
pub(super) fn decode_memory_shift(opcode: u16) -> ExecuteResult<Instruction> {
    let shift_type = match (opcode >> 9) & 0x03 {
        0b00 => ShiftType::Arithmetic,
        0b01 => ShiftType::Logical,
        0b10 => ShiftType::RotateThruExtend,
        _ => ShiftType::Rotate,
    };
    let direction = if opcode.bit(8) { ShiftDirection::Left } else { ShiftDirection::Right };

    let dest = AddressingMode::parse_from_opcode(opcode)?;
    if !dest.is_data_alterable() || dest.is_address_direct() {
        return Err(Exception::IllegalInstruction(opcode));
    }

    Ok(Instruction::Shift {
        shift_type,
        direction,
        size: OpSize::Word,
        count: ShiftCount::Immediate(1),
        dest,
    })
}

impl<'registers, 'bus, B: BusInterface> InstructionExecutor<'registers, 'bus, B> {
    pub(super) fn shift(
        &mut self,
        shift_type: ShiftType,
        direction: ShiftDirection,
        size: OpSize,
        count: ShiftCount,
        dest: AddressingMode,
    ) -> ExecuteResult<()> {
        let shift_count = match count {
            ShiftCount::Immediate(n) => u32::from(n),
            // Dynamic register form: count is the register's value mod 64.
            ShiftCount::Register(register) => register.read_from(self.registers) & 0x3F,
        };

        let dest_resolved = self.resolve_address_with_post(dest, size)?;
        let original: u32 = self.read_resolved(dest_resolved, size)?.into();
        let mask = sized_mask(size);
        let msb_mask = size.msb_mask();

        let mut value = original & mask;
        let mut carry_out = self.registers.ccr.extend;
        let mut overflow = false;

        for _ in 0..shift_count {
            match (shift_type, direction) {
                (ShiftType::Arithmetic, ShiftDirection::Left) => {
                    let sign_before = value & msb_mask != 0;
                    carry_out = sign_before;
                    value = (value << 1) & mask;
                    if (value & msb_mask != 0) != sign_before {
                        overflow = true;
                    }
                }
                (ShiftType::Arithmetic, ShiftDirection::Right) => {
                    carry_out = value & 0x1 != 0;
                    let sign = value & msb_mask != 0;
                    value = (value >> 1) | if sign { msb_mask } else { 0 };
                }
                (ShiftType::Logical, ShiftDirection::Left) => {
                    carry_out = value & msb_mask != 0;
                    value = (value << 1) & mask;
                }
                (ShiftType::Logical, ShiftDirection::Right) => {
                    carry_out = value & 0x1 != 0;
                    value >>= 1;
                }
                (ShiftType::Rotate, ShiftDirection::Left) => {
                    carry_out = value & msb_mask != 0;
                    value = ((value << 1) | u32::from(carry_out)) & mask;
                }
                (ShiftType::Rotate, ShiftDirection::Right) => {
                    carry_out = value & 0x1 != 0;
                    value = (value >> 1) | if carry_out { msb_mask } else { 0 };
                }
                (ShiftType::RotateThruExtend, ShiftDirection::Left) => {
                    let bit_out = value & msb_mask != 0;
                    value = ((value << 1) | u32::from(carry_out)) & mask;
                    carry_out = bit_out;
                }
                (ShiftType::RotateThruExtend, ShiftDirection::Right) => {
                    let bit_out = value & 0x1 != 0;
                    value = (value >> 1) | if carry_out { msb_mask } else { 0 };
                    carry_out = bit_out;
                }
            }
        }

        self.write_resolved(dest_resolved, SizedValue::from_size(value, size))?;

        let sized = SizedValue::from_size(value, size);
        self.registers.ccr.zero = sized.is_zero();
        self.registers.ccr.negative = sized.sign_bit();
        self.registers.ccr.overflow = matches!(shift_type, ShiftType::Arithmetic) && overflow;

        // A shift/rotate count of zero leaves C cleared (ROXx excepted, where C mirrors the
        // unchanged X flag) and never touches X.
        match shift_type {
            ShiftType::Rotate => {
                self.registers.ccr.carry = shift_count != 0 && carry_out;
            }
            ShiftType::RotateThruExtend => {
                self.registers.ccr.carry = carry_out;
                self.registers.ccr.extend = carry_out;
            }
            ShiftType::Arithmetic | ShiftType::Logical => {
                self.registers.ccr.carry = shift_count != 0 && carry_out;
                if shift_count != 0 {
                    self.registers.ccr.extend = carry_out;
                }
            }
        }

        Ok(())
    }
}
