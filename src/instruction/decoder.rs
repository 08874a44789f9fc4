//! Instruction [decoder](https://inform-fiction.org/zmachine/standards/z1point1/sect04.html)
use crate::error::*;
use crate::zmachine::state::memory;
use crate::zmachine::ZMachine;

use super::*;

/// Extract one 2-bit operand type from a VAR/EXT specifier byte.
///
/// Types are packed high to low: 00112233.  Type 3 terminates the operand
/// list.
fn operand_type(type_byte: u8, operand_index: u8) -> Option<OperandType> {
    let t = (type_byte >> (6 - (operand_index * 2))) & 3;
    match t {
        0 => Some(OperandType::LargeConstant),
        1 => Some(OperandType::SmallConstant),
        2 => Some(OperandType::Variable),
        _ => None,
    }
}

/// Operand type for a long-form (2OP) opcode: bits 6 and 5 select small
/// constant or variable
fn long_operand_type(opcode: u8, index: u8) -> OperandType {
    if opcode >> (6 - index) & 1 == 1 {
        OperandType::Variable
    } else {
        OperandType::SmallConstant
    }
}

fn operand_types(
    bytes: &[u8],
    opcode: &Opcode,
    mut offset: usize,
) -> Result<(usize, Vec<OperandType>), RuntimeError> {
    let mut types = Vec::new();
    match opcode.form() {
        OpcodeForm::Short => {
            if let Some(t) = operand_type(opcode.opcode(), 1) {
                types.push(t);
            }
        }
        OpcodeForm::Long => {
            types.push(long_operand_type(opcode.opcode(), 0));
            types.push(long_operand_type(opcode.opcode(), 1));
        }
        OpcodeForm::Var | OpcodeForm::Ext => {
            let b = bytes[offset];
            offset += 1;
            for i in 0..4 {
                match operand_type(b, i) {
                    Some(t) => types.push(t),
                    None => break,
                }
            }
            // The two 8-operand call opcodes have a second specifier byte
            if opcode.opcode() == 0xEC || opcode.opcode() == 0xFA {
                let b = bytes[offset];
                offset += 1;
                for i in 0..4 {
                    match operand_type(b, i) {
                        Some(t) => types.push(t),
                        None => break,
                    }
                }
            }
        }
    }

    Ok((offset, types))
}

fn operands(
    bytes: &[u8],
    operand_types: &[OperandType],
    mut offset: usize,
) -> Result<(usize, Vec<Operand>), RuntimeError> {
    let mut operands = Vec::new();

    for optype in operand_types {
        match optype {
            OperandType::LargeConstant => {
                operands.push(Operand::new(
                    *optype,
                    memory::word_value(bytes[offset], bytes[offset + 1]),
                ));
                offset += 2;
            }
            OperandType::SmallConstant | OperandType::Variable => {
                operands.push(Operand::new(*optype, bytes[offset] as u16));
                offset += 1;
            }
        }
    }

    Ok((offset, operands))
}

/// Decode the store-result byte for opcodes that store
fn result_variable(
    address: usize,
    bytes: &[u8],
    opcode: &Opcode,
    version: u8,
    offset: usize,
) -> Result<(usize, Option<StoreResult>), RuntimeError> {
    match opcode.form() {
        OpcodeForm::Ext => match opcode.instruction() {
            0x00 | 0x01 | 0x02 | 0x03 | 0x04 | 0x09 | 0x0a | 0x13 => {
                Ok((offset + 1, Some(StoreResult::new(address, bytes[offset]))))
            }
            _ => Ok((offset, None)),
        },
        _ => match opcode.opcode() {
            // Always store, regardless of version
            0x08 | 0x28 | 0x48 | 0x68 | 0xc8 | 0x09 | 0x29 | 0x49 | 0x69 | 0xc9 | 0x0F | 0x2F
            | 0x4F | 0x6F | 0xcf | 0x10 | 0x30 | 0x50 | 0x70 | 0xd0 | 0x11 | 0x31 | 0x51 | 0x71
            | 0xd1 | 0x12 | 0x32 | 0x52 | 0x72 | 0xd2 | 0x13 | 0x33 | 0x53 | 0x73 | 0xd3 | 0x14
            | 0x34 | 0x54 | 0x74 | 0xd4 | 0x15 | 0x35 | 0x55 | 0x75 | 0xd5 | 0x16 | 0x36 | 0x56
            | 0x76 | 0xd6 | 0x17 | 0x37 | 0x57 | 0x77 | 0xd7 | 0x18 | 0x38 | 0x58 | 0x78 | 0xd8
            | 0x19 | 0x39 | 0x59 | 0x79 | 0xd9 | 0x81 | 0x91 | 0xa1 | 0x82 | 0x92 | 0xa2 | 0x83
            | 0x93 | 0xa3 | 0x84 | 0x94 | 0xa4 | 0x88 | 0x98 | 0xa8 | 0x8e | 0x9e | 0xae | 0xe0
            | 0xe7 | 0xeC | 0xf6 | 0xf7 | 0xf8 => {
                Ok((offset + 1, Some(StoreResult::new(address, bytes[offset]))))
            }
            // Version < 5
            0x8f | 0x9f | 0xaf => {
                if version < 5 {
                    Ok((offset + 1, Some(StoreResult::new(address, bytes[offset]))))
                } else {
                    Ok((offset, None))
                }
            }
            // Version 4 only
            0xb5 | 0xb6 => {
                if version == 4 {
                    Ok((offset + 1, Some(StoreResult::new(address, bytes[offset]))))
                } else {
                    Ok((offset, None))
                }
            }
            // Version > 4
            0xb9 | 0xe4 => {
                if version > 4 {
                    Ok((offset + 1, Some(StoreResult::new(address, bytes[offset]))))
                } else {
                    Ok((offset, None))
                }
            }
            _ => Ok((offset, None)),
        },
    }
}

/// Resolve a branch offset to a destination.
///
/// Offsets 0 and 1 are the return-false/return-true sentinels; any other
/// offset lands `offset - 2` past the end of the branch data.
fn branch_address(address: usize, offset: i16) -> usize {
    match offset {
        0 => 0,
        1 => 1,
        _ => ((address as isize) + (offset as isize)) as usize,
    }
}

fn branch_condition(
    address: usize,
    bytes: &[u8],
    offset: usize,
) -> Result<(usize, Option<Branch>), RuntimeError> {
    let b = bytes[offset];
    let condition = b & 0x80 == 0x80;
    match b & 0x40 {
        0x40 => {
            // Short form: unsigned 6-bit offset in one byte
            let b_offset = b & 0x3f;
            Ok((
                offset + 1,
                Some(Branch::new(
                    address,
                    condition,
                    branch_address(address - 1, b_offset as i16),
                )),
            ))
        }
        _ => {
            // Long form: signed 14-bit offset across two bytes
            let mut b_offset = ((b as u16 & 0x3f) << 8) | (bytes[offset + 1] as u16) & 0xFF;
            if b_offset & 0x2000 == 0x2000 {
                b_offset |= 0xC000;
            }
            Ok((
                offset + 2,
                Some(Branch::new(
                    address,
                    condition,
                    branch_address(address, b_offset as i16),
                )),
            ))
        }
    }
}

/// Decode the branch byte(s) for opcodes that branch
fn branch(
    address: usize,
    bytes: &[u8],
    version: u8,
    opcode: &Opcode,
    offset: usize,
) -> Result<(usize, Option<Branch>), RuntimeError> {
    match opcode.form() {
        OpcodeForm::Ext => Ok((offset, None)),
        _ => match opcode.operand_count() {
            OperandCount::_0OP => match opcode.instruction() {
                0x0d | 0x0f => branch_condition(address, bytes, offset),
                0x05 | 0x06 => {
                    if version < 4 {
                        branch_condition(address, bytes, offset)
                    } else {
                        Ok((offset, None))
                    }
                }
                _ => Ok((offset, None)),
            },
            OperandCount::_1OP => match opcode.instruction() {
                0x00 | 0x01 | 0x02 => branch_condition(address, bytes, offset),
                _ => Ok((offset, None)),
            },
            OperandCount::_2OP => match opcode.instruction() {
                0x01 | 0x02 | 0x03 | 0x04 | 0x05 | 0x06 | 0x07 | 0x0a => {
                    branch_condition(address, bytes, offset)
                }
                _ => Ok((offset, None)),
            },
            OperandCount::_VAR => match opcode.instruction() {
                0x17 | 0x1F => branch_condition(address, bytes, offset),
                _ => Ok((offset, None)),
            },
        },
    }
}

/// Classify an opcode byte
fn opcode(bytes: &[u8], version: u8, mut offset: usize) -> Result<(usize, Opcode), RuntimeError> {
    let mut opcode = bytes[offset];
    let extended = opcode == 0xBE && version > 4;
    offset += 1;
    if extended {
        opcode = bytes[offset];
        offset += 1;
    }

    let form = if extended {
        OpcodeForm::Ext
    } else {
        match (opcode >> 6) & 0x3 {
            3 => OpcodeForm::Var,
            2 => OpcodeForm::Short,
            _ => OpcodeForm::Long,
        }
    };

    let instruction = match form {
        OpcodeForm::Var | OpcodeForm::Long => opcode & 0x1F,
        OpcodeForm::Short => opcode & 0xF,
        OpcodeForm::Ext => opcode,
    };

    let operand_count = match form {
        OpcodeForm::Short => {
            if opcode & 0x30 == 0x30 {
                OperandCount::_0OP
            } else {
                OperandCount::_1OP
            }
        }
        OpcodeForm::Long => OperandCount::_2OP,
        OpcodeForm::Var => {
            if opcode & 0x20 == 0x20 {
                OperandCount::_VAR
            } else {
                OperandCount::_2OP
            }
        }
        OpcodeForm::Ext => OperandCount::_VAR,
    };

    Ok((
        offset,
        Opcode::new(version, opcode, instruction, form, operand_count),
    ))
}

/// Decode the instruction at an address
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `address` - Address of the instruction
///
/// # Returns
/// [Result] with the decoded [Instruction] or a [RuntimeError]
pub fn decode_instruction(
    zmachine: &ZMachine,
    address: usize,
) -> Result<Instruction, RuntimeError> {
    let version = zmachine.version();
    let bytes = zmachine.instruction(address);
    let (offset, opcode) = opcode(&bytes, version, 0)?;

    let (offset, operand_types) = operand_types(&bytes, &opcode, offset)?;
    let (offset, operands) = operands(&bytes, &operand_types, offset)?;
    let (offset, store) = result_variable(address + offset, &bytes, &opcode, version, offset)?;
    let (offset, branch) = branch(address + offset, &bytes, version, &opcode, offset)?;

    let instruction = Instruction::new(address, opcode, operands, store, branch, address + offset);
    debug!(target: "app::instruction", "{}", instruction);
    Ok(instruction)
}

#[cfg(test)]
mod tests {
    use crate::{assert_ok, test_util::test_zmachine_with_code};

    use super::*;

    #[test]
    fn test_decode_long_2op() {
        // ADD L00, #05 -> (SP)
        let zmachine = test_zmachine_with_code(3, &[0x54, 0x01, 0x05, 0x00]);
        let i = assert_ok!(decode_instruction(&zmachine, 0x500));
        assert_eq!(*i.opcode().form(), OpcodeForm::Long);
        assert_eq!(*i.opcode().operand_count(), OperandCount::_2OP);
        assert_eq!(i.opcode().instruction(), 0x14);
        assert_eq!(
            i.operands(),
            &[
                Operand::new(OperandType::Variable, 1),
                Operand::new(OperandType::SmallConstant, 5)
            ]
        );
        assert_eq!(i.store().unwrap().variable(), 0);
        assert!(i.branch().is_none());
        assert_eq!(i.next_address(), 0x504);
    }

    #[test]
    fn test_decode_short_1op() {
        // JZ #00 with a short branch-on-true offset of 6
        let zmachine = test_zmachine_with_code(3, &[0x90, 0x00, 0xC6]);
        let i = assert_ok!(decode_instruction(&zmachine, 0x500));
        assert_eq!(*i.opcode().form(), OpcodeForm::Short);
        assert_eq!(*i.opcode().operand_count(), OperandCount::_1OP);
        assert_eq!(i.opcode().instruction(), 0x0);
        let b = i.branch().unwrap();
        assert!(b.condition());
        // Next instruction at 0x503, target = 0x503 + 6 - 2
        assert_eq!(b.branch_address(), 0x507);
        assert_eq!(i.next_address(), 0x503);
    }

    #[test]
    fn test_decode_branch_sentinels() {
        // Offset 0 -> return false
        let zmachine = test_zmachine_with_code(3, &[0x90, 0x00, 0xC0]);
        let i = assert_ok!(decode_instruction(&zmachine, 0x500));
        assert_eq!(i.branch().unwrap().branch_address(), 0);
        // Offset 1 -> return true
        let zmachine = test_zmachine_with_code(3, &[0x90, 0x00, 0xC1]);
        let i = assert_ok!(decode_instruction(&zmachine, 0x500));
        assert_eq!(i.branch().unwrap().branch_address(), 1);
    }

    #[test]
    fn test_decode_long_branch_negative() {
        // JE (2OP:01) with a 14-bit negative offset of -4
        // 0x3FFC = -4 in 14 bits
        let zmachine = test_zmachine_with_code(3, &[0x41, 0x01, 0x02, 0xBF, 0xFC]);
        let i = assert_ok!(decode_instruction(&zmachine, 0x500));
        let b = i.branch().unwrap();
        assert!(b.condition());
        // Branch data at 0x503..0x504, next at 0x505, target = 0x505 - 4 - 2
        assert_eq!(b.branch_address(), 0x4FF);
    }

    #[test]
    fn test_decode_var() {
        // CALL_VS with 3 operands: large, small, variable
        let zmachine =
            test_zmachine_with_code(3, &[0xE0, 0x1A, 0x12, 0x34, 0x56, 0x07, 0x00]);
        let i = assert_ok!(decode_instruction(&zmachine, 0x500));
        assert_eq!(*i.opcode().operand_count(), OperandCount::_VAR);
        assert_eq!(
            i.operands(),
            &[
                Operand::new(OperandType::LargeConstant, 0x1234),
                Operand::new(OperandType::SmallConstant, 0x56),
                Operand::new(OperandType::Variable, 0x07)
            ]
        );
        assert_eq!(i.store().unwrap().variable(), 0);
        assert_eq!(i.next_address(), 0x507);
    }

    #[test]
    fn test_decode_var_terminator_stops_operands() {
        // Specifier 0x5F: small, small, terminator - third and fourth unused
        let zmachine = test_zmachine_with_code(3, &[0xE1, 0x5F, 0x10, 0x20, 0x30]);
        let i = assert_ok!(decode_instruction(&zmachine, 0x500));
        assert_eq!(i.operands().len(), 2);
        assert_eq!(i.next_address(), 0x504);
    }

    #[test]
    fn test_decode_call_vs2_double_specifier() {
        // CALL_VS2 (0xEC) reads two specifier bytes for up to 8 operands
        let zmachine = test_zmachine_with_code(
            5,
            &[
                0xEC, 0x55, 0x55, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x00,
            ],
        );
        let i = assert_ok!(decode_instruction(&zmachine, 0x500));
        assert_eq!(i.operands().len(), 8);
        assert_eq!(i.operands()[7], Operand::new(OperandType::SmallConstant, 8));
        assert_eq!(i.store().unwrap().variable(), 0);
        assert_eq!(i.next_address(), 0x50C);
    }

    #[test]
    fn test_decode_ext() {
        // EXT SAVE_UNDO (0xBE 0x09) with specifier 0xFF: no operands, stores
        let zmachine = test_zmachine_with_code(5, &[0xBE, 0x09, 0xFF, 0x00]);
        let i = assert_ok!(decode_instruction(&zmachine, 0x500));
        assert_eq!(*i.opcode().form(), OpcodeForm::Ext);
        assert_eq!(i.opcode().instruction(), 0x09);
        assert!(i.operands().is_empty());
        assert_eq!(i.store().unwrap().variable(), 0);
        assert_eq!(i.next_address(), 0x504);
    }

    #[test]
    fn test_decode_version_dependent_store() {
        // 0OP:09 is POP in v3 (no store), CATCH in v5 (store)
        let zmachine = test_zmachine_with_code(3, &[0xB9, 0x00]);
        let i = assert_ok!(decode_instruction(&zmachine, 0x500));
        assert!(i.store().is_none());
        assert_eq!(i.next_address(), 0x501);

        let zmachine = test_zmachine_with_code(5, &[0xB9, 0x00]);
        let i = assert_ok!(decode_instruction(&zmachine, 0x500));
        assert!(i.store().is_some());
        assert_eq!(i.next_address(), 0x502);
    }
}
