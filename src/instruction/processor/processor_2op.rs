//! [2OP](https://inform-fiction.org/zmachine/standards/z1point1/sect14.html) instructions
use crate::{
    error::*,
    object::{self, attribute, property},
    zmachine::ZMachine,
};

use super::*;

/// Branch when the first operand equals any of the others
pub fn je(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let mut condition = false;
    for o in &operands[1..] {
        if *o == operands[0] {
            condition = true;
            break;
        }
    }

    branch(zmachine, instruction, condition)
}

pub fn jl(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    branch(
        zmachine,
        instruction,
        (operands[0] as i16) < (operands[1] as i16),
    )
}

pub fn jg(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    branch(
        zmachine,
        instruction,
        (operands[0] as i16) > (operands[1] as i16),
    )
}

/// Decrement a variable (in place) and branch if it is now less than the
/// second operand
pub fn dec_chk(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = zmachine.peek_variable(operands[0] as u8)? as i16;
    let new_value = i16::overflowing_sub(value, 1).0;
    zmachine.set_variable_indirect(operands[0] as u8, new_value as u16)?;
    branch(zmachine, instruction, new_value < operands[1] as i16)
}

/// Increment a variable (in place) and branch if it is now greater than the
/// second operand
pub fn inc_chk(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = zmachine.peek_variable(operands[0] as u8)? as i16;
    let new_value = i16::overflowing_add(value, 1).0;
    zmachine.set_variable_indirect(operands[0] as u8, new_value as u16)?;
    branch(zmachine, instruction, new_value > operands[1] as i16)
}

/// Branch when the first object is a direct child of the second
pub fn jin(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::JinObject0,
            "@jin called with object 0".to_string(),
        ))?;
        return branch(zmachine, instruction, false);
    }

    let parent = object::parent(zmachine, operands[0] as usize)?;
    branch(zmachine, instruction, parent == operands[1] as usize)
}

/// Branch when all bits of the second operand are set in the first
pub fn test(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    branch(
        zmachine,
        instruction,
        operands[0] & operands[1] == operands[1],
    )
}

pub fn or(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    store_result(zmachine, instruction, operands[0] | operands[1])?;
    Ok(instruction.next_address())
}

pub fn and(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    store_result(zmachine, instruction, operands[0] & operands[1])?;
    Ok(instruction.next_address())
}

pub fn test_attr(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::TestAttrObject0,
            "@test_attr called with object 0".to_string(),
        ))?;
        return branch(zmachine, instruction, false);
    }

    match attribute::value(zmachine, operands[0] as usize, operands[1] as u8) {
        Ok(condition) => branch(zmachine, instruction, condition),
        Err(e) => {
            // Out-of-range attributes are a no-op
            zmachine.report_error(e)?;
            branch(zmachine, instruction, false)
        }
    }
}

pub fn set_attr(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::SetAttrObject0,
            "@set_attr called with object 0".to_string(),
        ))?;
        return Ok(instruction.next_address());
    }

    if let Err(e) = attribute::set(zmachine, operands[0] as usize, operands[1] as u8) {
        zmachine.report_error(e)?;
    }
    Ok(instruction.next_address())
}

pub fn clear_attr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::ClearAttrObject0,
            "@clear_attr called with object 0".to_string(),
        ))?;
        return Ok(instruction.next_address());
    }

    if let Err(e) = attribute::clear(zmachine, operands[0] as usize, operands[1] as u8) {
        zmachine.report_error(e)?;
    }
    Ok(instruction.next_address())
}

/// Set a variable indirectly: STORE (SP) replaces the top of the stack
pub fn store(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.set_variable_indirect(operands[0] as u8, operands[1])?;
    Ok(instruction.next_address())
}

pub fn insert_obj(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::MoveObject0,
            "@insert_obj called moving object 0".to_string(),
        ))?;
        return Ok(instruction.next_address());
    }
    if operands[1] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::MoveToObject0,
            "@insert_obj called moving into object 0".to_string(),
        ))?;
        return Ok(instruction.next_address());
    }

    object::insert_object(zmachine, operands[0] as usize, operands[1] as usize)?;
    Ok(instruction.next_address())
}

pub fn loadw(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = (operands[0] as isize + ((operands[1] as i16 as isize) * 2)) as usize;
    let value = zmachine.read_word(address)?;
    store_result(zmachine, instruction, value)?;
    Ok(instruction.next_address())
}

pub fn loadb(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = (operands[0] as isize + (operands[1] as i16 as isize)) as usize;
    let value = zmachine.read_byte(address)?;
    store_result(zmachine, instruction, value as u16)?;
    Ok(instruction.next_address())
}

pub fn get_prop(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::GetPropObject0,
            "@get_prop called with object 0".to_string(),
        ))?;
        store_result(zmachine, instruction, 0)?;
        return Ok(instruction.next_address());
    }

    let value = property::property(zmachine, operands[0] as usize, operands[1] as u8)?;
    store_result(zmachine, instruction, value)?;
    Ok(instruction.next_address())
}

pub fn get_prop_addr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::GetPropAddrObject0,
            "@get_prop_addr called with object 0".to_string(),
        ))?;
        store_result(zmachine, instruction, 0)?;
        return Ok(instruction.next_address());
    }

    let value = property::property_data_address(zmachine, operands[0] as usize, operands[1] as u8)?;
    store_result(zmachine, instruction, value as u16)?;
    Ok(instruction.next_address())
}

pub fn get_next_prop(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::GetNextPropObject0,
            "@get_next_prop called with object 0".to_string(),
        ))?;
        store_result(zmachine, instruction, 0)?;
        return Ok(instruction.next_address());
    }

    let value = property::next_property(zmachine, operands[0] as usize, operands[1] as u8)?;
    store_result(zmachine, instruction, value as u16)?;
    Ok(instruction.next_address())
}

pub fn add(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = i16::overflowing_add(operands[0] as i16, operands[1] as i16).0;
    store_result(zmachine, instruction, value as u16)?;
    Ok(instruction.next_address())
}

pub fn sub(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = i16::overflowing_sub(operands[0] as i16, operands[1] as i16).0;
    store_result(zmachine, instruction, value as u16)?;
    Ok(instruction.next_address())
}

pub fn mul(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = i16::overflowing_mul(operands[0] as i16, operands[1] as i16).0;
    store_result(zmachine, instruction, value as u16)?;
    Ok(instruction.next_address())
}

/// Signed division, truncating toward zero.  Division by zero is reported
/// and stores 0.
pub fn div(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[1] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::DivisionByZero,
            "@div division by zero".to_string(),
        ))?;
        store_result(zmachine, instruction, 0)?;
        return Ok(instruction.next_address());
    }

    let value = i16::overflowing_div(operands[0] as i16, operands[1] as i16).0;
    store_result(zmachine, instruction, value as u16)?;
    Ok(instruction.next_address())
}

/// Signed remainder.  Division by zero is reported and stores 0.
pub fn modulus(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[1] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::DivisionByZero,
            "@mod division by zero".to_string(),
        ))?;
        store_result(zmachine, instruction, 0)?;
        return Ok(instruction.next_address());
    }

    let value = i16::overflowing_rem(operands[0] as i16, operands[1] as i16).0;
    store_result(zmachine, instruction, value as u16)?;
    Ok(instruction.next_address())
}

pub fn call_2s(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = zmachine.packed_routine_address(operands[0])?;
    call_fn(
        zmachine,
        address,
        instruction.next_address(),
        &[operands[1]],
        instruction.store().copied(),
    )
}

pub fn call_2n(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = zmachine.packed_routine_address(operands[0])?;
    call_fn(
        zmachine,
        address,
        instruction.next_address(),
        &[operands[1]],
        None,
    )
}

pub fn set_colour(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if let Err(e) = zmachine.set_colors(operands[0], operands[1]) {
        zmachine.report_error(e)?;
    }
    Ok(instruction.next_address())
}

pub fn throw(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.throw(operands[1], operands[0])
}

#[cfg(test)]
mod tests {
    use crate::{instruction::decoder, object, test_util::test_zmachine_with_code};

    use super::*;

    #[test]
    fn test_je_multiple() {
        // VAR form JE with 3 operands
        let mut zmachine = test_zmachine_with_code(3, &[0xC1, 0x57, 0x05, 0x03, 0x05, 0xC6]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x50A);
    }

    #[test]
    fn test_jl_jg_signed() {
        // JL #FFFF #0001: -1 < 1
        let mut zmachine = test_zmachine_with_code(3, &[0xC2, 0x0F, 0xFF, 0xFF, 0x00, 0x01, 0xC6]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x50B);

        // JG #FFFF #0001: -1 > 1 fails
        let mut zmachine = test_zmachine_with_code(3, &[0xC3, 0x0F, 0xFF, 0xFF, 0x00, 0x01, 0xC6]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), i.next_address());
    }

    #[test]
    fn test_dec_chk() {
        let mut zmachine = test_zmachine_with_code(3, &[0x04, 0x10, 0x05, 0xC6]);
        zmachine.set_variable(0x10, 5).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        // 5 - 1 = 4 < 5: branch
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x508);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 4);
    }

    #[test]
    fn test_inc_chk() {
        let mut zmachine = test_zmachine_with_code(3, &[0x05, 0x10, 0x05, 0xC6]);
        zmachine.set_variable(0x10, 5).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        // 5 + 1 = 6 > 5: branch
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x508);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 6);
    }

    #[test]
    fn test_jin() {
        // Object 2 is in object 1
        let mut zmachine = test_zmachine_with_code(3, &[0x06, 0x02, 0x01, 0xC6]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x508);
    }

    #[test]
    fn test_test() {
        let mut zmachine = test_zmachine_with_code(3, &[0xC7, 0x0F, 0xF0, 0xF0, 0x00, 0xF0, 0xC6]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x50B);
    }

    #[test]
    fn test_or_and() {
        let mut zmachine = test_zmachine_with_code(3, &[0xC8, 0x0F, 0xF0, 0x00, 0x0F, 0x00, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x507);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0xFF00);

        let mut zmachine = test_zmachine_with_code(3, &[0xC9, 0x0F, 0xF0, 0xF0, 0x00, 0xF0, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x507);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0x00F0);
    }

    #[test]
    fn test_attr_ops() {
        // TEST_ATTR object 1 attribute 0 (set in the test story)
        let mut zmachine = test_zmachine_with_code(3, &[0x0A, 0x01, 0x00, 0xC6]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x508);

        // SET_ATTR then TEST_ATTR object 2 attribute 5
        let mut zmachine = test_zmachine_with_code(3, &[0x0B, 0x02, 0x05]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x503);
        assert!(attribute::value(&zmachine, 2, 5).unwrap());

        // CLEAR_ATTR
        let mut zmachine = test_zmachine_with_code(3, &[0x0C, 0x01, 0x00]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x503);
        assert!(!attribute::value(&zmachine, 1, 0).unwrap());
    }

    #[test]
    fn test_attr_out_of_range_is_noop() {
        // Attribute 40 in V3 is reported and the operation skipped
        let mut zmachine = test_zmachine_with_code(3, &[0x0B, 0x01, 0x28]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x503);
    }

    #[test]
    fn test_store_indirect() {
        // STORE (SP) #2A replaces the stack top
        let mut zmachine = test_zmachine_with_code(3, &[0x0D, 0x00, 0x2A]);
        zmachine.push(0x1111).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x503);
        assert_eq!(zmachine.peek_variable(0).unwrap(), 0x2A);
        assert_eq!(zmachine.state().frame_count(), 1);
    }

    #[test]
    fn test_insert_obj() {
        // INSERT_OBJ 4 1: object 4 becomes the first child of 1
        let mut zmachine = test_zmachine_with_code(3, &[0x0E, 0x04, 0x01]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x503);
        assert_eq!(object::child(&zmachine, 1).unwrap(), 4);
        assert_eq!(object::sibling(&zmachine, 4).unwrap(), 2);

        // Subsequent GET_CHILD stores 4 and branches
        let mut zm2 = test_zmachine_with_code(3, &[0x92, 0x01, 0x00, 0xC6]);
        object::insert_object(&mut zm2, 4, 1).unwrap();
        let i = decoder::decode_instruction(&zm2, 0x500).unwrap();
        assert_eq!(dispatch(&mut zm2, &i).unwrap(), 0x508);
        assert_eq!(zm2.peek_variable(0).unwrap(), 4);
    }

    #[test]
    fn test_insert_obj_empty_parent() {
        // INSERT_OBJ 2 4 when object 4 has no child
        let mut zmachine = test_zmachine_with_code(3, &[0x0E, 0x02, 0x04]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x503);
        assert_eq!(object::child(&zmachine, 4).unwrap(), 2);
        assert_eq!(object::sibling(&zmachine, 2).unwrap(), 0);
    }

    #[test]
    fn test_loadw_loadb() {
        let mut zmachine = test_zmachine_with_code(3, &[0x0F, 0x80, 0x02, 0x10]);
        zmachine.write_word(0x84, 0xF0AD).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x504);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0xF0AD);

        let mut zmachine = test_zmachine_with_code(3, &[0x10, 0x80, 0x04, 0x10]);
        zmachine.write_byte(0x84, 0xAD).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x504);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0xAD);
    }

    #[test]
    fn test_get_prop_present_and_default() {
        // Property 10 on object 1 is 0x1234
        let mut zmachine = test_zmachine_with_code(3, &[0x11, 0x01, 0x0A, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x504);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0x1234);

        // Property 7 is absent: the default table value (7) comes back
        // without an error
        let mut zmachine = test_zmachine_with_code(3, &[0x11, 0x01, 0x07, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x504);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 7);
    }

    #[test]
    fn test_get_prop_addr_absent() {
        // Absent property stores address 0, no error
        let mut zmachine = test_zmachine_with_code(3, &[0x12, 0x01, 0x07, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x504);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0);
    }

    #[test]
    fn test_get_prop_object_0() {
        let mut zmachine = test_zmachine_with_code(3, &[0x11, 0x00, 0x0A, 0x10]);
        zmachine.set_variable(0x10, 0xEEEE).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x504);
        // Dummy result 0
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0);
    }

    #[test]
    fn test_arithmetic() {
        // ADD with overflow wraps
        let mut zmachine = test_zmachine_with_code(3, &[0xD4, 0x0F, 0x7F, 0xFF, 0x00, 0x01, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x507);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0x8000);

        // SUB: 3 - 5 = -2
        let mut zmachine = test_zmachine_with_code(3, &[0x15, 0x03, 0x05, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x504);
        assert_eq!(zmachine.peek_variable(0x10).unwrap() as i16, -2);

        // MUL
        let mut zmachine = test_zmachine_with_code(3, &[0x16, 0x06, 0x07, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x504);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 42);

        // DIV truncates toward zero: -7 / 2 = -3
        let mut zmachine = test_zmachine_with_code(3, &[0xD7, 0x0F, 0xFF, 0xF9, 0x00, 0x02, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x507);
        assert_eq!(zmachine.peek_variable(0x10).unwrap() as i16, -3);

        // MOD: -7 % 2 = -1
        let mut zmachine = test_zmachine_with_code(3, &[0xD8, 0x0F, 0xFF, 0xF9, 0x00, 0x02, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x507);
        assert_eq!(zmachine.peek_variable(0x10).unwrap() as i16, -1);
    }

    #[test]
    fn test_division_by_zero() {
        let mut zmachine = test_zmachine_with_code(3, &[0x17, 0x07, 0x00, 0x10]);
        zmachine.set_variable(0x10, 0xEEEE).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x504);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0);
    }

    #[test]
    fn test_call_2s() {
        // VAR-form CALL_2S 0x0180 #2A -> G00: packed 0x180 * 4 = 0x600
        let mut zmachine =
            test_zmachine_with_code(4, &[0xD9, 0x1F, 0x01, 0x80, 0x2A, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        let next = dispatch(&mut zmachine, &i).unwrap();
        // V4 routine header: locals count + two default words
        assert_eq!(next, 0x605);
        assert_eq!(zmachine.frame_count(), 2);
        // The argument lands in the first local, the second keeps its default
        assert_eq!(zmachine.peek_variable(1).unwrap(), 0x2A);
        assert_eq!(zmachine.peek_variable(2).unwrap(), 0x2222);
        assert_eq!(zmachine.argument_count().unwrap(), 1);
    }

    #[test]
    fn test_throw() {
        // THROW #2A #02 unwinds to frame 2 and returns 0x2A through it
        let mut zmachine = test_zmachine_with_code(5, &[0x1C, 0x2A, 0x02]);
        zmachine
            .call_routine(0x600, &[], Some(StoreResult::new(0, 0x10)), 0x520)
            .unwrap();
        zmachine.call_routine(0x600, &[], None, 0x530).unwrap();
        zmachine.set_pc(0x500).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x520);
        assert_eq!(zmachine.frame_count(), 1);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0x2A);
    }
}
