//! [1OP](https://inform-fiction.org/zmachine/standards/z1point1/sect14.html) instructions
use crate::{error::*, object, object::property, text, zmachine::ZMachine};

use super::*;

pub fn jz(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    branch(zmachine, instruction, operands[0] == 0)
}

pub fn get_sibling(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::GetSiblingObject0,
            "@get_sibling called with object 0".to_string(),
        ))?;
        store_result(zmachine, instruction, 0)?;
        return branch(zmachine, instruction, false);
    }

    let sibling = object::sibling(zmachine, operands[0] as usize)?;
    store_result(zmachine, instruction, sibling as u16)?;
    branch(zmachine, instruction, sibling != 0)
}

pub fn get_child(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::GetChildObject0,
            "@get_child called with object 0".to_string(),
        ))?;
        store_result(zmachine, instruction, 0)?;
        return branch(zmachine, instruction, false);
    }

    let child = object::child(zmachine, operands[0] as usize)?;
    store_result(zmachine, instruction, child as u16)?;
    branch(zmachine, instruction, child != 0)
}

pub fn get_parent(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::GetParentObject0,
            "@get_parent called with object 0".to_string(),
        ))?;
        store_result(zmachine, instruction, 0)?;
        return Ok(instruction.next_address());
    }

    let parent = object::parent(zmachine, operands[0] as usize)?;
    store_result(zmachine, instruction, parent as u16)?;
    Ok(instruction.next_address())
}

pub fn get_prop_len(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let length = property::property_length(zmachine, operands[0] as usize)?;
    store_result(zmachine, instruction, length as u16)?;
    Ok(instruction.next_address())
}

pub fn inc(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = zmachine.peek_variable(operands[0] as u8)? as i16;
    let new_value = i16::overflowing_add(value, 1).0;
    zmachine.set_variable_indirect(operands[0] as u8, new_value as u16)?;
    Ok(instruction.next_address())
}

pub fn dec(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = zmachine.peek_variable(operands[0] as u8)? as i16;
    let new_value = i16::overflowing_sub(value, 1).0;
    zmachine.set_variable_indirect(operands[0] as u8, new_value as u16)?;
    Ok(instruction.next_address())
}

pub fn print_addr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = operands[0] as usize;
    if address >= zmachine.state().memory().size() {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::PrintAtIllegalAddress,
            format!("@print_addr at ${:06x} outside of memory", address),
        ))?;
        return Ok(instruction.next_address());
    }

    let ztext = zmachine.string_literal(address)?;
    let text = text::from_vec(zmachine, &ztext, false)?;
    zmachine.print(&text)?;
    Ok(instruction.next_address())
}

pub fn call_1s(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = zmachine.packed_routine_address(operands[0])?;
    call_fn(
        zmachine,
        address,
        instruction.next_address(),
        &[],
        instruction.store().copied(),
    )
}

pub fn remove_obj(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::RemoveObject0,
            "@remove_object called with object 0".to_string(),
        ))?;
        return Ok(instruction.next_address());
    }

    object::remove_object(zmachine, operands[0] as usize)?;
    Ok(instruction.next_address())
}

pub fn print_obj(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 0 {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::IllegalObject,
            "@print_obj called with object 0".to_string(),
        ))?;
        return Ok(instruction.next_address());
    }

    let ztext = property::short_name(zmachine, operands[0] as usize)?;
    let text = text::from_vec(zmachine, &ztext, false)?;
    zmachine.print(&text)?;
    Ok(instruction.next_address())
}

pub fn ret(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.return_routine(operands[0])
}

/// Unconditional jump: the signed operand is relative to the following
/// instruction, less 2
pub fn jump(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = (instruction.next_address() as isize) + (operands[0] as i16 as isize) - 2;
    if address < 0x40 || address as usize >= zmachine.state().memory().size() {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::JumpToIllegalAddress,
            format!("@jump to ${:06x} outside of memory", address),
        ))?;
        return Ok(instruction.next_address());
    }

    Ok(address as usize)
}

pub fn print_paddr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = zmachine.packed_string_address(operands[0])?;
    if address >= zmachine.state().memory().size() {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::PrintAtIllegalAddress,
            format!("@print_paddr at ${:06x} outside of memory", address),
        ))?;
        return Ok(instruction.next_address());
    }

    let text = text::as_text(zmachine, address, false)?;
    zmachine.print(&text)?;
    Ok(instruction.next_address())
}

/// Store the value of a variable without popping the stack
pub fn load(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = zmachine.peek_variable(operands[0] as u8)?;
    store_result(zmachine, instruction, value)?;
    Ok(instruction.next_address())
}

/// V1-4 bitwise NOT
pub fn not(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    store_result(zmachine, instruction, !operands[0])?;
    Ok(instruction.next_address())
}

pub fn call_1n(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = zmachine.packed_routine_address(operands[0])?;
    call_fn(zmachine, address, instruction.next_address(), &[], None)
}

#[cfg(test)]
mod tests {
    use crate::{instruction::decoder, object, test_util::test_zmachine_with_code};

    use super::*;

    #[test]
    fn test_jz() {
        let mut zmachine = test_zmachine_with_code(3, &[0x90, 0x00, 0xC6]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x507);
    }

    #[test]
    fn test_get_child_none() {
        // Object 4 has no child: GET_CHILD #04 -> (SP) stores 0 and takes
        // the false branch (polarity bit clear)
        let mut zmachine = test_zmachine_with_code(3, &[0x92, 0x04, 0x00, 0x46]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x508);
        assert_eq!(zmachine.peek_variable(0).unwrap(), 0);
    }

    #[test]
    fn test_get_child_present() {
        // Object 1's child is 2: stores 2 and takes the true branch
        let mut zmachine = test_zmachine_with_code(3, &[0x92, 0x01, 0x00, 0xC6]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x508);
        assert_eq!(zmachine.peek_variable(0).unwrap(), 2);
    }

    #[test]
    fn test_get_child_object_0() {
        // Object 0 is reported and produces the dummy: store 0, branch false
        let mut zmachine = test_zmachine_with_code(3, &[0x92, 0x00, 0x00, 0xC6]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), i.next_address());
        assert_eq!(zmachine.peek_variable(0).unwrap(), 0);
    }

    #[test]
    fn test_get_sibling() {
        let mut zmachine = test_zmachine_with_code(3, &[0x91, 0x02, 0x00, 0xC6]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x508);
        assert_eq!(zmachine.peek_variable(0).unwrap(), 3);
    }

    #[test]
    fn test_get_parent() {
        let mut zmachine = test_zmachine_with_code(3, &[0x93, 0x02, 0x00]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x503);
        assert_eq!(zmachine.peek_variable(0).unwrap(), 1);
    }

    #[test]
    fn test_inc_dec() {
        let mut zmachine = test_zmachine_with_code(3, &[0x95, 0x10]);
        zmachine.set_variable(0x10, 0xFFFF).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x502);
        // -1 + 1 wraps to 0
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0);

        let mut zmachine = test_zmachine_with_code(3, &[0x96, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x502);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0xFFFF);
    }

    #[test]
    fn test_inc_stack_in_place() {
        // INC (SP) modifies the top of the stack without popping
        let mut zmachine = test_zmachine_with_code(3, &[0x95, 0x00]);
        zmachine.push(5).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x502);
        assert_eq!(zmachine.peek_variable(0).unwrap(), 6);
    }

    #[test]
    fn test_ret() {
        let mut zmachine = test_zmachine_with_code(3, &[0x9B, 0x2A]);
        zmachine
            .call_routine(0x600, &[], Some(StoreResult::new(0, 0x10)), 0x520)
            .unwrap();
        zmachine.set_pc(0x500).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x520);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0x2A);
    }

    #[test]
    fn test_jump() {
        // JUMP with a large-constant offset: 0x90 at 0x500... use 0x8C
        // (1OP large constant) offset 0x0100
        let mut zmachine = test_zmachine_with_code(3, &[0x8C, 0x01, 0x00]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        // next = 0x503, target = 0x503 + 0x100 - 2
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x601);
    }

    #[test]
    fn test_jump_backward() {
        let mut zmachine = test_zmachine_with_code(3, &[0x8C, 0xFF, 0x80]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        // next = 0x503, target = 0x503 - 0x80 - 2
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x481);
    }

    #[test]
    fn test_jump_illegal() {
        // Target far outside memory is reported; execution falls through
        let mut zmachine = test_zmachine_with_code(3, &[0x8C, 0x7F, 0x00]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), i.next_address());
    }

    #[test]
    fn test_load() {
        let mut zmachine = test_zmachine_with_code(3, &[0x9E, 0x00, 0x10]);
        zmachine.push(0x1234).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x503);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0x1234);
        // The stack was peeked, not popped
        assert_eq!(zmachine.peek_variable(0).unwrap(), 0x1234);
    }

    #[test]
    fn test_not() {
        let mut zmachine = test_zmachine_with_code(3, &[0x8F, 0xF0, 0xF0, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x504);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0x0F0F);
    }

    #[test]
    fn test_remove_obj() {
        let mut zmachine = test_zmachine_with_code(3, &[0x99, 0x02]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        assert_eq!(dispatch(&mut zmachine, &i).unwrap(), 0x502);
        assert_eq!(object::parent(&zmachine, 2).unwrap(), 0);
        assert_eq!(object::child(&zmachine, 1).unwrap(), 3);
    }

    #[test]
    fn test_call_1n_discards() {
        // Routine at 0x600 returns true; the result is discarded
        let mut zmachine = test_zmachine_with_code(5, &[0x8F, 0x01, 0x80]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        let next = dispatch(&mut zmachine, &i).unwrap();
        assert_eq!(zmachine.frame_count(), 2);
        // v5 routine header at 0x600: locals byte only
        assert_eq!(next, 0x601);
    }
}
