//! Opcode handlers and the dispatch table
use crate::error::*;
use crate::zmachine::ZMachine;

use super::*;

mod processor_0op;
mod processor_1op;
mod processor_2op;
mod processor_ext;
mod processor_var;

fn operand_value(zmachine: &mut ZMachine, operand: &Operand) -> Result<u16, RuntimeError> {
    match operand.operand_type() {
        OperandType::SmallConstant | OperandType::LargeConstant => Ok(operand.value()),
        OperandType::Variable => zmachine.variable(operand.value() as u8),
    }
}

/// Resolve the instruction's operands to values.
///
/// Variable operands are read (variable 0 pops the stack) in order.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `instruction` - The decoded instruction
///
/// # Returns
/// [Result] with the operand values or a [RuntimeError]
pub fn operand_values(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<Vec<u16>, RuntimeError> {
    let mut v = Vec::new();
    for o in instruction.operands() {
        v.push(operand_value(zmachine, o)?)
    }
    Ok(v)
}

/// Resolve a branch.
///
/// When the condition matches the branch polarity, destination 0 returns
/// false from the current routine, 1 returns true, and anything else
/// transfers control.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `instruction` - The decoded instruction
/// * `condition` - The condition the instruction computed
///
/// # Returns
/// [Result] with the address of the next instruction to execute
pub fn branch(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
    condition: bool,
) -> Result<usize, RuntimeError> {
    match instruction.branch() {
        Some(b) => {
            if condition == b.condition() {
                match b.branch_address() {
                    0 => zmachine.return_routine(0), // return false
                    1 => zmachine.return_routine(1), // return true,
                    _ => Ok(b.branch_address()),
                }
            } else {
                Ok(instruction.next_address())
            }
        }
        None => Ok(instruction.next_address()),
    }
}

/// Store an instruction result, if the instruction has a store location
fn store_result(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
    value: u16,
) -> Result<(), RuntimeError> {
    match instruction.store() {
        Some(s) => zmachine.set_variable(s.variable(), value),
        None => Ok(()),
    }
}

/// Common call implementation.
///
/// Calls to packed address 0 (and 1, which some games use as a stub)
/// store the address value without a frame push.  Calls to addresses
/// outside memory or to headers that aren't routines are reported and
/// produce the FALSE dummy result.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `address` - Unpacked routine address
/// * `return_addr` - Address to resume at when the routine returns
/// * `arguments` - Routine arguments
/// * `result` - [Option] with the [StoreResult] or [None] to discard
///
/// # Returns
/// [Result] with the address of the next instruction to execute
fn call_fn(
    zmachine: &mut ZMachine,
    address: usize,
    return_addr: usize,
    arguments: &[u16],
    result: Option<StoreResult>,
) -> Result<usize, RuntimeError> {
    match address {
        0 | 1 => {
            if let Some(r) = result {
                zmachine.set_variable(r.variable(), address as u16)?
            }

            Ok(return_addr)
        }
        _ => {
            if address >= zmachine.state().memory().size() {
                zmachine.report_error(RuntimeError::recoverable(
                    ErrorCode::CallToIllegalAddress,
                    format!("Call to ${:06x} outside of memory", address),
                ))?;
                if let Some(r) = result {
                    zmachine.set_variable(r.variable(), 0)?;
                }
                return Ok(return_addr);
            }
            if zmachine.instruction(address)[0] > 15 {
                zmachine.report_error(RuntimeError::recoverable(
                    ErrorCode::CallToNonRoutine,
                    format!("Call to ${:06x} which is not a routine", address),
                ))?;
                if let Some(r) = result {
                    zmachine.set_variable(r.variable(), 0)?;
                }
                return Ok(return_addr);
            }

            zmachine.call_routine(address, arguments, result, return_addr)
        }
    }
}

/// Dispatch an instruction to its handler.
///
/// The numeric slot-to-opcode mapping here is the contract: opcodes are
/// selected by (version, instruction number) within their operand-count
/// class, with 0xBE-prefixed opcodes in the EXT table.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `instruction` - The decoded instruction
///
/// # Returns
/// [Result] with the address of the next instruction to execute
pub fn dispatch(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    debug!(target: "app::instruction", "dispatch: {}", instruction);
    match instruction.opcode().form() {
        OpcodeForm::Ext => match (zmachine.version(), instruction.opcode().instruction()) {
            (5..=8, 0x00) => processor_ext::save(zmachine, instruction),
            (5..=8, 0x01) => processor_ext::restore(zmachine, instruction),
            (5..=8, 0x02) => processor_ext::log_shift(zmachine, instruction),
            (5..=8, 0x03) => processor_ext::art_shift(zmachine, instruction),
            (5..=8, 0x04) => processor_ext::set_font(zmachine, instruction),
            (5..=8, 0x09) => processor_ext::save_undo(zmachine, instruction),
            (5..=8, 0x0a) => processor_ext::restore_undo(zmachine, instruction),
            (6, 0x10) => processor_ext::move_window(zmachine, instruction),
            (6, 0x11) => processor_ext::window_size(zmachine, instruction),
            (6, 0x12) => processor_ext::window_style(zmachine, instruction),
            (6, 0x13) => processor_ext::get_wind_prop(zmachine, instruction),
            (6, 0x14) => processor_ext::scroll_window(zmachine, instruction),
            (6, 0x15) => processor_ext::pop_stack(zmachine, instruction),
            (6, 0x18) => processor_ext::push_stack(zmachine, instruction),
            (6, 0x19) => processor_ext::put_wind_prop(zmachine, instruction),
            (_, _) => illegal_opcode(zmachine, instruction),
        },
        _ => match instruction.opcode().operand_count() {
            OperandCount::_0OP => match (zmachine.version(), instruction.opcode().instruction()) {
                (_, 0x0) => processor_0op::rtrue(zmachine, instruction),
                (_, 0x1) => processor_0op::rfalse(zmachine, instruction),
                (_, 0x2) => processor_0op::print(zmachine, instruction),
                (_, 0x3) => processor_0op::print_ret(zmachine, instruction),
                (_, 0x4) => processor_0op::nop(zmachine, instruction),
                (1..=4, 0x5) => processor_0op::save(zmachine, instruction),
                (1..=4, 0x6) => processor_0op::restore(zmachine, instruction),
                (_, 0x7) => processor_0op::restart(zmachine, instruction),
                (_, 0x8) => processor_0op::ret_popped(zmachine, instruction),
                (1..=4, 0x9) => processor_0op::pop(zmachine, instruction),
                (_, 0x9) => processor_0op::catch(zmachine, instruction),
                (_, 0xa) => processor_0op::quit(zmachine, instruction),
                (_, 0xb) => processor_0op::new_line(zmachine, instruction),
                (3, 0xc) => processor_0op::show_status(zmachine, instruction),
                (_, 0xd) => processor_0op::verify(zmachine, instruction),
                (5..=8, 0xf) => processor_0op::piracy(zmachine, instruction),
                (_, _) => illegal_opcode(zmachine, instruction),
            },
            OperandCount::_1OP => match (zmachine.version(), instruction.opcode().instruction()) {
                (_, 0x0) => processor_1op::jz(zmachine, instruction),
                (_, 0x1) => processor_1op::get_sibling(zmachine, instruction),
                (_, 0x2) => processor_1op::get_child(zmachine, instruction),
                (_, 0x3) => processor_1op::get_parent(zmachine, instruction),
                (_, 0x4) => processor_1op::get_prop_len(zmachine, instruction),
                (_, 0x5) => processor_1op::inc(zmachine, instruction),
                (_, 0x6) => processor_1op::dec(zmachine, instruction),
                (_, 0x7) => processor_1op::print_addr(zmachine, instruction),
                (4..=8, 0x8) => processor_1op::call_1s(zmachine, instruction),
                (_, 0x9) => processor_1op::remove_obj(zmachine, instruction),
                (_, 0xa) => processor_1op::print_obj(zmachine, instruction),
                (_, 0xb) => processor_1op::ret(zmachine, instruction),
                (_, 0xc) => processor_1op::jump(zmachine, instruction),
                (_, 0xd) => processor_1op::print_paddr(zmachine, instruction),
                (_, 0xe) => processor_1op::load(zmachine, instruction),
                (1..=4, 0xf) => processor_1op::not(zmachine, instruction),
                (_, 0xf) => processor_1op::call_1n(zmachine, instruction),
                (_, _) => illegal_opcode(zmachine, instruction),
            },
            OperandCount::_2OP => match (zmachine.version(), instruction.opcode().instruction()) {
                (_, 0x01) => processor_2op::je(zmachine, instruction),
                (_, 0x02) => processor_2op::jl(zmachine, instruction),
                (_, 0x03) => processor_2op::jg(zmachine, instruction),
                (_, 0x04) => processor_2op::dec_chk(zmachine, instruction),
                (_, 0x05) => processor_2op::inc_chk(zmachine, instruction),
                (_, 0x06) => processor_2op::jin(zmachine, instruction),
                (_, 0x07) => processor_2op::test(zmachine, instruction),
                (_, 0x08) => processor_2op::or(zmachine, instruction),
                (_, 0x09) => processor_2op::and(zmachine, instruction),
                (_, 0x0a) => processor_2op::test_attr(zmachine, instruction),
                (_, 0x0b) => processor_2op::set_attr(zmachine, instruction),
                (_, 0x0c) => processor_2op::clear_attr(zmachine, instruction),
                (_, 0x0d) => processor_2op::store(zmachine, instruction),
                (_, 0x0e) => processor_2op::insert_obj(zmachine, instruction),
                (_, 0x0f) => processor_2op::loadw(zmachine, instruction),
                (_, 0x10) => processor_2op::loadb(zmachine, instruction),
                (_, 0x11) => processor_2op::get_prop(zmachine, instruction),
                (_, 0x12) => processor_2op::get_prop_addr(zmachine, instruction),
                (_, 0x13) => processor_2op::get_next_prop(zmachine, instruction),
                (_, 0x14) => processor_2op::add(zmachine, instruction),
                (_, 0x15) => processor_2op::sub(zmachine, instruction),
                (_, 0x16) => processor_2op::mul(zmachine, instruction),
                (_, 0x17) => processor_2op::div(zmachine, instruction),
                (_, 0x18) => processor_2op::modulus(zmachine, instruction),
                (4..=8, 0x19) => processor_2op::call_2s(zmachine, instruction),
                (5..=8, 0x1a) => processor_2op::call_2n(zmachine, instruction),
                (5..=8, 0x1b) => processor_2op::set_colour(zmachine, instruction),
                (5..=8, 0x1c) => processor_2op::throw(zmachine, instruction),
                (_, _) => illegal_opcode(zmachine, instruction),
            },
            OperandCount::_VAR => match (zmachine.version(), instruction.opcode().instruction()) {
                (_, 0x00) => processor_var::call_vs(zmachine, instruction),
                (_, 0x01) => processor_var::storew(zmachine, instruction),
                (_, 0x02) => processor_var::storeb(zmachine, instruction),
                (_, 0x03) => processor_var::put_prop(zmachine, instruction),
                (_, 0x04) => processor_var::read(zmachine, instruction),
                (_, 0x05) => processor_var::print_char(zmachine, instruction),
                (_, 0x06) => processor_var::print_num(zmachine, instruction),
                (_, 0x07) => processor_var::random(zmachine, instruction),
                (_, 0x08) => processor_var::push(zmachine, instruction),
                (_, 0x09) => processor_var::pull(zmachine, instruction),
                (3..=8, 0x0a) => processor_var::split_window(zmachine, instruction),
                (3..=8, 0x0b) => processor_var::set_window(zmachine, instruction),
                (4..=8, 0x0c) => processor_var::call_vs2(zmachine, instruction),
                (4..=8, 0x0d) => processor_var::erase_window(zmachine, instruction),
                (4..=8, 0x0e) => processor_var::erase_line(zmachine, instruction),
                (4..=8, 0x0f) => processor_var::set_cursor(zmachine, instruction),
                (4..=8, 0x10) => processor_var::get_cursor(zmachine, instruction),
                (4..=8, 0x11) => processor_var::set_text_style(zmachine, instruction),
                (4..=8, 0x12) => processor_var::buffer_mode(zmachine, instruction),
                (3..=8, 0x13) => processor_var::output_stream(zmachine, instruction),
                (3..=8, 0x14) => processor_var::input_stream(zmachine, instruction),
                (3..=8, 0x15) => processor_var::sound_effect(zmachine, instruction),
                (4..=8, 0x16) => processor_var::read_char(zmachine, instruction),
                (4..=8, 0x17) => processor_var::scan_table(zmachine, instruction),
                (5..=8, 0x18) => processor_var::not(zmachine, instruction),
                (5..=8, 0x19) => processor_var::call_vn(zmachine, instruction),
                (5..=8, 0x1a) => processor_var::call_vn2(zmachine, instruction),
                (5..=8, 0x1b) => processor_var::tokenise(zmachine, instruction),
                (5..=8, 0x1c) => processor_var::encode_text(zmachine, instruction),
                (5..=8, 0x1d) => processor_var::copy_table(zmachine, instruction),
                (5..=8, 0x1e) => processor_var::print_table(zmachine, instruction),
                (5..=8, 0x1f) => processor_var::check_arg_count(zmachine, instruction),
                (_, _) => illegal_opcode(zmachine, instruction),
            },
        },
    }
}

/// An opcode that doesn't exist for the running version.
///
/// Reported through the error policy; continuing skips the instruction.
fn illegal_opcode(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    zmachine.report_error(RuntimeError::recoverable(
        ErrorCode::IllegalOpcode,
        format!(
            "Illegal opcode {:#04x} for version {}",
            instruction.opcode().opcode(),
            zmachine.version()
        ),
    ))?;
    Ok(instruction.next_address())
}

#[cfg(test)]
mod tests {
    use crate::test_util::test_zmachine_with_code;

    use super::*;

    #[test]
    fn test_branch_semantics() {
        // JZ #00 branch-on-true with offset 6: condition holds, PC moves
        // offset - 2 past the branch data
        let mut zmachine = test_zmachine_with_code(3, &[0x90, 0x00, 0xC6]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        let next = dispatch(&mut zmachine, &i).unwrap();
        assert_eq!(next, 0x507);

        // Condition fails: fall through
        let mut zmachine = test_zmachine_with_code(3, &[0x90, 0x05, 0xC6]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        let next = dispatch(&mut zmachine, &i).unwrap();
        assert_eq!(next, 0x503);
    }

    #[test]
    fn test_branch_return_sentinels() {
        // Call a routine whose body is JZ #00 with branch offset 0:
        // the routine returns false
        let mut zmachine = test_zmachine_with_code(3, &[0x90, 0x00, 0xC0]);
        let store = StoreResult::new(0, 0x10);
        zmachine.call_routine(0x600, &[], Some(store), 0x520).unwrap();
        zmachine.set_pc(0x500).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        let next = dispatch(&mut zmachine, &i).unwrap();
        assert_eq!(next, 0x520);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0);

        // Branch offset 1: the routine returns true
        let mut zmachine = test_zmachine_with_code(3, &[0x90, 0x00, 0xC1]);
        let store = StoreResult::new(0, 0x10);
        zmachine.call_routine(0x600, &[], Some(store), 0x520).unwrap();
        zmachine.set_pc(0x500).unwrap();
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        let next = dispatch(&mut zmachine, &i).unwrap();
        assert_eq!(next, 0x520);
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 1);
    }

    #[test]
    fn test_call_address_0_stores_false() {
        // CALL_VS 0 -> G00
        let mut zmachine = test_zmachine_with_code(3, &[0xE0, 0x3F, 0x00, 0x00, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        let next = dispatch(&mut zmachine, &i).unwrap();
        assert_eq!(next, i.next_address());
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0);
        assert_eq!(zmachine.frame_count(), 1);
    }

    #[test]
    fn test_call_to_non_routine() {
        // Routine byte at the target is > 15: reported, stores FALSE
        // 0x700 in the test story contains 0xFF
        let mut zmachine = test_zmachine_with_code(3, &[0xE0, 0x3F, 0x03, 0x80, 0x10]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        let next = dispatch(&mut zmachine, &i).unwrap();
        assert_eq!(next, i.next_address());
        assert_eq!(zmachine.peek_variable(0x10).unwrap(), 0);
    }

    #[test]
    fn test_illegal_opcode_continues() {
        // EXT 0x1F doesn't exist: with the default policy the instruction
        // is reported and skipped
        let mut zmachine = test_zmachine_with_code(5, &[0xBE, 0x1F, 0xFF]);
        let i = decoder::decode_instruction(&zmachine, 0x500).unwrap();
        let next = dispatch(&mut zmachine, &i).unwrap();
        assert_eq!(next, i.next_address());
    }
}
