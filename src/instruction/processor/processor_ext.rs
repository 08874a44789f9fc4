//! [EXT](https://inform-fiction.org/zmachine/standards/z1point1/sect14.html) instructions
use crate::{error::*, recoverable_error, zmachine::ZMachine};

use super::*;

/// V5+ SAVE, store form
pub fn save(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if !operands.is_empty() {
        // Auxiliary-table save is a rarity no major interpreter supports
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::Save,
            "@save with a table is not supported".to_string(),
        ))?;
        store_result(zmachine, instruction, 0)?;
        return Ok(instruction.next_address());
    }

    let pc = match instruction.store() {
        Some(s) => s.address(),
        None => instruction.next_address(),
    };
    match zmachine.save(pc) {
        Ok(_) => store_result(zmachine, instruction, 1)?,
        Err(e) => {
            zmachine.report_error(e)?;
            store_result(zmachine, instruction, 0)?;
        }
    }

    Ok(instruction.next_address())
}

/// V5+ RESTORE: on success, resume at the original save's store byte,
/// storing 2 through it
pub fn restore(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if !operands.is_empty() {
        zmachine.report_error(RuntimeError::recoverable(
            ErrorCode::Restore,
            "@restore with a table is not supported".to_string(),
        ))?;
        store_result(zmachine, instruction, 0)?;
        return Ok(instruction.next_address());
    }

    match zmachine.restore() {
        Ok(Some(address)) => super::processor_0op::restore_store(zmachine, address, 2),
        Ok(None) => {
            store_result(zmachine, instruction, 0)?;
            Ok(instruction.next_address())
        }
        Err(e) => {
            zmachine.report_error(e)?;
            store_result(zmachine, instruction, 0)?;
            Ok(instruction.next_address())
        }
    }
}

pub fn log_shift(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = operands[0];
    let places = operands[1] as i16;
    let new_value = if places < 0 && places > -16 {
        u16::overflowing_shr(value, places.unsigned_abs() as u32).0
    } else if places > 0 && places < 16 {
        u16::overflowing_shl(value, places as u32).0
    } else if places == 0 {
        value
    } else {
        error!(target: "app::instruction", "LOG_SHIFT {:04x} by {}?!", value, places);
        0
    };

    store_result(zmachine, instruction, new_value)?;
    Ok(instruction.next_address())
}

pub fn art_shift(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = operands[0] as i16;
    let places = operands[1] as i16;
    let new_value = if places < 0 && places > -16 {
        i16::overflowing_shr(value, places.unsigned_abs() as u32).0
    } else if places > 0 && places < 16 {
        i16::overflowing_shl(value, places as u32).0
    } else if places == 0 {
        value
    } else {
        error!(target: "app::instruction", "ART_SHIFT {:04x} by {}?!", value, places);
        0
    };

    store_result(zmachine, instruction, new_value as u16)?;
    Ok(instruction.next_address())
}

pub fn set_font(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let result = zmachine.set_font(operands[0])?;
    store_result(zmachine, instruction, result)?;
    Ok(instruction.next_address())
}

/// SAVE_UNDO: record an in-memory snapshot, storing 1 on success, 0 on
/// failure.  Exhaustion is never fatal.
pub fn save_undo(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let pc = match instruction.store() {
        Some(s) => s.address(),
        None => instruction.next_address(),
    };
    match zmachine.save_undo(pc) {
        Ok(true) => store_result(zmachine, instruction, 1)?,
        Ok(false) => store_result(zmachine, instruction, 0)?,
        Err(e) => {
            zmachine.report_error(e)?;
            store_result(zmachine, instruction, 0)?;
        }
    }

    Ok(instruction.next_address())
}

/// RESTORE_UNDO: take back the newest snapshot.  On success, resume at the
/// original save_undo's store byte, storing 2 through it; store 0 when no
/// snapshot is available.
pub fn restore_undo(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    match zmachine.restore_undo() {
        Ok(Some(address)) => super::processor_0op::restore_store(zmachine, address, 2),
        Ok(None) => {
            store_result(zmachine, instruction, 0)?;
            Ok(instruction.next_address())
        }
        Err(e) => {
            zmachine.report_error(e)?;
            store_result(zmachine, instruction, 0)?;
            Ok(instruction.next_address())
        }
    }
}

/// Resolve a V6 window operand: -3 means the current window
fn window_operand(zmachine: &ZMachine, operand: u16) -> Result<usize, RuntimeError> {
    let w = operand as i16;
    if w == -3 {
        Ok(zmachine.io().screen().selected_window() as usize)
    } else if (0..8).contains(&w) {
        Ok(w as usize)
    } else {
        recoverable_error!(ErrorCode::IllegalWindow, "Window {}", w)
    }
}

pub fn move_window(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    match window_operand(zmachine, operands[0]) {
        Ok(window) => {
            let w = zmachine.io_mut().screen_mut().window_mut(window)?;
            w.set_property(0, operands[1])?;
            w.set_property(1, operands[2])?;
        }
        Err(e) => zmachine.report_error(e)?,
    }
    Ok(instruction.next_address())
}

pub fn window_size(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    match window_operand(zmachine, operands[0]) {
        Ok(window) => {
            let w = zmachine.io_mut().screen_mut().window_mut(window)?;
            w.set_property(2, operands[1])?;
            w.set_property(3, operands[2])?;
        }
        Err(e) => zmachine.report_error(e)?,
    }
    Ok(instruction.next_address())
}

pub fn window_style(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    match window_operand(zmachine, operands[0]) {
        Ok(window) => {
            let flags = operands[1];
            let operation = if operands.len() > 2 { operands[2] } else { 0 };
            let w = zmachine.io_mut().screen_mut().window_mut(window)?;
            let current = w.property(14)?;
            let new = match operation {
                0 => flags,
                1 => current | flags,
                2 => current & !flags,
                _ => current ^ flags,
            };
            w.set_property(14, new)?;
        }
        Err(e) => zmachine.report_error(e)?,
    }
    Ok(instruction.next_address())
}

/// GET_WIND_PROP: read a window property, 0-15 direct, 16/17 true colour
pub fn get_wind_prop(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = match window_operand(zmachine, operands[0]) {
        Ok(window) => match zmachine.io().screen().window(window)?.property(operands[1]) {
            Ok(v) => v,
            Err(e) => {
                zmachine.report_error(e)?;
                0
            }
        },
        Err(e) => {
            zmachine.report_error(e)?;
            0
        }
    };

    store_result(zmachine, instruction, value)?;
    Ok(instruction.next_address())
}

/// PUT_WIND_PROP: set a direct window property (0-15)
pub fn put_wind_prop(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    match window_operand(zmachine, operands[0]) {
        Ok(window) => {
            if let Err(e) = zmachine
                .io_mut()
                .screen_mut()
                .window_mut(window)?
                .set_property(operands[1], operands[2])
            {
                zmachine.report_error(e)?;
            }
        }
        Err(e) => zmachine.report_error(e)?,
    }
    Ok(instruction.next_address())
}

pub fn scroll_window(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    match window_operand(zmachine, operands[0]) {
        Ok(window) => {
            let top = zmachine.io().screen().window(window)?.property(0)?;
            let _pixels = operands[1] as i16;
            zmachine.io_mut().screen_mut().scroll(top as u32);
        }
        Err(e) => zmachine.report_error(e)?,
    }
    Ok(instruction.next_address())
}

/// POP_STACK: discard `operand` values from the stack (or a user stack)
pub fn pop_stack(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands.len() > 1 {
        // User stack: the first word holds the free-slot count
        let stack = operands[1] as usize;
        let slots = zmachine.read_word(stack)?;
        zmachine.write_word(stack, slots + operands[0])?;
    } else {
        for _ in 0..operands[0] {
            zmachine.variable(0)?;
        }
    }
    Ok(instruction.next_address())
}

/// PUSH_STACK: push a value onto a user stack, branching on success
pub fn push_stack(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let stack = operands[1] as usize;
    let slots = zmachine.read_word(stack)?;
    if slots > 0 {
        zmachine.write_word(stack + (slots as usize * 2), operands[0])?;
        zmachine.write_word(stack, slots - 1)?;
        branch(zmachine, instruction, true)
    } else {
        branch(zmachine, instruction, false)
    }
}
