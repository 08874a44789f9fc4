//! [0OP](https://inform-fiction.org/zmachine/standards/z1point1/sect14.html) instructions
use crate::{error::*, text, zmachine::ZMachine};

use super::*;

pub fn rtrue(zmachine: &mut ZMachine, _instruction: &Instruction) -> Result<usize, RuntimeError> {
    zmachine.return_routine(1)
}

pub fn rfalse(zmachine: &mut ZMachine, _instruction: &Instruction) -> Result<usize, RuntimeError> {
    zmachine.return_routine(0)
}

/// Decode the literal string following the opcode and print it.  The next
/// instruction follows the string.
pub fn print(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let ztext = zmachine.string_literal(instruction.next_address())?;
    let text = text::from_vec(zmachine, &ztext, false)?;
    zmachine.print(&text)?;
    Ok(instruction.next_address() + (ztext.len() * 2))
}

pub fn print_ret(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let ztext = zmachine.string_literal(instruction.next_address())?;
    let text = text::from_vec(zmachine, &ztext, false)?;

    zmachine.print(&text)?;
    zmachine.new_line()?;

    zmachine.return_routine(1)
}

pub fn nop(_zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    Ok(instruction.next_address())
}

/// V1-4 SAVE.  V1-3 branches on success, V4 stores a result.
pub fn save(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let pc = if zmachine.version() < 4 {
        match instruction.branch() {
            Some(b) => b.address(),
            None => instruction.next_address(),
        }
    } else {
        match instruction.store() {
            Some(s) => s.address(),
            None => instruction.next_address(),
        }
    };

    match zmachine.save(pc) {
        Ok(_) => {
            if zmachine.version() < 4 {
                branch(zmachine, instruction, true)
            } else {
                store_result(zmachine, instruction, 1)?;
                Ok(instruction.next_address())
            }
        }
        Err(e) => {
            zmachine.report_error(e)?;
            if zmachine.version() < 4 {
                branch(zmachine, instruction, false)
            } else {
                store_result(zmachine, instruction, 0)?;
                Ok(instruction.next_address())
            }
        }
    }
}

/// V1-4 RESTORE.
///
/// A successful restore resumes at the original SAVE instruction's branch
/// or store byte: V1-3 takes the branch as if the save had succeeded, V4
/// stores 2 through the re-read store byte.
pub fn restore(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    match zmachine.restore() {
        Ok(Some(address)) => {
            if zmachine.version() < 4 {
                restore_branch(zmachine, address)
            } else {
                restore_store(zmachine, address, 2)
            }
        }
        Ok(None) => {
            if zmachine.version() < 4 {
                branch(zmachine, instruction, false)
            } else {
                store_result(zmachine, instruction, 0)?;
                Ok(instruction.next_address())
            }
        }
        Err(e) => {
            zmachine.report_error(e)?;
            if zmachine.version() < 4 {
                branch(zmachine, instruction, false)
            } else {
                store_result(zmachine, instruction, 0)?;
                Ok(instruction.next_address())
            }
        }
    }
}

/// Take the branch whose descriptor lives at `address`, as a successful
/// V1-3 SAVE would have
pub(super) fn restore_branch(
    zmachine: &mut ZMachine,
    address: usize,
) -> Result<usize, RuntimeError> {
    let bytes = zmachine.instruction(address);
    let b = bytes[0];
    let (offset, next) = if b & 0x40 == 0x40 {
        ((b & 0x3F) as i16, address + 1)
    } else {
        let mut o = ((b as u16 & 0x3f) << 8) | bytes[1] as u16;
        if o & 0x2000 == 0x2000 {
            o |= 0xC000;
        }
        (o as i16, address + 2)
    };

    // Branch polarity: a clear bit 7 branches on failure, and a restore
    // resumes as a success
    if b & 0x80 == 0x80 {
        match offset {
            0 => zmachine.return_routine(0),
            1 => zmachine.return_routine(1),
            _ => Ok(((next as isize) + (offset as isize) - 2) as usize),
        }
    } else {
        Ok(next)
    }
}

/// Store `value` through the store byte at `address`, as the original
/// save-type instruction would have
pub(super) fn restore_store(
    zmachine: &mut ZMachine,
    address: usize,
    value: u16,
) -> Result<usize, RuntimeError> {
    let variable = zmachine.instruction(address)[0];
    zmachine.set_variable(variable, value)?;
    Ok(address + 1)
}

pub fn restart(zmachine: &mut ZMachine, _instruction: &Instruction) -> Result<usize, RuntimeError> {
    zmachine.restart()
}

/// Return the value on top of the stack from the current routine
pub fn ret_popped(
    zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    let value = zmachine.variable(0)?;
    zmachine.return_routine(value)
}

/// V1-4: discard the top of the stack
pub fn pop(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    zmachine.variable(0)?;
    Ok(instruction.next_address())
}

/// V5+: store the current frame count for a later THROW
pub fn catch(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let depth = zmachine.frame_count();
    store_result(zmachine, instruction, depth as u16)?;
    Ok(instruction.next_address())
}

pub fn quit(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    zmachine.quit()?;
    Ok(instruction.next_address())
}

pub fn new_line(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    zmachine.new_line()?;
    Ok(instruction.next_address())
}

pub fn show_status(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<usize, RuntimeError> {
    zmachine.status_line()?;
    Ok(instruction.next_address())
}

/// Branch when the story checksum matches the header
pub fn verify(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    let verified = zmachine.verify()?;
    branch(zmachine, instruction, verified)
}

/// Interpreters are gullible and always branch
pub fn piracy(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    branch(zmachine, instruction, true)
}
