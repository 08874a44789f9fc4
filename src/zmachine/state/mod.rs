//! Machine state: memory map, call stack, and undo history
use std::fmt;

use crate::{
    error::*,
    fatal_error,
    iff::quetzal::{cmem::CMem, ifhd::IFhd, stks::Stks, Quetzal},
    instruction::StoreResult,
    recoverable_error,
};

use self::{
    frame::Frame,
    header::{Flags1v3, Flags1v4, Flags2, HeaderField},
    memory::Memory,
    undo::UndoStack,
};

pub mod frame;
pub mod header;
pub mod memory;
pub mod undo;

/// Runtime machine state
pub struct State {
    /// Story file version
    version: u8,
    /// Memory map
    memory: Memory,
    /// Byte address of the start of static memory
    static_mark: usize,
    /// Call stack, oldest frame first
    frames: Vec<Frame>,
    /// Undo snapshots
    undo: UndoStack,
    /// Return value of the most recently completed interrupt routine
    interrupt_result: Option<u16>,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "State: version {}, address space {:06x}, dynamic space {:04x}, execution frames: {}",
            self.version,
            self.memory.size(),
            self.static_mark,
            self.frames.len()
        )
    }
}

impl TryFrom<(&State, usize)> for Quetzal {
    type Error = RuntimeError;

    fn try_from((state, pc): (&State, usize)) -> Result<Self, Self::Error> {
        let ifhd = IFhd::try_from((state, pc))?;
        let cmem = CMem::new(&state.memory.compress());
        let stks = Stks::try_from(state)?;
        debug!(target: "app::quetzal", "{}", ifhd);
        debug!(target: "app::quetzal", "{}", cmem);

        Ok(Quetzal::new(ifhd, None, Some(cmem), stks))
    }
}

impl TryFrom<(&State, usize)> for IFhd {
    type Error = RuntimeError;

    fn try_from((state, pc): (&State, usize)) -> Result<Self, Self::Error> {
        let release_number = header::field_word(&state.memory, HeaderField::Release)?;
        let mut serial_number = Vec::new();
        for i in 0..6 {
            serial_number.push(state.read_byte(HeaderField::Serial as usize + i)?);
        }
        let checksum = header::field_word(&state.memory, HeaderField::Checksum)?;

        Ok(IFhd::new(
            release_number,
            &serial_number,
            checksum,
            (pc as u32) & 0xFFFFFF,
        ))
    }
}

impl TryFrom<&State> for Stks {
    type Error = RuntimeError;

    fn try_from(value: &State) -> Result<Self, Self::Error> {
        let frames = value.frames.iter().map(|f| f.into()).collect();
        Ok(Stks::new(frames))
    }
}

impl State {
    /// Constructor
    ///
    /// # Arguments
    /// * `memory` - Memory map
    /// * `undo_slots` - Number of undo snapshots to keep
    pub fn new(memory: Memory, undo_slots: usize) -> Result<State, RuntimeError> {
        let version = memory.version();
        let static_mark = memory.static_mark();
        let undo = UndoStack::new(memory.pristine(), undo_slots);
        Ok(State {
            version,
            memory,
            static_mark,
            frames: Vec::new(),
            undo,
            interrupt_result: None,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn static_mark(&self) -> usize {
        self.static_mark
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn current_frame(&self) -> Result<&Frame, RuntimeError> {
        if let Some(frame) = self.frames.last() {
            Ok(frame)
        } else {
            fatal_error!(ErrorCode::StackUnderflow, "No runtime frame")
        }
    }

    fn current_frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        if let Some(frame) = self.frames.last_mut() {
            Ok(frame)
        } else {
            fatal_error!(ErrorCode::StackUnderflow, "No runtime frame")
        }
    }

    /// Prepare the machine for execution.
    ///
    /// Sets the interpreter-owned header fields and pushes the initial frame
    /// if the call stack is empty.
    ///
    /// # Arguments
    /// * `rows` - Screen rows
    /// * `columns` - Screen columns
    /// * `default_colors` - (foreground, background) color pair
    /// * `sound` - Are sound effects available?
    pub fn initialize(
        &mut self,
        rows: u8,
        columns: u8,
        default_colors: (u8, u8),
        sound: bool,
    ) -> Result<(), RuntimeError> {
        self.interrupt_result = None;

        // Set V3 Flags 1
        if self.version < 4 {
            header::clear_flag1(&mut self.memory, Flags1v3::StatusLineNotAvailable as u8)?;
            header::set_flag1(&mut self.memory, Flags1v3::ScreenSplitAvailable as u8)?;
            header::clear_flag1(&mut self.memory, Flags1v3::VariablePitchDefault as u8)?;
        }

        // Set V4+ Flags 1
        if self.version > 3 {
            header::set_byte(
                &mut self.memory,
                HeaderField::DefaultBackground,
                default_colors.1,
            )?;
            header::set_byte(
                &mut self.memory,
                HeaderField::DefaultForeground,
                default_colors.0,
            )?;
            header::set_byte(&mut self.memory, HeaderField::ScreenLines, rows)?;
            header::set_byte(&mut self.memory, HeaderField::ScreenColumns, columns)?;

            if sound {
                header::set_flag1(&mut self.memory, Flags1v4::SoundEffectsAvailable as u8)?;
            }
        }

        // Set V5+ Flags 1
        if self.version > 4 {
            header::set_word(&mut self.memory, HeaderField::ScreenHeight, rows as u16)?;
            header::set_word(&mut self.memory, HeaderField::ScreenWidth, columns as u16)?;
            header::set_byte(&mut self.memory, HeaderField::FontWidth, 1)?;
            header::set_byte(&mut self.memory, HeaderField::FontHeight, 1)?;
            header::clear_flag1(&mut self.memory, Flags1v4::PicturesAvailable as u8)?;
            header::set_flag1(&mut self.memory, Flags1v4::ColoursAvailable as u8)?;
            header::set_flag1(&mut self.memory, Flags1v4::BoldfaceAvailable as u8)?;
            header::set_flag1(&mut self.memory, Flags1v4::ItalicAvailable as u8)?;
            header::set_flag1(&mut self.memory, Flags1v4::FixedSpaceAvailable as u8)?;
            header::set_flag1(&mut self.memory, Flags1v4::TimedInputAvailable as u8)?;
            header::clear_flag2(&mut self.memory, Flags2::RequestPictures)?;
            if !sound {
                header::clear_flag2(&mut self.memory, Flags2::RequestSoundEffects)?;
            }
        }

        // Interpreter number and version
        header::set_byte(&mut self.memory, HeaderField::InterpreterNumber, 6)?;
        header::set_byte(&mut self.memory, HeaderField::InterpreterVersion, b'Z')?;

        // Z-Machine standard compliance
        self.write_byte(HeaderField::Revision as usize, 1)?;
        self.write_byte(HeaderField::Revision as usize + 1, 1)?;

        if self.frames.is_empty() {
            let pc = header::field_word(&self.memory, HeaderField::InitialPC)? as usize;
            let f = Frame::new(pc, pc, &[], 0, &[], None, 0);
            self.frames.push(f);
        }

        Ok(())
    }

    // MMU - data reads stop at $FFFF, writes are guarded by the memory map
    pub fn read_byte(&self, address: usize) -> Result<u8, RuntimeError> {
        if address < 0x10000 {
            self.memory.read_byte(address)
        } else {
            fatal_error!(
                ErrorCode::PrintAtIllegalAddress,
                "Byte address {:#06x} is in high memory",
                address
            )
        }
    }

    pub fn read_word(&self, address: usize) -> Result<u16, RuntimeError> {
        if address < 0xFFFF {
            self.memory.read_word(address)
        } else {
            fatal_error!(
                ErrorCode::PrintAtIllegalAddress,
                "Word address {:#06x} is in high memory",
                address
            )
        }
    }

    pub fn write_byte(&mut self, address: usize, value: u8) -> Result<(), RuntimeError> {
        self.memory.write_byte(address, value)
    }

    pub fn write_word(&mut self, address: usize, value: u16) -> Result<(), RuntimeError> {
        self.memory.write_word(address, value)
    }

    pub fn checksum(&self) -> Result<u16, RuntimeError> {
        self.memory.checksum()
    }

    // Variables
    fn global_variable_address(&self, variable: u8) -> Result<usize, RuntimeError> {
        let table = header::field_word(&self.memory, HeaderField::GlobalTable)? as usize;
        let index = (variable as usize - 16) * 2;
        Ok(table + index)
    }

    /// Read a variable.
    ///
    /// Variable 0 pops the stack, 1-15 are frame locals, 16-255 are globals.
    ///
    /// # Arguments
    /// * `variable` - Variable number
    ///
    /// # Returns
    /// [Result] with the variable value or a [RuntimeError]
    pub fn variable(&mut self, variable: u8) -> Result<u16, RuntimeError> {
        if variable < 16 {
            self.current_frame_mut()?.local_variable(variable)
        } else {
            let address = self.global_variable_address(variable)?;
            self.read_word(address)
        }
    }

    /// Read a variable without popping the stack
    ///
    /// # Arguments
    /// * `variable` - Variable number
    pub fn peek_variable(&self, variable: u8) -> Result<u16, RuntimeError> {
        if variable < 16 {
            self.current_frame()?.peek_local_variable(variable)
        } else {
            let address = self.global_variable_address(variable)?;
            self.read_word(address)
        }
    }

    /// Set a variable.
    ///
    /// Variable 0 pushes onto the stack.
    ///
    /// # Arguments
    /// * `variable` - Variable number
    /// * `value` - Value to set
    pub fn set_variable(&mut self, variable: u8, value: u16) -> Result<(), RuntimeError> {
        debug!(target: "app::variable", "Set variable {:02x} to {:04x}", variable, value);
        if variable < 16 {
            self.current_frame_mut()?.set_local_variable(variable, value)
        } else {
            let address = self.global_variable_address(variable)?;
            self.write_word(address, value)
        }
    }

    /// Set a variable indirectly.
    ///
    /// Variable 0 replaces the top of the stack.
    ///
    /// # Arguments
    /// * `variable` - Variable number
    /// * `value` - Value to set
    pub fn set_variable_indirect(&mut self, variable: u8, value: u16) -> Result<(), RuntimeError> {
        debug!(target: "app::variable", "Set variable {:02x} to {:04x} (indirect)", variable, value);
        if variable < 16 {
            self.current_frame_mut()?
                .set_local_variable_indirect(variable, value)
        } else {
            let address = self.global_variable_address(variable)?;
            self.write_word(address, value)
        }
    }

    pub fn push(&mut self, value: u16) -> Result<(), RuntimeError> {
        self.current_frame_mut()?.set_local_variable(0, value)
    }

    /// Copy the (up to) 23 bytes an instruction may occupy, excluding any
    /// literal string
    pub fn instruction(&self, address: usize) -> Vec<u8> {
        // Opcode: up to 2 bytes
        // Operand types: up to 2 bytes
        // Operands: up to 16 bytes
        // Store variable: up to 1 byte
        // Branch offset: up to 2 bytes
        self.memory.slice(address, 23)
    }

    /// Decode a routine header
    ///
    /// # Arguments
    /// * `address` - Address of the routine header
    ///
    /// # Returns
    /// [Result] with the address of the first instruction and the default
    /// local variables, or a [RuntimeError]
    fn routine_header(&self, address: usize) -> Result<(usize, Vec<u16>), RuntimeError> {
        let variable_count = self.memory.read_byte(address)? as usize;
        if variable_count > 15 {
            return fatal_error!(
                ErrorCode::CallToNonRoutine,
                "Routine at ${:06x} has {} local variables",
                address,
                variable_count
            );
        }

        let (initial_pc, local_variables) = if self.version < 5 {
            let mut l = Vec::new();
            for i in 0..variable_count {
                let a = address + 1 + (i * 2);
                l.push(self.memory.read_word(a)?);
            }

            (address + 1 + (variable_count * 2), l)
        } else {
            (address + 1, vec![0; variable_count])
        };

        Ok((initial_pc, local_variables))
    }

    /// Read a literal string at an address
    ///
    /// # Arguments
    /// * `address` - Address of the start of the string
    ///
    /// # Returns
    /// [Result] with the string ztext words or a [RuntimeError]
    pub fn string_literal(&self, address: usize) -> Result<Vec<u16>, RuntimeError> {
        let mut d = Vec::new();
        // Read until bit 15 of the word is set
        loop {
            let w = self.memory.read_word(address + (d.len() * 2))?;
            d.push(w);
            if w & 0x8000 == 0x8000 {
                return Ok(d);
            }
        }
    }

    /// Unpack a routine address
    ///
    /// # Arguments
    /// * `address` - Packed address
    ///
    /// # Returns
    /// [Result] with the byte address or a [RuntimeError]
    pub fn packed_routine_address(&self, address: u16) -> Result<usize, RuntimeError> {
        match self.version {
            1 | 2 | 3 => Ok(address as usize * 2),
            4 | 5 => Ok(address as usize * 4),
            6 | 7 => Ok((address as usize * 4)
                + (header::field_word(&self.memory, HeaderField::RoutinesOffset)? as usize * 8)),
            8 => Ok(address as usize * 8),
            _ => fatal_error!(
                ErrorCode::UnsupportedVersion,
                "Unsupported version: {}",
                self.version
            ),
        }
    }

    /// Unpack a string address
    ///
    /// # Arguments
    /// * `address` - Packed address
    ///
    /// # Returns
    /// [Result] with the byte address or a [RuntimeError]
    pub fn packed_string_address(&self, address: u16) -> Result<usize, RuntimeError> {
        match self.version {
            1 | 2 | 3 => Ok(address as usize * 2),
            4 | 5 => Ok(address as usize * 4),
            6 | 7 => Ok((address as usize * 4)
                + (header::field_word(&self.memory, HeaderField::StringsOffset)? as usize * 8)),
            8 => Ok(address as usize * 8),
            _ => fatal_error!(
                ErrorCode::UnsupportedVersion,
                "Unsupported version: {}",
                self.version
            ),
        }
    }

    // Routines
    /// Call a routine.
    ///
    /// Calling address 0 stores FALSE and continues at the return address
    /// without pushing a frame.
    ///
    /// # Arguments
    /// * `address` - Routine header address
    /// * `arguments` - Routine arguments
    /// * `result` - [Option] with the [StoreResult] or [None] to discard
    /// * `return_address` - Address to resume at when the routine returns
    ///
    /// # Returns
    /// [Result] with the address of the next instruction to execute
    pub fn call_routine(
        &mut self,
        address: usize,
        arguments: &[u16],
        result: Option<StoreResult>,
        return_address: usize,
    ) -> Result<usize, RuntimeError> {
        if address == 0 {
            if let Some(r) = result {
                self.set_variable(r.variable(), 0)?;
            }
            Ok(return_address)
        } else {
            let (initial_pc, local_variables) = self.routine_header(address)?;
            let frame = Frame::call_routine(
                address,
                initial_pc,
                arguments,
                local_variables,
                result,
                return_address,
            );
            debug!(target: "app::frame", "Call ${:06x} with {} args => [{}]", address, arguments.len(), self.frames.len() + 1);
            self.frames.push(frame);

            Ok(initial_pc)
        }
    }

    /// Call an interrupt routine.
    ///
    /// The frame's return value is left in `interrupt_result` for the nested
    /// interpreter loop instead of being stored to a variable.
    ///
    /// # Arguments
    /// * `address` - Routine header address
    /// * `arguments` - Routine arguments
    /// * `return_address` - Address the interrupted instruction resumes at
    ///
    /// # Returns
    /// [Result] with the address of the first routine instruction
    pub fn call_interrupt(
        &mut self,
        address: usize,
        arguments: &[u16],
        return_address: usize,
    ) -> Result<usize, RuntimeError> {
        self.interrupt_result = None;
        let (initial_pc, local_variables) = self.routine_header(address)?;
        let frame = Frame::call_interrupt(
            address,
            initial_pc,
            arguments,
            local_variables,
            return_address,
        );
        debug!(target: "app::frame", "Interrupt call ${:06x} => [{}]", address, self.frames.len() + 1);
        self.frames.push(frame);

        Ok(initial_pc)
    }

    /// Return from the current routine
    ///
    /// # Arguments
    /// * `value` - Return value
    ///
    /// # Returns
    /// [Result] with the address of the next instruction to execute
    pub fn return_routine(&mut self, value: u16) -> Result<usize, RuntimeError> {
        if let Some(f) = self.frames.pop() {
            debug!(target: "app::frame", "Return {:04x} to ${:06x} => [{}]", value, f.return_address(), self.frames.len());
            if f.interrupt() {
                self.interrupt_result = Some(value);
            } else {
                let n = self.current_frame_mut()?;
                n.set_pc(f.return_address());
                if let Some(r) = f.result() {
                    self.set_variable(r.variable(), value)?;
                }
            }

            Ok(f.return_address())
        } else {
            fatal_error!(ErrorCode::StackUnderflow, "No frame to return from")
        }
    }

    /// Take the return value of the last completed interrupt routine
    pub fn take_interrupt_result(&mut self) -> Option<u16> {
        self.interrupt_result.take()
    }

    /// Is any live frame an interrupt routine?
    pub fn in_interrupt(&self) -> bool {
        self.frames.iter().any(|f| f.interrupt())
    }

    /// Unwind the call stack for THROW
    ///
    /// # Arguments
    /// * `depth` - Frame count to unwind to, from CATCH
    /// * `result` - Value to return from the unwound frame
    ///
    /// # Returns
    /// [Result] with the address of the next instruction to execute
    pub fn throw(&mut self, depth: u16, result: u16) -> Result<usize, RuntimeError> {
        if depth as usize > self.frames.len() || depth == 0 {
            return fatal_error!(
                ErrorCode::BadStackFrame,
                "THROW to frame {} of {}",
                depth,
                self.frames.len()
            );
        }
        self.frames.truncate(depth as usize);
        self.return_routine(result)
    }

    pub fn pc(&self) -> Result<usize, RuntimeError> {
        Ok(self.current_frame()?.pc())
    }

    pub fn set_pc(&mut self, pc: usize) -> Result<(), RuntimeError> {
        self.current_frame_mut()?.set_pc(pc);
        Ok(())
    }

    pub fn argument_count(&self) -> Result<u8, RuntimeError> {
        Ok(self.current_frame()?.argument_count())
    }

    // Save/Restore
    /// Build a Quetzal save state
    ///
    /// # Arguments
    /// * `pc` - Address of the save instruction's store/branch byte
    ///
    /// # Returns
    /// [Result] with the save file data or a [RuntimeError]
    pub fn save(&self, pc: usize) -> Result<Vec<u8>, RuntimeError> {
        let quetzal = Quetzal::try_from((self, pc))?;
        debug!(target: "app::quetzal", "Saving game state");
        Ok(Vec::from(&quetzal))
    }

    fn restore_state(&mut self, quetzal: Quetzal) -> Result<Option<usize>, RuntimeError> {
        // Reset the frame stack
        self.frames = quetzal.stks().stks().iter().map(Frame::from).collect();

        // Capture flags 2, default colors, rows, and columns from the header
        let flags2 = header::field_word(&self.memory, HeaderField::Flags2)?;
        let fg = header::field_byte(&self.memory, HeaderField::DefaultForeground)?;
        let bg = header::field_byte(&self.memory, HeaderField::DefaultBackground)?;
        let rows = header::field_byte(&self.memory, HeaderField::ScreenLines)?;
        let columns = header::field_byte(&self.memory, HeaderField::ScreenColumns)?;

        // Overwrite dynamic memory
        if let Some(umem) = quetzal.umem() {
            self.memory.restore(umem.data())?
        } else if let Some(cmem) = quetzal.cmem() {
            self.memory.restore_compressed(cmem.data())?
        } else {
            return recoverable_error!(ErrorCode::Restore, "No CMem/UMem chunk in save state");
        }

        // Re-initialize the interpreter-owned header fields
        self.initialize(rows, columns, (fg, bg), false)?;

        // Restore flags 2
        self.write_word(HeaderField::Flags2 as usize, flags2)?;

        // The undo chain's reference image no longer matches a live snapshot
        let dynamic = self.memory.dynamic().to_vec();
        self.undo.clear(&dynamic);

        Ok(Some(quetzal.ifhd().pc() as usize))
    }

    /// Restore a Quetzal save state.
    ///
    /// The save must have been made from the same release/serial/checksum.
    ///
    /// # Arguments
    /// * `data` - Save file data
    ///
    /// # Returns
    /// [Result] with the address to resume at, or a [RuntimeError]
    pub fn restore(&mut self, data: Vec<u8>) -> Result<Option<usize>, RuntimeError> {
        let quetzal = Quetzal::try_from(data)?;
        debug!(target: "app::quetzal", "Restoring game state");
        let ifhd = IFhd::try_from((&*self, 0))?;
        if &ifhd != quetzal.ifhd() {
            error!(target: "app::quetzal", "Save state was created from a different story file");
            recoverable_error!(
                ErrorCode::Restore,
                "Save state was created from a different story file"
            )
        } else {
            self.restore_state(quetzal)
        }
    }

    /// Record an undo snapshot
    ///
    /// # Arguments
    /// * `pc` - Address of the save_undo instruction's store byte
    ///
    /// # Returns
    /// `true` if the snapshot was recorded
    pub fn save_undo(&mut self, pc: usize) -> bool {
        let frames = self.frames.clone();
        let dynamic = self.memory.dynamic().to_vec();
        self.undo.save(pc, &frames, &dynamic)
    }

    /// Take back the most recent undo snapshot
    ///
    /// # Returns
    /// [Result] with the address to resume at, or [None] when no snapshot
    /// is available
    pub fn restore_undo(&mut self) -> Result<Option<usize>, RuntimeError> {
        match self.undo.restore() {
            Some((pc, frames, dynamic)) => {
                self.memory.restore(&dynamic)?;
                self.frames = frames;
                Ok(Some(pc))
            }
            None => {
                warn!(target: "app::state", "No saved state for undo");
                Ok(None)
            }
        }
    }

    /// Reload dynamic memory, clear the stack, and reset the PC
    ///
    /// # Returns
    /// [Result] with the address of the first instruction to execute
    pub fn restart(&mut self) -> Result<usize, RuntimeError> {
        // Capture flags 2, default colors, rows, and columns from the header
        let flags2 = header::field_word(&self.memory, HeaderField::Flags2)?;
        let fg = header::field_byte(&self.memory, HeaderField::DefaultForeground)?;
        let bg = header::field_byte(&self.memory, HeaderField::DefaultBackground)?;
        let rows = header::field_byte(&self.memory, HeaderField::ScreenLines)?;
        let columns = header::field_byte(&self.memory, HeaderField::ScreenColumns)?;

        self.memory.reset();
        self.frames.clear();

        self.initialize(rows, columns, (fg, bg), false)?;
        self.write_word(HeaderField::Flags2 as usize, flags2)?;

        let dynamic = self.memory.dynamic().to_vec();
        self.undo.clear(&dynamic);

        self.pc()
    }
}
