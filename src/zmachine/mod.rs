//! The Z-Machine: memory, state, streams, and the instruction loop
use std::collections::HashSet;
use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::config::Config;
use crate::error::*;
use crate::files;
use crate::instruction::decoder;
use crate::instruction::processor;
use crate::instruction::StoreResult;
use crate::object::property;
use crate::recoverable_error;
use crate::text;

use self::io::screen::{InputEvent, Interrupt, Terminal};
use self::io::IO;
use self::rng::chacha_rng::ChaChaRng;
use self::rng::ZRng;
use self::state::header;
use self::state::header::{Flags1v3, HeaderField};
use self::state::memory::Memory;
use self::state::State;

pub mod io;
pub mod rng;
pub mod state;

/// What to do about recoverable runtime errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorHandling {
    /// Report every occurrence
    ContinueWarnAlways,
    /// Report the first occurrence of each error code, then suppress
    ContinueWarnOnce,
    /// Silently continue with the defined dummy result
    Ignore,
    /// Treat any recoverable error as fatal
    Abort,
}

pub struct ZMachine {
    /// Story name, used to build default file names
    name: String,
    /// Story file version
    version: u8,
    /// Runtime state: memory, frames, undo
    state: State,
    /// Output/input stream router
    io: IO,
    /// Random number generator
    rng: Box<dyn ZRng>,
    /// Error codes reported so far
    errors: HashSet<ErrorCode>,
    /// Recoverable error policy
    error_handling: ErrorHandling,
    /// Sound-finished interrupt routine address
    sound_interrupt: Option<usize>,
    /// Set by QUIT; checked after every instruction
    finished: bool,
}

impl ZMachine {
    /// Constructor
    ///
    /// # Arguments
    /// * `memory` - Story memory map
    /// * `config` - Configuration
    /// * `terminal` - Host terminal
    /// * `name` - Story name
    pub fn new(
        memory: Memory,
        config: Config,
        terminal: Box<dyn Terminal>,
        name: &str,
    ) -> Result<ZMachine, RuntimeError> {
        let version = memory.version();
        let rng = ChaChaRng::new();
        let error_handling = config.error_handling();
        let undo_slots = config.undo_slots();

        let io = IO::new(version, &config, terminal)?;
        let mut state = State::new(memory, undo_slots)?;

        let colors = io.default_colors();
        state.initialize(
            io.rows() as u8,
            io.columns() as u8,
            (colors.0 as u8, colors.1 as u8),
            true,
        )?;

        Ok(ZMachine {
            name: name.to_string(),
            version,
            state,
            io,
            rng: Box::new(rng),
            errors: HashSet::new(),
            error_handling,
            sound_interrupt: None,
            finished: false,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    // Error policy
    /// Report a recoverable error per the configured policy.
    ///
    /// Returns `Ok` when execution should continue with the caller's dummy
    /// result, `Err` when the error should abort the machine.
    ///
    /// # Arguments
    /// * `error` - The error
    ///
    /// # Returns
    /// Empty [Result] or the error, upgraded to fatal
    pub fn report_error(&mut self, error: RuntimeError) -> Result<(), RuntimeError> {
        if !error.is_recoverable() || self.error_handling == ErrorHandling::Abort {
            return Err(RuntimeError::fatal(error.code(), error.message().to_string()));
        }

        match self.error_handling {
            ErrorHandling::Ignore => {
                debug!(target: "app::state", "Continuing from: {}", error);
            }
            ErrorHandling::ContinueWarnAlways => {
                self.print_str(format!("\r[{}]\r", error.message()))?;
            }
            _ => {
                if !self.errors.contains(&error.code()) {
                    self.errors.insert(error.code());
                    self.print_str(format!(
                        "\r[{} (will only be reported once)]\r",
                        error.message()
                    ))?;
                }
            }
        }

        Ok(())
    }

    // Runtime state
    pub fn read_byte(&self, address: usize) -> Result<u8, RuntimeError> {
        self.state.read_byte(address)
    }

    pub fn read_word(&self, address: usize) -> Result<u16, RuntimeError> {
        self.state.read_word(address)
    }

    /// When the game toggles the Flags2 transcript bit, open or close the
    /// transcript stream to match
    fn update_transcript_bit(&mut self, old: u16, new: u16) -> Result<(), RuntimeError> {
        if old & 0x1 != new & 0x1 {
            if new & 0x1 == 0x1 {
                if !self.io.is_stream_2_open() {
                    if let Err(e) = self.start_stream_2() {
                        self.print_str(format!("Error starting transcript: {}\r", e))?;
                        return Ok(());
                    }
                }
                self.io.enable_output_stream(2, None, None)
            } else {
                self.io.disable_output_stream(&mut self.state, 2)
            }
        } else {
            Ok(())
        }
    }

    pub fn write_byte(&mut self, address: usize, value: u8) -> Result<(), RuntimeError> {
        if address == HeaderField::Flags2 as usize + 1 {
            let old = self.state.read_byte(address)? as u16;
            self.state.write_byte(address, value)?;
            self.update_transcript_bit(old, value as u16)
        } else {
            self.state.write_byte(address, value)
        }
    }

    pub fn write_word(&mut self, address: usize, value: u16) -> Result<(), RuntimeError> {
        if address == HeaderField::Flags2 as usize {
            let old = self.state.read_word(address)?;
            self.state.write_word(address, value)?;
            self.update_transcript_bit(old, value)
        } else {
            self.state.write_word(address, value)
        }
    }

    // Variables
    pub fn variable(&mut self, variable: u8) -> Result<u16, RuntimeError> {
        self.state.variable(variable)
    }

    pub fn peek_variable(&self, variable: u8) -> Result<u16, RuntimeError> {
        self.state.peek_variable(variable)
    }

    pub fn set_variable(&mut self, variable: u8, value: u16) -> Result<(), RuntimeError> {
        self.state.set_variable(variable, value)
    }

    pub fn set_variable_indirect(&mut self, variable: u8, value: u16) -> Result<(), RuntimeError> {
        self.state.set_variable_indirect(variable, value)
    }

    pub fn push(&mut self, value: u16) -> Result<(), RuntimeError> {
        self.state.push(value)
    }

    // Addresses and code
    pub fn string_literal(&self, address: usize) -> Result<Vec<u16>, RuntimeError> {
        self.state.string_literal(address)
    }

    pub fn packed_routine_address(&self, address: u16) -> Result<usize, RuntimeError> {
        self.state.packed_routine_address(address)
    }

    pub fn packed_string_address(&self, address: u16) -> Result<usize, RuntimeError> {
        self.state.packed_string_address(address)
    }

    pub fn instruction(&self, address: usize) -> Vec<u8> {
        self.state.instruction(address)
    }

    pub fn frame_count(&self) -> usize {
        self.state.frame_count()
    }

    pub fn argument_count(&self) -> Result<u8, RuntimeError> {
        self.state.argument_count()
    }

    pub fn header_byte(&self, field: HeaderField) -> Result<u8, RuntimeError> {
        header::field_byte(self.state.memory(), field)
    }

    pub fn header_word(&self, field: HeaderField) -> Result<u16, RuntimeError> {
        header::field_word(self.state.memory(), field)
    }

    pub fn checksum(&self) -> Result<u16, RuntimeError> {
        self.state.checksum()
    }

    /// Compare the calculated checksum to the header value
    pub fn verify(&self) -> Result<bool, RuntimeError> {
        Ok(self.header_word(HeaderField::Checksum)? == self.checksum()?)
    }

    // Routines
    pub fn call_routine(
        &mut self,
        address: usize,
        arguments: &[u16],
        result: Option<StoreResult>,
        return_address: usize,
    ) -> Result<usize, RuntimeError> {
        self.state
            .call_routine(address, arguments, result, return_address)
    }

    pub fn return_routine(&mut self, value: u16) -> Result<usize, RuntimeError> {
        self.state.return_routine(value)
    }

    pub fn throw(&mut self, depth: u16, result: u16) -> Result<usize, RuntimeError> {
        self.state.throw(depth, result)
    }

    pub fn pc(&self) -> Result<usize, RuntimeError> {
        self.state.pc()
    }

    pub fn set_pc(&mut self, pc: usize) -> Result<(), RuntimeError> {
        self.state.set_pc(pc)
    }

    /// Synchronously run an interrupt routine to completion.
    ///
    /// A frame flagged as an interrupt is pushed and the instruction loop
    /// re-entered until that frame returns; its return value is the result.
    /// This is how read timeouts, sound completion, and newline countdowns
    /// run game code in the middle of a blocked operation.
    ///
    /// # Arguments
    /// * `address` - Routine header address
    ///
    /// # Returns
    /// [Result] with the routine's return value or a [RuntimeError]
    pub fn interrupt_call(&mut self, address: usize) -> Result<u16, RuntimeError> {
        let depth = self.state.frame_count();
        // The interrupt frame's return address is the interrupted
        // instruction, so the final set_pc of the nested loop is a no-op
        // for the caller's frame
        let return_address = self.state.pc()?;
        let pc = self.state.call_interrupt(address, &[], return_address)?;
        self.state.set_pc(pc)?;

        while self.state.frame_count() > depth && !self.finished {
            self.execute_one()?;
        }

        Ok(self.state.take_interrupt_result().unwrap_or(0))
    }

    // RNG
    pub fn random(&mut self, range: u16) -> u16 {
        self.rng.random(range)
    }

    pub fn seed(&mut self, seed: u16) {
        self.rng.seed(seed)
    }

    pub fn predictable(&mut self, seed: u16) {
        self.rng.predictable(seed)
    }

    // Screen
    pub fn rows(&self) -> u16 {
        self.io.rows() as u16
    }

    pub fn columns(&self) -> u16 {
        self.io.columns() as u16
    }

    fn start_stream_2(&mut self) -> Result<(), RuntimeError> {
        let file = self.prompt_and_create("Transcript file name: ", "txt", false)?;
        self.io.set_stream_2(file);
        Ok(())
    }

    fn start_stream_4(&mut self) -> Result<(), RuntimeError> {
        let file = self.prompt_and_create("Command record file name: ", "rec", false)?;
        self.io.set_stream_4(file);
        Ok(())
    }

    /// Enable or disable an output stream
    ///
    /// # Arguments
    /// * `stream` - Stream number; negative disables
    /// * `table` - Stream 3 redirect table address
    /// * `width` - Stream 3 line width
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn output_stream(
        &mut self,
        stream: i16,
        table: Option<usize>,
        width: Option<u16>,
    ) -> Result<(), RuntimeError> {
        match stream {
            1 | 3 => self.io.enable_output_stream(stream as u8, table, width),
            2 => {
                header::set_flag2(self.state.memory_mut(), header::Flags2::Transcripting)?;
                if !self.io.is_stream_2_open() {
                    if let Err(e) = self.start_stream_2() {
                        self.print_str(format!("Error starting transcript: {}\r", e))?;
                        return Ok(());
                    }
                }
                self.io.enable_output_stream(2, None, None)
            }
            4 => {
                if !self.io.is_stream_4_open() {
                    if let Err(e) = self.start_stream_4() {
                        self.print_str(format!("Error starting command record: {}\r", e))?;
                        return Ok(());
                    }
                }
                self.io.enable_output_stream(4, None, None)
            }
            -2 => {
                header::clear_flag2(self.state.memory_mut(), header::Flags2::Transcripting)?;
                self.io.disable_output_stream(&mut self.state, 2)
            }
            -1 | -3 | -4 => self
                .io
                .disable_output_stream(&mut self.state, i16::abs(stream) as u8),
            _ => recoverable_error!(
                ErrorCode::InvalidOutputStream,
                "OUTPUT_STREAM stream {}",
                stream
            ),
        }
    }

    /// Switch the input source
    ///
    /// # Arguments
    /// * `stream` - 0 for the keyboard, 1 for a command replay file
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn input_stream(&mut self, stream: u16) -> Result<(), RuntimeError> {
        match stream {
            0 => {
                self.io.select_keyboard();
                Ok(())
            }
            1 => match self.prompt_and_read("Command file name: ", "rec") {
                Ok(data) => {
                    self.io.select_replay(&data);
                    Ok(())
                }
                Err(e) => {
                    self.print_str(format!("Error reading command file: {}\r", e))?;
                    Ok(())
                }
            },
            _ => recoverable_error!(ErrorCode::InvalidInput, "INPUT_STREAM stream {}", stream),
        }
    }

    /// Print text, fanning it out to the enabled output streams and firing
    /// any newline interrupt that counts down to 0
    ///
    /// # Arguments
    /// * `text` - Text to print
    pub fn print(&mut self, text: &Vec<u16>) -> Result<(), RuntimeError> {
        self.io.print_vec(text)?;
        if let Some(routine) = self.io.screen_mut().take_nl_interrupt() {
            let address = self.packed_routine_address(routine)?;
            self.interrupt_call(address)?;
        }

        Ok(())
    }

    pub fn print_str(&mut self, text: String) -> Result<(), RuntimeError> {
        self.print(&text.chars().map(|c| c as u16).collect())
    }

    pub fn new_line(&mut self) -> Result<(), RuntimeError> {
        self.print(&vec![0x0d])
    }

    pub fn split_window(&mut self, lines: u16) -> Result<(), RuntimeError> {
        self.io.split_window(lines)
    }

    pub fn set_window(&mut self, window: u16) -> Result<(), RuntimeError> {
        self.io.set_window(window)
    }

    pub fn erase_window(&mut self, window: i16) -> Result<(), RuntimeError> {
        self.io.erase_window(window)
    }

    pub fn erase_line(&mut self) -> Result<(), RuntimeError> {
        self.io.erase_line()
    }

    /// Draw the V3 status line: location, and score/turn or time
    pub fn status_line(&mut self) -> Result<(), RuntimeError> {
        let location = self.variable(16)? as usize;
        let name = property::short_name(self, location)?;
        let mut left = text::from_vec(self, &name, false)?;

        let mut right: Vec<u16> = if header::flag1(
            self.state.memory(),
            Flags1v3::StatusLineType as u8,
        )? == 1
        {
            let hours = self.variable(17)?;
            let minutes = self.variable(18)?;
            format!("{:2}:{:02}", hours, minutes)
        } else {
            let score = self.variable(17)? as i16;
            let moves = self.variable(18)?;
            format!("{:3}/{:4}", score, moves)
        }
        .chars()
        .map(|c| c as u16)
        .collect();

        self.io.status_line(&mut left, &mut right)
    }

    pub fn set_font(&mut self, font: u16) -> Result<u16, RuntimeError> {
        Ok(self.io.set_font(font))
    }

    pub fn set_text_style(&mut self, style: u16) -> Result<(), RuntimeError> {
        self.io.set_text_style(style)
    }

    pub fn cursor(&mut self) -> Result<(u16, u16), RuntimeError> {
        let c = self.io.cursor();
        Ok((c.0 as u16, c.1 as u16))
    }

    pub fn set_cursor(&mut self, row: u16, column: u16) -> Result<(), RuntimeError> {
        self.io.set_cursor(row, column)
    }

    pub fn buffer_mode(&mut self, mode: u16) -> Result<(), RuntimeError> {
        self.io.buffer_mode(mode);
        Ok(())
    }

    pub fn beep(&mut self) -> Result<(), RuntimeError> {
        self.io.beep()
    }

    pub fn set_colors(&mut self, foreground: u16, background: u16) -> Result<(), RuntimeError> {
        self.io.set_colors(foreground, background)
    }

    // Input
    fn now(&self, delay: Option<u16>) -> u128 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(t) => {
                if let Some(d) = delay {
                    t.as_millis() + d as u128
                } else {
                    t.as_millis()
                }
            }
            Err(e) => {
                error!(target: "app::input", "Error getting current system time: {}", e);
                0
            }
        }
    }

    fn mouse_data(&mut self, event: &InputEvent) -> Result<(), RuntimeError> {
        if let (Some(row), Some(column)) = (event.row(), event.column()) {
            debug!(target: "app::input", "Mouse coordinates {},{}", column, row);
            header::set_extension(self.state.memory_mut(), 1, column)?;
            header::set_extension(self.state.memory_mut(), 2, row)?;
        }

        Ok(())
    }

    /// Run the sound interrupt routine if a sound finished playing
    fn check_sound_interrupt(&mut self) -> Result<(), RuntimeError> {
        if self.sound_interrupt.is_some() && !self.io.screen().is_sound_playing() {
            if let Some(address) = self.sound_interrupt.take() {
                debug!(target: "app::sound", "Sound interrupt firing");
                self.interrupt_call(address)?;
            }
        }

        Ok(())
    }

    /// Read a single key.
    ///
    /// A timeout expiry runs the interrupt routine; a true result from it
    /// aborts the read.
    ///
    /// # Arguments
    /// * `timeout` - Timeout in milliseconds, 0 for none
    /// * `routine` - Timeout interrupt routine address
    ///
    /// # Returns
    /// [Result] with the [InputEvent], which is empty if the read was
    /// aborted, or a [RuntimeError]
    pub fn read_key(
        &mut self,
        timeout: u16,
        routine: Option<usize>,
    ) -> Result<InputEvent, RuntimeError> {
        let mut end = if timeout > 0 {
            self.now(Some(timeout))
        } else {
            0
        };

        loop {
            self.check_sound_interrupt()?;

            if end > 0 && self.now(None) > end {
                match routine {
                    Some(address) => {
                        if self.interrupt_call(address)? != 0 {
                            return Ok(InputEvent::no_input());
                        }
                        end = self.now(Some(timeout));
                        continue;
                    }
                    None => return Ok(InputEvent::from_interrupt(Interrupt::ReadTimeout)),
                }
            }

            let wait = end == 0 && self.sound_interrupt.is_none();
            let key = self.io.read_key(wait);

            if let Some(c) = key.zchar() {
                if c == 253 || c == 254 {
                    self.mouse_data(&key)?;
                }

                return Ok(key);
            }

            if !wait {
                thread::sleep(Duration::from_millis(10));
            }
        }
    }

    /// Read a line of input.
    ///
    /// Editing is limited to backspace.  A timeout expiry runs the
    /// interrupt routine; a true result from it aborts the read.
    ///
    /// # Arguments
    /// * `text` - Existing input to continue from
    /// * `len` - Maximum input length
    /// * `terminators` - Characters that end input
    /// * `timeout` - Timeout in milliseconds, 0 for none
    /// * `routine` - Timeout interrupt routine address
    ///
    /// # Returns
    /// [Result] with the input buffer and an aborted flag, or a
    /// [RuntimeError]
    pub fn read_line(
        &mut self,
        text: &[u16],
        len: usize,
        terminators: &[u16],
        timeout: u16,
        routine: Option<usize>,
    ) -> Result<(Vec<u16>, bool), RuntimeError> {
        let mut input_buffer = text.to_vec();

        let mut end = if timeout > 0 {
            self.now(Some(timeout))
        } else {
            0
        };

        loop {
            self.check_sound_interrupt()?;

            if end > 0 && self.now(None) > end {
                match routine {
                    Some(address) => {
                        if self.interrupt_call(address)? != 0 {
                            return Ok((Vec::new(), true));
                        }
                        end = self.now(Some(timeout));
                        continue;
                    }
                    None => return Ok((input_buffer, false)),
                }
            }

            let wait = end == 0 && self.sound_interrupt.is_none();
            let e = self.io.read_key(wait);
            match e.zchar() {
                Some(key) => {
                    if terminators.contains(&key)
                        || (terminators.contains(&255)
                            && ((129..155).contains(&key) || (252..255).contains(&key)))
                    {
                        if key == 254 || key == 253 {
                            self.mouse_data(&e)?;
                        }

                        input_buffer.push(key);
                        if key == 0x0d {
                            self.io.print_vec(&vec![key])?;
                        }
                        break;
                    } else if key == 0x08 {
                        if !input_buffer.is_empty() {
                            input_buffer.pop();
                            self.backspace()?;
                        }
                    } else if input_buffer.len() < len && (0x20..0x7f).contains(&key) {
                        input_buffer.push(key);
                        self.io.print_vec(&vec![key])?;
                    } else if input_buffer.len() >= len {
                        self.report_error(RuntimeError::recoverable(
                            ErrorCode::TextBufferOverflow,
                            format!("Input exceeds text buffer length {}", len),
                        ))?;
                    }
                }
                None => {
                    if !wait {
                        thread::sleep(Duration::from_millis(10));
                    }
                }
            }
        }

        // Echo the completed line to any command record file, without the
        // terminator
        let line = &input_buffer[..input_buffer.len().saturating_sub(1)];
        self.io.record_input(line)?;

        Ok((input_buffer, false))
    }

    pub fn backspace(&mut self) -> Result<(), RuntimeError> {
        self.io.backspace()
    }

    // Sound
    pub fn play_sound(
        &mut self,
        effect: u16,
        volume: u8,
        repeats: u8,
        routine: Option<usize>,
    ) -> Result<(), RuntimeError> {
        self.sound_interrupt = routine;
        self.io.screen_mut().play_sound(effect, volume, repeats);
        Ok(())
    }

    pub fn stop_sound(&mut self) -> Result<(), RuntimeError> {
        self.sound_interrupt = None;
        self.io.screen_mut().stop_sound();
        Ok(())
    }

    // File prompts
    /// Prompt for a file name, suggesting a default
    ///
    /// # Arguments
    /// * `prompt` - Prompt text
    /// * `suffix` - File extension
    /// * `overwrite` - Allow an existing file to be chosen
    /// * `first` - Suggest the first free name instead of the last used
    ///
    /// # Returns
    /// [Result] with the file name or a [RuntimeError]
    pub fn prompt_filename(
        &mut self,
        prompt: &str,
        suffix: &str,
        overwrite: bool,
        first: bool,
    ) -> Result<String, RuntimeError> {
        self.print_str(prompt.to_string())?;
        let n = if first {
            files::first_available(&self.name, suffix)?
        } else {
            files::last_existing(&self.name, suffix)?
        };

        self.print(&n)?;

        let (f, _) = self.read_line(&n, 32, &['\r' as u16], 0, None)?;
        let filename = match String::from_utf16(&f) {
            Ok(s) => s.trim().to_string(),
            Err(e) => {
                return recoverable_error!(
                    ErrorCode::InvalidInput,
                    "Error parsing user input: {}",
                    e
                )
            }
        };

        if !overwrite {
            match Path::new(&filename).try_exists() {
                Ok(true) => {
                    return recoverable_error!(
                        ErrorCode::InvalidInput,
                        "'{}' already exists",
                        filename
                    )
                }
                Ok(false) => {}
                Err(e) => {
                    return recoverable_error!(
                        ErrorCode::InvalidInput,
                        "Error checking if '{}' exists: {}",
                        filename,
                        e
                    )
                }
            }
        }

        files::check_filename(&filename)?;
        Ok(filename)
    }

    /// Prompt for a file name and create the file
    pub fn prompt_and_create(
        &mut self,
        prompt: &str,
        suffix: &str,
        overwrite: bool,
    ) -> Result<File, RuntimeError> {
        match self.prompt_filename(prompt, suffix, overwrite, true) {
            Ok(filename) => match fs::OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(filename.trim())
            {
                Ok(f) => Ok(f),
                Err(e) => recoverable_error!(ErrorCode::Save, "{}", e),
            },
            Err(e) => {
                self.print_str(format!("Error creating file: {}\r", e))?;
                Err(e)
            }
        }
    }

    /// Prompt for a file name and write data to it
    pub fn prompt_and_write(
        &mut self,
        prompt: &str,
        suffix: &str,
        data: &[u8],
        overwrite: bool,
    ) -> Result<(), RuntimeError> {
        let mut file = self.prompt_and_create(prompt, suffix, overwrite)?;

        if let Err(e) = file.write_all(data) {
            return recoverable_error!(ErrorCode::Save, "{}", e);
        }
        if let Err(e) = file.flush() {
            return recoverable_error!(ErrorCode::Save, "{}", e);
        }

        Ok(())
    }

    /// Prompt for a file name and read its contents
    pub fn prompt_and_read(&mut self, prompt: &str, suffix: &str) -> Result<Vec<u8>, RuntimeError> {
        let filename = self.prompt_filename(prompt, suffix, true, false)?;
        let mut data = Vec::new();
        match File::open(filename.trim()) {
            Ok(mut file) => match file.read_to_end(&mut data) {
                Ok(_) => Ok(data),
                Err(e) => recoverable_error!(ErrorCode::Restore, "{}", e),
            },
            Err(e) => recoverable_error!(ErrorCode::Restore, "{}", e),
        }
    }

    // Save/restore/undo
    /// Save the machine state via a file prompt.
    ///
    /// Saving is not allowed while an interrupt routine is live.
    ///
    /// # Arguments
    /// * `pc` - Address of the save instruction's branch/store byte
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn save(&mut self, pc: usize) -> Result<(), RuntimeError> {
        if self.state.in_interrupt() {
            return recoverable_error!(
                ErrorCode::SaveDuringInterrupt,
                "Can't save while in an interrupt routine"
            );
        }

        let save_data = self.state.save(pc)?;
        self.prompt_and_write("Save to: ", "ifzs", &save_data, false)
    }

    /// Restore a saved machine state via a file prompt
    ///
    /// # Returns
    /// [Result] with the address to resume at or a [RuntimeError]
    pub fn restore(&mut self) -> Result<Option<usize>, RuntimeError> {
        let data = self.prompt_and_read("Restore from: ", "ifzs")?;
        self.state.restore(data)
    }

    /// Record an in-memory undo snapshot
    ///
    /// # Arguments
    /// * `pc` - Address of the save_undo instruction's store byte
    ///
    /// # Returns
    /// `true` if the snapshot was recorded
    pub fn save_undo(&mut self, pc: usize) -> Result<bool, RuntimeError> {
        if self.state.in_interrupt() {
            return recoverable_error!(
                ErrorCode::SaveDuringInterrupt,
                "Can't save undo while in an interrupt routine"
            );
        }

        Ok(self.state.save_undo(pc))
    }

    /// Take back the most recent undo snapshot
    ///
    /// # Returns
    /// [Result] with the address to resume at, or [None] when no snapshot
    /// is available
    pub fn restore_undo(&mut self) -> Result<Option<usize>, RuntimeError> {
        self.state.restore_undo()
    }

    /// Reload dynamic memory and restart execution from the beginning
    pub fn restart(&mut self) -> Result<usize, RuntimeError> {
        self.io.screen_mut().reset();
        self.state.restart()
    }

    /// Stop the machine: print a farewell, wait for a key, and release the
    /// host
    pub fn quit(&mut self) -> Result<(), RuntimeError> {
        self.finished = true;
        self.print_str("Press any key to exit".to_string())?;
        self.read_key(0, None)?;
        self.io.quit();
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode and execute the instruction at the PC.
    ///
    /// A recoverable error is routed through the error policy; when play
    /// continues, the PC moves to the next instruction in sequence.
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    fn execute_one(&mut self) -> Result<(), RuntimeError> {
        let pc = self.state.pc()?;
        let instruction = decoder::decode_instruction(self, pc)?;
        match processor::dispatch(self, &instruction) {
            Ok(next) => self.state.set_pc(next),
            Err(e) => {
                self.report_error(e)?;
                self.state.set_pc(instruction.next_address())
            }
        }
    }

    /// Run the machine until it quits
    ///
    /// # Returns
    /// Empty [Result] when the story quits or a fatal [RuntimeError]
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        let mut n = 1u64;
        loop {
            log_mdc::insert("instruction_count", format!("{:8x}", n));
            let pc = self.state.pc()?;
            let instruction = decoder::decode_instruction(self, pc)?;
            match processor::dispatch(self, &instruction) {
                Ok(next) => {
                    if self.finished {
                        return Ok(());
                    }
                    self.state.set_pc(next)?;
                }
                Err(e) => {
                    if self.finished {
                        return Ok(());
                    }
                    self.report_error(e)?;
                    self.state.set_pc(instruction.next_address())?;
                }
            }
            n += 1;
        }
    }
}
