//! Output stream fan-out and input source switching
use std::{collections::VecDeque, fs::File, io::Write};

use crate::{
    config::Config,
    error::{ErrorCode, RuntimeError},
    recoverable_error,
};

use self::screen::{CellStyle, Color, InputEvent, Screen, Terminal};

use super::state::State;

pub mod screen;

/// Stream 3 redirect stack depth limit
const STREAM_3_DEPTH: usize = 16;

/// One level of stream 3 memory redirection
struct Stream3 {
    /// Table address the buffered text is written to on close
    address: usize,
    /// Optional line width for table formatting
    width: Option<u16>,
    /// Buffered characters
    buffer: Vec<u16>,
}

impl Stream3 {
    pub fn new(address: usize, width: Option<u16>) -> Stream3 {
        Stream3 {
            address,
            width,
            buffer: Vec::new(),
        }
    }

    pub fn address(&self) -> usize {
        self.address
    }

    pub fn width(&self) -> Option<u16> {
        self.width
    }

    pub fn buffer(&self) -> &Vec<u16> {
        &self.buffer
    }

    pub fn push(&mut self, c: u16) {
        self.buffer.push(c);
    }
}

/// Input source selection
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputSource {
    Keyboard,
    Replay,
}

/// Stream router: screen, transcript, memory redirect, command record,
/// and the keyboard/replay input switch
pub struct IO {
    version: u8,
    screen: Screen,
    /// Enabled output streams, bit N-1 for stream N
    output_streams: u8,
    /// Transcript file
    stream_2: Option<File>,
    /// Memory redirect stack
    stream_3: Vec<Stream3>,
    /// Command record file
    stream_4: Option<File>,
    /// Input source for subsequent reads
    input_source: InputSource,
    /// Queued replay input
    replay: VecDeque<u16>,
    buffered: bool,
}

impl IO {
    /// Constructor
    ///
    /// # Arguments
    /// * `version` - Story file version
    /// * `config` - Configuration
    /// * `terminal` - Host terminal
    pub fn new(
        version: u8,
        config: &Config,
        terminal: Box<dyn Terminal>,
    ) -> Result<IO, RuntimeError> {
        let screen = Screen::new(version, config, terminal)?;

        Ok(IO {
            version,
            screen,
            output_streams: 0x1,
            stream_2: None,
            stream_3: Vec::new(),
            stream_4: None,
            input_source: InputSource::Keyboard,
            replay: VecDeque::new(),
            buffered: true,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn rows(&self) -> u32 {
        self.screen.rows()
    }

    pub fn columns(&self) -> u32 {
        self.screen.columns()
    }

    pub fn default_colors(&self) -> (Color, Color) {
        self.screen.default_colors()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    // Output streams
    pub fn is_stream_2_open(&self) -> bool {
        self.stream_2.is_some()
    }

    pub fn set_stream_2(&mut self, file: File) {
        self.stream_2 = Some(file)
    }

    pub fn is_stream_4_open(&self) -> bool {
        self.stream_4.is_some()
    }

    pub fn set_stream_4(&mut self, file: File) {
        self.stream_4 = Some(file)
    }

    pub fn is_stream_enabled(&self, stream: u8) -> bool {
        let mask = (1 << (stream - 1)) & 0xF;
        self.output_streams & mask == mask
    }

    /// Enable an output stream
    ///
    /// # Arguments
    /// * `stream` - Stream number 1-4
    /// * `table` - Redirect table address, required for stream 3
    /// * `width` - Optional stream 3 line width
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn enable_output_stream(
        &mut self,
        stream: u8,
        table: Option<usize>,
        width: Option<u16>,
    ) -> Result<(), RuntimeError> {
        match stream {
            1 | 2 | 4 => {
                let mask = (1 << (stream - 1)) & 0xF;
                self.output_streams |= mask;
                debug!(target: "app::stream", "Enable output stream {} => {:04b}", stream, self.output_streams);
                Ok(())
            }
            3 => {
                if self.stream_3.len() == STREAM_3_DEPTH {
                    return recoverable_error!(
                        ErrorCode::Stream3NestingTooDeep,
                        "Stream 3 nested deeper than {}",
                        STREAM_3_DEPTH
                    );
                }
                if let Some(address) = table {
                    self.output_streams |= 0x4;
                    debug!(target: "app::stream", "Enable output stream 3 [{}] @ {:04x}", self.stream_3.len() + 1, address);
                    self.stream_3.push(Stream3::new(address, width));
                    Ok(())
                } else {
                    recoverable_error!(
                        ErrorCode::InvalidOutputStream,
                        "Stream 3 enabled without a table to write to"
                    )
                }
            }
            _ => recoverable_error!(
                ErrorCode::InvalidOutputStream,
                "Stream {} is not a valid stream [1..4]",
                stream
            ),
        }
    }

    /// Disable an output stream.
    ///
    /// Disabling stream 3 pops one redirect level and writes its buffer to
    /// the level's table: a word count, then the characters as bytes.
    ///
    /// # Arguments
    /// * `state` - Machine state, written for stream 3
    /// * `stream` - Stream number 1-4
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn disable_output_stream(
        &mut self,
        state: &mut State,
        stream: u8,
    ) -> Result<(), RuntimeError> {
        let mask = (1 << (stream - 1)) & 0xF;
        debug!(target: "app::stream", "Disable output stream {} => {:04b}", stream, self.output_streams);
        match stream {
            1 | 2 | 4 => {
                self.output_streams &= !mask;
                Ok(())
            }
            3 => {
                if let Some(s) = self.stream_3.pop() {
                    let len = s.buffer().len();
                    state.write_word(s.address(), len as u16)?;
                    for (i, c) in s.buffer().iter().enumerate() {
                        state.write_byte(s.address() + 2 + i, *c as u8)?;
                    }
                    if let Some(w) = s.width() {
                        debug!(target: "app::stream", "Stream 3 table width {} ignored", w);
                    }
                    if self.stream_3.is_empty() {
                        self.output_streams &= !mask;
                    }
                }
                Ok(())
            }
            _ => recoverable_error!(
                ErrorCode::InvalidOutputStream,
                "Stream {} is not a valid stream [1..4]",
                stream
            ),
        }
    }

    // Output
    /// Write text to the transcript file, if stream 2 is enabled
    pub fn transcript(&mut self, text: &[u16]) -> Result<(), RuntimeError> {
        if self.is_stream_enabled(2) {
            if let Some(f) = self.stream_2.as_mut() {
                let t: Vec<u8> = text
                    .iter()
                    .map(|c| if *c == 0x0d { 0x0a } else { *c as u8 })
                    .collect();
                if let Err(e) = f.write_all(&t) {
                    error!(target: "app::stream", "Error writing to transcript file: {}", e);
                }
                if let Err(e) = f.flush() {
                    error!(target: "app::stream", "Error flushing transcript file: {}", e);
                }
            } else {
                warn!(target: "app::stream", "Stream 2 is enabled but no file is open");
            }
        }

        Ok(())
    }

    /// Fan text out to the enabled output streams.
    ///
    /// An active stream 3 level captures the text exclusively; the screen
    /// and transcript see nothing.
    ///
    /// # Arguments
    /// * `text` - Text to print
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn print_vec(&mut self, text: &Vec<u16>) -> Result<(), RuntimeError> {
        if self.is_stream_enabled(3) {
            if let Some(s) = self.stream_3.last_mut() {
                for c in text {
                    if *c != 0 {
                        s.push(*c);
                    }
                }
            }
        } else {
            if self.is_stream_enabled(1) {
                self.screen.print(text);
            }
            self.transcript(text)?;
        }

        Ok(())
    }

    pub fn new_line(&mut self) -> Result<(), RuntimeError> {
        self.print_vec(&vec![0x0d])
    }

    /// Echo an input line to the command record file, if stream 4 is open
    ///
    /// # Arguments
    /// * `text` - Input text, without terminator
    pub fn record_input(&mut self, text: &[u16]) -> Result<(), RuntimeError> {
        if self.is_stream_enabled(4) {
            if let Some(f) = self.stream_4.as_mut() {
                let mut t: Vec<u8> = text.iter().map(|c| *c as u8).collect();
                t.push(0x0a);
                if let Err(e) = f.write_all(&t) {
                    error!(target: "app::stream", "Error writing to command file: {}", e);
                }
                if let Err(e) = f.flush() {
                    error!(target: "app::stream", "Error flushing command file: {}", e);
                }
            }
        }

        Ok(())
    }

    // Input
    pub fn input_source(&self) -> InputSource {
        self.input_source
    }

    /// Switch reads to the keyboard
    pub fn select_keyboard(&mut self) {
        debug!(target: "app::stream", "Input from keyboard");
        self.input_source = InputSource::Keyboard;
        self.replay.clear();
    }

    /// Switch reads to a replay script.
    ///
    /// Line endings are normalized to the ZSCII carriage return.  Reads
    /// fall back to the keyboard when the script runs dry.
    ///
    /// # Arguments
    /// * `data` - Command file contents
    pub fn select_replay(&mut self, data: &[u8]) {
        debug!(target: "app::stream", "Input from replay script: {} bytes", data.len());
        self.replay = data
            .iter()
            .filter(|b| **b != 0x0d)
            .map(|b| if *b == 0x0a { 0x0d } else { *b as u16 })
            .collect();
        self.input_source = InputSource::Replay;
    }

    /// Read one key from the current input source
    ///
    /// # Arguments
    /// * `wait` - Block until a key is available
    ///
    /// # Returns
    /// The [InputEvent]
    pub fn read_key(&mut self, wait: bool) -> InputEvent {
        if self.input_source == InputSource::Replay {
            match self.replay.pop_front() {
                Some(c) => {
                    if self.replay.is_empty() {
                        self.select_keyboard();
                    }
                    return InputEvent::from_char(c);
                }
                None => self.select_keyboard(),
            }
        }

        self.screen.read_key(wait)
    }

    pub fn backspace(&mut self) -> Result<(), RuntimeError> {
        self.screen.backspace()
    }

    // Screen control
    pub fn split_window(&mut self, lines: u16) -> Result<(), RuntimeError> {
        self.screen.split_window(lines as u32);
        Ok(())
    }

    pub fn set_window(&mut self, window: u16) -> Result<(), RuntimeError> {
        self.screen.select_window(window as u8)
    }

    pub fn erase_window(&mut self, window: i16) -> Result<(), RuntimeError> {
        self.screen.erase_window(window as i8)
    }

    pub fn erase_line(&mut self) -> Result<(), RuntimeError> {
        self.screen.erase_line();
        Ok(())
    }

    pub fn cursor(&self) -> (u32, u32) {
        self.screen.cursor()
    }

    pub fn set_cursor(&mut self, row: u16, column: u16) -> Result<(), RuntimeError> {
        self.screen.move_cursor(row as u32, column as u32);
        Ok(())
    }

    pub fn set_colors(&mut self, foreground: u16, background: u16) -> Result<(), RuntimeError> {
        self.screen.set_colors(foreground, background)
    }

    pub fn set_text_style(&mut self, style: u16) -> Result<(), RuntimeError> {
        self.screen.set_style(style as u8)
    }

    pub fn set_font(&mut self, font: u16) -> u16 {
        self.screen.set_font(font as u8) as u16
    }

    pub fn buffer_mode(&mut self, mode: u16) {
        self.buffered = mode != 0;
        self.screen.buffer_mode(mode);
    }

    pub fn beep(&mut self) -> Result<(), RuntimeError> {
        self.screen.beep();
        Ok(())
    }

    /// Print text at a fixed position, used for the V3 status line
    pub fn status_line(
        &mut self,
        left: &mut Vec<u16>,
        right: &mut Vec<u16>,
    ) -> Result<(), RuntimeError> {
        let columns = self.columns() as usize;

        let mut status = vec![0x20; columns];
        status[1..left.len() + 1].copy_from_slice(left);
        let rpos = columns - right.len() - 1;
        status[rpos..rpos + right.len()].copy_from_slice(right);

        let mut style = CellStyle::new();
        style.set(screen::Style::Reverse as u8);
        self.screen.print_at(&status, (1, 1), &style);
        self.screen.reset_cursor();
        Ok(())
    }

    pub fn quit(&mut self) {
        self.screen.quit();
    }
}
