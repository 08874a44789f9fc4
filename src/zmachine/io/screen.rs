//! Screen model: eight window records, cursor and style state, and the
//! [Terminal] trait the host implements
use crate::config::Config;
use crate::error::*;
use crate::recoverable_error;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Color {
    Black = 2,
    Red = 3,
    Green = 4,
    Yellow = 5,
    Blue = 6,
    Magenta = 7,
    Cyan = 8,
    White = 9,
}

/// 15-bit true-colour equivalents of the standard colors
///
/// # Arguments
/// * `color` - Color code (2-9)
///
/// # Returns
/// True-colour word
pub fn true_color(color: u8) -> u16 {
    match color {
        2 => 0x0000, // black
        3 => 0x001D, // red
        4 => 0x0340, // green
        5 => 0x03BD, // yellow
        6 => 0x59A0, // blue
        7 => 0x7C1F, // magenta
        8 => 0x77A0, // cyan
        _ => 0x7FFF, // white
    }
}

/// Background colour code meaning "don't paint"
pub const TRANSPARENT: u8 = 15;

pub enum Style {
    Roman = 0,
    Reverse = 1,
    Bold = 2,
    Italic = 4,
    Fixed = 8,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CellStyle {
    mask: u8,
}

impl Default for CellStyle {
    fn default() -> Self {
        CellStyle::new()
    }
}

impl CellStyle {
    pub fn new() -> CellStyle {
        CellStyle { mask: 0 }
    }

    /// Apply a style; 0 (Roman) clears all styles
    pub fn set(&mut self, style: u8) {
        match style {
            0 => self.mask = 0,
            _ => self.mask |= style & 0xf,
        }
    }

    pub fn clear(&mut self, style: u8) {
        let mask = !(style & 0xF);
        self.mask &= mask;
    }

    pub fn is_style(&self, style: Style) -> bool {
        let s = style as u8;
        self.mask & s == s
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum Interrupt {
    ReadTimeout,
    Sound,
}

#[derive(Debug, Default, Eq, PartialEq)]
pub struct InputEvent {
    zchar: Option<u16>,
    row: Option<u16>,
    column: Option<u16>,
    interrupt: Option<Interrupt>,
}

impl InputEvent {
    pub fn no_input() -> InputEvent {
        InputEvent::default()
    }

    pub fn from_char(zchar: u16) -> InputEvent {
        InputEvent {
            zchar: Some(zchar),
            ..Default::default()
        }
    }

    pub fn from_mouse(zchar: u16, row: u16, column: u16) -> InputEvent {
        InputEvent {
            zchar: Some(zchar),
            row: Some(row),
            column: Some(column),
            ..Default::default()
        }
    }

    pub fn from_interrupt(interrupt: Interrupt) -> InputEvent {
        InputEvent {
            interrupt: Some(interrupt),
            ..Default::default()
        }
    }

    pub fn zchar(&self) -> Option<u16> {
        self.zchar
    }

    pub fn row(&self) -> Option<u16> {
        self.row
    }

    pub fn column(&self) -> Option<u16> {
        self.column
    }

    pub fn interrupt(&self) -> Option<&Interrupt> {
        self.interrupt.as_ref()
    }
}

fn map_color(color: u8) -> Result<Color, RuntimeError> {
    match color {
        2 => Ok(Color::Black),
        3 => Ok(Color::Red),
        4 => Ok(Color::Green),
        5 => Ok(Color::Yellow),
        6 => Ok(Color::Blue),
        7 => Ok(Color::Magenta),
        8 => Ok(Color::Cyan),
        9 => Ok(Color::White),
        _ => recoverable_error!(ErrorCode::Interpreter, "Invalid color {}", color),
    }
}

fn map_colors(foreground: u8, background: u8) -> Result<(Color, Color), RuntimeError> {
    Ok((map_color(foreground)?, map_color(background)?))
}

/// The host boundary: everything the core asks of its embedder.
///
/// Coordinates are 1-based (row, column) pairs.
pub trait Terminal {
    /// Screen size as (rows, columns)
    fn size(&self) -> (u32, u32);
    /// Put a character at a position with style and colors
    fn print_at(
        &mut self,
        zchar: u16,
        row: u32,
        column: u32,
        colors: (Color, Color),
        style: &CellStyle,
        font: u8,
    );
    /// Flush any buffered output to the display
    fn flush(&mut self);
    /// Read a key; when `wait` is false, return [InputEvent::no_input]
    /// immediately if no key is pending
    fn read_key(&mut self, wait: bool) -> InputEvent;
    /// Scroll the region from `row` to the bottom of the screen up one line
    fn scroll(&mut self, row: u32);
    /// Erase the character at a position
    fn backspace(&mut self, at: (u32, u32));
    /// Sound a bell
    fn beep(&mut self);
    /// Move the visible cursor
    fn move_cursor(&mut self, at: (u32, u32));
    /// Start playing a sound sample
    fn play_sound(&mut self, effect: u16, volume: u8, repeats: u8);
    /// Stop any playing sound
    fn stop_sound(&mut self);
    /// Is a sound currently playing?
    fn is_sound_playing(&self) -> bool {
        false
    }
    /// Restore the display to its initial state
    fn reset(&mut self);
    /// Tear the display down for interpreter exit
    fn quit(&mut self);
    fn set_colors(&mut self, colors: (Color, Color));
    // Below are hooks used by the test terminal as part of unit testing
    fn split_window(&mut self, _lines: u32) {}
    fn set_window(&mut self, _window: u8) {}
    fn erase_window(&mut self, _window: i8) {}
    fn erase_line(&mut self) {}
    fn set_style(&mut self, _style: u8) {}
    fn buffer_mode(&mut self, _mode: u16) {}
    fn output_stream(&mut self, _stream: u8, _table: Option<usize>) {}
}

/// One window record.
///
/// Fields 0-15 are addressable by number via the window-property opcodes.
/// Cursor and position coordinates are absolute, 1-based screen units.
#[derive(Clone, Copy, Debug)]
pub struct Window {
    /// 0: top row
    y_pos: u16,
    /// 1: left column
    x_pos: u16,
    /// 2: height in rows
    y_size: u16,
    /// 3: width in columns
    x_size: u16,
    /// 4: cursor row
    y_cursor: u16,
    /// 5: cursor column
    x_cursor: u16,
    /// 6: left margin
    left: u16,
    /// 7: right margin
    right: u16,
    /// 8: newline interrupt routine (packed address)
    nl_routine: u16,
    /// 9: newline countdown
    nl_countdown: u16,
    /// 10: text style mask
    style: u16,
    /// 11: colour word, background in the high byte
    colour: u16,
    /// 12: font number
    font: u16,
    /// 13: font size
    font_size: u16,
    /// 14: attributes
    attributes: u16,
    /// 15: line count for pagination
    line_count: u16,
}

impl Window {
    fn new(colour: u16) -> Window {
        Window {
            y_pos: 1,
            x_pos: 1,
            y_size: 0,
            x_size: 0,
            y_cursor: 1,
            x_cursor: 1,
            left: 0,
            right: 0,
            nl_routine: 0,
            nl_countdown: 0,
            style: 0,
            colour,
            font: 1,
            font_size: 0x0101,
            attributes: 0,
            line_count: 0,
        }
    }

    /// Read a window property by number.
    ///
    /// Properties 16 and 17 are the true-colour translations of the colour
    /// word; 17 reports the transparency sentinel for a transparent
    /// background.
    ///
    /// # Arguments
    /// * `property` - Property number (0-17)
    ///
    /// # Returns
    /// [Result] with the property value or a [RuntimeError]
    pub fn property(&self, property: u16) -> Result<u16, RuntimeError> {
        match property {
            0 => Ok(self.y_pos),
            1 => Ok(self.x_pos),
            2 => Ok(self.y_size),
            3 => Ok(self.x_size),
            4 => Ok(self.y_cursor),
            5 => Ok(self.x_cursor),
            6 => Ok(self.left),
            7 => Ok(self.right),
            8 => Ok(self.nl_routine),
            9 => Ok(self.nl_countdown),
            10 => Ok(self.style),
            11 => Ok(self.colour),
            12 => Ok(self.font),
            13 => Ok(self.font_size),
            14 => Ok(self.attributes),
            15 => Ok(self.line_count),
            16 => Ok(true_color(self.colour as u8)),
            17 => {
                let bg = (self.colour >> 8) as u8;
                if bg == TRANSPARENT as u8 {
                    // -4 signals a transparent background
                    Ok(0xFFFC)
                } else {
                    Ok(true_color(bg))
                }
            }
            _ => recoverable_error!(
                ErrorCode::IllegalWindowProperty,
                "Read of window property {}",
                property
            ),
        }
    }

    /// Set a window property by number.
    ///
    /// Only the direct fields 0-15 may be written.
    ///
    /// # Arguments
    /// * `property` - Property number (0-15)
    /// * `value` - New value
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn set_property(&mut self, property: u16, value: u16) -> Result<(), RuntimeError> {
        match property {
            0 => self.y_pos = value,
            1 => self.x_pos = value,
            2 => self.y_size = value,
            3 => self.x_size = value,
            4 => self.y_cursor = value,
            5 => self.x_cursor = value,
            6 => self.left = value,
            7 => self.right = value,
            8 => self.nl_routine = value,
            9 => self.nl_countdown = value,
            10 => self.style = value,
            11 => self.colour = value,
            12 => self.font = value,
            13 => self.font_size = value,
            14 => self.attributes = value,
            15 => self.line_count = value,
            _ => {
                return recoverable_error!(
                    ErrorCode::IllegalWindowProperty,
                    "Write of window property {}",
                    property
                )
            }
        }

        Ok(())
    }
}

/// Screen state: the window records and current text attributes
pub struct Screen {
    version: u8,
    rows: u32,
    columns: u32,
    /// Top row available to the windows (1, or 2 in V3 for the status line)
    top: u32,
    /// The eight window records
    windows: [Window; 8],
    /// Is the screen split (does window 1 exist)?
    split: bool,
    /// The current window, almost always 0 or 1
    selected_window: u8,
    // foreground, background
    default_colors: (Color, Color),
    current_colors: (Color, Color),
    current_style: CellStyle,
    font: u8,
    terminal: Box<dyn Terminal>,
    lines_since_input: u32,
    /// Newline interrupt routine that has counted down to 0, if any
    pending_nl_interrupt: Option<u16>,
}

impl Screen {
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
    ) -> Result<Screen, RuntimeError> {
        let (rows, columns) = terminal.as_ref().size();
        let colors = map_colors(config.foreground(), config.background())?;
        let colour_word = ((config.background() as u16) << 8) | config.foreground() as u16;
        let top = if version < 4 { 2 } else { 1 };

        let mut windows = [Window::new(colour_word); 8];
        // Window 0 fills the screen below the V3 status line
        windows[0].y_pos = top as u16;
        windows[0].y_size = (rows + 1 - top) as u16;
        windows[0].x_size = columns as u16;
        // V4 keeps the lower-window cursor at the bottom of the screen
        windows[0].y_cursor = if version > 4 { top as u16 } else { rows as u16 };

        Ok(Screen {
            version,
            rows,
            columns,
            top,
            windows,
            split: false,
            selected_window: 0,
            default_colors: colors,
            current_colors: colors,
            current_style: CellStyle::new(),
            font: 1,
            terminal,
            lines_since_input: 0,
            pending_nl_interrupt: None,
        })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn cursor(&self) -> (u32, u32) {
        let w = &self.windows[self.selected_window as usize];
        (w.y_cursor as u32, w.x_cursor as u32)
    }

    pub fn default_colors(&self) -> (Color, Color) {
        self.default_colors
    }

    pub fn selected_window(&self) -> u8 {
        self.selected_window
    }

    /// Get a window record
    ///
    /// # Arguments
    /// * `window` - Window number 0-7
    pub fn window(&self, window: usize) -> Result<&Window, RuntimeError> {
        if window < 8 {
            Ok(&self.windows[window])
        } else {
            recoverable_error!(ErrorCode::IllegalWindow, "Window {}", window)
        }
    }

    /// Get a mutable window record
    ///
    /// # Arguments
    /// * `window` - Window number 0-7
    pub fn window_mut(&mut self, window: usize) -> Result<&mut Window, RuntimeError> {
        if window < 8 {
            Ok(&mut self.windows[window])
        } else {
            recoverable_error!(ErrorCode::IllegalWindow, "Window {}", window)
        }
    }

    /// Take any newline interrupt whose countdown has expired
    pub fn take_nl_interrupt(&mut self) -> Option<u16> {
        self.pending_nl_interrupt.take()
    }

    fn window_0_top(&self) -> u32 {
        self.windows[0].y_pos as u32
    }

    fn window_1_bottom(&self) -> u32 {
        (self.windows[1].y_pos + self.windows[1].y_size - 1) as u32
    }

    /// Move the cursor of the current window, clamping to its bounds
    ///
    /// # Arguments
    /// * `row` - New cursor row
    /// * `column` - New cursor column
    pub fn move_cursor(&mut self, row: u32, column: u32) {
        // Constrain the column between 1 and the width of the screen
        let c = u32::max(1, u32::min(self.columns, column));
        let r = if self.selected_window == 0 {
            // Constrain row between the top of window 0 and the screen bottom
            u32::max(self.window_0_top(), u32::min(self.rows, row))
        } else {
            u32::max(self.windows[1].y_pos as u32, u32::min(self.window_1_bottom(), row))
        };
        let w = &mut self.windows[self.selected_window as usize];
        w.y_cursor = r as u16;
        w.x_cursor = c as u16;
        self.terminal.move_cursor((r, c));
    }

    fn map_color(&self, color: u8, current: Color, default: Color) -> Result<Color, RuntimeError> {
        match color {
            0 => Ok(current),
            1 => Ok(default),
            2 => Ok(Color::Black),
            3 => Ok(Color::Red),
            4 => Ok(Color::Green),
            5 => Ok(Color::Yellow),
            6 => Ok(Color::Blue),
            7 => Ok(Color::Magenta),
            8 => Ok(Color::Cyan),
            9 => Ok(Color::White),
            _ => recoverable_error!(ErrorCode::Interpreter, "Invalid color {}", color),
        }
    }

    /// Set the current text colors.
    ///
    /// Color 0 keeps the current color, 1 restores the default.
    ///
    /// # Arguments
    /// * `foreground` - Foreground color code
    /// * `background` - Background color code
    pub fn set_colors(&mut self, foreground: u16, background: u16) -> Result<(), RuntimeError> {
        self.current_colors = (
            self.map_color(foreground as u8, self.current_colors.0, self.default_colors.0)?,
            self.map_color(background as u8, self.current_colors.1, self.default_colors.1)?,
        );
        let colour_word =
            ((self.current_colors.1 as u16) << 8) | (self.current_colors.0 as u16);
        self.windows[self.selected_window as usize].colour = colour_word;
        self.terminal.set_colors(self.current_colors);
        Ok(())
    }

    /// Split the screen: window 1 takes `lines` rows at the top, window 0
    /// the rest.  A cursor stranded outside its window's new bounds is
    /// pulled back inside.
    ///
    /// # Arguments
    /// * `lines` - Rows for the upper window; 0 removes the split
    pub fn split_window(&mut self, lines: u32) {
        if lines == 0 {
            return self.unsplit_window();
        }

        // The upper window always leaves at least one row below the split
        let lines = u32::min(lines, self.rows - self.top);
        let bottom = self.top + lines - 1;
        self.windows[1].y_pos = self.top as u16;
        self.windows[1].y_size = lines as u16;
        self.windows[1].x_pos = 1;
        self.windows[1].x_size = self.columns as u16;
        self.windows[1].y_cursor = self.top as u16;
        self.windows[1].x_cursor = 1;

        self.windows[0].y_pos = (bottom + 1) as u16;
        self.windows[0].y_size = (self.rows - bottom) as u16;
        // Clamp a stranded lower-window cursor back into the window
        if (self.windows[0].y_cursor as u32) < bottom + 1 {
            self.windows[0].y_cursor = (bottom + 1) as u16;
            self.windows[0].x_cursor = 1;
        }
        // In V3 the upper window is cleared on split
        if self.version == 3 {
            for i in self.top..=bottom {
                for j in 1..=self.columns {
                    self.terminal
                        .print_at(0x20, i, j, self.current_colors, &CellStyle::new(), 1);
                }
            }
        }

        self.split = true;
        self.terminal.split_window(lines);
    }

    /// Remove the screen split
    pub fn unsplit_window(&mut self) {
        self.windows[0].y_pos = self.top as u16;
        self.windows[0].y_size = (self.rows + 1 - self.top) as u16;
        self.windows[1].y_size = 0;
        self.split = false;
        self.selected_window = 0;
        self.terminal.split_window(0);
    }

    /// Select the current window
    ///
    /// # Arguments
    /// * `window` - Window number; 1 requires the screen to be split
    pub fn select_window(&mut self, window: u8) -> Result<(), RuntimeError> {
        self.lines_since_input = 0;
        self.terminal.set_window(window);
        if window == 0 {
            self.selected_window = 0;
            Ok(())
        } else if window == 1 && self.split {
            self.selected_window = 1;
            // Selecting the upper window homes its cursor
            self.windows[1].y_cursor = self.windows[1].y_pos;
            self.windows[1].x_cursor = 1;
            Ok(())
        } else {
            recoverable_error!(ErrorCode::IllegalWindow, "Select window {}", window)
        }
    }

    fn clear_rows(&mut self, start: u32, end: u32) {
        for i in start..=end {
            for j in 1..=self.columns {
                self.terminal
                    .print_at(0x20, i, j, self.current_colors, &CellStyle::new(), 1);
            }
        }
    }

    /// Erase a window to the current background.
    ///
    /// Window -1 removes the split and clears the screen; -2 clears the
    /// screen without unsplitting.
    ///
    /// # Arguments
    /// * `window` - Window number, -1, or -2
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn erase_window(&mut self, window: i8) -> Result<(), RuntimeError> {
        self.terminal.erase_window(window);
        match window {
            0 => {
                self.clear_rows(self.window_0_top(), self.rows);
                self.windows[0].y_cursor = if self.version == 4 {
                    self.rows as u16
                } else {
                    self.windows[0].y_pos
                };
                self.windows[0].x_cursor = 1;
                self.lines_since_input = 0;
                Ok(())
            }
            1 => {
                if self.split {
                    let (start, end) = (self.windows[1].y_pos as u32, self.window_1_bottom());
                    self.clear_rows(start, end);
                    self.windows[1].y_cursor = start as u16;
                    self.windows[1].x_cursor = 1;
                }
                Ok(())
            }
            -1 => {
                self.unsplit_window();
                self.clear_rows(self.window_0_top(), self.rows);
                self.windows[0].y_cursor = if self.version == 4 {
                    self.rows as u16
                } else {
                    self.windows[0].y_pos
                };
                self.windows[0].x_cursor = 1;
                self.lines_since_input = 0;
                Ok(())
            }
            -2 => {
                self.clear_rows(1, self.rows);
                if self.split {
                    self.windows[1].y_cursor = self.windows[1].y_pos;
                    self.windows[1].x_cursor = 1;
                }
                self.windows[0].y_cursor = if self.version == 4 {
                    self.rows as u16
                } else {
                    self.windows[0].y_pos
                };
                self.windows[0].x_cursor = 1;
                self.lines_since_input = 0;
                Ok(())
            }
            _ => recoverable_error!(ErrorCode::IllegalWindow, "ERASE_WINDOW window {}", window),
        }
    }

    /// Erase from the cursor to the end of the current line
    pub fn erase_line(&mut self) {
        self.terminal.erase_line();
        let (row, col) = self.cursor();
        for i in col..=self.columns {
            self.terminal
                .print_at(0x20, row, i, self.current_colors, &CellStyle::new(), 1);
        }
    }

    fn next_line(&mut self) {
        self.lines_since_input += 1;
        self.windows[0].line_count += 1;
        if self.windows[0].y_cursor as u32 == self.rows {
            self.terminal.scroll(self.window_0_top());
            self.windows[0].y_cursor = self.rows as u16;
        } else {
            self.windows[0].y_cursor += 1;
        }
        self.windows[0].x_cursor = 1;

        let l = self.rows - self.window_0_top();
        if self.lines_since_input >= l {
            let reverse = self.current_style.is_style(Style::Reverse);
            self.current_style.set(Style::Reverse as u8);
            self.print(&"[MORE]".chars().map(|c| c as u16).collect());
            if let Some(c) = self.read_key(true).zchar() {
                if c == 0xd {
                    self.lines_since_input = l - 1;
                } else {
                    self.lines_since_input = 0;
                }
            }
            self.windows[0].y_cursor = self.rows as u16;
            self.windows[0].x_cursor = 1;
            self.current_style.clear(Style::Reverse as u8);
            self.print(&vec![0x20; 6]);
            if reverse {
                self.current_style.set(Style::Reverse as u8)
            }
            self.windows[0].y_cursor = self.rows as u16;
            self.windows[0].x_cursor = 1;
        }
    }

    /// Count down the current window's newline interrupt, if armed
    fn count_newline(&mut self) {
        let w = &mut self.windows[self.selected_window as usize];
        if w.nl_countdown > 0 {
            w.nl_countdown -= 1;
            if w.nl_countdown == 0 && w.nl_routine > 0 {
                self.pending_nl_interrupt = Some(w.nl_routine);
            }
        }
    }

    fn advance_cursor(&mut self) {
        let w = self.selected_window as usize;
        if w == 0 {
            if self.windows[0].x_cursor as u32 == self.columns {
                self.new_line();
            } else {
                self.windows[0].x_cursor += 1;
            }
        } else if self.windows[w].x_cursor as u32 == self.columns {
            // At the end of the row
            if (self.windows[w].y_cursor as u32) < self.window_1_bottom() {
                self.windows[w].y_cursor += 1;
                self.windows[w].x_cursor = 1;
            }
            // At the bottom right of the window, the cursor stays put
        } else {
            self.windows[w].x_cursor += 1;
        }
    }

    pub fn print(&mut self, text: &Vec<u16>) {
        for c in text {
            self.print_char(*c);
        }
        self.terminal.flush();
    }

    fn print_char(&mut self, zchar: u16) {
        if zchar == 0xd {
            self.new_line();
        } else if zchar != 0 {
            let (r, c) = self.cursor();
            self.terminal.print_at(
                zchar,
                r,
                c,
                self.current_colors,
                &self.current_style,
                self.font,
            );
            self.advance_cursor();
        }
    }

    /// Print text at a fixed position, without moving the window cursor
    pub fn print_at(&mut self, text: &[u16], at: (u32, u32), style: &CellStyle) {
        for (i, c) in text.iter().enumerate() {
            self.terminal.print_at(
                *c,
                u32::min(self.rows, at.0),
                u32::min(self.columns, at.1 + i as u32),
                self.current_colors,
                style,
                self.font,
            );
        }
        self.terminal.flush()
    }

    pub fn new_line(&mut self) {
        self.count_newline();
        if self.selected_window == 0 {
            self.next_line();
        } else {
            let w = self.selected_window as usize;
            if (self.windows[w].y_cursor as u32) < self.window_1_bottom() {
                self.windows[w].y_cursor += 1;
                self.windows[w].x_cursor = 1;
            }
        }
    }

    pub fn flush_buffer(&mut self) -> Result<(), RuntimeError> {
        self.terminal.flush();
        Ok(())
    }

    pub fn read_key(&mut self, wait: bool) -> InputEvent {
        self.lines_since_input = 0;
        let at = self.cursor();
        self.terminal.move_cursor(at);

        self.terminal.read_key(wait)
    }

    pub fn backspace(&mut self) -> Result<(), RuntimeError> {
        let w = self.selected_window as usize;
        if self.windows[w].x_cursor > 1 {
            let at = (
                self.windows[w].y_cursor as u32,
                self.windows[w].x_cursor as u32 - 1,
            );
            self.terminal.backspace(at);
            self.windows[w].x_cursor -= 1;
        }
        Ok(())
    }

    pub fn set_style(&mut self, style: u8) -> Result<(), RuntimeError> {
        self.current_style.set(style);
        self.windows[self.selected_window as usize].style = self.current_style.mask() as u16;
        self.terminal.set_style(self.current_style.mask());
        Ok(())
    }

    pub fn buffer_mode(&mut self, mode: u16) {
        self.terminal.buffer_mode(mode);
    }

    pub fn beep(&mut self) {
        self.terminal.beep()
    }

    pub fn play_sound(&mut self, effect: u16, volume: u8, repeats: u8) {
        self.terminal.play_sound(effect, volume, repeats)
    }

    pub fn stop_sound(&mut self) {
        self.terminal.stop_sound()
    }

    pub fn is_sound_playing(&self) -> bool {
        self.terminal.is_sound_playing()
    }

    /// Scroll from `row` to the bottom of the screen up one line
    pub fn scroll(&mut self, row: u32) {
        self.terminal.scroll(row);
    }

    /// Restore the visible cursor to the current window's cursor
    pub fn reset_cursor(&mut self) {
        let at = self.cursor();
        self.terminal.move_cursor(at);
    }

    /// Select a font, returning the previous font or 0 if the font is
    /// unavailable
    ///
    /// # Arguments
    /// * `font` - Font number, 0 queries the current font
    pub fn set_font(&mut self, font: u8) -> u8 {
        match font {
            0 => self.font,
            1 | 3 | 4 => {
                let previous = self.font;
                self.font = font;
                self.windows[self.selected_window as usize].font = font as u16;
                previous
            }
            _ => 0,
        }
    }

    pub fn output_stream(&mut self, mask: u8, table: Option<usize>) {
        self.terminal.output_stream(mask, table);
    }

    pub fn reset(&mut self) {
        self.terminal.reset();
    }

    pub fn quit(&mut self) {
        self.terminal.quit();
    }
}
