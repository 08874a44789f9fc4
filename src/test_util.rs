//! Shared test fixtures: a small story image, a scripted terminal, and
//! assertion macros
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::config::Config;
use crate::zmachine::io::screen::{CellStyle, Color, InputEvent, Terminal};
use crate::zmachine::state::header::HeaderField;
use crate::zmachine::state::memory::Memory;
use crate::zmachine::state::State;
use crate::zmachine::ZMachine;

#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {{
        let result = $expr;
        assert!(result.is_ok(), "{:?}", result.err());
        result.unwrap()
    }};
}

#[macro_export]
macro_rules! assert_ok_eq {
    ($expr:expr, $value:expr) => {{
        let result = $expr;
        assert!(result.is_ok(), "{:?}", result.err());
        assert_eq!(result.unwrap(), $value);
    }};
}

#[macro_export]
macro_rules! assert_some {
    ($expr:expr) => {{
        let option = $expr;
        assert!(option.is_some());
        option.unwrap()
    }};
}

#[macro_export]
macro_rules! assert_some_eq {
    ($expr:expr, $value:expr) => {{
        let option = $expr;
        assert!(option.is_some());
        assert_eq!(option.unwrap(), $value);
    }};
}

const GLOBAL_TABLE: usize = 0x100;
const OBJECT_TABLE: usize = 0x2E0;
const INITIAL_PC: usize = 0x500;
const ROUTINE: usize = 0x600;
const DICTIONARY: usize = 0xE00;
const ABBREVIATIONS: usize = 0xE80;

fn set_word(map: &mut [u8], address: usize, value: u16) {
    map[address] = (value >> 8) as u8;
    map[address + 1] = value as u8;
}

/// Encode a lower-case word the way the dictionary does, without needing a
/// machine
fn encode(word: &str, words: usize) -> Vec<u16> {
    let mut zchars: Vec<u16> = word
        .chars()
        .map(|c| "abcdefghijklmnopqrstuvwxyz".find(c).unwrap() as u16 + 6)
        .collect();
    zchars.resize(words * 3, 5);
    let mut zwords = Vec::new();
    for i in 0..words {
        let mut w = (zchars[i * 3] << 10) | (zchars[i * 3 + 1] << 5) | zchars[i * 3 + 2];
        if i == words - 1 {
            w |= 0x8000;
        }
        zwords.push(w);
    }
    zwords
}

fn build_objects(map: &mut [u8], version: u8) {
    if version < 4 {
        // 31 default properties: the default for property n is n
        for n in 1..=31u16 {
            set_word(map, OBJECT_TABLE + ((n as usize - 1) * 2), n);
        }

        // 9-byte records
        let records = OBJECT_TABLE + 62;
        let record = |n: usize| records + (9 * (n - 1));
        // Object 1: attributes 0 and 17, child 2, named, properties
        map[record(1)] = 0x80;
        map[record(1) + 2] = 0x40;
        map[record(1) + 6] = 2;
        set_word(map, record(1) + 7, 0x370);
        // Object 2: in 1, sibling 3
        map[record(2) + 4] = 1;
        map[record(2) + 5] = 3;
        set_word(map, record(2) + 7, 0x37A);
        // Object 3: in 1
        map[record(3) + 4] = 1;
        set_word(map, record(3) + 7, 0x37A);
        // Object 4: detached
        set_word(map, record(4) + 7, 0x37A);

        // Object 1 property table: name, property 10 (word), property 5 (byte)
        map[0x370] = 1;
        let name = encode("box", 1);
        set_word(map, 0x371, name[0]);
        map[0x373] = 0x2A; // 32 * (2 - 1) + 10
        set_word(map, 0x374, 0x1234);
        map[0x376] = 0x05; // 32 * (1 - 1) + 5
        map[0x377] = 0xAB;
        map[0x378] = 0x00;
        // Shared nameless, propertyless table
        map[0x37A] = 0;
        map[0x37B] = 0;
    } else {
        // 63 default properties
        for n in 1..=63u16 {
            set_word(map, OBJECT_TABLE + ((n as usize - 1) * 2), n);
        }

        // 14-byte records
        let records = OBJECT_TABLE + 126;
        let record = |n: usize| records + (14 * (n - 1));
        map[record(1)] = 0x80;
        map[record(1) + 2] = 0x40;
        set_word(map, record(1) + 10, 2);
        set_word(map, record(1) + 12, 0x3A0);
        set_word(map, record(2) + 6, 1);
        set_word(map, record(2) + 8, 3);
        set_word(map, record(2) + 12, 0x3AA);
        set_word(map, record(3) + 6, 1);
        set_word(map, record(3) + 12, 0x3AA);
        set_word(map, record(4) + 12, 0x3AA);

        map[0x3A0] = 1;
        let name = encode("box", 1);
        set_word(map, 0x3A1, name[0]);
        map[0x3A3] = 0x4A; // size 2, property 10
        set_word(map, 0x3A4, 0x1234);
        map[0x3A6] = 0x05; // size 1, property 5
        map[0x3A7] = 0xAB;
        map[0x3A8] = 0x00;
        map[0x3AA] = 0;
        map[0x3AB] = 0;
    }
}

fn build_dictionary(map: &mut [u8], version: u8) {
    let word_count = if version < 4 { 2 } else { 3 };
    let entry_size = if version < 4 { 7 } else { 9 };

    map[DICTIONARY] = 2;
    map[DICTIONARY + 1] = b'.';
    map[DICTIONARY + 2] = b',';
    map[DICTIONARY + 3] = entry_size;
    set_word(map, DICTIONARY + 4, 3);

    let entries = DICTIONARY + 6;
    for (i, word) in ["look", "take", "xyzzy"].iter().enumerate() {
        let encoded = encode(word, word_count);
        for (j, w) in encoded.iter().enumerate() {
            set_word(map, entries + (i * entry_size as usize) + (j * 2), *w);
        }
    }
}

fn build_abbreviations(map: &mut [u8]) {
    // Abbreviation 1/0 is "grue" at 0xF00 (word address 0x780)
    set_word(map, ABBREVIATIONS, 0x780);
    let grue = encode("grue", 2);
    set_word(map, 0xF00, grue[0]);
    set_word(map, 0xF02, grue[1]);
}

/// Build a small but complete story image.
///
/// Dynamic memory ends at 0x400.  The layout: globals at 0x100, objects at
/// 0x2E0, code at 0x500, a routine at 0x600, the dictionary at 0xE00,
/// abbreviations at 0xE80.
pub fn test_map(version: u8) -> Vec<u8> {
    let mut map = vec![0; 0x1000];
    map[HeaderField::Version as usize] = version;
    set_word(&mut map, HeaderField::Release as usize, 0x1234);
    set_word(&mut map, HeaderField::HighMark as usize, 0x0400);
    set_word(&mut map, HeaderField::InitialPC as usize, INITIAL_PC as u16);
    set_word(&mut map, HeaderField::Dictionary as usize, DICTIONARY as u16);
    set_word(&mut map, HeaderField::ObjectTable as usize, OBJECT_TABLE as u16);
    set_word(&mut map, HeaderField::GlobalTable as usize, GLOBAL_TABLE as u16);
    set_word(&mut map, HeaderField::StaticMark as usize, 0x0400);
    for (i, b) in b"230715".iter().enumerate() {
        map[HeaderField::Serial as usize + i] = *b;
    }
    set_word(
        &mut map,
        HeaderField::AbbreviationsTable as usize,
        ABBREVIATIONS as u16,
    );
    let length_divisor = match version {
        1..=3 => 2,
        4 | 5 => 4,
        _ => 8,
    };
    let file_length = (map.len() / length_divisor) as u16;
    set_word(
        &mut map,
        HeaderField::FileLength as usize,
        file_length,
    );

    build_objects(&mut map, version);
    build_dictionary(&mut map, version);
    build_abbreviations(&mut map);

    // A routine with two locals; its body returns true
    if version < 5 {
        map[ROUTINE] = 2;
        set_word(&mut map, ROUTINE + 1, 0x1111);
        set_word(&mut map, ROUTINE + 3, 0x2222);
        map[ROUTINE + 5] = 0xB0;
    } else {
        map[ROUTINE] = 2;
        map[ROUTINE + 1] = 0xB0;
    }

    // Not a routine: a "local count" no routine could declare
    map[0x700] = 0xFF;

    // QUIT at the initial PC so a runaway test machine stops
    map[INITIAL_PC] = 0xBA;

    // Header checksum over the pristine image
    let mut checksum = 0u16;
    for b in &map[0x40..] {
        checksum = checksum.overflowing_add(*b as u16).0;
    }
    set_word(&mut map, HeaderField::Checksum as usize, checksum);

    map
}

/// Shared handles into a [TestTerminal]
pub struct TestHandles {
    /// Every character printed to the screen, in order
    pub output: Rc<RefCell<Vec<u16>>>,
    /// Scripted keystrokes; an empty queue reads as carriage return
    pub input: Rc<RefCell<VecDeque<u16>>>,
}

/// A scripted terminal standing in for the host
pub struct TestTerminal {
    output: Rc<RefCell<Vec<u16>>>,
    input: Rc<RefCell<VecDeque<u16>>>,
}

impl Terminal for TestTerminal {
    fn size(&self) -> (u32, u32) {
        (24, 80)
    }

    fn print_at(
        &mut self,
        zchar: u16,
        _row: u32,
        _column: u32,
        _colors: (Color, Color),
        _style: &CellStyle,
        _font: u8,
    ) {
        self.output.borrow_mut().push(zchar);
    }

    fn flush(&mut self) {}

    fn read_key(&mut self, _wait: bool) -> InputEvent {
        match self.input.borrow_mut().pop_front() {
            Some(c) => InputEvent::from_char(c),
            // Never leave a test hanging on input
            None => InputEvent::from_char(0x0d),
        }
    }

    fn scroll(&mut self, _row: u32) {}

    fn backspace(&mut self, _at: (u32, u32)) {}

    fn beep(&mut self) {}

    fn move_cursor(&mut self, _at: (u32, u32)) {}

    fn play_sound(&mut self, _effect: u16, _volume: u8, _repeats: u8) {}

    fn stop_sound(&mut self) {}

    fn reset(&mut self) {}

    fn quit(&mut self) {}

    fn set_colors(&mut self, _colors: (Color, Color)) {}
}

/// Build a scripted terminal and the handles to drive it
pub fn test_terminal() -> (Box<dyn Terminal>, TestHandles) {
    let output = Rc::new(RefCell::new(Vec::new()));
    let input = Rc::new(RefCell::new(VecDeque::new()));
    let terminal = TestTerminal {
        output: output.clone(),
        input: input.clone(),
    };
    (Box::new(terminal), TestHandles { output, input })
}

/// Build an initialized [State] over the test story
pub fn test_state(version: u8) -> State {
    let memory = Memory::try_from(test_map(version)).unwrap();
    let mut state = State::new(memory, 10).unwrap();
    state.initialize(24, 80, (9, 2), false).unwrap();
    state
}

/// Build a [ZMachine] over the test story
pub fn test_zmachine(version: u8) -> ZMachine {
    test_zmachine_with_code(version, &[])
}

/// Build a [ZMachine] over the test story with code at the initial PC
pub fn test_zmachine_with_code(version: u8, code: &[u8]) -> ZMachine {
    let (zmachine, _) = test_zmachine_handles(version, code);
    zmachine
}

/// Build a [ZMachine] over the test story, returning the terminal handles
pub fn test_zmachine_handles(version: u8, code: &[u8]) -> (ZMachine, TestHandles) {
    let mut map = test_map(version);
    map[INITIAL_PC..INITIAL_PC + code.len()].copy_from_slice(code);
    // Re-checksum: the injected code is inside the summed range
    let mut checksum = 0u16;
    for b in &map[0x40..] {
        checksum = checksum.overflowing_add(*b as u16).0;
    }
    set_word(&mut map, HeaderField::Checksum as usize, checksum);
    let memory = Memory::try_from(map).unwrap();
    let (terminal, handles) = test_terminal();
    let zmachine = ZMachine::new(memory, Config::default(), terminal, "test").unwrap();
    (zmachine, handles)
}

/// Run a program to completion, returning the machine and the screen output
pub fn play(version: u8, code: &[u8]) -> (ZMachine, Rc<RefCell<Vec<u16>>>) {
    let (mut zmachine, handles) = test_zmachine_handles(version, code);
    zmachine.run().expect("test program should run to QUIT");
    (zmachine, handles.output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_map_loads() {
        for version in [1, 2, 3, 4, 5, 6, 7, 8] {
            let memory = Memory::try_from(test_map(version)).unwrap();
            assert_eq!(memory.version(), version);
            assert_eq!(memory.static_mark(), 0x400);
        }
    }

    #[test]
    fn test_checksum_verifies() {
        let zmachine = test_zmachine(3);
        assert!(zmachine.verify().unwrap());
        let zmachine = test_zmachine(5);
        assert!(zmachine.verify().unwrap());
        let zmachine = test_zmachine(8);
        assert!(zmachine.verify().unwrap());
    }

    #[test]
    fn test_terminal_script() {
        let (mut terminal, handles) = test_terminal();
        handles.input.borrow_mut().push_back(b'x' as u16);
        assert_eq!(terminal.read_key(true).zchar(), Some(b'x' as u16));
        assert_eq!(terminal.read_key(true).zchar(), Some(0x0d));
    }
}
