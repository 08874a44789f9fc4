//! [ZSCII](https://inform-fiction.org/zmachine/standards/z1point1/sect03.html) text encoding
use std::cmp::Ordering;

use crate::{
    error::*,
    fatal_error, recoverable_error,
    zmachine::{state::header::HeaderField, ZMachine},
};

/// ZCode version 3+ [alphabets](https://inform-fiction.org/zmachine/standards/z1point1/sect03.html#two)
const ALPHABET_V3: [[char; 26]; 3] = [
    [
        'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
        's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
    ],
    [
        'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
        'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
    ],
    [
        ' ', '\r', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', ',', '!', '?', '_', '#',
        '\'', '"', '/', '\\', '-', ':', '(', ')',
    ],
];

/// Decode an [abbreviation](https://inform-fiction.org/zmachine/standards/z1point1/sect03.html#three)
///
/// # Arguments
/// * `zmachine` - Reference to the Z-machine
/// * `abbrev_table` - Abbreviation table (1-3)
/// * `index` - Abbreviation index within the table
///
/// # Returns
/// [Result] containing the abbreviation text or a [RuntimeError]
fn abbreviation(
    zmachine: &ZMachine,
    abbrev_table: u8,
    index: u8,
) -> Result<Vec<u16>, RuntimeError> {
    let abbreviation_table = zmachine.header_word(HeaderField::AbbreviationsTable)? as usize;
    let entry = (64 * (abbrev_table as usize - 1)) + (index as usize * 2);
    let word_addr = zmachine.read_word(abbreviation_table + entry)? as usize;
    as_text(zmachine, word_addr * 2, true)
}

/// Read ztext from an address and decode it
///
/// # Arguments
/// * `zmachine` - Reference to the Z-machine
/// * `address` - Address of the text
/// * `is_abbreviation` - `true` when decoding an abbreviation, `false` if not
///
/// # Returns
/// [Result] containing the decoded text or a [RuntimeError]
pub fn as_text(
    zmachine: &ZMachine,
    address: usize,
    is_abbreviation: bool,
) -> Result<Vec<u16>, RuntimeError> {
    from_vec(
        zmachine,
        &zmachine.string_literal(address)?,
        is_abbreviation,
    )
}

/// Decode a vector of ztext words.
///
/// An abbreviation may not itself contain an abbreviation.
///
/// # Arguments:
/// * `zmachine` - Reference to the Z-machine
/// * `ztext` - Vector of encoded ztext
/// * `is_abbreviation` - `true` when decoding an abbreviation, `false` if not
///
/// # Returns
/// [Result] containing the decoded text or a [RuntimeError]
pub fn from_vec(
    zmachine: &ZMachine,
    ztext: &Vec<u16>,
    is_abbreviation: bool,
) -> Result<Vec<u16>, RuntimeError> {
    let mut alphabet_shift: usize = 0;
    let mut s = Vec::new();

    let mut abbrev = 0;
    let mut zscii_read1 = false;
    let mut zscii_read2 = false;
    let mut zscii_b1: u16 = 0;

    for w in ztext {
        let b1 = (w >> 10 & 0x1F) as u8;
        let b2 = (w >> 5 & 0x1F) as u8;
        let b3 = (w & 0x1F) as u8;

        for b in [b1, b2, b3] {
            if abbrev > 0 {
                let mut abbreviation = abbreviation(zmachine, abbrev, b)?;
                s.append(&mut abbreviation);
                abbrev = 0;
            } else if zscii_read1 {
                zscii_b1 = b as u16;
                zscii_read2 = true;
                zscii_read1 = false;
            } else if zscii_read2 {
                let z = ((zscii_b1 << 5) & 0x3E0) + b as u16;
                s.push(z);
                zscii_read2 = false;
            } else {
                match b {
                    0 => s.push(0x20),
                    1..=3 => {
                        if !is_abbreviation {
                            abbrev = b
                        } else {
                            return fatal_error!(
                                ErrorCode::InvalidAbbreviation,
                                "Abbreviations can't nest",
                            );
                        }
                    }
                    4 => alphabet_shift = 1,
                    5 => alphabet_shift = 2,
                    6 => {
                        if alphabet_shift == 2 {
                            zscii_read1 = true;
                        } else {
                            s.push(ALPHABET_V3[alphabet_shift][b as usize - 6] as u16);
                        }
                    }
                    _ => s.push(ALPHABET_V3[alphabet_shift][b as usize - 6] as u16),
                }
            }
            if b != 4 && b != 5 {
                alphabet_shift = 0;
            }
        }
    }
    Ok(s)
}

/// Get the set of word separators from a dictionary
///
/// # Arguments
/// * `zmachine` - Reference to the Z-Machine
/// * `dictionary_address` - Address of the dictionary
///
/// # Returns
/// [Result] containing a vector of word separator characters or a [RuntimeError]
fn separators(zmachine: &ZMachine, dictionary_address: usize) -> Result<Vec<char>, RuntimeError> {
    let separator_count = zmachine.read_byte(dictionary_address)?;
    let mut sep = Vec::new();
    for i in 1..=separator_count as usize {
        let c = zmachine.read_byte(dictionary_address + i)? as char;
        sep.push(c);
    }

    Ok(sep)
}

/// Find the ztext sequence for a character.
///
/// # Arguments
/// * `zchar` - Character to look up
///
/// # Returns
/// Vector containing the ztext value of the character with any required
/// alphabet shift.  A character outside the standard alphabets becomes a
/// two-character 10-bit ZSCII escape sequence.
fn find_char(zchar: u16) -> Vec<u16> {
    let c = (zchar as u8) as char;
    if c == ' ' {
        return vec![0];
    }

    for i in 0..26 {
        if ALPHABET_V3[0][i] == c {
            return vec![i as u16 + 6];
        }
    }

    for i in 0..26 {
        if ALPHABET_V3[1][i] == c {
            return vec![4, i as u16 + 6];
        }
    }

    for i in 0..26 {
        if ALPHABET_V3[2][i] == c {
            return vec![5, i as u16 + 6];
        }
    }

    let z1 = (c as u8 >> 5) & 0x1f;
    let z2 = c as u8 & 0x1f;
    vec![5, 6, z1 as u16, z2 as u16]
}

/// Encode 3 5-bit ztext characters into a word: 01111122 22233333
fn as_word(z1: u16, z2: u16, z3: u16) -> u16 {
    ((z1 & 0x1F) << 10) | ((z2 & 0x1F) << 5) | z3 & 0x1F
}

/// [Encode](https://inform-fiction.org/zmachine/standards/z1point1/sect03.html#seven) a word
///
/// # Arguments
/// * `word` - Word to encode as a vector of characters
/// * `words` - number of encoded words in the result: 2 for v1-3 (6
///   characters) and 3 for v4+ (9 characters)
///
/// # Returns
/// Vector of encoded ztext words, with bit 15 set on the last
pub fn encode_text(word: &mut Vec<u16>, words: usize) -> Vec<u16> {
    let mut zchars = Vec::new();

    // Read at most words * 3 characters from word
    word.truncate(words * 3);
    for c in word {
        zchars.append(&mut find_char(*c));
    }

    // Truncate or pad characters
    zchars.resize(words * 3, 5);

    // Encode zchar triplets into encoded ZSCII words
    let mut zwords = Vec::new();
    for i in 0..words {
        let index = i * 3;
        let mut w = as_word(zchars[index], zchars[index + 1], zchars[index + 2]);
        if i == words - 1 {
            w |= 0x8000;
        }
        zwords.push(w);
    }

    zwords
}

/// Binary search a sorted [dictionary](https://inform-fiction.org/zmachine/standards/z1point1/sect13.html#two)
///
/// # Arguments
/// * `zmachine` - Reference to the z-machine
/// * `address` - Address of the first entry in the dictionary
/// * `entry_count` - Number of entries in the dictionary
/// * `entry_size` - Dictionary entry size
/// * `word` - Encoded ztext for the word to find
///
/// # Returns
/// [Result] containing the address of the matching dictionary entry or 0 if
/// not found or a [RuntimeError]
fn search_entry(
    zmachine: &ZMachine,
    address: usize,
    entry_count: usize,
    entry_size: usize,
    word: &[u16],
) -> Result<usize, RuntimeError> {
    let mut min = 0;
    let mut max = entry_count - 1;

    while min <= max {
        let pivot = min + ((max - min) / 2);
        let addr = address + (pivot * entry_size);
        let mut cmp = Ordering::Equal;
        for (i, wrd) in word.iter().enumerate() {
            let w = zmachine.read_word(addr + (i * 2))?;
            cmp = w.cmp(wrd);
            if cmp != Ordering::Equal {
                break;
            }
        }

        match cmp {
            Ordering::Equal => return Ok(addr),
            Ordering::Greater => {
                if pivot == 0 {
                    break;
                }
                max = pivot - 1;
            }
            Ordering::Less => min = pivot + 1,
        }
    }

    Ok(0)
}

/// Scan an unsorted dictionary
///
/// # Arguments
/// * `zmachine` - Reference to the z-machine
/// * `address` - Address of the first entry in the dictionary
/// * `entry_count` - Number of entries in the dictionary
/// * `entry_size` - Dictionary entry size
/// * `words` - Encoded ztext for the word to find
///
/// # Returns
/// [Result] containing the address of the matching dictionary entry or 0 if
/// not found or a [RuntimeError]
fn scan_entry(
    zmachine: &ZMachine,
    address: usize,
    entry_count: usize,
    entry_size: usize,
    words: &[u16],
) -> Result<usize, RuntimeError> {
    'outer: for i in 0..entry_count {
        let entry_address = address + (i * entry_size);
        for (j, w) in words.iter().enumerate() {
            let ew = zmachine.read_word(entry_address + (j * 2))?;
            if ew != *w {
                continue 'outer;
            }
        }

        return Ok(entry_address);
    }

    Ok(0)
}

/// Find the address of the dictionary entry for a word, if any.
///
/// # Argument
/// * `zmachine` - Reference to the Z-Machine
/// * `dictionary_address` - Address of the dictionary
/// * `word` - Word to find as a vector of characters
///
/// # Returns
/// [Result] containing the address of the matching dictionary entry or 0 if
/// not found or a [RuntimeError]
pub fn from_dictionary(
    zmachine: &ZMachine,
    dictionary_address: usize,
    word: &[char],
) -> Result<usize, RuntimeError> {
    let separator_count = zmachine.read_byte(dictionary_address)? as usize;
    let entry_size = zmachine.read_byte(dictionary_address + separator_count + 1)? as usize;
    let entry_count = zmachine.read_word(dictionary_address + separator_count + 2)? as i16;
    let word_count = if zmachine.version() < 4 { 2 } else { 3 };
    if entry_size < word_count * 2 {
        return recoverable_error!(
            ErrorCode::IllegalDictionaryWordLength,
            "Dictionary entry size {} is less than the {} encoded text bytes",
            entry_size,
            word_count * 2
        );
    }
    debug!(target: "app::text", "Lookup: dictionary @ {:04x}, {} separators, {} entries of size {}", dictionary_address, separator_count, entry_count, entry_size);

    let mut zchars = word.iter().map(|c| *c as u16).collect::<Vec<u16>>();
    let words = encode_text(&mut zchars, word_count);

    if entry_count > 0 {
        search_entry(
            zmachine,
            dictionary_address + separator_count + 4,
            entry_count as usize,
            entry_size,
            &words,
        )
    } else {
        // A negative count is legal for game-supplied dictionaries and
        // means the entries are unsorted
        scan_entry(
            zmachine,
            dictionary_address + separator_count + 4,
            i16::abs(entry_count) as usize,
            entry_size,
            &words,
        )
    }
}

/// Store a word entry to the parse buffer
fn store_parsed_entry(
    zmachine: &mut ZMachine,
    word: &[char],
    word_start: usize,
    entry_address: usize,
    entry: u16,
) -> Result<(), RuntimeError> {
    debug!(target: "app::text", "Lookup: {:?} => stored to ${:04x}: {:#04x}/{}/{}", word, entry_address, entry, word.len(), word_start);
    zmachine.write_word(entry_address, entry)?;
    zmachine.write_byte(entry_address + 2, word.len() as u8)?;
    zmachine.write_byte(entry_address + 3, word_start as u8)?;
    Ok(())
}

/// Find a word in a dictionary and store the result into the parse buffer
///
/// # Arguments
/// * `zmachine` - Reference to the Z-Machine
/// * `dictionary` - byte address of the dictionary
/// * `parse_buffer` - parse buffer address
/// * `flag` - if `true`, the parse buffer is only updated for words found in the dictionary
/// * `parse_index` - index to the parse buffer
/// * `(word_count, word_start)` - the number of words parsed and the starting index of the word
/// * `word` - Word to find
///
/// # Returns
/// [Result] with a tuple (new parse_index, new parsed word_count) or a [RuntimeError]
fn find_word(
    zmachine: &mut ZMachine,
    dictionary: usize,
    parse_buffer: usize,
    flag: bool,
    parse_index: usize,
    (word_count, word_start): (usize, usize),
    word: &Vec<char>,
) -> Result<(usize, usize), RuntimeError> {
    let entry = from_dictionary(zmachine, dictionary, word)?;
    let offset = if zmachine.version() < 5 { 1 } else { 2 };

    let parse_address = parse_buffer + 2 + (4 * parse_index);
    if !flag {
        store_parsed_entry(zmachine, word, word_start + offset, parse_address, entry as u16)?;
        Ok((parse_index + 1, word_count + 1))
    } else if entry > 0 {
        let e = zmachine.read_word(parse_address)?;
        if e == 0 {
            store_parsed_entry(
                zmachine,
                word,
                word_start + offset,
                parse_address,
                entry as u16,
            )?;
            Ok((parse_index + 1, word_count + 1))
        } else {
            Ok((parse_index + 1, word_count))
        }
    } else {
        Ok((parse_index + 1, word_count))
    }
}

/// Parse a text buffer into a parse buffer.
///
/// # Arguments
/// * `zmachine` - Reference to the Z-Machine
/// * `text_buffer` - Input text buffer address
/// * `parse_buffer` - Parse buffer address
/// * `dictionary` - Dictionary address
/// * `flag` - If `true`, the parse buffer is not updated for words that
///   aren't found in the dictionary
///
/// # Returns
/// Empty [Result] or a [RuntimeError]
pub fn parse_text(
    zmachine: &mut ZMachine,
    text_buffer: usize,
    parse_buffer: usize,
    dictionary: usize,
    flag: bool,
) -> Result<(), RuntimeError> {
    debug!(target: "app::text", "Lexical analysis: text @ {:04x}, parse @ {:04x}, dictionary @ {:04x}, skip {}", text_buffer, parse_buffer, dictionary, flag);
    let separators = separators(zmachine, dictionary)?;
    let mut word = Vec::new();
    let mut word_start: usize = 0;
    let mut word_count: usize = 0;
    let mut words: usize = 0;
    let mut data = Vec::new();

    if zmachine.version() < 5 {
        // Buffer is 0 terminated
        let mut i = 1;
        loop {
            let b = zmachine.read_byte(text_buffer + i)?;
            if b == 0 {
                break;
            } else {
                data.push(b);
                i += 1;
            }
        }
    } else {
        // Input length is stored in the second byte
        let n = zmachine.read_byte(text_buffer + 1)? as usize;
        for i in 0..n {
            data.push(zmachine.read_byte(text_buffer + 2 + i)?);
        }
    }

    let max_words = zmachine.read_byte(parse_buffer)? as usize;

    for (i, b) in data.iter().enumerate() {
        let c = (*b as char).to_ascii_lowercase();
        if word_count > max_words {
            break;
        }

        if separators.contains(&c) {
            // Store the word
            if !word.is_empty() {
                (word_count, words) = find_word(
                    zmachine,
                    dictionary,
                    parse_buffer,
                    flag,
                    word_count,
                    (words, word_start),
                    &word,
                )?;
            }

            // Store the separator
            if word_count < max_words {
                let sep = vec![c];
                (word_count, words) = find_word(
                    zmachine,
                    dictionary,
                    parse_buffer,
                    flag,
                    word_count,
                    (words, word_start + word.len()),
                    &sep,
                )?;
            }
            word.clear();
            word_start = i + 1;
        } else if c == ' ' {
            // Store the word but not the space
            if !word.is_empty() {
                (word_count, words) = find_word(
                    zmachine,
                    dictionary,
                    parse_buffer,
                    flag,
                    word_count,
                    (words, word_start),
                    &word,
                )?;
            }
            word.clear();
            word_start = i + 1;
        } else {
            word.push(c)
        }
    }

    // End of input, parse anything collected
    if !word.is_empty() && word_count < max_words {
        (_, words) = find_word(
            zmachine,
            dictionary,
            parse_buffer,
            flag,
            word_count,
            (words, word_start),
            &word,
        )?;
    }

    // If flag is true, then a previous analysis pass has already set the
    // correct parse buffer size
    if !flag {
        zmachine.write_byte(parse_buffer + 1, words as u8)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{assert_ok, assert_ok_eq, test_util::test_zmachine};

    use super::*;

    fn to_string(text: &[u16]) -> String {
        text.iter().map(|c| (*c as u8) as char).collect()
    }

    #[test]
    fn test_find_char() {
        assert_eq!(find_char(' ' as u16), vec![0]);
        assert_eq!(find_char('a' as u16), vec![6]);
        assert_eq!(find_char('z' as u16), vec![31]);
        assert_eq!(find_char('A' as u16), vec![4, 6]);
        assert_eq!(find_char('0' as u16), vec![5, 8]);
        // 10-bit escape for characters outside the alphabets
        assert_eq!(find_char('@' as u16), vec![5, 6, 2, 0]);
    }

    #[test]
    fn test_encode_text() {
        // "hello" -> h e l l o pad
        let words = encode_text(&mut "hello".chars().map(|c| c as u16).collect(), 2);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0], ((13 << 10) | (10 << 5) | 17));
        assert_eq!(words[1], 0x8000 | ((17 << 10) | (20 << 5) | 5));
    }

    #[test]
    fn test_encode_text_truncates() {
        let words = encode_text(
            &mut "overlylongword".chars().map(|c| c as u16).collect(),
            2,
        );
        assert_eq!(words.len(), 2);
        assert!(words[1] & 0x8000 == 0x8000);
    }

    #[test]
    fn test_decode_simple() {
        let zmachine = test_zmachine(3);
        // "hello" encoded above, decoded back
        let ztext = vec![(13 << 10) | (10 << 5) | 17, 0x8000 | (17 << 10) | (20 << 5) | 5];
        let text = assert_ok!(from_vec(&zmachine, &ztext, false));
        // Trailing pad character 5 is a shift with nothing following
        assert_eq!(to_string(&text), "hello");
    }

    #[test]
    fn test_decode_shifts() {
        let zmachine = test_zmachine(3);
        // 'H' = A1[7] = zchar 13, 'i' = A0[8] = zchar 14, '!' = A2[14] = zchar 20
        let ztext = vec![as_word(4, 13, 14), 0x8000 | as_word(5, 20, 5)];
        let text = assert_ok!(from_vec(&zmachine, &ztext, false));
        assert_eq!(to_string(&text), "Hi!");
    }

    #[test]
    fn test_decode_zscii_escape() {
        let zmachine = test_zmachine(3);
        // 5 6 introduces a 10-bit ZSCII code: '@' = 0x40 = (2 << 5) | 0
        let ztext = vec![as_word(5, 6, 2), 0x8000 | as_word(0, 5, 5)];
        let text = assert_ok!(from_vec(&zmachine, &ztext, false));
        assert_eq!(text[0], 0x40);
    }

    #[test]
    fn test_decode_abbreviation() {
        let zmachine = test_zmachine(3);
        // The test story defines abbreviation 1/0 as "grue"
        let ztext = vec![0x8000 | as_word(1, 0, 5)];
        let text = assert_ok!(from_vec(&zmachine, &ztext, false));
        assert_eq!(to_string(&text), "grue");
    }

    #[test]
    fn test_decode_abbreviation_nesting_is_fatal() {
        let zmachine = test_zmachine(3);
        let ztext = vec![0x8000 | as_word(1, 0, 5)];
        assert!(from_vec(&zmachine, &ztext, true).is_err());
    }

    #[test]
    fn test_from_dictionary() {
        let zmachine = test_zmachine(3);
        let dictionary = zmachine
            .header_word(HeaderField::Dictionary)
            .unwrap() as usize;
        // The test story dictionary holds "look", "take", "xyzzy"
        let addr = assert_ok!(from_dictionary(
            &zmachine,
            dictionary,
            &"take".chars().collect::<Vec<char>>()
        ));
        assert!(addr > 0);
        let miss = assert_ok!(from_dictionary(
            &zmachine,
            dictionary,
            &"plugh".chars().collect::<Vec<char>>()
        ));
        assert_eq!(miss, 0);
    }

    #[test]
    fn test_parse_text() {
        let mut zmachine = test_zmachine(3);
        let dictionary = zmachine
            .header_word(HeaderField::Dictionary)
            .unwrap() as usize;
        // Text buffer at 0x3C0: max length, then 0-terminated input
        let text_buffer = 0x3C0;
        let parse_buffer = 0x3E0;
        assert!(zmachine.write_byte(text_buffer, 0x10).is_ok());
        for (i, c) in "take grue".bytes().enumerate() {
            assert!(zmachine.write_byte(text_buffer + 1 + i, c).is_ok());
        }
        assert!(zmachine.write_byte(text_buffer + 10, 0).is_ok());
        assert!(zmachine.write_byte(parse_buffer, 4).is_ok());

        assert!(parse_text(&mut zmachine, text_buffer, parse_buffer, dictionary, false).is_ok());

        // Two words parsed
        assert_ok_eq!(zmachine.read_byte(parse_buffer + 1), 2);
        // "take" was found
        assert!(zmachine.read_word(parse_buffer + 2).unwrap() > 0);
        assert_ok_eq!(zmachine.read_byte(parse_buffer + 4), 4);
        assert_ok_eq!(zmachine.read_byte(parse_buffer + 5), 1);
        // "grue" is not in the dictionary
        assert_ok_eq!(zmachine.read_word(parse_buffer + 6), 0);
        assert_ok_eq!(zmachine.read_byte(parse_buffer + 9), 6);
    }
}
