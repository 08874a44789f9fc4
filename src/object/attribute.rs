//! Object attribute bitset: 32 bits in V1-3, 48 in V4+
use crate::{error::*, recoverable_error, zmachine::ZMachine};

use super::object_address;

fn attribute_count(version: u8) -> u8 {
    if version < 4 {
        32
    } else {
        48
    }
}

/// Test an attribute
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `object` - Object number
/// * `attribute` - Attribute number
///
/// # Returns
/// [Result] with the attribute value or a [RuntimeError] when the attribute
/// number is out of range
pub fn value(zmachine: &ZMachine, object: usize, attribute: u8) -> Result<bool, RuntimeError> {
    if attribute >= attribute_count(zmachine.version()) {
        return recoverable_error!(
            ErrorCode::IllegalAttribute,
            "Test of invalid attribute {} on object {}",
            attribute,
            object
        );
    }

    let object_address = object_address(zmachine, object)?;
    let address = object_address + (attribute as usize / 8);
    let mask = 1 << (7 - (attribute % 8));
    let value = zmachine.read_byte(address)?;
    Ok(value & mask == mask)
}

/// Set an attribute
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `object` - Object number
/// * `attribute` - Attribute number
///
/// # Returns
/// Empty [Result] or a [RuntimeError] when the attribute number is out of
/// range
pub fn set(zmachine: &mut ZMachine, object: usize, attribute: u8) -> Result<(), RuntimeError> {
    if attribute >= attribute_count(zmachine.version()) {
        return recoverable_error!(
            ErrorCode::IllegalAttribute,
            "Set of invalid attribute {} on object {}",
            attribute,
            object
        );
    }

    let object_address = object_address(zmachine, object)?;
    let address = object_address + (attribute as usize / 8);
    let mask = 1 << (7 - (attribute % 8));
    let attribute_byte = zmachine.read_byte(address)?;
    zmachine.write_byte(address, attribute_byte | mask)
}

/// Clear an attribute
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `object` - Object number
/// * `attribute` - Attribute number
///
/// # Returns
/// Empty [Result] or a [RuntimeError] when the attribute number is out of
/// range
pub fn clear(zmachine: &mut ZMachine, object: usize, attribute: u8) -> Result<(), RuntimeError> {
    if attribute >= attribute_count(zmachine.version()) {
        return recoverable_error!(
            ErrorCode::IllegalAttribute,
            "Clear of invalid attribute {} on object {}",
            attribute,
            object
        );
    }

    let object_address = object_address(zmachine, object)?;
    let address = object_address + (attribute as usize / 8);
    let mask: u8 = 1 << (7 - (attribute % 8));
    let attribute_byte = zmachine.read_byte(address)?;
    zmachine.write_byte(address, attribute_byte & !mask)
}

#[cfg(test)]
mod tests {
    use crate::{assert_ok_eq, test_util::test_zmachine};

    use super::*;

    // The test story sets attributes 0 and 17 on object 1

    #[test]
    fn test_value() {
        let zmachine = test_zmachine(3);
        assert_ok_eq!(value(&zmachine, 1, 0), true);
        assert_ok_eq!(value(&zmachine, 1, 17), true);
        assert_ok_eq!(value(&zmachine, 1, 1), false);
        assert_ok_eq!(value(&zmachine, 2, 0), false);
    }

    #[test]
    fn test_set_clear() {
        let mut zmachine = test_zmachine(3);
        assert!(set(&mut zmachine, 2, 31).is_ok());
        assert_ok_eq!(value(&zmachine, 2, 31), true);
        assert!(clear(&mut zmachine, 2, 31).is_ok());
        assert_ok_eq!(value(&zmachine, 2, 31), false);
        // Neighboring bits are untouched
        assert!(set(&mut zmachine, 2, 8).is_ok());
        assert!(set(&mut zmachine, 2, 9).is_ok());
        assert!(clear(&mut zmachine, 2, 8).is_ok());
        assert_ok_eq!(value(&zmachine, 2, 9), true);
    }

    #[test]
    fn test_out_of_range_v3() {
        let mut zmachine = test_zmachine(3);
        assert!(value(&zmachine, 1, 32).is_err());
        assert!(set(&mut zmachine, 1, 32).is_err());
        assert!(clear(&mut zmachine, 1, 32).is_err());
    }

    #[test]
    fn test_v4_widens_range() {
        let mut zmachine = test_zmachine(5);
        assert!(set(&mut zmachine, 1, 47).is_ok());
        assert_ok_eq!(value(&zmachine, 1, 47), true);
        assert!(value(&zmachine, 1, 48).is_err());
    }
}
