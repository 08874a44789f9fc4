//! [Object](https://inform-fiction.org/zmachine/standards/z1point1/sect12.html) table and tree
use crate::{
    error::*,
    zmachine::{state::header::HeaderField, ZMachine},
};

pub mod attribute;
pub mod property;

/// Gets the byte address of an object's table entry
///
/// If `object` is 0, 0 is returned.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `object` - Object number
///
/// # Returns
/// [Result] with the byte address of the object table entry, 0, or a [RuntimeError]
fn object_address(zmachine: &ZMachine, object: usize) -> Result<usize, RuntimeError> {
    if object == 0 {
        Ok(0)
    } else {
        let table = zmachine.header_word(HeaderField::ObjectTable)? as usize;
        // The property default table precedes the object entries
        let (offset, size) = if zmachine.version() < 4 {
            (62, 9)
        } else {
            (126, 14)
        };

        Ok(table + offset + (size * (object - 1)))
    }
}

/// Gets an object's relative (sibling, child, or parent)
///
/// If `object` is 0, 0 is returned.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `object` - Object number
/// * `offset` - Byte offset of the relative data in the object's table entry
///
/// # Returns
/// [Result] with the relative object number, 0, or a [RuntimeError]
fn relative(zmachine: &ZMachine, object: usize, offset: usize) -> Result<usize, RuntimeError> {
    if object == 0 {
        Ok(0)
    } else {
        let object_address = object_address(zmachine, object)?;

        if zmachine.version() < 4 {
            Ok(zmachine.read_byte(object_address + offset)? as usize)
        } else {
            Ok(zmachine.read_word(object_address + offset)? as usize)
        }
    }
}

fn parent_offset(version: u8) -> usize {
    if version < 4 {
        4
    } else {
        6
    }
}

fn sibling_offset(version: u8) -> usize {
    if version < 4 {
        5
    } else {
        8
    }
}

fn child_offset(version: u8) -> usize {
    if version < 4 {
        6
    } else {
        10
    }
}

/// Gets an object's parent
///
/// If `object` is 0, 0 is returned
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `object` - Object number
///
/// # Returns
/// [Result] with the parent object number, 0, or a [RuntimeError]
pub fn parent(zmachine: &ZMachine, object: usize) -> Result<usize, RuntimeError> {
    relative(zmachine, object, parent_offset(zmachine.version()))
}

/// Gets an object's first child
///
/// If `object` is 0, 0 is returned
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `object` - Object number
///
/// # Returns
/// [Result] with the child object number, 0, or a [RuntimeError]
pub fn child(zmachine: &ZMachine, object: usize) -> Result<usize, RuntimeError> {
    relative(zmachine, object, child_offset(zmachine.version()))
}

/// Gets an object's next sibling
///
/// If `object` is 0, 0 is returned
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `object` - Object number
///
/// # Returns
/// [Result] with the sibling object number, 0, or a [RuntimeError]
pub fn sibling(zmachine: &ZMachine, object: usize) -> Result<usize, RuntimeError> {
    relative(zmachine, object, sibling_offset(zmachine.version()))
}

/// Sets the relative (parent, child, sibling) of an object
fn set_relative(
    zmachine: &mut ZMachine,
    offset: usize,
    object: usize,
    relative: usize,
) -> Result<(), RuntimeError> {
    let object_address = object_address(zmachine, object)?;

    if zmachine.version() < 4 {
        zmachine.write_byte(object_address + offset, relative as u8)
    } else {
        zmachine.write_word(object_address + offset, relative as u16)
    }
}

/// Sets the parent of an object.
///
/// This only updates the `object` table entry; it does *not* remove the
/// object from its previous parent or otherwise update the tree.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `object` - Object number
/// * `parent` - New parent object number
///
/// # Returns
/// Empty [Result] or a [RuntimeError]
pub fn set_parent(
    zmachine: &mut ZMachine,
    object: usize,
    parent: usize,
) -> Result<(), RuntimeError> {
    set_relative(zmachine, parent_offset(zmachine.version()), object, parent)
}

/// Sets the child of an object.
///
/// This only updates the `object` table entry; it does *not* update the new
/// child or otherwise update the tree.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `object` - Object number
/// * `child` - New child object number
///
/// # Returns
/// Empty [Result] or a [RuntimeError]
pub fn set_child(zmachine: &mut ZMachine, object: usize, child: usize) -> Result<(), RuntimeError> {
    set_relative(zmachine, child_offset(zmachine.version()), object, child)
}

/// Sets the sibling of an object.
///
/// This only updates the `object` table entry; it does *not* update the new
/// sibling or otherwise update the tree.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `object` - Object number
/// * `sibling` - New sibling object number
///
/// # Returns
/// Empty [Result] or a [RuntimeError]
pub fn set_sibling(
    zmachine: &mut ZMachine,
    object: usize,
    sibling: usize,
) -> Result<(), RuntimeError> {
    set_relative(zmachine, sibling_offset(zmachine.version()), object, sibling)
}

/// Detach an object from its parent's child chain.
///
/// The previous sibling (or the parent's child pointer, when the object led
/// the chain) is relinked to the object's next sibling.  The object keeps
/// its own children.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `object` - Object number
///
/// # Returns
/// Empty [Result] or a [RuntimeError]
pub fn remove_object(zmachine: &mut ZMachine, object: usize) -> Result<(), RuntimeError> {
    let old_parent = parent(zmachine, object)?;
    if old_parent != 0 {
        let old_sibling = sibling(zmachine, object)?;
        let mut link = child(zmachine, old_parent)?;
        if link == object {
            set_child(zmachine, old_parent, old_sibling)?;
        } else {
            // Walk the sibling chain to the link before `object`
            while sibling(zmachine, link)? != object {
                link = sibling(zmachine, link)?;
            }
            set_sibling(zmachine, link, old_sibling)?;
        }

        set_parent(zmachine, object, 0)?;
        set_sibling(zmachine, object, 0)?;
    }

    Ok(())
}

/// Move an object to the head of another object's child chain.
///
/// The object is first unlinked from any current parent.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `object` - Object number
/// * `destination` - New parent object number
///
/// # Returns
/// Empty [Result] or a [RuntimeError]
pub fn insert_object(
    zmachine: &mut ZMachine,
    object: usize,
    destination: usize,
) -> Result<(), RuntimeError> {
    remove_object(zmachine, object)?;
    let old_child = child(zmachine, destination)?;
    set_parent(zmachine, object, destination)?;
    set_sibling(zmachine, object, old_child)?;
    set_child(zmachine, destination, object)?;

    Ok(())
}
