//! The Z-Machine as a library
#![crate_name = "zymurgy"]

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod files;
pub mod iff;
pub mod instruction;
pub mod object;
pub mod text;
pub mod zmachine;

#[cfg(test)]
pub mod test_util;
