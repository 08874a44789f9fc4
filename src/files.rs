//! Save/transcript/command file naming
use std::path::Path;

use regex::Regex;

use crate::{
    error::{ErrorCode, RuntimeError},
    recoverable_error,
};

fn string_to_vec_u16(s: String) -> Vec<u16> {
    s.chars().map(|c| c as u16).collect()
}

/// Find the first available numbered filename `base-NN.suffix`.
///
/// Used to suggest a default name when creating a new file.
///
/// # Arguments
/// * `base` - Base file name, usually the story file name
/// * `suffix` - File extension
///
/// # Returns
/// [Result] with the filename as a vector of ZSCII characters or a [RuntimeError]
pub fn first_available(base: &str, suffix: &str) -> Result<Vec<u16>, RuntimeError> {
    let mut n = 1;
    loop {
        let filename = format!("{}-{:02}.{}", base, n, suffix);
        match Path::new(&filename).try_exists() {
            Ok(b) => {
                if !b {
                    return Ok(string_to_vec_u16(filename));
                }
            }
            Err(e) => return recoverable_error!(ErrorCode::Interpreter, "{}", e),
        }

        n += 1;
    }
}

/// Find the most recently created numbered filename `base-NN.suffix`.
///
/// Used to suggest a default name when reading an existing file.  Falls back
/// to `base.suffix` when no numbered file exists.
///
/// # Arguments
/// * `base` - Base file name, usually the story file name
/// * `suffix` - File extension
///
/// # Returns
/// [Result] with the filename as a vector of ZSCII characters or a [RuntimeError]
pub fn last_existing(base: &str, suffix: &str) -> Result<Vec<u16>, RuntimeError> {
    let mut n = 1;
    loop {
        let filename = format!("{}-{:02}.{}", base, n, suffix);
        match Path::new(&filename).try_exists() {
            Ok(b) => {
                if !b {
                    if n > 1 {
                        return Ok(string_to_vec_u16(format!(
                            "{}-{:02}.{}",
                            base,
                            n - 1,
                            suffix
                        )));
                    } else {
                        return Ok(string_to_vec_u16(format!("{}.{}", base, suffix)));
                    }
                }
            }
            Err(e) => return recoverable_error!(ErrorCode::Interpreter, "{}", e),
        }

        n += 1;
    }
}

/// Check a player-supplied filename against story file naming.
///
/// Writing over the story file would be unfortunate, so names ending in a
/// `.z#` extension are rejected.
///
/// # Arguments
/// * `filename` - Filename to check
///
/// # Returns
/// Empty [Result] or a [RuntimeError] if the name is not allowed
pub fn check_filename(filename: &str) -> Result<(), RuntimeError> {
    match Regex::new(r".*\.z\d$") {
        Ok(r) => {
            if r.is_match(filename) {
                recoverable_error!(
                    ErrorCode::InvalidInput,
                    "Filenames ending in '.z#' are not allowed"
                )
            } else {
                Ok(())
            }
        }
        Err(e) => recoverable_error!(
            ErrorCode::Interpreter,
            "Internal error with regex checking filename: {}",
            e
        ),
    }
}
