//! ZMachine [memory map](https://inform-fiction.org/zmachine/standards/z1point1/sect01.html)
use std::{fmt, fs::File, io::Read};

use crate::{error::*, fatal_error, recoverable_error};

use super::header::HeaderField;

/// Memory map
pub struct Memory {
    /// Story file version
    version: u8,
    /// Memory map bytes
    map: Vec<u8>,
    /// Byte address of the start of static memory
    static_mark: usize,
    /// Pristine copy of the dynamic memory region
    dynamic: Vec<u8>,
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Memory: version {}, {} bytes, dynamic mark {:04x}",
            self.version,
            self.map.len(),
            self.static_mark
        )
    }
}

/// Assemble a word from high- and low-byte values
///
/// # Arguments
/// * `hb` - high byte value
/// * `lb` - low byte value
///
/// # Returns
/// Word value
pub fn word_value(hb: u8, lb: u8) -> u16 {
    (((hb as u16) << 8) & 0xFF00) + ((lb as u16) & 0xFF)
}

/// Break a word value down into high- and low-byte values
///
/// # Arguments
/// * `w` - Word value
///
/// # Returns
/// Tuple containing (high-byte, low-byte)
fn byte_values(w: u16) -> (u8, u8) {
    let hb = (w >> 8) as u8;
    let lb = w as u8;
    (hb, lb)
}

impl TryFrom<&mut File> for Memory {
    type Error = RuntimeError;

    fn try_from(value: &mut File) -> Result<Self, Self::Error> {
        let mut d = Vec::new();
        match value.read_to_end(&mut d) {
            Ok(_) => Memory::try_from(d),
            Err(e) => fatal_error!(ErrorCode::InvalidFile, "Error reading file: {}", e),
        }
    }
}

impl TryFrom<Vec<u8>> for Memory {
    type Error = RuntimeError;

    fn try_from(map: Vec<u8>) -> Result<Self, Self::Error> {
        if map.len() < 0x40 {
            return fatal_error!(
                ErrorCode::InvalidFile,
                "Story file is shorter than the 64-byte header: {} bytes",
                map.len()
            );
        }

        let version = map[0];
        if !(1..=8).contains(&version) {
            return fatal_error!(ErrorCode::UnsupportedVersion, "Version {} story", version);
        }

        let static_mark = word_value(
            map[HeaderField::StaticMark as usize],
            map[HeaderField::StaticMark as usize + 1],
        ) as usize;
        if static_mark > map.len() {
            return fatal_error!(
                ErrorCode::InvalidFile,
                "Static memory mark {:04x} is past the end of the {:04x} byte file",
                static_mark,
                map.len()
            );
        }

        let dynamic = map[0..static_mark].to_vec();
        Ok(Memory {
            version,
            map,
            static_mark,
            dynamic,
        })
    }
}

impl Memory {
    /// Get the story file version
    ///
    /// # Returns
    /// Version from the header
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Get the size of the memory map
    ///
    /// # Returns
    /// Size in bytes
    pub fn size(&self) -> usize {
        self.map.len()
    }

    /// Get the start of the static memory region
    ///
    /// # Returns
    /// Byte address of the start of static memory
    pub fn static_mark(&self) -> usize {
        self.static_mark
    }

    /// Get the current contents of the dynamic memory region
    ///
    /// # Returns
    /// Dynamic memory slice
    pub fn dynamic(&self) -> &[u8] {
        &self.map[0..self.static_mark]
    }

    /// Get the pristine (load-time) copy of dynamic memory
    ///
    /// # Returns
    /// Pristine dynamic memory slice
    pub fn pristine(&self) -> &[u8] {
        &self.dynamic
    }

    /// Copy a slice of the memory map
    ///
    /// # Arguments
    /// * `start` - address of the start of the slice
    /// * `length` - length of the slice
    ///
    /// # Returns
    /// Vector containing a copy of the requested slice of memory
    pub fn slice(&self, start: usize, length: usize) -> Vec<u8> {
        let end = usize::min(start + length, self.map.len());
        self.map[start..end].to_vec()
    }

    /// Calculate the checksum of the memory map.
    ///
    /// The pristine copy of dynamic memory is used for this calculation.
    ///
    /// # Returns
    /// [Result] with the checksum value or a [RuntimeError]
    pub fn checksum(&self) -> Result<u16, RuntimeError> {
        let mut checksum = 0;
        let size = self.read_word(HeaderField::FileLength as usize)? as usize
            * match self.version {
                1..=3 => 2,
                4 | 5 => 4,
                _ => 8,
            };

        for i in 0x40..self.dynamic.len() {
            checksum = u16::overflowing_add(checksum, self.dynamic[i] as u16).0;
        }

        for i in self.dynamic.len()..size {
            checksum = u16::overflowing_add(checksum, self.map[i] as u16).0;
        }
        Ok(checksum)
    }

    /// Read a byte value
    ///
    /// # Arguments
    /// * `address` - address to read
    ///
    /// # Returns
    /// [Result] with the byte value or a [RuntimeError]
    pub fn read_byte(&self, address: usize) -> Result<u8, RuntimeError> {
        if address < self.map.len() {
            Ok(self.map[address])
        } else {
            fatal_error!(
                ErrorCode::JumpToIllegalAddress,
                "Byte address {:#06x} beyond end of memory ({:#06x})",
                address,
                self.map.len() - 1
            )
        }
    }

    /// Read a word value, big-endian
    ///
    /// # Arguments
    /// * `address` - address of the high byte
    ///
    /// # Returns
    /// [Result] with the word value or a [RuntimeError]
    pub fn read_word(&self, address: usize) -> Result<u16, RuntimeError> {
        if address < self.map.len() - 1 {
            Ok(word_value(self.map[address], self.map[address + 1]))
        } else {
            fatal_error!(
                ErrorCode::JumpToIllegalAddress,
                "Word address {:#06x} beyond end of memory ({:#06x})",
                address,
                self.map.len() - 1
            )
        }
    }

    /// Write a byte value to dynamic memory
    ///
    /// # Arguments
    /// * `address` - address to write to
    /// * `value` - byte value
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError] if the address is at or past the
    /// static memory mark
    pub fn write_byte(&mut self, address: usize, value: u8) -> Result<(), RuntimeError> {
        if address < self.static_mark {
            debug!(target: "app::memory", "Write {:#02x} to ${:04x}", value, address);
            self.map[address] = value;
            Ok(())
        } else {
            recoverable_error!(
                ErrorCode::StoreOutOfDynamicMemory,
                "Byte address {:#06x} is above the end of dynamic memory ({:#06x})",
                address,
                self.static_mark
            )
        }
    }

    /// Write a word value to dynamic memory, big-endian
    ///
    /// # Arguments
    /// * `address` - address to write the high byte to
    /// * `value` - word value
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError] if either byte would land at or
    /// past the static memory mark
    pub fn write_word(&mut self, address: usize, value: u16) -> Result<(), RuntimeError> {
        if address < self.static_mark - 1 {
            debug!(target: "app::memory", "Write {:#04x} to ${:04x}", value, address);
            let (hb, lb) = byte_values(value);
            self.map[address] = hb;
            self.map[address + 1] = lb;
            Ok(())
        } else {
            recoverable_error!(
                ErrorCode::StoreOutOfDynamicMemory,
                "Word address {:#06x} is above the end of dynamic memory ({:#06x})",
                address,
                self.static_mark
            )
        }
    }

    /// Compress the dynamic memory region.
    ///
    /// The current contents are XORed with the pristine image; equal runs
    /// become a 0 marker and a run-length byte, per the Quetzal CMem scheme.
    ///
    /// # Returns
    /// Compressed dynamic memory
    pub fn compress(&self) -> Vec<u8> {
        let mut cdata: Vec<u8> = Vec::new();
        let mut run_length: u8 = 0;
        for i in 0..self.dynamic.len() {
            let b = self.map[i] ^ self.dynamic[i];
            if b == 0 {
                if run_length == 255 {
                    cdata.push(0);
                    cdata.push(run_length);
                    run_length = 0;
                } else {
                    run_length += 1;
                }
            } else {
                if run_length > 0 {
                    cdata.push(0);
                    cdata.push(run_length - 1);
                    run_length = 0;
                }
                cdata.push(b);
            }
        }

        // A trailing run of unchanged bytes is implied and may be omitted,
        // but emitting it keeps the output symmetrical with decompression
        if run_length > 0 {
            cdata.push(0);
            cdata.push(run_length - 1);
        }

        cdata
    }

    fn decompress(&self, cdata: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        let mut iter = cdata.iter();

        while let Some(b) = iter.next() {
            let i = data.len();
            if *b == 0 {
                // 0 marker is followed by (run length - 1) unchanged bytes
                let l = match iter.next() {
                    Some(l) => *l as usize,
                    None => 0,
                };
                for j in 0..l + 1 {
                    data.push(self.dynamic[i + j]);
                }
            } else {
                data.push(b ^ self.dynamic[i])
            }
        }

        // Any remaining bytes are unchanged from the pristine image
        for i in data.len()..self.dynamic.len() {
            data.push(self.dynamic[i]);
        }

        data
    }

    /// Reset dynamic memory to the pristine image
    pub fn reset(&mut self) {
        self.map[..self.dynamic.len()].copy_from_slice(&self.dynamic)
    }

    /// Overwrite dynamic memory
    ///
    /// # Arguments
    /// * `data` - new dynamic memory contents
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError] if the data size doesn't match the
    /// dynamic region
    pub fn restore(&mut self, data: &[u8]) -> Result<(), RuntimeError> {
        if data.len() != self.dynamic.len() {
            recoverable_error!(
                ErrorCode::Restore,
                "Dynamic memory size doesn't match: {:04x} != {:04x}",
                self.dynamic.len(),
                data.len()
            )
        } else {
            self.map[..data.len()].copy_from_slice(data);
            Ok(())
        }
    }

    /// Overwrite dynamic memory from a compressed image
    ///
    /// # Arguments
    /// * `cdata` - CMem-compressed dynamic memory
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn restore_compressed(&mut self, cdata: &[u8]) -> Result<(), RuntimeError> {
        let data = self.decompress(cdata);
        self.restore(&data)
    }
}
