//! Quetzal `IFhd` chunk: identifies the story a state belongs to
use std::fmt;

use super::super::*;

#[derive(Clone, Debug, Eq)]
pub struct IFhd {
    /// Story release number
    release_number: u16,
    /// Story serial number
    serial_number: Vec<u8>,
    /// Story checksum
    checksum: u16,
    /// Program counter
    pc: u32,
}

impl fmt::Display for IFhd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Release: {:04x}, Serial: ", self.release_number)?;
        for b in &self.serial_number {
            write!(f, "{}", *b as char)?;
        }
        write!(
            f,
            ", Checksum: {:04x}, PC: ${:06x}",
            self.checksum, self.pc
        )
    }
}

/// Story identity: release, serial, and checksum.  The program counter is
/// deliberately left out so a saved state can be matched to a running story.
impl PartialEq for IFhd {
    fn eq(&self, other: &Self) -> bool {
        self.release_number == other.release_number
            && self.serial_number == other.serial_number
            && self.checksum == other.checksum
    }
}

impl From<&Chunk> for IFhd {
    fn from(value: &Chunk) -> Self {
        let data = value.data();
        let release_number = vec_as_usize(data, 0, 2) as u16;
        let serial_number = data[2..8].to_vec();
        let checksum = vec_as_usize(data, 8, 2) as u16;
        let pc = vec_as_usize(data, 10, 3) as u32;

        IFhd {
            release_number,
            serial_number,
            checksum,
            pc,
        }
    }
}

impl From<&IFhd> for Vec<u8> {
    fn from(value: &IFhd) -> Self {
        let mut data = Vec::new();
        data.append(&mut usize_as_vec(value.release_number as usize, 2));
        data.extend(&value.serial_number);
        data.append(&mut usize_as_vec(value.checksum as usize, 2));
        data.append(&mut usize_as_vec(value.pc as usize, 3));

        chunk("IFhd", &mut data)
    }
}

impl IFhd {
    /// Constructor
    ///
    /// # Arguments
    /// * `release_number` - Story release number
    /// * `serial_number` - Story serial number (6 bytes)
    /// * `checksum` - Story checksum
    /// * `pc` - Program counter, truncated to 24 bits
    pub fn new(release_number: u16, serial_number: &[u8], checksum: u16, pc: u32) -> IFhd {
        IFhd {
            release_number,
            serial_number: serial_number.to_vec(),
            checksum,
            pc: pc & 0xFFFFFF,
        }
    }

    pub fn release_number(&self) -> u16 {
        self.release_number
    }

    pub fn serial_number(&self) -> &Vec<u8> {
        &self.serial_number
    }

    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let ifhd = IFhd::new(0x1234, &[b'2', b'3', b'0', b'7', b'1', b'5'], 0xF0AD, 0x123456);
        assert_eq!(ifhd.release_number(), 0x1234);
        assert_eq!(ifhd.serial_number(), &[b'2', b'3', b'0', b'7', b'1', b'5']);
        assert_eq!(ifhd.checksum(), 0xF0AD);
        assert_eq!(ifhd.pc(), 0x123456);
    }

    #[test]
    fn test_eq_ignores_pc() {
        let a = IFhd::new(1, &[1, 2, 3, 4, 5, 6], 0x1111, 0x1000);
        let b = IFhd::new(1, &[1, 2, 3, 4, 5, 6], 0x1111, 0x2000);
        let c = IFhd::new(1, &[1, 2, 3, 4, 5, 7], 0x1111, 0x1000);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_vec_round_trip() {
        let ifhd = IFhd::new(0x1234, &[1, 2, 3, 4, 5, 6], 0x5678, 0x112233);
        let v = Vec::from(&ifhd);
        assert_eq!(
            v,
            &[
                b'I', b'F', b'h', b'd', 0x00, 0x00, 0x00, 0x0D, 0x12, 0x34, 0x01, 0x02, 0x03,
                0x04, 0x05, 0x06, 0x56, 0x78, 0x11, 0x22, 0x33, 0x00
            ]
        );
        let chunk = Chunk::from_vec(&v, 0);
        let i2 = IFhd::from(&chunk);
        assert_eq!(i2, ifhd);
        assert_eq!(i2.pc(), 0x112233);
    }
}
