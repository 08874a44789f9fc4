//! Quetzal `UMem` chunk: uncompressed dynamic memory
use std::fmt;

use super::super::*;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UMem {
    /// Dynamic memory contents
    data: Vec<u8>,
}

impl fmt::Display for UMem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "UMem: {} bytes", self.data.len())
    }
}

impl From<&Chunk> for UMem {
    fn from(value: &Chunk) -> Self {
        UMem {
            data: value.data().clone(),
        }
    }
}

impl From<&UMem> for Vec<u8> {
    fn from(value: &UMem) -> Self {
        chunk("UMem", &mut value.data.clone())
    }
}

impl UMem {
    /// Constructor
    ///
    /// # Arguments
    /// * `data` - Dynamic memory contents
    pub fn new(data: &[u8]) -> UMem {
        UMem {
            data: data.to_vec(),
        }
    }

    pub fn data(&self) -> &Vec<u8> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_round_trip() {
        let umem = UMem::new(&[9, 8, 7, 6, 5]);
        let v = Vec::from(&umem);
        assert_eq!(
            v,
            &[b'U', b'M', b'e', b'm', 0x00, 0x00, 0x00, 0x05, 9, 8, 7, 6, 5, 0]
        );
        let chunk = Chunk::from_vec(&v, 0);
        assert_eq!(UMem::from(&chunk), umem);
    }
}
