//! Quetzal `CMem` chunk: dynamic memory XOR-compressed against the pristine image
use std::fmt;

use super::super::*;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CMem {
    /// Compressed memory data
    data: Vec<u8>,
}

impl fmt::Display for CMem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CMem: {} bytes", self.data.len())
    }
}

impl From<&Chunk> for CMem {
    fn from(value: &Chunk) -> Self {
        CMem {
            data: value.data().clone(),
        }
    }
}

impl From<&CMem> for Vec<u8> {
    fn from(value: &CMem) -> Self {
        chunk("CMem", &mut value.data.clone())
    }
}

impl CMem {
    /// Constructor
    ///
    /// # Arguments
    /// * `data` - Compressed memory data
    pub fn new(data: &[u8]) -> CMem {
        CMem {
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
    fn test_new() {
        let cmem = CMem::new(&[1, 2, 3, 4]);
        assert_eq!(cmem.data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_vec_round_trip() {
        let cmem = CMem::new(&[1, 2, 3]);
        let v = Vec::from(&cmem);
        assert_eq!(
            v,
            &[b'C', b'M', b'e', b'm', 0x00, 0x00, 0x00, 0x03, 1, 2, 3, 0]
        );
        let chunk = Chunk::from_vec(&v, 0);
        assert_eq!(CMem::from(&chunk), cmem);
    }
}
