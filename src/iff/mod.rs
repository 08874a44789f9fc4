//! [IFF](https://en.wikipedia.org/wiki/Interchange_File_Format) chunk plumbing
//! for the Quetzal persistence format.

pub mod quetzal;

/// Encode an unsigned value as a big-endian byte vector
///
/// # Arguments
/// * `d` - value to encode
/// * `bytes` - number of bytes to encode
///
/// # Returns
/// Vector of byte values
pub fn usize_as_vec(d: usize, bytes: usize) -> Vec<u8> {
    let mut data = Vec::new();
    for i in (0..bytes).rev() {
        data.push(((d >> (8 * i)) & 0xFF) as u8);
    }
    data
}

/// Decode a big-endian byte slice to an unsigned value
///
/// # Arguments
/// * `v` - byte vector
/// * `offset` - offset of the first byte to decode
/// * `bytes` - number of bytes to decode
///
/// # Returns
/// Decoded value
pub fn vec_as_usize(v: &[u8], offset: usize, bytes: usize) -> usize {
    let mut u: usize = 0;
    for i in 0..bytes {
        u |= (v[offset + i] as usize) << ((bytes - 1 - i) * 8);
    }

    u
}

/// Decode a 4-byte chunk id to a string
///
/// # Arguments
/// * `v` - byte vector
/// * `offset` - offset of the first byte of the id
///
/// # Returns
/// Chunk id string
pub fn vec_to_id(v: &[u8], offset: usize) -> String {
    let mut id = String::new();
    for i in 0..4 {
        id.push(v[offset + i] as char);
    }

    id
}

/// Encode a chunk id string as bytes
///
/// # Arguments
/// * `id` - chunk id, at least 4 characters
///
/// # Returns
/// Vector with the first 4 bytes of the id
pub fn id_as_vec(id: &str) -> Vec<u8> {
    id.as_bytes()[0..4].to_vec()
}

/// Assemble a chunk: id, 4-byte length, data, even padding.
///
/// The padding byte is not included in the encoded chunk length.
///
/// # Arguments
/// * `id` - chunk id
/// * `data` - chunk data
///
/// # Returns
/// Encoded chunk
pub fn chunk(id: &str, data: &mut Vec<u8>) -> Vec<u8> {
    let mut chunk = id_as_vec(id);
    let data_length = data.len();
    chunk.append(&mut usize_as_vec(data_length, 4));
    chunk.append(data);
    if data_length % 2 == 1 {
        chunk.push(0);
    }

    chunk
}

/// A single IFF chunk
pub struct Chunk {
    /// Chunk id
    id: String,
    /// Chunk data, excluding any padding byte
    data: Vec<u8>,
}

impl Chunk {
    /// Read a chunk from a byte vector
    ///
    /// # Arguments
    /// * `v` - byte vector
    /// * `offset` - offset of the start of the chunk
    pub fn from_vec(v: &[u8], offset: usize) -> Chunk {
        let id = vec_to_id(v, offset);
        let length = vec_as_usize(v, offset + 4, 4);
        let data = v[offset + 8..offset + 8 + length].to_vec();

        Chunk { id, data }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &Vec<u8> {
        &self.data
    }
}

/// An IFF FORM and its chunks
pub struct IFF {
    /// Outer form id, "FORM" for any valid file
    form: String,
    /// Sub-form id, "IFZS" for Quetzal
    sub_form: String,
    /// The chunks, in file order
    chunks: Vec<Chunk>,
}

impl From<&Vec<u8>> for IFF {
    fn from(v: &Vec<u8>) -> IFF {
        let form = vec_to_id(v, 0);
        let sub_form = vec_to_id(v, 8);
        let mut chunks = Vec::new();

        let mut offset = 12;
        let len = v.len();
        while offset < len - 1 {
            let chunk = Chunk::from_vec(v, offset);
            let l = chunk.data.len();
            chunks.push(chunk);
            // Odd-length chunks are padded to even length
            offset = offset + 8 + l + (l % 2);
        }

        IFF {
            form,
            sub_form,
            chunks,
        }
    }
}

impl IFF {
    pub fn form(&self) -> &str {
        &self.form
    }

    pub fn sub_form(&self) -> &str {
        &self.sub_form
    }

    pub fn chunks(&self) -> &Vec<Chunk> {
        &self.chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usize_as_vec() {
        assert_eq!(usize_as_vec(0x123456, 3), &[0x12, 0x34, 0x56]);
        assert_eq!(usize_as_vec(0x123456, 2), &[0x34, 0x56]);
        assert_eq!(usize_as_vec(0x7F, 4), &[0x00, 0x00, 0x00, 0x7F]);
    }

    #[test]
    fn test_vec_as_usize() {
        assert_eq!(vec_as_usize(&[0x12, 0x34, 0x56], 0, 3), 0x123456);
        assert_eq!(vec_as_usize(&[0x12, 0x34, 0x56], 1, 2), 0x3456);
    }

    #[test]
    fn test_id_round_trip() {
        assert_eq!(vec_to_id(&id_as_vec("IFhd"), 0), "IFhd");
        assert_eq!(id_as_vec("FORM"), &[b'F', b'O', b'R', b'M']);
    }

    #[test]
    fn test_chunk_padding() {
        let c = chunk("CMem", &mut vec![1, 2, 3]);
        // Length excludes the padding byte
        assert_eq!(
            c,
            &[b'C', b'M', b'e', b'm', 0x00, 0x00, 0x00, 0x03, 1, 2, 3, 0]
        );
        let c = chunk("CMem", &mut vec![1, 2, 3, 4]);
        assert_eq!(
            c,
            &[b'C', b'M', b'e', b'm', 0x00, 0x00, 0x00, 0x04, 1, 2, 3, 4]
        );
    }

    #[test]
    fn test_iff_from_vec() {
        let mut v = id_as_vec("FORM");
        let mut body = id_as_vec("IFZS");
        body.append(&mut chunk("IFhd", &mut vec![0x12, 0x34, 0x56]));
        body.append(&mut chunk("Stks", &mut vec![0x01, 0x02]));
        v.append(&mut usize_as_vec(body.len(), 4));
        v.append(&mut body);

        let iff = IFF::from(&v);
        assert_eq!(iff.form(), "FORM");
        assert_eq!(iff.sub_form(), "IFZS");
        assert_eq!(iff.chunks().len(), 2);
        assert_eq!(iff.chunks()[0].id(), "IFhd");
        assert_eq!(iff.chunks()[0].data(), &[0x12, 0x34, 0x56]);
        assert_eq!(iff.chunks()[1].id(), "Stks");
        assert_eq!(iff.chunks()[1].data(), &[0x01, 0x02]);
    }
}
