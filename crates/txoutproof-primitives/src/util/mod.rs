//! Binary serialization helpers.
//!
//! `VarInt` is Bitcoin's CompactSize integer. `ByteReader` and `ByteWriter`
//! walk little-endian wire data; every short read reports how many bytes
//! were wanted and how many were left so callers can attach field context.

use crate::chainhash::{Hash, HASH_SIZE};
use crate::PrimitivesError;

// ---------------------------------------------------------------------------
// VarInt
// ---------------------------------------------------------------------------

/// A CompactSize variable-length unsigned integer.
///
/// Encoded as one discriminant byte, optionally followed by a 2, 4 or 8 byte
/// little-endian value:
///
/// | first byte | value                         | size |
/// |------------|-------------------------------|------|
/// | `< 0xfd`   | the byte itself               | 1    |
/// | `0xfd`     | next 2 bytes as `u16`         | 3    |
/// | `0xfe`     | next 4 bytes as `u32`         | 5    |
/// | `0xff`     | next 8 bytes as `u64`         | 9    |
///
/// Non-minimal encodings (e.g. `0xfd 0x01 0x00`) are accepted on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VarInt(pub u64);

impl VarInt {
    /// Decode a VarInt from the front of a byte slice.
    ///
    /// # Returns
    /// The value and the number of bytes consumed, or `UnexpectedEof` when
    /// the slice ends inside the encoding.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), PrimitivesError> {
        let mut reader = ByteReader::new(data);
        let value = reader.read_varint()?;
        Ok((value, reader.position()))
    }

    /// Wire-format byte length of this value: 1, 3, 5 or 9.
    pub fn length(&self) -> usize {
        match self.0 {
            0..=0xfc => 1,
            0xfd..=0xffff => 3,
            0x1_0000..=0xffff_ffff => 5,
            _ => 9,
        }
    }

    /// Encode using the minimal form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let v = self.0;
        let mut buf = Vec::with_capacity(self.length());
        match self.length() {
            1 => buf.push(v as u8),
            3 => {
                buf.push(0xfd);
                buf.extend_from_slice(&(v as u16).to_le_bytes());
            }
            5 => {
                buf.push(0xfe);
                buf.extend_from_slice(&(v as u32).to_le_bytes());
            }
            _ => {
                buf.push(0xff);
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
        buf
    }

    /// The underlying value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for VarInt {
    fn from(v: u64) -> Self {
        VarInt(v)
    }
}

impl From<usize> for VarInt {
    fn from(v: usize) -> Self {
        VarInt(v as u64)
    }
}

// ---------------------------------------------------------------------------
// ByteReader
// ---------------------------------------------------------------------------

/// A cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    /// Read `n` bytes and advance.
    ///
    /// # Returns
    /// A slice of length `n`, or `UnexpectedEof { needed: n, available }`
    /// without moving the cursor.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], PrimitivesError> {
        let available = self.remaining();
        if n > available {
            return Err(PrimitivesError::UnexpectedEof { needed: n, available });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read exactly `N` bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PrimitivesError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, PrimitivesError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, PrimitivesError> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, PrimitivesError> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_i32_le(&mut self) -> Result<i32, PrimitivesError> {
        self.read_array().map(i32::from_le_bytes)
    }

    pub fn read_u64_le(&mut self) -> Result<u64, PrimitivesError> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Read a 32-byte hash in internal order.
    pub fn read_hash(&mut self) -> Result<Hash, PrimitivesError> {
        self.read_array::<HASH_SIZE>().map(Hash::new)
    }

    /// Read a CompactSize integer.
    ///
    /// A short read inside the extended value is reported with the width of
    /// that value as `needed`.
    pub fn read_varint(&mut self) -> Result<VarInt, PrimitivesError> {
        let value = match self.read_u8()? {
            0xfd => self.read_u16_le()? as u64,
            0xfe => self.read_u32_le()? as u64,
            0xff => self.read_u64_le()?,
            b => b as u64,
        };
        Ok(VarInt(value))
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The unread tail.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

// ---------------------------------------------------------------------------
// ByteWriter
// ---------------------------------------------------------------------------

/// An append-only little-endian encoder.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        ByteWriter { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ByteWriter { buf: Vec::with_capacity(capacity) }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u32_le(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    pub fn write_i32_le(&mut self, val: i32) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    pub fn write_hash(&mut self, hash: &Hash) {
        self.buf.extend_from_slice(hash.as_bytes());
    }

    pub fn write_varint(&mut self, varint: VarInt) {
        self.buf.extend_from_slice(&varint.to_bytes());
    }

    /// Consume the writer and return the accumulated bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_boundaries() {
        let (v, n) = VarInt::from_bytes(&[0xfc]).unwrap();
        assert_eq!((v.value(), n), (252, 1));

        let (v, n) = VarInt::from_bytes(&[0xfd, 0x00, 0x01]).unwrap();
        assert_eq!((v.value(), n), (256, 3));

        let (v, n) = VarInt::from_bytes(&[0xfe, 0x00, 0x00, 0x01, 0x00]).unwrap();
        assert_eq!((v.value(), n), (65536, 5));

        // 0xff, then 8 little-endian bytes whose high byte is 0x01.
        let (v, n) = VarInt::from_bytes(&[0xff, 0, 0, 0, 0, 0, 0, 0, 0x01]).unwrap();
        assert_eq!((v.value(), n), (1u64 << 56, 9));
    }

    #[test]
    fn test_varint_non_minimal_accepted() {
        let (v, n) = VarInt::from_bytes(&[0xfd, 0x01, 0x00]).unwrap();
        assert_eq!((v.value(), n), (1, 3));
    }

    #[test]
    fn test_varint_truncated_extension() {
        assert_eq!(
            VarInt::from_bytes(&[0xfd, 0x01]),
            Err(PrimitivesError::UnexpectedEof { needed: 2, available: 1 })
        );
        assert_eq!(
            VarInt::from_bytes(&[0xff, 0, 0, 0]),
            Err(PrimitivesError::UnexpectedEof { needed: 8, available: 3 })
        );
        assert_eq!(
            VarInt::from_bytes(&[]),
            Err(PrimitivesError::UnexpectedEof { needed: 1, available: 0 })
        );
    }

    #[test]
    fn test_varint_encode() {
        let cases: Vec<(u64, Vec<u8>)> = vec![
            (0, vec![0x00]),
            (252, vec![0xfc]),
            (253, vec![0xfd, 0xfd, 0x00]),
            (65535, vec![0xfd, 0xff, 0xff]),
            (65536, vec![0xfe, 0x00, 0x00, 0x01, 0x00]),
            (4294967296, vec![0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]),
        ];
        for (value, expected) in cases {
            let vi = VarInt(value);
            assert_eq!(vi.to_bytes(), expected, "encoding of {}", value);
            assert_eq!(vi.length(), expected.len(), "length of {}", value);
        }
    }

    #[test]
    fn test_reader_writer() {
        let mut writer = ByteWriter::new();
        writer.write_i32_le(-2);
        writer.write_u32_le(0xDEADBEEF);
        writer.write_varint(VarInt(300));
        writer.write_hash(&Hash::new([7u8; 32]));
        writer.write_bytes(b"hi");

        let data = writer.into_bytes();
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_i32_le().unwrap(), -2);
        assert_eq!(reader.read_u32_le().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_varint().unwrap(), VarInt(300));
        assert_eq!(reader.read_hash().unwrap(), Hash::new([7u8; 32]));
        assert_eq!(reader.rest(), b"hi");
        assert_eq!(reader.read_bytes(2).unwrap(), b"hi");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_short_read_does_not_advance() {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        assert_eq!(
            reader.read_u32_le(),
            Err(PrimitivesError::UnexpectedEof { needed: 4, available: 3 })
        );
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u8().unwrap(), 1);
    }
}
