//! A bounds-checked cursor over a payload buffer.

use crate::datetime::{DateTime, DATE_TIME_SIZE};
use crate::error::CodecError;
use crate::sfloat::decode_sfloat;

/// Sequential reader for variable-layout payloads.
///
/// Every accessor advances the cursor and fails with
/// [`CodecError::Truncated`] carrying the current offset when the buffer
/// runs out, so decode errors point at the exact field that was short.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Wrap a payload buffer.
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, offset: 0 }
    }

    /// Current cursor position.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Whether the buffer is exhausted.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn ensure(&self, needed: usize) -> Result<(), CodecError> {
        if self.remaining() < needed {
            return Err(CodecError::truncated(
                self.offset,
                needed - self.remaining(),
            ));
        }
        Ok(())
    }

    /// Read one byte.
    pub fn u8(&mut self) -> Result<u8, CodecError> {
        self.ensure(1)?;
        let value = self.data[self.offset];
        self.offset += 1;
        Ok(value)
    }

    /// Read a little-endian u16.
    pub fn u16_le(&mut self) -> Result<u16, CodecError> {
        self.ensure(2)?;
        let value = u16::from_le_bytes([self.data[self.offset], self.data[self.offset + 1]]);
        self.offset += 2;
        Ok(value)
    }

    /// Read a little-endian i16.
    pub fn i16_le(&mut self) -> Result<i16, CodecError> {
        Ok(self.u16_le()? as i16)
    }

    /// Read and decode an SFLOAT sample.
    pub fn sfloat(&mut self) -> Result<f32, CodecError> {
        Ok(decode_sfloat(self.u16_le()?))
    }

    /// Read and decode a 7-byte date-time.
    pub fn date_time(&mut self) -> Result<DateTime, CodecError> {
        let bytes = self.take(DATE_TIME_SIZE)?;
        DateTime::decode(bytes)
    }

    /// Take `n` raw bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        self.ensure(n)?;
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_reads() {
        let data = [0x05, 0x34, 0x12, 0xFF, 0xFF];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.u8().unwrap(), 0x05);
        assert_eq!(reader.u16_le().unwrap(), 0x1234);
        assert_eq!(reader.i16_le().unwrap(), -1);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_truncation_reports_offset() {
        let data = [0x01, 0x02];
        let mut reader = ByteReader::new(&data);
        reader.u8().unwrap();
        let err = reader.u16_le().unwrap_err();
        assert_eq!(err, CodecError::truncated(1, 1));
    }

    #[test]
    fn test_date_time_field() {
        let mut payload = vec![0xAA];
        payload.extend_from_slice(&[0xE8, 0x07, 3, 1, 12, 30, 5]);
        let mut reader = ByteReader::new(&payload);
        reader.u8().unwrap();
        let dt = reader.date_time().unwrap();
        assert_eq!(dt.year, 2024);
        assert!(reader.is_empty());
    }
}
