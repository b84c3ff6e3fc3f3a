use bytes::{Buf, BufMut, BytesMut};

use crate::error::EncodingError;

/// A bounded byte buffer with a read/write cursor, used to build and
/// parse datagrams and to stage oversized messages. Writes never grow
/// the buffer past `maxsize`.
#[derive(Debug, Clone)]
pub struct Msg {
    data: BytesMut,
    maxsize: usize,
    readcount: usize,
}

impl Msg {
    pub fn new(maxsize: usize) -> Self {
        Msg {
            data: BytesMut::with_capacity(maxsize),
            maxsize,
            readcount: 0,
        }
    }

    /// Wraps a received datagram for reading
    pub fn from_slice(data: &[u8]) -> Self {
        Msg {
            data: BytesMut::from(data),
            maxsize: data.len(),
            readcount: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn maxsize(&self) -> usize {
        self.maxsize
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Bytes between the read cursor and the end of the buffer
    pub fn remaining(&self) -> usize {
        self.data.len() - self.readcount
    }

    /// Resets length and read cursor, keeping the capacity bound
    pub fn clear(&mut self) {
        self.data.clear();
        self.readcount = 0;
    }

    fn check_write(&self, write: usize) -> Result<(), EncodingError> {
        if self.data.len() + write > self.maxsize {
            return Err(EncodingError::Overflow {
                write,
                len: self.data.len(),
                maxsize: self.maxsize,
            });
        }
        Ok(())
    }

    fn check_read(&self, read: usize) -> Result<(), EncodingError> {
        if self.remaining() < read {
            return Err(EncodingError::NotEnoughData(self.remaining(), read));
        }
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<(), EncodingError> {
        self.check_write(1)?;
        self.data.put_u8(v);
        Ok(())
    }

    pub fn write_u16(&mut self, v: u16) -> Result<(), EncodingError> {
        self.check_write(2)?;
        self.data.put_u16(v);
        Ok(())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<(), EncodingError> {
        self.check_write(4)?;
        self.data.put_u32(v);
        Ok(())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<(), EncodingError> {
        self.check_write(8)?;
        self.data.put_u64(v);
        Ok(())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<(), EncodingError> {
        self.check_write(4)?;
        self.data.put_i32(v);
        Ok(())
    }

    pub fn write_data(&mut self, v: &[u8]) -> Result<(), EncodingError> {
        self.check_write(v.len())?;
        self.data.put_slice(v);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, EncodingError> {
        self.check_read(1)?;
        let mut rest = &self.data[self.readcount..];
        self.readcount += 1;
        Ok(rest.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16, EncodingError> {
        self.check_read(2)?;
        let mut rest = &self.data[self.readcount..];
        self.readcount += 2;
        Ok(rest.get_u16())
    }

    pub fn read_u32(&mut self) -> Result<u32, EncodingError> {
        self.check_read(4)?;
        let mut rest = &self.data[self.readcount..];
        self.readcount += 4;
        Ok(rest.get_u32())
    }

    pub fn read_u64(&mut self) -> Result<u64, EncodingError> {
        self.check_read(8)?;
        let mut rest = &self.data[self.readcount..];
        self.readcount += 8;
        Ok(rest.get_u64())
    }

    pub fn read_i32(&mut self) -> Result<i32, EncodingError> {
        self.check_read(4)?;
        let mut rest = &self.data[self.readcount..];
        self.readcount += 4;
        Ok(rest.get_i32())
    }

    pub fn read_data(&mut self, n: usize) -> Result<&[u8], EncodingError> {
        self.check_read(n)?;
        let start = self.readcount;
        self.readcount += n;
        Ok(&self.data[start..self.readcount])
    }

    /// Consumes and returns everything after the read cursor
    pub fn read_remaining(&mut self) -> &[u8] {
        let start = self.readcount;
        self.readcount = self.data.len();
        &self.data[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_cursor_order() {
        let mut msg = Msg::new(64);
        msg.write_u32(0xDEAD_BEEF).unwrap();
        msg.write_u16(27910).unwrap();
        msg.write_u8(7).unwrap();
        msg.write_data(b"abc").unwrap();

        assert_eq!(msg.len(), 10);
        assert_eq!(msg.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(msg.read_u16().unwrap(), 27910);
        assert_eq!(msg.read_u8().unwrap(), 7);
        assert_eq!(msg.read_remaining(), b"abc");
        assert_eq!(msg.remaining(), 0);
    }

    #[test]
    fn write_past_maxsize_is_refused() {
        let mut msg = Msg::new(4);
        msg.write_u32(1).unwrap();
        let err = msg.write_u8(2).unwrap_err();
        assert!(matches!(err, EncodingError::Overflow { write: 1, len: 4, maxsize: 4 }));
        // Buffer contents untouched by the refused write
        assert_eq!(msg.len(), 4);
    }

    #[test]
    fn read_past_end_is_refused() {
        let mut msg = Msg::from_slice(&[1, 2]);
        let err = msg.read_u32().unwrap_err();
        assert!(matches!(err, EncodingError::NotEnoughData(2, 4)));
    }

    #[test]
    fn signed_and_wide_round_trip() {
        let mut msg = Msg::new(16);
        msg.write_i32(-40).unwrap();
        msg.write_u64(u64::MAX - 1).unwrap();
        assert_eq!(msg.read_i32().unwrap(), -40);
        assert_eq!(msg.read_u64().unwrap(), u64::MAX - 1);
    }

    #[test]
    fn clear_resets_cursor_and_length() {
        let mut msg = Msg::new(8);
        msg.write_u32(5).unwrap();
        msg.read_u16().unwrap();
        msg.clear();
        assert!(msg.is_empty());
        assert_eq!(msg.remaining(), 0);
        msg.write_u64(9).unwrap();
        assert_eq!(msg.read_u64().unwrap(), 9);
    }

    #[test]
    fn read_data_slices_in_place() {
        let mut msg = Msg::from_slice(b"hello world");
        assert_eq!(msg.read_data(5).unwrap(), b"hello");
        assert_eq!(msg.read_u8().unwrap(), b' ');
        assert_eq!(msg.read_remaining(), b"world");
    }
}
