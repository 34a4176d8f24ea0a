//! The ByteChannel / ByteBuffer contracts: the narrow sink/source interface
//! the Packer writes to and the Unpacker reads from.
//!
//! The codec never depends on `bytes::BufMut` / `bytes::Buf` by name — only
//! on these two traits — so a caller can plug in any sink or source that
//! implements them, fulfilling §6's external-interface contract without the
//! codec knowing anything about the underlying transport.

use bytes::{Buf, BufMut};

use crate::error::PackStreamError;

/// Abstract sink: write fixed-width big-endian integers and raw byte runs.
pub trait ByteChannel {
    fn write_u8(&mut self, value: u8);
    fn write_i8(&mut self, value: i8);
    fn write_i16(&mut self, value: i16);
    fn write_i32(&mut self, value: i32);
    fn write_i64(&mut self, value: i64);
    fn write_u16(&mut self, value: u16);
    fn write_u32(&mut self, value: u32);
    fn write_f64(&mut self, value: f64);
    fn write_bytes(&mut self, bytes: &[u8]);
}

impl<T: BufMut> ByteChannel for T {
    fn write_u8(&mut self, value: u8) {
        self.put_u8(value);
    }

    fn write_i8(&mut self, value: i8) {
        self.put_i8(value);
    }

    fn write_i16(&mut self, value: i16) {
        self.put_i16(value);
    }

    fn write_i32(&mut self, value: i32) {
        self.put_i32(value);
    }

    fn write_i64(&mut self, value: i64) {
        self.put_i64(value);
    }

    fn write_u16(&mut self, value: u16) {
        self.put_u16(value);
    }

    fn write_u32(&mut self, value: u32) {
        self.put_u32(value);
    }

    fn write_f64(&mut self, value: f64) {
        self.put_f64(value);
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.put_slice(bytes);
    }
}

/// Cursor-style source: read fixed-width big-endian integers and raw byte
/// runs, advancing the cursor. Out-of-range reads raise a protocol error
/// instead of panicking, unlike the underlying `bytes::Buf::get_*` calls.
pub trait ByteBuffer {
    fn remaining(&self) -> usize;
    fn read_u8(&mut self) -> Result<u8, PackStreamError>;
    fn read_i8(&mut self) -> Result<i8, PackStreamError>;
    fn read_i16(&mut self) -> Result<i16, PackStreamError>;
    fn read_u16(&mut self) -> Result<u16, PackStreamError>;
    fn read_i32(&mut self) -> Result<i32, PackStreamError>;
    fn read_u32(&mut self) -> Result<u32, PackStreamError>;
    fn read_i64(&mut self) -> Result<i64, PackStreamError>;
    fn read_f64(&mut self) -> Result<f64, PackStreamError>;
    fn read_exact_bytes(&mut self, len: usize) -> Result<Vec<u8>, PackStreamError>;
}

fn ensure_remaining(buf: &impl Buf, needed: usize) -> Result<(), PackStreamError> {
    if buf.remaining() < needed {
        Err(PackStreamError::unexpected_end(needed, buf.remaining()))
    } else {
        Ok(())
    }
}

impl<T: Buf> ByteBuffer for T {
    fn remaining(&self) -> usize {
        Buf::remaining(self)
    }

    fn read_u8(&mut self) -> Result<u8, PackStreamError> {
        ensure_remaining(self, 1)?;
        Ok(self.get_u8())
    }

    fn read_i8(&mut self) -> Result<i8, PackStreamError> {
        ensure_remaining(self, 1)?;
        Ok(self.get_i8())
    }

    fn read_i16(&mut self) -> Result<i16, PackStreamError> {
        ensure_remaining(self, 2)?;
        Ok(self.get_i16())
    }

    fn read_u16(&mut self) -> Result<u16, PackStreamError> {
        ensure_remaining(self, 2)?;
        Ok(self.get_u16())
    }

    fn read_i32(&mut self) -> Result<i32, PackStreamError> {
        ensure_remaining(self, 4)?;
        Ok(self.get_i32())
    }

    fn read_u32(&mut self) -> Result<u32, PackStreamError> {
        ensure_remaining(self, 4)?;
        Ok(self.get_u32())
    }

    fn read_i64(&mut self) -> Result<i64, PackStreamError> {
        ensure_remaining(self, 8)?;
        Ok(self.get_i64())
    }

    fn read_f64(&mut self) -> Result<f64, PackStreamError> {
        ensure_remaining(self, 8)?;
        Ok(self.get_f64())
    }

    fn read_exact_bytes(&mut self, len: usize) -> Result<Vec<u8>, PackStreamError> {
        ensure_remaining(self, len)?;
        let mut data = vec![0u8; len];
        self.copy_to_slice(&mut data);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn channel_writes_through_bufmut() {
        let mut buf = BytesMut::new();
        ByteChannel::write_u8(&mut buf, 0x7F);
        ByteChannel::write_i16(&mut buf, -1);
        assert_eq!(&buf[..], &[0x7F, 0xFF, 0xFF]);
    }

    #[test]
    fn buffer_reports_short_read_as_protocol_error() {
        let mut buf = &b""[..];
        let err = ByteBuffer::read_u8(&mut buf).unwrap_err();
        assert!(matches!(err, PackStreamError::Protocol(_)));
    }
}
