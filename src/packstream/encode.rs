//! The Packer: dispatches a `Value` to the narrowest PackStream wire
//! encoding, delegating application-defined types via a dehydration hook.

use super::marker;
use crate::channel::ByteChannel;
use crate::error::PackStreamError;
use crate::hooks::{Hooks, IdentityHooks};
use crate::value::{Map, Structure, Value};

/// Encodes values to a [`ByteChannel`], dispatching each to the smallest
/// wire form that represents it exactly.
///
/// A `Packer` is stateless other than the "byte arrays enabled" flag; it may
/// be reused across any number of encode calls and across threads once
/// constructed (the flag is set once and only read afterward).
#[derive(Debug, Clone, Copy)]
pub struct Packer {
    byte_arrays_supported: bool,
}

impl Default for Packer {
    fn default() -> Self {
        Self::new()
    }
}

impl Packer {
    /// A packer with byte arrays enabled.
    pub fn new() -> Self {
        Self {
            byte_arrays_supported: true,
        }
    }

    /// A packer whose support for the `Bytes` value is gated by
    /// `byte_arrays_supported` (set once at transport negotiation time).
    pub fn with_byte_arrays_supported(byte_arrays_supported: bool) -> Self {
        Self {
            byte_arrays_supported,
        }
    }

    /// Encodes `value` with the identity hook pair.
    pub fn pack(
        &self,
        channel: &mut impl ByteChannel,
        value: &Value,
    ) -> Result<(), PackStreamError> {
        self.pack_with_hooks(channel, value, &IdentityHooks)
    }

    /// Encodes `value`, first passing it through `hooks.dehydrate`.
    ///
    /// A hook that fails defers the error to this call, before any byte is
    /// written for `value`, so a partially-dehydrated value never leaves a
    /// half-written header behind it.
    pub fn pack_with_hooks(
        &self,
        channel: &mut impl ByteChannel,
        value: &Value,
        hooks: &dyn Hooks,
    ) -> Result<(), PackStreamError> {
        let dehydrated = hooks.dehydrate(value.clone()).inspect_err(|e| {
            tracing::warn!(error = %e, "dehydration hook failed");
        })?;
        self.encode_value(channel, &dehydrated)
    }

    fn encode_value(
        &self,
        channel: &mut impl ByteChannel,
        value: &Value,
    ) -> Result<(), PackStreamError> {
        match value {
            Value::Null => {
                channel.write_u8(marker::NULL);
                Ok(())
            }
            Value::Boolean(b) => {
                channel.write_u8(if *b { marker::TRUE } else { marker::FALSE });
                Ok(())
            }
            Value::Float(f) => {
                channel.write_u8(marker::FLOAT_64);
                channel.write_f64(*f);
                Ok(())
            }
            Value::Integer(i) => {
                encode_int(channel, *i);
                Ok(())
            }
            Value::BigInteger(b) => match i64::try_from(b.clone()) {
                Ok(i) => {
                    encode_int(channel, i);
                    Ok(())
                }
                Err(_) => Err(PackStreamError::unencodable(format!(
                    "big integer {b} does not fit in a 64-bit signed integer"
                ))),
            },
            Value::String(s) => self.encode_string(channel, s),
            Value::Bytes(b) => self.encode_bytes(channel, b),
            Value::List(items) => self.encode_list(channel, items),
            Value::Map(map) => self.encode_map(channel, map),
            Value::Structure(s) => self.encode_structure(channel, s),
            Value::Undefined => Err(PackStreamError::unencodable(
                "Undefined is only legal as a list element or map entry value",
            )),
        }
    }

    fn encode_string(
        &self,
        channel: &mut impl ByteChannel,
        value: &str,
    ) -> Result<(), PackStreamError> {
        let bytes = value.as_bytes();
        encode_size_header(
            channel,
            bytes.len(),
            "string",
            marker::TINY_STRING_NIBBLE,
            marker::STRING_8,
            marker::STRING_16,
            marker::STRING_32,
        )?;
        channel.write_bytes(bytes);
        Ok(())
    }

    fn encode_bytes(
        &self,
        channel: &mut impl ByteChannel,
        value: &[u8],
    ) -> Result<(), PackStreamError> {
        if !self.byte_arrays_supported {
            tracing::debug!(len = value.len(), "refusing to pack byte array: disabled by peer");
            return Err(PackStreamError::bytes_disabled());
        }
        let len = value.len();
        if len < 256 {
            channel.write_u8(marker::BYTES_8);
            channel.write_u8(len as u8);
        } else if len < 65_536 {
            channel.write_u8(marker::BYTES_16);
            channel.write_u16(len as u16);
        } else if len <= marker::MAX_SIZE_32 {
            channel.write_u8(marker::BYTES_32);
            channel.write_u32(len as u32);
        } else {
            return Err(PackStreamError::size_exceeded("bytes", len));
        }
        channel.write_bytes(value);
        Ok(())
    }

    fn encode_list(
        &self,
        channel: &mut impl ByteChannel,
        items: &[Value],
    ) -> Result<(), PackStreamError> {
        encode_size_header(
            channel,
            items.len(),
            "list",
            marker::TINY_LIST_NIBBLE,
            marker::LIST_8,
            marker::LIST_16,
            marker::LIST_32,
        )?;
        for item in items {
            match item {
                // Invariant 4: undefined list elements are substituted with
                // Null on the wire; length is preserved.
                Value::Undefined => channel.write_u8(marker::NULL),
                other => self.encode_value(channel, other)?,
            }
        }
        Ok(())
    }

    fn encode_map(&self, channel: &mut impl ByteChannel, map: &Map) -> Result<(), PackStreamError> {
        // Invariant 3: entries whose value is undefined are omitted.
        let kept: Vec<_> = map
            .iter()
            .filter(|(_, v)| !matches!(v, Value::Undefined))
            .collect();
        encode_size_header(
            channel,
            kept.len(),
            "map",
            marker::TINY_MAP_NIBBLE,
            marker::MAP_8,
            marker::MAP_16,
            marker::MAP_32,
        )?;
        for (key, value) in kept {
            self.encode_string(channel, key)?;
            self.encode_value(channel, value)?;
        }
        Ok(())
    }

    fn encode_structure(
        &self,
        channel: &mut impl ByteChannel,
        structure: &Structure,
    ) -> Result<(), PackStreamError> {
        let len = structure.fields.len();
        if len < 16 {
            channel.write_u8(marker::TINY_STRUCT_NIBBLE | len as u8);
            channel.write_u8(structure.signature);
        } else if len < 256 {
            channel.write_u8(marker::STRUCT_8);
            channel.write_u8(len as u8);
            channel.write_u8(structure.signature);
        } else if len <= marker::MAX_STRUCT_FIELDS {
            // Fixes the source's STRUCT_16 asymmetry (see design notes):
            // the signature byte is always emitted, at every struct width.
            channel.write_u8(marker::STRUCT_16);
            channel.write_u16(len as u16);
            channel.write_u8(structure.signature);
        } else {
            tracing::warn!(len, "refusing to pack structure with too many fields");
            return Err(PackStreamError::struct_size_exceeded(len));
        }
        for field in &structure.fields {
            self.encode_value(channel, field)?;
        }
        Ok(())
    }
}

/// Encodes an integer using the smallest possible PackStream representation.
pub(crate) fn encode_int(channel: &mut impl ByteChannel, value: i64) {
    let int64 = crate::int64::Int64::new(value);
    if (-16..=127).contains(&value) {
        // TINY_INT: single byte
        channel.write_u8(value as u8);
    } else if i64::from(i8::MIN) <= value && value <= i64::from(i8::MAX) {
        channel.write_u8(marker::INT_8);
        channel.write_i8(value as i8);
    } else if i64::from(i16::MIN) <= value && value <= i64::from(i16::MAX) {
        channel.write_u8(marker::INT_16);
        channel.write_i16(value as i16);
    } else if i64::from(i32::MIN) <= value && value <= i64::from(i32::MAX) {
        channel.write_u8(marker::INT_32);
        channel.write_i32(value as i32);
    } else {
        channel.write_u8(marker::INT_64);
        // Written as two big-endian 32-bit words (high then low), matching
        // the wire layout even though `write_i64` would suffice natively.
        channel.write_i32(int64.high());
        channel.write_i32(int64.low());
    }
}

#[allow(clippy::too_many_arguments)]
fn encode_size_header(
    channel: &mut impl ByteChannel,
    len: usize,
    kind: &'static str,
    tiny_nibble: u8,
    marker_8: u8,
    marker_16: u8,
    marker_32: u8,
) -> Result<(), PackStreamError> {
    if len < 16 {
        channel.write_u8(tiny_nibble | len as u8);
    } else if len < 256 {
        channel.write_u8(marker_8);
        channel.write_u8(len as u8);
    } else if len < 65_536 {
        channel.write_u8(marker_16);
        channel.write_u16(len as u16);
    } else if len <= marker::MAX_SIZE_32 {
        channel.write_u8(marker_32);
        channel.write_u32(len as u32);
    } else {
        tracing::warn!(kind, len, "refusing to pack oversized value");
        return Err(PackStreamError::size_exceeded(kind, len));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn pack(value: &Value) -> Vec<u8> {
        let mut buf = BytesMut::new();
        Packer::new().pack(&mut buf, value).expect("pack failed");
        buf.to_vec()
    }

    #[test]
    fn packs_null() {
        assert_eq!(pack(&Value::Null), vec![0xC0]);
    }

    #[test]
    fn packs_booleans() {
        assert_eq!(pack(&Value::Boolean(true)), vec![0xC3]);
        assert_eq!(pack(&Value::Boolean(false)), vec![0xC2]);
    }

    #[test]
    fn packs_narrowest_integer_form() {
        assert_eq!(pack(&Value::Integer(127)), vec![0x7F]);
        assert_eq!(pack(&Value::Integer(128)), vec![0xC9, 0x00, 0x80]);
        assert_eq!(pack(&Value::Integer(-16)), vec![0xF0]);
        assert_eq!(pack(&Value::Integer(-17)), vec![0xC8, 0xEF]);
        assert_eq!(
            pack(&Value::Integer(i64::MIN)),
            vec![0xCB, 0x80, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn packs_strings() {
        assert_eq!(pack(&Value::String(String::new())), vec![0x80]);
        assert_eq!(pack(&Value::String("A".into())), vec![0x81, 0x41]);
        let s: String = ('a'..='p').collect(); // exactly 16 bytes
        let mut expected = vec![0xD0, 16];
        expected.extend_from_slice(s.as_bytes());
        assert_eq!(pack(&Value::String(s)), expected);
    }

    #[test]
    fn packs_map_dropping_undefined_preserving_order() {
        let mut map = Map::new();
        map.insert("k1", Value::Integer(1));
        map.insert("k2", Value::Undefined);
        map.insert("k3", Value::Null);
        let expected = vec![0xA2, 0x82, b'k', b'1', 0x01, 0x82, b'k', b'3', 0xC0];
        assert_eq!(pack(&Value::Map(map)), expected);
    }

    #[test]
    fn packs_list_substituting_undefined_with_null() {
        let list = Value::List(vec![Value::Integer(1), Value::Undefined, Value::Integer(2)]);
        assert_eq!(pack(&list), vec![0x93, 0x01, 0xC0, 0x02]);
    }

    #[test]
    fn packs_structure() {
        let structure = Structure::new(0x4E, vec![Value::from("a"), Value::Integer(1)]);
        assert_eq!(
            pack(&Value::Structure(structure)),
            vec![0xB2, 0x4E, 0x81, b'a', 0x01]
        );
    }

    #[test]
    fn bytes_disabled_fails_closed() {
        let packer = Packer::with_byte_arrays_supported(false);
        let mut buf = BytesMut::new();
        let err = packer
            .pack(&mut buf, &Value::Bytes(vec![1, 2, 3]))
            .unwrap_err();
        assert!(matches!(err, PackStreamError::Protocol(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn large_struct_uses_struct16_with_signature() {
        let fields = vec![Value::Integer(0); 300];
        let structure = Structure::new(0x7A, fields);
        let encoded = pack(&Value::Structure(structure));
        assert_eq!(encoded[0], marker::STRUCT_16);
        assert_eq!(u16::from_be_bytes([encoded[1], encoded[2]]), 300);
        assert_eq!(encoded[3], 0x7A); // signature always follows the size header
    }
}
