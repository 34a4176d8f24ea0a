//! The Unpacker: reads a marker byte, decodes the payload, and delegates
//! Structures to a hydration hook; honours the integer-width policy.

use super::marker;
use crate::channel::ByteBuffer;
use crate::error::PackStreamError;
use crate::hooks::{Hooks, IdentityHooks};
use crate::int64::Int64;
use crate::value::{Map, Structure, Value};

/// Decodes values from a [`ByteBuffer`], honouring two independent integer
/// policies that together decide what an `Integer` value on the wire
/// becomes once decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unpacker {
    /// When set, decoded integers become a host `f64`, saturating to
    /// `±INFINITY` outside the range a double represents exactly.
    pub disable_lossless_integers: bool,
    /// When set, decoded integers become an arbitrary-precision
    /// [`num_bigint::BigInt`]. Takes priority over
    /// `disable_lossless_integers` when both are set.
    pub use_big_integer: bool,
}

impl Unpacker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_disable_lossless_integers(mut self, disable: bool) -> Self {
        self.disable_lossless_integers = disable;
        self
    }

    pub fn with_use_big_integer(mut self, use_big_integer: bool) -> Self {
        self.use_big_integer = use_big_integer;
        self
    }

    /// Decodes one value with the identity hook pair.
    pub fn unpack(&self, buffer: &mut impl ByteBuffer) -> Result<Value, PackStreamError> {
        self.unpack_with_hooks(buffer, &IdentityHooks)
    }

    /// Decodes one value, passing every `Structure` encountered (including
    /// nested ones) through `hooks.hydrate`.
    pub fn unpack_with_hooks(
        &self,
        buffer: &mut impl ByteBuffer,
        hooks: &dyn Hooks,
    ) -> Result<Value, PackStreamError> {
        self.decode_value(buffer, hooks)
    }

    fn decode_value(
        &self,
        buffer: &mut impl ByteBuffer,
        hooks: &dyn Hooks,
    ) -> Result<Value, PackStreamError> {
        let m = buffer.read_u8()?;
        match m {
            marker::NULL => Ok(Value::Null),
            marker::FALSE => Ok(Value::Boolean(false)),
            marker::TRUE => Ok(Value::Boolean(true)),

            marker::FLOAT_64 => Ok(Value::Float(buffer.read_f64()?)),

            marker::INT_8 => Ok(self.finish_integer(i64::from(buffer.read_i8()?))),
            marker::INT_16 => Ok(self.finish_integer(i64::from(buffer.read_i16()?))),
            marker::INT_32 => Ok(self.finish_integer(i64::from(buffer.read_i32()?))),
            marker::INT_64 => Ok(self.finish_integer(buffer.read_i64()?)),

            marker::BYTES_8 => {
                let len = buffer.read_u8()? as usize;
                self.decode_bytes(buffer, len)
            }
            marker::BYTES_16 => {
                let len = buffer.read_u16()? as usize;
                self.decode_bytes(buffer, len)
            }
            marker::BYTES_32 => {
                let len = buffer.read_u32()? as usize;
                self.decode_bytes(buffer, len)
            }

            marker::STRING_8 => {
                let len = buffer.read_u8()? as usize;
                self.decode_string(buffer, len)
            }
            marker::STRING_16 => {
                let len = buffer.read_u16()? as usize;
                self.decode_string(buffer, len)
            }
            marker::STRING_32 => {
                let len = buffer.read_u32()? as usize;
                self.decode_string(buffer, len)
            }

            marker::LIST_8 => {
                let len = buffer.read_u8()? as usize;
                self.decode_list(buffer, hooks, len)
            }
            marker::LIST_16 => {
                let len = buffer.read_u16()? as usize;
                self.decode_list(buffer, hooks, len)
            }
            marker::LIST_32 => {
                let len = buffer.read_u32()? as usize;
                self.decode_list(buffer, hooks, len)
            }

            marker::MAP_8 => {
                let len = buffer.read_u8()? as usize;
                self.decode_map(buffer, hooks, len)
            }
            marker::MAP_16 => {
                let len = buffer.read_u16()? as usize;
                self.decode_map(buffer, hooks, len)
            }
            marker::MAP_32 => {
                let len = buffer.read_u32()? as usize;
                self.decode_map(buffer, hooks, len)
            }

            marker::STRUCT_8 => {
                let len = buffer.read_u8()? as usize;
                let signature = buffer.read_u8()?;
                self.decode_structure(buffer, hooks, signature, len)
            }
            marker::STRUCT_16 => {
                let len = buffer.read_u16()? as usize;
                let signature = buffer.read_u8()?;
                self.decode_structure(buffer, hooks, signature, len)
            }

            _ => {
                let high = m & 0xF0;
                let low = m & 0x0F;
                match high {
                    marker::TINY_STRING_NIBBLE => self.decode_string(buffer, low as usize),
                    marker::TINY_LIST_NIBBLE => self.decode_list(buffer, hooks, low as usize),
                    marker::TINY_MAP_NIBBLE => self.decode_map(buffer, hooks, low as usize),
                    marker::TINY_STRUCT_NIBBLE => {
                        let signature = buffer.read_u8()?;
                        self.decode_structure(buffer, hooks, signature, low as usize)
                    }
                    _ if m <= 0x7F => Ok(self.finish_integer(i64::from(m))),
                    _ if m >= 0xF0 => Ok(self.finish_integer(i64::from(m as i8))),
                    _ => {
                        tracing::warn!(marker = format!("0x{m:02X}"), "unknown PackStream marker");
                        Err(PackStreamError::unknown_marker(m))
                    }
                }
            }
        }
    }

    /// Applies the integer policy to a freshly-decoded raw value.
    fn finish_integer(&self, raw: i64) -> Value {
        let int64 = Int64::new(raw);
        if self.use_big_integer {
            Value::BigInteger(int64.to_big_integer())
        } else if self.disable_lossless_integers {
            Value::Float(int64.to_f64_saturating())
        } else {
            Value::Integer(raw)
        }
    }

    fn decode_bytes(
        &self,
        buffer: &mut impl ByteBuffer,
        len: usize,
    ) -> Result<Value, PackStreamError> {
        Ok(Value::Bytes(buffer.read_exact_bytes(len)?))
    }

    fn decode_string(
        &self,
        buffer: &mut impl ByteBuffer,
        len: usize,
    ) -> Result<Value, PackStreamError> {
        let data = buffer.read_exact_bytes(len)?;
        let s = String::from_utf8(data).map_err(PackStreamError::invalid_utf8)?;
        Ok(Value::String(s))
    }

    fn decode_list(
        &self,
        buffer: &mut impl ByteBuffer,
        hooks: &dyn Hooks,
        len: usize,
    ) -> Result<Value, PackStreamError> {
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.decode_value(buffer, hooks)?);
        }
        Ok(Value::List(items))
    }

    fn decode_map(
        &self,
        buffer: &mut impl ByteBuffer,
        hooks: &dyn Hooks,
        len: usize,
    ) -> Result<Value, PackStreamError> {
        let mut map = Map::with_capacity(len);
        for _ in 0..len {
            // Map keys are always decoded via the same recursive call. A
            // malformed (non-string) key is not rejected at the codec
            // layer; it is stringified via Display so decoding continues.
            let key = match self.decode_value(buffer, hooks)? {
                Value::String(s) => s,
                other => other.to_string(),
            };
            let value = self.decode_value(buffer, hooks)?;
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }

    fn decode_structure(
        &self,
        buffer: &mut impl ByteBuffer,
        hooks: &dyn Hooks,
        signature: u8,
        field_count: usize,
    ) -> Result<Value, PackStreamError> {
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            fields.push(self.decode_value(buffer, hooks)?);
        }
        Ok(hooks.hydrate(Structure::new(signature, fields)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packstream::encode::Packer;
    use bytes::BytesMut;

    fn round_trip(value: &Value) -> Value {
        let mut buf = BytesMut::new();
        Packer::new().pack(&mut buf, value).unwrap();
        let mut cursor = &buf[..];
        Unpacker::new().unpack(&mut cursor).expect("decode failed")
    }

    #[test]
    fn round_trip_null() {
        assert_eq!(round_trip(&Value::Null), Value::Null);
    }

    #[test]
    fn round_trip_bool() {
        assert_eq!(round_trip(&Value::Boolean(true)), Value::Boolean(true));
        assert_eq!(round_trip(&Value::Boolean(false)), Value::Boolean(false));
    }

    #[test]
    fn round_trip_integers_at_every_width() {
        for i in [-16, -1, 0, 1, 42, 127, -128, -17, -129, 128, -32768, 32767] {
            assert_eq!(round_trip(&Value::Integer(i)), Value::Integer(i), "failed for {i}");
        }
        for i in [
            i64::from(i32::MIN) - 1,
            i64::from(i32::MAX) + 1,
            i64::MAX,
            i64::MIN,
        ] {
            assert_eq!(round_trip(&Value::Integer(i)), Value::Integer(i), "failed for {i}");
        }
    }

    #[test]
    fn round_trip_float() {
        let val = Value::Float(3.14159);
        assert_eq!(round_trip(&val), val);
    }

    #[test]
    fn round_trip_strings() {
        assert_eq!(round_trip(&Value::String(String::new())), Value::String(String::new()));
        assert_eq!(round_trip(&Value::String("hello".into())), Value::String("hello".into()));
        let s: String = "a".repeat(200);
        assert_eq!(round_trip(&Value::String(s.clone())), Value::String(s));
    }

    #[test]
    fn round_trip_bytes() {
        let val = Value::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(round_trip(&val), val);
    }

    #[test]
    fn round_trip_list() {
        let val = Value::List(vec![
            Value::Integer(1),
            Value::String("two".into()),
            Value::Boolean(true),
        ]);
        assert_eq!(round_trip(&val), val);
    }

    #[test]
    fn round_trip_map() {
        let mut map = Map::new();
        map.insert("name", Value::String("Alice".into()));
        map.insert("age", Value::Integer(30));
        assert_eq!(round_trip(&Value::Map(map.clone())), Value::Map(map));
    }

    #[test]
    fn round_trip_structure_identity_hooks() {
        let structure = Structure::new(0x4E, vec![Value::String("Person".into()), Value::Integer(1)]);
        let decoded = round_trip(&Value::Structure(structure.clone()));
        match decoded {
            Value::Structure(s) => {
                assert_eq!(s.signature, structure.signature);
                assert_eq!(s.fields, structure.fields);
            }
            other => panic!("expected Structure, got {other}"),
        }
    }

    #[test]
    fn disable_lossless_integers_saturates_outside_safe_range() {
        let mut buf = BytesMut::new();
        Packer::new().pack(&mut buf, &Value::Integer(i64::MAX)).unwrap();
        let unpacker = Unpacker::new().with_disable_lossless_integers(true);
        let mut cursor = &buf[..];
        assert_eq!(unpacker.unpack(&mut cursor).unwrap(), Value::Float(f64::INFINITY));
    }

    #[test]
    fn disable_lossless_integers_keeps_small_integers_exact() {
        let mut buf = BytesMut::new();
        Packer::new().pack(&mut buf, &Value::Integer(42)).unwrap();
        let unpacker = Unpacker::new().with_disable_lossless_integers(true);
        let mut cursor = &buf[..];
        assert_eq!(unpacker.unpack(&mut cursor).unwrap(), Value::Float(42.0));
    }

    #[test]
    fn use_big_integer_produces_exact_big_integer() {
        let mut buf = BytesMut::new();
        Packer::new().pack(&mut buf, &Value::Integer(i64::MIN)).unwrap();
        let unpacker = Unpacker::new().with_use_big_integer(true);
        let mut cursor = &buf[..];
        assert_eq!(
            unpacker.unpack(&mut cursor).unwrap(),
            Value::BigInteger(num_bigint::BigInt::from(i64::MIN))
        );
    }

    #[test]
    fn policies_apply_to_tiny_positive_integers() {
        let mut buf = BytesMut::new();
        Packer::new().pack(&mut buf, &Value::Integer(42)).unwrap();
        assert_eq!(buf[..], [42]); // TINY_INT, not a width marker

        let mut cursor = &buf[..];
        assert_eq!(
            Unpacker::new().with_use_big_integer(true).unpack(&mut cursor).unwrap(),
            Value::BigInteger(num_bigint::BigInt::from(42))
        );

        let mut cursor = &buf[..];
        assert_eq!(
            Unpacker::new()
                .with_disable_lossless_integers(true)
                .unpack(&mut cursor)
                .unwrap(),
            Value::Float(42.0)
        );
    }

    #[test]
    fn policies_apply_to_tiny_negative_integers() {
        let mut buf = BytesMut::new();
        Packer::new().pack(&mut buf, &Value::Integer(-5)).unwrap();
        assert_eq!(buf[..], [0xFB]); // TINY_INT, not a width marker

        let mut cursor = &buf[..];
        assert_eq!(
            Unpacker::new().with_use_big_integer(true).unpack(&mut cursor).unwrap(),
            Value::BigInteger(num_bigint::BigInt::from(-5))
        );

        let mut cursor = &buf[..];
        assert_eq!(
            Unpacker::new()
                .with_disable_lossless_integers(true)
                .unpack(&mut cursor)
                .unwrap(),
            Value::Float(-5.0)
        );
    }

    #[test]
    fn unknown_marker_is_a_protocol_error() {
        let mut buf: &[u8] = &[0xC7]; // unused marker
        let err = Unpacker::new().unpack(&mut buf).unwrap_err();
        assert!(matches!(err, PackStreamError::Protocol(_)));
    }

    #[test]
    fn malformed_map_key_does_not_abort_decode() {
        // TINY_MAP of size 1, key = TINY_INT 1 (not a string), value = TRUE.
        let mut buf: &[u8] = &[0xA1, 0x01, 0xC3];
        let decoded = Unpacker::new().unpack(&mut buf).expect("decode must not fail");
        match decoded {
            Value::Map(map) => assert_eq!(map.get("1"), Some(&Value::Boolean(true))),
            other => panic!("expected Map, got {other}"),
        }
    }
}
