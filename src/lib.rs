//! `packstream` — a typed, self-describing binary codec for graph-database
//! wire protocols.
//!
//! PackStream transforms a set of application values into a compact byte
//! stream and reconstructs them on the other side. This crate provides the
//! encoder (`Packer`) and decoder (`Unpacker`), the value/type system they
//! recognize, the marker-byte grammar, integer width selection, the
//! Structure envelope, and the hook protocol used to carry
//! application-defined types (nodes, relationships, temporal values,
//! spatial points, or anything else a caller assigns to a signature byte).
//!
//! # Architecture
//!
//! - **`value`** — the recognized value domain: `Value`, `Map`, `Structure`.
//! - **`int64`** — the `Int64` helper (a thin, zero-cost wrapper on hosts
//!   whose native integer is already lossless at 64 bits).
//! - **`channel`** — the `ByteChannel` / `ByteBuffer` sink/source contracts.
//! - **`hooks`** — the `Hooks` capability pair for application-defined
//!   Structure interpretation.
//! - **`packstream`** — `Packer` and `Unpacker`, plus the marker grammar.
//!
//! Network I/O, message framing, session/transaction machinery, connection
//! pooling, authentication, and the public driver surface built on top of
//! this codec are deliberately out of scope for this crate.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use packstream::{Packer, Unpacker, Value};
//!
//! let mut buf = BytesMut::new();
//! Packer::new().pack(&mut buf, &Value::String("hello".into())).unwrap();
//!
//! let mut cursor = &buf[..];
//! let decoded = Unpacker::new().unpack(&mut cursor).unwrap();
//! assert_eq!(decoded, Value::String("hello".into()));
//! ```

pub mod channel;
pub mod error;
pub mod hooks;
pub mod int64;
pub mod packstream;
pub mod value;

pub use channel::{ByteBuffer, ByteChannel};
pub use error::PackStreamError;
pub use hooks::{Hooks, IdentityHooks};
pub use int64::Int64;
pub use packstream::{Packer, Unpacker};
pub use value::{Map, Structure, Value};
