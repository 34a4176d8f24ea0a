//! PackStream: a binary presentation format for the exchange of richly-typed
//! data. It uses big-endian byte ordering exclusively.

pub mod decode;
pub mod encode;
pub mod marker;

pub use decode::Unpacker;
pub use encode::Packer;
