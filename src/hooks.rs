//! Dehydration / hydration hooks: the capability pair that lets a caller
//! extend PackStream with application-defined Structure types without the
//! codec knowing anything about them.
//!
//! Per the source design notes, hooks are a first-class object passed
//! explicitly into each `pack`/`unpack` call — never a process-global
//! registry — so two callers in the same process can disagree about what a
//! given signature byte means.

use crate::error::PackStreamError;
use crate::value::{Structure, Value};

/// A dehydrate/hydrate capability pair.
///
/// `dehydrate` runs once per top-level value on encode, translating an
/// application value into the codec's recognized domain (typically by
/// turning a domain type into `Value::Structure`). `hydrate` runs once per
/// `Structure` encountered on decode, translating it into a domain value —
/// or passing it through unchanged if the signature isn't recognized.
///
/// Both methods default to identity, so a caller that only needs the bare
/// PackStream types can use [`IdentityHooks`] or skip hooks entirely via
/// [`crate::Packer::pack`] / [`crate::Unpacker::unpack`].
pub trait Hooks {
    fn dehydrate(&self, value: Value) -> Result<Value, PackStreamError> {
        Ok(value)
    }

    fn hydrate(&self, structure: Structure) -> Value {
        Value::Structure(structure)
    }
}

/// The identity hook pair: dehydrate and hydrate are both no-ops.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityHooks;

impl Hooks for IdentityHooks {}
