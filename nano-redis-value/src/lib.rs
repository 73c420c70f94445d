// SPDX-License-Identifier: Apache-2.0

//! The compact, 16-byte-in-spirit tagged value (`Obj`) at the bottom of the
//! nano-redis storage stack.
//!
//! A hand-packed tag byte, flag byte, and 14-byte payload union crammed
//! into a literal 16-byte struct would need `unsafe` unions to express
//! safely in Rust, and nothing observable about the value representation
//! actually depends on `size_of::<Obj>() == 16` — only the *externally
//! observable* encoding-selection and equality rules matter. So `Obj` here
//! is a safe tagged enum that preserves every rule (inline vs.
//! small-string threshold at 14/15 bytes, the small-string 4-byte prefix,
//! canonical-decimal integer encoding, cross-encoding equality) without
//! the unsafe bit-packing. See DESIGN.md.

mod builder;
mod collections;
mod dash_hash;
mod obj;

pub use builder::StringBuilder;
pub use collections::{HashValue, ListValue, SetValue};
pub use obj::{Obj, ObjEncoding, ObjType};
