// SPDX-License-Identifier: Apache-2.0

//! NRDB snapshot format: header, opcode-tagged records, varint integers,
//! and a CRC-32 footer; plus the consistent point-in-time `SliceSnapshot`
//! algorithm and background-save orchestration.

mod format;
mod loader;
mod serializer;
mod slice;
mod varint;

pub use format::{Magic, ObjOpcode, RecordOpcode, HEADER_LEN, MAGIC};
pub use loader::{load, LoadError};
pub use serializer::{save_to_path, SaveError, Serializer};
pub use slice::SliceSnapshot;
