// SPDX-License-Identifier: Apache-2.0

use crate::format::{ObjOpcode, RecordOpcode, MAGIC};
use crate::varint::write_varint;
use nano_redis_value::Obj;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("io error writing snapshot: {0}")]
    Io(#[from] io::Error),
}

/// Wraps a writer, folding every byte written through it into a running
/// CRC-32 so the final footer covers all preceding bytes without a second
/// pass over the file.
struct CrcWriter<W> {
    inner: W,
    hasher: crc32fast::Hasher,
}

impl<W: Write> Write for CrcWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn write_varint_io<W: Write>(w: &mut W, value: u64) -> io::Result<()> {
    let mut buf = Vec::with_capacity(10);
    write_varint(&mut buf, value);
    w.write_all(&buf)
}

fn write_bytes_with_len<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    write_varint_io(w, bytes.len() as u64)?;
    w.write_all(bytes)
}

/// Writes NRDB records for one shard. Only the last-selected dbid is
/// remembered, so callers should group entries by db to avoid redundant
/// `DB_SELECT` records, though correctness doesn't depend on it.
pub struct Serializer<W: Write> {
    out: CrcWriter<W>,
    current_db: Option<u16>,
}

impl<W: Write> Serializer<W> {
    pub fn new(
        writer: W,
        shard_id: u32,
        num_shards: u32,
        timestamp_ms: u64,
        num_dbs: u16,
    ) -> io::Result<Self> {
        let mut out = CrcWriter {
            inner: writer,
            hasher: crc32fast::Hasher::new(),
        };
        out.write_all(&MAGIC)?;
        out.write_all(&shard_id.to_le_bytes())?;
        out.write_all(&num_shards.to_le_bytes())?;
        out.write_all(&timestamp_ms.to_le_bytes())?;
        out.write_all(&num_dbs.to_le_bytes())?;
        Ok(Serializer {
            out,
            current_db: None,
        })
    }

    /// Writes `DB_SIZE` as an informational record, for example right after
    /// a `DB_SELECT` so a reader can pre-size its table without scanning
    /// ahead.
    pub fn write_db_size(&mut self, size: u64) -> io::Result<()> {
        self.out.write_all(&[RecordOpcode::DbSize as u8])?;
        write_varint_io(&mut self.out, size)
    }

    pub fn write_entry(
        &mut self,
        db: u16,
        key: &Obj,
        value: &Obj,
        expire_ms: Option<i64>,
    ) -> io::Result<()> {
        if self.current_db != Some(db) {
            self.out.write_all(&[RecordOpcode::DbSelect as u8])?;
            write_varint_io(&mut self.out, db as u64)?;
            self.current_db = Some(db);
        }
        if let Some(ms) = expire_ms {
            self.out.write_all(&[RecordOpcode::ExpireMs as u8])?;
            write_varint_io(&mut self.out, ms as u64)?;
        }
        self.write_object(key, value)
    }

    fn write_object(&mut self, key: &Obj, value: &Obj) -> io::Result<()> {
        let key_bytes = key.as_string();
        match value {
            Obj::Int(v) => {
                self.out.write_all(&[ObjOpcode::Int as u8])?;
                write_bytes_with_len(&mut self.out, &key_bytes)?;
                self.out.write_all(&v.to_le_bytes())?;
            }
            Obj::Inline(_) | Obj::Small(_) => {
                self.out.write_all(&[ObjOpcode::String as u8])?;
                write_bytes_with_len(&mut self.out, &key_bytes)?;
                write_bytes_with_len(&mut self.out, value.as_bytes().unwrap_or(&[]))?;
            }
            Obj::Hash(map) => {
                self.out.write_all(&[ObjOpcode::Hash as u8])?;
                write_bytes_with_len(&mut self.out, &key_bytes)?;
                write_varint_io(&mut self.out, map.len() as u64)?;
                for (k, v) in map.iter() {
                    write_bytes_with_len(&mut self.out, k)?;
                    write_bytes_with_len(&mut self.out, v)?;
                }
            }
            Obj::Set(set) => {
                self.out.write_all(&[ObjOpcode::Set as u8])?;
                write_bytes_with_len(&mut self.out, &key_bytes)?;
                write_varint_io(&mut self.out, set.len() as u64)?;
                for member in set.iter() {
                    write_bytes_with_len(&mut self.out, member)?;
                }
            }
            Obj::List(list) => {
                self.out.write_all(&[ObjOpcode::List as u8])?;
                write_bytes_with_len(&mut self.out, &key_bytes)?;
                write_varint_io(&mut self.out, list.len() as u64)?;
                for elem in list.iter() {
                    write_bytes_with_len(&mut self.out, &elem.as_string())?;
                }
            }
            Obj::Null => {
                // Null values are never stored in the main table; nothing
                // to write.
            }
        }
        Ok(())
    }

    /// Writes the `EOF` opcode and the CRC-32 footer over everything
    /// written so far, then flushes the underlying writer.
    pub fn finish(mut self) -> io::Result<()> {
        self.out.write_all(&[RecordOpcode::Eof as u8])?;
        let crc = self.out.hasher.clone().finalize();
        self.out.inner.write_all(&crc.to_le_bytes())?;
        self.out.inner.flush()
    }
}

/// Saves `entries` (already-collected `(db, key, value, expire_ms)` tuples,
/// typically gathered by [`crate::SliceSnapshot`]) to `path`, writing to a
/// `.tmp` sibling first and renaming atomically on success.
pub fn save_to_path(
    path: &Path,
    shard_id: u32,
    num_shards: u32,
    timestamp_ms: u64,
    num_dbs: u16,
    entries: impl IntoIterator<Item = (u16, Obj, Obj, Option<i64>)>,
) -> Result<(), SaveError> {
    let tmp_path = path.with_extension("nrdb.tmp");
    let result = (|| -> Result<(), SaveError> {
        let file = File::create(&tmp_path)?;
        let mut ser = Serializer::new(file, shard_id, num_shards, timestamp_ms, num_dbs)?;
        for (db, key, value, expire_ms) in entries {
            ser.write_entry(db, &key, &value, expire_ms)?;
        }
        ser.finish()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializer_writes_header_and_footer() {
        let mut buf = Vec::new();
        let ser = Serializer::new(&mut buf, 0, 1, 1_000, 16).unwrap();
        ser.finish().unwrap();
        assert_eq!(&buf[0..8], &MAGIC);
        assert_eq!(buf.len(), crate::format::HEADER_LEN + 1 + 4);
        assert_eq!(buf[buf.len() - 5], RecordOpcode::Eof as u8);
    }
}
