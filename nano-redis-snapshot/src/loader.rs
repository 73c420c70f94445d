// SPDX-License-Identifier: Apache-2.0

use crate::format::{ObjOpcode, RecordOpcode, HEADER_LEN, MAGIC};
use crate::varint::read_varint;
use nano_redis_db::Database;
use nano_redis_value::{HashValue, ListValue, Obj, SetValue};
use std::io::Read;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("io error reading snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad magic bytes, not an NRDB file")]
    BadMagic,
    #[error("snapshot was written for shard {found}, expected {expected}")]
    ShardMismatch { expected: u32, found: u32 },
    #[error("snapshot is truncated")]
    Truncated,
    #[error("CRC-32 mismatch: snapshot is corrupt")]
    CrcMismatch,
    #[error("malformed snapshot record: {0}")]
    Malformed(String),
}

/// The header fields of a loaded snapshot, useful for `INFO`-style
/// reporting after a successful load.
#[derive(Debug, Clone, Copy)]
pub struct LoadedHeader {
    pub shard_id: u32,
    pub num_shards: u32,
    pub timestamp_ms: u64,
    pub num_dbs: u16,
}

/// Validates magic, shard id, and the trailing CRC-32, then replays every
/// record into `db`. `ZSET` records are recognized (so a
/// file written by a newer build doesn't fail outright) but rejected,
/// since nano-redis doesn't implement sorted sets.
pub fn load<R: Read>(
    mut reader: R,
    expected_shard_id: u32,
    db: &mut Database,
) -> Result<LoadedHeader, LoadError> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;

    if buf.len() < HEADER_LEN + 1 + 4 {
        return Err(LoadError::Truncated);
    }
    if buf[0..8] != MAGIC {
        return Err(LoadError::BadMagic);
    }
    let shard_id = u32::from_le_bytes(buf[8..12].try_into().unwrap());
    let num_shards = u32::from_le_bytes(buf[12..16].try_into().unwrap());
    let timestamp_ms = u64::from_le_bytes(buf[16..24].try_into().unwrap());
    let num_dbs = u16::from_le_bytes(buf[24..26].try_into().unwrap());
    if shard_id != expected_shard_id {
        return Err(LoadError::ShardMismatch {
            expected: expected_shard_id,
            found: shard_id,
        });
    }

    let crc_bytes_at = buf.len() - 4;
    let expected_crc = u32::from_le_bytes(buf[crc_bytes_at..].try_into().unwrap());
    let actual_crc = crc32fast::hash(&buf[..crc_bytes_at]);
    if actual_crc != expected_crc {
        return Err(LoadError::CrcMismatch);
    }

    replay_records(&buf[..crc_bytes_at], db)?;

    Ok(LoadedHeader {
        shard_id,
        num_shards,
        timestamp_ms,
        num_dbs,
    })
}

fn read_len_bytes<'a>(buf: &'a [u8], pos: &mut usize) -> Result<&'a [u8], LoadError> {
    let (len, n) = read_varint(buf, *pos).ok_or(LoadError::Truncated)?;
    *pos += n;
    let len = len as usize;
    let end = pos.checked_add(len).ok_or(LoadError::Truncated)?;
    let slice = buf.get(*pos..end).ok_or(LoadError::Truncated)?;
    *pos = end;
    Ok(slice)
}

fn replay_records(buf: &[u8], db: &mut Database) -> Result<(), LoadError> {
    let mut pos = HEADER_LEN;
    let mut current_db: u16 = 0;
    let mut pending_expire: Option<i64> = None;

    while pos < buf.len() {
        let opcode = buf[pos];
        if let Some(rec) = RecordOpcode::from_u8(opcode) {
            pos += 1;
            match rec {
                RecordOpcode::DbSelect => {
                    let (v, n) = read_varint(buf, pos).ok_or(LoadError::Truncated)?;
                    current_db = v as u16;
                    pos += n;
                }
                RecordOpcode::DbSize => {
                    let (_, n) = read_varint(buf, pos).ok_or(LoadError::Truncated)?;
                    pos += n;
                }
                RecordOpcode::ExpireMs => {
                    let (v, n) = read_varint(buf, pos).ok_or(LoadError::Truncated)?;
                    pending_expire = Some(v as i64);
                    pos += n;
                }
                RecordOpcode::Eof => break,
            }
            continue;
        }

        let obj_opcode = ObjOpcode::from_u8(opcode)
            .ok_or_else(|| LoadError::Malformed(format!("unknown opcode {opcode:#04x}")))?;
        pos += 1;
        let key_bytes = read_len_bytes(buf, &mut pos)?.to_vec();
        let key = Obj::from_string(key_bytes).maybe_int_encode();
        let expire_ms = pending_expire.take();

        let value = match obj_opcode {
            ObjOpcode::Int => {
                let end = pos.checked_add(8).ok_or(LoadError::Truncated)?;
                let raw: [u8; 8] = buf
                    .get(pos..end)
                    .ok_or(LoadError::Truncated)?
                    .try_into()
                    .unwrap();
                pos = end;
                Obj::from_int(i64::from_le_bytes(raw))
            }
            ObjOpcode::String => {
                let bytes = read_len_bytes(buf, &mut pos)?.to_vec();
                Obj::from_string(bytes)
            }
            ObjOpcode::Hash => {
                let (count, n) = read_varint(buf, pos).ok_or(LoadError::Truncated)?;
                pos += n;
                let mut map = HashValue::with_capacity_and_hasher(count as usize, Default::default());
                for _ in 0..count {
                    let k = read_len_bytes(buf, &mut pos)?.to_vec();
                    let v = read_len_bytes(buf, &mut pos)?.to_vec();
                    map.insert(k, v);
                }
                Obj::from_hash(map)
            }
            ObjOpcode::Set => {
                let (count, n) = read_varint(buf, pos).ok_or(LoadError::Truncated)?;
                pos += n;
                let mut set = SetValue::with_capacity_and_hasher(count as usize, Default::default());
                for _ in 0..count {
                    let member = read_len_bytes(buf, &mut pos)?.to_vec();
                    set.insert(member);
                }
                Obj::from_set(set)
            }
            ObjOpcode::List => {
                let (count, n) = read_varint(buf, pos).ok_or(LoadError::Truncated)?;
                pos += n;
                let mut list = ListValue::with_capacity(count as usize);
                for _ in 0..count {
                    let bytes = read_len_bytes(buf, &mut pos)?.to_vec();
                    list.push_back(Obj::from_string(bytes).maybe_int_encode());
                }
                Obj::from_list(list)
            }
            ObjOpcode::ZSet => {
                return Err(LoadError::Malformed(
                    "ZSET records are not supported by this build".into(),
                ));
            }
        };

        match db.slot_at_mut(current_db as usize) {
            Some(slot) => {
                slot.main.insert(key.clone(), value);
                if let Some(ms) = expire_ms {
                    slot.expiry.insert(key, ms);
                }
            }
            None => {
                tracing::warn!(db = current_db, "dropping entry for out-of-range db slot");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::Serializer;

    #[test]
    fn round_trips_a_small_database() {
        let mut buf = Vec::new();
        let mut ser = Serializer::new(&mut buf, 0, 1, 123, 16).unwrap();
        ser.write_entry(0, &Obj::from_string(b"k1".to_vec()), &Obj::from_int(7), None)
            .unwrap();
        ser.write_entry(
            1,
            &Obj::from_string(b"k2".to_vec()),
            &Obj::from_string(b"hello".to_vec()),
            Some(999_999_999_999),
        )
        .unwrap();
        ser.finish().unwrap();

        let mut db = Database::new();
        let header = load(&buf[..], 0, &mut db).unwrap();
        assert_eq!(header.shard_id, 0);
        assert_eq!(header.timestamp_ms, 123);

        db.select(0);
        assert_eq!(*db.get(&Obj::from_string(b"k1".to_vec())).unwrap(), Obj::from_int(7));
        db.select(1);
        assert_eq!(
            *db.get(&Obj::from_string(b"k2".to_vec())).unwrap(),
            Obj::from_string(b"hello".to_vec())
        );
        assert_ne!(
            db.ttl(&Obj::from_string(b"k2".to_vec())),
            nano_redis_common::time::NO_EXPIRE
        );
    }

    #[test]
    fn rejects_wrong_shard_id() {
        let mut buf = Vec::new();
        let ser = Serializer::new(&mut buf, 3, 8, 0, 16).unwrap();
        ser.finish().unwrap();
        let mut db = Database::new();
        assert!(matches!(
            load(&buf[..], 0, &mut db),
            Err(LoadError::ShardMismatch { .. })
        ));
    }

    #[test]
    fn rejects_corrupted_crc() {
        let mut buf = Vec::new();
        let ser = Serializer::new(&mut buf, 0, 1, 0, 16).unwrap();
        ser.finish().unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;
        let mut db = Database::new();
        assert!(matches!(load(&buf[..], 0, &mut db), Err(LoadError::CrcMismatch)));
    }

    #[test]
    fn round_trips_collections() {
        let mut buf = Vec::new();
        let mut ser = Serializer::new(&mut buf, 0, 1, 0, 16).unwrap();
        let mut hash = HashValue::default();
        hash.insert(b"f1".to_vec(), b"v1".to_vec());
        ser.write_entry(0, &Obj::from_string(b"h".to_vec()), &Obj::from_hash(hash), None)
            .unwrap();
        let mut set = SetValue::default();
        set.insert(b"m1".to_vec());
        ser.write_entry(0, &Obj::from_string(b"s".to_vec()), &Obj::from_set(set), None)
            .unwrap();
        let mut list = ListValue::new();
        list.push_back(Obj::from_string(b"a".to_vec()));
        ser.write_entry(0, &Obj::from_string(b"l".to_vec()), &Obj::from_list(list), None)
            .unwrap();
        ser.finish().unwrap();

        let mut db = Database::new();
        load(&buf[..], 0, &mut db).unwrap();
        assert!(db.get(&Obj::from_string(b"h".to_vec())).unwrap().as_hash().is_some());
        assert!(db.get(&Obj::from_string(b"s".to_vec())).unwrap().as_set().is_some());
        assert!(db.get(&Obj::from_string(b"l".to_vec())).unwrap().as_list().is_some());
    }
}
