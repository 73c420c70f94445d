// SPDX-License-Identifier: Apache-2.0

use crate::context::CommandContext;
use crate::glob::glob_match;
use crate::reply::{array_reply, bulk_reply, int_reply, obj_reply};
use nano_redis_common::error::{NanoError, NanoResult};
use nano_redis_proto::ok_reply;
use nano_redis_value::Obj;

fn arg<'a>(args: &'a [Obj], i: usize) -> NanoResult<&'a Obj> {
    args.get(i)
        .ok_or_else(|| NanoError::InvalidArgument("missing argument".into()))
}

fn require_string(v: &Obj) -> NanoResult<&Obj> {
    if v.is_string() {
        Ok(v)
    } else {
        Err(NanoError::WrongType)
    }
}

pub fn cmd_get(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    match ctx.db.get(&key) {
        None => Ok(obj_reply(None)),
        Some(v) => {
            require_string(&v)?;
            Ok(bulk_reply(&v.as_string()))
        }
    }
}

pub fn cmd_set(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let value = arg(args, 1)?.clone().maybe_int_encode();
    ctx.db.set(key, value);
    Ok(ok_reply())
}

pub fn cmd_del(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let mut removed = 0i64;
    for key in args {
        if ctx.db.remove(key) {
            removed += 1;
        }
    }
    Ok(int_reply(removed))
}

pub fn cmd_exists(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let mut count = 0i64;
    for key in args {
        if ctx.db.contains(key) {
            count += 1;
        }
    }
    Ok(int_reply(count))
}

pub fn cmd_mget(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let mut out = Vec::with_capacity(args.len());
    for key in args {
        let reply = match ctx.db.get(key) {
            Some(v) if v.is_string() => obj_reply(Some(&v)),
            _ => obj_reply(None),
        };
        out.push(reply);
    }
    Ok(array_reply(out))
}

pub fn cmd_mset(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    if args.len() % 2 != 0 {
        return Err(NanoError::InvalidArgument(
            "wrong number of arguments for MSET".into(),
        ));
    }
    for pair in args.chunks_exact(2) {
        ctx.db.set(pair[0].clone(), pair[1].clone().maybe_int_encode());
    }
    Ok(ok_reply())
}

fn incr_by(ctx: &mut CommandContext, key: &Obj, delta: i64) -> NanoResult<i64> {
    let current = match ctx.db.get(key) {
        None => 0,
        Some(v) => v
            .try_as_int()
            .ok_or_else(|| NanoError::InvalidArgument("value is not an integer".into()))?,
    };
    let next = current
        .checked_add(delta)
        .ok_or_else(|| NanoError::InvalidArgument("increment would overflow".into()))?;
    ctx.db.set(key.clone(), Obj::from_int(next));
    Ok(next)
}

pub fn cmd_incr(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?;
    Ok(int_reply(incr_by(ctx, key, 1)?))
}

pub fn cmd_decr(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?;
    Ok(int_reply(incr_by(ctx, key, -1)?))
}

pub fn cmd_incrby(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?;
    let delta = arg(args, 1)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("increment is not an integer".into()))?;
    Ok(int_reply(incr_by(ctx, key, delta)?))
}

pub fn cmd_decrby(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?;
    let delta = arg(args, 1)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("decrement is not an integer".into()))?;
    Ok(int_reply(incr_by(ctx, key, -delta)?))
}

pub fn cmd_append(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let suffix = arg(args, 1)?.as_string();
    let mut current = match ctx.db.get(&key) {
        Some(v) => {
            require_string(&v)?;
            v.as_string()
        }
        None => Vec::new(),
    };
    current.extend_from_slice(&suffix);
    let len = current.len() as i64;
    ctx.db.set(key, Obj::from_string(current).maybe_int_encode());
    Ok(int_reply(len))
}

pub fn cmd_strlen(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?;
    let len = match ctx.db.get(key) {
        Some(v) => {
            require_string(&v)?;
            v.size() as i64
        }
        None => 0,
    };
    Ok(int_reply(len))
}

/// Resolves a possibly-negative Redis-style index against `len`, clamped
/// into `0..=len`.
fn resolve_index(idx: i64, len: usize) -> usize {
    if idx < 0 {
        let from_end = (-idx) as usize;
        len.saturating_sub(from_end)
    } else {
        (idx as usize).min(len)
    }
}

pub fn cmd_getrange(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?;
    let start = arg(args, 1)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("start is not an integer".into()))?;
    let end = arg(args, 2)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("end is not an integer".into()))?;
    let bytes = match ctx.db.get(key) {
        Some(v) => {
            require_string(&v)?;
            v.as_string()
        }
        None => return Ok(bulk_reply(&[])),
    };
    let len = bytes.len();
    if len == 0 {
        return Ok(bulk_reply(&[]));
    }
    let lo = resolve_index(start, len);
    // `end` is inclusive in the Redis contract, so the exclusive bound is
    // the resolved index of `end + 1`, clamped by the `end == -1` "to the
    // last byte" case.
    let hi = if end < 0 {
        resolve_index(end + 1, len).max(lo)
    } else {
        ((end as usize) + 1).min(len)
    };
    if lo >= hi {
        return Ok(bulk_reply(&[]));
    }
    Ok(bulk_reply(&bytes[lo..hi]))
}

pub fn cmd_setrange(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let offset = arg(args, 1)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("offset is not an integer".into()))?;
    if offset < 0 {
        return Err(NanoError::InvalidArgument("offset is out of range".into()));
    }
    let patch = arg(args, 2)?.as_string();
    let mut bytes = match ctx.db.get(&key) {
        Some(v) => {
            require_string(&v)?;
            v.as_string()
        }
        None => Vec::new(),
    };
    let offset = offset as usize;
    if bytes.len() < offset + patch.len() {
        bytes.resize(offset + patch.len(), 0);
    }
    bytes[offset..offset + patch.len()].copy_from_slice(&patch);
    let len = bytes.len() as i64;
    ctx.db.set(key, Obj::from_string(bytes).maybe_int_encode());
    Ok(int_reply(len))
}

pub fn cmd_select(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let idx = arg(args, 0)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("index is not an integer".into()))?;
    if idx < 0 || !ctx.db.select(idx as usize) {
        return Err(NanoError::InvalidArgument("DB index is out of range".into()));
    }
    Ok(ok_reply())
}

pub fn cmd_keys(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let pattern = arg(args, 0)?.as_string();
    let mut matches = Vec::new();
    ctx.db.slot().main.for_each(|k, _v| {
        let kb = k.as_string();
        if glob_match(&pattern, &kb) {
            matches.push(kb);
        }
    });
    // Dash iteration order isn't meaningful; sort so output is deterministic.
    matches.sort();
    Ok(array_reply(matches.into_iter().map(|kb| bulk_reply(&kb)).collect()))
}

pub fn cmd_dbsize(ctx: &mut CommandContext, _args: &[Obj]) -> NanoResult<Vec<u8>> {
    Ok(int_reply(ctx.db.size() as i64))
}

pub fn cmd_flushdb(ctx: &mut CommandContext, _args: &[Obj]) -> NanoResult<Vec<u8>> {
    ctx.db.flush_current();
    Ok(ok_reply())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nano_redis_db::Database;

    fn ctx(db: &mut Database) -> CommandContext<'_> {
        CommandContext::new(db, 1)
    }

    fn s(text: &str) -> Obj {
        Obj::from_string(text.as_bytes().to_vec())
    }

    #[test]
    fn set_then_get() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_set(&mut c, &[s("k"), s("v")]).unwrap();
        assert_eq!(cmd_get(&mut c, &[s("k")]).unwrap(), b"$1\r\nv\r\n");
    }

    #[test]
    fn incr_on_missing_key_starts_at_zero() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        let reply = cmd_incr(&mut c, &[s("counter")]).unwrap();
        assert_eq!(reply, b":1\r\n");
    }

    #[test]
    fn incr_on_non_integer_value_errors() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_set(&mut c, &[s("k"), s("not-a-number")]).unwrap();
        assert!(cmd_incr(&mut c, &[s("k")]).is_err());
    }

    #[test]
    fn append_grows_and_returns_new_length() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_set(&mut c, &[s("k"), s("Hello")]).unwrap();
        let reply = cmd_append(&mut c, &[s("k"), s(" World")]).unwrap();
        assert_eq!(reply, b":11\r\n");
        assert_eq!(cmd_get(&mut c, &[s("k")]).unwrap(), bulk_reply(b"Hello World"));
    }

    #[test]
    fn getrange_handles_negative_indices() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_set(&mut c, &[s("k"), s("This is a string")]).unwrap();
        assert_eq!(cmd_getrange(&mut c, &[s("k"), s("0"), s("3")]).unwrap(), bulk_reply(b"This"));
        assert_eq!(cmd_getrange(&mut c, &[s("k"), s("-3"), s("-1")]).unwrap(), bulk_reply(b"ing"));
    }

    #[test]
    fn setrange_pads_with_zero_bytes() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_setrange(&mut c, &[s("k"), s("5"), s("hello")]).unwrap();
        let v = cmd_get(&mut c, &[s("k")]).unwrap();
        assert_eq!(v, bulk_reply(b"\0\0\0\0\0hello"));
    }

    #[test]
    fn del_and_exists_count_correctly() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_set(&mut c, &[s("a"), s("1")]).unwrap();
        cmd_set(&mut c, &[s("b"), s("2")]).unwrap();
        assert_eq!(cmd_exists(&mut c, &[s("a"), s("b"), s("missing")]).unwrap(), b":2\r\n");
        assert_eq!(cmd_del(&mut c, &[s("a"), s("missing")]).unwrap(), b":1\r\n");
    }

    #[test]
    fn keys_matches_glob_pattern() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_set(&mut c, &[s("user:1"), s("a")]).unwrap();
        cmd_set(&mut c, &[s("user:2"), s("b")]).unwrap();
        cmd_set(&mut c, &[s("session:1"), s("c")]).unwrap();
        let reply = cmd_keys(&mut c, &[s("user:*")]).unwrap();
        assert_eq!(reply, b"*2\r\n$6\r\nuser:1\r\n$6\r\nuser:2\r\n".to_vec());
    }

    #[test]
    fn wrong_type_on_get_of_hash_key() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        c.db.set(s("h"), Obj::from_hash(Default::default()));
        assert_eq!(cmd_get(&mut c, &[s("h")]), Err(NanoError::WrongType));
    }
}
