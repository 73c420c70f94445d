// SPDX-License-Identifier: Apache-2.0

use crate::context::CommandContext;
use crate::reply::{array_reply, bulk_reply, int_reply, obj_reply};
use nano_redis_common::error::{NanoError, NanoResult};
use nano_redis_value::{HashValue, Obj};
use rand::seq::IteratorRandom;
use rand::Rng;

fn arg<'a>(args: &'a [Obj], i: usize) -> NanoResult<&'a Obj> {
    args.get(i)
        .ok_or_else(|| NanoError::InvalidArgument("missing argument".into()))
}

fn with_hash<'c>(ctx: &'c mut CommandContext<'_>, key: &Obj) -> NanoResult<Option<std::cell::Ref<'c, Obj>>> {
    match ctx.db.get(key) {
        Some(v) if v.is_hash() => Ok(Some(v)),
        Some(_) => Err(NanoError::WrongType),
        None => Ok(None),
    }
}

/// Gets-or-creates the hash at `key`, returning a fresh owned map that the
/// caller mutates and writes back with [`Database::set`]. `Obj` doesn't
/// expose an in-place "entry or insert" API across the Dash boundary, so
/// mutation here follows a plain read-modify-write via `Database::get`/`set`.
fn take_or_new_hash(ctx: &mut CommandContext, key: &Obj) -> NanoResult<HashValue> {
    match ctx.db.get(key) {
        Some(v) if v.is_hash() => Ok(v.as_hash().unwrap().clone()),
        Some(_) => Err(NanoError::WrongType),
        None => Ok(HashValue::default()),
    }
}

pub fn cmd_hset(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let rest = &args[1..];
    if rest.is_empty() || rest.len() % 2 != 0 {
        return Err(NanoError::InvalidArgument(
            "wrong number of arguments for HSET".into(),
        ));
    }
    let mut map = take_or_new_hash(ctx, &key)?;
    let mut added = 0i64;
    for pair in rest.chunks_exact(2) {
        let field = pair[0].as_string();
        let value = pair[1].as_string();
        if map.insert(field, value).is_none() {
            added += 1;
        }
    }
    ctx.db.set(key, Obj::from_hash(map));
    Ok(int_reply(added))
}

pub fn cmd_hmset(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    cmd_hset(ctx, args)?;
    Ok(nano_redis_proto::ok_reply())
}

pub fn cmd_hget(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let field = arg(args, 1)?.as_string();
    match with_hash(ctx, &key)? {
        None => Ok(obj_reply(None)),
        Some(v) => {
            let map = v.as_hash().unwrap();
            Ok(match map.get(&field) {
                Some(bytes) => bulk_reply(bytes),
                None => obj_reply(None),
            })
        }
    }
}

pub fn cmd_hmget(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let fields = &args[1..];
    let snapshot = match with_hash(ctx, &key)? {
        Some(v) => Some(v.as_hash().unwrap().clone()),
        None => None,
    };
    let mut out = Vec::with_capacity(fields.len());
    for f in fields {
        let fb = f.as_string();
        out.push(match &snapshot {
            Some(map) => match map.get(&fb) {
                Some(bytes) => bulk_reply(bytes),
                None => obj_reply(None),
            },
            None => obj_reply(None),
        });
    }
    Ok(array_reply(out))
}

pub fn cmd_hdel(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let mut map = take_or_new_hash(ctx, &key)?;
    let mut removed = 0i64;
    for f in &args[1..] {
        if map.remove(&f.as_string()).is_some() {
            removed += 1;
        }
    }
    ctx.db.set(key, Obj::from_hash(map));
    Ok(int_reply(removed))
}

pub fn cmd_hexists(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let field = arg(args, 1)?.as_string();
    let exists = match with_hash(ctx, &key)? {
        Some(v) => v.as_hash().unwrap().contains_key(&field),
        None => false,
    };
    Ok(int_reply(exists as i64))
}

pub fn cmd_hlen(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let len = match with_hash(ctx, &key)? {
        Some(v) => v.as_hash().unwrap().len(),
        None => 0,
    };
    Ok(int_reply(len as i64))
}

pub fn cmd_hkeys(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let out = match with_hash(ctx, &key)? {
        Some(v) => v.as_hash().unwrap().keys().map(|k| bulk_reply(k)).collect(),
        None => Vec::new(),
    };
    Ok(array_reply(out))
}

pub fn cmd_hvals(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let out = match with_hash(ctx, &key)? {
        Some(v) => v.as_hash().unwrap().values().map(|val| bulk_reply(val)).collect(),
        None => Vec::new(),
    };
    Ok(array_reply(out))
}

pub fn cmd_hgetall(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let mut out = Vec::new();
    if let Some(v) = with_hash(ctx, &key)? {
        for (k, val) in v.as_hash().unwrap().iter() {
            out.push(bulk_reply(k));
            out.push(bulk_reply(val));
        }
    }
    Ok(array_reply(out))
}

pub fn cmd_hincrby(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let field = arg(args, 1)?.as_string();
    let delta = arg(args, 2)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("increment is not an integer".into()))?;
    let mut map = take_or_new_hash(ctx, &key)?;
    let current = match map.get(&field) {
        Some(bytes) => Obj::from_string(bytes.clone())
            .try_as_int()
            .ok_or_else(|| NanoError::InvalidArgument("hash value is not an integer".into()))?,
        None => 0,
    };
    let next = current
        .checked_add(delta)
        .ok_or_else(|| NanoError::InvalidArgument("increment would overflow".into()))?;
    map.insert(field, next.to_string().into_bytes());
    ctx.db.set(key, Obj::from_hash(map));
    Ok(int_reply(next))
}

pub fn cmd_hstrlen(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let field = arg(args, 1)?.as_string();
    let len = match with_hash(ctx, &key)? {
        Some(v) => v.as_hash().unwrap().get(&field).map(|b| b.len()).unwrap_or(0),
        None => 0,
    };
    Ok(int_reply(len as i64))
}

/// `HSCAN key cursor [MATCH pattern] [COUNT count]`. The dataset sizes this
/// implementation targets fit comfortably in one reply, so the cursor
/// protocol is honored syntactically but the scan always completes in a
/// single call: any cursor other than `"0"` is rejected, and the returned
/// cursor is always `"0"`.
pub fn cmd_hscan(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let cursor = arg(args, 1)?.as_string();
    if cursor != b"0" {
        return Err(NanoError::InvalidArgument("invalid cursor".into()));
    }
    let mut pattern: Option<Vec<u8>> = None;
    let mut i = 2;
    while i < args.len() {
        let opt = args[i].as_string().to_ascii_uppercase();
        match opt.as_slice() {
            b"MATCH" => {
                pattern = Some(arg(args, i + 1)?.as_string());
                i += 2;
            }
            b"COUNT" => {
                i += 2;
            }
            _ => return Err(NanoError::InvalidArgument("syntax error".into())),
        }
    }
    let map = match with_hash(ctx, &key)? {
        Some(v) => v.as_hash().unwrap().clone(),
        None => HashValue::default(),
    };
    let mut pairs: Vec<(Vec<u8>, Vec<u8>)> = map
        .into_iter()
        .filter(|(k, _)| match &pattern {
            Some(p) => crate::glob::glob_match(p, k),
            None => true,
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let mut out = Vec::with_capacity(pairs.len() * 2);
    for (k, v) in &pairs {
        out.push(bulk_reply(k));
        out.push(bulk_reply(v));
    }
    Ok(array_reply(vec![bulk_reply(b"0"), array_reply(out)]))
}

/// Standard, non-destructive `HRANDFIELD` semantics (resolved Open
/// Question: no `count` argument mutates the hash; negative counts may
/// repeat fields, positive counts never repeat and are capped at the
/// hash's size).
pub fn cmd_hrandfield(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let map = match with_hash(ctx, &key)? {
        Some(v) => v.as_hash().unwrap().clone(),
        None => HashValue::default(),
    };
    if args.len() == 1 {
        let mut rng = rand::thread_rng();
        return Ok(match map.keys().choose(&mut rng) {
            Some(k) => bulk_reply(k),
            None => obj_reply(None),
        });
    }
    let count = arg(args, 1)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("count is not an integer".into()))?;
    let mut rng = rand::thread_rng();
    let keys: Vec<&Vec<u8>> = map.keys().collect();
    let out: Vec<Vec<u8>> = if count >= 0 {
        let n = (count as usize).min(keys.len());
        let mut chosen: Vec<&Vec<u8>> = keys.iter().copied().choose_multiple(&mut rng, n);
        chosen.sort();
        chosen.into_iter().cloned().collect()
    } else if keys.is_empty() {
        Vec::new()
    } else {
        (0..(-count) as usize)
            .map(|_| keys[rng.gen_range(0..keys.len())].clone())
            .collect()
    };
    Ok(array_reply(out.iter().map(|k| bulk_reply(k)).collect()))
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
    fn hset_reports_newly_added_fields_and_hget_reads_back() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        let reply = cmd_hset(&mut c, &[s("h"), s("f1"), s("v1"), s("f2"), s("v2")]).unwrap();
        assert_eq!(reply, b":2\r\n");
        let reply2 = cmd_hset(&mut c, &[s("h"), s("f1"), s("v1-updated")]).unwrap();
        assert_eq!(reply2, b":0\r\n");
        assert_eq!(cmd_hget(&mut c, &[s("h"), s("f1")]).unwrap(), bulk_reply(b"v1-updated"));
    }

    #[test]
    fn hdel_reports_actually_removed_count() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_hset(&mut c, &[s("h"), s("f1"), s("v1")]).unwrap();
        let reply = cmd_hdel(&mut c, &[s("h"), s("f1"), s("missing")]).unwrap();
        assert_eq!(reply, b":1\r\n");
    }

    #[test]
    fn hincrby_on_missing_field_starts_at_zero() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        let reply = cmd_hincrby(&mut c, &[s("h"), s("counter"), s("5")]).unwrap();
        assert_eq!(reply, b":5\r\n");
        let reply2 = cmd_hincrby(&mut c, &[s("h"), s("counter"), s("-2")]).unwrap();
        assert_eq!(reply2, b":3\r\n");
    }

    #[test]
    fn hgetall_on_missing_key_is_empty_array() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        assert_eq!(cmd_hgetall(&mut c, &[s("missing")]).unwrap(), b"*0\r\n");
    }

    #[test]
    fn operations_on_non_hash_key_are_wrong_type() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_set_string_for_test(&mut c, "k", "v");
        assert!(cmd_hget(&mut c, &[s("k"), s("f")]).is_err());
    }

    fn cmd_set_string_for_test(ctx: &mut CommandContext, key: &str, value: &str) {
        ctx.db.set(s(key), s(value));
    }
}
