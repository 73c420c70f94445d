// SPDX-License-Identifier: Apache-2.0

use crate::context::CommandContext;
use crate::reply::{array_reply, bulk_reply, int_reply, obj_reply};
use nano_redis_common::error::{NanoError, NanoResult};
use nano_redis_value::{ListValue, Obj};
use std::collections::VecDeque;

fn arg<'a>(args: &'a [Obj], i: usize) -> NanoResult<&'a Obj> {
    args.get(i)
        .ok_or_else(|| NanoError::InvalidArgument("missing argument".into()))
}

/// Read-modify-write helper mirroring `hashes::take_or_new_hash` /
/// `sets::take_or_new_set`: lists are cloned out, mutated, and written back
/// wholesale since `Obj` has no in-place Dash-value mutator.
fn take_or_new_list(ctx: &mut CommandContext, key: &Obj) -> NanoResult<ListValue> {
    match ctx.db.get(key) {
        Some(v) if v.is_list() => Ok(v.as_list().unwrap().clone()),
        Some(_) => Err(NanoError::WrongType),
        None => Ok(ListValue::default()),
    }
}

fn read_list(ctx: &mut CommandContext, key: &Obj) -> NanoResult<ListValue> {
    take_or_new_list(ctx, key)
}

fn resolve_index(idx: i64, len: usize) -> Option<usize> {
    if idx >= 0 {
        let idx = idx as usize;
        (idx < len).then_some(idx)
    } else {
        let from_end = (-idx) as usize;
        (from_end <= len).then(|| len - from_end)
    }
}

pub fn cmd_lpush(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let mut list = take_or_new_list(ctx, &key)?;
    for value in &args[1..] {
        list.push_front(value.clone());
    }
    let len = list.len();
    ctx.db.set(key, Obj::from_list(list));
    Ok(int_reply(len as i64))
}

pub fn cmd_rpush(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let mut list = take_or_new_list(ctx, &key)?;
    for value in &args[1..] {
        list.push_back(value.clone());
    }
    let len = list.len();
    ctx.db.set(key, Obj::from_list(list));
    Ok(int_reply(len as i64))
}

pub fn cmd_lpop(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let mut list = take_or_new_list(ctx, &key)?;
    let count = match args.get(1) {
        Some(v) => v
            .try_as_int()
            .ok_or_else(|| NanoError::InvalidArgument("count is not an integer".into()))?
            as usize,
        None => 1,
    };
    let mut popped = Vec::new();
    for _ in 0..count {
        match list.pop_front() {
            Some(v) => popped.push(v),
            None => break,
        }
    }
    ctx.db.set(key, Obj::from_list(list));
    if args.get(1).is_none() {
        return Ok(match popped.into_iter().next() {
            Some(v) => bulk_reply(&v.as_string()),
            None => obj_reply(None),
        });
    }
    Ok(array_reply(
        popped.iter().map(|v| bulk_reply(&v.as_string())).collect(),
    ))
}

pub fn cmd_rpop(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let mut list = take_or_new_list(ctx, &key)?;
    let count = match args.get(1) {
        Some(v) => v
            .try_as_int()
            .ok_or_else(|| NanoError::InvalidArgument("count is not an integer".into()))?
            as usize,
        None => 1,
    };
    let mut popped = Vec::new();
    for _ in 0..count {
        match list.pop_back() {
            Some(v) => popped.push(v),
            None => break,
        }
    }
    ctx.db.set(key, Obj::from_list(list));
    if args.get(1).is_none() {
        return Ok(match popped.into_iter().next() {
            Some(v) => bulk_reply(&v.as_string()),
            None => obj_reply(None),
        });
    }
    Ok(array_reply(
        popped.iter().map(|v| bulk_reply(&v.as_string())).collect(),
    ))
}

pub fn cmd_llen(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    Ok(int_reply(read_list(ctx, &key)?.len() as i64))
}

pub fn cmd_lindex(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let idx = arg(args, 1)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("index is not an integer".into()))?;
    let list = read_list(ctx, &key)?;
    Ok(match resolve_index(idx, list.len()) {
        Some(i) => bulk_reply(&list[i].as_string()),
        None => obj_reply(None),
    })
}

pub fn cmd_lset(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let idx = arg(args, 1)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("index is not an integer".into()))?;
    let value = arg(args, 2)?.clone();
    let mut list = take_or_new_list(ctx, &key)?;
    let i = resolve_index(idx, list.len())
        .ok_or_else(|| NanoError::InvalidArgument("index out of range".into()))?;
    list[i] = value;
    ctx.db.set(key, Obj::from_list(list));
    Ok(nano_redis_proto::ok_reply())
}

pub fn cmd_lrange(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let start = arg(args, 1)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("start is not an integer".into()))?;
    let stop = arg(args, 2)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("stop is not an integer".into()))?;
    let list = read_list(ctx, &key)?;
    let len = list.len();
    if len == 0 {
        return Ok(array_reply(Vec::new()));
    }
    let lo = normalize_bound(start, len);
    let hi = normalize_bound(stop, len);
    if lo > hi || lo >= len {
        return Ok(array_reply(Vec::new()));
    }
    let hi = hi.min(len - 1);
    let out: Vec<Vec<u8>> = (lo..=hi).map(|i| bulk_reply(&list[i].as_string())).collect();
    Ok(array_reply(out))
}

fn normalize_bound(idx: i64, len: usize) -> usize {
    if idx >= 0 {
        idx as usize
    } else {
        let from_end = (-idx) as usize;
        if from_end > len {
            0
        } else {
            len - from_end
        }
    }
}

pub fn cmd_ltrim(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let start = arg(args, 1)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("start is not an integer".into()))?;
    let stop = arg(args, 2)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("stop is not an integer".into()))?;
    let list = take_or_new_list(ctx, &key)?;
    let len = list.len();
    let trimmed: VecDeque<Obj> = if len == 0 {
        VecDeque::new()
    } else {
        let lo = normalize_bound(start, len);
        let hi = normalize_bound(stop, len).min(len.saturating_sub(1));
        if lo > hi || lo >= len {
            VecDeque::new()
        } else {
            list.into_iter().skip(lo).take(hi - lo + 1).collect()
        }
    };
    ctx.db.set(key, Obj::from_list(trimmed));
    Ok(nano_redis_proto::ok_reply())
}

pub fn cmd_lrem(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let count = arg(args, 1)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("count is not an integer".into()))?;
    let target = arg(args, 2)?.as_string();
    let list = take_or_new_list(ctx, &key)?;
    let mut removed = 0i64;
    let result: VecDeque<Obj> = if count == 0 {
        list.into_iter()
            .filter(|v| {
                let matches = v.as_string() == target;
                if matches {
                    removed += 1;
                }
                !matches
            })
            .collect()
    } else if count > 0 {
        let mut limit = count;
        list.into_iter()
            .filter(|v| {
                if limit > 0 && v.as_string() == target {
                    limit -= 1;
                    removed += 1;
                    false
                } else {
                    true
                }
            })
            .collect()
    } else {
        let mut limit = -count;
        let mut items: Vec<Obj> = list.into_iter().collect();
        items.reverse();
        let filtered: Vec<Obj> = items
            .into_iter()
            .filter(|v| {
                if limit > 0 && v.as_string() == target {
                    limit -= 1;
                    removed += 1;
                    false
                } else {
                    true
                }
            })
            .collect();
        filtered.into_iter().rev().collect()
    };
    ctx.db.set(key, Obj::from_list(result));
    Ok(int_reply(removed))
}

pub fn cmd_linsert(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let where_arg = arg(args, 1)?.as_string();
    let before = match where_arg.to_ascii_uppercase().as_slice() {
        b"BEFORE" => true,
        b"AFTER" => false,
        _ => {
            return Err(NanoError::InvalidArgument(
                "syntax error: expected BEFORE or AFTER".into(),
            ))
        }
    };
    let pivot = arg(args, 2)?.as_string();
    let value = arg(args, 3)?.clone();
    let mut list = take_or_new_list(ctx, &key)?;
    let pos = list.iter().position(|v| v.as_string() == pivot);
    let result = match pos {
        None => -1,
        Some(i) => {
            let insert_at = if before { i } else { i + 1 };
            list.insert(insert_at, value);
            list.len() as i64
        }
    };
    ctx.db.set(key, Obj::from_list(list));
    Ok(int_reply(result))
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
    fn lpush_rpush_preserve_order() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_rpush(&mut c, &[s("l"), s("b"), s("c")]).unwrap();
        cmd_lpush(&mut c, &[s("l"), s("a")]).unwrap();
        let reply = cmd_lrange(&mut c, &[s("l"), s("0"), s("-1")]).unwrap();
        assert_eq!(reply, b"*3\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n".to_vec());
    }

    #[test]
    fn lpop_without_count_returns_single_bulk() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_rpush(&mut c, &[s("l"), s("a"), s("b")]).unwrap();
        assert_eq!(cmd_lpop(&mut c, &[s("l")]).unwrap(), bulk_reply(b"a"));
        assert_eq!(cmd_llen(&mut c, &[s("l")]).unwrap(), b":1\r\n");
    }

    #[test]
    fn lset_and_lindex_roundtrip() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_rpush(&mut c, &[s("l"), s("a"), s("b")]).unwrap();
        cmd_lset(&mut c, &[s("l"), s("-1"), s("z")]).unwrap();
        assert_eq!(cmd_lindex(&mut c, &[s("l"), s("1")]).unwrap(), bulk_reply(b"z"));
    }

    #[test]
    fn ltrim_keeps_only_requested_range() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_rpush(&mut c, &[s("l"), s("a"), s("b"), s("c"), s("d")]).unwrap();
        cmd_ltrim(&mut c, &[s("l"), s("1"), s("2")]).unwrap();
        let reply = cmd_lrange(&mut c, &[s("l"), s("0"), s("-1")]).unwrap();
        assert_eq!(reply, b"*2\r\n$1\r\nb\r\n$1\r\nc\r\n".to_vec());
    }

    #[test]
    fn lrem_positive_count_removes_from_head() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_rpush(&mut c, &[s("l"), s("a"), s("b"), s("a"), s("a")]).unwrap();
        let reply = cmd_lrem(&mut c, &[s("l"), s("2"), s("a")]).unwrap();
        assert_eq!(reply, b":2\r\n");
        let remaining = cmd_lrange(&mut c, &[s("l"), s("0"), s("-1")]).unwrap();
        assert_eq!(remaining, b"*2\r\n$1\r\nb\r\n$1\r\na\r\n".to_vec());
    }

    #[test]
    fn linsert_before_pivot_shifts_elements() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_rpush(&mut c, &[s("l"), s("a"), s("c")]).unwrap();
        let reply = cmd_linsert(&mut c, &[s("l"), s("BEFORE"), s("c"), s("b")]).unwrap();
        assert_eq!(reply, b":3\r\n");
        let all = cmd_lrange(&mut c, &[s("l"), s("0"), s("-1")]).unwrap();
        assert_eq!(all, b"*3\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n".to_vec());
    }
}
