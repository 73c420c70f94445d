// SPDX-License-Identifier: Apache-2.0

use crate::context::CommandContext;
use crate::reply::{array_reply, bulk_reply, int_reply, obj_reply};
use nano_redis_common::error::{NanoError, NanoResult};
use nano_redis_value::{Obj, SetValue};
use rand::seq::IteratorRandom;
use rand::Rng;
use std::collections::HashSet;

fn arg<'a>(args: &'a [Obj], i: usize) -> NanoResult<&'a Obj> {
    args.get(i)
        .ok_or_else(|| NanoError::InvalidArgument("missing argument".into()))
}

fn take_or_new_set(ctx: &mut CommandContext, key: &Obj) -> NanoResult<SetValue> {
    match ctx.db.get(key) {
        Some(v) if v.is_set() => Ok(v.as_set().unwrap().clone()),
        Some(_) => Err(NanoError::WrongType),
        None => Ok(SetValue::default()),
    }
}

fn read_set(ctx: &mut CommandContext, key: &Obj) -> NanoResult<SetValue> {
    take_or_new_set(ctx, key)
}

pub fn cmd_sadd(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let mut set = take_or_new_set(ctx, &key)?;
    let mut added = 0i64;
    for member in &args[1..] {
        if set.insert(member.as_string()) {
            added += 1;
        }
    }
    ctx.db.set(key, Obj::from_set(set));
    Ok(int_reply(added))
}

pub fn cmd_srem(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let mut set = take_or_new_set(ctx, &key)?;
    let mut removed = 0i64;
    for member in &args[1..] {
        if set.remove(&member.as_string()) {
            removed += 1;
        }
    }
    ctx.db.set(key, Obj::from_set(set));
    Ok(int_reply(removed))
}

pub fn cmd_spop(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let mut set = take_or_new_set(ctx, &key)?;
    let mut rng = rand::thread_rng();
    let popped = set.iter().choose(&mut rng).cloned();
    let reply = match &popped {
        Some(member) => bulk_reply(member),
        None => obj_reply(None),
    };
    if let Some(member) = popped {
        set.remove(&member);
    }
    ctx.db.set(key, Obj::from_set(set));
    Ok(reply)
}

pub fn cmd_smembers(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let mut members: Vec<Vec<u8>> = read_set(ctx, &key)?.into_iter().collect();
    members.sort();
    Ok(array_reply(members.iter().map(|m| bulk_reply(m)).collect()))
}

pub fn cmd_scard(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    Ok(int_reply(read_set(ctx, &key)?.len() as i64))
}

pub fn cmd_sismember(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let member = arg(args, 1)?.as_string();
    Ok(int_reply(read_set(ctx, &key)?.contains(&member) as i64))
}

pub fn cmd_smismember(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let set = read_set(ctx, &key)?;
    let out = args[1..]
        .iter()
        .map(|m| int_reply(set.contains(&m.as_string()) as i64))
        .collect();
    Ok(array_reply(out))
}

fn sets_for_keys(ctx: &mut CommandContext, keys: &[Obj]) -> NanoResult<Vec<SetValue>> {
    keys.iter().map(|k| read_set(ctx, k)).collect()
}

pub fn cmd_sinter(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let sets = sets_for_keys(ctx, args)?;
    let mut result: Option<HashSet<Vec<u8>>> = None;
    for set in sets {
        result = Some(match result {
            None => set.into_iter().collect(),
            Some(acc) => acc.into_iter().filter(|m| set.contains(m)).collect(),
        });
    }
    let mut members: Vec<Vec<u8>> = result.unwrap_or_default().into_iter().collect();
    members.sort();
    Ok(array_reply(members.iter().map(|m| bulk_reply(m)).collect()))
}

pub fn cmd_sunion(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let sets = sets_for_keys(ctx, args)?;
    let mut acc: HashSet<Vec<u8>> = HashSet::new();
    for set in sets {
        acc.extend(set);
    }
    let mut members: Vec<Vec<u8>> = acc.into_iter().collect();
    members.sort();
    Ok(array_reply(members.iter().map(|m| bulk_reply(m)).collect()))
}

pub fn cmd_sdiff(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let mut sets = sets_for_keys(ctx, args)?.into_iter();
    let mut acc: HashSet<Vec<u8>> = sets.next().unwrap_or_default().into_iter().collect();
    for set in sets {
        acc.retain(|m| !set.contains(m));
    }
    let mut members: Vec<Vec<u8>> = acc.into_iter().collect();
    members.sort();
    Ok(array_reply(members.iter().map(|m| bulk_reply(m)).collect()))
}

/// `SSCAN key cursor [MATCH pattern] [COUNT count]` — see `hashes::cmd_hscan`
/// for the single-pass cursor convention this shares.
pub fn cmd_sscan(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
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
    let set = read_set(ctx, &key)?;
    let mut members: Vec<Vec<u8>> = set
        .into_iter()
        .filter(|m| match &pattern {
            Some(p) => crate::glob::glob_match(p, m),
            None => true,
        })
        .collect();
    members.sort();
    let out = members.iter().map(|m| bulk_reply(m)).collect();
    Ok(array_reply(vec![bulk_reply(b"0"), array_reply(out)]))
}

pub fn cmd_srandmember(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let key = arg(args, 0)?.clone();
    let set = read_set(ctx, &key)?;
    let mut rng = rand::thread_rng();
    if args.len() == 1 {
        return Ok(match set.iter().choose(&mut rng) {
            Some(m) => bulk_reply(m),
            None => obj_reply(None),
        });
    }
    let count = arg(args, 1)?
        .try_as_int()
        .ok_or_else(|| NanoError::InvalidArgument("count is not an integer".into()))?;
    let members: Vec<&Vec<u8>> = set.iter().collect();
    let out: Vec<Vec<u8>> = if count >= 0 {
        let n = (count as usize).min(members.len());
        let mut chosen = members.iter().copied().choose_multiple(&mut rng, n);
        chosen.sort();
        chosen.into_iter().cloned().collect()
    } else if members.is_empty() {
        Vec::new()
    } else {
        (0..(-count) as usize)
            .map(|_| members[rng.gen_range(0..members.len())].clone())
            .collect()
    };
    Ok(array_reply(out.iter().map(|m| bulk_reply(m)).collect()))
}

pub fn cmd_smove(ctx: &mut CommandContext, args: &[Obj]) -> NanoResult<Vec<u8>> {
    let src_key = arg(args, 0)?.clone();
    let dst_key = arg(args, 1)?.clone();
    let member = arg(args, 2)?.as_string();

    let mut src = take_or_new_set(ctx, &src_key)?;
    if !src.remove(&member) {
        return Ok(int_reply(0));
    }
    let mut dst = take_or_new_set(ctx, &dst_key)?;
    dst.insert(member);
    ctx.db.set(src_key, Obj::from_set(src));
    ctx.db.set(dst_key, Obj::from_set(dst));
    Ok(int_reply(1))
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
    fn sadd_dedupes_and_scard_reports_size() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        let reply = cmd_sadd(&mut c, &[s("set"), s("a"), s("b"), s("a")]).unwrap();
        assert_eq!(reply, b":2\r\n");
        assert_eq!(cmd_scard(&mut c, &[s("set")]).unwrap(), b":2\r\n");
    }

    #[test]
    fn sinter_sunion_sdiff_match_set_theory() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_sadd(&mut c, &[s("a"), s("1"), s("2"), s("3")]).unwrap();
        cmd_sadd(&mut c, &[s("b"), s("2"), s("3"), s("4")]).unwrap();
        assert_eq!(
            cmd_sinter(&mut c, &[s("a"), s("b")]).unwrap(),
            b"*2\r\n$1\r\n2\r\n$1\r\n3\r\n".to_vec()
        );
        assert_eq!(
            cmd_sdiff(&mut c, &[s("a"), s("b")]).unwrap(),
            b"*1\r\n$1\r\n1\r\n".to_vec()
        );
        let union = cmd_sunion(&mut c, &[s("a"), s("b")]).unwrap();
        assert_eq!(union, b"*4\r\n$1\r\n1\r\n$1\r\n2\r\n$1\r\n3\r\n$1\r\n4\r\n".to_vec());
    }

    #[test]
    fn smove_transfers_membership() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_sadd(&mut c, &[s("a"), s("x")]).unwrap();
        let reply = cmd_smove(&mut c, &[s("a"), s("b"), s("x")]).unwrap();
        assert_eq!(reply, b":1\r\n");
        assert_eq!(cmd_sismember(&mut c, &[s("a"), s("x")]).unwrap(), b":0\r\n");
        assert_eq!(cmd_sismember(&mut c, &[s("b"), s("x")]).unwrap(), b":1\r\n");
    }

    #[test]
    fn smismember_reports_per_member_membership() {
        let mut db = Database::new();
        let mut c = ctx(&mut db);
        cmd_sadd(&mut c, &[s("a"), s("x")]).unwrap();
        let reply = cmd_smismember(&mut c, &[s("a"), s("x"), s("y")]).unwrap();
        assert_eq!(reply, b"*2\r\n:1\r\n:0\r\n".to_vec());
    }
}
