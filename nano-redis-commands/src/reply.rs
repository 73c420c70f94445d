// SPDX-License-Identifier: Apache-2.0

use nano_redis_proto::{array_header, bulk_string, integer_reply, null_bulk};
use nano_redis_value::Obj;

pub fn obj_reply(value: Option<&Obj>) -> Vec<u8> {
    match value {
        None => null_bulk(),
        Some(v) => bulk_string(&v.as_string()),
    }
}

pub fn int_reply(n: i64) -> Vec<u8> {
    integer_reply(n)
}

/// Builds a RESP array from already-encoded element replies.
pub fn array_reply(elements: Vec<Vec<u8>>) -> Vec<u8> {
    let mut out = array_header(elements.len());
    for elem in elements {
        out.extend_from_slice(&elem);
    }
    out
}

pub fn bulk_reply(bytes: &[u8]) -> Vec<u8> {
    bulk_string(bytes)
}
