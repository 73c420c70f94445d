// SPDX-License-Identifier: Apache-2.0

//! Streaming RESP parser and response builders.
//!
//! The parser is decoupled from any I/O source: [`RespBuffer`] is an
//! 8 KiB-default refillable byte buffer that callers (the shard's socket
//! read loop, in `nano-redis-shard`) feed with whatever bytes `read()`
//! produced; [`parse_command`] then tries to frame exactly one command out
//! of the buffered bytes, reporting whether it needs more data rather than
//! blocking on I/O itself.

mod buffer;
mod command;
mod response;
mod value;

pub use buffer::RespBuffer;
pub use command::{parse_command, ParseError, ParseStatus};
pub use response::{
    array_header, bulk_string, empty_array, error_reply, integer_reply, null_bulk, ok_reply,
    pong_reply, simple_string,
};
pub use value::RespValue;
