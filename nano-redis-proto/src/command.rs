// SPDX-License-Identifier: Apache-2.0

use crate::buffer::RespBuffer;
use crate::value::{parse_value, RespValue};
use nano_redis_value::Obj;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed RESP input: {0}")]
    Malformed(String),
}

/// Outcome of one [`parse_command`] call.
pub enum ParseStatus {
    /// The buffer holds no complete command yet; the caller should read
    /// more bytes and retry. An empty buffer after a `0`-byte socket read
    /// is the caller's cue to treat the connection as closed.
    Incomplete,
    /// One command was framed and consumed from the buffer.
    Command(Vec<Obj>),
}

/// Attempts to frame exactly one command from `buf`'s unparsed bytes.
/// Arrays are the normal client protocol (a
/// `*N\r\n` of bulk strings); any other leading byte starts an inline
/// command, a single line split on ASCII whitespace.
pub fn parse_command(buf: &mut RespBuffer) -> Result<ParseStatus, ParseError> {
    let data = buf.unparsed();
    if data.is_empty() {
        return Ok(ParseStatus::Incomplete);
    }
    if data[0] == b'*' {
        parse_array_command(buf)
    } else {
        parse_inline_command(buf)
    }
}

fn parse_array_command(buf: &mut RespBuffer) -> Result<ParseStatus, ParseError> {
    let data = buf.unparsed();
    let (value, consumed) = match parse_value(data, 0)? {
        Some(v) => v,
        None => return Ok(ParseStatus::Incomplete),
    };
    let items = match value {
        RespValue::Array(Some(items)) => items,
        RespValue::Array(None) => {
            buf.consume(consumed);
            return Ok(ParseStatus::Command(Vec::new()));
        }
        _ => return Err(ParseError::Malformed("command must be an array".into())),
    };
    let mut args = Vec::with_capacity(items.len());
    for item in items {
        args.push(resp_value_to_obj(item)?);
    }
    buf.consume(consumed);
    Ok(ParseStatus::Command(args))
}

fn resp_value_to_obj(value: RespValue) -> Result<Obj, ParseError> {
    match value {
        RespValue::Bulk(Some(bytes)) => Ok(Obj::from_string(bytes)),
        RespValue::Bulk(None) => Ok(Obj::from_null()),
        RespValue::Simple(bytes) => Ok(Obj::from_string(bytes)),
        RespValue::Integer(n) => Ok(Obj::from_int(n)),
        RespValue::Error(bytes) => Ok(Obj::from_string(bytes)),
        RespValue::Array(_) => Err(ParseError::Malformed(
            "nested arrays are not valid command arguments".into(),
        )),
    }
}

/// Any byte other than `*` starts an inline command: a line terminated by
/// `\r` or `\n` (not necessarily the pair), split on ASCII whitespace.
fn parse_inline_command(buf: &mut RespBuffer) -> Result<ParseStatus, ParseError> {
    let data = buf.unparsed();
    let term = match data.iter().position(|&b| b == b'\r' || b == b'\n') {
        Some(i) => i,
        None => return Ok(ParseStatus::Incomplete),
    };
    let mut consumed = term + 1;
    // Swallow a paired \r\n or \n\r so the next call starts clean.
    if consumed < data.len() {
        let next = data[consumed];
        let this = data[term];
        if (this == b'\r' && next == b'\n') || (this == b'\n' && next == b'\r') {
            consumed += 1;
        }
    }
    let line = &data[..term];
    let args: Vec<Obj> = line
        .split(|&b| b == b' ' || b == b'\t')
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| Obj::from_string(chunk.to_vec()))
        .collect();
    buf.consume(consumed);
    Ok(ParseStatus::Command(args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(input: &[u8]) -> Vec<Obj> {
        let mut buf = RespBuffer::new();
        buf.extend_from_slice(input);
        match parse_command(&mut buf).unwrap() {
            ParseStatus::Command(args) => args,
            ParseStatus::Incomplete => panic!("expected a complete command"),
        }
    }

    #[test]
    fn parses_standard_multibulk_command() {
        let args = parse_one(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n");
        assert_eq!(args.len(), 3);
        assert_eq!(args[0].as_string(), b"SET");
        assert_eq!(args[1].as_string(), b"k");
        assert_eq!(args[2].as_string(), b"v");
    }

    #[test]
    fn parses_inline_command() {
        let args = parse_one(b"PING\r\n");
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].as_string(), b"PING");
    }

    #[test]
    fn inline_command_splits_on_whitespace() {
        let args = parse_one(b"SET  foo   bar\n");
        assert_eq!(args.len(), 3);
        assert_eq!(args[1].as_string(), b"foo");
        assert_eq!(args[2].as_string(), b"bar");
    }

    #[test]
    fn incomplete_array_requests_more_data() {
        let mut buf = RespBuffer::new();
        buf.extend_from_slice(b"*2\r\n$3\r\nfoo\r\n");
        assert!(matches!(
            parse_command(&mut buf).unwrap(),
            ParseStatus::Incomplete
        ));
        buf.extend_from_slice(b"$3\r\nbar\r\n");
        let args = match parse_command(&mut buf).unwrap() {
            ParseStatus::Command(a) => a,
            _ => panic!("expected complete"),
        };
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn empty_buffer_is_incomplete_not_an_error() {
        let mut buf = RespBuffer::new();
        assert!(matches!(
            parse_command(&mut buf).unwrap(),
            ParseStatus::Incomplete
        ));
    }

    #[test]
    fn malformed_bulk_length_is_rejected() {
        let mut buf = RespBuffer::new();
        buf.extend_from_slice(b"*1\r\n$-5\r\n");
        assert!(parse_command(&mut buf).is_err());
    }

    #[test]
    fn parses_back_to_back_commands_from_one_buffer() {
        let mut buf = RespBuffer::new();
        buf.extend_from_slice(b"PING\r\nPING\r\n");
        for _ in 0..2 {
            match parse_command(&mut buf).unwrap() {
                ParseStatus::Command(args) => assert_eq!(args[0].as_string(), b"PING"),
                ParseStatus::Incomplete => panic!("expected a command"),
            }
        }
        assert!(buf.is_empty());
    }
}
