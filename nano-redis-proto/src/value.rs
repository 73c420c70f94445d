// SPDX-License-Identifier: Apache-2.0

use crate::command::ParseError;

/// A single parsed RESP frame. `parse_command` only ever accepts a
/// top-level `Array` of `Bulk`/`Integer`/`Simple` as a command, or an
/// inline line, but the frame grammar itself is generic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    Simple(Vec<u8>),
    Error(Vec<u8>),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Option<Vec<RespValue>>),
}

/// Position of the `\r\n` pair starting at or after `from`, if any.
fn find_crlf(data: &[u8], from: usize) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|i| from + i)
}

/// Reads one `\r\n`-terminated line starting at `pos`. Returns
/// `(line_without_terminator, bytes_consumed_including_terminator)`.
fn read_line(data: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let crlf = find_crlf(data, pos)?;
    Some((&data[pos..crlf], crlf + 2 - pos))
}

fn parse_i64_line(line: &[u8]) -> Result<i64, ParseError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ParseError::Malformed(format!("not an integer: {:?}", String::from_utf8_lossy(line))))
}

/// Parses exactly one RESP value starting at `pos`. Returns `Ok(None)` when
/// the buffered bytes don't yet contain a complete value (caller should
/// wait for more data); `Ok(Some((value, consumed)))` on success.
pub(crate) fn parse_value(
    data: &[u8],
    pos: usize,
) -> Result<Option<(RespValue, usize)>, ParseError> {
    if pos >= data.len() {
        return Ok(None);
    }
    match data[pos] {
        b'+' => match read_line(data, pos + 1) {
            Some((line, n)) => Ok(Some((RespValue::Simple(line.to_vec()), 1 + n))),
            None => Ok(None),
        },
        b'-' => match read_line(data, pos + 1) {
            Some((line, n)) => Ok(Some((RespValue::Error(line.to_vec()), 1 + n))),
            None => Ok(None),
        },
        b':' => match read_line(data, pos + 1) {
            Some((line, n)) => Ok(Some((RespValue::Integer(parse_i64_line(line)?), 1 + n))),
            None => Ok(None),
        },
        b'$' => parse_bulk(data, pos),
        b'*' => parse_array(data, pos),
        other => Err(ParseError::Malformed(format!(
            "unexpected frame type byte {other:#04x}"
        ))),
    }
}

fn parse_bulk(data: &[u8], pos: usize) -> Result<Option<(RespValue, usize)>, ParseError> {
    let (len_line, header_len) = match read_line(data, pos + 1) {
        Some(v) => v,
        None => return Ok(None),
    };
    let len = parse_i64_line(len_line)?;
    if len == -1 {
        return Ok(Some((RespValue::Bulk(None), 1 + header_len)));
    }
    if len < -1 {
        return Err(ParseError::Malformed(format!("negative bulk length {len}")));
    }
    let len = len as usize;
    let body_start = pos + 1 + header_len;
    let body_end = body_start + len;
    if data.len() < body_end + 2 {
        return Ok(None);
    }
    if &data[body_end..body_end + 2] != b"\r\n" {
        return Err(ParseError::Malformed(
            "bulk string not terminated by CRLF".into(),
        ));
    }
    let payload = data[body_start..body_end].to_vec();
    Ok(Some((
        RespValue::Bulk(Some(payload)),
        1 + header_len + len + 2,
    )))
}

fn parse_array(data: &[u8], pos: usize) -> Result<Option<(RespValue, usize)>, ParseError> {
    let (len_line, header_len) = match read_line(data, pos + 1) {
        Some(v) => v,
        None => return Ok(None),
    };
    let len = parse_i64_line(len_line)?;
    if len == -1 {
        return Ok(Some((RespValue::Array(None), 1 + header_len)));
    }
    if len < -1 {
        return Err(ParseError::Malformed(format!("negative array length {len}")));
    }
    let count = len as usize;
    let mut consumed = 1 + header_len;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        match parse_value(data, pos + consumed)? {
            Some((value, n)) => {
                items.push(value);
                consumed += n;
            }
            None => return Ok(None),
        }
    }
    Ok(Some((RespValue::Array(Some(items)), consumed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_string() {
        let (v, n) = parse_value(b"+OK\r\n", 0).unwrap().unwrap();
        assert_eq!(v, RespValue::Simple(b"OK".to_vec()));
        assert_eq!(n, 5);
    }

    #[test]
    fn parses_null_bulk() {
        let (v, n) = parse_value(b"$-1\r\n", 0).unwrap().unwrap();
        assert_eq!(v, RespValue::Bulk(None));
        assert_eq!(n, 5);
    }

    #[test]
    fn incomplete_bulk_returns_none() {
        assert!(parse_value(b"$5\r\nhel", 0).unwrap().is_none());
    }

    #[test]
    fn parses_nested_array() {
        let input = b"*2\r\n$3\r\nfoo\r\n:7\r\n";
        let (v, n) = parse_value(input, 0).unwrap().unwrap();
        assert_eq!(n, input.len());
        match v {
            RespValue::Array(Some(items)) => {
                assert_eq!(items[0], RespValue::Bulk(Some(b"foo".to_vec())));
                assert_eq!(items[1], RespValue::Integer(7));
            }
            _ => panic!("expected array"),
        }
    }
}
