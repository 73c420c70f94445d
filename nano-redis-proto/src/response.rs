// SPDX-License-Identifier: Apache-2.0

//! Wire-ready response builders. Each function returns a freshly
//! allocated byte sequence; callers write it straight to the socket.

pub fn ok_reply() -> Vec<u8> {
    b"+OK\r\n".to_vec()
}

pub fn pong_reply() -> Vec<u8> {
    b"+PONG\r\n".to_vec()
}

pub fn null_bulk() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

pub fn empty_array() -> Vec<u8> {
    b"*0\r\n".to_vec()
}

pub fn simple_string(s: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 3);
    out.push(b'+');
    out.extend_from_slice(s);
    out.extend_from_slice(b"\r\n");
    out
}

pub fn error_reply(msg: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(msg.len() + 3);
    out.push(b'-');
    out.extend_from_slice(msg.as_bytes());
    out.extend_from_slice(b"\r\n");
    out
}

pub fn integer_reply(value: i64) -> Vec<u8> {
    format!(":{value}\r\n").into_bytes()
}

pub fn bulk_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 16);
    out.extend_from_slice(format!("${}\r\n", bytes.len()).as_bytes());
    out.extend_from_slice(bytes);
    out.extend_from_slice(b"\r\n");
    out
}

pub fn array_header(count: usize) -> Vec<u8> {
    format!("*{count}\r\n").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_match_expected_wire_forms() {
        assert_eq!(ok_reply(), b"+OK\r\n");
        assert_eq!(pong_reply(), b"+PONG\r\n");
        assert_eq!(null_bulk(), b"$-1\r\n");
        assert_eq!(empty_array(), b"*0\r\n");
        assert_eq!(integer_reply(42), b":42\r\n");
        assert_eq!(integer_reply(-1), b":-1\r\n");
        assert_eq!(bulk_string(b"hi"), b"$2\r\nhi\r\n");
        assert_eq!(array_header(3), b"*3\r\n");
        assert_eq!(error_reply("ERR bad"), b"-ERR bad\r\n");
        assert_eq!(simple_string(b"OK"), b"+OK\r\n");
    }
}
