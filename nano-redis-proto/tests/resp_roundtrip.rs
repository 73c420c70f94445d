// SPDX-License-Identifier: Apache-2.0

use nano_redis_proto::{bulk_string, integer_reply, ok_reply, parse_command, ParseStatus, RespBuffer};

/// A client writes SET then GET back-to-back on one connection; the
/// parser should frame both commands from a buffer fed in arbitrary
/// chunk sizes, mirroring a real non-blocking socket read loop.
#[test]
fn fragmented_reads_still_yield_both_commands() {
    let wire = b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n";
    let mut buf = RespBuffer::new();
    let mut commands = Vec::new();

    for chunk in wire.chunks(3) {
        buf.extend_from_slice(chunk);
        loop {
            match parse_command(&mut buf).unwrap() {
                ParseStatus::Command(args) => commands.push(args),
                ParseStatus::Incomplete => break,
            }
        }
    }

    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0][0].as_string(), b"SET");
    assert_eq!(commands[1][0].as_string(), b"GET");
}

#[test]
fn response_builders_produce_valid_resp_frames() {
    assert_eq!(bulk_string(b"hello"), b"$5\r\nhello\r\n");
    assert_eq!(integer_reply(7), b":7\r\n");
    assert_eq!(ok_reply(), b"+OK\r\n");
}
