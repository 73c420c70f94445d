// SPDX-License-Identifier: Apache-2.0

/// Default capacity for a fresh connection's read buffer.
pub const DEFAULT_CAPACITY: usize = 8 * 1024;

/// A refillable byte buffer over which [`crate::parse_command`] frames one
/// command at a time. Bytes already consumed by a successful parse are
/// dropped on the next refill rather than immediately, so a parse that
/// needs more data can be retried against the same unparsed slice without
/// re-copying.
pub struct RespBuffer {
    data: Vec<u8>,
    pos: usize,
}

impl Default for RespBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RespBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(cap: usize) -> Self {
        RespBuffer {
            data: Vec::with_capacity(cap),
            pos: 0,
        }
    }

    /// Appends freshly-read bytes and compacts away already-consumed ones.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        if self.pos > 0 {
            self.data.drain(..self.pos);
            self.pos = 0;
        }
        self.data.extend_from_slice(bytes);
    }

    pub fn unparsed(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Advances past `n` consumed bytes, called once a full frame parses.
    pub(crate) fn consume(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.data.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_then_consume_then_extend_again() {
        let mut buf = RespBuffer::new();
        buf.extend_from_slice(b"PING\r\n");
        assert_eq!(buf.unparsed(), b"PING\r\n");
        buf.consume(6);
        assert!(buf.is_empty());
        buf.extend_from_slice(b"PONG\r\n");
        assert_eq!(buf.unparsed(), b"PONG\r\n");
    }
}
