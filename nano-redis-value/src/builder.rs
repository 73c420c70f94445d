// SPDX-License-Identifier: Apache-2.0

use crate::obj::Obj;

/// Builder pattern for constructing a string `Obj` when the final length is
/// known up front and the caller wants to fill the buffer directly rather
/// than copy from an existing slice.
pub struct StringBuilder {
    buf: Vec<u8>,
}

impl StringBuilder {
    pub fn with_capacity(len: usize) -> Self {
        StringBuilder {
            buf: vec![0u8; len],
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    pub fn finalize(self) -> Obj {
        Obj::from_string(self.buf)
    }

    /// Finalizes and, if the bytes are a canonical decimal integer,
    /// re-encodes as `Int`.
    pub fn finalize_maybe_int(self) -> Obj {
        self.finalize().maybe_int_encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_and_finalizes() {
        let mut b = StringBuilder::with_capacity(3);
        b.as_mut_slice().copy_from_slice(b"abc");
        assert_eq!(b.finalize().as_string(), b"abc");
    }

    #[test]
    fn builder_finalize_maybe_int_converts_decimal() {
        let mut b = StringBuilder::with_capacity(2);
        b.as_mut_slice().copy_from_slice(b"42");
        let o = b.finalize_maybe_int();
        assert_eq!(o.as_int(), Some(42));
    }
}
