// SPDX-License-Identifier: Apache-2.0

use crate::collections::{HashValue, ListValue, SetValue};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Inline strings hold up to this many bytes directly in the enum
/// payload.
pub const INLINE_MAX_LEN: usize = 14;

/// Small strings are stored out-of-line up to this many bytes.
pub const SMALL_MAX_LEN: usize = 65535;

/// The Redis-visible type of a value. Distinct from `ObjEncoding`: an
/// integer-encoded value still reports type `String`, matching real Redis's
/// `TYPE` vs. `OBJECT ENCODING` split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjType {
    Null,
    String,
    Hash,
    Set,
    List,
}

/// The physical encoding of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjEncoding {
    Null,
    Inline,
    Small,
    Int,
    Hash,
    Set,
    List,
}

#[derive(Clone)]
struct InlineStr {
    len: u8,
    bytes: [u8; INLINE_MAX_LEN],
}

#[derive(Clone)]
struct SmallStr {
    /// First 4 bytes of `data`, kept alongside it for fast unequal
    /// comparison without touching the heap allocation.
    prefix: [u8; 4],
    data: Vec<u8>,
}

impl SmallStr {
    fn new(data: Vec<u8>) -> Self {
        let mut prefix = [0u8; 4];
        let n = data.len().min(4);
        prefix[..n].copy_from_slice(&data[..n]);
        SmallStr { prefix, data }
    }
}

/// The core tagged value type.
#[derive(Clone)]
pub enum Obj {
    Null,
    Inline(InlineStr),
    Small(Box<SmallStr>),
    Int(i64),
    Hash(Box<HashValue>),
    Set(Box<SetValue>),
    List(Box<ListValue>),
}

impl Default for Obj {
    fn default() -> Self {
        Obj::Null
    }
}

/// Formats `value` as canonical decimal ASCII into `tmp`, returning the
/// populated suffix. Invariant (ii): "an integer value's textual encoding is
/// the canonical decimal representation."
pub fn format_i64(mut value: i64, tmp: &mut [u8; 20]) -> &[u8] {
    let neg = value < 0;
    let mut i = 20;
    if value == 0 {
        i -= 1;
        tmp[i] = b'0';
    } else {
        while value != 0 {
            let digit = (value % 10).unsigned_abs() as u8;
            value /= 10;
            i -= 1;
            tmp[i] = b'0' + digit;
        }
    }
    if neg {
        i -= 1;
        tmp[i] = b'-';
    }
    &tmp[i..]
}

/// Parses `bytes` as a decimal i64 iff it round-trips losslessly: no
/// leading zeros (other than the literal "0"), no leading `+`, no stray
/// whitespace, and the formatted form of the parsed value is byte-identical
/// to the input. This is the criterion `TryAsInt`/the post-parse "maybe
/// convert to int encoding" step use.
pub fn parse_canonical_i64(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() {
        return None;
    }
    let s = std::str::from_utf8(bytes).ok()?;
    let value: i64 = s.parse().ok()?;
    let mut tmp = [0u8; 20];
    if format_i64(value, &mut tmp) == bytes {
        Some(value)
    } else {
        None
    }
}

impl Obj {
    pub fn from_null() -> Self {
        Obj::Null
    }

    /// Encoding selection: length <= 14 -> inline, 15..=65535 -> small-string
    /// out-of-line with a 4-byte prefix.
    pub fn from_string(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        if bytes.len() <= INLINE_MAX_LEN {
            let mut arr = [0u8; INLINE_MAX_LEN];
            arr[..bytes.len()].copy_from_slice(&bytes);
            Obj::Inline(InlineStr {
                len: bytes.len() as u8,
                bytes: arr,
            })
        } else {
            // Values longer than SMALL_MAX_LEN are still representable;
            // they simply use the same out-of-line representation rather
            // than a distinct large-string encoding.
            Obj::Small(Box::new(SmallStr::new(bytes)))
        }
    }

    pub fn from_int(value: i64) -> Self {
        Obj::Int(value)
    }

    pub fn from_hash(map: HashValue) -> Self {
        Obj::Hash(Box::new(map))
    }

    pub fn from_set(set: SetValue) -> Self {
        Obj::Set(Box::new(set))
    }

    pub fn from_list(list: ListValue) -> Self {
        Obj::List(Box::new(list))
    }

    pub fn get_type(&self) -> ObjType {
        match self {
            Obj::Null => ObjType::Null,
            Obj::Inline(_) | Obj::Small(_) | Obj::Int(_) => ObjType::String,
            Obj::Hash(_) => ObjType::Hash,
            Obj::Set(_) => ObjType::Set,
            Obj::List(_) => ObjType::List,
        }
    }

    pub fn get_encoding(&self) -> ObjEncoding {
        match self {
            Obj::Null => ObjEncoding::Null,
            Obj::Inline(_) => ObjEncoding::Inline,
            Obj::Small(_) => ObjEncoding::Small,
            Obj::Int(_) => ObjEncoding::Int,
            Obj::Hash(_) => ObjEncoding::Hash,
            Obj::Set(_) => ObjEncoding::Set,
            Obj::List(_) => ObjEncoding::List,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Obj::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Obj::Inline(_) | Obj::Small(_) | Obj::Int(_))
    }

    pub fn is_hash(&self) -> bool {
        matches!(self, Obj::Hash(_))
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Obj::Set(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Obj::List(_))
    }

    /// `Size`: byte length of the value's string form, for string
    /// encodings; element count for collections; 0 for null.
    pub fn size(&self) -> usize {
        match self {
            Obj::Null => 0,
            Obj::Inline(s) => s.len as usize,
            Obj::Small(s) => s.data.len(),
            Obj::Int(v) => {
                let mut tmp = [0u8; 20];
                format_i64(*v, &mut tmp).len()
            }
            Obj::Hash(m) => m.len(),
            Obj::Set(s) => s.len(),
            Obj::List(l) => l.len(),
        }
    }

    /// `AsString`: the byte representation of a string-family value.
    /// Collections and null return an empty vector.
    pub fn as_string(&self) -> Vec<u8> {
        match self {
            Obj::Null => Vec::new(),
            Obj::Inline(s) => s.bytes[..s.len as usize].to_vec(),
            Obj::Small(s) => s.data.clone(),
            Obj::Int(v) => {
                let mut tmp = [0u8; 20];
                format_i64(*v, &mut tmp).to_vec()
            }
            _ => Vec::new(),
        }
    }

    /// Borrowed view of the string bytes when the encoding stores them
    /// contiguously (everything but `Int`, which has nothing to borrow).
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Obj::Inline(s) => Some(&s.bytes[..s.len as usize]),
            Obj::Small(s) => Some(&s.data),
            _ => None,
        }
    }

    /// `AsInt`: the integer value, valid only when the encoding is `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Obj::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// `TryAsInt`: parses the decimal value iff the encoding is integer, or
    /// the textual form round-trips losslessly through the canonical
    /// decimal representation.
    pub fn try_as_int(&self) -> Option<i64> {
        match self {
            Obj::Int(v) => Some(*v),
            Obj::Inline(s) => parse_canonical_i64(&s.bytes[..s.len as usize]),
            Obj::Small(s) => parse_canonical_i64(&s.data),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&HashValue> {
        match self {
            Obj::Hash(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_hash_mut(&mut self) -> Option<&mut HashValue> {
        match self {
            Obj::Hash(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&SetValue> {
        match self {
            Obj::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut SetValue> {
        match self {
            Obj::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListValue> {
        match self {
            Obj::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut ListValue> {
        match self {
            Obj::List(l) => Some(l),
            _ => None,
        }
    }

    /// If this value is a string whose bytes are a canonical decimal
    /// integer, re-encodes it as `Int`. Used after parsing a bulk string
    /// off the wire, where the conversion is only performed when
    /// explicitly requested rather than on every string construction.
    pub fn maybe_int_encode(self) -> Self {
        match &self {
            Obj::Inline(s) => match parse_canonical_i64(&s.bytes[..s.len as usize]) {
                Some(v) => Obj::Int(v),
                None => self,
            },
            Obj::Small(s) => match parse_canonical_i64(&s.data) {
                Some(v) => Obj::Int(v),
                None => self,
            },
            _ => self,
        }
    }

    /// Replaces `self` with `Null`, returning the prior value. Rust's
    /// ordinary moves already make the source inaccessible; this makes the
    /// replacement explicit for callers that hold `&mut Obj`.
    pub fn take(&mut self) -> Obj {
        std::mem::take(self)
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Obj::Null => write!(f, "Obj::Null"),
            Obj::Int(v) => write!(f, "Obj::Int({v})"),
            Obj::Inline(_) | Obj::Small(_) => {
                write!(f, "Obj::String({:?})", String::from_utf8_lossy(&self.as_string()))
            }
            Obj::Hash(m) => write!(f, "Obj::Hash(len={})", m.len()),
            Obj::Set(s) => write!(f, "Obj::Set(len={})", s.len()),
            Obj::List(l) => write!(f, "Obj::List(len={})", l.len()),
        }
    }
}

/// Cross-encoding equality: null equals only null; two integers equal iff
/// equal; two strings equal iff bytes equal; an integer and a string are
/// equal iff the string is the integer's canonical decimal form.
/// Collections compare structurally against same-kind collections only.
impl PartialEq for Obj {
    fn eq(&self, other: &Self) -> bool {
        use Obj::*;
        match (self, other) {
            (Null, Null) => true,
            (Null, _) | (_, Null) => false,
            (Int(a), Int(b)) => a == b,
            (Int(a), s) | (s, Int(a)) if s.is_string() => {
                // `s` is Inline/Small here, since Int/Int was handled above.
                let mut tmp = [0u8; 20];
                let canon = format_i64(*a, &mut tmp);
                s.as_bytes().map(|b| b == canon).unwrap_or(false)
            }
            (a, b) if a.is_string() && b.is_string() => {
                // Fast unequal-length check first (small-string prefix rule).
                a.size() == b.size() && a.as_bytes() == b.as_bytes()
            }
            (Hash(a), Hash(b)) => a == b,
            (Set(a), Set(b)) => a == b,
            (List(a), List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Obj {}

impl Hash for Obj {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Any two values considered equal by `PartialEq` must hash
        // identically, so every string-family encoding (including `Int`)
        // hashes its canonical decimal bytes rather than its discriminant.
        match self {
            Obj::Null => 0u8.hash(state),
            Obj::Int(v) => {
                let mut tmp = [0u8; 20];
                format_i64(*v, &mut tmp).hash(state);
            }
            Obj::Inline(_) | Obj::Small(_) => {
                self.as_bytes().unwrap_or(&[]).hash(state);
            }
            Obj::Hash(m) => {
                1u8.hash(state);
                m.len().hash(state);
            }
            Obj::Set(s) => {
                2u8.hash(state);
                s.len().hash(state);
            }
            Obj::List(l) => {
                3u8.hash(state);
                l.len().hash(state);
            }
        }
    }
}
