// SPDX-License-Identifier: Apache-2.0

/// Minimal glob matcher for `KEYS pattern`: `*` matches any run of bytes,
/// `?` matches exactly one byte, everything else is literal.
pub fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match_from(pattern, text)
}

fn match_from(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some(b'*') => {
            // Collapse runs of '*' and try every possible split point.
            let rest = &pattern[1..];
            if rest.first() == Some(&b'*') {
                return match_from(rest, text);
            }
            for i in 0..=text.len() {
                if match_from(rest, &text[i..]) {
                    return true;
                }
            }
            false
        }
        Some(b'?') => !text.is_empty() && match_from(&pattern[1..], &text[1..]),
        Some(&c) => !text.is_empty() && text[0] == c && match_from(&pattern[1..], &text[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_everything() {
        assert!(glob_match(b"*", b""));
        assert!(glob_match(b"*", b"anything"));
    }

    #[test]
    fn question_mark_matches_one_byte() {
        assert!(glob_match(b"k?y", b"key"));
        assert!(!glob_match(b"k?y", b"ky"));
    }

    #[test]
    fn literal_prefix_and_suffix_with_star() {
        assert!(glob_match(b"user:*", b"user:42"));
        assert!(!glob_match(b"user:*", b"session:42"));
        assert!(glob_match(b"*:done", b"job:1:done"));
    }

    #[test]
    fn exact_literal_match_only() {
        assert!(glob_match(b"exact", b"exact"));
        assert!(!glob_match(b"exact", b"exacter"));
    }
}
