//! Byte-bounded splitting of encoded payloads
//!
//! Bytes are the unit for both the split boundary and the size bound, so a
//! fragment's length here is exactly what the store will account for. A
//! boundary that lands inside a multi-byte character moves back to the
//! previous character boundary.

use fragcache_core::{CacheError, Result};

/// Smallest usable bound: the widest UTF-8 encoded scalar
pub const MIN_FRAGMENT_BYTES: usize = 4;

/// Split `text` into ordered fragments of at most `max_bytes` bytes each
///
/// Concatenating the fragments in order yields `text` exactly. Empty input
/// produces no fragments.
pub fn split(text: &str, max_bytes: usize) -> Result<Vec<&str>> {
    if max_bytes < MIN_FRAGMENT_BYTES {
        return Err(CacheError::configuration(format!(
            "fragment bound must be at least {MIN_FRAGMENT_BYTES} bytes, got {max_bytes}"
        )));
    }

    let mut fragments = Vec::with_capacity(text.len().div_ceil(max_bytes));
    let mut rest = text;
    while !rest.is_empty() {
        let mut end = rest.len().min(max_bytes);
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (head, tail) = rest.split_at(end);
        fragments.push(head);
        rest = tail;
    }

    Ok(fragments)
}

/// Concatenate fragments in index order
pub fn reassemble<S: AsRef<str>>(fragments: &[S]) -> String {
    let len = fragments.iter().map(|f| f.as_ref().len()).sum();
    let mut text = String::with_capacity(len);
    for fragment in fragments {
        text.push_str(fragment.as_ref());
    }
    text
}
