//! Request path canonicalization.
//!
//! Policy lookup and the upstream must agree on which resource a path names.
//! A path is canonical when decoding percent-escaped unreserved characters,
//! merging repeated slashes and resolving `.`/`..` segments leaves it
//! unchanged. Only canonical paths are admitted.

/// Canonical form of `path`, or `None` if it cannot name a single resource
/// (an escaped `/` or `\`, or a literal `\`).
pub fn canonicalize(path: &str) -> Option<String> {
    let decoded = decode_unreserved(path)?;
    if decoded.contains('\\') {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut canonical = String::with_capacity(decoded.len());
    for segment in &segments {
        canonical.push('/');
        canonical.push_str(segment);
    }
    let trailing_slash =
        decoded.ends_with('/') || decoded.ends_with("/.") || decoded.ends_with("/..");
    if canonical.is_empty() || trailing_slash {
        canonical.push('/');
    }
    Some(canonical)
}

/// True iff `path` is its own canonical form.
pub fn is_canonical(path: &str) -> bool {
    canonicalize(path).is_some_and(|canonical| canonical == path)
}

fn decode_unreserved(path: &str) -> Option<String> {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(byte) = bytes.get(i + 1..i + 3).and_then(hex_pair) {
                if byte == b'/' || byte == b'\\' {
                    return None;
                }
                if is_unreserved(byte) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).ok()
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    let hi = char::from(pair[0]).to_digit(16)?;
    let lo = char::from(pair[1]).to_digit(16)?;
    u8::try_from(hi * 16 + lo).ok()
}

// RFC 3986 unreserved set.
fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}
