//! Header fields and their HTTP/1.1 wire spelling.

/// A single header name/value pair.
///
/// Names are compared case-insensitively; values are opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

impl HeaderField {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Whether this field's name equals `name`, ignoring ASCII case.
    pub fn is(&self, name: &[u8]) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Whether this is an HTTP/2-style pseudo-field (`:method`, `:path`, ...).
    pub fn is_pseudo(&self) -> bool {
        self.name.first() == Some(&b':')
    }
}

/// Spell a header name in Train-Case: the first byte and every byte after a
/// `-` are uppercased, everything else is copied as-is.
///
/// `content-type` becomes `Content-Type`, `x-request-id` becomes
/// `X-Request-Id`.
pub fn train_case(name: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len());
    let mut upper = true;
    for &b in name {
        out.push(if upper { b.to_ascii_uppercase() } else { b });
        upper = b == b'-';
    }
    out
}

/// Append `Name: value\r\n` to `buf`.
pub(crate) fn append_header(buf: &mut Vec<u8>, name: &[u8], value: &[u8]) {
    buf.extend_from_slice(&train_case(name));
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value);
    buf.extend_from_slice(b"\r\n");
}
