//! HTTP/1.1 request head encoding.

use crate::error::EncodeError;
use crate::header::{HeaderField, append_header};

/// The encoded request head plus the connection persistence it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRequest {
    /// `METHOD SP PATH SP HTTP/1.1 CRLF`, `Host`, the remaining headers and
    /// the terminating blank line.
    pub bytes: Vec<u8>,
    /// `false` when the method is non-idempotent or the caller asked for
    /// `Connection: close`; the connection must not be reused afterwards.
    pub persistent: bool,
}

/// Methods whose response framing is not safe to reuse a connection after.
const NON_IDEMPOTENT_METHODS: &[&[u8]] = &[b"post", b"insert"];

/// Whether `method` forces the connection to be closed after the exchange.
pub fn is_non_idempotent(method: &[u8]) -> bool {
    NON_IDEMPOTENT_METHODS
        .iter()
        .any(|m| method.eq_ignore_ascii_case(m))
}

/// Whether a `connection` header value lists the `close` token.
pub fn requests_close(value: &[u8]) -> bool {
    value
        .split(|&b| b == b',')
        .any(|token| token.trim_ascii().eq_ignore_ascii_case(b"close"))
}

/// Encode `headers` as an HTTP/1.1 request head.
///
/// `:method`, `:scheme`, `:path` and an authority are required. The authority
/// comes from `:authority`, or from `host` when `:authority` is absent; when
/// both are present they must be byte-identical. Regular headers are emitted
/// in list order with Train-Case names. Unknown pseudo-fields are dropped.
pub fn encode_request(headers: &[HeaderField]) -> Result<EncodedRequest, EncodeError> {
    let mut method: Option<&[u8]> = None;
    let mut scheme: Option<&[u8]> = None;
    let mut path: Option<&[u8]> = None;
    let mut authority: Option<&[u8]> = None;
    let mut host: Option<&[u8]> = None;
    let mut persistent = true;
    let mut lines = Vec::with_capacity(256);

    for field in headers {
        let value = field.value.as_slice();
        if field.is(b":method") {
            if is_non_idempotent(value) {
                persistent = false;
            }
            method = Some(value);
        } else if field.is(b":scheme") {
            scheme = Some(value);
        } else if field.is(b":path") {
            path = Some(value);
        } else if field.is(b":authority") {
            authority = Some(value);
        } else if field.is(b"host") {
            host = Some(value);
        } else if field.is_pseudo() {
            continue;
        } else {
            if field.is(b"connection") && requests_close(value) {
                persistent = false;
            }
            append_header(&mut lines, &field.name, value);
        }
    }

    let method = method.ok_or(EncodeError::MissingField(":method"))?;
    scheme.ok_or(EncodeError::MissingField(":scheme"))?;
    let path = path.ok_or(EncodeError::MissingField(":path"))?;
    let authority = match (authority, host) {
        (Some(authority), Some(host)) if authority != host => {
            return Err(EncodeError::AuthorityMismatch {
                authority: String::from_utf8_lossy(authority).into_owned(),
                host: String::from_utf8_lossy(host).into_owned(),
            });
        }
        (Some(authority), _) => authority,
        (None, Some(host)) => host,
        (None, None) => return Err(EncodeError::MissingField(":authority")),
    };

    let capacity = method.len() + path.len() + authority.len() + lines.len() + 32;
    let mut bytes = Vec::with_capacity(capacity);
    bytes.extend_from_slice(method);
    bytes.push(b' ');
    bytes.extend_from_slice(path);
    bytes.extend_from_slice(b" HTTP/1.1\r\n");
    append_header(&mut bytes, b"host", authority);
    bytes.extend_from_slice(&lines);
    bytes.extend_from_slice(b"\r\n");

    Ok(EncodedRequest { bytes, persistent })
}
