/// Errors produced while encoding a request head.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// A required pseudo-field (`:method`, `:scheme`, `:path`, `:authority`)
    /// was absent.
    #[error("missing required field {0}")]
    MissingField(&'static str),

    /// Both `:authority` and `host` were supplied and they differ.
    #[error("authority {authority:?} does not match host {host:?}")]
    AuthorityMismatch { authority: String, host: String },
}
