use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A provider layer failed to merge or the result failed to deserialize.
    #[error("configuration error: {0}")]
    Figment(#[from] figment::Error),

    /// A section the caller requires has no usable values.
    #[error("configuration section '{section}' is not configured")]
    NotConfigured { section: &'static str },

    /// A value parsed but violates a constraint (e.g. `sync.retry_base_ms > sync.retry_cap_ms`).
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
