// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Error kinds shared across the storage and protocol layers.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NanoError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("wrong type for this operation")]
    WrongType,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("shard context unavailable: {0}")]
    ShardContext(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for NanoError {
    fn from(e: std::io::Error) -> Self {
        NanoError::Io(e.to_string())
    }
}

impl NanoError {
    /// Renders the RESP error line for this error: everything is
    /// `-ERR <message>` except wrong-type mismatches, which use the
    /// standard `-WRONGTYPE` prefix.
    pub fn to_resp_message(&self) -> String {
        match self {
            NanoError::WrongType => {
                "WRONGTYPE Operation against a key holding the wrong kind of value".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type NanoResult<T> = Result<T, NanoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_type_uses_standard_prefix() {
        assert!(NanoError::WrongType.to_resp_message().starts_with("WRONGTYPE"));
    }

    #[test]
    fn other_errors_are_plain_messages() {
        let e = NanoError::NotFound("foo".into());
        assert_eq!(e.to_resp_message(), "not found: foo");
    }
}
