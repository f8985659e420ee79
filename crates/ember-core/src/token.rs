use crate::error::LinkError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A short token identifying a link record across the whole store.
///
/// Tokens come from an external generator and may be anything from a bare
/// code (`abc123`) to a full short URL (`https://clck.ru/3Ezxyz`). They must be
/// non-empty, at most 512 bytes, and free of whitespace and control
/// characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortToken(String);

const MAX_LENGTH: usize = 512;

impl ShortToken {
    /// Creates a new `ShortToken` after trimming and validating the input.
    pub fn new(token: impl AsRef<str>) -> Result<Self, LinkError> {
        let token = token.as_ref().trim();
        Self::validate(token)?;
        Ok(Self(token.to_owned()))
    }

    /// Creates a `ShortToken` without validation.
    ///
    /// Use this only for tokens read back from a trusted store.
    pub fn new_unchecked(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(token: &str) -> Result<(), LinkError> {
        if token.is_empty() {
            return Err(LinkError::InvalidInput("short token cannot be empty".into()));
        }

        if token.len() > MAX_LENGTH {
            return Err(LinkError::InvalidInput(format!(
                "short token must be at most {} bytes, got {}",
                MAX_LENGTH,
                token.len()
            )));
        }

        if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(LinkError::InvalidInput(format!(
                "short token must not contain whitespace or control characters: '{}'",
                token.escape_debug()
            )));
        }

        Ok(())
    }
}

impl Display for ShortToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
