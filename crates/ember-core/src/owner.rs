use crate::error::LinkError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque identifier of the party that created a link.
///
/// Identities are issued elsewhere; the only checks here are that the id is
/// non-empty and of bounded length. Two owners are the same iff their ids are
/// byte-equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

const MAX_LENGTH: usize = 255;

impl OwnerId {
    pub fn new(id: impl AsRef<str>) -> Result<Self, LinkError> {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(LinkError::InvalidInput("owner id cannot be empty".into()));
        }
        if id.len() > MAX_LENGTH {
            return Err(LinkError::InvalidInput(format!(
                "owner id must be at most {} bytes, got {}",
                MAX_LENGTH,
                id.len()
            )));
        }
        Ok(Self(id.to_owned()))
    }

    /// Creates an `OwnerId` without validation, for ids read back from a store.
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
