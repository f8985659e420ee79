use crate::error::LinkError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use url::Url;

const ALLOWED_SCHEMES: [&str; 3] = ["http", "https", "ftp"];

/// A validated destination address.
///
/// The address must parse as an absolute URL with an `http`, `https` or `ftp`
/// scheme and a non-empty host. The string is kept exactly as supplied
/// (minus surrounding whitespace) rather than in its normalized form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Destination(String);

impl Destination {
    pub fn parse(input: impl AsRef<str>) -> Result<Self, LinkError> {
        let input = input.as_ref().trim();

        if input.is_empty() {
            return Err(LinkError::InvalidInput("URL cannot be empty".into()));
        }

        if input.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(LinkError::InvalidInput(format!(
                "URL must not contain whitespace: {}",
                input.escape_debug()
            )));
        }

        let parsed = Url::parse(input)
            .map_err(|e| LinkError::InvalidInput(format!("malformed URL '{}': {}", input, e)))?;

        if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
            return Err(LinkError::InvalidInput(format!(
                "URL scheme must be http, https or ftp: {}",
                parsed.scheme()
            )));
        }

        if !parsed.host_str().is_some_and(|host| !host.is_empty()) {
            return Err(LinkError::InvalidInput(format!(
                "URL must have a host: {}",
                input
            )));
        }

        Ok(Self(input.to_owned()))
    }

    /// Wraps an address read back from a store without re-validating it.
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_schemes() {
        assert!(Destination::parse("http://example.com").is_ok());
        assert!(Destination::parse("https://example.com/a?b=c#d").is_ok());
        assert!(Destination::parse("ftp://files.example.com/pub/readme.txt").is_ok());
        assert!(Destination::parse("HTTPS://Example.com/Path").is_ok());
    }

    #[test]
    fn keeps_original_spelling() {
        let dest = Destination::parse("  https://Example.com/Path  ").unwrap();
        assert_eq!(dest.as_str(), "https://Example.com/Path");
    }

    #[test]
    fn rejects_unsupported_schemes() {
        assert!(Destination::parse("mailto:someone@example.com").is_err());
        assert!(Destination::parse("javascript:alert(1)").is_err());
        assert!(Destination::parse("file:///etc/passwd").is_err());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Destination::parse("").is_err());
        assert!(Destination::parse("not-a-valid-url").is_err());
        assert!(Destination::parse("https://").is_err());
        assert!(Destination::parse("https://exa mple.com").is_err());
    }
}
