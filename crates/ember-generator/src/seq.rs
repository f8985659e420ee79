use crate::CodeGenerator;
use async_trait::async_trait;
use ember_core::{GenerateError, ShortToken};
use std::sync::atomic::{AtomicU64, Ordering};

/// A sequential token generator that needs no network.
///
/// Produces `prefix000000`, `prefix000001`, and so on, regardless of the
/// destination. Tokens are unique within one instance only; a fresh instance
/// pointed at an existing store will collide with earlier tokens until it
/// counts past them, so pick a distinct prefix or an offset per session.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl SeqGenerator {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::with_offset(prefix, 0)
    }

    /// Creates a generator whose first token uses `offset` as its counter.
    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
            prefix: prefix.into(),
        }
    }

    fn next_token(&self) -> String {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}{:06}", self.prefix, count)
    }
}

#[async_trait]
impl CodeGenerator for SeqGenerator {
    async fn generate(&self, _destination: &str) -> Result<ShortToken, GenerateError> {
        ShortToken::new(self.next_token()).map_err(|e| GenerateError::BadResponse(e.to_string()))
    }
}
