//! Short token generation.
//!
//! Tokens normally come from an external shortening service reached over
//! HTTP ([`HttpCodeGenerator`]). [`SeqGenerator`] hands out local sequential
//! tokens for offline use.

pub mod http;
pub mod seq;

use async_trait::async_trait;
use ember_core::{GenerateError, ShortToken};
use std::sync::Arc;

pub use http::{HttpCodeGenerator, HttpGeneratorConfig};
pub use seq::SeqGenerator;

/// Produces a candidate short token for a destination.
///
/// Implementations do not look at storage, so a returned token may already
/// be taken. Callers are responsible for detecting and handling collisions.
#[async_trait]
pub trait CodeGenerator: Send + Sync + 'static {
    /// Requests a token for `destination`.
    async fn generate(&self, destination: &str) -> Result<ShortToken, GenerateError>;
}

#[async_trait]
impl<T: CodeGenerator + ?Sized> CodeGenerator for Arc<T> {
    async fn generate(&self, destination: &str) -> Result<ShortToken, GenerateError> {
        (**self).generate(destination).await
    }
}
