//! Core types and traits for the Ember link service.
//!
//! This crate provides the link record model, the validated value types it
//! is built from, the repository contract implemented by the storage
//! backends, and the error taxonomy shared by every other crate.

pub mod clock;
pub mod destination;
pub mod error;
pub mod owner;
pub mod repository;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use destination::Destination;
pub use error::{GenerateError, LinkError, StorageError};
pub use owner::OwnerId;
pub use repository::{LinkRecord, LinkRepository, Liveness};
pub use token::ShortToken;
