//! Batching of extracted messages.

mod batch;
mod error;
mod message;

pub use batch::{BatchLimits, BatchPublisher, FLUSH_INTERVAL};
pub use error::PublishError;
pub use message::{MessageId, OutgoingMessage, ParsedMessage};
