//! Record extraction from raw log lines.
//!
//! Every alias compiles its patterns once. The [`LineExtractor`] then maps a
//! line and a stream identity to a [`LogRecord`].

mod alias;
mod error;
mod extractor;
mod join;
mod record;
mod timestamp;

pub use alias::CompiledAlias;
pub use error::ExtractError;
pub use extractor::LineExtractor;
pub use join::{GroupRef, JoinFormat, Template};
pub use record::{Direction, LogRecord, RecordBuilder, StreamIdentity};
pub use timestamp::{TimestampFormat, TimestampZone};
