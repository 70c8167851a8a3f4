//! Reader pipeline and its scheduler.

mod error;
mod pipeline;
mod scheduler;

pub use error::ReaderError;
pub use pipeline::LogReader;
pub use scheduler::Scheduler;
