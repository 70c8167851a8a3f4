//! Readlog - tails rotating log directories and ships extracted records in batches.

pub mod config;
pub mod content;
pub mod parser;
pub mod publisher;
pub mod reader;
pub mod sink;
pub mod watcher;
