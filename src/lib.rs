pub mod config;
pub mod error;
pub mod mapping;
pub mod names;
pub mod output;
pub mod parser;
pub mod progress;
pub mod sequence;
pub mod stats;
