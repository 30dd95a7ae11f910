pub mod drive;
pub mod error;
pub mod exif;
pub mod naming;
pub mod photographer;
pub mod pipeline;
pub mod renamer;
pub mod sanitize;
pub mod source;
pub mod strategy;
pub mod time_offset;

pub use error::ConfigError;
pub use pipeline::{run, RunOptions, RunReport};
pub use strategy::{PhotoRecord, TimestampStrategy};
