//! File-backed stream registry.
//!
//! A stream is opened by name, gets a server-assigned id from a counter that
//! starts at 1 and never goes backwards, and records every payload written to
//! it into `<out_dir>/<name>.<index>.sds`.

pub mod error;
pub mod name;
pub mod registry;

pub use error::{Result, StreamError};
pub use name::{validate_name, NameError};
pub use registry::{OpenMode, RegistryStats, StreamInfo, StreamRegistry, DEFAULT_EXTENSION};
