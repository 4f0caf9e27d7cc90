pub mod config;
pub mod core;
pub mod embedded;
pub mod filesystem;
pub mod logging;
pub mod metadata;
pub mod mount;
pub mod tools;

pub use crate::core::error::{Result, ScribeError};
pub use crate::core::paths::{check_type, resolve};
pub use crate::core::runner::{ExecutionRequest, ExecutionResult, SystemRunner, ToolRunner};
pub use crate::core::size::{format_size, parse_size};
