pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod server;
pub mod services;
pub mod utils;

pub use crate::config::{Config, QualityConfig};
pub use crate::core::{classify, Descriptor, DispatchRouter, MediaType, Outcome, TaskRegistry};
pub use crate::services::Services;
