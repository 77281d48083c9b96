#![deny(clippy::dbg_macro)]

pub mod batch;
pub mod config;
pub mod registry;
pub mod tokens;
pub mod types;

pub use batch::{BatchConfig, BatchError, BatchExecutor};
pub use config::{Config, ConfigError};
pub use registry::{Connection, ConnectionRegistry};
pub use tokens::{AccessorError, BalanceSource, TokenAccessor, TokenCatalog, TokenDescriptor};
