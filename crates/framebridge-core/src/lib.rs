//! Shared data model for the framebridge pipeline.
//!
//! This crate defines the types every pipeline stage agrees on:
//! - **FieldValue / FieldType**: one closed tagged union for extracted values,
//!   with a single shared coercion routine used by parsers and mapping alike
//! - **RawFrame / FrameFormat**: one decoded unit of raw bytes plus its
//!   identity metadata
//! - **Rule / ParsedRecord / ParseOutcome**: extraction configuration and its
//!   per-frame results
//! - **MappingRule / EndpointConfig / RetryPolicyConfig**: outbound
//!   configuration, loadable from TOML
//!
//! Expected failure modes travel as outcome values with a success flag and
//! elapsed time; only programmer errors surface as panics.

pub mod config;
pub mod error;
pub mod frame;
pub mod record;
pub mod rule;
pub mod value;

pub use config::{
    BridgeConfig, EndpointConfig, MappingRule, RetryMode, RetryPolicyConfig,
};
pub use error::ConfigError;
pub use frame::{FrameFormat, RawFrame};
pub use record::{ParseOutcome, ParsedRecord};
pub use rule::Rule;
pub use value::{coerce, coerce_value, FieldType, FieldValue};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
