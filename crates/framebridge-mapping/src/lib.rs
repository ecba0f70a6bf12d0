//! Mapping engine: parsed records to outbound payloads.
//!
//! - **MappingEngine**: applies an endpoint's ordered mapping rules with
//!   converters, shared coercion and reserved-word templating
//! - **ConverterRegistry**: pluggable value transformations with idempotent
//!   register/unregister
//! - **TemplateEngine**: `@token` reserved-word expansion
//! - **OutboundRecord**: the payload plus delivery metadata handed to the
//!   delivery collaborator

pub mod converters;
pub mod engine;
pub mod error;
pub mod outbound;
pub mod template;

pub use converters::{Converter, ConverterRegistry, Offset, Round, Scale};
pub use engine::{MappingEngine, MappingStatsSnapshot};
pub use error::MappingError;
pub use outbound::{MappingResult, OutboundMeta, OutboundRecord};
pub use template::{Clock, SystemClock, TemplateEngine};
