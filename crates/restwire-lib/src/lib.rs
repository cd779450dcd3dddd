// restwire-lib: JSON serialization processor, its HTTP glue and the CLI plumbing

pub mod cli;
pub mod commands;
pub mod config;
pub mod content_type;
pub mod errors;
pub mod json;
pub mod logger;
pub mod output;
pub mod processor;
pub mod signal;
pub mod timepoint;

// Feature-gated modules
#[cfg(feature = "http-server")]
pub mod server;

pub use errors::{ProcessorError, RestwireError};
pub use json::{JsonProcessor, JsonProcessorBuilder, Mapper, MapperOptions, Module};
pub use processor::SerializationProcessor;
pub use timepoint::Timepoint;
