//! # Llmodel
//!
//! A safe Rust binding layer for a local llmodel-style text-generation
//! engine, loaded from its shared library at runtime.
//!
//! ## Features
//!
//! - Scoped model handles with automatic release on every exit path
//! - Immutable, reusable generation configuration built via a fluent builder
//! - Streaming token delivery through synchronous sinks while the call blocks
//! - Runtime engine library resolution with an environment override
//! - Pluggable [`engine::Engine`] seam so tests run against a mock engine
//!
//! ## Example
//!
//! ```rust,no_run
//! use llmodel::{GenerationConfig, Model};
//!
//! # fn main() -> Result<(), llmodel::LlmodelError> {
//! // Open a model checkpoint (released when `model` goes out of scope)
//! let model = Model::load("path/to/model.bin")?;
//!
//! // Build an immutable configuration; unset options keep engine defaults
//! let config = GenerationConfig::builder()
//!     .n_predict(4096)
//!     .repeat_last_n(64)
//!     .build();
//!
//! // Blocking call; `true` streams tokens to stdout as they are produced
//! let text = model.generate("### Human:\nHello\n### Assistant:", &config, true)?;
//! println!("\n---\n{text}");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod streaming;
pub mod sys;
pub mod token;

pub use builder::GenerationConfigBuilder;
pub use config::{DemoConfig, GenerationConfig, MODEL_PATH_ENV};
pub use engine::{Engine, NativeEngine, RawModel, LIBRARY_PATH_ENV};
pub use error::LlmodelError;
pub use model::Model;
pub use streaming::{CollectingSink, TokenSink, WriterSink};
pub use token::{Token, TokenId};

pub mod prelude {
    pub use crate::{GenerationConfig, LlmodelError, Model, TokenSink};
}
