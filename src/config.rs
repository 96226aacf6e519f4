//! Generation and demo configuration with serde integration
//!
//! [`GenerationConfig`] is an immutable value object built through
//! [`crate::builder::GenerationConfigBuilder`]; every option the builder
//! does not set keeps its engine-default value. Once built the object is
//! read-only and can be reused across any number of generation calls.
//!
//! [`DemoConfig`] covers the outer concerns of the demo runner (model path,
//! optional library search path) and can be loaded from a JSON file or from
//! environment variables.
//!
//! ## Example
//!
//! ```rust
//! use llmodel::GenerationConfig;
//!
//! let config = GenerationConfig::builder()
//!     .n_predict(4096)
//!     .repeat_last_n(64)
//!     .build();
//!
//! assert_eq!(config.n_predict(), 4096);
//! assert_eq!(config.repeat_last_n(), 64);
//! // Unset options keep their engine defaults
//! assert_eq!(config.top_k(), 40);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::builder::GenerationConfigBuilder;
use crate::engine::LIBRARY_PATH_ENV;
use crate::error::LlmodelError;
use crate::sys;

/// Environment variable naming the model checkpoint to open.
pub const MODEL_PATH_ENV: &str = "LLMODEL_MODEL";

/// Immutable sampling and decode-state parameters for a generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub(crate) n_past: i32,
    pub(crate) n_ctx: i32,
    pub(crate) n_predict: i32,
    pub(crate) top_k: i32,
    pub(crate) top_p: f32,
    pub(crate) temp: f32,
    pub(crate) n_batch: i32,
    pub(crate) repeat_penalty: f32,
    pub(crate) repeat_last_n: i32,
    pub(crate) context_erase: f32,
}

impl Default for GenerationConfig {
    /// Engine-default values, used for every option a builder leaves unset.
    fn default() -> Self {
        Self {
            n_past: 0,
            n_ctx: 2048,
            n_predict: 128,
            top_k: 40,
            top_p: 0.95,
            temp: 0.28,
            n_batch: 8,
            repeat_penalty: 1.1,
            repeat_last_n: 10,
            context_erase: 0.5,
        }
    }
}

impl GenerationConfig {
    /// Start a fluent builder seeded with engine defaults.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder::new()
    }

    /// Number of tokens of past conversation already in the context.
    pub fn n_past(&self) -> i32 {
        self.n_past
    }

    /// Context window size, in tokens.
    pub fn n_ctx(&self) -> i32 {
        self.n_ctx
    }

    /// Maximum number of tokens to produce.
    pub fn n_predict(&self) -> i32 {
        self.n_predict
    }

    pub fn top_k(&self) -> i32 {
        self.top_k
    }

    pub fn top_p(&self) -> f32 {
        self.top_p
    }

    pub fn temp(&self) -> f32 {
        self.temp
    }

    /// Number of prompt tokens evaluated per decode batch.
    pub fn n_batch(&self) -> i32 {
        self.n_batch
    }

    pub fn repeat_penalty(&self) -> f32 {
        self.repeat_penalty
    }

    /// Window size, in tokens, used to penalize repetition.
    pub fn repeat_last_n(&self) -> i32 {
        self.repeat_last_n
    }

    /// Fraction of the context erased when the window overflows.
    pub fn context_erase(&self) -> f32 {
        self.context_erase
    }

    pub(crate) fn to_prompt_context(&self) -> sys::llmodel_prompt_context {
        sys::llmodel_prompt_context {
            n_past: self.n_past,
            n_ctx: self.n_ctx,
            n_predict: self.n_predict,
            top_k: self.top_k,
            top_p: self.top_p,
            temp: self.temp,
            n_batch: self.n_batch,
            repeat_penalty: self.repeat_penalty,
            repeat_last_n: self.repeat_last_n,
            context_erase: self.context_erase,
        }
    }
}

/// Configuration for the demo runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Path to the model checkpoint.
    pub model_path: String,
    /// Optional directory searched for the engine shared library.
    #[serde(default)]
    pub library_path: Option<String>,
    /// Generation parameters.
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl DemoConfig {
    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LlmodelError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(|e| LlmodelError::Config(e.to_string()))
    }

    /// Load from the environment: `LLMODEL_MODEL` is required,
    /// `LLMODEL_LIBRARY_PATH` is optional.
    pub fn from_env() -> Result<Self, LlmodelError> {
        let model_path = std::env::var(MODEL_PATH_ENV).map_err(|_| {
            LlmodelError::Config(format!("{MODEL_PATH_ENV} is not set"))
        })?;
        Ok(Self {
            model_path,
            library_path: std::env::var(LIBRARY_PATH_ENV).ok(),
            generation: GenerationConfig::default(),
        })
    }
}
