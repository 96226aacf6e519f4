//! Fluent builder for generation configuration
//!
//! The builder starts from engine defaults and only overrides what the
//! caller sets; [`GenerationConfigBuilder::build`] produces the immutable
//! [`GenerationConfig`] value object.
//!
//! ## Example
//!
//! ```rust
//! use llmodel::GenerationConfig;
//!
//! let config = GenerationConfig::builder()
//!     .n_predict(4096)
//!     .repeat_last_n(64)
//!     .temp(0.7)
//!     .build();
//!
//! assert_eq!(config.n_predict(), 4096);
//! ```

use crate::config::GenerationConfig;

/// Builder for [`GenerationConfig`]; see the module docs.
#[derive(Debug, Clone, Default)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens of past conversation already in the context.
    pub fn n_past(mut self, n_past: i32) -> Self {
        self.config.n_past = n_past;
        self
    }

    /// Context window size, in tokens.
    pub fn n_ctx(mut self, n_ctx: i32) -> Self {
        self.config.n_ctx = n_ctx;
        self
    }

    /// Maximum number of tokens to produce.
    pub fn n_predict(mut self, n_predict: i32) -> Self {
        self.config.n_predict = n_predict;
        self
    }

    pub fn top_k(mut self, top_k: i32) -> Self {
        self.config.top_k = top_k;
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.config.top_p = top_p;
        self
    }

    pub fn temp(mut self, temp: f32) -> Self {
        self.config.temp = temp;
        self
    }

    /// Number of prompt tokens evaluated per decode batch.
    pub fn n_batch(mut self, n_batch: i32) -> Self {
        self.config.n_batch = n_batch;
        self
    }

    pub fn repeat_penalty(mut self, repeat_penalty: f32) -> Self {
        self.config.repeat_penalty = repeat_penalty;
        self
    }

    /// Window size, in tokens, used to penalize repetition.
    pub fn repeat_last_n(mut self, repeat_last_n: i32) -> Self {
        self.config.repeat_last_n = repeat_last_n;
        self
    }

    /// Fraction of the context erased when the window overflows.
    pub fn context_erase(mut self, context_erase: f32) -> Self {
        self.config.context_erase = context_erase;
        self
    }

    /// Finish the builder; the result is read-only and reusable.
    pub fn build(self) -> GenerationConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_match_config_defaults() {
        assert_eq!(GenerationConfigBuilder::new().build(), GenerationConfig::default());
    }

    #[test]
    fn test_builder_overrides_only_what_is_set() {
        let config = GenerationConfig::builder()
            .n_predict(4096)
            .repeat_last_n(64)
            .build();
        let defaults = GenerationConfig::default();
        assert_eq!(config.n_predict(), 4096);
        assert_eq!(config.repeat_last_n(), 64);
        assert_eq!(config.top_k(), defaults.top_k());
        assert_eq!(config.temp(), defaults.temp());
        assert_eq!(config.n_batch(), defaults.n_batch());
    }
}
