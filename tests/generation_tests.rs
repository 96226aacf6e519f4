//! Handle lifecycle and generation behavior against a mock engine.
//!
//! These tests validate the binding contract without requiring the native
//! engine library or any model file.

mod common;

use std::sync::Arc;

use common::{MockEngine, END_TOKEN};
use llmodel::engine::Engine;
use llmodel::streaming::CollectingSink;
use llmodel::token::Token;
use llmodel::{GenerationConfig, LlmodelError, Model};

const MEANING_OF_LIFE_PROMPT: &str = "### Human:\nWhat is the meaning of life\n### Assistant:";

#[cfg(test)]
mod handle_lifecycle_tests {
    use super::*;

    #[test]
    fn test_open_succeeds_for_healthy_engine() {
        let engine = MockEngine::new(&["hi", END_TOKEN]);
        let model = Model::load_with_engine("weights.bin", engine.clone()).unwrap();
        assert_eq!(model.path().to_str(), Some("weights.bin"));
        assert_eq!(engine.open_count(), 1);
        assert_eq!(engine.close_count(), 0);
    }

    #[test]
    fn test_failed_open_reports_resource_open_and_leaks_nothing() {
        let engine = MockEngine::failing_open();
        let result = Model::load_with_engine("missing.bin", engine.clone());
        match result {
            Err(LlmodelError::ResourceOpen(msg)) => assert!(msg.contains("missing.bin")),
            other => panic!("expected ResourceOpen, got {other:?}"),
        }
        // No handle was created, so nothing to release
        assert_eq!(engine.open_count(), 0);
        assert_eq!(engine.close_count(), 0);
    }

    #[test]
    fn test_handle_released_exactly_once_on_drop() {
        let engine = MockEngine::new(&["42", END_TOKEN]);
        {
            let model = Model::load_with_engine("weights.bin", engine.clone()).unwrap();
            model
                .generate("hello", &GenerationConfig::default(), false)
                .unwrap();
        }
        assert_eq!(engine.open_count(), 1);
        assert_eq!(engine.close_count(), 1);
    }

    #[test]
    fn test_clones_share_one_release() {
        let engine = MockEngine::new(&["42", END_TOKEN]);
        {
            let model = Model::load_with_engine("weights.bin", engine.clone()).unwrap();
            let clone = model.clone();
            drop(model);
            assert_eq!(engine.close_count(), 0);
            drop(clone);
        }
        assert_eq!(engine.open_count(), 1);
        assert_eq!(engine.close_count(), 1);
    }

    #[test]
    fn test_handle_released_on_generation_error_path() {
        let engine = MockEngine::failing_generate();
        {
            let model = Model::load_with_engine("weights.bin", engine.clone()).unwrap();
            let result = model.generate("hello", &GenerationConfig::default(), false);
            assert!(matches!(result, Err(LlmodelError::Generation(_))));
        }
        assert_eq!(engine.open_count(), 1);
        assert_eq!(engine.close_count(), 1);
    }
}

#[cfg(test)]
mod generation_tests {
    use super::*;

    #[test]
    fn test_generate_blocks_and_returns_accumulated_text() {
        let engine = MockEngine::new(&["The", " answer", END_TOKEN]);
        let model = Model::load_with_engine("weights.bin", engine).unwrap();
        let text = model
            .generate("a non-empty prompt", &GenerationConfig::default(), false)
            .unwrap();
        assert_eq!(text, "The answer");
        assert!(!text.is_empty());
    }

    #[test]
    fn test_meaning_of_life_scenario() {
        // Fixed token stream ["42", ".", "<end>"]: two streamed callbacks,
        // the terminal token never delivered, returned text "42."
        let engine = MockEngine::new(&["42", ".", END_TOKEN]);
        let model = Model::load_with_engine("weights.bin", engine.clone()).unwrap();
        let config = GenerationConfig::builder()
            .n_predict(4096)
            .repeat_last_n(64)
            .build();

        let mut sink = CollectingSink::new();
        let text = model
            .generate_with_sink(MEANING_OF_LIFE_PROMPT, &config, Some(&mut sink))
            .unwrap();

        assert_eq!(text, "42.");
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.text(), "42.");
        assert!(sink.tokens().iter().all(|t| t.text != END_TOKEN));

        let seen_prompt = engine.last_prompt.lock().unwrap().clone().unwrap();
        assert_eq!(seen_prompt, MEANING_OF_LIFE_PROMPT);
    }

    #[test]
    fn test_config_reaches_the_engine_unchanged() {
        let engine = MockEngine::new(&[END_TOKEN]);
        let model = Model::load_with_engine("weights.bin", engine.clone()).unwrap();
        let config = GenerationConfig::builder()
            .n_predict(4096)
            .repeat_last_n(64)
            .build();
        model.generate("prompt", &config, false).unwrap();

        let seen = engine.last_config.lock().unwrap().clone().unwrap();
        assert_eq!(seen, config);
        assert_eq!(seen.n_predict(), 4096);
        assert_eq!(seen.repeat_last_n(), 64);
        // Unset options arrived with engine defaults
        assert_eq!(seen.top_k(), GenerationConfig::default().top_k());
    }

    #[test]
    fn test_config_is_reusable_across_calls() {
        let engine = MockEngine::new(&["x", END_TOKEN]);
        let model = Model::load_with_engine("weights.bin", engine).unwrap();
        let config = GenerationConfig::builder().n_predict(8).build();
        assert_eq!(model.generate("one", &config, false).unwrap(), "x");
        assert_eq!(model.generate("two", &config, false).unwrap(), "x");
    }

    #[test]
    fn test_sink_can_stop_generation_early() {
        let engine = MockEngine::new(&["42", ".", " extra", END_TOKEN]);
        let model = Model::load_with_engine("weights.bin", engine).unwrap();

        let mut delivered = 0usize;
        let mut sink = |_token: &Token| {
            delivered += 1;
            false
        };
        let text = model
            .generate_with_sink("prompt", &GenerationConfig::default(), Some(&mut sink))
            .unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(text, "42");
    }

    #[test]
    fn test_n_predict_caps_the_stream() {
        let engine = MockEngine::new(&["a", "b", "c", "d"]);
        let model = Model::load_with_engine("weights.bin", engine).unwrap();
        let config = GenerationConfig::builder().n_predict(2).build();
        let text = model.generate("prompt", &config, false).unwrap();
        assert_eq!(text, "ab");
    }

    #[test]
    fn test_immediate_terminal_token_yields_empty_output() {
        let engine = MockEngine::new(&[END_TOKEN]);
        let model = Model::load_with_engine("weights.bin", engine).unwrap();
        let mut sink = CollectingSink::new();
        let text = model
            .generate_with_sink("prompt", &GenerationConfig::default(), Some(&mut sink))
            .unwrap();
        assert!(text.is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_generate_through_trait_object() {
        // The Engine seam stays object-safe
        let engine: Arc<dyn Engine> = MockEngine::new(&["ok", END_TOKEN]);
        let model = Model::load_with_engine("weights.bin", engine).unwrap();
        assert_eq!(
            model
                .generate("prompt", &GenerationConfig::default(), false)
                .unwrap(),
            "ok"
        );
    }
}
