//! Scripted mock engine used by the integration tests.
//!
//! Counts open/close calls so resource-lifecycle properties can be checked,
//! and replays a fixed token stream; the `<end>` token is terminal and is
//! never delivered to a sink.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use llmodel::engine::{Engine, RawModel};
use llmodel::streaming::TokenSink;
use llmodel::token::Token;
use llmodel::{GenerationConfig, LlmodelError};

pub const END_TOKEN: &str = "<end>";

pub struct MockEngine {
    tokens: Vec<String>,
    fail_open: bool,
    fail_generate: bool,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub last_config: Mutex<Option<GenerationConfig>>,
    pub last_prompt: Mutex<Option<String>>,
    next_id: AtomicUsize,
}

impl MockEngine {
    fn scripted(tokens: &[&str], fail_open: bool, fail_generate: bool) -> Arc<Self> {
        Arc::new(Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            fail_open,
            fail_generate,
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            last_config: Mutex::new(None),
            last_prompt: Mutex::new(None),
            next_id: AtomicUsize::new(1),
        })
    }

    pub fn new(tokens: &[&str]) -> Arc<Self> {
        Self::scripted(tokens, false, false)
    }

    pub fn failing_open() -> Arc<Self> {
        Self::scripted(&[], true, false)
    }

    pub fn failing_generate() -> Arc<Self> {
        Self::scripted(&["42", END_TOKEN], false, true)
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Engine for MockEngine {
    fn open(&self, path: &Path) -> Result<RawModel, LlmodelError> {
        if self.fail_open {
            return Err(LlmodelError::ResourceOpen(format!(
                "model file not found: {}",
                path.display()
            )));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(RawModel::from_id(id))
    }

    fn generate(
        &self,
        raw: &RawModel,
        prompt: &str,
        config: &GenerationConfig,
        mut sink: Option<&mut dyn TokenSink>,
    ) -> Result<String, LlmodelError> {
        if raw.is_null() {
            return Err(LlmodelError::Generation(
                "model handle has been released".to_string(),
            ));
        }
        if self.fail_generate {
            return Err(LlmodelError::Generation("engine fault".to_string()));
        }
        *self.last_config.lock().unwrap() = Some(config.clone());
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());

        let mut accumulated = String::new();
        for (i, text) in self.tokens.iter().enumerate() {
            if text == END_TOKEN || i as i32 >= config.n_predict() {
                break;
            }
            accumulated.push_str(text);
            if let Some(sink) = sink.as_mut() {
                if !sink.on_token(&Token::new(i as i32, text.clone())) {
                    break;
                }
            }
        }
        Ok(accumulated)
    }

    fn close(&self, raw: &mut RawModel) {
        if raw.is_null() {
            return;
        }
        self.closed.fetch_add(1, Ordering::SeqCst);
        raw.clear();
    }
}
