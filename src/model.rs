//! The safe model handle
//!
//! [`Model`] owns an opened native resource for its entire lifetime and
//! releases it deterministically when the last clone drops, on every exit
//! path. Loading goes through the process-wide [`NativeEngine`] by default;
//! [`Model::load_with_engine`] injects any [`Engine`] implementation, which
//! is how tests run against a mock engine.

use std::fmt;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::engine::{Engine, NativeEngine, RawModel};
use crate::error::LlmodelError;
use crate::streaming::{TokenSink, WriterSink};

/// Inner struct tying the raw handle to its engine, with scoped cleanup.
struct ModelInner {
    engine: Arc<dyn Engine>,
    raw: RawModel,
    path: PathBuf,
}

impl Drop for ModelInner {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            let mut raw = mem::replace(&mut self.raw, RawModel::null());
            self.engine.close(&mut raw);
        }
    }
}

/// An opened model checkpoint.
///
/// Reference-counted: clones share one underlying resource, which is
/// released exactly once when the last clone drops.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("path", &self.inner.path)
            .field("released", &self.inner.raw.is_null())
            .finish()
    }
}

impl Model {
    /// Open the checkpoint at `path` with the shared native engine.
    ///
    /// Fails with [`LlmodelError::ResourceOpen`] if the file does not exist,
    /// is unreadable, or the engine rejects it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LlmodelError> {
        let path = path.as_ref();
        // Checked here so a missing file never touches the native library.
        if !path.is_file() {
            return Err(LlmodelError::ResourceOpen(format!(
                "model file not found: {}",
                path.display()
            )));
        }
        let engine: Arc<dyn Engine> = NativeEngine::shared()?;
        Self::load_with_engine(path, engine)
    }

    /// Open the checkpoint through a caller-supplied engine.
    pub fn load_with_engine(
        path: impl AsRef<Path>,
        engine: Arc<dyn Engine>,
    ) -> Result<Self, LlmodelError> {
        let path = path.as_ref().to_path_buf();
        let raw = engine.open(&path)?;
        tracing::debug!(path = %path.display(), "model opened");
        Ok(Self {
            inner: Arc::new(ModelInner { engine, raw, path }),
        })
    }

    /// The file path this handle was opened from.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Generate text from `prompt`, blocking until the engine emits a
    /// terminal token or reaches `n_predict`.
    ///
    /// When `stream` is true, tokens are echoed to standard output as they
    /// are produced; the call still blocks to completion and the full
    /// accumulated text is returned either way.
    pub fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
        stream: bool,
    ) -> Result<String, LlmodelError> {
        if stream {
            let mut sink = WriterSink::stdout();
            self.generate_with_sink(prompt, config, Some(&mut sink))
        } else {
            self.generate_with_sink(prompt, config, None)
        }
    }

    /// General form of [`Model::generate`]: tokens go to the given sink (if
    /// any) as a side channel of the still-blocking call.
    pub fn generate_with_sink(
        &self,
        prompt: &str,
        config: &GenerationConfig,
        sink: Option<&mut dyn TokenSink>,
    ) -> Result<String, LlmodelError> {
        self.inner
            .engine
            .generate(&self.inner.raw, prompt, config, sink)
    }

    /// Hint how many CPU threads the engine should use for this handle.
    pub fn set_thread_count(&self, n_threads: i32) {
        self.inner.engine.set_thread_count(&self.inner.raw, n_threads);
    }
}
