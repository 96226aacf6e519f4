use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmodelError {
    #[error("Failed to open model: {0}")]
    ResourceOpen(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Engine library unavailable: {0}")]
    EngineLibrary(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fatal runtime failure: {0}")]
    Fatal(#[source] Box<LlmodelError>),
}

impl LlmodelError {
    /// Wrap an error as a top-level fatal failure. Already-fatal errors are
    /// returned unchanged so the wrapper never nests.
    pub fn fatal(self) -> Self {
        match self {
            LlmodelError::Fatal(_) => self,
            other => LlmodelError::Fatal(Box::new(other)),
        }
    }
}
