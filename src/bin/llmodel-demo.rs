//! Demo runner: open a checkpoint and run one streaming generation.
//!
//! No CLI arguments. The model path comes from `LLMODEL_MODEL`; the engine
//! shared library can be pointed at with `LLMODEL_LIBRARY_PATH`. Tokens are
//! streamed to stdout as they are produced, and any error aborts the
//! process with a non-zero status.
//!
//! ```bash
//! LLMODEL_MODEL=~/models/ggml-mpt-7b-instruct.bin llmodel-demo
//! ```

use std::process::ExitCode;

use llmodel::{DemoConfig, GenerationConfig, LlmodelError, Model};

const PROMPT: &str = "### Human:\nWhat is the meaning of life\n### Assistant:";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Every error from the run is re-signaled as a fatal failure; there is
    // no retry and no partial recovery in a demo.
    match run().map_err(LlmodelError::fatal) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), LlmodelError> {
    let demo = DemoConfig::from_env()?;

    // Scoped acquisition: the handle is released when `model` drops,
    // whether we return normally or propagate an error below.
    let model = Model::load(&demo.model_path)?;
    tracing::info!(path = %model.path().display(), "model loaded");

    let config = GenerationConfig::builder()
        .n_predict(4096)
        .repeat_last_n(64)
        .build();

    let output = model.generate(PROMPT, &config, true)?;
    println!();
    tracing::info!(chars = output.len(), "generation finished");
    Ok(())
}
