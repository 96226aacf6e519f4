//! Synchronous streaming sinks for token delivery
//!
//! Generation is a blocking call; streaming is a side channel of that call.
//! A [`TokenSink`] receives each token as the engine produces it, before the
//! call returns the full accumulated text. There are no threads and no
//! channels here: the sink is invoked inline, once per token.
//!
//! ## Example
//!
//! ```rust,no_run
//! use llmodel::{GenerationConfig, Model};
//! use llmodel::streaming::WriterSink;
//!
//! # fn main() -> Result<(), llmodel::LlmodelError> {
//! let model = Model::load("path/to/model.bin")?;
//! let config = GenerationConfig::default();
//!
//! let mut sink = WriterSink::stdout();
//! let text = model.generate_with_sink("Hello", &config, Some(&mut sink))?;
//! # Ok(())
//! # }
//! ```

use std::io::{self, Write};

use crate::token::Token;

/// Receives tokens as they are produced during a blocking generation call.
///
/// Return `false` to ask the engine to stop early; tokens delivered up to
/// that point are still part of the accumulated result.
pub trait TokenSink {
    fn on_token(&mut self, token: &Token) -> bool;
}

/// Any `FnMut(&Token) -> bool` closure is a sink.
impl<F: FnMut(&Token) -> bool> TokenSink for F {
    fn on_token(&mut self, token: &Token) -> bool {
        self(token)
    }
}

/// Writes each token's text to a writer and flushes, so output appears as it
/// is generated. Write failures stop the stream.
pub struct WriterSink<W: Write> {
    writer: W,
}

impl WriterSink<io::Stdout> {
    /// Sink that streams tokens to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TokenSink for WriterSink<W> {
    fn on_token(&mut self, token: &Token) -> bool {
        if self.writer.write_all(token.text.as_bytes()).is_err() {
            return false;
        }
        self.writer.flush().is_ok()
    }
}

/// Buffers every delivered token; useful when a caller wants both the
/// incremental stream and the pieces afterwards.
#[derive(Debug, Default)]
pub struct CollectingSink {
    tokens: Vec<Token>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Concatenation of all delivered token texts.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}

impl TokenSink for CollectingSink {
    fn on_token(&mut self, token: &Token) -> bool {
        self.tokens.push(token.clone());
        true
    }
}
