//! wavpipe: a pull-based processing pipeline for mono 16-bit WAV audio.
//!
//! Input tracks are loaded into numbered slots and rewired by a small
//! line-oriented command language:
//!
//! ```text
//! mix $2 3      # mix with the second track, starting at 3 s
//! mute 5 10     # silence seconds 5 to 10
//! resample 200%
//! vocoder $3
//! ```
//!
//! Nothing is processed until the result is rendered; the renderer pulls
//! samples through the chain of streams the commands built.

pub mod ast;
pub mod dsp;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod settings;
pub mod stream;
pub mod token;

use std::path::Path;

use tracing::info;

use crate::dsp::renderer::FileSink;
use crate::lexer::Lexer;
use crate::parser::Parser;

pub use crate::error::{ConfigError, Error};
pub use crate::pipeline::Pipeline;
pub use crate::settings::{PipelineSettings, VocoderSettings};

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse a command script into pipeline steps.
pub fn parse(source: &str) -> Result<Vec<ast::Step>, Error> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens);
    Ok(parser.parse_script()?)
}

/// Run `script` over the WAV files in `inputs` and write the result to
/// `output`. Returns the number of samples written.
pub fn render_files<P: AsRef<Path>>(
    script: &str,
    inputs: &[P],
    output: impl AsRef<Path>,
    settings: PipelineSettings,
    on_progress: impl FnMut(f32),
) -> Result<usize, Error> {
    let steps = parse(script)?;
    let mut pipeline = Pipeline::from_paths(inputs, settings)?;
    pipeline.run_script(&steps)?;

    let mut sink = FileSink::create(output)?;
    let written = pipeline.render(&mut sink, on_progress)?;
    info!(path = %sink.path().display(), samples = written, "wrote output");
    sink.finish()?;
    Ok(written)
}

/// Run `script` over in-memory WAV files and return the encoded result.
pub fn render_to_vec(script: &str, inputs: Vec<Vec<u8>>) -> Result<Vec<u8>, Error> {
    let steps = parse(script)?;
    let mut pipeline = Pipeline::from_wav_bytes(inputs, PipelineSettings::default())?;
    pipeline.run_script(&steps)?;

    let mut out = Vec::new();
    pipeline.render(&mut out, |_| {})?;
    Ok(out)
}
