//! WAV renderer: drains a sample stream into a mono 16-bit PCM WAV file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Error;
use crate::stream::wav::output_header;
use crate::stream::{Sample, Stream};

/// Destination for encoded bytes.
pub trait OutputSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error>;
}

impl OutputSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Buffered file output. Call [`FileSink::finish`] to flush and surface any
/// late write error; dropping the sink flushes silently.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        Ok(FileSink {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn finish(mut self) -> Result<(), Error> {
        self.writer.flush().map_err(Error::Output)
    }
}

impl OutputSink for FileSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.writer.write_all(bytes).map_err(Error::Output)
    }
}

/// Encode everything `stream` yields, `chunk_size` samples at a time.
///
/// The header's size fields are left at zero. Samples are converted with a
/// saturating truncation toward zero. After each chunk `on_progress` receives
/// `emitted / length`, capped at 1.0; it is never called when the length is
/// unknown or zero. Returns the number of samples written.
pub fn render_wav<S, O>(
    stream: &mut S,
    sink: &mut O,
    chunk_size: usize,
    mut on_progress: impl FnMut(f32),
) -> Result<usize, Error>
where
    S: Stream<Sample> + ?Sized,
    O: OutputSink + ?Sized,
{
    sink.write(&output_header())?;

    let total = stream.length().filter(|&n| n > 0);
    let mut samples = vec![0.0; chunk_size.max(1)];
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    let mut emitted = 0;

    loop {
        let read = stream.read_full(&mut samples)?;

        bytes.clear();
        for &s in &samples[..read] {
            bytes.extend_from_slice(&(s as i16).to_le_bytes());
        }
        sink.write(&bytes)?;
        emitted += read;

        if let Some(total) = total {
            // transforms may emit a little past their reported length
            on_progress((emitted as f32 / total as f32).min(1.0));
        }
        if read < samples.len() {
            break;
        }
    }

    info!(samples = emitted, "render complete");
    Ok(emitted)
}
