//! Byte stream over a file on disk.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::traits::{Stream, StreamBox};
use crate::error::Error;

/// Reads a file lazily: the handle is opened on the first read, so building
/// or cloning a `FileStream` never touches the filesystem. A clone reopens
/// the file and seeks to the byte offset it was cloned at.
#[derive(Debug)]
pub struct FileStream {
    path: PathBuf,
    pos: u64,
    file: Option<File>,
    ended: bool,
}

impl FileStream {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStream {
            path: path.into(),
            pos: 0,
            file: None,
            ended: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.pos
    }

    fn io_error(&self, source: io::Error) -> Error {
        Error::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn open(&self) -> Result<File, Error> {
        let mut file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        if self.pos != 0 {
            file.seek(SeekFrom::Start(self.pos))
                .map_err(|e| self.io_error(e))?;
        }
        Ok(file)
    }
}

impl Clone for FileStream {
    fn clone(&self) -> Self {
        FileStream {
            path: self.path.clone(),
            pos: self.pos,
            file: None,
            ended: self.ended,
        }
    }
}

impl Stream<u8> for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Error> {
        if self.ended {
            return Ok(None);
        }
        if buf.is_empty() {
            return Ok(Some(0));
        }
        if self.file.is_none() {
            self.file = Some(self.open()?);
        }
        let Some(file) = self.file.as_mut() else {
            return Ok(None);
        };

        let n = loop {
            match file.read(buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.io_error(e)),
            }
        };

        if n == 0 {
            self.ended = true;
            return Ok(None);
        }
        self.pos += n as u64;
        Ok(Some(n))
    }

    fn box_clone(&self) -> StreamBox<u8> {
        StreamBox::new(self.clone())
    }
}
