//! Byte sources: sized, named, offset-readable inputs for hashing.
//!
//! A worker owns its source for the duration of a task, so implementations
//! only need `Send`. Reads are blocking; hashing runs on worker threads,
//! never on the manager's control loop.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// A readable byte input with a known total size and a display name.
///
/// `read_at` fills `buf` starting at `offset` and returns the number of
/// bytes read (0 only at end of source). Short reads before the end are
/// allowed; callers loop. The source must not change while a task using it
/// is in flight.
pub trait ByteSource: Send {
    fn size(&self) -> u64;
    fn name(&self) -> &str;
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

/// File-backed source. Size is captured at open time.
pub struct FileSource {
    file: File,
    size: u64,
    name: String,
}

impl FileSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { file, size, name })
    }
}

impl ByteSource for FileSource {
    fn size(&self) -> u64 {
        self.size
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read(buf)
    }
}

/// In-memory source, for tests and small payloads.
pub struct BytesSource {
    name: String,
    data: Vec<u8>,
}

impl BytesSource {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

impl ByteSource for BytesSource {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.data.len() as u64;
        if offset >= len {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }
}
