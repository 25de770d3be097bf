use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::FilechunkError;

/// A file that can be uploaded: a name, a length and random access to byte ranges.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Name sent to the server
    fn name(&self) -> &str;

    /// Total length in bytes
    fn size(&self) -> u64;

    /// Bytes `[start, stop)`. Callers never ask past [`FileSource::size`].
    async fn slice(&self, start: u64, stop: u64) -> Result<Bytes, FilechunkError>;
}

fn check_range(start: u64, stop: u64, size: u64) -> Result<(), FilechunkError> {
    if start > stop || stop > size {
        return Err(FilechunkError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("byte range {start}..{stop} outside of file of {size} bytes"),
        )));
    }
    Ok(())
}

/// File contents held in memory
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    data: Bytes,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

#[async_trait]
impl FileSource for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn slice(&self, start: u64, stop: u64) -> Result<Bytes, FilechunkError> {
        check_range(start, stop, self.size())?;
        // Range was checked against a length that came from a usize.
        Ok(self.data.slice(start as usize..stop as usize))
    }
}

/// A file on the local disk, read one chunk at a time
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
    size: u64,
}

impl LocalFile {
    /// Stat `path`; the upload name is its final component.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, FilechunkError> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(FilechunkError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            )));
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path,
            name,
            size: metadata.len(),
        })
    }

    /// Upload under a different name than the one on disk.
    #[must_use]
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileSource for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn slice(&self, start: u64, stop: u64) -> Result<Bytes, FilechunkError> {
        check_range(start, stop, self.size)?;
        let len = usize::try_from(stop - start).map_err(|_| {
            FilechunkError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "chunk does not fit in memory",
            ))
        })?;

        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(start)).await?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}
