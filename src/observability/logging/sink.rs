//! Log sink: the single destination the writer task owns.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, BufWriter};

use super::LogError;

/// Where a [`Sink`] writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkKind {
    /// Appending to a file.
    File(PathBuf),
    /// Process stdout, used when the file cannot be opened.
    Stdout,
    /// A caller-supplied writer.
    Writer,
}

/// A writable destination for rendered log lines.
pub struct Sink {
    kind: SinkKind,
    pub(crate) writer: Box<dyn AsyncWrite + Send + Unpin>,
}

impl Sink {
    /// Open `path` for append, creating the file if needed.
    ///
    /// The parent directory is not created.
    pub async fn open(path: &Path) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|source| LogError::SinkUnavailable {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            kind: SinkKind::File(path.to_path_buf()),
            writer: Box::new(BufWriter::new(file)),
        })
    }

    /// The fallback sink.
    pub fn stdout() -> Self {
        Self {
            kind: SinkKind::Stdout,
            writer: Box::new(BufWriter::new(tokio::io::stdout())),
        }
    }

    /// Wrap any async writer. Writes are not buffered.
    pub fn from_writer<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            kind: SinkKind::Writer,
            writer: Box::new(writer),
        }
    }

    pub fn kind(&self) -> &SinkKind {
        &self.kind
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").field("kind", &self.kind).finish()
    }
}
