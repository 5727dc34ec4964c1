//! Output sinks for normalized records.

use std::io;
use std::path::PathBuf;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Output destination for normalized records.
///
/// Records are written as newline-delimited JSON.
#[derive(Debug)]
pub enum Output {
    /// Write records to standard output.
    Stdout,

    /// Append records to a file, creating it if needed.
    File(PathBuf),

    /// Send records to a TCP server.
    Tcp(String),

    /// Send records through a channel.
    ///
    /// Use `Output::channel()` to create this variant and get the receiver.
    Channel(mpsc::Sender<String>),
}

impl Output {
    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use breakerwatch::Output;
    ///
    /// let output = Output::file("breakers.ndjson");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a TCP output.
    pub fn tcp(addr: impl Into<String>) -> Self {
        Output::Tcp(addr.into())
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// Records are delivered without the trailing newline. A full channel
    /// blocks the writer, so a slow consumer slows the whole pipeline
    /// rather than losing records.
    ///
    /// ```rust
    /// use breakerwatch::Output;
    ///
    /// let (output, mut rx) = Output::channel(16);
    ///
    /// // Later, receive records
    /// // while let Some(record) = rx.recv().await {
    /// //     println!("{}", record);
    /// // }
    /// ```
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Output::Channel(tx), rx)
    }

    /// Returns a human-readable description of the output.
    pub fn description(&self) -> String {
        match self {
            Output::Stdout => "stdout".to_string(),
            Output::File(path) => format!("file: {}", path.display()),
            Output::Tcp(addr) => format!("tcp: {}", addr),
            Output::Channel(_) => "channel".to_string(),
        }
    }

    /// Open the destination for writing.
    pub async fn open(self) -> io::Result<Sink> {
        let inner = match self {
            Output::Stdout => SinkInner::Writer(writer(tokio::io::stdout())),
            Output::File(path) => {
                let file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .await?;
                SinkInner::Writer(writer(file))
            }
            Output::Tcp(addr) => SinkInner::Writer(writer(TcpStream::connect(addr).await?)),
            Output::Channel(tx) => SinkInner::Channel(tx),
        };
        Ok(Sink { inner })
    }
}

fn writer<W>(w: W) -> BufWriter<Box<dyn AsyncWrite + Send + Unpin>>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    BufWriter::new(Box::new(w))
}

/// An opened output.
pub struct Sink {
    inner: SinkInner,
}

enum SinkInner {
    Writer(BufWriter<Box<dyn AsyncWrite + Send + Unpin>>),
    Channel(mpsc::Sender<String>),
}

impl Sink {
    /// Wrap an already opened writer.
    pub fn from_writer<W>(w: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Sink {
            inner: SinkInner::Writer(writer(w)),
        }
    }

    /// Write one record followed by a newline.
    ///
    /// Writes are buffered until [`Sink::flush`].
    pub async fn write_record(&mut self, record: &str) -> io::Result<()> {
        match &mut self.inner {
            SinkInner::Writer(w) => {
                let mut line = Vec::with_capacity(record.len() + 1);
                line.extend_from_slice(record.as_bytes());
                line.push(b'\n');
                w.write_all(&line).await
            }
            SinkInner::Channel(tx) => tx
                .send(record.to_string())
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "record receiver dropped")),
        }
    }

    /// Push buffered records to the destination.
    pub async fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            SinkInner::Writer(w) => w.flush().await,
            SinkInner::Channel(_) => Ok(()),
        }
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.inner {
            SinkInner::Writer(_) => "writer",
            SinkInner::Channel(_) => "channel",
        };
        f.debug_struct("Sink").field("kind", &kind).finish()
    }
}
