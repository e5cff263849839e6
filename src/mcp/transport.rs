//! Line-delimited message transport.
//!
//! One JSON-RPC message per line. [`LineTransport`] works over any async
//! reader/writer pair; [`StdioTransport`] is that pair bound to stdin/stdout.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

use crate::mcp::error::McpError;

/// Source and sink of raw protocol lines.
#[async_trait]
pub trait McpTransport: Send {
    /// Next non-blank line, without its terminator. `None` once the peer closes.
    async fn receive(&mut self) -> Result<Option<String>, McpError>;

    /// Write one message followed by a newline and flush.
    async fn send(&mut self, message: &str) -> Result<(), McpError>;
}

/// Newline-delimited JSON over a buffered reader and a writer.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

/// Production transport. Nothing else may write to stdout while it is in use.
pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

#[async_trait]
impl<R, W> McpTransport for LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn receive(&mut self) -> Result<Option<String>, McpError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            let message = line.trim();
            if !message.is_empty() {
                return Ok(Some(message.to_string()));
            }
        }
    }

    async fn send(&mut self, message: &str) -> Result<(), McpError> {
        self.writer.write_all(message.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}
