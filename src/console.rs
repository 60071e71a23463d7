use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};

use crate::traits::ChatSink;

/// Terminal chat UI: each outgoing message is one prefixed line, written as
/// fragments arrive.
pub struct ConsoleSink<W> {
    out: W,
    prefix: String,
}

impl ConsoleSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            prefix: "assistant> ".to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_owned();
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ChatSink for ConsoleSink<W> {
    async fn begin(&mut self) -> Result<()> {
        self.out
            .write_all(self.prefix.as_bytes())
            .await
            .context("Failed to write to console")?;
        self.out.flush().await.context("Failed to flush console")
    }

    async fn stream_token(&mut self, token: &str) -> Result<()> {
        self.out
            .write_all(token.as_bytes())
            .await
            .context("Failed to write to console")?;
        self.out.flush().await.context("Failed to flush console")
    }

    async fn finish(&mut self) -> Result<()> {
        self.out
            .write_all(b"\n")
            .await
            .context("Failed to write to console")?;
        self.out.flush().await.context("Failed to flush console")
    }
}
