//! Streamed text responses.

use super::decoder::Utf8Decoder;
use crate::error::{Error, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

type ByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send>>;

/// Decoded text fragments of a chunked response body.
///
/// Yields one fragment per transport chunk, in arrival order. Chunks that
/// decode to nothing (the head of a split multi-byte character) are skipped,
/// so every item is non-empty. The stream is single-pass: after it returns
/// `None` or an error it stays exhausted.
pub struct TextStream {
    inner: ByteStream,
    /// `None` once the stream has finished or failed.
    decoder: Option<Utf8Decoder>,
}

impl TextStream {
    /// Wrap a raw byte stream, such as `reqwest::Response::bytes_stream()`.
    pub fn new<S>(bytes: S) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + 'static,
    {
        Self {
            inner: Box::pin(bytes),
            decoder: Some(Utf8Decoder::new()),
        }
    }

    /// Drive the stream to completion, handing each fragment to `sink`.
    ///
    /// The sink runs inline between reads. When `cancel` fires, reading stops,
    /// the response is dropped and `Error::Cancelled` is returned; no fragment
    /// is delivered after that point.
    pub async fn for_each_chunk<F>(
        mut self,
        mut sink: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<()>
    where
        F: FnMut(&str),
    {
        loop {
            let next = match cancel {
                Some(token) => tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        tracing::debug!("Stream cancelled");
                        return Err(Error::Cancelled);
                    }
                    next = self.next() => next,
                },
                None => self.next().await,
            };

            match next {
                Some(Ok(chunk)) => sink(&chunk),
                Some(Err(e)) => return Err(e),
                None => return Ok(()),
            }
        }
    }

    /// Read the whole stream into one string.
    pub async fn collect_text(self) -> Result<String> {
        let mut out = String::new();
        self.for_each_chunk(|chunk| out.push_str(chunk), None)
            .await?;
        Ok(out)
    }

    /// Check if the stream has finished, successfully or not.
    pub fn is_done(&self) -> bool {
        self.decoder.is_none()
    }
}

impl Stream for TextStream {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            let Some(decoder) = this.decoder.as_mut() else {
                return Poll::Ready(None);
            };

            match this.inner.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(bytes))) => {
                    tracing::trace!(len = bytes.len(), "Received chunk");
                    let text = decoder.decode(&bytes);
                    if !text.is_empty() {
                        return Poll::Ready(Some(Ok(text)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    this.decoder = None;
                    return Poll::Ready(Some(Err(Error::Network(e))));
                }
                Poll::Ready(None) => {
                    let tail = this
                        .decoder
                        .take()
                        .map(Utf8Decoder::finish)
                        .unwrap_or_default();
                    if tail.is_empty() {
                        return Poll::Ready(None);
                    }
                    return Poll::Ready(Some(Ok(tail)));
                }
            }
        }
    }
}

impl std::fmt::Debug for TextStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextStream")
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}
