// Async reader and writer over the framing codec.

use std::io;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::codec::{encode_frame, FrameDecoder};
use super::message::{classify, Message};

const READ_CHUNK: usize = 8 * 1024;

/// Parses the inbound byte stream into classified messages.
pub struct MessageReader<R> {
    inner: R,
    decoder: FrameDecoder,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
        }
    }

    /// Next message, or `None` once the stream is closed. Responses
    /// without an id are skipped here.
    pub async fn next_message(&mut self) -> io::Result<Option<Message>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            while let Some(frame) = self.decoder.next_frame() {
                if let Some(message) = classify(&frame) {
                    return Ok(Some(message));
                }
            }
            let read = self.inner.read(&mut chunk).await?;
            if read == 0 {
                return Ok(None);
            }
            self.decoder.push(&chunk[..read]);
        }
    }
}

/// Serializes outbound messages. One writer exists per server, fed from a
/// single queue, so frames never interleave.
pub struct MessageWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn write_message(&mut self, message: &Value) -> io::Result<()> {
        let body = serde_json::to_vec(message)?;
        self.inner.write_all(&encode_frame(&body)).await?;
        self.inner.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::notification;
    use serde_json::json;

    #[tokio::test]
    async fn test_reader_writer_round_trip() {
        let (client, server) = tokio::io::duplex(256);
        let (server_read, _server_write) = tokio::io::split(server);
        let (_client_read, client_write) = tokio::io::split(client);

        let mut writer = MessageWriter::new(client_write);
        let mut reader = MessageReader::new(server_read);

        writer
            .write_message(&notification("initialized", json!({})))
            .await
            .expect("write");
        let message = reader.next_message().await.expect("read").expect("message");
        let Message::Notification { method, .. } = message else {
            panic!("expected a notification");
        };
        assert_eq!(method, "initialized");
    }

    #[tokio::test]
    async fn test_reader_skips_uncorrelated_responses() {
        let (client, server) = tokio::io::duplex(256);
        let (server_read, _sw) = tokio::io::split(server);
        let (_cr, client_write) = tokio::io::split(client);

        let mut writer = MessageWriter::new(client_write);
        writer
            .write_message(&json!({"jsonrpc": "2.0", "result": 1}))
            .await
            .expect("write");
        writer
            .write_message(&notification("exit", json!(null)))
            .await
            .expect("write");

        let mut reader = MessageReader::new(server_read);
        let message = reader.next_message().await.expect("read").expect("message");
        assert!(matches!(message, Message::Notification { ref method, .. } if method == "exit"));
    }
}
