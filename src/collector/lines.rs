use crate::domain::{RawMessage, SourceMetadata};
use bytes::Bytes;
use chrono::Utc;
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

pub type LineReader = Box<dyn AsyncBufRead + Send + Unpin>;

/// Opens `path`, or stdin when there is none.
pub async fn open_input(path: Option<&Path>) -> Result<LineReader, CollectorError> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

/// Splits a byte stream into one [`RawMessage`] per line.
#[derive(Debug, Clone, Default)]
pub struct LineCollector {
    source: Option<SourceMetadata>,
}

impl LineCollector {
    pub fn new(source: Option<SourceMetadata>) -> Self {
        Self { source }
    }

    /// Reads until end of input or until the receiver goes away and returns
    /// the number of messages sent. Blank lines are skipped.
    pub async fn run<R>(
        &self,
        mut reader: R,
        tx: mpsc::Sender<RawMessage>,
    ) -> Result<u64, CollectorError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut sent = 0;
        let mut buf = Vec::with_capacity(4096);

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let line = trim_line_end(&buf);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let mut msg = RawMessage::new(Bytes::copy_from_slice(line), Utc::now());
            if let Some(source) = &self.source {
                msg = msg.with_source(source.clone());
            }

            if tx.send(msg).await.is_err() {
                debug!("Receiver dropped, stopping collector");
                break;
            }
            sent += 1;
        }

        Ok(sent)
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collects_lines_in_order() {
        let input: &[u8] = b"first\r\nsecond\n\n   \nthird";
        let (tx, mut rx) = mpsc::channel(16);

        let sent = LineCollector::default().run(input, tx).await.unwrap();
        assert_eq!(sent, 3);

        let mut lines = Vec::new();
        while let Some(msg) = rx.recv().await {
            assert!(msg.source.is_none());
            lines.push(msg.text());
        }
        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_attaches_source_metadata() {
        let source = SourceMetadata {
            hostname: "web-1".to_string(),
            ..Default::default()
        };
        let (tx, mut rx) = mpsc::channel(4);

        LineCollector::new(Some(source.clone()))
            .run(&b"hello\n"[..], tx)
            .await
            .unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.source, Some(source));
    }

    #[tokio::test]
    async fn test_stops_when_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sent = LineCollector::default()
            .run(&b"a\nb\n"[..], tx)
            .await
            .unwrap();
        assert_eq!(sent, 0);
    }
}
