use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Host placeholder used when a message arrives without any container metadata.
pub const UNKNOWN_HOST: &str = "???";

/// Identity of the container that produced a line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMetadata {
    pub hostname: String,
    pub container_id: String,
    pub container_name: String,
    pub image: String,
}

/// One unparsed line from the producer.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub data: Bytes,
    pub time: DateTime<Utc>,
    pub source: Option<SourceMetadata>,
}

impl RawMessage {
    pub fn new(data: impl Into<Bytes>, time: DateTime<Utc>) -> Self {
        Self {
            data: data.into(),
            time,
            source: None,
        }
    }

    pub fn with_source(mut self, source: SourceMetadata) -> Self {
        self.source = Some(source);
        self
    }

    /// Host name of the producing container, or [`UNKNOWN_HOST`].
    pub fn host(&self) -> &str {
        self.source
            .as_ref()
            .map_or(UNKNOWN_HOST, |s| s.hostname.as_str())
    }

    pub fn image(&self) -> &str {
        self.source.as_ref().map_or("", |s| s.image.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}
