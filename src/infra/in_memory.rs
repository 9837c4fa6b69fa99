use crate::app::ports::FileSourcePort;
use crate::error::SourceError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// In-memory file source for development/testing
#[derive(Clone, Default)]
pub struct InMemoryFileSource {
    listing: Option<Vec<String>>,
    contents: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    fetch_log: Arc<Mutex<Vec<String>>>,
}

impl InMemoryFileSource {
    /// A source listing `files`, none of which has content yet.
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            listing: Some(files.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// A source whose list endpoint always fails.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.contents.insert(name.into(), content.into());
        self
    }

    /// Delay the content response of `name`, to shuffle completion order.
    pub fn with_delay(mut self, name: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(name.into(), delay);
        self
    }

    /// Names passed to `fetch_file`, in call order.
    pub fn fetch_log(&self) -> Vec<String> {
        self.fetch_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl FileSourcePort for InMemoryFileSource {
    async fn list_files(&self) -> Result<Vec<String>, SourceError> {
        self.listing.clone().ok_or_else(|| SourceError::Status {
            status: 503,
            url: "memory://files".to_string(),
        })
    }

    async fn fetch_file(&self, name: &str) -> Result<String, SourceError> {
        if let Ok(mut log) = self.fetch_log.lock() {
            log.push(name.to_string());
        }
        if let Some(delay) = self.delays.get(name) {
            tokio::time::sleep(*delay).await;
        }
        debug!("Serving in-memory file {}", name);
        self.contents.get(name).cloned().ok_or_else(|| SourceError::Status {
            status: 404,
            url: format!("memory://file/{}", name),
        })
    }
}
