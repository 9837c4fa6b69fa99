use async_trait::async_trait;

use crate::error::SourceError;

/// Remote storage holding the CSV files.
#[async_trait]
pub trait FileSourcePort: Send + Sync {
    /// Names of every file the source currently exposes.
    async fn list_files(&self) -> Result<Vec<String>, SourceError>;

    /// Raw CSV text of one file.
    async fn fetch_file(&self, name: &str) -> Result<String, SourceError>;
}
