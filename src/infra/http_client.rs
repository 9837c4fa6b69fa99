use crate::app::ports::FileSourcePort;
use crate::config::SourceConfig;
use crate::error::{FilesError, SourceError};
use crate::types::FileList;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use std::time::Duration;

/// `FileSourcePort` over the remote HTTP API, authenticated with a static bearer token.
pub struct ReqwestFileSource {
    client: Client,
    base_url: Url,
    auth_token: String,
}

impl ReqwestFileSource {
    pub fn new(config: &SourceConfig) -> crate::error::Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            FilesError::Config(format!("Invalid base_url '{}': {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(FilesError::Config(format!(
                "base_url '{}' cannot carry a path",
                config.base_url
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token.clone(),
        })
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, url: Url) -> Result<Response, SourceError> {
        tracing::debug!("HTTP GET request to: {}", url);
        let resp = self
            .client
            .get(url.clone())
            .bearer_auth(&self.auth_token)
            .send()
            .await?;
        let status = resp.status();
        tracing::debug!("HTTP response: status={} url={}", status, url);
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl FileSourcePort for ReqwestFileSource {
    async fn list_files(&self) -> Result<Vec<String>, SourceError> {
        let url = self.endpoint(&["files"]);
        let bytes = self.get(url.clone()).await?.bytes().await?;
        let list: FileList = serde_json::from_slice(&bytes).map_err(|e| SourceError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(list.files)
    }

    async fn fetch_file(&self, name: &str) -> Result<String, SourceError> {
        let url = self.endpoint(&["file", name]);
        Ok(self.get(url).await?.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base_url: &str) -> ReqwestFileSource {
        ReqwestFileSource::new(&SourceConfig {
            base_url: base_url.to_string(),
            ..SourceConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoints_extend_base_path() {
        let src = source("https://files.example.com/v1/secret");
        assert_eq!(
            src.endpoint(&["files"]).as_str(),
            "https://files.example.com/v1/secret/files"
        );
        assert_eq!(
            src.endpoint(&["file", "test2.csv"]).as_str(),
            "https://files.example.com/v1/secret/file/test2.csv"
        );
    }

    #[test]
    fn test_trailing_slash_in_base_is_tolerated() {
        let src = source("https://files.example.com/v1/");
        assert_eq!(src.endpoint(&["files"]).as_str(), "https://files.example.com/v1/files");
    }

    #[test]
    fn test_file_name_is_encoded_as_one_segment() {
        let src = source("https://files.example.com");
        assert_eq!(
            src.endpoint(&["file", "a b/c.csv"]).as_str(),
            "https://files.example.com/file/a%20b%2Fc.csv"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let result = ReqwestFileSource::new(&SourceConfig {
            base_url: "not a url".into(),
            ..SourceConfig::default()
        });
        assert!(matches!(result, Err(FilesError::Config(_))));

        let result = ReqwestFileSource::new(&SourceConfig {
            base_url: "mailto:someone@example.com".into(),
            ..SourceConfig::default()
        });
        assert!(matches!(result, Err(FilesError::Config(_))));
    }
}
