use thiserror::Error;

/// Failures raised while talking to the remote file source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Remote source answered {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

#[derive(Error, Debug)]
pub enum FilesError {
    #[error("File list unavailable: {0}")]
    ListUnavailable(#[source] SourceError),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FilesError>;
