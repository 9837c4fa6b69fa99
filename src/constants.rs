/// Defaults for the remote file source and the HTTP surface

pub const DEFAULT_BASE_URL: &str = "https://echo-serv.tbxnet.com/v1/secret";
pub const DEFAULT_AUTH_TOKEN: &str = "aSuperSecretKey";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

// Environment overrides
pub const ENV_BASE_URL: &str = "FILES_API_URL";
pub const ENV_AUTH_TOKEN: &str = "FILES_API_TOKEN";
pub const ENV_TIMEOUT_SECONDS: &str = "FILES_API_TIMEOUT_SECONDS";
pub const ENV_MAX_CONCURRENCY: &str = "FILES_API_MAX_CONCURRENCY";
pub const ENV_PORT: &str = "PORT";

/// Width of a valid `hex` column value
pub const HEX_LENGTH: usize = 32;

// Error envelope
pub const ERROR_CODE: &str = "SYS-ERR";
pub const MSG_NOT_FOUND: &str = "Not Found";
pub const MSG_INTERNAL: &str = "Internal Server Error";
pub const MSG_UNAVAILABLE: &str = "Service Unavailable";
pub const MSG_LIST_FAILED: &str = "Error fetching file list";
pub const DETAIL_FILE_NOT_FOUND: &str = "File not found";
pub const DETAIL_LIST_FAILED: &str = "Error fetching files";
