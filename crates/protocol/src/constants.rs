use std::time::Duration;

/// Files at or below this size use single-call transfer (2 MiB).
pub const BIG_FILE_SIZE: u64 = 2 * 1024 * 1024;

/// Default chunk size for chunked upload and ranged download (2 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 2 * 1024 * 1024;

/// Default number of concurrent range workers.
pub const DEFAULT_THREADS: usize = 4;

/// Interval between config relay polls.
pub const RELAY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long a config relay consumer polls before giving up.
pub const RELAY_TIMEOUT: Duration = Duration::from_millis(8000);

/// Fallback name for downloads without a usable file name.
pub const DEFAULT_DOWNLOAD_NAME: &str = "download.bin";

/// Fallback MIME type.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Navigation state key carrying a relay config id.
pub const CONFIG_ID_STATE_KEY: &str = "c__configId";
