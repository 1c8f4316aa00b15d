/// File name of the cache database inside the temporary directory
pub const CACHE_FILE_NAME: &str = "cygnus.db";

/// Environment variable overriding the cache database location
pub const CACHE_PATH_ENV: &str = "CYGNUS_CACHE_PATH";

/// Number of attempts made for every upstream call
pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;

/// Number of entries requested from the recent task history listing
pub const DEFAULT_HISTORY_PAGE_SIZE: u32 = 10;

/// Maximum number of task fetches in flight at once
pub const DEFAULT_WORKERS: usize = 16;

/// Capacity of the queue between fetch units and the report renderer
pub const SINK_CAPACITY: usize = 16;

pub const DEFAULT_REQUEST_TIMEOUT: &str = "30s";

/// Window during which a cached request row is reused rather than rewritten
pub const DEFAULT_FRESHNESS_WINDOW: &str = "1s";

/// Placeholder stored for request fields that could not be resolved
pub const UNKNOWN: &str = "UNKNOWN";

/// Environment variables of the built-in preset `-x 1`
pub const PRESET_TASK_HOST_PORT: &[&str] = &["TASK_HOST", "PORT0"];
