use crate::error::{ErrorContext, PhotoTrailsError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_MAX_BATCH_BYTES: u64 = 40 * 1024 * 1024;
pub const DEFAULT_MAX_FILES_PER_BATCH: usize = 16;
pub const DEFAULT_CLEAR_ENDPOINT: &str = "/clear";
pub const DEFAULT_GEO_PAGE_SIZE: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BASE_DELAY_SECS: u64 = 2;
pub const DEFAULT_PROGRESS_RESET_DELAY_MS: u64 = 1500;

pub const UPLOAD_ENDPOINT: &str = "/upload";
pub const PHOTOS_ENDPOINT: &str = "/photos";
pub const UPLOAD_FIELD_NAME: &str = "photos";

const ENV_SERVER_URL: &str = "PHOTOTRAILS_SERVER_URL";
const ENV_MAX_BATCH_BYTES: &str = "PHOTOTRAILS_MAX_BATCH_BYTES";
const ENV_MAX_FILES_PER_BATCH: &str = "PHOTOTRAILS_MAX_FILES_PER_BATCH";
const ENV_CLEAR_ENDPOINT: &str = "PHOTOTRAILS_CLEAR_ENDPOINT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub server_url: String,
    pub max_batch_bytes: u64,
    pub max_files_per_batch: usize,
    pub clear_endpoint: String,
    pub geo_page_size: u64,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_secs: u64,
    pub progress_reset_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            max_files_per_batch: DEFAULT_MAX_FILES_PER_BATCH,
            clear_endpoint: DEFAULT_CLEAR_ENDPOINT.to_string(),
            geo_page_size: DEFAULT_GEO_PAGE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_secs: DEFAULT_RETRY_BASE_DELAY_SECS,
            progress_reset_delay_ms: DEFAULT_PROGRESS_RESET_DELAY_MS,
        }
    }
}

impl ClientConfig {
    /// Resolve an endpoint against `server_url`. Absolute URLs pass through.
    pub fn endpoint(&self, path: &str) -> Result<Url, PhotoTrailsError> {
        if let Ok(absolute) = Url::parse(path) {
            return Ok(absolute);
        }

        let base = Url::parse(&self.server_url)
            .map_err(|e| PhotoTrailsError::Config(format!("invalid server URL '{}': {}", self.server_url, e)))?;
        base.join(path)
            .map_err(|e| PhotoTrailsError::Config(format!("invalid endpoint '{}': {}", path, e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn progress_reset_delay(&self) -> Duration {
        Duration::from_millis(self.progress_reset_delay_ms)
    }

    pub fn validate(&self) -> Result<(), PhotoTrailsError> {
        if self.max_batch_bytes == 0 {
            return Err(PhotoTrailsError::Config("maxBatchBytes must be at least 1".to_string()));
        }
        if self.max_files_per_batch == 0 {
            return Err(PhotoTrailsError::Config(
                "maxFilesPerBatch must be at least 1".to_string(),
            ));
        }
        if self.geo_page_size == 0 {
            return Err(PhotoTrailsError::Config("geoPageSize must be at least 1".to_string()));
        }
        Url::parse(&self.server_url).map_err(|e| {
            PhotoTrailsError::Config(format!("invalid server URL '{}': {}", self.server_url, e))
        })?;
        Ok(())
    }

    /// Apply environment-style overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), PhotoTrailsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SERVER_URL) {
            self.server_url = url;
        }
        if let Some(raw) = lookup(ENV_MAX_BATCH_BYTES) {
            self.max_batch_bytes = parse_number(&raw).context(ENV_MAX_BATCH_BYTES)?;
        }
        if let Some(raw) = lookup(ENV_MAX_FILES_PER_BATCH) {
            self.max_files_per_batch = parse_number(&raw).context(ENV_MAX_FILES_PER_BATCH)?;
        }
        if let Some(endpoint) = lookup(ENV_CLEAR_ENDPOINT) {
            self.clear_endpoint = endpoint;
        }
        Ok(())
    }
}

fn parse_number<N: std::str::FromStr>(raw: &str) -> Result<N, PhotoTrailsError> {
    raw.trim()
        .parse::<N>()
        .map_err(|_| PhotoTrailsError::Config(format!("'{}' is not a valid number", raw)))
}

pub fn get_config_dir() -> Result<PathBuf, PhotoTrailsError> {
    dirs::home_dir()
        .map(|home_dir| home_dir.join(".phototrails"))
        .ok_or_else(|| PhotoTrailsError::Config("Could not find home directory".to_string()))
}

pub fn get_config_file_path() -> Result<PathBuf, PhotoTrailsError> {
    Ok(get_config_dir()?.join("config.json"))
}

pub fn get_logs_dir() -> Result<PathBuf, PhotoTrailsError> {
    Ok(get_config_dir()?.join("logs"))
}

pub fn ensure_dir(dir: &Path) -> Result<(), PhotoTrailsError> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;

        // Set permissions to 700 (read/write/execute for owner only) on Unix systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = fs::metadata(dir)?.permissions();
            permissions.set_mode(0o700);
            fs::set_permissions(dir, permissions)?;
        }
    }
    Ok(())
}

/// Load `~/.phototrails/config.json` and apply `PHOTOTRAILS_*` overrides.
pub fn load_config() -> Result<ClientConfig, PhotoTrailsError> {
    let mut config = load_config_from(&get_config_file_path()?)?;
    config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Load a config file; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<ClientConfig, PhotoTrailsError> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config: ClientConfig = serde_json::from_str(&content)
        .map_err(|e| PhotoTrailsError::Config(format!("{}: {}", path.display(), e)))?;
    Ok(config)
}

pub fn save_config_to(path: &Path, config: &ClientConfig) -> Result<(), PhotoTrailsError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)?;

    // Set permissions to 600 (read/write for owner only) on Unix systems
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(path, permissions)?;
    }

    Ok(())
}
