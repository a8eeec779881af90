//! Configuration types for scratch-dl

use crate::error::{Error, Result};
use crate::types::ProjectId;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Outbound fetch behavior (concurrency cap, timeouts, integrity checks)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum requests admitted to the transport at once (default: 30)
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Per-request timeout (None = wait indefinitely)
    ///
    /// A hung request otherwise holds its slot in the fetch queue forever.
    /// When set, an expired request surfaces as a transport error.
    #[serde(default, with = "optional_duration_serde")]
    pub request_timeout: Option<Duration>,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Check that every fetched asset hashes to its content hash (default: false)
    #[serde(default)]
    pub verify_asset_hashes: bool,

    /// Order in which Scratch 2.0 assets receive their sequential IDs
    #[serde(default)]
    pub legacy_id_order: LegacyIdOrder,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout: None,
            user_agent: default_user_agent(),
            verify_asset_hashes: false,
            legacy_id_order: LegacyIdOrder::default(),
        }
    }
}

/// Order in which legacy sequential asset IDs are handed out
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyIdOrder {
    /// IDs follow fetch completion order (default, matches historical downloads)
    ///
    /// Two runs against the same project can number assets differently.
    #[default]
    Resolved,
    /// IDs follow the order assets are first referenced in the manifest
    Referenced,
}

/// Remote host URL templates
///
/// Project templates contain `{id}`, asset templates contain `{path}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Scratch 1.x / 2.0 project endpoint
    #[serde(default = "default_legacy_project_url")]
    pub legacy_project_url: String,

    /// Scratch 3.0 project endpoint (also used for format detection)
    #[serde(default = "default_project_url")]
    pub project_url: String,

    /// Scratch 2.0 asset endpoint
    #[serde(default = "default_legacy_asset_url")]
    pub legacy_asset_url: String,

    /// Scratch 3.0 asset endpoint
    #[serde(default = "default_asset_url")]
    pub asset_url: String,

    /// Public REST API base (project metadata and listings)
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            legacy_project_url: default_legacy_project_url(),
            project_url: default_project_url(),
            legacy_asset_url: default_legacy_asset_url(),
            asset_url: default_asset_url(),
            api_url: default_api_url(),
        }
    }
}

impl EndpointConfig {
    /// Point every endpoint at one base URL (useful for mirrors and tests)
    ///
    /// Uses the same path layout as the public hosts under `base`.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            legacy_project_url: format!("{base}/internalapi/project/{{id}}/get/"),
            project_url: format!("{base}/projects/{{id}}"),
            legacy_asset_url: format!("{base}/internalapi/asset/{{path}}/get/"),
            asset_url: format!("{base}/assets/{{path}}/get/"),
            api_url: format!("{base}/api"),
        }
    }

    /// URL of a Scratch 1.x / 2.0 project
    pub fn legacy_project(&self, id: ProjectId) -> String {
        self.legacy_project_url.replace("{id}", &id.to_string())
    }

    /// URL of a Scratch 3.0 project manifest
    pub fn project(&self, id: ProjectId) -> String {
        self.project_url.replace("{id}", &id.to_string())
    }

    /// URL of a Scratch 2.0 asset
    pub fn legacy_asset(&self, path: &str) -> String {
        self.legacy_asset_url.replace("{path}", path)
    }

    /// URL of a Scratch 3.0 asset
    pub fn asset(&self, path: &str) -> String {
        self.asset_url.replace("{path}", path)
    }

    /// URL under the REST API base
    pub fn api(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Batch download behavior (output directory, collisions, parallel projects)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory projects are written to (default: "./projects")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// File collision handling
    #[serde(default)]
    pub file_collision: FileCollisionAction,

    /// Maximum projects loaded at once during a batch (default: 4)
    ///
    /// All of their requests still share the fetch queue's cap.
    #[serde(default = "default_max_concurrent_projects")]
    pub max_concurrent_projects: usize,

    /// Name saved files after the project title from the API (default: true)
    ///
    /// When disabled, or when the metadata lookup fails, the project ID is used.
    #[serde(default = "default_true")]
    pub use_project_titles: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            file_collision: FileCollisionAction::default(),
            max_concurrent_projects: default_max_concurrent_projects(),
            use_project_titles: true,
        }
    }
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to filename (default)
    #[default]
    Rename,
    /// Overwrite existing file
    Overwrite,
    /// Skip the file, keep existing
    Skip,
}

/// Retry configuration for whole-project loads
///
/// The fetch queue itself never retries; this drives [`crate::retry::with_retry`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for ProjectDownloader
///
/// Fields are organized into logical sub-configs:
/// - [`fetch`](FetchConfig) - concurrency cap, timeouts, ID ordering
/// - [`endpoints`](EndpointConfig) - remote host URL templates
/// - [`download`](DownloadConfig) - batch output settings
/// - [`retry`](RetryConfig) - caller-side retry policy
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Outbound fetch behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Remote host URL templates
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Batch download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Retry policy for batch loads
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Check the configuration for values the pipeline cannot run with
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_concurrent_requests == 0 {
            return Err(config_error(
                "max_concurrent_requests must be at least 1",
                "max_concurrent_requests",
            ));
        }
        if self.download.max_concurrent_projects == 0 {
            return Err(config_error(
                "max_concurrent_projects must be at least 1",
                "max_concurrent_projects",
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(config_error(
                "backoff_multiplier must be at least 1.0",
                "backoff_multiplier",
            ));
        }

        let templates = [
            ("legacy_project_url", &self.endpoints.legacy_project_url, "{id}"),
            ("project_url", &self.endpoints.project_url, "{id}"),
            ("legacy_asset_url", &self.endpoints.legacy_asset_url, "{path}"),
            ("asset_url", &self.endpoints.asset_url, "{path}"),
        ];
        for (key, template, placeholder) in templates {
            if !template.contains(placeholder) {
                return Err(config_error(
                    format!("{key} must contain the {placeholder} placeholder"),
                    key,
                ));
            }
            let sample = template.replace(placeholder, "0");
            url::Url::parse(&sample)
                .map_err(|e| config_error(format!("{key} is not a valid URL: {e}"), key))?;
        }
        url::Url::parse(&self.endpoints.api_url)
            .map_err(|e| config_error(format!("api_url is not a valid URL: {e}"), "api_url"))?;

        Ok(())
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

fn default_max_concurrent_requests() -> usize {
    30
}

fn default_user_agent() -> String {
    concat!("scratch-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_legacy_project_url() -> String {
    "https://projects.scratch.mit.edu/internalapi/project/{id}/get/".to_string()
}

fn default_project_url() -> String {
    "https://projects.scratch.mit.edu/{id}".to_string()
}

fn default_legacy_asset_url() -> String {
    "https://cdn.assets.scratch.mit.edu/internalapi/asset/{path}/get/".to_string()
}

fn default_asset_url() -> String {
    "https://assets.scratch.mit.edu/internalapi/asset/{path}/get/".to_string()
}

fn default_api_url() -> String {
    "https://api.scratch.mit.edu".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./projects")
}

fn default_max_concurrent_projects() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
