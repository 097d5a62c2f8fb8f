use std::fmt;
use std::path::PathBuf;

use tracing::trace;

/// Bot configuration read from the optional JSON config file.
///
/// Secrets never live in this file, they are read from the environment
/// (see [`crate::util`]).
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub swis: SwisConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub chart: ChartConfig,
}

/// SolarWinds Information Service query endpoint
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SwisConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Read-only SWQL query returning `NodeID`, `Caption`, `CPULoad` and
    /// `PercentMemoryUsed` columns.
    #[serde(default = "default_query")]
    pub query: String,

    /// Skip TLS certificate validation. Only meant for a local SWIS instance
    /// with a self-signed certificate.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Request timeout in seconds (none by default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for SwisConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            query: default_query(),
            accept_invalid_certs: false,
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    String::from("https://localhost:17774/SolarWinds/InformationService/v3/Json/Query")
}

fn default_query() -> String {
    String::from(
        "SELECT n.NodeID, n.Caption, n.CPULoad, n.PercentMemoryUsed FROM Orion.Nodes n \
         WHERE n.CustomProperties.Ambiente='Produccion'",
    )
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Long polling timeout passed to `getUpdates`
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

fn default_api_url() -> String {
    String::from("https://api.telegram.org")
}

fn default_poll_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ChartConfig {
    /// Directory the chart images are written to (overwritten on every request)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// TrueType font used for titles and labels
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            font_path: default_font_path(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_font_path() -> PathBuf {
    PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf")
}

/// Basic auth credentials for the SWIS endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
