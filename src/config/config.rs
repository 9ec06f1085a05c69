use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::api_client::DEFAULT_BASE_URL;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub defaults: SearchDefaults,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Registry host. The `/api/v2/studies` path is appended per request.
    pub base_url: String,

    /// Request timeout in seconds. Absent means no timeout at all: a hung
    /// connection blocks until the transport gives up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    /// Pre-populated value for the condition field (query.cond)
    pub condition: String,

    /// Pre-populated value for the status field (filter.overallStatus)
    pub overall_status: String,

    /// Pre-populated value for the location field (query.locn)
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// How many container levels of the response start expanded
    pub expand_depth: usize,

    /// Show the key hints in the status bar
    pub show_help_hint: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            defaults: SearchDefaults::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for SearchDefaults {
    fn default() -> Self {
        // Illustrative examples only, matching the field placeholders
        Self {
            condition: "lung cancer".to_string(),
            overall_status: "RECRUITING".to_string(),
            location: "Japan".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            expand_depth: 2,
            show_help_hint: true,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            // First run: write the defaults so the file is there to edit
            let default_config = Self::default();
            default_config.save()?;
            return Ok(default_config);
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("trials-cli").join("config.toml"))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# trials-cli Configuration File
# Location: ~/.config/trials-cli/config.toml (Linux/macOS)
#           %APPDATA%\trials-cli\config.toml (Windows)

[api]
# Registry host; /api/v2/studies is appended per request.
# The CTGOV_API_URL environment variable overrides this value.
base_url = "https://clinicaltrials.gov"

# Request timeout in seconds. Commented out = no timeout: a hung
# connection blocks until the transport gives up.
# timeout_secs = 30

[defaults]
# Values the three search fields start with
condition = "lung cancer"
overall_status = "RECRUITING"
location = "Japan"

[display]
# How many container levels of the response start expanded
expand_depth = 2

# Show the key hints in the status bar
show_help_hint = true
"#
        .to_string()
    }
}
