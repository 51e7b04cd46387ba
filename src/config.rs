//! Application configuration loaded from environment variables.

use serde::Deserialize;

use crate::error::Result;

/// Application configuration loaded from environment variables.
///
/// Read once at startup and shared read-only with every handler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    // === Server Configuration ===
    /// TCP port the HTTP server binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deployment environment, reported by the root endpoint.
    #[serde(default = "default_environment")]
    pub node_env: String,

    // === Build Metadata ===
    /// Image build timestamp injected by CI.
    #[serde(default = "default_unknown")]
    pub build_time: String,

    /// Commit the image was built from.
    #[serde(default = "default_unknown")]
    pub commit_sha: String,

    /// Branch the image was built from.
    #[serde(default = "default_unknown")]
    pub branch: String,
}

fn default_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_unknown() -> String {
    "unknown".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            node_env: default_environment(),
            build_time: default_unknown(),
            commit_sha: default_unknown(),
            branch: default_unknown(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build configuration from explicit key/value pairs.
    ///
    /// Variables set to an empty string count as unset and fall back to
    /// their defaults.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter(vars.into_iter().filter(|(_, value)| !value.is_empty()))?;
        Ok(config)
    }
}
