use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::auth::Token;
use crate::error::LeadLensError;
use crate::window::DEFAULT_WINDOW_DAYS;

/// Configuration file structure for LeadLens.
///
/// Holds the tracked components, the credentials and endpoints of both data
/// sources, and where charts go. Built once at startup and passed by
/// reference; nothing below the CLI reads the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Buildkite pipeline key to GitHub repository name, in chart order
    #[serde(default)]
    pub components: IndexMap<String, String>,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub buildkite: BuildkiteConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// GitHub personal access token
    pub token: Option<String>,

    /// GitHub API base URL
    #[serde(default = "default_github_base_url")]
    pub base_url: String,

    /// Organization owning the component repositories
    pub org: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildkiteConfig {
    /// Buildkite API access token
    pub token: Option<String>,

    /// Buildkite API base URL
    #[serde(default = "default_buildkite_base_url")]
    pub base_url: String,

    /// Organization slug owning the pipelines
    pub org: Option<String>,

    /// Release branch whose passed builds count as deploys
    #[serde(default = "default_branch")]
    pub branch: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Bucket receiving the rendered charts
    pub bucket: Option<String>,

    /// AWS region of the bucket; the default AWS region chain applies when unset
    pub region: Option<String>,

    /// Endpoint of an S3-compatible service used instead of AWS
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WindowConfig {
    /// Length of the trailing analysis window
    #[serde(default = "default_window_days")]
    pub days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory the charts are rendered into
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,

    /// TrueType font for chart labels
    pub font: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
    Csv,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_github_base_url(),
            org: None,
        }
    }
}

impl Default for BuildkiteConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_buildkite_base_url(),
            org: None,
            branch: default_branch(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            days: default_window_days(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            format: OutputFormat::Summary,
            pretty: false,
            font: None,
        }
    }
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_buildkite_base_url() -> String {
    "https://api.buildkite.com".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".")
}

const CANDIDATES: [&str; 4] = [
    "leadlens.toml",
    "leadlens.json",
    "leadlens.yaml",
    "leadlens.yml",
];

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./leadlens.toml, ./leadlens.json, ./leadlens.yaml, ./leadlens.yml
    /// 3. The same names under the user config directory (`~/.config/leadlens/` on Linux)
    ///
    /// Returns default configuration if no file is found. An explicitly
    /// specified path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let user_dir = dirs::config_dir().map(|dir| dir.join("leadlens"));
        let search_dirs = std::iter::once(PathBuf::from(".")).chain(user_dir);

        for dir in search_dirs {
            for candidate in &CANDIDATES {
                let path = dir.join(candidate);
                if path.exists() {
                    log::debug!("Using config file {}", path.display());
                    return Self::load_from_path(&path);
                }
            }
        }

        // No config file found, return defaults
        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Starter configuration written by `leadlens init`.
    pub fn example() -> Self {
        let mut components = IndexMap::new();
        components.insert("payments-api".to_string(), "payments-api".to_string());
        components.insert("web-frontend".to_string(), "web".to_string());

        Self {
            components,
            github: GitHubConfig {
                org: Some("my-org".to_string()),
                ..GitHubConfig::default()
            },
            buildkite: BuildkiteConfig {
                org: Some("my-org".to_string()),
                ..BuildkiteConfig::default()
            },
            storage: StorageConfig {
                bucket: Some("delivery-metrics".to_string()),
                ..StorageConfig::default()
            },
            ..Self::default()
        }
    }

    /// Checks the settings every run needs, independent of credentials.
    pub fn validate(&self) -> Result<(), LeadLensError> {
        if self.components.is_empty() {
            return Err(LeadLensError::Config(
                "no components configured; add a [components] table".to_string(),
            ));
        }

        if self.window.days == 0 {
            return Err(LeadLensError::Config(
                "window days must be at least 1".to_string(),
            ));
        }

        if self.github.org.as_deref().map_or(true, str::is_empty) {
            return Err(LeadLensError::Config("github org is not set".to_string()));
        }

        if self.buildkite.org.as_deref().map_or(true, str::is_empty) {
            return Err(LeadLensError::Config("buildkite org is not set".to_string()));
        }

        Ok(())
    }

    pub fn github_token(&self) -> Result<Token, LeadLensError> {
        required_token(self.github.token.as_deref(), "GitHub token (GITHUB_TOKEN)")
    }

    pub fn buildkite_token(&self) -> Result<Token, LeadLensError> {
        required_token(
            self.buildkite.token.as_deref(),
            "Buildkite token (BUILDKITE_TOKEN)",
        )
    }

    pub fn bucket(&self) -> Result<&str, LeadLensError> {
        self.storage
            .bucket
            .as_deref()
            .filter(|bucket| !bucket.is_empty())
            .ok_or(LeadLensError::MissingCredential("storage bucket (BUCKET_NAME)"))
    }
}

fn required_token(value: Option<&str>, name: &'static str) -> Result<Token, LeadLensError> {
    value
        .filter(|token| !token.trim().is_empty())
        .map(Token::from)
        .ok_or(LeadLensError::MissingCredential(name))
}
