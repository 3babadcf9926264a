//! Configuration management for LocalChat
//!
//! This module handles loading, parsing, validating, and saving
//! configuration from YAML files, environment variables, and CLI overrides.

use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for LocalChat
///
/// Every section carries serde defaults, so a partial YAML file (or no file
/// at all) still produces a usable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Inference server connection settings
    #[serde(default)]
    pub inference: InferenceConfig,
    /// Tool-calling agent behavior
    #[serde(default)]
    pub agent: AgentConfig,
    /// Stream relay batching
    #[serde(default)]
    pub stream: StreamConfig,
    /// Session naming
    #[serde(default)]
    pub session: SessionConfig,
    /// Chat history database
    #[serde(default)]
    pub storage: StorageConfig,
    /// MCP tool servers
    #[serde(default)]
    pub mcp: McpConfig,
}

/// Inference server configuration
///
/// The chat endpoint is `{base_url}/v1/chat/completions` and the health
/// endpoint is `{base_url}/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the llama-server compatible inference server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Maximum tokens to predict; -1 means unbounded
    #[serde(default = "default_n_predict")]
    pub n_predict: i64,

    /// Whether the server should prepend a BOS token
    #[serde(default)]
    pub add_bos: bool,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_n_predict() -> i64 {
    -1
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            n_predict: default_n_predict(),
            add_bos: false,
        }
    }
}

/// Tool-calling agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of dispatch iterations before the loop gives up
    #[serde(default = "default_tool_call_iterations")]
    pub tool_call_iterations: usize,

    /// Per-tool cooldown in seconds; 0 disables the cooldown
    #[serde(default)]
    pub tool_call_cooldown: u64,

    /// Number of trailing history messages kept by the pruning window
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Inject tool results with the `user` role instead of `tool`
    ///
    /// Many local chat templates reject the `tool` role, so this defaults
    /// to `true`.
    #[serde(default = "default_tool_results_as_user")]
    pub tool_results_as_user: bool,
}

fn default_tool_call_iterations() -> usize {
    5
}

fn default_history_window() -> usize {
    8
}

fn default_tool_results_as_user() -> bool {
    true
}

impl AgentConfig {
    /// Cooldown window as a `Duration`
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.tool_call_cooldown)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tool_call_iterations: default_tool_call_iterations(),
            tool_call_cooldown: 0,
            history_window: default_history_window(),
            tool_results_as_user: default_tool_results_as_user(),
        }
    }
}

/// Stream relay batching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Timer flush interval in milliseconds
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,

    /// Buffered characters that trigger an immediate flush
    #[serde(default = "default_max_batch_chars")]
    pub max_batch_chars: usize,
}

fn default_batch_interval_ms() -> u64 {
    50
}

fn default_max_batch_chars() -> usize {
    80
}

impl StreamConfig {
    /// Timer flush interval as a `Duration`
    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            batch_interval_ms: default_batch_interval_ms(),
            max_batch_chars: default_max_batch_chars(),
        }
    }
}

/// Session naming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum characters of a derived session name
    #[serde(default = "default_name_max_chars")]
    pub name_max_chars: usize,
}

fn default_name_max_chars() -> usize {
    20
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name_max_chars: default_name_max_chars(),
        }
    }
}

/// Chat history database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Explicit database path; the platform data directory is used when unset
    #[serde(default)]
    pub database_path: Option<String>,
}

/// MCP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Timeout applied to every MCP request, in seconds
    #[serde(default = "default_mcp_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Configured stdio servers keyed by server name
    #[serde(default)]
    pub servers: BTreeMap<String, McpServerConfig>,
}

fn default_mcp_request_timeout() -> u64 {
    30
}

impl McpConfig {
    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_mcp_request_timeout(),
            servers: BTreeMap::new(),
        }
    }
}

/// A single stdio MCP server
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct McpServerConfig {
    /// Executable to spawn
    pub command: String,

    /// Arguments passed to the executable
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables for the child process
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Human-readable description shown in listings
    #[serde(default)]
    pub description: String,

    /// Connect this server when an interactive session starts
    #[serde(default)]
    pub auto_connect: bool,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ChatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    /// Write the configuration back to disk as YAML
    ///
    /// Parent directories are created when missing.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be serialized or written
    pub fn save(&self, path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_yaml::to_string(self)?;
        std::fs::write(path, contents)
            .map_err(|e| ChatError::Config(format!("Failed to write config file: {}", e)))?;
        tracing::info!("Saved configuration to {}", path);
        Ok(())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("LOCALCHAT_BASE_URL") {
            self.inference.base_url = base_url;
        }

        if let Ok(iterations) = std::env::var("LOCALCHAT_TOOL_CALL_ITERATIONS") {
            if let Ok(value) = iterations.parse() {
                self.agent.tool_call_iterations = value;
            } else {
                tracing::warn!("Invalid LOCALCHAT_TOOL_CALL_ITERATIONS: {}", iterations);
            }
        }

        if let Ok(cooldown) = std::env::var("LOCALCHAT_TOOL_CALL_COOLDOWN") {
            if let Ok(value) = cooldown.parse() {
                self.agent.tool_call_cooldown = value;
            } else {
                tracing::warn!("Invalid LOCALCHAT_TOOL_CALL_COOLDOWN: {}", cooldown);
            }
        }

        if let Ok(db_path) = std::env::var("LOCALCHAT_HISTORY_DB") {
            self.storage.database_path = Some(db_path);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(db_path) = &cli.storage_path {
            tracing::debug!("Using storage DB override from CLI: {}", db_path);
            self.storage.database_path = Some(db_path.clone());
        }
        if let Some(base_url) = &cli.base_url {
            self.inference.base_url = base_url.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any value is outside its accepted range
    pub fn validate(&self) -> Result<()> {
        if self.inference.base_url.trim().is_empty() {
            return Err(ChatError::Config("inference.base_url cannot be empty".to_string()).into());
        }

        if self.agent.tool_call_iterations == 0 {
            return Err(ChatError::Config(
                "agent.tool_call_iterations must be greater than 0".to_string(),
            )
            .into());
        }

        if self.agent.history_window == 0 {
            return Err(ChatError::Config(
                "agent.history_window must be greater than 0".to_string(),
            )
            .into());
        }

        if self.stream.batch_interval_ms == 0 {
            return Err(ChatError::Config(
                "stream.batch_interval_ms must be greater than 0".to_string(),
            )
            .into());
        }

        if self.stream.max_batch_chars == 0 {
            return Err(ChatError::Config(
                "stream.max_batch_chars must be greater than 0".to_string(),
            )
            .into());
        }

        if self.session.name_max_chars == 0 {
            return Err(ChatError::Config(
                "session.name_max_chars must be greater than 0".to_string(),
            )
            .into());
        }

        for (name, server) in &self.mcp.servers {
            if server.command.trim().is_empty() {
                return Err(ChatError::Config(format!(
                    "mcp.servers.{}.command cannot be empty",
                    name
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn test_cli() -> crate::cli::Cli {
        crate::cli::Cli {
            config: None,
            verbose: false,
            json_logs: false,
            storage_path: None,
            base_url: None,
            command: crate::cli::Commands::Health,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.inference.base_url, "http://localhost:8080");
        assert_eq!(config.inference.n_predict, -1);
        assert!(!config.inference.add_bos);
        assert_eq!(config.agent.tool_call_iterations, 5);
        assert_eq!(config.agent.tool_call_cooldown, 0);
        assert_eq!(config.agent.history_window, 8);
        assert!(config.agent.tool_results_as_user);
        assert_eq!(config.stream.batch_interval(), Duration::from_millis(50));
        assert_eq!(config.stream.max_batch_chars, 80);
        assert_eq!(config.session.name_max_chars, 20);
        assert!(config.mcp.servers.is_empty());
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_iterations() {
        let mut config = Config::default();
        config.agent.tool_call_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_history_window() {
        let mut config = Config::default();
        config.agent.history_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_batch_settings() {
        let mut config = Config::default();
        config.stream.max_batch_chars = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.stream.batch_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_server_command() {
        let mut config = Config::default();
        config
            .mcp
            .servers
            .insert("broken".to_string(), McpServerConfig::default());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mcp.servers.broken.command"));
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
inference:
  base_url: "http://127.0.0.1:9000"
agent:
  tool_call_iterations: 3
  tool_call_cooldown: 10
stream:
  max_batch_chars: 40
mcp:
  servers:
    weather:
      command: "weather-mcp"
      args: ["--stdio"]
      env:
        API_KEY: "abc"
      description: "Weather lookups"
      auto_connect: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.inference.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.inference.n_predict, -1);
        assert_eq!(config.agent.tool_call_iterations, 3);
        assert_eq!(config.agent.cooldown(), Duration::from_secs(10));
        assert_eq!(config.agent.history_window, 8);
        assert_eq!(config.stream.max_batch_chars, 40);
        assert_eq!(config.stream.batch_interval_ms, 50);

        let weather = &config.mcp.servers["weather"];
        assert_eq!(weather.command, "weather-mcp");
        assert_eq!(weather.args, vec!["--stdio"]);
        assert_eq!(weather.env["API_KEY"], "abc");
        assert!(weather.auto_connect);
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let config = Config::load("nonexistent.yaml", &test_cli()).unwrap();
        assert_eq!(config.agent.tool_call_iterations, 5);
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides_agent_fields() {
        std::env::set_var("LOCALCHAT_TOOL_CALL_ITERATIONS", "9");
        std::env::set_var("LOCALCHAT_TOOL_CALL_COOLDOWN", "not-a-number");
        std::env::set_var("LOCALCHAT_BASE_URL", "http://gpu-box:8080");

        let config = Config::load("nonexistent.yaml", &test_cli()).unwrap();

        std::env::remove_var("LOCALCHAT_TOOL_CALL_ITERATIONS");
        std::env::remove_var("LOCALCHAT_TOOL_CALL_COOLDOWN");
        std::env::remove_var("LOCALCHAT_BASE_URL");

        assert_eq!(config.agent.tool_call_iterations, 9);
        assert_eq!(config.agent.tool_call_cooldown, 0);
        assert_eq!(config.inference.base_url, "http://gpu-box:8080");
    }

    #[test]
    #[serial]
    fn test_cli_storage_path_overrides_config() {
        let mut cli = test_cli();
        cli.storage_path = Some("/tmp/localchat-test.db".to_string());
        let config = Config::load("nonexistent.yaml", &cli).unwrap();
        assert_eq!(
            config.storage.database_path.as_deref(),
            Some("/tmp/localchat-test.db")
        );
    }

    #[test]
    fn test_save_then_load_preserves_servers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let path = path.to_string_lossy().to_string();

        let mut config = Config::default();
        config.agent.tool_call_cooldown = 4;
        config.mcp.servers.insert(
            "files".to_string(),
            McpServerConfig {
                command: "fs-mcp".to_string(),
                description: "Filesystem".to_string(),
                ..Default::default()
            },
        );
        config.save(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.agent.tool_call_cooldown, 4);
        assert_eq!(reloaded.mcp.servers["files"], config.mcp.servers["files"]);
    }
}
