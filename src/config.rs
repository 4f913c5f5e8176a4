use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};

use crate::providers::openrouter::DEFAULT_BASE_URL;
use crate::task::TaskKind;

/// Main configuration structure for ai_task_assistant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Completion endpoint configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// UI display configuration
    #[serde(default)]
    pub ui: UIConfig,

    /// Task preselected in interactive mode
    #[serde(default)]
    pub default_task: Option<TaskKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the chat-completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Terminal,
    Plain,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIConfig {
    /// Enable colorful output
    #[serde(default = "default_colorful")]
    pub colorful: bool,

    /// Show a spinner while waiting for the provider
    #[serde(default = "default_spinner")]
    pub spinner: bool,

    /// Output format ("terminal", "plain", "json")
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,
}

// Default value functions
fn default_base_url() -> String { DEFAULT_BASE_URL.to_string() }
fn default_api_key_env() -> String { "OPENROUTER_API_KEY".to_string() }
fn default_colorful() -> bool { true }
fn default_spinner() -> bool { true }
fn default_output_format() -> OutputFormat { OutputFormat::Terminal }

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        UIConfig {
            colorful: default_colorful(),
            spinner: default_spinner(),
            output_format: default_output_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Load configuration from command line argument or default locations
    pub fn load(config_path: &Option<String>) -> Result<Self> {
        if let Some(path) = config_path {
            let expanded_path = shellexpand::tilde(path);
            return Self::from_file(expanded_path.as_ref());
        }

        let default_paths = [
            "ai_task_assistant.toml",
            ".ai_task_assistant.toml",
            "~/.config/ai_task_assistant/config.toml",
        ];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                match Self::from_file(expanded_path.as_ref()) {
                    Ok(config) => return Ok(config),
                    Err(e) => log::warn!("Failed to load config from {}: {:#}", path, e),
                }
            }
        }

        Ok(Self::default())
    }

    /// API key from the configured environment variable, if set and non-blank.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.provider.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Merge with command-line arguments (CLI args take precedence)
    pub fn merge_with_args(&mut self, headless: bool, output: Option<OutputFormat>) {
        if headless {
            self.ui.colorful = false;
            self.ui.spinner = false;
            if self.ui.output_format == OutputFormat::Terminal {
                self.ui.output_format = OutputFormat::Plain;
            }
        }
        if let Some(output) = output {
            self.ui.output_format = output;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.provider.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.provider.api_key_env, "OPENROUTER_API_KEY");
        assert!(config.ui.colorful);
        assert_eq!(config.ui.output_format, OutputFormat::Terminal);
        assert!(config.default_task.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "default_task = \"explain\"\n\n[ui]\noutput_format = \"json\"\n"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.default_task, Some(TaskKind::Explain));
        assert_eq!(config.ui.output_format, OutputFormat::Json);
        assert!(config.ui.spinner);
        assert_eq!(config.provider.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_task = \"poetry\"").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_headless_forces_plain_output() {
        let mut config = Config::default();
        config.merge_with_args(true, None);
        assert!(!config.ui.colorful);
        assert!(!config.ui.spinner);
        assert_eq!(config.ui.output_format, OutputFormat::Plain);

        config.merge_with_args(false, Some(OutputFormat::Json));
        assert_eq!(config.ui.output_format, OutputFormat::Json);
    }

    #[test]
    fn test_api_key_from_custom_env_var() {
        let mut config = Config::default();
        config.provider.api_key_env = "AI_TASK_ASSISTANT_TEST_KEY_UNSET".to_string();
        assert!(config.api_key().is_none());
    }
}
