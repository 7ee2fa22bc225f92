use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::device::adb::AdbSettings;
use crate::driver::capability::LaunchPreference;
use crate::driver::remote::DriverSettings;
use crate::driver::session::SessionSettings;
use crate::locator::search_surface::LocatorSettings;

pub const DEFAULT_CONFIG_FILE: &str = "mobile-pilot.yaml";
pub const DEFAULT_DRIVER_URL: &str = "http://127.0.0.1:4723";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo-instruct";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "mobile-pilot",
    version,
    about = "Drive Android apps from plain-language instructions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: mobile-pilot.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Appium server URL
    #[arg(long, global = true)]
    pub driver_url: Option<String>,

    /// Base URL of an OpenAI-compatible completions API
    #[arg(long, global = true)]
    pub llm_base_url: Option<String>,

    /// Completion model name
    #[arg(long, global = true)]
    pub llm_model: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run instructions against an app on one or more devices
    Run {
        /// Instruction script YAML file or directory of scripts
        #[arg(long)]
        script: Option<String>,

        /// Inline instruction (repeatable); requires --app
        #[arg(short, long = "instruction")]
        instructions: Vec<String>,

        /// App name for inline instructions
        #[arg(long)]
        app: Option<String>,

        /// Device serial (repeatable; default: device.serials from config)
        #[arg(short, long = "device")]
        devices: Vec<String>,

        /// Output format: console, junit
        #[arg(long)]
        format: Option<String>,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Completion backend: openai or mock
        #[arg(long)]
        backend: Option<String>,
    },

    /// Resolve instructions to actions without touching a device
    Interpret {
        /// Instructions to resolve
        #[arg(required = true)]
        instructions: Vec<String>,

        /// Completion backend: openai or mock
        #[arg(long)]
        backend: Option<String>,
    },

    /// Rank search-surface candidates in a saved UI tree dump
    Scan {
        /// Path to the XML page source
        file: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `mobile-pilot.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub locator: LocatorConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    pub url: Option<String>,

    #[serde(default)]
    pub launch: LaunchPreference,

    #[serde(default = "default_new_command_timeout")]
    pub new_command_timeout_secs: u64,

    pub request_timeout_secs: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            url: None,
            launch: LaunchPreference::Auto,
            new_command_timeout_secs: 6000,
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Unset: wait for the endpoint indefinitely
    pub request_timeout_secs: Option<u64>,

    #[serde(default = "default_backend")]
    pub backend: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: None,
            max_tokens: 150,
            request_timeout_secs: None,
            backend: "openai".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    #[serde(default = "default_ten")]
    pub label_timeout_secs: u64,

    #[serde(default = "default_ten")]
    pub element_timeout_secs: u64,

    #[serde(default = "default_poll_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            label_timeout_secs: 10,
            element_timeout_secs: 10,
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub serials: Vec<String>,

    #[serde(default = "default_adb")]
    pub adb_path: String,

    #[serde(default = "default_info_cache")]
    pub info_cache_size: usize,

    #[serde(default = "default_apps_cache")]
    pub apps_cache_size: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            serials: Vec::new(),
            adb_path: "adb".to_string(),
            info_cache_size: 5,
            apps_cache_size: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_console")]
    pub format: String,

    pub output: Option<String>,

    #[serde(default = "default_step_delay")]
    pub step_delay_ms: u64,

    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            format: "console".to_string(),
            output: None,
            step_delay_ms: 500,
            screenshot_dir: "./screenshots".to_string(),
        }
    }
}

// Serde default helpers
fn default_new_command_timeout() -> u64 { 6000 }
fn default_max_tokens() -> u32 { 150 }
fn default_backend() -> String { "openai".to_string() }
fn default_ten() -> u64 { 10 }
fn default_poll_ms() -> u64 { 500 }
fn default_adb() -> String { "adb".to_string() }
fn default_info_cache() -> usize { 5 }
fn default_apps_cache() -> usize { 20 }
fn default_console() -> String { "console".to_string() }
fn default_step_delay() -> u64 { 500 }
fn default_screenshot_dir() -> String { "./screenshots".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => parse_config(&content).unwrap_or_else(|e| {
            warn!(path = config_path, error = %e, "malformed config file, using defaults");
            AppConfig::default()
        }),
        Err(_) => {
            debug!(path = config_path, "no config file, using defaults");
            AppConfig::default()
        }
    }
}

pub fn parse_config(content: &str) -> Result<AppConfig, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(content)
}

// ============================================================================
// Environment
// ============================================================================

/// Environment variables the tool reads (after `.env` is loaded).
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub openai_base_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub appium_url: Option<String>,
}

impl Environment {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            openai_base_url: var("OPENAI_BASE_URL"),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL"),
            appium_url: var("APPIUM_URL"),
        }
    }
}

// ============================================================================
// Config Builders (resolve CLI > config file > environment > default)
// ============================================================================

pub fn resolve_setting(
    cli: Option<&str>,
    config: Option<&str>,
    env: Option<&str>,
    default: &str,
) -> String {
    cli.or(config).or(env).unwrap_or(default).to_string()
}

/// Resolved completion settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub backend: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub request_timeout: Option<Duration>,
}

pub fn build_llm_settings(
    cli: &Cli,
    backend: Option<&str>,
    config: &AppConfig,
    env: &Environment,
) -> LlmSettings {
    LlmSettings {
        backend: backend.unwrap_or(&config.llm.backend).to_string(),
        base_url: resolve_setting(
            cli.llm_base_url.as_deref(),
            config.llm.base_url.as_deref(),
            env.openai_base_url.as_deref(),
            DEFAULT_LLM_BASE_URL,
        ),
        api_key: config
            .llm
            .api_key
            .clone()
            .or_else(|| env.openai_api_key.clone()),
        model: resolve_setting(
            cli.llm_model.as_deref(),
            config.llm.model.as_deref(),
            env.openai_model.as_deref(),
            DEFAULT_LLM_MODEL,
        ),
        max_tokens: config.llm.max_tokens,
        request_timeout: config.llm.request_timeout_secs.map(Duration::from_secs),
    }
}

pub fn build_driver_settings(cli: &Cli, config: &AppConfig, env: &Environment) -> DriverSettings {
    DriverSettings {
        url: resolve_setting(
            cli.driver_url.as_deref(),
            config.driver.url.as_deref(),
            env.appium_url.as_deref(),
            DEFAULT_DRIVER_URL,
        ),
        launch: config.driver.launch,
        new_command_timeout_secs: config.driver.new_command_timeout_secs,
        request_timeout: config.driver.request_timeout_secs.map(Duration::from_secs),
    }
}

pub fn build_locator_settings(config: &LocatorConfig) -> LocatorSettings {
    LocatorSettings {
        label_timeout: Duration::from_secs(config.label_timeout_secs),
        element_timeout: Duration::from_secs(config.element_timeout_secs),
        poll_interval: Duration::from_millis(config.poll_interval_ms),
    }
}

pub fn build_session_settings(config: &AppConfig) -> SessionSettings {
    SessionSettings {
        locator: build_locator_settings(&config.locator),
        screenshot_root: PathBuf::from(&config.run.screenshot_dir),
    }
}

pub fn build_adb_settings(config: &DeviceConfig) -> AdbSettings {
    AdbSettings {
        program: config.adb_path.clone(),
        info_cache_size: config.info_cache_size,
        apps_cache_size: config.apps_cache_size,
    }
}

/// CLI serials, else the configured ones.
pub fn resolve_devices(cli_devices: &[String], config: &DeviceConfig) -> Vec<String> {
    if cli_devices.is_empty() {
        config.serials.clone()
    } else {
        cli_devices.to_vec()
    }
}

/// `RUST_LOG`-style filter for a `-v` count.
pub fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
