//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `WIKISEQ_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `WIKISEQ_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `WIKISEQ_RENDERER__STYLE=napkin` sets the `renderer.style` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! WIKISEQ_PORT=8080
//!
//! # Point at a different wiki host
//! WIKISEQ_HOST_API__BASE_URL="https://wiki.example.com"
//! WIKISEQ_HOST_API__API_TOKEN="..."
//!
//! # Shorten the preview cache window
//! WIKISEQ_PREVIEW_CACHE__TTL=1h
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "WIKISEQ_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Base URL where this add-on is reachable from browsers
    /// (e.g., "https://diagrams.example.com"). Preview image URLs embedded
    /// in pages are built against it, so it must be externally resolvable.
    pub public_base_url: Url,
    /// Remote diagram rendering service
    pub renderer: RendererConfig,
    /// Wiki host content API (macro history reads, attachment uploads)
    pub host_api: HostApiConfig,
    /// Response cache for the unauthenticated preview endpoint
    pub preview_cache: PreviewCacheConfig,
    /// Log diagram source and raw host payloads at debug level.
    ///
    /// Off by default: macro bodies carry whatever a page author typed and
    /// do not belong in logs unless someone is actively diagnosing.
    pub log_diagram_bodies: bool,
}

/// Remote rendering service configuration.
///
/// Style and output format are policy for the whole add-on, not per-request
/// choices: every macro renders with the same theme as a raster PNG.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    /// Root URL of the rendering service
    pub url: Url,
    /// Rendering theme passed with every request
    pub style: String,
    /// Output format token (raster image)
    pub format: String,
    /// Timeout for each rendering HTTP call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("https://www.websequencediagrams.com/").unwrap(),
            style: "rose".to_string(),
            format: "png".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Wiki host content API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostApiConfig {
    /// Base URL of the host platform (REST and RPC paths are joined onto it)
    pub base_url: Url,
    /// Header carrying the service credential
    pub auth_header_name: String,
    /// Prefix prepended to the credential value (e.g., "Bearer ")
    pub auth_header_prefix: String,
    /// Service credential for the host API. Usually set via
    /// `WIKISEQ_HOST_API__API_TOKEN` rather than the config file.
    pub api_token: Option<String>,
    /// Header the acting user's identity is forwarded in, so the host
    /// authorizes reads and writes on that user's behalf
    pub acting_user_header: String,
    /// Timeout for each host API call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for HostApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost:1990/confluence").unwrap(),
            auth_header_name: "Authorization".to_string(),
            auth_header_prefix: "Bearer ".to_string(),
            api_token: None,
            acting_user_header: "AP-CTX-USER-ID".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Preview response cache configuration.
///
/// Successful preview renders are kept keyed by the exact diagram source and
/// served until the TTL lapses; time is the only invalidation trigger.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewCacheConfig {
    /// How long a cached render stays fresh (default: 24 hours)
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Maximum number of cached renders
    pub max_capacity: u64,
}

impl Default for PreviewCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            max_capacity: 256,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_base_url: Url::parse("http://localhost:3000").unwrap(),
            renderer: RendererConfig::default(),
            host_api: HostApiConfig::default(),
            preview_cache: PreviewCacheConfig::default(),
            log_diagram_bodies: false,
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(figment::Error::from)?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("WIKISEQ_").split("__"))
    }

    fn validate(&self) -> Result<(), String> {
        if self.public_base_url.cannot_be_a_base() {
            return Err(format!("public_base_url must be a base URL, got {}", self.public_base_url));
        }
        if self.renderer.style.is_empty() {
            return Err("renderer.style must not be empty".to_string());
        }
        if self.host_api.acting_user_header.is_empty() {
            return Err("host_api.acting_user_header must not be empty".to_string());
        }
        Ok(())
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
