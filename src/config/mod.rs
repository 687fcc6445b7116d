//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::pipeline::{
    DEFAULT_FEATURED_LIMIT, DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_PRODUCTS_PER_PAGE, RenderConfig,
};
use crate::cache::CacheConfig;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "vetrina";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;

/// Command-line arguments for the Vetrina binary.
#[derive(Debug, Parser, Default)]
#[command(name = "vetrina", version, about = "Vetrina storefront renderer")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VETRINA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle the cache layer.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Run in development mode (short template TTLs, live reload, verbose errors).
    #[arg(long = "development", action = clap::ArgAction::SetTrue)]
    pub development: bool,

    /// Override the data-fetch deadline in milliseconds.
    #[arg(long = "render-fetch-timeout-ms", value_name = "MILLIS")]
    pub fetch_timeout_ms: Option<u64>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("VETRINA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);
    Settings::from_raw(raw)
}

/// Parse the CLI and load settings in one step.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cache: CacheConfig,
    render: RawRenderSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    fetch_timeout_ms: Option<u64>,
    development: Option<bool>,
    products_per_page: Option<u32>,
    featured_limit: Option<u32>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = enabled;
        }
        if overrides.development {
            self.render.development = Some(true);
        }
        if let Some(timeout) = overrides.fetch_timeout_ms {
            self.render.fetch_timeout_ms = Some(timeout);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            mut cache,
            render,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let render = build_render_settings(render);
        // Development mode also flattens the template cache TTL.
        if render.development {
            cache.development = true;
        }

        Ok(Self {
            server,
            logging,
            cache,
            render,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }
    let addr = format!("{host}:{port}")
        .parse::<SocketAddr>()
        .map_err(|err| LoadError::invalid("server.addr", err.to_string()))?;
    let graceful_shutdown = Duration::from_secs(
        server
            .graceful_shutdown_seconds
            .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS),
    );
    Ok(ServerSettings {
        addr,
        graceful_shutdown,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level.as_deref() {
        Some(level) => LevelFilter::from_str(level)
            .map_err(|_| LoadError::invalid("logging.level", format!("unknown level `{level}`")))?,
        None => LevelFilter::INFO,
    };
    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    Ok(LoggingSettings { level, format })
}

fn build_render_settings(render: RawRenderSettings) -> RenderConfig {
    RenderConfig {
        fetch_timeout: Duration::from_millis(
            render.fetch_timeout_ms.unwrap_or(DEFAULT_FETCH_TIMEOUT_MS),
        ),
        development: render.development.unwrap_or(false),
        products_per_page: render.products_per_page.unwrap_or(DEFAULT_PRODUCTS_PER_PAGE),
        featured_limit: render.featured_limit.unwrap_or(DEFAULT_FEATURED_LIMIT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_without_any_sources() {
        let settings = Settings::from_raw(RawSettings::default()).expect("settings");
        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(
            settings.render.fetch_timeout,
            Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS)
        );
        assert!(settings.cache.enabled);
        assert!(!settings.render.development);
    }

    #[test]
    fn cli_overrides_win_over_defaults() {
        let mut raw = RawSettings::default();
        raw.apply_overrides(&ServeOverrides {
            server_port: Some(8080),
            development: true,
            fetch_timeout_ms: Some(500),
            ..Default::default()
        });
        let settings = Settings::from_raw(raw).expect("settings");
        assert_eq!(settings.server.addr.port(), 8080);
        assert!(settings.render.development);
        // Development flows through to the cache layer.
        assert!(settings.cache.development);
        assert_eq!(settings.render.fetch_timeout, Duration::from_millis(500));
    }

    #[test]
    fn port_zero_is_rejected() {
        let raw = RawSettings {
            server: RawServerSettings {
                port: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(Settings::from_raw(raw).is_err());
    }
}
