//! Configuration for sealing and delivery.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (EVIDENCE_SEAL_API_KEY, EVIDENCE_SEAL_WEBHOOK_SECRET,
//!    EVIDENCE_SEAL_OUTPUT_DIR)
//! 2. Config file (.evidence-seal/config.yaml)
//! 3. Defaults (local sealer, bundles written to ~/.evidence-seal/bundles)
//!
//! Config file discovery:
//! - Searches current directory and parents for .evidence-seal/config.yaml
//! - Relative paths in the file are resolved against the project root
//!   (the directory containing .evidence-seal/)

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::connectors::{ArtifactFilter, Connector, JsonlConnector, RiskTier};
use crate::core::emitter::Emitter;
use crate::core::sealer::{LocalSealer, RemoteSealer, Sealer};
use crate::transport::{ApiSink, BundleSink, FileSink, WebhookSink};

pub const CONFIG_DIR: &str = ".evidence-seal";
pub const CONFIG_FILE: &str = "config.yaml";

pub const ENV_API_KEY: &str = "EVIDENCE_SEAL_API_KEY";
pub const ENV_WEBHOOK_SECRET: &str = "EVIDENCE_SEAL_WEBHOOK_SECRET";
pub const ENV_OUTPUT_DIR: &str = "EVIDENCE_SEAL_OUTPUT_DIR";

const DEFAULT_SEALER_TIMEOUT_SECONDS: u64 = 30;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub connector: Option<ConnectorConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub sealer: SealerConfig,
    /// Glob -> tier, in file order; the `default` key sets the fallback
    #[serde(default)]
    pub risk_mapping: Mapping,
    #[serde(default)]
    pub filters: FiltersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Record file for the `jsonl` connector (relative to project root)
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    File,
    Api,
    Webhook,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub mode: OutputMode,
    pub file_path: Option<String>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SealerMode {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SealerConfig {
    #[serde(default)]
    pub mode: SealerMode,
    pub url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FiltersConfig {
    #[serde(default)]
    pub include_paths: Vec<String>,
    #[serde(default)]
    pub exclude_paths: Vec<String>,
}

/// Validated output destination
#[derive(Clone, PartialEq, Eq)]
pub enum OutputSettings {
    File {
        dir: PathBuf,
    },
    Api {
        url: String,
        api_key: String,
    },
    Webhook {
        url: String,
        secret: Option<String>,
        headers: BTreeMap<String, String>,
    },
}

// Secrets stay out of debug output
impl fmt::Debug for OutputSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSettings::File { dir } => f.debug_struct("File").field("dir", dir).finish(),
            OutputSettings::Api { url, .. } => f
                .debug_struct("Api")
                .field("url", url)
                .field("api_key", &"<redacted>")
                .finish(),
            OutputSettings::Webhook { url, secret, headers } => f
                .debug_struct("Webhook")
                .field("url", url)
                .field("signed", &secret.is_some())
                .field("headers", &headers.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// Validated sealing backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SealerSettings {
    Local,
    Remote { url: String, timeout: Duration },
}

/// Resolved configuration with absolute paths and checked combinations
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub connector: Option<ConnectorConfig>,
    pub output: OutputSettings,
    pub sealer: SealerSettings,
    /// Ordered (glob, tier) rules
    pub risk_rules: Vec<(String, RiskTier)>,
    pub default_tier: RiskTier,
    pub include_paths: Vec<String>,
    pub exclude_paths: Vec<String>,
    /// Base for relative connector paths
    base_dir: PathBuf,
}

impl ResolvedConfig {
    /// Sink for the configured output mode
    pub fn build_sink(&self) -> Arc<dyn BundleSink> {
        match &self.output {
            OutputSettings::File { dir } => Arc::new(FileSink::new(dir.clone())),
            OutputSettings::Api { url, api_key } => Arc::new(ApiSink::new(url.clone(), api_key.clone())),
            OutputSettings::Webhook {
                url,
                secret,
                headers,
            } => {
                let sink = WebhookSink::new(url.clone()).with_headers(headers.clone());
                match secret {
                    Some(secret) => Arc::new(sink.with_secret(secret.clone())),
                    None => Arc::new(sink),
                }
            }
        }
    }

    /// Sealer for the configured mode
    pub fn build_sealer(&self) -> Arc<dyn Sealer> {
        match &self.sealer {
            SealerSettings::Local => Arc::new(LocalSealer::new()),
            SealerSettings::Remote { url, timeout } => Arc::new(RemoteSealer::new(url.clone(), *timeout)),
        }
    }

    pub fn build_emitter(&self) -> Emitter {
        Emitter::new(self.build_sealer(), self.build_sink())
    }

    /// Path filter with risk rules applied in file order
    pub fn build_filter(&self) -> Result<ArtifactFilter> {
        let mut filter = ArtifactFilter::new(self.include_paths.as_slice(), self.exclude_paths.as_slice())
            .context("Invalid filter pattern")?
            .with_default_tier(self.default_tier);

        for (pattern, tier) in &self.risk_rules {
            filter = filter
                .with_risk_rule(pattern, *tier)
                .with_context(|| format!("Invalid risk mapping pattern: {}", pattern))?;
        }

        Ok(filter)
    }

    /// The configured connector, if this crate ships one for its type
    pub fn build_connector(&self) -> Result<Box<dyn Connector>> {
        let connector = self
            .connector
            .as_ref()
            .context("No connector configured")?;

        match connector.kind.as_str() {
            "jsonl" => {
                let path = connector
                    .path
                    .as_deref()
                    .context("jsonl connector requires 'path'")?;
                Ok(Box::new(JsonlConnector::new(
                    connector.name.clone(),
                    connector.kind.clone(),
                    resolve_path(&self.base_dir, path),
                )))
            }
            other => bail!("No built-in connector for type '{}'", other),
        }
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Split the risk mapping into the fallback tier and ordered rules
fn parse_risk_mapping(mapping: &Mapping) -> Result<(RiskTier, Vec<(String, RiskTier)>)> {
    let mut default_tier = RiskTier::L0;
    let mut rules = Vec::new();

    for (key, value) in mapping {
        let key = key
            .as_str()
            .ok_or_else(|| anyhow!("risk_mapping keys must be strings"))?;
        let tier = match value {
            YamlValue::String(s) => s.parse::<RiskTier>().map_err(|e| anyhow!(e))?,
            _ => bail!("risk_mapping value for '{}' must be a tier string", key),
        };

        if key == "default" {
            default_tier = tier;
        } else {
            rules.push((key.to_string(), tier));
        }
    }

    Ok((default_tier, rules))
}

/// Combine file contents, environment and defaults
fn resolve<F>(config_path: Option<&Path>, file: Option<ConfigFile>, env: F) -> Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    // Project root is the parent of .evidence-seal/
    let base_dir = config_path
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let file = file.unwrap_or_else(|| ConfigFile {
        version: "1".to_string(),
        connector: None,
        output: OutputConfig::default(),
        sealer: SealerConfig::default(),
        risk_mapping: Mapping::new(),
        filters: FiltersConfig::default(),
    });

    let out = file.output;
    let output = match out.mode {
        OutputMode::File => {
            let dir = if let Some(dir) = env(ENV_OUTPUT_DIR) {
                PathBuf::from(dir)
            } else if let Some(ref path) = out.file_path {
                resolve_path(&base_dir, path)
            } else {
                dirs::home_dir()
                    .context("Failed to determine home directory")?
                    .join(CONFIG_DIR)
                    .join("bundles")
            };
            OutputSettings::File { dir }
        }
        OutputMode::Api => {
            let url = out.api_url.context("output mode 'api' requires 'api_url'")?;
            let api_key = env(ENV_API_KEY)
                .or(out.api_key)
                .with_context(|| format!("output mode 'api' requires 'api_key' or {}", ENV_API_KEY))?;
            OutputSettings::Api { url, api_key }
        }
        OutputMode::Webhook => {
            let url = out
                .webhook_url
                .context("output mode 'webhook' requires 'webhook_url'")?;
            OutputSettings::Webhook {
                url,
                secret: env(ENV_WEBHOOK_SECRET).or(out.webhook_secret),
                headers: out.headers,
            }
        }
    };

    let sealer = match file.sealer.mode {
        SealerMode::Local => SealerSettings::Local,
        SealerMode::Remote => SealerSettings::Remote {
            url: file
                .sealer
                .url
                .context("sealer mode 'remote' requires 'url'")?,
            timeout: Duration::from_secs(
                file.sealer
                    .timeout_seconds
                    .unwrap_or(DEFAULT_SEALER_TIMEOUT_SECONDS),
            ),
        },
    };

    let (default_tier, risk_rules) =
        parse_risk_mapping(&file.risk_mapping).context("Invalid risk_mapping")?;

    let resolved = ResolvedConfig {
        config_file: config_path.map(Path::to_path_buf),
        connector: file.connector,
        output,
        sealer,
        risk_rules,
        default_tier,
        include_paths: file.filters.include_paths,
        exclude_paths: file.filters.exclude_paths,
        base_dir,
    };

    // Reject bad globs at load time rather than on first use
    resolved.build_filter()?;

    Ok(resolved)
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let config_path = find_config_file(&cwd);

    let file = match config_path {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    resolve(config_path.as_deref(), file, |key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => bail!("{}", e),
    }
}

/// Force reload configuration (bypasses the cache)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
