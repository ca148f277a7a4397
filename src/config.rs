use anyhow::{Context, Result, anyhow};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/clipshare-env";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_DATA_ROOT: &str = "/var/lib/clipshare";
pub const API_KEY_ENV_VAR: &str = "YOUTUBE_API_KEY";
pub const TOKEN_DB_FILE: &str = "catalog.db";

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub youtube_api_key: Option<String>,
    pub data_root: Option<PathBuf>,
    pub port: Option<u16>,
    pub host: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub youtube_api_key: String,
    pub data_root: PathBuf,
    pub port: u16,
    pub host: String,
}

impl RuntimeConfig {
    pub fn token_db_path(&self) -> PathBuf {
        self.data_root.join(TOKEN_DB_FILE)
    }
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            match key {
                "YOUTUBE_API_KEY" => {
                    if !value.is_empty() {
                        cfg.youtube_api_key = Some(value.to_string());
                    }
                }
                "DATA_ROOT" => cfg.data_root = Some(PathBuf::from(value)),
                "CLIPSHARE_PORT" => {
                    let port: u16 = value.parse().with_context(|| {
                        format!("Parsing CLIPSHARE_PORT from {}", path.display())
                    })?;
                    cfg.port = Some(port);
                }
                "CLIPSHARE_HOST" => {
                    if !value.is_empty() {
                        cfg.host = Some(value.to_string());
                    }
                }
                _ => {}
            }
        }
    }
    Ok(Some(cfg))
}

pub fn load_runtime_config() -> Result<RuntimeConfig> {
    load_runtime_config_from(Path::new(DEFAULT_CONFIG_PATH))
}

/// Resolves the runtime configuration from the env file at `path`, with the
/// API key overridable through the process environment. Fails before any
/// network activity when the credential is absent.
pub fn load_runtime_config_from(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let path = path.as_ref();
    let cfg = read_env_config(path)?.unwrap_or_default();
    let env_key = env::var(API_KEY_ENV_VAR)
        .ok()
        .filter(|value| !value.trim().is_empty());
    resolve_runtime_config(cfg, env_key, path)
}

fn resolve_runtime_config(
    cfg: EnvConfig,
    env_key: Option<String>,
    path: &Path,
) -> Result<RuntimeConfig> {
    let youtube_api_key = env_key.or(cfg.youtube_api_key).ok_or_else(|| {
        anyhow!(
            "{} not set in {} or the environment",
            API_KEY_ENV_VAR,
            path.display()
        )
    })?;
    let data_root = cfg
        .data_root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_ROOT));
    let port = cfg.port.unwrap_or(DEFAULT_PORT);
    let host = cfg.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    Ok(RuntimeConfig {
        youtube_api_key,
        data_root,
        port,
        host,
    })
}
