//! Configuration loading and environment resolution
//!
//! Every setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Key prefix under which the pipeline stores media objects
pub const DEFAULT_MEDIA_PREFIX: &str = "audio/";

/// Allowed difference between stored and measured duration, in seconds
pub const DEFAULT_DURATION_TOLERANCE_SECS: i64 = 2;

pub const ENV_ENVIRONMENT: &str = "VOISLAB_ENV";
pub const ENV_METADATA_TABLE: &str = "VOISLAB_METADATA_TABLE";
pub const ENV_MEDIA_BUCKET: &str = "VOISLAB_MEDIA_BUCKET";
pub const ENV_MEDIA_PREFIX: &str = "VOISLAB_MEDIA_PREFIX";
pub const ENV_OUTPUT_DIR: &str = "VOISLAB_OUTPUT_DIR";

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }

    /// Metadata table name provisioned for this environment
    pub fn metadata_table(&self) -> String {
        format!("voislab-audio-metadata-{}", self.as_str())
    }

    /// Media bucket name provisioned for this environment in `account`
    pub fn media_bucket(&self, account: &str) -> String {
        format!("voislab-media-{}-{}", self.as_str(), account)
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            other => Err(Error::InvalidInput(format!(
                "Invalid environment '{}' (expected 'dev' or 'prod')",
                other
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contents of `verify.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub environment: Option<String>,
    pub region: Option<String>,
    pub metadata_table: Option<String>,
    pub media_bucket: Option<String>,
    pub media_prefix: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub duration_tolerance_secs: Option<i64>,
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Load an explicitly requested file, or the default location if it exists
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file yields an empty config.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "Loading config file");
                Self::load(&path)
            }
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("voislab").join("verify.toml"))
}

/// Settings supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub environment: Option<String>,
    pub region: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// Fully resolved configuration for one verification run
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyConfig {
    pub environment: Environment,
    /// AWS region; `None` defers to the SDK default chain
    pub region: Option<String>,
    pub metadata_table: String,
    /// Explicit bucket; `None` means derive it from the caller's account id
    pub media_bucket: Option<String>,
    pub media_prefix: String,
    pub output_dir: PathBuf,
    pub duration_tolerance_secs: i64,
}

impl VerifyConfig {
    /// Resolve every setting through the priority chain
    pub fn resolve(cli: &CliOverrides, file: &TomlConfig) -> Result<Self> {
        let environment = match pick(
            cli.environment.clone(),
            ENV_ENVIRONMENT,
            file.environment.clone(),
        ) {
            Some(raw) => raw.parse()?,
            None => Environment::default(),
        };

        // Region falls through to the SDK (AWS_REGION, profile) when unset
        let region = cli.region.clone().or_else(|| file.region.clone());

        let metadata_table = pick(None, ENV_METADATA_TABLE, file.metadata_table.clone())
            .unwrap_or_else(|| environment.metadata_table());

        let media_bucket = pick(None, ENV_MEDIA_BUCKET, file.media_bucket.clone());

        let mut media_prefix = pick(None, ENV_MEDIA_PREFIX, file.media_prefix.clone())
            .unwrap_or_else(|| DEFAULT_MEDIA_PREFIX.to_string());
        if !media_prefix.is_empty() && !media_prefix.ends_with('/') {
            media_prefix.push('/');
        }

        let output_dir = pick(
            cli.output_dir.clone(),
            ENV_OUTPUT_DIR,
            file.output_dir.clone(),
        )
        .unwrap_or_else(|| PathBuf::from("."));

        let duration_tolerance_secs = file
            .duration_tolerance_secs
            .unwrap_or(DEFAULT_DURATION_TOLERANCE_SECS);
        if duration_tolerance_secs < 0 {
            return Err(Error::Config(format!(
                "duration_tolerance_secs must not be negative (got {})",
                duration_tolerance_secs
            )));
        }

        Ok(Self {
            environment,
            region,
            metadata_table,
            media_bucket,
            media_prefix,
            output_dir,
            duration_tolerance_secs,
        })
    }

    /// Bucket to use, deriving the provisioned name when none was configured
    pub fn media_bucket_for_account(&self, account: &str) -> String {
        self.media_bucket
            .clone()
            .unwrap_or_else(|| self.environment.media_bucket(account))
    }
}

fn pick<T: From<String>>(cli: Option<T>, env_var_name: &str, file: Option<T>) -> Option<T> {
    if cli.is_some() {
        return cli;
    }

    if let Ok(value) = std::env::var(env_var_name) {
        if !value.trim().is_empty() {
            return Some(T::from(value));
        }
    }

    file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse_is_case_insensitive() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Prod);
        assert_eq!(" dev ".parse::<Environment>().unwrap(), Environment::Dev);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_provisioned_resource_names() {
        assert_eq!(Environment::Dev.metadata_table(), "voislab-audio-metadata-dev");
        assert_eq!(
            Environment::Prod.media_bucket("123456789012"),
            "voislab-media-prod-123456789012"
        );
    }
}
