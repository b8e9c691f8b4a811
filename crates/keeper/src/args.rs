//! Keeper CLI arguments.
//!
//! Every args struct is also a serde config section, so the same structure
//! can be loaded from a TOML file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use keeper_encryption::EncryptionConfig;
use keeper_observability::LogArgs;
use keeper_store::StoreError;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_CACHE_ENTRIES, RecordCacheConfig};

/// File name of the redb database inside the data directory.
pub const RECORDS_FILE: &str = "records.redb";

/// Errors from loading or interpreting keeper arguments.
#[derive(Debug, thiserror::Error)]
pub enum ArgsError {
    /// Reading the config file failed.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for [`KeeperArgs`].
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A hex-encoded secret is malformed.
    #[error("invalid {field}: expected 32 hex-encoded bytes")]
    InvalidHex {
        /// Offending argument.
        field: &'static str,
    },

    /// Both a key and a password were given.
    #[error("encryption key and password are mutually exclusive")]
    ConflictingEncryption,

    /// A salt was given without a key or password.
    #[error("encryption salt requires an encryption key or password")]
    SaltWithoutSecret,
}

impl From<ArgsError> for StoreError {
    fn from(err: ArgsError) -> Self {
        StoreError::backend(err)
    }
}

/// Record cache configuration.
#[derive(Debug, Args, Clone, Serialize, Deserialize)]
#[command(next_help_heading = "Cache")]
#[serde(default)]
pub struct CacheArgs {
    /// Maximum number of cached records.
    #[arg(long = "cache.entries", default_value_t = DEFAULT_CACHE_ENTRIES, value_name = "COUNT")]
    pub max_entries: usize,

    /// Maximum total size of cached records in bytes.
    #[arg(long = "cache.max-bytes", value_name = "BYTES")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<usize>,

    /// Refetch cached records older than this many seconds.
    #[arg(long = "cache.max-age", value_name = "SECS")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_secs: Option<u64>,

    /// Deep-copy values entering and leaving the cache.
    #[arg(long = "cache.clone")]
    pub clone_on_access: bool,

    /// Disable the record cache.
    #[arg(long = "cache.disabled")]
    pub disabled: bool,
}

impl Default for CacheArgs {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_ENTRIES,
            max_bytes: None,
            max_age_secs: None,
            clone_on_access: false,
            disabled: false,
        }
    }
}

impl RecordCacheConfig for CacheArgs {
    fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn max_bytes(&self) -> Option<usize> {
        self.max_bytes
    }

    fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }

    fn clone_on_access(&self) -> bool {
        self.clone_on_access
    }
}

/// At-rest encryption configuration.
#[derive(Debug, Args, Clone, Default, Serialize, Deserialize)]
#[command(next_help_heading = "Encryption")]
#[serde(default)]
pub struct EncryptionArgs {
    /// Hex-encoded 32-byte encryption key.
    #[arg(long = "encryption.key", value_name = "HEX")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Hex-encoded 32-byte salt for the encryption key or password.
    #[arg(long = "encryption.salt", value_name = "HEX")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,

    /// Encryption password.
    #[arg(long = "encryption.password", value_name = "PASSWORD")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl EncryptionArgs {
    /// Resolve the configured key material, if any.
    pub fn config(&self) -> Result<Option<EncryptionConfig>, ArgsError> {
        let config = match (&self.key, &self.password) {
            (None, None) if self.salt.is_some() => return Err(ArgsError::SaltWithoutSecret),
            (None, None) => return Ok(None),
            (Some(_), Some(_)) => return Err(ArgsError::ConflictingEncryption),
            (Some(key), None) => EncryptionConfig::key(decode_secret(key, "encryption key")?),
            (None, Some(password)) => EncryptionConfig::password(password.clone()),
        };
        Ok(Some(match &self.salt {
            Some(salt) => config.with_salt(decode_secret(salt, "encryption salt")?),
            None => config,
        }))
    }
}

fn decode_secret(value: &str, field: &'static str) -> Result<[u8; 32], ArgsError> {
    let bytes = hex::decode(value.trim_start_matches("0x"))
        .map_err(|_| ArgsError::InvalidHex { field })?;
    bytes.try_into().map_err(|_| ArgsError::InvalidHex { field })
}

/// Keeper configuration.
#[derive(Debug, Args, Clone, Serialize, Deserialize)]
#[command(next_help_heading = "Keeper")]
#[serde(default)]
pub struct KeeperArgs {
    /// Directory holding the record database.
    #[arg(long, value_name = "PATH")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datadir: Option<PathBuf>,

    /// Use an in-memory database (no persistence).
    #[arg(long = "db.memory")]
    pub memory_only: bool,

    /// Accept puts without content validation unless a call requests it.
    #[arg(long = "no-validate", action = clap::ArgAction::SetFalse)]
    pub validate_on_put: bool,

    /// Encryption configuration
    #[command(flatten)]
    pub encryption: EncryptionArgs,

    /// Cache configuration
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Logging configuration
    #[command(flatten)]
    pub log: LogArgs,
}

impl Default for KeeperArgs {
    fn default() -> Self {
        Self {
            datadir: None,
            memory_only: false,
            validate_on_put: true,
            encryption: EncryptionArgs::default(),
            cache: CacheArgs::default(),
            log: LogArgs::default(),
        }
    }
}

impl KeeperArgs {
    /// Parse arguments from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ArgsError> {
        Ok(toml::from_str(content)?)
    }

    /// Load arguments from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArgsError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Path of the record database, or `None` for an in-memory store.
    pub fn database_path(&self) -> Option<PathBuf> {
        if self.memory_only {
            return None;
        }
        self.datadir.as_ref().map(|dir| dir.join(RECORDS_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        keeper: KeeperArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["keeper"]);
        assert!(cli.keeper.validate_on_put);
        assert_eq!(cli.keeper.cache.max_entries, DEFAULT_CACHE_ENTRIES);
        assert!(cli.keeper.database_path().is_none());
        assert!(cli.keeper.encryption.config().unwrap().is_none());

        let toml = KeeperArgs::from_toml_str("").unwrap();
        assert!(toml.validate_on_put);
        assert_eq!(toml.cache.max_entries, DEFAULT_CACHE_ENTRIES);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "keeper",
            "--datadir",
            "/tmp/keeper",
            "--no-validate",
            "--cache.entries",
            "64",
            "--cache.max-age",
            "30",
            "--cache.clone",
            "--encryption.password",
            "secret",
            "--encryption.salt",
            "0x0202020202020202020202020202020202020202020202020202020202020202",
            "-vv",
            "--log.json",
        ]);

        assert!(!cli.keeper.validate_on_put);
        assert_eq!(
            cli.keeper.database_path(),
            Some(PathBuf::from("/tmp/keeper").join(RECORDS_FILE))
        );
        assert_eq!(cli.keeper.cache.max_entries(), 64);
        assert_eq!(cli.keeper.cache.max_age(), Some(Duration::from_secs(30)));
        assert!(cli.keeper.cache.clone_on_access());
        assert_eq!(
            cli.keeper.encryption.config().unwrap(),
            Some(EncryptionConfig::password("secret").with_salt([2; 32]))
        );
        assert_eq!(cli.keeper.log.verbosity, 2);
        assert!(cli.keeper.log.json);
    }

    #[test]
    fn test_toml_sections() {
        let args = KeeperArgs::from_toml_str(
            r#"
            datadir = "/var/lib/keeper"
            validate_on_put = false

            [cache]
            max_entries = 5
            max_bytes = 4096

            [encryption]
            key = "0x0101010101010101010101010101010101010101010101010101010101010101"

            [log]
            filter = "keeper=debug"
            "#,
        )
        .unwrap();

        assert!(!args.validate_on_put);
        assert_eq!(args.cache.max_entries, 5);
        assert_eq!(args.cache.max_bytes, Some(4096));
        assert!(!args.cache.disabled);
        assert_eq!(args.log.directive(), "keeper=debug");
        assert_eq!(
            args.encryption.config().unwrap(),
            Some(EncryptionConfig::key([1; 32]))
        );
    }

    #[test]
    fn test_invalid_encryption_args() {
        let conflicting = EncryptionArgs {
            key: Some("00".repeat(32)),
            salt: None,
            password: Some("pw".to_string()),
        };
        assert!(matches!(
            conflicting.config(),
            Err(ArgsError::ConflictingEncryption)
        ));

        let short = EncryptionArgs {
            key: Some("abcd".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            short.config(),
            Err(ArgsError::InvalidHex {
                field: "encryption key"
            })
        ));

        let orphan_salt = EncryptionArgs {
            salt: Some("00".repeat(32)),
            ..Default::default()
        };
        assert!(matches!(orphan_salt.config(), Err(ArgsError::SaltWithoutSecret)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keeper.toml");
        fs::write(&path, "[cache]\nmax_age_secs = 60\ndisabled = true\n").unwrap();

        let args = KeeperArgs::load(&path).unwrap();
        assert_eq!(args.cache.max_age(), Some(Duration::from_secs(60)));
        assert!(args.cache.disabled);
        assert!(args.validate_on_put);

        assert!(matches!(
            KeeperArgs::load(dir.path().join("missing.toml")),
            Err(ArgsError::Io(_))
        ));
    }
}
