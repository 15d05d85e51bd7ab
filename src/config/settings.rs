use crate::core::{DEFAULT_BENCHMARK_ITERATIONS, MAX_DIFFICULTY};
use crate::error::{LedgerError, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

pub const DEFAULT_NODE_ADDR: &str = "127.0.0.1:7777";

const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const GENESIS_DIFFICULTY_KEY: &str = "GENESIS_DIFFICULTY";
const SIGNATURE_POLICY_KEY: &str = "SIGNATURE_POLICY";
const CONCURRENT_CONNECTIONS_KEY: &str = "CONCURRENT_CONNECTIONS";
const HASH_BENCHMARK_ITERATIONS_KEY: &str = "HASH_BENCHMARK_ITERATIONS";

/// Which requests must carry a verifiable signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignaturePolicy {
    /// Every operation, read-only ones included
    All,
    /// Only append and corrupt
    Mutating,
    /// Nothing is verified
    None,
}

impl FromStr for SignaturePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(SignaturePolicy::All),
            "mutating" => Ok(SignaturePolicy::Mutating),
            "none" => Ok(SignaturePolicy::None),
            _ => Err(format!(
                "Invalid signature policy: {s}. Valid options: all, mutating, none"
            )),
        }
    }
}

impl fmt::Display for SignaturePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignaturePolicy::All => write!(f, "all"),
            SignaturePolicy::Mutating => write!(f, "mutating"),
            SignaturePolicy::None => write!(f, "none"),
        }
    }
}

/// Node settings. Every field has a default, so a TOML file may name any subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub node_address: String,
    pub genesis_difficulty: u32,
    pub genesis_data: String,
    pub signature_policy: SignaturePolicy,
    pub concurrent_connections: bool,
    pub hash_benchmark_iterations: u64,
    pub max_difficulty: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            node_address: DEFAULT_NODE_ADDR.to_string(),
            genesis_difficulty: 2,
            genesis_data: "Genesis".to_string(),
            signature_policy: SignaturePolicy::All,
            concurrent_connections: false,
            hash_benchmark_iterations: DEFAULT_BENCHMARK_ITERATIONS,
            max_difficulty: MAX_DIFFICULTY,
        }
    }
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> Result<Settings> {
        let settings: Settings = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Settings> {
        let raw = fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Override fields from variables resolved by `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(NODE_ADDRESS_KEY) {
            self.node_address = addr;
        }
        if let Some(raw) = lookup(GENESIS_DIFFICULTY_KEY) {
            self.genesis_difficulty = parse_var(GENESIS_DIFFICULTY_KEY, &raw)?;
        }
        if let Some(raw) = lookup(SIGNATURE_POLICY_KEY) {
            self.signature_policy = raw.parse().map_err(LedgerError::Config)?;
        }
        if let Some(raw) = lookup(CONCURRENT_CONNECTIONS_KEY) {
            self.concurrent_connections = parse_var(CONCURRENT_CONNECTIONS_KEY, &raw)?;
        }
        if let Some(raw) = lookup(HASH_BENCHMARK_ITERATIONS_KEY) {
            self.hash_benchmark_iterations = parse_var(HASH_BENCHMARK_ITERATIONS_KEY, &raw)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_difficulty > MAX_DIFFICULTY {
            return Err(LedgerError::Config(format!(
                "max_difficulty {} exceeds {MAX_DIFFICULTY}",
                self.max_difficulty
            )));
        }
        if self.genesis_difficulty > self.max_difficulty {
            return Err(LedgerError::Config(format!(
                "genesis_difficulty {} exceeds max_difficulty {}",
                self.genesis_difficulty, self.max_difficulty
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| LedgerError::Config(format!("Invalid {key} value {raw:?}: {e}")))
}

pub struct Config {
    inner: RwLock<Settings>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Defaults plus environment overrides; invalid variables are ignored
    pub fn new() -> Config {
        let mut settings = Settings::default();
        if let Err(e) = settings.apply_overrides(|key| env::var(key).ok()) {
            warn!("Ignoring environment configuration: {e}");
            settings = Settings::default();
        }
        Config {
            inner: RwLock::new(settings),
        }
    }

    /// Defaults, then the TOML file if given, then environment variables
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let mut settings = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Settings::from_file(path)?
            }
            None => Settings::default(),
        };
        settings.apply_overrides(|key| env::var(key).ok())?;
        Ok(settings)
    }

    pub fn settings(&self) -> Settings {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, settings: Settings) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    pub fn get_node_addr(&self) -> String {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .node_address
            .clone()
    }

    pub fn set_node_addr(&self, addr: String) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .node_address = addr;
    }

    pub fn get_signature_policy(&self) -> SignaturePolicy {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .signature_policy
    }

    pub fn set_signature_policy(&self, policy: SignaturePolicy) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .signature_policy = policy;
    }

    pub fn set_concurrent_connections(&self, concurrent: bool) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .concurrent_connections = concurrent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.node_address, "127.0.0.1:7777");
        assert_eq!(settings.genesis_difficulty, 2);
        assert_eq!(settings.signature_policy, SignaturePolicy::All);
        assert_eq!(settings.hash_benchmark_iterations, 2_000_000);
        assert!(!settings.concurrent_connections);
    }

    #[test]
    fn test_partial_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "node_address = \"0.0.0.0:9000\"").unwrap();
        writeln!(file, "signature_policy = \"mutating\"").unwrap();
        writeln!(file, "concurrent_connections = true").unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.node_address, "0.0.0.0:9000");
        assert_eq!(settings.signature_policy, SignaturePolicy::Mutating);
        assert!(settings.concurrent_connections);
        assert_eq!(settings.genesis_data, "Genesis");
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(matches!(
            Settings::from_toml_str("signature_policy = \"sometimes\""),
            Err(LedgerError::Config(_))
        ));
        assert!(Settings::from_toml_str("max_difficulty = 65").is_err());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(LedgerError::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("NODE_ADDRESS", "127.0.0.1:8000"),
            ("GENESIS_DIFFICULTY", "3"),
            ("SIGNATURE_POLICY", "NONE"),
            ("HASH_BENCHMARK_ITERATIONS", "10"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.node_address, "127.0.0.1:8000");
        assert_eq!(settings.genesis_difficulty, 3);
        assert_eq!(settings.signature_policy, SignaturePolicy::None);
        assert_eq!(settings.hash_benchmark_iterations, 10);
    }

    #[test]
    fn test_bad_override_rejected() {
        let mut settings = Settings::default();
        let result = settings.apply_overrides(|key| {
            (key == "GENESIS_DIFFICULTY").then(|| "hard".to_string())
        });
        assert!(matches!(result, Err(LedgerError::Config(_))));
    }

    #[test]
    fn test_config_accessors() {
        let config = Config {
            inner: RwLock::new(Settings::default()),
        };
        config.set_node_addr("127.0.0.1:1".to_string());
        config.set_signature_policy(SignaturePolicy::Mutating);
        config.set_concurrent_connections(true);

        assert_eq!(config.get_node_addr(), "127.0.0.1:1");
        assert_eq!(config.get_signature_policy(), SignaturePolicy::Mutating);
        assert!(config.settings().concurrent_connections);
    }
}
