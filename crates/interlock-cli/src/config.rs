//! Configuration – reads `~/.interlock/config.toml`.

use serde::de::value::{self, StringDeserializer};
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use interlock_runtime::{LockScope, PublishPolicy, SystemConfig, UnsafeCombinationPolicy};

/// Persisted run configuration.  Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub producer_interval_ms: u64,
    pub consumer_poll_ms: u64,
    pub monitor_poll_ms: u64,
    pub producer_compute_work: u32,
    pub producer_settle_work: u32,
    pub consumer_read_work: u32,
    pub consumer_verify_work: u32,

    /// `"warn"` or `"trip"`.
    pub unsafe_combination: UnsafeCombinationPolicy,
    /// `"command"` or `"field"`.  Only use `"field"` to demonstrate a trip.
    pub lock_scope: LockScope,
    /// `"overwrite"` or `"await_consumed"`.
    pub publish_policy: PublishPolicy,

    /// Stop publishing after this many commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_commands: Option<u64>,
    /// Stop the run after this many seconds.  Runs until Ctrl-C or a trip
    /// when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_for_secs: Option<u64>,

    /// Relay driving the SAFE lamp.
    pub safe_lamp: String,
    /// Relay driving the UNSAFE lamp.
    pub unsafe_lamp: String,
    /// Per-topic capacity of the event bus.
    pub bus_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            producer_interval_ms: 5,
            consumer_poll_ms: 1,
            monitor_poll_ms: 10,
            producer_compute_work: 8_000,
            producer_settle_work: 6_000,
            consumer_read_work: 10_000,
            consumer_verify_work: 9_000,
            unsafe_combination: UnsafeCombinationPolicy::default(),
            lock_scope: LockScope::default(),
            publish_policy: PublishPolicy::default(),
            max_commands: None,
            run_for_secs: None,
            safe_lamp: "led0".to_string(),
            unsafe_lamp: "led2".to_string(),
            bus_capacity: 256,
        }
    }
}

impl Config {
    /// Defaults with the `INTERLOCK_*` overrides applied.  Used whenever no
    /// config file could be loaded.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        apply_env_overrides(&mut cfg);
        cfg
    }

    /// The loop configuration this file describes.
    pub fn to_system_config(&self) -> SystemConfig {
        let mut sys = SystemConfig::default().with_lock_scope(self.lock_scope);

        sys.producer.interval = Duration::from_millis(self.producer_interval_ms);
        sys.producer.compute_work = self.producer_compute_work;
        sys.producer.settle_work = self.producer_settle_work;
        sys.producer.max_commands = self.max_commands;
        sys.producer.publish_policy = self.publish_policy;

        let poll = Duration::from_millis(self.consumer_poll_ms);
        sys.consumer.idle_interval = poll;
        sys.consumer.poll_interval = poll;
        sys.consumer.read_work = self.consumer_read_work;
        sys.consumer.verify_work = self.consumer_verify_work;
        sys.consumer.unsafe_combination = self.unsafe_combination;

        sys.monitor.poll_interval = Duration::from_millis(self.monitor_poll_ms);
        sys
    }
}

/// `$INTERLOCK_CONFIG`, or `~/.interlock/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("INTERLOCK_CONFIG") {
        return PathBuf::from(p);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".interlock").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `INTERLOCK_*` environment variable overrides to `cfg`.
///
/// Values that do not parse are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `INTERLOCK_UNSAFE_COMBINATION` | `unsafe_combination` |
/// | `INTERLOCK_LOCK_SCOPE` | `lock_scope` |
/// | `INTERLOCK_MAX_COMMANDS` | `max_commands` |
/// | `INTERLOCK_RUN_FOR_SECS` | `run_for_secs` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(policy) = env_enum("INTERLOCK_UNSAFE_COMBINATION") {
        cfg.unsafe_combination = policy;
    }
    if let Some(scope) = env_enum("INTERLOCK_LOCK_SCOPE") {
        cfg.lock_scope = scope;
    }
    if let Ok(v) = std::env::var("INTERLOCK_MAX_COMMANDS")
        && let Ok(n) = v.parse::<u64>()
    {
        cfg.max_commands = Some(n);
    }
    if let Ok(v) = std::env::var("INTERLOCK_RUN_FOR_SECS")
        && let Ok(n) = v.parse::<u64>()
    {
        cfg.run_for_secs = Some(n);
    }
}

/// Parse a snake_case enum variant name, e.g. `trip` or `await_consumed`.
fn env_enum<T: DeserializeOwned>(key: &str) -> Option<T> {
    let v = std::env::var(key).ok()?;
    let de: StringDeserializer<value::Error> = v.trim().to_lowercase().into_deserializer();
    T::deserialize(de).ok()
}
