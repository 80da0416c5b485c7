// MIT License - Copyright (c) 2026 Peter Wright
// TOML configuration

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::codes::{CodeTable, CustomCode};
use crate::control::{DEFAULT_MAX_RETRIES, RetryPolicy};
use crate::dispatch::callfile::DEFAULT_SPOOL_DIR;
use crate::error::{Result, SimonError};

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub events: EventsToml,
    pub control: ControlToml,
    pub mqtt: MqttToml,
    /// Zone number -> label. Keys are strings in TOML (`"015"`).
    #[serde(default, deserialize_with = "deserialize_numeric_keys")]
    pub zones: HashMap<u32, String>,
    /// Extra Contact ID codes on top of the builtin table.
    #[serde(default, deserialize_with = "deserialize_numeric_keys")]
    pub codes: HashMap<u16, CustomCode>,
}

fn deserialize_numeric_keys<'de, D, K, V>(deserializer: D) -> std::result::Result<HashMap<K, V>, D::Error>
where
    D: Deserializer<'de>,
    K: FromStr + Eq + Hash,
    V: Deserialize<'de>,
{
    let string_map: HashMap<String, V> = HashMap::deserialize(deserializer)?;
    string_map
        .into_iter()
        .map(|(k, v)| {
            k.trim()
                .parse::<K>()
                .map(|id| (id, v))
                .map_err(|_| serde::de::Error::custom(format!("invalid numeric key: {k}")))
        })
        .collect()
}

/// Where inbound AlarmReceiver reports are picked up.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsToml {
    #[serde(default = "default_src_dir")]
    pub src_dir: PathBuf,
    #[serde(default = "default_dst_dir")]
    pub dst_dir: PathBuf,
    #[serde(default = "default_move_files")]
    pub move_files: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for EventsToml {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            dst_dir: default_dst_dir(),
            move_files: default_move_files(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

fn default_src_dir() -> PathBuf {
    PathBuf::from("/var/spool/asterisk/alarm")
}
fn default_dst_dir() -> PathBuf {
    PathBuf::from("/var/spool/asterisk/alarm/done")
}
fn default_move_files() -> bool {
    true
}
fn default_poll_interval() -> u64 {
    5
}

/// Outbound keypad control.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlToml {
    pub access_code: String,
    pub extension: String,
    #[serde(default = "default_wait_time")]
    pub wait_time_secs: u64,
    #[serde(default = "default_retry_time")]
    pub retry_time_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_spool_dir")]
    pub spool_dir: PathBuf,
    #[serde(default = "default_archive")]
    pub archive: bool,
}

impl ControlToml {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            wait_time: Duration::from_secs(self.wait_time_secs),
            retry_time: Duration::from_secs(self.retry_time_secs),
            max_retries: self.max_retries,
        }
    }
}

fn default_wait_time() -> u64 {
    65
}
fn default_retry_time() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_spool_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SPOOL_DIR)
}
fn default_archive() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttToml {
    pub url: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_subscribe_topic")]
    pub subscribe_topic: String,
    #[serde(default = "default_publish_topic")]
    pub publish_topic: String,
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,
}

fn default_client_id() -> String {
    "simon-says".to_string()
}
fn default_subscribe_topic() -> String {
    "simon/cmd".to_string()
}
fn default_publish_topic() -> String {
    "simon".to_string()
}
fn default_snapshot_interval() -> u64 {
    60
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The code table: builtin codes plus any configured ones.
    pub fn code_table(&self) -> Result<CodeTable> {
        CodeTable::with_custom(&self.codes)
    }

    pub fn poll_interval(&self) -> Result<Duration> {
        if self.events.poll_interval_secs == 0 {
            return Err(SimonError::Config("poll_interval_secs must be at least 1".into()));
        }
        Ok(Duration::from_secs(self.events.poll_interval_secs))
    }
}
