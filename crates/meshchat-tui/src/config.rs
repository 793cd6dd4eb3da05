//! Persisted connection profile.
//!
//! The last serial connection that came up is stored as JSON in the user's
//! home directory so the next launch can reconnect without `--port`.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use meshchat_core::{ConnectionProfile, DEFAULT_BAUD_RATE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the stored profile, relative to the home directory.
pub const PROFILE_FILE: &str = ".meshchat_serial.json";

/// Profile persistence errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// File contents are not a valid profile.
    #[error("malformed profile: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk shape of a serial connection profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProfile {
    /// Name shown for the local node.
    pub device_name: String,
    /// Serial device path.
    pub port: String,
    /// Line speed. Older files store it as a string such as `"115200"`.
    #[serde(default = "default_baud_rate", deserialize_with = "baud_rate_from_text_or_number")]
    pub baud_rate: u32,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BaudRate {
    Number(u32),
    Text(String),
}

fn baud_rate_from_text_or_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match BaudRate::deserialize(deserializer)? {
        BaudRate::Number(rate) => Ok(rate),
        BaudRate::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid baud rate {text:?}"))),
    }
}

impl From<&ConnectionProfile> for StoredProfile {
    fn from(profile: &ConnectionProfile) -> Self {
        Self {
            device_name: profile.name.clone(),
            port: profile.address.clone(),
            baud_rate: profile.baud_rate,
        }
    }
}

impl From<StoredProfile> for ConnectionProfile {
    fn from(stored: StoredProfile) -> Self {
        Self {
            name: stored.device_name,
            address: normalize_port(&stored.port),
            baud_rate: stored.baud_rate,
        }
    }
}

/// Default profile location. `None` if the home directory is unknown.
pub fn profile_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(PROFILE_FILE))
}

/// Make `dev/ttyUSB0` style paths absolute.
pub fn normalize_port(port: &str) -> String {
    let port = port.trim();
    if port.starts_with("dev/") { format!("/{port}") } else { port.to_string() }
}

/// Load the stored profile.
///
/// A missing file is `Ok(None)`.
///
/// # Errors
///
/// - `ConfigError::Io` if the file exists but cannot be read
/// - `ConfigError::Json` if it does not hold a profile
pub fn load(path: &Path) -> Result<Option<StoredProfile>, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Write the profile, replacing any previous one.
///
/// # Errors
///
/// - `ConfigError::Io` if the file cannot be written
pub fn save(path: &Path, profile: &StoredProfile) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(profile)?;
    fs::write(path, json)?;
    Ok(())
}
