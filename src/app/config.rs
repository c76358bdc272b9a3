use crate::common::{
    error::IngestError,
    utils::{ParseFromEnv, parse_from_env},
};
use alloc::borrow::Cow;
use core::time::Duration;
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:7300";
/// 1 MiB
const DEFAULT_MAX_FRAME_SIZE: u32 = 0x100000;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
const DEFAULT_READ_BUFFER_SIZE: usize = 8192;
const MIN_READ_BUFFER_SIZE: usize = 512;
const DEFAULT_MAX_CONNECTIONS: usize = 1024;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Service configuration
///
/// Values come from the TOML file named by `CONFIG_FILE` (default `config.toml`),
/// then environment variables override individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `LISTEN_ADDR`
    pub listen_addr: String,
    /// `MAX_FRAME_SIZE`, largest accepted `data_len`
    pub max_frame_size: u32,
    /// `IDLE_TIMEOUT`, seconds without input before a connection is closed, 0 disables
    pub idle_timeout_secs: u64,
    /// `READ_BUFFER_SIZE`
    pub read_buffer_size: usize,
    /// `MAX_CONNECTIONS`
    pub max_connections: usize,
    /// `LOG_LEVEL`, used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_owned(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            log_level: DEFAULT_LOG_LEVEL.to_owned(),
        }
    }
}

// Macro for applying environment overrides
macro_rules! apply_overrides {
    ($config:expr, $lookup:expr, $($key:literal => $field:ident),* $(,)?) => {
        $(
            override_with(&mut $config.$field, $lookup($key));
        )*
    };
}

#[inline]
fn override_with<T: ParseFromEnv>(slot: &mut T, raw: Option<String>) {
    if let Some(value) = raw.as_deref().and_then(T::parse_value) {
        *slot = value;
    }
}

impl AppConfig {
    /// Load from the config file and process environment
    ///
    /// A missing config file is not an error; a malformed one is.
    pub fn load() -> Result<Self, IngestError> {
        let path = parse_from_env("CONFIG_FILE", DEFAULT_CONFIG_FILE.to_owned());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(IngestError::Config(Cow::Owned(format!(
                    "failed to read config file '{path}': {e}"
                ))));
            }
        };
        config.apply_env_with(|key| ::std::env::var(key).ok());
        Ok(config.normalized())
    }

    #[inline]
    pub fn from_toml_str(content: &str) -> Result<Self, IngestError> {
        Ok(toml::from_str::<Self>(content)?.normalized())
    }

    /// Override fields from a key lookup, ignoring empty or unparsable values
    #[rustfmt::skip]
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where F: Fn(&str) -> Option<String> {
        apply_overrides!(self, lookup,
            "LISTEN_ADDR" => listen_addr,
            "MAX_FRAME_SIZE" => max_frame_size,
            "IDLE_TIMEOUT" => idle_timeout_secs,
            "READ_BUFFER_SIZE" => read_buffer_size,
            "MAX_CONNECTIONS" => max_connections,
            "LOG_LEVEL" => log_level,
        );
    }

    fn normalized(mut self) -> Self {
        self.max_frame_size = self.max_frame_size.max(1);
        self.read_buffer_size = self.read_buffer_size.max(MIN_READ_BUFFER_SIZE);
        self.max_connections = self.max_connections.max(1);
        self
    }

    #[inline]
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs != 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}
