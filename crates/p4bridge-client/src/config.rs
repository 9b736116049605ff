//! Session configuration.

use p4bridge_transport_traits::ConnectionSettings;
use serde::{Deserialize, Serialize};

/// API level assumed when none is configured
pub const DEFAULT_API_LEVEL: u32 = 99;

/// Program name reported when none is configured
pub const DEFAULT_PROG: &str = "unnamed p4bridge session";

/// Configuration for a [`Session`](crate::Session)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 0 never raises, 1 raises on errors, 2 raises on errors and warnings
    pub exception_level: u8,

    /// Client API level; `None` means the current level
    pub api_level: Option<u32>,

    /// Request tagged output
    pub tagged: bool,

    /// Collect performance-tracking output; fixed once connected
    pub track: bool,

    /// Enable stream support (API level 70 and up)
    pub streams: bool,

    /// Enable graph depot support (API level 82 and up)
    pub graph: bool,

    /// Server-side result limit per command
    pub max_results: Option<u32>,

    /// Server-side scan limit per command
    pub max_scan_rows: Option<u32>,

    /// Server-side lock time limit per command, in milliseconds
    pub max_lock_time: Option<u32>,

    /// Settings forwarded to the engine
    #[serde(flatten)]
    pub connection: ConnectionSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exception_level: 2, // raise on errors and warnings
            api_level: None,    // current
            tagged: true,
            track: false,
            streams: true,
            graph: true,
            max_results: None,
            max_scan_rows: None,
            max_lock_time: None,
            connection: ConnectionSettings {
                prog: Some(DEFAULT_PROG.to_string()),
                ..ConnectionSettings::default()
            },
        }
    }
}

impl SessionConfig {
    /// Defaults overlaid with the standard `P4*` environment variables
    ///
    /// Reads `P4PORT`, `P4USER`, `P4CLIENT`, `P4HOST`, `P4PASSWD`,
    /// `P4CHARSET`, `P4TICKETS` and `P4TRUST`. Unset variables leave the
    /// setting empty so the engine applies its own defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable lookup
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let mut config = Self::default();
        let connection = &mut config.connection;
        connection.port = var("P4PORT");
        connection.user = var("P4USER");
        connection.client = var("P4CLIENT");
        connection.host = var("P4HOST");
        connection.password = var("P4PASSWD");
        connection.charset = var("P4CHARSET");
        connection.ticket_file = var("P4TICKETS");
        connection.trust_file = var("P4TRUST");
        config
    }

    /// The API level commands are gated on
    #[must_use]
    pub fn effective_api_level(&self) -> u32 {
        self.api_level.unwrap_or(DEFAULT_API_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.exception_level, 2);
        assert!(config.tagged);
        assert!(!config.track);
        assert!(config.streams && config.graph);
        assert_eq!(config.effective_api_level(), DEFAULT_API_LEVEL);
        assert_eq!(config.connection.prog.as_deref(), Some(DEFAULT_PROG));
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("P4PORT", "ssl:perforce:1666"),
            ("P4USER", "bruno"),
            ("P4CLIENT", ""),
            ("P4TICKETS", "/home/bruno/.p4tickets"),
        ]
        .into_iter()
        .collect();

        let config = SessionConfig::from_lookup(|name| env.get(name).map(|v| (*v).to_string()));
        assert_eq!(config.connection.port.as_deref(), Some("ssl:perforce:1666"));
        assert_eq!(config.connection.user.as_deref(), Some("bruno"));
        assert_eq!(config.connection.client, None);
        assert_eq!(config.connection.ticket_file.as_deref(), Some("/home/bruno/.p4tickets"));
        assert_eq!(config.exception_level, 2);
    }

    #[test]
    fn test_serde_skips_password() {
        let mut config = SessionConfig::default();
        config.connection.password = Some("hunter2".into());
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["exception_level"], 2);
    }
}
