//! Configuration resolution for camlink.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/camlink/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete camlink configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// HTTP server and persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_path: None,
            jwt_secret: "dev-secret-change-me".to_string(),
            jwt_ttl_secs: 7 * 24 * 60 * 60, // 7 days
            cors_origin: "*".to_string(),
        }
    }
}

/// Broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker_url: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub reconnect_period_secs: u64,
    pub keep_alive_secs: u64,
    /// Capacity of the client's outgoing request queue.
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_url: "mqtt://localhost:1883".to_string(),
            client_id: "iot_server_client".to_string(),
            username: None,
            password: None,
            reconnect_period_secs: 5,
            keep_alive_secs: 60,
            channel_capacity: 64,
        }
    }
}

impl MqttConfig {
    /// Split `broker_url` into host and port.
    pub fn broker_address(&self) -> Result<(String, u16)> {
        parse_broker_url(&self.broker_url)
    }

    pub const fn reconnect_period(&self) -> Duration {
        Duration::from_secs(self.reconnect_period_secs)
    }

    pub const fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

/// How long callers wait on devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Command reply deadline (seconds).
    pub command_timeout_secs: u64,
    /// Pairing announcement deadline (seconds). A person has to configure
    /// the camera by hand, so this is long.
    pub pairing_timeout_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: 30,
            pairing_timeout_secs: 5 * 60,
        }
    }
}

impl TimeoutConfig {
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub const fn pairing_timeout(&self) -> Duration {
        Duration::from_secs(self.pairing_timeout_secs)
    }
}

/// Default MQTT port when the URL does not carry one.
const DEFAULT_MQTT_PORT: u16 = 1883;

/// Parse `mqtt://host[:port]` or `tcp://host[:port]` (scheme optional).
pub fn parse_broker_url(url: &str) -> Result<(String, u16)> {
    let rest = ["mqtt://", "tcp://"]
        .iter()
        .find_map(|scheme| url.strip_prefix(scheme))
        .unwrap_or(url);
    if rest.contains("://") {
        return Err(Error::BrokerUrl(format!("unsupported scheme in {url}")));
    }
    let authority = rest.trim_end_matches('/');

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| Error::BrokerUrl(format!("bad port in {url}")))?;
            (host, port)
        }
        None => (authority, DEFAULT_MQTT_PORT),
    };

    if host.is_empty() {
        return Err(Error::BrokerUrl(format!("missing host in {url}")));
    }
    Ok((host.to_string(), port))
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            config = load_config_file(&global_path)?;
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
        merge_config(&mut config, load_config_file(path)?);
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        .map(|p| p.join("camlink").join("settings.json"))
}

/// Default database location (`~/.camlink/camlink.db`).
pub fn default_database_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".camlink").join("camlink.db"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    let database_path = overlay
        .server
        .database_path
        .clone()
        .or_else(|| base.server.database_path.take());
    base.server = ServerConfig {
        database_path,
        ..overlay.server
    };

    let username = overlay.mqtt.username.clone().or_else(|| base.mqtt.username.take());
    let password = overlay.mqtt.password.clone().or_else(|| base.mqtt.password.take());
    base.mqtt = MqttConfig {
        username,
        password,
        ..overlay.mqtt
    };

    base.timeouts = overlay.timeouts;
}

/// Apply environment overrides. `lookup` is `std::env::var` outside tests.
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k));

    if let Some(url) = first(&["CAMLINK_MQTT_BROKER_URL", "MQTT_BROKER_URL"]) {
        config.mqtt.broker_url = url;
    }
    if let Some(id) = first(&["CAMLINK_MQTT_CLIENT_ID", "MQTT_CLIENT_ID"]) {
        config.mqtt.client_id = id;
    }
    if let Some(user) = first(&["CAMLINK_MQTT_USERNAME", "MQTT_USERNAME"]) {
        config.mqtt.username = Some(user);
    }
    if let Some(pass) = first(&["CAMLINK_MQTT_PASSWORD", "MQTT_PASSWORD"]) {
        config.mqtt.password = Some(pass);
    }
    if let Some(secret) = first(&["CAMLINK_JWT_SECRET", "JWT_SECRET"]) {
        config.server.jwt_secret = secret;
    }
    if let Some(port) = first(&["CAMLINK_PORT", "PORT"]).and_then(|p| p.parse().ok()) {
        config.server.http_addr.set_port(port);
    }
    if let Some(path) = lookup("CAMLINK_DATABASE_PATH") {
        config.server.database_path = Some(PathBuf::from(path));
    }
    if let Some(secs) = lookup("CAMLINK_COMMAND_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.timeouts.command_timeout_secs = secs;
    }
    if let Some(secs) = lookup("CAMLINK_PAIRING_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.timeouts.pairing_timeout_secs = secs;
    }
    if let Some(origin) = lookup("CORS_ORIGIN") {
        config.server.cors_origin = origin;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_device_protocol() {
        let config = Config::default();
        assert_eq!(config.timeouts.command_timeout(), Duration::from_secs(30));
        assert_eq!(config.timeouts.pairing_timeout(), Duration::from_secs(300));
        assert_eq!(config.mqtt.client_id, "iot_server_client");
        assert_eq!(config.mqtt.reconnect_period(), Duration::from_secs(5));
    }

    #[test]
    fn broker_urls() {
        assert_eq!(
            parse_broker_url("mqtt://broker.local:1884").unwrap(),
            ("broker.local".to_string(), 1884)
        );
        assert_eq!(
            parse_broker_url("tcp://10.0.0.5").unwrap(),
            ("10.0.0.5".to_string(), 1883)
        );
        assert_eq!(
            parse_broker_url("localhost:1883/").unwrap(),
            ("localhost".to_string(), 1883)
        );
        assert!(parse_broker_url("mqtt://:1883").is_err());
        assert!(parse_broker_url("mqtt://host:notaport").is_err());
        assert!(parse_broker_url("ws://host:80").is_err());
    }

    #[test]
    fn env_overrides_prefer_prefixed_keys() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CAMLINK_MQTT_BROKER_URL", "mqtt://primary:1883"),
            ("MQTT_BROKER_URL", "mqtt://legacy:1883"),
            ("MQTT_USERNAME", "cam"),
            ("PORT", "8080"),
            ("CAMLINK_COMMAND_TIMEOUT_SECS", "5"),
        ]);
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.mqtt.broker_url, "mqtt://primary:1883");
        assert_eq!(config.mqtt.username.as_deref(), Some("cam"));
        assert_eq!(config.server.http_addr.port(), 8080);
        assert_eq!(config.timeouts.command_timeout_secs, 5);
        assert_eq!(config.timeouts.pairing_timeout_secs, 300);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"mqtt": {"broker_url": "mqtt://cams:1883"}}"#).unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.mqtt.broker_url, "mqtt://cams:1883");
        assert_eq!(config.mqtt.keep_alive_secs, 60);
        assert_eq!(config.timeouts.command_timeout_secs, 30);
    }

    #[test]
    fn merge_keeps_base_credentials_when_overlay_has_none() {
        let mut base = Config::default();
        base.mqtt.username = Some("from-global".to_string());
        base.server.database_path = Some(PathBuf::from("/var/lib/camlink.db"));

        let mut overlay = Config::default();
        overlay.mqtt.broker_url = "mqtt://override:1883".to_string();
        merge_config(&mut base, overlay);

        assert_eq!(base.mqtt.broker_url, "mqtt://override:1883");
        assert_eq!(base.mqtt.username.as_deref(), Some("from-global"));
        assert_eq!(
            base.server.database_path,
            Some(PathBuf::from("/var/lib/camlink.db"))
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.json"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
