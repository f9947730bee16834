//! Shared configuration system for desktop and ESP32.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use garage_doors::config::{Config, DeviceConfig, MqttConfig, TimingConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.timing.relay_pulse_ms, 1000);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_device(DeviceConfig::default().with_monitor_name("Barn"))
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100"))
//!     .with_timing(TimingConfig::default().with_closing_window_ms(20_000));
//! ```
//!
//! # Persisted Settings
//!
//! With the `serde-json-core` feature the user-editable subset of the
//! configuration (monitor name, broker host and port) can be stored as a
//! small JSON document, see [`StoredSettings`].

use core::fmt;

use heapless::String as HString;

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (topics)
pub const MAX_LONG_STRING: usize = 128;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

/// Default time a door may take to leave the closed contact and reach the open one.
pub const OPENING_TIME_WINDOW_MS: u32 = 5_000;

/// Default time a door may take to travel down to the closed contact.
pub const CLOSING_TIME_WINDOW_MS: u32 = 30_000;

/// Default length of the relay pulse that "presses" the opener button.
pub const RELAY_ACTIVATION_DURATION_MS: u32 = 1_000;

/// Default heartbeat interval for republishing unchanged door states.
pub const MAX_PUBLISH_INTERVAL_MS: u32 = 100_000;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

fn truncated<const N: usize>(s: &str) -> HString<N> {
    let mut hs = HString::new();
    let valid_end = s
        .char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= N)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let _ = hs.push_str(&s[..valid_end]);
    hs
}

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    truncated(s)
}

/// Create a LongString from a &str, truncating if too long
pub fn long_string(s: &str) -> LongString {
    truncated(s)
}

// ============================================================================
// Errors
// ============================================================================

/// Configuration loading and persistence errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored settings are not valid JSON or miss a field.
    Parse,
    /// Settings did not fit the encode buffer.
    Encode,
    /// Stored MQTT port is not a number in 1..=65535.
    InvalidPort,
    /// The settings store failed to read or write.
    Storage,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "failed to parse stored settings"),
            Self::Encode => write!(f, "failed to encode settings"),
            Self::InvalidPort => write!(f, "invalid MQTT port"),
            Self::Storage => write!(f, "settings storage error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Device identification
    pub device: DeviceConfig,
    /// WiFi connection configuration
    pub wifi: WifiConfig,
    /// MQTT client configuration
    pub mqtt: MqttConfig,
    /// Door timing
    pub timing: TimingConfig,
}

impl Config {
    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }

    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Set door timing
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfig {
    /// Device name; roots every MQTT topic and seeds the client ID
    pub monitor_name: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            monitor_name: short_string("GarageDoors"),
        }
    }
}

impl DeviceConfig {
    /// Set the monitor name
    pub fn with_monitor_name(mut self, name: &str) -> Self {
        self.monitor_name = short_string(name);
        self
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT client configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Fixed client ID; empty derives one from the monitor name
    pub client_id: ShortString,
    /// Username for authentication (empty = no auth)
    pub username: ShortString,
    /// Password for authentication
    pub password: ShortString,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Delay before reconnecting after a connection error
    pub reconnect_delay_ms: u32,
    /// Whether MQTT is enabled
    pub enabled: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: short_string("localhost"),
            port: 1883,
            client_id: ShortString::new(),
            username: ShortString::new(),
            password: ShortString::new(),
            keep_alive_secs: 30,
            reconnect_delay_ms: 5_000,
            enabled: true,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set a fixed client ID
    pub fn with_client_id(mut self, id: &str) -> Self {
        self.client_id = short_string(id);
        self
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = short_string(username);
        self.password = short_string(password);
        self
    }

    /// Set the reconnect delay
    pub fn with_reconnect_delay_ms(mut self, ms: u32) -> Self {
        self.reconnect_delay_ms = ms;
        self
    }

    /// Enable or disable MQTT
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        !self.username.is_empty()
    }

    /// Client ID to connect with.
    ///
    /// Uses the fixed client ID if one is set, otherwise the monitor name
    /// followed by `suffix` as four hex digits, so two devices sharing a
    /// name do not kick each other off the broker.
    ///
    /// ```rust
    /// use garage_doors::config::{DeviceConfig, MqttConfig};
    ///
    /// let device = DeviceConfig::default().with_monitor_name("Garage");
    /// let id = MqttConfig::default().client_id_for(&device, 0xbeef);
    /// assert_eq!(id.as_str(), "Garagebeef");
    /// ```
    pub fn client_id_for(&self, device: &DeviceConfig, suffix: u16) -> ShortString {
        use core::fmt::Write;

        if !self.client_id.is_empty() {
            return self.client_id.clone();
        }
        let stem: HString<{ MAX_SHORT_STRING - 4 }> = truncated(&device.monitor_name);
        let mut id = short_string(&stem);
        let _ = write!(id, "{:04x}", suffix);
        id
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u32,
    /// Whether WiFi is enabled
    pub enabled: bool,
    /// Maximum connection retry attempts (0 = unlimited)
    pub max_retries: u8,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
            connect_timeout_ms: 30_000,
            enabled: true,
            max_retries: 5,
        }
    }
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout_ms(mut self, ms: u32) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Enable or disable WiFi
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the maximum retry count
    pub fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    /// Check if WiFi credentials are configured
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }
}

// ============================================================================
// Timing Config
// ============================================================================

/// Door timing configuration. All values in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingConfig {
    /// How long a closed reading is distrusted after an open command
    pub opening_window_ms: u32,
    /// How long an open reading is distrusted after a close command
    pub closing_window_ms: u32,
    /// Relay pulse length
    pub relay_pulse_ms: u32,
    /// Heartbeat interval for republishing unchanged states
    pub max_publish_interval_ms: u32,
    /// Control loop period
    pub tick_interval_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            opening_window_ms: OPENING_TIME_WINDOW_MS,
            closing_window_ms: CLOSING_TIME_WINDOW_MS,
            relay_pulse_ms: RELAY_ACTIVATION_DURATION_MS,
            max_publish_interval_ms: MAX_PUBLISH_INTERVAL_MS,
            tick_interval_ms: 20,
        }
    }
}

impl TimingConfig {
    /// Set the opening window
    pub fn with_opening_window_ms(mut self, ms: u32) -> Self {
        self.opening_window_ms = ms;
        self
    }

    /// Set the closing window
    pub fn with_closing_window_ms(mut self, ms: u32) -> Self {
        self.closing_window_ms = ms;
        self
    }

    /// Set the relay pulse length
    pub fn with_relay_pulse_ms(mut self, ms: u32) -> Self {
        self.relay_pulse_ms = ms;
        self
    }

    /// Set the heartbeat interval
    pub fn with_max_publish_interval_ms(mut self, ms: u32) -> Self {
        self.max_publish_interval_ms = ms;
        self
    }

    /// Set the control loop period
    pub fn with_tick_interval_ms(mut self, ms: u32) -> Self {
        self.tick_interval_ms = ms;
        self
    }
}

// ============================================================================
// Persisted Settings
// ============================================================================

#[cfg(feature = "serde-json-core")]
pub use stored::*;

#[cfg(feature = "serde-json-core")]
mod stored {
    use log::{info, warn};

    use super::{short_string, Config, ConfigError, ShortString};
    use crate::traits::SettingsStore;

    /// Upper bound on the encoded settings document.
    pub const SETTINGS_MAX_LEN: usize = 256;

    /// User-editable settings as persisted on the device.
    ///
    /// The document keeps the port as a string:
    ///
    /// ```json
    /// {"monitor_name":"GarageDoors","mqtt_server":"10.0.1.5","mqtt_port":"1883"}
    /// ```
    #[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    pub struct StoredSettings {
        /// Device name
        pub monitor_name: ShortString,
        /// Broker host
        pub mqtt_server: ShortString,
        /// Broker port, as text
        pub mqtt_port: heapless::String<6>,
    }

    impl StoredSettings {
        /// Capture the persisted subset of `config`.
        pub fn from_config(config: &Config) -> Self {
            use core::fmt::Write;

            let mut mqtt_port = heapless::String::new();
            let _ = write!(mqtt_port, "{}", config.mqtt.port);
            Self {
                monitor_name: config.device.monitor_name.clone(),
                mqtt_server: config.mqtt.host.clone(),
                mqtt_port,
            }
        }

        /// Parse a settings document.
        pub fn from_json(json: &str) -> Result<Self, ConfigError> {
            serde_json_core::from_str::<StoredSettings>(json)
                .map(|(settings, _)| settings)
                .map_err(|_| ConfigError::Parse)
        }

        /// Encode into `buf`, returning the number of bytes written.
        pub fn to_json(&self, buf: &mut [u8]) -> Result<usize, ConfigError> {
            serde_json_core::to_slice(self, buf).map_err(|_| ConfigError::Encode)
        }

        /// Port as a number.
        pub fn port(&self) -> Result<u16, ConfigError> {
            match self.mqtt_port.trim().parse::<u16>() {
                Ok(0) | Err(_) => Err(ConfigError::InvalidPort),
                Ok(port) => Ok(port),
            }
        }
    }

    impl Config {
        /// Overlay persisted settings onto this configuration.
        pub fn with_stored(mut self, stored: &StoredSettings) -> Result<Self, ConfigError> {
            let port = stored.port()?;
            if !stored.monitor_name.is_empty() {
                self.device.monitor_name = short_string(&stored.monitor_name);
            }
            if !stored.mqtt_server.is_empty() {
                self.mqtt.host = short_string(&stored.mqtt_server);
            }
            self.mqtt.port = port;
            Ok(self)
        }
    }

    /// Load persisted settings over `defaults`.
    ///
    /// Any failure is logged and leaves the defaults in place; a device with
    /// broken flash still boots.
    pub fn load_config<S>(store: &mut S, defaults: Config) -> Config
    where
        S: SettingsStore,
        S::Error: core::fmt::Debug,
    {
        let mut buf = [0u8; SETTINGS_MAX_LEN];
        let len = match store.load(&mut buf) {
            Ok(Some(len)) => len,
            Ok(None) => {
                info!("no stored settings, using defaults");
                return defaults;
            }
            Err(e) => {
                warn!("failed to read stored settings: {:?}", e);
                return defaults;
            }
        };

        let parsed = core::str::from_utf8(&buf[..len])
            .map_err(|_| ConfigError::Parse)
            .and_then(StoredSettings::from_json)
            .and_then(|stored| defaults.clone().with_stored(&stored));

        match parsed {
            Ok(config) => {
                info!(
                    "loaded settings: monitor={} broker={}:{}",
                    config.device.monitor_name, config.mqtt.host, config.mqtt.port
                );
                config
            }
            Err(e) => {
                warn!("failed to load stored settings: {}", e);
                defaults
            }
        }
    }

    /// Load persisted settings, writing `defaults` on first boot.
    ///
    /// An empty store is provisioned with the defaults the firmware was built
    /// with, so later boots keep them even if the build-time values change.
    /// A store that fails to read or parse is left untouched.
    pub fn load_or_provision<S>(store: &mut S, defaults: Config) -> Config
    where
        S: SettingsStore,
        S::Error: core::fmt::Debug,
    {
        let mut buf = [0u8; SETTINGS_MAX_LEN];
        match store.load(&mut buf) {
            Ok(None) => {
                info!("no stored settings, provisioning defaults");
                if let Err(e) = save_config(store, &defaults) {
                    warn!("provisioning failed: {}", e);
                }
                defaults
            }
            _ => load_config(store, defaults),
        }
    }

    /// Persist the user-editable subset of `config`.
    pub fn save_config<S>(store: &mut S, config: &Config) -> Result<(), ConfigError>
    where
        S: SettingsStore,
        S::Error: core::fmt::Debug,
    {
        let mut buf = [0u8; SETTINGS_MAX_LEN];
        let len = StoredSettings::from_config(config).to_json(&mut buf)?;
        store.save(&buf[..len]).map_err(|e| {
            warn!("failed to write settings: {:?}", e);
            ConfigError::Storage
        })?;
        info!("settings saved");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.device.monitor_name.as_str(), "GarageDoors");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.timing.opening_window_ms, 5_000);
        assert_eq!(config.timing.closing_window_ms, 30_000);
        assert_eq!(config.timing.relay_pulse_ms, 1_000);
        assert_eq!(config.timing.max_publish_interval_ms, 100_000);
    }

    #[test]
    fn mqtt_auth_detection() {
        let no_auth = MqttConfig::default();
        assert!(!no_auth.has_auth());

        let with_auth = MqttConfig::default().with_auth("user", "pass");
        assert!(with_auth.has_auth());
    }

    #[test]
    fn client_id_derived_from_monitor_name() {
        let device = DeviceConfig::default().with_monitor_name("Garage");
        let id = MqttConfig::default().client_id_for(&device, 0x00a1);
        assert_eq!(id.as_str(), "Garage00a1");
    }

    #[test]
    fn client_id_fixed_wins() {
        let device = DeviceConfig::default();
        let id = MqttConfig::default()
            .with_client_id("fixed")
            .client_id_for(&device, 0x1234);
        assert_eq!(id.as_str(), "fixed");
    }

    #[test]
    fn client_id_long_name_keeps_suffix() {
        let name = "n".repeat(100);
        let device = DeviceConfig::default().with_monitor_name(&name);
        let id = MqttConfig::default().client_id_for(&device, 0xffff);
        assert_eq!(id.len(), MAX_SHORT_STRING);
        assert!(id.ends_with("ffff"));
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn long_string_truncation() {
        let long_input = "b".repeat(200);
        let s = long_string(&long_input);
        assert_eq!(s.len(), MAX_LONG_STRING);
    }

    #[test]
    fn string_helpers_utf8_boundary() {
        // 4-byte chars: 17 of them is 68 bytes, only 16 fit
        let input = "\u{1F697}".repeat(17);
        let s = short_string(&input);
        assert_eq!(s.len(), 64);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_device(DeviceConfig::default().with_monitor_name("Barn"))
            .with_mqtt(
                MqttConfig::default()
                    .with_host("broker.local")
                    .with_port(8883),
            )
            .with_timing(TimingConfig::default().with_relay_pulse_ms(500));

        assert_eq!(config.device.monitor_name.as_str(), "Barn");
        assert_eq!(config.mqtt.host.as_str(), "broker.local");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.timing.relay_pulse_ms, 500);
    }

    #[test]
    fn timing_builder() {
        let timing = TimingConfig::default()
            .with_opening_window_ms(1)
            .with_closing_window_ms(2)
            .with_relay_pulse_ms(3)
            .with_max_publish_interval_ms(4)
            .with_tick_interval_ms(5);

        assert_eq!(timing.opening_window_ms, 1);
        assert_eq!(timing.closing_window_ms, 2);
        assert_eq!(timing.relay_pulse_ms, 3);
        assert_eq!(timing.max_publish_interval_ms, 4);
        assert_eq!(timing.tick_interval_ms, 5);
    }

    #[test]
    fn wifi_config_is_configured() {
        let unconfigured = WifiConfig::default();
        assert!(!unconfigured.is_configured());

        let configured = WifiConfig::default().with_ssid("MyNetwork");
        assert!(configured.is_configured());
    }

    #[test]
    fn wifi_config_builder() {
        let wifi = WifiConfig::default()
            .with_ssid("TestNetwork")
            .with_password("secret123")
            .with_connect_timeout_ms(15_000)
            .with_max_retries(3)
            .with_enabled(false);

        assert_eq!(wifi.ssid.as_str(), "TestNetwork");
        assert_eq!(wifi.password.as_str(), "secret123");
        assert_eq!(wifi.connect_timeout_ms, 15_000);
        assert_eq!(wifi.max_retries, 3);
        assert!(!wifi.enabled);
    }

    #[test]
    fn config_error_display() {
        assert_eq!(format!("{}", ConfigError::InvalidPort), "invalid MQTT port");
        assert_eq!(
            format!("{}", ConfigError::Parse),
            "failed to parse stored settings"
        );
    }

    // =========================================================================
    // Stored Settings Tests
    // =========================================================================

    #[cfg(feature = "serde-json-core")]
    mod stored_settings {
        use super::super::*;
        use crate::hal::MockSettingsStore;

        const DOC: &str =
            r#"{"monitor_name":"Barn","mqtt_server":"10.0.1.5","mqtt_port":"1884"}"#;

        #[test]
        fn parse_settings_document() {
            let stored = StoredSettings::from_json(DOC).unwrap();
            assert_eq!(stored.monitor_name.as_str(), "Barn");
            assert_eq!(stored.mqtt_server.as_str(), "10.0.1.5");
            assert_eq!(stored.port(), Ok(1884));
        }

        #[test]
        fn parse_rejects_garbage() {
            assert_eq!(StoredSettings::from_json("{"), Err(ConfigError::Parse));
            assert_eq!(
                StoredSettings::from_json(r#"{"monitor_name":"x"}"#),
                Err(ConfigError::Parse)
            );
        }

        #[test]
        fn invalid_port_rejected() {
            let stored = StoredSettings::from_json(
                r#"{"monitor_name":"x","mqtt_server":"h","mqtt_port":"abc"}"#,
            )
            .unwrap();
            assert_eq!(stored.port(), Err(ConfigError::InvalidPort));
            assert_eq!(
                Config::default().with_stored(&stored),
                Err(ConfigError::InvalidPort)
            );
        }

        #[test]
        fn overlay_onto_defaults() {
            let stored = StoredSettings::from_json(DOC).unwrap();
            let config = Config::default().with_stored(&stored).unwrap();
            assert_eq!(config.device.monitor_name.as_str(), "Barn");
            assert_eq!(config.mqtt.host.as_str(), "10.0.1.5");
            assert_eq!(config.mqtt.port, 1884);
            // Timing is not persisted
            assert_eq!(config.timing, TimingConfig::default());
        }

        #[test]
        fn encode_then_load_through_store() {
            let config = Config::default()
                .with_device(DeviceConfig::default().with_monitor_name("Shed"))
                .with_mqtt(MqttConfig::default().with_host("mqtt.lan").with_port(1999));

            let mut store = MockSettingsStore::new();
            save_config(&mut store, &config).unwrap();

            let loaded = load_config(&mut store, Config::default());
            assert_eq!(loaded.device.monitor_name.as_str(), "Shed");
            assert_eq!(loaded.mqtt.host.as_str(), "mqtt.lan");
            assert_eq!(loaded.mqtt.port, 1999);
        }

        #[test]
        fn load_empty_store_keeps_defaults() {
            let mut store = MockSettingsStore::new();
            let loaded = load_config(&mut store, Config::default());
            assert_eq!(loaded, Config::default());
        }

        #[test]
        fn load_corrupt_store_keeps_defaults() {
            let mut store = MockSettingsStore::with_contents(b"not json");
            let loaded = load_config(&mut store, Config::default());
            assert_eq!(loaded, Config::default());
        }

        #[test]
        fn first_boot_provisions_defaults() {
            let defaults = Config::default()
                .with_mqtt(MqttConfig::default().with_host("broker.lan"));

            let mut store = MockSettingsStore::new();
            let config = load_or_provision(&mut store, defaults.clone());
            assert_eq!(config, defaults);

            // Later boots read the written settings, not the new defaults
            let loaded = load_or_provision(&mut store, Config::default());
            assert_eq!(loaded.mqtt.host.as_str(), "broker.lan");
        }

        #[test]
        fn provisioning_keeps_existing_settings() {
            let mut store = MockSettingsStore::with_contents(DOC.as_bytes());
            let config = load_or_provision(&mut store, Config::default());
            assert_eq!(config.device.monitor_name.as_str(), "Barn");
            assert_eq!(config.mqtt.port, 1884);
        }

        #[test]
        fn provisioning_leaves_corrupt_store_alone() {
            let mut store = MockSettingsStore::with_contents(b"not json");
            let config = load_or_provision(&mut store, Config::default());
            assert_eq!(config, Config::default());

            assert_eq!(store.saves, 0);
            assert_eq!(store.contents.as_deref(), Some(&b"not json"[..]));
        }

        #[test]
        fn provisioning_survives_write_failure() {
            let mut store = MockSettingsStore::new();
            store.fail_writes = true;
            let config = load_or_provision(&mut store, Config::default());
            assert_eq!(config, Config::default());
        }

        #[test]
        fn save_reports_storage_failure() {
            let mut store = MockSettingsStore::new();
            store.fail_writes = true;
            assert_eq!(
                save_config(&mut store, &Config::default()),
                Err(ConfigError::Storage)
            );
        }
    }
}
