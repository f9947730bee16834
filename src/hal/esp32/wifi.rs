//! WiFi station connection for ESP32.
//!
//! # Example
//!
//! ```ignore
//! use garage_doors::hal::esp32::Esp32Wifi;
//! use garage_doors::config::WifiConfig;
//!
//! let config = WifiConfig::default()
//!     .with_ssid("MyNetwork")
//!     .with_password("secret123");
//!
//! let wifi = Esp32Wifi::new(modem, sysloop, nvs, &config)?;
//! log::info!("IP: {:?}", wifi.ip_addr());
//! ```

use std::net::Ipv4Addr;

use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};

use crate::config::WifiConfig;

/// Station-mode WiFi connection, held for the lifetime of this struct.
pub struct Esp32Wifi<'a> {
    wifi: BlockingWifi<EspWifi<'a>>,
}

impl<'a> Esp32Wifi<'a> {
    /// Start WiFi and connect, retrying up to `config.max_retries` times
    /// (forever if 0), then wait for DHCP.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        config: &WifiConfig,
    ) -> anyhow::Result<Self> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

        let mut ssid: heapless::String<32> = heapless::String::new();
        let _ = ssid.push_str(config.ssid.as_str());
        let mut password: heapless::String<64> = heapless::String::new();
        let _ = password.push_str(config.password.as_str());

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid,
            password,
            ..Default::default()
        }))?;
        wifi.start()?;

        let mut attempt: u8 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            info!("wifi: connecting to '{}' (attempt {})", config.ssid, attempt);
            match wifi.connect() {
                Ok(()) => break,
                Err(e) if config.max_retries == 0 || attempt < config.max_retries => {
                    warn!("wifi: connect failed: {:?}", e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        wifi.wait_netif_up()?;
        if let Ok(ip_info) = wifi.wifi().sta_netif().get_ip_info() {
            info!("wifi: connected, IP {}", ip_info.ip);
        }

        Ok(Self { wifi })
    }

    /// Current IP address, if connected.
    pub fn ip_addr(&self) -> Option<Ipv4Addr> {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip)
    }

    /// Whether the station is associated.
    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    /// Reconnect after losing the access point.
    pub fn reconnect(&mut self) -> anyhow::Result<()> {
        warn!("wifi: link lost, reconnecting");
        self.wifi.connect()?;
        self.wifi.wait_netif_up()?;
        Ok(())
    }
}
