//! Connection and timing parameters.

use log::{info, warn};
use tokio::time::Duration;

use crate::frame::DEFAULT_ADDRESS;
use crate::receiver::FrameReceiver;
use crate::scheduler::RequestScheduler;

/// The only line speed Daly boards are known to use.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Serial device the BMS is attached to
    pub port: String,
    pub baud_rate: u32,
    /// Address written into every request
    pub address: u8,
    /// Time between the starts of two poll cycles
    pub update_interval: Duration,
    /// How often the driver tick runs
    pub tick_interval: Duration,
    /// Silence after which a partial frame is dropped
    pub stale_after: Duration,
    /// Silence after which the next request is sent
    pub request_pacing: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: String::from("/dev/ttyUSB0"),
            baud_rate: DEFAULT_BAUD_RATE,
            address: DEFAULT_ADDRESS,
            update_interval: Duration::from_secs(30),
            tick_interval: Duration::from_millis(20),
            stale_after: FrameReceiver::DEFAULT_STALE_AFTER,
            request_pacing: RequestScheduler::DEFAULT_PACING,
        }
    }
}

impl Config {
    /// Log the configuration and warn about settings the BMS is unlikely to work with.
    pub fn dump(&self) {
        info!("Daly BMS:");
        info!("  Port: {}", self.port);
        info!("  Baud rate: {}", self.baud_rate);
        info!("  Address: {:#04x}", self.address);
        info!("  Update interval: {:?}", self.update_interval);
        for warning in self.warnings() {
            warn!("  {warning}");
        }
    }

    /// Settings the BMS is unlikely to work with.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.baud_rate != DEFAULT_BAUD_RATE {
            warnings.push(format!(
                "Baud rate {} configured, the BMS expects {}",
                self.baud_rate, DEFAULT_BAUD_RATE
            ));
        }
        if self.tick_interval >= self.stale_after {
            warnings.push(format!(
                "Tick interval {:?} is not shorter than the frame timeout {:?}",
                self.tick_interval, self.stale_after
            ));
        }
        warnings
    }
}

#[test]
fn test_default_config_is_sane() {
    let config = Config::default();
    assert_eq!(config.baud_rate, 9600);
    assert_eq!(config.address, 0x80);
    assert!(config.tick_interval < config.stale_after);
    assert!(config.stale_after < config.request_pacing);
    assert!(config.request_pacing * 13 < config.update_interval);
    assert!(config.warnings().is_empty());
}

#[test]
fn test_warns_about_odd_settings() {
    let config = Config {
        baud_rate: 115_200,
        ..Config::default()
    };
    let warnings = config.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("115200"));

    let config = Config {
        tick_interval: Duration::from_millis(500),
        ..Config::default()
    };
    assert_eq!(config.warnings().len(), 1);
}
