//! Read telemetry from Daly Battery Management Systems over their UART protocol.
//!
//! The BMS speaks a simple request-response protocol with fixed 13 byte frames.
//! The host asks for one group of values at a time and the BMS answers with one
//! or more frames for that group. This crate walks through all groups once per
//! poll cycle and decodes the answers into named values.
//!
//! Currently the following data can be accessed:
//!
//! - Pack voltage (V), current (A), power (W) and state of charge (%)
//! - Highest and lowest cell voltage and temperature
//! - Charge state, MOSFET switches and remaining capacity (Ah)
//! - Cell count and charge cycles
//! - Voltage of each of up to 16 cells (V)
//! - Probe temperatures (°C)
//! - Balancing state of each cell
//! - Raw fault codes
//! - Alarm thresholds, nominal capacity and nominal cell voltage
//!
//! # Example
//!
//! ```no_run
//! # use std::time::Duration;
//! #
//! # #[tokio::main]
//! # pub async fn main(){
//!     let config = dalyread::Config::default();
//!     let mut battery_client = dalyread::BatteryClient::open(&config).unwrap();
//!     loop {
//!         let battery_state = battery_client.fetch_state().await.unwrap();
//!         println!("{battery_state}");
//!         tokio::time::sleep(Duration::from_secs(5)).await;
//!     }
//! # }
//! ```
//!
//! Any [`TelemetrySink`] can take the place of [`BatteryState`], and any
//! [`Transport`] the place of the serial port.

mod battery_client;
mod battery_state;
mod config;
pub mod frame;
pub mod message;
mod receiver;
mod scheduler;
mod telemetry;
mod transport;

pub use battery_client::BatteryClient;
pub use battery_state::BatteryState;
pub use config::{Config, DEFAULT_BAUD_RATE};
pub use frame::{Command, FrameError};
pub use receiver::{FrameReceiver, ReceiverState};
pub use scheduler::RequestScheduler;
pub use telemetry::{Field, FieldFilter, Reading, TelemetrySink, Value, FAULT_FRAME_SIZE};
pub use transport::{SerialTransport, Transport};
