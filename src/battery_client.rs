//! Poll a Daly BMS over its UART protocol.
//!
//! The client is driven by ticks. Every tick it
//!
//! 1. drops a half received frame if the line went quiet,
//! 2. reads whatever bytes arrived and decodes complete frames into the sink,
//! 3. sends the next request of the poll cycle if one is due.
//!
//! Nothing in a tick blocks. [`BatteryClient::fetch_state`] runs the ticks on a
//! tokio timer until one poll cycle is complete.

use anyhow::{anyhow, Context};
use log::debug;
use tokio::time::{sleep, timeout, Duration, Instant};

use crate::battery_state::BatteryState;
use crate::config::Config;
use crate::frame::{build_request, Command};
use crate::message::decode_buffer;
use crate::receiver::FrameReceiver;
use crate::scheduler::RequestScheduler;
use crate::telemetry::TelemetrySink;
use crate::transport::{SerialTransport, Transport};

pub struct BatteryClient<T, S> {
    transport: T,
    sink: S,
    receiver: FrameReceiver,
    scheduler: RequestScheduler,
    address: u8,
    tick_interval: Duration,
    rx: Vec<u8>,
}

impl BatteryClient<SerialTransport, BatteryState> {
    /// Open the configured serial port and collect telemetry into a [`BatteryState`].
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let transport = SerialTransport::open(&config.port, config.baud_rate)?;
        Ok(Self::new(transport, BatteryState::new(), config))
    }
}

impl<T: Transport, S: TelemetrySink> BatteryClient<T, S> {
    // How long a whole poll cycle may take before giving up
    const FETCH_TIMEOUT_S: u64 = 30;

    pub fn new(transport: T, sink: S, config: &Config) -> Self {
        Self {
            transport,
            sink,
            receiver: FrameReceiver::new(config.stale_after),
            scheduler: RequestScheduler::new(config.request_pacing),
            address: config.address,
            tick_interval: config.tick_interval,
            rx: Vec::new(),
        }
    }

    /// Start a new poll cycle, its first request goes out on the next tick.
    pub fn trigger_refresh(&mut self) {
        self.scheduler.trigger_refresh();
    }

    /// Run one driver tick.
    ///
    /// Transport errors are returned as is. A request that failed to send is
    /// sent again on the next tick that is due.
    pub fn on_tick(&mut self, now: Instant) -> anyhow::Result<()> {
        self.receiver.expire_stale(now);

        self.rx.clear();
        let received = self
            .transport
            .read_available(&mut self.rx)
            .context("Failed to read from BMS")?;
        if received > 0 {
            self.scheduler.note_activity(now);
        }
        for &byte in &self.rx {
            if let Some(frame) = self.receiver.push(byte, now) {
                decode_buffer(&frame, &mut self.sink);
            }
        }

        if let Some(command) = self.scheduler.due(now) {
            self.send(command)?;
            self.scheduler.advance();
        }
        Ok(())
    }

    /// All requests of the current cycle have been sent.
    pub fn is_cycle_complete(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Run a full poll cycle and return the sink holding the results.
    pub async fn fetch_state(&mut self) -> anyhow::Result<&S> {
        timeout(Duration::from_secs(Self::FETCH_TIMEOUT_S), self.run_cycle())
            .await
            .map_err(|_| anyhow!("Poll cycle did not complete"))??;
        Ok(&self.sink)
    }

    async fn run_cycle(&mut self) -> anyhow::Result<()> {
        self.trigger_refresh();
        loop {
            let now = Instant::now();
            self.on_tick(now)?;
            // Once the last request is out, wait for the bus to settle so its answer is in.
            if self.scheduler.is_idle() && self.scheduler.is_quiet(now) {
                return Ok(());
            }
            sleep(self.tick_interval).await;
        }
    }

    fn send(&mut self, command: Command) -> anyhow::Result<()> {
        let request = build_request(command, self.address);
        debug!("TX: {}", hex::encode(request.as_bytes()));
        self.transport
            .write(request.as_bytes())
            .with_context(|| format!("Failed to send {command:?} request"))?;
        self.transport.flush().context("Failed to flush request")?;
        Ok(())
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_parts(self) -> (T, S) {
        (self.transport, self.sink)
    }
}

#[cfg(test)]
#[derive(Default)]
struct ScriptedTransport {
    rx: std::collections::VecDeque<u8>,
    written: Vec<Vec<u8>>,
    fail_reads: bool,
    fail_writes: bool,
}

#[cfg(test)]
impl Transport for ScriptedTransport {
    fn bytes_available(&mut self) -> anyhow::Result<usize> {
        if self.fail_reads {
            return Err(anyhow!("line noise"));
        }
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> anyhow::Result<u8> {
        self.rx.pop_front().context("empty")
    }

    fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        if self.fail_writes {
            return Err(anyhow!("line down"));
        }
        self.written.push(bytes.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
fn client() -> BatteryClient<ScriptedTransport, BatteryState> {
    BatteryClient::new(ScriptedTransport::default(), BatteryState::new(), &Config::default())
}

#[test]
fn test_tick_sends_requests_in_order() {
    let mut client = client();
    let mut now = Instant::now();
    client.trigger_refresh();
    for _ in 0..Command::POLL_ORDER.len() + 3 {
        client.on_tick(now).unwrap();
        now += Duration::from_millis(260);
    }

    let sent: Vec<u8> = client.transport_mut().written.iter().map(|w| w[2]).collect();
    let expected: Vec<u8> = Command::POLL_ORDER.iter().map(|c| c.id()).collect();
    assert_eq!(sent, expected);
    assert!(client.is_cycle_complete());
}

#[test]
fn test_tick_decodes_received_frame() {
    let mut client = client();
    let now = Instant::now();
    client
        .transport_mut()
        .rx
        .extend(hex::decode("0000a5019008012c00007530000010").unwrap());
    client.on_tick(now).unwrap();

    assert_eq!(client.sink().number(crate::Field::Voltage), Some(30.0));
    // bytes on the bus hold back the paced request
    assert!(client.transport_mut().written.is_empty());
}

#[test]
fn test_tick_partial_frame_then_silence() {
    let mut client = client();
    let t0 = Instant::now();
    let frame = hex::decode("a5019008012c00007530000010").unwrap();

    client.transport_mut().rx.extend(&frame[..7]);
    client.on_tick(t0).unwrap();
    client.on_tick(t0 + Duration::from_millis(250)).unwrap();
    client.transport_mut().rx.extend(&frame[7..]);
    client.on_tick(t0 + Duration::from_millis(260)).unwrap();

    assert!(client.sink().is_empty());
}

#[test]
fn test_failed_write_keeps_cursor() {
    let mut client = client();
    let now = Instant::now();
    client.trigger_refresh();
    client.transport_mut().fail_writes = true;
    assert!(client.on_tick(now).is_err());

    client.transport_mut().fail_writes = false;
    client.on_tick(now + Duration::from_millis(250)).unwrap();
    assert_eq!(client.transport_mut().written[0][2], Command::BatteryLevel.id());
}

#[test]
fn test_failed_read_then_resync() {
    let mut client = client();
    let t0 = Instant::now();
    let frame = hex::decode("a5019008012c00007530000010").unwrap();

    client.transport_mut().rx.extend(&frame[..7]);
    client.on_tick(t0).unwrap();

    client.transport_mut().fail_reads = true;
    assert!(client.on_tick(t0 + Duration::from_millis(20)).is_err());

    // the tail of the first frame would complete it if the partial frame survived
    client.transport_mut().fail_reads = false;
    client.transport_mut().rx.extend(&frame[7..]);
    client
        .transport_mut()
        .rx
        .extend(hex::decode("a50192085a014b0200000000e8").unwrap());
    client.on_tick(t0 + Duration::from_millis(220)).unwrap();

    assert_eq!(client.sink().number(crate::Field::Voltage), None);
    assert_eq!(client.sink().number(crate::Field::MaxTemperature), Some(50.0));
}
