//! Round-robin sequencing of telemetry requests.

use tokio::time::{Duration, Instant};

use crate::frame::Command;

/// Walks once through [`Command::POLL_ORDER`] per refresh.
///
/// A request goes out when a refresh was just triggered, or when the bus has
/// been quiet for `pacing`. Received bytes count as bus activity, so the next
/// request waits until the BMS has finished answering the previous one.
#[derive(Debug)]
pub struct RequestScheduler {
    cursor: usize,
    fire_now: bool,
    last_activity: Option<Instant>,
    pacing: Duration,
}

impl RequestScheduler {
    pub const DEFAULT_PACING: Duration = Duration::from_millis(250);

    /// The cursor starts one past the first command. Until the first refresh
    /// the pacing timer walks through the rest of the list on its own.
    pub fn new(pacing: Duration) -> Self {
        Self {
            cursor: 1,
            fire_now: false,
            last_activity: None,
            pacing,
        }
    }

    /// Restart the poll cycle and send its first request on the next tick.
    pub fn trigger_refresh(&mut self) {
        self.cursor = 0;
        self.fire_now = true;
    }

    /// Record that something was seen on the bus.
    pub fn note_activity(&mut self, now: Instant) {
        self.last_activity = Some(now);
    }

    /// Decide whether a request fires on this tick and which one.
    ///
    /// A fire with nothing left in the cycle is consumed without a command.
    /// The cursor only moves on [`RequestScheduler::advance`], so a request
    /// that could not be written is retried on the next fire.
    pub fn due(&mut self, now: Instant) -> Option<Command> {
        if !self.fire_now && !self.is_quiet(now) {
            return None;
        }

        self.fire_now = false;
        let command = Command::POLL_ORDER.get(self.cursor).copied();
        if command.is_some() {
            self.last_activity = Some(now);
        }
        command
    }

    /// Nothing has been sent or received for at least the pacing interval.
    pub fn is_quiet(&self, now: Instant) -> bool {
        self.last_activity
            .map_or(true, |at| now.saturating_duration_since(at) >= self.pacing)
    }

    /// The request returned by [`RequestScheduler::due`] went out.
    pub fn advance(&mut self) {
        if self.cursor < Command::POLL_ORDER.len() {
            self.cursor += 1;
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Every command of the current cycle has been sent.
    pub fn is_idle(&self) -> bool {
        self.cursor >= Command::POLL_ORDER.len()
    }
}

impl Default for RequestScheduler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PACING)
    }
}

#[cfg(test)]
fn fire(scheduler: &mut RequestScheduler, now: Instant) -> Option<Command> {
    let command = scheduler.due(now);
    if command.is_some() {
        scheduler.advance();
    }
    command
}

#[test]
fn test_refresh_walks_poll_order_once() {
    let mut scheduler = RequestScheduler::default();
    let mut now = Instant::now();
    scheduler.trigger_refresh();

    let mut sent = Vec::new();
    for _ in 0..20 {
        sent.extend(fire(&mut scheduler, now));
        now += Duration::from_millis(250);
    }

    assert_eq!(sent, Command::POLL_ORDER.to_vec());
    assert!(scheduler.is_idle());
}

#[test]
fn test_refresh_fires_immediately() {
    let mut scheduler = RequestScheduler::default();
    let now = Instant::now();
    scheduler.note_activity(now);
    assert_eq!(scheduler.due(now), None);

    scheduler.trigger_refresh();
    assert_eq!(scheduler.due(now), Some(Command::BatteryLevel));
}

#[test]
fn test_pacing_waits_for_quiet_bus() {
    let mut scheduler = RequestScheduler::default();
    let t0 = Instant::now();
    scheduler.trigger_refresh();
    assert_eq!(fire(&mut scheduler, t0), Some(Command::BatteryLevel));

    assert_eq!(fire(&mut scheduler, t0 + Duration::from_millis(249)), None);

    // the answer arriving pushes the next request back
    scheduler.note_activity(t0 + Duration::from_millis(100));
    assert_eq!(fire(&mut scheduler, t0 + Duration::from_millis(300)), None);
    assert_eq!(
        fire(&mut scheduler, t0 + Duration::from_millis(350)),
        Some(Command::MinMaxVoltage)
    );
}

#[test]
fn test_starts_past_first_command() {
    let mut scheduler = RequestScheduler::default();
    assert_eq!(scheduler.cursor(), 1);
    assert_eq!(fire(&mut scheduler, Instant::now()), Some(Command::MinMaxVoltage));
}

#[test]
fn test_unsent_request_is_retried() {
    let mut scheduler = RequestScheduler::default();
    let t0 = Instant::now();
    scheduler.trigger_refresh();
    assert_eq!(scheduler.due(t0), Some(Command::BatteryLevel));
    // no advance: the write failed
    assert_eq!(
        scheduler.due(t0 + Duration::from_millis(250)),
        Some(Command::BatteryLevel)
    );
}

#[test]
fn test_idle_until_next_refresh() {
    let mut scheduler = RequestScheduler::default();
    let mut now = Instant::now();
    scheduler.trigger_refresh();
    for _ in 0..Command::POLL_ORDER.len() {
        fire(&mut scheduler, now);
        now += Duration::from_secs(1);
    }
    assert!(scheduler.is_idle());
    assert_eq!(fire(&mut scheduler, now + Duration::from_secs(5)), None);

    scheduler.trigger_refresh();
    assert_eq!(fire(&mut scheduler, now), Some(Command::BatteryLevel));
}
