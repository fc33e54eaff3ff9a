mod common;

use common::{response, MockBms};
use dalyread::{BatteryClient, BatteryState, Command, Config, Field, FieldFilter, Value};
use tokio::time::{Duration, Instant};

fn client(bms: MockBms) -> BatteryClient<MockBms, BatteryState> {
    BatteryClient::new(bms, BatteryState::new(), &Config::default())
}

#[tokio::test(start_paused = true)]
async fn test_fetch_state_collects_every_field() {
    let mut client = client(MockBms::typical());
    let state = client.fetch_state().await.unwrap();

    assert_eq!(state.number(Field::Voltage), Some(26.5));
    assert_eq!(state.number(Field::Current), Some(-5.0));
    assert_eq!(state.number(Field::Power), Some(-132.5));
    assert_eq!(state.number(Field::BatteryLevel), Some(87.3));
    assert_eq!(state.number(Field::MaxCellVoltageNumber), Some(4.0));
    assert_eq!(state.number(Field::MinTemperature), Some(-10.0));
    assert_eq!(state.get(Field::Status), Some(Value::Text("Discharging")));
    assert_eq!(state.flag(Field::DischargingMosEnabled), Some(true));
    assert_eq!(state.number(Field::RemainingCapacity), Some(90.0));
    assert_eq!(state.number(Field::CellsNumber), Some(16.0));
    assert_eq!(state.number(Field::Cycles), Some(300.0));
    assert_eq!(state.number(Field::Temperature(2)), Some(21.0));
    assert_eq!(state.flag(Field::CellBalanceActive(3)), Some(true));
    assert_eq!(state.flag(Field::CellBalanceActive(16)), Some(true));
    assert_eq!(state.flag(Field::CellBalanceActive(10)), Some(false));
    assert_eq!(state.fault_codes(), Some(&[0, 0, 0x04, 0, 0, 0, 0]));
    assert_eq!(state.number(Field::PackLevel2AlarmLowVoltage), Some(20.0));
    assert_eq!(state.number(Field::CellLevel2AlarmDifferenceTemperature), Some(10.0));
    assert_eq!(state.number(Field::CellNominalVoltage), Some(3.2));

    let cells = state.cell_voltages();
    assert_eq!(cells.len(), 16);
    assert_eq!(cells[0], (1, 3.301));
    assert_eq!(cells[15], (16, 3.316));

    assert_eq!(state.len(), 69);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_state_requests_each_command_once() {
    let mut client = client(MockBms::typical());
    client.fetch_state().await.unwrap();
    client.fetch_state().await.unwrap();

    let (bms, _) = client.into_parts();
    let expected: Vec<u8> = Command::POLL_ORDER.iter().map(|c| c.id()).collect();
    assert_eq!(bms.requests[..13], expected[..]);
    assert_eq!(bms.requests[13..], expected[..]);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_state_silent_device_completes() {
    let mut client = client(MockBms::new());
    let started = Instant::now();
    let state = client.fetch_state().await.unwrap();

    assert!(state.is_empty());
    assert!(Instant::now() - started < Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_corrupted_answer_is_never_published() {
    let mut bms = MockBms::typical();
    let mut bad = response(Command::BatteryLevel.id(), [0x01, 0x09, 0x00, 0x00, 0x74, 0xfe, 0x03, 0x69]);
    bad[4] ^= 0x40;
    bms.answer_raw(Command::BatteryLevel, bad);
    bms.noise = vec![0x00, 0x13, 0x37];

    let mut client = client(bms);
    let state = client.fetch_state().await.unwrap();

    assert_eq!(state.get(Field::Voltage), None);
    assert_eq!(state.get(Field::Power), None);
    // the noise ahead of the first answer does not disturb the rest
    assert_eq!(state.number(Field::CellNominalCapacity), Some(100.0));
}

#[tokio::test(start_paused = true)]
async fn test_truncated_answer_does_not_swallow_the_next() {
    let mut bms = MockBms::typical();
    let status = response(Command::Status.id(), [0x10, 0x02, 0, 0, 0, 0x01, 0x2c, 0]);
    bms.answer_raw(Command::Status, status[..7].to_vec());

    let mut client = client(bms);
    let state = client.fetch_state().await.unwrap();

    assert_eq!(state.get(Field::CellsNumber), None);
    assert_eq!(state.get(Field::Cycles), None);
    assert_eq!(state.cell_voltages().len(), 16);
    assert_eq!(state.len(), 66);
}

#[tokio::test(start_paused = true)]
async fn test_filtered_sink_sees_wanted_fields_only() {
    let wanted = [Field::Voltage, Field::CellVoltage(16), Field::CellBalanceActive(9)];
    let sink = FieldFilter::new(BatteryState::new(), wanted);
    let mut client = BatteryClient::new(MockBms::typical(), sink, &Config::default());
    client.fetch_state().await.unwrap();

    let state = client.sink().inner();
    assert_eq!(state.len(), 3);
    assert_eq!(state.number(Field::Voltage), Some(26.5));
    assert_eq!(state.number(Field::CellVoltage(16)), Some(3.316));
    assert_eq!(state.flag(Field::CellBalanceActive(9)), Some(true));
    assert_eq!(state.fault_codes(), None);
}

#[test]
fn test_no_requests_until_tick() {
    let mut client = client(MockBms::typical());
    client.trigger_refresh();
    let (bms, _) = client.into_parts();
    assert!(bms.requests.is_empty());
}
