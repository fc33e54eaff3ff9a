use std::time::Duration;

use anyhow::{anyhow, Context};
use dalyread::{BatteryClient, Config};
use log::{error, info};

const USAGE: &str = "usage: dalyread [--port PATH] [--address HEX] [--baud N] [--interval SECS]";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let Some(config) = parse_args(std::env::args().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };
    config.dump();

    let mut battery_client = BatteryClient::open(&config)?;
    loop {
        // a device that stops answering must not show the previous cycle's values
        battery_client.sink_mut().clear();
        match battery_client.fetch_state().await {
            Ok(battery_state) => println!("{battery_state}"),
            Err(err) => error!("Poll cycle failed: {err:#}"),
        }
        info!("Next poll in {:?}", config.update_interval);
        tokio::time::sleep(config.update_interval).await;
    }
}

/// `None` when only the usage was asked for.
fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Option<Config>> {
    let mut config = Config::default();
    while let Some(arg) = args.next() {
        let mut value = || args.next().ok_or_else(|| anyhow!("{arg} needs a value\n{USAGE}"));
        match arg.as_str() {
            "--port" | "-p" => config.port = value()?,
            "--address" | "-a" => {
                let raw = value()?;
                config.address = u8::from_str_radix(raw.trim_start_matches("0x"), 16)
                    .with_context(|| format!("Invalid address {raw}"))?;
            }
            "--baud" | "-b" => {
                config.baud_rate = value()?.parse().context("Invalid baud rate")?;
            }
            "--interval" | "-i" => {
                let secs: u64 = value()?.parse().context("Invalid interval")?;
                config.update_interval = Duration::from_secs(secs);
            }
            "--help" | "-h" => return Ok(None),
            other => return Err(anyhow!("Unknown argument {other}\n{USAGE}")),
        }
    }
    Ok(Some(config))
}

#[test]
fn test_parse_args() {
    let args = ["--port", "/dev/ttyS1", "--address", "0x81", "--interval", "10"];
    let config = parse_args(args.iter().map(|s| s.to_string())).unwrap().unwrap();
    assert_eq!(config.port, "/dev/ttyS1");
    assert_eq!(config.address, 0x81);
    assert_eq!(config.update_interval, Duration::from_secs(10));
    assert_eq!(config.baud_rate, 9600);
}

#[test]
fn test_parse_args_rejects_unknown() {
    assert!(parse_args(["--verbose".to_string()].into_iter()).is_err());
    assert!(parse_args(["--baud".to_string()].into_iter()).is_err());
}

#[test]
fn test_parse_args_help() {
    assert!(parse_args(["--port".to_string(), "/dev/ttyS0".to_string(), "-h".to_string()].into_iter())
        .unwrap()
        .is_none());
    assert!(parse_args(std::iter::empty()).unwrap().is_some());
}
