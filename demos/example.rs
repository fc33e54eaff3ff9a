use std::time::Duration;

#[tokio::main]
pub async fn main(){
    let config = dalyread::Config::default();
    let mut battery_client = dalyread::BatteryClient::open(&config).unwrap();
    loop {
        let battery_state = battery_client.fetch_state().await.unwrap();
        println!("{battery_state}");
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}
