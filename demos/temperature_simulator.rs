use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;

/// Continuous DS18B20-style temperature simulator for the IoT dashboard API.
/// Sends one reading per interval until interrupted.
#[derive(Debug, Parser)]
struct Args {
    /// Sensor API key, sent as the bearer token.
    api_key: String,
    /// Base URL of the dashboard API.
    #[arg(long, default_value = "http://localhost:3000")]
    base_url: String,
    /// Seconds between readings.
    #[arg(long, default_value_t = 30)]
    interval: u64,
    /// Base temperature in degrees Celsius.
    #[arg(long, default_value_t = 20.0)]
    temp: f64,
    /// Daily swing above the base temperature.
    #[arg(long, default_value_t = 5.0)]
    variation: f64,
}

// Warmer during the day than at night, with a little noise on top and the
// occasional spike (a door opening, direct sunlight on the sensor).
fn temperature(args: &Args) -> f64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let hour = ((secs % 86_400) / 3_600) as f64;
    let daily_cycle = 0.5 + 0.5 * ((hour - 6.0) * std::f64::consts::PI / 12.0).sin();
    let mut temp = args.temp + args.variation * daily_cycle;
    temp += 0.2 * (rand::random::<f64>() - 0.5);
    if rand::random::<f64>() < 0.05 {
        temp += 10.0 * (rand::random::<f64>() - 0.5);
    }
    (temp * 100.0).round() / 100.0
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let http = reqwest::Client::new();
    let url = format!("{}/api/sensor-data", args.base_url);
    let mut sent = 0u64;

    println!("Simulating a temperature sensor against {url} every {}s", args.interval);
    println!("Stop with ctrl-c");

    loop {
        let value = temperature(&args);
        let response = http
            .post(&url)
            .bearer_auth(&args.api_key)
            .json(&serde_json::json!({ "value": value }))
            .send()
            .await;
        match response {
            Ok(response) if response.status().is_success() => {
                sent += 1;
                println!("[{sent}] sent {value} C");
            }
            Ok(response) => println!("rejected [status={}]", response.status()),
            Err(err) => println!("network error: {err}"),
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(args.interval)) => {}
        }
    }

    println!("Stopping, {sent} readings sent");
    Ok(())
}
