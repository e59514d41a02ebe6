use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;

/// Continuous flowmeter simulator for the IoT dashboard API. Sends one flow-rate
/// reading per interval until interrupted.
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
    /// Base flow rate in liters per minute.
    #[arg(long, default_value_t = 5.0)]
    flow: f64,
    /// Fluctuation range around the base flow rate.
    #[arg(long, default_value_t = 2.0)]
    variation: f64,
}

// Higher flow during the day than at night, with noise on top. A flow rate can
// never be negative.
fn flow_rate(args: &Args) -> f64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let hour = ((secs % 86_400) / 3_600) as f64;
    let daily_cycle = 0.5 + 0.5 * ((hour - 6.0) * std::f64::consts::PI / 12.0).sin();
    let mut flow = args.flow * daily_cycle;
    flow += args.variation * (rand::random::<f64>() - 0.5);
    flow += 0.1 * (rand::random::<f64>() - 0.5);
    flow = flow.max(0.0);
    (flow * 100.0).round() / 100.0
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let http = reqwest::Client::new();
    let url = format!("{}/api/sensor-data", args.base_url);
    let mut sent = 0u64;

    println!("Simulating a flowmeter against {url} every {}s", args.interval);
    println!("Stop with ctrl-c");

    loop {
        let value = flow_rate(&args);
        let response = http
            .post(&url)
            .bearer_auth(&args.api_key)
            .json(&serde_json::json!({ "value": value }))
            .send()
            .await;
        match response {
            Ok(response) if response.status().is_success() => {
                sent += 1;
                println!("[{sent}] sent {value} L/min");
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
