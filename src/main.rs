use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use reqwest::StatusCode;

const CONFIG_FILE: &str = "config.toml";
const SIMULATE_MODE: &str = "simulate";

// A reading with no explicit value gets a random temperature between 10 and 40 degrees.
const RANDOM_VALUE_RANGE: std::ops::Range<f64> = 10.0..40.0;
// Simulated readings fluctuate around a fixed base temperature.
const SIM_BASE_TEMP: f64 = 22.0;
const SIM_FLUCTUATION: f64 = 3.0;
const DEFAULT_SIM_COUNT: usize = 5;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(CONFIG_FILE).context("Error loading config")?;
    tracing_subscriber::fmt::init();

    // Parse the command line up front but report it after the health check, so a run
    // with no arguments still tells the caller whether the API is reachable.
    let invocation = Cli::try_parse().map_err(anyhow::Error::new).and_then(|cli| {
        let mode = Mode::from_cli(&cli)?;
        Ok((cli.api_key, mode))
    });

    let probe = ApiProbe::new(config)?;
    tracing::info!("IoT dashboard API probe [base_url={}]", probe.config.base_url);
    probe.check_health().await;

    let (api_key, mode) = match invocation {
        Ok(invocation) => invocation,
        Err(_) => {
            print_usage();
            std::process::exit(1);
        }
    };

    match mode {
        Mode::Single(value) => probe.submit_and_report(&api_key, value).await,
        Mode::Simulate { count } => probe.simulate(&api_key, count).await,
    }
    Ok(())
}

/// Manual test client for the IoT dashboard sensor ingestion API.
#[derive(Debug, Parser)]
#[command(name = "sensor-probe")]
struct Cli {
    /// Sensor API key, sent as the bearer token.
    api_key: String,
    /// A reading value to submit, or the literal `simulate`.
    value_or_mode: Option<String>,
    /// Number of readings to send in simulate mode.
    count: Option<usize>,
}

#[derive(Debug, PartialEq)]
enum Mode {
    /// Submit one reading; a random value is drawn when none is given.
    Single(Option<f64>),
    /// Submit a sequence of synthetic readings with a delay between them.
    Simulate { count: usize },
}

impl Mode {
    fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        Ok(match cli.value_or_mode.as_deref() {
            None => Mode::Single(None),
            Some(SIMULATE_MODE) => Mode::Simulate {
                count: cli.count.unwrap_or(DEFAULT_SIM_COUNT),
            },
            Some(raw) => {
                let value = raw
                    .parse::<f64>()
                    .with_context(|| format!("Invalid reading value '{raw}'"))?;
                Mode::Single(Some(value))
            }
        })
    }
}

fn usage_text() -> String {
    [
        "Usage:",
        "   sensor-probe <API_KEY> [value]",
        "   sensor-probe <API_KEY> simulate [count]",
        "",
        "Examples:",
        "   sensor-probe 123e4567-e89b-12d3-a456-426614174000",
        "   sensor-probe 123e4567-e89b-12d3-a456-426614174000 23.5",
        "   sensor-probe 123e4567-e89b-12d3-a456-426614174000 simulate 10",
        "",
        "Get your API key from the dashboard after creating a sensor.",
    ]
    .join("\n")
}

fn print_usage() {
    println!("{}", usage_text());
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
struct Config {
    log_level: String,
    base_url: String,
    timeout_secs: u64,
    sim_interval_secs: u64,
}

impl Config {
    // The config file is optional; the defaults cover a local development server.
    fn load(path: &str) -> anyhow::Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?
            .try_deserialize()?;
        std::env::set_var("RUST_LOG", &config.log_level);
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 10,
            sim_interval_secs: 1,
        }
    }
}

// The core struct. It owns the HTTP client and performs every call against the API,
// turning transport and application failures into reported outcomes instead of
// propagated errors, so a failed request never aborts the run.
struct ApiProbe {
    config: Config,
    http: reqwest::Client,
}

impl ApiProbe {
    fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }

    /// Unauthenticated health check. Returns whether the API answered with a
    /// healthy response; every failure path is logged rather than raised.
    async fn check_health(&self) -> bool {
        let url = format!("{}/api/health", self.config.base_url);
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!("Health check error: {err}");
                return false;
            }
        };
        if !response.status().is_success() {
            tracing::error!("Health check failed [status={}]", response.status());
            return false;
        }
        match response.json::<Health>().await {
            Ok(health) => {
                tracing::info!(
                    "API is healthy [message={}, version={}, timestamp={}]",
                    health.message,
                    health.version,
                    health.timestamp
                );
                true
            }
            Err(err) => {
                tracing::error!("Health check returned an unreadable body: {err}");
                false
            }
        }
    }

    /// Submits one reading. When `value` is `None` a random temperature is drawn.
    /// The outcome always comes back as a value so callers can inspect it.
    async fn send_reading(&self, api_key: &str, value: Option<f64>) -> SubmitOutcome {
        let value = value.unwrap_or_else(|| rand::random_range(RANDOM_VALUE_RANGE));
        tracing::info!("Sending reading [value={value}]");
        let url = format!("{}/api/sensor-data", self.config.base_url);
        let response = match self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&ReadingBody { value })
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return SubmitOutcome::Unreachable(err.to_string()),
        };

        let status = response.status();
        if status.is_success() {
            match response.json::<StoredResponse>().await {
                Ok(stored) => SubmitOutcome::Stored(stored.data),
                Err(err) => SubmitOutcome::Unreachable(err.to_string()),
            }
        } else {
            // The server reports application failures as a JSON body with an
            // `error` field, but a proxy in between may answer with anything.
            let error = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| "Unknown error".to_string());
            SubmitOutcome::Rejected { status, error }
        }
    }

    async fn submit_and_report(&self, api_key: &str, value: Option<f64>) {
        match self.send_reading(api_key, value).await {
            SubmitOutcome::Stored(reading) => {
                tracing::info!(
                    "Reading stored [id={}, sensor={}, value={}, timestamp={}]",
                    reading.id,
                    reading.sensor_name,
                    reading.value,
                    reading.timestamp
                );
            }
            SubmitOutcome::Rejected { status, error } => {
                tracing::error!("Server rejected reading [status={status}]: {error}");
            }
            SubmitOutcome::Unreachable(reason) => {
                tracing::error!("Network error: {reason}");
            }
        }
    }

    // Fully sequential: one reading at a time with a sleep in between, mimicking a
    // single slow sensor. No delay after the last reading.
    async fn simulate(&self, api_key: &str, count: usize) {
        tracing::info!("Simulating {count} sensor readings");
        let interval = Duration::from_secs(self.config.sim_interval_secs);
        for i in 0..count {
            tracing::info!("Reading {}/{}", i + 1, count);
            self.submit_and_report(api_key, Some(simulated_reading())).await;
            if i + 1 < count {
                tracing::debug!("Waiting {}s before the next reading", interval.as_secs());
                tokio::time::sleep(interval).await;
            }
        }
    }
}

/// Base temperature plus a uniform fluctuation, rounded to two decimals.
fn simulated_reading() -> f64 {
    round2(SIM_BASE_TEMP + rand::random_range(-SIM_FLUCTUATION..SIM_FLUCTUATION))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, serde::Serialize)]
struct ReadingBody {
    value: f64,
}

#[derive(Debug, serde::Deserialize)]
struct Health {
    message: String,
    timestamp: String,
    version: String,
}

#[derive(Debug, serde::Deserialize)]
struct StoredResponse {
    data: StoredReading,
}

#[derive(Debug, serde::Deserialize)]
struct StoredReading {
    id: String,
    sensor_name: String,
    value: f64,
    timestamp: String,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug)]
enum SubmitOutcome {
    Stored(StoredReading),
    Rejected { status: StatusCode, error: String },
    Unreachable(String),
}
