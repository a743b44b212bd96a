use clap::Parser;
use std::time::Duration;

// ------------------------------------------------------------
// Runtime configuration
// ------------------------------------------------------------
//
// Every option is resolvable from an environment variable with a
// flag-supplied default. Precedence: CLI flag > environment >
// default.
//
// NOTE:
// - The token is security-sensitive and must never be logged.
// - There is deliberately no config file; the surface is small
//   enough for flags + environment.
//
#[derive(Debug, Clone, Parser)]
#[command(
    name = "plex-exporter",
    version,
    about = "Prometheus metrics exporter for Plex Media Server"
)]
pub struct Config {
    /// Plex access token
    #[arg(short, long, env = "PLEX_TOKEN")]
    pub token: Option<String>,

    /// Plex server base URL
    #[arg(short, long, env = "PLEX_SERVER", default_value = "http://localhost:32400")]
    pub server: String,

    /// Port the metrics endpoint listens on
    #[arg(short, long, env = "METRICS_PORT", default_value_t = 9922)]
    pub port: u16,

    /// Nominal seconds between collection cycles
    #[arg(short, long, env = "POLL_INTERVAL", default_value_t = 15)]
    pub interval: u64,
}

impl Config {
    /// Nominal sleep between cycle completions.
    ///
    /// The actual inter-cycle period is this plus the cumulative
    /// latency of all remote calls in the cycle; there is no drift
    /// correction.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}
