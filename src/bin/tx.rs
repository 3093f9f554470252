//! Transmitting end of the simulated link.
//!
//! Reads a file, splits it into link payloads and sends them one at a time
//! over a UDP-simulated radio with data-frame loss and delay.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin rx -- --out received.bin
//! cargo run --bin tx -- input.bin --loss-data 0.15 --seed 12
//! ```

use clap::Parser;
use log::{error, info, warn};
use lora_arq::arq::{Sender, SystemClock};
use lora_arq::sim::{FaultInjector, UdpTransceiver};
use lora_arq::stats::{LinkStats, StatsServer};
use lora_arq::transfer::send_file;
use lora_arq::{ConfigError, ConfigOverrides, LinkConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Send a file over a lossy simulated half-duplex link.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// File to send.
    input_file: PathBuf,

    /// Host the receiver listens on for data frames.
    #[arg(long, default_value = "127.0.0.1")]
    rx_host: String,
    #[arg(long, default_value_t = 9000)]
    rx_port: u16,
    /// Host this end listens on for acks.
    #[arg(long, default_value = "127.0.0.1")]
    tx_ack_host: String,
    #[arg(long, default_value_t = 9001)]
    tx_ack_port: u16,

    /// JSON link config; flags given here override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the data-loss simulation [default: 12].
    #[arg(long)]
    seed: Option<u64>,
    /// Per-attempt ack timeout in milliseconds [default: 1000].
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Transmit attempts per chunk [default: 5].
    #[arg(long)]
    retries: Option<u32>,
    /// Probability a data frame is lost [default: 0.15].
    #[arg(long)]
    loss_data: Option<f64>,
    /// Minimum data frame delay in milliseconds [default: 300].
    #[arg(long)]
    data_delay_min: Option<u64>,
    /// Maximum data frame delay in milliseconds [default: 400].
    #[arg(long)]
    data_delay_max: Option<u64>,

    /// Serve counters at http://localhost:<port>/stats.
    #[arg(long)]
    stats_port: Option<u16>,
}

impl Cli {
    fn link_config(&self) -> Result<LinkConfig, ConfigError> {
        let overrides = ConfigOverrides {
            max_retries: self.retries,
            ack_timeout_ms: self.timeout_ms,
            seed: self.seed,
            loss_probability: self.loss_data,
            delay_min_ms: self.data_delay_min,
            delay_max_ms: self.data_delay_max,
        };
        LinkConfig::resolve(self.config.as_deref(), LinkConfig::tx_defaults(), &overrides)
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, String> {
    format!("{}:{}", host, port)
        .parse()
        .map_err(|e| format!("bad address {}:{}: {}", host, port, e))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match cli.link_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let (local, peer) = match (
        resolve(&cli.tx_ack_host, cli.tx_ack_port),
        resolve(&cli.rx_host, cli.rx_port),
    ) {
        (Ok(local), Ok(peer)) => (local, peer),
        (Err(e), _) | (_, Err(e)) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let data = match std::fs::read(&cli.input_file) {
        Ok(data) => data,
        Err(e) => {
            error!("Cannot read {}: {}", cli.input_file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let faults = match FaultInjector::new(config.fault) {
        Ok(faults) => faults,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut radio = match UdpTransceiver::bind(local, peer, faults) {
        Ok(radio) => radio,
        Err(e) => {
            error!("Failed to bind {}: {}", local, e);
            return ExitCode::FAILURE;
        }
    };

    let stats = Arc::new(LinkStats::new("tx"));
    let _stats_server = cli.stats_port.and_then(|port| {
        match StatsServer::start(None, port, stats.clone()) {
            Ok(server) => {
                info!("Stats server running at http://localhost:{}/stats", server.port());
                Some(server)
            }
            Err(e) => {
                warn!("Failed to start stats server: {}", e);
                None
            }
        }
    });

    info!("Sending {} on {}", cli.input_file.display(), peer);
    info!("Listening for acks on {}", local);

    let mut sender = Sender::new(config.arq).with_stats(stats.clone());
    let report = match send_file(&mut sender, &mut radio, &SystemClock, &data) {
        Ok(report) => report,
        Err(e) => {
            error!("Transfer error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Done: chunks attempted {}, delivered {}/{}",
        report.chunks_attempted, report.chunks_delivered, report.chunks_total
    );
    info!("SHA-256 {}", report.sha256);
    match serde_json::to_string(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => warn!("Failed to serialize report: {}", e),
    }

    if report.completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
