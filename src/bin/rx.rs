//! Receiving end of the simulated link.
//!
//! Accepts data frames, answers each with an ack (subject to simulated ack
//! loss and delay) and rebuilds the transmitted file. Once the file is
//! complete it is written out, and the receiver keeps answering
//! retransmissions until the link has been quiet for `--linger-ms`, so a
//! sender whose final ack was lost still gets its DUPLICATE confirmation.

use clap::Parser;
use log::{error, info, warn};
use lora_arq::arq::{Framer, ReceiveEvent, Receiver};
use lora_arq::sim::{FaultInjector, UdpTransceiver};
use lora_arq::stats::{LinkStats, StatsServer};
use lora_arq::transfer::{sha256_hex, FileAssembler};
use lora_arq::{ConfigError, ConfigOverrides, LinkConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL_SLICE: Duration = Duration::from_millis(100);

/// Receive a file over a lossy simulated half-duplex link.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Host to listen on for data frames.
    #[arg(long, default_value = "127.0.0.1")]
    rx_host: String,
    #[arg(long, default_value_t = 9000)]
    rx_port: u16,
    /// Host the transmitter listens on for acks.
    #[arg(long, default_value = "127.0.0.1")]
    tx_ack_host: String,
    #[arg(long, default_value_t = 9001)]
    tx_ack_port: u16,

    /// Where to write the reconstructed file.
    #[arg(long, default_value = "received.bin")]
    out: PathBuf,

    /// JSON link config; flags given here override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the ack-loss simulation [default: 12].
    #[arg(long)]
    seed: Option<u64>,
    /// Probability an ack is lost [default: 0.08].
    #[arg(long)]
    loss_ack: Option<f64>,
    /// Minimum ack delay in milliseconds [default: 25].
    #[arg(long)]
    ack_delay_min: Option<u64>,
    /// Maximum ack delay in milliseconds [default: 40].
    #[arg(long)]
    ack_delay_max: Option<u64>,

    /// Quiet period after completion before exiting.
    #[arg(long, default_value_t = 3000)]
    linger_ms: u64,

    /// Serve counters at http://localhost:<port>/stats.
    #[arg(long)]
    stats_port: Option<u16>,
}

impl Cli {
    fn link_config(&self) -> Result<LinkConfig, ConfigError> {
        let overrides = ConfigOverrides {
            seed: self.seed,
            loss_probability: self.loss_ack,
            delay_min_ms: self.ack_delay_min,
            delay_max_ms: self.ack_delay_max,
            ..Default::default()
        };
        LinkConfig::resolve(self.config.as_deref(), LinkConfig::rx_defaults(), &overrides)
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
        resolve(&cli.rx_host, cli.rx_port),
        resolve(&cli.tx_ack_host, cli.tx_ack_port),
    ) {
        (Ok(local), Ok(peer)) => (local, peer),
        (Err(e), _) | (_, Err(e)) => {
            error!("{}", e);
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

    let stats = Arc::new(LinkStats::new("rx"));
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

    info!("Listening on {}", local);
    info!("Writing reconstructed data to {}", cli.out.display());

    let mut receiver =
        Receiver::new(Framer::new(config.arq.payload_capacity)).with_stats(stats.clone());
    let mut assembler = FileAssembler::new();
    let linger = Duration::from_millis(cli.linger_ms);
    let mut completed = false;
    let mut last_activity = Instant::now();

    loop {
        if completed && last_activity.elapsed() >= linger {
            info!("Link quiet for {} ms, exiting", cli.linger_ms);
            break;
        }

        let Some(event) = receiver.poll(&mut radio, POLL_SLICE) else {
            continue;
        };
        last_activity = Instant::now();

        let ReceiveEvent::Accepted { payload, .. } = event else {
            continue;
        };
        if completed {
            warn!("Frame accepted after file completed, ignoring");
            continue;
        }
        if let Err(e) = assembler.push(&payload) {
            warn!("Discarding payload: {}", e);
            continue;
        }
        info!(
            "Wrote {} / {} bytes",
            assembler.received_len(),
            assembler.expected_len().unwrap_or(0)
        );

        if assembler.is_complete() {
            let data = match std::mem::take(&mut assembler).into_bytes() {
                Ok(data) => data,
                Err(e) => {
                    error!("{}", e);
                    return ExitCode::FAILURE;
                }
            };
            if let Err(e) = std::fs::write(&cli.out, &data) {
                error!("Cannot write {}: {}", cli.out.display(), e);
                return ExitCode::FAILURE;
            }
            info!("File COMPLETE: {} bytes, SHA-256 {}", data.len(), sha256_hex(&data));
            completed = true;
        }
    }

    println!("{}", stats.to_json());
    ExitCode::SUCCESS
}
