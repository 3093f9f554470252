//! HTTP stats server.
//!
//! Serves `GET /stats` as JSON from a background thread using `tiny_http`.

use super::LinkStats;
use log::{error, info, warn};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

/// Default port for the stats server.
pub const DEFAULT_STATS_PORT: u16 = 8080;

/// How often the server thread checks the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Background HTTP server for [`LinkStats`].
///
/// Drop it to stop the server.
pub struct StatsServer {
    handle: Option<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    port: u16,
}

impl StatsServer {
    /// Start the stats server.
    ///
    /// `bind_addr` of `None` binds 0.0.0.0. Port 0 picks a free port; read it
    /// back with [`port`](Self::port).
    pub fn start(
        bind_addr: Option<IpAddr>,
        port: u16,
        stats: Arc<LinkStats>,
    ) -> Result<Self, std::io::Error> {
        let addr = match bind_addr {
            Some(ip) => format!("{}:{}", ip, port),
            None => format!("0.0.0.0:{}", port),
        };

        let server = Server::http(&addr)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::AddrInUse, format!("{}", e)))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|a| a.port())
            .unwrap_or(port);

        info!("Stats server listening on port {} (/stats)", port);

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let handle = thread::spawn(move || {
            Self::run_server(server, stats, shutdown_clone);
        });

        Ok(Self {
            handle: Some(handle),
            shutdown,
            port,
        })
    }

    /// Port the server is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    fn run_server(server: Server, stats: Arc<LinkStats>, shutdown: Arc<AtomicBool>) {
        let content_type = static_header(b"Content-Type", b"application/json");
        let location = static_header(b"Location", b"/stats");
        let allow_get = static_header(b"Allow", b"GET");

        loop {
            if shutdown.load(Ordering::Acquire) {
                info!("Stats server shutting down");
                break;
            }

            let request = match server.recv_timeout(SHUTDOWN_POLL) {
                Ok(Some(request)) => request,
                Ok(None) => continue,
                Err(e) => {
                    error!("Stats server error: {}", e);
                    break;
                }
            };

            if request.method() != &Method::Get {
                let mut response =
                    Response::from_string("Method Not Allowed").with_status_code(405);
                if let Some(h) = allow_get.clone() {
                    response = response.with_header(h);
                }
                let _ = request.respond(response);
                continue;
            }

            let result = match request.url() {
                "/stats" | "/stats/" => {
                    let mut response = Response::from_string(stats.to_json()).with_status_code(200);
                    if let Some(h) = content_type.clone() {
                        response = response.with_header(h);
                    }
                    request.respond(response)
                }
                "/" => {
                    let mut response = Response::from_string("See /stats for link statistics")
                        .with_status_code(302);
                    if let Some(h) = location.clone() {
                        response = response.with_header(h);
                    }
                    request.respond(response)
                }
                _ => request.respond(Response::from_string("Not Found").with_status_code(404)),
            };

            if let Err(e) = result {
                warn!("Failed to send stats response: {}", e);
            }
        }
    }

    /// Stop the server. May take up to one shutdown poll interval.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatsServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn static_header(name: &[u8], value: &[u8]) -> Option<Header> {
    Header::from_bytes(name, value).ok()
}
