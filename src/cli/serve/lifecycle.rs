//! Server lifecycle: binding and Ctrl+C shutdown.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use anyhow::{Result, anyhow};
use tiny_http::Server;

use crate::log;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Set once Ctrl+C is received.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Server to unblock on shutdown.
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// Install the global Ctrl+C handler. Call once at program start.
///
/// Before a server is registered the process just exits; afterwards the
/// server is unblocked so the request loop returns and teardown runs.
pub fn setup_shutdown_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);
        match SERVER.get() {
            Some(server) => {
                log!("serve"; "shutting down...");
                server.unblock();
            }
            None => std::process::exit(130),
        }
    })?;
    Ok(())
}

pub fn register_server(server: Arc<Server>) {
    SERVER.set(server).ok();
}

/// Bind to the interface and port, trying the next ports when busy.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                let bound = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, bound));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map_or_else(String::new, |e| e.to_string())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_bind_retries_busy_port() {
        let (_first, addr) = bind_with_retry(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).unwrap();
        let busy = addr.port();
        assert_ne!(busy, 0);

        let (_second, addr) = bind_with_retry(IpAddr::V4(Ipv4Addr::LOCALHOST), busy).unwrap();
        assert_ne!(addr.port(), busy);
    }
}
