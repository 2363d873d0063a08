//! Live reload over WebSocket.
//!
//! Browsers load a small client script (injected by the dev server) that
//! connects here. After each rebuild finishes, every connected browser is
//! told to reload.

use crate::log;
use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use serde::Serialize;
use std::{
    mem,
    net::{IpAddr, SocketAddr, TcpListener, TcpStream},
    sync::Arc,
    thread,
    time::Duration,
};
use tungstenite::{WebSocket, protocol::Message};

/// Ports tried above the configured one when it is busy.
const MAX_PORT_RETRIES: u16 = 10;

/// Bound on a handshake or a send to one browser.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Messages sent to the browser client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    /// Sent once after the handshake
    Connected { version: String },
    /// Sent after a rebuild completes
    Reload,
}

impl ReloadMessage {
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    pub fn to_json(&self) -> String {
        // Unit and string-only variants always serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Accepts browser connections and broadcasts reload messages.
///
/// Cloning shares the same client list.
#[derive(Clone)]
pub struct ReloadServer {
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
    addr: SocketAddr,
}

impl ReloadServer {
    /// Bind the WebSocket port and start accepting clients on a background thread.
    pub fn start(interface: IpAddr, base_port: u16) -> Result<Self> {
        let (listener, addr) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
        let clients = Arc::new(Mutex::new(Vec::new()));

        let accepted = Arc::clone(&clients);
        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        let clients = Arc::clone(&accepted);
                        thread::spawn(move || add_client(&clients, stream));
                    }
                    Err(e) => log!("reload"; "accept failed: {}", e),
                }
            }
        });

        log!("reload"; "ws://{}", addr);
        Ok(Self { clients, addr })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    #[cfg(test)]
    fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Send a message to every client, dropping those that have gone away.
    ///
    /// Sends happen outside the lock so new browsers can still register.
    pub fn broadcast(&self, message: &ReloadMessage) {
        let text = message.to_json();
        let mut clients = mem::take(&mut *self.clients.lock());
        clients.retain_mut(|ws| ws.send(Message::Text(text.clone().into())).is_ok());

        if !clients.is_empty() {
            log!("reload"; "notified {} client(s)", clients.len());
        }
        self.clients.lock().extend(clients);
    }
}

fn add_client(clients: &Mutex<Vec<WebSocket<TcpStream>>>, stream: TcpStream) {
    let timeouts = stream
        .set_read_timeout(Some(CLIENT_TIMEOUT))
        .and_then(|()| stream.set_write_timeout(Some(CLIENT_TIMEOUT)));
    if let Err(e) = timeouts {
        log!("reload"; "failed to configure client: {}", e);
        return;
    }

    match tungstenite::accept(stream) {
        Ok(mut ws) => {
            let hello = ReloadMessage::connected().to_json();
            if let Err(e) = ws.send(Message::Text(hello.into())) {
                log!("reload"; "failed to greet client: {}", e);
                return;
            }
            clients.lock().push(ws);
        }
        Err(e) => log!("reload"; "handshake failed: {}", e),
    }
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(
    interface: IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(TcpListener, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                if offset > 0 {
                    log!("reload"; "port {} in use, using {} instead", base_port, port);
                }
                let addr = listener.local_addr()?;
                return Ok((listener, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "Failed to bind reload server after {} attempts (from port {}): {}",
        max_retries,
        base_port,
        last_error.map_or_else(|| "no attempts".to_owned(), |e| e.to_string())
    ))
}
