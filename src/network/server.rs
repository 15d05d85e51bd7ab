use crate::core::CancellationToken;
use crate::error::{LedgerError, Result};
use crate::network::dispatcher::RequestDispatcher;
use crate::network::message::{RequestMessage, ResponseMessage};
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

pub const INVALID_UTF8: &str = "Malformed request: invalid UTF-8";

/// Per-connection protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingRequest,
    Verifying,
    Processing,
    Responding,
    Closed,
}

struct Connection {
    peer_addr: SocketAddr,
    state: ConnectionState,
}

impl Connection {
    fn new(peer_addr: SocketAddr) -> Self {
        Connection {
            peer_addr,
            state: ConnectionState::AwaitingRequest,
        }
    }

    fn advance(&mut self, next: ConnectionState) {
        debug!("{}: {:?} -> {:?}", self.peer_addr, self.state, next);
        self.state = next;
    }
}

/// TCP front end: newline-delimited JSON, one response per request.
///
/// By default connections are served one at a time, each drained before the
/// next is accepted. In concurrent mode every connection gets a thread and the
/// dispatcher's lock serializes mutations.
pub struct Server {
    dispatcher: Arc<RequestDispatcher>,
    concurrent: bool,
}

impl Server {
    pub fn new(dispatcher: RequestDispatcher, concurrent: bool) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            concurrent,
        }
    }

    pub fn dispatcher(&self) -> Arc<RequestDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Token that aborts whichever append or repair is sealing right now
    pub fn cancellation_token(&self) -> CancellationToken {
        self.dispatcher.cancellation_token()
    }

    /// Bind `addr` and serve until the process exits
    pub fn run(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| LedgerError::Network(format!("Failed to bind to {addr}: {e}")))?;
        info!("Ledger server listening on {addr}");
        self.serve(listener)
    }

    /// Accept connections from an already bound listener
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Error accepting connection: {e}");
                    continue;
                }
            };
            let peer_addr = match stream.peer_addr() {
                Ok(addr) => addr,
                Err(e) => {
                    error!("Failed to get peer address: {e}");
                    continue;
                }
            };
            info!("Accepted connection from {peer_addr}");

            if self.concurrent {
                let dispatcher = Arc::clone(&self.dispatcher);
                thread::spawn(move || {
                    if let Err(e) = Self::handle_connection(&dispatcher, stream, peer_addr) {
                        error!("Error handling connection from {peer_addr}: {e}");
                    }
                });
            } else if let Err(e) = Self::handle_connection(&self.dispatcher, stream, peer_addr) {
                error!("Error handling connection from {peer_addr}: {e}");
            }
        }
        Ok(())
    }

    /// Request/response loop until the peer closes the stream. Malformed lines,
    /// including ones that are not UTF-8, get an `ERROR` reply; only I/O
    /// failures end the connection early.
    pub fn handle_connection(
        dispatcher: &RequestDispatcher,
        stream: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<()> {
        let mut connection = Connection::new(peer_addr);
        let mut reader = BufReader::new(&stream);
        let mut writer = &stream;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    connection.advance(ConnectionState::Closed);
                    return Err(LedgerError::Network(format!(
                        "Failed to read from {peer_addr}: {e}"
                    )));
                }
            }

            // bytes that are not UTF-8 still get a reply
            let line = std::str::from_utf8(&buf).ok().map(str::trim);
            if line.is_some_and(str::is_empty) {
                continue;
            }

            connection.advance(ConnectionState::Verifying);
            let response = match line {
                Some(line) => {
                    debug!("Request from {peer_addr}: {line}");
                    match RequestMessage::from_json(line) {
                        Ok(request) => {
                            connection.advance(ConnectionState::Processing);
                            dispatcher.process_request(&request)
                        }
                        Err(e) => {
                            warn!("Malformed request from {peer_addr}: {e}");
                            ResponseMessage::error(e.to_string(), 0)
                        }
                    }
                }
                None => {
                    warn!("Request from {peer_addr} is not valid UTF-8");
                    ResponseMessage::error(INVALID_UTF8, 0)
                }
            };

            connection.advance(ConnectionState::Responding);
            let mut json = response.to_json()?;
            json.push('\n');
            writer
                .write_all(json.as_bytes())
                .and_then(|_| writer.flush())
                .map_err(|e| LedgerError::Network(format!("Failed to reply to {peer_addr}: {e}")))?;
            debug!("Response to {peer_addr}: {}", json.trim_end());
            connection.advance(ConnectionState::AwaitingRequest);
        }

        connection.advance(ConnectionState::Closed);
        info!("Connection from {peer_addr} closed");
        let _ = stream.shutdown(Shutdown::Both);
        Ok(())
    }
}
