//! Async remote console client.
//!
//! The client walks a strict lifecycle:
//!
//! ```text
//! Disconnected --connect--> Connected --authenticate--> Authenticated --execute*-->
//!      ^                                                                       |
//!      +------------------------------- disconnect ----------------------------+
//! ```
//!
//! `disconnect` is valid from every state and is idempotent, so callers can
//! run it unconditionally on their cleanup path.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, trace};

use crate::codec::SourceCodec;
use crate::dialect::Dialect;
use crate::error::RconError;
use crate::goldsource::{self, Reply};
use crate::packet::{AUTH_FAILED_ID, Packet, SERVERDATA_AUTH_RESPONSE, SERVERDATA_RESPONSE_VALUE};

/// Largest GoldSource datagram we expect to receive.
const MAX_DATAGRAM: usize = 4096;

/// Lifecycle state of an [`RconClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No transport is open.
    Disconnected,
    /// Transport open, secret not yet accepted.
    Connected,
    /// Secret accepted; commands may be executed.
    Authenticated,
}

impl State {
    /// Lowercase name used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Authenticated => "authenticated",
        }
    }
}

enum Link {
    Source {
        framed: Framed<TcpStream, SourceCodec>,
        next_id: i32,
    },
    GoldSource {
        socket: UdpSocket,
        challenge: Option<String>,
        password: Option<String>,
    },
}

/// Remote console client speaking either [`Dialect`].
pub struct RconClient {
    link: Option<Link>,
    state: State,
    timeout: Duration,
}

impl RconClient {
    /// Create a disconnected client whose network stages are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            link: None,
            state: State::Disconnected,
            timeout,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Open the transport to `host:port` using the given dialect.
    pub async fn connect(&mut self, host: &str, port: u16, dialect: Dialect) -> Result<(), RconError> {
        self.require(State::Disconnected, "connect")?;

        let link = match dialect {
            Dialect::Source => {
                let stream = timeout(self.timeout, TcpStream::connect((host, port)))
                    .await
                    .map_err(|_| RconError::Timeout("connecting"))??;
                stream.set_nodelay(true)?;
                Link::Source {
                    framed: Framed::new(stream, SourceCodec::new()),
                    next_id: 1,
                }
            }
            Dialect::GoldSource => {
                let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
                timeout(self.timeout, socket.connect((host, port)))
                    .await
                    .map_err(|_| RconError::Timeout("connecting"))??;
                Link::GoldSource {
                    socket,
                    challenge: None,
                    password: None,
                }
            }
        };

        debug!(host = %host, port, dialect = %dialect, "rcon connected");
        self.link = Some(link);
        self.state = State::Connected;
        Ok(())
    }

    /// Present the shared secret.
    pub async fn authenticate(&mut self, secret: &str) -> Result<(), RconError> {
        self.require(State::Connected, "authenticate")?;
        let limit = self.timeout;

        match self.link.as_mut() {
            Some(Link::Source { framed, next_id }) => {
                let id = take_id(next_id);
                framed.send(Packet::auth(id, secret)).await?;
                loop {
                    let packet = read_packet(framed, limit).await?;
                    // Servers send an empty RESPONSE_VALUE ahead of the verdict.
                    if packet.kind == SERVERDATA_RESPONSE_VALUE {
                        continue;
                    }
                    if packet.kind != SERVERDATA_AUTH_RESPONSE || packet.id == AUTH_FAILED_ID {
                        return Err(RconError::Authentication);
                    }
                    if packet.id == id {
                        break;
                    }
                }
            }
            Some(Link::GoldSource {
                socket,
                challenge,
                password,
            }) => {
                socket.send(&goldsource::challenge_request()).await?;
                let reply = recv_datagram(socket, limit).await?;
                *challenge = Some(goldsource::parse_challenge(&reply)?);
                *password = Some(secret.to_string());
            }
            None => return Err(invalid("authenticate", State::Connected, self.state)),
        }

        self.state = State::Authenticated;
        Ok(())
    }

    /// Execute one console command and return its output.
    pub async fn execute(&mut self, command: &str) -> Result<String, RconError> {
        self.require(State::Authenticated, "execute")?;
        let limit = self.timeout;
        trace!(command = %command, "rcon execute");

        match self.link.as_mut() {
            Some(Link::Source { framed, next_id }) => {
                let id = take_id(next_id);
                let marker = take_id(next_id);
                framed.send(Packet::exec(id, command)).await?;
                framed.send(Packet::terminator(marker)).await?;

                let mut output = String::new();
                loop {
                    let packet = read_packet(framed, limit).await?;
                    if packet.id == marker {
                        break;
                    }
                    if packet.id == id {
                        output.push_str(&packet.body);
                    }
                }
                Ok(output)
            }
            Some(Link::GoldSource {
                socket,
                challenge: Some(challenge),
                password: Some(password),
            }) => {
                let datagram = goldsource::command_datagram(challenge, password, command)?;
                socket.send(&datagram).await?;
                let reply = recv_datagram(socket, limit).await?;
                match goldsource::parse_reply(&reply)? {
                    Reply::Output(text) => Ok(text),
                    Reply::BadPassword => Err(RconError::Authentication),
                    Reply::BadChallenge => Err(crate::ProtocolError::BadChallenge(
                        "challenge rejected by server".to_string(),
                    )
                    .into()),
                }
            }
            _ => Err(invalid("execute", State::Authenticated, self.state)),
        }
    }

    /// Close the transport. Safe to call in any state, any number of times.
    pub async fn disconnect(&mut self) {
        if let Some(Link::Source { framed, .. }) = self.link.take() {
            let mut stream = framed.into_inner();
            if let Err(e) = stream.shutdown().await {
                trace!(error = %e, "rcon shutdown failed");
            }
        }
        if self.state != State::Disconnected {
            debug!("rcon disconnected");
        }
        self.state = State::Disconnected;
    }

    fn require(&self, required: State, operation: &'static str) -> Result<(), RconError> {
        if self.state == required {
            Ok(())
        } else {
            Err(invalid(operation, required, self.state))
        }
    }
}

fn invalid(operation: &'static str, required: State, actual: State) -> RconError {
    RconError::InvalidState {
        operation,
        required: required.as_str(),
        actual: actual.as_str(),
    }
}

fn take_id(next_id: &mut i32) -> i32 {
    let id = *next_id;
    // Never hand out the failure sentinel or wrap negative.
    *next_id = if id >= i32::MAX - 1 { 1 } else { id + 1 };
    id
}

async fn read_packet(
    framed: &mut Framed<TcpStream, SourceCodec>,
    limit: Duration,
) -> Result<Packet, RconError> {
    match timeout(limit, framed.next()).await {
        Err(_) => Err(RconError::Timeout("reading response")),
        Ok(None) => Err(RconError::Closed),
        Ok(Some(result)) => Ok(result?),
    }
}

async fn recv_datagram(socket: &UdpSocket, limit: Duration) -> Result<Vec<u8>, RconError> {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let len = timeout(limit, socket.recv(&mut buf))
        .await
        .map_err(|_| RconError::Timeout("reading response"))??;
    buf.truncate(len);
    Ok(buf)
}
