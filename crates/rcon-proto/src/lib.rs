//! # rcon-proto
//!
//! Remote console protocol support for Source and GoldSource game servers.
//!
//! - [`SourceCodec`]: tokio codec framing Source RCON [`Packet`]s over TCP
//! - [`goldsource`]: connectionless challenge/command datagrams for the legacy dialect
//! - [`RconClient`]: async client with a strict connect → authenticate → execute →
//!   disconnect lifecycle
//!
//! ```ignore
//! use rcon_proto::{Dialect, RconClient};
//! use std::time::Duration;
//!
//! let mut client = RconClient::new(Duration::from_secs(3));
//! let result = async {
//!     client.connect("127.0.0.1", 27015, Dialect::Source).await?;
//!     client.authenticate("secret").await?;
//!     client.execute("sm_reloadadmins").await
//! }
//! .await;
//! client.disconnect().await;
//! ```

pub mod client;
pub mod codec;
pub mod dialect;
pub mod error;
pub mod goldsource;
pub mod packet;

pub use client::{RconClient, State};
pub use codec::SourceCodec;
pub use dialect::{Dialect, GOLDSOURCE_MOD};
pub use error::{ProtocolError, RconError};
pub use packet::Packet;
