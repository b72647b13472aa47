//! Integration tests for `RconClient` against in-process fake servers.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rcon_proto::goldsource::HEADER;
use rcon_proto::packet::{
    AUTH_FAILED_ID, SERVERDATA_AUTH, SERVERDATA_AUTH_RESPONSE, SERVERDATA_EXECCOMMAND,
    SERVERDATA_RESPONSE_VALUE,
};
use rcon_proto::{Dialect, Packet, RconClient, RconError, SourceCodec, State};
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::codec::Framed;

const SECRET: &str = "hunter2";

/// Spawn a fake Source RCON server that accepts one connection.
///
/// Commands are answered in two packets to exercise multi-packet output.
async fn spawn_source_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, SourceCodec::new());
        while let Some(Ok(packet)) = framed.next().await {
            match packet.kind {
                SERVERDATA_AUTH => {
                    framed.send(Packet::terminator(packet.id)).await.unwrap();
                    let id = if packet.body == SECRET {
                        packet.id
                    } else {
                        AUTH_FAILED_ID
                    };
                    framed
                        .send(Packet {
                            id,
                            kind: SERVERDATA_AUTH_RESPONSE,
                            body: String::new(),
                        })
                        .await
                        .unwrap();
                }
                SERVERDATA_EXECCOMMAND => {
                    for part in [format!("ran {}", packet.body), " ok".to_string()] {
                        framed
                            .send(Packet {
                                id: packet.id,
                                kind: SERVERDATA_RESPONSE_VALUE,
                                body: part,
                            })
                            .await
                            .unwrap();
                    }
                }
                _ => {
                    // Mirror the end-of-output marker.
                    framed.send(Packet::terminator(packet.id)).await.unwrap();
                }
            }
        }
    });

    port
}

#[tokio::test]
async fn test_source_full_lifecycle() {
    let port = spawn_source_server().await;
    let mut client = RconClient::new(Duration::from_secs(2));

    client.connect("127.0.0.1", port, Dialect::Source).await.unwrap();
    assert_eq!(client.state(), State::Connected);

    client.authenticate(SECRET).await.unwrap();
    assert_eq!(client.state(), State::Authenticated);

    let output = client.execute("vip_reload").await.unwrap();
    assert_eq!(output, "ran vip_reload ok");

    let output = client.execute("status").await.unwrap();
    assert_eq!(output, "ran status ok");

    client.disconnect().await;
    assert_eq!(client.state(), State::Disconnected);
}

#[tokio::test]
async fn test_source_wrong_secret() {
    let port = spawn_source_server().await;
    let mut client = RconClient::new(Duration::from_secs(2));

    client.connect("127.0.0.1", port, Dialect::Source).await.unwrap();
    let err = client.authenticate("wrong").await.unwrap_err();
    assert!(matches!(err, RconError::Authentication));
    assert_eq!(client.state(), State::Connected);

    let err = client.execute("status").await.unwrap_err();
    assert!(matches!(err, RconError::InvalidState { .. }));

    client.disconnect().await;
    assert_eq!(client.state(), State::Disconnected);
}

#[tokio::test]
async fn test_connect_refused() {
    // Bind then drop to obtain a port with nothing listening.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut client = RconClient::new(Duration::from_secs(2));
    let err = client
        .connect("127.0.0.1", port, Dialect::Source)
        .await
        .unwrap_err();
    assert!(matches!(err, RconError::Io(_) | RconError::Timeout(_)));
    assert_eq!(client.state(), State::Disconnected);
}

#[tokio::test]
async fn test_goldsource_lifecycle() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        loop {
            let Ok((len, peer)) = server.recv_from(&mut buf).await else {
                return;
            };
            let text = String::from_utf8_lossy(&buf[4..len]).to_string();
            let reply = if text.starts_with("challenge rcon") {
                "challenge rcon 99887766\n".to_string()
            } else if text.starts_with(&format!("rcon 99887766 \"{SECRET}\" ")) {
                "lReloaded admins\n".to_string()
            } else {
                "lBad rcon_password.\n".to_string()
            };
            let mut out = HEADER.to_vec();
            out.extend_from_slice(reply.as_bytes());
            out.push(0);
            server.send_to(&out, peer).await.unwrap();
        }
    });

    let mut client = RconClient::new(Duration::from_secs(2));
    client
        .connect("127.0.0.1", port, Dialect::GoldSource)
        .await
        .unwrap();
    client.authenticate(SECRET).await.unwrap();
    assert_eq!(client.execute("amx_reloadadmins").await.unwrap(), "Reloaded admins");
    client.disconnect().await;

    let mut client = RconClient::new(Duration::from_secs(2));
    client
        .connect("127.0.0.1", port, Dialect::GoldSource)
        .await
        .unwrap();
    client.authenticate("nope").await.unwrap();
    assert!(matches!(
        client.execute("status").await,
        Err(RconError::Authentication)
    ));
    client.disconnect().await;
}
